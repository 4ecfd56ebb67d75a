//! Programs: creation from source or binaries, building, compiling and linking.

use std::ffi::CString;
use std::os::raw::c_char;
use std::ptr;

use crate::context::Context;
use crate::device::Device;
use crate::error::{Error, Result};
use crate::ffi::{self, ClDevice, ClKernel, ClProgram, Status, CL_SUCCESS};
use crate::handle::{facade, wrap_all};
use crate::info::{Attribute, Codec, InfoKind};
use crate::kernel::Kernel;
use crate::marshal::{with_pinned_handles, with_pinned_pair};
use crate::types::BuildStatus;

static EMPTY_SOURCE: [c_char; 1] = [0];

/// Program attributes.
pub mod attr {
    use crate::ffi::{ClContext, ClDevice};
    use crate::info::{attributes, HandleArray, HandleOf, Size, SizeArray, Str, Uint};

    attributes!(Program {
        REFERENCE_COUNT: Uint = CL_PROGRAM_REFERENCE_COUNT;
        CONTEXT: HandleOf<ClContext> = CL_PROGRAM_CONTEXT;
        NUM_DEVICES: Uint = CL_PROGRAM_NUM_DEVICES;
        DEVICES: HandleArray<ClDevice> = CL_PROGRAM_DEVICES;
        SOURCE: Str = CL_PROGRAM_SOURCE;
        BINARY_SIZES: SizeArray = CL_PROGRAM_BINARY_SIZES;
        NUM_KERNELS: Size = CL_PROGRAM_NUM_KERNELS;
        KERNEL_NAMES: Str = CL_PROGRAM_KERNEL_NAMES;
    });
}

/// Per-device build attributes.
pub mod build_attr {
    use crate::info::{attributes, Int, Str};

    attributes!(ProgramBuild {
        STATUS: Int = CL_PROGRAM_BUILD_STATUS;
        OPTIONS: Str = CL_PROGRAM_BUILD_OPTIONS;
        LOG: Str = CL_PROGRAM_BUILD_LOG;
    });
}

facade! {
    /// Source or binaries for a set of devices, and what was built from them.
    pub struct Program(ClProgram): Program via clGetProgramInfo;
}

fn c_options(options: &str) -> Result<CString> {
    CString::new(options)
        .map_err(|_| Error::InvalidArgument("build options contain NUL".into()))
}

impl Program {
    /// A program from one or more source strings.
    pub fn with_source(context: &Context, sources: &[&str]) -> Result<Self> {
        let count = ffi::cl_uint::try_from(sources.len())
            .map_err(|_| Error::InvalidArgument(format!("{} source strings", sources.len())))?;
        // A zero length tells the library to look for a terminator, which a
        // `&str` does not carry. Empty entries point at a lone NUL instead.
        let strings: Vec<*const c_char> = sources
            .iter()
            .map(|s| if s.is_empty() { EMPTY_SOURCE.as_ptr() } else { s.as_ptr().cast() })
            .collect();
        let lengths: Vec<usize> = sources.iter().map(|s| s.len()).collect();

        let ctx = context.handle().pin()?;
        let mut status = CL_SUCCESS;
        let raw = unsafe {
            context.runtime().api().clCreateProgramWithSource(
                ctx.raw(),
                count,
                strings.as_ptr(),
                lengths.as_ptr(),
                &mut status,
            )
        };
        ffi::error::check_call(status, "clCreateProgramWithSource")?;
        Self::wrap(context.runtime(), raw)
    }

    /// A program from per-device binaries.
    ///
    /// Also returns the load status of each binary, in input order.
    pub fn with_binary(
        context: &Context,
        binaries: &[(&Device, &[u8])],
    ) -> Result<(Self, Vec<std::result::Result<(), Status>>)> {
        let devices: Vec<&Device> = binaries.iter().map(|(device, _)| *device).collect();
        let handles = Device::handles(&devices);
        let lengths: Vec<usize> = binaries.iter().map(|(_, bin)| bin.len()).collect();
        let pointers: Vec<*const u8> = binaries.iter().map(|(_, bin)| bin.as_ptr()).collect();
        let mut binary_status = vec![CL_SUCCESS; binaries.len()];

        let ctx = context.handle().pin()?;
        let mut status = CL_SUCCESS;
        let raw = with_pinned_handles(Some(handles.as_slice()), |list| unsafe {
            context.runtime().api().clCreateProgramWithBinary(
                ctx.raw(),
                list.len(),
                list.as_ptr(),
                lengths.as_ptr(),
                pointers.as_ptr(),
                binary_status.as_mut_ptr(),
                &mut status,
            )
        })?;
        ffi::error::check_call(status, "clCreateProgramWithBinary")?;
        let program = Self::wrap(context.runtime(), raw)?;
        Ok((program, binary_status.into_iter().map(ffi::check).collect()))
    }

    /// Build for `devices`, or for every device of the program when `None`.
    ///
    /// A failed build returns [`Error::Build`] with the log of each device.
    pub fn build(&self, devices: Option<&[&Device]>, options: &str) -> Result<()> {
        let options = c_options(options)?;
        let program = self.handle.pin()?;
        let api = self.runtime().api();
        let handles = devices.map(Device::handles);
        let code = with_pinned_handles(handles.as_deref(), |list| unsafe {
            api.clBuildProgram(
                program.raw(),
                list.len(),
                list.as_ptr(),
                options.as_ptr(),
                None,
                ptr::null_mut(),
            )
        })?;
        self.check_build(code, "clBuildProgram", devices)
    }

    /// Compile without linking. `headers` maps include names to header programs.
    pub fn compile(
        &self,
        devices: Option<&[&Device]>,
        options: &str,
        headers: &[(&str, &Program)],
    ) -> Result<()> {
        let options = c_options(options)?;
        let names = headers
            .iter()
            .map(|(name, _)| {
                CString::new(*name)
                    .map_err(|_| Error::InvalidArgument(format!("header name {:?} contains NUL", name)))
            })
            .collect::<Result<Vec<_>>>()?;
        let name_ptrs: Vec<*const c_char> = names.iter().map(|name| name.as_ptr()).collect();
        let header_programs: Vec<&Program> = headers.iter().map(|(_, program)| *program).collect();
        let header_handles = Program::handles(&header_programs);
        let device_handles = devices.map(Device::handles);

        let program = self.handle.pin()?;
        let api = self.runtime().api();
        let code = with_pinned_pair(
            device_handles.as_deref(),
            (!headers.is_empty()).then_some(header_handles.as_slice()),
            |devices, headers| unsafe {
                api.clCompileProgram(
                    program.raw(),
                    devices.len(),
                    devices.as_ptr(),
                    options.as_ptr(),
                    headers.len(),
                    headers.as_ptr(),
                    if headers.is_empty() {
                        ptr::null()
                    } else {
                        name_ptrs.as_ptr()
                    },
                    None,
                    ptr::null_mut(),
                )
            },
        )?;
        self.check_build(code, "clCompileProgram", devices)
    }

    /// Link compiled programs into a new executable program.
    pub fn link(
        context: &Context,
        devices: Option<&[&Device]>,
        options: &str,
        inputs: &[&Program],
    ) -> Result<Self> {
        let options = c_options(options)?;
        let device_handles = devices.map(Device::handles);
        let input_handles = Program::handles(inputs);

        let ctx = context.handle().pin()?;
        let api = context.runtime().api();
        let mut status = CL_SUCCESS;
        let raw = with_pinned_pair(
            device_handles.as_deref(),
            Some(input_handles.as_slice()),
            |devices, inputs| unsafe {
                api.clLinkProgram(
                    ctx.raw(),
                    devices.len(),
                    devices.as_ptr(),
                    options.as_ptr(),
                    inputs.len(),
                    inputs.as_ptr(),
                    None,
                    ptr::null_mut(),
                    &mut status,
                )
            },
        )?;

        match ffi::check(status) {
            Ok(()) => Self::wrap(context.runtime(), raw),
            Err(status) if status.is_build_failure() => {
                // A failed link may still hand back a program holding the log.
                let log = match Self::wrap(context.runtime(), raw) {
                    Ok(program) => program.collect_logs(devices),
                    Err(_) => String::new(),
                };
                Err(Error::Build { status, log })
            }
            Err(status) => Err(Error::Native {
                op: "clLinkProgram",
                status,
            }),
        }
    }

    fn check_build(&self, code: ffi::cl_int, op: &'static str, devices: Option<&[&Device]>) -> Result<()> {
        match ffi::check(code) {
            Ok(()) => Ok(()),
            Err(status) if status.is_build_failure() => Err(Error::Build {
                status,
                log: self.collect_logs(devices),
            }),
            Err(status) => Err(Error::Native { op, status }),
        }
    }

    /// Build logs of `devices` (or all program devices), one block per device.
    fn collect_logs(&self, devices: Option<&[&Device]>) -> String {
        let devices: Vec<Device> = match devices {
            Some(devices) => devices.iter().map(|d| (*d).clone()).collect(),
            None => match self.devices() {
                Ok(devices) => devices,
                Err(err) => {
                    log::warn!("listing program devices for build logs failed: {}", err);
                    return String::new();
                }
            },
        };
        let mut out = String::new();
        for device in &devices {
            let log = match self.build_log(device) {
                Ok(log) => log,
                Err(err) => {
                    log::warn!("fetching build log failed: {}", err);
                    continue;
                }
            };
            let log = log.trim_end();
            if log.is_empty() {
                continue;
            }
            if !out.is_empty() {
                out.push('\n');
            }
            let name = device.name().unwrap_or_else(|_| "unknown device".into());
            out.push_str(&format!("[{}]\n{}", name, log));
        }
        out
    }

    /// Query a build attribute for one device.
    pub fn build_info<C: Codec>(&self, device: &Device, attr: Attribute<C>) -> Result<C::Value> {
        if attr.kind != InfoKind::ProgramBuild {
            return Err(Error::InvalidArgument(format!(
                "{} is not a program build attribute",
                attr.name
            )));
        }
        let dev = device.handle().pin()?;
        let device_raw = dev.raw();
        self.handle.query(attr, |api, raw, id, size, value, size_ret| unsafe {
            api.clGetProgramBuildInfo(raw, device_raw, id, size, value, size_ret)
        })
    }

    pub fn build_status(&self, device: &Device) -> Result<BuildStatus> {
        let raw = self.build_info(device, build_attr::STATUS)?;
        BuildStatus::from_raw(raw)
            .ok_or_else(|| build_attr::STATUS.unknown_value(raw))
    }

    pub fn build_options(&self, device: &Device) -> Result<String> {
        self.build_info(device, build_attr::OPTIONS)
    }

    pub fn build_log(&self, device: &Device) -> Result<String> {
        self.build_info(device, build_attr::LOG)
    }

    /// Every kernel of a built program.
    pub fn create_kernels(&self) -> Result<Vec<Kernel>> {
        let program = self.handle.pin()?;
        let api = self.runtime().api();

        let mut count = 0;
        let code = unsafe { api.clCreateKernelsInProgram(program.raw(), 0, ptr::null_mut(), &mut count) };
        ffi::error::check_call(code, "clCreateKernelsInProgram")?;
        if count == 0 {
            return Ok(Vec::new());
        }

        let mut raw = vec![ClKernel::invalid(); count as usize];
        let code = unsafe {
            api.clCreateKernelsInProgram(program.raw(), count, raw.as_mut_ptr(), ptr::null_mut())
        };
        ffi::error::check_call(code, "clCreateKernelsInProgram")?;

        Ok(wrap_all(self.runtime(), raw, None)?
            .into_iter()
            .map(Kernel::from_handle)
            .collect())
    }

    pub fn reference_count(&self) -> Result<u32> {
        self.info(attr::REFERENCE_COUNT)
    }

    pub fn context(&self) -> Result<Context> {
        match self.info(attr::CONTEXT)? {
            Some(raw) => Context::retain_from(self.runtime(), raw),
            None => Err(Error::NullHandle {
                kind: crate::handle::ResourceKind::Context,
            }),
        }
    }

    pub fn num_devices(&self) -> Result<u32> {
        self.info(attr::NUM_DEVICES)
    }

    /// Devices of this program, each holding its own native reference.
    pub fn devices(&self) -> Result<Vec<Device>> {
        self.raw_devices()?
            .into_iter()
            .map(|raw| Device::retain_from(self.runtime(), raw))
            .collect()
    }

    fn raw_devices(&self) -> Result<Vec<ClDevice>> {
        self.info(attr::DEVICES)
    }

    pub fn source(&self) -> Result<String> {
        self.info(attr::SOURCE)
    }

    pub fn binary_sizes(&self) -> Result<Vec<usize>> {
        self.info(attr::BINARY_SIZES)
    }

    /// The binary of each program device, in device order.
    ///
    /// The native call fills caller-allocated buffers, so the sizes are
    /// queried first.
    pub fn binaries(&self) -> Result<Vec<Vec<u8>>> {
        let sizes = self.binary_sizes()?;
        let mut binaries: Vec<Vec<u8>> = Vec::with_capacity(sizes.len());
        for &size in &sizes {
            let mut buf = Vec::new();
            buf.try_reserve_exact(size)
                .map_err(|_| Error::OutOfHostMemory { requested: size })?;
            buf.resize(size, 0);
            binaries.push(buf);
        }
        let mut pointers: Vec<*mut u8> = binaries.iter_mut().map(|b| b.as_mut_ptr()).collect();

        let program = self.handle.pin()?;
        let code = unsafe {
            self.runtime().api().clGetProgramInfo(
                program.raw(),
                ffi::CL_PROGRAM_BINARIES,
                std::mem::size_of_val(pointers.as_slice()),
                pointers.as_mut_ptr().cast(),
                ptr::null_mut(),
            )
        };
        ffi::check(code).map_err(|status| Error::Query {
            kind: InfoKind::Program,
            attribute: "CL_PROGRAM_BINARIES",
            status,
        })?;
        Ok(binaries)
    }

    pub fn num_kernels(&self) -> Result<usize> {
        self.info(attr::NUM_KERNELS)
    }

    /// Kernel names, from the native semicolon separated list.
    pub fn kernel_names(&self) -> Result<Vec<String>> {
        let all = self.info(attr::KERNEL_NAMES)?;
        Ok(all
            .split(';')
            .filter(|name| !name.is_empty())
            .map(str::to_owned)
            .collect())
    }
}
