//! Kernels: argument binding and kernel, argument and work-group attributes.

use std::ffi::CString;
use std::mem::{size_of, size_of_val};
use std::os::raw::c_void;
use std::ptr;

use crate::context::Context;
use crate::device::Device;
use crate::error::{Error, Result};
use crate::ffi::{self, ClKernel, ClMem, ClSampler, CL_SUCCESS};
use crate::handle::facade;
use crate::info::{Attribute, Codec, InfoKind, POINTER_WIDTH};
use crate::mem::MemObject;
use crate::program::Program;
use crate::sampler::Sampler;
use crate::types::{KernelArgAccessQualifier, KernelArgAddressQualifier, Scalar, WorkGroupInfo};

/// Kernel attributes.
pub mod attr {
    use crate::ffi::{ClContext, ClProgram};
    use crate::info::{attributes, HandleOf, Str, Uint};

    attributes!(Kernel {
        FUNCTION_NAME: Str = CL_KERNEL_FUNCTION_NAME;
        NUM_ARGS: Uint = CL_KERNEL_NUM_ARGS;
        REFERENCE_COUNT: Uint = CL_KERNEL_REFERENCE_COUNT;
        CONTEXT: HandleOf<ClContext> = CL_KERNEL_CONTEXT;
        PROGRAM: HandleOf<ClProgram> = CL_KERNEL_PROGRAM;
        ATTRIBUTES: Str = CL_KERNEL_ATTRIBUTES;
    });
}

/// Kernel argument attributes.
pub mod arg_attr {
    use crate::info::{attributes, Str, Uint};

    attributes!(KernelArg {
        ADDRESS_QUALIFIER: Uint = CL_KERNEL_ARG_ADDRESS_QUALIFIER;
        ACCESS_QUALIFIER: Uint = CL_KERNEL_ARG_ACCESS_QUALIFIER;
        TYPE_NAME: Str = CL_KERNEL_ARG_TYPE_NAME;
        NAME: Str = CL_KERNEL_ARG_NAME;
    });
}

/// Per-device work-group attributes.
pub mod work_group_attr {
    use crate::info::{attributes, Size, SizeTriple, Ulong};

    attributes!(KernelWorkGroup {
        WORK_GROUP_SIZE: Size = CL_KERNEL_WORK_GROUP_SIZE;
        COMPILE_WORK_GROUP_SIZE: SizeTriple = CL_KERNEL_COMPILE_WORK_GROUP_SIZE;
        LOCAL_MEM_SIZE: Ulong = CL_KERNEL_LOCAL_MEM_SIZE;
        PREFERRED_WORK_GROUP_SIZE_MULTIPLE: Size = CL_KERNEL_PREFERRED_WORK_GROUP_SIZE_MULTIPLE;
        PRIVATE_MEM_SIZE: Ulong = CL_KERNEL_PRIVATE_MEM_SIZE;
    });
}

impl WorkGroupInfo {
    /// Element count and element width of the answer to this query.
    pub const fn layout(self) -> (usize, usize) {
        match self {
            WorkGroupInfo::WorkGroupSize => (1, POINTER_WIDTH),
            WorkGroupInfo::CompileWorkGroupSize => (3, POINTER_WIDTH),
            WorkGroupInfo::LocalMemSize => (1, size_of::<u64>()),
            WorkGroupInfo::PreferredWorkGroupSizeMultiple => (1, POINTER_WIDTH),
            WorkGroupInfo::PrivateMemSize => (1, size_of::<u64>()),
        }
    }

    /// Total size in bytes of the answer to this query.
    pub const fn required_size(self) -> usize {
        let (count, width) = self.layout();
        count * width
    }
}

facade! {
    /// An entry point of a built program, with its bound arguments.
    pub struct Kernel(ClKernel): Kernel via clGetKernelInfo;
}

impl Kernel {
    /// The kernel called `name` in a built program.
    pub fn new(program: &Program, name: &str) -> Result<Self> {
        let name = CString::new(name)
            .map_err(|_| Error::InvalidArgument(format!("kernel name {:?} contains NUL", name)))?;
        let prog = program.handle().pin()?;
        let mut status = CL_SUCCESS;
        let raw = unsafe {
            program
                .runtime()
                .api()
                .clCreateKernel(prog.raw(), name.as_ptr(), &mut status)
        };
        ffi::error::check_call(status, "clCreateKernel")?;
        Self::wrap(program.runtime(), raw)
    }

    fn set_arg_raw(&self, index: u32, size: usize, value: *const c_void) -> Result<()> {
        let kernel = self.handle.pin()?;
        let code = unsafe {
            self.runtime()
                .api()
                .clSetKernelArg(kernel.raw(), index, size, value)
        };
        ffi::error::check_call(code, "clSetKernelArg")
    }

    /// Bind a buffer or image argument.
    pub fn set_arg_mem(&self, index: u32, mem: &MemObject) -> Result<()> {
        let pin = mem.handle().pin()?;
        let raw: ClMem = pin.raw();
        self.set_arg_raw(index, size_of::<ClMem>(), (&raw as *const ClMem).cast())
    }

    pub fn set_arg_sampler(&self, index: u32, sampler: &Sampler) -> Result<()> {
        let pin = sampler.handle().pin()?;
        let raw: ClSampler = pin.raw();
        self.set_arg_raw(index, size_of::<ClSampler>(), (&raw as *const ClSampler).cast())
    }

    /// Reserve `size` bytes of local memory for a `__local` pointer argument.
    pub fn set_arg_local(&self, index: u32, size: usize) -> Result<()> {
        self.set_arg_raw(index, size, ptr::null())
    }

    /// Bind a plain value argument.
    pub fn set_arg_scalar<T: Scalar>(&self, index: u32, value: &T) -> Result<()> {
        self.set_arg_raw(index, size_of_val(value), (value as *const T).cast())
    }

    pub fn function_name(&self) -> Result<String> {
        self.info(attr::FUNCTION_NAME)
    }

    pub fn num_args(&self) -> Result<u32> {
        self.info(attr::NUM_ARGS)
    }

    pub fn reference_count(&self) -> Result<u32> {
        self.info(attr::REFERENCE_COUNT)
    }

    /// Attributes declared with `__attribute__` in the source.
    pub fn attributes(&self) -> Result<String> {
        self.info(attr::ATTRIBUTES)
    }

    pub fn context(&self) -> Result<Context> {
        match self.info(attr::CONTEXT)? {
            Some(raw) => Context::retain_from(self.runtime(), raw),
            None => Err(Error::NullHandle {
                kind: crate::handle::ResourceKind::Context,
            }),
        }
    }

    pub fn program(&self) -> Result<Program> {
        match self.info(attr::PROGRAM)? {
            Some(raw) => Program::retain_from(self.runtime(), raw),
            None => Err(Error::NullHandle {
                kind: crate::handle::ResourceKind::Program,
            }),
        }
    }

    /// Query an attribute of argument `index`.
    ///
    /// Requires a program built with `-cl-kernel-arg-info`.
    pub fn arg_info<C: Codec>(&self, index: u32, attr: Attribute<C>) -> Result<C::Value> {
        if attr.kind != InfoKind::KernelArg {
            return Err(Error::InvalidArgument(format!(
                "{} is not a kernel argument attribute",
                attr.name
            )));
        }
        self.handle.query(attr, |api, raw, id, size, value, size_ret| unsafe {
            api.clGetKernelArgInfo(raw, index, id, size, value, size_ret)
        })
    }

    pub fn arg_name(&self, index: u32) -> Result<String> {
        self.arg_info(index, arg_attr::NAME)
    }

    pub fn arg_type_name(&self, index: u32) -> Result<String> {
        self.arg_info(index, arg_attr::TYPE_NAME)
    }

    pub fn arg_address_qualifier(&self, index: u32) -> Result<KernelArgAddressQualifier> {
        let raw = self.arg_info(index, arg_attr::ADDRESS_QUALIFIER)?;
        KernelArgAddressQualifier::from_raw(raw)
            .ok_or_else(|| arg_attr::ADDRESS_QUALIFIER.unknown_value(raw))
    }

    pub fn arg_access_qualifier(&self, index: u32) -> Result<KernelArgAccessQualifier> {
        let raw = self.arg_info(index, arg_attr::ACCESS_QUALIFIER)?;
        KernelArgAccessQualifier::from_raw(raw)
            .ok_or_else(|| arg_attr::ACCESS_QUALIFIER.unknown_value(raw))
    }

    fn work_group<C: Codec>(&self, device: &Device, query: WorkGroupInfo, attr: Attribute<C>) -> Result<C::Value> {
        let dev = device.handle().pin()?;
        let device_raw = dev.raw();
        self.handle
            .query_sized(attr, query.required_size(), |api, raw, id, size, value, size_ret| unsafe {
                api.clGetKernelWorkGroupInfo(raw, device_raw, id, size, value, size_ret)
            })
    }

    /// Largest work-group size this kernel can run with on `device`.
    pub fn work_group_size(&self, device: &Device) -> Result<usize> {
        self.work_group(
            device,
            WorkGroupInfo::WorkGroupSize,
            work_group_attr::WORK_GROUP_SIZE,
        )
    }

    /// `reqd_work_group_size` from the source, or zeros.
    pub fn compile_work_group_size(&self, device: &Device) -> Result<[usize; 3]> {
        self.work_group(
            device,
            WorkGroupInfo::CompileWorkGroupSize,
            work_group_attr::COMPILE_WORK_GROUP_SIZE,
        )
    }

    pub fn local_mem_size(&self, device: &Device) -> Result<u64> {
        self.work_group(
            device,
            WorkGroupInfo::LocalMemSize,
            work_group_attr::LOCAL_MEM_SIZE,
        )
    }

    pub fn preferred_work_group_size_multiple(&self, device: &Device) -> Result<usize> {
        self.work_group(
            device,
            WorkGroupInfo::PreferredWorkGroupSizeMultiple,
            work_group_attr::PREFERRED_WORK_GROUP_SIZE_MULTIPLE,
        )
    }

    pub fn private_mem_size(&self, device: &Device) -> Result<u64> {
        self.work_group(
            device,
            WorkGroupInfo::PrivateMemSize,
            work_group_attr::PRIVATE_MEM_SIZE,
        )
    }
}
