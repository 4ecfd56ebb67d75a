//! In-process fake of the native library for integration tests.
//!
//! Objects are plain records keyed by a fake pointer value. Every entry
//! point is counted, and any of them can be made to fail with a given
//! status. Reference counts are tracked per object, so tests can check that
//! every wrapper gives back exactly what it took.

#![allow(dead_code)]
#![allow(non_snake_case)]
#![allow(clippy::too_many_arguments)]

use std::collections::HashMap;
use std::mem::size_of;
use std::os::raw::{c_char, c_void};
use std::ptr;
use std::slice;
use std::sync::{Arc, Mutex, MutexGuard};

use clbind::ffi::*;
use clbind::handle::NativeHandle;
use clbind::{Context, Device, DeviceType, Options, ResourceKind, Runtime};

/// Kernel source that fails to build in the fake.
pub const BROKEN_SOURCE: &str = "#error broken\n__kernel void broken(void) {}";

/// Kernel source with two kernels.
pub const SOURCE: &str = "__kernel void add(__global int *a, __global int *b) {}\n\
                          __kernel void scale(__global float *v, float k) {}";

/// Install a logger once and build a runtime over a fresh fake.
pub fn setup() -> (Arc<FakeDriver>, Runtime) {
    let _ = env_logger::builder().is_test(true).try_init();
    let fake = Arc::new(FakeDriver::new());
    let options = Options {
        library_path: None,
        verify_info_sizes: true,
    };
    let runtime = Runtime::with_api(fake.clone(), options);
    (fake, runtime)
}

/// Every root device of the first platform, GPU first.
pub fn devices(runtime: &Runtime) -> Vec<Device> {
    let platform = runtime
        .platforms()
        .expect("platforms should succeed")
        .remove(0);
    platform
        .devices(DeviceType::ALL)
        .expect("devices should succeed")
}

/// The GPU and a context over it.
pub fn gpu_context(runtime: &Runtime) -> (Device, Context) {
    let gpu = devices(runtime).remove(0);
    let context = Context::new(&[&gpu]).expect("context should succeed");
    (gpu, context)
}

/// Raw pointer value of a facade's handle.
pub fn raw<H: NativeHandle>(handle: clbind::Result<H>) -> usize {
    handle.expect("handle should be live").to_raw()
}

/// What the last enqueue received as its wait list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaitRecord {
    pub count: cl_uint,
    pub null: bool,
    pub handles: Vec<usize>,
}

/// One `clSetKernelArg` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArgRecord {
    pub index: cl_uint,
    pub size: usize,
    pub value: Option<Vec<u8>>,
}

struct Object {
    kind: ResourceKind,
    refs: u32,
    attrs: HashMap<cl_uint, Vec<u8>>,
    /// Buffer contents.
    data: Vec<u8>,
    /// Parent buffer and origin, for sub-buffers.
    region_of: Option<(usize, usize)>,
    kernel_names: Vec<String>,
    source: String,
    args: Vec<ArgRecord>,
}

impl Object {
    fn new(kind: ResourceKind) -> Self {
        Self {
            kind,
            refs: 1,
            attrs: HashMap::new(),
            data: Vec::new(),
            region_of: None,
            kernel_names: Vec::new(),
            source: String::new(),
            args: Vec::new(),
        }
    }
}

#[derive(Default)]
struct State {
    next: usize,
    objects: HashMap<usize, Object>,
    platforms: Vec<usize>,
    devices: Vec<usize>,
    calls: HashMap<&'static str, usize>,
    failures: HashMap<&'static str, cl_int>,
    size_overrides: HashMap<cl_uint, usize>,
    null_at: Option<usize>,
    withhold_events: bool,
    last_wait_list: Option<WaitRecord>,
    last_mem_list: Option<Vec<usize>>,
    last_source_lengths: Option<Vec<usize>>,
    released: Vec<usize>,
}

pub fn u32_bytes(v: u32) -> Vec<u8> {
    v.to_ne_bytes().to_vec()
}

pub fn i32_bytes(v: i32) -> Vec<u8> {
    v.to_ne_bytes().to_vec()
}

pub fn u64_bytes(v: u64) -> Vec<u8> {
    v.to_ne_bytes().to_vec()
}

pub fn usize_bytes(v: usize) -> Vec<u8> {
    v.to_ne_bytes().to_vec()
}

pub fn words_bytes(v: &[usize]) -> Vec<u8> {
    v.iter().flat_map(|w| w.to_ne_bytes()).collect()
}

pub fn str_bytes(s: &str) -> Vec<u8> {
    let mut b = s.as_bytes().to_vec();
    b.push(0);
    b
}

fn invalid_code(kind: ResourceKind) -> cl_int {
    match kind {
        ResourceKind::Platform => CL_INVALID_PLATFORM,
        ResourceKind::Device => CL_INVALID_DEVICE,
        ResourceKind::Context => CL_INVALID_CONTEXT,
        ResourceKind::CommandQueue => CL_INVALID_COMMAND_QUEUE,
        ResourceKind::Program => CL_INVALID_PROGRAM,
        ResourceKind::Kernel => CL_INVALID_KERNEL,
        ResourceKind::MemObject => CL_INVALID_MEM_OBJECT,
        ResourceKind::Event => CL_INVALID_EVENT,
        ResourceKind::Sampler => CL_INVALID_SAMPLER,
    }
}

fn reference_count_attr(kind: ResourceKind) -> Option<cl_uint> {
    match kind {
        ResourceKind::Platform => None,
        ResourceKind::Device => Some(CL_DEVICE_REFERENCE_COUNT),
        ResourceKind::Context => Some(CL_CONTEXT_REFERENCE_COUNT),
        ResourceKind::CommandQueue => Some(CL_QUEUE_REFERENCE_COUNT),
        ResourceKind::Program => Some(CL_PROGRAM_REFERENCE_COUNT),
        ResourceKind::Kernel => Some(CL_KERNEL_REFERENCE_COUNT),
        ResourceKind::MemObject => Some(CL_MEM_REFERENCE_COUNT),
        ResourceKind::Event => Some(CL_EVENT_REFERENCE_COUNT),
        ResourceKind::Sampler => Some(CL_SAMPLER_REFERENCE_COUNT),
    }
}

/// `__kernel void NAME(` occurrences, in source order.
fn kernel_names(source: &str) -> Vec<String> {
    source
        .split("__kernel void ")
        .skip(1)
        .filter_map(|rest| rest.split('(').next())
        .map(|name| name.trim().to_owned())
        .collect()
}

/// Start offset of every row of a rectangle.
fn rect_rows(origin: [usize; 3], region: [usize; 3], row_pitch: usize, slice_pitch: usize) -> Vec<usize> {
    let row = if row_pitch == 0 { region[0] } else { row_pitch };
    let slice = if slice_pitch == 0 { region[1] * row } else { slice_pitch };
    let base = origin[2] * slice + origin[1] * row + origin[0];
    let mut rows = Vec::new();
    for z in 0..region[2] {
        for y in 0..region[1] {
            rows.push(base + z * slice + y * row);
        }
    }
    rows
}

impl State {
    fn create(&mut self, kind: ResourceKind) -> usize {
        self.next += 0x10;
        let handle = 0x1000 + self.next;
        self.objects.insert(handle, Object::new(kind));
        handle
    }

    fn live(&self, handle: usize, kind: ResourceKind) -> bool {
        self.objects
            .get(&handle)
            .is_some_and(|o| o.kind == kind && o.refs > 0)
    }

    fn obj(&mut self, handle: usize) -> &mut Object {
        self.objects.get_mut(&handle).expect("object exists")
    }

    fn set(&mut self, handle: usize, id: cl_uint, bytes: Vec<u8>) {
        self.obj(handle).attrs.insert(id, bytes);
    }

    fn attr(&self, handle: usize, id: cl_uint) -> Option<Vec<u8>> {
        let object = self.objects.get(&handle)?;
        if reference_count_attr(object.kind) == Some(id) {
            return Some(u32_bytes(object.refs));
        }
        object.attrs.get(&id).cloned()
    }

    fn attr_usize(&self, handle: usize, id: cl_uint) -> usize {
        let bytes = self.attr(handle, id).expect("attribute exists");
        usize::from_ne_bytes(bytes[..size_of::<usize>()].try_into().expect("usize"))
    }

    fn retain(&mut self, handle: usize, kind: ResourceKind) -> cl_int {
        if !self.live(handle, kind) {
            return invalid_code(kind);
        }
        // Root devices are not reference counted.
        if self.devices.contains(&handle) {
            return CL_SUCCESS;
        }
        self.obj(handle).refs += 1;
        CL_SUCCESS
    }

    fn release(&mut self, handle: usize, kind: ResourceKind) -> cl_int {
        if !self.live(handle, kind) {
            return invalid_code(kind);
        }
        if self.devices.contains(&handle) {
            return CL_SUCCESS;
        }
        let object = self.obj(handle);
        object.refs -= 1;
        if object.refs == 0 {
            self.released.push(handle);
        }
        CL_SUCCESS
    }

    /// Answer a "get info" call from the attribute table.
    unsafe fn info(
        &self,
        handle: usize,
        kind: ResourceKind,
        id: cl_uint,
        size: usize,
        value: *mut c_void,
        size_ret: *mut usize,
    ) -> cl_int {
        if !self.live(handle, kind) {
            return invalid_code(kind);
        }
        let Some(bytes) = self.attr(handle, id) else {
            return CL_INVALID_VALUE;
        };
        let reported = self.size_overrides.get(&id).copied().unwrap_or(bytes.len());
        if !value.is_null() {
            if size < bytes.len() {
                return CL_INVALID_VALUE;
            }
            ptr::copy_nonoverlapping(bytes.as_ptr(), value.cast::<u8>(), bytes.len());
        }
        if !size_ret.is_null() {
            *size_ret = if value.is_null() { reported } else { bytes.len() };
        }
        CL_SUCCESS
    }

    unsafe fn record_wait_list(&mut self, count: cl_uint, list: *const ClEvent) -> cl_int {
        let handles: Vec<usize> = if list.is_null() || count == 0 {
            Vec::new()
        } else {
            slice::from_raw_parts(list, count as usize)
                .iter()
                .map(|e| e.to_raw())
                .collect()
        };
        self.last_wait_list = Some(WaitRecord {
            count,
            null: list.is_null(),
            handles: handles.clone(),
        });
        if (count == 0) != list.is_null() {
            return CL_INVALID_EVENT_WAIT_LIST;
        }
        if handles.iter().any(|&h| !self.live(h, ResourceKind::Event)) {
            return CL_INVALID_EVENT_WAIT_LIST;
        }
        CL_SUCCESS
    }

    /// Create the completed event of a command on `queue`.
    unsafe fn complete(&mut self, queue: usize, command: cl_uint, event: *mut ClEvent) {
        let context = self.attr_usize(queue, CL_QUEUE_CONTEXT);
        let profiling = (self.attr_usize(queue, CL_QUEUE_PROPERTIES) as u64) & CL_QUEUE_PROFILING_ENABLE != 0;
        let handle = self.create(ResourceKind::Event);
        self.set(handle, CL_EVENT_COMMAND_QUEUE, usize_bytes(queue));
        self.set(handle, CL_EVENT_CONTEXT, usize_bytes(context));
        self.set(handle, CL_EVENT_COMMAND_TYPE, u32_bytes(command));
        self.set(handle, CL_EVENT_COMMAND_EXECUTION_STATUS, i32_bytes(CL_COMPLETE));
        if profiling {
            self.set(handle, CL_PROFILING_COMMAND_QUEUED, u64_bytes(100));
            self.set(handle, CL_PROFILING_COMMAND_SUBMIT, u64_bytes(200));
            self.set(handle, CL_PROFILING_COMMAND_START, u64_bytes(300));
            self.set(handle, CL_PROFILING_COMMAND_END, u64_bytes(1300));
        }
        if event.is_null() || self.withhold_events {
            self.obj(handle).refs = 0;
        } else {
            *event = ClEvent::from_raw(handle);
        }
    }

    /// Storage owner, origin and size of a buffer or sub-buffer.
    fn span(&self, mem: usize) -> (usize, usize, usize) {
        let size = self.attr_usize(mem, CL_MEM_SIZE);
        match self.objects[&mem].region_of {
            Some((parent, origin)) => (parent, origin, size),
            None => (mem, 0, size),
        }
    }

    fn bytes_mut(&mut self, mem: usize, offset: usize, len: usize) -> Option<&mut [u8]> {
        let (owner, origin, size) = self.span(mem);
        if offset.checked_add(len)? > size {
            return None;
        }
        self.obj(owner).data.get_mut(origin + offset..origin + offset + len)
    }

    fn batch_handle(&mut self, index: usize, handle: usize) -> usize {
        if self.null_at == Some(index) {
            self.obj(handle).refs = 0;
            0
        } else {
            handle
        }
    }
}

/// The fake native library.
pub struct FakeDriver {
    state: Mutex<State>,
}

impl FakeDriver {
    /// One platform with a GPU and a CPU device.
    pub fn new() -> Self {
        let mut st = State::default();
        let platform = st.create(ResourceKind::Platform);
        st.set(platform, CL_PLATFORM_NAME, str_bytes("Fake Platform"));
        st.set(platform, CL_PLATFORM_VENDOR, str_bytes("clbind"));
        st.set(platform, CL_PLATFORM_VERSION, str_bytes("OpenCL 1.2 fake"));
        st.set(platform, CL_PLATFORM_PROFILE, str_bytes("FULL_PROFILE"));
        st.set(platform, CL_PLATFORM_EXTENSIONS, str_bytes("cl_khr_fp64 cl_khr_icd"));
        st.platforms.push(platform);

        for (name, ty) in [("Fake GPU", CL_DEVICE_TYPE_GPU), ("Fake CPU", CL_DEVICE_TYPE_CPU)] {
            let device = st.create(ResourceKind::Device);
            Self::device_attrs(&mut st, device, platform, name, ty, 0);
            st.devices.push(device);
        }

        Self {
            state: Mutex::new(st),
        }
    }

    fn device_attrs(st: &mut State, device: usize, platform: usize, name: &str, ty: u64, parent: usize) {
        st.set(device, CL_DEVICE_NAME, str_bytes(name));
        st.set(device, CL_DEVICE_VENDOR, str_bytes("clbind"));
        st.set(device, CL_DEVICE_VERSION, str_bytes("OpenCL 1.2 fake"));
        st.set(device, CL_DRIVER_VERSION, str_bytes("1.0"));
        st.set(device, CL_DEVICE_TYPE, u64_bytes(ty));
        st.set(device, CL_DEVICE_MAX_COMPUTE_UNITS, u32_bytes(8));
        st.set(device, CL_DEVICE_MAX_WORK_GROUP_SIZE, usize_bytes(256));
        st.set(device, CL_DEVICE_MAX_WORK_ITEM_SIZES, words_bytes(&[256, 256, 64]));
        st.set(device, CL_DEVICE_GLOBAL_MEM_SIZE, u64_bytes(1 << 30));
        st.set(device, CL_DEVICE_LOCAL_MEM_SIZE, u64_bytes(32 << 10));
        st.set(device, CL_DEVICE_AVAILABLE, u32_bytes(1));
        st.set(device, CL_DEVICE_IMAGE_SUPPORT, u32_bytes(1));
        st.set(device, CL_DEVICE_EXTENSIONS, str_bytes("cl_khr_fp64"));
        st.set(device, CL_DEVICE_QUEUE_PROPERTIES, u64_bytes(CL_QUEUE_PROFILING_ENABLE));
        st.set(device, CL_DEVICE_EXECUTION_CAPABILITIES, u64_bytes(CL_EXEC_KERNEL));
        st.set(device, CL_DEVICE_PLATFORM, usize_bytes(platform));
        st.set(device, CL_DEVICE_PARENT_DEVICE, usize_bytes(parent));
        st.set(
            device,
            CL_DEVICE_PARTITION_PROPERTIES,
            words_bytes(&[
                CL_DEVICE_PARTITION_EQUALLY as usize,
                CL_DEVICE_PARTITION_BY_COUNTS as usize,
                0,
            ]),
        );
    }

    fn enter(&self, name: &'static str) -> (MutexGuard<'_, State>, Option<cl_int>) {
        let mut st = self.state.lock().unwrap();
        *st.calls.entry(name).or_default() += 1;
        let failure = st.failures.get(name).copied();
        (st, failure)
    }

    /// Number of calls made to `entry_point`.
    pub fn calls(&self, entry_point: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .calls
            .get(entry_point)
            .copied()
            .unwrap_or(0)
    }

    /// Total calls to every entry point whose name starts with `prefix`.
    pub fn calls_matching(&self, prefix: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .calls
            .iter()
            .filter(|(name, _)| name.starts_with(prefix))
            .map(|(_, n)| n)
            .sum()
    }

    /// Make every later call to `entry_point` fail with `code`.
    pub fn fail(&self, entry_point: &'static str, code: cl_int) {
        self.state.lock().unwrap().failures.insert(entry_point, code);
    }

    pub fn clear_failure(&self, entry_point: &'static str) {
        self.state.lock().unwrap().failures.remove(entry_point);
    }

    /// Report `size` for every size probe of attribute `id`.
    pub fn override_size(&self, id: cl_uint, size: usize) {
        self.state.lock().unwrap().size_overrides.insert(id, size);
    }

    /// Return a null handle at `index` of every later batch creation.
    pub fn null_in_batch(&self, index: usize) {
        self.state.lock().unwrap().null_at = Some(index);
    }

    /// Run later commands but hand back a null event for each.
    pub fn withhold_events(&self) {
        self.state.lock().unwrap().withhold_events = true;
    }

    /// Overwrite the stored bytes of one attribute.
    pub fn set_attr(&self, handle: usize, id: cl_uint, bytes: Vec<u8>) {
        self.state.lock().unwrap().set(handle, id, bytes);
    }

    /// Native reference count, or `None` for an unknown handle.
    pub fn refcount(&self, handle: usize) -> Option<u32> {
        self.state.lock().unwrap().objects.get(&handle).map(|o| o.refs)
    }

    /// Objects of `kind` with a positive reference count.
    pub fn live(&self, kind: ResourceKind) -> usize {
        self.state
            .lock()
            .unwrap()
            .objects
            .values()
            .filter(|o| o.kind == kind && o.refs > 0)
            .count()
    }

    /// Handles whose reference count dropped to zero, in order.
    pub fn released(&self) -> Vec<usize> {
        self.state.lock().unwrap().released.clone()
    }

    pub fn last_wait_list(&self) -> Option<WaitRecord> {
        self.state.lock().unwrap().last_wait_list.clone()
    }

    pub fn last_mem_list(&self) -> Option<Vec<usize>> {
        self.state.lock().unwrap().last_mem_list.clone()
    }

    /// The `lengths` array of the last program-from-source call, `None` when it was null.
    pub fn last_source_lengths(&self) -> Option<Vec<usize>> {
        self.state.lock().unwrap().last_source_lengths.clone()
    }

    pub fn kernel_args(&self, kernel: usize) -> Vec<ArgRecord> {
        self.state.lock().unwrap().objects[&kernel].args.clone()
    }

    /// Full contents of a buffer.
    pub fn buffer_contents(&self, mem: usize) -> Vec<u8> {
        let mut st = self.state.lock().unwrap();
        let (_, _, size) = st.span(mem);
        st.bytes_mut(mem, 0, size).map(|b| b.to_vec()).unwrap_or_default()
    }

    pub fn platforms(&self) -> Vec<usize> {
        self.state.lock().unwrap().platforms.clone()
    }

    pub fn devices(&self) -> Vec<usize> {
        self.state.lock().unwrap().devices.clone()
    }

    unsafe fn created<H>(errcode_ret: *mut cl_int, code: cl_int, handle: usize, make: fn(usize) -> H) -> H {
        if !errcode_ret.is_null() {
            *errcode_ret = code;
        }
        make(if code == CL_SUCCESS { handle } else { 0 })
    }

    unsafe fn build_program(st: &mut State, program: usize, options: *const c_char) -> cl_int {
        let options = if options.is_null() {
            String::new()
        } else {
            std::ffi::CStr::from_ptr(options).to_string_lossy().into_owned()
        };
        st.set(program, CL_PROGRAM_BUILD_OPTIONS, str_bytes(&options));
        let source = st.objects[&program].source.clone();
        if source.contains("#error") {
            st.set(program, CL_PROGRAM_BUILD_STATUS, i32_bytes(CL_BUILD_ERROR));
            st.set(program, CL_PROGRAM_BUILD_LOG, str_bytes("1:1: error: broken\n"));
            return CL_BUILD_PROGRAM_FAILURE;
        }
        let names = kernel_names(&source);
        st.set(program, CL_PROGRAM_BUILD_STATUS, i32_bytes(CL_BUILD_SUCCESS));
        st.set(program, CL_PROGRAM_BUILD_LOG, str_bytes(""));
        st.set(program, CL_PROGRAM_NUM_KERNELS, usize_bytes(names.len()));
        st.set(program, CL_PROGRAM_KERNEL_NAMES, str_bytes(&names.join(";")));
        st.obj(program).kernel_names = names;
        CL_SUCCESS
    }

    fn new_program(st: &mut State, context: usize, source: String, devices: Vec<usize>) -> usize {
        let program = st.create(ResourceKind::Program);
        st.set(program, CL_PROGRAM_CONTEXT, usize_bytes(context));
        st.set(program, CL_PROGRAM_NUM_DEVICES, u32_bytes(devices.len() as u32));
        st.set(program, CL_PROGRAM_DEVICES, words_bytes(&devices));
        st.set(program, CL_PROGRAM_SOURCE, str_bytes(&source));
        st.set(
            program,
            CL_PROGRAM_BINARY_SIZES,
            words_bytes(&vec![source.len(); devices.len()]),
        );
        st.set(program, CL_PROGRAM_BUILD_STATUS, i32_bytes(CL_BUILD_NONE));
        st.set(program, CL_PROGRAM_BUILD_LOG, str_bytes(""));
        st.obj(program).source = source;
        program
    }

    fn new_kernel(st: &mut State, program: usize, name: &str) -> usize {
        let context = st.attr_usize(program, CL_PROGRAM_CONTEXT);
        let args = st.objects[&program]
            .source
            .split(&format!("__kernel void {}(", name))
            .nth(1)
            .and_then(|rest| rest.split(')').next())
            .map(|params| params.split(',').count())
            .unwrap_or(0);
        let kernel = st.create(ResourceKind::Kernel);
        st.set(kernel, CL_KERNEL_FUNCTION_NAME, str_bytes(name));
        st.set(kernel, CL_KERNEL_NUM_ARGS, u32_bytes(args as u32));
        st.set(kernel, CL_KERNEL_CONTEXT, usize_bytes(context));
        st.set(kernel, CL_KERNEL_PROGRAM, usize_bytes(program));
        st.set(kernel, CL_KERNEL_ATTRIBUTES, str_bytes(""));
        st.set(kernel, CL_KERNEL_ARG_NAME, str_bytes("a"));
        st.set(kernel, CL_KERNEL_ARG_TYPE_NAME, str_bytes("int*"));
        st.set(kernel, CL_KERNEL_ARG_ADDRESS_QUALIFIER, u32_bytes(CL_KERNEL_ARG_ADDRESS_GLOBAL));
        st.set(kernel, CL_KERNEL_ARG_ACCESS_QUALIFIER, u32_bytes(CL_KERNEL_ARG_ACCESS_NONE));
        st.set(kernel, CL_KERNEL_WORK_GROUP_SIZE, usize_bytes(256));
        st.set(kernel, CL_KERNEL_COMPILE_WORK_GROUP_SIZE, words_bytes(&[0, 0, 0]));
        st.set(kernel, CL_KERNEL_LOCAL_MEM_SIZE, u64_bytes(1024));
        st.set(kernel, CL_KERNEL_PREFERRED_WORK_GROUP_SIZE_MULTIPLE, usize_bytes(32));
        st.set(kernel, CL_KERNEL_PRIVATE_MEM_SIZE, u64_bytes(0));
        kernel
    }

    fn new_mem(st: &mut State, context: usize, flags: u64, size: usize, ty: cl_uint) -> usize {
        let mem = st.create(ResourceKind::MemObject);
        st.set(mem, CL_MEM_TYPE, u32_bytes(ty));
        st.set(mem, CL_MEM_FLAGS, u64_bytes(flags));
        st.set(mem, CL_MEM_SIZE, usize_bytes(size));
        st.set(mem, CL_MEM_MAP_COUNT, u32_bytes(0));
        st.set(mem, CL_MEM_CONTEXT, usize_bytes(context));
        st.set(mem, CL_MEM_ASSOCIATED_MEMOBJECT, usize_bytes(0));
        st.set(mem, CL_MEM_OFFSET, usize_bytes(0));
        mem
    }
}

impl Default for FakeDriver {
    fn default() -> Self {
        Self::new()
    }
}

unsafe impl ClApi for FakeDriver {
    unsafe fn clGetPlatformIDs(&self, num_entries: cl_uint, platforms: *mut ClPlatform, num_platforms: *mut cl_uint) -> cl_int {
        let (st, failure) = self.enter("clGetPlatformIDs");
        if let Some(code) = failure {
            return code;
        }
        if !platforms.is_null() {
            for (i, &p) in st.platforms.iter().take(num_entries as usize).enumerate() {
                *platforms.add(i) = ClPlatform::from_raw(p);
            }
        }
        if !num_platforms.is_null() {
            *num_platforms = st.platforms.len() as cl_uint;
        }
        CL_SUCCESS
    }

    unsafe fn clGetPlatformInfo(&self, platform: ClPlatform, param_name: cl_uint, param_value_size: usize, param_value: *mut c_void, param_value_size_ret: *mut usize) -> cl_int {
        let (st, failure) = self.enter("clGetPlatformInfo");
        if let Some(code) = failure {
            return code;
        }
        st.info(platform.to_raw(), ResourceKind::Platform, param_name, param_value_size, param_value, param_value_size_ret)
    }

    unsafe fn clGetDeviceIDs(&self, platform: ClPlatform, device_type: cl_device_type, num_entries: cl_uint, devices: *mut ClDevice, num_devices: *mut cl_uint) -> cl_int {
        let (st, failure) = self.enter("clGetDeviceIDs");
        if let Some(code) = failure {
            return code;
        }
        if !st.live(platform.to_raw(), ResourceKind::Platform) {
            return CL_INVALID_PLATFORM;
        }
        let matching: Vec<usize> = st
            .devices
            .iter()
            .copied()
            .filter(|&d| {
                let ty = u64::from_ne_bytes(st.attr(d, CL_DEVICE_TYPE).unwrap()[..8].try_into().unwrap());
                ty & device_type != 0
            })
            .collect();
        if matching.is_empty() {
            return CL_DEVICE_NOT_FOUND;
        }
        if !devices.is_null() {
            for (i, &d) in matching.iter().take(num_entries as usize).enumerate() {
                *devices.add(i) = ClDevice::from_raw(d);
            }
        }
        if !num_devices.is_null() {
            *num_devices = matching.len() as cl_uint;
        }
        CL_SUCCESS
    }

    unsafe fn clGetDeviceInfo(&self, device: ClDevice, param_name: cl_uint, param_value_size: usize, param_value: *mut c_void, param_value_size_ret: *mut usize) -> cl_int {
        let (st, failure) = self.enter("clGetDeviceInfo");
        if let Some(code) = failure {
            return code;
        }
        st.info(device.to_raw(), ResourceKind::Device, param_name, param_value_size, param_value, param_value_size_ret)
    }

    unsafe fn clCreateSubDevices(&self, in_device: ClDevice, properties: *const cl_device_partition_property, num_devices: cl_uint, out_devices: *mut ClDevice, num_devices_ret: *mut cl_uint) -> cl_int {
        let (mut st, failure) = self.enter("clCreateSubDevices");
        if let Some(code) = failure {
            return code;
        }
        let parent = in_device.to_raw();
        if !st.live(parent, ResourceKind::Device) {
            return CL_INVALID_DEVICE;
        }
        let units = 8usize;
        let count = match *properties {
            CL_DEVICE_PARTITION_EQUALLY => {
                let n = *properties.add(1) as usize;
                if n == 0 {
                    return CL_INVALID_VALUE;
                }
                units / n
            }
            CL_DEVICE_PARTITION_BY_COUNTS => {
                let mut n = 0;
                while *properties.add(1 + n) != CL_DEVICE_PARTITION_BY_COUNTS_LIST_END {
                    n += 1;
                }
                n
            }
            _ => return CL_INVALID_VALUE,
        };
        if !num_devices_ret.is_null() {
            *num_devices_ret = count as cl_uint;
        }
        if out_devices.is_null() {
            return CL_SUCCESS;
        }
        if (num_devices as usize) < count {
            return CL_INVALID_VALUE;
        }
        let platform = st.attr_usize(parent, CL_DEVICE_PLATFORM);
        for i in 0..count {
            let sub = st.create(ResourceKind::Device);
            Self::device_attrs(&mut st, sub, platform, "Fake sub-device", CL_DEVICE_TYPE_GPU, parent);
            let handle = st.batch_handle(i, sub);
            *out_devices.add(i) = ClDevice::from_raw(handle);
        }
        CL_SUCCESS
    }

    unsafe fn clRetainDevice(&self, device: ClDevice) -> cl_int {
        let (mut st, failure) = self.enter("clRetainDevice");
        failure.unwrap_or_else(|| st.retain(device.to_raw(), ResourceKind::Device))
    }

    unsafe fn clReleaseDevice(&self, device: ClDevice) -> cl_int {
        let (mut st, failure) = self.enter("clReleaseDevice");
        failure.unwrap_or_else(|| st.release(device.to_raw(), ResourceKind::Device))
    }

    unsafe fn clCreateContext(&self, _properties: *const cl_context_properties, num_devices: cl_uint, devices: *const ClDevice, _pfn_notify: ContextCallback, _user_data: *mut c_void, errcode_ret: *mut cl_int) -> ClContext {
        let (mut st, failure) = self.enter("clCreateContext");
        if let Some(code) = failure {
            return Self::created(errcode_ret, code, 0, ClContext::from_raw);
        }
        if devices.is_null() || num_devices == 0 {
            return Self::created(errcode_ret, CL_INVALID_VALUE, 0, ClContext::from_raw);
        }
        let list: Vec<usize> = slice::from_raw_parts(devices, num_devices as usize)
            .iter()
            .map(|d| d.to_raw())
            .collect();
        if list.iter().any(|&d| !st.live(d, ResourceKind::Device)) {
            return Self::created(errcode_ret, CL_INVALID_DEVICE, 0, ClContext::from_raw);
        }
        let context = st.create(ResourceKind::Context);
        st.set(context, CL_CONTEXT_DEVICES, words_bytes(&list));
        st.set(context, CL_CONTEXT_NUM_DEVICES, u32_bytes(list.len() as u32));
        st.set(context, CL_CONTEXT_PROPERTIES, Vec::new());
        Self::created(errcode_ret, CL_SUCCESS, context, ClContext::from_raw)
    }

    unsafe fn clGetContextInfo(&self, context: ClContext, param_name: cl_uint, param_value_size: usize, param_value: *mut c_void, param_value_size_ret: *mut usize) -> cl_int {
        let (st, failure) = self.enter("clGetContextInfo");
        if let Some(code) = failure {
            return code;
        }
        st.info(context.to_raw(), ResourceKind::Context, param_name, param_value_size, param_value, param_value_size_ret)
    }

    unsafe fn clRetainContext(&self, context: ClContext) -> cl_int {
        let (mut st, failure) = self.enter("clRetainContext");
        failure.unwrap_or_else(|| st.retain(context.to_raw(), ResourceKind::Context))
    }

    unsafe fn clReleaseContext(&self, context: ClContext) -> cl_int {
        let (mut st, failure) = self.enter("clReleaseContext");
        failure.unwrap_or_else(|| st.release(context.to_raw(), ResourceKind::Context))
    }

    unsafe fn clCreateCommandQueue(&self, context: ClContext, device: ClDevice, properties: cl_command_queue_properties, errcode_ret: *mut cl_int) -> ClCommandQueue {
        let (mut st, failure) = self.enter("clCreateCommandQueue");
        if let Some(code) = failure {
            return Self::created(errcode_ret, code, 0, ClCommandQueue::from_raw);
        }
        if !st.live(context.to_raw(), ResourceKind::Context) {
            return Self::created(errcode_ret, CL_INVALID_CONTEXT, 0, ClCommandQueue::from_raw);
        }
        if !st.live(device.to_raw(), ResourceKind::Device) {
            return Self::created(errcode_ret, CL_INVALID_DEVICE, 0, ClCommandQueue::from_raw);
        }
        let queue = st.create(ResourceKind::CommandQueue);
        st.set(queue, CL_QUEUE_CONTEXT, usize_bytes(context.to_raw()));
        st.set(queue, CL_QUEUE_DEVICE, usize_bytes(device.to_raw()));
        st.set(queue, CL_QUEUE_PROPERTIES, u64_bytes(properties));
        Self::created(errcode_ret, CL_SUCCESS, queue, ClCommandQueue::from_raw)
    }

    unsafe fn clGetCommandQueueInfo(&self, queue: ClCommandQueue, param_name: cl_uint, param_value_size: usize, param_value: *mut c_void, param_value_size_ret: *mut usize) -> cl_int {
        let (st, failure) = self.enter("clGetCommandQueueInfo");
        if let Some(code) = failure {
            return code;
        }
        st.info(queue.to_raw(), ResourceKind::CommandQueue, param_name, param_value_size, param_value, param_value_size_ret)
    }

    unsafe fn clRetainCommandQueue(&self, queue: ClCommandQueue) -> cl_int {
        let (mut st, failure) = self.enter("clRetainCommandQueue");
        failure.unwrap_or_else(|| st.retain(queue.to_raw(), ResourceKind::CommandQueue))
    }

    unsafe fn clReleaseCommandQueue(&self, queue: ClCommandQueue) -> cl_int {
        let (mut st, failure) = self.enter("clReleaseCommandQueue");
        failure.unwrap_or_else(|| st.release(queue.to_raw(), ResourceKind::CommandQueue))
    }

    unsafe fn clFlush(&self, queue: ClCommandQueue) -> cl_int {
        let (st, failure) = self.enter("clFlush");
        failure.unwrap_or_else(|| {
            if st.live(queue.to_raw(), ResourceKind::CommandQueue) {
                CL_SUCCESS
            } else {
                CL_INVALID_COMMAND_QUEUE
            }
        })
    }

    unsafe fn clFinish(&self, queue: ClCommandQueue) -> cl_int {
        let (st, failure) = self.enter("clFinish");
        failure.unwrap_or_else(|| {
            if st.live(queue.to_raw(), ResourceKind::CommandQueue) {
                CL_SUCCESS
            } else {
                CL_INVALID_COMMAND_QUEUE
            }
        })
    }

    unsafe fn clCreateProgramWithSource(&self, context: ClContext, count: cl_uint, strings: *const *const c_char, lengths: *const usize, errcode_ret: *mut cl_int) -> ClProgram {
        let (mut st, failure) = self.enter("clCreateProgramWithSource");
        if let Some(code) = failure {
            return Self::created(errcode_ret, code, 0, ClProgram::from_raw);
        }
        let context = context.to_raw();
        if !st.live(context, ResourceKind::Context) {
            return Self::created(errcode_ret, CL_INVALID_CONTEXT, 0, ClProgram::from_raw);
        }
        let mut source = String::new();
        let mut recorded = Vec::new();
        for i in 0..count as usize {
            let string = *strings.add(i);
            // A null lengths array or a zero entry means NUL-terminated.
            let len = if lengths.is_null() { 0 } else { *lengths.add(i) };
            let bytes = if len == 0 {
                std::ffi::CStr::from_ptr(string).to_bytes()
            } else {
                slice::from_raw_parts(string.cast::<u8>(), len)
            };
            recorded.push(len);
            source.push_str(&String::from_utf8_lossy(bytes));
        }
        st.last_source_lengths = if lengths.is_null() { None } else { Some(recorded) };
        let devices: Vec<usize> = st
            .attr(context, CL_CONTEXT_DEVICES)
            .unwrap()
            .chunks_exact(size_of::<usize>())
            .map(|c| usize::from_ne_bytes(c.try_into().unwrap()))
            .collect();
        let program = Self::new_program(&mut st, context, source, devices);
        Self::created(errcode_ret, CL_SUCCESS, program, ClProgram::from_raw)
    }

    unsafe fn clCreateProgramWithBinary(&self, context: ClContext, num_devices: cl_uint, device_list: *const ClDevice, lengths: *const usize, binaries: *const *const u8, binary_status: *mut cl_int, errcode_ret: *mut cl_int) -> ClProgram {
        let (mut st, failure) = self.enter("clCreateProgramWithBinary");
        if let Some(code) = failure {
            return Self::created(errcode_ret, code, 0, ClProgram::from_raw);
        }
        let context = context.to_raw();
        if !st.live(context, ResourceKind::Context) || device_list.is_null() || num_devices == 0 {
            return Self::created(errcode_ret, CL_INVALID_VALUE, 0, ClProgram::from_raw);
        }
        let devices: Vec<usize> = slice::from_raw_parts(device_list, num_devices as usize)
            .iter()
            .map(|d| d.to_raw())
            .collect();
        let mut source = String::new();
        for i in 0..num_devices as usize {
            let len = *lengths.add(i);
            let ok = len > 0;
            if !binary_status.is_null() {
                *binary_status.add(i) = if ok { CL_SUCCESS } else { CL_INVALID_BINARY };
            }
            if ok && source.is_empty() {
                source = String::from_utf8_lossy(slice::from_raw_parts(*binaries.add(i), len)).into_owned();
            }
        }
        let program = Self::new_program(&mut st, context, source, devices);
        Self::created(errcode_ret, CL_SUCCESS, program, ClProgram::from_raw)
    }

    unsafe fn clBuildProgram(&self, program: ClProgram, num_devices: cl_uint, device_list: *const ClDevice, options: *const c_char, _pfn_notify: ProgramCallback, _user_data: *mut c_void) -> cl_int {
        let (mut st, failure) = self.enter("clBuildProgram");
        if let Some(code) = failure {
            return code;
        }
        if !st.live(program.to_raw(), ResourceKind::Program) {
            return CL_INVALID_PROGRAM;
        }
        if (num_devices == 0) != device_list.is_null() {
            return CL_INVALID_VALUE;
        }
        Self::build_program(&mut st, program.to_raw(), options)
    }

    unsafe fn clCompileProgram(&self, program: ClProgram, num_devices: cl_uint, device_list: *const ClDevice, options: *const c_char, num_input_headers: cl_uint, input_headers: *const ClProgram, header_include_names: *const *const c_char, _pfn_notify: ProgramCallback, _user_data: *mut c_void) -> cl_int {
        let (mut st, failure) = self.enter("clCompileProgram");
        if let Some(code) = failure {
            return code;
        }
        if !st.live(program.to_raw(), ResourceKind::Program) {
            return CL_INVALID_PROGRAM;
        }
        if (num_devices == 0) != device_list.is_null() {
            return CL_INVALID_VALUE;
        }
        if (num_input_headers == 0) != input_headers.is_null()
            || (num_input_headers == 0) != header_include_names.is_null()
        {
            return CL_INVALID_VALUE;
        }
        Self::build_program(&mut st, program.to_raw(), options)
    }

    unsafe fn clLinkProgram(&self, context: ClContext, num_devices: cl_uint, device_list: *const ClDevice, _options: *const c_char, num_input_programs: cl_uint, input_programs: *const ClProgram, _pfn_notify: ProgramCallback, _user_data: *mut c_void, errcode_ret: *mut cl_int) -> ClProgram {
        let (mut st, failure) = self.enter("clLinkProgram");
        if let Some(code) = failure {
            return Self::created(errcode_ret, code, 0, ClProgram::from_raw);
        }
        let context = context.to_raw();
        if !st.live(context, ResourceKind::Context)
            || (num_devices == 0) != device_list.is_null()
            || num_input_programs == 0
            || input_programs.is_null()
        {
            return Self::created(errcode_ret, CL_INVALID_VALUE, 0, ClProgram::from_raw);
        }
        let inputs: Vec<usize> = slice::from_raw_parts(input_programs, num_input_programs as usize)
            .iter()
            .map(|p| p.to_raw())
            .collect();
        if inputs.iter().any(|&p| !st.live(p, ResourceKind::Program)) {
            return Self::created(errcode_ret, CL_INVALID_PROGRAM, 0, ClProgram::from_raw);
        }
        let source: String = inputs.iter().map(|p| st.objects[p].source.clone()).collect::<Vec<_>>().join("\n");
        let devices: Vec<usize> = st
            .attr(context, CL_CONTEXT_DEVICES)
            .unwrap()
            .chunks_exact(size_of::<usize>())
            .map(|c| usize::from_ne_bytes(c.try_into().unwrap()))
            .collect();
        let program = Self::new_program(&mut st, context, source, devices);
        let code = Self::build_program(&mut st, program, ptr::null());
        let code = if code == CL_BUILD_PROGRAM_FAILURE { CL_LINK_PROGRAM_FAILURE } else { code };
        if !errcode_ret.is_null() {
            *errcode_ret = code;
        }
        ClProgram::from_raw(program)
    }

    unsafe fn clGetProgramInfo(&self, program: ClProgram, param_name: cl_uint, param_value_size: usize, param_value: *mut c_void, param_value_size_ret: *mut usize) -> cl_int {
        let (st, failure) = self.enter("clGetProgramInfo");
        if let Some(code) = failure {
            return code;
        }
        let handle = program.to_raw();
        if param_name == CL_PROGRAM_BINARIES && st.live(handle, ResourceKind::Program) {
            let source = st.objects[&handle].source.clone();
            let devices = st.attr(handle, CL_PROGRAM_NUM_DEVICES).unwrap();
            let devices = u32::from_ne_bytes(devices[..4].try_into().unwrap()) as usize;
            let needed = devices * size_of::<*mut u8>();
            if !param_value_size_ret.is_null() {
                *param_value_size_ret = needed;
            }
            if param_value.is_null() {
                return CL_SUCCESS;
            }
            if param_value_size < needed {
                return CL_INVALID_VALUE;
            }
            let targets = param_value.cast::<*mut u8>();
            for i in 0..devices {
                let target = *targets.add(i);
                if !target.is_null() {
                    ptr::copy_nonoverlapping(source.as_ptr(), target, source.len());
                }
            }
            return CL_SUCCESS;
        }
        st.info(handle, ResourceKind::Program, param_name, param_value_size, param_value, param_value_size_ret)
    }

    unsafe fn clGetProgramBuildInfo(&self, program: ClProgram, device: ClDevice, param_name: cl_uint, param_value_size: usize, param_value: *mut c_void, param_value_size_ret: *mut usize) -> cl_int {
        let (st, failure) = self.enter("clGetProgramBuildInfo");
        if let Some(code) = failure {
            return code;
        }
        if !st.live(device.to_raw(), ResourceKind::Device) {
            return CL_INVALID_DEVICE;
        }
        st.info(program.to_raw(), ResourceKind::Program, param_name, param_value_size, param_value, param_value_size_ret)
    }

    unsafe fn clRetainProgram(&self, program: ClProgram) -> cl_int {
        let (mut st, failure) = self.enter("clRetainProgram");
        failure.unwrap_or_else(|| st.retain(program.to_raw(), ResourceKind::Program))
    }

    unsafe fn clReleaseProgram(&self, program: ClProgram) -> cl_int {
        let (mut st, failure) = self.enter("clReleaseProgram");
        failure.unwrap_or_else(|| st.release(program.to_raw(), ResourceKind::Program))
    }

    unsafe fn clCreateKernel(&self, program: ClProgram, kernel_name: *const c_char, errcode_ret: *mut cl_int) -> ClKernel {
        let (mut st, failure) = self.enter("clCreateKernel");
        if let Some(code) = failure {
            return Self::created(errcode_ret, code, 0, ClKernel::from_raw);
        }
        let program = program.to_raw();
        if !st.live(program, ResourceKind::Program) {
            return Self::created(errcode_ret, CL_INVALID_PROGRAM, 0, ClKernel::from_raw);
        }
        let name = std::ffi::CStr::from_ptr(kernel_name).to_string_lossy().into_owned();
        if st.objects[&program].kernel_names.is_empty() {
            return Self::created(errcode_ret, CL_INVALID_PROGRAM_EXECUTABLE, 0, ClKernel::from_raw);
        }
        if !st.objects[&program].kernel_names.contains(&name) {
            return Self::created(errcode_ret, CL_INVALID_KERNEL_NAME, 0, ClKernel::from_raw);
        }
        let kernel = Self::new_kernel(&mut st, program, &name);
        Self::created(errcode_ret, CL_SUCCESS, kernel, ClKernel::from_raw)
    }

    unsafe fn clCreateKernelsInProgram(&self, program: ClProgram, num_kernels: cl_uint, kernels: *mut ClKernel, num_kernels_ret: *mut cl_uint) -> cl_int {
        let (mut st, failure) = self.enter("clCreateKernelsInProgram");
        if let Some(code) = failure {
            return code;
        }
        let program = program.to_raw();
        if !st.live(program, ResourceKind::Program) {
            return CL_INVALID_PROGRAM;
        }
        let names = st.objects[&program].kernel_names.clone();
        if names.is_empty() {
            return CL_INVALID_PROGRAM_EXECUTABLE;
        }
        if !num_kernels_ret.is_null() {
            *num_kernels_ret = names.len() as cl_uint;
        }
        if kernels.is_null() {
            return CL_SUCCESS;
        }
        if (num_kernels as usize) < names.len() {
            return CL_INVALID_VALUE;
        }
        for (i, name) in names.iter().enumerate() {
            let kernel = Self::new_kernel(&mut st, program, name);
            let handle = st.batch_handle(i, kernel);
            *kernels.add(i) = ClKernel::from_raw(handle);
        }
        CL_SUCCESS
    }

    unsafe fn clSetKernelArg(&self, kernel: ClKernel, arg_index: cl_uint, arg_size: usize, arg_value: *const c_void) -> cl_int {
        let (mut st, failure) = self.enter("clSetKernelArg");
        if let Some(code) = failure {
            return code;
        }
        let kernel = kernel.to_raw();
        if !st.live(kernel, ResourceKind::Kernel) {
            return CL_INVALID_KERNEL;
        }
        let value = (!arg_value.is_null())
            .then(|| slice::from_raw_parts(arg_value.cast::<u8>(), arg_size).to_vec());
        st.obj(kernel).args.push(ArgRecord {
            index: arg_index,
            size: arg_size,
            value,
        });
        CL_SUCCESS
    }

    unsafe fn clGetKernelInfo(&self, kernel: ClKernel, param_name: cl_uint, param_value_size: usize, param_value: *mut c_void, param_value_size_ret: *mut usize) -> cl_int {
        let (st, failure) = self.enter("clGetKernelInfo");
        if let Some(code) = failure {
            return code;
        }
        st.info(kernel.to_raw(), ResourceKind::Kernel, param_name, param_value_size, param_value, param_value_size_ret)
    }

    unsafe fn clGetKernelArgInfo(&self, kernel: ClKernel, arg_index: cl_uint, param_name: cl_uint, param_value_size: usize, param_value: *mut c_void, param_value_size_ret: *mut usize) -> cl_int {
        let (st, failure) = self.enter("clGetKernelArgInfo");
        if let Some(code) = failure {
            return code;
        }
        let num_args = st
            .attr(kernel.to_raw(), CL_KERNEL_NUM_ARGS)
            .map(|b| u32::from_ne_bytes(b[..4].try_into().unwrap()))
            .unwrap_or(0);
        if arg_index >= num_args {
            return CL_INVALID_ARG_INDEX;
        }
        st.info(kernel.to_raw(), ResourceKind::Kernel, param_name, param_value_size, param_value, param_value_size_ret)
    }

    unsafe fn clGetKernelWorkGroupInfo(&self, kernel: ClKernel, device: ClDevice, param_name: cl_uint, param_value_size: usize, param_value: *mut c_void, param_value_size_ret: *mut usize) -> cl_int {
        let (st, failure) = self.enter("clGetKernelWorkGroupInfo");
        if let Some(code) = failure {
            return code;
        }
        if !st.live(device.to_raw(), ResourceKind::Device) {
            return CL_INVALID_DEVICE;
        }
        st.info(kernel.to_raw(), ResourceKind::Kernel, param_name, param_value_size, param_value, param_value_size_ret)
    }

    unsafe fn clRetainKernel(&self, kernel: ClKernel) -> cl_int {
        let (mut st, failure) = self.enter("clRetainKernel");
        failure.unwrap_or_else(|| st.retain(kernel.to_raw(), ResourceKind::Kernel))
    }

    unsafe fn clReleaseKernel(&self, kernel: ClKernel) -> cl_int {
        let (mut st, failure) = self.enter("clReleaseKernel");
        failure.unwrap_or_else(|| st.release(kernel.to_raw(), ResourceKind::Kernel))
    }

    unsafe fn clEnqueueNDRangeKernel(&self, queue: ClCommandQueue, kernel: ClKernel, work_dim: cl_uint, _global_work_offset: *const usize, global_work_size: *const usize, _local_work_size: *const usize, num_events_in_wait_list: cl_uint, event_wait_list: *const ClEvent, event: *mut ClEvent) -> cl_int {
        let (mut st, failure) = self.enter("clEnqueueNDRangeKernel");
        if let Some(code) = failure {
            return code;
        }
        if !st.live(queue.to_raw(), ResourceKind::CommandQueue) {
            return CL_INVALID_COMMAND_QUEUE;
        }
        if !st.live(kernel.to_raw(), ResourceKind::Kernel) {
            return CL_INVALID_KERNEL;
        }
        if !(1..=3).contains(&work_dim) {
            return CL_INVALID_WORK_DIMENSION;
        }
        if global_work_size.is_null() {
            return CL_INVALID_GLOBAL_WORK_SIZE;
        }
        let code = st.record_wait_list(num_events_in_wait_list, event_wait_list);
        if code != CL_SUCCESS {
            return code;
        }
        st.complete(queue.to_raw(), 0x11F0, event);
        CL_SUCCESS
    }

    unsafe fn clCreateBuffer(&self, context: ClContext, flags: cl_mem_flags, size: usize, host_ptr: *mut c_void, errcode_ret: *mut cl_int) -> ClMem {
        let (mut st, failure) = self.enter("clCreateBuffer");
        if let Some(code) = failure {
            return Self::created(errcode_ret, code, 0, ClMem::from_raw);
        }
        if !st.live(context.to_raw(), ResourceKind::Context) {
            return Self::created(errcode_ret, CL_INVALID_CONTEXT, 0, ClMem::from_raw);
        }
        if size == 0 {
            return Self::created(errcode_ret, CL_INVALID_BUFFER_SIZE, 0, ClMem::from_raw);
        }
        let copy = flags & CL_MEM_COPY_HOST_PTR != 0;
        if copy == host_ptr.is_null() {
            return Self::created(errcode_ret, CL_INVALID_HOST_PTR, 0, ClMem::from_raw);
        }
        let mem = Self::new_mem(&mut st, context.to_raw(), flags, size, CL_MEM_OBJECT_BUFFER);
        st.obj(mem).data = if copy {
            slice::from_raw_parts(host_ptr.cast::<u8>(), size).to_vec()
        } else {
            vec![0; size]
        };
        Self::created(errcode_ret, CL_SUCCESS, mem, ClMem::from_raw)
    }

    unsafe fn clCreateSubBuffer(&self, buffer: ClMem, flags: cl_mem_flags, buffer_create_type: cl_uint, buffer_create_info: *const c_void, errcode_ret: *mut cl_int) -> ClMem {
        let (mut st, failure) = self.enter("clCreateSubBuffer");
        if let Some(code) = failure {
            return Self::created(errcode_ret, code, 0, ClMem::from_raw);
        }
        let parent = buffer.to_raw();
        if !st.live(parent, ResourceKind::MemObject) {
            return Self::created(errcode_ret, CL_INVALID_MEM_OBJECT, 0, ClMem::from_raw);
        }
        if buffer_create_type != CL_BUFFER_CREATE_TYPE_REGION || buffer_create_info.is_null() {
            return Self::created(errcode_ret, CL_INVALID_VALUE, 0, ClMem::from_raw);
        }
        let region = *buffer_create_info.cast::<cl_buffer_region>();
        let parent_size = st.attr_usize(parent, CL_MEM_SIZE);
        if region.size == 0 || region.origin + region.size > parent_size {
            return Self::created(errcode_ret, CL_INVALID_VALUE, 0, ClMem::from_raw);
        }
        let context = st.attr_usize(parent, CL_MEM_CONTEXT);
        let mem = Self::new_mem(&mut st, context, flags, region.size, CL_MEM_OBJECT_BUFFER);
        st.set(mem, CL_MEM_ASSOCIATED_MEMOBJECT, usize_bytes(parent));
        st.set(mem, CL_MEM_OFFSET, usize_bytes(region.origin));
        st.obj(mem).region_of = Some((parent, region.origin));
        Self::created(errcode_ret, CL_SUCCESS, mem, ClMem::from_raw)
    }

    unsafe fn clCreateImage(&self, context: ClContext, flags: cl_mem_flags, image_format: *const cl_image_format, image_desc: *const cl_image_desc, _host_ptr: *mut c_void, errcode_ret: *mut cl_int) -> ClMem {
        let (mut st, failure) = self.enter("clCreateImage");
        if let Some(code) = failure {
            return Self::created(errcode_ret, code, 0, ClMem::from_raw);
        }
        if !st.live(context.to_raw(), ResourceKind::Context) {
            return Self::created(errcode_ret, CL_INVALID_CONTEXT, 0, ClMem::from_raw);
        }
        let format = *image_format;
        let desc = *image_desc;
        if desc.image_width == 0 || desc.image_height == 0 {
            return Self::created(errcode_ret, CL_INVALID_IMAGE_SIZE, 0, ClMem::from_raw);
        }
        let element = 4usize;
        let row_pitch = desc.image_width * element;
        let mem = Self::new_mem(&mut st, context.to_raw(), flags, row_pitch * desc.image_height, desc.image_type);
        let mut format_bytes = u32_bytes(format.image_channel_order);
        format_bytes.extend(u32_bytes(format.image_channel_data_type));
        st.set(mem, CL_IMAGE_FORMAT, format_bytes);
        st.set(mem, CL_IMAGE_ELEMENT_SIZE, usize_bytes(element));
        st.set(mem, CL_IMAGE_ROW_PITCH, usize_bytes(row_pitch));
        st.set(mem, CL_IMAGE_SLICE_PITCH, usize_bytes(0));
        st.set(mem, CL_IMAGE_WIDTH, usize_bytes(desc.image_width));
        st.set(mem, CL_IMAGE_HEIGHT, usize_bytes(desc.image_height));
        st.set(mem, CL_IMAGE_DEPTH, usize_bytes(0));
        Self::created(errcode_ret, CL_SUCCESS, mem, ClMem::from_raw)
    }

    unsafe fn clGetMemObjectInfo(&self, memobj: ClMem, param_name: cl_uint, param_value_size: usize, param_value: *mut c_void, param_value_size_ret: *mut usize) -> cl_int {
        let (st, failure) = self.enter("clGetMemObjectInfo");
        if let Some(code) = failure {
            return code;
        }
        st.info(memobj.to_raw(), ResourceKind::MemObject, param_name, param_value_size, param_value, param_value_size_ret)
    }

    unsafe fn clGetImageInfo(&self, image: ClMem, param_name: cl_uint, param_value_size: usize, param_value: *mut c_void, param_value_size_ret: *mut usize) -> cl_int {
        let (st, failure) = self.enter("clGetImageInfo");
        if let Some(code) = failure {
            return code;
        }
        st.info(image.to_raw(), ResourceKind::MemObject, param_name, param_value_size, param_value, param_value_size_ret)
    }

    unsafe fn clRetainMemObject(&self, memobj: ClMem) -> cl_int {
        let (mut st, failure) = self.enter("clRetainMemObject");
        failure.unwrap_or_else(|| st.retain(memobj.to_raw(), ResourceKind::MemObject))
    }

    unsafe fn clReleaseMemObject(&self, memobj: ClMem) -> cl_int {
        let (mut st, failure) = self.enter("clReleaseMemObject");
        failure.unwrap_or_else(|| st.release(memobj.to_raw(), ResourceKind::MemObject))
    }

    unsafe fn clEnqueueReadBuffer(&self, queue: ClCommandQueue, buffer: ClMem, _blocking_read: cl_bool, offset: usize, size: usize, ptr: *mut c_void, num_events_in_wait_list: cl_uint, event_wait_list: *const ClEvent, event: *mut ClEvent) -> cl_int {
        let (mut st, failure) = self.enter("clEnqueueReadBuffer");
        if let Some(code) = failure {
            return code;
        }
        if !st.live(queue.to_raw(), ResourceKind::CommandQueue) {
            return CL_INVALID_COMMAND_QUEUE;
        }
        if !st.live(buffer.to_raw(), ResourceKind::MemObject) {
            return CL_INVALID_MEM_OBJECT;
        }
        let code = st.record_wait_list(num_events_in_wait_list, event_wait_list);
        if code != CL_SUCCESS {
            return code;
        }
        let Some(src) = st.bytes_mut(buffer.to_raw(), offset, size) else {
            return CL_INVALID_VALUE;
        };
        ptr::copy_nonoverlapping(src.as_ptr(), ptr.cast::<u8>(), size);
        st.complete(queue.to_raw(), 0x11F3, event);
        CL_SUCCESS
    }

    unsafe fn clEnqueueWriteBuffer(&self, queue: ClCommandQueue, buffer: ClMem, _blocking_write: cl_bool, offset: usize, size: usize, ptr: *const c_void, num_events_in_wait_list: cl_uint, event_wait_list: *const ClEvent, event: *mut ClEvent) -> cl_int {
        let (mut st, failure) = self.enter("clEnqueueWriteBuffer");
        if let Some(code) = failure {
            return code;
        }
        if !st.live(queue.to_raw(), ResourceKind::CommandQueue) {
            return CL_INVALID_COMMAND_QUEUE;
        }
        if !st.live(buffer.to_raw(), ResourceKind::MemObject) {
            return CL_INVALID_MEM_OBJECT;
        }
        let code = st.record_wait_list(num_events_in_wait_list, event_wait_list);
        if code != CL_SUCCESS {
            return code;
        }
        let Some(dst) = st.bytes_mut(buffer.to_raw(), offset, size) else {
            return CL_INVALID_VALUE;
        };
        ptr::copy_nonoverlapping(ptr.cast::<u8>(), dst.as_mut_ptr(), size);
        st.complete(queue.to_raw(), 0x11F4, event);
        CL_SUCCESS
    }

    unsafe fn clEnqueueReadBufferRect(&self, queue: ClCommandQueue, buffer: ClMem, _blocking_read: cl_bool, buffer_origin: *const usize, host_origin: *const usize, region: *const usize, buffer_row_pitch: usize, buffer_slice_pitch: usize, host_row_pitch: usize, host_slice_pitch: usize, ptr: *mut c_void, num_events_in_wait_list: cl_uint, event_wait_list: *const ClEvent, event: *mut ClEvent) -> cl_int {
        let (mut st, failure) = self.enter("clEnqueueReadBufferRect");
        if let Some(code) = failure {
            return code;
        }
        if !st.live(buffer.to_raw(), ResourceKind::MemObject) {
            return CL_INVALID_MEM_OBJECT;
        }
        let code = st.record_wait_list(num_events_in_wait_list, event_wait_list);
        if code != CL_SUCCESS {
            return code;
        }
        let region = *region.cast::<[usize; 3]>();
        let src_rows = rect_rows(*buffer_origin.cast::<[usize; 3]>(), region, buffer_row_pitch, buffer_slice_pitch);
        let dst_rows = rect_rows(*host_origin.cast::<[usize; 3]>(), region, host_row_pitch, host_slice_pitch);
        for (src, dst) in src_rows.into_iter().zip(dst_rows) {
            let Some(bytes) = st.bytes_mut(buffer.to_raw(), src, region[0]) else {
                return CL_INVALID_VALUE;
            };
            ptr::copy_nonoverlapping(bytes.as_ptr(), ptr.cast::<u8>().add(dst), region[0]);
        }
        st.complete(queue.to_raw(), 0x1201, event);
        CL_SUCCESS
    }

    unsafe fn clEnqueueWriteBufferRect(&self, queue: ClCommandQueue, buffer: ClMem, _blocking_write: cl_bool, buffer_origin: *const usize, host_origin: *const usize, region: *const usize, buffer_row_pitch: usize, buffer_slice_pitch: usize, host_row_pitch: usize, host_slice_pitch: usize, ptr: *const c_void, num_events_in_wait_list: cl_uint, event_wait_list: *const ClEvent, event: *mut ClEvent) -> cl_int {
        let (mut st, failure) = self.enter("clEnqueueWriteBufferRect");
        if let Some(code) = failure {
            return code;
        }
        if !st.live(buffer.to_raw(), ResourceKind::MemObject) {
            return CL_INVALID_MEM_OBJECT;
        }
        let code = st.record_wait_list(num_events_in_wait_list, event_wait_list);
        if code != CL_SUCCESS {
            return code;
        }
        let region = *region.cast::<[usize; 3]>();
        let dst_rows = rect_rows(*buffer_origin.cast::<[usize; 3]>(), region, buffer_row_pitch, buffer_slice_pitch);
        let src_rows = rect_rows(*host_origin.cast::<[usize; 3]>(), region, host_row_pitch, host_slice_pitch);
        for (dst, src) in dst_rows.into_iter().zip(src_rows) {
            let Some(bytes) = st.bytes_mut(buffer.to_raw(), dst, region[0]) else {
                return CL_INVALID_VALUE;
            };
            ptr::copy_nonoverlapping(ptr.cast::<u8>().add(src), bytes.as_mut_ptr(), region[0]);
        }
        st.complete(queue.to_raw(), 0x1202, event);
        CL_SUCCESS
    }

    unsafe fn clEnqueueCopyBuffer(&self, queue: ClCommandQueue, src_buffer: ClMem, dst_buffer: ClMem, src_offset: usize, dst_offset: usize, size: usize, num_events_in_wait_list: cl_uint, event_wait_list: *const ClEvent, event: *mut ClEvent) -> cl_int {
        let (mut st, failure) = self.enter("clEnqueueCopyBuffer");
        if let Some(code) = failure {
            return code;
        }
        if !st.live(src_buffer.to_raw(), ResourceKind::MemObject) || !st.live(dst_buffer.to_raw(), ResourceKind::MemObject) {
            return CL_INVALID_MEM_OBJECT;
        }
        let code = st.record_wait_list(num_events_in_wait_list, event_wait_list);
        if code != CL_SUCCESS {
            return code;
        }
        let Some(src) = st.bytes_mut(src_buffer.to_raw(), src_offset, size).map(|b| b.to_vec()) else {
            return CL_INVALID_VALUE;
        };
        let Some(dst) = st.bytes_mut(dst_buffer.to_raw(), dst_offset, size) else {
            return CL_INVALID_VALUE;
        };
        dst.copy_from_slice(&src);
        st.complete(queue.to_raw(), 0x11F5, event);
        CL_SUCCESS
    }

    unsafe fn clEnqueueFillBuffer(&self, queue: ClCommandQueue, buffer: ClMem, pattern: *const c_void, pattern_size: usize, offset: usize, size: usize, num_events_in_wait_list: cl_uint, event_wait_list: *const ClEvent, event: *mut ClEvent) -> cl_int {
        let (mut st, failure) = self.enter("clEnqueueFillBuffer");
        if let Some(code) = failure {
            return code;
        }
        if !st.live(buffer.to_raw(), ResourceKind::MemObject) {
            return CL_INVALID_MEM_OBJECT;
        }
        if pattern_size == 0 || size % pattern_size != 0 || offset % pattern_size != 0 {
            return CL_INVALID_VALUE;
        }
        let code = st.record_wait_list(num_events_in_wait_list, event_wait_list);
        if code != CL_SUCCESS {
            return code;
        }
        let pattern = slice::from_raw_parts(pattern.cast::<u8>(), pattern_size).to_vec();
        let Some(dst) = st.bytes_mut(buffer.to_raw(), offset, size) else {
            return CL_INVALID_VALUE;
        };
        for chunk in dst.chunks_exact_mut(pattern_size) {
            chunk.copy_from_slice(&pattern);
        }
        st.complete(queue.to_raw(), 0x1207, event);
        CL_SUCCESS
    }

    unsafe fn clEnqueueMapBuffer(&self, queue: ClCommandQueue, buffer: ClMem, _blocking_map: cl_bool, _map_flags: cl_map_flags, offset: usize, size: usize, num_events_in_wait_list: cl_uint, event_wait_list: *const ClEvent, event: *mut ClEvent, errcode_ret: *mut cl_int) -> *mut c_void {
        let (mut st, failure) = self.enter("clEnqueueMapBuffer");
        let set = |code: cl_int| {
            if !errcode_ret.is_null() {
                *errcode_ret = code;
            }
        };
        if let Some(code) = failure {
            set(code);
            return ptr::null_mut();
        }
        let mem = buffer.to_raw();
        if !st.live(mem, ResourceKind::MemObject) {
            set(CL_INVALID_MEM_OBJECT);
            return ptr::null_mut();
        }
        let code = st.record_wait_list(num_events_in_wait_list, event_wait_list);
        if code != CL_SUCCESS {
            set(code);
            return ptr::null_mut();
        }
        let Some(bytes) = st.bytes_mut(mem, offset, size) else {
            set(CL_INVALID_VALUE);
            return ptr::null_mut();
        };
        let mapped = bytes.as_mut_ptr().cast::<c_void>();
        let count = st.attr(mem, CL_MEM_MAP_COUNT).unwrap();
        let count = u32::from_ne_bytes(count[..4].try_into().unwrap());
        st.set(mem, CL_MEM_MAP_COUNT, u32_bytes(count + 1));
        st.complete(queue.to_raw(), 0x11FB, event);
        set(CL_SUCCESS);
        mapped
    }

    unsafe fn clEnqueueUnmapMemObject(&self, queue: ClCommandQueue, memobj: ClMem, mapped_ptr: *mut c_void, num_events_in_wait_list: cl_uint, event_wait_list: *const ClEvent, event: *mut ClEvent) -> cl_int {
        let (mut st, failure) = self.enter("clEnqueueUnmapMemObject");
        if let Some(code) = failure {
            return code;
        }
        let mem = memobj.to_raw();
        if !st.live(mem, ResourceKind::MemObject) {
            return CL_INVALID_MEM_OBJECT;
        }
        if mapped_ptr.is_null() {
            return CL_INVALID_VALUE;
        }
        let code = st.record_wait_list(num_events_in_wait_list, event_wait_list);
        if code != CL_SUCCESS {
            return code;
        }
        let count = st.attr(mem, CL_MEM_MAP_COUNT).unwrap();
        let count = u32::from_ne_bytes(count[..4].try_into().unwrap());
        if count == 0 {
            return CL_INVALID_VALUE;
        }
        st.set(mem, CL_MEM_MAP_COUNT, u32_bytes(count - 1));
        st.complete(queue.to_raw(), 0x11FD, event);
        CL_SUCCESS
    }

    unsafe fn clEnqueueMigrateMemObjects(&self, queue: ClCommandQueue, num_mem_objects: cl_uint, mem_objects: *const ClMem, _flags: cl_mem_migration_flags, num_events_in_wait_list: cl_uint, event_wait_list: *const ClEvent, event: *mut ClEvent) -> cl_int {
        let (mut st, failure) = self.enter("clEnqueueMigrateMemObjects");
        if let Some(code) = failure {
            return code;
        }
        if num_mem_objects == 0 || mem_objects.is_null() {
            return CL_INVALID_VALUE;
        }
        let mems: Vec<usize> = slice::from_raw_parts(mem_objects, num_mem_objects as usize)
            .iter()
            .map(|m| m.to_raw())
            .collect();
        st.last_mem_list = Some(mems.clone());
        if mems.iter().any(|&m| !st.live(m, ResourceKind::MemObject)) {
            return CL_INVALID_MEM_OBJECT;
        }
        let code = st.record_wait_list(num_events_in_wait_list, event_wait_list);
        if code != CL_SUCCESS {
            return code;
        }
        st.complete(queue.to_raw(), 0x1206, event);
        CL_SUCCESS
    }

    unsafe fn clCreateUserEvent(&self, context: ClContext, errcode_ret: *mut cl_int) -> ClEvent {
        let (mut st, failure) = self.enter("clCreateUserEvent");
        if let Some(code) = failure {
            return Self::created(errcode_ret, code, 0, ClEvent::from_raw);
        }
        if !st.live(context.to_raw(), ResourceKind::Context) {
            return Self::created(errcode_ret, CL_INVALID_CONTEXT, 0, ClEvent::from_raw);
        }
        let event = st.create(ResourceKind::Event);
        st.set(event, CL_EVENT_COMMAND_QUEUE, usize_bytes(0));
        st.set(event, CL_EVENT_CONTEXT, usize_bytes(context.to_raw()));
        st.set(event, CL_EVENT_COMMAND_TYPE, u32_bytes(0x1204));
        st.set(event, CL_EVENT_COMMAND_EXECUTION_STATUS, i32_bytes(CL_SUBMITTED));
        Self::created(errcode_ret, CL_SUCCESS, event, ClEvent::from_raw)
    }

    unsafe fn clSetUserEventStatus(&self, event: ClEvent, execution_status: cl_int) -> cl_int {
        let (mut st, failure) = self.enter("clSetUserEventStatus");
        if let Some(code) = failure {
            return code;
        }
        if !st.live(event.to_raw(), ResourceKind::Event) {
            return CL_INVALID_EVENT;
        }
        if execution_status > CL_COMPLETE {
            return CL_INVALID_VALUE;
        }
        st.set(event.to_raw(), CL_EVENT_COMMAND_EXECUTION_STATUS, i32_bytes(execution_status));
        CL_SUCCESS
    }

    unsafe fn clWaitForEvents(&self, num_events: cl_uint, event_list: *const ClEvent) -> cl_int {
        let (st, failure) = self.enter("clWaitForEvents");
        if let Some(code) = failure {
            return code;
        }
        if num_events == 0 || event_list.is_null() {
            return CL_INVALID_VALUE;
        }
        let events = slice::from_raw_parts(event_list, num_events as usize);
        for event in events {
            if !st.live(event.to_raw(), ResourceKind::Event) {
                return CL_INVALID_EVENT;
            }
            let status = st.attr(event.to_raw(), CL_EVENT_COMMAND_EXECUTION_STATUS).unwrap();
            if i32::from_ne_bytes(status[..4].try_into().unwrap()) < 0 {
                return CL_EXEC_STATUS_ERROR_FOR_EVENTS_IN_WAIT_LIST;
            }
        }
        CL_SUCCESS
    }

    unsafe fn clGetEventInfo(&self, event: ClEvent, param_name: cl_uint, param_value_size: usize, param_value: *mut c_void, param_value_size_ret: *mut usize) -> cl_int {
        let (st, failure) = self.enter("clGetEventInfo");
        if let Some(code) = failure {
            return code;
        }
        st.info(event.to_raw(), ResourceKind::Event, param_name, param_value_size, param_value, param_value_size_ret)
    }

    unsafe fn clGetEventProfilingInfo(&self, event: ClEvent, param_name: cl_uint, param_value_size: usize, param_value: *mut c_void, param_value_size_ret: *mut usize) -> cl_int {
        let (st, failure) = self.enter("clGetEventProfilingInfo");
        if let Some(code) = failure {
            return code;
        }
        if !st.live(event.to_raw(), ResourceKind::Event) {
            return CL_INVALID_EVENT;
        }
        if st.attr(event.to_raw(), param_name).is_none() {
            return CL_PROFILING_INFO_NOT_AVAILABLE;
        }
        st.info(event.to_raw(), ResourceKind::Event, param_name, param_value_size, param_value, param_value_size_ret)
    }

    unsafe fn clRetainEvent(&self, event: ClEvent) -> cl_int {
        let (mut st, failure) = self.enter("clRetainEvent");
        failure.unwrap_or_else(|| st.retain(event.to_raw(), ResourceKind::Event))
    }

    unsafe fn clReleaseEvent(&self, event: ClEvent) -> cl_int {
        let (mut st, failure) = self.enter("clReleaseEvent");
        failure.unwrap_or_else(|| st.release(event.to_raw(), ResourceKind::Event))
    }

    unsafe fn clEnqueueMarkerWithWaitList(&self, queue: ClCommandQueue, num_events_in_wait_list: cl_uint, event_wait_list: *const ClEvent, event: *mut ClEvent) -> cl_int {
        let (mut st, failure) = self.enter("clEnqueueMarkerWithWaitList");
        if let Some(code) = failure {
            return code;
        }
        if !st.live(queue.to_raw(), ResourceKind::CommandQueue) {
            return CL_INVALID_COMMAND_QUEUE;
        }
        let code = st.record_wait_list(num_events_in_wait_list, event_wait_list);
        if code != CL_SUCCESS {
            return code;
        }
        st.complete(queue.to_raw(), 0x11FE, event);
        CL_SUCCESS
    }

    unsafe fn clEnqueueBarrierWithWaitList(&self, queue: ClCommandQueue, num_events_in_wait_list: cl_uint, event_wait_list: *const ClEvent, event: *mut ClEvent) -> cl_int {
        let (mut st, failure) = self.enter("clEnqueueBarrierWithWaitList");
        if let Some(code) = failure {
            return code;
        }
        if !st.live(queue.to_raw(), ResourceKind::CommandQueue) {
            return CL_INVALID_COMMAND_QUEUE;
        }
        let code = st.record_wait_list(num_events_in_wait_list, event_wait_list);
        if code != CL_SUCCESS {
            return code;
        }
        st.complete(queue.to_raw(), 0x1205, event);
        CL_SUCCESS
    }

    unsafe fn clCreateSampler(&self, context: ClContext, normalized_coords: cl_bool, addressing_mode: cl_uint, filter_mode: cl_uint, errcode_ret: *mut cl_int) -> ClSampler {
        let (mut st, failure) = self.enter("clCreateSampler");
        if let Some(code) = failure {
            return Self::created(errcode_ret, code, 0, ClSampler::from_raw);
        }
        if !st.live(context.to_raw(), ResourceKind::Context) {
            return Self::created(errcode_ret, CL_INVALID_CONTEXT, 0, ClSampler::from_raw);
        }
        let sampler = st.create(ResourceKind::Sampler);
        st.set(sampler, CL_SAMPLER_CONTEXT, usize_bytes(context.to_raw()));
        st.set(sampler, CL_SAMPLER_NORMALIZED_COORDS, u32_bytes(normalized_coords));
        st.set(sampler, CL_SAMPLER_ADDRESSING_MODE, u32_bytes(addressing_mode));
        st.set(sampler, CL_SAMPLER_FILTER_MODE, u32_bytes(filter_mode));
        Self::created(errcode_ret, CL_SUCCESS, sampler, ClSampler::from_raw)
    }

    unsafe fn clGetSamplerInfo(&self, sampler: ClSampler, param_name: cl_uint, param_value_size: usize, param_value: *mut c_void, param_value_size_ret: *mut usize) -> cl_int {
        let (st, failure) = self.enter("clGetSamplerInfo");
        if let Some(code) = failure {
            return code;
        }
        st.info(sampler.to_raw(), ResourceKind::Sampler, param_name, param_value_size, param_value, param_value_size_ret)
    }

    unsafe fn clRetainSampler(&self, sampler: ClSampler) -> cl_int {
        let (mut st, failure) = self.enter("clRetainSampler");
        failure.unwrap_or_else(|| st.retain(sampler.to_raw(), ResourceKind::Sampler))
    }

    unsafe fn clReleaseSampler(&self, sampler: ClSampler) -> cl_int {
        let (mut st, failure) = self.enter("clReleaseSampler");
        failure.unwrap_or_else(|| st.release(sampler.to_raw(), ResourceKind::Sampler))
    }
}
