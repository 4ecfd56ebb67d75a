//! The native entry point table.
//!
//! [`ClApi`] has one method per C entry point, with the exact C signature.
//! [`ClLibrary`] implements it by resolving every symbol from a dynamically
//! loaded library. Other implementations (alternative drivers, in-process
//! fakes) can be handed to [`Runtime::with_api`](crate::Runtime::with_api).

#![allow(non_snake_case)]
#![allow(clippy::too_many_arguments)]

use std::ffi::OsStr;
use std::os::raw::{c_char, c_void};

use libloading::Library;

use super::handles::*;
use super::raw::*;

macro_rules! entry_points {
    ($(
        $(#[$meta:meta])*
        fn $name:ident($($arg:ident: $ty:ty),* $(,)?) -> $ret:ty;
    )*) => {
        /// The native C ABI, one method per entry point.
        ///
        /// # Safety
        ///
        /// Implementors must follow the documented native semantics: status
        /// codes, output parameters written only on success, and reference
        /// counting (create returns a count of one, release decrements).
        pub unsafe trait ClApi: Send + Sync {
            $(
                $(#[$meta])*
                unsafe fn $name(&self, $($arg: $ty),*) -> $ret;
            )*
        }

        /// A native library loaded at runtime.
        pub struct ClLibrary {
            $($name: unsafe extern "C" fn($($ty),*) -> $ret,)*
            _library: Library,
        }

        impl ClLibrary {
            /// Load the library at `path` and resolve every entry point.
            ///
            /// # Safety
            ///
            /// Loading a library runs its initialisers, and the resolved
            /// symbols are trusted to have the declared C signatures.
            pub unsafe fn open(path: impl AsRef<OsStr>) -> Result<Self, libloading::Error> {
                let library = Library::new(path)?;
                $(
                    let $name = *library.get::<unsafe extern "C" fn($($ty),*) -> $ret>(
                        concat!(stringify!($name), "\0").as_bytes(),
                    )?;
                )*
                Ok(Self {
                    $($name,)*
                    _library: library,
                })
            }
        }

        unsafe impl ClApi for ClLibrary {
            $(
                #[inline]
                unsafe fn $name(&self, $($arg: $ty),*) -> $ret {
                    (self.$name)($($arg),*)
                }
            )*
        }
    };
}

entry_points! {
    // Platform
    fn clGetPlatformIDs(
        num_entries: cl_uint,
        platforms: *mut ClPlatform,
        num_platforms: *mut cl_uint,
    ) -> cl_int;
    fn clGetPlatformInfo(
        platform: ClPlatform,
        param_name: cl_uint,
        param_value_size: usize,
        param_value: *mut c_void,
        param_value_size_ret: *mut usize,
    ) -> cl_int;

    // Device
    fn clGetDeviceIDs(
        platform: ClPlatform,
        device_type: cl_device_type,
        num_entries: cl_uint,
        devices: *mut ClDevice,
        num_devices: *mut cl_uint,
    ) -> cl_int;
    fn clGetDeviceInfo(
        device: ClDevice,
        param_name: cl_uint,
        param_value_size: usize,
        param_value: *mut c_void,
        param_value_size_ret: *mut usize,
    ) -> cl_int;
    fn clCreateSubDevices(
        in_device: ClDevice,
        properties: *const cl_device_partition_property,
        num_devices: cl_uint,
        out_devices: *mut ClDevice,
        num_devices_ret: *mut cl_uint,
    ) -> cl_int;
    fn clRetainDevice(device: ClDevice) -> cl_int;
    fn clReleaseDevice(device: ClDevice) -> cl_int;

    // Context
    fn clCreateContext(
        properties: *const cl_context_properties,
        num_devices: cl_uint,
        devices: *const ClDevice,
        pfn_notify: ContextCallback,
        user_data: *mut c_void,
        errcode_ret: *mut cl_int,
    ) -> ClContext;
    fn clGetContextInfo(
        context: ClContext,
        param_name: cl_uint,
        param_value_size: usize,
        param_value: *mut c_void,
        param_value_size_ret: *mut usize,
    ) -> cl_int;
    fn clRetainContext(context: ClContext) -> cl_int;
    fn clReleaseContext(context: ClContext) -> cl_int;

    // Command queue
    fn clCreateCommandQueue(
        context: ClContext,
        device: ClDevice,
        properties: cl_command_queue_properties,
        errcode_ret: *mut cl_int,
    ) -> ClCommandQueue;
    fn clGetCommandQueueInfo(
        queue: ClCommandQueue,
        param_name: cl_uint,
        param_value_size: usize,
        param_value: *mut c_void,
        param_value_size_ret: *mut usize,
    ) -> cl_int;
    fn clRetainCommandQueue(queue: ClCommandQueue) -> cl_int;
    fn clReleaseCommandQueue(queue: ClCommandQueue) -> cl_int;
    fn clFlush(queue: ClCommandQueue) -> cl_int;
    fn clFinish(queue: ClCommandQueue) -> cl_int;

    // Program
    fn clCreateProgramWithSource(
        context: ClContext,
        count: cl_uint,
        strings: *const *const c_char,
        lengths: *const usize,
        errcode_ret: *mut cl_int,
    ) -> ClProgram;
    fn clCreateProgramWithBinary(
        context: ClContext,
        num_devices: cl_uint,
        device_list: *const ClDevice,
        lengths: *const usize,
        binaries: *const *const u8,
        binary_status: *mut cl_int,
        errcode_ret: *mut cl_int,
    ) -> ClProgram;
    fn clBuildProgram(
        program: ClProgram,
        num_devices: cl_uint,
        device_list: *const ClDevice,
        options: *const c_char,
        pfn_notify: ProgramCallback,
        user_data: *mut c_void,
    ) -> cl_int;
    fn clCompileProgram(
        program: ClProgram,
        num_devices: cl_uint,
        device_list: *const ClDevice,
        options: *const c_char,
        num_input_headers: cl_uint,
        input_headers: *const ClProgram,
        header_include_names: *const *const c_char,
        pfn_notify: ProgramCallback,
        user_data: *mut c_void,
    ) -> cl_int;
    fn clLinkProgram(
        context: ClContext,
        num_devices: cl_uint,
        device_list: *const ClDevice,
        options: *const c_char,
        num_input_programs: cl_uint,
        input_programs: *const ClProgram,
        pfn_notify: ProgramCallback,
        user_data: *mut c_void,
        errcode_ret: *mut cl_int,
    ) -> ClProgram;
    fn clGetProgramInfo(
        program: ClProgram,
        param_name: cl_uint,
        param_value_size: usize,
        param_value: *mut c_void,
        param_value_size_ret: *mut usize,
    ) -> cl_int;
    fn clGetProgramBuildInfo(
        program: ClProgram,
        device: ClDevice,
        param_name: cl_uint,
        param_value_size: usize,
        param_value: *mut c_void,
        param_value_size_ret: *mut usize,
    ) -> cl_int;
    fn clRetainProgram(program: ClProgram) -> cl_int;
    fn clReleaseProgram(program: ClProgram) -> cl_int;

    // Kernel
    fn clCreateKernel(
        program: ClProgram,
        kernel_name: *const c_char,
        errcode_ret: *mut cl_int,
    ) -> ClKernel;
    fn clCreateKernelsInProgram(
        program: ClProgram,
        num_kernels: cl_uint,
        kernels: *mut ClKernel,
        num_kernels_ret: *mut cl_uint,
    ) -> cl_int;
    fn clSetKernelArg(
        kernel: ClKernel,
        arg_index: cl_uint,
        arg_size: usize,
        arg_value: *const c_void,
    ) -> cl_int;
    fn clGetKernelInfo(
        kernel: ClKernel,
        param_name: cl_uint,
        param_value_size: usize,
        param_value: *mut c_void,
        param_value_size_ret: *mut usize,
    ) -> cl_int;
    fn clGetKernelArgInfo(
        kernel: ClKernel,
        arg_index: cl_uint,
        param_name: cl_uint,
        param_value_size: usize,
        param_value: *mut c_void,
        param_value_size_ret: *mut usize,
    ) -> cl_int;
    fn clGetKernelWorkGroupInfo(
        kernel: ClKernel,
        device: ClDevice,
        param_name: cl_uint,
        param_value_size: usize,
        param_value: *mut c_void,
        param_value_size_ret: *mut usize,
    ) -> cl_int;
    fn clRetainKernel(kernel: ClKernel) -> cl_int;
    fn clReleaseKernel(kernel: ClKernel) -> cl_int;
    fn clEnqueueNDRangeKernel(
        queue: ClCommandQueue,
        kernel: ClKernel,
        work_dim: cl_uint,
        global_work_offset: *const usize,
        global_work_size: *const usize,
        local_work_size: *const usize,
        num_events_in_wait_list: cl_uint,
        event_wait_list: *const ClEvent,
        event: *mut ClEvent,
    ) -> cl_int;

    // Memory objects
    fn clCreateBuffer(
        context: ClContext,
        flags: cl_mem_flags,
        size: usize,
        host_ptr: *mut c_void,
        errcode_ret: *mut cl_int,
    ) -> ClMem;
    fn clCreateSubBuffer(
        buffer: ClMem,
        flags: cl_mem_flags,
        buffer_create_type: cl_uint,
        buffer_create_info: *const c_void,
        errcode_ret: *mut cl_int,
    ) -> ClMem;
    fn clCreateImage(
        context: ClContext,
        flags: cl_mem_flags,
        image_format: *const cl_image_format,
        image_desc: *const cl_image_desc,
        host_ptr: *mut c_void,
        errcode_ret: *mut cl_int,
    ) -> ClMem;
    fn clGetMemObjectInfo(
        memobj: ClMem,
        param_name: cl_uint,
        param_value_size: usize,
        param_value: *mut c_void,
        param_value_size_ret: *mut usize,
    ) -> cl_int;
    fn clGetImageInfo(
        image: ClMem,
        param_name: cl_uint,
        param_value_size: usize,
        param_value: *mut c_void,
        param_value_size_ret: *mut usize,
    ) -> cl_int;
    fn clRetainMemObject(memobj: ClMem) -> cl_int;
    fn clReleaseMemObject(memobj: ClMem) -> cl_int;
    fn clEnqueueReadBuffer(
        queue: ClCommandQueue,
        buffer: ClMem,
        blocking_read: cl_bool,
        offset: usize,
        size: usize,
        ptr: *mut c_void,
        num_events_in_wait_list: cl_uint,
        event_wait_list: *const ClEvent,
        event: *mut ClEvent,
    ) -> cl_int;
    fn clEnqueueWriteBuffer(
        queue: ClCommandQueue,
        buffer: ClMem,
        blocking_write: cl_bool,
        offset: usize,
        size: usize,
        ptr: *const c_void,
        num_events_in_wait_list: cl_uint,
        event_wait_list: *const ClEvent,
        event: *mut ClEvent,
    ) -> cl_int;
    fn clEnqueueReadBufferRect(
        queue: ClCommandQueue,
        buffer: ClMem,
        blocking_read: cl_bool,
        buffer_origin: *const usize,
        host_origin: *const usize,
        region: *const usize,
        buffer_row_pitch: usize,
        buffer_slice_pitch: usize,
        host_row_pitch: usize,
        host_slice_pitch: usize,
        ptr: *mut c_void,
        num_events_in_wait_list: cl_uint,
        event_wait_list: *const ClEvent,
        event: *mut ClEvent,
    ) -> cl_int;
    fn clEnqueueWriteBufferRect(
        queue: ClCommandQueue,
        buffer: ClMem,
        blocking_write: cl_bool,
        buffer_origin: *const usize,
        host_origin: *const usize,
        region: *const usize,
        buffer_row_pitch: usize,
        buffer_slice_pitch: usize,
        host_row_pitch: usize,
        host_slice_pitch: usize,
        ptr: *const c_void,
        num_events_in_wait_list: cl_uint,
        event_wait_list: *const ClEvent,
        event: *mut ClEvent,
    ) -> cl_int;
    fn clEnqueueCopyBuffer(
        queue: ClCommandQueue,
        src_buffer: ClMem,
        dst_buffer: ClMem,
        src_offset: usize,
        dst_offset: usize,
        size: usize,
        num_events_in_wait_list: cl_uint,
        event_wait_list: *const ClEvent,
        event: *mut ClEvent,
    ) -> cl_int;
    fn clEnqueueFillBuffer(
        queue: ClCommandQueue,
        buffer: ClMem,
        pattern: *const c_void,
        pattern_size: usize,
        offset: usize,
        size: usize,
        num_events_in_wait_list: cl_uint,
        event_wait_list: *const ClEvent,
        event: *mut ClEvent,
    ) -> cl_int;
    fn clEnqueueMapBuffer(
        queue: ClCommandQueue,
        buffer: ClMem,
        blocking_map: cl_bool,
        map_flags: cl_map_flags,
        offset: usize,
        size: usize,
        num_events_in_wait_list: cl_uint,
        event_wait_list: *const ClEvent,
        event: *mut ClEvent,
        errcode_ret: *mut cl_int,
    ) -> *mut c_void;
    fn clEnqueueUnmapMemObject(
        queue: ClCommandQueue,
        memobj: ClMem,
        mapped_ptr: *mut c_void,
        num_events_in_wait_list: cl_uint,
        event_wait_list: *const ClEvent,
        event: *mut ClEvent,
    ) -> cl_int;
    fn clEnqueueMigrateMemObjects(
        queue: ClCommandQueue,
        num_mem_objects: cl_uint,
        mem_objects: *const ClMem,
        flags: cl_mem_migration_flags,
        num_events_in_wait_list: cl_uint,
        event_wait_list: *const ClEvent,
        event: *mut ClEvent,
    ) -> cl_int;

    // Event
    fn clCreateUserEvent(context: ClContext, errcode_ret: *mut cl_int) -> ClEvent;
    fn clSetUserEventStatus(event: ClEvent, execution_status: cl_int) -> cl_int;
    fn clWaitForEvents(num_events: cl_uint, event_list: *const ClEvent) -> cl_int;
    fn clGetEventInfo(
        event: ClEvent,
        param_name: cl_uint,
        param_value_size: usize,
        param_value: *mut c_void,
        param_value_size_ret: *mut usize,
    ) -> cl_int;
    fn clGetEventProfilingInfo(
        event: ClEvent,
        param_name: cl_uint,
        param_value_size: usize,
        param_value: *mut c_void,
        param_value_size_ret: *mut usize,
    ) -> cl_int;
    fn clRetainEvent(event: ClEvent) -> cl_int;
    fn clReleaseEvent(event: ClEvent) -> cl_int;
    fn clEnqueueMarkerWithWaitList(
        queue: ClCommandQueue,
        num_events_in_wait_list: cl_uint,
        event_wait_list: *const ClEvent,
        event: *mut ClEvent,
    ) -> cl_int;
    fn clEnqueueBarrierWithWaitList(
        queue: ClCommandQueue,
        num_events_in_wait_list: cl_uint,
        event_wait_list: *const ClEvent,
        event: *mut ClEvent,
    ) -> cl_int;

    // Sampler
    fn clCreateSampler(
        context: ClContext,
        normalized_coords: cl_bool,
        addressing_mode: cl_uint,
        filter_mode: cl_uint,
        errcode_ret: *mut cl_int,
    ) -> ClSampler;
    fn clGetSamplerInfo(
        sampler: ClSampler,
        param_name: cl_uint,
        param_value_size: usize,
        param_value: *mut c_void,
        param_value_size_ret: *mut usize,
    ) -> cl_int;
    fn clRetainSampler(sampler: ClSampler) -> cl_int;
    fn clReleaseSampler(sampler: ClSampler) -> cl_int;
}
