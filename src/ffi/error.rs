//! Status code translation for FFI.
//!
//! Every native call site routes its status code through [`check`] before
//! trusting anything the call wrote into its output parameters.

use std::fmt;

use super::raw::*;

macro_rules! define_status {
    ($($variant:ident = $code:ident,)*) => {
        /// A failure status reported by the native library.
        ///
        /// Displays as the native constant name.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum Status {
            $(
                #[doc = concat!("`", stringify!($code), "`")]
                $variant,
            )*
            /// A negative code outside the known table.
            Unrecognized(cl_int),
        }

        impl fmt::Display for Status {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                match self {
                    $(Status::$variant => f.write_str(stringify!($code)),)*
                    Status::Unrecognized(code) => write!(f, "unrecognized status code {}", code),
                }
            }
        }

        impl std::error::Error for Status {}

        impl Status {
            /// Translate a failure code. Returns `None` for success codes.
            pub fn from_code(code: cl_int) -> Option<Status> {
                if code >= CL_SUCCESS {
                    return None;
                }
                Some(match code {
                    $($code => Status::$variant,)*
                    other => Status::Unrecognized(other),
                })
            }

            /// The native code this status was decoded from.
            pub fn code(self) -> cl_int {
                match self {
                    $(Status::$variant => $code,)*
                    Status::Unrecognized(code) => code,
                }
            }
        }
    };
}

define_status! {
    DeviceNotFound = CL_DEVICE_NOT_FOUND,
    DeviceNotAvailable = CL_DEVICE_NOT_AVAILABLE,
    CompilerNotAvailable = CL_COMPILER_NOT_AVAILABLE,
    MemObjectAllocationFailure = CL_MEM_OBJECT_ALLOCATION_FAILURE,
    OutOfResources = CL_OUT_OF_RESOURCES,
    OutOfHostMemory = CL_OUT_OF_HOST_MEMORY,
    ProfilingInfoNotAvailable = CL_PROFILING_INFO_NOT_AVAILABLE,
    MemCopyOverlap = CL_MEM_COPY_OVERLAP,
    ImageFormatMismatch = CL_IMAGE_FORMAT_MISMATCH,
    ImageFormatNotSupported = CL_IMAGE_FORMAT_NOT_SUPPORTED,
    BuildProgramFailure = CL_BUILD_PROGRAM_FAILURE,
    MapFailure = CL_MAP_FAILURE,
    MisalignedSubBufferOffset = CL_MISALIGNED_SUB_BUFFER_OFFSET,
    ExecStatusErrorForEventsInWaitList = CL_EXEC_STATUS_ERROR_FOR_EVENTS_IN_WAIT_LIST,
    CompileProgramFailure = CL_COMPILE_PROGRAM_FAILURE,
    LinkerNotAvailable = CL_LINKER_NOT_AVAILABLE,
    LinkProgramFailure = CL_LINK_PROGRAM_FAILURE,
    DevicePartitionFailed = CL_DEVICE_PARTITION_FAILED,
    KernelArgInfoNotAvailable = CL_KERNEL_ARG_INFO_NOT_AVAILABLE,
    InvalidArgument = CL_INVALID_VALUE,
    InvalidDeviceType = CL_INVALID_DEVICE_TYPE,
    InvalidPlatform = CL_INVALID_PLATFORM,
    InvalidDevice = CL_INVALID_DEVICE,
    InvalidContext = CL_INVALID_CONTEXT,
    InvalidQueueProperties = CL_INVALID_QUEUE_PROPERTIES,
    InvalidCommandQueue = CL_INVALID_COMMAND_QUEUE,
    InvalidHostPtr = CL_INVALID_HOST_PTR,
    InvalidMemObject = CL_INVALID_MEM_OBJECT,
    InvalidImageFormatDescriptor = CL_INVALID_IMAGE_FORMAT_DESCRIPTOR,
    InvalidImageSize = CL_INVALID_IMAGE_SIZE,
    InvalidSampler = CL_INVALID_SAMPLER,
    InvalidBinary = CL_INVALID_BINARY,
    InvalidBuildOptions = CL_INVALID_BUILD_OPTIONS,
    InvalidProgram = CL_INVALID_PROGRAM,
    InvalidProgramExecutable = CL_INVALID_PROGRAM_EXECUTABLE,
    InvalidKernelName = CL_INVALID_KERNEL_NAME,
    InvalidKernelDefinition = CL_INVALID_KERNEL_DEFINITION,
    InvalidKernel = CL_INVALID_KERNEL,
    InvalidArgIndex = CL_INVALID_ARG_INDEX,
    InvalidArgValue = CL_INVALID_ARG_VALUE,
    InvalidArgSize = CL_INVALID_ARG_SIZE,
    InvalidKernelArgs = CL_INVALID_KERNEL_ARGS,
    InvalidWorkDimension = CL_INVALID_WORK_DIMENSION,
    InvalidWorkGroupSize = CL_INVALID_WORK_GROUP_SIZE,
    InvalidWorkItemSize = CL_INVALID_WORK_ITEM_SIZE,
    InvalidGlobalOffset = CL_INVALID_GLOBAL_OFFSET,
    InvalidEventWaitList = CL_INVALID_EVENT_WAIT_LIST,
    InvalidEvent = CL_INVALID_EVENT,
    InvalidOperation = CL_INVALID_OPERATION,
    InvalidGlObject = CL_INVALID_GL_OBJECT,
    InvalidBufferSize = CL_INVALID_BUFFER_SIZE,
    InvalidMipLevel = CL_INVALID_MIP_LEVEL,
    InvalidGlobalWorkSize = CL_INVALID_GLOBAL_WORK_SIZE,
    InvalidProperty = CL_INVALID_PROPERTY,
    InvalidImageDescriptor = CL_INVALID_IMAGE_DESCRIPTOR,
    InvalidCompilerOptions = CL_INVALID_COMPILER_OPTIONS,
    InvalidLinkerOptions = CL_INVALID_LINKER_OPTIONS,
    InvalidDevicePartitionCount = CL_INVALID_DEVICE_PARTITION_COUNT,
}

impl Status {
    /// Whether this status reports a failed build, compile or link.
    pub fn is_build_failure(self) -> bool {
        matches!(
            self,
            Status::BuildProgramFailure | Status::CompileProgramFailure | Status::LinkProgramFailure
        )
    }

    /// Whether this status reports a handle the native library does not recognise.
    pub fn is_invalid_object(self) -> bool {
        matches!(
            self,
            Status::InvalidPlatform
                | Status::InvalidDevice
                | Status::InvalidContext
                | Status::InvalidCommandQueue
                | Status::InvalidMemObject
                | Status::InvalidSampler
                | Status::InvalidProgram
                | Status::InvalidKernel
                | Status::InvalidEvent
        )
    }
}

/// Check a native status code.
///
/// Zero and positive codes are success.
#[inline]
pub fn check(code: cl_int) -> Result<(), Status> {
    match Status::from_code(code) {
        None => Ok(()),
        Some(status) => Err(status),
    }
}

/// Check a native status code and attach the name of the entry point.
#[inline]
pub(crate) fn check_call(code: cl_int, op: &'static str) -> crate::Result<()> {
    check(code).map_err(|status| crate::Error::Native { op, status })
}
