//! Type definitions, flag sets and enums.

use bitflags::bitflags;

use crate::ffi::{self, cl_image_desc, cl_image_format, cl_int, cl_uint};

bitflags! {
    /// Device categories for enumeration.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct DeviceType: ffi::cl_device_type {
        const DEFAULT = ffi::CL_DEVICE_TYPE_DEFAULT;
        const CPU = ffi::CL_DEVICE_TYPE_CPU;
        const GPU = ffi::CL_DEVICE_TYPE_GPU;
        const ACCELERATOR = ffi::CL_DEVICE_TYPE_ACCELERATOR;
        const CUSTOM = ffi::CL_DEVICE_TYPE_CUSTOM;
        const ALL = ffi::CL_DEVICE_TYPE_ALL;
    }
}

bitflags! {
    /// Allocation and access flags for memory objects.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct MemFlags: ffi::cl_mem_flags {
        const READ_WRITE = ffi::CL_MEM_READ_WRITE;
        const WRITE_ONLY = ffi::CL_MEM_WRITE_ONLY;
        const READ_ONLY = ffi::CL_MEM_READ_ONLY;
        const USE_HOST_PTR = ffi::CL_MEM_USE_HOST_PTR;
        const ALLOC_HOST_PTR = ffi::CL_MEM_ALLOC_HOST_PTR;
        const COPY_HOST_PTR = ffi::CL_MEM_COPY_HOST_PTR;
        const HOST_WRITE_ONLY = ffi::CL_MEM_HOST_WRITE_ONLY;
        const HOST_READ_ONLY = ffi::CL_MEM_HOST_READ_ONLY;
        const HOST_NO_ACCESS = ffi::CL_MEM_HOST_NO_ACCESS;
    }
}

bitflags! {
    /// Access requested when mapping a buffer.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct MapFlags: ffi::cl_map_flags {
        const READ = ffi::CL_MAP_READ;
        const WRITE = ffi::CL_MAP_WRITE;
        const WRITE_INVALIDATE_REGION = ffi::CL_MAP_WRITE_INVALIDATE_REGION;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct CommandQueueProperties: ffi::cl_command_queue_properties {
        const OUT_OF_ORDER_EXEC_MODE_ENABLE = ffi::CL_QUEUE_OUT_OF_ORDER_EXEC_MODE_ENABLE;
        const PROFILING_ENABLE = ffi::CL_QUEUE_PROFILING_ENABLE;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct MigrationFlags: ffi::cl_mem_migration_flags {
        const HOST = ffi::CL_MIGRATE_MEM_OBJECT_HOST;
        const CONTENT_UNDEFINED = ffi::CL_MIGRATE_MEM_OBJECT_CONTENT_UNDEFINED;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct DeviceExecCapabilities: ffi::cl_device_exec_capabilities {
        const KERNEL = ffi::CL_EXEC_KERNEL;
        const NATIVE_KERNEL = ffi::CL_EXEC_NATIVE_KERNEL;
    }
}

/// Declare a `cl_uint`/`cl_int` backed enum with a fallible conversion.
macro_rules! native_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident: $repr:ty {
            $($(#[$vmeta:meta])* $variant:ident = $code:path,)*
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($(#[$vmeta])* $variant,)*
        }

        impl $name {
            /// Decode a native value. Returns `None` for unknown values.
            pub fn from_raw(raw: $repr) -> Option<Self> {
                match raw {
                    $(v if v == $code => Some($name::$variant),)*
                    _ => None,
                }
            }

            /// The native value.
            pub fn to_raw(self) -> $repr {
                match self {
                    $($name::$variant => $code,)*
                }
            }
        }
    };
}

native_enum! {
    /// How out-of-range image coordinates are handled.
    pub enum AddressingMode: cl_uint {
        None = ffi::CL_ADDRESS_NONE,
        ClampToEdge = ffi::CL_ADDRESS_CLAMP_TO_EDGE,
        Clamp = ffi::CL_ADDRESS_CLAMP,
        Repeat = ffi::CL_ADDRESS_REPEAT,
        MirroredRepeat = ffi::CL_ADDRESS_MIRRORED_REPEAT,
    }
}

native_enum! {
    pub enum FilterMode: cl_uint {
        Nearest = ffi::CL_FILTER_NEAREST,
        Linear = ffi::CL_FILTER_LINEAR,
    }
}

native_enum! {
    /// Build state of a program on one device.
    pub enum BuildStatus: cl_int {
        Success = ffi::CL_BUILD_SUCCESS,
        None = ffi::CL_BUILD_NONE,
        Error = ffi::CL_BUILD_ERROR,
        InProgress = ffi::CL_BUILD_IN_PROGRESS,
    }
}

native_enum! {
    pub enum MemObjectType: cl_uint {
        Buffer = ffi::CL_MEM_OBJECT_BUFFER,
        Image2d = ffi::CL_MEM_OBJECT_IMAGE2D,
        Image3d = ffi::CL_MEM_OBJECT_IMAGE3D,
        Image2dArray = ffi::CL_MEM_OBJECT_IMAGE2D_ARRAY,
        Image1d = ffi::CL_MEM_OBJECT_IMAGE1D,
        Image1dArray = ffi::CL_MEM_OBJECT_IMAGE1D_ARRAY,
        Image1dBuffer = ffi::CL_MEM_OBJECT_IMAGE1D_BUFFER,
    }
}

native_enum! {
    /// Address space of a kernel argument.
    pub enum KernelArgAddressQualifier: cl_uint {
        Global = ffi::CL_KERNEL_ARG_ADDRESS_GLOBAL,
        Local = ffi::CL_KERNEL_ARG_ADDRESS_LOCAL,
        Constant = ffi::CL_KERNEL_ARG_ADDRESS_CONSTANT,
        Private = ffi::CL_KERNEL_ARG_ADDRESS_PRIVATE,
    }
}

native_enum! {
    /// Image access qualifier of a kernel argument.
    pub enum KernelArgAccessQualifier: cl_uint {
        ReadOnly = ffi::CL_KERNEL_ARG_ACCESS_READ_ONLY,
        WriteOnly = ffi::CL_KERNEL_ARG_ACCESS_WRITE_ONLY,
        ReadWrite = ffi::CL_KERNEL_ARG_ACCESS_READ_WRITE,
        None = ffi::CL_KERNEL_ARG_ACCESS_NONE,
    }
}

/// Execution state of the command behind an event.
///
/// Negative native values report abnormal termination and decode to
/// [`CommandExecutionStatus::Error`] with the code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandExecutionStatus {
    Complete,
    Running,
    Submitted,
    Queued,
    Error(cl_int),
}

impl CommandExecutionStatus {
    pub fn from_raw(raw: cl_int) -> Option<Self> {
        match raw {
            ffi::CL_COMPLETE => Some(Self::Complete),
            ffi::CL_RUNNING => Some(Self::Running),
            ffi::CL_SUBMITTED => Some(Self::Submitted),
            ffi::CL_QUEUED => Some(Self::Queued),
            code if code < 0 => Some(Self::Error(code)),
            _ => None,
        }
    }

    pub fn to_raw(self) -> cl_int {
        match self {
            Self::Complete => ffi::CL_COMPLETE,
            Self::Running => ffi::CL_RUNNING,
            Self::Submitted => ffi::CL_SUBMITTED,
            Self::Queued => ffi::CL_QUEUED,
            Self::Error(code) => code,
        }
    }
}

/// Event profiling counters, in device nanoseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProfilingInfo {
    Queued,
    Submit,
    Start,
    End,
}

/// Per-device kernel work-group queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WorkGroupInfo {
    /// `size_t`
    WorkGroupSize,
    /// `size_t[3]`
    CompileWorkGroupSize,
    /// `cl_ulong`
    LocalMemSize,
    /// `size_t`
    PreferredWorkGroupSizeMultiple,
    /// `cl_ulong`
    PrivateMemSize,
}

/// A 3D offset, in bytes along x and in rows/slices along y and z.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct BufferCoords {
    pub x: usize,
    pub y: usize,
    pub z: usize,
}

impl BufferCoords {
    pub fn new(x: usize, y: usize, z: usize) -> Self {
        Self { x, y, z }
    }

    pub(crate) fn to_array(self) -> [usize; 3] {
        [self.x, self.y, self.z]
    }
}

/// A 3D extent: width in bytes, height in rows, depth in slices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferRegion {
    pub width: usize,
    pub height: usize,
    pub depth: usize,
}

impl BufferRegion {
    pub fn new(width: usize, height: usize, depth: usize) -> Self {
        Self {
            width,
            height,
            depth,
        }
    }

    /// Number of bytes covered by the region when tightly packed.
    pub fn packed_len(&self) -> Option<usize> {
        self.width.checked_mul(self.height)?.checked_mul(self.depth)
    }

    pub(crate) fn to_array(self) -> [usize; 3] {
        [self.width, self.height, self.depth]
    }
}

/// Row and slice pitch of one side of a rectangular transfer.
///
/// Zero lets the native library compute a tightly packed pitch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Pitch {
    pub row: usize,
    pub slice: usize,
}

impl Pitch {
    /// One past the last byte a rectangle at `origin` touches, or `None`
    /// on overflow. Zero pitches resolve to tightly packed ones.
    pub fn extent(&self, origin: BufferCoords, region: BufferRegion) -> Option<usize> {
        if region.width == 0 || region.height == 0 || region.depth == 0 {
            return Some(0);
        }
        let row = if self.row == 0 { region.width } else { self.row };
        let slice = if self.slice == 0 {
            row.checked_mul(region.height)?
        } else {
            self.slice
        };
        let last_slice = origin.z.checked_add(region.depth - 1)?.checked_mul(slice)?;
        let last_row = origin.y.checked_add(region.height - 1)?.checked_mul(row)?;
        last_slice
            .checked_add(last_row)?
            .checked_add(origin.x)?
            .checked_add(region.width)
    }
}

/// Image channel order and data type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ImageFormat {
    pub channel_order: cl_uint,
    pub channel_data_type: cl_uint,
}

impl ImageFormat {
    pub fn new(channel_order: cl_uint, channel_data_type: cl_uint) -> Self {
        Self {
            channel_order,
            channel_data_type,
        }
    }

    pub(crate) fn to_raw(self) -> cl_image_format {
        cl_image_format {
            image_channel_order: self.channel_order,
            image_channel_data_type: self.channel_data_type,
        }
    }
}

impl From<cl_image_format> for ImageFormat {
    fn from(raw: cl_image_format) -> Self {
        Self::new(raw.image_channel_order, raw.image_channel_data_type)
    }
}

/// Image shape for [`MemObject::image`](crate::MemObject::image).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageDesc {
    pub image_type: MemObjectType,
    pub width: usize,
    pub height: usize,
    pub depth: usize,
    pub array_size: usize,
    pub row_pitch: usize,
    pub slice_pitch: usize,
}

impl ImageDesc {
    /// A 2D image with packed rows.
    pub fn image2d(width: usize, height: usize) -> Self {
        Self {
            image_type: MemObjectType::Image2d,
            width,
            height,
            depth: 1,
            array_size: 1,
            row_pitch: 0,
            slice_pitch: 0,
        }
    }

    pub(crate) fn to_raw(self) -> cl_image_desc {
        cl_image_desc {
            image_type: self.image_type.to_raw(),
            image_width: self.width,
            image_height: self.height,
            image_depth: self.depth,
            image_array_size: self.array_size,
            image_row_pitch: self.row_pitch,
            image_slice_pitch: self.slice_pitch,
            num_mip_levels: 0,
            num_samples: 0,
            buffer: std::ptr::null_mut(),
        }
    }
}

mod sealed {
    pub trait Sealed {}
}

/// Plain values that may be passed by value as kernel arguments.
pub trait Scalar: sealed::Sealed + Copy + Send + Sync + 'static {}

macro_rules! scalars {
    ($($ty:ty),*) => {
        $(
            impl sealed::Sealed for $ty {}
            impl Scalar for $ty {}
            impl<const N: usize> sealed::Sealed for [$ty; N] {}
            impl<const N: usize> Scalar for [$ty; N] {}
        )*
    };
}

scalars!(i8, u8, i16, u16, i32, u32, i64, u64, f32, f64);
