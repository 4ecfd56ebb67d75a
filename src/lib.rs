//! Safe Rust bindings for an OpenCL-style compute library.
//!
//! The native library is loaded at runtime. Every native object is wrapped
//! in a facade ([`Context`], [`CommandQueue`], [`MemObject`], ...) that owns
//! exactly one native reference and releases it exactly once, attribute
//! queries are typed, and lists of handles are pinned for the duration of
//! the native call that uses them.
//!
//! # Example
//!
//! ```no_run
//! use clbind::{CommandQueue, Context, DeviceType, Kernel, MemFlags, MemObject, Program, Runtime};
//!
//! fn main() -> clbind::Result<()> {
//!     let runtime = Runtime::load()?;
//!     let platform = runtime.platforms()?.into_iter().next().expect("no platform");
//!     let device = platform.devices(DeviceType::ALL)?.into_iter().next().expect("no device");
//!     println!("running on {}", device.name()?);
//!
//!     let context = Context::new(&[&device])?;
//!     let queue = CommandQueue::new(&context, &device, Default::default())?;
//!
//!     let program = Program::with_source(
//!         &context,
//!         &["__kernel void twice(__global int *v) { v[get_global_id(0)] *= 2; }"],
//!     )?;
//!     program.build(None, "")?;
//!     let kernel = Kernel::new(&program, "twice")?;
//!
//!     let input: Vec<u8> = [1i32, 2, 3, 4].iter().flat_map(|v| v.to_ne_bytes()).collect();
//!     let buffer = MemObject::buffer_from_host(&context, MemFlags::READ_WRITE, &input)?;
//!     kernel.set_arg_mem(0, &buffer)?;
//!
//!     let done = queue.enqueue_kernel(&kernel, &[4], None, None, None)?;
//!     let mut output = vec![0u8; input.len()];
//!     queue.read_buffer(&buffer, 0, &mut output, Some(&[&done]))?;
//!     Ok(())
//! }
//! ```
//!
//! # Loading
//!
//! [`Runtime::load`] locates the library through [`Options::from_env`]:
//! `CLBIND_LIBRARY` overrides the platform default name. Any other
//! [`ffi::ClApi`] implementation can be driven through [`Runtime::with_api`].

pub mod config;
pub mod context;
pub mod device;
pub mod error;
pub mod event;
pub mod ffi;
pub mod handle;
pub mod info;
pub mod kernel;
pub mod marshal;
pub mod mem;
pub mod platform;
pub mod program;
pub mod queue;
pub mod runtime;
pub mod sampler;
pub mod types;

// Re-export main types at the crate root
pub use config::Options;
pub use context::Context;
pub use device::Device;
pub use error::{Error, Result};
pub use event::Event;
pub use ffi::Status;
pub use handle::{OwnedHandle, Released, ResourceKind};
pub use info::{Attribute, InfoKind};
pub use kernel::Kernel;
pub use mem::MemObject;
pub use platform::Platform;
pub use program::Program;
pub use queue::{CommandQueue, Mapping};
pub use runtime::Runtime;
pub use sampler::Sampler;
pub use types::{
    AddressingMode, BufferCoords, BufferRegion, BuildStatus, CommandExecutionStatus,
    CommandQueueProperties, DeviceExecCapabilities, DeviceType, FilterMode, ImageDesc, ImageFormat,
    KernelArgAccessQualifier, KernelArgAddressQualifier, MapFlags, MemFlags, MemObjectType,
    MigrationFlags, Pitch, ProfilingInfo, Scalar, WorkGroupInfo,
};

/// Native API version constants.
pub mod version {
    /// Major version of the native API this crate binds.
    pub const MAJOR: u32 = 1;
    /// Minor version of the native API this crate binds.
    pub const MINOR: u32 = 2;
}
