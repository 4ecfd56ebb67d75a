//! Contexts.

use std::ptr;

use crate::device::Device;
use crate::error::Result;
use crate::ffi::{self, ClContext, CL_SUCCESS};
use crate::handle::facade;
use crate::marshal::with_pinned_handles;

/// Context attributes.
pub mod attr {
    use crate::ffi::ClDevice;
    use crate::info::{attributes, HandleArray, Properties, Uint};

    attributes!(Context {
        REFERENCE_COUNT: Uint = CL_CONTEXT_REFERENCE_COUNT;
        NUM_DEVICES: Uint = CL_CONTEXT_NUM_DEVICES;
        DEVICES: HandleArray<ClDevice> = CL_CONTEXT_DEVICES;
        PROPERTIES: Properties = CL_CONTEXT_PROPERTIES;
    });
}

facade! {
    /// The scope in which queues, programs and memory objects live.
    pub struct Context(ClContext): Context via clGetContextInfo;
}

impl Context {
    /// Create a context over `devices`.
    pub fn new(devices: &[&Device]) -> Result<Self> {
        let runtime = match devices.first() {
            Some(device) => device.runtime().clone(),
            None => {
                return Err(crate::Error::InvalidArgument(
                    "a context needs at least one device".into(),
                ))
            }
        };
        let handles = Device::handles(devices);

        let mut status = CL_SUCCESS;
        let raw = with_pinned_handles(Some(handles.as_slice()), |list| unsafe {
            runtime.api().clCreateContext(
                ptr::null(),
                list.len(),
                list.as_ptr(),
                None,
                ptr::null_mut(),
                &mut status,
            )
        })?;
        ffi::error::check_call(status, "clCreateContext")?;
        Self::wrap(&runtime, raw)
    }

    /// Native reference count, for diagnostics only.
    pub fn reference_count(&self) -> Result<u32> {
        self.info(attr::REFERENCE_COUNT)
    }

    /// Number of devices in the context.
    pub fn num_devices(&self) -> Result<u32> {
        self.info(attr::NUM_DEVICES)
    }

    /// Devices of this context, each holding its own native reference.
    pub fn devices(&self) -> Result<Vec<Device>> {
        self.info(attr::DEVICES)?
            .into_iter()
            .map(|raw| Device::retain_from(self.runtime(), raw))
            .collect()
    }

    /// Zero-terminated property list the context was created with.
    pub fn properties(&self) -> Result<Vec<isize>> {
        self.info(attr::PROPERTIES)
    }
}
