//! Platform enumeration and attributes.

use std::ptr;

use crate::device::Device;
use crate::error::Result;
use crate::ffi::{self, ClDevice, ClPlatform, Status};
use crate::handle::{facade, wrap_all};
use crate::types::DeviceType;

/// Platform attributes.
pub mod attr {
    use crate::info::{attributes, Str};

    attributes!(Platform {
        PROFILE: Str = CL_PLATFORM_PROFILE;
        VERSION: Str = CL_PLATFORM_VERSION;
        NAME: Str = CL_PLATFORM_NAME;
        VENDOR: Str = CL_PLATFORM_VENDOR;
        EXTENSIONS: Str = CL_PLATFORM_EXTENSIONS;
    });
}

facade! {
    /// An installed implementation of the native API.
    pub struct Platform(ClPlatform): Platform via clGetPlatformInfo;
}

impl Platform {
    /// Platform name.
    pub fn name(&self) -> Result<String> {
        self.info(attr::NAME)
    }

    /// Vendor name.
    pub fn vendor(&self) -> Result<String> {
        self.info(attr::VENDOR)
    }

    /// Supported API version string.
    pub fn version(&self) -> Result<String> {
        self.info(attr::VERSION)
    }

    /// `FULL_PROFILE` or `EMBEDDED_PROFILE`.
    pub fn profile(&self) -> Result<String> {
        self.info(attr::PROFILE)
    }

    /// Space separated extension names.
    pub fn extensions(&self) -> Result<Vec<String>> {
        let all = self.info(attr::EXTENSIONS)?;
        Ok(all.split_whitespace().map(str::to_owned).collect())
    }

    /// Devices of the given type. No matching device is an empty list.
    pub fn devices(&self, device_type: DeviceType) -> Result<Vec<Device>> {
        let platform = self.handle().pin()?;
        let api = self.runtime().api();

        let mut count = 0;
        let code = unsafe {
            api.clGetDeviceIDs(platform.raw(), device_type.bits(), 0, ptr::null_mut(), &mut count)
        };
        match ffi::check(code) {
            Err(Status::DeviceNotFound) => return Ok(Vec::new()),
            other => other.map_err(|status| crate::Error::Native {
                op: "clGetDeviceIDs",
                status,
            })?,
        }
        if count == 0 {
            return Ok(Vec::new());
        }

        let mut raw = vec![ClDevice::invalid(); count as usize];
        let code = unsafe {
            api.clGetDeviceIDs(
                platform.raw(),
                device_type.bits(),
                count,
                raw.as_mut_ptr(),
                ptr::null_mut(),
            )
        };
        ffi::error::check_call(code, "clGetDeviceIDs")?;

        Ok(wrap_all(self.runtime(), raw, None)?
            .into_iter()
            .map(Device::from_handle)
            .collect())
    }
}
