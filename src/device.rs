//! Devices, their attributes and partitioning into sub-devices.

use std::ptr;

use crate::error::{Error, Result};
use crate::ffi::{self, cl_device_partition_property, ClDevice};
use crate::handle::{facade, wrap_all};
use crate::platform::Platform;
use crate::types::{CommandQueueProperties, DeviceExecCapabilities, DeviceType};

/// Device attributes.
pub mod attr {
    use crate::ffi::{ClDevice, ClPlatform};
    use crate::info::{attributes, Bool, HandleOf, Properties, Size, SizeArray, Str, Uint, Ulong};

    attributes!(Device {
        TYPE: Ulong = CL_DEVICE_TYPE;
        VENDOR_ID: Uint = CL_DEVICE_VENDOR_ID;
        MAX_COMPUTE_UNITS: Uint = CL_DEVICE_MAX_COMPUTE_UNITS;
        MAX_WORK_ITEM_DIMENSIONS: Uint = CL_DEVICE_MAX_WORK_ITEM_DIMENSIONS;
        MAX_WORK_GROUP_SIZE: Size = CL_DEVICE_MAX_WORK_GROUP_SIZE;
        MAX_WORK_ITEM_SIZES: SizeArray = CL_DEVICE_MAX_WORK_ITEM_SIZES;
        MAX_CLOCK_FREQUENCY: Uint = CL_DEVICE_MAX_CLOCK_FREQUENCY;
        ADDRESS_BITS: Uint = CL_DEVICE_ADDRESS_BITS;
        MAX_MEM_ALLOC_SIZE: Ulong = CL_DEVICE_MAX_MEM_ALLOC_SIZE;
        IMAGE_SUPPORT: Bool = CL_DEVICE_IMAGE_SUPPORT;
        GLOBAL_MEM_SIZE: Ulong = CL_DEVICE_GLOBAL_MEM_SIZE;
        LOCAL_MEM_SIZE: Ulong = CL_DEVICE_LOCAL_MEM_SIZE;
        PROFILING_TIMER_RESOLUTION: Size = CL_DEVICE_PROFILING_TIMER_RESOLUTION;
        ENDIAN_LITTLE: Bool = CL_DEVICE_ENDIAN_LITTLE;
        AVAILABLE: Bool = CL_DEVICE_AVAILABLE;
        COMPILER_AVAILABLE: Bool = CL_DEVICE_COMPILER_AVAILABLE;
        LINKER_AVAILABLE: Bool = CL_DEVICE_LINKER_AVAILABLE;
        EXECUTION_CAPABILITIES: Ulong = CL_DEVICE_EXECUTION_CAPABILITIES;
        QUEUE_PROPERTIES: Ulong = CL_DEVICE_QUEUE_PROPERTIES;
        NAME: Str = CL_DEVICE_NAME;
        VENDOR: Str = CL_DEVICE_VENDOR;
        DRIVER_VERSION: Str = CL_DRIVER_VERSION;
        PROFILE: Str = CL_DEVICE_PROFILE;
        VERSION: Str = CL_DEVICE_VERSION;
        OPENCL_C_VERSION: Str = CL_DEVICE_OPENCL_C_VERSION;
        EXTENSIONS: Str = CL_DEVICE_EXTENSIONS;
        BUILT_IN_KERNELS: Str = CL_DEVICE_BUILT_IN_KERNELS;
        PLATFORM: HandleOf<ClPlatform> = CL_DEVICE_PLATFORM;
        PARENT_DEVICE: HandleOf<ClDevice> = CL_DEVICE_PARENT_DEVICE;
        PARTITION_MAX_SUB_DEVICES: Uint = CL_DEVICE_PARTITION_MAX_SUB_DEVICES;
        PARTITION_PROPERTIES: Properties = CL_DEVICE_PARTITION_PROPERTIES;
        REFERENCE_COUNT: Uint = CL_DEVICE_REFERENCE_COUNT;
    });
}

facade! {
    /// A compute device, either a root device or a sub-device.
    pub struct Device(ClDevice): Device via clGetDeviceInfo;
}

impl Device {
    /// Device name.
    pub fn name(&self) -> Result<String> {
        self.info(attr::NAME)
    }

    /// Vendor name.
    pub fn vendor(&self) -> Result<String> {
        self.info(attr::VENDOR)
    }

    /// Supported API version string, e.g. `OpenCL 1.2 <vendor info>`.
    pub fn version(&self) -> Result<String> {
        self.info(attr::VERSION)
    }

    /// Driver version string.
    pub fn driver_version(&self) -> Result<String> {
        self.info(attr::DRIVER_VERSION)
    }

    /// Kind of device: CPU, GPU, accelerator, ...
    pub fn device_type(&self) -> Result<DeviceType> {
        self.info(attr::TYPE).map(DeviceType::from_bits_retain)
    }

    /// Number of parallel compute units.
    pub fn max_compute_units(&self) -> Result<u32> {
        self.info(attr::MAX_COMPUTE_UNITS)
    }

    /// Largest work-group a kernel may be launched with.
    pub fn max_work_group_size(&self) -> Result<usize> {
        self.info(attr::MAX_WORK_GROUP_SIZE)
    }

    /// Maximum work items per dimension, one entry per dimension.
    pub fn max_work_item_sizes(&self) -> Result<Vec<usize>> {
        self.info(attr::MAX_WORK_ITEM_SIZES)
    }

    /// Global memory in bytes.
    pub fn global_mem_size(&self) -> Result<u64> {
        self.info(attr::GLOBAL_MEM_SIZE)
    }

    /// Local memory per work-group in bytes.
    pub fn local_mem_size(&self) -> Result<u64> {
        self.info(attr::LOCAL_MEM_SIZE)
    }

    /// Largest single memory object in bytes.
    pub fn max_mem_alloc_size(&self) -> Result<u64> {
        self.info(attr::MAX_MEM_ALLOC_SIZE)
    }

    /// Whether the device can currently be used.
    pub fn is_available(&self) -> Result<bool> {
        self.info(attr::AVAILABLE)
    }

    /// Whether images and samplers are supported.
    pub fn image_support(&self) -> Result<bool> {
        self.info(attr::IMAGE_SUPPORT)
    }

    /// Queue properties the device accepts.
    pub fn queue_properties(&self) -> Result<CommandQueueProperties> {
        self.info(attr::QUEUE_PROPERTIES)
            .map(CommandQueueProperties::from_bits_retain)
    }

    /// Kinds of kernels the device can run.
    pub fn execution_capabilities(&self) -> Result<DeviceExecCapabilities> {
        self.info(attr::EXECUTION_CAPABILITIES)
            .map(DeviceExecCapabilities::from_bits_retain)
    }

    /// Space separated extension names.
    pub fn extensions(&self) -> Result<Vec<String>> {
        let all = self.info(attr::EXTENSIONS)?;
        Ok(all.split_whitespace().map(str::to_owned).collect())
    }

    /// The platform this device belongs to.
    pub fn platform(&self) -> Result<Platform> {
        match self.info(attr::PLATFORM)? {
            Some(raw) => Platform::wrap(self.runtime(), raw),
            None => Err(Error::NullHandle {
                kind: crate::ResourceKind::Platform,
            }),
        }
    }

    /// The device this one was partitioned from, `None` for a root device.
    pub fn parent_device(&self) -> Result<Option<Device>> {
        self.info(attr::PARENT_DEVICE)?
            .map(|raw| Device::retain_from(self.runtime(), raw))
            .transpose()
    }

    /// The wrapper this sub-device was created from, if it is still alive.
    pub fn parent(&self) -> Option<Device> {
        self.handle.parent().map(Device::from_arc)
    }

    /// Split into as many sub-devices of `units` compute units each as fit.
    pub fn partition_equally(&self, units: u32) -> Result<Vec<Device>> {
        self.partition(&[
            ffi::CL_DEVICE_PARTITION_EQUALLY,
            units as cl_device_partition_property,
            0,
        ])
    }

    /// Split into one sub-device per entry of `counts`.
    pub fn partition_by_counts(&self, counts: &[u32]) -> Result<Vec<Device>> {
        let mut properties = Vec::with_capacity(counts.len() + 3);
        properties.push(ffi::CL_DEVICE_PARTITION_BY_COUNTS);
        properties.extend(counts.iter().map(|&n| n as cl_device_partition_property));
        properties.push(ffi::CL_DEVICE_PARTITION_BY_COUNTS_LIST_END);
        properties.push(0);
        self.partition(&properties)
    }

    fn partition(&self, properties: &[cl_device_partition_property]) -> Result<Vec<Device>> {
        let device = self.handle.pin()?;
        let api = self.runtime().api();

        let mut count = 0;
        let code = unsafe {
            api.clCreateSubDevices(device.raw(), properties.as_ptr(), 0, ptr::null_mut(), &mut count)
        };
        ffi::error::check_call(code, "clCreateSubDevices")?;
        if count == 0 {
            return Ok(Vec::new());
        }

        let mut raw = vec![ClDevice::invalid(); count as usize];
        let code = unsafe {
            api.clCreateSubDevices(
                device.raw(),
                properties.as_ptr(),
                count,
                raw.as_mut_ptr(),
                ptr::null_mut(),
            )
        };
        ffi::error::check_call(code, "clCreateSubDevices")?;
        log::debug!("partitioned device {:#x} into {} sub-devices", device.raw().to_raw(), count);

        Ok(wrap_all(self.runtime(), raw, Some(&self.handle))?
            .into_iter()
            .map(Device::from_handle)
            .collect())
    }
}
