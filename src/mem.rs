//! Buffers, sub-buffers and images.

use std::os::raw::c_void;
use std::ptr;

use crate::context::Context;
use crate::error::{Error, Result};
use crate::ffi::{self, cl_buffer_region, ClMem, CL_SUCCESS};
use crate::handle::{facade, OwnedHandle};
use crate::types::{ImageDesc, ImageFormat, MemFlags, MemObjectType};

/// Memory object attributes.
pub mod attr {
    use crate::ffi::{ClContext, ClMem};
    use crate::info::{attributes, HandleOf, Size, Uint, Ulong};

    attributes!(MemObject {
        TYPE: Uint = CL_MEM_TYPE;
        FLAGS: Ulong = CL_MEM_FLAGS;
        SIZE: Size = CL_MEM_SIZE;
        HOST_PTR: Size = CL_MEM_HOST_PTR;
        MAP_COUNT: Uint = CL_MEM_MAP_COUNT;
        REFERENCE_COUNT: Uint = CL_MEM_REFERENCE_COUNT;
        CONTEXT: HandleOf<ClContext> = CL_MEM_CONTEXT;
        ASSOCIATED_MEMOBJECT: HandleOf<ClMem> = CL_MEM_ASSOCIATED_MEMOBJECT;
        OFFSET: Size = CL_MEM_OFFSET;
    });
}

/// Image attributes.
pub mod image_attr {
    use crate::info::{attributes, ImageFormat, Size};

    attributes!(Image {
        FORMAT: ImageFormat = CL_IMAGE_FORMAT;
        ELEMENT_SIZE: Size = CL_IMAGE_ELEMENT_SIZE;
        ROW_PITCH: Size = CL_IMAGE_ROW_PITCH;
        SLICE_PITCH: Size = CL_IMAGE_SLICE_PITCH;
        WIDTH: Size = CL_IMAGE_WIDTH;
        HEIGHT: Size = CL_IMAGE_HEIGHT;
        DEPTH: Size = CL_IMAGE_DEPTH;
    });
}

facade! {
    /// A buffer, sub-buffer or image.
    pub struct MemObject(ClMem): MemObject via clGetMemObjectInfo;
}

impl MemObject {
    /// An uninitialised buffer of `size` bytes.
    pub fn buffer(context: &Context, flags: MemFlags, size: usize) -> Result<Self> {
        unsafe { Self::create_buffer(context, flags, size, ptr::null_mut()) }
    }

    /// A buffer initialised with a copy of `data`.
    pub fn buffer_from_host(context: &Context, flags: MemFlags, data: &[u8]) -> Result<Self> {
        if flags.contains(MemFlags::USE_HOST_PTR) {
            return Err(Error::InvalidArgument(
                "USE_HOST_PTR would let the device keep a borrowed slice".into(),
            ));
        }
        unsafe {
            Self::create_buffer(
                context,
                flags | MemFlags::COPY_HOST_PTR,
                data.len(),
                data.as_ptr() as *mut c_void,
            )
        }
    }

    unsafe fn create_buffer(context: &Context, flags: MemFlags, size: usize, host: *mut c_void) -> Result<Self> {
        let ctx = context.handle().pin()?;
        let mut status = CL_SUCCESS;
        let raw = context
            .runtime()
            .api()
            .clCreateBuffer(ctx.raw(), flags.bits(), size, host, &mut status);
        ffi::error::check_call(status, "clCreateBuffer")?;
        Self::wrap(context.runtime(), raw)
    }

    /// A view of `size` bytes at `origin` of this buffer.
    ///
    /// The sub-buffer remembers this wrapper without keeping it alive; see
    /// [`associated_mem_object`](Self::associated_mem_object).
    pub fn create_sub_buffer(&self, flags: MemFlags, origin: usize, size: usize) -> Result<Self> {
        let parent = self.handle.pin()?;
        let region = cl_buffer_region { origin, size };
        let mut status = CL_SUCCESS;
        let raw = unsafe {
            self.runtime().api().clCreateSubBuffer(
                parent.raw(),
                flags.bits(),
                ffi::CL_BUFFER_CREATE_TYPE_REGION,
                (&region as *const cl_buffer_region).cast(),
                &mut status,
            )
        };
        ffi::error::check_call(status, "clCreateSubBuffer")?;
        OwnedHandle::wrap_child(self.runtime(), raw, &self.handle).map(Self::from_handle)
    }

    /// The buffer this sub-buffer was created from, while its wrapper lives.
    pub fn associated_mem_object(&self) -> Option<MemObject> {
        self.handle.parent().map(MemObject::from_arc)
    }

    /// Whether this object was created as a sub-buffer.
    pub fn is_sub_buffer(&self) -> bool {
        self.handle.has_parent()
    }

    /// An image of the given format and shape.
    pub fn image(context: &Context, flags: MemFlags, format: ImageFormat, desc: &ImageDesc) -> Result<Self> {
        if flags.intersects(MemFlags::USE_HOST_PTR | MemFlags::COPY_HOST_PTR) {
            return Err(Error::InvalidArgument(
                "images are created without host data".into(),
            ));
        }
        let ctx = context.handle().pin()?;
        let format = format.to_raw();
        let desc = desc.to_raw();
        let mut status = CL_SUCCESS;
        let raw = unsafe {
            context.runtime().api().clCreateImage(
                ctx.raw(),
                flags.bits(),
                &format,
                &desc,
                ptr::null_mut(),
                &mut status,
            )
        };
        ffi::error::check_call(status, "clCreateImage")?;
        Self::wrap(context.runtime(), raw)
    }

    pub fn mem_type(&self) -> Result<MemObjectType> {
        let raw = self.info(attr::TYPE)?;
        MemObjectType::from_raw(raw)
            .ok_or_else(|| attr::TYPE.unknown_value(raw))
    }

    pub fn flags(&self) -> Result<MemFlags> {
        self.info(attr::FLAGS).map(MemFlags::from_bits_retain)
    }

    pub fn size(&self) -> Result<usize> {
        self.info(attr::SIZE)
    }

    pub fn map_count(&self) -> Result<u32> {
        self.info(attr::MAP_COUNT)
    }

    pub fn reference_count(&self) -> Result<u32> {
        self.info(attr::REFERENCE_COUNT)
    }

    /// Offset into the parent buffer; zero for anything but sub-buffers.
    pub fn offset(&self) -> Result<usize> {
        self.info(attr::OFFSET)
    }

    pub fn context(&self) -> Result<Context> {
        match self.info(attr::CONTEXT)? {
            Some(raw) => Context::retain_from(self.runtime(), raw),
            None => Err(Error::NullHandle {
                kind: crate::handle::ResourceKind::Context,
            }),
        }
    }

    /// Query an image attribute.
    pub fn image_info<C: crate::info::Codec>(&self, attr: crate::info::Attribute<C>) -> Result<C::Value> {
        if attr.kind != crate::info::InfoKind::Image {
            return Err(Error::InvalidArgument(format!("{} is not an image attribute", attr.name)));
        }
        self.handle.query(attr, |api, raw, id, size, value, size_ret| unsafe {
            api.clGetImageInfo(raw, id, size, value, size_ret)
        })
    }

    pub fn image_format(&self) -> Result<ImageFormat> {
        self.image_info(image_attr::FORMAT).map(ImageFormat::from)
    }

    pub fn element_size(&self) -> Result<usize> {
        self.image_info(image_attr::ELEMENT_SIZE)
    }

    pub fn row_pitch(&self) -> Result<usize> {
        self.image_info(image_attr::ROW_PITCH)
    }

    pub fn slice_pitch(&self) -> Result<usize> {
        self.image_info(image_attr::SLICE_PITCH)
    }

    /// Width, height and depth in pixels.
    pub fn image_dimensions(&self) -> Result<[usize; 3]> {
        Ok([
            self.image_info(image_attr::WIDTH)?,
            self.image_info(image_attr::HEIGHT)?,
            self.image_info(image_attr::DEPTH)?,
        ])
    }
}
