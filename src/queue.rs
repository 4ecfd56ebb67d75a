//! Command queues and everything enqueued on them.
//!
//! Every enqueue takes an optional wait list. `None` passes a null list;
//! `Some(&[])` passes a non-null empty list and leaves it to the native
//! library to accept or reject. Each enqueue returns the [`Event`] of the
//! new command.

use std::mem::size_of_val;
use std::os::raw::c_void;
use std::ptr;

use crate::context::Context;
use crate::device::Device;
use crate::error::{Error, Result};
use crate::event::{wait_handles, Event};
use crate::ffi::{self, cl_bool, ClCommandQueue, ClEvent, CL_FALSE, CL_SUCCESS, CL_TRUE};
use crate::handle::facade;
use crate::kernel::Kernel;
use crate::marshal::{with_pinned_handles, with_pinned_pair};
use crate::mem::MemObject;
use crate::types::{BufferCoords, BufferRegion, CommandQueueProperties, MapFlags, MigrationFlags, Pitch};

/// Command queue attributes.
pub mod attr {
    use crate::ffi::{ClContext, ClDevice};
    use crate::info::{attributes, HandleOf, Uint, Ulong};

    attributes!(CommandQueue {
        CONTEXT: HandleOf<ClContext> = CL_QUEUE_CONTEXT;
        DEVICE: HandleOf<ClDevice> = CL_QUEUE_DEVICE;
        REFERENCE_COUNT: Uint = CL_QUEUE_REFERENCE_COUNT;
        PROPERTIES: Ulong = CL_QUEUE_PROPERTIES;
    });
}

facade! {
    /// An in-order (or out-of-order) command stream to one device.
    pub struct CommandQueue(ClCommandQueue): CommandQueue via clGetCommandQueueInfo;
}

/// A host region mapped from a buffer by [`CommandQueue::map_buffer`].
#[derive(Debug)]
pub struct Mapping {
    ptr: *mut c_void,
    len: usize,
    event: Event,
}

unsafe impl Send for Mapping {}

impl Mapping {
    pub fn as_ptr(&self) -> *mut c_void {
        self.ptr
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Completion of the map command.
    pub fn event(&self) -> &Event {
        &self.event
    }
}

fn blocking(flag: bool) -> cl_bool {
    if flag {
        CL_TRUE
    } else {
        CL_FALSE
    }
}

/// Reject a host slice shorter than the rectangle it is read into or written from.
fn check_host_extent(origin: BufferCoords, region: BufferRegion, pitch: Pitch, len: usize) -> Result<()> {
    match pitch.extent(origin, region) {
        Some(extent) if extent <= len => Ok(()),
        extent => Err(Error::InvalidArgument(format!(
            "host rectangle needs {} bytes, slice has {}",
            extent.map_or_else(|| "more than usize::MAX".to_owned(), |n| n.to_string()),
            len
        ))),
    }
}

impl CommandQueue {
    pub fn new(context: &Context, device: &Device, properties: CommandQueueProperties) -> Result<Self> {
        let ctx = context.handle().pin()?;
        let dev = device.handle().pin()?;
        let mut status = CL_SUCCESS;
        let raw = unsafe {
            context.runtime().api().clCreateCommandQueue(
                ctx.raw(),
                dev.raw(),
                properties.bits(),
                &mut status,
            )
        };
        ffi::error::check_call(status, "clCreateCommandQueue")?;
        Self::wrap(context.runtime(), raw)
    }

    pub fn context(&self) -> Result<Context> {
        match self.info(attr::CONTEXT)? {
            Some(raw) => Context::retain_from(self.runtime(), raw),
            None => Err(Error::NullHandle {
                kind: crate::handle::ResourceKind::Context,
            }),
        }
    }

    pub fn device(&self) -> Result<Device> {
        match self.info(attr::DEVICE)? {
            Some(raw) => Device::retain_from(self.runtime(), raw),
            None => Err(Error::NullHandle {
                kind: crate::handle::ResourceKind::Device,
            }),
        }
    }

    pub fn reference_count(&self) -> Result<u32> {
        self.info(attr::REFERENCE_COUNT)
    }

    pub fn properties(&self) -> Result<CommandQueueProperties> {
        self.info(attr::PROPERTIES)
            .map(CommandQueueProperties::from_bits_retain)
    }

    /// Submit every queued command to the device.
    pub fn flush(&self) -> Result<()> {
        let queue = self.handle.pin()?;
        let code = unsafe { self.runtime().api().clFlush(queue.raw()) };
        ffi::error::check_call(code, "clFlush")
    }

    /// Block until every queued command has completed.
    pub fn finish(&self) -> Result<()> {
        let queue = self.handle.pin()?;
        let code = unsafe { self.runtime().api().clFinish(queue.raw()) };
        ffi::error::check_call(code, "clFinish")
    }

    /// Pin the queue and the wait list, run `call`, and wrap the returned event.
    fn enqueue<F>(&self, op: &'static str, wait_for: Option<&[&Event]>, call: F) -> Result<Event>
    where
        F: FnOnce(ClCommandQueue, ffi::cl_uint, *const ClEvent, *mut ClEvent) -> ffi::cl_int,
    {
        let queue = self.handle.pin()?;
        let waits = wait_handles(wait_for);
        let mut event = ClEvent::invalid();
        let code = with_pinned_handles(waits.as_deref(), |list| {
            call(queue.raw(), list.len(), list.as_ptr(), &mut event)
        })?;
        ffi::error::check_call(code, op)?;
        Event::wrap(self.runtime(), event)
    }

    /// Launch `kernel` over an N-dimensional range.
    ///
    /// `offset` and `local`, when given, must have as many dimensions as
    /// `global`.
    pub fn enqueue_kernel(
        &self,
        kernel: &Kernel,
        global: &[usize],
        offset: Option<&[usize]>,
        local: Option<&[usize]>,
        wait_for: Option<&[&Event]>,
    ) -> Result<Event> {
        for (what, dims) in [("offset", offset), ("local size", local)] {
            if let Some(dims) = dims {
                if dims.len() != global.len() {
                    return Err(Error::InvalidArgument(format!(
                        "{} has {} dimensions, global size has {}",
                        what,
                        dims.len(),
                        global.len()
                    )));
                }
            }
        }
        let work_dim = ffi::cl_uint::try_from(global.len())
            .map_err(|_| Error::InvalidArgument(format!("{} work dimensions", global.len())))?;

        let k = kernel.handle().pin()?;
        let api = self.runtime().api();
        self.enqueue("clEnqueueNDRangeKernel", wait_for, |queue, n, waits, event| unsafe {
            api.clEnqueueNDRangeKernel(
                queue,
                k.raw(),
                work_dim,
                offset.map_or(ptr::null(), <[usize]>::as_ptr),
                global.as_ptr(),
                local.map_or(ptr::null(), <[usize]>::as_ptr),
                n,
                waits,
                event,
            )
        })
    }

    /// Read `dst.len()` bytes at `offset`, blocking until they arrive.
    pub fn read_buffer(
        &self,
        buffer: &MemObject,
        offset: usize,
        dst: &mut [u8],
        wait_for: Option<&[&Event]>,
    ) -> Result<Event> {
        unsafe { self.read_buffer_raw(buffer, true, offset, dst.as_mut_ptr().cast(), dst.len(), wait_for) }
    }

    /// Non-blocking read.
    ///
    /// # Safety
    ///
    /// `dst` must stay valid and unaliased until the returned event completes.
    pub unsafe fn enqueue_read_buffer(
        &self,
        buffer: &MemObject,
        offset: usize,
        dst: &mut [u8],
        wait_for: Option<&[&Event]>,
    ) -> Result<Event> {
        self.read_buffer_raw(buffer, false, offset, dst.as_mut_ptr().cast(), dst.len(), wait_for)
    }

    unsafe fn read_buffer_raw(
        &self,
        buffer: &MemObject,
        block: bool,
        offset: usize,
        dst: *mut c_void,
        len: usize,
        wait_for: Option<&[&Event]>,
    ) -> Result<Event> {
        let mem = buffer.handle().pin()?;
        let api = self.runtime().api();
        self.enqueue("clEnqueueReadBuffer", wait_for, |queue, n, waits, event| unsafe {
            api.clEnqueueReadBuffer(queue, mem.raw(), blocking(block), offset, len, dst, n, waits, event)
        })
    }

    /// Write `src` at `offset`, blocking until the data has been copied out.
    pub fn write_buffer(
        &self,
        buffer: &MemObject,
        offset: usize,
        src: &[u8],
        wait_for: Option<&[&Event]>,
    ) -> Result<Event> {
        unsafe { self.write_buffer_raw(buffer, true, offset, src, wait_for) }
    }

    /// Non-blocking write.
    ///
    /// # Safety
    ///
    /// `src` must stay valid and unmodified until the returned event completes.
    pub unsafe fn enqueue_write_buffer(
        &self,
        buffer: &MemObject,
        offset: usize,
        src: &[u8],
        wait_for: Option<&[&Event]>,
    ) -> Result<Event> {
        self.write_buffer_raw(buffer, false, offset, src, wait_for)
    }

    unsafe fn write_buffer_raw(
        &self,
        buffer: &MemObject,
        block: bool,
        offset: usize,
        src: &[u8],
        wait_for: Option<&[&Event]>,
    ) -> Result<Event> {
        let mem = buffer.handle().pin()?;
        let api = self.runtime().api();
        self.enqueue("clEnqueueWriteBuffer", wait_for, |queue, n, waits, event| unsafe {
            api.clEnqueueWriteBuffer(
                queue,
                mem.raw(),
                blocking(block),
                offset,
                src.len(),
                src.as_ptr().cast(),
                n,
                waits,
                event,
            )
        })
    }

    /// Blocking rectangular read into `dst`.
    #[allow(clippy::too_many_arguments)]
    pub fn read_buffer_rect(
        &self,
        buffer: &MemObject,
        buffer_origin: BufferCoords,
        host_origin: BufferCoords,
        region: BufferRegion,
        buffer_pitch: Pitch,
        host_pitch: Pitch,
        dst: &mut [u8],
        wait_for: Option<&[&Event]>,
    ) -> Result<Event> {
        check_host_extent(host_origin, region, host_pitch, dst.len())?;
        let mem = buffer.handle().pin()?;
        let api = self.runtime().api();
        let (buffer_origin, host_origin, region) =
            (buffer_origin.to_array(), host_origin.to_array(), region.to_array());
        self.enqueue("clEnqueueReadBufferRect", wait_for, |queue, n, waits, event| unsafe {
            api.clEnqueueReadBufferRect(
                queue,
                mem.raw(),
                CL_TRUE,
                buffer_origin.as_ptr(),
                host_origin.as_ptr(),
                region.as_ptr(),
                buffer_pitch.row,
                buffer_pitch.slice,
                host_pitch.row,
                host_pitch.slice,
                dst.as_mut_ptr().cast(),
                n,
                waits,
                event,
            )
        })
    }

    /// Blocking rectangular write from `src`.
    #[allow(clippy::too_many_arguments)]
    pub fn write_buffer_rect(
        &self,
        buffer: &MemObject,
        buffer_origin: BufferCoords,
        host_origin: BufferCoords,
        region: BufferRegion,
        buffer_pitch: Pitch,
        host_pitch: Pitch,
        src: &[u8],
        wait_for: Option<&[&Event]>,
    ) -> Result<Event> {
        check_host_extent(host_origin, region, host_pitch, src.len())?;
        let mem = buffer.handle().pin()?;
        let api = self.runtime().api();
        let (buffer_origin, host_origin, region) =
            (buffer_origin.to_array(), host_origin.to_array(), region.to_array());
        self.enqueue("clEnqueueWriteBufferRect", wait_for, |queue, n, waits, event| unsafe {
            api.clEnqueueWriteBufferRect(
                queue,
                mem.raw(),
                CL_TRUE,
                buffer_origin.as_ptr(),
                host_origin.as_ptr(),
                region.as_ptr(),
                buffer_pitch.row,
                buffer_pitch.slice,
                host_pitch.row,
                host_pitch.slice,
                src.as_ptr().cast(),
                n,
                waits,
                event,
            )
        })
    }

    pub fn copy_buffer(
        &self,
        src: &MemObject,
        dst: &MemObject,
        src_offset: usize,
        dst_offset: usize,
        size: usize,
        wait_for: Option<&[&Event]>,
    ) -> Result<Event> {
        let src = src.handle().pin()?;
        let dst = dst.handle().pin()?;
        let api = self.runtime().api();
        self.enqueue("clEnqueueCopyBuffer", wait_for, |queue, n, waits, event| unsafe {
            api.clEnqueueCopyBuffer(queue, src.raw(), dst.raw(), src_offset, dst_offset, size, n, waits, event)
        })
    }

    /// Fill `size` bytes at `offset` with repetitions of `pattern`.
    pub fn fill_buffer<T: crate::types::Scalar>(
        &self,
        buffer: &MemObject,
        pattern: &T,
        offset: usize,
        size: usize,
        wait_for: Option<&[&Event]>,
    ) -> Result<Event> {
        let mem = buffer.handle().pin()?;
        let api = self.runtime().api();
        let pattern_size = size_of_val(pattern);
        self.enqueue("clEnqueueFillBuffer", wait_for, |queue, n, waits, event| unsafe {
            api.clEnqueueFillBuffer(
                queue,
                mem.raw(),
                (pattern as *const T).cast(),
                pattern_size,
                offset,
                size,
                n,
                waits,
                event,
            )
        })
    }

    /// Map `size` bytes at `offset` into host memory.
    ///
    /// # Safety
    ///
    /// The mapping aliases device memory: the caller must not access it
    /// before the map event completes, nor after [`unmap`](Self::unmap).
    pub unsafe fn map_buffer(
        &self,
        buffer: &MemObject,
        block: bool,
        flags: MapFlags,
        offset: usize,
        size: usize,
        wait_for: Option<&[&Event]>,
    ) -> Result<Mapping> {
        let queue = self.handle.pin()?;
        let mem = buffer.handle().pin()?;
        let api = self.runtime().api();
        let waits = wait_handles(wait_for);
        let mut event = ClEvent::invalid();
        let mut status = CL_SUCCESS;
        let mapped = with_pinned_handles(waits.as_deref(), |list| unsafe {
            api.clEnqueueMapBuffer(
                queue.raw(),
                mem.raw(),
                blocking(block),
                flags.bits(),
                offset,
                size,
                list.len(),
                list.as_ptr(),
                &mut event,
                &mut status,
            )
        })?;
        ffi::error::check_call(status, "clEnqueueMapBuffer")?;

        match Event::wrap(self.runtime(), event) {
            Ok(event) => Ok(Mapping {
                ptr: mapped,
                len: size,
                event,
            }),
            Err(err) => {
                // Nothing would own the region, so unmap it before failing.
                let code = unsafe {
                    api.clEnqueueUnmapMemObject(
                        queue.raw(),
                        mem.raw(),
                        mapped,
                        0,
                        ptr::null(),
                        ptr::null_mut(),
                    )
                };
                if let Err(unmap) = ffi::error::check_call(code, "clEnqueueUnmapMemObject") {
                    log::warn!("unmapping an unowned region failed: {}", unmap);
                }
                Err(err)
            }
        }
    }

    /// Unmap a region returned by [`map_buffer`](Self::map_buffer).
    ///
    /// # Safety
    ///
    /// `mapping` must have been mapped from `buffer`, and no host access
    /// to it may happen once this succeeds. On failure the region stays
    /// mapped and the call may be retried.
    pub unsafe fn unmap(
        &self,
        buffer: &MemObject,
        mapping: &Mapping,
        wait_for: Option<&[&Event]>,
    ) -> Result<Event> {
        let mem = buffer.handle().pin()?;
        let api = self.runtime().api();
        self.enqueue("clEnqueueUnmapMemObject", wait_for, |queue, n, waits, event| unsafe {
            api.clEnqueueUnmapMemObject(queue, mem.raw(), mapping.ptr, n, waits, event)
        })
    }

    /// Move memory objects to this queue's device, or to the host.
    pub fn migrate_mem_objects(
        &self,
        objects: &[&MemObject],
        flags: MigrationFlags,
        wait_for: Option<&[&Event]>,
    ) -> Result<Event> {
        let queue = self.handle.pin()?;
        let api = self.runtime().api();
        let objects = MemObject::handles(objects);
        let waits = wait_handles(wait_for);
        let mut event = ClEvent::invalid();
        let code = with_pinned_pair(Some(objects.as_slice()), waits.as_deref(), |mems, waits| unsafe {
            api.clEnqueueMigrateMemObjects(
                queue.raw(),
                mems.len(),
                mems.as_ptr(),
                flags.bits(),
                waits.len(),
                waits.as_ptr(),
                &mut event,
            )
        })?;
        ffi::error::check_call(code, "clEnqueueMigrateMemObjects")?;
        Event::wrap(self.runtime(), event)
    }

    /// An event that completes once the wait list (or, without one, every
    /// earlier command) has completed.
    pub fn marker(&self, wait_for: Option<&[&Event]>) -> Result<Event> {
        let api = self.runtime().api();
        self.enqueue("clEnqueueMarkerWithWaitList", wait_for, |queue, n, waits, event| unsafe {
            api.clEnqueueMarkerWithWaitList(queue, n, waits, event)
        })
    }

    /// Like [`marker`](Self::marker), also holding back later commands.
    pub fn barrier(&self, wait_for: Option<&[&Event]>) -> Result<Event> {
        let api = self.runtime().api();
        self.enqueue("clEnqueueBarrierWithWaitList", wait_for, |queue, n, waits, event| unsafe {
            api.clEnqueueBarrierWithWaitList(queue, n, waits, event)
        })
    }
}
