//! Ownership of native handles.
//!
//! An [`OwnedHandle`] owns exactly one native reference and gives it back
//! exactly once. It is either live or released; once released every access
//! fails with [`Error::Disposed`] without reaching the native library.
//!
//! Native calls take a [`HandlePin`] for their duration. A release that
//! races with a pinned call marks the handle released immediately and hands
//! the native release call to whichever pin is dropped last.

use std::fmt;
use std::os::raw::c_void;
use std::sync::atomic::{AtomicI32, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

use crate::error::{Error, Result};
use crate::ffi::{self, cl_int, cl_uint, ClApi, Status, CL_SUCCESS};
use crate::info::{self, Attribute, Codec};
use crate::runtime::Runtime;

/// The closed set of native resource kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Platform,
    Device,
    Context,
    CommandQueue,
    Program,
    Kernel,
    MemObject,
    Event,
    Sampler,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ResourceKind::Platform => "platform",
            ResourceKind::Device => "device",
            ResourceKind::Context => "context",
            ResourceKind::CommandQueue => "command queue",
            ResourceKind::Program => "program",
            ResourceKind::Kernel => "kernel",
            ResourceKind::MemObject => "memory object",
            ResourceKind::Event => "event",
            ResourceKind::Sampler => "sampler",
        })
    }
}

/// A native handle type and its reference-counting entry points.
pub trait NativeHandle: Copy + Eq + fmt::Debug + Send + Sync + 'static {
    /// Resource kind, for diagnostics.
    const KIND: ResourceKind;

    fn from_raw(raw: usize) -> Self;

    fn to_raw(self) -> usize;

    /// Increment the native reference count.
    ///
    /// # Safety
    ///
    /// `handle` must be a live handle obtained from `api`.
    unsafe fn retain(api: &dyn ClApi, handle: Self) -> cl_int;

    /// Decrement the native reference count.
    ///
    /// # Safety
    ///
    /// `handle` must be a live handle obtained from `api`, and this
    /// reference must not be used afterwards.
    unsafe fn release(api: &dyn ClApi, handle: Self) -> cl_int;
}

macro_rules! native_handle {
    ($handle:ident, $kind:ident, $retain:ident, $release:ident) => {
        impl NativeHandle for ffi::$handle {
            const KIND: ResourceKind = ResourceKind::$kind;

            #[inline]
            fn from_raw(raw: usize) -> Self {
                ffi::$handle::from_raw(raw)
            }

            #[inline]
            fn to_raw(self) -> usize {
                ffi::$handle::to_raw(self)
            }

            unsafe fn retain(api: &dyn ClApi, handle: Self) -> cl_int {
                api.$retain(handle)
            }

            unsafe fn release(api: &dyn ClApi, handle: Self) -> cl_int {
                api.$release(handle)
            }
        }
    };
}

native_handle!(ClDevice, Device, clRetainDevice, clReleaseDevice);
native_handle!(ClContext, Context, clRetainContext, clReleaseContext);
native_handle!(ClCommandQueue, CommandQueue, clRetainCommandQueue, clReleaseCommandQueue);
native_handle!(ClProgram, Program, clRetainProgram, clReleaseProgram);
native_handle!(ClKernel, Kernel, clRetainKernel, clReleaseKernel);
native_handle!(ClMem, MemObject, clRetainMemObject, clReleaseMemObject);
native_handle!(ClEvent, Event, clRetainEvent, clReleaseEvent);
native_handle!(ClSampler, Sampler, clRetainSampler, clReleaseSampler);

// Platforms are not reference counted.
impl NativeHandle for ffi::ClPlatform {
    const KIND: ResourceKind = ResourceKind::Platform;

    #[inline]
    fn from_raw(raw: usize) -> Self {
        ffi::ClPlatform::from_raw(raw)
    }

    #[inline]
    fn to_raw(self) -> usize {
        ffi::ClPlatform::to_raw(self)
    }

    unsafe fn retain(_api: &dyn ClApi, _handle: Self) -> cl_int {
        CL_SUCCESS
    }

    unsafe fn release(_api: &dyn ClApi, _handle: Self) -> cl_int {
        CL_SUCCESS
    }
}

const RELEASED: usize = 1 << (usize::BITS - 1);
const PIN_MASK: usize = !RELEASED;

/// Release status not yet recorded.
const PENDING: i32 = i32::MIN;

/// What a call to [`OwnedHandle::release`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Released {
    /// The native release call ran.
    Now,
    /// The handle is pinned; the last pin runs the native release call.
    Deferred,
    /// An earlier call already released the handle.
    Already,
}

/// Release-exactly-once owner of one native reference.
pub struct OwnedHandle<H: NativeHandle> {
    raw: H,
    runtime: Runtime,
    /// `RELEASED` bit plus the number of live pins.
    state: AtomicUsize,
    release_status: AtomicI32,
    parent: Option<Weak<OwnedHandle<H>>>,
}

impl<H: NativeHandle> OwnedHandle<H> {
    /// Take ownership of a freshly created native reference.
    pub fn wrap(runtime: &Runtime, raw: H) -> Result<Self> {
        Self::new(runtime, raw, None)
    }

    /// Like [`wrap`](Self::wrap), remembering the object it was derived from.
    ///
    /// The parent link is non-owning and does not change how either handle
    /// is released.
    pub fn wrap_child(runtime: &Runtime, raw: H, parent: &Arc<OwnedHandle<H>>) -> Result<Self> {
        Self::new(runtime, raw, Some(Arc::downgrade(parent)))
    }

    /// Retain a handle owned elsewhere (for example one read out of an
    /// attribute) and take ownership of the new reference.
    pub fn retain_from(runtime: &Runtime, raw: H) -> Result<Self> {
        if raw.to_raw() == 0 {
            return Err(Error::NullHandle { kind: H::KIND });
        }
        let code = unsafe { H::retain(runtime.api(), raw) };
        ffi::check(code).map_err(|status| Error::Native {
            op: "retain",
            status,
        })?;
        Self::wrap(runtime, raw)
    }

    fn new(runtime: &Runtime, raw: H, parent: Option<Weak<OwnedHandle<H>>>) -> Result<Self> {
        if raw.to_raw() == 0 {
            return Err(Error::NullHandle { kind: H::KIND });
        }
        log::debug!("wrapped {} {:#x}", H::KIND, raw.to_raw());
        Ok(Self {
            raw,
            runtime: runtime.clone(),
            state: AtomicUsize::new(0),
            release_status: AtomicI32::new(PENDING),
            parent,
        })
    }

    /// Resource kind of this handle.
    pub fn kind(&self) -> ResourceKind {
        H::KIND
    }

    /// The runtime this handle belongs to.
    pub fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    /// The raw handle, unless it was released.
    ///
    /// Prefer [`pin`](Self::pin) when the handle is passed to a native call.
    pub fn as_raw(&self) -> Result<H> {
        if self.state.load(Ordering::Acquire) & RELEASED != 0 {
            return Err(Error::Disposed { kind: H::KIND });
        }
        Ok(self.raw)
    }

    /// Whether the handle has been released.
    pub fn is_released(&self) -> bool {
        self.state.load(Ordering::Acquire) & RELEASED != 0
    }

    /// Pin the handle against release for the lifetime of the guard.
    pub fn pin(&self) -> Result<HandlePin<'_, H>> {
        let mut current = self.state.load(Ordering::Acquire);
        loop {
            if current & RELEASED != 0 {
                return Err(Error::Disposed { kind: H::KIND });
            }
            match self.state.compare_exchange_weak(
                current,
                current + 1,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return Ok(HandlePin { owner: self }),
                Err(actual) => current = actual,
            }
        }
    }

    /// Release the native reference.
    ///
    /// Idempotent: only the first call has an effect. A native failure is
    /// reported by the call that ran it and recorded in
    /// [`release_status`](Self::release_status); it does not make the
    /// handle usable again.
    pub fn release(&self) -> Result<Released> {
        let previous = self.state.fetch_or(RELEASED, Ordering::AcqRel);
        if previous & RELEASED != 0 {
            return Ok(Released::Already);
        }
        if previous & PIN_MASK != 0 {
            log::debug!(
                "deferring release of {} {:#x} until {} pin(s) drop",
                H::KIND,
                self.raw.to_raw(),
                previous & PIN_MASK
            );
            return Ok(Released::Deferred);
        }
        self.release_now().map(|()| Released::Now)
    }

    /// Outcome of the native release call: `None` while it has not run.
    pub fn release_status(&self) -> Option<std::result::Result<(), Status>> {
        match self.release_status.load(Ordering::Acquire) {
            PENDING => None,
            code => Some(ffi::check(code)),
        }
    }

    /// The handle this one was derived from, if it is still alive.
    pub fn parent(&self) -> Option<Arc<OwnedHandle<H>>> {
        self.parent.as_ref().and_then(Weak::upgrade)
    }

    /// Whether this handle was derived from another one.
    pub fn has_parent(&self) -> bool {
        self.parent.is_some()
    }

    fn release_now(&self) -> Result<()> {
        let code = unsafe { H::release(self.runtime.api(), self.raw) };
        self.release_status.store(code, Ordering::Release);
        match ffi::check(code) {
            Ok(()) => {
                log::debug!("released {} {:#x}", H::KIND, self.raw.to_raw());
                Ok(())
            }
            Err(status) => {
                log::warn!(
                    "releasing {} {:#x} failed: {}",
                    H::KIND,
                    self.raw.to_raw(),
                    status
                );
                Err(Error::Native {
                    op: "release",
                    status,
                })
            }
        }
    }

    fn unpin(&self) {
        let previous = self.state.fetch_sub(1, Ordering::AcqRel);
        if previous == RELEASED | 1 {
            // Errors are already logged and recorded in release_status.
            let _ = self.release_now();
        }
    }

    /// Query one attribute through `get_info`, pinning the handle for the call.
    pub(crate) fn query<C, F>(&self, attr: Attribute<C>, mut get_info: F) -> Result<C::Value>
    where
        C: Codec,
        F: FnMut(&dyn ClApi, H, cl_uint, usize, *mut c_void, *mut usize) -> cl_int,
    {
        let pin = self.pin()?;
        let api = self.runtime.api();
        info::query(
            attr,
            self.runtime.options().verify_info_sizes,
            |id, size, value, size_ret| get_info(api, pin.raw(), id, size, value, size_ret),
        )
    }

    /// Like [`query`](Self::query) with a size from a lookup table.
    pub(crate) fn query_sized<C, F>(
        &self,
        attr: Attribute<C>,
        required: usize,
        mut get_info: F,
    ) -> Result<C::Value>
    where
        C: Codec,
        F: FnMut(&dyn ClApi, H, cl_uint, usize, *mut c_void, *mut usize) -> cl_int,
    {
        let pin = self.pin()?;
        let api = self.runtime.api();
        info::query_sized(attr, required, |id, size, value, size_ret| {
            get_info(api, pin.raw(), id, size, value, size_ret)
        })
    }
}

impl<H: NativeHandle> Drop for OwnedHandle<H> {
    fn drop(&mut self) {
        // Pins borrow the handle, so none can be live here.
        if *self.state.get_mut() & RELEASED == 0 {
            *self.state.get_mut() |= RELEASED;
            let _ = self.release_now();
        }
    }
}

impl<H: NativeHandle> fmt::Debug for OwnedHandle<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OwnedHandle")
            .field("kind", &H::KIND)
            .field("raw", &format_args!("{:#x}", self.raw.to_raw()))
            .field("released", &self.is_released())
            .finish()
    }
}

/// Keeps a handle from being released while a native call uses it.
pub struct HandlePin<'a, H: NativeHandle> {
    owner: &'a OwnedHandle<H>,
}

impl<H: NativeHandle> HandlePin<'_, H> {
    /// The raw handle, valid for as long as the pin lives.
    #[inline]
    pub fn raw(&self) -> H {
        self.owner.raw
    }
}

impl<H: NativeHandle> Drop for HandlePin<'_, H> {
    fn drop(&mut self) {
        self.owner.unpin();
    }
}

/// Wrap a batch of freshly created handles, all or nothing.
///
/// If any handle is null, every non-null one is released before the error
/// is returned, so a partially initialised batch never leaks.
pub fn wrap_all<H: NativeHandle>(
    runtime: &Runtime,
    raw: Vec<H>,
    parent: Option<&Arc<OwnedHandle<H>>>,
) -> Result<Vec<OwnedHandle<H>>> {
    if raw.iter().any(|h| h.to_raw() == 0) {
        for &handle in raw.iter().filter(|h| h.to_raw() != 0) {
            let code = unsafe { H::release(runtime.api(), handle) };
            if let Err(status) = ffi::check(code) {
                log::warn!("rolling back {} {:#x} failed: {}", H::KIND, handle.to_raw(), status);
            }
        }
        return Err(Error::NullHandle { kind: H::KIND });
    }

    raw.into_iter()
        .map(|handle| OwnedHandle::new(runtime, handle, parent.map(Arc::downgrade)))
        .collect()
}

/// Declare a resource facade: a cheap `Clone` view over one shared
/// [`OwnedHandle`], plus its generic attribute query.
macro_rules! facade {
    (
        $(#[$meta:meta])*
        pub struct $name:ident($raw:ty): $info_kind:ident via $get_info:ident;
    ) => {
        $(#[$meta])*
        #[derive(Clone)]
        pub struct $name {
            handle: ::std::sync::Arc<$crate::handle::OwnedHandle<$raw>>,
        }

        #[allow(dead_code)]
        impl $name {
            pub(crate) fn from_handle(handle: $crate::handle::OwnedHandle<$raw>) -> Self {
                Self {
                    handle: ::std::sync::Arc::new(handle),
                }
            }

            pub(crate) fn from_arc(handle: ::std::sync::Arc<$crate::handle::OwnedHandle<$raw>>) -> Self {
                Self { handle }
            }

            pub(crate) fn wrap(runtime: &$crate::Runtime, raw: $raw) -> $crate::Result<Self> {
                $crate::handle::OwnedHandle::wrap(runtime, raw).map(Self::from_handle)
            }

            pub(crate) fn retain_from(runtime: &$crate::Runtime, raw: $raw) -> $crate::Result<Self> {
                $crate::handle::OwnedHandle::retain_from(runtime, raw).map(Self::from_handle)
            }

            pub(crate) fn handles<'a>(items: &[&'a Self]) -> Vec<&'a $crate::handle::OwnedHandle<$raw>> {
                items.iter().map(|item| &*item.handle).collect()
            }

            /// The owned native handle.
            pub fn handle(&self) -> &$crate::handle::OwnedHandle<$raw> {
                &self.handle
            }

            /// The raw native handle, unless it was released.
            pub fn as_raw(&self) -> $crate::Result<$raw> {
                self.handle.as_raw()
            }

            /// The runtime this object belongs to.
            pub fn runtime(&self) -> &$crate::Runtime {
                self.handle.runtime()
            }

            /// Release the native reference now, for every clone.
            pub fn release(&self) -> $crate::Result<$crate::handle::Released> {
                self.handle.release()
            }

            pub fn is_released(&self) -> bool {
                self.handle.is_released()
            }

            /// Query any attribute of this object's info table.
            pub fn info<C: $crate::info::Codec>(
                &self,
                attr: $crate::info::Attribute<C>,
            ) -> $crate::Result<C::Value> {
                if attr.kind != $crate::info::InfoKind::$info_kind {
                    return Err($crate::Error::InvalidArgument(format!(
                        "{} is a {} attribute, not a {} one",
                        attr.name,
                        attr.kind,
                        $crate::info::InfoKind::$info_kind
                    )));
                }
                self.handle.query(attr, |api, raw, id, size, value, size_ret| unsafe {
                    api.$get_info(raw, id, size, value, size_ret)
                })
            }
        }

        impl ::std::fmt::Debug for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.debug_tuple(stringify!($name)).field(&*self.handle).finish()
            }
        }
    };
}

pub(crate) use facade;
