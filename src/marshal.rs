//! Lowering lists of wrappers to native `(count, pointer)` pairs.
//!
//! Every element is pinned before the native call and unpinned after it,
//! whether the call succeeds, fails or unwinds. If pinning any element
//! fails, the elements pinned so far are unpinned before the error is
//! returned and the native call never happens.

use std::ptr::{self, NonNull};

use crate::error::{Error, Result};
use crate::ffi::cl_uint;
use crate::handle::{HandlePin, NativeHandle, OwnedHandle};

/// A contiguous array of raw handles, valid while the pins that back it live.
pub struct RawList<'a, H> {
    raw: Option<&'a [H]>,
}

impl<H> RawList<'_, H> {
    /// Element count as the native `cl_uint`.
    pub fn len(&self) -> cl_uint {
        // Checked when the list was built.
        self.raw.map_or(0, |raw| raw.len() as cl_uint)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Null for an absent list. Non-null for a present one, even if empty.
    pub fn as_ptr(&self) -> *const H {
        match self.raw {
            None => ptr::null(),
            Some([]) => NonNull::<H>::dangling().as_ptr(),
            Some(raw) => raw.as_ptr(),
        }
    }

    pub fn as_slice(&self) -> &[H] {
        self.raw.unwrap_or(&[])
    }
}

/// Pin every handle in `handles` and run `body` with the raw array.
///
/// `None` lowers to `(0, null)`. `Some(&[])` lowers to a zero count with a
/// non-null pointer; whether the native library accepts that is its call.
pub fn with_pinned_handles<H, R>(
    handles: Option<&[&OwnedHandle<H>]>,
    body: impl FnOnce(RawList<'_, H>) -> R,
) -> Result<R>
where
    H: NativeHandle,
{
    let Some(handles) = handles else {
        return Ok(body(RawList { raw: None }));
    };

    if cl_uint::try_from(handles.len()).is_err() {
        return Err(Error::InvalidArgument(format!(
            "{} {} handles do not fit a native count",
            handles.len(),
            H::KIND
        )));
    }

    let mut pins: Vec<HandlePin<'_, H>> = Vec::with_capacity(handles.len());
    for handle in handles {
        // On error `pins` drops here and unpins what was taken.
        pins.push(handle.pin()?);
    }

    let raw: Vec<H> = pins.iter().map(HandlePin::raw).collect();
    let result = body(RawList {
        raw: Some(raw.as_slice()),
    });
    drop(pins);
    Ok(result)
}

/// Pin two independent lists, typically inputs plus a wait list.
pub fn with_pinned_pair<A, B, R>(
    first: Option<&[&OwnedHandle<A>]>,
    second: Option<&[&OwnedHandle<B>]>,
    body: impl FnOnce(RawList<'_, A>, RawList<'_, B>) -> R,
) -> Result<R>
where
    A: NativeHandle,
    B: NativeHandle,
{
    with_pinned_handles(first, |first| {
        with_pinned_handles(second, |second| body(first, second))
    })?
}
