//! Typed attribute queries.
//!
//! Every piece of metadata on a native object is read with the same
//! two-phase protocol: ask the native library for the size of the value,
//! fetch that many bytes into a scratch buffer, then decode them. The
//! [`Codec`] of an [`Attribute`] names the wire shape; fixed-size shapes skip
//! the size probe unless size verification is enabled.

use std::fmt;
use std::marker::PhantomData;
use std::mem::size_of;
use std::os::raw::c_void;
use std::ptr;

use thiserror::Error;

use crate::error::{Error, Result};
use crate::ffi::{check, cl_image_format, cl_int, cl_uint};
use crate::handle::NativeHandle;

/// Width in bytes of pointer-sized values on the wire.
pub const POINTER_WIDTH: usize = size_of::<usize>();

/// The info table an attribute belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InfoKind {
    Platform,
    Device,
    Context,
    CommandQueue,
    Program,
    ProgramBuild,
    Kernel,
    KernelArg,
    KernelWorkGroup,
    MemObject,
    Image,
    Event,
    EventProfiling,
    Sampler,
}

impl fmt::Display for InfoKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            InfoKind::Platform => "platform",
            InfoKind::Device => "device",
            InfoKind::Context => "context",
            InfoKind::CommandQueue => "command queue",
            InfoKind::Program => "program",
            InfoKind::ProgramBuild => "program build",
            InfoKind::Kernel => "kernel",
            InfoKind::KernelArg => "kernel argument",
            InfoKind::KernelWorkGroup => "kernel work-group",
            InfoKind::MemObject => "memory object",
            InfoKind::Image => "image",
            InfoKind::Event => "event",
            InfoKind::EventProfiling => "event profiling",
            InfoKind::Sampler => "sampler",
        })
    }
}

/// The bytes of an attribute do not match its wire shape.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// A fixed-size value arrived with the wrong length.
    #[error("expected {expected} bytes, got {actual}")]
    Length { expected: usize, actual: usize },

    /// A string value does not end in NUL.
    #[error("string is not NUL-terminated")]
    Unterminated,

    /// A string value has a NUL before its terminator.
    #[error("string has an interior NUL at byte {position}")]
    InteriorNul { position: usize },

    /// An array value is not a whole number of elements.
    #[error("{len} bytes is not a multiple of the {width}-byte element size")]
    Ragged { len: usize, width: usize },

    /// A string value is not valid UTF-8.
    #[error("string is not valid UTF-8 after byte {valid_up_to}")]
    Utf8 { valid_up_to: usize },

    /// An enumerated value outside the known set.
    #[error("unknown value {value:#x}")]
    UnknownValue { value: i64 },
}

/// Decode rule and wire shape of one attribute type.
pub trait Codec {
    /// Decoded host value.
    type Value;

    /// `Some(n)` when the encoded size never varies.
    const FIXED_SIZE: Option<usize>;

    /// Decode the bytes the native library returned.
    fn decode(bytes: &[u8]) -> std::result::Result<Self::Value, DecodeError>;
}

fn fixed<const N: usize>(bytes: &[u8]) -> std::result::Result<[u8; N], DecodeError> {
    bytes.try_into().map_err(|_| DecodeError::Length {
        expected: N,
        actual: bytes.len(),
    })
}

fn words(bytes: &[u8]) -> std::result::Result<impl Iterator<Item = usize> + '_, DecodeError> {
    if bytes.len() % POINTER_WIDTH != 0 {
        return Err(DecodeError::Ragged {
            len: bytes.len(),
            width: POINTER_WIDTH,
        });
    }
    Ok(bytes.chunks_exact(POINTER_WIDTH).map(|chunk| {
        let mut word = [0u8; POINTER_WIDTH];
        word.copy_from_slice(chunk);
        usize::from_ne_bytes(word)
    }))
}

/// `cl_uint`.
pub struct Uint;

impl Codec for Uint {
    type Value = u32;
    const FIXED_SIZE: Option<usize> = Some(4);

    fn decode(bytes: &[u8]) -> std::result::Result<u32, DecodeError> {
        Ok(u32::from_ne_bytes(fixed(bytes)?))
    }
}

/// `cl_int`.
pub struct Int;

impl Codec for Int {
    type Value = i32;
    const FIXED_SIZE: Option<usize> = Some(4);

    fn decode(bytes: &[u8]) -> std::result::Result<i32, DecodeError> {
        Ok(i32::from_ne_bytes(fixed(bytes)?))
    }
}

/// `cl_ulong` and 64-bit bitfields.
pub struct Ulong;

impl Codec for Ulong {
    type Value = u64;
    const FIXED_SIZE: Option<usize> = Some(8);

    fn decode(bytes: &[u8]) -> std::result::Result<u64, DecodeError> {
        Ok(u64::from_ne_bytes(fixed(bytes)?))
    }
}

/// `cl_bool`, the size of a native `int`. Non-zero is true.
pub struct Bool;

impl Codec for Bool {
    type Value = bool;
    const FIXED_SIZE: Option<usize> = Some(4);

    fn decode(bytes: &[u8]) -> std::result::Result<bool, DecodeError> {
        Ok(u32::from_ne_bytes(fixed(bytes)?) != 0)
    }
}

/// `size_t`.
pub struct Size;

impl Codec for Size {
    type Value = usize;
    const FIXED_SIZE: Option<usize> = Some(POINTER_WIDTH);

    fn decode(bytes: &[u8]) -> std::result::Result<usize, DecodeError> {
        Ok(usize::from_ne_bytes(fixed(bytes)?))
    }
}

/// NUL-terminated `char[]`.
pub struct Str;

impl Codec for Str {
    type Value = String;
    const FIXED_SIZE: Option<usize> = None;

    fn decode(bytes: &[u8]) -> std::result::Result<String, DecodeError> {
        let Some((&last, text)) = bytes.split_last() else {
            return Ok(String::new());
        };
        if last != 0 {
            return Err(DecodeError::Unterminated);
        }
        if let Some(position) = text.iter().position(|&b| b == 0) {
            return Err(DecodeError::InteriorNul { position });
        }
        String::from_utf8(text.to_vec()).map_err(|err| DecodeError::Utf8 {
            valid_up_to: err.utf8_error().valid_up_to(),
        })
    }
}

/// `size_t[]`.
pub struct SizeArray;

impl Codec for SizeArray {
    type Value = Vec<usize>;
    const FIXED_SIZE: Option<usize> = None;

    fn decode(bytes: &[u8]) -> std::result::Result<Vec<usize>, DecodeError> {
        Ok(words(bytes)?.collect())
    }
}

/// `intptr_t[]`, used for zero-terminated property lists.
pub struct Properties;

impl Codec for Properties {
    type Value = Vec<isize>;
    const FIXED_SIZE: Option<usize> = None;

    fn decode(bytes: &[u8]) -> std::result::Result<Vec<isize>, DecodeError> {
        Ok(words(bytes)?.map(|w| w as isize).collect())
    }
}

/// Three `size_t` values.
pub struct SizeTriple;

impl Codec for SizeTriple {
    type Value = [usize; 3];
    const FIXED_SIZE: Option<usize> = Some(3 * POINTER_WIDTH);

    fn decode(bytes: &[u8]) -> std::result::Result<[usize; 3], DecodeError> {
        if bytes.len() != 3 * POINTER_WIDTH {
            return Err(DecodeError::Length {
                expected: 3 * POINTER_WIDTH,
                actual: bytes.len(),
            });
        }
        let mut out = [0usize; 3];
        for (slot, word) in out.iter_mut().zip(words(bytes)?) {
            *slot = word;
        }
        Ok(out)
    }
}

/// One native handle. Null decodes to `None`.
pub struct HandleOf<H>(PhantomData<H>);

impl<H: NativeHandle> Codec for HandleOf<H> {
    type Value = Option<H>;
    const FIXED_SIZE: Option<usize> = Some(POINTER_WIDTH);

    fn decode(bytes: &[u8]) -> std::result::Result<Option<H>, DecodeError> {
        let raw = usize::from_ne_bytes(fixed(bytes)?);
        Ok((raw != 0).then(|| H::from_raw(raw)))
    }
}

/// An array of native handles.
pub struct HandleArray<H>(PhantomData<H>);

impl<H: NativeHandle> Codec for HandleArray<H> {
    type Value = Vec<H>;
    const FIXED_SIZE: Option<usize> = None;

    fn decode(bytes: &[u8]) -> std::result::Result<Vec<H>, DecodeError> {
        Ok(words(bytes)?.map(H::from_raw).collect())
    }
}

/// `cl_image_format`.
pub struct ImageFormat;

impl Codec for ImageFormat {
    type Value = cl_image_format;
    const FIXED_SIZE: Option<usize> = Some(size_of::<cl_image_format>());

    fn decode(bytes: &[u8]) -> std::result::Result<cl_image_format, DecodeError> {
        let raw: [u8; 8] = fixed(bytes)?;
        let (order, data_type) = raw.split_at(4);
        Ok(cl_image_format {
            image_channel_order: u32::from_ne_bytes(fixed(order)?),
            image_channel_data_type: u32::from_ne_bytes(fixed(data_type)?),
        })
    }
}

/// A statically known attribute: its table, native identifier and codec.
pub struct Attribute<C> {
    /// Which info table the attribute belongs to.
    pub kind: InfoKind,
    /// Native selector.
    pub id: cl_uint,
    /// Native constant name, used in error messages.
    pub name: &'static str,
    _codec: PhantomData<fn() -> C>,
}

impl<C> Attribute<C> {
    pub const fn new(kind: InfoKind, id: cl_uint, name: &'static str) -> Self {
        Self {
            kind,
            id,
            name,
            _codec: PhantomData,
        }
    }

    /// Error for a decoded value outside the enumeration it should belong to.
    pub(crate) fn unknown_value(&self, value: impl Into<i64>) -> Error {
        Error::Decode {
            kind: self.kind,
            attribute: self.name,
            source: DecodeError::UnknownValue {
                value: value.into(),
            },
        }
    }

    fn failed(&self, status: crate::ffi::Status) -> Error {
        Error::Query {
            kind: self.kind,
            attribute: self.name,
            status,
        }
    }
}

impl<C> Clone for Attribute<C> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<C> Copy for Attribute<C> {}

impl<C> fmt::Debug for Attribute<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Attribute")
            .field("kind", &self.kind)
            .field("id", &format_args!("{:#06x}", self.id))
            .field("name", &self.name)
            .finish()
    }
}

/// Declare attribute constants for one info table.
macro_rules! attributes {
    ($kind:ident { $($(#[$meta:meta])* $name:ident: $codec:ty = $id:ident;)* }) => {
        $(
            $(#[$meta])*
            pub const $name: $crate::info::Attribute<$codec> = $crate::info::Attribute::new(
                $crate::info::InfoKind::$kind,
                $crate::ffi::$id,
                stringify!($id),
            );
        )*
    };
}

pub(crate) use attributes;

#[cfg(test)]
thread_local! {
    static LIVE_SCRATCH: std::cell::Cell<usize> = const { std::cell::Cell::new(0) };
}

/// Transient memory for one native info call, freed on every exit path.
struct Scratch {
    buf: Vec<u8>,
}

impl Scratch {
    fn allocate(len: usize) -> Result<Self> {
        let mut buf = Vec::new();
        buf.try_reserve_exact(len)
            .map_err(|_| Error::OutOfHostMemory { requested: len })?;
        buf.resize(len, 0);
        #[cfg(test)]
        LIVE_SCRATCH.with(|live| live.set(live.get() + 1));
        Ok(Self { buf })
    }
}

impl Drop for Scratch {
    fn drop(&mut self) {
        #[cfg(test)]
        LIVE_SCRATCH.with(|live| live.set(live.get() - 1));
    }
}

/// Query one attribute through `get_info`.
///
/// `get_info(id, size, value, size_ret)` is the native "get info" entry
/// point with the handle (and any secondary selector) already bound.
pub(crate) fn query<C, F>(attr: Attribute<C>, verify_sizes: bool, get_info: F) -> Result<C::Value>
where
    C: Codec,
    F: FnMut(cl_uint, usize, *mut c_void, *mut usize) -> cl_int,
{
    let probe = C::FIXED_SIZE.is_none() || verify_sizes;
    fetch(attr, C::FIXED_SIZE, probe, get_info)
}

/// Query an attribute whose size comes from a lookup rather than its codec.
///
/// The reported size is always checked against `required`.
pub(crate) fn query_sized<C, F>(attr: Attribute<C>, required: usize, get_info: F) -> Result<C::Value>
where
    C: Codec,
    F: FnMut(cl_uint, usize, *mut c_void, *mut usize) -> cl_int,
{
    fetch(attr, Some(required), true, get_info)
}

fn fetch<C, F>(attr: Attribute<C>, expected: Option<usize>, probe: bool, mut get_info: F) -> Result<C::Value>
where
    C: Codec,
    F: FnMut(cl_uint, usize, *mut c_void, *mut usize) -> cl_int,
{
    let required = match expected {
        Some(n) if !probe => n,
        _ => {
            let mut reported = 0usize;
            check(get_info(attr.id, 0, ptr::null_mut(), &mut reported))
                .map_err(|status| attr.failed(status))?;
            if let Some(n) = expected {
                if reported != n {
                    return Err(Error::SizeMismatch {
                        kind: attr.kind,
                        attribute: attr.name,
                        expected: n,
                        reported,
                    });
                }
            }
            reported
        }
    };

    log::trace!("{} {}: {} bytes", attr.kind, attr.name, required);

    if required == 0 {
        return decode(attr, &[]);
    }

    let mut scratch = Scratch::allocate(required)?;
    let mut actual = 0usize;
    check(get_info(
        attr.id,
        required,
        scratch.buf.as_mut_ptr().cast(),
        &mut actual,
    ))
    .map_err(|status| attr.failed(status))?;

    if actual > required {
        return Err(Error::SizeMismatch {
            kind: attr.kind,
            attribute: attr.name,
            expected: required,
            reported: actual,
        });
    }
    decode(attr, &scratch.buf[..actual])
}

fn decode<C: Codec>(attr: Attribute<C>, bytes: &[u8]) -> Result<C::Value> {
    C::decode(bytes).map_err(|source| Error::Decode {
        kind: attr.kind,
        attribute: attr.name,
        source,
    })
}
