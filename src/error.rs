//! Error types for the clbind crate.

use thiserror::Error;

use crate::ffi::Status;
use crate::handle::ResourceKind;
use crate::info::{DecodeError, InfoKind};

/// Result type alias for clbind operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for clbind operations.
#[derive(Error, Debug)]
pub enum Error {
    /// A native entry point reported a failure status.
    #[error("{op} failed: {status}")]
    Native {
        /// Entry point that failed.
        op: &'static str,
        /// Decoded status.
        status: Status,
    },

    /// A native attribute query reported a failure status.
    #[error("querying {kind} attribute {attribute} failed: {status}")]
    Query {
        /// Which info table the attribute belongs to.
        kind: InfoKind,
        /// Attribute name.
        attribute: &'static str,
        /// Decoded status.
        status: Status,
    },

    /// Building, compiling or linking a program failed.
    #[error("{status}: {log}")]
    Build {
        /// Decoded status.
        status: Status,
        /// Build logs of every device, concatenated.
        log: String,
    },

    /// The wrapper was already released.
    #[error("{kind} handle already released")]
    Disposed {
        /// Kind of the released handle.
        kind: ResourceKind,
    },

    /// A null handle was handed to the binding.
    #[error("null {kind} handle")]
    NullHandle {
        /// Kind of the handle.
        kind: ResourceKind,
    },

    /// Function argument is invalid before reaching the native library.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The native size of a fixed-size attribute disagrees with its codec.
    #[error("{kind} attribute {attribute} reported {reported} bytes, codec expects {expected}")]
    SizeMismatch {
        /// Which info table the attribute belongs to.
        kind: InfoKind,
        /// Attribute name.
        attribute: &'static str,
        /// Size the codec declares.
        expected: usize,
        /// Size the native library reported.
        reported: usize,
    },

    /// The bytes returned for an attribute do not match its wire shape.
    #[error("decoding {kind} attribute {attribute}: {source}")]
    Decode {
        /// Which info table the attribute belongs to.
        kind: InfoKind,
        /// Attribute name.
        attribute: &'static str,
        /// What was wrong with the bytes.
        #[source]
        source: DecodeError,
    },

    /// A scratch buffer could not be allocated.
    #[error("out of host memory allocating {requested} bytes")]
    OutOfHostMemory {
        /// Requested size in bytes.
        requested: usize,
    },

    /// The native library could not be loaded.
    #[error("loading native library: {0}")]
    Library(#[from] libloading::Error),
}

impl Error {
    /// Check if this error reports use of a released handle.
    pub fn is_disposed(&self) -> bool {
        matches!(self, Error::Disposed { .. })
    }

    /// Check if this is a programming error caught by the binding itself.
    pub fn is_contract_violation(&self) -> bool {
        matches!(
            self,
            Error::NullHandle { .. }
                | Error::InvalidArgument(_)
                | Error::SizeMismatch { .. }
                | Error::Decode { .. }
        )
    }

    /// The native status, if the native library reported one.
    pub fn status(&self) -> Option<Status> {
        match self {
            Error::Native { status, .. }
            | Error::Query { status, .. }
            | Error::Build { status, .. } => Some(*status),
            _ => None,
        }
    }
}
