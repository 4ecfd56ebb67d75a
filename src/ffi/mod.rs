//! FFI bindings to the native compute library.
//!
//! This module contains the low-level C ABI: handle newtypes, constants,
//! the entry point table and status code translation. Users should prefer the
//! safe Rust wrappers in the parent modules.

pub mod api;
pub mod error;
pub mod handles;
pub mod raw;

pub use api::{ClApi, ClLibrary};
pub use error::{check, Status};
pub use handles::*;
pub use raw::*;
