//! The loaded native library shared by every handle.

use std::fmt;
use std::ptr;
use std::sync::Arc;

use crate::config::Options;
use crate::error::Result;
use crate::ffi::{self, ClApi, ClLibrary, ClPlatform};
use crate::handle::wrap_all;
use crate::platform::Platform;

/// A native API table plus the options it is driven with.
///
/// Cloning is cheap. Every handle keeps a clone, so the library stays loaded
/// until the last handle is released.
#[derive(Clone)]
pub struct Runtime {
    inner: Arc<Inner>,
}

struct Inner {
    api: Arc<dyn ClApi>,
    options: Options,
}

impl Runtime {
    /// Load the native library using [`Options::from_env`].
    pub fn load() -> Result<Self> {
        Self::load_with(Options::from_env())
    }

    /// Load the native library with explicit options.
    pub fn load_with(options: Options) -> Result<Self> {
        let path = options.resolved_library_path();
        let library = unsafe { ClLibrary::open(&path)? };
        log::info!("loaded native library {}", path.display());
        Ok(Self::with_api(Arc::new(library), options))
    }

    /// Drive an already available [`ClApi`] implementation.
    pub fn with_api(api: Arc<dyn ClApi>, options: Options) -> Self {
        Self {
            inner: Arc::new(Inner { api, options }),
        }
    }

    /// The native entry point table.
    pub fn api(&self) -> &dyn ClApi {
        &*self.inner.api
    }

    /// The options this runtime was created with.
    pub fn options(&self) -> &Options {
        &self.inner.options
    }

    /// Enumerate the available platforms.
    pub fn platforms(&self) -> Result<Vec<Platform>> {
        let api = self.api();
        let mut count = 0;
        let code = unsafe { api.clGetPlatformIDs(0, ptr::null_mut(), &mut count) };
        ffi::error::check_call(code, "clGetPlatformIDs")?;
        if count == 0 {
            return Ok(Vec::new());
        }

        let mut raw = vec![ClPlatform::invalid(); count as usize];
        let code = unsafe { api.clGetPlatformIDs(count, raw.as_mut_ptr(), ptr::null_mut()) };
        ffi::error::check_call(code, "clGetPlatformIDs")?;

        Ok(wrap_all(self, raw, None)?
            .into_iter()
            .map(Platform::from_handle)
            .collect())
    }
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("options", &self.inner.options)
            .finish_non_exhaustive()
    }
}
