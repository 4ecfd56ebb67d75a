//! Runtime configuration.

use std::env;
use std::path::PathBuf;

/// Environment variable naming the native library to load.
pub const LIBRARY_ENV: &str = "CLBIND_LIBRARY";

/// Environment variable toggling fixed-size attribute verification.
pub const VERIFY_INFO_SIZES_ENV: &str = "CLBIND_VERIFY_INFO_SIZES";

/// Options for loading and driving the native library.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
    /// Path of the native library (None for the platform default).
    pub library_path: Option<PathBuf>,
    /// Probe the size of fixed-size attributes and check it against the codec.
    ///
    /// Enabled by default in debug builds.
    pub verify_info_sizes: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            library_path: None,
            verify_info_sizes: cfg!(debug_assertions),
        }
    }
}

impl Options {
    /// Default options overridden by `CLBIND_LIBRARY` and `CLBIND_VERIFY_INFO_SIZES`.
    pub fn from_env() -> Self {
        let mut opts = Self::default();
        if let Some(path) = env::var_os(LIBRARY_ENV).filter(|p| !p.is_empty()) {
            opts.library_path = Some(PathBuf::from(path));
        }
        if let Ok(value) = env::var(VERIFY_INFO_SIZES_ENV) {
            match parse_flag(&value) {
                Some(flag) => opts.verify_info_sizes = flag,
                None => log::warn!("ignoring {}={:?}: expected a boolean", VERIFY_INFO_SIZES_ENV, value),
            }
        }
        opts
    }

    /// The library path to load: the configured one or the platform default.
    pub fn resolved_library_path(&self) -> PathBuf {
        self.library_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(default_library_name()))
    }
}

/// Platform default name of the native library.
pub fn default_library_name() -> &'static str {
    if cfg!(target_os = "windows") {
        "OpenCL.dll"
    } else if cfg!(target_os = "macos") {
        "/System/Library/Frameworks/OpenCL.framework/OpenCL"
    } else {
        "libOpenCL.so.1"
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
