//! Handle types for opaque references to native objects.
//!
//! Each handle type is a pointer-width newtype so it can be passed straight
//! through the C ABI where the native library expects a pointer.

/// Macro to define a handle type.
macro_rules! define_handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[repr(transparent)]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub struct $name {
            _h: usize,
        }

        impl $name {
            /// Create an invalid (null) handle.
            #[inline]
            pub const fn invalid() -> Self {
                Self { _h: 0 }
            }

            /// Wrap a raw pointer-sized value received from the native library.
            #[inline]
            pub const fn from_raw(raw: usize) -> Self {
                Self { _h: raw }
            }

            /// The raw pointer-sized value.
            #[inline]
            pub const fn to_raw(self) -> usize {
                self._h
            }

            /// Check if this handle is valid (non-zero).
            #[inline]
            pub const fn is_valid(&self) -> bool {
                self._h != 0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::invalid()
            }
        }
    };
}

define_handle!(
    /// Opaque `cl_platform_id`.
    ClPlatform
);
define_handle!(
    /// Opaque `cl_device_id`.
    ClDevice
);
define_handle!(
    /// Opaque `cl_context`.
    ClContext
);
define_handle!(
    /// Opaque `cl_command_queue`.
    ClCommandQueue
);
define_handle!(
    /// Opaque `cl_program`.
    ClProgram
);
define_handle!(
    /// Opaque `cl_kernel`.
    ClKernel
);
define_handle!(
    /// Opaque `cl_mem`.
    ClMem
);
define_handle!(
    /// Opaque `cl_event`.
    ClEvent
);
define_handle!(
    /// Opaque `cl_sampler`.
    ClSampler
);
