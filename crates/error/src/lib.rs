//! TEAM_155: Kernel error handling infrastructure.
//!
//! Every subsystem declares its recoverable failures with `define_kernel_error!`.
//! A value carries a 16-bit code: the subsystem byte in the high half and the
//! variant byte in the low half, printed as `E{code:04X}`.
//!
//! Subsystem bytes in use:
//!
//! | Byte | Subsystem |
//! |------|-----------|
//! | 0x0A | Virtual memory (`los_vm`) |
//!
//! ## Usage
//!
//! ### Simple errors (no inner data)
//! ```ignore
//! define_kernel_error! {
//!     pub enum MemoryError(0x0A) {
//!         OutOfMemory = 0x01 => "Out of physical memory",
//!     }
//! }
//! ```
//!
//! ### Nested errors (with inner error type)
//! ```ignore
//! define_kernel_error! {
//!     pub enum SpawnError(0x03) {
//!         Memory(MemoryError) = 0x01 => "Address space creation failed",
//!     }
//! }
//! ```
//!
//! Nested variants get a `From<Inner>` impl so `?` lifts the inner error, and
//! `core::error::Error::source` returns the inner value.

#![no_std]

/// Defines a kernel error type with a subsystem code.
///
/// Supports both simple variants and nested variants containing inner errors.
#[macro_export]
macro_rules! define_kernel_error {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident($subsystem:literal) {
            $(
                $(#[$variant_meta:meta])*
                $variant:ident $(($inner:ty))? = $code:literal => $desc:literal
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        $vis enum $name {
            $(
                $(#[$variant_meta])*
                $variant $(($inner))?,
            )*
        }

        impl $name {
            /// Subsystem identifier for this error type.
            pub const SUBSYSTEM: u8 = $subsystem;

            /// Numeric error code, subsystem in the high byte.
            pub const fn code(&self) -> u16 {
                match self {
                    $(
                        $crate::define_kernel_error!(@pattern $variant $(($inner))? _unused) => {
                            (($subsystem as u16) << 8) | $code
                        }
                    )*
                }
            }

            /// Variant byte without the subsystem.
            pub const fn variant_code(&self) -> u8 {
                (self.code() & 0xFF) as u8
            }

            /// Short description for logging.
            pub const fn name(&self) -> &'static str {
                match self {
                    $(
                        $crate::define_kernel_error!(@pattern $variant $(($inner))? _unused) => {
                            $desc
                        }
                    )*
                }
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                match self {
                    $(
                        $crate::define_kernel_error!(@pattern $variant $(($inner))? inner) => {
                            $crate::define_kernel_error!(@display_body self f $desc $(($inner))? inner)
                        }
                    )*
                }
            }
        }

        impl core::error::Error for $name {
            fn source(&self) -> Option<&(dyn core::error::Error + 'static)> {
                match self {
                    $(
                        $crate::define_kernel_error!(@pattern $variant $(($inner))? inner) => {
                            $crate::define_kernel_error!(@source_body $(($inner))? inner)
                        }
                    )*
                }
            }
        }

        $(
            $crate::define_kernel_error!(@from $name $variant $(($inner))?);
        )*
    };

    (@pattern $variant:ident ($inner:ty) $bind:ident) => { Self::$variant($bind) };
    (@pattern $variant:ident $bind:ident) => { Self::$variant };

    (@display_body $self:ident $f:ident $desc:literal ($inner:ty) $bind:ident) => {
        write!($f, "E{:04X}: {} ({})", $self.code(), $desc, $bind)
    };
    (@display_body $self:ident $f:ident $desc:literal $bind:ident) => {
        write!($f, "E{:04X}: {}", $self.code(), $desc)
    };

    (@source_body ($inner:ty) $bind:ident) => { Some($bind) };
    (@source_body $bind:ident) => { None };

    (@from $name:ident $variant:ident ($inner:ty)) => {
        impl From<$inner> for $name {
            fn from(inner: $inner) -> Self {
                Self::$variant(inner)
            }
        }
    };
    (@from $name:ident $variant:ident) => {};
}

#[cfg(test)]
mod tests {
    extern crate std;
    use core::error::Error;
    use std::format;

    define_kernel_error! {
        /// Frame-level failures.
        pub enum FrameError(0x21) {
            /// No page left
            Exhausted = 0x01 => "No physical frame available",
            /// Frame not page aligned
            Misaligned = 0x02 => "Frame address not page aligned",
        }
    }

    define_kernel_error! {
        pub enum SpaceError(0x22) {
            Frame(FrameError) = 0x01 => "Address space setup failed",
            RangeExhausted = 0x02 => "No virtual range available",
        }
    }

    fn build_space(fail: bool) -> Result<(), SpaceError> {
        let frame: Result<(), FrameError> = if fail { Err(FrameError::Exhausted) } else { Ok(()) };
        frame?;
        Ok(())
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(FrameError::Exhausted.code(), 0x2101);
        assert_eq!(FrameError::Misaligned.code(), 0x2102);
        assert_eq!(SpaceError::Frame(FrameError::Misaligned).code(), 0x2201);
        assert_eq!(SpaceError::RangeExhausted.variant_code(), 0x02);
    }

    #[test]
    fn test_error_names() {
        assert_eq!(FrameError::Exhausted.name(), "No physical frame available");
        assert_eq!(
            SpaceError::Frame(FrameError::Exhausted).name(),
            "Address space setup failed"
        );
    }

    #[test]
    fn test_display_format() {
        assert_eq!(
            format!("{}", FrameError::Misaligned),
            "E2102: Frame address not page aligned"
        );
        assert_eq!(
            format!("{}", SpaceError::Frame(FrameError::Exhausted)),
            "E2201: Address space setup failed (E2101: No physical frame available)"
        );
    }

    #[test]
    fn test_question_mark_lifts_nested() {
        assert_eq!(build_space(false), Ok(()));
        assert_eq!(build_space(true), Err(SpaceError::Frame(FrameError::Exhausted)));
    }

    #[test]
    fn test_source_chain() {
        let err = SpaceError::Frame(FrameError::Misaligned);
        let source = err.source().map(|s| format!("{s}"));
        assert_eq!(source.as_deref(), Some("E2102: Frame address not page aligned"));
        assert!(SpaceError::RangeExhausted.source().is_none());
        assert!(FrameError::Exhausted.source().is_none());
    }

    #[test]
    fn test_subsystem_constant() {
        assert_eq!(FrameError::SUBSYSTEM, 0x21);
        assert_eq!(SpaceError::SUBSYSTEM, 0x22);
    }
}
