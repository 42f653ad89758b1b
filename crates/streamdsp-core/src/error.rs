//! Error types for the streamdsp-core foundational crate.
//!
//! This module provides a C-compatible error enum and a Result type alias
//! for use by the stack-allocated collections and math helpers in this crate.

use core::fmt;

/// Error codes for streamdsp-core operations.
///
/// Uses `#[repr(C)]` for C-compatible memory layout, enabling FFI usage.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CoreError {
    /// No error occurred.
    Ok = 0,
    /// A `StackVec` push was attempted past its fixed capacity.
    CapacityExceeded = 1,
    /// An index was out of bounds for the requested collection.
    IndexOutOfBounds = 2,
    /// An invalid parameter value was provided.
    InvalidParameter = 3,
}

impl fmt::Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoreError::Ok => write!(f, "no error"),
            CoreError::CapacityExceeded => write!(f, "capacity exceeded"),
            CoreError::IndexOutOfBounds => write!(f, "index out of bounds"),
            CoreError::InvalidParameter => write!(f, "invalid parameter"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for CoreError {}

/// Result type alias for streamdsp-core operations.
pub type Result<T> = core::result::Result<T, CoreError>;
