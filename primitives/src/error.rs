//! Error types for the hostbridge boundary.
//!
//! `ErrorCode` values are returned as `i32` by fallible bindings and must
//! stay stable across host and guest builds.

use core::fmt;

/// Status codes returned by fallible host bindings.
///
/// `0` = OK. `Threw` means the host operation raised an exception which is
/// now parked in the instance's pending-exception slot. Everything else is a
/// bridge fault detected before the host operation ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum ErrorCode {
    Ok = 0,
    Threw = 1,
    BadHandle = 2,
    BadPointer = 3,
    InvalidUtf8 = 4,
    TypeMismatch = 5,
    ClosureUnavailable = 6,
    Internal = 7,
}

impl ErrorCode {
    /// Convert from an i32 status returned by a host binding.
    pub fn from_i32(code: i32) -> Option<Self> {
        match code {
            0 => Some(Self::Ok),
            1 => Some(Self::Threw),
            2 => Some(Self::BadHandle),
            3 => Some(Self::BadPointer),
            4 => Some(Self::InvalidUtf8),
            5 => Some(Self::TypeMismatch),
            6 => Some(Self::ClosureUnavailable),
            7 => Some(Self::Internal),
            _ => None,
        }
    }

    /// Return the i32 representation of this status code.
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Returns true if this is the `Ok` variant.
    pub fn is_ok(self) -> bool {
        matches!(self, Self::Ok)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ok => write!(f, "OK"),
            Self::Threw => write!(f, "ERR_THREW"),
            Self::BadHandle => write!(f, "ERR_BAD_HANDLE"),
            Self::BadPointer => write!(f, "ERR_BAD_POINTER"),
            Self::InvalidUtf8 => write!(f, "ERR_INVALID_UTF8"),
            Self::TypeMismatch => write!(f, "ERR_TYPE_MISMATCH"),
            Self::ClosureUnavailable => write!(f, "ERR_CLOSURE_UNAVAILABLE"),
            Self::Internal => write!(f, "ERR_INTERNAL"),
        }
    }
}

/// Misuse of a handle table slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleError {
    /// The handle is past the end of the table.
    OutOfRange(u32),
    /// The slot exists but is on the free list.
    Released(u32),
}

impl fmt::Display for HandleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfRange(h) => write!(f, "handle {} is out of range", h),
            Self::Released(h) => write!(f, "handle {} was already released", h),
        }
    }
}

impl From<HandleError> for ErrorCode {
    fn from(_: HandleError) -> Self {
        Self::BadHandle
    }
}

/// String codec failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodecError {
    /// The byte range is not valid UTF-8. `valid_up_to` is the length of the
    /// longest valid prefix.
    InvalidUtf8 { valid_up_to: usize },
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidUtf8 { valid_up_to } => {
                write!(f, "invalid utf-8 after {} valid bytes", valid_up_to)
            }
        }
    }
}

impl From<CodecError> for ErrorCode {
    fn from(_: CodecError) -> Self {
        Self::InvalidUtf8
    }
}

/// Closure table failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClosureError {
    /// No closure with this id is registered (never was, or already destroyed).
    Unknown(u32),
    /// The closure is registered but currently cannot be entered: it is
    /// already running (re-entrant call) or its owner dropped it.
    Unavailable(u32),
}

impl fmt::Display for ClosureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown(id) => write!(f, "closure {} is not registered", id),
            Self::Unavailable(id) => {
                write!(f, "closure {} invoked recursively or destroyed already", id)
            }
        }
    }
}

impl From<ClosureError> for ErrorCode {
    fn from(_: ClosureError) -> Self {
        Self::ClosureUnavailable
    }
}

#[cfg(feature = "std")]
impl std::error::Error for HandleError {}

#[cfg(feature = "std")]
impl std::error::Error for CodecError {}

#[cfg(feature = "std")]
impl std::error::Error for ClosureError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_repr_values() {
        assert_eq!(ErrorCode::Ok as i32, 0);
        assert_eq!(ErrorCode::Threw as i32, 1);
        assert_eq!(ErrorCode::BadHandle as i32, 2);
        assert_eq!(ErrorCode::BadPointer as i32, 3);
        assert_eq!(ErrorCode::InvalidUtf8 as i32, 4);
        assert_eq!(ErrorCode::TypeMismatch as i32, 5);
        assert_eq!(ErrorCode::ClosureUnavailable as i32, 6);
        assert_eq!(ErrorCode::Internal as i32, 7);
    }

    #[test]
    fn test_error_code_from_i32_roundtrip() {
        for code in 0..=7 {
            let ec = ErrorCode::from_i32(code).unwrap();
            assert_eq!(ec.as_i32(), code);
        }
        assert_eq!(ErrorCode::from_i32(-1), None);
        assert_eq!(ErrorCode::from_i32(8), None);
    }

    #[test]
    fn test_fault_conversions() {
        assert_eq!(ErrorCode::from(HandleError::Released(40)), ErrorCode::BadHandle);
        assert_eq!(
            ErrorCode::from(CodecError::InvalidUtf8 { valid_up_to: 0 }),
            ErrorCode::InvalidUtf8
        );
        assert_eq!(ErrorCode::from(ClosureError::Unknown(1)), ErrorCode::ClosureUnavailable);
    }

    #[test]
    fn test_display() {
        let s = alloc::format!("{}", ErrorCode::Threw);
        assert_eq!(s, "ERR_THREW");
        let s = alloc::format!("{}", HandleError::Released(41));
        assert!(s.contains("41"));
    }
}
