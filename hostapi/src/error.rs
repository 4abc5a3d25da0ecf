//! Host-side error types for the hostbridge.
//!
//! Two kinds of failure cross the boundary:
//!
//! - [`HostException`] is an error *thrown by the host operation itself*
//!   (a DOM `InvalidCharacterError`, a WebGL `TypeError`, ...). Fallible
//!   bindings park it in the instance's pending-exception slot.
//! - [`HostError`] is a *bridge fault* found while marshalling arguments:
//!   a dead handle, a pointer outside linear memory, bytes that are not
//!   UTF-8, an object of the wrong type.

use hostbridge_primitives::{ClosureError, CodecError, ErrorCode, HandleError};
use std::fmt;

/// An error object thrown by a host operation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{name}: {message}")]
pub struct HostException {
    /// Error class, e.g. `TypeError` or `InvalidStateError`.
    pub name: String,
    pub message: String,
    /// Call frames, innermost first. Empty for errors thrown by the host.
    pub frames: Vec<String>,
}

impl HostException {
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            message: message.into(),
            frames: Vec::new(),
        }
    }

    pub fn with_frames(mut self, frames: Vec<String>) -> Self {
        self.frames = frames;
        self
    }

    /// `error.stack`: the `Name: message` line followed by one
    /// `    at <frame>` line per frame.
    pub fn stack(&self) -> String {
        let mut stack = format!("{}: {}", self.name, self.message);
        for frame in &self.frames {
            stack.push_str("\n    at ");
            stack.push_str(frame);
        }
        stack
    }

    pub fn type_error(message: impl Into<String>) -> Self {
        Self::new("TypeError", message)
    }

    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::new("InvalidStateError", message)
    }

    pub fn invalid_character(message: impl Into<String>) -> Self {
        Self::new("InvalidCharacterError", message)
    }

    pub fn hierarchy_request(message: impl Into<String>) -> Self {
        Self::new("HierarchyRequestError", message)
    }

    pub fn not_allowed(message: impl Into<String>) -> Self {
        Self::new("NotAllowedError", message)
    }
}

/// Bridge fault raised while marshalling a call.
///
/// Fallible bindings report it as an `i32` status via
/// [`to_error_code`](HostError::to_error_code); infallible bindings trap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostError {
    /// A fault with no further detail.
    Code(ErrorCode),
    /// The handle resolved to a value of the wrong type.
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },
    /// An internal host error not directly mapped to a status code.
    /// Returned to the guest as `ERR_INTERNAL`.
    Internal(String),
}

impl HostError {
    /// Convert to the `i32` status returned to the WASM guest.
    pub fn to_error_code(&self) -> i32 {
        match self {
            Self::Code(code) => code.as_i32(),
            Self::TypeMismatch { .. } => ErrorCode::TypeMismatch as i32,
            Self::Internal(_) => ErrorCode::Internal as i32,
        }
    }

    pub fn bad_handle() -> Self {
        Self::Code(ErrorCode::BadHandle)
    }

    pub fn bad_pointer() -> Self {
        Self::Code(ErrorCode::BadPointer)
    }

    pub fn invalid_utf8() -> Self {
        Self::Code(ErrorCode::InvalidUtf8)
    }

    pub fn closure_unavailable() -> Self {
        Self::Code(ErrorCode::ClosureUnavailable)
    }

    pub fn type_mismatch(expected: &'static str, found: &'static str) -> Self {
        Self::TypeMismatch { expected, found }
    }
}

impl fmt::Display for HostError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Code(code) => write!(f, "host error: {}", code),
            Self::TypeMismatch { expected, found } => {
                write!(f, "host error: expected {}, found {}", expected, found)
            }
            Self::Internal(msg) => write!(f, "internal host error: {}", msg),
        }
    }
}

impl std::error::Error for HostError {}

impl From<ErrorCode> for HostError {
    fn from(code: ErrorCode) -> Self {
        Self::Code(code)
    }
}

impl From<HandleError> for HostError {
    fn from(err: HandleError) -> Self {
        Self::Code(err.into())
    }
}

impl From<CodecError> for HostError {
    fn from(err: CodecError) -> Self {
        Self::Code(err.into())
    }
}

impl From<ClosureError> for HostError {
    fn from(err: ClosureError) -> Self {
        Self::Code(err.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_conversion() {
        assert_eq!(HostError::bad_handle().to_error_code(), 2);
        assert_eq!(HostError::bad_pointer().to_error_code(), 3);
        assert_eq!(HostError::invalid_utf8().to_error_code(), 4);
        assert_eq!(HostError::type_mismatch("Element", "Window").to_error_code(), 5);
        assert_eq!(HostError::closure_unavailable().to_error_code(), 6);
        assert_eq!(HostError::Internal("boom".into()).to_error_code(), 7);
    }

    #[test]
    fn test_from_primitive_errors() {
        let err: HostError = HandleError::Released(9).into();
        assert_eq!(err, HostError::bad_handle());
        let err: HostError = CodecError::InvalidUtf8 { valid_up_to: 3 }.into();
        assert_eq!(err, HostError::invalid_utf8());
        let err: HostError = ClosureError::Unavailable(1).into();
        assert_eq!(err, HostError::closure_unavailable());
    }

    #[test]
    fn test_display() {
        let s = HostError::type_mismatch("WebGLBuffer", "Window").to_string();
        assert!(s.contains("WebGLBuffer"));
        assert!(s.contains("Window"));

        let s = HostError::bad_pointer().to_string();
        assert!(s.contains("ERR_BAD_POINTER"));
    }

    #[test]
    fn test_exception_display() {
        let e = HostException::invalid_character("'1div' is not a valid tag name");
        assert_eq!(e.name, "InvalidCharacterError");
        assert_eq!(e.to_string(), "InvalidCharacterError: '1div' is not a valid tag name");
    }

    #[test]
    fn test_exception_stack() {
        let e = HostException::type_error("bad");
        assert_eq!(e.stack(), "TypeError: bad");
        let e = HostException::new("Error", "panicked").with_frames(vec!["report".into(), "main".into()]);
        assert_eq!(e.stack(), "Error: panicked\n    at report\n    at main");
        // Display stays the one-line form.
        assert_eq!(e.to_string(), "Error: panicked");
    }
}
