//! Call status codes and the status record every boundary call fills in.

use std::fmt;

use crate::buffer::TransferBuffer;

/// Outcome of one boundary call, as reported by the callee.
#[repr(i8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallStatusCode {
    /// The primary return value is valid.
    Success = 0,
    /// `error_buf` holds a wire-encoded domain error.
    Error = 1,
    /// The callee panicked. `error_buf` holds the message, or is empty if
    /// the callee panicked again while reporting it.
    Panic = 2,
}

impl CallStatusCode {
    /// Returns `None` for codes outside the protocol.
    pub fn from_raw(code: i8) -> Option<Self> {
        match code {
            0 => Some(CallStatusCode::Success),
            1 => Some(CallStatusCode::Error),
            2 => Some(CallStatusCode::Panic),
            _ => None,
        }
    }

    pub const fn as_raw(self) -> i8 {
        self as i8
    }

    pub fn is_success(&self) -> bool {
        *self == CallStatusCode::Success
    }
}

impl fmt::Display for CallStatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CallStatusCode::Success => "CALL_SUCCESS",
            CallStatusCode::Error => "CALL_ERROR",
            CallStatusCode::Panic => "CALL_UNEXPECTED_ERROR",
        };
        write!(f, "{}", s)
    }
}

/// Out-parameter passed to every native entry point.
///
/// Created fresh per call with code 0 and a null buffer.
#[repr(C)]
#[derive(Debug, Default)]
pub struct CallStatus {
    pub code: i8,
    pub error_buf: TransferBuffer,
}

impl CallStatus {
    pub fn code(&self) -> Option<CallStatusCode> {
        CallStatusCode::from_raw(self.code)
    }

    /// Records a domain error. Used by the native side.
    pub fn set_error(&mut self, error_buf: TransferBuffer) {
        self.code = CallStatusCode::Error.as_raw();
        self.error_buf = error_buf;
    }

    /// Records a panic. An empty buffer signals that no message could be
    /// produced.
    pub fn set_panic(&mut self, message_buf: TransferBuffer) {
        self.code = CallStatusCode::Panic.as_raw();
        self.error_buf = message_buf;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_from_raw() {
        assert_eq!(CallStatusCode::from_raw(0), Some(CallStatusCode::Success));
        assert_eq!(CallStatusCode::from_raw(1), Some(CallStatusCode::Error));
        assert_eq!(CallStatusCode::from_raw(2), Some(CallStatusCode::Panic));
        assert_eq!(CallStatusCode::from_raw(3), None);
        assert_eq!(CallStatusCode::from_raw(-1), None);
    }

    #[test]
    fn test_default_status_is_success() {
        let status = CallStatus::default();
        assert_eq!(status.code(), Some(CallStatusCode::Success));
        assert!(status.error_buf.is_null());
    }

    #[test]
    fn test_set_error() {
        let mut status = CallStatus::default();
        status.set_error(TransferBuffer::from_vec(vec![1]));
        assert_eq!(status.code, 1);
        drop(unsafe { std::mem::take(&mut status.error_buf).into_vec() });
    }
}
