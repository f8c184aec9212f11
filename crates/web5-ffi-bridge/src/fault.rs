//! Fatal boundary faults.
//!
//! A fault means the two sides of the boundary are out of sync, or a caller
//! broke the handle contract. Continuing risks memory corruption, so faults
//! are never returned as values: [`raise`] logs the fault and panics.

use thiserror::Error;
use web5_wire::CodecError;

/// An unrecoverable protocol violation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BridgeFault {
    /// The native core panicked and reported a message.
    #[error("native core panicked: {0}")]
    NativePanic(String),

    /// The native core panicked and could not report a message.
    #[error("native core panicked while handling a panic")]
    PanicWhileHandlingPanic,

    /// A call status carried a code outside the known set.
    #[error("unknown call status code: {0}")]
    UnknownStatusCode(i8),

    /// An entry point with no declared error type reported an error.
    #[error("function not returning an error returned an error")]
    UnexpectedError,

    /// Bytes from the native side did not decode as the expected shape.
    #[error("failed to lift {type_name} from native buffer: {source}")]
    Lift {
        type_name: &'static str,
        source: CodecError,
    },

    #[error("namespace mismatch: bindings expect {expected}, library is {actual}")]
    NamespaceMismatch { expected: String, actual: String },

    #[error("contract version mismatch: bindings expect {expected}, library reports {actual}")]
    ContractVersionMismatch { expected: u32, actual: u32 },

    #[error("checksum mismatch for {function}: bindings expect {expected}, library reports {actual}")]
    ChecksumMismatch {
        function: String,
        expected: u16,
        actual: u16,
    },

    #[error("library does not export a checksum for {0}")]
    MissingChecksum(String),

    /// `acquire` on an object whose last reference is gone.
    #[error("{kind} object already destroyed")]
    UseAfterDestroy { kind: &'static str },

    #[error("{kind} call counter would overflow")]
    CallCounterOverflow { kind: &'static str },

    /// More releases than acquires reached the counter.
    #[error("{kind} object released more times than it was acquired")]
    DoubleRelease { kind: &'static str },

    /// A raw object was wrapped as the wrong kind.
    #[error("expected {expected} object, got {actual}")]
    ObjectKindMismatch {
        expected: &'static str,
        actual: &'static str,
    },

    #[error("native core returned a null {kind} object")]
    NullObject { kind: &'static str },

    #[error("{kind} callback id space exhausted")]
    CallbackIdOverflow { kind: &'static str },

    /// A buffer length does not fit the boundary's length fields.
    #[error("buffer of {0} bytes is too large to cross the boundary")]
    BufferTooLarge(usize),
}

impl BridgeFault {
    pub fn lift<T>(source: CodecError) -> Self {
        BridgeFault::Lift {
            type_name: std::any::type_name::<T>(),
            source,
        }
    }
}

/// Logs a fault and aborts the current operation by panicking.
///
/// The panic message is the fault's display text, so tests can match it
/// with `#[should_panic(expected = ...)]`.
#[track_caller]
pub fn raise(fault: BridgeFault) -> ! {
    tracing::error!(fault = %fault, "fatal boundary fault");
    panic!("{fault}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_panic_while_handling_panic_message() {
        assert_eq!(
            BridgeFault::PanicWhileHandlingPanic.to_string(),
            "native core panicked while handling a panic"
        );
    }

    #[test]
    fn test_lift_names_type() {
        let fault = BridgeFault::lift::<u32>(CodecError::TrailingBytes { remaining: 2 });
        assert_eq!(
            fault.to_string(),
            "failed to lift u32 from native buffer: 2 trailing bytes remain after lifting value"
        );
    }

    #[test]
    #[should_panic(expected = "unknown call status code: 9")]
    fn test_raise_panics_with_message() {
        raise(BridgeFault::UnknownStatusCode(9));
    }
}
