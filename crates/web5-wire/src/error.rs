//! Codec error types.
//!
//! Every decode failure is reported as a [`CodecError`]. The codec itself
//! never decides whether a failure is recoverable; the boundary layer that
//! lifts values out of native buffers escalates all of them to fatal faults.

use thiserror::Error;

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

/// Error type for decoding wire bytes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// The buffer ended before the value was complete.
    #[error("truncated buffer: needed {needed} bytes, {remaining} remaining")]
    Truncated { needed: usize, remaining: usize },

    /// Bytes were left over after a complete value was read.
    #[error("{remaining} trailing bytes remain after lifting value")]
    TrailingBytes { remaining: usize },

    /// A length or count prefix was negative.
    #[error("negative length prefix: {0}")]
    NegativeLength(i32),

    /// A boolean byte was neither 0 nor 1.
    #[error("invalid boolean byte: {0}")]
    InvalidBool(u8),

    /// An optional presence flag was neither 0 nor 1.
    #[error("invalid optional presence flag: {0}")]
    InvalidOptionFlag(u8),

    /// String bytes were not valid UTF-8.
    #[error("string is not valid UTF-8")]
    InvalidUtf8,

    /// A union discriminant did not name a known variant.
    #[error("unknown discriminant {value} for {type_name}")]
    UnknownDiscriminant {
        type_name: &'static str,
        value: i64,
    },

    /// A timestamp could not be represented.
    #[error("timestamp out of range: {seconds}s {nanos}ns")]
    InvalidTimestamp { seconds: i64, nanos: u32 },
}

impl CodecError {
    /// Creates an unknown discriminant error.
    pub fn unknown_discriminant(type_name: &'static str, value: impl Into<i64>) -> Self {
        CodecError::UnknownDiscriminant {
            type_name,
            value: value.into(),
        }
    }

    /// Returns true if this error means the two sides disagree on the schema
    /// rather than that the buffer was cut short.
    pub fn is_schema_skew(&self) -> bool {
        matches!(
            self,
            CodecError::TrailingBytes { .. } | CodecError::UnknownDiscriminant { .. }
        )
    }
}
