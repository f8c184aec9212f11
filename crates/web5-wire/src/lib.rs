//! Wire codec for values crossing the web5 native boundary.
//!
//! Every structured value that moves between the host bindings and the
//! native core is flattened into one contiguous byte buffer. This crate
//! defines that encoding:
//!
//! - Integers and floats: fixed width, big-endian
//! - Booleans: one byte, 0 or 1
//! - Strings and byte arrays: 4-byte length prefix, then the raw bytes
//! - Optionals: 1-byte presence flag, then the value if present
//! - Sequences and maps: 4-byte count prefix, then the elements in order
//! - Records: each field in declaration order, no tags ([`wire_record!`])
//! - Unions: discriminant (1-based), then the variant's fields ([`wire_enum!`])
//! - Timestamps: i64 seconds + u32 nanoseconds
//!
//! Records carry no field tags, so both sides must agree on the schema out
//! of band. [`lift`] refuses buffers with bytes left over after the value
//! so that schema skew is caught at the first call rather than silently
//! producing wrong data.
//!
//! # Example
//!
//! ```
//! use web5_wire::{lift, lower, wire_record};
//!
//! #[derive(Debug, PartialEq)]
//! struct Key {
//!     kty: String,
//!     crv: Option<String>,
//! }
//!
//! wire_record!(Key { kty, crv });
//!
//! let key = Key { kty: "OKP".to_string(), crv: None };
//! let bytes = lower(&key);
//! assert_eq!(lift::<Key>(&bytes).unwrap(), key);
//! ```

mod collections;
mod error;
mod primitives;
mod schema;
mod timestamp;

pub use error::{CodecError, CodecResult};
pub use primitives::ByteArray;

/// A value with a wire representation.
///
/// `write` appends the encoding to a growable buffer; `read` consumes the
/// encoding from the front of a byte slice, advancing it.
pub trait Wire: Sized {
    /// Appends the encoding of `self` to `buf`.
    fn write(&self, buf: &mut Vec<u8>);

    /// Reads a value from the front of `buf`, advancing past it.
    fn read(buf: &mut &[u8]) -> CodecResult<Self>;

    /// Encodes `self` as a complete top-level buffer.
    ///
    /// This is the same as [`write`](Wire::write) for every shape except
    /// strings, which travel as bare UTF-8 when they are the whole buffer.
    fn lower_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        self.write(&mut buf);
        buf
    }

    /// Decodes a complete top-level buffer, rejecting trailing bytes.
    fn lift_bytes(bytes: &[u8]) -> CodecResult<Self> {
        let mut cursor = bytes;
        let value = Self::read(&mut cursor)?;
        if !cursor.is_empty() {
            return Err(CodecError::TrailingBytes {
                remaining: cursor.len(),
            });
        }
        Ok(value)
    }
}

/// Encodes a value into a fresh top-level buffer.
pub fn lower<T: Wire>(value: &T) -> Vec<u8> {
    value.lower_bytes()
}

/// Decodes a top-level buffer into a value.
///
/// Fails if the buffer is shorter than the value's encoding or if any
/// bytes remain once the value has been read.
pub fn lift<T: Wire>(bytes: &[u8]) -> CodecResult<T> {
    T::lift_bytes(bytes)
}

/// Splits `n` bytes off the front of `buf`.
pub(crate) fn take<'a>(buf: &mut &'a [u8], n: usize) -> CodecResult<&'a [u8]> {
    if buf.len() < n {
        return Err(CodecError::Truncated {
            needed: n,
            remaining: buf.len(),
        });
    }
    let (head, tail) = buf.split_at(n);
    *buf = tail;
    Ok(head)
}

/// Writes a 4-byte length or count prefix.
///
/// # Panics
///
/// Panics if `len` does not fit in an `i32`. Values that large cannot be
/// represented on the wire at all, so this is a caller precondition.
pub fn write_length(buf: &mut Vec<u8>, len: usize, what: &str) {
    let Ok(len) = i32::try_from(len) else {
        panic!("{what} of length {len} is too large to fit into i32");
    };
    len.write(buf);
}

/// Reads a 4-byte length or count prefix, rejecting negative values.
pub fn read_length(buf: &mut &[u8]) -> CodecResult<usize> {
    let len = i32::read(buf)?;
    usize::try_from(len).map_err(|_| CodecError::NegativeLength(len))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_take_exact() {
        let data = [1u8, 2, 3];
        let mut cursor = &data[..];
        assert_eq!(take(&mut cursor, 2).unwrap(), &[1, 2]);
        assert_eq!(cursor, &[3]);
    }

    #[test]
    fn test_take_truncated() {
        let data = [1u8];
        let mut cursor = &data[..];
        assert_eq!(
            take(&mut cursor, 4),
            Err(CodecError::Truncated {
                needed: 4,
                remaining: 1
            })
        );
    }

    #[test]
    fn test_lift_rejects_trailing_bytes() {
        let mut bytes = lower(&7u32);
        bytes.push(0xff);
        assert_eq!(
            lift::<u32>(&bytes),
            Err(CodecError::TrailingBytes { remaining: 1 })
        );
    }

    #[test]
    fn test_read_length_negative() {
        let bytes = lower(&-1i32);
        let mut cursor = &bytes[..];
        assert_eq!(read_length(&mut cursor), Err(CodecError::NegativeLength(-1)));
    }
}
