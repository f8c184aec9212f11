//! Scalar encodings: integers, floats, booleans, strings and byte arrays.

use byteorder::{BigEndian, ByteOrder};

use crate::{read_length, take, write_length, CodecError, CodecResult, Wire};

macro_rules! wire_int {
    ($ty:ty, $size:expr, $read:path, $write:path) => {
        impl Wire for $ty {
            fn write(&self, buf: &mut Vec<u8>) {
                let mut bytes = [0u8; $size];
                $write(&mut bytes, *self);
                buf.extend_from_slice(&bytes);
            }

            fn read(buf: &mut &[u8]) -> CodecResult<Self> {
                Ok($read(take(buf, $size)?))
            }
        }
    };
}

wire_int!(u16, 2, BigEndian::read_u16, BigEndian::write_u16);
wire_int!(i16, 2, BigEndian::read_i16, BigEndian::write_i16);
wire_int!(u32, 4, BigEndian::read_u32, BigEndian::write_u32);
wire_int!(i32, 4, BigEndian::read_i32, BigEndian::write_i32);
wire_int!(u64, 8, BigEndian::read_u64, BigEndian::write_u64);
wire_int!(i64, 8, BigEndian::read_i64, BigEndian::write_i64);
wire_int!(f32, 4, BigEndian::read_f32, BigEndian::write_f32);
wire_int!(f64, 8, BigEndian::read_f64, BigEndian::write_f64);

impl Wire for u8 {
    fn write(&self, buf: &mut Vec<u8>) {
        buf.push(*self);
    }

    fn read(buf: &mut &[u8]) -> CodecResult<Self> {
        Ok(take(buf, 1)?[0])
    }
}

impl Wire for i8 {
    fn write(&self, buf: &mut Vec<u8>) {
        buf.push(self.to_be_bytes()[0]);
    }

    fn read(buf: &mut &[u8]) -> CodecResult<Self> {
        Ok(i8::from_be_bytes([take(buf, 1)?[0]]))
    }
}

impl Wire for bool {
    fn write(&self, buf: &mut Vec<u8>) {
        buf.push(u8::from(*self));
    }

    fn read(buf: &mut &[u8]) -> CodecResult<Self> {
        match u8::read(buf)? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(CodecError::InvalidBool(other)),
        }
    }
}

impl Wire for String {
    fn write(&self, buf: &mut Vec<u8>) {
        write_length(buf, self.len(), "string");
        buf.extend_from_slice(self.as_bytes());
    }

    fn read(buf: &mut &[u8]) -> CodecResult<Self> {
        let len = read_length(buf)?;
        utf8(take(buf, len)?)
    }

    // A string that is the whole buffer carries no length prefix.
    fn lower_bytes(&self) -> Vec<u8> {
        self.as_bytes().to_vec()
    }

    fn lift_bytes(bytes: &[u8]) -> CodecResult<Self> {
        utf8(bytes)
    }
}

fn utf8(bytes: &[u8]) -> CodecResult<String> {
    std::str::from_utf8(bytes)
        .map(str::to_owned)
        .map_err(|_| CodecError::InvalidUtf8)
}

/// An opaque byte array, encoded as a length prefix then the raw bytes.
///
/// `Vec<u8>` is already a sequence of `u8` and happens to share this
/// layout; the newtype exists so that signatures say "bytes" rather than
/// "list of small integers".
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ByteArray(pub Vec<u8>);

impl ByteArray {
    pub fn into_inner(self) -> Vec<u8> {
        self.0
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }
}

impl From<Vec<u8>> for ByteArray {
    fn from(bytes: Vec<u8>) -> Self {
        ByteArray(bytes)
    }
}

impl From<&[u8]> for ByteArray {
    fn from(bytes: &[u8]) -> Self {
        ByteArray(bytes.to_vec())
    }
}

impl Wire for ByteArray {
    fn write(&self, buf: &mut Vec<u8>) {
        write_length(buf, self.0.len(), "byte array");
        buf.extend_from_slice(&self.0);
    }

    fn read(buf: &mut &[u8]) -> CodecResult<Self> {
        let len = read_length(buf)?;
        Ok(ByteArray(take(buf, len)?.to_vec()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{lift, lower};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_integers_are_big_endian() {
        assert_eq!(lower(&0x0102_0304u32), vec![1, 2, 3, 4]);
        assert_eq!(lower(&-2i16), vec![0xff, 0xfe]);
        assert_eq!(lower(&1u64), vec![0, 0, 0, 0, 0, 0, 0, 1]);
    }

    #[test]
    fn test_float_round_trip() {
        let bytes = lower(&1.5f64);
        assert_eq!(bytes, 1.5f64.to_be_bytes().to_vec());
        assert_eq!(lift::<f64>(&bytes).unwrap(), 1.5);
    }

    #[test]
    fn test_bool_strict() {
        assert_eq!(lower(&true), vec![1]);
        assert_eq!(lift::<bool>(&[0]).unwrap(), false);
        assert_eq!(lift::<bool>(&[2]), Err(CodecError::InvalidBool(2)));
    }

    #[test]
    fn test_top_level_string_is_raw() {
        assert_eq!(lower(&"abc".to_string()), b"abc".to_vec());
        assert_eq!(lift::<String>(b"abc").unwrap(), "abc");
        assert_eq!(lift::<String>(b"").unwrap(), "");
    }

    #[test]
    fn test_nested_string_has_prefix() {
        let mut buf = Vec::new();
        "hi".to_string().write(&mut buf);
        assert_eq!(buf, vec![0, 0, 0, 2, b'h', b'i']);
    }

    #[test]
    fn test_string_invalid_utf8() {
        assert_eq!(lift::<String>(&[0xff, 0xfe]), Err(CodecError::InvalidUtf8));
    }

    #[test]
    fn test_byte_array() {
        let bytes = lower(&ByteArray(vec![9, 8]));
        assert_eq!(bytes, vec![0, 0, 0, 2, 9, 8]);
        assert_eq!(lift::<ByteArray>(&bytes).unwrap().into_inner(), vec![9, 8]);
    }

    #[test]
    fn test_byte_array_truncated() {
        assert_eq!(
            lift::<ByteArray>(&[0, 0, 0, 5, 1]),
            Err(CodecError::Truncated {
                needed: 5,
                remaining: 1
            })
        );
    }
}
