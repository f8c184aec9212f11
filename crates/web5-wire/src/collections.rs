//! Optional, sequence and map encodings.

use std::collections::HashMap;
use std::hash::Hash;

use crate::{read_length, write_length, CodecError, CodecResult, Wire};

impl<T: Wire> Wire for Option<T> {
    fn write(&self, buf: &mut Vec<u8>) {
        match self {
            None => buf.push(0),
            Some(value) => {
                buf.push(1);
                value.write(buf);
            }
        }
    }

    fn read(buf: &mut &[u8]) -> CodecResult<Self> {
        match u8::read(buf)? {
            0 => Ok(None),
            1 => Ok(Some(T::read(buf)?)),
            flag => Err(CodecError::InvalidOptionFlag(flag)),
        }
    }
}

/// A zero count decodes to an empty vector. Absence is expressed with
/// `Option<Vec<T>>`, whose presence flag survives the round trip.
impl<T: Wire> Wire for Vec<T> {
    fn write(&self, buf: &mut Vec<u8>) {
        write_length(buf, self.len(), "sequence");
        for item in self {
            item.write(buf);
        }
    }

    fn read(buf: &mut &[u8]) -> CodecResult<Self> {
        let len = read_length(buf)?;
        // Each element is at least one byte; cap the preallocation so a
        // corrupt count cannot reserve unbounded memory.
        let mut items = Vec::with_capacity(len.min(buf.len()));
        for _ in 0..len {
            items.push(T::read(buf)?);
        }
        Ok(items)
    }
}

impl<K, V> Wire for HashMap<K, V>
where
    K: Wire + Eq + Hash,
    V: Wire,
{
    fn write(&self, buf: &mut Vec<u8>) {
        write_length(buf, self.len(), "map");
        for (key, value) in self {
            key.write(buf);
            value.write(buf);
        }
    }

    fn read(buf: &mut &[u8]) -> CodecResult<Self> {
        let len = read_length(buf)?;
        let mut map = HashMap::with_capacity(len.min(buf.len()));
        for _ in 0..len {
            let key = K::read(buf)?;
            let value = V::read(buf)?;
            map.insert(key, value);
        }
        Ok(map)
    }
}
