//! Timestamp encoding.
//!
//! A timestamp is an `i64` count of seconds from the Unix epoch followed by
//! a `u32` count of nanoseconds that is always added to it. Instants before
//! 1970 borrow one second for their sub-second part, so `-1.3s` travels as
//! `(-2, 700_000_000)` and `-0.3s` as `(-1, 700_000_000)`.

use chrono::{DateTime, Duration, Utc};

use crate::{CodecError, CodecResult, Wire};

const NANOS_PER_SECOND: u32 = 1_000_000_000;

impl Wire for DateTime<Utc> {
    fn write(&self, buf: &mut Vec<u8>) {
        // Leap-second instants report nanos >= 1e9; fold them into the
        // preceding second.
        let nanos = self.timestamp_subsec_nanos().min(NANOS_PER_SECOND - 1);
        self.timestamp().write(buf);
        nanos.write(buf);
    }

    fn read(buf: &mut &[u8]) -> CodecResult<Self> {
        let seconds = i64::read(buf)?;
        let nanos = u32::read(buf)?;
        let invalid = CodecError::InvalidTimestamp { seconds, nanos };

        let whole = DateTime::<Utc>::from_timestamp(seconds, 0).ok_or(invalid.clone())?;
        whole
            .checked_add_signed(Duration::nanoseconds(i64::from(nanos)))
            .ok_or(invalid)
    }
}
