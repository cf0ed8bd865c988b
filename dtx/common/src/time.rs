//! Epoch-microsecond encoding of persisted timestamps.
//!
//! Every timestamp the 2PC tables store is an integer count of microseconds since the Unix
//! epoch. Reading widens it to a nanosecond-precision instant; binding a threshold rounds an
//! instant up to whole microseconds, so `time_created < threshold` keeps every stored value
//! strictly older than the instant.

use chrono::{DateTime, Utc};

use crate::error::{DecodeError, DecodeResult};

const NANOS_PER_MICRO: i64 = 1_000;

/// Converts stored epoch microseconds into an instant.
pub fn instant_from_micros(column: &str, micros: i64) -> DecodeResult<DateTime<Utc>> {
    micros
        .checked_mul(NANOS_PER_MICRO)
        .map(DateTime::from_timestamp_nanos)
        .ok_or_else(|| DecodeError::TimestampOutOfRange {
            column: column.to_string(),
            micros,
        })
}

/// Encodes an exclusive upper bound on creation time in storage resolution.
///
/// A sub-microsecond remainder rounds up: a value stored at `floor(instant)` is still strictly
/// older than `instant`.
pub fn threshold_micros(instant: &DateTime<Utc>) -> i64 {
    let micros = instant.timestamp_micros();
    if i64::from(instant.timestamp_subsec_nanos()) % NANOS_PER_MICRO == 0 {
        micros
    } else {
        micros.saturating_add(1)
    }
}
