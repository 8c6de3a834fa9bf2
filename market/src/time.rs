//! Internal time base: integer microseconds since the Unix epoch.
//!
//! Trade timestamps arrive as fractional seconds; converting once at the
//! boundary keeps every comparison against snapshot times exact.

use chrono::{DateTime, NaiveDate};

pub const MICROS_PER_SECOND: i64 = 1_000_000;

/// Convert a seconds timestamp to microseconds, rounding to the nearest µs.
///
/// Returns `None` for non-finite input or values outside the `i64` range.
pub fn seconds_to_micros(secs: f64) -> Option<i64> {
    if !secs.is_finite() {
        return None;
    }

    let us = (secs * MICROS_PER_SECOND as f64).round();
    if us < i64::MIN as f64 || us >= i64::MAX as f64 {
        return None;
    }

    Some(us as i64)
}

/// Scale a horizon in whole seconds to microseconds.
pub fn horizon_to_micros(horizon_secs: i64) -> i64 {
    horizon_secs.saturating_mul(MICROS_PER_SECOND)
}

/// UTC calendar date containing `ts_us`.
pub fn utc_date(ts_us: i64) -> Option<NaiveDate> {
    DateTime::from_timestamp_micros(ts_us).map(|dt| dt.date_naive())
}
