//! Timestamp conversion to the canonical time base.
//!
//! Devices report time in many encodings: calendar fields, millisecond
//! counters, packet sequence numbers, or text. Everything entering the
//! pipeline is normalized to Unix epoch seconds as `f64`. Decoders call
//! into this module and fall back to wall-clock time when a conversion
//! fails; conversion errors never abort a decode.

use crate::error::{Result, SensorVisError};
use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone, Utc};

/// Current wall-clock time as canonical epoch seconds.
pub fn wall_clock() -> f64 {
    let now = Utc::now();
    now.timestamp() as f64 + f64::from(now.timestamp_subsec_micros()) / 1e6
}

/// Build the timezone for an optional UTC offset in hours.
fn offset_for(utc_offset_hours: Option<i32>) -> Result<FixedOffset> {
    let hours = utc_offset_hours.unwrap_or(0);
    FixedOffset::east_opt(hours * 3600)
        .ok_or_else(|| SensorVisError::Timestamp(format!("invalid UTC offset: {hours}h")))
}

/// Convert device calendar time (naive, in the device's local zone) to
/// epoch seconds, applying an optional UTC offset in hours.
pub fn from_device_datetime(dt: NaiveDateTime, utc_offset_hours: Option<i32>) -> Result<f64> {
    let tz = offset_for(utc_offset_hours)?;
    match tz.from_local_datetime(&dt) {
        chrono::LocalResult::Single(t) | chrono::LocalResult::Ambiguous(t, _) => {
            Ok(to_epoch_seconds(&t))
        }
        chrono::LocalResult::None => Err(SensorVisError::Timestamp(format!(
            "device time {dt} does not exist in offset {utc_offset_hours:?}"
        ))),
    }
}

/// Convert a millisecond counter (already epoch-relative) to epoch seconds.
pub fn from_epoch_millis(millis: u64) -> f64 {
    millis as f64 / 1000.0
}

/// Derive a timestamp for the n-th packet of a run: `start + n * step`.
pub fn from_packet_counter(start_epoch: f64, packet_index: u64, time_step: f64) -> f64 {
    start_epoch + packet_index as f64 * time_step
}

/// Parse a textual timestamp in any of the formats devices commonly emit.
///
/// Tries calendar formats first, then a bare epoch float.
pub fn parse_text(text: &str, utc_offset_hours: Option<i32>) -> Result<f64> {
    const FORMATS: &[&str] = &[
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S",
        "%Y%m%d%H%M%S",
    ];

    for fmt in FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, fmt) {
            return from_device_datetime(dt, utc_offset_hours);
        }
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Ok(to_epoch_seconds(&dt));
    }

    if let Ok(epoch) = text.trim().parse::<f64>() {
        if epoch.is_finite() {
            return Ok(epoch);
        }
    }

    Err(SensorVisError::Timestamp(format!(
        "could not parse timestamp: '{text}'"
    )))
}

fn to_epoch_seconds<Tz: TimeZone>(t: &DateTime<Tz>) -> f64 {
    t.timestamp() as f64 + f64::from(t.timestamp_subsec_micros()) / 1e6
}
