//! Canonical decoded sensor data.
//!
//! Every decoder emits [`SensorSample`] records and every downstream stage
//! consumes them. The shape is deliberately loose: a string-keyed channel
//! map plus free-form metadata, so one record type can carry IMU triples,
//! GPS fixes or whole spectra without new structs per device.
//!
//! # Main Types
//!
//! - [`Value`] - A single channel value (number, flag, text or bin vector)
//! - [`RawTimestamp`] - Device-reported time kept for diagnostics
//! - [`SensorSample`] - One decoded unit: timestamp, identity, channels, units
//!
//! # Time base
//!
//! `timestamp` is always Unix epoch seconds as an `f64` and is the only
//! field used for ordering. The device's own clock, whatever its encoding,
//! is preserved untouched in `raw_timestamp`.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Metadata key set by decoders when a device timestamp could not be
/// converted and wall-clock time was substituted.
pub const META_CLOCK_FALLBACK: &str = "clock_fallback";

/// Metadata key carrying the number of bytes discarded while resynchronizing
/// onto a valid frame start, attached to the next decoded sample.
pub const META_RESYNC_DROPPED: &str = "resync_dropped";

/// A single channel value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Integer measurement or counter. Listed before `Float` so untagged
    /// deserialization keeps integers integral.
    Int(i64),
    /// Floating point measurement (the common case)
    Float(f64),
    /// Boolean flag
    Bool(bool),
    /// Free-form text
    Text(String),
    /// Vector payload, e.g. spectrum magnitude bins or a frequency axis
    Floats(Vec<f64>),
}

impl Value {
    /// Interpret this value as an f64 if it is numeric.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(*v),
            Value::Int(v) => Some(*v as f64),
            Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            _ => None,
        }
    }

    /// Interpret this value as a float vector.
    pub fn as_floats(&self) -> Option<&[f64]> {
        match self {
            Value::Floats(v) => Some(v),
            _ => None,
        }
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<Vec<f64>> for Value {
    fn from(v: Vec<f64>) -> Self {
        Value::Floats(v)
    }
}

/// Device-reported time, retained for diagnostics only.
///
/// Never used for internal ordering; `SensorSample::timestamp` is the one
/// time base the pipeline trusts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RawTimestamp {
    /// Millisecond counter since device boot
    Millis(u64),
    /// Packet sequence number
    Counter(u64),
    /// Calendar time as reported by the device (no timezone attached)
    DateTime(chrono::NaiveDateTime),
    /// Unparsed textual representation
    Text(String),
}

/// One decoded unit of sensor data.
///
/// Created exactly once per packet by a decoder, possibly reshaped by
/// processors, read-only by the time it reaches a sink.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorSample {
    /// Normalized Unix epoch seconds. Always finite.
    pub timestamp: f64,

    /// Identifies the originating source; non-empty.
    pub sensor_id: String,

    /// Payload discriminator, e.g. "imu", "gps", "fft", "angle".
    pub data_type: String,

    /// Channel name → value.
    #[serde(default)]
    pub values: HashMap<String, Value>,

    /// Channel name → unit string, for the subset of channels that have one.
    #[serde(default)]
    pub units: HashMap<String, String>,

    /// Original device-reported time, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_timestamp: Option<RawTimestamp>,

    /// Free-form extension data (decode warnings, frequency axes, ...).
    #[serde(default)]
    pub metadata: HashMap<String, Value>,
}

impl SensorSample {
    /// Create a sample with empty channel maps.
    pub fn new(timestamp: f64, sensor_id: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            timestamp,
            sensor_id: sensor_id.into(),
            data_type: data_type.into(),
            values: HashMap::new(),
            units: HashMap::new(),
            raw_timestamp: None,
            metadata: HashMap::new(),
        }
    }

    /// Add a channel value (builder style).
    pub fn with_value(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    /// Add a unit for a channel (builder style).
    pub fn with_unit(mut self, key: impl Into<String>, unit: impl Into<String>) -> Self {
        self.units.insert(key.into(), unit.into());
        self
    }

    /// Attach the device-reported timestamp (builder style).
    pub fn with_raw_timestamp(mut self, raw: RawTimestamp) -> Self {
        self.raw_timestamp = Some(raw);
        self
    }

    /// Get a channel value, or `default` when the channel is absent.
    pub fn value<'a>(&'a self, key: &str, default: &'a Value) -> &'a Value {
        self.values.get(key).unwrap_or(default)
    }

    /// Get a channel value as f64, or `default` when absent or non-numeric.
    pub fn value_f64(&self, key: &str, default: f64) -> f64 {
        self.values.get(key).and_then(Value::as_f64).unwrap_or(default)
    }

    /// Get the unit for a channel, or `default` when none is recorded.
    pub fn unit<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.units.get(key).map(String::as_str).unwrap_or(default)
    }

    /// Mark this sample as carrying a substituted wall-clock timestamp.
    pub fn mark_clock_fallback(&mut self) {
        self.metadata
            .insert(META_CLOCK_FALLBACK.to_string(), Value::Bool(true));
    }

    /// True if the decoder had to substitute wall-clock time.
    pub fn is_clock_fallback(&self) -> bool {
        matches!(
            self.metadata.get(META_CLOCK_FALLBACK),
            Some(Value::Bool(true))
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_accessors_are_total() {
        let sample = SensorSample::new(1_700_000_000.0, "imu1", "imu")
            .with_value("accX", 9.81)
            .with_unit("accX", "m/s²");

        assert_eq!(sample.value_f64("accX", 0.0), 9.81);
        assert_eq!(sample.value_f64("missing", -1.0), -1.0);
        assert_eq!(sample.unit("accX", ""), "m/s²");
        assert_eq!(sample.unit("missing", "?"), "?");

        let default = Value::Float(0.0);
        assert_eq!(sample.value("missing", &default), &default);
    }

    #[test]
    fn test_value_as_f64() {
        assert_eq!(Value::Float(1.5).as_f64(), Some(1.5));
        assert_eq!(Value::Int(-3).as_f64(), Some(-3.0));
        assert_eq!(Value::Bool(true).as_f64(), Some(1.0));
        assert_eq!(Value::Text("x".into()).as_f64(), None);
        assert_eq!(Value::Floats(vec![1.0]).as_f64(), None);
    }

    #[test]
    fn test_clock_fallback_flag() {
        let mut sample = SensorSample::new(0.0, "s", "imu");
        assert!(!sample.is_clock_fallback());
        sample.mark_clock_fallback();
        assert!(sample.is_clock_fallback());
    }

    #[test]
    fn test_sample_serialization_round_trip() {
        let sample = SensorSample::new(1_700_000_000.25, "imu1", "imu")
            .with_value("accX", 0.5)
            .with_value("seq", 42i64)
            .with_unit("accX", "m/s²")
            .with_raw_timestamp(RawTimestamp::Millis(123_456));

        let json = serde_json::to_string(&sample).unwrap();
        let parsed: SensorSample = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.sensor_id, "imu1");
        assert_eq!(parsed.value_f64("accX", 0.0), 0.5);
        assert_eq!(parsed.raw_timestamp, Some(RawTimestamp::Millis(123_456)));
    }
}
