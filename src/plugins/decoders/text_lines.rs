//! Line decoder: newline-delimited numeric rows.
//!
//! Each complete line is `timestamp,v1,v2,...` with configured channel
//! names. A trailing partial line is buffered until its newline arrives,
//! so chunk boundaries never lose rows. Malformed lines are skipped and
//! reported through the resync metadata of the next good sample.

use crate::config::PluginConfig;
use crate::error::{Result, SensorVisError};
use crate::plugin::Decoder;
use crate::sample::{RawTimestamp, SensorSample, Value, META_RESYNC_DROPPED};
use crate::timestamp;

/// Decodes delimited text rows into samples.
pub struct LineDecoder {
    sensor_id: String,
    data_type: String,
    channels: Vec<String>,
    separator: char,
    /// First field is a timestamp; otherwise rows are stamped wall-clock.
    timestamp_field: bool,
    utc_offset_hours: Option<i32>,
    buffer: Vec<u8>,
    dropped_lines: u64,
}

impl LineDecoder {
    /// Config keys: `channels` (required, list of names), `sensor_id`
    /// (default "default_sensor"), `data_type` (default "text"),
    /// `separator` (default ","), `timestamp_field` (default true),
    /// `utc_offset` hours.
    pub fn from_config(config: &PluginConfig) -> Result<Self> {
        let channels = config
            .get_str_list("channels")
            .filter(|c| !c.is_empty())
            .ok_or_else(|| {
                SensorVisError::Config("'channels' must list at least one name".to_string())
            })?;

        let separator = config.get_str("separator").unwrap_or(",");
        let mut chars = separator.chars();
        let separator = match (chars.next(), chars.next()) {
            (Some(c), None) => c,
            _ => {
                return Err(SensorVisError::Config(
                    "'separator' must be a single character".to_string(),
                ))
            }
        };

        Ok(Self {
            sensor_id: config
                .get_str("sensor_id")
                .unwrap_or("default_sensor")
                .to_string(),
            data_type: config.get_str("data_type").unwrap_or("text").to_string(),
            channels,
            separator,
            timestamp_field: config.get_bool("timestamp_field").unwrap_or(true),
            utc_offset_hours: config.get_i64("utc_offset").map(|h| h as i32),
            buffer: Vec::new(),
            dropped_lines: 0,
        })
    }

    fn decode_line(&mut self, line: &str) -> Option<SensorSample> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }

        let mut fields = line.split(self.separator);
        let (ts, raw_ts, fallback) = if self.timestamp_field {
            let field = fields.next().unwrap_or("").trim();
            match timestamp::parse_text(field, self.utc_offset_hours) {
                Ok(epoch) => (epoch, Some(RawTimestamp::Text(field.to_string())), false),
                Err(_) => (timestamp::wall_clock(), None, true),
            }
        } else {
            (timestamp::wall_clock(), None, false)
        };

        let mut sample = SensorSample::new(ts, self.sensor_id.clone(), self.data_type.clone());
        for name in &self.channels {
            let field = fields.next()?.trim();
            let value: f64 = field.parse().ok()?;
            sample.values.insert(name.clone(), Value::Float(value));
        }

        sample.raw_timestamp = raw_ts;
        if fallback {
            sample.mark_clock_fallback();
        }
        Some(sample)
    }
}

impl Decoder for LineDecoder {
    fn decode(&mut self, chunk: &[u8], out: &mut Vec<SensorSample>) -> Result<()> {
        self.buffer.extend_from_slice(chunk);

        while let Some(newline) = self.buffer.iter().position(|&b| b == b'\n') {
            let line_bytes: Vec<u8> = self.buffer.drain(..=newline).collect();
            let line = String::from_utf8_lossy(&line_bytes[..line_bytes.len() - 1]).into_owned();

            if line.trim().is_empty() {
                continue;
            }
            match self.decode_line(&line) {
                Some(mut sample) => {
                    if self.dropped_lines > 0 {
                        sample.metadata.insert(
                            META_RESYNC_DROPPED.to_string(),
                            Value::Int(self.dropped_lines as i64),
                        );
                        self.dropped_lines = 0;
                    }
                    out.push(sample);
                }
                None => {
                    tracing::debug!("skipping malformed line: '{line}'");
                    self.dropped_lines += 1;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decoder() -> LineDecoder {
        let config = PluginConfig::new()
            .with("sensor_id", "daq1")
            .with("channels", serde_json::json!(["x", "y"]));
        LineDecoder::from_config(&config).unwrap()
    }

    fn decode_all(dec: &mut LineDecoder, bytes: &[u8]) -> Vec<SensorSample> {
        let mut out = Vec::new();
        dec.decode(bytes, &mut out).unwrap();
        out
    }

    #[test]
    fn test_requires_channels() {
        assert!(LineDecoder::from_config(&PluginConfig::new()).is_err());
    }

    #[test]
    fn test_complete_lines() {
        let mut dec = decoder();
        let out = decode_all(&mut dec, b"100.5,1.0,2.0\n101.0,3.0,4.0\n");
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].timestamp, 100.5);
        assert_eq!(out[0].value_f64("x", 0.0), 1.0);
        assert_eq!(out[1].value_f64("y", 0.0), 4.0);
        assert_eq!(
            out[0].raw_timestamp,
            Some(RawTimestamp::Text("100.5".to_string()))
        );
    }

    #[test]
    fn test_partial_line_buffered() {
        let mut dec = decoder();
        assert!(decode_all(&mut dec, b"100.5,1.").is_empty());
        let out = decode_all(&mut dec, b"0,2.0\n");
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].value_f64("x", 0.0), 1.0);
    }

    #[test]
    fn test_empty_chunk_is_noop() {
        let mut dec = decoder();
        decode_all(&mut dec, b"100.5,1");
        let before = dec.buffer.clone();
        assert!(decode_all(&mut dec, b"").is_empty());
        assert_eq!(dec.buffer, before);
    }

    #[test]
    fn test_malformed_line_skipped_and_reported() {
        let mut dec = decoder();
        let out = decode_all(&mut dec, b"not,numbers,here\n100.0,1.0,2.0\n");
        assert_eq!(out.len(), 1);
        assert_eq!(
            out[0].metadata.get(META_RESYNC_DROPPED),
            Some(&Value::Int(1))
        );
    }

    #[test]
    fn test_unparsable_timestamp_falls_back() {
        let mut dec = decoder();
        let out = decode_all(&mut dec, b"???,1.0,2.0\n");
        assert_eq!(out.len(), 1);
        assert!(out[0].is_clock_fallback());
        assert!(out[0].timestamp.is_finite());
    }

    #[test]
    fn test_no_timestamp_field_mode() {
        let config = PluginConfig::new()
            .with("channels", serde_json::json!(["v"]))
            .with("timestamp_field", false);
        let mut dec = LineDecoder::from_config(&config).unwrap();
        let out = decode_all(&mut dec, b"42.5\n");
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].value_f64("v", 0.0), 42.5);
        assert!(out[0].timestamp.is_finite());
    }

    #[test]
    fn test_custom_separator() {
        let config = PluginConfig::new()
            .with("channels", serde_json::json!(["v"]))
            .with("separator", ";");
        let mut dec = LineDecoder::from_config(&config).unwrap();
        let out = decode_all(&mut dec, b"7.0;1.5\n");
        assert_eq!(out[0].value_f64("v", 0.0), 1.5);
    }
}
