//! Framed binary IMU decoder.
//!
//! Wire format (WitMotion-style): 11-byte frames
//!
//! ```text
//! 0x55 | flag | payload[8] | checksum
//! ```
//!
//! where `checksum` is the low byte of the sum of the first ten bytes.
//! Flag 0x51 carries acceleration, 0x52 angular rate, 0x53 orientation
//! angles, 0x50 the device clock. Payload words are little-endian i16.
//!
//! Frames arrive inside arbitrary chunk boundaries: the decoder buffers
//! trailing partial frames across calls and resynchronizes past corrupt
//! bytes by scanning for the next valid frame start.

use crate::config::PluginConfig;
use crate::error::{Result, SensorVisError};
use crate::plugin::Decoder;
use crate::sample::{RawTimestamp, SensorSample, Value, META_RESYNC_DROPPED};
use crate::timestamp;
use chrono::NaiveDate;

/// Frame start marker.
pub const SYNC: u8 = 0x55;
/// Total frame length in bytes.
pub const FRAME_LEN: usize = 11;

/// Device clock frame.
pub const FLAG_TIME: u8 = 0x50;
/// Acceleration frame.
pub const FLAG_ACC: u8 = 0x51;
/// Angular rate frame.
pub const FLAG_GYRO: u8 = 0x52;
/// Orientation angle frame.
pub const FLAG_ANGLE: u8 = 0x53;

const DEFAULT_ACC_RANGE: f64 = 16.0;
const DEFAULT_GYRO_RANGE: f64 = 2000.0;
const DEFAULT_TIME_STEP: f64 = 0.01;

/// How decoded samples get their canonical timestamp.
enum TimestampMode {
    /// Wall-clock time at decode.
    Wall,
    /// `start + n * step` over the packet counter.
    Counter { start: f64, step: f64 },
    /// The most recent device clock frame; wall-clock until one arrives.
    Device { utc_offset_hours: Option<i32> },
}

/// Streaming decoder for the framed IMU protocol.
pub struct ImuFrameDecoder {
    sensor_id: String,
    acc_range: f64,
    gyro_range: f64,
    mode: TimestampMode,
    buffer: Vec<u8>,
    packet_count: u64,
    /// Epoch seconds from the last device clock frame, if any.
    device_clock: Option<f64>,
    /// Raw device clock retained for sample diagnostics.
    device_clock_raw: Option<RawTimestamp>,
    /// Bytes discarded since the last emitted sample.
    resync_dropped: u64,
}

impl ImuFrameDecoder {
    /// Config keys: `sensor_id` (default "default_sensor"), `acc_range` in g
    /// (default 16.0), `gyro_range` in deg/s (default 2000.0),
    /// `timestamp_mode` of "wall" | "counter" | "device" (default "wall"),
    /// `time_step` seconds for counter mode (default 0.01), `utc_offset`
    /// hours for device mode.
    pub fn from_config(config: &PluginConfig) -> Result<Self> {
        let mode = match config.get_str("timestamp_mode").unwrap_or("wall") {
            "wall" => TimestampMode::Wall,
            "counter" => TimestampMode::Counter {
                start: timestamp::wall_clock(),
                step: config.get_f64("time_step").unwrap_or(DEFAULT_TIME_STEP),
            },
            "device" => TimestampMode::Device {
                utc_offset_hours: config.get_i64("utc_offset").map(|h| h as i32),
            },
            other => {
                return Err(SensorVisError::Config(format!(
                    "unknown timestamp_mode '{other}' (expected wall, counter or device)"
                )))
            }
        };

        let acc_range = config.get_f64("acc_range").unwrap_or(DEFAULT_ACC_RANGE);
        let gyro_range = config.get_f64("gyro_range").unwrap_or(DEFAULT_GYRO_RANGE);
        if acc_range <= 0.0 || gyro_range <= 0.0 {
            return Err(SensorVisError::Config(
                "'acc_range' and 'gyro_range' must be positive".to_string(),
            ));
        }

        Ok(Self {
            sensor_id: config
                .get_str("sensor_id")
                .unwrap_or("default_sensor")
                .to_string(),
            acc_range,
            gyro_range,
            mode,
            buffer: Vec::new(),
            packet_count: 0,
            device_clock: None,
            device_clock_raw: None,
            resync_dropped: 0,
        })
    }

    /// Timestamp for the next emitted sample, with wall-clock fallback.
    /// Returns (epoch_seconds, used_fallback).
    fn next_timestamp(&self) -> (f64, bool) {
        match &self.mode {
            TimestampMode::Wall => (timestamp::wall_clock(), false),
            TimestampMode::Counter { start, step } => (
                timestamp::from_packet_counter(*start, self.packet_count, *step),
                false,
            ),
            TimestampMode::Device { .. } => match self.device_clock {
                Some(t) => (t, false),
                None => (timestamp::wall_clock(), true),
            },
        }
    }

    fn word(payload: &[u8], idx: usize) -> i16 {
        i16::from_le_bytes([payload[2 * idx], payload[2 * idx + 1]])
    }

    fn emit(&mut self, mut sample: SensorSample, out: &mut Vec<SensorSample>) {
        if self.resync_dropped > 0 {
            sample.metadata.insert(
                META_RESYNC_DROPPED.to_string(),
                Value::Int(self.resync_dropped as i64),
            );
            self.resync_dropped = 0;
        }
        self.packet_count += 1;
        out.push(sample);
    }

    fn decode_data_frame(&mut self, flag: u8, payload: &[u8], out: &mut Vec<SensorSample>) {
        let (ts, fallback) = self.next_timestamp();
        let x = f64::from(Self::word(payload, 0)) / 32768.0;
        let y = f64::from(Self::word(payload, 1)) / 32768.0;
        let z = f64::from(Self::word(payload, 2)) / 32768.0;

        let mut sample = match flag {
            FLAG_ACC => SensorSample::new(ts, self.sensor_id.clone(), "accelerometer")
                .with_value("x", x * self.acc_range)
                .with_value("y", y * self.acc_range)
                .with_value("z", z * self.acc_range)
                .with_value("temp", f64::from(Self::word(payload, 3)) / 100.0)
                .with_unit("x", "g")
                .with_unit("y", "g")
                .with_unit("z", "g")
                .with_unit("temp", "°C"),
            FLAG_GYRO => SensorSample::new(ts, self.sensor_id.clone(), "gyroscope")
                .with_value("x", x * self.gyro_range)
                .with_value("y", y * self.gyro_range)
                .with_value("z", z * self.gyro_range)
                .with_value("temp", f64::from(Self::word(payload, 3)) / 100.0)
                .with_unit("x", "deg/s")
                .with_unit("y", "deg/s")
                .with_unit("z", "deg/s")
                .with_unit("temp", "°C"),
            FLAG_ANGLE => SensorSample::new(ts, self.sensor_id.clone(), "angle")
                .with_value("roll", x * 180.0)
                .with_value("pitch", y * 180.0)
                .with_value("yaw", z * 180.0)
                .with_unit("roll", "deg")
                .with_unit("pitch", "deg")
                .with_unit("yaw", "deg"),
            _ => unreachable!("caller filters flags"),
        };

        match &self.mode {
            TimestampMode::Counter { .. } => {
                sample.raw_timestamp = Some(RawTimestamp::Counter(self.packet_count));
            }
            TimestampMode::Device { .. } => {
                sample.raw_timestamp = self.device_clock_raw.clone();
            }
            TimestampMode::Wall => {}
        }
        if fallback {
            sample.mark_clock_fallback();
        }
        self.emit(sample, out);
    }

    /// Update the device clock from a 0x50 frame. Invalid calendar fields
    /// fall back to wall-clock time for subsequent frames.
    fn decode_time_frame(&mut self, payload: &[u8]) {
        let year = 2000 + i32::from(payload[0]);
        let millis = u32::from(u16::from_le_bytes([payload[6], payload[7]]));

        let datetime = NaiveDate::from_ymd_opt(year, u32::from(payload[1]), u32::from(payload[2]))
            .and_then(|d| {
                d.and_hms_milli_opt(
                    u32::from(payload[3]),
                    u32::from(payload[4]),
                    u32::from(payload[5]),
                    millis,
                )
            });

        let utc_offset = match &self.mode {
            TimestampMode::Device { utc_offset_hours } => *utc_offset_hours,
            _ => None,
        };

        match datetime {
            Some(dt) => match timestamp::from_device_datetime(dt, utc_offset) {
                Ok(epoch) => {
                    self.device_clock = Some(epoch);
                    self.device_clock_raw = Some(RawTimestamp::DateTime(dt));
                }
                Err(e) => {
                    tracing::warn!("device clock conversion failed: {e}");
                    self.device_clock = None;
                    self.device_clock_raw = None;
                }
            },
            None => {
                tracing::warn!("device clock frame carries an invalid calendar date");
                self.device_clock = None;
                self.device_clock_raw = None;
            }
        }
    }

    fn checksum_valid(frame: &[u8]) -> bool {
        let sum = frame[..FRAME_LEN - 1]
            .iter()
            .fold(0u8, |acc, b| acc.wrapping_add(*b));
        sum == frame[FRAME_LEN - 1]
    }
}

impl Decoder for ImuFrameDecoder {
    fn decode(&mut self, chunk: &[u8], out: &mut Vec<SensorSample>) -> Result<()> {
        self.buffer.extend_from_slice(chunk);

        let mut pos = 0usize;
        while self.buffer.len() - pos >= 1 {
            if self.buffer[pos] != SYNC {
                pos += 1;
                self.resync_dropped += 1;
                continue;
            }
            if self.buffer.len() - pos < FRAME_LEN {
                // Partial frame: keep for the next chunk.
                break;
            }

            let frame_end = pos + FRAME_LEN;
            if !Self::checksum_valid(&self.buffer[pos..frame_end]) {
                // A sync byte inside garbage; skip it and rescan.
                pos += 1;
                self.resync_dropped += 1;
                continue;
            }

            let flag = self.buffer[pos + 1];
            let mut payload = [0u8; 8];
            payload.copy_from_slice(&self.buffer[pos + 2..pos + 10]);
            match flag {
                FLAG_TIME => self.decode_time_frame(&payload),
                FLAG_ACC | FLAG_GYRO | FLAG_ANGLE => self.decode_data_frame(flag, &payload, out),
                other => {
                    tracing::trace!("skipping frame with unknown flag 0x{other:02X}");
                }
            }
            pos = frame_end;
        }

        self.buffer.drain(..pos);
        Ok(())
    }
}

// ── Frame builders ──
//
// Used by the synthetic source and by tests to produce valid wire frames.

/// Assemble one frame from flag and payload, computing the checksum.
pub fn encode_frame(flag: u8, payload: [u8; 8]) -> [u8; FRAME_LEN] {
    let mut frame = [0u8; FRAME_LEN];
    frame[0] = SYNC;
    frame[1] = flag;
    frame[2..10].copy_from_slice(&payload);
    frame[10] = frame[..10].iter().fold(0u8, |acc, b| acc.wrapping_add(*b));
    frame
}

fn scaled_word(value: f64, range: f64) -> [u8; 2] {
    let raw = (value / range * 32768.0).clamp(f64::from(i16::MIN), f64::from(i16::MAX)) as i16;
    raw.to_le_bytes()
}

/// Acceleration frame for axis values in g.
pub fn encode_acc(x: f64, y: f64, z: f64, acc_range: f64, temp_c: f64) -> [u8; FRAME_LEN] {
    let mut payload = [0u8; 8];
    payload[0..2].copy_from_slice(&scaled_word(x, acc_range));
    payload[2..4].copy_from_slice(&scaled_word(y, acc_range));
    payload[4..6].copy_from_slice(&scaled_word(z, acc_range));
    payload[6..8].copy_from_slice(&(((temp_c * 100.0) as i16).to_le_bytes()));
    encode_frame(FLAG_ACC, payload)
}

/// Angular rate frame for axis values in deg/s.
pub fn encode_gyro(x: f64, y: f64, z: f64, gyro_range: f64, temp_c: f64) -> [u8; FRAME_LEN] {
    let mut payload = [0u8; 8];
    payload[0..2].copy_from_slice(&scaled_word(x, gyro_range));
    payload[2..4].copy_from_slice(&scaled_word(y, gyro_range));
    payload[4..6].copy_from_slice(&scaled_word(z, gyro_range));
    payload[6..8].copy_from_slice(&(((temp_c * 100.0) as i16).to_le_bytes()));
    encode_frame(FLAG_GYRO, payload)
}

/// Orientation frame for Euler angles in degrees.
pub fn encode_angle(roll: f64, pitch: f64, yaw: f64) -> [u8; FRAME_LEN] {
    let mut payload = [0u8; 8];
    payload[0..2].copy_from_slice(&scaled_word(roll, 180.0));
    payload[2..4].copy_from_slice(&scaled_word(pitch, 180.0));
    payload[4..6].copy_from_slice(&scaled_word(yaw, 180.0));
    encode_frame(FLAG_ANGLE, payload)
}

/// Device clock frame.
pub fn encode_time(
    year: u8,
    month: u8,
    day: u8,
    hour: u8,
    minute: u8,
    second: u8,
    millis: u16,
) -> [u8; FRAME_LEN] {
    let ms = millis.to_le_bytes();
    encode_frame(
        FLAG_TIME,
        [year, month, day, hour, minute, second, ms[0], ms[1]],
    )
}
