//! Mock reader: synthetic IMU frames without hardware.
//!
//! Generates valid wire frames (sine-driven acceleration, rates and
//! angles) at a configurable rate, so full pipelines can run in tests and
//! demos with no sensor attached.

use crate::config::PluginConfig;
use crate::error::{Result, SensorVisError};
use crate::plugin::{CancelToken, Reader, ReaderStatus};
use crate::plugins::decoders::imu_frames;
use std::f64::consts::PI;
use std::time::Duration;

const DEFAULT_RATE_HZ: u64 = 100;
/// Sleep granularity so cancellation is observed quickly even at low rates.
const SLEEP_SLICE: Duration = Duration::from_millis(20);

/// Emits one synthetic frame set (acceleration, rate, angles) per tick.
pub struct MockReader {
    /// Number of ticks to emit; 0 means unbounded.
    packet_count: u64,
    rate_hz: u64,
    acc_range: f64,
    gyro_range: f64,
    emitted: u64,
    opened: bool,
    cancel: CancelToken,
}

impl MockReader {
    /// Config keys: `packet_count` (default 0 = unbounded), `rate_hz`
    /// (default 100), `acc_range` (default 16.0), `gyro_range`
    /// (default 2000.0). Ranges must match the decoder's so scaled values
    /// survive the round trip.
    pub fn from_config(config: &PluginConfig) -> Result<Self> {
        let rate_hz = config.get_u64("rate_hz").unwrap_or(DEFAULT_RATE_HZ);
        if rate_hz == 0 {
            return Err(SensorVisError::Config(
                "'rate_hz' must be greater than zero".to_string(),
            ));
        }
        Ok(Self {
            packet_count: config.get_u64("packet_count").unwrap_or(0),
            rate_hz,
            acc_range: config.get_f64("acc_range").unwrap_or(16.0),
            gyro_range: config.get_f64("gyro_range").unwrap_or(2000.0),
            emitted: 0,
            opened: false,
            cancel: CancelToken::new(),
        })
    }

    /// Sleep one tick interval in slices, watching for cancellation.
    fn pace(&self) {
        let mut remaining = Duration::from_micros(1_000_000 / self.rate_hz);
        while remaining > Duration::ZERO && !self.cancel.is_cancelled() {
            let slice = remaining.min(SLEEP_SLICE);
            std::thread::sleep(slice);
            remaining = remaining.saturating_sub(slice);
        }
    }

    fn frames_for_tick(&self, n: u64) -> Vec<u8> {
        let t = n as f64 / self.rate_hz as f64;
        let phase = 2.0 * PI * t;

        let mut bytes = Vec::with_capacity(3 * imu_frames::FRAME_LEN);
        bytes.extend_from_slice(&imu_frames::encode_acc(
            phase.sin(),
            (phase * 0.5).cos(),
            1.0,
            self.acc_range,
            25.0,
        ));
        bytes.extend_from_slice(&imu_frames::encode_gyro(
            90.0 * phase.sin(),
            45.0 * phase.cos(),
            0.0,
            self.gyro_range,
            25.0,
        ));
        bytes.extend_from_slice(&imu_frames::encode_angle(
            30.0 * phase.sin(),
            15.0 * phase.cos(),
            (t * 10.0) % 360.0 - 180.0,
        ));
        bytes
    }
}

impl Reader for MockReader {
    fn open(&mut self) -> Result<()> {
        self.opened = true;
        self.emitted = 0;
        Ok(())
    }

    fn read_chunk(&mut self) -> Result<Option<Vec<u8>>> {
        if !self.opened {
            return Err(SensorVisError::Reader("mock reader not opened".to_string()));
        }
        if self.cancel.is_cancelled() {
            return Ok(None);
        }
        if self.packet_count > 0 && self.emitted >= self.packet_count {
            return Ok(None);
        }

        self.pace();
        if self.cancel.is_cancelled() {
            return Ok(None);
        }

        let bytes = self.frames_for_tick(self.emitted);
        self.emitted += 1;
        Ok(Some(bytes))
    }

    fn close(&mut self) {
        self.opened = false;
    }

    fn status(&self) -> ReaderStatus {
        if self.opened {
            ReaderStatus::Connected
        } else {
            ReaderStatus::Disconnected
        }
    }

    fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugin::Decoder as _;
    use crate::plugins::decoders::ImuFrameDecoder;

    fn reader(count: u64) -> MockReader {
        let config = PluginConfig::new()
            .with("packet_count", count)
            .with("rate_hz", 1000);
        MockReader::from_config(&config).unwrap()
    }

    #[test]
    fn test_finite_stream_ends() {
        let mut r = reader(3);
        r.open().unwrap();
        let mut chunks = 0;
        while let Some(chunk) = r.read_chunk().unwrap() {
            assert_eq!(chunk.len(), 3 * imu_frames::FRAME_LEN);
            chunks += 1;
        }
        assert_eq!(chunks, 3);
    }

    #[test]
    fn test_frames_decode_cleanly() {
        let mut r = reader(2);
        r.open().unwrap();
        let mut dec = ImuFrameDecoder::from_config(&PluginConfig::new()).unwrap();

        let mut samples = Vec::new();
        while let Some(chunk) = r.read_chunk().unwrap() {
            dec.decode(&chunk, &mut samples).unwrap();
        }
        // Three samples per tick, no resync needed anywhere.
        assert_eq!(samples.len(), 6);
        assert!(samples
            .iter()
            .all(|s| !s.metadata.contains_key(crate::sample::META_RESYNC_DROPPED)));
    }

    #[test]
    fn test_read_before_open_errors() {
        let mut r = reader(1);
        assert!(r.read_chunk().is_err());
    }

    #[test]
    fn test_cancel_ends_unbounded_stream() {
        let mut r = reader(0);
        r.open().unwrap();
        assert!(r.read_chunk().unwrap().is_some());
        r.cancel_token().cancel();
        assert!(r.read_chunk().unwrap().is_none());
    }

    #[test]
    fn test_zero_rate_rejected() {
        let config = PluginConfig::new().with("rate_hz", 0);
        assert!(MockReader::from_config(&config).is_err());
    }
}
