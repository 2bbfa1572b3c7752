//! Single-pole low-pass filter.

use crate::config::PluginConfig;
use crate::error::{Result, SensorVisError};
use crate::plugin::Processor;
use crate::sample::{SensorSample, Value};
use std::collections::HashMap;
use std::f64::consts::PI;

/// Smooths numeric channels with a first-order IIR filter:
/// `y[n] = y[n-1] + alpha * (x[n] - y[n-1])`.
///
/// Filter state is keyed by channel name and owned by this instance.
pub struct LowPassFilter {
    alpha: f64,
    /// Channels to filter; empty means every float channel.
    channels: Vec<String>,
    state: HashMap<String, f64>,
}

impl LowPassFilter {
    /// Config keys: `cutoff_hz` (required), `sample_rate_hz` (required),
    /// `channels` (optional list; default all float channels).
    pub fn from_config(config: &PluginConfig) -> Result<Self> {
        let cutoff_hz = config.require_f64("cutoff_hz")?;
        let sample_rate_hz = config.require_f64("sample_rate_hz")?;
        if cutoff_hz <= 0.0 || sample_rate_hz <= 0.0 {
            return Err(SensorVisError::Config(
                "'cutoff_hz' and 'sample_rate_hz' must be positive".to_string(),
            ));
        }

        let rc = 1.0 / (2.0 * PI * cutoff_hz);
        let dt = 1.0 / sample_rate_hz;
        Ok(Self {
            alpha: dt / (rc + dt),
            channels: config.get_str_list("channels").unwrap_or_default(),
            state: HashMap::new(),
        })
    }

    fn applies_to(&self, channel: &str) -> bool {
        self.channels.is_empty() || self.channels.iter().any(|c| c == channel)
    }
}

impl Processor for LowPassFilter {
    fn process(&mut self, mut sample: SensorSample, out: &mut Vec<SensorSample>) -> Result<()> {
        for (name, value) in sample.values.iter_mut() {
            let Value::Float(x) = value else { continue };
            if !self.applies_to(name) {
                continue;
            }
            let y = match self.state.get(name) {
                Some(prev) => prev + self.alpha * (*x - prev),
                None => *x,
            };
            self.state.insert(name.clone(), y);
            *x = y;
        }
        out.push(sample);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter(cutoff: f64, rate: f64) -> LowPassFilter {
        let config = PluginConfig::new()
            .with("cutoff_hz", cutoff)
            .with("sample_rate_hz", rate);
        LowPassFilter::from_config(&config).unwrap()
    }

    fn imu_sample(x: f64) -> SensorSample {
        SensorSample::new(0.0, "imu1", "accelerometer").with_value("x", x)
    }

    #[test]
    fn test_first_sample_passes_unchanged() {
        let mut f = filter(10.0, 100.0);
        let mut out = Vec::new();
        f.process(imu_sample(5.0), &mut out).unwrap();
        assert_eq!(out[0].value_f64("x", 0.0), 5.0);
    }

    #[test]
    fn test_step_response_converges() {
        let mut f = filter(10.0, 100.0);
        let mut last = 0.0;
        for _ in 0..100 {
            let mut out = Vec::new();
            f.process(imu_sample(1.0), &mut out).unwrap();
            let y = out[0].value_f64("x", 0.0);
            assert!(y >= last, "output must rise monotonically toward the step");
            last = y;
        }
        assert!((last - 1.0).abs() < 1e-3);
    }

    #[test]
    fn test_smooths_alternating_input() {
        let mut f = filter(1.0, 100.0);
        // Warm up on the midpoint so the state starts settled.
        let mut out = Vec::new();
        f.process(imu_sample(0.0), &mut out).unwrap();

        let mut peak: f64 = 0.0;
        for i in 0..50 {
            let x = if i % 2 == 0 { 1.0 } else { -1.0 };
            let mut out = Vec::new();
            f.process(imu_sample(x), &mut out).unwrap();
            peak = peak.max(out[0].value_f64("x", 0.0).abs());
        }
        // A 50 Hz square wave through a 1 Hz filter is strongly attenuated.
        assert!(peak < 0.2, "peak {peak} not attenuated");
    }

    #[test]
    fn test_channel_selection() {
        let config = PluginConfig::new()
            .with("cutoff_hz", 1.0)
            .with("sample_rate_hz", 100.0)
            .with("channels", serde_json::json!(["x"]));
        let mut f = LowPassFilter::from_config(&config).unwrap();

        let sample = SensorSample::new(0.0, "imu1", "accelerometer")
            .with_value("x", 1.0)
            .with_value("y", 1.0);
        let mut out = Vec::new();
        f.process(sample, &mut out).unwrap();
        let mut out2 = Vec::new();
        f.process(
            SensorSample::new(0.0, "imu1", "accelerometer")
                .with_value("x", 0.0)
                .with_value("y", 0.0),
            &mut out2,
        )
        .unwrap();

        // x is filtered (held up by state), y passes straight through.
        assert!(out2[0].value_f64("x", -1.0) > 0.5);
        assert_eq!(out2[0].value_f64("y", -1.0), 0.0);
    }

    #[test]
    fn test_rejects_bad_config() {
        assert!(LowPassFilter::from_config(&PluginConfig::new()).is_err());
        let config = PluginConfig::new()
            .with("cutoff_hz", -1.0)
            .with("sample_rate_hz", 100.0);
        assert!(LowPassFilter::from_config(&config).is_err());
    }
}
