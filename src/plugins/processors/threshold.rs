//! Threshold filter: drops samples whose watched value is too small.

use crate::config::PluginConfig;
use crate::error::Result;
use crate::plugin::Processor;
use crate::sample::{SensorSample, Value};

/// Passes a sample through only when `|value| >= threshold`.
///
/// With an explicit `channel` the filter watches that channel; otherwise it
/// watches the sample's single numeric channel (the shape produced by
/// [`AxisSplit`](super::AxisSplit)). Samples without a watchable value pass
/// through untouched.
pub struct ThresholdFilter {
    threshold: f64,
    channel: Option<String>,
}

impl ThresholdFilter {
    /// Config keys: `threshold` (required), `channel` (optional).
    pub fn from_config(config: &PluginConfig) -> Result<Self> {
        Ok(Self {
            threshold: config.require_f64("threshold")?,
            channel: config.get_str("channel").map(str::to_string),
        })
    }

    /// A filter that passes everything; used as a stand-in in tests.
    pub fn passthrough() -> Self {
        Self {
            threshold: 0.0,
            channel: None,
        }
    }

    fn watched_value(&self, sample: &SensorSample) -> Option<f64> {
        match &self.channel {
            Some(name) => sample.values.get(name).and_then(Value::as_f64),
            None => {
                let mut numeric = sample.values.values().filter_map(Value::as_f64);
                let first = numeric.next()?;
                // Ambiguous without a configured channel; pass through.
                if numeric.next().is_some() {
                    return None;
                }
                Some(first)
            }
        }
    }
}

impl Processor for ThresholdFilter {
    fn process(&mut self, sample: SensorSample, out: &mut Vec<SensorSample>) -> Result<()> {
        match self.watched_value(&sample) {
            Some(v) if v.abs() < self.threshold => {}
            _ => out.push(sample),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter(threshold: f64) -> ThresholdFilter {
        ThresholdFilter::from_config(&PluginConfig::new().with("threshold", threshold)).unwrap()
    }

    fn single(value: f64) -> SensorSample {
        SensorSample::new(0.0, "s", "accelerometer").with_value("v", value)
    }

    #[test]
    fn test_drops_below_threshold() {
        let mut f = filter(1.0);
        let mut out = Vec::new();
        f.process(single(0.01), &mut out).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn test_passes_at_or_above_threshold_abs() {
        let mut f = filter(1.0);
        let mut out = Vec::new();
        f.process(single(5.0), &mut out).unwrap();
        f.process(single(-3.0), &mut out).unwrap();
        f.process(single(1.0), &mut out).unwrap();
        assert_eq!(out.len(), 3);
    }

    #[test]
    fn test_watches_configured_channel() {
        let config = PluginConfig::new()
            .with("threshold", 1.0)
            .with("channel", "y");
        let mut f = ThresholdFilter::from_config(&config).unwrap();

        let sample = SensorSample::new(0.0, "s", "t")
            .with_value("x", 100.0)
            .with_value("y", 0.5);
        let mut out = Vec::new();
        f.process(sample, &mut out).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn test_multi_channel_without_config_passes() {
        let mut f = filter(1.0);
        let sample = SensorSample::new(0.0, "s", "t")
            .with_value("x", 0.0)
            .with_value("y", 0.0);
        let mut out = Vec::new();
        f.process(sample, &mut out).unwrap();
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn test_requires_threshold_key() {
        assert!(ThresholdFilter::from_config(&PluginConfig::new()).is_err());
    }
}
