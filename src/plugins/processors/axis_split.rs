//! Axis splitter: fans one multi-channel sample out into per-channel samples.

use crate::config::PluginConfig;
use crate::error::Result;
use crate::plugin::Processor;
use crate::sample::{SensorSample, Value};

/// Emits one sample per selected channel, each carrying a single value.
///
/// Output samples keep the parent's timestamp and identity; the source
/// channel name is recorded in `metadata["axis"]`. With no explicit
/// channel list, float channels are split in name order.
pub struct AxisSplit {
    /// Channels to split out; empty means all float channels, sorted.
    channels: Vec<String>,
}

impl AxisSplit {
    /// Config keys: `channels` (optional list).
    pub fn from_config(config: &PluginConfig) -> Result<Self> {
        Ok(Self {
            channels: config.get_str_list("channels").unwrap_or_default(),
        })
    }
}

impl Processor for AxisSplit {
    fn process(&mut self, sample: SensorSample, out: &mut Vec<SensorSample>) -> Result<()> {
        let selected: Vec<String> = if self.channels.is_empty() {
            let mut names: Vec<String> = sample
                .values
                .iter()
                .filter(|(_, v)| matches!(v, Value::Float(_)))
                .map(|(k, _)| k.clone())
                .collect();
            names.sort_unstable();
            names
        } else {
            self.channels.clone()
        };

        for name in selected {
            let Some(value) = sample.values.get(&name) else {
                continue;
            };
            let mut split =
                SensorSample::new(sample.timestamp, sample.sensor_id.clone(), sample.data_type.clone());
            split.values.insert(name.clone(), value.clone());
            if let Some(unit) = sample.units.get(&name) {
                split.units.insert(name.clone(), unit.clone());
            }
            split.raw_timestamp = sample.raw_timestamp.clone();
            split.metadata = sample.metadata.clone();
            split
                .metadata
                .insert("axis".to_string(), Value::Text(name.clone()));
            out.push(split);
        }
        Ok(())
    }
}
