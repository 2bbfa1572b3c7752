//! Console sink: prints each sample on one line.

use crate::config::PluginConfig;
use crate::error::Result;
use crate::plugin::Visualizer;
use crate::sample::{SensorSample, Value};

/// Writes samples to stdout, one line each, channels in name order.
pub struct ConsoleSink {
    /// Optional label prepended to every line.
    prefix: Option<String>,
}

impl ConsoleSink {
    /// Config keys: `prefix` (optional).
    pub fn from_config(config: &PluginConfig) -> Result<Self> {
        Ok(Self {
            prefix: config.get_str("prefix").map(str::to_string),
        })
    }

    fn format_line(&self, sample: &SensorSample) -> String {
        let mut channels: Vec<(&String, &Value)> = sample.values.iter().collect();
        channels.sort_by(|a, b| a.0.cmp(b.0));

        let fields: Vec<String> = channels
            .iter()
            .map(|(name, value)| match value {
                Value::Float(v) => {
                    let unit = sample.unit(name, "");
                    if unit.is_empty() {
                        format!("{name}={v:.4}")
                    } else {
                        format!("{name}={v:.4} {unit}")
                    }
                }
                Value::Floats(v) => format!("{name}=[{} bins]", v.len()),
                other => format!("{name}={other:?}"),
            })
            .collect();

        let prefix = self.prefix.as_deref().unwrap_or("");
        format!(
            "{prefix}[{:.3}] {}/{}: {}",
            sample.timestamp,
            sample.sensor_id,
            sample.data_type,
            fields.join(" ")
        )
    }
}

impl Visualizer for ConsoleSink {
    fn visualize(&mut self, sample: &SensorSample) -> Result<()> {
        println!("{}", self.format_line(sample));
        Ok(())
    }
}
