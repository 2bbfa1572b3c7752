//! Pipeline configuration.
//!
//! An [`EngineConfig`] describes a set of pipelines; each [`PipelineSpec`]
//! names one reader, one decoder, an ordered processor chain and a list of
//! visualizers by plugin name. Plugin parameters are opaque string-keyed
//! maps ([`PluginConfig`]) validated only by the target plugin's
//! constructor.
//!
//! Files are JSON or TOML, selected by extension.

use crate::error::{Result, SensorVisError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Opaque configuration map handed to a plugin factory.
///
/// Typed getters return `None`/defaults on missing keys; the `require_*`
/// variants produce a `Config` error naming the key, for parameters a
/// plugin cannot do without.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PluginConfig(pub BTreeMap<String, serde_json::Value>);

impl PluginConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert, mainly for tests and sample configs.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(|v| v.as_str())
    }

    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.0.get(key).and_then(|v| v.as_f64())
    }

    pub fn get_u64(&self, key: &str) -> Option<u64> {
        self.0.get(key).and_then(|v| v.as_u64())
    }

    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.0.get(key).and_then(|v| v.as_i64())
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.0.get(key).and_then(|v| v.as_bool())
    }

    pub fn get_usize(&self, key: &str) -> Option<usize> {
        self.get_u64(key).map(|v| v as usize)
    }

    /// String values of a JSON array entry, e.g. channel lists.
    pub fn get_str_list(&self, key: &str) -> Option<Vec<String>> {
        self.0.get(key).and_then(|v| v.as_array()).map(|items| {
            items
                .iter()
                .filter_map(|i| i.as_str().map(str::to_string))
                .collect()
        })
    }

    pub fn require_str(&self, key: &str) -> Result<&str> {
        self.get_str(key)
            .ok_or_else(|| SensorVisError::Config(format!("missing required key '{key}'")))
    }

    pub fn require_f64(&self, key: &str) -> Result<f64> {
        self.get_f64(key)
            .ok_or_else(|| SensorVisError::Config(format!("missing required key '{key}'")))
    }
}

/// One stage of a pipeline: a plugin name plus its parameters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PluginSpec {
    /// Registered plugin name, e.g. "serial", "imu_frames".
    #[serde(rename = "type")]
    pub type_name: String,

    /// Parameters for the plugin's constructor.
    #[serde(default)]
    pub config: PluginConfig,
}

impl PluginSpec {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            config: PluginConfig::new(),
        }
    }

    pub fn with_config(mut self, config: PluginConfig) -> Self {
        self.config = config;
        self
    }
}

/// A complete Reader → Decoder → Processors → Visualizers assembly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSpec {
    /// Display name, also used to tag events from this pipeline.
    pub name: String,

    /// Run this pipeline on its own worker thread.
    #[serde(default = "default_true")]
    pub concurrent: bool,

    pub reader: PluginSpec,

    pub decoder: PluginSpec,

    #[serde(default)]
    pub processors: Vec<PluginSpec>,

    #[serde(default)]
    pub visualizers: Vec<PluginSpec>,
}

fn default_true() -> bool {
    true
}

/// Root configuration consumed by `Engine::setup`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub pipelines: Vec<PipelineSpec>,
}

impl EngineConfig {
    /// Load a configuration from a JSON or TOML file (by extension).
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            SensorVisError::Config(format!("failed to read config file {path:?}: {e}"))
        })?;

        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => serde_json::from_str(&content).map_err(|e| {
                SensorVisError::Config(format!("failed to parse config file {path:?}: {e}"))
            }),
            Some("toml") => toml::from_str(&content).map_err(|e| {
                SensorVisError::Config(format!("failed to parse config file {path:?}: {e}"))
            }),
            other => Err(SensorVisError::Config(format!(
                "unsupported config format {other:?} for {path:?} (expected .json or .toml)"
            ))),
        }
    }

    /// Save the configuration as pretty JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| SensorVisError::Config(format!("failed to serialize config: {e}")))?;
        std::fs::write(path, content).map_err(|e| {
            SensorVisError::Config(format!("failed to write config file {path:?}: {e}"))
        })
    }

    /// A runnable example: synthetic IMU frames through a low-pass filter
    /// to the console.
    pub fn sample() -> Self {
        Self {
            pipelines: vec![PipelineSpec {
                name: "demo-imu".to_string(),
                concurrent: true,
                reader: PluginSpec::new("mock").with_config(
                    PluginConfig::new()
                        .with("packet_count", 200)
                        .with("rate_hz", 100),
                ),
                decoder: PluginSpec::new("imu_frames").with_config(
                    PluginConfig::new()
                        .with("sensor_id", "imu1")
                        .with("acc_range", 16.0)
                        .with("gyro_range", 2000.0),
                ),
                processors: vec![PluginSpec::new("lowpass").with_config(
                    PluginConfig::new()
                        .with("cutoff_hz", 10.0)
                        .with("sample_rate_hz", 100.0),
                )],
                visualizers: vec![PluginSpec::new("console")],
            }],
        }
    }
}
