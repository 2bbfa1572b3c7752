//! # SensorVis-RS: streaming sensor-data pipeline
//!
//! Ingests raw byte streams from sensor sources (serial links, files,
//! synthetic generators), decodes them into structured samples, runs them
//! through a configurable chain of transformations, and delivers results
//! to sinks.
//!
//! ## Architecture
//!
//! - **Plugins**: four capability traits (Reader, Decoder, Processor,
//!   Visualizer) selected by name through a registry
//! - **Pipeline**: one Reader → Decoder → Processors → Sinks assembly with
//!   its own lifecycle, run strictly sequentially for ordering
//! - **Engine**: builds pipelines from configuration and runs each
//!   concurrent one on its own worker thread
//! - **Adapter**: republishes pipeline output to an external consumer over
//!   a bounded crossbeam channel
//!
//! ## Example
//!
//! ```ignore
//! use sensorvis_rs::{
//!     config::EngineConfig,
//!     engine::{Engine, EngineAdapter, PipelineEvent},
//! };
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = EngineConfig::load("pipelines.json")?;
//!     let engine = Engine::setup(config)?;
//!     let (mut adapter, subscriber) = EngineAdapter::spawn(engine)?;
//!
//!     for event in subscriber.iter() {
//!         if let PipelineEvent::Sample { pipeline, sample } = event {
//!             println!("{pipeline}: {} @ {}", sample.data_type, sample.timestamp);
//!         }
//!     }
//!
//!     adapter.stop(std::time::Duration::from_secs(3));
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod plugin;
pub mod plugins;
pub mod sample;
pub mod serial;
pub mod timestamp;

// Re-export commonly used types
pub use config::{EngineConfig, PipelineSpec, PluginConfig, PluginSpec};
pub use engine::{Engine, EngineAdapter, EngineSubscriber, Pipeline, PipelineEvent, PipelineState};
pub use error::{Result, SensorVisError};
pub use plugin::{CancelToken, Decoder, PluginKind, PluginRegistry, Processor, Reader, Visualizer};
pub use sample::{RawTimestamp, SensorSample, Value};
