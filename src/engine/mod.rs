//! Engine: builds and runs the configured pipelines.
//!
//! `setup` resolves every pipeline spec against the plugin registry and
//! fails fast — if any plugin is missing or rejects its config, nothing
//! starts. `run` then drives all pipelines to `Stopped`: concurrent ones
//! each on a named worker thread, the rest sequentially on the caller's
//! thread. A pipeline failing at runtime stops only itself; the error is
//! surfaced through tap events, never thrown across the thread boundary.
//!
//! Registry and engine are per-run values, not singletons.

pub mod adapter;
pub mod pipeline;

pub use adapter::{EngineAdapter, EngineSubscriber};
pub use pipeline::{Pipeline, PipelineEvent, PipelineHandle, PipelineState, StepOutcome};

use crate::config::{EngineConfig, PipelineSpec};
use crate::error::{Result, SensorVisError};
use crate::plugin::PluginRegistry;
use crossbeam_channel::Sender;

struct Entry {
    pipeline: Pipeline,
    concurrent: bool,
}

/// Owns the registry and the pipelines built from one configuration.
pub struct Engine {
    #[allow(dead_code)]
    registry: PluginRegistry,
    entries: Vec<Entry>,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("pipelines", &self.entries.len())
            .finish()
    }
}

impl Engine {
    /// Build every configured pipeline using the built-in plugin set.
    pub fn setup(config: EngineConfig) -> Result<Self> {
        Self::setup_with_registry(config, PluginRegistry::with_builtins())
    }

    /// Build every configured pipeline against a caller-supplied registry
    /// (built-ins plus embedder extensions).
    pub fn setup_with_registry(config: EngineConfig, registry: PluginRegistry) -> Result<Self> {
        let mut entries = Vec::with_capacity(config.pipelines.len());
        for spec in &config.pipelines {
            let pipeline =
                Self::build_pipeline(&registry, spec).map_err(|e| SensorVisError::EngineSetup {
                    pipeline: spec.name.clone(),
                    source: Box::new(e),
                })?;
            tracing::info!(
                "pipeline '{}' assembled: {} → {} → {} processors → {} sinks",
                spec.name,
                spec.reader.type_name,
                spec.decoder.type_name,
                spec.processors.len(),
                spec.visualizers.len()
            );
            entries.push(Entry {
                pipeline,
                concurrent: spec.concurrent,
            });
        }
        Ok(Self { registry, entries })
    }

    fn build_pipeline(registry: &PluginRegistry, spec: &PipelineSpec) -> Result<Pipeline> {
        let reader = registry.instantiate_reader(&spec.reader.type_name, &spec.reader.config)?;
        let decoder = registry.instantiate_decoder(&spec.decoder.type_name, &spec.decoder.config)?;

        let mut processors = Vec::with_capacity(spec.processors.len());
        for p in &spec.processors {
            processors.push((
                p.type_name.clone(),
                registry.instantiate_processor(&p.type_name, &p.config)?,
            ));
        }

        let mut sinks = Vec::with_capacity(spec.visualizers.len());
        for v in &spec.visualizers {
            sinks.push((
                v.type_name.clone(),
                registry.instantiate_visualizer(&v.type_name, &v.config)?,
            ));
        }

        Ok(Pipeline::new(
            spec.name.clone(),
            reader,
            decoder,
            processors,
            sinks,
        ))
    }

    /// Number of configured pipelines.
    pub fn pipeline_count(&self) -> usize {
        self.entries.len()
    }

    /// Subscribe one tap to every pipeline's samples and lifecycle events.
    pub fn add_tap(&mut self, tap: Sender<PipelineEvent>) {
        for entry in self.entries.iter_mut() {
            entry.pipeline.add_tap(tap.clone());
        }
    }

    /// Cross-thread control handle covering every pipeline.
    pub fn handle(&self) -> EngineHandle {
        EngineHandle {
            pipelines: self.entries.iter().map(|e| e.pipeline.handle()).collect(),
        }
    }

    /// Run every pipeline to `Stopped`.
    ///
    /// Returns once all worker threads are joined and all sequential
    /// pipelines have finished. Per-pipeline failures are logged and
    /// surfaced via events; they do not abort sibling pipelines.
    pub fn run(self) -> Result<()> {
        let mut workers = Vec::new();
        let mut sequential = Vec::new();

        for entry in self.entries {
            if entry.concurrent {
                let mut pipeline = entry.pipeline;
                let thread_name = format!("pipeline-{}", pipeline.name());
                let spawned = std::thread::Builder::new()
                    .name(thread_name.clone())
                    .spawn(move || {
                        if let Err(e) = pipeline.run() {
                            tracing::error!("pipeline '{}' ended with error: {e}", pipeline.name());
                        }
                    });
                match spawned {
                    Ok(worker) => workers.push(worker),
                    Err(e) => {
                        tracing::error!("failed to spawn thread '{thread_name}': {e}");
                        return Err(SensorVisError::Io(e));
                    }
                }
            } else {
                sequential.push(entry.pipeline);
            }
        }

        for mut pipeline in sequential {
            if let Err(e) = pipeline.run() {
                tracing::error!("pipeline '{}' ended with error: {e}", pipeline.name());
            }
        }

        for worker in workers {
            if worker.join().is_err() {
                tracing::error!("a pipeline worker thread panicked");
            }
        }
        tracing::info!("engine run complete, all pipelines stopped");
        Ok(())
    }
}

/// Cloneable stop/introspection handle for a whole engine run.
#[derive(Clone)]
pub struct EngineHandle {
    pipelines: Vec<PipelineHandle>,
}

impl EngineHandle {
    /// Request a stop on every pipeline. Best-effort and idempotent.
    pub fn stop(&self) {
        for handle in &self.pipelines {
            handle.stop();
        }
    }

    /// Per-pipeline handles, in configuration order.
    pub fn pipelines(&self) -> &[PipelineHandle] {
        &self.pipelines
    }

    /// True once every pipeline has reached `Stopped`.
    pub fn all_stopped(&self) -> bool {
        self.pipelines
            .iter()
            .all(|h| h.state() == PipelineState::Stopped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{PluginConfig, PluginSpec};

    fn mock_spec(name: &str, concurrent: bool, packets: u64) -> PipelineSpec {
        PipelineSpec {
            name: name.to_string(),
            concurrent,
            reader: PluginSpec::new("mock").with_config(
                PluginConfig::new()
                    .with("packet_count", packets)
                    .with("rate_hz", 1000),
            ),
            decoder: PluginSpec::new("imu_frames")
                .with_config(PluginConfig::new().with("sensor_id", name)),
            processors: Vec::new(),
            visualizers: Vec::new(),
        }
    }

    #[test]
    fn test_setup_fails_fast_on_unknown_plugin() {
        let mut spec = mock_spec("broken", false, 1);
        spec.decoder = PluginSpec::new("doesnotexist");
        let config = EngineConfig {
            pipelines: vec![mock_spec("fine", false, 1), spec],
        };

        let err = Engine::setup(config).unwrap_err();
        match err {
            SensorVisError::EngineSetup { pipeline, source } => {
                assert_eq!(pipeline, "broken");
                assert!(matches!(*source, SensorVisError::PluginNotFound { .. }));
            }
            other => panic!("expected EngineSetup, got {other}"),
        }
    }

    #[test]
    fn test_setup_reports_bad_plugin_config() {
        let mut spec = mock_spec("badcfg", false, 1);
        spec.reader = PluginSpec::new("file"); // missing required 'path'
        let config = EngineConfig {
            pipelines: vec![spec],
        };
        assert!(matches!(
            Engine::setup(config),
            Err(SensorVisError::EngineSetup { .. })
        ));
    }

    #[test]
    fn test_run_sequential_and_concurrent_to_stopped() {
        let config = EngineConfig {
            pipelines: vec![
                mock_spec("concurrent-1", true, 5),
                mock_spec("concurrent-2", true, 5),
                mock_spec("sequential", false, 5),
            ],
        };

        let engine = Engine::setup(config).unwrap();
        assert_eq!(engine.pipeline_count(), 3);
        let handle = engine.handle();

        engine.run().unwrap();
        assert!(handle.all_stopped());
    }

    #[test]
    fn test_stop_via_handle() {
        // One unbounded pipeline; run() returns only because of stop().
        let config = EngineConfig {
            pipelines: vec![mock_spec("unbounded", true, 0)],
        };
        let engine = Engine::setup(config).unwrap();
        let handle = engine.handle();

        let runner = std::thread::spawn(move || engine.run());
        std::thread::sleep(std::time::Duration::from_millis(50));

        handle.stop();
        runner.join().unwrap().unwrap();
        assert!(handle.all_stopped());
    }

    #[test]
    fn test_empty_config_runs_trivially() {
        let engine = Engine::setup(EngineConfig::default()).unwrap();
        let handle = engine.handle();
        engine.run().unwrap();
        assert!(handle.all_stopped());
    }
}
