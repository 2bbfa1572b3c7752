//! Headless pipeline runner.
//!
//! Loads a pipeline configuration, runs the engine to completion, and
//! logs lifecycle events. Intended for file playback and recording jobs;
//! interactive front-ends embed the library instead.

use anyhow::Context as _;
use sensorvis_rs::{
    config::EngineConfig,
    engine::{Engine, EngineAdapter, PipelineEvent},
};
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,sensorvis_rs=debug")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut args = std::env::args().skip(1);
    let config_path = match args.next() {
        Some(path) if path != "--write-sample" => path,
        Some(_) => {
            let path = args.next().unwrap_or_else(|| "pipelines.json".to_string());
            EngineConfig::sample()
                .save(&path)
                .context("failed to write sample config")?;
            println!("wrote sample configuration to {path}");
            return Ok(());
        }
        None => {
            eprintln!("usage: sensorvis-rs <config.{{json,toml}}> | --write-sample [path]");
            std::process::exit(2);
        }
    };

    tracing::info!("loading configuration from {config_path}");
    let config = EngineConfig::load(&config_path).context("failed to load configuration")?;
    let engine = Engine::setup(config).context("engine setup failed")?;
    let (mut adapter, subscriber) = EngineAdapter::spawn(engine).context("failed to start engine")?;

    let mut samples = 0u64;
    for event in subscriber.iter() {
        match event {
            PipelineEvent::Started { pipeline } => tracing::info!("[{pipeline}] started"),
            PipelineEvent::Sample { .. } => samples += 1,
            PipelineEvent::SinkError {
                pipeline,
                sink,
                message,
            } => tracing::warn!("[{pipeline}] sink '{sink}' failed: {message}"),
            PipelineEvent::Error { pipeline, message } => {
                tracing::error!("[{pipeline}] {message}")
            }
            PipelineEvent::Stopped { pipeline } => tracing::info!("[{pipeline}] stopped"),
        }
    }

    adapter.stop(Duration::from_secs(3));
    tracing::info!("all pipelines stopped, {samples} samples delivered");
    Ok(())
}
