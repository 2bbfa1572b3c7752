//! Common test utilities and helpers

#![allow(dead_code)] // Test utilities may not all be used in every test file

use sensorvis_rs::config::{PipelineSpec, PluginConfig, PluginSpec};

/// Assert two floats are approximately equal
pub fn assert_float_eq(a: f64, b: f64, epsilon: f64) {
    assert!(
        (a - b).abs() < epsilon,
        "Expected {} to be approximately equal to {} (epsilon: {})",
        a,
        b,
        epsilon
    );
}

/// A pipeline spec reading synthetic IMU frames, with no processors/sinks.
pub fn mock_pipeline_spec(name: &str, packet_count: u64) -> PipelineSpec {
    PipelineSpec {
        name: name.to_string(),
        concurrent: true,
        reader: PluginSpec::new("mock").with_config(
            PluginConfig::new()
                .with("packet_count", packet_count)
                .with("rate_hz", 1000),
        ),
        decoder: PluginSpec::new("imu_frames")
            .with_config(PluginConfig::new().with("sensor_id", name)),
        processors: Vec::new(),
        visualizers: Vec::new(),
    }
}
