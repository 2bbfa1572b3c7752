//! Script processor: Rhai expressions over channel values.

use crate::config::PluginConfig;
use crate::error::{Result, SensorVisError};
use crate::plugin::Processor;
use crate::sample::{SensorSample, Value};
use rhai::{Engine, Scope, AST};

/// Rewrites numeric channels through a user-supplied Rhai expression.
///
/// The expression sees `value` (the channel's current value) and
/// `timestamp` (the sample's epoch seconds) and must evaluate to a number,
/// e.g. `value * 3.3 / 4096.0`. The script is compiled once at
/// construction; a compile failure rejects the plugin config. Runtime
/// evaluation errors leave the original value in place and are logged, so
/// one bad sample cannot stop the pipeline.
pub struct ScriptMap {
    engine: Engine,
    ast: AST,
    /// Channels to map; empty means every float channel.
    channels: Vec<String>,
}

impl ScriptMap {
    /// Config keys: `script` (required), `channels` (optional list).
    pub fn from_config(config: &PluginConfig) -> Result<Self> {
        let script = config.require_str("script")?;
        let engine = Engine::new();
        let ast = engine
            .compile(script)
            .map_err(|e| SensorVisError::Script(format!("failed to compile script: {e}")))?;

        Ok(Self {
            engine,
            ast,
            channels: config.get_str_list("channels").unwrap_or_default(),
        })
    }

    fn applies_to(&self, channel: &str) -> bool {
        self.channels.is_empty() || self.channels.iter().any(|c| c == channel)
    }

    fn eval(&self, value: f64, timestamp: f64) -> std::result::Result<f64, String> {
        let mut scope = Scope::new();
        scope.push("value", value);
        scope.push("timestamp", timestamp);
        self.engine
            .eval_ast_with_scope::<f64>(&mut scope, &self.ast)
            .map_err(|e| e.to_string())
    }
}

impl Processor for ScriptMap {
    fn process(&mut self, mut sample: SensorSample, out: &mut Vec<SensorSample>) -> Result<()> {
        let timestamp = sample.timestamp;
        for (name, value) in sample.values.iter_mut() {
            let Value::Float(x) = value else { continue };
            if !self.applies_to(name) {
                continue;
            }
            match self.eval(*x, timestamp) {
                Ok(mapped) if mapped.is_finite() => *x = mapped,
                Ok(mapped) => {
                    tracing::warn!("script produced non-finite value {mapped} for '{name}'");
                }
                Err(e) => {
                    tracing::warn!("script evaluation failed for '{name}': {e}");
                }
            }
        }
        out.push(sample);
        Ok(())
    }
}
