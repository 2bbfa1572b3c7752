//! Plugin registry: maps (capability kind, name) to a factory.
//!
//! Registration is a static table built at startup rather than a directory
//! scan: built-ins install themselves via [`PluginRegistry::with_builtins`]
//! and embedders add their own factories with the `register_*` methods.
//! Re-registering a name replaces the previous factory deterministically
//! (last registration wins) and logs the replacement.

use crate::config::PluginConfig;
use crate::error::{Result, SensorVisError};
use crate::plugin::{Decoder, PluginKind, Processor, Reader, Visualizer};
use std::collections::HashMap;

pub type ReaderFactory = Box<dyn Fn(&PluginConfig) -> Result<Box<dyn Reader>> + Send + Sync>;
pub type DecoderFactory = Box<dyn Fn(&PluginConfig) -> Result<Box<dyn Decoder>> + Send + Sync>;
pub type ProcessorFactory = Box<dyn Fn(&PluginConfig) -> Result<Box<dyn Processor>> + Send + Sync>;
pub type VisualizerFactory =
    Box<dyn Fn(&PluginConfig) -> Result<Box<dyn Visualizer>> + Send + Sync>;

/// Holds one factory table per capability kind.
#[derive(Default)]
pub struct PluginRegistry {
    readers: HashMap<String, ReaderFactory>,
    decoders: HashMap<String, DecoderFactory>,
    processors: HashMap<String, ProcessorFactory>,
    visualizers: HashMap<String, VisualizerFactory>,
}

impl PluginRegistry {
    /// An empty registry with no factories installed.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry pre-populated with the built-in plugin set.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.discover();
        registry
    }

    /// (Re)install the built-in factory table.
    ///
    /// Idempotent; the last installation wins. A failing registration
    /// source is logged and skipped so a partial registry still comes up.
    pub fn discover(&mut self) {
        crate::plugins::register_builtins(self);
        tracing::debug!(
            "plugin discovery complete: {} readers, {} decoders, {} processors, {} visualizers",
            self.readers.len(),
            self.decoders.len(),
            self.processors.len(),
            self.visualizers.len()
        );
    }

    fn warn_replaced(kind: PluginKind, name: &str) {
        tracing::warn!("replacing previously registered {kind} plugin '{name}'");
    }

    pub fn register_reader(&mut self, name: impl Into<String>, factory: ReaderFactory) {
        let name = name.into();
        if self.readers.insert(name.clone(), factory).is_some() {
            Self::warn_replaced(PluginKind::Reader, &name);
        }
    }

    pub fn register_decoder(&mut self, name: impl Into<String>, factory: DecoderFactory) {
        let name = name.into();
        if self.decoders.insert(name.clone(), factory).is_some() {
            Self::warn_replaced(PluginKind::Decoder, &name);
        }
    }

    pub fn register_processor(&mut self, name: impl Into<String>, factory: ProcessorFactory) {
        let name = name.into();
        if self.processors.insert(name.clone(), factory).is_some() {
            Self::warn_replaced(PluginKind::Processor, &name);
        }
    }

    pub fn register_visualizer(&mut self, name: impl Into<String>, factory: VisualizerFactory) {
        let name = name.into();
        if self.visualizers.insert(name.clone(), factory).is_some() {
            Self::warn_replaced(PluginKind::Visualizer, &name);
        }
    }

    /// True if a factory is registered for (kind, name).
    pub fn contains(&self, kind: PluginKind, name: &str) -> bool {
        match kind {
            PluginKind::Reader => self.readers.contains_key(name),
            PluginKind::Decoder => self.decoders.contains_key(name),
            PluginKind::Processor => self.processors.contains_key(name),
            PluginKind::Visualizer => self.visualizers.contains_key(name),
        }
    }

    /// Registered names for one capability kind, sorted.
    pub fn names(&self, kind: PluginKind) -> Vec<&str> {
        let mut names: Vec<&str> = match kind {
            PluginKind::Reader => self.readers.keys().map(String::as_str).collect(),
            PluginKind::Decoder => self.decoders.keys().map(String::as_str).collect(),
            PluginKind::Processor => self.processors.keys().map(String::as_str).collect(),
            PluginKind::Visualizer => self.visualizers.keys().map(String::as_str).collect(),
        };
        names.sort_unstable();
        names
    }

    fn not_found(kind: PluginKind, name: &str) -> SensorVisError {
        SensorVisError::PluginNotFound {
            kind,
            name: name.to_string(),
        }
    }

    fn instantiation_failed(kind: PluginKind, name: &str, source: SensorVisError) -> SensorVisError {
        SensorVisError::PluginInstantiation {
            kind,
            name: name.to_string(),
            source: Box::new(source),
        }
    }

    /// Instantiate a reader by name.
    pub fn instantiate_reader(&self, name: &str, config: &PluginConfig) -> Result<Box<dyn Reader>> {
        let factory = self
            .readers
            .get(name)
            .ok_or_else(|| Self::not_found(PluginKind::Reader, name))?;
        factory(config).map_err(|e| Self::instantiation_failed(PluginKind::Reader, name, e))
    }

    /// Instantiate a decoder by name.
    pub fn instantiate_decoder(
        &self,
        name: &str,
        config: &PluginConfig,
    ) -> Result<Box<dyn Decoder>> {
        let factory = self
            .decoders
            .get(name)
            .ok_or_else(|| Self::not_found(PluginKind::Decoder, name))?;
        factory(config).map_err(|e| Self::instantiation_failed(PluginKind::Decoder, name, e))
    }

    /// Instantiate a processor by name.
    pub fn instantiate_processor(
        &self,
        name: &str,
        config: &PluginConfig,
    ) -> Result<Box<dyn Processor>> {
        let factory = self
            .processors
            .get(name)
            .ok_or_else(|| Self::not_found(PluginKind::Processor, name))?;
        factory(config).map_err(|e| Self::instantiation_failed(PluginKind::Processor, name, e))
    }

    /// Instantiate a visualizer by name.
    pub fn instantiate_visualizer(
        &self,
        name: &str,
        config: &PluginConfig,
    ) -> Result<Box<dyn Visualizer>> {
        let factory = self
            .visualizers
            .get(name)
            .ok_or_else(|| Self::not_found(PluginKind::Visualizer, name))?;
        factory(config).map_err(|e| Self::instantiation_failed(PluginKind::Visualizer, name, e))
    }
}
