//! Error handling for the sensor pipeline.
//!
//! This module defines the error taxonomy and a Result alias used
//! throughout the crate.

use crate::plugin::PluginKind;
use thiserror::Error;

/// Main error type for pipeline operations
#[derive(Error, Debug)]
pub enum SensorVisError {
    /// No factory registered for a (kind, name) pair
    #[error("no {kind} plugin named '{name}' is registered")]
    PluginNotFound { kind: PluginKind, name: String },

    /// A plugin factory rejected its configuration
    #[error("failed to instantiate {kind} plugin '{name}': {source}")]
    PluginInstantiation {
        kind: PluginKind,
        name: String,
        #[source]
        source: Box<SensorVisError>,
    },

    /// Errors from a data source (file, serial link)
    #[error("reader error: {0}")]
    Reader(String),

    /// Errors from the serial port layer
    #[error("serial error: {0}")]
    Serial(#[from] serialport::Error),

    /// Unrecoverable stream corruption or bad decoder configuration
    #[error("decode error: {0}")]
    Decode(String),

    /// Errors raised by a processor stage
    #[error("processor error: {0}")]
    Processor(String),

    /// Errors raised by a visualizer/sink
    #[error("sink error: {0}")]
    Sink(String),

    /// Errors related to configuration loading/validation
    #[error("configuration error: {0}")]
    Config(String),

    /// Errors related to Rhai script compilation/execution
    #[error("script error: {0}")]
    Script(String),

    /// Device timestamp could not be converted to epoch seconds
    #[error("timestamp error: {0}")]
    Timestamp(String),

    /// A pipeline spec could not be built during engine setup
    #[error("engine setup failed for pipeline '{pipeline}': {source}")]
    EngineSetup {
        pipeline: String,
        #[source]
        source: Box<SensorVisError>,
    },

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic errors with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<SensorVisError>,
    },
}

impl SensorVisError {
    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        SensorVisError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Create a script error from a Rhai error
    pub fn from_rhai_error(err: Box<rhai::EvalAltResult>) -> Self {
        SensorVisError::Script(err.to_string())
    }
}

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, SensorVisError>;

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error result
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context lazily to an error result
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.with_context(f()))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, Box<rhai::EvalAltResult>> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| SensorVisError::from_rhai_error(e).with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| SensorVisError::from_rhai_error(e).with_context(f()))
    }
}
