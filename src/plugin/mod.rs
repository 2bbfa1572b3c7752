//! Plugin capability contracts.
//!
//! Each pipeline stage is a plugin implementing one of four capability
//! traits, selected by name through the [`registry`]:
//!
//! - [`Reader`] - produces raw byte chunks from a source
//! - [`Decoder`] - turns chunks into [`SensorSample`]s, buffering partial
//!   packets across calls
//! - [`Processor`] - transforms one sample into zero or more samples
//! - [`Visualizer`] - consumes samples for an external effect
//!
//! Decode and process use push-style emission: the stage appends 0..N
//! results to an output `Vec` per call, which preserves ordering and keeps
//! buffers reusable across calls.
//!
//! All plugin instances are `Send` (pipelines run on worker threads) and
//! exclusively owned by their pipeline; nothing here is shared.

pub mod registry;

pub use registry::PluginRegistry;

use crate::error::Result;
use crate::sample::SensorSample;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// The four plugin capability kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PluginKind {
    Reader,
    Decoder,
    Processor,
    Visualizer,
}

impl std::fmt::Display for PluginKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PluginKind::Reader => write!(f, "reader"),
            PluginKind::Decoder => write!(f, "decoder"),
            PluginKind::Processor => write!(f, "processor"),
            PluginKind::Visualizer => write!(f, "visualizer"),
        }
    }
}

/// Non-blocking reader introspection result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReaderStatus {
    Connected,
    Disconnected,
    Error(String),
}

/// Cloneable cancellation handle shared between a reader and the thread
/// controlling its pipeline.
///
/// A blocked `read_chunk` observes cancellation within its configured
/// timeout; `Pipeline::stop` cancels the token from another thread so a
/// pending read returns promptly instead of stalling shutdown.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Idempotent, callable from any thread.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// True once `cancel` has been called.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Produces a lazy sequence of raw byte chunks from a source.
///
/// Chunk boundaries carry no meaning; packet framing is entirely the
/// decoder's concern.
pub trait Reader: Send {
    /// Acquire the underlying resource (open the file, connect the port).
    fn open(&mut self) -> Result<()>;

    /// Pull the next chunk.
    ///
    /// Returns `Ok(None)` when the source is exhausted (end of file); live
    /// sources never return `None` on their own. May return an empty chunk
    /// when a bounded wait elapsed with no data, so callers can re-check
    /// for cancellation. Must return promptly once the reader's
    /// [`CancelToken`] is cancelled.
    fn read_chunk(&mut self) -> Result<Option<Vec<u8>>>;

    /// Release the resource. Safe to call repeatedly.
    fn close(&mut self);

    /// Non-blocking status introspection.
    fn status(&self) -> ReaderStatus;

    /// Handle used to interrupt a blocked read from another thread.
    fn cancel_token(&self) -> CancelToken;
}

impl std::fmt::Debug for dyn Reader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("dyn Reader")
    }
}

/// Converts raw byte chunks into decoded samples.
///
/// Implementations keep an internal byte buffer across calls: trailing
/// bytes that do not yet form a complete packet are retained and prefixed
/// to the next chunk. One call may emit zero, one or many samples, in
/// arrival order. Corrupt leading bytes are skipped by resynchronizing on
/// the next valid packet start; only unrecoverable conditions (e.g. a
/// nonsensical configuration) produce an error.
pub trait Decoder: Send {
    fn decode(&mut self, chunk: &[u8], out: &mut Vec<SensorSample>) -> Result<()>;
}

impl std::fmt::Debug for dyn Decoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("dyn Decoder")
    }
}

/// Transforms one input sample into zero or more output samples.
///
/// A processor may filter (emit nothing), fan out (emit several) or
/// reshape the payload entirely (e.g. time series → spectrum). Internal
/// state such as sliding windows is exclusively owned by the instance.
pub trait Processor: Send {
    fn process(&mut self, sample: SensorSample, out: &mut Vec<SensorSample>) -> Result<()>;
}

/// Consumes samples for an external effect (print, persist, plot).
///
/// `setup` runs once before the first sample of a run and `teardown`
/// exactly once after the last, including on abnormal termination. A
/// failing sink is isolated by the pipeline; it never stops its peers.
pub trait Visualizer: Send {
    fn setup(&mut self) -> Result<()> {
        Ok(())
    }

    fn visualize(&mut self, sample: &SensorSample) -> Result<()>;

    fn teardown(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancel_token() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(!token.is_cancelled());

        clone.cancel();
        assert!(token.is_cancelled());

        // Idempotent
        clone.cancel();
        assert!(token.is_cancelled());
    }

    #[test]
    fn test_plugin_kind_display() {
        assert_eq!(PluginKind::Reader.to_string(), "reader");
        assert_eq!(PluginKind::Visualizer.to_string(), "visualizer");
    }

    #[test]
    fn test_plugin_kind_serde() {
        let kind: PluginKind = serde_json::from_str("\"decoder\"").unwrap();
        assert_eq!(kind, PluginKind::Decoder);
    }
}
