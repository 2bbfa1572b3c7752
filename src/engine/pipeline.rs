//! Pipeline: one Reader → Decoder → Processors → Sinks assembly.
//!
//! A pipeline owns its plugin instances exclusively and executes strictly
//! sequentially: each step pulls one chunk, decodes it, threads every
//! sample through the processor chain in order, and delivers survivors to
//! every sink. That single-threaded discipline is what guarantees
//! per-chunk ordering.
//!
//! Control crosses threads only through the cloneable [`PipelineHandle`]
//! (stop flag + reader cancel token) and through tap subscribers — bounded
//! channels receiving a copy of every delivered sample and all lifecycle
//! events. A stopped pipeline is terminal; build a fresh one to restart.

use crate::error::{Result, ResultExt as _};
use crate::plugin::{CancelToken, Decoder, Processor, Reader, Visualizer};
use crate::sample::SensorSample;
use crossbeam_channel::Sender;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

/// Pipeline lifecycle states. `Stopped` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PipelineState {
    Idle = 0,
    Running = 1,
    StopRequested = 2,
    Stopped = 3,
}

impl PipelineState {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => PipelineState::Idle,
            1 => PipelineState::Running,
            2 => PipelineState::StopRequested,
            _ => PipelineState::Stopped,
        }
    }
}

/// Events published to tap subscribers, tagged with the pipeline name.
///
/// Per pipeline, delivery order matches emission order; nothing is
/// guaranteed across pipelines.
#[derive(Debug, Clone)]
pub enum PipelineEvent {
    /// The pipeline entered `Running`.
    Started { pipeline: String },
    /// A sample was delivered to the sinks.
    Sample {
        pipeline: String,
        sample: SensorSample,
    },
    /// One sink failed; the pipeline and its other sinks continue.
    SinkError {
        pipeline: String,
        sink: String,
        message: String,
    },
    /// The pipeline is stopping because of an error.
    Error { pipeline: String, message: String },
    /// The pipeline reached `Stopped`.
    Stopped { pipeline: String },
}

/// State shared between a running pipeline and its handles.
#[derive(Debug)]
struct PipelineShared {
    state: AtomicU8,
}

/// Cloneable cross-thread control for one pipeline.
#[derive(Clone)]
pub struct PipelineHandle {
    name: String,
    shared: Arc<PipelineShared>,
    cancel: CancelToken,
}

impl PipelineHandle {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> PipelineState {
        PipelineState::from_u8(self.shared.state.load(Ordering::SeqCst))
    }

    /// Request a cooperative stop. Idempotent; a no-op once stopped.
    ///
    /// Cancels the reader token as well, so a read blocked on I/O returns
    /// within its timeout instead of delaying shutdown.
    pub fn stop(&self) {
        loop {
            let current = self.shared.state.load(Ordering::SeqCst);
            let state = PipelineState::from_u8(current);
            if state == PipelineState::Stopped || state == PipelineState::StopRequested {
                break;
            }
            if self
                .shared
                .state
                .compare_exchange(
                    current,
                    PipelineState::StopRequested as u8,
                    Ordering::SeqCst,
                    Ordering::SeqCst,
                )
                .is_ok()
            {
                tracing::debug!("stop requested for pipeline '{}'", self.name);
                break;
            }
        }
        self.cancel.cancel();
    }
}

/// One sink plus its name and whether `setup` succeeded.
struct SinkSlot {
    name: String,
    sink: Box<dyn Visualizer>,
    active: bool,
}

/// Outcome of one `run_step`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// The step consumed a chunk (possibly empty).
    Progress,
    /// The reader's sequence ended.
    SourceExhausted,
}

/// One configured streaming pipeline.
pub struct Pipeline {
    name: String,
    reader: Box<dyn Reader>,
    decoder: Box<dyn Decoder>,
    processors: Vec<(String, Box<dyn Processor>)>,
    sinks: Vec<SinkSlot>,
    taps: Vec<Sender<PipelineEvent>>,
    /// Events lost to full tap channels.
    dropped_events: u64,
    shared: Arc<PipelineShared>,
    cancel: CancelToken,
    // Reused per-step buffers.
    decode_buf: Vec<SensorSample>,
    stage_in: Vec<SensorSample>,
    stage_out: Vec<SensorSample>,
}

impl Pipeline {
    pub fn new(
        name: impl Into<String>,
        reader: Box<dyn Reader>,
        decoder: Box<dyn Decoder>,
        processors: Vec<(String, Box<dyn Processor>)>,
        sinks: Vec<(String, Box<dyn Visualizer>)>,
    ) -> Self {
        let cancel = reader.cancel_token();
        Self {
            name: name.into(),
            reader,
            decoder,
            processors,
            sinks: sinks
                .into_iter()
                .map(|(name, sink)| SinkSlot {
                    name,
                    sink,
                    active: false,
                })
                .collect(),
            taps: Vec::new(),
            dropped_events: 0,
            shared: Arc::new(PipelineShared {
                state: AtomicU8::new(PipelineState::Idle as u8),
            }),
            cancel,
            decode_buf: Vec::new(),
            stage_in: Vec::new(),
            stage_out: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> PipelineState {
        PipelineState::from_u8(self.shared.state.load(Ordering::SeqCst))
    }

    /// Cross-thread control handle for this pipeline.
    pub fn handle(&self) -> PipelineHandle {
        PipelineHandle {
            name: self.name.clone(),
            shared: self.shared.clone(),
            cancel: self.cancel.clone(),
        }
    }

    /// Subscribe a tap to samples and lifecycle events.
    ///
    /// Must be called before `run`. Full channels drop events (counted),
    /// they never block the pipeline.
    pub fn add_tap(&mut self, tap: Sender<PipelineEvent>) {
        self.taps.push(tap);
    }

    /// Events dropped so far because a tap channel was full.
    pub fn dropped_events(&self) -> u64 {
        self.dropped_events
    }

    fn emit(&mut self, event: PipelineEvent) {
        for tap in &self.taps {
            if tap.try_send(event.clone()).is_err() {
                self.dropped_events += 1;
            }
        }
    }

    fn stop_requested(&self) -> bool {
        self.state() == PipelineState::StopRequested
    }

    /// Run to completion: until the source ends, an error occurs, or a
    /// stop is requested. Sinks are set up before the first step and torn
    /// down on every exit path.
    pub fn run(&mut self) -> Result<()> {
        if self
            .shared
            .state
            .compare_exchange(
                PipelineState::Idle as u8,
                PipelineState::Running as u8,
                Ordering::SeqCst,
                Ordering::SeqCst,
            )
            .is_err()
        {
            tracing::warn!(
                "pipeline '{}' cannot run from state {:?}; build a fresh pipeline to restart",
                self.name,
                self.state()
            );
            return Ok(());
        }

        tracing::info!("pipeline '{}' started", self.name);
        self.emit(PipelineEvent::Started {
            pipeline: self.name.clone(),
        });

        if let Err(e) = self.reader.open() {
            tracing::error!("pipeline '{}' failed to open reader: {e}", self.name);
            self.emit(PipelineEvent::Error {
                pipeline: self.name.clone(),
                message: e.to_string(),
            });
            self.finish();
            return Err(e);
        }

        self.setup_sinks();

        let result = loop {
            if self.stop_requested() {
                tracing::info!("pipeline '{}' observed stop request", self.name);
                break Ok(());
            }
            match self.run_step() {
                Ok(StepOutcome::Progress) => {}
                Ok(StepOutcome::SourceExhausted) => {
                    tracing::info!("pipeline '{}' source exhausted", self.name);
                    break Ok(());
                }
                Err(e) => {
                    tracing::error!("pipeline '{}' failed: {e}", self.name);
                    self.emit(PipelineEvent::Error {
                        pipeline: self.name.clone(),
                        message: e.to_string(),
                    });
                    break Err(e);
                }
            }
        };

        self.finish();
        result
    }

    /// Execute exactly one chunk worth of work.
    pub fn run_step(&mut self) -> Result<StepOutcome> {
        let chunk = match self.reader.read_chunk()? {
            Some(chunk) => chunk,
            None => return Ok(StepOutcome::SourceExhausted),
        };

        self.decode_buf.clear();
        let mut decoded = std::mem::take(&mut self.decode_buf);
        let decode_result = self.decoder.decode(&chunk, &mut decoded);
        // Samples decoded before a failure are still delivered in order.
        for sample in decoded.drain(..) {
            self.process_and_deliver(sample)?;
        }
        self.decode_buf = decoded;
        decode_result?;

        Ok(StepOutcome::Progress)
    }

    /// Thread one decoded sample through the processor chain, then deliver
    /// every surviving unit to every sink in registration order.
    fn process_and_deliver(&mut self, sample: SensorSample) -> Result<()> {
        let mut current = std::mem::take(&mut self.stage_in);
        let mut next = std::mem::take(&mut self.stage_out);
        current.clear();
        next.clear();
        current.push(sample);

        for (name, processor) in self.processors.iter_mut() {
            for s in current.drain(..) {
                processor
                    .process(s, &mut next)
                    .with_context(|| format!("processor '{name}'"))?;
            }
            std::mem::swap(&mut current, &mut next);
            next.clear();
        }

        for s in current.drain(..) {
            let mut sink_errors: Vec<(String, String)> = Vec::new();
            for slot in self.sinks.iter_mut().filter(|s| s.active) {
                if let Err(e) = slot.sink.visualize(&s) {
                    tracing::warn!(
                        "sink '{}' on pipeline '{}' failed: {e}",
                        slot.name,
                        self.name
                    );
                    sink_errors.push((slot.name.clone(), e.to_string()));
                }
            }
            for (sink, message) in sink_errors {
                self.emit(PipelineEvent::SinkError {
                    pipeline: self.name.clone(),
                    sink,
                    message,
                });
            }
            if !self.taps.is_empty() {
                self.emit(PipelineEvent::Sample {
                    pipeline: self.name.clone(),
                    sample: s,
                });
            }
        }

        self.stage_in = current;
        self.stage_out = next;
        Ok(())
    }

    fn setup_sinks(&mut self) {
        let mut failures: Vec<(String, String)> = Vec::new();
        for slot in self.sinks.iter_mut() {
            match slot.sink.setup() {
                Ok(()) => slot.active = true,
                Err(e) => {
                    tracing::error!(
                        "sink '{}' on pipeline '{}' failed to set up: {e}",
                        slot.name,
                        self.name
                    );
                    failures.push((slot.name.clone(), e.to_string()));
                }
            }
        }
        for (sink, message) in failures {
            self.emit(PipelineEvent::SinkError {
                pipeline: self.name.clone(),
                sink,
                message,
            });
        }
    }

    /// Release the reader, tear down sinks that were set up, and reach the
    /// terminal state. Runs on every exit path of `run`.
    fn finish(&mut self) {
        self.reader.close();
        for slot in self.sinks.iter_mut() {
            if slot.active {
                slot.sink.teardown();
                slot.active = false;
            }
        }
        self.shared
            .state
            .store(PipelineState::Stopped as u8, Ordering::SeqCst);
        self.emit(PipelineEvent::Stopped {
            pipeline: self.name.clone(),
        });
        tracing::info!("pipeline '{}' stopped", self.name);
    }
}
