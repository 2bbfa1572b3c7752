//! CSV recorder sink: persists samples as long-format rows.

use crate::config::PluginConfig;
use crate::error::{Result, SensorVisError};
use crate::plugin::Visualizer;
use crate::sample::SensorSample;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write as _};
use std::path::PathBuf;

const HEADER: &str = "timestamp,sensor_id,data_type,channel,value,unit";

/// Appends one CSV row per numeric channel of every sample.
///
/// Long format keeps the schema independent of which channels a pipeline
/// happens to produce. The file is opened in `setup` and flushed in
/// `teardown`; rows written before `setup` are an error.
pub struct CsvRecorder {
    path: PathBuf,
    append: bool,
    /// Channels to record; empty means all numeric channels.
    channels: Vec<String>,
    writer: Option<BufWriter<File>>,
    rows_written: u64,
}

impl CsvRecorder {
    /// Config keys: `path` (required), `append` (default false),
    /// `channels` (optional list).
    pub fn from_config(config: &PluginConfig) -> Result<Self> {
        Ok(Self {
            path: PathBuf::from(config.require_str("path")?),
            append: config.get_bool("append").unwrap_or(false),
            channels: config.get_str_list("channels").unwrap_or_default(),
            writer: None,
            rows_written: 0,
        })
    }

    /// Rows written so far in this run.
    pub fn rows_written(&self) -> u64 {
        self.rows_written
    }

    fn wants(&self, channel: &str) -> bool {
        self.channels.is_empty() || self.channels.iter().any(|c| c == channel)
    }
}

impl Visualizer for CsvRecorder {
    fn setup(&mut self) -> Result<()> {
        let existing_len = if self.append {
            std::fs::metadata(&self.path).map(|m| m.len()).unwrap_or(0)
        } else {
            0
        };

        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .append(self.append)
            .truncate(!self.append)
            .open(&self.path)
            .map_err(|e| {
                SensorVisError::Sink(format!("failed to open {:?}: {e}", self.path))
            })?;

        let mut writer = BufWriter::new(file);
        if existing_len == 0 {
            writeln!(writer, "{HEADER}")
                .map_err(|e| SensorVisError::Sink(format!("failed to write header: {e}")))?;
        }
        self.writer = Some(writer);
        self.rows_written = 0;
        tracing::info!("recording to {:?}", self.path);
        Ok(())
    }

    fn visualize(&mut self, sample: &SensorSample) -> Result<()> {
        let mut channels: Vec<(&String, f64)> = sample
            .values
            .iter()
            .filter_map(|(name, v)| v.as_f64().map(|f| (name, f)))
            .collect();
        channels.sort_by(|a, b| a.0.cmp(b.0));
        // Filter with `self.wants` before borrowing `self.writer` mutably, so the
        // immutable `&self` borrow it needs does not overlap the writer borrow.
        channels.retain(|(name, _)| self.wants(name));

        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| SensorVisError::Sink("recorder used before setup".to_string()))?;

        for (name, value) in channels {
            writeln!(
                writer,
                "{},{},{},{},{},{}",
                sample.timestamp,
                sample.sensor_id,
                sample.data_type,
                name,
                value,
                sample.unit(name, "")
            )
            .map_err(|e| SensorVisError::Sink(format!("failed to write row: {e}")))?;
            self.rows_written += 1;
        }
        Ok(())
    }

    fn teardown(&mut self) {
        if let Some(mut writer) = self.writer.take() {
            if let Err(e) = writer.flush() {
                tracing::error!("failed to flush recording {:?}: {e}", self.path);
            } else {
                tracing::info!("recorded {} rows to {:?}", self.rows_written, self.path);
            }
        }
    }
}
