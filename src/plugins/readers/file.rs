//! File reader: chunked playback of a recorded byte stream.

use crate::config::PluginConfig;
use crate::error::{Result, SensorVisError};
use crate::plugin::{CancelToken, Reader, ReaderStatus};
use std::fs::File;
use std::io::Read as _;
use std::path::PathBuf;

const DEFAULT_CHUNK_SIZE: usize = 4096;

/// Reads a file in fixed-size chunks; the sequence ends at EOF.
pub struct FileReader {
    path: PathBuf,
    chunk_size: usize,
    file: Option<File>,
    cancel: CancelToken,
    error: Option<String>,
}

impl FileReader {
    /// Config keys: `path` (required), `chunk_size` (default 4096).
    pub fn from_config(config: &PluginConfig) -> Result<Self> {
        let path = PathBuf::from(config.require_str("path")?);
        let chunk_size = config.get_usize("chunk_size").unwrap_or(DEFAULT_CHUNK_SIZE);
        if chunk_size == 0 {
            return Err(SensorVisError::Config(
                "'chunk_size' must be greater than zero".to_string(),
            ));
        }
        Ok(Self {
            path,
            chunk_size,
            file: None,
            cancel: CancelToken::new(),
            error: None,
        })
    }
}

impl Reader for FileReader {
    fn open(&mut self) -> Result<()> {
        let file = File::open(&self.path).map_err(|e| {
            let msg = format!("failed to open {:?}: {e}", self.path);
            self.error = Some(msg.clone());
            SensorVisError::Reader(msg)
        })?;
        tracing::info!("reading from {:?}", self.path);
        self.file = Some(file);
        self.error = None;
        Ok(())
    }

    fn read_chunk(&mut self) -> Result<Option<Vec<u8>>> {
        if self.cancel.is_cancelled() {
            return Ok(None);
        }
        let file = match self.file.as_mut() {
            Some(f) => f,
            None => return Err(SensorVisError::Reader("file reader not opened".to_string())),
        };

        let mut buf = vec![0u8; self.chunk_size];
        let n = file.read(&mut buf).map_err(|e| {
            let msg = format!("read failed on {:?}: {e}", self.path);
            self.error = Some(msg.clone());
            SensorVisError::Reader(msg)
        })?;

        if n == 0 {
            return Ok(None);
        }
        buf.truncate(n);
        Ok(Some(buf))
    }

    fn close(&mut self) {
        self.file = None;
    }

    fn status(&self) -> ReaderStatus {
        match (&self.error, &self.file) {
            (Some(e), _) => ReaderStatus::Error(e.clone()),
            (None, Some(_)) => ReaderStatus::Connected,
            (None, None) => ReaderStatus::Disconnected,
        }
    }

    fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }
}
