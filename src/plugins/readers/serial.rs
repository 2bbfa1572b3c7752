//! Serial reader: live byte stream from a sensor on a serial link.

use crate::config::PluginConfig;
use crate::error::{Result, SensorVisError};
use crate::plugin::{CancelToken, Reader, ReaderStatus};
use crate::serial::{self, SerialSettings};
use serialport::SerialPort;
use std::io::Read as _;
use std::time::Duration;

const DEFAULT_CHUNK_SIZE: usize = 1024;
const DEFAULT_TIMEOUT_MS: u64 = 1000;

/// Reads raw bytes from a serial port.
///
/// The sequence is unbounded; a bounded read timeout keeps the reader
/// responsive to cancellation. With `reconnect` enabled a dropped link is
/// re-established in place instead of failing the pipeline.
pub struct SerialReader {
    settings: SerialSettings,
    chunk_size: usize,
    reconnect: bool,
    max_reconnect_attempts: u32,
    port: Option<Box<dyn SerialPort>>,
    cancel: CancelToken,
    error: Option<String>,
}

impl SerialReader {
    /// Config keys: `port` (required), `baudrate` (default 115200),
    /// `timeout_ms` (default 1000), `retry_count` (default 3),
    /// `chunk_size` (default 1024), `reconnect` (default false),
    /// `max_reconnect_attempts` (default 3).
    pub fn from_config(config: &PluginConfig) -> Result<Self> {
        let settings = SerialSettings {
            port: config.require_str("port")?.to_string(),
            baudrate: config.get_u64("baudrate").unwrap_or(115_200) as u32,
            timeout: Duration::from_millis(config.get_u64("timeout_ms").unwrap_or(DEFAULT_TIMEOUT_MS)),
            retry_count: config.get_u64("retry_count").unwrap_or(3) as u32,
        };
        Ok(Self {
            settings,
            chunk_size: config.get_usize("chunk_size").unwrap_or(DEFAULT_CHUNK_SIZE),
            reconnect: config.get_bool("reconnect").unwrap_or(false),
            max_reconnect_attempts: config.get_u64("max_reconnect_attempts").unwrap_or(3) as u32,
            port: None,
            cancel: CancelToken::new(),
            error: None,
        })
    }

    fn try_reconnect(&mut self) -> bool {
        self.port = None;
        match serial::reconnect(&self.settings, self.max_reconnect_attempts) {
            Ok(port) => {
                tracing::info!("reconnected to {}", self.settings.port);
                self.port = Some(port);
                self.error = None;
                true
            }
            Err(e) => {
                tracing::error!("reconnect to {} failed: {e}", self.settings.port);
                self.error = Some(e.to_string());
                false
            }
        }
    }
}

impl Reader for SerialReader {
    fn open(&mut self) -> Result<()> {
        let port = serial::open(&self.settings).map_err(|e| {
            self.error = Some(e.to_string());
            e
        })?;
        self.port = Some(port);
        self.error = None;
        Ok(())
    }

    fn read_chunk(&mut self) -> Result<Option<Vec<u8>>> {
        if self.cancel.is_cancelled() {
            return Ok(None);
        }
        let port = match self.port.as_mut() {
            Some(p) => p,
            None => {
                return Err(SensorVisError::Reader(
                    "serial reader not opened".to_string(),
                ))
            }
        };

        let mut buf = vec![0u8; self.chunk_size];
        match port.read(&mut buf) {
            Ok(n) => {
                buf.truncate(n);
                Ok(Some(buf))
            }
            // A timed-out read is not an error for a live source; hand back
            // an empty chunk so the pipeline can re-check its stop flag.
            Err(e) if e.kind() == std::io::ErrorKind::TimedOut => Ok(Some(Vec::new())),
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => Ok(Some(Vec::new())),
            Err(e) => {
                let msg = format!("serial read on {} failed: {e}", self.settings.port);
                tracing::warn!("{msg}");
                self.error = Some(msg.clone());
                if self.reconnect && !self.cancel.is_cancelled() && self.try_reconnect() {
                    Ok(Some(Vec::new()))
                } else {
                    Err(SensorVisError::Reader(msg))
                }
            }
        }
    }

    fn close(&mut self) {
        if self.port.take().is_some() {
            tracing::info!("closed serial port {}", self.settings.port);
        }
    }

    fn status(&self) -> ReaderStatus {
        match (&self.error, &self.port) {
            (Some(e), _) => ReaderStatus::Error(e.clone()),
            (None, Some(_)) => ReaderStatus::Connected,
            (None, None) => ReaderStatus::Disconnected,
        }
    }

    fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = PluginConfig::new().with("port", "/dev/ttyUSB0");
        let reader = SerialReader::from_config(&config).unwrap();
        assert_eq!(reader.settings.baudrate, 115_200);
        assert_eq!(reader.settings.timeout, Duration::from_secs(1));
        assert_eq!(reader.chunk_size, DEFAULT_CHUNK_SIZE);
        assert!(!reader.reconnect);
    }

    #[test]
    fn test_missing_port_key_rejected() {
        assert!(SerialReader::from_config(&PluginConfig::new()).is_err());
    }

    #[test]
    fn test_read_before_open_errors() {
        let config = PluginConfig::new().with("port", "/dev/ttyUSB0");
        let mut reader = SerialReader::from_config(&config).unwrap();
        assert!(reader.read_chunk().is_err());
    }

    #[test]
    fn test_status_starts_disconnected() {
        let config = PluginConfig::new().with("port", "/dev/ttyUSB0");
        let reader = SerialReader::from_config(&config).unwrap();
        assert_eq!(reader.status(), ReaderStatus::Disconnected);
    }

    #[test]
    fn test_cancelled_reader_ends_stream() {
        let config = PluginConfig::new().with("port", "/dev/ttyUSB0");
        let mut reader = SerialReader::from_config(&config).unwrap();
        reader.cancel_token().cancel();
        assert!(reader.read_chunk().unwrap().is_none());
    }
}
