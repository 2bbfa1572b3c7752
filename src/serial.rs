//! Serial connection utility.
//!
//! Thin wrapper around the `serialport` crate: port discovery, opening
//! with retries, reconnection, and non-blocking status. The serial reader
//! plugin depends only on this module, so everything touching real
//! hardware stays in one place.

use crate::error::{Result, SensorVisError};
use serialport::{SerialPort, SerialPortType};
use std::time::{Duration, Instant};

/// Pause after a successful open so the device can settle.
const SETTLE_DELAY: Duration = Duration::from_millis(100);

/// Pause between failed open attempts.
const RETRY_DELAY: Duration = Duration::from_millis(500);

/// Connection parameters for one serial link.
#[derive(Debug, Clone, PartialEq)]
pub struct SerialSettings {
    /// Port name, e.g. "/dev/ttyUSB0" or "COM3".
    pub port: String,
    /// Communication speed in baud.
    pub baudrate: u32,
    /// Read timeout for blocking reads.
    pub timeout: Duration,
    /// Number of open attempts before giving up.
    pub retry_count: u32,
}

impl Default for SerialSettings {
    fn default() -> Self {
        Self {
            port: String::new(),
            baudrate: 115_200,
            timeout: Duration::from_secs(1),
            retry_count: 3,
        }
    }
}

/// Description of one detected serial port.
#[derive(Debug, Clone)]
pub struct PortInfo {
    pub device: String,
    pub description: Option<String>,
    pub vid: Option<u16>,
    pub pid: Option<u16>,
    pub serial_number: Option<String>,
}

/// List all serial ports present on the system.
pub fn list_ports() -> Result<Vec<PortInfo>> {
    let ports = serialport::available_ports()?;
    Ok(ports
        .into_iter()
        .map(|p| match p.port_type {
            SerialPortType::UsbPort(usb) => PortInfo {
                device: p.port_name,
                description: usb.product,
                vid: Some(usb.vid),
                pid: Some(usb.pid),
                serial_number: usb.serial_number,
            },
            _ => PortInfo {
                device: p.port_name,
                description: None,
                vid: None,
                pid: None,
                serial_number: None,
            },
        })
        .collect())
}

/// Filter detected ports by USB vendor/product id.
pub fn find_ports(ports: &[PortInfo], vid: Option<u16>, pid: Option<u16>) -> Vec<PortInfo> {
    ports
        .iter()
        .filter(|p| (vid.is_none() || p.vid == vid) && (pid.is_none() || p.pid == pid))
        .cloned()
        .collect()
}

/// Open a serial connection, retrying on failure.
///
/// Fails with the last underlying error after `retry_count` attempts.
pub fn open(settings: &SerialSettings) -> Result<Box<dyn SerialPort>> {
    let attempts = settings.retry_count.max(1);
    let mut last_error = None;

    for attempt in 1..=attempts {
        match serialport::new(&settings.port, settings.baudrate)
            .timeout(settings.timeout)
            .open()
        {
            Ok(port) => {
                std::thread::sleep(SETTLE_DELAY);
                tracing::info!(
                    "opened serial port {} at {} baud (attempt {attempt})",
                    settings.port,
                    settings.baudrate
                );
                return Ok(port);
            }
            Err(e) => {
                tracing::warn!(
                    "failed to open serial port {} (attempt {attempt}/{attempts}): {e}",
                    settings.port
                );
                last_error = Some(e);
                if attempt < attempts {
                    std::thread::sleep(RETRY_DELAY);
                }
            }
        }
    }

    Err(match last_error {
        Some(e) => SensorVisError::Serial(e).with_context(format!(
            "failed to open serial port {} after {attempts} attempts",
            settings.port
        )),
        None => SensorVisError::Reader(format!("failed to open serial port {}", settings.port)),
    })
}

/// Check whether a port can currently be opened.
pub fn is_port_available(port: &str) -> bool {
    match serialport::new(port, 9600)
        .timeout(Duration::from_millis(100))
        .open()
    {
        Ok(handle) => {
            drop(handle);
            true
        }
        Err(_) => false,
    }
}

/// Wait for a port to become available, polling at `interval`.
///
/// Returns true if the port appeared within `timeout`.
pub fn wait_for_port(port: &str, timeout: Duration, interval: Duration) -> bool {
    let start = Instant::now();
    while start.elapsed() < timeout {
        if is_port_available(port) {
            return true;
        }
        std::thread::sleep(interval);
    }
    false
}

/// Re-establish a lost connection using the original settings.
///
/// The previous handle must already be dropped; serial ports are exclusive
/// on most platforms.
pub fn reconnect(settings: &SerialSettings, max_attempts: u32) -> Result<Box<dyn SerialPort>> {
    let mut retry_settings = settings.clone();
    retry_settings.retry_count = max_attempts;
    open(&retry_settings)
}

/// Non-blocking status snapshot of an open connection.
#[derive(Debug, Clone)]
pub struct ConnectionStatus {
    pub connected: bool,
    pub port: String,
    pub baudrate: u32,
    pub in_waiting: u32,
}

/// Query the current status of a connection.
pub fn status(port: &dyn SerialPort) -> ConnectionStatus {
    let name = port.name().unwrap_or_default();
    match port.bytes_to_read() {
        Ok(n) => ConnectionStatus {
            connected: true,
            port: name,
            baudrate: port.baud_rate().unwrap_or(0),
            in_waiting: n,
        },
        Err(_) => ConnectionStatus {
            connected: false,
            port: name,
            baudrate: 0,
            in_waiting: 0,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = SerialSettings::default();
        assert_eq!(settings.baudrate, 115_200);
        assert_eq!(settings.retry_count, 3);
    }

    #[test]
    fn test_find_ports_filters_by_id() {
        let ports = vec![
            PortInfo {
                device: "/dev/ttyUSB0".into(),
                description: None,
                vid: Some(0x1234),
                pid: Some(0x5678),
                serial_number: None,
            },
            PortInfo {
                device: "/dev/ttyUSB1".into(),
                description: None,
                vid: Some(0x9999),
                pid: Some(0x0001),
                serial_number: None,
            },
        ];

        let matched = find_ports(&ports, Some(0x1234), None);
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].device, "/dev/ttyUSB0");

        let all = find_ports(&ports, None, None);
        assert_eq!(all.len(), 2);
    }

    #[test]
    fn test_open_nonexistent_port_fails_after_retries() {
        let settings = SerialSettings {
            port: "/dev/sensorvis-does-not-exist".to_string(),
            retry_count: 1,
            timeout: Duration::from_millis(50),
            ..Default::default()
        };
        assert!(open(&settings).is_err());
    }

    #[test]
    fn test_wait_for_missing_port_times_out() {
        let appeared = wait_for_port(
            "/dev/sensorvis-does-not-exist",
            Duration::from_millis(60),
            Duration::from_millis(20),
        );
        assert!(!appeared);
    }
}
