use std::io::{ErrorKind, Read, Write};
use std::time::{Duration, Instant};

use serialport::SerialPort;

use super::{PortOpener, Result, SerialError, Transport};
use crate::config::SerialConfig;

/// Longest reply line accepted before the link is considered desynchronised.
const MAX_LINE_LENGTH: usize = 1024;

/// A serial connection to one MT-SICS device.
pub struct SerialInterface {
    port: Option<Box<dyn SerialPort>>,
    port_name: String,
    read_timeout: Duration,
    write_write_delay: Duration,
    last_write: Option<Instant>,
    pending: Vec<u8>,
}

impl SerialInterface {
    /// Open `port_name` and wait for the device to settle after the reset
    /// that opening the port triggers.
    pub fn connect(port_name: &str, config: &SerialConfig) -> Result<Self> {
        let port = serialport::new(port_name, config.baud_rate)
            .timeout(config.read_timeout())
            .open()
            .map_err(|e| match e.kind() {
                serialport::ErrorKind::NoDevice => SerialError::PortNotFound(port_name.to_string()),
                _ => SerialError::ConnectionFailed(format!("{}: {}", port_name, e)),
            })?;

        let started = Instant::now();
        std::thread::sleep(config.settle_delay());
        log::info!(
            "Connected to {} at {} baud (settled in {:?})",
            port_name,
            config.baud_rate,
            started.elapsed()
        );

        Ok(Self {
            port: Some(port),
            port_name: port_name.to_string(),
            read_timeout: config.read_timeout(),
            write_write_delay: config.write_write_delay(),
            last_write: None,
            pending: Vec::new(),
        })
    }

    /// Drop input nobody read, such as the reply to `@` or a reply that
    /// arrived after its request timed out.
    fn discard_stale_input(&mut self) -> Result<()> {
        let port = self.port.as_mut().ok_or(SerialError::NotConnected)?;
        port.clear(serialport::ClearBuffer::Input)?;
        if let Some(stale) = take_stale(&mut self.pending) {
            log::debug!("Discarding unread input from {}: {:?}", self.port_name, stale);
        }
        Ok(())
    }

    fn wait_for_write_slot(&self) {
        if let Some(last) = self.last_write {
            let elapsed = last.elapsed();
            if elapsed < self.write_write_delay {
                std::thread::sleep(self.write_write_delay - elapsed);
            }
        }
    }
}

/// Pop one complete line off the front of `pending`, terminator stripped.
fn take_line(pending: &mut Vec<u8>) -> Option<String> {
    let pos = pending.iter().position(|&b| b == b'\n')?;
    let raw: Vec<u8> = pending.drain(..=pos).collect();
    let line = String::from_utf8_lossy(&raw);
    Some(line.trim_end_matches(['\r', '\n']).to_string())
}

/// Empty `pending`, returning what was in it.
fn take_stale(pending: &mut Vec<u8>) -> Option<String> {
    if pending.is_empty() {
        return None;
    }
    let stale = String::from_utf8_lossy(pending).into_owned();
    pending.clear();
    Some(stale)
}

/// Append a chunk read from the port and pop a complete line if there is one.
fn buffer_chunk(pending: &mut Vec<u8>, chunk: &[u8], port_name: &str) -> Result<Option<String>> {
    pending.extend_from_slice(chunk);
    if let Some(line) = take_line(pending) {
        return Ok(Some(line));
    }
    if pending.len() > MAX_LINE_LENGTH {
        pending.clear();
        return Err(SerialError::ProtocolError(format!(
            "reply from {} exceeded {} bytes without a line terminator",
            port_name, MAX_LINE_LENGTH
        )));
    }
    Ok(None)
}

/// `None` when the timeout is too large to represent; reads then wait indefinitely.
fn read_deadline(timeout: Duration) -> Option<Instant> {
    Instant::now().checked_add(timeout)
}

impl Transport for SerialInterface {
    fn write(&mut self, bytes: &[u8]) -> Result<usize> {
        self.wait_for_write_slot();
        self.discard_stale_input()?;

        let port = self.port.as_mut().ok_or(SerialError::NotConnected)?;
        let bytes_written = port.write(bytes)?;
        port.flush()?;
        self.last_write = Some(Instant::now());

        Ok(bytes_written)
    }

    fn read_line(&mut self) -> Result<String> {
        if let Some(line) = take_line(&mut self.pending) {
            return Ok(line);
        }

        let deadline = read_deadline(self.read_timeout);
        let port = self.port.as_mut().ok_or(SerialError::NotConnected)?;
        let mut buffer = [0u8; 256];

        loop {
            match port.read(&mut buffer) {
                Ok(0) => {}
                Ok(n) => {
                    if let Some(line) = buffer_chunk(&mut self.pending, &buffer[..n], &self.port_name)? {
                        return Ok(line);
                    }
                }
                Err(ref e) if e.kind() == ErrorKind::TimedOut => {}
                Err(e) => return Err(SerialError::IoError(e)),
            }

            if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
                if let Some(partial) = take_stale(&mut self.pending) {
                    log::debug!("Discarding partial reply from {}: {:?}", self.port_name, partial);
                }
                return Err(SerialError::Timeout);
            }
        }
    }

    fn port_name(&self) -> &str {
        &self.port_name
    }

    fn close(&mut self) -> Result<()> {
        if self.port.take().is_some() {
            log::info!("Disconnecting from {}", self.port_name);
        }
        self.pending.clear();
        Ok(())
    }
}

/// Opens real serial ports with a shared [`SerialConfig`].
#[derive(Debug, Clone, Default)]
pub struct SerialConnector {
    config: SerialConfig,
}

impl SerialConnector {
    pub fn new(config: SerialConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SerialConfig {
        &self.config
    }
}

impl PortOpener for SerialConnector {
    type Transport = SerialInterface;

    fn candidate_ports(&self) -> Result<Vec<String>> {
        list_candidate_ports(&self.config)
    }

    fn open(&self, port: &str) -> Result<SerialInterface> {
        SerialInterface::connect(port, &self.config)
    }
}

/// List the ports discovery should probe.
///
/// An explicit `try_ports` list is used verbatim. Otherwise every port the
/// OS reports is a candidate, except on macOS where only USB modem/serial
/// device nodes are kept.
pub fn list_candidate_ports(config: &SerialConfig) -> Result<Vec<String>> {
    if let Some(ports) = &config.try_ports {
        return Ok(ports.clone());
    }

    let ports = serialport::available_ports()?
        .into_iter()
        .map(|p| p.port_name)
        .filter(|name| is_probe_candidate(name))
        .collect();

    Ok(ports)
}

#[cfg(target_os = "macos")]
fn is_probe_candidate(port_name: &str) -> bool {
    port_name.contains("tty.usbmodem") || port_name.contains("tty.usbserial")
}

#[cfg(not(target_os = "macos"))]
fn is_probe_candidate(_port_name: &str) -> bool {
    true
}
