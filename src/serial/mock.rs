//! Scripted in-memory transport for driving sessions and discovery without hardware.
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

use super::{PortOpener, Result, SerialError, Transport};

/// What the fake device answers to the next write.
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptedReply {
    Line(String),
    /// The line arrives only after the first read has timed out
    Late(String),
    Timeout,
    IoFailure(String),
}

impl ScriptedReply {
    pub fn line(text: impl Into<String>) -> Self {
        ScriptedReply::Line(text.into())
    }
}

/// Everything that happened on one port, across all connections to it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransportLog {
    pub opens: usize,
    pub closes: usize,
    /// Each write as sent, terminator included
    pub writes: Vec<String>,
}

type SharedLog = Arc<Mutex<TransportLog>>;

fn lock(log: &SharedLog) -> MutexGuard<'_, TransportLog> {
    log.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Each write discards unread input and queues the next scripted reply,
/// mirroring a device that answers every request it receives.
pub struct ScriptedTransport {
    port_name: String,
    replies: VecDeque<ScriptedReply>,
    input: VecDeque<ScriptedReply>,
    log: SharedLog,
    closed: bool,
}

impl ScriptedTransport {
    pub fn new(port_name: &str, replies: impl IntoIterator<Item = ScriptedReply>) -> Self {
        Self::with_log(port_name, replies, SharedLog::default())
    }

    /// Convenience for a device that answers every request with the next line.
    pub fn with_lines(port_name: &str, lines: &[&str]) -> Self {
        Self::new(port_name, lines.iter().map(|l| ScriptedReply::line(*l)))
    }

    fn with_log(
        port_name: &str,
        replies: impl IntoIterator<Item = ScriptedReply>,
        log: SharedLog,
    ) -> Self {
        lock(&log).opens += 1;
        Self {
            port_name: port_name.to_string(),
            replies: replies.into_iter().collect(),
            input: VecDeque::new(),
            log,
            closed: false,
        }
    }

    /// Handle to the log, still readable after the transport is consumed.
    pub fn log(&self) -> Arc<Mutex<TransportLog>> {
        self.log.clone()
    }
}

impl Transport for ScriptedTransport {
    fn write(&mut self, bytes: &[u8]) -> Result<usize> {
        if self.closed {
            return Err(SerialError::NotConnected);
        }
        lock(&self.log)
            .writes
            .push(String::from_utf8_lossy(bytes).into_owned());
        self.input.clear();
        self.input.extend(self.replies.pop_front());
        Ok(bytes.len())
    }

    fn read_line(&mut self) -> Result<String> {
        if self.closed {
            return Err(SerialError::NotConnected);
        }
        if let Some(ScriptedReply::Late(line)) = self.input.front() {
            let line = line.clone();
            self.input[0] = ScriptedReply::Line(line);
            return Err(SerialError::Timeout);
        }
        match self.input.pop_front() {
            Some(ScriptedReply::Line(line)) => Ok(line),
            Some(ScriptedReply::IoFailure(message)) => Err(SerialError::IoError(
                std::io::Error::new(std::io::ErrorKind::BrokenPipe, message),
            )),
            Some(ScriptedReply::Late(_)) | Some(ScriptedReply::Timeout) | None => {
                Err(SerialError::Timeout)
            }
        }
    }

    fn port_name(&self) -> &str {
        &self.port_name
    }

    fn close(&mut self) -> Result<()> {
        if !self.closed {
            self.closed = true;
            lock(&self.log).closes += 1;
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
enum PortScript {
    Replies(Vec<ScriptedReply>),
    OpenFails(String),
}

/// A set of fake ports, each replaying its script on every open.
#[derive(Debug, Default)]
pub struct ScriptedOpener {
    ports: Vec<(String, PortScript)>,
    logs: Mutex<HashMap<String, SharedLog>>,
}

impl ScriptedOpener {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn port(mut self, name: &str, replies: Vec<ScriptedReply>) -> Self {
        self.ports.push((name.to_string(), PortScript::Replies(replies)));
        self
    }

    pub fn port_with_lines(self, name: &str, lines: &[&str]) -> Self {
        let replies = lines.iter().map(|l| ScriptedReply::line(*l)).collect();
        self.port(name, replies)
    }

    /// A port that is listed but cannot be opened.
    pub fn unopenable_port(mut self, name: &str, reason: &str) -> Self {
        self.ports
            .push((name.to_string(), PortScript::OpenFails(reason.to_string())));
        self
    }

    /// Snapshot of what happened on `port` so far.
    pub fn log_for(&self, port: &str) -> TransportLog {
        let logs = self.logs.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        logs.get(port).map(|log| lock(log).clone()).unwrap_or_default()
    }
}

impl PortOpener for ScriptedOpener {
    type Transport = ScriptedTransport;

    fn candidate_ports(&self) -> Result<Vec<String>> {
        Ok(self.ports.iter().map(|(name, _)| name.clone()).collect())
    }

    fn open(&self, port: &str) -> Result<ScriptedTransport> {
        let script = self
            .ports
            .iter()
            .find(|(name, _)| name == port)
            .map(|(_, script)| script.clone())
            .ok_or_else(|| SerialError::PortNotFound(port.to_string()))?;

        match script {
            PortScript::OpenFails(reason) => Err(SerialError::ConnectionFailed(reason)),
            PortScript::Replies(replies) => {
                let log = {
                    let mut logs = self.logs.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
                    logs.entry(port.to_string()).or_default().clone()
                };
                Ok(ScriptedTransport::with_log(port, replies, log))
            }
        }
    }
}
