//! MT-SICS command framing and reply classification.
//!
//! Both device families share the same line-oriented text protocol but differ
//! in framing and error signalling. A [`Dialect`] captures those differences so
//! that a single session implementation can drive either family.

use serde::{Deserialize, Serialize};

pub const BALANCE_TERMINATOR: &str = "\r\n";
pub const SHAKER_TERMINATOR: &str = "\r";

/// Reply sent by shakers for any rejected command.
pub const SHAKER_ERROR_SENTINEL: &str = "e";

/// A device-reported failure classified from a reply line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Command understood but not executable right now
    Busy,
    Overload,
    Underload,
    /// `ES`: command not recognised
    Syntax,
    /// `ET`: parity or framing fault on the link
    Transmission,
    /// `EL`: command recognised but not allowed
    Logical,
    /// Shaker error sentinel
    Generic,
}

/// One decoded reply line.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedReply {
    /// Whitespace-separated tokens with quotes removed. Token 0 echoes the
    /// opcode and token 1 is the status or stability marker.
    Acknowledged(Vec<String>),
    /// Whole trimmed line
    Simple(String),
    ErrorSignal(ErrorKind),
}

/// How reply lines are split and classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyFormat {
    Tokens,
    Line,
}

/// Framing and classification rules for one device family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dialect {
    pub name: &'static str,
    pub terminator: &'static str,
    /// Inserted before each argument
    pub arg_separator: &'static str,
    pub reply_format: ReplyFormat,
}

impl Dialect {
    pub const BALANCE: Dialect = Dialect {
        name: "balance",
        terminator: BALANCE_TERMINATOR,
        arg_separator: " ",
        reply_format: ReplyFormat::Tokens,
    };

    pub const SHAKER: Dialect = Dialect {
        name: "shaker",
        terminator: SHAKER_TERMINATOR,
        arg_separator: "",
        reply_format: ReplyFormat::Line,
    };

    /// Request text without the line terminator, as used in diagnostics.
    pub fn request_text(&self, command: &Command) -> String {
        let mut text = command.opcode.clone();
        for arg in &command.args {
            text.push_str(self.arg_separator);
            text.push_str(arg);
        }
        text
    }

    /// Exact bytes to put on the wire for `command`.
    pub fn encode(&self, command: &Command) -> Vec<u8> {
        let mut request = self.request_text(command);
        request.push_str(self.terminator);
        request.into_bytes()
    }

    pub fn decode(&self, line: &str) -> ParsedReply {
        match self.reply_format {
            ReplyFormat::Tokens => decode_balance_reply(line),
            ReplyFormat::Line => decode_shaker_reply(line),
        }
    }
}

/// An opcode and its already-stringified arguments.
///
/// Arguments must not contain the dialect's terminator; nothing is escaped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    opcode: String,
    args: Vec<String>,
}

impl Command {
    pub fn new(opcode: impl Into<String>) -> Self {
        Self {
            opcode: opcode.into(),
            args: Vec::new(),
        }
    }

    /// Append an argument in its canonical `Display` form.
    pub fn arg(mut self, value: impl ToString) -> Self {
        self.args.push(value.to_string());
        self
    }

    pub fn opcode(&self) -> &str {
        &self.opcode
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }
}

/// Temperature setpoints travel as integer tenths of a degree.
pub fn temperature_tenths(celsius: f64) -> i64 {
    (celsius * 10.0).round() as i64
}

pub fn tenths_to_celsius(tenths: i64) -> f64 {
    tenths as f64 / 10.0
}

/// Classify a balance reply.
///
/// Error markers in the first token (`ES`, `ET`, `EL`) win over the status
/// marker in the second token (`I`, `+`, `-`).
pub fn decode_balance_reply(line: &str) -> ParsedReply {
    let tokens: Vec<String> = line
        .replace('"', "")
        .split_whitespace()
        .map(str::to_string)
        .collect();

    if let Some(head) = tokens.first() {
        if head.contains("ES") {
            return ParsedReply::ErrorSignal(ErrorKind::Syntax);
        }
        if head.contains("ET") {
            return ParsedReply::ErrorSignal(ErrorKind::Transmission);
        }
        if head.contains("EL") {
            return ParsedReply::ErrorSignal(ErrorKind::Logical);
        }
    }

    if let Some(status) = tokens.get(1) {
        if status.contains('I') {
            return ParsedReply::ErrorSignal(ErrorKind::Busy);
        }
        if status.contains('+') {
            return ParsedReply::ErrorSignal(ErrorKind::Overload);
        }
        if status.contains('-') {
            return ParsedReply::ErrorSignal(ErrorKind::Underload);
        }
    }

    ParsedReply::Acknowledged(tokens)
}

/// Classify a shaker reply: the exact line `e` is an error, anything else is data.
pub fn decode_shaker_reply(line: &str) -> ParsedReply {
    let line = line.trim();
    if line == SHAKER_ERROR_SENTINEL {
        ParsedReply::ErrorSignal(ErrorKind::Generic)
    } else {
        ParsedReply::Simple(line.to_string())
    }
}
