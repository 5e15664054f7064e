use std::str::FromStr;

use crate::serial::{Command, Dialect, ParsedReply, Transport};

use super::{DeviceError, Result};

/// A successful reply together with the request that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    request: String,
    parsed: ParsedReply,
}

impl Reply {
    pub fn request(&self) -> &str {
        &self.request
    }

    /// Tokens of a balance reply; empty for line replies.
    pub fn tokens(&self) -> &[String] {
        match &self.parsed {
            ParsedReply::Acknowledged(tokens) => tokens,
            _ => &[],
        }
    }

    /// The token at `index`, or `MalformedReply` if the reply is too short.
    pub fn token(&self, index: usize) -> Result<&str> {
        self.tokens()
            .get(index)
            .map(String::as_str)
            .ok_or_else(|| DeviceError::MalformedReply {
                request: self.request.clone(),
                reply: self.tokens().join(" "),
            })
    }

    /// Tokens from `index` onwards.
    pub fn payload(&self, index: usize) -> Vec<String> {
        self.tokens().get(index..).map(<[String]>::to_vec).unwrap_or_default()
    }

    /// Whole text of a line reply.
    pub fn text(&self) -> &str {
        match &self.parsed {
            ParsedReply::Simple(text) => text,
            _ => "",
        }
    }

    /// Parse a numeric field, failing with `MalformedNumericField`.
    pub fn parse_field<N: FromStr>(&self, field: &str) -> Result<N> {
        field.trim().parse::<N>().map_err(|_| self.malformed(field))
    }

    /// Integer from a possibly fractional field, truncating toward zero (`"1000.0"` is 1000).
    pub fn parse_truncated<N: TryFrom<i64>>(&self, field: &str) -> Result<N> {
        let value: f64 = self.parse_field(field)?;
        if !value.is_finite() {
            return Err(self.malformed(field));
        }
        N::try_from(value.trunc() as i64).map_err(|_| self.malformed(field))
    }

    fn malformed(&self, field: &str) -> DeviceError {
        DeviceError::MalformedNumericField {
            request: self.request.clone(),
            field: field.to_string(),
        }
    }
}

/// One open connection to a device, speaking one dialect.
///
/// The session owns its transport. Call [`close`](Self::close) to release it;
/// there is no implicit reconnection.
pub struct DeviceSession<T: Transport> {
    transport: T,
    dialect: Dialect,
    trace: bool,
}

impl<T: Transport> DeviceSession<T> {
    pub fn new(transport: T, dialect: Dialect) -> Self {
        Self {
            transport,
            dialect,
            trace: false,
        }
    }

    /// Log every request and reply at info level instead of debug.
    pub fn with_tracing(mut self, enabled: bool) -> Self {
        self.trace = enabled;
        self
    }

    pub fn port(&self) -> &str {
        self.transport.port_name()
    }

    /// Write a command that the device does not answer.
    pub fn send(&mut self, command: &Command) -> Result<usize> {
        let request = self.dialect.request_text(command);
        self.log_traffic("request", &request);
        Ok(self.transport.write(&self.dialect.encode(command))?)
    }

    /// Full round trip; device-reported errors come back as `DeviceError`.
    pub fn request(&mut self, command: &Command) -> Result<Reply> {
        let request = self.dialect.request_text(command);
        self.log_traffic("request", &request);
        self.transport.write(&self.dialect.encode(command))?;

        let line = self.transport.read_line()?;
        self.log_traffic("response", &line);

        match self.dialect.decode(&line) {
            ParsedReply::ErrorSignal(kind) => Err(DeviceError::from_signal(kind, request)),
            parsed => Ok(Reply { request, parsed }),
        }
    }

    /// Release the transport.
    pub fn close(mut self) -> Result<()> {
        self.transport.close()?;
        Ok(())
    }

    fn log_traffic(&self, direction: &str, text: &str) {
        if self.trace {
            log::info!("[{}] {} {:?}", self.transport.port_name(), direction, text);
        } else {
            log::debug!("[{}] {} {:?}", self.transport.port_name(), direction, text);
        }
    }
}
