pub mod interface;
pub mod mock;
pub mod protocol;

pub use interface::{list_candidate_ports, SerialConnector, SerialInterface};
pub use protocol::{Command, Dialect, ErrorKind, ParsedReply};

#[derive(Debug, thiserror::Error)]
pub enum SerialError {
    #[error("Port not found: {0}")]
    PortNotFound(String),

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Not connected")]
    NotConnected,

    #[error("Communication timeout")]
    Timeout,

    #[error("Protocol error: {0}")]
    ProtocolError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialport error: {0}")]
    SerialportError(#[from] serialport::Error),
}

pub type Result<T> = std::result::Result<T, SerialError>;

/// Line-oriented byte transport owned by a single device session.
///
/// Implementations are responsible for pacing: `write` must honour the
/// minimum delay between successive writes to the same port. `write` also
/// discards any input not read yet, so the next `read_line` answers it.
pub trait Transport {
    /// Write raw request bytes, returning the number of bytes written.
    fn write(&mut self, bytes: &[u8]) -> Result<usize>;

    /// Block until one reply line arrives, without its line terminator.
    fn read_line(&mut self) -> Result<String>;

    /// Name of the port this transport is bound to.
    fn port_name(&self) -> &str;

    /// Release the underlying connection.
    fn close(&mut self) -> Result<()>;
}

/// Source of candidate ports and trial connections, used by discovery.
pub trait PortOpener {
    type Transport: Transport;

    /// Ports worth probing, in probe order.
    fn candidate_ports(&self) -> Result<Vec<String>>;

    /// Open a connection to `port`, including any settle delay.
    fn open(&self, port: &str) -> Result<Self::Transport>;
}
