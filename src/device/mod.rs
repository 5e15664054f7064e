pub mod balance;
pub mod discovery;
pub mod models;
pub mod session;
pub mod shaker;

pub use balance::Balance;
pub use discovery::Discovery;
pub use models::*;
pub use session::DeviceSession;
pub use shaker::Shaker;

use crate::serial::{ErrorKind, SerialError};

#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    #[error("Device busy, command not executable now: {request}")]
    Busy { request: String },

    #[error("Balance in overload range: {request}")]
    Overload { request: String },

    #[error("Balance in underload range: {request}")]
    Underload { request: String },

    #[error("Syntax error, command not recognised: {request}")]
    Syntax { request: String },

    #[error("Transmission error: {request}")]
    Transmission { request: String },

    #[error("Logical error, command not allowed: {request}")]
    Logical { request: String },

    #[error("Device rejected command: {request}")]
    Generic { request: String },

    #[error("{operation}: command understood but currently not executable ({request})")]
    CommandNotExecutable { operation: &'static str, request: String },

    #[error("Malformed numeric field {field:?} in reply to {request}")]
    MalformedNumericField { request: String, field: String },

    #[error("Malformed reply {reply:?} to {request}")]
    MalformedReply { request: String, reply: String },

    #[error("{parameter} out of range: {value} (allowed {min} to {max})")]
    ArgumentOutOfRange {
        parameter: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("Could not find any {family} devices. Check connections and permissions. Tried ports: {tried:?}")]
    NoDeviceFound { family: DeviceFamily, tried: Vec<String> },

    #[error("Found more than one {family} device. Specify the port. Matching ports: {matching:?}")]
    AmbiguousDevice { family: DeviceFamily, matching: Vec<String> },

    #[error("Serial communication error: {0}")]
    Serial(#[from] SerialError),
}

impl DeviceError {
    /// Attach the offending request to a device-reported failure.
    pub fn from_signal(kind: ErrorKind, request: String) -> Self {
        match kind {
            ErrorKind::Busy => DeviceError::Busy { request },
            ErrorKind::Overload => DeviceError::Overload { request },
            ErrorKind::Underload => DeviceError::Underload { request },
            ErrorKind::Syntax => DeviceError::Syntax { request },
            ErrorKind::Transmission => DeviceError::Transmission { request },
            ErrorKind::Logical => DeviceError::Logical { request },
            ErrorKind::Generic => DeviceError::Generic { request },
        }
    }

    /// Busy, overload or underload: the balance cannot give a reading yet.
    pub fn is_weighing_condition(&self) -> bool {
        matches!(
            self,
            DeviceError::Busy { .. } | DeviceError::Overload { .. } | DeviceError::Underload { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, DeviceError>;
