//! Host-side driver for Mettler Toledo balances and BioShake shakers speaking
//! MT-SICS over a serial link.
//!
//! ```no_run
//! use mettler_toledo_device::{Balance, SerialConfig, SerialInterface};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let port = SerialInterface::connect("/dev/ttyUSB0", &SerialConfig::default())?;
//! let mut balance = Balance::new(port);
//! if let Some(reading) = balance.get_weight_stable()? {
//!     println!("{}", reading);
//! }
//! balance.close()?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod device;
pub mod serial;

pub use config::SerialConfig;
pub use device::{
    Balance, DeviceError, DeviceFamily, DeviceSession, Discovery, DiscoveredDevice, ElmState,
    ShakeState, Shaker, Stability, WeightReading,
};
pub use serial::{PortOpener, SerialConnector, SerialError, SerialInterface, Transport};
