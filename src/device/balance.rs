use crate::serial::{Command, Dialect, PortOpener, Transport};

use super::session::{DeviceSession, Reply};
use super::{DeviceError, DeviceFamily, Discovery, Result, Stability, WeightReading};

/// A Mettler Toledo balance or scale speaking MT-SICS level 0/1.
pub struct Balance<T: Transport> {
    session: DeviceSession<T>,
}

impl<T: Transport> Balance<T> {
    pub fn new(transport: T) -> Self {
        Self {
            session: DeviceSession::new(transport, Dialect::BALANCE),
        }
    }

    /// Find the single balance reachable through `opener` and connect to it.
    pub fn discover<P>(opener: &P) -> Result<Self>
    where
        P: PortOpener<Transport = T>,
    {
        let transport = Discovery::new(opener).connect(DeviceFamily::Balance)?;
        Ok(Self::new(transport))
    }

    pub fn with_tracing(mut self, enabled: bool) -> Self {
        self.session = self.session.with_tracing(enabled);
        self
    }

    pub fn port(&self) -> &str {
        self.session.port()
    }

    pub fn close(self) -> Result<()> {
        self.session.close()
    }

    /// List of all implemented MT-SICS commands (`I0`).
    pub fn get_commands(&mut self) -> Result<Vec<String>> {
        Ok(self.identify("I0", "get_commands")?.payload(2))
    }

    /// MT-SICS level and level versions (`I1`).
    pub fn get_mtsics_level(&mut self) -> Result<Vec<String>> {
        Ok(self.identify("I1", "get_mtsics_level")?.payload(2))
    }

    /// Balance type and capacity (`I2`).
    pub fn get_balance_data(&mut self) -> Result<Vec<String>> {
        Ok(self.identify("I2", "get_balance_data")?.payload(2))
    }

    /// Balance software version and type definition number (`I3`).
    pub fn get_software_version(&mut self) -> Result<Vec<String>> {
        Ok(self.identify("I3", "get_software_version")?.payload(2))
    }

    /// Serial number (`I4`).
    pub fn get_serial_number(&mut self) -> Result<u64> {
        let reply = self.identify("I4", "get_serial_number")?;
        reply.parse_field(reply.token(2)?)
    }

    /// Software identification number (`I5`).
    pub fn get_software_id(&mut self) -> Result<Vec<String>> {
        Ok(self.identify("I5", "get_software_id")?.payload(2))
    }

    /// Stable weight value (`S`).
    ///
    /// Returns `None` while the balance is busy, overloaded or underloaded,
    /// since no stable weight is a normal outcome when polling.
    pub fn get_weight_stable(&mut self) -> Result<Option<WeightReading>> {
        match self.session.request(&Command::new("S")) {
            Ok(reply) => weight_reading(&reply).map(Some),
            Err(e) if e.is_weighing_condition() => {
                log::debug!("No stable weight on {}: {}", self.port(), e);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Weight value immediately, stable or not (`SI`).
    pub fn get_weight(&mut self) -> Result<WeightReading> {
        let reply = self.session.request(&Command::new("SI"))?;
        weight_reading(&reply)
    }

    /// Zero the balance once it is stable (`Z`).
    ///
    /// Returns `false` if the balance was busy, overloaded or underloaded.
    pub fn zero_stable(&mut self) -> Result<bool> {
        match self.session.request(&Command::new("Z")) {
            Ok(_) => Ok(true),
            Err(e) if e.is_weighing_condition() => {
                log::debug!("Zero not performed on {}: {}", self.port(), e);
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    /// Zero the balance immediately regardless of stability (`ZI`).
    pub fn zero(&mut self) -> Result<Stability> {
        let reply = self.session.request(&Command::new("ZI"))?;
        stability_marker(&reply, 1)
    }

    /// Soft reset (`@`). The reply is not read.
    pub fn reset(&mut self) -> Result<()> {
        self.session.send(&Command::new("@"))?;
        Ok(())
    }

    fn identify(&mut self, opcode: &str, operation: &'static str) -> Result<Reply> {
        match self.session.request(&Command::new(opcode)) {
            Err(DeviceError::Busy { request }) => {
                Err(DeviceError::CommandNotExecutable { operation, request })
            }
            other => other,
        }
    }
}

fn stability_marker(reply: &Reply, index: usize) -> Result<Stability> {
    let marker = reply.token(index)?;
    Stability::from_marker(marker).ok_or_else(|| DeviceError::MalformedReply {
        request: reply.request().to_string(),
        reply: reply.tokens().join(" "),
    })
}

/// `<opcode> <S|D> <value> <unit>`
fn weight_reading(reply: &Reply) -> Result<WeightReading> {
    let stability = stability_marker(reply, 1)?;
    let value = reply.parse_field(reply.token(2)?)?;
    let unit = reply.token(3)?.to_string();

    Ok(WeightReading {
        value,
        unit,
        stability,
    })
}
