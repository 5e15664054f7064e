use crate::serial::PortOpener;

use super::{Balance, DeviceError, DeviceFamily, DiscoveredDevice, Result, Shaker};

/// Substring a shaker's model description must contain.
pub const SHAKER_IDENTITY_MARKER: &str = "BIOSHAKE";

/// Finds which candidate ports host a device of a given family.
///
/// Ports are probed one at a time: each trial connection is opened, asked to
/// identify itself and closed again before the next port is tried. A port
/// that fails to open or answer is a non-match, never a fatal error.
pub struct Discovery<'a, P: PortOpener> {
    opener: &'a P,
    trace: bool,
}

impl<'a, P: PortOpener> Discovery<'a, P> {
    pub fn new(opener: &'a P) -> Self {
        Self {
            opener,
            trace: false,
        }
    }

    /// Log probe traffic at info level.
    pub fn with_tracing(mut self, enabled: bool) -> Self {
        self.trace = enabled;
        self
    }

    /// Probe every candidate port and report the ones that match `family`.
    pub fn scan(&self, family: DeviceFamily) -> Result<Vec<DiscoveredDevice>> {
        Ok(self.probe_candidates(family)?.1)
    }

    /// Names of the ports hosting a `family` device.
    pub fn find_ports(&self, family: DeviceFamily) -> Result<Vec<String>> {
        Ok(self
            .scan(family)?
            .into_iter()
            .map(|device| device.port_name)
            .collect())
    }

    /// The one port hosting a `family` device.
    ///
    /// Fails with `NoDeviceFound` listing every port tried, or with
    /// `AmbiguousDevice` listing every matching port.
    pub fn find_port(&self, family: DeviceFamily) -> Result<String> {
        let (tried, found) = self.probe_candidates(family)?;
        let mut matching: Vec<String> = found.into_iter().map(|d| d.port_name).collect();

        match matching.len() {
            1 => Ok(matching.remove(0)),
            0 => Err(DeviceError::NoDeviceFound { family, tried }),
            _ => Err(DeviceError::AmbiguousDevice { family, matching }),
        }
    }

    /// Open the one port hosting a `family` device.
    pub fn connect(&self, family: DeviceFamily) -> Result<P::Transport> {
        let port = self.find_port(family)?;
        log::info!("Using {} on {}", family, port);
        Ok(self.opener.open(&port)?)
    }

    /// Open every port hosting a `family` device.
    pub fn connect_all(&self, family: DeviceFamily) -> Result<Vec<P::Transport>> {
        self.find_ports(family)?
            .iter()
            .map(|port| self.opener.open(port).map_err(DeviceError::from))
            .collect()
    }

    fn probe_candidates(
        &self,
        family: DeviceFamily,
    ) -> Result<(Vec<String>, Vec<DiscoveredDevice>)> {
        let tried = self.opener.candidate_ports()?;
        let mut found = Vec::new();

        for port in &tried {
            if let Some(identity) = self.probe(port, family) {
                log::info!("Found {} on {} ({})", family, port, identity);
                found.push(DiscoveredDevice::new(port.clone(), family, identity));
            }
        }

        log::debug!(
            "Probed {} port(s) for {}, {} matched",
            tried.len(),
            family,
            found.len()
        );
        Ok((tried, found))
    }

    /// Identity string of the `family` device on `port`, if there is one.
    fn probe(&self, port: &str, family: DeviceFamily) -> Option<String> {
        let transport = match self.opener.open(port) {
            Ok(transport) => transport,
            Err(e) => {
                log::debug!("Skipping {}: {}", port, e);
                return None;
            }
        };

        let outcome = match family {
            DeviceFamily::Balance => {
                let mut balance = Balance::new(transport).with_tracing(self.trace);
                let identity = balance.get_serial_number().map(|serial| Some(serial.to_string()));
                release(port, balance.close());
                identity
            }
            DeviceFamily::Shaker => {
                let mut shaker = Shaker::new(transport).with_tracing(self.trace);
                let identity = shaker
                    .get_description()
                    .map(|description| description.contains(SHAKER_IDENTITY_MARKER).then_some(description));
                release(port, shaker.close());
                identity
            }
        };

        match outcome {
            Ok(Some(identity)) => Some(identity),
            Ok(None) => {
                log::debug!("Device on {} is not a {}", port, family);
                None
            }
            Err(e) => {
                log::debug!("Probe of {} failed: {}", port, e);
                None
            }
        }
    }
}

fn release(port: &str, result: Result<()>) {
    if let Err(e) = result {
        log::warn!("Failed to close trial connection on {}: {}", port, e);
    }
}
