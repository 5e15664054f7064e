use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Code reported when the device returns an empty state payload.
pub const UNKNOWN_STATE_CODE: i32 = -1;

const UNLISTED_STATE: &str = "Unknown";

/// Whether the balance was settled when the reading was taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Stability {
    Stable,
    Dynamic,
}

impl Stability {
    /// Parse the single-character `S`/`D` marker.
    pub fn from_marker(marker: &str) -> Option<Self> {
        match marker {
            "S" => Some(Stability::Stable),
            "D" => Some(Stability::Dynamic),
            _ => None,
        }
    }

    pub fn marker(&self) -> &'static str {
        match self {
            Stability::Stable => "S",
            Stability::Dynamic => "D",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightReading {
    pub value: f64,
    pub unit: String,
    pub stability: Stability,
}

impl fmt::Display for WeightReading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.value, self.unit)?;
        if self.stability == Stability::Dynamic {
            write!(f, " (dynamic)")?;
        }
        Ok(())
    }
}

/// Shaker motion state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShakeState {
    pub code: i32,
    pub description: String,
}

impl ShakeState {
    pub fn from_code(code: i32) -> Self {
        Self {
            code,
            description: shake_state_description(code)
                .unwrap_or(UNLISTED_STATE)
                .to_string(),
        }
    }
}

/// Edge Locking Mechanism state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElmState {
    pub code: i32,
    pub description: String,
}

impl ElmState {
    pub fn from_code(code: i32) -> Self {
        Self {
            code,
            description: elm_state_description(code)
                .unwrap_or(UNLISTED_STATE)
                .to_string(),
        }
    }
}

pub fn shake_state_description(code: i32) -> Option<&'static str> {
    let description = match code {
        0 => "Shaking is active",
        1 => "Shaker has a stop command detect",
        2 => "Shaker in the braking mode",
        3 => "Arrived in the home position",
        4 => "Manual mode",
        5 => "Acceleration",
        6 => "Deceleration",
        7 => "Deceleration with stopping",
        90 => "ECO mode",
        99 => "Boot process running",
        UNKNOWN_STATE_CODE => "",
        _ => return None,
    };
    Some(description)
}

pub fn elm_state_description(code: i32) -> Option<&'static str> {
    let description = match code {
        1 => "Microplate is locked",
        3 => "Microplate is unlocked",
        9 => "Error",
        UNKNOWN_STATE_CODE => "",
        _ => return None,
    };
    Some(description)
}

/// Device families that share the MT-SICS transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceFamily {
    Balance,
    Shaker,
}

impl fmt::Display for DeviceFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceFamily::Balance => write!(f, "Mettler Toledo balance"),
            DeviceFamily::Shaker => write!(f, "BioShake"),
        }
    }
}

impl FromStr for DeviceFamily {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "balance" | "scale" => Ok(DeviceFamily::Balance),
            "shaker" | "bioshake" => Ok(DeviceFamily::Shaker),
            other => Err(format!("unknown device family '{}' (expected balance or shaker)", other)),
        }
    }
}

/// A port whose device answered the family's identification probe.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveredDevice {
    pub port_name: String,
    pub family: DeviceFamily,
    /// Serial number for balances, model description for shakers
    pub identity: String,
    pub last_seen: DateTime<Utc>,
}

impl DiscoveredDevice {
    pub fn new(port_name: String, family: DeviceFamily, identity: String) -> Self {
        Self {
            port_name,
            family,
            identity,
            last_seen: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stability_markers() {
        assert_eq!(Stability::from_marker("S"), Some(Stability::Stable));
        assert_eq!(Stability::from_marker("D"), Some(Stability::Dynamic));
        assert_eq!(Stability::from_marker("A"), None);
        assert_eq!(Stability::Dynamic.marker(), "D");
    }

    #[test]
    fn test_state_tables() {
        assert_eq!(ShakeState::from_code(90).description, "ECO mode");
        assert_eq!(ShakeState::from_code(-1).description, "");
        assert_eq!(ShakeState::from_code(42).description, "Unknown");
        assert_eq!(ElmState::from_code(1).description, "Microplate is locked");
        assert_eq!(ElmState::from_code(3).description, "Microplate is unlocked");
        assert_eq!(elm_state_description(2), None);
    }

    #[test]
    fn test_family_parsing() {
        assert_eq!("Balance".parse::<DeviceFamily>(), Ok(DeviceFamily::Balance));
        assert_eq!("bioshake".parse::<DeviceFamily>(), Ok(DeviceFamily::Shaker));
        assert!("pump".parse::<DeviceFamily>().is_err());
    }

    #[test]
    fn test_weight_display() {
        let reading = WeightReading {
            value: 12.5,
            unit: "g".to_string(),
            stability: Stability::Dynamic,
        };
        assert_eq!(reading.to_string(), "12.5 g (dynamic)");
    }
}
