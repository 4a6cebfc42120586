//! Mode definitions.
//!
//! Pure domain values - no I/O, no platform dependencies.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::str::FromStr;

/// Wireless operating mode of the device.
///
/// Serialized as its integer code (`0`, `1`, `2`) because the UI switches on
/// those numbers when it receives `jetclock:wifi.mode` events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Mode {
    /// Not yet determined.
    #[default]
    Unknown,

    /// Associated to an external wireless network.
    Station,

    /// Broadcasting the device's own network for configuration.
    AccessPoint,
}

impl Mode {
    /// Integer code used on the UI event channel.
    pub fn code(&self) -> u8 {
        match self {
            Mode::Unknown => 0,
            Mode::Station => 1,
            Mode::AccessPoint => 2,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Mode::Unknown),
            1 => Some(Mode::Station),
            2 => Some(Mode::AccessPoint),
            _ => None,
        }
    }

    /// Returns a human-readable label for the mode.
    pub fn label(&self) -> &'static str {
        match self {
            Mode::Unknown => "unknown",
            Mode::Station => "station",
            Mode::AccessPoint => "access-point",
        }
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl Serialize for Mode {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u8(self.code())
    }
}

impl<'de> Deserialize<'de> for Mode {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let code = u8::deserialize(deserializer)?;
        Mode::from_code(code)
            .ok_or_else(|| D::Error::custom(format!("unknown wifi mode code {code}")))
    }
}

/// What the operator asked the device to do at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestedMode {
    /// Keep an existing association, otherwise try saved networks and fall
    /// back to the access point.
    #[default]
    Auto,

    /// Associate to a saved network; failure is fatal.
    #[serde(rename = "connect", alias = "station")]
    Station,

    /// Broadcast the configuration hotspot.
    #[serde(rename = "hotspot", alias = "ap", alias = "access-point")]
    AccessPoint,

    /// Print saved networks and change nothing.
    List,

    /// Remove a saved network.
    Forget,
}

impl RequestedMode {
    /// Name accepted on the command line and in the config file.
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestedMode::Auto => "auto",
            RequestedMode::Station => "connect",
            RequestedMode::AccessPoint => "hotspot",
            RequestedMode::List => "list",
            RequestedMode::Forget => "forget",
        }
    }

    /// Whether this request changes the wireless interface (and so should be
    /// followed by the mode monitor).
    pub fn drives_network(&self) -> bool {
        matches!(
            self,
            RequestedMode::Auto | RequestedMode::Station | RequestedMode::AccessPoint
        )
    }
}

impl std::fmt::Display for RequestedMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for a mode name that is not one of `auto|connect|hotspot|list|forget`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown mode '{0}' (expected auto, connect, hotspot, list or forget)")]
pub struct UnknownModeError(pub String);

impl FromStr for RequestedMode {
    type Err = UnknownModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(RequestedMode::Auto),
            "connect" | "station" => Ok(RequestedMode::Station),
            "hotspot" | "ap" | "access-point" => Ok(RequestedMode::AccessPoint),
            "list" => Ok(RequestedMode::List),
            "forget" => Ok(RequestedMode::Forget),
            _ => Err(UnknownModeError(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_codes_match_ui() {
        assert_eq!(Mode::Unknown.code(), 0);
        assert_eq!(Mode::Station.code(), 1);
        assert_eq!(Mode::AccessPoint.code(), 2);
        assert_eq!(Mode::from_code(3), None);
    }

    #[test]
    fn test_mode_serializes_as_integer() {
        assert_eq!(serde_json::to_string(&Mode::AccessPoint).unwrap(), "2");
        let mode: Mode = serde_json::from_str("1").unwrap();
        assert_eq!(mode, Mode::Station);
        assert!(serde_json::from_str::<Mode>("7").is_err());
    }

    #[test]
    fn test_requested_mode_parsing() {
        assert_eq!("auto".parse::<RequestedMode>().unwrap(), RequestedMode::Auto);
        assert_eq!("connect".parse::<RequestedMode>().unwrap(), RequestedMode::Station);
        assert_eq!("Hotspot".parse::<RequestedMode>().unwrap(), RequestedMode::AccessPoint);
        assert_eq!("list".parse::<RequestedMode>().unwrap(), RequestedMode::List);
        assert_eq!("forget".parse::<RequestedMode>().unwrap(), RequestedMode::Forget);
        assert!("mesh".parse::<RequestedMode>().is_err());
    }

    #[test]
    fn test_requested_mode_default_is_auto() {
        assert_eq!(RequestedMode::default(), RequestedMode::Auto);
        assert!(RequestedMode::Auto.drives_network());
        assert!(!RequestedMode::List.drives_network());
    }
}
