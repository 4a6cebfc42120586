//! Reconciler configuration.

use crate::error::ParameterError;
use crate::mode::RequestedMode;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_HOTSPOT_SSID: &str = "JetClock-Setup";
pub const DEFAULT_HOTSPOT_PORT: u16 = 8080;
pub const DEFAULT_INTERFACE: &str = "wlan0";
pub const DEFAULT_HOTSPOT_CONNECTION: &str = "jetclock-hotspot";

/// Upper bound for a single association or hotspot attempt.
pub const DEFAULT_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(45);

const MAX_SSID_BYTES: usize = 32;
const MIN_PASSWORD_LEN: usize = 8;
const MAX_PASSWORD_LEN: usize = 63;

/// Parameters for the device's own broadcast network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccessPointParameters {
    /// Broadcast network name
    pub ssid: String,

    /// Port the configuration UI listens on while the hotspot is up
    pub port: u16,

    /// WPA2 passphrase; open network when unset
    pub password: Option<String>,

    /// Wireless interface to broadcast on
    pub interface: String,

    /// Name of the NetworkManager profile holding the hotspot
    pub connection_name: String,
}

impl Default for AccessPointParameters {
    fn default() -> Self {
        Self {
            ssid: DEFAULT_HOTSPOT_SSID.to_string(),
            port: DEFAULT_HOTSPOT_PORT,
            password: None,
            interface: DEFAULT_INTERFACE.to_string(),
            connection_name: DEFAULT_HOTSPOT_CONNECTION.to_string(),
        }
    }
}

impl AccessPointParameters {
    pub fn validate(&self) -> Result<(), ParameterError> {
        if self.ssid.is_empty() {
            return Err(ParameterError::EmptySsid);
        }
        if self.ssid.len() > MAX_SSID_BYTES {
            return Err(ParameterError::SsidTooLong(self.ssid.len()));
        }
        if self.port == 0 {
            return Err(ParameterError::InvalidPort);
        }
        if let Some(password) = &self.password {
            let len = password.chars().count();
            if !(MIN_PASSWORD_LEN..=MAX_PASSWORD_LEN).contains(&len) {
                return Err(ParameterError::PasswordLength(len));
            }
        }
        Ok(())
    }
}

/// Picks one of the saved networks, typically by asking the operator.
#[async_trait]
pub trait NetworkSelector: Send + Sync {
    /// Return the chosen network name, or `None` to cancel.
    async fn select(&self, networks: &[String]) -> Option<String>;
}

/// Which network `forget` mode should remove.
#[derive(Clone, Default)]
pub enum ForgetTarget {
    /// No name and no way to ask for one.
    #[default]
    Unspecified,

    /// Forget this network.
    Name(String),

    /// Let the caller choose from the saved networks.
    Select(Arc<dyn NetworkSelector>),
}

impl std::fmt::Debug for ForgetTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ForgetTarget::Unspecified => f.write_str("Unspecified"),
            ForgetTarget::Name(name) => f.debug_tuple("Name").field(name).finish(),
            ForgetTarget::Select(_) => f.write_str("Select(..)"),
        }
    }
}

/// The operator's declared intent, fixed for the process lifetime.
#[derive(Debug, Clone)]
pub struct ReconcilerConfig {
    pub requested_mode: RequestedMode,
    pub access_point: AccessPointParameters,
    pub attempt_timeout: Duration,
    pub forget: ForgetTarget,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self::new(RequestedMode::default())
    }
}

impl ReconcilerConfig {
    pub fn new(requested_mode: RequestedMode) -> Self {
        Self {
            requested_mode,
            access_point: AccessPointParameters::default(),
            attempt_timeout: DEFAULT_ATTEMPT_TIMEOUT,
            forget: ForgetTarget::default(),
        }
    }

    pub fn with_access_point(mut self, access_point: AccessPointParameters) -> Self {
        self.access_point = access_point;
        self
    }

    pub fn with_attempt_timeout(mut self, attempt_timeout: Duration) -> Self {
        self.attempt_timeout = attempt_timeout;
        self
    }

    pub fn with_forget(mut self, forget: ForgetTarget) -> Self {
        self.forget = forget;
        self
    }
}
