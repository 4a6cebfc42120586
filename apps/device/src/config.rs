//! Device configuration: YAML file, then environment overrides.

use std::path::{Path, PathBuf};
use std::time::Duration;

use jetclock_netmode::{
    AccessPointParameters, ReconcilerConfig, RequestedMode, DEFAULT_ATTEMPT_TIMEOUT,
    DEFAULT_MONITOR_INTERVAL, DEFAULT_PROBE_TIMEOUT,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid value for {key}: '{value}'")]
    InvalidOverride { key: &'static str, value: String },

    #[error("invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

// ── Types ───────────────────────────────────────────────────────────

/// Everything read from `config.yaml`. Every field is optional.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// Base tracing level when `RUST_LOG` is unset
    #[serde(alias = "logLevel", alias = "LogLevel")]
    pub log_level: String,

    pub wifi: WifiConfig,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            wifi: WifiConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WifiConfig {
    pub mode: RequestedMode,
    pub hotspot: AccessPointParameters,
    pub attempt_timeout_secs: u64,
    pub monitor_interval_secs: u64,
    pub probe_timeout_secs: u64,
}

impl Default for WifiConfig {
    fn default() -> Self {
        Self {
            mode: RequestedMode::default(),
            hotspot: AccessPointParameters::default(),
            attempt_timeout_secs: DEFAULT_ATTEMPT_TIMEOUT.as_secs(),
            monitor_interval_secs: DEFAULT_MONITOR_INTERVAL.as_secs(),
            probe_timeout_secs: DEFAULT_PROBE_TIMEOUT.as_secs(),
        }
    }
}

impl WifiConfig {
    pub fn attempt_timeout(&self) -> Duration {
        Duration::from_secs(self.attempt_timeout_secs)
    }

    pub fn monitor_interval(&self) -> Duration {
        Duration::from_secs(self.monitor_interval_secs)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }

    /// Reconciler input for this configuration. The forget target is left
    /// for the caller, since it depends on the terminal.
    pub fn reconciler_config(&self) -> ReconcilerConfig {
        ReconcilerConfig::new(self.mode)
            .with_access_point(self.hotspot.clone())
            .with_attempt_timeout(self.attempt_timeout())
    }
}

// ── Paths ───────────────────────────────────────────────────────────

/// `~/.config/jetclock/config.yaml`, or a relative path if there is no home.
pub fn default_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("jetclock")
        .join("config.yaml")
}

// ── Loading ─────────────────────────────────────────────────────────

impl DeviceConfig {
    /// Read the config file. A missing file gives the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        if text.trim().is_empty() {
            return Ok(Self::default());
        }

        serde_yaml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Apply `JETCLOCK_*` overrides from the process environment.
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(std::env::vars())
    }

    /// Apply `JETCLOCK_*` overrides from `vars`. Unrelated keys are ignored.
    pub fn apply_overrides<I, K, V>(&mut self, vars: I) -> Result<(), ConfigError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        for (key, value) in vars {
            let value = value.into();
            match key.as_ref() {
                "JETCLOCK_HOTSPOT_SSID" => self.wifi.hotspot.ssid = value,
                "JETCLOCK_HOTSPOT_PORT" => {
                    self.wifi.hotspot.port = value.trim().parse().map_err(|_| {
                        ConfigError::InvalidOverride {
                            key: "JETCLOCK_HOTSPOT_PORT",
                            value: value.clone(),
                        }
                    })?;
                }
                "JETCLOCK_HOTSPOT_PASSWORD" => {
                    self.wifi.hotspot.password = (!value.is_empty()).then_some(value);
                }
                "JETCLOCK_WIFI_INTERFACE" => self.wifi.hotspot.interface = value,
                "JETCLOCK_WIFI_MODE" => {
                    self.wifi.mode = value.parse().map_err(|_| ConfigError::InvalidOverride {
                        key: "JETCLOCK_WIFI_MODE",
                        value: value.clone(),
                    })?;
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Reject values no run could succeed with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let wifi = &self.wifi;
        for (field, secs) in [
            ("wifi.attempt_timeout_secs", wifi.attempt_timeout_secs),
            ("wifi.monitor_interval_secs", wifi.monitor_interval_secs),
            ("wifi.probe_timeout_secs", wifi.probe_timeout_secs),
        ] {
            if secs == 0 {
                return Err(ConfigError::Invalid {
                    field,
                    reason: "must be at least one second".to_string(),
                });
            }
        }

        if wifi.mode == RequestedMode::AccessPoint {
            wifi.hotspot.validate().map_err(|e| ConfigError::Invalid {
                field: "wifi.hotspot",
                reason: e.to_string(),
            })?;
        }
        Ok(())
    }
}
