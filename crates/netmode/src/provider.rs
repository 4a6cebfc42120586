//! Capability traits for the wireless stack.
//!
//! The controller only calls into these; association, hotspot broadcast and
//! DHCP live behind them (see `platform` for the NetworkManager version).

use crate::config::AccessPointParameters;
use crate::error::BackendError;
use crate::mode::Mode;
use async_trait::async_trait;

/// Point-in-time queries about the wireless interface.
#[async_trait]
pub trait WirelessProbe: Send + Sync {
    /// Current operating mode of the device.
    async fn probe(&self) -> Result<Mode, BackendError>;

    /// Whether the device is associated to an external network.
    async fn is_connected(&self) -> Result<bool, BackendError> {
        Ok(self.probe().await? == Mode::Station)
    }
}

/// The device's own broadcast network. Both calls are idempotent.
#[async_trait]
pub trait AccessPointController: Send + Sync {
    async fn start_access_point(&self, params: &AccessPointParameters) -> Result<(), BackendError>;

    /// Stop the hotspot; a hotspot that is not running is not an error.
    async fn stop_access_point(&self) -> Result<(), BackendError>;
}

/// Association to networks saved on the device.
#[async_trait]
pub trait StationController: Send + Sync {
    /// Associate using any previously saved network.
    async fn connect_station(&self) -> Result<(), BackendError>;

    /// Drop the current association; not being associated is not an error.
    async fn disconnect_station(&self) -> Result<(), BackendError>;

    async fn list_saved_networks(&self) -> Result<Vec<String>, BackendError>;

    async fn forget_network(&self, _name: &str) -> Result<(), BackendError> {
        Err(BackendError::Unsupported("forget_network"))
    }
}

/// Everything the reconciler needs from the platform.
pub trait NetworkBackend: WirelessProbe + AccessPointController + StationController {}

impl<T> NetworkBackend for T where T: WirelessProbe + AccessPointController + StationController {}
