//! Network-mode control for JetClock devices.
//!
//! A headless clock has no keyboard or screen for Wi-Fi setup, so at startup
//! it either joins a saved network or broadcasts its own hotspot, and then
//! keeps the UI told which of the two it is in.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Domain Layer                             │
//! │  mode.rs     - Mode / RequestedMode values (pure)           │
//! │  state.rs    - ControllerState, ModeChangeEvent             │
//! │  config.rs   - ReconcilerConfig, AccessPointParameters      │
//! │  provider.rs - Capability traits for the wireless stack     │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  Infrastructure Layer                        │
//! │  platform/nmcli.rs - NetworkManager implementation          │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   Application Layer                          │
//! │  reconciler.rs - one-shot startup decision                  │
//! │  monitor.rs    - background sampling and event emission     │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use jetclock_netmode::{ModeMonitor, ModeReconciler, ReconcilerConfig, platform::NmcliBackend};
//! use std::sync::Arc;
//!
//! let backend = Arc::new(NmcliBackend::new("wlan0", "jetclock-hotspot"));
//! let outcome = ModeReconciler::new(Arc::clone(&backend))
//!     .reconcile(&ReconcilerConfig::default())
//!     .await?;
//!
//! let handle = ModeMonitor::new(backend).spawn(cancel, Arc::new(|event| {
//!     println!("Wi-Fi mode: {}", event.mode);
//! }));
//! ```

mod config;
mod error;
mod mode;
mod monitor;
mod provider;
mod reconciler;
mod state;

pub mod platform;

pub use config::{
    AccessPointParameters, ForgetTarget, NetworkSelector, ReconcilerConfig,
    DEFAULT_ATTEMPT_TIMEOUT, DEFAULT_HOTSPOT_CONNECTION, DEFAULT_HOTSPOT_PORT,
    DEFAULT_HOTSPOT_SSID, DEFAULT_INTERFACE,
};
pub use error::{BackendError, ParameterError, ReconcileError};
pub use mode::{Mode, RequestedMode, UnknownModeError};
pub use monitor::{
    ModeCallback, ModeMonitor, MonitorHandle, DEFAULT_MONITOR_INTERVAL, DEFAULT_PROBE_TIMEOUT,
};
pub use provider::{AccessPointController, NetworkBackend, StationController, WirelessProbe};
pub use reconciler::{ModeReconciler, ReconcileOutcome};
pub use state::{ControllerState, ModeChangeEvent};
