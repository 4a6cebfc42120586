//! Event contracts between the device controller and the UI shell.
//!
//! The UI listens on named topics. This crate owns the topic names, the
//! `EventBus` trait the host wires to a real transport, and the adapter that
//! lets the mode monitor publish onto a bus.

mod bus;

pub use bus::{BroadcastEventBus, EmittedEvent, EventBus, EventBusRef, InMemoryEventBus};

use jetclock_netmode::{ModeCallback, ModeChangeEvent};
use std::sync::Arc;

/// Event names as constants to prevent typos.
pub mod event_names {
    /// Wi-Fi mode change. Payload is the integer mode code
    /// (0 unknown, 1 station, 2 access point).
    pub const WIFI_MODE: &str = "jetclock:wifi.mode";
}

/// Build a monitor callback that emits each mode change on `bus`.
pub fn mode_change_forwarder(bus: EventBusRef) -> ModeCallback {
    Arc::new(move |event: ModeChangeEvent| {
        bus.emit(event_names::WIFI_MODE, serde_json::json!(event.mode));
    })
}
