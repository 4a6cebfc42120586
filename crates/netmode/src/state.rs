//! Controller state and the events derived from it.

use crate::mode::Mode;
use serde::{Deserialize, Serialize};

/// Notification that the observed mode changed.
///
/// Consumers treat this as a notification, not a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModeChangeEvent {
    /// Newly observed mode
    pub mode: Mode,

    /// Mode held before this observation
    pub previous: Mode,

    /// Observation time, milliseconds since epoch
    pub observed_at: i64,
}

/// Last observed mode, owned by whichever component samples the device.
///
/// Only copies leave this struct (as [`ModeChangeEvent`]s).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ControllerState {
    current_mode: Mode,
    last_observed_at: Option<i64>,
}

impl ControllerState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current_mode(&self) -> Mode {
        self.current_mode
    }

    pub fn last_observed_at(&self) -> Option<i64> {
        self.last_observed_at
    }

    /// Record an observation and return an event if the mode changed.
    ///
    /// `Unknown` carries no information about the device and never replaces a
    /// known mode, so the state only moves `Unknown -> {Station, AccessPoint}`
    /// and `Station <-> AccessPoint`.
    pub fn observe(&mut self, mode: Mode, observed_at: i64) -> Option<ModeChangeEvent> {
        if mode == Mode::Unknown {
            return None;
        }

        self.last_observed_at = Some(observed_at);

        if mode == self.current_mode {
            return None;
        }

        let previous = std::mem::replace(&mut self.current_mode, mode);
        Some(ModeChangeEvent {
            mode,
            previous,
            observed_at,
        })
    }
}
