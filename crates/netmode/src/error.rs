//! Error types for network-mode control.

use thiserror::Error;

/// Failure reported by a wireless capability (probe, station, access point).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    /// The network tool is not installed.
    #[error("command not found: {0}")]
    CommandNotFound(String),

    /// The network tool ran and reported failure.
    #[error("`{command}` exited with status {status}: {stderr}")]
    CommandFailed {
        command: String,
        status: i32,
        stderr: String,
    },

    /// The network tool could not be spawned.
    #[error("failed to run {program}: {message}")]
    Io { program: String, message: String },

    /// The operation did not finish within its bound.
    #[error("{operation} timed out after {seconds}s")]
    Timeout {
        operation: &'static str,
        seconds: u64,
    },

    /// Station association was requested but nothing is saved.
    #[error("no saved wireless networks")]
    NoKnownNetworks,

    #[error("no saved network named '{0}'")]
    NetworkNotFound(String),

    /// The backend does not offer this capability.
    #[error("{0} is not supported by this backend")]
    Unsupported(&'static str),

    /// The network tool answered with something we could not read.
    #[error("unexpected output from {command}: {message}")]
    Parse { command: String, message: String },
}

/// Invalid access point parameters.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParameterError {
    #[error("hotspot SSID must not be empty")]
    EmptySsid,

    #[error("hotspot SSID is {0} bytes, the limit is 32")]
    SsidTooLong(usize),

    #[error("hotspot port must be non-zero")]
    InvalidPort,

    #[error("hotspot password must be 8 to 63 characters, got {0}")]
    PasswordLength(usize),
}

/// Terminal failure of a reconciliation.
///
/// Only [`ReconcileError::StationFailed`] is fatal: the device was told to
/// join a network and has no fallback. Everything else leaves the process
/// alive, possibly without a network.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// Station mode was requested and association failed.
    #[error("failed to connect to a saved network: {0}")]
    StationFailed(#[source] BackendError),

    /// Access point mode was requested and the hotspot failed to start.
    #[error("failed to start hotspot: {0}")]
    AccessPointFailed(#[source] BackendError),

    /// Auto mode: association failed and so did the fallback hotspot.
    #[error("no network: connect failed ({station}), fallback hotspot failed ({access_point})")]
    Degraded {
        station: BackendError,
        access_point: BackendError,
    },

    /// The requested operation has no usable implementation for this input.
    #[error("not implemented: {0}")]
    NotImplemented(String),

    #[error("invalid hotspot parameters: {0}")]
    InvalidParameters(#[from] ParameterError),

    /// A read-only or forget operation failed.
    #[error(transparent)]
    Backend(#[from] BackendError),
}

impl ReconcileError {
    /// Whether the caller must abort the process.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ReconcileError::StationFailed(_))
    }
}

pub type Result<T> = std::result::Result<T, ReconcileError>;
