//! NetworkManager backend driven through `nmcli`.

use super::{CommandRunner, TokioCommandRunner};
use crate::config::AccessPointParameters;
use crate::error::BackendError;
use crate::mode::Mode;
use crate::provider::{AccessPointController, StationController, WirelessProbe};
use async_trait::async_trait;

const NMCLI: &str = "nmcli";

/// Device type of wireless interfaces in `nmcli device status`.
const WIFI_DEVICE_TYPE: &str = "wifi";

/// Connection type of saved wireless profiles in `nmcli connection show`.
const WIFI_PROFILE_TYPE: &str = "802-11-wireless";

/// nmcli exit status for "connection, device, or access point does not exist".
const EXIT_NOT_FOUND: i32 = 10;

/// stderr fragments meaning the thing we wanted gone is already gone.
const ABSENT_MARKERS: &[&str] = &[
    "not an active connection",
    "unknown connection",
    "no such connection profile",
    "not active",
    "not connected",
];

/// Wireless capabilities backed by NetworkManager.
pub struct NmcliBackend<R = TokioCommandRunner> {
    runner: R,
    interface: String,
    hotspot_connection: String,
}

impl NmcliBackend {
    pub fn new(interface: impl Into<String>, hotspot_connection: impl Into<String>) -> Self {
        Self::with_runner(TokioCommandRunner, interface, hotspot_connection)
    }

    /// Backend for the interface and hotspot profile named in `params`.
    pub fn from_parameters(params: &AccessPointParameters) -> Self {
        Self::new(params.interface.clone(), params.connection_name.clone())
    }
}

impl<R: CommandRunner> NmcliBackend<R> {
    pub fn with_runner(
        runner: R,
        interface: impl Into<String>,
        hotspot_connection: impl Into<String>,
    ) -> Self {
        Self {
            runner,
            interface: interface.into(),
            hotspot_connection: hotspot_connection.into(),
        }
    }

    async fn nmcli(&self, args: &[&str]) -> Result<String, BackendError> {
        let args: Vec<String> = args.iter().map(|s| s.to_string()).collect();
        let output = self.runner.run(NMCLI, &args).await?;

        if output.success() {
            Ok(output.stdout)
        } else {
            Err(BackendError::CommandFailed {
                command: format!("{} {}", NMCLI, args.join(" ")),
                status: output.status.unwrap_or(-1),
                stderr: output.stderr.trim().to_string(),
            })
        }
    }

    /// Like [`Self::nmcli`], but "already gone" answers count as success.
    async fn nmcli_teardown(&self, args: &[&str]) -> Result<(), BackendError> {
        match self.nmcli(args).await {
            Ok(_) => Ok(()),
            Err(e) if is_absent(&e) => {
                tracing::debug!(error = %e, "nothing to tear down");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Name of the connection active on our wireless interface, if any.
    async fn active_connection(&self) -> Result<Option<String>, BackendError> {
        let output = self
            .nmcli(&["-t", "-f", "DEVICE,TYPE,STATE,CONNECTION", "device", "status"])
            .await?;

        let mut wifi_rows = Vec::new();
        for line in output.lines().filter(|line| !line.trim().is_empty()) {
            let fields = split_terse(line);
            if fields.len() != 4 {
                return Err(BackendError::Parse {
                    command: "nmcli device status".to_string(),
                    message: format!("expected 4 fields, got {} in {:?}", fields.len(), line),
                });
            }
            if fields[1] == WIFI_DEVICE_TYPE {
                wifi_rows.push(fields);
            }
        }

        let row = wifi_rows
            .iter()
            .find(|fields| fields[0] == self.interface)
            .or_else(|| wifi_rows.first());

        Ok(row
            .filter(|fields| fields[2].starts_with("connected"))
            .map(|fields| fields[3].clone())
            .filter(|connection| !connection.is_empty()))
    }
}

#[async_trait]
impl<R: CommandRunner> WirelessProbe for NmcliBackend<R> {
    async fn probe(&self) -> Result<Mode, BackendError> {
        let Some(connection) = self.active_connection().await? else {
            return Ok(Mode::Unknown);
        };

        let args = [
            "-g",
            "802-11-wireless.mode",
            "connection",
            "show",
            "id",
            connection.as_str(),
        ];
        let output = self.nmcli(&args).await?;

        match output.trim() {
            "ap" => Ok(Mode::AccessPoint),
            "infrastructure" | "" => Ok(Mode::Station),
            other => {
                tracing::debug!(connection = %connection, mode = other, "unhandled wireless mode");
                Ok(Mode::Unknown)
            }
        }
    }
}

#[async_trait]
impl<R: CommandRunner> AccessPointController for NmcliBackend<R> {
    async fn start_access_point(&self, params: &AccessPointParameters) -> Result<(), BackendError> {
        let mut args = vec![
            "device",
            "wifi",
            "hotspot",
            "ifname",
            params.interface.as_str(),
            "con-name",
            params.connection_name.as_str(),
            "ssid",
            params.ssid.as_str(),
        ];
        if let Some(password) = &params.password {
            args.extend(["password", password.as_str()]);
        }

        self.nmcli(&args).await?;
        tracing::info!(ssid = %params.ssid, interface = %params.interface, "hotspot started");
        Ok(())
    }

    async fn stop_access_point(&self) -> Result<(), BackendError> {
        let name = self.hotspot_connection.as_str();
        self.nmcli_teardown(&["connection", "down", "id", name]).await?;
        self.nmcli_teardown(&["connection", "delete", "id", name]).await
    }
}

#[async_trait]
impl<R: CommandRunner> StationController for NmcliBackend<R> {
    async fn connect_station(&self) -> Result<(), BackendError> {
        let networks = self.list_saved_networks().await?;
        if networks.is_empty() {
            return Err(BackendError::NoKnownNetworks);
        }

        let mut last_error = BackendError::NoKnownNetworks;
        for network in &networks {
            let args = [
                "connection",
                "up",
                "id",
                network.as_str(),
                "ifname",
                self.interface.as_str(),
            ];
            match self.nmcli(&args).await {
                Ok(_) => {
                    tracing::info!(network = %network, "connected via NetworkManager");
                    return Ok(());
                }
                Err(e) => {
                    tracing::debug!(network = %network, error = %e, "saved network unavailable");
                    last_error = e;
                }
            }
        }

        Err(last_error)
    }

    async fn disconnect_station(&self) -> Result<(), BackendError> {
        self.nmcli_teardown(&["device", "disconnect", self.interface.as_str()]).await
    }

    async fn list_saved_networks(&self) -> Result<Vec<String>, BackendError> {
        let output = self.nmcli(&["-t", "-f", "NAME,TYPE", "connection", "show"]).await?;

        Ok(output
            .lines()
            .map(split_terse)
            .filter(|fields| fields.len() >= 2 && fields[1] == WIFI_PROFILE_TYPE)
            .map(|mut fields| fields.swap_remove(0))
            .filter(|name| *name != self.hotspot_connection)
            .collect())
    }

    async fn forget_network(&self, name: &str) -> Result<(), BackendError> {
        let saved = self.list_saved_networks().await?;
        if !saved.iter().any(|n| n == name) {
            return Err(BackendError::NetworkNotFound(name.to_string()));
        }

        self.nmcli(&["connection", "delete", "id", name]).await?;
        Ok(())
    }
}

fn is_absent(error: &BackendError) -> bool {
    match error {
        BackendError::CommandFailed { status, stderr, .. } => {
            let stderr = stderr.to_ascii_lowercase();
            *status == EXIT_NOT_FOUND || ABSENT_MARKERS.iter().any(|m| stderr.contains(m))
        }
        _ => false,
    }
}

/// Split one line of `nmcli -t` output into fields.
///
/// Fields are separated by `:`; literal colons and backslashes inside a field
/// are escaped as `\:` and `\\`.
pub fn split_terse(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut chars = line.chars();

    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                if let Some(escaped) = chars.next() {
                    current.push(escaped);
                }
            }
            ':' => fields.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    fields.push(current);
    fields
}
