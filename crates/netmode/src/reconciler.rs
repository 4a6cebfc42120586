//! Startup reconciliation: bring the device into exactly one network mode.
//!
//! Teardown of the old mode always completes before the new one is
//! established, and every step is awaited before the next is issued.

use crate::config::{ForgetTarget, ReconcilerConfig};
use crate::error::{BackendError, ReconcileError, Result};
use crate::mode::{Mode, RequestedMode};
use crate::provider::NetworkBackend;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Result of a successful reconciliation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// The device is now in this mode.
    Mode(Mode),

    /// Saved networks, in the order the platform reports them.
    SavedNetworks(Vec<String>),

    /// This saved network was removed.
    Forgotten(String),

    /// The selector declined to pick a network.
    ForgetCancelled,
}

impl ReconcileOutcome {
    /// Mode the device ended up in; `Unknown` for list/forget outcomes.
    pub fn mode(&self) -> Mode {
        match self {
            ReconcileOutcome::Mode(mode) => *mode,
            _ => Mode::Unknown,
        }
    }
}

/// Drives the wireless backend into the requested mode.
pub struct ModeReconciler<B: ?Sized> {
    backend: Arc<B>,
}

impl<B> ModeReconciler<B>
where
    B: NetworkBackend + ?Sized,
{
    pub fn new(backend: Arc<B>) -> Self {
        Self { backend }
    }

    /// Run one reconciliation to completion.
    ///
    /// Not cancellable: callers await this as a startup gate. Use
    /// [`ReconcileError::is_fatal`] to decide whether to abort.
    pub async fn reconcile(&self, config: &ReconcilerConfig) -> Result<ReconcileOutcome> {
        tracing::info!(requested = %config.requested_mode, "reconciling network mode");

        match config.requested_mode {
            RequestedMode::Station => self.enter_station(config).await,
            RequestedMode::AccessPoint => self.enter_access_point(config).await,
            RequestedMode::Auto => self.auto(config).await,
            RequestedMode::List => self.list().await,
            RequestedMode::Forget => self.forget(&config.forget).await,
        }
    }

    async fn enter_station(&self, config: &ReconcilerConfig) -> Result<ReconcileOutcome> {
        self.teardown_access_point(config.attempt_timeout).await;

        self.connect(config.attempt_timeout)
            .await
            .map_err(ReconcileError::StationFailed)?;

        tracing::info!("connected to a saved network");
        Ok(ReconcileOutcome::Mode(Mode::Station))
    }

    async fn enter_access_point(&self, config: &ReconcilerConfig) -> Result<ReconcileOutcome> {
        config.access_point.validate()?;
        self.teardown_station(config.attempt_timeout).await;

        self.start_access_point(config)
            .await
            .map_err(ReconcileError::AccessPointFailed)?;

        Ok(ReconcileOutcome::Mode(Mode::AccessPoint))
    }

    async fn auto(&self, config: &ReconcilerConfig) -> Result<ReconcileOutcome> {
        let connected = bounded(
            "association probe",
            config.attempt_timeout,
            self.backend.is_connected(),
        )
        .await;

        match connected {
            Ok(true) => {
                tracing::info!("already connected to a wireless network, no action needed");
                return Ok(ReconcileOutcome::Mode(Mode::Station));
            }
            Ok(false) => {}
            Err(e) => {
                tracing::warn!(error = %e, "association probe failed, assuming not connected");
            }
        }

        // Only the fallback path uses the hotspot parameters.
        config.access_point.validate()?;
        self.teardown_access_point(config.attempt_timeout).await;

        tracing::info!("not connected, trying saved networks");
        let station_error = match self.connect(config.attempt_timeout).await {
            Ok(()) => {
                tracing::info!("connected to a saved network");
                return Ok(ReconcileOutcome::Mode(Mode::Station));
            }
            Err(e) => e,
        };

        tracing::warn!(error = %station_error, "connection failed, starting hotspot");
        self.teardown_station(config.attempt_timeout).await;

        match self.start_access_point(config).await {
            Ok(()) => Ok(ReconcileOutcome::Mode(Mode::AccessPoint)),
            Err(access_point) => Err(ReconcileError::Degraded {
                station: station_error,
                access_point,
            }),
        }
    }

    async fn list(&self) -> Result<ReconcileOutcome> {
        let networks = self.backend.list_saved_networks().await?;
        tracing::debug!(count = networks.len(), "listed saved networks");
        Ok(ReconcileOutcome::SavedNetworks(networks))
    }

    async fn forget(&self, target: &ForgetTarget) -> Result<ReconcileOutcome> {
        let name = match target {
            ForgetTarget::Unspecified => {
                return Err(ReconcileError::NotImplemented(
                    "forget needs a network name or an interactive selector".to_string(),
                ));
            }
            ForgetTarget::Name(name) => name.clone(),
            ForgetTarget::Select(selector) => {
                let networks = self.backend.list_saved_networks().await?;
                if networks.is_empty() {
                    tracing::info!("no saved networks to forget");
                    return Ok(ReconcileOutcome::ForgetCancelled);
                }
                match selector.select(&networks).await {
                    Some(name) => name,
                    None => return Ok(ReconcileOutcome::ForgetCancelled),
                }
            }
        };

        match self.backend.forget_network(&name).await {
            Ok(()) => {
                tracing::info!(network = %name, "forgot saved network");
                Ok(ReconcileOutcome::Forgotten(name))
            }
            Err(BackendError::Unsupported(op)) => {
                Err(ReconcileError::NotImplemented(op.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn connect(&self, limit: Duration) -> std::result::Result<(), BackendError> {
        bounded("station association", limit, self.backend.connect_station()).await
    }

    async fn start_access_point(
        &self,
        config: &ReconcilerConfig,
    ) -> std::result::Result<(), BackendError> {
        let params = &config.access_point;
        tracing::info!(ssid = %params.ssid, port = params.port, "starting hotspot");

        let result = bounded(
            "hotspot start",
            config.attempt_timeout,
            self.backend.start_access_point(params),
        )
        .await;

        if let Err(e) = &result {
            tracing::error!(error = %e, "failed to start hotspot");
        }
        result
    }

    /// Stop the hotspot; failure is logged and does not block what follows.
    async fn teardown_access_point(&self, limit: Duration) {
        if let Err(e) = bounded("hotspot stop", limit, self.backend.stop_access_point()).await {
            tracing::warn!(error = %e, "failed to stop and clean up hotspot");
        }
    }

    /// Drop any association; failure is logged and does not block what follows.
    async fn teardown_station(&self, limit: Duration) {
        let result = bounded("station disconnect", limit, self.backend.disconnect_station()).await;
        if let Err(e) = result {
            tracing::warn!(error = %e, "failed to disconnect station");
        }
    }
}

async fn bounded<T, F>(
    operation: &'static str,
    limit: Duration,
    fut: F,
) -> std::result::Result<T, BackendError>
where
    F: Future<Output = std::result::Result<T, BackendError>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(BackendError::Timeout {
            operation,
            seconds: limit.as_secs(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AccessPointParameters, NetworkSelector};
    use crate::provider::mock::{Call, MockBackend};
    use async_trait::async_trait;

    fn reconciler(backend: MockBackend) -> (ModeReconciler<MockBackend>, Arc<MockBackend>) {
        let backend = Arc::new(backend);
        (ModeReconciler::new(Arc::clone(&backend)), backend)
    }

    fn config(mode: RequestedMode) -> ReconcilerConfig {
        ReconcilerConfig::new(mode).with_access_point(AccessPointParameters {
            ssid: "JetClock-Test".to_string(),
            ..Default::default()
        })
    }

    #[tokio::test]
    async fn test_auto_when_connected_is_idempotent() {
        let (reconciler, backend) = reconciler(MockBackend::in_mode(Mode::Station));

        let outcome = reconciler.reconcile(&config(RequestedMode::Auto)).await.unwrap();

        assert_eq!(outcome, ReconcileOutcome::Mode(Mode::Station));
        assert!(backend.mutations().is_empty(), "got {:?}", backend.calls());
    }

    #[tokio::test]
    async fn test_auto_connects_after_stopping_hotspot() {
        let (reconciler, backend) = reconciler(MockBackend::in_mode(Mode::AccessPoint));

        let outcome = reconciler.reconcile(&config(RequestedMode::Auto)).await.unwrap();

        assert_eq!(outcome.mode(), Mode::Station);
        assert_eq!(
            backend.mutations(),
            vec![Call::StopAccessPoint, Call::ConnectStation]
        );
    }

    #[tokio::test]
    async fn test_auto_falls_back_to_hotspot() {
        let (reconciler, backend) = reconciler(MockBackend::new().failing_connect());

        let outcome = reconciler.reconcile(&config(RequestedMode::Auto)).await.unwrap();

        assert_eq!(outcome, ReconcileOutcome::Mode(Mode::AccessPoint));
        let starts: Vec<_> = backend
            .calls()
            .into_iter()
            .filter(|c| matches!(c, Call::StartAccessPoint(_)))
            .collect();
        assert_eq!(starts, vec![Call::StartAccessPoint("JetClock-Test".to_string())]);
    }

    #[tokio::test]
    async fn test_teardown_precedes_establishment() {
        let (reconciler, backend) = reconciler(MockBackend::new().failing_connect());

        reconciler.reconcile(&config(RequestedMode::Auto)).await.unwrap();

        assert_eq!(
            backend.mutations(),
            vec![
                Call::StopAccessPoint,
                Call::ConnectStation,
                Call::DisconnectStation,
                Call::StartAccessPoint("JetClock-Test".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_auto_degraded_when_fallback_fails() {
        let (reconciler, backend) =
            reconciler(MockBackend::new().failing_connect().failing_start());

        let err = reconciler
            .reconcile(&config(RequestedMode::Auto))
            .await
            .unwrap_err();

        assert!(matches!(err, ReconcileError::Degraded { .. }));
        assert!(!err.is_fatal());
        assert_eq!(backend.mode(), Mode::Unknown);
    }

    #[tokio::test]
    async fn test_auto_probe_failure_is_treated_as_disconnected() {
        let (reconciler, backend) = reconciler(MockBackend::new());
        backend.script_probes(vec![Err(BackendError::Unsupported("probe"))]);

        let outcome = reconciler.reconcile(&config(RequestedMode::Auto)).await.unwrap();

        assert_eq!(outcome.mode(), Mode::Station);
        assert!(backend.calls().contains(&Call::ConnectStation));
    }

    #[tokio::test]
    async fn test_station_failure_is_fatal_and_never_starts_hotspot() {
        let (reconciler, backend) = reconciler(MockBackend::new().failing_connect());

        let err = reconciler
            .reconcile(&config(RequestedMode::Station))
            .await
            .unwrap_err();

        assert!(err.is_fatal());
        assert!(!backend
            .calls()
            .iter()
            .any(|c| matches!(c, Call::StartAccessPoint(_))));
    }

    #[tokio::test]
    async fn test_station_proceeds_when_teardown_fails() {
        let (reconciler, backend) = reconciler(MockBackend::new().failing_stop());

        let outcome = reconciler.reconcile(&config(RequestedMode::Station)).await.unwrap();

        assert_eq!(outcome.mode(), Mode::Station);
        assert_eq!(
            backend.mutations(),
            vec![Call::StopAccessPoint, Call::ConnectStation]
        );
    }

    #[tokio::test]
    async fn test_auto_proceeds_when_hotspot_teardown_fails() {
        let (reconciler, backend) =
            reconciler(MockBackend::in_mode(Mode::AccessPoint).failing_stop());

        let outcome = reconciler.reconcile(&config(RequestedMode::Auto)).await.unwrap();

        assert_eq!(outcome.mode(), Mode::Station);
        assert_eq!(
            backend.mutations(),
            vec![Call::StopAccessPoint, Call::ConnectStation]
        );
    }

    #[tokio::test]
    async fn test_auto_when_connected_ignores_bad_hotspot_parameters() {
        let (reconciler, backend) = reconciler(MockBackend::in_mode(Mode::Station));
        let config = ReconcilerConfig::new(RequestedMode::Auto).with_access_point(
            AccessPointParameters {
                password: Some("short".to_string()),
                ..Default::default()
            },
        );

        let outcome = reconciler.reconcile(&config).await.unwrap();

        assert_eq!(outcome, ReconcileOutcome::Mode(Mode::Station));
        assert!(backend.mutations().is_empty(), "got {:?}", backend.calls());
    }

    #[tokio::test]
    async fn test_auto_rejects_bad_hotspot_parameters_before_teardown() {
        let (reconciler, backend) = reconciler(MockBackend::in_mode(Mode::AccessPoint));
        let config = ReconcilerConfig::new(RequestedMode::Auto).with_access_point(
            AccessPointParameters {
                password: Some("short".to_string()),
                ..Default::default()
            },
        );

        let err = reconciler.reconcile(&config).await.unwrap_err();

        assert!(matches!(err, ReconcileError::InvalidParameters(_)));
        assert!(backend.mutations().is_empty());
        assert_eq!(backend.mode(), Mode::AccessPoint);
    }

    #[tokio::test(start_paused = true)]
    async fn test_station_timeout_is_association_failure() {
        let (reconciler, _backend) =
            reconciler(MockBackend::new().slow_connect(Duration::from_secs(600)));
        let config = config(RequestedMode::Station).with_attempt_timeout(Duration::from_secs(5));

        let err = reconciler.reconcile(&config).await.unwrap_err();

        match err {
            ReconcileError::StationFailed(BackendError::Timeout { seconds, .. }) => {
                assert_eq!(seconds, 5)
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_hotspot_mode_failure_is_not_fatal() {
        let (reconciler, backend) = reconciler(MockBackend::new().failing_start());

        let err = reconciler
            .reconcile(&config(RequestedMode::AccessPoint))
            .await
            .unwrap_err();

        assert!(matches!(err, ReconcileError::AccessPointFailed(_)));
        assert!(!err.is_fatal());
        assert!(!backend.calls().contains(&Call::ConnectStation));
    }

    #[tokio::test]
    async fn test_hotspot_mode_disconnects_station_first() {
        let (reconciler, backend) = reconciler(MockBackend::in_mode(Mode::Station));

        let outcome = reconciler
            .reconcile(&config(RequestedMode::AccessPoint))
            .await
            .unwrap();

        assert_eq!(outcome.mode(), Mode::AccessPoint);
        assert_eq!(
            backend.mutations(),
            vec![
                Call::DisconnectStation,
                Call::StartAccessPoint("JetClock-Test".to_string())
            ]
        );
    }

    #[tokio::test]
    async fn test_invalid_hotspot_parameters_rejected_before_any_call() {
        let (reconciler, backend) = reconciler(MockBackend::new());
        let config = ReconcilerConfig::new(RequestedMode::AccessPoint).with_access_point(
            AccessPointParameters {
                ssid: String::new(),
                ..Default::default()
            },
        );

        let err = reconciler.reconcile(&config).await.unwrap_err();

        assert!(matches!(err, ReconcileError::InvalidParameters(_)));
        assert!(backend.calls().is_empty());
    }

    #[tokio::test]
    async fn test_list_empty_is_not_an_error() {
        let (reconciler, backend) = reconciler(MockBackend::new());

        let outcome = reconciler.reconcile(&config(RequestedMode::List)).await.unwrap();

        assert_eq!(outcome, ReconcileOutcome::SavedNetworks(Vec::new()));
        assert!(backend.mutations().is_empty());
    }

    #[tokio::test]
    async fn test_list_returns_saved_networks() {
        let (reconciler, _backend) = reconciler(MockBackend::new().with_saved(&["Home", "Office"]));

        let outcome = reconciler.reconcile(&config(RequestedMode::List)).await.unwrap();

        assert_eq!(
            outcome,
            ReconcileOutcome::SavedNetworks(vec!["Home".to_string(), "Office".to_string()])
        );
    }

    #[tokio::test]
    async fn test_forget_without_target_fails_explicitly() {
        let (reconciler, backend) = reconciler(MockBackend::new().with_saved(&["Home"]));

        let err = reconciler
            .reconcile(&config(RequestedMode::Forget))
            .await
            .unwrap_err();

        assert!(matches!(err, ReconcileError::NotImplemented(_)));
        assert_eq!(backend.saved(), vec!["Home".to_string()]);
    }

    #[tokio::test]
    async fn test_forget_by_name() {
        let (reconciler, backend) = reconciler(MockBackend::new().with_saved(&["Home", "Office"]));
        let config = config(RequestedMode::Forget).with_forget(ForgetTarget::Name("Home".into()));

        let outcome = reconciler.reconcile(&config).await.unwrap();

        assert_eq!(outcome, ReconcileOutcome::Forgotten("Home".to_string()));
        assert_eq!(backend.saved(), vec!["Office".to_string()]);
    }

    #[tokio::test]
    async fn test_forget_unknown_name() {
        let (reconciler, _backend) = reconciler(MockBackend::new().with_saved(&["Home"]));
        let config = config(RequestedMode::Forget).with_forget(ForgetTarget::Name("Cafe".into()));

        let err = reconciler.reconcile(&config).await.unwrap_err();

        assert!(matches!(
            err,
            ReconcileError::Backend(BackendError::NetworkNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_forget_unsupported_backend_is_not_implemented() {
        let (reconciler, _backend) = reconciler(MockBackend::new().without_forget());
        let config = config(RequestedMode::Forget).with_forget(ForgetTarget::Name("Home".into()));

        let err = reconciler.reconcile(&config).await.unwrap_err();

        assert!(matches!(err, ReconcileError::NotImplemented(_)));
    }

    struct PickLast;

    #[async_trait]
    impl NetworkSelector for PickLast {
        async fn select(&self, networks: &[String]) -> Option<String> {
            networks.last().cloned()
        }
    }

    struct Decline;

    #[async_trait]
    impl NetworkSelector for Decline {
        async fn select(&self, _networks: &[String]) -> Option<String> {
            None
        }
    }

    #[tokio::test]
    async fn test_forget_with_selector() {
        let (reconciler, backend) = reconciler(MockBackend::new().with_saved(&["Home", "Office"]));
        let config =
            config(RequestedMode::Forget).with_forget(ForgetTarget::Select(Arc::new(PickLast)));

        let outcome = reconciler.reconcile(&config).await.unwrap();

        assert_eq!(outcome, ReconcileOutcome::Forgotten("Office".to_string()));
        assert_eq!(backend.saved(), vec!["Home".to_string()]);
    }

    #[tokio::test]
    async fn test_forget_selector_cancel() {
        let (reconciler, backend) = reconciler(MockBackend::new().with_saved(&["Home"]));
        let config =
            config(RequestedMode::Forget).with_forget(ForgetTarget::Select(Arc::new(Decline)));

        let outcome = reconciler.reconcile(&config).await.unwrap();

        assert_eq!(outcome, ReconcileOutcome::ForgetCancelled);
        assert_eq!(backend.saved(), vec!["Home".to_string()]);
    }
}
