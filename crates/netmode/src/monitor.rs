//! Mode monitor - background task that samples the live wireless mode.

use crate::error::BackendError;
use crate::mode::Mode;
use crate::provider::WirelessProbe;
use crate::state::{ControllerState, ModeChangeEvent};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// Default sampling interval.
pub const DEFAULT_MONITOR_INTERVAL: Duration = Duration::from_secs(10);

/// Default bound on a single probe.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// Callback invoked with every mode change. Must be callable from the
/// monitor task at any time.
pub type ModeCallback = Arc<dyn Fn(ModeChangeEvent) + Send + Sync + 'static>;

/// Periodically probes the device and publishes mode changes.
///
/// Publishing is change-triggered: repeated observations of the same mode,
/// failed probes and `Unknown` answers produce nothing.
pub struct ModeMonitor<P: ?Sized> {
    probe: Arc<P>,
    interval: Duration,
    probe_timeout: Duration,
}

impl<P> ModeMonitor<P>
where
    P: WirelessProbe + ?Sized + 'static,
{
    pub fn new(probe: Arc<P>) -> Self {
        Self {
            probe,
            interval: DEFAULT_MONITOR_INTERVAL,
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval.max(MIN_INTERVAL);
        self
    }

    pub fn with_probe_timeout(mut self, probe_timeout: Duration) -> Self {
        self.probe_timeout = probe_timeout;
        self
    }

    /// Sample until `cancel` fires. The first tick runs immediately.
    pub async fn run(&self, cancel: CancellationToken, publish: ModeCallback) {
        tracing::info!("Mode monitor started with interval {:?}", self.interval);

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut state = ControllerState::new();

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            let observed = tokio::select! {
                _ = cancel.cancelled() => break,
                observed = self.sample() => observed,
            };

            let mode = match observed {
                Ok(mode) => mode,
                Err(e) => {
                    tracing::warn!(error = %e, "Wi-Fi watch error, keeping last mode");
                    continue;
                }
            };

            if mode == Mode::Unknown {
                tracing::debug!("probe could not determine a mode");
            }

            let now = chrono::Utc::now().timestamp_millis();
            if let Some(event) = state.observe(mode, now) {
                tracing::info!(from = %event.previous, to = %event.mode, "Wi-Fi mode changed");
                publish(event);
            }
        }

        tracing::info!("Mode monitor stopped");
    }

    async fn sample(&self) -> Result<Mode, BackendError> {
        match tokio::time::timeout(self.probe_timeout, self.probe.probe()).await {
            Ok(result) => result,
            Err(_) => Err(BackendError::Timeout {
                operation: "mode probe",
                seconds: self.probe_timeout.as_secs(),
            }),
        }
    }

    /// Run the monitor on a tokio task.
    pub fn spawn(self, cancel: CancellationToken, publish: ModeCallback) -> MonitorHandle {
        let latest = Arc::new(Mutex::new(None));
        let latest_for_task = Arc::clone(&latest);

        let recording: ModeCallback = Arc::new(move |event| {
            *latest_for_task
                .lock()
                .unwrap_or_else(PoisonError::into_inner) = Some(event);
            publish(event);
        });

        let token = cancel.clone();
        let task = tokio::spawn(async move {
            self.run(token, recording).await;
        });

        MonitorHandle {
            cancel,
            task: Some(task),
            latest,
        }
    }
}

/// Handle to a spawned [`ModeMonitor`].
///
/// Dropping the handle cancels the monitor without waiting for it.
pub struct MonitorHandle {
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
    latest: Arc<Mutex<Option<ModeChangeEvent>>>,
}

impl MonitorHandle {
    /// Copy of the most recently published event, for late subscribers.
    pub fn latest(&self) -> Option<ModeChangeEvent> {
        *self.latest.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Cancel the monitor and wait for it to finish.
    pub async fn stop(&mut self) {
        self.cancel.cancel();

        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tracing::error!("mode monitor task failed: {}", e);
            }
        }
    }
}

impl Drop for MonitorHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
