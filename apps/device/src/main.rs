//! `jetclock`: brings the device into a network mode at startup, then reports
//! mode changes to the UI shell as JSON lines on stdout.

mod cli;
mod config;
mod logging;
mod selector;

use std::io::{IsTerminal, Write};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use jetclock_events::{mode_change_forwarder, BroadcastEventBus, EventBus};
use jetclock_netmode::platform::NmcliBackend;
use jetclock_netmode::{ForgetTarget, ModeMonitor, ModeReconciler, ReconcileOutcome, RequestedMode};
use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;

use crate::cli::Cli;
use crate::config::DeviceConfig;
use crate::selector::PromptSelector;

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    let path = cli.config.clone().unwrap_or_else(config::default_path);
    let mut device = DeviceConfig::load(&path)?;
    device.apply_env()?;
    if let Some(mode) = cli.mode {
        device.wifi.mode = mode;
    }
    device.validate()?;

    logging::init(&device.log_level);
    tracing::info!(
        pid = std::process::id(),
        version = env!("CARGO_PKG_VERSION"),
        config = %path.display(),
        "JetClock device controller started"
    );

    let requested = device.wifi.mode;
    if requested == RequestedMode::Auto {
        if let Err(e) = device.wifi.hotspot.validate() {
            tracing::warn!(error = %e, "fallback hotspot is misconfigured");
        }
    }
    let backend = Arc::new(NmcliBackend::from_parameters(&device.wifi.hotspot));
    let reconcile_config = device
        .wifi
        .reconciler_config()
        .with_forget(forget_target(cli.network));

    let outcome = match ModeReconciler::new(Arc::clone(&backend))
        .reconcile(&reconcile_config)
        .await
    {
        Ok(outcome) => Some(outcome),
        Err(e) if e.is_fatal() => {
            tracing::error!(error = %e, "requested network mode could not be entered");
            return Ok(ExitCode::FAILURE);
        }
        Err(e) if requested.drives_network() => {
            tracing::error!(error = %e, "continuing without a network");
            None
        }
        Err(e) => return Err(e).with_context(|| format!("{requested} failed")),
    };

    match outcome {
        Some(ReconcileOutcome::SavedNetworks(networks)) => {
            print!("{}", format_networks(&networks));
            return Ok(ExitCode::SUCCESS);
        }
        Some(ReconcileOutcome::Forgotten(name)) => {
            println!("Forgot network {name}.");
            return Ok(ExitCode::SUCCESS);
        }
        Some(ReconcileOutcome::ForgetCancelled) => {
            println!("No network forgotten.");
            return Ok(ExitCode::SUCCESS);
        }
        Some(ReconcileOutcome::Mode(mode)) => {
            tracing::info!(%mode, "network mode reconciled");
        }
        None => {}
    }

    let bus = Arc::new(BroadcastEventBus::default());
    let printer = tokio::spawn(print_events(bus.subscribe()));

    let cancel = CancellationToken::new();
    let mut monitor = ModeMonitor::new(backend)
        .with_interval(device.wifi.monitor_interval())
        .with_probe_timeout(device.wifi.probe_timeout())
        .spawn(cancel.clone(), mode_change_forwarder(bus.clone() as Arc<dyn EventBus>));

    shutdown_signal().await;
    tracing::info!("shutting down");

    cancel.cancel();
    monitor.stop().await;
    printer.abort();

    Ok(ExitCode::SUCCESS)
}

/// An explicit name wins; otherwise ask, but only if someone can answer.
fn forget_target(network: Option<String>) -> ForgetTarget {
    match network {
        Some(name) => ForgetTarget::Name(name),
        None if std::io::stdin().is_terminal() => ForgetTarget::Select(Arc::new(PromptSelector)),
        None => ForgetTarget::Unspecified,
    }
}

fn format_networks(networks: &[String]) -> String {
    if networks.is_empty() {
        return "No known networks.\n".to_string();
    }

    networks
        .iter()
        .enumerate()
        .map(|(i, name)| format!("[{}] {}\n", i + 1, name))
        .collect()
}

/// Write each bus event to stdout as one JSON line.
async fn print_events(mut events: tokio::sync::broadcast::Receiver<jetclock_events::EmittedEvent>) {
    loop {
        match events.recv().await {
            Ok(event) => {
                let line = match serde_json::to_string(&event) {
                    Ok(line) => line,
                    Err(e) => {
                        tracing::warn!(error = %e, "failed to serialize event");
                        continue;
                    }
                };
                let mut stdout = std::io::stdout().lock();
                if let Err(e) = writeln!(stdout, "{line}").and_then(|_| stdout.flush()) {
                    tracing::warn!(error = %e, "failed to write event");
                }
            }
            Err(RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "event output fell behind");
            }
            Err(RecvError::Closed) => break,
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to listen for ctrl-c: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
