//! Command-line flags for the `jetclock` binary.

use std::path::PathBuf;

use clap::Parser;
use jetclock_netmode::RequestedMode;

/// jetclock -- network mode controller for JetClock devices
#[derive(Debug, Parser)]
#[command(
    name = "jetclock",
    version,
    about = "Bring the clock onto a saved Wi-Fi network or its setup hotspot"
)]
pub struct Cli {
    /// Network mode: auto, connect, hotspot, list or forget
    #[arg(long, short = 'm')]
    pub mode: Option<RequestedMode>,

    /// Saved network to remove in forget mode (prompts when omitted)
    #[arg(long, short = 'n')]
    pub network: Option<String>,

    /// Config file (defaults to ~/.config/jetclock/config.yaml)
    #[arg(long, short = 'c')]
    pub config: Option<PathBuf>,
}
