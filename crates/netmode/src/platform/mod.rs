//! Platform implementations of the wireless capabilities.
//!
//! Currently NetworkManager through `nmcli`, which is what the device image
//! ships. Commands run through [`CommandRunner`] so the parsing and call
//! sequences can be tested without a wireless card.

pub mod nmcli;

pub use nmcli::NmcliBackend;

use crate::error::BackendError;
use async_trait::async_trait;

/// Output from a finished command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    /// Exit code; `None` if the process was killed by a signal
    pub status: Option<i32>,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.status == Some(0)
    }
}

/// Runs external programs.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, program: &str, args: &[String]) -> Result<CommandOutput, BackendError>;
}

/// Production runner using `tokio::process`.
///
/// Children are killed when the future is dropped, so an attempt that times
/// out does not leave `nmcli` running.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioCommandRunner;

#[async_trait]
impl CommandRunner for TokioCommandRunner {
    async fn run(&self, program: &str, args: &[String]) -> Result<CommandOutput, BackendError> {
        tracing::trace!(program, ?args, "running command");

        let output = tokio::process::Command::new(program)
            .args(args)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    BackendError::CommandNotFound(program.to_string())
                } else {
                    BackendError::Io {
                        program: program.to_string(),
                        message: e.to_string(),
                    }
                }
            })?;

        Ok(CommandOutput {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            status: output.status.code(),
        })
    }
}
