//! Tracing setup for the device binary.

use tracing_subscriber::EnvFilter;

/// Install the global subscriber. `RUST_LOG` wins over the configured level.
///
/// Logs go to stderr; stdout carries the event stream for the UI.
pub fn init(level: &str) {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(default_directives(level))),
        )
        .init();
}

fn default_directives(level: &str) -> String {
    let level = level.trim();
    let level = if level.is_empty() { "info" } else { level };
    format!("{},jetclock=debug", level.to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_directives() {
        assert_eq!(default_directives("warn"), "warn,jetclock=debug");
        assert_eq!(default_directives("DEBUG"), "debug,jetclock=debug");
        assert_eq!(default_directives(" "), "info,jetclock=debug");
    }
}
