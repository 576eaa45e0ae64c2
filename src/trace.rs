//! Installation of the process-wide `tracing` subscriber.

use std::io::IsTerminal;

use tracing_subscriber::EnvFilter;

/// The environment variable that overrides the level chosen on the command line.
pub const LOG_ENV: &str = "LEEF_LOG";

/// Builds the filter directives for the crate's own log output.
///
/// A non-empty `LEEF_LOG` takes precedence over `level`.
pub fn levels(level: &str) -> String {
    std::env::var(LOG_ENV)
        .ok()
        .filter(|levels| !levels.is_empty())
        .unwrap_or_else(|| match level {
            "off" => "off".to_owned(),
            level => format!("leef_codec={level}"),
        })
}

/// Installs a formatting subscriber that writes to stderr.
///
/// Stdout carries the converted data, so logs never go there. Installing a
/// second subscriber is a no-op.
pub fn init(levels: &str) {
    let color = std::io::stderr().is_terminal();

    _ = tracing_subscriber::fmt()
        .with_ansi(color)
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::new(levels))
        .try_init();
}
