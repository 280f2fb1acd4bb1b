//! Tracing subscriber setup for the binary.

use tracing::info;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::{Layer, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::{LogFormat, LoggingConfig};

/// Environment variable that overrides every other filter source.
pub const LOG_ENV: &str = "SMART_EMS_LOG";

/// Picks the filter directive: `SMART_EMS_LOG`, then `RUST_LOG`, then the
/// configured filter. Empty variables are ignored.
pub fn filter_directive(
    env_override: Option<String>,
    rust_log: Option<String>,
    configured: &str,
) -> String {
    env_override
        .filter(|d| !d.trim().is_empty())
        .or_else(|| rust_log.filter(|d| !d.trim().is_empty()))
        .unwrap_or_else(|| configured.to_string())
}

/// Installs the global subscriber, writing to stderr.
///
/// With `interactive` set (the terminal dashboard owns the screen), nothing
/// is installed unless `SMART_EMS_LOG` is set explicitly. Returns whether a
/// subscriber was installed. An invalid directive falls back to `info`.
pub fn init_tracing(config: &LoggingConfig, interactive: bool) -> bool {
    let env_override = std::env::var(LOG_ENV).ok();
    if interactive && env_override.is_none() {
        return false;
    }
    let directive = filter_directive(env_override, std::env::var("RUST_LOG").ok(), &config.filter);
    let filter = EnvFilter::try_new(&directive).unwrap_or_else(|err| {
        eprintln!("invalid log filter \"{directive}\" ({err}); defaulting to info");
        EnvFilter::new("info")
    });

    let fmt_layer = match config.format {
        LogFormat::Json => fmt::layer()
            .with_target(false)
            .json()
            .with_writer(std::io::stderr)
            .boxed(),
        LogFormat::Pretty => fmt::layer()
            .with_target(true)
            .with_writer(std::io::stderr)
            .boxed(),
    };

    let installed = tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init()
        .is_ok();
    if installed {
        info!(filter = %directive, format = ?config.format, "tracing initialised");
    }
    installed
}
