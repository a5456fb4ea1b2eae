//! Tracing subscriber setup.
//!
//! Development gets human-readable output; production and test get JSON lines
//! for log ingestion. `RUST_LOG`, when set, overrides the configured level.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{Environment, LogLevel};

/// Returns the default filter directive for a configured log level.
///
/// `tracing` has no `fatal` level; it maps to `error`. `silent` disables output.
pub fn filter_directive(level: LogLevel) -> String {
    let level = match level {
        LogLevel::Fatal | LogLevel::Error => "error",
        LogLevel::Warn => "warn",
        LogLevel::Info => "info",
        LogLevel::Debug => "debug",
        LogLevel::Trace => "trace",
        LogLevel::Silent => return "off".to_string(),
    };
    format!("{level},tower_http={level}")
}

/// Installs the global subscriber.
///
/// Returns an error if a global subscriber is already installed.
pub fn init(
    level: LogLevel,
    environment: Environment,
) -> Result<(), tracing_subscriber::util::TryInitError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directive(level)));

    let registry = tracing_subscriber::registry().with(filter);
    match environment {
        Environment::Development => registry.with(tracing_subscriber::fmt::layer()).try_init(),
        Environment::Production | Environment::Test => registry
            .with(tracing_subscriber::fmt::layer().json().with_current_span(false))
            .try_init(),
    }
}
