use std::env::var;

use tracing::{level_filters::LevelFilter, warn};
use tracing_subscriber::{Layer, filter::EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Output format of log lines, picked with `RUST_LOG_FORMAT`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Compact,
    Json,
}

impl LogFormat {
    pub fn from_env_value(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "json" => LogFormat::Json,
            _ => LogFormat::Compact,
        }
    }
}

/// Initialize tracing at `info`, overridable through `RUST_LOG`
pub fn init() {
    init_with_level(LevelFilter::INFO);
}

/// Initialize tracing subscriber with `level` as the default directive.
///
/// Does nothing if a global subscriber is already installed.
pub fn init_with_level(level: LevelFilter) {
    let env_filter = EnvFilter::builder().with_default_directive(level.into()).from_env_lossy();

    let log_format = var("RUST_LOG_FORMAT").map(|value| LogFormat::from_env_value(&value));

    let log_layer = match log_format.as_ref().copied().unwrap_or_default() {
        LogFormat::Json => tracing_subscriber::fmt::layer().json().with_filter(env_filter).boxed(),
        LogFormat::Compact => tracing_subscriber::fmt::layer()
            .compact()
            .with_target(false)
            .with_filter(env_filter)
            .boxed(),
    };

    if tracing_subscriber::registry().with(log_layer).try_init().is_err() {
        return;
    }

    if let Err(error) = log_format {
        if !matches!(error, std::env::VarError::NotPresent) {
            warn!("Failed to read RUST_LOG_FORMAT, falling back to compact: {error}");
        }
    }
}
