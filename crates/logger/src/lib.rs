use std::env::var;

use tracing::{debug, level_filters::LevelFilter};
use tracing_subscriber::{Layer, filter::EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Output format of the log layer, selected with `RUST_LOG_FORMAT`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Compact,
}

impl LogFormat {
    pub fn from_env() -> Self {
        match var("RUST_LOG_FORMAT").unwrap_or_default().to_ascii_lowercase().as_str() {
            "json" => LogFormat::Json,
            _ => LogFormat::Compact,
        }
    }
}

/// Initialize tracing at `info`, overridable through `RUST_LOG`.
pub fn init_tracing() {
    init_with_level(LevelFilter::INFO);
}

/// Initialize tracing with `level` as the default directive.
///
/// Calling this more than once keeps the first subscriber.
pub fn init_with_level(level: LevelFilter) {
    let env_filter = EnvFilter::builder().with_default_directive(level.into()).from_env_lossy();
    let format = LogFormat::from_env();

    let log_layer = match format {
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .with_current_span(false)
            .with_filter(env_filter)
            .boxed(),
        LogFormat::Compact => tracing_subscriber::fmt::layer()
            .compact()
            .without_time()
            .with_target(false)
            .with_filter(env_filter)
            .boxed(),
    };

    if tracing_subscriber::registry().with(log_layer).try_init().is_ok() {
        debug!(?format, %level, "Tracing initialized");
    }
}
