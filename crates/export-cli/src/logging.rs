//! stderr logging setup. stdout carries progress for the user.

use clap::ValueEnum;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Build the filter from `RUST_LOG` and `level`.
///
/// A parseable `RUST_LOG` wins; an unparseable one falls back to `level` alone. Without
/// `RUST_LOG`, noisy HTTP crates are held at `warn`.
#[must_use]
pub fn build_env_filter(rust_log: Option<&str>, level: &str) -> EnvFilter {
    match rust_log {
        Some(directives) => {
            EnvFilter::try_new(directives).unwrap_or_else(|_| EnvFilter::new(level))
        }
        None => EnvFilter::try_new(format!("{level},hyper=warn,reqwest=warn"))
            .unwrap_or_else(|_| EnvFilter::new(level)),
    }
}

/// Install the global subscriber, writing to stderr.
pub fn init(level: &str, format: LogFormat) {
    let rust_log = std::env::var("RUST_LOG").ok();
    let filter = build_env_filter(rust_log.as_deref(), level);
    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Text => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_ansi(false),
            )
            .init(),
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_current_span(false),
            )
            .init(),
    }
}
