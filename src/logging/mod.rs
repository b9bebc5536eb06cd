//! Logging setup
//!
//! Logs go to stderr so stdout only carries the run summary.

use clap::ValueEnum;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Log line format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum LogFormat {
    #[default]
    Text,
    /// One JSON object per line, for container log collectors
    Json,
}

/// Default filter when RUST_LOG is unset
pub fn default_filter(level: &str) -> String {
    format!("portwatch_init={},info", level)
}

/// Install the global tracing subscriber
pub fn init(level: &str, format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter(level).into());
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Text => registry
            .with(fmt::layer().with_writer(std::io::stderr))
            .init(),
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init(),
    }
}
