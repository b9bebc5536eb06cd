//! Error types for portwatch-init
//!
//! Only fatal conditions live here. "Already exists" and per-collection
//! failures are outcomes, recorded in the bootstrap summary instead.

/// Fatal errors that abort a bootstrap run
#[derive(Debug, thiserror::Error)]
pub enum BootstrapError {
    /// Store unreachable, or the connection dropped mid-run
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Invalid user spec: {0}")]
    InvalidUserSpec(String),

    #[error("Invalid plan: {0}")]
    InvalidPlan(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

// Implement From conversions for common error types

impl From<toml::de::Error> for BootstrapError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(format!("Plan file parse error: {}", err))
    }
}

/// Result type alias for bootstrap operations
pub type Result<T> = std::result::Result<T, BootstrapError>;
