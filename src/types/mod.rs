//! Shared types for portwatch-init

mod error;

pub use error::{BootstrapError, Result};
