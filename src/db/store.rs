//! Provisioning store seam
//!
//! The bootstrap routine only needs four operations from the database
//! engine. `MongoStore` talks to a real server, `InMemoryStore` backs tests
//! and rehearsals.

use std::fmt;

use serde::Serialize;

use crate::plan::UserSpec;

/// Result of an idempotent create
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CreateOutcome {
    Created,
    AlreadyExists,
}

impl fmt::Display for CreateOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CreateOutcome::Created => write!(f, "created"),
            CreateOutcome::AlreadyExists => write!(f, "already exists"),
        }
    }
}

/// Failure reported by a store operation
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// Server cannot be reached or the connection was lost
    #[error("store unreachable: {0}")]
    Unreachable(String),

    /// Server answered and refused the operation
    #[error("rejected by store{}: {message}", code_suffix(.code))]
    Rejected { code: Option<i32>, message: String },
}

fn code_suffix(code: &Option<i32>) -> String {
    code.map(|c| format!(" (code {})", c)).unwrap_or_default()
}

impl StoreError {
    pub fn rejected(message: impl Into<String>) -> Self {
        Self::Rejected {
            code: None,
            message: message.into(),
        }
    }

    pub fn is_unreachable(&self) -> bool {
        matches!(self, StoreError::Unreachable(_))
    }
}

/// Operations the bootstrap routine performs against a database engine.
///
/// Both create operations must report an existing user/collection as
/// [`CreateOutcome::AlreadyExists`] rather than as an error.
#[async_trait::async_trait]
pub trait ProvisioningStore: Send + Sync {
    /// Check the server answers for `database`
    async fn ping(&self, database: &str) -> Result<(), StoreError>;

    /// Create `user` in `database`, granting its role on `user.scope` only
    async fn create_user(&self, database: &str, user: &UserSpec) -> Result<CreateOutcome, StoreError>;

    async fn create_collection(&self, database: &str, name: &str) -> Result<CreateOutcome, StoreError>;

    async fn list_collections(&self, database: &str) -> Result<Vec<String>, StoreError>;
}
