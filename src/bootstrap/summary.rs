//! Outcome reporting for bootstrap and verify runs

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

use crate::db::CreateOutcome;
use crate::plan::Role;
use crate::types::BootstrapError;

/// Overall result of a run as seen by the operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RunStatus {
    /// Everything provisioned or already present
    Pass,
    /// At least one collection failed, the rest were provisioned
    Partial,
    /// A fatal error aborted the run
    Fail,
}

impl RunStatus {
    /// Process exit code for the CLI
    pub fn exit_code(&self) -> i32 {
        match self {
            RunStatus::Pass => 0,
            RunStatus::Fail => 1,
            RunStatus::Partial => 2,
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunStatus::Pass => write!(f, "PASS"),
            RunStatus::Partial => write!(f, "PARTIAL"),
            RunStatus::Fail => write!(f, "FAIL"),
        }
    }
}

/// A collection the store refused to create
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[error("failed to create collection '{name}': {reason}")]
pub struct CollectionCreationError {
    pub name: String,
    pub reason: String,
}

/// What happened to one declared collection
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CollectionOutcome {
    Created { name: String },
    AlreadyExists { name: String },
    Failed(CollectionCreationError),
}

impl CollectionOutcome {
    pub fn from_create(name: &str, outcome: CreateOutcome) -> Self {
        match outcome {
            CreateOutcome::Created => Self::Created { name: name.to_string() },
            CreateOutcome::AlreadyExists => Self::AlreadyExists { name: name.to_string() },
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Created { name } | Self::AlreadyExists { name } => name,
            Self::Failed(err) => &err.name,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

/// What happened to the application user
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserReport {
    pub username: String,
    pub role: Role,
    pub scope: String,
    pub outcome: CreateOutcome,
}

/// Result of one bootstrap run
#[derive(Debug, Clone, Serialize)]
pub struct BootstrapSummary {
    pub database: String,
    pub user: UserReport,
    /// In the order the collections were declared
    pub collections: Vec<CollectionOutcome>,
    pub status: RunStatus,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl BootstrapSummary {
    pub fn new(
        database: String,
        user: UserReport,
        collections: Vec<CollectionOutcome>,
        started_at: DateTime<Utc>,
    ) -> Self {
        let status = if collections.iter().any(CollectionOutcome::is_failure) {
            RunStatus::Partial
        } else {
            RunStatus::Pass
        };
        Self {
            database,
            user,
            collections,
            status,
            started_at,
            finished_at: Utc::now(),
        }
    }

    pub fn failures(&self) -> impl Iterator<Item = &CollectionCreationError> {
        self.collections.iter().filter_map(|c| match c {
            CollectionOutcome::Failed(err) => Some(err),
            _ => None,
        })
    }

    pub fn collection(&self, name: &str) -> Option<&CollectionOutcome> {
        self.collections.iter().find(|c| c.name() == name)
    }

    /// True when the run changed nothing: user and every collection
    /// already existed
    pub fn is_noop(&self) -> bool {
        self.user.outcome == CreateOutcome::AlreadyExists
            && self
                .collections
                .iter()
                .all(|c| matches!(c, CollectionOutcome::AlreadyExists { .. }))
    }
}

impl fmt::Display for BootstrapSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Bootstrap of database '{}': {}", self.database, self.status)?;
        writeln!(
            f,
            "  user '{}' ({} on '{}'): {}",
            self.user.username, self.user.role, self.user.scope, self.user.outcome
        )?;
        for collection in &self.collections {
            match collection {
                CollectionOutcome::Created { name } => writeln!(f, "  collection '{}': created", name)?,
                CollectionOutcome::AlreadyExists { name } => {
                    writeln!(f, "  collection '{}': already exists", name)?
                }
                CollectionOutcome::Failed(err) => {
                    writeln!(f, "  collection '{}': FAILED ({})", err.name, err.reason)?
                }
            }
        }
        Ok(())
    }
}

/// Result of checking the declared collections against the store
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerifyReport {
    pub database: String,
    pub present: Vec<String>,
    pub missing: Vec<String>,
}

impl VerifyReport {
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }

    pub fn status(&self) -> RunStatus {
        if self.is_complete() {
            RunStatus::Pass
        } else {
            RunStatus::Partial
        }
    }
}

impl fmt::Display for VerifyReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Verify of database '{}': {}", self.database, self.status())?;
        for name in &self.present {
            writeln!(f, "  collection '{}': present", name)?;
        }
        for name in &self.missing {
            writeln!(f, "  collection '{}': MISSING", name)?;
        }
        Ok(())
    }
}

/// Report printed when a fatal error aborts the run
#[derive(Debug, Clone, Serialize)]
pub struct FailureReport {
    pub database: String,
    pub status: RunStatus,
    pub error: String,
}

impl FailureReport {
    pub fn new(database: impl Into<String>, error: &BootstrapError) -> Self {
        Self {
            database: database.into(),
            status: RunStatus::Fail,
            error: error.to_string(),
        }
    }
}

impl fmt::Display for FailureReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Bootstrap of database '{}': {}", self.database, self.status)?;
        writeln!(f, "  {}", self.error)
    }
}
