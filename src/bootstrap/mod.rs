//! Bootstrap initializer
//!
//! Provisions the application user and collections described by a
//! [`BootstrapPlan`]. Every step is create-if-missing, so running the same
//! plan twice is safe, including from two replicas at once.
//!
//! Run order:
//! 1. Validate the plan (no store call on failure)
//! 2. Ping the target database (abort on failure)
//! 3. Create the user ("already exists" is fine)
//! 4. Create each collection in declared order, collecting per-item failures
//!
//! Nothing is rolled back.

mod summary;

pub use summary::{
    BootstrapSummary, CollectionCreationError, CollectionOutcome, FailureReport, RunStatus,
    UserReport, VerifyReport,
};

use chrono::Utc;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::db::{CreateOutcome, ProvisioningStore, StoreError};
use crate::plan::BootstrapPlan;
use crate::types::{BootstrapError, Result};

/// Runs bootstrap plans against a store
pub struct Bootstrapper<S: ProvisioningStore> {
    store: Arc<S>,
}

impl<S: ProvisioningStore> Bootstrapper<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Provision `plan`
    pub async fn run(&self, plan: &BootstrapPlan) -> Result<BootstrapSummary> {
        let started_at = Utc::now();
        plan.validate()?;

        info!(
            database = %plan.database,
            username = %plan.user.username,
            role = %plan.user.role,
            collections = plan.collections.len(),
            "Starting bootstrap"
        );

        self.connect(&plan.database).await?;

        let user_outcome = match self.store.create_user(&plan.database, &plan.user).await {
            Ok(CreateOutcome::Created) => {
                info!(
                    username = %plan.user.username,
                    role = %plan.user.role,
                    scope = %plan.user.scope,
                    "User created"
                );
                CreateOutcome::Created
            }
            Ok(CreateOutcome::AlreadyExists) => {
                info!(username = %plan.user.username, "User already exists, leaving it unchanged");
                CreateOutcome::AlreadyExists
            }
            Err(StoreError::Unreachable(msg)) => {
                error!(username = %plan.user.username, "Connection lost while creating user: {}", msg);
                return Err(BootstrapError::Connection(msg));
            }
            Err(e @ StoreError::Rejected { .. }) => {
                error!(username = %plan.user.username, "User creation rejected: {}", e);
                return Err(BootstrapError::InvalidUserSpec(format!(
                    "user '{}' rejected: {}",
                    plan.user.username, e
                )));
            }
        };

        let mut collections = Vec::with_capacity(plan.collections.len());
        for name in &plan.collections {
            let outcome = match self.store.create_collection(&plan.database, name).await {
                Ok(created) => {
                    debug!(collection = %name, outcome = %created, "Collection ensured");
                    CollectionOutcome::from_create(name, created)
                }
                Err(StoreError::Unreachable(msg)) => {
                    error!(collection = %name, "Connection lost while creating collection: {}", msg);
                    return Err(BootstrapError::Connection(msg));
                }
                Err(e @ StoreError::Rejected { .. }) => {
                    let failure = CollectionCreationError {
                        name: name.clone(),
                        reason: e.to_string(),
                    };
                    warn!(collection = %name, "{}", failure);
                    CollectionOutcome::Failed(failure)
                }
            };
            collections.push(outcome);
        }

        let summary = BootstrapSummary::new(
            plan.database.clone(),
            UserReport {
                username: plan.user.username.clone(),
                role: plan.user.role,
                scope: plan.user.scope.clone(),
                outcome: user_outcome,
            },
            collections,
            started_at,
        );

        info!(
            database = %summary.database,
            status = %summary.status,
            failed = summary.failures().count(),
            "Bootstrap finished"
        );

        Ok(summary)
    }

    /// Check which declared collections exist. Read-only.
    pub async fn verify(&self, plan: &BootstrapPlan) -> Result<VerifyReport> {
        plan.validate()?;
        self.connect(&plan.database).await?;

        let existing: HashSet<String> = self
            .store
            .list_collections(&plan.database)
            .await
            .map_err(|e| match e {
                StoreError::Unreachable(msg) => BootstrapError::Connection(msg),
                other => BootstrapError::Connection(format!("listing collections failed: {}", other)),
            })?
            .into_iter()
            .collect();

        let (present, missing): (Vec<String>, Vec<String>) = plan
            .collections
            .iter()
            .cloned()
            .partition(|name| existing.contains(name));

        for name in &missing {
            warn!(database = %plan.database, collection = %name, "Declared collection missing");
        }
        info!(
            database = %plan.database,
            present = present.len(),
            missing = missing.len(),
            "Verify finished"
        );

        Ok(VerifyReport {
            database: plan.database.clone(),
            present,
            missing,
        })
    }

    async fn connect(&self, database: &str) -> Result<()> {
        self.store.ping(database).await.map_err(|e| {
            error!(database, "Store unreachable: {}", e);
            BootstrapError::Connection(e.to_string())
        })
    }
}
