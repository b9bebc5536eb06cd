//! In-memory provisioning store
//!
//! Follows MongoDB's naming rules and "already exists" behavior closely
//! enough to rehearse a plan. Faults can be injected for testing.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use tokio::sync::RwLock;

use crate::db::store::{CreateOutcome, ProvisioningStore, StoreError};
use crate::plan::{Role, UserSpec};

/// A user as recorded by the in-memory store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredUser {
    pub username: String,
    /// (role, database) pairs
    pub grants: Vec<(Role, String)>,
}

/// One call made against the store, in order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCall {
    Ping(String),
    CreateUser { database: String, username: String },
    CreateCollection { database: String, name: String },
    ListCollections(String),
}

impl StoreCall {
    pub fn is_mutation(&self) -> bool {
        matches!(self, StoreCall::CreateUser { .. } | StoreCall::CreateCollection { .. })
    }
}

#[derive(Debug, Default)]
struct Database {
    users: BTreeMap<String, StoredUser>,
    collections: BTreeSet<String>,
}

#[derive(Debug, Default)]
struct Faults {
    unreachable: bool,
    /// Drop the connection after this many successful calls
    disconnect_after: Option<usize>,
    rejected_collections: HashSet<String>,
    rejected_users: HashSet<String>,
}

#[derive(Debug, Default)]
struct State {
    databases: BTreeMap<String, Database>,
    faults: Faults,
    calls: Vec<StoreCall>,
}

/// In-memory store
#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: RwLock<State>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store whose every call fails as unreachable
    pub fn unreachable() -> Self {
        let state = State {
            faults: Faults {
                unreachable: true,
                ..Default::default()
            },
            ..Default::default()
        };
        Self {
            state: RwLock::new(state),
        }
    }

    pub async fn set_unreachable(&self, unreachable: bool) {
        self.state.write().await.faults.unreachable = unreachable;
    }

    /// Lose the connection once `calls` more calls have succeeded
    pub async fn disconnect_after(&self, calls: usize) {
        let mut state = self.state.write().await;
        let already = state.calls.len();
        state.faults.disconnect_after = Some(already + calls);
    }

    /// Make `create_collection` reject `name`
    pub async fn reject_collection(&self, name: impl Into<String>) {
        self.state.write().await.faults.rejected_collections.insert(name.into());
    }

    /// Make `create_user` reject `username`
    pub async fn reject_user(&self, username: impl Into<String>) {
        self.state.write().await.faults.rejected_users.insert(username.into());
    }

    pub async fn collections(&self, database: &str) -> Vec<String> {
        self.state
            .read()
            .await
            .databases
            .get(database)
            .map(|db| db.collections.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub async fn user(&self, database: &str, username: &str) -> Option<StoredUser> {
        self.state
            .read()
            .await
            .databases
            .get(database)
            .and_then(|db| db.users.get(username).cloned())
    }

    /// Every call received so far
    pub async fn calls(&self) -> Vec<StoreCall> {
        self.state.read().await.calls.clone()
    }

    /// Seed a collection without recording a call
    pub async fn insert_collection(&self, database: &str, name: &str) {
        self.state
            .write()
            .await
            .databases
            .entry(database.to_string())
            .or_default()
            .collections
            .insert(name.to_string());
    }
}

impl State {
    /// Record `call`, failing it if the store is (or just became) unreachable
    fn record(&mut self, call: StoreCall) -> Result<(), StoreError> {
        if let Some(limit) = self.faults.disconnect_after {
            if self.calls.len() >= limit {
                self.faults.unreachable = true;
            }
        }
        self.calls.push(call);
        if self.faults.unreachable {
            return Err(StoreError::Unreachable("connection refused".into()));
        }
        Ok(())
    }
}

/// MongoDB collection naming rules
fn check_collection_name(name: &str) -> Result<(), StoreError> {
    let invalid = |reason: &str| StoreError::Rejected {
        code: Some(73),
        message: format!("Invalid collection name '{}': {}", name, reason),
    };

    if name.is_empty() {
        return Err(invalid("empty"));
    }
    if name.contains('$') {
        return Err(invalid("contains '$'"));
    }
    if name.contains('\0') {
        return Err(invalid("contains null character"));
    }
    if name.starts_with("system.") {
        return Err(invalid("'system.' prefix is reserved"));
    }
    Ok(())
}

#[async_trait::async_trait]
impl ProvisioningStore for InMemoryStore {
    async fn ping(&self, database: &str) -> Result<(), StoreError> {
        self.state.write().await.record(StoreCall::Ping(database.to_string()))
    }

    async fn create_user(&self, database: &str, user: &UserSpec) -> Result<CreateOutcome, StoreError> {
        let mut state = self.state.write().await;
        state.record(StoreCall::CreateUser {
            database: database.to_string(),
            username: user.username.clone(),
        })?;

        if state.faults.rejected_users.contains(&user.username) {
            return Err(StoreError::rejected(format!("createUser refused for '{}'", user.username)));
        }

        let db = state.databases.entry(database.to_string()).or_default();
        if db.users.contains_key(&user.username) {
            return Ok(CreateOutcome::AlreadyExists);
        }
        db.users.insert(
            user.username.clone(),
            StoredUser {
                username: user.username.clone(),
                grants: vec![(user.role, user.scope.clone())],
            },
        );
        Ok(CreateOutcome::Created)
    }

    async fn create_collection(&self, database: &str, name: &str) -> Result<CreateOutcome, StoreError> {
        let mut state = self.state.write().await;
        state.record(StoreCall::CreateCollection {
            database: database.to_string(),
            name: name.to_string(),
        })?;

        check_collection_name(name)?;
        if state.faults.rejected_collections.contains(name) {
            return Err(StoreError::Rejected {
                code: Some(73),
                message: format!("Invalid collection name '{}'", name),
            });
        }

        let db = state.databases.entry(database.to_string()).or_default();
        if db.collections.insert(name.to_string()) {
            Ok(CreateOutcome::Created)
        } else {
            Ok(CreateOutcome::AlreadyExists)
        }
    }

    async fn list_collections(&self, database: &str) -> Result<Vec<String>, StoreError> {
        let mut state = self.state.write().await;
        state.record(StoreCall::ListCollections(database.to_string()))?;
        Ok(state
            .databases
            .get(database)
            .map(|db| db.collections.iter().cloned().collect())
            .unwrap_or_default())
    }
}
