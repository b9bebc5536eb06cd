//! Bootstrap plan: what a single run provisions
//!
//! A plan names the target database, the application user and the ordered
//! list of collections. Nothing here is hard-coded; the two historical seed
//! layouts are just two plans (see `config/`).

mod role;
mod secret;

pub use role::{Role, UnknownRole};
pub use secret::Secret;

use serde::Serialize;
use std::collections::HashSet;

use crate::types::{BootstrapError, Result};

/// Longest database name MongoDB accepts, in bytes
pub const MAX_DATABASE_NAME_LEN: usize = 63;

const FORBIDDEN_DATABASE_CHARS: &[char] = &['/', '\\', '.', ' ', '"', '$', '*', '<', '>', ':', '|', '?', '\0'];

/// Application user to create in the target database
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserSpec {
    pub username: String,

    pub password: Secret,

    pub role: Role,

    /// Database the role is granted on
    pub scope: String,
}

impl UserSpec {
    pub fn new(username: impl Into<String>, password: impl Into<Secret>, role: Role, scope: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            role,
            scope: scope.into(),
        }
    }

    /// Check the spec against the database it will be created in
    pub fn validate(&self, database: &str) -> Result<()> {
        if self.username.trim().is_empty() {
            return Err(BootstrapError::InvalidUserSpec("username must not be empty".into()));
        }
        if self.password.is_empty() {
            return Err(BootstrapError::InvalidUserSpec(format!(
                "password for user '{}' must not be empty",
                self.username
            )));
        }
        if self.scope != database {
            return Err(BootstrapError::InvalidUserSpec(format!(
                "role scope '{}' does not match target database '{}'",
                self.scope, database
            )));
        }
        Ok(())
    }
}

/// Everything one bootstrap run provisions
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BootstrapPlan {
    pub database: String,
    pub user: UserSpec,
    /// Created in this order
    pub collections: Vec<String>,
}

impl BootstrapPlan {
    pub fn builder(database: impl Into<String>) -> BootstrapPlanBuilder {
        BootstrapPlanBuilder::new(database)
    }

    /// Validate the whole plan. Runs before any store call.
    pub fn validate(&self) -> Result<()> {
        validate_database_name(&self.database)?;
        self.user.validate(&self.database)?;

        if self.collections.is_empty() {
            return Err(BootstrapError::InvalidPlan("no collections declared".into()));
        }

        let mut seen = HashSet::with_capacity(self.collections.len());
        for name in &self.collections {
            if name.is_empty() {
                return Err(BootstrapError::InvalidPlan("collection name must not be empty".into()));
            }
            if !seen.insert(name.as_str()) {
                return Err(BootstrapError::InvalidPlan(format!(
                    "collection '{}' declared more than once",
                    name
                )));
            }
        }

        Ok(())
    }
}

fn validate_database_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(BootstrapError::InvalidPlan("database name must not be empty".into()));
    }
    if name.len() > MAX_DATABASE_NAME_LEN {
        return Err(BootstrapError::InvalidPlan(format!(
            "database name '{}' is longer than {} bytes",
            name, MAX_DATABASE_NAME_LEN
        )));
    }
    if let Some(c) = name.chars().find(|c| FORBIDDEN_DATABASE_CHARS.contains(c)) {
        return Err(BootstrapError::InvalidPlan(format!(
            "database name '{}' contains forbidden character {:?}",
            name, c
        )));
    }
    Ok(())
}

/// Builder for [`BootstrapPlan`]
///
/// The role scope defaults to the target database.
#[derive(Debug, Clone, Default)]
pub struct BootstrapPlanBuilder {
    database: String,
    username: Option<String>,
    password: Option<Secret>,
    role: Role,
    scope: Option<String>,
    collections: Vec<String>,
}

impl BootstrapPlanBuilder {
    pub fn new(database: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            ..Default::default()
        }
    }

    pub fn user(mut self, username: impl Into<String>, password: impl Into<Secret>) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    pub fn role(mut self, role: Role) -> Self {
        self.role = role;
        self
    }

    pub fn scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }

    pub fn collection(mut self, name: impl Into<String>) -> Self {
        self.collections.push(name.into());
        self
    }

    pub fn collections<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.collections.extend(names.into_iter().map(Into::into));
        self
    }

    /// Assemble and validate the plan
    pub fn build(self) -> Result<BootstrapPlan> {
        let username = self
            .username
            .ok_or_else(|| BootstrapError::InvalidUserSpec("no user declared".into()))?;
        let password = self.password.unwrap_or_default();
        let scope = self.scope.unwrap_or_else(|| self.database.clone());

        let plan = BootstrapPlan {
            user: UserSpec::new(username, password, self.role, scope),
            database: self.database,
            collections: self.collections,
        };
        plan.validate()?;
        Ok(plan)
    }
}
