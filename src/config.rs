//! Configuration for portwatch-init
//!
//! CLI arguments and environment variables via clap, plus an optional TOML
//! plan file. Explicit arguments win over the plan file, the plan file wins
//! over built-in defaults.

use clap::{Parser, ValueEnum};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::logging::LogFormat;
use crate::plan::{BootstrapPlan, Role, Secret};
use crate::types::{BootstrapError, Result};

pub const DEFAULT_DATABASE: &str = "teqplay";
pub const DEFAULT_USERNAME: &str = "user";
pub const DEFAULT_COLLECTIONS: &[&str] = &["ships_latest_data", "port_entry_events", "port_exit_events"];

/// Summary rendering on stdout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// portwatch-init - provision the port-watch MongoDB database
///
/// Creates the application user and the declared collections. Safe to
/// re-run against an initialized database.
#[derive(Parser, Debug, Clone)]
#[command(name = "portwatch-init")]
#[command(about = "Idempotent MongoDB bootstrap for the port-watch service")]
pub struct Args {
    /// MongoDB connection URI (needs userAdmin rights on the target database)
    #[arg(long, env = "MONGODB_URI", default_value = "mongodb://localhost:27017")]
    pub mongodb_uri: String,

    /// TOML plan file declaring database, user and collections
    #[arg(long, env = "SEED_PLAN")]
    pub plan: Option<PathBuf>,

    /// Target database name [default: teqplay]
    #[arg(long, env = "MONGODB_DB")]
    pub database: Option<String>,

    /// Application username [default: user]
    #[arg(long, env = "SEED_USERNAME")]
    pub username: Option<String>,

    /// Application user password
    #[arg(long, env = "SEED_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Role granted on the target database (read, readWrite, dbAdmin, dbOwner) [default: readWrite]
    #[arg(long, env = "SEED_ROLE")]
    pub role: Option<String>,

    /// Database the role is scoped to [default: the target database]
    #[arg(long, env = "SEED_SCOPE")]
    pub scope: Option<String>,

    /// Comma-separated collection names, created in order
    /// [default: ships_latest_data,port_entry_events,port_exit_events]
    #[arg(long, env = "SEED_COLLECTIONS", value_delimiter = ',')]
    pub collections: Vec<String>,

    /// Server selection and connect timeout in milliseconds
    #[arg(long, env = "CONNECT_TIMEOUT_MS", default_value = "3000")]
    pub connect_timeout_ms: u64,

    /// Check the declared collections exist after provisioning
    #[arg(long, env = "SEED_VERIFY", default_value = "false")]
    pub verify: bool,

    /// Validate and print the plan without connecting
    #[arg(long, env = "DRY_RUN", default_value = "false")]
    pub dry_run: bool,

    /// Summary format
    #[arg(long, env = "OUTPUT", value_enum, default_value_t = OutputFormat::Text)]
    pub output: OutputFormat,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Log format
    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

impl Args {
    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.connect_timeout_ms == 0 {
            return Err(BootstrapError::Config(
                "CONNECT_TIMEOUT_MS must be greater than zero".to_string(),
            ));
        }
        if self.mongodb_uri.trim().is_empty() {
            return Err(BootstrapError::Config("MONGODB_URI must not be empty".to_string()));
        }
        Ok(())
    }

    /// Best-effort database name for failure reports: the flag, else the
    /// plan file if it loads, else the default
    pub fn target_database(&self) -> String {
        let from_file = self
            .plan
            .as_deref()
            .and_then(|path| PlanFile::load(path).ok())
            .and_then(|file| file.database);
        self.database
            .clone()
            .or(from_file)
            .unwrap_or_else(|| DEFAULT_DATABASE.to_string())
    }

    /// Collection names given on the command line, trimmed
    pub fn collection_list(&self) -> Vec<String> {
        self.collections
            .iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    }

    /// Load the plan file (if any) and merge it with the arguments
    pub fn resolve_plan(&self) -> Result<BootstrapPlan> {
        let file = match &self.plan {
            Some(path) => PlanFile::load(path)?,
            None => PlanFile::default(),
        };
        self.merge(file)
    }

    /// Merge arguments over `file` and fill the rest with defaults
    pub fn merge(&self, file: PlanFile) -> Result<BootstrapPlan> {
        let PlanFile {
            database,
            collections,
            user,
        } = file;

        let database = self
            .database
            .clone()
            .or(database)
            .unwrap_or_else(|| DEFAULT_DATABASE.to_string());

        let username = self
            .username
            .clone()
            .or(user.username)
            .unwrap_or_else(|| DEFAULT_USERNAME.to_string());

        let password = self
            .password
            .clone()
            .map(Secret::from)
            .or(user.password)
            .ok_or_else(|| {
                BootstrapError::InvalidUserSpec(format!(
                    "no password for user '{}': set SEED_PASSWORD or user.password in the plan file",
                    username
                ))
            })?;

        let role = match self.role.as_deref().or(user.role.as_deref()) {
            Some(name) => name
                .parse::<Role>()
                .map_err(|e| BootstrapError::InvalidUserSpec(e.to_string()))?,
            None => Role::default(),
        };

        let cli_collections = self.collection_list();
        let collections = if !cli_collections.is_empty() {
            cli_collections
        } else if !collections.is_empty() {
            collections
        } else {
            DEFAULT_COLLECTIONS.iter().map(|s| s.to_string()).collect()
        };

        let mut builder = BootstrapPlan::builder(database)
            .user(username, password)
            .role(role)
            .collections(collections);
        if let Some(scope) = self.scope.clone().or(user.scope) {
            builder = builder.scope(scope);
        }
        builder.build()
    }
}

/// On-disk plan, every field optional
///
/// ```toml
/// database = "teqplay"
/// collections = ["ships_latest_data", "port_events"]
///
/// [user]
/// username = "user"
/// role = "readWrite"
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PlanFile {
    #[serde(default)]
    pub database: Option<String>,

    #[serde(default)]
    pub collections: Vec<String>,

    #[serde(default)]
    pub user: PlanFileUser,
}

/// `[user]` section of a plan file
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PlanFileUser {
    #[serde(default)]
    pub username: Option<String>,

    /// Prefer SEED_PASSWORD over committing this
    #[serde(default)]
    pub password: Option<Secret>,

    #[serde(default)]
    pub role: Option<String>,

    #[serde(default)]
    pub scope: Option<String>,
}

impl PlanFile {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            BootstrapError::Config(format!("cannot read plan file {}: {}", path.display(), e))
        })?;
        Self::from_toml(&raw)
    }

    pub fn from_toml(raw: &str) -> Result<Self> {
        Ok(toml::from_str(raw)?)
    }
}
