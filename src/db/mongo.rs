//! MongoDB-backed provisioning store
//!
//! Pattern adapted from the gateway's MongoClient wrapper

use bson::{doc, Document};
use mongodb::{error::ErrorKind, Client};
use tracing::{debug, info};

use crate::db::store::{CreateOutcome, ProvisioningStore, StoreError};
use crate::plan::UserSpec;
use crate::types::BootstrapError;

/// Server error code for `createUser` on an existing user
pub const USER_ALREADY_EXISTS_CODE: i32 = 51003;

/// Server error code `NamespaceExists`
pub const NAMESPACE_EXISTS_CODE: i32 = 48;

/// MongoDB client wrapper
#[derive(Clone)]
pub struct MongoStore {
    client: Client,
}

impl MongoStore {
    /// Build a client for `uri`.
    ///
    /// No network traffic happens here; the first `ping` establishes the
    /// connection and bounds it by `timeout_ms`.
    pub async fn new(uri: &str, timeout_ms: u64) -> Result<Self, BootstrapError> {
        info!(uri = %redact_uri(uri), "Preparing MongoDB client");

        // Use serverSelectionTimeoutMS to avoid hanging on unreachable MongoDB
        let timeout_uri = with_timeouts(uri, timeout_ms);

        let client = Client::with_uri_str(&timeout_uri).await.map_err(|e| match e.kind.as_ref() {
            ErrorKind::InvalidArgument { .. } => {
                BootstrapError::Config(format!("Invalid MONGODB_URI {}: {}", redact_uri(uri), e))
            }
            _ => BootstrapError::Connection(format!("Failed to create MongoDB client: {}", e)),
        })?;

        Ok(Self { client })
    }

    /// Get the raw MongoDB client
    pub fn inner(&self) -> &Client {
        &self.client
    }

    async fn command(&self, database: &str, command: Document) -> Result<Document, StoreError> {
        self.client
            .database(database)
            .run_command(command)
            .await
            .map_err(classify)
    }
}

#[async_trait::async_trait]
impl ProvisioningStore for MongoStore {
    async fn ping(&self, database: &str) -> Result<(), StoreError> {
        self.command(database, doc! { "ping": 1 }).await?;
        debug!(database, "MongoDB ping ok");
        Ok(())
    }

    async fn create_user(&self, database: &str, user: &UserSpec) -> Result<CreateOutcome, StoreError> {
        let command = doc! {
            "createUser": user.username.as_str(),
            "pwd": user.password.expose(),
            "roles": [
                { "role": user.role.as_str(), "db": user.scope.as_str() },
            ],
        };

        match self.command(database, command).await {
            Ok(_) => Ok(CreateOutcome::Created),
            Err(StoreError::Rejected { code: Some(USER_ALREADY_EXISTS_CODE), .. }) => {
                Ok(CreateOutcome::AlreadyExists)
            }
            Err(e) => Err(e),
        }
    }

    async fn create_collection(&self, database: &str, name: &str) -> Result<CreateOutcome, StoreError> {
        match self.client.database(database).create_collection(name).await.map_err(classify) {
            Ok(()) => Ok(CreateOutcome::Created),
            Err(StoreError::Rejected { code: Some(NAMESPACE_EXISTS_CODE), .. }) => {
                Ok(CreateOutcome::AlreadyExists)
            }
            Err(e) => Err(e),
        }
    }

    async fn list_collections(&self, database: &str) -> Result<Vec<String>, StoreError> {
        self.client
            .database(database)
            .list_collection_names()
            .await
            .map_err(classify)
    }
}

/// Split driver errors into "could not talk to the server" and "server said no"
fn classify(err: mongodb::error::Error) -> StoreError {
    match err.kind.as_ref() {
        ErrorKind::Command(command) => StoreError::Rejected {
            code: Some(command.code),
            message: command.message.clone(),
        },
        ErrorKind::ServerSelection { .. }
        | ErrorKind::Io(_)
        | ErrorKind::DnsResolve { .. }
        | ErrorKind::ConnectionPoolCleared { .. }
        | ErrorKind::Authentication { .. } => StoreError::Unreachable(err.to_string()),
        _ => StoreError::Rejected {
            code: None,
            message: err.to_string(),
        },
    }
}

/// Append the timeout options the URI does not already set.
/// The driver rejects repeated options, so operator values win.
fn with_timeouts(uri: &str, timeout_ms: u64) -> String {
    let missing: Vec<String> = ["serverSelectionTimeoutMS", "connectTimeoutMS"]
        .iter()
        .filter(|key| !has_option(uri, key))
        .map(|key| format!("{}={}", key, timeout_ms))
        .collect();
    if missing.is_empty() {
        return uri.to_string();
    }

    let separator = if uri.contains('?') { '&' } else { '?' };
    // A bare host URI needs the path slash before options
    let base = if separator == '?' && uri.matches('/').count() == 2 {
        format!("{}/", uri)
    } else {
        uri.to_string()
    };
    format!("{}{}{}", base, separator, missing.join("&"))
}

/// Option keys in a connection string are case-insensitive
fn has_option(uri: &str, key: &str) -> bool {
    let Some((_, query)) = uri.split_once('?') else {
        return false;
    };
    query
        .split('&')
        .filter_map(|pair| pair.split('=').next())
        .any(|name| name.eq_ignore_ascii_case(key))
}

/// Hide the password of a `user:pass@host` URI for logging
pub fn redact_uri(uri: &str) -> String {
    let Some((scheme, rest)) = uri.split_once("://") else {
        return uri.to_string();
    };
    let Some((credentials, host)) = rest.split_once('@') else {
        return uri.to_string();
    };
    match credentials.split_once(':') {
        Some((user, _)) => format!("{}://{}:****@{}", scheme, user, host),
        None => uri.to_string(),
    }
}
