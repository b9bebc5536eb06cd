//! Database-scoped roles that the bootstrap user can be granted

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Built-in MongoDB database roles.
///
/// Every variant is granted against a single database; there is no
/// cluster-wide variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Role {
    /// Read-only access
    Read,
    /// Read and write access
    #[default]
    ReadWrite,
    /// Index and schema administration, no data access
    DbAdmin,
    /// Full control of the database
    DbOwner,
}

impl Role {
    /// Name of the role as MongoDB knows it
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Read => "read",
            Role::ReadWrite => "readWrite",
            Role::DbAdmin => "dbAdmin",
            Role::DbOwner => "dbOwner",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unrecognized role name
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown role '{0}' (expected one of: read, readWrite, dbAdmin, dbOwner)")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .chars()
            .filter(|c| *c != '-' && *c != '_')
            .flat_map(char::to_lowercase)
            .collect();

        match normalized.as_str() {
            "read" => Ok(Role::Read),
            "readwrite" => Ok(Role::ReadWrite),
            "dbadmin" => Ok(Role::DbAdmin),
            "dbowner" => Ok(Role::DbOwner),
            _ => Err(UnknownRole(s.to_string())),
        }
    }
}

impl TryFrom<String> for Role {
    type Error = UnknownRole;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Role> for String {
    fn from(role: Role) -> Self {
        role.as_str().to_string()
    }
}
