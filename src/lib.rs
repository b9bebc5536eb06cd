//! portwatch-init - MongoDB bootstrap for the port-watch service
//!
//! Provisions the database the ship tracking service runs on: an
//! application user with a role scoped to one database, and the collections
//! that hold latest ship positions and port entry/exit events.
//!
//! ## Parts
//!
//! - **Plan**: validated description of what to provision, built in code or
//!   loaded from a TOML file
//! - **Store**: the `ProvisioningStore` seam, backed by MongoDB or memory
//! - **Bootstrap**: the idempotent provisioning run and post-run verify

pub mod bootstrap;
pub mod config;
pub mod db;
pub mod logging;
pub mod plan;
pub mod types;

pub use bootstrap::{BootstrapSummary, Bootstrapper, RunStatus, VerifyReport};
pub use config::Args;
pub use plan::{BootstrapPlan, Role, Secret, UserSpec};
pub use types::{BootstrapError, Result};
