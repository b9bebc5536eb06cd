//! Database layer for portwatch-init
//!
//! The `ProvisioningStore` trait is the only thing the bootstrap routine
//! depends on.

pub mod memory;
pub mod mongo;
pub mod store;

pub use memory::{InMemoryStore, StoreCall, StoredUser};
pub use mongo::MongoStore;
pub use store::{CreateOutcome, ProvisioningStore, StoreError};
