//! Bootstrap run integration tests
//!
//! Runs full plans against the in-memory store:
//! - Idempotent re-runs
//! - Partial-failure isolation
//! - Fail-fast on an unreachable store
//! - Caller-supplied collection sets
//! - Database-scoped user grants

use std::collections::BTreeMap;
use std::sync::Arc;

use portwatch_init::{
    bootstrap::{Bootstrapper, CollectionOutcome, RunStatus},
    db::{CreateOutcome, InMemoryStore},
    BootstrapError, BootstrapPlan, Role,
};

const SPLIT_EVENTS: &[&str] = &["ships_latest_data", "port_entry_events", "port_exit_events"];
const MERGED_EVENTS: &[&str] = &["ships_latest_data", "port_events"];

fn plan(collections: &[&str]) -> BootstrapPlan {
    BootstrapPlan::builder("teqplay")
        .user("user", "password")
        .role(Role::ReadWrite)
        .collections(collections.iter().copied())
        .build()
        .expect("valid plan")
}

fn sorted(names: &[&str]) -> Vec<String> {
    let mut names: Vec<String> = names.iter().map(|s| s.to_string()).collect();
    names.sort();
    names
}

// =============================================================================
// Idempotence
// =============================================================================

#[tokio::test]
async fn test_second_run_is_noop() {
    let store = Arc::new(InMemoryStore::new());
    let bootstrapper = Bootstrapper::new(store.clone());
    let plan = plan(SPLIT_EVENTS);

    let first = bootstrapper.run(&plan).await.unwrap();
    let after_first = store.collections("teqplay").await;
    let user_after_first = store.user("teqplay", "user").await;

    let second = bootstrapper.run(&plan).await.unwrap();

    assert_eq!(first.status, RunStatus::Pass);
    assert_eq!(first.user.outcome, CreateOutcome::Created);

    assert_eq!(second.status, RunStatus::Pass);
    assert_eq!(second.user.outcome, CreateOutcome::AlreadyExists);
    assert!(second.is_noop());
    assert_eq!(second.failures().count(), 0);

    assert_eq!(store.collections("teqplay").await, after_first);
    assert_eq!(store.user("teqplay", "user").await, user_after_first);
}

#[tokio::test]
async fn test_existing_collections_are_kept() {
    let store = Arc::new(InMemoryStore::new());
    store.insert_collection("teqplay", "ships_latest_data").await;
    let bootstrapper = Bootstrapper::new(store.clone());

    let summary = bootstrapper.run(&plan(SPLIT_EVENTS)).await.unwrap();

    assert_eq!(summary.status, RunStatus::Pass);
    assert_eq!(
        summary.collection("ships_latest_data"),
        Some(&CollectionOutcome::AlreadyExists {
            name: "ships_latest_data".into()
        })
    );
    assert_eq!(
        summary.collection("port_exit_events"),
        Some(&CollectionOutcome::Created {
            name: "port_exit_events".into()
        })
    );
}

#[tokio::test]
async fn test_concurrent_runs_both_succeed() {
    let store = Arc::new(InMemoryStore::new());
    let a = Bootstrapper::new(store.clone());
    let b = Bootstrapper::new(store.clone());
    let plan = plan(SPLIT_EVENTS);

    let (ra, rb) = tokio::join!(a.run(&plan), b.run(&plan));
    let (ra, rb) = (ra.unwrap(), rb.unwrap());

    assert_eq!(ra.status, RunStatus::Pass);
    assert_eq!(rb.status, RunStatus::Pass);
    let created_users = [ra.user.outcome, rb.user.outcome]
        .iter()
        .filter(|o| **o == CreateOutcome::Created)
        .count();
    assert_eq!(created_users, 1);
    assert_eq!(store.collections("teqplay").await, sorted(SPLIT_EVENTS));
}

// =============================================================================
// Partial failure
// =============================================================================

#[tokio::test]
async fn test_rejected_collection_does_not_block_the_rest() {
    let store = Arc::new(InMemoryStore::new());
    store.reject_collection("INVALID/NAME").await;
    let bootstrapper = Bootstrapper::new(store.clone());

    let summary = bootstrapper.run(&plan(&["a", "INVALID/NAME", "b"])).await.unwrap();

    assert_eq!(summary.status, RunStatus::Partial);
    assert_eq!(summary.status.exit_code(), 2);

    let failures: Vec<_> = summary.failures().collect();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].name, "INVALID/NAME");

    assert_eq!(summary.collections[0], CollectionOutcome::Created { name: "a".into() });
    assert!(summary.collections[1].is_failure());
    assert_eq!(summary.collections[2], CollectionOutcome::Created { name: "b".into() });
    assert_eq!(store.collections("teqplay").await, vec!["a", "b"]);
}

#[tokio::test]
async fn test_store_naming_rules_surface_as_collection_errors() {
    let store = Arc::new(InMemoryStore::new());
    let bootstrapper = Bootstrapper::new(store.clone());

    let summary = bootstrapper
        .run(&plan(&["ships_latest_data", "bad$name", "system.profile"]))
        .await
        .unwrap();

    let failed: Vec<&str> = summary.failures().map(|f| f.name.as_str()).collect();
    assert_eq!(failed, vec!["bad$name", "system.profile"]);
    assert_eq!(store.collections("teqplay").await, vec!["ships_latest_data"]);
}

// =============================================================================
// Fail fast
// =============================================================================

#[tokio::test]
async fn test_unreachable_store_attempts_no_mutation() {
    let store = Arc::new(InMemoryStore::unreachable());
    let bootstrapper = Bootstrapper::new(store.clone());

    let err = bootstrapper.run(&plan(SPLIT_EVENTS)).await.unwrap_err();

    assert!(matches!(err, BootstrapError::Connection(_)));
    let calls = store.calls().await;
    assert_eq!(calls.len(), 1, "only the ping should be attempted: {calls:?}");
    assert!(calls.iter().all(|c| !c.is_mutation()));
}

#[tokio::test]
async fn test_invalid_plan_attempts_no_store_call() {
    let store = Arc::new(InMemoryStore::new());
    let bootstrapper = Bootstrapper::new(store.clone());

    let mut bad = plan(SPLIT_EVENTS);
    bad.user.scope = "admin".into();

    let err = bootstrapper.run(&bad).await.unwrap_err();

    assert!(matches!(err, BootstrapError::InvalidUserSpec(_)));
    assert!(store.calls().await.is_empty());
}

#[tokio::test]
async fn test_store_recovers_after_outage() {
    let store = Arc::new(InMemoryStore::new());
    store.set_unreachable(true).await;
    let bootstrapper = Bootstrapper::new(store.clone());
    let plan = plan(MERGED_EVENTS);

    assert!(bootstrapper.run(&plan).await.is_err());

    store.set_unreachable(false).await;
    let summary = bootstrapper.run(&plan).await.unwrap();
    assert_eq!(summary.status, RunStatus::Pass);
    assert_eq!(store.collections("teqplay").await, sorted(MERGED_EVENTS));
}

// =============================================================================
// Input-driven collection set
// =============================================================================

#[tokio::test]
async fn test_split_event_layout() {
    let store = Arc::new(InMemoryStore::new());
    Bootstrapper::new(store.clone())
        .run(&plan(SPLIT_EVENTS))
        .await
        .unwrap();

    assert_eq!(store.collections("teqplay").await, sorted(SPLIT_EVENTS));
}

#[tokio::test]
async fn test_merged_event_layout() {
    let store = Arc::new(InMemoryStore::new());
    Bootstrapper::new(store.clone())
        .run(&plan(MERGED_EVENTS))
        .await
        .unwrap();

    assert_eq!(store.collections("teqplay").await, sorted(MERGED_EVENTS));
}

// =============================================================================
// User scope
// =============================================================================

#[tokio::test]
async fn test_user_grant_is_scoped_to_target_database() {
    let store = Arc::new(InMemoryStore::new());
    let plan = BootstrapPlan::builder("teqplay")
        .user("reporter", "pw")
        .role(Role::Read)
        .collections(MERGED_EVENTS.iter().copied())
        .build()
        .unwrap();

    Bootstrapper::new(store.clone()).run(&plan).await.unwrap();

    let user = store.user("teqplay", "reporter").await.expect("user created");
    assert_eq!(user.grants, vec![(Role::Read, "teqplay".to_string())]);
    assert!(store.user("admin", "reporter").await.is_none());
}

// =============================================================================
// Order independence
// =============================================================================

#[tokio::test]
async fn test_outcome_set_independent_of_order() {
    async fn outcomes(names: &[&str]) -> BTreeMap<String, bool> {
        let store = Arc::new(InMemoryStore::new());
        store.reject_collection("INVALID/NAME").await;
        let summary = Bootstrapper::new(store)
            .run(&plan(names))
            .await
            .unwrap();
        summary
            .collections
            .iter()
            .map(|c| (c.name().to_string(), c.is_failure()))
            .collect()
    }

    let forward = outcomes(&["a", "INVALID/NAME", "b"]).await;
    let reversed = outcomes(&["b", "INVALID/NAME", "a"]).await;
    let failing_first = outcomes(&["INVALID/NAME", "a", "b"]).await;

    assert_eq!(forward, reversed);
    assert_eq!(forward, failing_first);
}

// =============================================================================
// Verify
// =============================================================================

#[tokio::test]
async fn test_verify_after_run_is_complete() {
    let store = Arc::new(InMemoryStore::new());
    let bootstrapper = Bootstrapper::new(store.clone());
    let plan = plan(SPLIT_EVENTS);

    bootstrapper.run(&plan).await.unwrap();
    let report = bootstrapper.verify(&plan).await.unwrap();

    assert!(report.is_complete());
    assert_eq!(report.present.len(), SPLIT_EVENTS.len());
}

#[tokio::test]
async fn test_verify_flags_failed_collection() {
    let store = Arc::new(InMemoryStore::new());
    store.reject_collection("port_events").await;
    let bootstrapper = Bootstrapper::new(store.clone());
    let plan = plan(MERGED_EVENTS);

    bootstrapper.run(&plan).await.unwrap();
    let report = bootstrapper.verify(&plan).await.unwrap();

    assert_eq!(report.missing, vec!["port_events"]);
    assert_eq!(report.status(), RunStatus::Partial);
}
