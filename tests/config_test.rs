//! Plan file loading and argument merge integration tests

use std::io::Write;
use std::path::PathBuf;

use clap::Parser;
use portwatch_init::{config::PlanFile, Args, BootstrapError, Role};
use tempfile::NamedTempFile;

fn bundled(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("config").join(name)
}

fn write_plan(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

fn args(extra: &[&str]) -> Args {
    let mut argv = vec!["portwatch-init"];
    argv.extend_from_slice(extra);
    Args::try_parse_from(argv).unwrap()
}

#[test]
fn test_bundled_split_events_plan() {
    let file = PlanFile::load(&bundled("seed-split-events.toml")).expect("bundled plan parses");
    assert_eq!(file.database.as_deref(), Some("teqplay"));
    assert_eq!(
        file.collections,
        vec!["ships_latest_data", "port_entry_events", "port_exit_events"]
    );
    assert!(file.user.password.is_none());
}

#[test]
fn test_bundled_port_events_plan() {
    let file = PlanFile::load(&bundled("seed-port-events.toml")).expect("bundled plan parses");
    assert_eq!(file.collections, vec!["ships_latest_data", "port_events"]);
    assert_eq!(file.user.role.as_deref(), Some("readWrite"));
}

#[test]
fn test_resolve_plan_from_file_with_password_flag() {
    let path = bundled("seed-port-events.toml");
    let plan = args(&["--plan", path.to_str().unwrap(), "--password", "password"])
        .resolve_plan()
        .unwrap();

    assert_eq!(plan.database, "teqplay");
    assert_eq!(plan.user.username, "user");
    assert_eq!(plan.user.role, Role::ReadWrite);
    assert_eq!(plan.user.scope, "teqplay");
    assert_eq!(plan.collections, vec!["ships_latest_data", "port_events"]);
}

#[test]
fn test_resolve_plan_with_password_in_file() {
    let file = write_plan(
        r#"
database = "harbor"
collections = ["vessels"]

[user]
username = "ops"
password = "from-file"
role = "dbAdmin"
"#,
    );

    let plan = args(&["--plan", file.path().to_str().unwrap()])
        .resolve_plan()
        .unwrap();

    assert_eq!(plan.database, "harbor");
    assert_eq!(plan.user.password.expose(), "from-file");
    assert_eq!(plan.user.role, Role::DbAdmin);
    assert_eq!(plan.user.scope, "harbor");
}

#[test]
fn test_file_scope_mismatch_is_invalid_user_spec() {
    let file = write_plan(
        r#"
database = "teqplay"
collections = ["a"]

[user]
password = "pw"
scope = "admin"
"#,
    );

    let err = args(&["--plan", file.path().to_str().unwrap()])
        .resolve_plan()
        .unwrap_err();
    assert!(matches!(err, BootstrapError::InvalidUserSpec(_)));
}

#[test]
fn test_file_duplicate_collections_is_invalid_plan() {
    let file = write_plan(
        r#"
collections = ["a", "a"]

[user]
password = "pw"
"#,
    );

    let err = args(&["--plan", file.path().to_str().unwrap()])
        .resolve_plan()
        .unwrap_err();
    assert!(matches!(err, BootstrapError::InvalidPlan(_)));
}

#[test]
fn test_failed_resolve_still_names_plan_database() {
    let file = write_plan(
        r#"
database = "harbor"
collections = ["vessels"]
"#,
    );
    let args = args(&["--plan", file.path().to_str().unwrap()]);

    let err = args.resolve_plan().unwrap_err();
    assert!(matches!(err, BootstrapError::InvalidUserSpec(_)));
    assert_eq!(args.target_database(), "harbor");
}

#[test]
fn test_missing_plan_file_is_config_error() {
    let err = args(&["--plan", "/nonexistent/plan.toml", "--password", "pw"])
        .resolve_plan()
        .unwrap_err();
    assert!(matches!(err, BootstrapError::Config(_)));
}

#[test]
fn test_malformed_plan_file_is_config_error() {
    let file = write_plan("collections = \"not a list\"");
    let err = args(&["--plan", file.path().to_str().unwrap(), "--password", "pw"])
        .resolve_plan()
        .unwrap_err();
    assert!(matches!(err, BootstrapError::Config(_)));
}
