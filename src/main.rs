//! portwatch-init - provision the port-watch MongoDB database
//!
//! Exit codes: 0 pass, 2 partial (some collections failed), 1 fail.

use clap::Parser;
use serde::Serialize;
use std::fmt::Display;
use std::sync::Arc;
use tracing::{error, info};

use portwatch_init::{
    bootstrap::{Bootstrapper, FailureReport, RunStatus},
    config::{Args, OutputFormat},
    db::{mongo::redact_uri, MongoStore},
    logging,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    let args = Args::parse();
    logging::init(&args.log_level, args.log_format);

    if let Err(e) = args.validate() {
        error!("{}", e);
        emit(args.output, &FailureReport::new(args.target_database(), &e))?;
        std::process::exit(RunStatus::Fail.exit_code());
    }

    let plan = match args.resolve_plan() {
        Ok(plan) => plan,
        Err(e) => {
            error!("{}", e);
            emit(args.output, &FailureReport::new(args.target_database(), &e))?;
            std::process::exit(RunStatus::Fail.exit_code());
        }
    };

    info!("======================================");
    info!("  portwatch-init");
    info!("======================================");
    info!("MongoDB: {}", redact_uri(&args.mongodb_uri));
    info!("Database: {}", plan.database);
    info!("User: {} ({} on '{}')", plan.user.username, plan.user.role, plan.user.scope);
    info!("Collections: {}", plan.collections.join(", "));
    info!("Mode: {}", if args.dry_run { "DRY RUN" } else { "APPLY" });
    info!("======================================");

    if args.dry_run {
        match args.output {
            OutputFormat::Text => print!("{}", render_plan(&plan)),
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&plan)?),
        }
        return Ok(());
    }

    let store = match MongoStore::new(&args.mongodb_uri, args.connect_timeout_ms).await {
        Ok(store) => store,
        Err(e) => {
            error!("MongoDB client setup failed: {}", e);
            emit(args.output, &FailureReport::new(plan.database.clone(), &e))?;
            std::process::exit(RunStatus::Fail.exit_code());
        }
    };
    let bootstrapper = Bootstrapper::new(Arc::new(store));

    let mut status = match bootstrapper.run(&plan).await {
        Ok(summary) => {
            emit(args.output, &summary)?;
            summary.status
        }
        Err(e) => {
            error!("Bootstrap failed: {}", e);
            emit(args.output, &FailureReport::new(plan.database.clone(), &e))?;
            RunStatus::Fail
        }
    };

    if args.verify && status != RunStatus::Fail {
        match bootstrapper.verify(&plan).await {
            Ok(report) => {
                emit(args.output, &report)?;
                if !report.is_complete() {
                    status = RunStatus::Partial;
                }
            }
            Err(e) => {
                error!("Verify failed: {}", e);
                emit(args.output, &FailureReport::new(plan.database.clone(), &e))?;
                status = RunStatus::Fail;
            }
        }
    }

    std::process::exit(status.exit_code());
}

/// Print a report to stdout in the requested format
fn emit<T: Serialize + Display>(format: OutputFormat, report: &T) -> anyhow::Result<()> {
    match format {
        OutputFormat::Text => print!("{}", report),
        OutputFormat::Json => println!("{}", serde_json::to_string(report)?),
    }
    Ok(())
}

fn render_plan(plan: &portwatch_init::BootstrapPlan) -> String {
    let mut out = format!("Plan for database '{}' (dry run)\n", plan.database);
    out.push_str(&format!(
        "  user '{}' ({} on '{}'), password {}\n",
        plan.user.username, plan.user.role, plan.user.scope, plan.user.password
    ));
    for name in &plan.collections {
        out.push_str(&format!("  collection '{}'\n", name));
    }
    out
}
