// Copyright (c) 2025 - Cowboy AI, Inc.
//! Provisioning Planner
//!
//! Resolves a stack set, runs the pre-deployment gate, estimates cost and
//! prints the result as JSON. With `--apply` the stacks are applied against
//! the in-memory provider and the deployment report is printed instead.
//!
//! Run with: cargo run --bin provision-plan -- [STACKS_JSON] [--apply] [--config FILE]
//!
//! Without `STACKS_JSON` the reference topology is used. Configuration comes
//! from `--config` (or `PROVISION_CONFIG`), otherwise from `PROVISION_*`
//! environment variables (see `cim_provisioning::config`).

use anyhow::{bail, Context, Result};
use clap::Parser;
use cim_provisioning::{
    domain::Stack,
    orchestrator::Orchestrator,
    provider::InMemoryProvider,
    sink::{AlertSink, NatsAlertSink, TracingSink},
    state_store::{InMemoryStateStore, JsonFileStateStore, StateStore},
    topology, ProvisioningConfig,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "provision-plan")]
#[command(about = "Resolve, gate and price stacks, or apply them to the in-memory provider")]
struct Args {
    /// Stack set as JSON (defaults to the reference topology)
    stacks: Option<PathBuf>,

    /// Apply the stacks and print the deployment report
    #[arg(long)]
    apply: bool,

    /// Configuration file (otherwise PROVISION_* variables are read)
    #[arg(short, long, env = "PROVISION_CONFIG")]
    config: Option<PathBuf>,
}

fn load_config(path: Option<&PathBuf>) -> Result<ProvisioningConfig> {
    match path {
        Some(path) => ProvisioningConfig::from_json_file(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display())),
        None => ProvisioningConfig::from_env().context("Invalid PROVISION_* environment"),
    }
}

fn load_stacks(path: Option<&PathBuf>) -> Result<Vec<Stack>> {
    match path {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            serde_json::from_str(&text).with_context(|| format!("Failed to parse {}", path.display()))
        }
        None => Ok(topology::reference_stacks()),
    }
}

async fn alert_sink(config: &ProvisioningConfig) -> Arc<dyn AlertSink> {
    match &config.nats {
        Some(nats) => match NatsAlertSink::connect(nats).await {
            Ok(sink) => Arc::new(sink),
            Err(e) => {
                warn!("NATS unavailable, logging alerts instead: {}", e);
                Arc::new(TracingSink)
            }
        },
        None => Arc::new(TracingSink),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = load_config(args.config.as_ref())?;
    let stacks = load_stacks(args.stacks.as_ref())?;
    info!(stacks = stacks.len(), apply = args.apply, "Loaded stacks");

    let store: Arc<dyn StateStore> = match &config.state_path {
        Some(path) => Arc::new(JsonFileStateStore::new(path)),
        None => Arc::new(InMemoryStateStore::new()),
    };

    let orchestrator = Orchestrator::new(Arc::new(InMemoryProvider::new()), store, alert_sink(&config).await)
        .with_config(config.orchestrator.clone())
        .with_cost_config(config.cost.clone());

    if args.apply {
        let report = orchestrator.apply(&stacks).await.context("Deployment failed")?;
        println!("{}", serde_json::to_string_pretty(&report)?);
        if !report.rollback_failures.is_empty() {
            bail!(
                "{} rollback failure(s) need manual reconciliation",
                report.rollback_failures.len()
            );
        }
        return Ok(());
    }

    let plan = orchestrator.plan(&stacks).await.context("Planning failed")?;
    println!("{}", serde_json::to_string_pretty(&plan)?);
    if plan.is_blocked() {
        bail!("Pre-deployment gate would block this deployment");
    }
    info!(
        total_monthly = plan.cost.total_monthly,
        to_apply = plan.to_apply.len(),
        "Plan complete"
    );
    Ok(())
}
