// Copyright (c) 2025 - Cowboy AI, Inc.
//! Deployment Orchestrator
//!
//! Drives the resolved stack order through the provider with apply and
//! rollback semantics.
//!
//! # Run
//!
//! 1. Validate the model and resolve the order. Errors here are fatal and
//!    no provider call is made.
//! 2. Pre-deployment gate over every declared resource. Any blocking
//!    violation aborts the run with [`ProvisioningError::PolicyBlocked`].
//! 3. Stacks whose dependencies are all Applied fan out, bounded by
//!    `max_concurrent_stacks`. Each passes a stack gate over its own and its
//!    dependencies' resources before any call.
//! 4. A failed stack rolls back; its dependents are skipped. With
//!    `fail_fast` nothing new starts after the first rollback.
//! 5. Once every stack is Applied: post-deployment policy pass over the
//!    live inventory, drift detection and the cost estimate. Backup
//!    policies of applied resources are registered and checked.
//!
//! The orchestrator task is the only writer of the snapshot, the report and
//! the alert sink. Workers get their stack by value and return an outcome.
//! The snapshot is saved every time a stack settles, so a crashed run
//! resumes after the last Applied stack.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use cim_provisioning::orchestrator::Orchestrator;
//! use cim_provisioning::provider::InMemoryProvider;
//! use cim_provisioning::sink::TracingSink;
//! use cim_provisioning::state_store::InMemoryStateStore;
//! use cim_provisioning::topology;
//!
//! # async fn run() -> cim_provisioning::ProvisioningResult<()> {
//! let orchestrator = Orchestrator::new(
//!     Arc::new(InMemoryProvider::new()),
//!     Arc::new(InMemoryStateStore::new()),
//!     Arc::new(TracingSink),
//! );
//! let report = orchestrator.apply(&topology::reference_stacks()).await?;
//! println!("{}", report.outcome);
//! # Ok(())
//! # }
//! ```

mod apply;
pub mod report;
pub mod retry;

use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use crate::backup::ResourceCompliance;
use crate::config::OrchestratorConfig;
use crate::cost::{self, CostConfig};
use crate::domain::{validate_model, Resource, ResourceId, Stack, StackName};
use crate::errors::{ProvisioningError, ProvisioningResult};
use crate::policy::{self, EvaluationPhase, PolicyEngine, Severity, Violation};
use crate::provider::{LiveResource, Provider, ProviderId};
use crate::resolver::StackGraph;
use crate::sink::AlertSink;
use crate::state_machine::{StackInput, StackState, StateMachine, StateMachineWithHistory};
use crate::state_store::{DeploymentSnapshot, StackRecord, StateStore};

use apply::{apply_stack, StackJob, StackOutcome};

pub use report::{
    DeleteFailure, DeploymentOutcome, DeploymentPlan, DeploymentReport, SkipReason, SkippedStack,
    StackFailure, StackTransition,
};
pub use retry::{with_retry, Idempotency, RetryPolicy};

/// Live configuration differs from, or no longer matches, the last apply
pub const DRIFT_DETECTED: &str = "DriftDetected";

/// Live resource no stack declares
pub const UNMANAGED_RESOURCE: &str = "UnmanagedResource";

/// The post-deployment inventory could not be read
pub const INVENTORY_UNAVAILABLE: &str = "ProviderInventory";

/// Source of "now"
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Applies stacks through a [`Provider`]
pub struct Orchestrator {
    provider: Arc<dyn Provider>,
    store: Arc<dyn StateStore>,
    sink: Arc<dyn AlertSink>,
    policies: PolicyEngine,
    config: OrchestratorConfig,
    cost: CostConfig,
    clock: Clock,
}

impl Orchestrator {
    /// Orchestrator with every built-in policy and default limits
    pub fn new(provider: Arc<dyn Provider>, store: Arc<dyn StateStore>, sink: Arc<dyn AlertSink>) -> Self {
        Self {
            provider,
            store,
            sink,
            policies: PolicyEngine::standard(),
            config: OrchestratorConfig::default(),
            cost: CostConfig::default(),
            clock: Arc::new(Utc::now),
        }
    }

    pub fn with_policies(mut self, policies: PolicyEngine) -> Self {
        self.policies = policies;
        self
    }

    pub fn with_config(mut self, config: OrchestratorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_cost_config(mut self, cost: CostConfig) -> Self {
        self.cost = cost;
        self
    }

    /// Replace the wall clock, e.g. to simulate elapsed months
    pub fn with_clock<F>(mut self, clock: F) -> Self
    where
        F: Fn() -> DateTime<Utc> + Send + Sync + 'static,
    {
        self.clock = Arc::new(clock);
        self
    }

    pub fn policies(&self) -> &PolicyEngine {
        &self.policies
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    fn now(&self) -> DateTime<Utc> {
        (self.clock)()
    }

    /// Resolve, gate and estimate without calling the provider
    pub async fn plan(&self, stacks: &[Stack]) -> ProvisioningResult<DeploymentPlan> {
        validate_model(stacks)?;
        let order = StackGraph::build(stacks)?.topological_order()?;
        let snapshot = self.store.load().await?.unwrap_or_default();

        let declared = declared_resources(stacks);
        let violations = self.policies.evaluate_with_baseline(
            &declared,
            EvaluationPhase::PreDeployment,
            &snapshot.evaluated_policies,
            &snapshot.known_resources(),
        );

        let elapsed = snapshot
            .first_applied_at
            .map(|first| cost::elapsed_months(first, self.now()))
            .unwrap_or(0);

        let by_name = index_by_name(stacks);
        let (unchanged, to_apply): (Vec<StackName>, Vec<StackName>) = order
            .iter()
            .cloned()
            .partition(|name| by_name.get(name).is_some_and(|s| is_unchanged(s, &snapshot)));

        Ok(DeploymentPlan {
            order,
            to_apply,
            unchanged,
            violations,
            cost: cost::estimate_with(&declared, elapsed, &self.cost),
        })
    }

    /// Deploy without an external cancellation signal
    pub async fn apply(&self, stacks: &[Stack]) -> ProvisioningResult<DeploymentReport> {
        let (_cancel, signal) = watch::channel(false);
        self.deploy(stacks, signal).await
    }

    /// Deploy `stacks`
    ///
    /// Setting `cancel` to `true` stops new stacks from starting; stacks
    /// already applying roll back.
    ///
    /// # Errors
    ///
    /// - Model and resolution errors, before any provider call
    /// - `PolicyBlocked` when the pre-deployment gate finds blocking
    ///   violations, before any provider call
    /// - `StateStore` when the snapshot cannot be loaded or saved
    /// - `Worker` when a stack task panics
    ///
    /// Provider failures are not errors: they roll back the stack and are
    /// listed in the report.
    pub async fn deploy(
        &self,
        stacks: &[Stack],
        mut cancel: watch::Receiver<bool>,
    ) -> ProvisioningResult<DeploymentReport> {
        let started_at = self.now();

        validate_model(stacks)?;
        let graph = StackGraph::build(stacks)?;
        let order = graph.topological_order()?;

        let snapshot = self.store.load().await?.unwrap_or_default();
        let known_policies = snapshot.evaluated_policies.clone();
        let existing = snapshot.known_resources();

        let declared = declared_resources(stacks);
        let violations = self.policies.evaluate_with_baseline(
            &declared,
            EvaluationPhase::PreDeployment,
            &known_policies,
            &existing,
        );
        let blocking = policy::blocking(&violations);
        if !blocking.is_empty() {
            error!(blocking = blocking.len(), "Pre-deployment gate blocked the run");
            self.publish(&violations, &[]).await;
            return Err(ProvisioningError::PolicyBlocked { violations: blocking });
        }
        info!(
            stacks = order.len(),
            resources = declared.len(),
            advisories = violations.len(),
            "Pre-deployment gate passed"
        );

        let by_name = index_by_name(stacks);
        let mut run = Run::new(snapshot, &order, violations);
        run.snapshot.order = order.clone();
        run.snapshot.evaluated_policies.extend(self.policies.policy_names());

        let (unchanged, mut remaining): (Vec<StackName>, Vec<StackName>) = order
            .iter()
            .cloned()
            .partition(|name| by_name.get(name).is_some_and(|s| is_unchanged(s, &run.snapshot)));
        if !unchanged.is_empty() {
            info!(unchanged = unchanged.len(), "Applied stacks unchanged, leaving them alone");
        }

        let max_stacks = self.config.max_concurrent_stacks.max(1);
        let mut join_set: JoinSet<StackOutcome> = JoinSet::new();
        let mut in_flight: BTreeSet<StackName> = BTreeSet::new();
        let mut cancelled = *cancel.borrow();
        let mut watching = true;
        let mut halted = false;

        loop {
            let mut progressed = false;
            let stop = if cancelled {
                Some(SkipReason::Cancelled)
            } else if halted {
                Some(SkipReason::FailFast)
            } else {
                None
            };

            for name in remaining.clone() {
                let reason = match &stop {
                    Some(reason) => Some(reason.clone()),
                    None => unapplied_dependency(&graph, &name, &run, &remaining, &in_flight)
                        .map(SkipReason::DependencyNotApplied),
                };
                if let Some(reason) = reason {
                    remaining.retain(|n| n != &name);
                    run.skip(&name, reason, self.now())?;
                    progressed = true;
                }
            }

            if stop.is_none() {
                for name in remaining.clone() {
                    if join_set.len() >= max_stacks {
                        break;
                    }
                    if !dependencies_applied(&graph, &name, &run, &remaining, &in_flight) {
                        continue;
                    }
                    let Some(stack) = by_name.get(&name).copied() else {
                        return Err(ProvisioningError::UnknownStack(name));
                    };
                    remaining.retain(|n| n != &name);
                    progressed = true;

                    run.transition(&name, StackInput::Begin, self.now())?;
                    let gate = self.stack_gate(stack, &graph, &by_name, &known_policies, &existing);
                    if !gate.is_empty() {
                        warn!(stack = %name, blocking = gate.len(), "Stack gate blocked");
                        let failure = StackFailure {
                            stack: name.clone(),
                            resource: gate.first().and_then(|v| v.resource.clone()),
                            reason: format!("Stack gate found {} blocking violation(s)", gate.len()),
                        };
                        run.violations.extend(gate);
                        run.fail(&name, failure, self.now())?;
                        halted |= self.config.fail_fast;
                        self.store.save(&run.snapshot).await?;
                        continue;
                    }

                    let job = StackJob {
                        stack: stack.clone(),
                        recorded: run
                            .snapshot
                            .stack_resources(&name)
                            .into_iter()
                            .map(|record| (record.resource.id(), record.clone()))
                            .collect(),
                        provider: Arc::clone(&self.provider),
                        config: self.config.clone(),
                        cancel: cancel.clone(),
                    };
                    in_flight.insert(name);
                    join_set.spawn(apply_stack(job));
                }
            }

            if join_set.is_empty() {
                if remaining.is_empty() || !progressed {
                    break;
                }
                continue;
            }

            tokio::select! {
                joined = join_set.join_next() => match joined {
                    Some(Ok(outcome)) => {
                        in_flight.remove(&outcome.stack);
                        let applied = run.settle(outcome, self.now())?;
                        halted |= !applied && self.config.fail_fast;
                        self.store.save(&run.snapshot).await?;
                    }
                    Some(Err(e)) => {
                        join_set.abort_all();
                        self.store.save(&run.snapshot).await?;
                        return Err(ProvisioningError::Worker(e.to_string()));
                    }
                    None => {}
                },
                changed = cancel.changed(), if watching && !cancelled => match changed {
                    Ok(()) => {
                        if *cancel.borrow_and_update() {
                            warn!(in_flight = in_flight.len(), "Cancellation requested");
                            cancelled = true;
                        }
                    }
                    Err(_) => watching = false,
                },
            }
        }

        for name in remaining {
            run.skip(&name, SkipReason::Cancelled, self.now())?;
        }

        self.finish(run, stacks, order, unchanged, started_at, cancelled)
            .await
    }

    async fn finish(
        &self,
        mut run: Run,
        stacks: &[Stack],
        order: Vec<StackName>,
        unchanged: Vec<StackName>,
        started_at: DateTime<Utc>,
        cancelled: bool,
    ) -> ProvisioningResult<DeploymentReport> {
        let now = self.now();
        let all_applied = order.iter().all(|name| run.state(name) == StackState::Applied);

        run.sync_backups(stacks, now)?;

        let mut cost_report = None;
        if all_applied {
            self.post_deployment(&mut run).await;

            let elapsed = run
                .snapshot
                .first_applied_at
                .map(|first| cost::elapsed_months(first, now))
                .unwrap_or(0);
            let estimate = cost::estimate_with(&declared_resources(stacks), elapsed, &self.cost);
            info!(
                total_monthly = estimate.total_monthly,
                budget = ?estimate.budget,
                elapsed_months = elapsed,
                "Cost estimate"
            );
            run.snapshot.cost_report = Some(estimate.clone());
            cost_report = Some(estimate);
        }

        let backups = run.snapshot.backups.check_all(now);
        for compliance in &backups {
            run.violations.extend(compliance.violations());
        }

        run.snapshot.updated_at = Some(now);
        self.store.save(&run.snapshot).await?;

        let mut alerts = run.violations.clone();
        if let Some(report) = &cost_report {
            alerts.extend(report.warnings.iter().cloned());
        }
        self.publish(&alerts, &backups).await;

        let outcome = if cancelled {
            DeploymentOutcome::Cancelled
        } else if all_applied {
            DeploymentOutcome::Applied
        } else {
            DeploymentOutcome::PartiallyApplied
        };
        info!(
            outcome = %outcome,
            violations = run.violations.len(),
            rollback_failures = run.rollback_failures.len(),
            "Deployment finished"
        );

        Ok(DeploymentReport {
            started_at,
            finished_at: now,
            outcome,
            stacks: order.iter().map(|name| (name.clone(), run.state(name))).collect(),
            order,
            transitions: run.transitions,
            unchanged,
            skipped: run.skipped,
            failures: run.failures,
            rollback_failures: run.rollback_failures,
            prune_failures: run.prune_failures,
            violations: run.violations,
            cost: cost_report,
            backups,
        })
    }

    /// Blocking violations on `stack`'s own resources, evaluated together
    /// with everything its dependencies declare
    fn stack_gate(
        &self,
        stack: &Stack,
        graph: &StackGraph,
        by_name: &BTreeMap<StackName, &Stack>,
        known_policies: &BTreeSet<String>,
        existing: &BTreeSet<ResourceId>,
    ) -> Vec<Violation> {
        let mut scope = stack.resources.clone();
        for dependency in graph.transitive_dependencies(&stack.name) {
            if let Some(dep) = by_name.get(&dependency) {
                scope.extend(dep.resources.iter().cloned());
            }
        }

        let own: BTreeSet<ResourceId> = stack.resource_ids().collect();
        self.policies
            .evaluate_with_baseline(&scope, EvaluationPhase::StackGate, known_policies, existing)
            .into_iter()
            .filter(|v| v.is_blocking() && v.resource.as_ref().is_some_and(|r| own.contains(r)))
            .collect()
    }

    /// Policy pass and drift detection over the live inventory
    async fn post_deployment(&self, run: &mut Run) {
        let listed = with_retry(
            &self.config.retry,
            self.config.provider_timeout(),
            "list_all",
            Idempotency::Idempotent,
            || self.provider.list_all(),
        )
        .await;

        match listed {
            Ok(live) => {
                let resources: Vec<Resource> = live.iter().map(|l| l.resource.clone()).collect();
                let post = self.policies.evaluate_with_baseline(
                    &resources,
                    EvaluationPhase::PostDeployment,
                    &run.baseline_policies,
                    &run.baseline_resources,
                );
                let drift = detect_drift(&run.snapshot, &live);
                info!(
                    live = live.len(),
                    violations = post.len(),
                    drift = drift.len(),
                    "Post-deployment pass"
                );
                run.violations.extend(post);
                run.violations.extend(drift);
            }
            Err(e) => {
                error!(error = %e, "Post-deployment inventory failed");
                run.violations.push(
                    Violation::aggregate(
                        INVENTORY_UNAVAILABLE,
                        format!("Post-deployment inventory failed: {}", e),
                        Severity::Blocking,
                    )
                    .in_phase(EvaluationPhase::PostDeployment),
                );
            }
        }
    }

    async fn publish(&self, violations: &[Violation], compliance: &[ResourceCompliance]) {
        for violation in violations {
            if let Err(e) = self.sink.notify_violation(violation).await {
                warn!(policy = %violation.policy, error = %e, "Alert sink rejected violation");
            }
        }
        for result in compliance {
            if let Err(e) = self.sink.notify_compliance(result).await {
                warn!(resource = %result.resource, error = %e, "Alert sink rejected compliance result");
            }
        }
    }
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("policies", &self.policies)
            .field("config", &self.config)
            .field("cost", &self.cost)
            .finish_non_exhaustive()
    }
}

/// State owned by the orchestrator task during one run
struct Run {
    snapshot: DeploymentSnapshot,
    /// Policy names and resources known before this run started
    baseline_policies: BTreeSet<String>,
    baseline_resources: BTreeSet<ResourceId>,
    machines: BTreeMap<StackName, StateMachineWithHistory<StackState>>,
    transitions: Vec<StackTransition>,
    violations: Vec<Violation>,
    skipped: Vec<SkippedStack>,
    failures: Vec<StackFailure>,
    rollback_failures: Vec<DeleteFailure>,
    prune_failures: Vec<DeleteFailure>,
}

impl Run {
    fn new(snapshot: DeploymentSnapshot, order: &[StackName], violations: Vec<Violation>) -> Self {
        let machines = order
            .iter()
            .map(|name| (name.clone(), StateMachineWithHistory::new(snapshot.stack_state(name))))
            .collect();

        Self {
            baseline_policies: snapshot.evaluated_policies.clone(),
            baseline_resources: snapshot.known_resources(),
            snapshot,
            machines,
            transitions: Vec::new(),
            violations,
            skipped: Vec::new(),
            failures: Vec::new(),
            rollback_failures: Vec::new(),
            prune_failures: Vec::new(),
        }
    }

    fn state(&self, stack: &StackName) -> StackState {
        self.machines
            .get(stack)
            .map(|m| *m.current_state())
            .unwrap_or_default()
    }

    fn transition(&mut self, stack: &StackName, input: StackInput, at: DateTime<Utc>) -> ProvisioningResult<()> {
        let machine = self
            .machines
            .get_mut(stack)
            .ok_or_else(|| ProvisioningError::UnknownStack(stack.clone()))?;
        let from = *machine.current_state();
        machine.transition_with_history(input, at)?;

        info!(stack = %stack, from = %from, to = %machine.current_state(), "Stack transition");
        if let Some(last) = machine.get_history().last() {
            self.transitions.push(StackTransition {
                stack: stack.clone(),
                transition: last.clone(),
            });
        }
        Ok(())
    }

    fn record_stack(&mut self, stack: &StackName, at: DateTime<Utc>) {
        let resources = self
            .snapshot
            .stack_resources(stack)
            .into_iter()
            .map(|record| record.resource.id())
            .collect();
        self.snapshot.stacks.insert(
            stack.clone(),
            StackRecord {
                state: self.state(stack),
                resources,
                updated_at: Some(at),
            },
        );
    }

    fn skip(&mut self, stack: &StackName, reason: SkipReason, at: DateTime<Utc>) -> ProvisioningResult<()> {
        // A changed Applied stack that never started keeps its state
        if self.state(stack).can_transition(&StackInput::Skip) {
            self.transition(stack, StackInput::Skip, at)?;
            self.record_stack(stack, at);
        }
        warn!(stack = %stack, reason = ?reason, "Stack skipped");
        self.skipped.push(SkippedStack {
            stack: stack.clone(),
            reason,
        });
        Ok(())
    }

    fn fail(&mut self, stack: &StackName, failure: StackFailure, at: DateTime<Utc>) -> ProvisioningResult<()> {
        self.transition(stack, StackInput::Fail, at)?;
        self.failures.push(failure);
        self.record_stack(stack, at);
        Ok(())
    }

    /// Merge a worker outcome; returns whether the stack applied
    fn settle(&mut self, outcome: StackOutcome, at: DateTime<Utc>) -> ProvisioningResult<bool> {
        let StackOutcome {
            stack,
            records,
            removed,
            failure,
            rollback_failures,
            prune_failures,
        } = outcome;

        for id in &removed {
            self.snapshot.resources.remove(id);
        }
        self.snapshot.resources.extend(records);
        self.rollback_failures.extend(rollback_failures);
        self.prune_failures.extend(prune_failures);

        match failure {
            None => {
                self.transition(&stack, StackInput::Complete, at)?;
                self.snapshot.first_applied_at.get_or_insert(at);
                self.record_stack(&stack, at);
                Ok(true)
            }
            Some(failure) => {
                self.fail(&stack, failure, at)?;
                Ok(false)
            }
        }
    }

    /// Register backup policies of applied resources, drop removed ones
    fn sync_backups(&mut self, stacks: &[Stack], now: DateTime<Utc>) -> ProvisioningResult<()> {
        for stack in stacks {
            if self.state(&stack.name) != StackState::Applied {
                continue;
            }
            for resource in stack.resources.iter().filter(|r| r.backup.is_some()) {
                let advisories = self.snapshot.backups.register(resource, now)?;
                self.violations.extend(advisories.into_iter().map(|v| v.in_phase(EvaluationPhase::Backup)));
            }
        }

        let stale: Vec<ResourceId> = self
            .snapshot
            .backups
            .registered()
            .filter(|id| !self.snapshot.resources.contains_key(*id))
            .cloned()
            .collect();
        for id in stale {
            if let Err(e) = self.snapshot.backups.deregister(&id) {
                warn!(resource = %id, error = %e, "Backup policy not deregistered");
            }
        }
        Ok(())
    }
}

fn declared_resources(stacks: &[Stack]) -> Vec<Resource> {
    stacks.iter().flat_map(|s| s.resources.iter().cloned()).collect()
}

fn index_by_name(stacks: &[Stack]) -> BTreeMap<StackName, &Stack> {
    stacks.iter().map(|s| (s.name.clone(), s)).collect()
}

/// Recorded Applied with exactly the declared resources and configuration
fn is_unchanged(stack: &Stack, snapshot: &DeploymentSnapshot) -> bool {
    if !snapshot.is_applied(&stack.name) {
        return false;
    }
    snapshot.stack_resources(&stack.name).len() == stack.resources.len()
        && stack.resources.iter().all(|resource| {
            snapshot
                .resources
                .get(&resource.id())
                .is_some_and(|record| record.resource.stack == stack.name && record.resource.same_configuration(resource))
        })
}

/// Settled this run: neither waiting nor applying
fn settled(name: &StackName, remaining: &[StackName], in_flight: &BTreeSet<StackName>) -> bool {
    !remaining.contains(name) && !in_flight.contains(name)
}

fn dependencies_applied(
    graph: &StackGraph,
    stack: &StackName,
    run: &Run,
    remaining: &[StackName],
    in_flight: &BTreeSet<StackName>,
) -> bool {
    graph.dependencies_of(stack).is_some_and(|deps| {
        deps.iter()
            .all(|dep| settled(dep, remaining, in_flight) && run.state(dep) == StackState::Applied)
    })
}

/// First dependency that settled without applying
fn unapplied_dependency(
    graph: &StackGraph,
    stack: &StackName,
    run: &Run,
    remaining: &[StackName],
    in_flight: &BTreeSet<StackName>,
) -> Option<StackName> {
    graph.dependencies_of(stack).and_then(|deps| {
        deps.iter()
            .find(|dep| settled(dep, remaining, in_flight) && run.state(dep) != StackState::Applied)
            .cloned()
    })
}

/// Compare recorded resources with the live inventory
pub fn detect_drift(snapshot: &DeploymentSnapshot, live: &[LiveResource]) -> Vec<Violation> {
    let by_provider: BTreeMap<&ProviderId, &Resource> =
        live.iter().map(|l| (&l.provider_id, &l.resource)).collect();
    let managed: BTreeSet<&ProviderId> = snapshot.resources.values().map(|r| &r.provider_id).collect();

    let mut drift = Vec::new();
    for (id, record) in &snapshot.resources {
        match by_provider.get(&record.provider_id) {
            None => drift.push(Violation::advisory(
                DRIFT_DETECTED,
                id.clone(),
                format!("{} no longer exists at the provider", record.provider_id),
            )),
            Some(current) if !current.same_configuration(&record.resource) => drift.push(Violation::advisory(
                DRIFT_DETECTED,
                id.clone(),
                "Live configuration differs from the last applied configuration",
            )),
            Some(_) => {}
        }
    }

    for entry in live.iter().filter(|l| !managed.contains(&l.provider_id)) {
        drift.push(Violation::advisory(
            UNMANAGED_RESOURCE,
            entry.resource.id(),
            format!("{} is live but no stack manages it", entry.provider_id),
        ));
    }

    drift
        .into_iter()
        .map(|v| v.in_phase(EvaluationPhase::Drift))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ResourceKind, StandardTags};
    use crate::state_store::ResourceRecord;

    fn bucket(name: &str) -> Resource {
        Resource::builder(ResourceKind::Bucket, name)
            .stack("storage")
            .tags(StandardTags::default().to_map())
            .build()
    }

    fn snapshot_with(resources: &[(Resource, &str)]) -> DeploymentSnapshot {
        let mut snapshot = DeploymentSnapshot::default();
        for (resource, provider_id) in resources {
            snapshot.resources.insert(
                resource.id(),
                ResourceRecord {
                    provider_id: ProviderId::new(*provider_id),
                    resource: resource.clone(),
                },
            );
        }
        snapshot
    }

    #[test]
    fn test_no_drift_when_live_matches() {
        let assets = bucket("assets");
        let snapshot = snapshot_with(&[(assets.clone(), "p-1")]);
        let live = vec![LiveResource {
            provider_id: ProviderId::new("p-1"),
            resource: assets,
        }];
        assert!(detect_drift(&snapshot, &live).is_empty());
    }

    #[test]
    fn test_drift_kinds() {
        let assets = bucket("assets");
        let logs = bucket("logs");
        let snapshot = snapshot_with(&[(assets.clone(), "p-1"), (logs, "p-2")]);

        let mut changed = assets.clone();
        changed.attributes.insert("versioning".into(), true.into());
        let live = vec![
            LiveResource {
                provider_id: ProviderId::new("p-1"),
                resource: changed,
            },
            LiveResource {
                provider_id: ProviderId::new("p-9"),
                resource: bucket("stray"),
            },
        ];

        let drift = detect_drift(&snapshot, &live);
        assert_eq!(drift.len(), 3);
        assert!(drift.iter().all(|v| v.severity == Severity::Advisory));
        assert!(drift.iter().all(|v| v.phase == EvaluationPhase::Drift));

        let names: Vec<(&str, String)> = drift
            .iter()
            .map(|v| (v.policy.as_str(), v.resource.as_ref().map(ToString::to_string).unwrap_or_default()))
            .collect();
        assert!(names.contains(&(DRIFT_DETECTED, "bucket/assets".to_string())));
        assert!(names.contains(&(DRIFT_DETECTED, "bucket/logs".to_string())));
        assert!(names.contains(&(UNMANAGED_RESOURCE, "bucket/stray".to_string())));
    }

    #[test]
    fn test_unchanged_requires_applied_and_equal() {
        let stack = Stack::new("storage").with_resource(bucket("assets"));
        let mut snapshot = snapshot_with(&[(bucket("assets"), "p-1")]);
        assert!(!is_unchanged(&stack, &snapshot));

        snapshot.stacks.insert(
            "storage".into(),
            StackRecord {
                state: StackState::Applied,
                resources: vec![bucket("assets").id()],
                updated_at: None,
            },
        );
        assert!(is_unchanged(&stack, &snapshot));

        let grown = stack.clone().with_resource(bucket("logs"));
        assert!(!is_unchanged(&grown, &snapshot));
    }
}
