// Copyright (c) 2025 - Cowboy AI, Inc.
//! Deployment Report
//!
//! The operator-facing result of one orchestrator run. Nothing the run
//! observed is left out: failed stacks, rollback failures, every violation
//! and the backup compliance of every managed resource all appear here.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::backup::ResourceCompliance;
use crate::cost::CostReport;
use crate::domain::{ResourceId, StackName};
use crate::policy::{EvaluationPhase, Violation};
use crate::provider::ProviderId;
use crate::state_machine::{StackInput, StackState, Transition};

/// How far a run got
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeploymentOutcome {
    /// Every declared stack is Applied
    Applied,
    /// At least one stack rolled back or was skipped
    PartiallyApplied,
    /// Cancellation stopped the run
    Cancelled,
}

impl fmt::Display for DeploymentOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DeploymentOutcome::Applied => "applied",
            DeploymentOutcome::PartiallyApplied => "partially_applied",
            DeploymentOutcome::Cancelled => "cancelled",
        };
        write!(f, "{}", name)
    }
}

/// One recorded stack transition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StackTransition {
    pub stack: StackName,
    #[serde(flatten)]
    pub transition: Transition<StackState, StackInput>,
}

/// Why a stack was not attempted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "reason", content = "detail")]
pub enum SkipReason {
    /// A dependency rolled back or was itself skipped
    DependencyNotApplied(StackName),
    Cancelled,
    /// An earlier stack rolled back with fail-fast enabled
    FailFast,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedStack {
    pub stack: StackName,
    #[serde(flatten)]
    pub reason: SkipReason,
}

/// A stack attempt that rolled back
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackFailure {
    pub stack: StackName,
    /// Resource whose call failed, if any
    pub resource: Option<ResourceId>,
    pub reason: String,
}

/// A delete that did not go through
///
/// The resource is still live and must be reconciled by an operator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteFailure {
    pub stack: StackName,
    pub resource: ResourceId,
    pub provider_id: ProviderId,
    pub reason: String,
}

/// Result of one orchestrator run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeploymentReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub outcome: DeploymentOutcome,
    /// Resolved deployment order
    pub order: Vec<StackName>,
    /// Final state of every declared stack
    pub stacks: BTreeMap<StackName, StackState>,
    pub transitions: Vec<StackTransition>,
    /// Applied stacks left untouched because nothing changed
    pub unchanged: Vec<StackName>,
    pub skipped: Vec<SkippedStack>,
    pub failures: Vec<StackFailure>,
    pub rollback_failures: Vec<DeleteFailure>,
    /// Deletes of resources removed from their stack that failed
    pub prune_failures: Vec<DeleteFailure>,
    /// Policy, drift and backup violations
    pub violations: Vec<Violation>,
    /// Present once every stack is Applied
    pub cost: Option<CostReport>,
    pub backups: Vec<ResourceCompliance>,
}

impl DeploymentReport {
    pub fn stack_state(&self, stack: &StackName) -> Option<StackState> {
        self.stacks.get(stack).copied()
    }

    pub fn blocking_violations(&self) -> Vec<&Violation> {
        self.violations.iter().filter(|v| v.is_blocking()).collect()
    }

    pub fn violations_in(&self, phase: EvaluationPhase) -> Vec<&Violation> {
        self.violations.iter().filter(|v| v.phase == phase).collect()
    }

    /// Cost warnings, kept apart from policy violations
    pub fn cost_warnings(&self) -> &[Violation] {
        self.cost
            .as_ref()
            .map(|c| c.warnings.as_slice())
            .unwrap_or_default()
    }

    /// Transitions recorded for one stack, in order
    pub fn transitions_of(&self, stack: &StackName) -> Vec<&StackTransition> {
        self.transitions.iter().filter(|t| &t.stack == stack).collect()
    }

    /// Fully applied with nothing for an operator to look at
    pub fn is_clean(&self) -> bool {
        self.outcome == DeploymentOutcome::Applied
            && self.violations.is_empty()
            && self.rollback_failures.is_empty()
            && self.prune_failures.is_empty()
    }
}

/// Result of a dry run: resolution, gate and estimate without provider calls
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeploymentPlan {
    pub order: Vec<StackName>,
    /// Stacks a deploy would apply, in order
    pub to_apply: Vec<StackName>,
    /// Applied stacks a deploy would leave untouched
    pub unchanged: Vec<StackName>,
    pub violations: Vec<Violation>,
    pub cost: CostReport,
}

impl DeploymentPlan {
    pub fn is_blocked(&self) -> bool {
        self.violations.iter().any(Violation::is_blocking)
    }
}
