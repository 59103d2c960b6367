// Copyright (c) 2025 - Cowboy AI, Inc.
//! Policy Engine
//!
//! Policies are pure predicates over a resource snapshot. The engine runs
//! every registered policy and returns every violation; no policy can stop
//! another from being evaluated.
//!
//! # Evaluation Points
//!
//! ```text
//! declared model ──► pre-deployment gate ──► per-stack gate ──► provider
//!                                                                  │
//!                         post-deployment pass ◄── list_all() ◄────┘
//! ```
//!
//! Blocking violations at the pre-deployment gate abort the run before any
//! provider call. Blocking violations after deployment are reported and the
//! live resources are left untouched.
//!
//! # Built-in Policies
//!
//! - [`SecurityGroupLeastPrivilege`] (mandatory)
//! - [`ResourceTaggingCompliance`] (mandatory)
//! - [`EncryptionAtRestRequired`]
//! - [`BackupPolicyPresence`]
//! - [`SecurityBoundaryReference`]

pub mod backup_presence;
pub mod boundary_reference;
pub mod encryption;
pub mod least_privilege;
pub mod tagging;

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use crate::domain::{Resource, ResourceId};

pub use backup_presence::BackupPolicyPresence;
pub use boundary_reference::SecurityBoundaryReference;
pub use encryption::EncryptionAtRestRequired;
pub use least_privilege::SecurityGroupLeastPrivilege;
pub use tagging::ResourceTaggingCompliance;

/// How a violation affects the run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Advisory,
    Blocking,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Advisory => write!(f, "advisory"),
            Severity::Blocking => write!(f, "blocking"),
        }
    }
}

/// Where in the run a violation was produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvaluationPhase {
    PreDeployment,
    StackGate,
    PostDeployment,
    Drift,
    Cost,
    Backup,
}

/// A single policy breach
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    pub policy: String,
    /// `None` for aggregate findings such as budget thresholds
    pub resource: Option<ResourceId>,
    pub reason: String,
    pub severity: Severity,
    pub phase: EvaluationPhase,
}

impl Violation {
    pub fn blocking(policy: impl Into<String>, resource: ResourceId, reason: impl Into<String>) -> Self {
        Self {
            policy: policy.into(),
            resource: Some(resource),
            reason: reason.into(),
            severity: Severity::Blocking,
            phase: EvaluationPhase::PreDeployment,
        }
    }

    pub fn advisory(policy: impl Into<String>, resource: ResourceId, reason: impl Into<String>) -> Self {
        Self {
            severity: Severity::Advisory,
            ..Self::blocking(policy, resource, reason)
        }
    }

    /// Finding not tied to a single resource
    pub fn aggregate(policy: impl Into<String>, reason: impl Into<String>, severity: Severity) -> Self {
        Self {
            policy: policy.into(),
            resource: None,
            reason: reason.into(),
            severity,
            phase: EvaluationPhase::Cost,
        }
    }

    pub fn in_phase(mut self, phase: EvaluationPhase) -> Self {
        self.phase = phase;
        self
    }

    pub fn downgraded(mut self) -> Self {
        self.severity = Severity::Advisory;
        self
    }

    pub fn is_blocking(&self) -> bool {
        self.severity == Severity::Blocking
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.resource {
            Some(resource) => write!(
                f,
                "[{}] {} on {}: {}",
                self.severity, self.policy, resource, self.reason
            ),
            None => write!(f, "[{}] {}: {}", self.severity, self.policy, self.reason),
        }
    }
}

/// A named, stateless predicate over a resource snapshot
pub trait Policy: Send + Sync {
    fn name(&self) -> &str;

    /// Evaluate against the whole snapshot; never mutates
    fn evaluate(&self, resources: &[Resource]) -> Vec<Violation>;
}

/// Policy backed by a plain function
pub struct FnPolicy<F> {
    name: String,
    check: F,
}

impl<F> FnPolicy<F>
where
    F: Fn(&[Resource]) -> Vec<Violation> + Send + Sync,
{
    pub fn new(name: impl Into<String>, check: F) -> Self {
        Self {
            name: name.into(),
            check,
        }
    }
}

impl<F> Policy for FnPolicy<F>
where
    F: Fn(&[Resource]) -> Vec<Violation> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn evaluate(&self, resources: &[Resource]) -> Vec<Violation> {
        (self.check)(resources)
    }
}

/// Run every policy and collect every violation
pub fn evaluate(resources: &[Resource], policies: &[Arc<dyn Policy>]) -> Vec<Violation> {
    policies
        .iter()
        .flat_map(|policy| policy.evaluate(resources))
        .collect()
}

/// Registry of policies evaluated together
#[derive(Clone, Default)]
pub struct PolicyEngine {
    policies: Vec<Arc<dyn Policy>>,
}

impl PolicyEngine {
    /// Engine with no policies
    pub fn empty() -> Self {
        Self::default()
    }

    /// Engine with the two mandatory policies
    pub fn mandatory() -> Self {
        Self::empty()
            .register(SecurityGroupLeastPrivilege)
            .register(ResourceTaggingCompliance)
    }

    /// Engine with every built-in policy
    pub fn standard() -> Self {
        Self::mandatory()
            .register(EncryptionAtRestRequired)
            .register(BackupPolicyPresence)
            .register(SecurityBoundaryReference)
    }

    pub fn register(mut self, policy: impl Policy + 'static) -> Self {
        self.policies.push(Arc::new(policy));
        self
    }

    /// Register a closure as a policy
    pub fn register_fn<F>(self, name: impl Into<String>, check: F) -> Self
    where
        F: Fn(&[Resource]) -> Vec<Violation> + Send + Sync + 'static,
    {
        self.register(FnPolicy::new(name, check))
    }

    pub fn policy_names(&self) -> BTreeSet<String> {
        self.policies.iter().map(|p| p.name().to_string()).collect()
    }

    pub fn policies(&self) -> &[Arc<dyn Policy>] {
        &self.policies
    }

    /// Evaluate every policy, tagging violations with `phase`
    pub fn evaluate(&self, resources: &[Resource], phase: EvaluationPhase) -> Vec<Violation> {
        evaluate(resources, &self.policies)
            .into_iter()
            .map(|v| v.in_phase(phase))
            .collect()
    }

    /// Evaluate, treating policies new to `known_policies` as retroactive
    ///
    /// A policy that has never been evaluated before cannot have been
    /// satisfied by resources that already exist, so its blocking
    /// violations on `existing` resources are reported as advisory.
    pub fn evaluate_with_baseline(
        &self,
        resources: &[Resource],
        phase: EvaluationPhase,
        known_policies: &BTreeSet<String>,
        existing: &BTreeSet<ResourceId>,
    ) -> Vec<Violation> {
        self.policies
            .iter()
            .flat_map(|policy| {
                let retroactive = !known_policies.is_empty() && !known_policies.contains(policy.name());
                policy.evaluate(resources).into_iter().map(move |v| {
                    let on_existing = v.resource.as_ref().is_some_and(|r| existing.contains(r));
                    let v = v.in_phase(phase);
                    if retroactive && on_existing {
                        v.downgraded()
                    } else {
                        v
                    }
                })
            })
            .collect()
    }
}

impl fmt::Debug for PolicyEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PolicyEngine")
            .field("policies", &self.policy_names())
            .finish()
    }
}

/// Only the blocking violations
pub fn blocking(violations: &[Violation]) -> Vec<Violation> {
    violations.iter().filter(|v| v.is_blocking()).cloned().collect()
}
