// Copyright (c) 2025 - Cowboy AI, Inc.
//! Deployment Snapshot
//!
//! Everything a later run needs to resume: the resolved order, each stack's
//! state, the last-known configuration and provider id of every resource,
//! the last cost report and the backup histories.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::backup::BackupLifecycleManager;
use crate::cost::CostReport;
use crate::domain::{Resource, ResourceId, StackName};
use crate::provider::ProviderId;
use crate::state_machine::StackState;

/// Persisted state of one stack
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StackRecord {
    pub state: StackState,
    /// Resources the stack owned when it last applied
    pub resources: Vec<ResourceId>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Last-known state of one resource
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceRecord {
    pub provider_id: ProviderId,
    pub resource: Resource,
}

/// Persisted deployment state
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DeploymentSnapshot {
    pub order: Vec<StackName>,
    pub stacks: BTreeMap<StackName, StackRecord>,
    pub resources: BTreeMap<ResourceId, ResourceRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost_report: Option<CostReport>,
    #[serde(default)]
    pub backups: BackupLifecycleManager,
    /// Policy names evaluated by any earlier run
    #[serde(default)]
    pub evaluated_policies: BTreeSet<String>,
    pub first_applied_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl DeploymentSnapshot {
    pub fn stack_state(&self, stack: &StackName) -> StackState {
        self.stacks
            .get(stack)
            .map(|record| record.state)
            .unwrap_or_default()
    }

    pub fn is_applied(&self, stack: &StackName) -> bool {
        self.stack_state(stack) == StackState::Applied
    }

    /// Recorded resources owned by `stack`
    pub fn stack_resources(&self, stack: &StackName) -> Vec<&ResourceRecord> {
        self.resources
            .values()
            .filter(|record| &record.resource.stack == stack)
            .collect()
    }

    /// Every recorded resource
    pub fn known_resources(&self) -> BTreeSet<ResourceId> {
        self.resources.keys().cloned().collect()
    }

    /// Stacks recorded Applied, in recorded order
    pub fn applied_stacks(&self) -> Vec<StackName> {
        self.order
            .iter()
            .filter(|name| self.is_applied(name))
            .cloned()
            .collect()
    }
}
