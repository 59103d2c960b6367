// Copyright (c) 2025 - Cowboy AI, Inc.
//! Retention Planning
//!
//! Planning and deletion are separate steps: [`plan_retention`] only lists
//! what would go, and nothing is removed until the plan is applied.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::run::BackupRun;
use crate::domain::ResourceId;

/// A single planned deletion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetentionAction {
    pub resource: ResourceId,
    pub run_id: Uuid,
    pub reference_time: DateTime<Utc>,
}

/// Deletions planned at a point in time
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RetentionPlan {
    pub deletions: Vec<RetentionAction>,
}

impl RetentionPlan {
    pub fn is_empty(&self) -> bool {
        self.deletions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.deletions.len()
    }
}

/// The run retention must never delete: the latest successful backup
pub fn protected_run(history: &[BackupRun]) -> Option<Uuid> {
    history
        .iter()
        .filter(|r| r.is_backup() && r.succeeded())
        .max_by_key(|r| r.reference_time())
        .map(|r| r.id)
}

/// Runs older than `retention_days` at `now`
///
/// Running runs and the most recent successful backup are never planned.
pub fn plan_retention(retention_days: u32, history: &[BackupRun], now: DateTime<Utc>) -> Vec<RetentionAction> {
    let cutoff = now - Duration::days(i64::from(retention_days));
    let protected = protected_run(history);

    history
        .iter()
        .filter(|r| r.state.is_finished())
        .filter(|r| Some(r.id) != protected)
        .filter(|r| r.reference_time() < cutoff)
        .map(|r| RetentionAction {
            resource: r.resource.clone(),
            run_id: r.id,
            reference_time: r.reference_time(),
        })
        .collect()
}
