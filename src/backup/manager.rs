// Copyright (c) 2025 - Cowboy AI, Inc.
//! Backup Lifecycle Manager
//!
//! Owns one [`ManagedBackup`] per registered stateful resource. The manager
//! is a plain value: the orchestrator holds it, mutates it from a single
//! task, and persists it with the deployment snapshot.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::compliance::{
    check_compliance, ComplianceResult, BACKUP_COMPLIANCE_FAILURE, BACKUP_SCHEDULE_GAP,
    NO_SUCCESS_REASON,
};
use super::retention::{plan_retention, protected_run, RetentionPlan};
use super::run::{BackupRun, RunKind, RunOutcome};
use crate::domain::{BackupPolicy, Resource, ResourceId};
use crate::errors::{ProvisioningError, ProvisioningResult};
use crate::policy::{EvaluationPhase, Violation};
use crate::state_machine::{BackupInput, BackupState, StateMachine, TransitionError};

/// Backup state for one resource
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManagedBackup {
    pub resource: ResourceId,
    pub policy: BackupPolicy,
    pub registered_at: DateTime<Utc>,
    pub state: BackupState,
    pub next_run_at: Option<DateTime<Utc>>,
    pub history: Vec<BackupRun>,
}

impl ManagedBackup {
    fn apply(&mut self, input: BackupInput) -> ProvisioningResult<()> {
        let (next, _) = self.state.transition(&input)?;
        debug!(resource = %self.resource, from = %self.state, to = %next, "Backup transition");
        self.state = next;
        Ok(())
    }
}

/// History kept after its resource was deleted with `retain_on_delete`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetainedHistory {
    pub policy: BackupPolicy,
    pub history: Vec<BackupRun>,
}

/// Compliance of one registered resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceCompliance {
    pub resource: ResourceId,
    pub checked_at: DateTime<Utc>,
    /// No success yet, but still within one RPO of registration
    pub in_grace_period: bool,
    pub result: ComplianceResult,
}

impl ResourceCompliance {
    pub fn compliant(&self) -> bool {
        self.result.compliant
    }

    pub fn violations(&self) -> Vec<Violation> {
        self.result.violations(&self.resource)
    }
}

/// Registry of backup policies and their run histories
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BackupLifecycleManager {
    managed: BTreeMap<ResourceId, ManagedBackup>,
    #[serde(default)]
    retained: BTreeMap<ResourceId, RetainedHistory>,
}

impl BackupLifecycleManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or update the backup policy of a stateful resource
    ///
    /// Returns advisory violations when the schedule cannot meet the RPO.
    ///
    /// # Errors
    ///
    /// - `InvalidModel` if the resource declares no backup policy
    pub fn register(&mut self, resource: &Resource, now: DateTime<Utc>) -> ProvisioningResult<Vec<Violation>> {
        let policy = resource.backup.clone().ok_or_else(|| {
            ProvisioningError::InvalidModel(format!("{} has no backup policy", resource.id()))
        })?;
        let id = resource.id();

        if let Some(existing) = self.managed.get_mut(&id) {
            if existing.policy == policy {
                return Ok(Vec::new());
            }
            info!(resource = %id, schedule = %policy.schedule, "Backup policy updated");
            if existing.state != BackupState::Running {
                existing.next_run_at = policy.schedule.next_after(now);
            }
            existing.policy = policy.clone();
            return Ok(schedule_gap(&id, &policy, now));
        }

        let history = self
            .retained
            .remove(&id)
            .map(|r| r.history)
            .unwrap_or_default();

        let mut managed = ManagedBackup {
            resource: id.clone(),
            policy: policy.clone(),
            registered_at: now,
            state: BackupState::Unscheduled,
            next_run_at: policy.schedule.next_after(now),
            history,
        };
        managed.apply(BackupInput::Schedule)?;

        info!(
            resource = %id,
            schedule = %policy.schedule,
            rpo_minutes = policy.rpo_minutes,
            "Backup policy registered"
        );
        self.managed.insert(id.clone(), managed);
        Ok(schedule_gap(&id, &policy, now))
    }

    /// Stop managing a resource's backups
    ///
    /// History survives in the retained set when the policy asks for it.
    pub fn deregister(&mut self, resource: &ResourceId) -> ProvisioningResult<Option<ManagedBackup>> {
        let Some(managed) = self.managed.get_mut(resource) else {
            return Ok(None);
        };
        managed.apply(BackupInput::Unschedule)?;

        let managed = self.managed.remove(resource);
        if let Some(managed) = &managed {
            if managed.policy.retain_on_delete {
                info!(resource = %resource, runs = managed.history.len(), "Backup history retained");
                self.retained.insert(
                    resource.clone(),
                    RetainedHistory {
                        policy: managed.policy.clone(),
                        history: managed.history.clone(),
                    },
                );
            }
        }
        Ok(managed)
    }

    /// Start every backup that is due at `now`
    pub fn tick(&mut self, now: DateTime<Utc>) -> ProvisioningResult<Vec<BackupRun>> {
        let mut started = Vec::new();

        for managed in self.managed.values_mut() {
            let due = managed.next_run_at.is_some_and(|at| at <= now);
            if !due || matches!(managed.state, BackupState::Running | BackupState::Unscheduled) {
                continue;
            }
            if managed.state.is_finished() {
                managed.apply(BackupInput::Reschedule)?;
            }
            managed.apply(BackupInput::Start)?;

            let run = BackupRun::start(managed.resource.clone(), RunKind::Backup, now);
            debug!(resource = %managed.resource, run = %run.id, "Backup started");
            managed.history.push(run.clone());
            managed.next_run_at = None;
            started.push(run);
        }
        Ok(started)
    }

    /// Start a restore drill outside the backup schedule
    pub fn trigger_restore_drill(
        &mut self,
        resource: &ResourceId,
        now: DateTime<Utc>,
    ) -> ProvisioningResult<BackupRun> {
        let managed = self
            .managed
            .get_mut(resource)
            .ok_or_else(|| ProvisioningError::BackupNotRegistered(resource.clone()))?;
        let run = BackupRun::start(resource.clone(), RunKind::RestoreDrill, now);
        managed.history.push(run.clone());
        Ok(run)
    }

    /// Record the outcome of a running run
    ///
    /// A restore drill reported successful after more than `rto_minutes`
    /// is recorded as failed.
    pub fn confirm(
        &mut self,
        run_id: Uuid,
        outcome: RunOutcome,
        at: DateTime<Utc>,
    ) -> ProvisioningResult<BackupRun> {
        let managed = self
            .managed
            .values_mut()
            .find(|m| m.history.iter().any(|r| r.id == run_id))
            .ok_or(ProvisioningError::UnknownBackupRun(run_id))?;

        let rto = Duration::minutes(i64::from(managed.policy.rto_minutes));
        let run = managed
            .history
            .iter_mut()
            .find(|r| r.id == run_id)
            .ok_or(ProvisioningError::UnknownBackupRun(run_id))?;

        if run.state != BackupState::Running {
            return Err(TransitionError::InvalidTransition {
                from: run.state.to_string(),
                to: format!("{:?}", outcome),
            }
            .into());
        }

        let outcome = match (run.kind, outcome) {
            (RunKind::RestoreDrill, RunOutcome::Succeeded) if at - run.started_at > rto => {
                warn!(resource = %run.resource, run = %run.id, "Restore drill exceeded RTO");
                RunOutcome::Failed
            }
            (_, outcome) => outcome,
        };
        run.state = outcome.into();
        run.finished_at = Some(at);
        let run = run.clone();

        if run.kind == RunKind::Backup && managed.state == BackupState::Running {
            managed.apply(match outcome {
                RunOutcome::Succeeded => BackupInput::Succeed,
                RunOutcome::Failed => BackupInput::Fail,
            })?;
            managed.next_run_at = managed.policy.schedule.next_after(at);
        }

        match outcome {
            RunOutcome::Succeeded => info!(resource = %run.resource, kind = ?run.kind, "Run succeeded"),
            RunOutcome::Failed => warn!(resource = %run.resource, kind = ?run.kind, "Run failed"),
        }
        Ok(run)
    }

    /// Append an externally observed, finished run
    pub fn record(&mut self, run: BackupRun) -> ProvisioningResult<()> {
        let managed = self
            .managed
            .get_mut(&run.resource)
            .ok_or_else(|| ProvisioningError::BackupNotRegistered(run.resource.clone()))?;
        managed.history.push(run);
        Ok(())
    }

    /// Compliance of one resource at `now`
    pub fn check(&self, resource: &ResourceId, now: DateTime<Utc>) -> ProvisioningResult<ResourceCompliance> {
        let managed = self
            .managed
            .get(resource)
            .ok_or_else(|| ProvisioningError::BackupNotRegistered(resource.clone()))?;
        Ok(compliance_of(managed, now))
    }

    /// Compliance of every registered resource at `now`
    pub fn check_all(&self, now: DateTime<Utc>) -> Vec<ResourceCompliance> {
        self.managed.values().map(|m| compliance_of(m, now)).collect()
    }

    /// Plan deletion of expired runs across live and retained histories
    pub fn plan_retention(&self, now: DateTime<Utc>) -> RetentionPlan {
        let live = self
            .managed
            .values()
            .flat_map(|m| plan_retention(m.policy.retention_days, &m.history, now));
        let retained = self
            .retained
            .values()
            .flat_map(|r| plan_retention(r.policy.retention_days, &r.history, now));

        RetentionPlan {
            deletions: live.chain(retained).collect(),
        }
    }

    /// Delete the runs named in `plan`; returns how many were removed
    ///
    /// The latest successful backup of each history is kept even when a
    /// stale plan names it.
    pub fn apply_retention(&mut self, plan: &RetentionPlan) -> usize {
        let mut removed = 0;
        let histories = self
            .managed
            .iter_mut()
            .map(|(id, m)| (id, &mut m.history))
            .chain(self.retained.iter_mut().map(|(id, r)| (id, &mut r.history)));

        for (resource, history) in histories {
            let protected = protected_run(history);
            let before = history.len();
            history.retain(|run| {
                Some(run.id) == protected
                    || !plan
                        .deletions
                        .iter()
                        .any(|a| &a.resource == resource && a.run_id == run.id)
            });
            removed += before - history.len();
        }

        if removed > 0 {
            info!(removed, "Retention applied");
        }
        removed
    }

    pub fn get(&self, resource: &ResourceId) -> Option<&ManagedBackup> {
        self.managed.get(resource)
    }

    pub fn history(&self, resource: &ResourceId) -> Option<&[BackupRun]> {
        self.managed
            .get(resource)
            .map(|m| m.history.as_slice())
            .or_else(|| self.retained.get(resource).map(|r| r.history.as_slice()))
    }

    pub fn is_registered(&self, resource: &ResourceId) -> bool {
        self.managed.contains_key(resource)
    }

    pub fn registered(&self) -> impl Iterator<Item = &ResourceId> {
        self.managed.keys()
    }

    pub fn retained(&self) -> impl Iterator<Item = &ResourceId> {
        self.retained.keys()
    }
}

fn compliance_of(managed: &ManagedBackup, now: DateTime<Utc>) -> ResourceCompliance {
    let mut result = check_compliance(&managed.policy, &managed.history, now);
    let grace_ends = managed.registered_at + Duration::minutes(i64::from(managed.policy.rpo_minutes));
    let in_grace_period = result.last_success_at.is_none() && now <= grace_ends;

    if in_grace_period {
        result
            .findings
            .retain(|f| !(f.policy == BACKUP_COMPLIANCE_FAILURE && f.reason == NO_SUCCESS_REASON));
        result.compliant = !result.is_blocking();
    }

    ResourceCompliance {
        resource: managed.resource.clone(),
        checked_at: now,
        in_grace_period,
        result,
    }
}

fn schedule_gap(resource: &ResourceId, policy: &BackupPolicy, now: DateTime<Utc>) -> Vec<Violation> {
    match policy.schedule.max_gap_minutes(now) {
        Some(gap) if gap > i64::from(policy.rpo_minutes) => vec![Violation::advisory(
            BACKUP_SCHEDULE_GAP,
            resource.clone(),
            format!(
                "Schedule {} leaves gaps of {} minutes, longer than the RPO of {} minutes",
                policy.schedule, gap, policy.rpo_minutes
            ),
        )
        .in_phase(EvaluationPhase::Backup)],
        _ => Vec::new(),
    }
}
