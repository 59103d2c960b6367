// Copyright (c) 2025 - Cowboy AI, Inc.
//! Backup Compliance Check
//!
//! Pure function of a policy, a run history and the current time.
//!
//! # Rules
//!
//! - Compliant when the most recent successful backup is at most
//!   `rpo_minutes` old
//! - Two or more failed backups since the last success escalate to a
//!   blocking `BackupComplianceFailure`
//! - A restore drill that failed is reported as advisory

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::run::{BackupRun, RunKind};
use crate::domain::{BackupPolicy, ResourceId};
use crate::policy::{EvaluationPhase, Severity, Violation};

pub const BACKUP_COMPLIANCE_FAILURE: &str = "BackupComplianceFailure";
pub const BACKUP_RUN_FAILED: &str = "BackupRunFailed";
pub const RESTORE_DRILL_FAILED: &str = "RestoreDrillFailed";
pub const BACKUP_SCHEDULE_GAP: &str = "BackupScheduleGap";

/// Reason given when a history holds no successful backup
pub const NO_SUCCESS_REASON: &str = "No successful backup recorded";

/// Consecutive failures that escalate to blocking
pub const FAILURE_ESCALATION_THRESHOLD: u32 = 2;

/// A compliance finding not yet bound to a resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    pub policy: String,
    pub reason: String,
    pub severity: Severity,
}

/// Result of [`check_compliance`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplianceResult {
    pub compliant: bool,
    pub last_success_at: Option<DateTime<Utc>>,
    /// Age of the last success in whole minutes
    pub age_minutes: Option<i64>,
    pub consecutive_failures: u32,
    pub findings: Vec<Finding>,
}

impl ComplianceResult {
    /// Bind findings to a resource
    pub fn violations(&self, resource: &ResourceId) -> Vec<Violation> {
        self.findings
            .iter()
            .map(|f| Violation {
                policy: f.policy.clone(),
                resource: Some(resource.clone()),
                reason: f.reason.clone(),
                severity: f.severity,
                phase: EvaluationPhase::Backup,
            })
            .collect()
    }

    pub fn is_blocking(&self) -> bool {
        self.findings.iter().any(|f| f.severity == Severity::Blocking)
    }
}

/// Check a run history against its policy at `now`
pub fn check_compliance(policy: &BackupPolicy, history: &[BackupRun], now: DateTime<Utc>) -> ComplianceResult {
    let mut backups: Vec<&BackupRun> = history
        .iter()
        .filter(|r| r.kind == RunKind::Backup && r.state.is_finished())
        .collect();
    backups.sort_by_key(|r| r.reference_time());

    let last_success_at = backups
        .iter()
        .rev()
        .find(|r| r.succeeded())
        .map(|r| r.reference_time());

    let consecutive_failures = backups.iter().rev().take_while(|r| r.failed()).count() as u32;

    let age_minutes = last_success_at.map(|at| (now - at).num_minutes());
    let within_rpo = age_minutes.is_some_and(|age| age <= i64::from(policy.rpo_minutes));

    let mut findings = Vec::new();

    if !within_rpo {
        let reason = match age_minutes {
            Some(age) => format!(
                "Last successful backup is {} minutes old, RPO is {} minutes",
                age, policy.rpo_minutes
            ),
            None => NO_SUCCESS_REASON.to_string(),
        };
        findings.push(Finding {
            policy: BACKUP_COMPLIANCE_FAILURE.to_string(),
            reason,
            severity: Severity::Blocking,
        });
    }

    if consecutive_failures >= FAILURE_ESCALATION_THRESHOLD {
        findings.push(Finding {
            policy: BACKUP_COMPLIANCE_FAILURE.to_string(),
            reason: format!(
                "{} consecutive failed backups since the last success",
                consecutive_failures
            ),
            severity: Severity::Blocking,
        });
    } else if consecutive_failures == 1 {
        findings.push(Finding {
            policy: BACKUP_RUN_FAILED.to_string(),
            reason: "Most recent backup failed".to_string(),
            severity: Severity::Advisory,
        });
    }

    let last_drill = history
        .iter()
        .filter(|r| r.kind == RunKind::RestoreDrill && r.state.is_finished())
        .max_by_key(|r| r.reference_time());
    if let Some(drill) = last_drill.filter(|d| d.failed()) {
        findings.push(Finding {
            policy: RESTORE_DRILL_FAILED.to_string(),
            reason: format!(
                "Restore drill started {} did not complete within RTO of {} minutes",
                drill.started_at, policy.rto_minutes
            ),
            severity: Severity::Advisory,
        });
    }

    ComplianceResult {
        compliant: within_rpo && consecutive_failures < FAILURE_ESCALATION_THRESHOLD,
        last_success_at,
        age_minutes,
        consecutive_failures,
        findings,
    }
}
