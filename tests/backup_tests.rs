// Copyright (c) 2025 - Cowboy AI, Inc.
//! Backup/Recovery Lifecycle Tests
//!
//! RPO compliance at the boundary, failure escalation, restore drills
//! against the RTO, the grace period after registration and retention.

mod fixtures;

use chrono::{DateTime, Duration, Utc};
use cim_provisioning::backup::{
    check_compliance, BackupLifecycleManager, BackupRun, RunOutcome, BACKUP_COMPLIANCE_FAILURE,
    BACKUP_RUN_FAILED, RESTORE_DRILL_FAILED,
};
use cim_provisioning::domain::{BackupPolicy, Resource, ResourceId};
use cim_provisioning::policy::Severity;
use cim_provisioning::state_machine::BackupState;
use cim_provisioning::ProvisioningError;
use fixtures::fixed_timestamp;
use pretty_assertions::assert_eq;
use test_case::test_case;

fn database() -> Resource {
    fixtures::database_instance("db")
}

fn finished(resource: &ResourceId, outcome: RunOutcome, minutes_ago: i64, now: DateTime<Utc>) -> BackupRun {
    let at = now - Duration::minutes(minutes_ago);
    BackupRun::completed(resource.clone(), outcome, at - Duration::minutes(5), at)
}

#[test_case(1430, true ; "inside rpo")]
#[test_case(1440, true ; "exactly rpo")]
#[test_case(1450, false ; "past rpo")]
fn test_rpo_boundary(age_minutes: i64, compliant: bool) {
    // Given: a 24 hour RPO and one successful backup `age_minutes` ago
    let now = fixed_timestamp();
    let db = database();
    let history = vec![finished(&db.id(), RunOutcome::Succeeded, age_minutes, now)];

    // When: checking compliance
    let result = check_compliance(&BackupPolicy::daily_standard(), &history, now);

    // Then: compliant iff the backup is no older than the RPO
    assert_eq!(result.compliant, compliant);
    assert_eq!(result.age_minutes, Some(age_minutes));
    let blocking: Vec<_> = result
        .findings
        .iter()
        .filter(|f| f.severity == Severity::Blocking)
        .collect();
    assert_eq!(blocking.is_empty(), compliant);
    if !compliant {
        assert_eq!(blocking[0].policy, BACKUP_COMPLIANCE_FAILURE);
    }
}

#[test]
fn test_two_consecutive_failures_escalate() {
    // Given: a recent success followed by two failures
    let now = fixed_timestamp();
    let db = database();
    let history = vec![
        finished(&db.id(), RunOutcome::Succeeded, 600, now),
        finished(&db.id(), RunOutcome::Failed, 300, now),
        finished(&db.id(), RunOutcome::Failed, 60, now),
    ];

    // When: checking compliance
    let result = check_compliance(&BackupPolicy::daily_standard(), &history, now);

    // Then: still inside RPO, but the failures block
    assert_eq!(result.consecutive_failures, 2);
    assert!(!result.compliant);
    assert!(result
        .findings
        .iter()
        .any(|f| f.policy == BACKUP_COMPLIANCE_FAILURE && f.severity == Severity::Blocking));
}

#[test]
fn test_single_failure_is_advisory() {
    let now = fixed_timestamp();
    let db = database();
    let history = vec![
        finished(&db.id(), RunOutcome::Succeeded, 600, now),
        finished(&db.id(), RunOutcome::Failed, 60, now),
    ];

    let result = check_compliance(&BackupPolicy::daily_standard(), &history, now);

    assert!(result.compliant);
    assert_eq!(result.findings.len(), 1);
    assert_eq!(result.findings[0].policy, BACKUP_RUN_FAILED);
    assert_eq!(result.findings[0].severity, Severity::Advisory);
}

#[test]
fn test_success_resets_failure_streak() {
    let now = fixed_timestamp();
    let db = database();
    let history = vec![
        finished(&db.id(), RunOutcome::Failed, 900, now),
        finished(&db.id(), RunOutcome::Failed, 600, now),
        finished(&db.id(), RunOutcome::Succeeded, 60, now),
    ];

    let result = check_compliance(&BackupPolicy::daily_standard(), &history, now);
    assert_eq!(result.consecutive_failures, 0);
    assert!(result.compliant);
    assert!(result.findings.is_empty());
}

#[test]
fn test_scheduled_backup_lifecycle() {
    // Given: a registered database at 12:00
    let now = fixed_timestamp();
    let db = database();
    let mut manager = BackupLifecycleManager::new();
    assert!(manager.register(&db, now).unwrap().is_empty());
    assert_eq!(manager.get(&db.id()).unwrap().state, BackupState::Scheduled);

    // When: ticking before and at the 03:00 schedule
    assert!(manager.tick(now + Duration::hours(1)).unwrap().is_empty());
    let due = manager.get(&db.id()).unwrap().next_run_at.unwrap();
    let started = manager.tick(due).unwrap();

    // Then: one run starts and completes
    assert_eq!(started.len(), 1);
    assert_eq!(manager.get(&db.id()).unwrap().state, BackupState::Running);

    let run = manager
        .confirm(started[0].id, RunOutcome::Succeeded, due + Duration::minutes(12))
        .unwrap();
    assert_eq!(run.state, BackupState::Succeeded);

    let managed = manager.get(&db.id()).unwrap();
    assert_eq!(managed.state, BackupState::Succeeded);
    assert_eq!(managed.next_run_at, Some(due + Duration::days(1)));
    assert!(manager.check(&db.id(), due + Duration::hours(1)).unwrap().compliant());
}

#[test]
fn test_confirming_twice_is_rejected() {
    let now = fixed_timestamp();
    let db = database();
    let mut manager = BackupLifecycleManager::new();
    manager.register(&db, now).unwrap();

    let due = manager.get(&db.id()).unwrap().next_run_at.unwrap();
    let run = manager.tick(due).unwrap().remove(0);
    manager.confirm(run.id, RunOutcome::Failed, due).unwrap();

    assert!(manager.confirm(run.id, RunOutcome::Succeeded, due).is_err());
}

#[test]
fn test_grace_period_lasts_one_rpo() {
    // Given: a freshly registered database with no backups
    let now = fixed_timestamp();
    let db = database();
    let mut manager = BackupLifecycleManager::new();
    manager.register(&db, now).unwrap();

    // Then: compliant until one RPO after registration
    let early = manager.check(&db.id(), now + Duration::minutes(1439)).unwrap();
    assert!(early.in_grace_period);
    assert!(early.compliant());
    assert!(early.violations().is_empty());

    let late = manager.check(&db.id(), now + Duration::minutes(1441)).unwrap();
    assert!(!late.in_grace_period);
    assert!(!late.compliant());
    assert_eq!(late.violations()[0].policy, BACKUP_COMPLIANCE_FAILURE);
}

#[test]
fn test_restore_drill_over_rto_fails() {
    // Given: a 4 hour RTO
    let now = fixed_timestamp();
    let db = database();
    let mut manager = BackupLifecycleManager::new();
    manager.register(&db, now).unwrap();
    manager
        .record(finished(&db.id(), RunOutcome::Succeeded, 0, now))
        .unwrap();

    // When: a drill reports success after five hours
    let drill = manager.trigger_restore_drill(&db.id(), now).unwrap();
    let drill = manager
        .confirm(drill.id, RunOutcome::Succeeded, now + Duration::hours(5))
        .unwrap();

    // Then: it is recorded as failed and reported as advisory
    assert_eq!(drill.state, BackupState::Failed);
    let compliance = manager.check(&db.id(), now + Duration::hours(5)).unwrap();
    assert!(compliance.compliant());
    let violations = compliance.violations();
    assert_eq!(violations.len(), 1);
    assert_eq!(violations[0].policy, RESTORE_DRILL_FAILED);
    assert_eq!(violations[0].severity, Severity::Advisory);
}

#[test]
fn test_unregistered_resource_errors() {
    let manager = BackupLifecycleManager::new();
    let err = manager.check(&database().id(), fixed_timestamp()).unwrap_err();
    assert!(matches!(err, ProvisioningError::BackupNotRegistered(_)));
}

#[test]
fn test_register_without_policy_errors() {
    let mut db = database();
    db.backup = None;

    let mut manager = BackupLifecycleManager::new();
    assert!(matches!(
        manager.register(&db, fixed_timestamp()),
        Err(ProvisioningError::InvalidModel(_))
    ));
}

#[test]
fn test_retention_keeps_latest_success() {
    // Given: 7-day retention and only old runs
    let now = fixed_timestamp();
    let db = database();
    let mut manager = BackupLifecycleManager::new();
    manager.register(&db, now - Duration::days(30)).unwrap();
    for days in [20, 15, 10] {
        manager
            .record(finished(&db.id(), RunOutcome::Succeeded, days * 24 * 60, now))
            .unwrap();
    }
    manager
        .record(finished(&db.id(), RunOutcome::Failed, 9 * 24 * 60, now))
        .unwrap();

    // When: planning and applying retention
    let plan = manager.plan_retention(now);
    let removed = manager.apply_retention(&plan);

    // Then: everything expired goes except the newest success
    assert_eq!(plan.len(), 3);
    assert_eq!(removed, 3);
    let history = manager.history(&db.id()).unwrap();
    assert_eq!(history.len(), 1);
    assert!(history[0].succeeded());
}

#[test]
fn test_retained_history_survives_deregistration() {
    let now = fixed_timestamp();
    let db = database();
    let mut manager = BackupLifecycleManager::new();
    manager.register(&db, now).unwrap();
    manager
        .record(finished(&db.id(), RunOutcome::Succeeded, 60, now))
        .unwrap();

    manager.deregister(&db.id()).unwrap();

    assert!(!manager.is_registered(&db.id()));
    assert_eq!(manager.retained().count(), 1);
    assert_eq!(manager.history(&db.id()).unwrap().len(), 1);

    // Re-registering picks the history back up
    manager.register(&db, now).unwrap();
    assert_eq!(manager.get(&db.id()).unwrap().history.len(), 1);
    assert_eq!(manager.retained().count(), 0);
}

#[test]
fn test_history_dropped_without_retain_on_delete() {
    let now = fixed_timestamp();
    let mut db = database();
    db.backup = Some(BackupPolicy::daily_standard().retain_on_delete(false));
    let mut manager = BackupLifecycleManager::new();
    manager.register(&db, now).unwrap();

    manager.deregister(&db.id()).unwrap();
    assert!(manager.history(&db.id()).is_none());
}
