// Copyright (c) 2025 - Cowboy AI, Inc.
//! Backup/Recovery Lifecycle
//!
//! Tracks backups of stateful resources against their RPO and RTO.
//!
//! # Architecture
//!
//! ```text
//! deploy ──register──► BackupLifecycleManager ──tick──► BackupRun (Running)
//!                              │                             │
//!                              │◄────────confirm(outcome)────┘
//!                              │
//!                   check_all ─┴─► ResourceCompliance ──► AlertSink
//! ```
//!
//! Compliance failures are reported, never remediated. Retention is planned
//! first and applied as a separate step.

pub mod compliance;
pub mod manager;
pub mod retention;
pub mod run;

pub use compliance::{
    check_compliance, ComplianceResult, Finding, BACKUP_COMPLIANCE_FAILURE, BACKUP_RUN_FAILED,
    BACKUP_SCHEDULE_GAP, RESTORE_DRILL_FAILED,
};
pub use manager::{BackupLifecycleManager, ManagedBackup, ResourceCompliance, RetainedHistory};
pub use retention::{RetentionAction, RetentionPlan};
pub use run::{BackupRun, RunKind, RunOutcome};
