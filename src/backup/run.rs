// Copyright (c) 2025 - Cowboy AI, Inc.
//! Backup Run Records

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::ResourceId;
use crate::state_machine::BackupState;

/// What a run does
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunKind {
    Backup,
    RestoreDrill,
}

/// Outcome reported for a running run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    Succeeded,
    Failed,
}

/// One backup or restore-drill attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupRun {
    pub id: Uuid,
    pub resource: ResourceId,
    pub kind: RunKind,
    /// `Running`, `Succeeded` or `Failed`
    pub state: BackupState,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl BackupRun {
    pub fn start(resource: ResourceId, kind: RunKind, at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::now_v7(),
            resource,
            kind,
            state: BackupState::Running,
            started_at: at,
            finished_at: None,
        }
    }

    /// A backup that finished at `finished_at`
    pub fn completed(
        resource: ResourceId,
        outcome: RunOutcome,
        started_at: DateTime<Utc>,
        finished_at: DateTime<Utc>,
    ) -> Self {
        Self {
            state: outcome.into(),
            finished_at: Some(finished_at),
            ..Self::start(resource, RunKind::Backup, started_at)
        }
    }

    /// When the run ended, or began if still running
    pub fn reference_time(&self) -> DateTime<Utc> {
        self.finished_at.unwrap_or(self.started_at)
    }

    pub fn duration(&self) -> Option<Duration> {
        self.finished_at.map(|end| end - self.started_at)
    }

    pub fn is_backup(&self) -> bool {
        self.kind == RunKind::Backup
    }

    pub fn succeeded(&self) -> bool {
        self.state == BackupState::Succeeded
    }

    pub fn failed(&self) -> bool {
        self.state == BackupState::Failed
    }
}

impl From<RunOutcome> for BackupState {
    fn from(outcome: RunOutcome) -> Self {
        match outcome {
            RunOutcome::Succeeded => BackupState::Succeeded,
            RunOutcome::Failed => BackupState::Failed,
        }
    }
}
