// Copyright (c) 2025 - Cowboy AI, Inc.
//! Backup Policy Value Object

use serde::{Deserialize, Serialize};

use super::schedule::Schedule;

/// Backup policy attached to a stateful resource
///
/// RTO bounds how long a restore may take; RPO bounds how stale the most
/// recent successful backup may be.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupPolicy {
    pub schedule: Schedule,
    pub retention_days: u32,
    pub rto_minutes: u32,
    pub rpo_minutes: u32,
    /// Keep backup history after the resource is deleted
    #[serde(default)]
    pub retain_on_delete: bool,
}

impl BackupPolicy {
    pub fn new(schedule: Schedule, retention_days: u32, rto_minutes: u32, rpo_minutes: u32) -> Self {
        Self {
            schedule,
            retention_days,
            rto_minutes,
            rpo_minutes,
            retain_on_delete: false,
        }
    }

    /// Daily 03:00 UTC, 7-day retention, 4 hour RTO, 24 hour RPO
    pub fn daily_standard() -> Self {
        Self {
            schedule: Schedule::daily_at(3, 0),
            retention_days: 7,
            rto_minutes: 240,
            rpo_minutes: 1440,
            retain_on_delete: true,
        }
    }

    pub fn retain_on_delete(mut self, retain: bool) -> Self {
        self.retain_on_delete = retain;
        self
    }
}
