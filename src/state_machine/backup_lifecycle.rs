// Copyright (c) 2025 - Cowboy AI, Inc.
//! Backup Lifecycle State Machine
//!
//! One machine per registered backup policy.
//!
//! ```text
//! Unscheduled ──Schedule──► Scheduled ──Start──► Running ──Succeed──► Succeeded
//!      ▲                        ▲                   │                     │
//!      │                        │                   └──Fail──► Failed     │
//!      │                        └──────Reschedule─────────────────┴───────┘
//!      └──Unschedule (any state but Running)
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

use super::{StateMachine, TransitionError, TransitionResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackupState {
    #[default]
    Unscheduled,
    Scheduled,
    Running,
    Succeeded,
    Failed,
}

impl BackupState {
    /// A run has ended, successfully or not
    pub fn is_finished(&self) -> bool {
        matches!(self, BackupState::Succeeded | BackupState::Failed)
    }
}

impl fmt::Display for BackupState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackupInput {
    Schedule,
    Start,
    Succeed,
    Fail,
    Reschedule,
    Unschedule,
}

impl StateMachine for BackupState {
    type Input = BackupInput;
    type Output = ();

    fn transition(&self, input: &Self::Input) -> TransitionResult<(Self, Self::Output)> {
        use BackupInput::*;
        use BackupState::*;

        match (self, input) {
            (Unscheduled, Schedule) => Ok((Scheduled, ())),
            (Scheduled, Start) => Ok((Running, ())),
            (Running, Succeed) => Ok((Succeeded, ())),
            (Running, Fail) => Ok((Failed, ())),
            (Succeeded | Failed, Reschedule) => Ok((Scheduled, ())),
            (Running, Unschedule) => Err(TransitionError::BusinessRuleViolation(
                "Cannot unschedule a running backup".to_string(),
            )),
            (_, Unschedule) => Ok((Unscheduled, ())),
            (from, to) => Err(TransitionError::InvalidTransition {
                from: from.to_string(),
                to: format!("{:?}", to),
            }),
        }
    }

    fn valid_inputs(&self) -> Vec<Self::Input> {
        use BackupInput::*;

        match self {
            BackupState::Unscheduled => vec![Schedule, Unschedule],
            BackupState::Scheduled => vec![Start, Unschedule],
            BackupState::Running => vec![Succeed, Fail],
            BackupState::Succeeded | BackupState::Failed => vec![Reschedule, Unschedule],
        }
    }
}
