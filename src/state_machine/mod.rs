// Copyright (c) 2025 - Cowboy AI, Inc.
//! Lifecycle state machines
//!
//! Stacks and backup plans move through explicit, pure transition tables.
//! The orchestrator drives [`StackState`] once per stack per run and keeps
//! the history for the run report; the backup manager drives
//! [`BackupState`] per plan.
//!
//! - [`StackState`] - `Pending → Applying → Applied | RolledBack`, `Pending → Skipped`
//! - [`BackupState`] - `Unscheduled → Scheduled → Running → Succeeded | Failed`
//!
//! ```rust
//! use cim_provisioning::state_machine::{StackInput, StackState, StateMachine};
//!
//! let (applying, _) = StackState::Pending.transition(&StackInput::Begin).unwrap();
//! let (applied, _) = applying.transition(&StackInput::Complete).unwrap();
//! assert_eq!(applied, StackState::Applied);
//! assert!(StackState::Applied.transition(&StackInput::Complete).is_err());
//! ```

pub mod backup_lifecycle;
pub mod stack_lifecycle;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use backup_lifecycle::{BackupInput, BackupState};
pub use stack_lifecycle::{StackInput, StackState};

/// Result of a state transition
pub type TransitionResult<S> = Result<S, TransitionError>;

/// Rejected transitions
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransitionError {
    /// No edge from the current state for this input
    #[error("Invalid transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    /// Edge exists in principle but a lifecycle rule forbids it here
    #[error("Business rule violated: {0}")]
    BusinessRuleViolation(String),
}

/// A lifecycle with typed states and inputs
pub trait StateMachine: Sized + Clone {
    type Input;

    /// Output produced by a transition (`()` if none)
    type Output;

    fn transition(&self, input: &Self::Input) -> TransitionResult<(Self, Self::Output)>;

    fn can_transition(&self, input: &Self::Input) -> bool {
        self.transition(input).is_ok()
    }

    /// Inputs accepted from the current state
    fn valid_inputs(&self) -> Vec<Self::Input>;
}

/// One recorded transition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transition<S, I> {
    pub from: S,
    pub to: S,
    pub input: I,
    pub timestamp: DateTime<Utc>,
}

impl<S, I> Transition<S, I> {
    pub fn new(from: S, to: S, input: I, timestamp: DateTime<Utc>) -> Self {
        Self {
            from,
            to,
            input,
            timestamp,
        }
    }
}

/// A machine plus every transition it has taken
#[derive(Debug, Clone)]
pub struct StateMachineWithHistory<FSM: StateMachine> {
    current: FSM,
    history: Vec<Transition<FSM, FSM::Input>>,
}

impl<FSM: StateMachine> StateMachineWithHistory<FSM> {
    pub fn new(initial: FSM) -> Self {
        Self {
            current: initial,
            history: Vec::new(),
        }
    }

    /// Apply `input` and record it; a rejected input leaves state and history untouched
    pub fn transition_with_history(
        &mut self,
        input: FSM::Input,
        timestamp: DateTime<Utc>,
    ) -> TransitionResult<FSM::Output> {
        let (to, output) = self.current.transition(&input)?;
        let from = std::mem::replace(&mut self.current, to.clone());
        self.history.push(Transition::new(from, to, input, timestamp));
        Ok(output)
    }

    pub fn get_history(&self) -> &[Transition<FSM, FSM::Input>] {
        &self.history
    }

    pub fn current_state(&self) -> &FSM {
        &self.current
    }
}
