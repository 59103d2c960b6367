// Copyright (c) 2025 - Cowboy AI, Inc.
//! Stack Lifecycle State Machine
//!
//! # States
//!
//! - Pending: Declared, not yet attempted
//! - Applying: Provider calls in flight
//! - Applied: Every resource created or updated
//! - RolledBack: Attempt failed, this attempt's creations deleted
//! - Skipped: Not attempted because a dependency did not apply
//!
//! # Inputs
//!
//! - Begin: Pending | Applied | RolledBack | Skipped → Applying
//! - Complete: Applying → Applied
//! - Fail: Applying → RolledBack
//! - Skip: Pending | RolledBack | Skipped → Skipped
//!
//! Applied stacks re-enter Applying only when their declaration changed;
//! an unchanged Applied stack is never touched again.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::{StateMachine, TransitionError, TransitionResult};

/// Deployment state of one stack
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StackState {
    #[default]
    Pending,
    Applying,
    Applied,
    RolledBack,
    Skipped,
}

impl fmt::Display for StackState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StackState::Pending => "pending",
            StackState::Applying => "applying",
            StackState::Applied => "applied",
            StackState::RolledBack => "rolled_back",
            StackState::Skipped => "skipped",
        };
        write!(f, "{}", name)
    }
}

/// Stack lifecycle input
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StackInput {
    Begin,
    Complete,
    Fail,
    Skip,
}

impl StateMachine for StackState {
    type Input = StackInput;
    type Output = ();

    fn transition(&self, input: &Self::Input) -> TransitionResult<(Self, Self::Output)> {
        use StackInput::*;
        use StackState::*;

        match (self, input) {
            (Pending | Applied | RolledBack | Skipped, Begin) => Ok((Applying, ())),
            (Applying, Complete) => Ok((Applied, ())),
            (Applying, Fail) => Ok((RolledBack, ())),
            (Pending | RolledBack | Skipped, Skip) => Ok((Skipped, ())),

            (Applied, Skip) => Err(TransitionError::BusinessRuleViolation(
                "Applied stacks are never skipped".to_string(),
            )),
            (Applying, Begin | Skip) => Err(TransitionError::BusinessRuleViolation(
                "Stack is already applying".to_string(),
            )),
            (_, Complete | Fail) => Err(TransitionError::InvalidTransition {
                from: self.to_string(),
                to: match input {
                    Complete => Applied.to_string(),
                    _ => RolledBack.to_string(),
                },
            }),
        }
    }

    fn valid_inputs(&self) -> Vec<Self::Input> {
        use StackInput::*;

        match self {
            StackState::Pending | StackState::RolledBack | StackState::Skipped => vec![Begin, Skip],
            StackState::Applying => vec![Complete, Fail],
            StackState::Applied => vec![Begin],
        }
    }
}
