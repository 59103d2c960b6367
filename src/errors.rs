//! Error types for provisioning operations

use thiserror::Error;

use crate::domain::{ResourceId, StackName};
use crate::policy::Violation;
use crate::state_machine::TransitionError;

/// Errors that can occur while resolving, validating, or applying stacks
#[derive(Debug, Error)]
pub enum ProvisioningError {
    /// Stack graph contains a cycle
    #[error("Cyclic dependency between stacks: {}", join_names(.stacks))]
    CyclicDependency { stacks: Vec<StackName> },

    /// A `depends_on` entry names no declared stack
    #[error("Stack {stack} depends on unknown stack {dependency}")]
    UnknownDependency {
        stack: StackName,
        dependency: StackName,
    },

    /// Two stacks share a name
    #[error("Duplicate stack: {0}")]
    DuplicateStack(StackName),

    /// A resource identity is declared more than once
    #[error("Duplicate resource: {0}")]
    DuplicateResource(ResourceId),

    /// Stack or resource declarations are inconsistent
    #[error("Invalid model: {0}")]
    InvalidModel(String),

    /// Named stack is not part of the declared set
    #[error("Unknown stack: {0}")]
    UnknownStack(StackName),

    /// Blocking violations at the pre-deployment gate
    #[error("Pre-deployment policy gate blocked the run with {} blocking violation(s)", .violations.len())]
    PolicyBlocked { violations: Vec<Violation> },

    /// Lifecycle transition rejected
    #[error("State transition error: {0}")]
    Transition(#[from] TransitionError),

    /// Resource has no registered backup policy
    #[error("No backup policy registered for {0}")]
    BackupNotRegistered(ResourceId),

    /// Backup run id matches no recorded run
    #[error("Unknown backup run: {0}")]
    UnknownBackupRun(uuid::Uuid),

    /// Run was cancelled before it could finish
    #[error("Deployment cancelled")]
    Cancelled,

    /// A stack worker task panicked or was aborted
    #[error("Stack worker failed: {0}")]
    Worker(String),

    /// Persisted state could not be read or written
    #[error("State store error: {0}")]
    StateStore(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Filesystem error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Alert sink could not deliver an event
    #[error("Alert delivery error: {0}")]
    Alert(String),
}

/// Result type for provisioning operations
pub type ProvisioningResult<T> = Result<T, ProvisioningError>;

fn join_names(names: &[StackName]) -> String {
    names
        .iter()
        .map(StackName::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

impl From<serde_json::Error> for ProvisioningError {
    fn from(err: serde_json::Error) -> Self {
        ProvisioningError::Serialization(err.to_string())
    }
}

impl From<async_nats::Error> for ProvisioningError {
    fn from(err: async_nats::Error) -> Self {
        ProvisioningError::Alert(err.to_string())
    }
}
