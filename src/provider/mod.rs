// Copyright (c) 2025 - Cowboy AI, Inc.
//! Provider Abstraction
//!
//! The orchestrator never talks to a cloud SDK directly. Everything it needs
//! from the outside world goes through [`Provider`].
//!
//! # Architecture
//!
//! ```text
//! Orchestrator ──► timeout ──► retry (transient only) ──► Provider
//!                                                            │
//!                                     InMemoryProvider ◄─────┤
//!                                     (real SDK adapters) ◄──┘
//! ```
//!
//! # Error Classes
//!
//! [`ProviderError::Transient`] is always retried. A
//! [`ProviderError::Timeout`] is retried only for calls that are safe to
//! repeat; a timed-out create is first looked up in the provider's
//! inventory, since it may already have landed. Permanent errors fail the
//! stack immediately and trigger rollback.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::domain::Resource;

pub mod memory;

pub use memory::{Fault, InMemoryProvider, ProviderCall, ProviderOperation};

/// Identifier assigned by the provider on create
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProviderId(String);

impl ProviderId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A resource as the provider currently sees it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiveResource {
    pub provider_id: ProviderId,
    pub resource: Resource,
}

/// Provider failure
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProviderError {
    /// Throttling, brief outages; safe to retry
    #[error("Transient provider failure: {0}")]
    Transient(String),

    /// Rejected request; retrying cannot help
    #[error("Permanent provider failure: {0}")]
    Permanent(String),

    #[error("Provider resource not found: {0}")]
    NotFound(ProviderId),

    #[error("Provider call {operation} timed out after {after_ms}ms")]
    Timeout { operation: String, after_ms: u64 },
}

impl ProviderError {
    /// Tagged by the provider as safe to retry
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }

    /// The caller gave up waiting; the call may still have taken effect
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

/// Result type for provider calls
pub type ProviderResult<T> = Result<T, ProviderError>;

/// Provider-agnostic resource operations
///
/// Implementations must be safe to call concurrently. The orchestrator
/// wraps every call in a timeout and retries transient failures, so
/// implementations should not retry internally.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Create a resource and return its provider identifier
    async fn create(&self, resource: &Resource) -> ProviderResult<ProviderId>;

    /// Replace the configuration of an existing resource
    async fn update(&self, id: &ProviderId, resource: &Resource) -> ProviderResult<()>;

    /// Delete a resource
    ///
    /// # Errors
    ///
    /// - `NotFound` if the identifier is unknown
    async fn delete(&self, id: &ProviderId) -> ProviderResult<()>;

    /// Read back a single resource
    async fn describe(&self, id: &ProviderId) -> ProviderResult<LiveResource>;

    /// Every resource the provider manages, declared or not
    async fn list_all(&self) -> ProviderResult<Vec<LiveResource>>;
}
