// Copyright (c) 2025 - Cowboy AI, Inc.
//! Provisioning Domain Models
//!
//! Typed descriptions of provisionable units and the stacks that own them.
//! Attributes are tagged variants so the policy engine and cost estimator
//! can match on them as total functions.
//!
//! # Value Objects with Invariants
//!
//! - [`Cidr`] - IPv4/IPv6 block with private/anyone classification
//! - [`PortRange`] - Inclusive port range
//! - [`ResourceId`] - `kind/name` identity
//! - [`Schedule`] - Cron-like backup schedule
//! - [`BackupPolicy`] - Retention, RTO and RPO for stateful resources
//!
//! # Entities
//!
//! - [`Resource`] - Owned exclusively by the stack that declares it
//! - [`Stack`] - Atomic apply/rollback unit with declared dependencies

pub mod backup_policy;
pub mod invariants;
pub mod network;
pub mod resource;
pub mod resource_kind;
pub mod schedule;
pub mod stack;
pub mod tags;

pub use backup_policy::BackupPolicy;
pub use invariants::validate_model;
pub use network::{
    Cidr, Direction, NetworkError, NetworkRule, Peer, PortRange, Protocol, SENSITIVE_PORTS,
};
pub use resource::{AttributeValue, Resource, ResourceBuilder, ResourceId, ResourceIdError};
pub use resource_kind::{ResourceCategory, ResourceKind, UnknownResourceKind};
pub use schedule::{Schedule, ScheduleError};
pub use stack::{Stack, StackName};
pub use tags::{missing_mandatory_tags, StandardTags, MANDATORY_TAGS};
