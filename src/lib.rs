// Copyright (c) 2025 - Cowboy AI, Inc.
//! Stack provisioning for the Composable Information Machine
//!
//! This crate resolves dependency-ordered resource stacks into a deployment
//! order, validates them against organization policies, prices them, applies
//! them through a provider-agnostic apply/rollback protocol, and tracks the
//! backup and recovery guarantees of stateful resources.
//!
//! # Pipeline
//!
//! ```text
//! domain ─► resolver ─► orchestrator ─► provider
//!                          │   ▲
//!                          ▼   │
//!                 policy · cost · backup ─► sink
//! ```
//!
//! - [`domain`] - resources, stacks, tags, network rules, backup policies
//! - [`resolver`] - Kahn's algorithm over `depends_on`
//! - [`policy`] - pure checks producing blocking or advisory violations
//! - [`cost`] - monthly estimates with free-tier expiry
//! - [`backup`] - backup run lifecycle, RPO compliance, retention
//! - [`orchestrator`] - bounded fan-out, rollback, cancellation, reports
//! - [`provider`], [`state_store`], [`sink`] - the external seams

pub mod backup;
pub mod config;
pub mod cost;
pub mod domain;
pub mod errors;
pub mod orchestrator;
pub mod policy;
pub mod provider;
pub mod resolver;
pub mod sink;
pub mod state_machine;
pub mod state_store;
pub mod topology;

// Re-export commonly used types
pub use config::{OrchestratorConfig, ProvisioningConfig};
pub use domain::{Resource, ResourceId, ResourceKind, Stack, StackName};
pub use errors::{ProvisioningError, ProvisioningResult};
pub use orchestrator::{DeploymentReport, Orchestrator};
pub use policy::{PolicyEngine, Severity, Violation};
pub use resolver::{resolve, resolve_order};
