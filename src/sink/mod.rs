// Copyright (c) 2025 - Cowboy AI, Inc.
//! Alert Sinks
//!
//! Violations and backup compliance results leave the engine through an
//! [`AlertSink`]. The orchestrator is the only caller, so a sink sees events
//! from a single writer in the order they were produced.
//!
//! # Implementations
//!
//! - [`TracingSink`] - structured log lines
//! - [`CollectingSink`] - in-memory, for tests and reports
//! - [`NatsAlertSink`] - JSON on NATS subjects (see [`subjects`])

pub mod nats;
pub mod subjects;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::backup::ResourceCompliance;
use crate::errors::ProvisioningResult;
use crate::policy::{Severity, Violation};

pub use nats::{NatsAlertSink, NatsConfig};

/// Destination for alerts
#[async_trait]
pub trait AlertSink: Send + Sync {
    async fn notify_violation(&self, violation: &Violation) -> ProvisioningResult<()>;

    async fn notify_compliance(&self, compliance: &ResourceCompliance) -> ProvisioningResult<()>;
}

/// Logs every alert through `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

#[async_trait]
impl AlertSink for TracingSink {
    async fn notify_violation(&self, violation: &Violation) -> ProvisioningResult<()> {
        let resource = violation
            .resource
            .as_ref()
            .map(ToString::to_string)
            .unwrap_or_default();
        match violation.severity {
            Severity::Blocking => warn!(
                policy = %violation.policy,
                resource = %resource,
                phase = ?violation.phase,
                "{}",
                violation.reason
            ),
            Severity::Advisory => info!(
                policy = %violation.policy,
                resource = %resource,
                phase = ?violation.phase,
                "{}",
                violation.reason
            ),
        }
        Ok(())
    }

    async fn notify_compliance(&self, compliance: &ResourceCompliance) -> ProvisioningResult<()> {
        if compliance.compliant() {
            info!(
                resource = %compliance.resource,
                age_minutes = ?compliance.result.age_minutes,
                grace = compliance.in_grace_period,
                "Backup compliant"
            );
        } else {
            warn!(
                resource = %compliance.resource,
                age_minutes = ?compliance.result.age_minutes,
                consecutive_failures = compliance.result.consecutive_failures,
                "Backup non-compliant"
            );
        }
        Ok(())
    }
}

/// Keeps every alert in memory
#[derive(Debug, Default)]
pub struct CollectingSink {
    violations: Mutex<Vec<Violation>>,
    compliance: Mutex<Vec<ResourceCompliance>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn violations(&self) -> Vec<Violation> {
        self.violations.lock().await.clone()
    }

    pub async fn compliance(&self) -> Vec<ResourceCompliance> {
        self.compliance.lock().await.clone()
    }

    pub async fn clear(&self) {
        self.violations.lock().await.clear();
        self.compliance.lock().await.clear();
    }
}

#[async_trait]
impl AlertSink for CollectingSink {
    async fn notify_violation(&self, violation: &Violation) -> ProvisioningResult<()> {
        self.violations.lock().await.push(violation.clone());
        Ok(())
    }

    async fn notify_compliance(&self, compliance: &ResourceCompliance) -> ProvisioningResult<()> {
        self.compliance.lock().await.push(compliance.clone());
        Ok(())
    }
}
