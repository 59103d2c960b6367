//! NATS alert sink
//!
//! Publishes violations and backup compliance results as JSON envelopes on
//! the subjects defined in [`super::subjects`].

use async_nats::{Client, ConnectOptions};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};
use uuid::Uuid;

use super::{subjects, AlertSink};
use crate::backup::ResourceCompliance;
use crate::errors::{ProvisioningError, ProvisioningResult};
use crate::policy::Violation;

/// Configuration for NATS connection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NatsConfig {
    /// NATS server URLs
    pub servers: Vec<String>,
    /// Client name
    pub name: String,
    /// Connection timeout in seconds
    pub connect_timeout_secs: u64,
    /// Request timeout in seconds
    pub request_timeout_secs: u64,
}

impl Default for NatsConfig {
    fn default() -> Self {
        Self {
            servers: vec!["nats://localhost:4222".to_string()],
            name: "cim-provisioning".to_string(),
            connect_timeout_secs: 10,
            request_timeout_secs: 5,
        }
    }
}

impl NatsConfig {
    /// Config for a comma-separated server list
    pub fn with_servers(servers: &str) -> Self {
        Self {
            servers: servers
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect(),
            ..Self::default()
        }
    }
}

/// Message envelope published for every alert
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertEnvelope<T> {
    pub id: Uuid,
    pub emitted_at: DateTime<Utc>,
    pub payload: T,
}

impl<T> AlertEnvelope<T> {
    pub fn new(payload: T) -> Self {
        Self {
            id: Uuid::now_v7(),
            emitted_at: Utc::now(),
            payload,
        }
    }
}

/// Alert sink backed by a NATS connection
#[derive(Clone)]
pub struct NatsAlertSink {
    client: Client,
}

impl NatsAlertSink {
    /// Connect with the given configuration
    pub async fn connect(config: &NatsConfig) -> ProvisioningResult<Self> {
        let connect_options = ConnectOptions::new()
            .name(&config.name)
            .connection_timeout(Duration::from_secs(config.connect_timeout_secs))
            .request_timeout(Some(Duration::from_secs(config.request_timeout_secs)));

        let client = async_nats::connect_with_options(config.servers.join(","), connect_options)
            .await
            .map_err(|e| ProvisioningError::Alert(format!("NATS connection failed: {}", e)))?;

        info!("Connected to NATS at {:?}", config.servers);

        Ok(Self { client })
    }

    /// Wrap an existing client
    pub fn from_client(client: Client) -> Self {
        Self { client }
    }

    /// Publish a message to a subject
    pub async fn publish<T>(&self, subject: String, message: &T) -> ProvisioningResult<()>
    where
        T: Serialize,
    {
        let payload = serde_json::to_vec(&AlertEnvelope::new(message))?;

        self.client
            .publish(subject.clone(), payload.into())
            .await
            .map_err(|e| ProvisioningError::Alert(e.to_string()))?;

        debug!("Published alert to subject: {}", subject);
        Ok(())
    }

    /// Get the underlying NATS client for advanced operations
    pub fn inner(&self) -> &Client {
        &self.client
    }
}

#[async_trait]
impl AlertSink for NatsAlertSink {
    async fn notify_violation(&self, violation: &Violation) -> ProvisioningResult<()> {
        self.publish(
            subjects::violation(violation.severity, &violation.policy),
            violation,
        )
        .await
    }

    async fn notify_compliance(&self, compliance: &ResourceCompliance) -> ProvisioningResult<()> {
        self.publish(subjects::backup(compliance.compliant()), compliance)
            .await
    }
}
