// Copyright (c) 2025 - Cowboy AI, Inc.
//! Provisioning Configuration
//!
//! Loaded from a JSON file or from environment variables. Every field has a
//! default, so an empty file or environment gives a working configuration.
//!
//! | variable | field |
//! |---|---|
//! | `PROVISION_MAX_STACKS` | `orchestrator.max_concurrent_stacks` |
//! | `PROVISION_MAX_RESOURCES` | `orchestrator.max_concurrent_resources` |
//! | `PROVISION_TIMEOUT_SECS` | `orchestrator.provider_timeout_ms` |
//! | `PROVISION_RETRY_ATTEMPTS` | `orchestrator.retry.max_attempts` |
//! | `PROVISION_FAIL_FAST` | `orchestrator.fail_fast` |
//! | `PROVISION_BUDGET_WARNING` | `cost.warning_threshold` |
//! | `PROVISION_BUDGET_CRITICAL` | `cost.critical_threshold` |
//! | `PROVISION_STATE_PATH` | `state_path` |
//! | `NATS_URL` | `nats.servers` |

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::cost::CostConfig;
use crate::errors::{ProvisioningError, ProvisioningResult};
use crate::orchestrator::RetryPolicy;
use crate::sink::NatsConfig;

/// Orchestrator limits and behaviour
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    pub max_concurrent_stacks: usize,
    pub max_concurrent_resources: usize,
    /// Timeout applied to each provider call
    pub provider_timeout_ms: u64,
    pub retry: RetryPolicy,
    /// Stop launching stacks after the first rollback
    pub fail_fast: bool,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_concurrent_stacks: 4,
            max_concurrent_resources: 8,
            provider_timeout_ms: 30_000,
            retry: RetryPolicy::default(),
            fail_fast: false,
        }
    }
}

impl OrchestratorConfig {
    pub fn provider_timeout(&self) -> Duration {
        Duration::from_millis(self.provider_timeout_ms)
    }
}

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvisioningConfig {
    pub orchestrator: OrchestratorConfig,
    pub cost: CostConfig,
    /// Publish alerts to NATS when set
    pub nats: Option<NatsConfig>,
    /// Snapshot file; in-memory state when unset
    pub state_path: Option<PathBuf>,
}

impl ProvisioningConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> ProvisioningResult<Self> {
        let mut config = Self::default();

        if let Some(stacks) = env_parse("PROVISION_MAX_STACKS")? {
            config.orchestrator.max_concurrent_stacks = stacks;
        }
        if let Some(resources) = env_parse("PROVISION_MAX_RESOURCES")? {
            config.orchestrator.max_concurrent_resources = resources;
        }
        if let Some(secs) = env_parse::<u64>("PROVISION_TIMEOUT_SECS")? {
            config.orchestrator.provider_timeout_ms = secs.saturating_mul(1_000);
        }
        if let Some(attempts) = env_parse("PROVISION_RETRY_ATTEMPTS")? {
            config.orchestrator.retry.max_attempts = attempts;
        }
        if let Some(fail_fast) = env_parse("PROVISION_FAIL_FAST")? {
            config.orchestrator.fail_fast = fail_fast;
        }
        if let Some(warning) = env_parse("PROVISION_BUDGET_WARNING")? {
            config.cost.warning_threshold = warning;
        }
        if let Some(critical) = env_parse("PROVISION_BUDGET_CRITICAL")? {
            config.cost.critical_threshold = critical;
        }
        if let Ok(path) = std::env::var("PROVISION_STATE_PATH") {
            config.state_path = Some(PathBuf::from(path));
        }
        if let Ok(url) = std::env::var("NATS_URL") {
            config.nats = Some(NatsConfig::with_servers(&url));
        }

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a JSON file
    pub fn from_json_file(path: impl AsRef<Path>) -> ProvisioningResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text).map_err(|e| match e {
            ProvisioningError::Serialization(msg) => {
                ProvisioningError::Configuration(format!("{}: {}", path.display(), msg))
            }
            other => other,
        })
    }

    pub fn from_json_str(text: &str) -> ProvisioningResult<Self> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject limits the orchestrator cannot run with
    pub fn validate(&self) -> ProvisioningResult<()> {
        let o = &self.orchestrator;
        if o.max_concurrent_stacks == 0 || o.max_concurrent_resources == 0 {
            return Err(ProvisioningError::Configuration(
                "Concurrency limits must be at least 1".to_string(),
            ));
        }
        if o.provider_timeout_ms == 0 {
            return Err(ProvisioningError::Configuration(
                "Provider timeout must be positive".to_string(),
            ));
        }
        if o.retry.max_attempts == 0 {
            return Err(ProvisioningError::Configuration(
                "Retry attempts must be at least 1".to_string(),
            ));
        }
        if self.cost.warning_threshold > self.cost.critical_threshold {
            return Err(ProvisioningError::Configuration(format!(
                "Budget warning threshold {} exceeds critical threshold {}",
                self.cost.warning_threshold, self.cost.critical_threshold
            )));
        }
        Ok(())
    }
}

fn env_parse<T>(name: &str) -> ProvisioningResult<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) => raw.trim().parse().map(Some).map_err(|e: T::Err| {
            ProvisioningError::Configuration(format!("{}={:?}: {}", name, raw, e))
        }),
        Err(_) => Ok(None),
    }
}
