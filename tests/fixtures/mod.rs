// Copyright (c) 2025 - Cowboy AI, Inc.
//! Test Fixtures for cim-provisioning
//!
//! Deterministic stacks, resources and a controllable clock shared by the
//! integration tests.
//!
//! # Design Principles
//! - No `Utc::now()`: every orchestrator runs on a [`TestClock`]
//! - Fixture resources carry the standard tags unless a test strips them
//! - Retry backoff is kept in the low milliseconds so failure paths stay fast

#![allow(dead_code)]

use chrono::{DateTime, Duration, Utc};
use std::sync::{Arc, Mutex};

use cim_provisioning::domain::{
    BackupPolicy, Cidr, NetworkRule, Peer, Resource, ResourceBuilder, ResourceId, ResourceKind, Stack,
    StandardTags,
};
use cim_provisioning::orchestrator::{Orchestrator, RetryPolicy};
use cim_provisioning::provider::InMemoryProvider;
use cim_provisioning::sink::CollectingSink;
use cim_provisioning::state_store::{DeploymentSnapshot, InMemoryStateStore, StateStore};
use cim_provisioning::OrchestratorConfig;

// Fixed test timestamp (2026-01-19T12:00:00Z)
pub const FIXED_TIMESTAMP: &str = "2026-01-19T12:00:00Z";

pub const NETWORK: &str = "network";
pub const SECURITY: &str = "security";
pub const DATABASE: &str = "database";
pub const STORAGE: &str = "storage";

pub fn fixed_timestamp() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(FIXED_TIMESTAMP)
        .expect("Invalid timestamp in test fixture")
        .with_timezone(&Utc)
}

/// Clock shared between a test and the orchestrators it builds
#[derive(Debug, Clone)]
pub struct TestClock(Arc<Mutex<DateTime<Utc>>>);

impl TestClock {
    pub fn at(now: DateTime<Utc>) -> Self {
        Self(Arc::new(Mutex::new(now)))
    }

    pub fn now(&self) -> DateTime<Utc> {
        *self.0.lock().unwrap()
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.0.lock().unwrap() = now;
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.0.lock().unwrap();
        *now += by;
    }
}

/// Retries in single-digit milliseconds
pub fn fast_retry() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 3,
        initial_backoff_ms: 1,
        max_backoff_ms: 5,
        multiplier: 2.0,
    }
}

pub fn fast_config() -> OrchestratorConfig {
    OrchestratorConfig {
        max_concurrent_stacks: 4,
        max_concurrent_resources: 8,
        provider_timeout_ms: 1_000,
        retry: fast_retry(),
        fail_fast: false,
    }
}

/// Provider, store, sink and clock wired for one test
pub struct Harness {
    pub provider: Arc<InMemoryProvider>,
    pub store: Arc<InMemoryStateStore>,
    pub sink: Arc<CollectingSink>,
    pub clock: TestClock,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_provider(InMemoryProvider::new())
    }

    pub fn with_provider(provider: InMemoryProvider) -> Self {
        Self {
            provider: Arc::new(provider),
            store: Arc::new(InMemoryStateStore::new()),
            sink: Arc::new(CollectingSink::new()),
            clock: TestClock::at(fixed_timestamp()),
        }
    }

    pub fn orchestrator(&self) -> Orchestrator {
        self.orchestrator_with(fast_config())
    }

    pub fn orchestrator_with(&self, config: OrchestratorConfig) -> Orchestrator {
        let clock = self.clock.clone();
        Orchestrator::new(self.provider.clone(), self.store.clone(), self.sink.clone())
            .with_config(config)
            .with_clock(move || clock.now())
    }

    pub async fn snapshot(&self) -> DeploymentSnapshot {
        self.store.load().await.unwrap().unwrap_or_default()
    }
}

/// Builder with the mandatory tags already applied
pub fn tagged(kind: ResourceKind, name: &str) -> ResourceBuilder {
    Resource::builder(kind, name).tags(StandardTags::default().to_map())
}

pub fn bucket(name: &str) -> Resource {
    tagged(ResourceKind::Bucket, name)
        .attribute("encryption", "sse_s3")
        .attribute("storage_gb", 1i64)
        .build()
}

pub fn alarm(name: &str) -> Resource {
    tagged(ResourceKind::Alarm, name).attribute("threshold", 1i64).build()
}

pub fn private_cidr() -> Cidr {
    Cidr::new("10.0.0.0/16").unwrap()
}

pub fn security_group(name: &str, rules: Vec<NetworkRule>) -> Resource {
    rules
        .into_iter()
        .fold(tagged(ResourceKind::SecurityGroup, name), ResourceBuilder::rule)
        .build()
}

pub fn database_instance(name: &str) -> Resource {
    tagged(ResourceKind::DatabaseInstance, name)
        .attribute("instance_class", "db.t3.micro")
        .attribute("storage_gb", 20i64)
        .attribute("encrypted", true)
        .backup(BackupPolicy::daily_standard())
        .build()
}

pub fn id(kind: ResourceKind, name: &str) -> ResourceId {
    ResourceId::new(kind, name)
}

/// network <- security <- database, plus an independent storage stack
pub fn three_tier() -> Vec<Stack> {
    vec![
        Stack::new(NETWORK)
            .with_resource(tagged(ResourceKind::Vpc, "vpc").attribute("cidr_block", "10.0.0.0/16").build())
            .with_resource(tagged(ResourceKind::Subnet, "private-a").attribute("cidr_block", "10.0.1.0/24").build()),
        Stack::new(SECURITY).depends_on(NETWORK).with_resource(security_group(
            "db-sg",
            vec![NetworkRule::inbound_tcp(5432, Peer::Cidr(private_cidr()))],
        )),
        Stack::new(DATABASE)
            .depends_on(NETWORK)
            .depends_on(SECURITY)
            .with_resource(database_instance("db"))
            .with_resource(alarm("db-cpu")),
        Stack::new(STORAGE)
            .with_resource(bucket("assets"))
            .with_resource(bucket("logs")),
    ]
}

/// Replace the stack named `name`
pub fn replace(stacks: &[Stack], stack: Stack) -> Vec<Stack> {
    stacks
        .iter()
        .map(|s| if s.name == stack.name { stack.clone() } else { s.clone() })
        .collect()
}
