// Copyright (c) 2025 - Cowboy AI, Inc.
//! In-Memory Provider
//!
//! A [`Provider`] backed by a map, used for dry runs and tests. Faults can
//! be injected per operation and resource, every call is recorded, and an
//! optional latency makes calls real suspension points.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;

use super::{LiveResource, Provider, ProviderError, ProviderId, ProviderResult};
use crate::domain::{AttributeValue, Resource, ResourceId};

/// Provider operation, used for fault injection and call records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderOperation {
    Create,
    Update,
    Delete,
    Describe,
    ListAll,
}

/// Injected failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// Fail with a transient error this many times, then succeed
    Transient(u32),
    /// Always fail with a permanent error
    Permanent,
    /// Sleep this long before answering, to trip caller timeouts
    Hang(Duration),
    /// Take effect once, then delay the reply this long
    LateReply(Duration),
}

/// A recorded provider call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderCall {
    pub operation: ProviderOperation,
    pub resource: Option<ResourceId>,
}

#[derive(Debug, Default)]
struct Inner {
    live: BTreeMap<ProviderId, Resource>,
    faults: BTreeMap<(ProviderOperation, ResourceId), Fault>,
    calls: Vec<ProviderCall>,
    next_id: u64,
}

/// Map-backed provider with fault injection
#[derive(Debug, Default)]
pub struct InMemoryProvider {
    inner: Mutex<Inner>,
    latency: Option<Duration>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl InMemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every call by `latency`
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Inject a fault for `operation` on `resource`
    pub async fn inject(&self, operation: ProviderOperation, resource: ResourceId, fault: Fault) {
        self.inner
            .lock()
            .await
            .faults
            .insert((operation, resource), fault);
    }

    pub async fn clear_faults(&self) {
        self.inner.lock().await.faults.clear();
    }

    /// Place a resource directly, bypassing the call log
    pub async fn seed(&self, resource: Resource) -> ProviderId {
        let mut inner = self.inner.lock().await;
        let id = next_provider_id(&mut inner);
        inner.live.insert(id.clone(), resource);
        id
    }

    /// Change a live attribute behind the orchestrator's back
    pub async fn tamper(&self, resource: &ResourceId, key: &str, value: impl Into<AttributeValue>) -> bool {
        let mut inner = self.inner.lock().await;
        match inner.live.values_mut().find(|r| &r.id() == resource) {
            Some(live) => {
                live.attributes.insert(key.to_string(), value.into());
                true
            }
            None => false,
        }
    }

    /// Remove a live resource behind the orchestrator's back
    pub async fn forget(&self, resource: &ResourceId) -> bool {
        let mut inner = self.inner.lock().await;
        let found = inner
            .live
            .iter()
            .find(|(_, r)| &r.id() == resource)
            .map(|(id, _)| id.clone());
        match found {
            Some(id) => inner.live.remove(&id).is_some(),
            None => false,
        }
    }

    pub async fn calls(&self) -> Vec<ProviderCall> {
        self.inner.lock().await.calls.clone()
    }

    /// Number of mutating calls (create, update, delete)
    pub async fn mutation_count(&self) -> usize {
        self.inner
            .lock()
            .await
            .calls
            .iter()
            .filter(|c| {
                matches!(
                    c.operation,
                    ProviderOperation::Create | ProviderOperation::Update | ProviderOperation::Delete
                )
            })
            .count()
    }

    pub async fn count(&self, operation: ProviderOperation) -> usize {
        self.inner
            .lock()
            .await
            .calls
            .iter()
            .filter(|c| c.operation == operation)
            .count()
    }

    pub async fn reset_calls(&self) {
        self.inner.lock().await.calls.clear();
    }

    pub async fn live_resources(&self) -> Vec<Resource> {
        self.inner.lock().await.live.values().cloned().collect()
    }

    pub async fn contains(&self, resource: &ResourceId) -> bool {
        self.inner
            .lock()
            .await
            .live
            .values()
            .any(|r| &r.id() == resource)
    }

    /// Highest number of calls observed in flight at once
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn enter(&self) -> InFlight<'_> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        InFlight(&self.in_flight)
    }

    /// Record the call and apply any injected fault
    ///
    /// Returns how long to hold the reply after the call has taken effect.
    async fn begin(
        &self,
        operation: ProviderOperation,
        resource: Option<ResourceId>,
    ) -> ProviderResult<Option<Duration>> {
        let (hang, late) = {
            let mut inner = self.inner.lock().await;
            inner.calls.push(ProviderCall {
                operation,
                resource: resource.clone(),
            });

            match resource {
                None => (None, None),
                Some(resource) => {
                    let key = (operation, resource);
                    match inner.faults.get(&key).copied() {
                        None => (None, None),
                        Some(Fault::Permanent) => {
                            return Err(ProviderError::Permanent(format!(
                                "injected {:?} failure for {}",
                                operation, key.1
                            )))
                        }
                        Some(Fault::Transient(remaining)) => {
                            if remaining <= 1 {
                                inner.faults.remove(&key);
                            } else {
                                inner.faults.insert(key.clone(), Fault::Transient(remaining - 1));
                            }
                            if remaining == 0 {
                                (None, None)
                            } else {
                                return Err(ProviderError::Transient(format!(
                                    "injected throttling on {:?} for {}",
                                    operation, key.1
                                )));
                            }
                        }
                        Some(Fault::Hang(duration)) => (Some(duration), None),
                        Some(Fault::LateReply(duration)) => {
                            inner.faults.remove(&key);
                            (None, Some(duration))
                        }
                    }
                }
            }
        };

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        if let Some(duration) = hang {
            tokio::time::sleep(duration).await;
        }
        Ok(late)
    }
}

async fn reply_after(late: Option<Duration>) {
    if let Some(duration) = late {
        tokio::time::sleep(duration).await;
    }
}

fn next_provider_id(inner: &mut Inner) -> ProviderId {
    inner.next_id += 1;
    ProviderId::new(format!("mem-{:06}", inner.next_id))
}

#[async_trait]
impl Provider for InMemoryProvider {
    async fn create(&self, resource: &Resource) -> ProviderResult<ProviderId> {
        let _guard = self.enter();
        let late = self.begin(ProviderOperation::Create, Some(resource.id())).await?;

        let id = {
            let mut inner = self.inner.lock().await;
            if inner.live.values().any(|r| r.id() == resource.id()) {
                return Err(ProviderError::Permanent(format!(
                    "{} already exists",
                    resource.id()
                )));
            }
            let id = next_provider_id(&mut inner);
            inner.live.insert(id.clone(), resource.clone());
            id
        };
        reply_after(late).await;
        Ok(id)
    }

    async fn update(&self, id: &ProviderId, resource: &Resource) -> ProviderResult<()> {
        let _guard = self.enter();
        let late = self.begin(ProviderOperation::Update, Some(resource.id())).await?;

        {
            let mut inner = self.inner.lock().await;
            match inner.live.get_mut(id) {
                Some(live) => *live = resource.clone(),
                None => return Err(ProviderError::NotFound(id.clone())),
            }
        }
        reply_after(late).await;
        Ok(())
    }

    async fn delete(&self, id: &ProviderId) -> ProviderResult<()> {
        let _guard = self.enter();
        let resource = self.inner.lock().await.live.get(id).map(Resource::id);
        let late = self.begin(ProviderOperation::Delete, resource).await?;

        let removed = self.inner.lock().await.live.remove(id);
        if removed.is_none() {
            return Err(ProviderError::NotFound(id.clone()));
        }
        reply_after(late).await;
        Ok(())
    }

    async fn describe(&self, id: &ProviderId) -> ProviderResult<LiveResource> {
        let _guard = self.enter();
        let resource = self.inner.lock().await.live.get(id).map(Resource::id);
        self.begin(ProviderOperation::Describe, resource).await?;

        let inner = self.inner.lock().await;
        inner
            .live
            .get(id)
            .map(|resource| LiveResource {
                provider_id: id.clone(),
                resource: resource.clone(),
            })
            .ok_or_else(|| ProviderError::NotFound(id.clone()))
    }

    async fn list_all(&self) -> ProviderResult<Vec<LiveResource>> {
        let _guard = self.enter();
        self.begin(ProviderOperation::ListAll, None).await?;

        let inner = self.inner.lock().await;
        Ok(inner
            .live
            .iter()
            .map(|(id, resource)| LiveResource {
                provider_id: id.clone(),
                resource: resource.clone(),
            })
            .collect())
    }
}
