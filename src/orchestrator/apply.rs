// Copyright (c) 2025 - Cowboy AI, Inc.
//! Per-Stack Apply
//!
//! A worker owns a copy of its stack and the records of the resources that
//! stack owned last time. It never touches the snapshot; the orchestrator
//! merges the returned [`StackOutcome`].
//!
//! Resources inside a stack are independent, so their calls run
//! concurrently up to `max_concurrent_resources`. The first failure stops
//! any call that has not started yet, and everything this attempt created
//! is deleted again in reverse creation order.

use futures::stream::{FuturesUnordered, StreamExt};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{watch, Semaphore};
use tracing::{debug, error, info, instrument, warn};

use super::report::{DeleteFailure, StackFailure};
use super::retry::{with_retry, Idempotency};
use crate::config::OrchestratorConfig;
use crate::domain::{Resource, ResourceId, Stack, StackName};
use crate::errors::ProvisioningError;
use crate::provider::{Provider, ProviderError, ProviderId};
use crate::state_store::ResourceRecord;

/// Input of one stack worker, passed by value
pub(crate) struct StackJob {
    pub stack: Stack,
    /// Last-known records of the resources this stack owns
    pub recorded: BTreeMap<ResourceId, ResourceRecord>,
    pub provider: Arc<dyn Provider>,
    pub config: OrchestratorConfig,
    pub cancel: watch::Receiver<bool>,
}

/// Result of one stack worker
#[derive(Debug)]
pub(crate) struct StackOutcome {
    pub stack: StackName,
    /// Records to persist
    ///
    /// Every declared resource on success. After a rollback: resources that
    /// were left live, i.e. unchanged, updated, or created and not deleted.
    pub records: BTreeMap<ResourceId, ResourceRecord>,
    /// Previously recorded resources that were deleted
    pub removed: Vec<ResourceId>,
    pub failure: Option<StackFailure>,
    pub rollback_failures: Vec<DeleteFailure>,
    pub prune_failures: Vec<DeleteFailure>,
}

enum Step {
    Unchanged(ProviderId),
    Updated(ProviderId),
    Created(ProviderId),
}

enum StepError {
    /// Not started because the stack was already failing or cancelled
    NotAttempted,
    Failed(ProviderError),
}

#[instrument(skip_all, fields(stack = %job.stack.name, resources = job.stack.resources.len()))]
pub(crate) async fn apply_stack(job: StackJob) -> StackOutcome {
    let StackJob {
        stack,
        recorded,
        provider,
        config,
        cancel,
    } = job;
    let provider = provider.as_ref();
    let semaphore = Semaphore::new(config.max_concurrent_resources.max(1));
    let abort = AtomicBool::new(false);

    let mut calls: FuturesUnordered<_> = stack
        .resources
        .iter()
        .map(|resource| {
            let previous = recorded.get(&resource.id());
            let (semaphore, abort, cancel, config) = (&semaphore, &abort, &cancel, &config);
            async move {
                let result = match semaphore.acquire().await {
                    Ok(_permit) => {
                        let cancelled = *cancel.borrow();
                        if cancelled || abort.load(Ordering::SeqCst) {
                            Err(StepError::NotAttempted)
                        } else {
                            apply_resource(provider, config, resource, previous).await
                        }
                    }
                    Err(_) => Err(StepError::NotAttempted),
                };
                (resource, result)
            }
        })
        .collect();

    let mut created: Vec<(ResourceId, ProviderId)> = Vec::new();
    let mut records = BTreeMap::new();
    let mut failure: Option<StackFailure> = None;

    while let Some((resource, result)) = calls.next().await {
        let id = resource.id();
        match result {
            Ok(step) => {
                let provider_id = match step {
                    Step::Created(provider_id) => {
                        debug!(resource = %id, provider_id = %provider_id, "Created");
                        created.push((id.clone(), provider_id.clone()));
                        provider_id
                    }
                    Step::Updated(provider_id) => {
                        debug!(resource = %id, provider_id = %provider_id, "Updated");
                        provider_id
                    }
                    Step::Unchanged(provider_id) => provider_id,
                };
                records.insert(
                    id,
                    ResourceRecord {
                        provider_id,
                        resource: resource.clone(),
                    },
                );
            }
            Err(StepError::Failed(e)) => {
                error!(resource = %id, error = %e, "Resource apply failed");
                abort.store(true, Ordering::SeqCst);
                if failure.is_none() {
                    failure = Some(StackFailure {
                        stack: stack.name.clone(),
                        resource: Some(id),
                        reason: e.to_string(),
                    });
                }
            }
            Err(StepError::NotAttempted) => {}
        }
    }
    drop(calls);

    let cancelled = *cancel.borrow();
    if failure.is_none() && cancelled {
        failure = Some(StackFailure {
            stack: stack.name.clone(),
            resource: None,
            reason: ProvisioningError::Cancelled.to_string(),
        });
    }

    if let Some(failure) = failure {
        warn!(created = created.len(), reason = %failure.reason, "Rolling back stack");
        let rollback_failures = rollback(provider, &config, &stack.name, &created).await;
        for (id, _) in &created {
            if !rollback_failures.iter().any(|f| &f.resource == id) {
                records.remove(id);
            }
        }
        return StackOutcome {
            stack: stack.name,
            records,
            removed: Vec::new(),
            failure: Some(failure),
            rollback_failures,
            prune_failures: Vec::new(),
        };
    }

    let declared: BTreeSet<ResourceId> = stack.resource_ids().collect();
    let mut removed = Vec::new();
    let mut prune_failures = Vec::new();
    for (id, record) in recorded.iter().filter(|(id, _)| !declared.contains(*id)) {
        match delete(provider, &config, &record.provider_id).await {
            Ok(()) => {
                info!(resource = %id, "Removed resource no longer declared");
                removed.push(id.clone());
            }
            Err(e) => {
                error!(resource = %id, error = %e, "Failed to remove undeclared resource");
                prune_failures.push(DeleteFailure {
                    stack: stack.name.clone(),
                    resource: id.clone(),
                    provider_id: record.provider_id.clone(),
                    reason: e.to_string(),
                });
            }
        }
    }

    info!(created = created.len(), removed = removed.len(), "Stack resources applied");
    StackOutcome {
        stack: stack.name,
        records,
        removed,
        failure: None,
        rollback_failures: Vec::new(),
        prune_failures,
    }
}

async fn apply_resource(
    provider: &dyn Provider,
    config: &OrchestratorConfig,
    resource: &Resource,
    previous: Option<&ResourceRecord>,
) -> Result<Step, StepError> {
    let timeout = config.provider_timeout();
    match previous {
        Some(record) if record.resource.same_configuration(resource) => {
            Ok(Step::Unchanged(record.provider_id.clone()))
        }
        Some(record) => with_retry(&config.retry, timeout, "update", Idempotency::Idempotent, || {
            provider.update(&record.provider_id, resource)
        })
        .await
        .map(|()| Step::Updated(record.provider_id.clone()))
        .map_err(StepError::Failed),
        None => create(provider, config, resource)
            .await
            .map(Step::Created)
            .map_err(StepError::Failed),
    }
}

/// Create, looking for the resource before re-issuing a timed-out call
///
/// A create that timed out may still have landed. The resource is adopted
/// when the inventory already holds its identity, so a retry never makes a
/// second copy.
async fn create(
    provider: &dyn Provider,
    config: &OrchestratorConfig,
    resource: &Resource,
) -> Result<ProviderId, ProviderError> {
    let timeout = config.provider_timeout();
    let attempts = config.retry.max_attempts.max(1);
    let id = resource.id();
    let mut attempt = 1;

    loop {
        let result = with_retry(&config.retry, timeout, "create", Idempotency::NonIdempotent, || {
            provider.create(resource)
        })
        .await;

        let timed_out = match result {
            Err(e) if e.is_timeout() => e,
            other => return other,
        };

        let live = with_retry(&config.retry, timeout, "list_all", Idempotency::Idempotent, || {
            provider.list_all()
        })
        .await?;
        if let Some(found) = live.into_iter().find(|l| l.resource.id() == id) {
            warn!(resource = %id, provider_id = %found.provider_id, "Create timed out after landing, adopting");
            return Ok(found.provider_id);
        }
        if attempt >= attempts {
            return Err(timed_out);
        }

        let delay = config.retry.backoff(attempt);
        warn!(resource = %id, attempt, delay_ms = delay.as_millis() as u64, "Create timed out without landing, retrying");
        tokio::time::sleep(delay).await;
        attempt += 1;
    }
}

/// Delete, treating an already missing resource as deleted
async fn delete(
    provider: &dyn Provider,
    config: &OrchestratorConfig,
    provider_id: &ProviderId,
) -> Result<(), ProviderError> {
    let result = with_retry(
        &config.retry,
        config.provider_timeout(),
        "delete",
        Idempotency::Idempotent,
        || provider.delete(provider_id),
    )
    .await;

    match result {
        Ok(()) | Err(ProviderError::NotFound(_)) => Ok(()),
        Err(e) => Err(e),
    }
}

/// Delete this attempt's creations, newest first
async fn rollback(
    provider: &dyn Provider,
    config: &OrchestratorConfig,
    stack: &StackName,
    created: &[(ResourceId, ProviderId)],
) -> Vec<DeleteFailure> {
    let mut failures = Vec::new();

    for (resource, provider_id) in created.iter().rev() {
        match delete(provider, config, provider_id).await {
            Ok(()) => debug!(resource = %resource, "Rolled back"),
            Err(e) => {
                error!(resource = %resource, provider_id = %provider_id, error = %e, "Rollback delete failed");
                failures.push(DeleteFailure {
                    stack: stack.clone(),
                    resource: resource.clone(),
                    provider_id: provider_id.clone(),
                    reason: e.to_string(),
                });
            }
        }
    }

    failures
}
