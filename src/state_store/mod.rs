// Copyright (c) 2025 - Cowboy AI, Inc.
//! Deployment State Persistence
//!
//! The orchestrator saves a [`DeploymentSnapshot`] after every stack
//! settles, so an interrupted run resumes after the last Applied stack.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use tracing::debug;

use crate::errors::{ProvisioningError, ProvisioningResult};

pub mod snapshot;

pub use snapshot::{DeploymentSnapshot, ResourceRecord, StackRecord};

/// Storage for the deployment snapshot
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Load the last saved snapshot, `None` before the first save
    async fn load(&self) -> ProvisioningResult<Option<DeploymentSnapshot>>;

    /// Replace the saved snapshot
    ///
    /// Implementations must never leave a partially written snapshot behind.
    async fn save(&self, snapshot: &DeploymentSnapshot) -> ProvisioningResult<()>;
}

/// Snapshot held in memory
#[derive(Debug, Default)]
pub struct InMemoryStateStore {
    snapshot: RwLock<Option<DeploymentSnapshot>>,
}

impl InMemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_snapshot(snapshot: DeploymentSnapshot) -> Self {
        Self {
            snapshot: RwLock::new(Some(snapshot)),
        }
    }
}

#[async_trait]
impl StateStore for InMemoryStateStore {
    async fn load(&self) -> ProvisioningResult<Option<DeploymentSnapshot>> {
        Ok(self.snapshot.read().await.clone())
    }

    async fn save(&self, snapshot: &DeploymentSnapshot) -> ProvisioningResult<()> {
        *self.snapshot.write().await = Some(snapshot.clone());
        Ok(())
    }
}

/// Snapshot stored as a JSON file
///
/// Writes go to a sibling temp file first and are renamed into place.
#[derive(Debug, Clone)]
pub struct JsonFileStateStore {
    path: PathBuf,
}

impl JsonFileStateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "snapshot".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[async_trait]
impl StateStore for JsonFileStateStore {
    async fn load(&self) -> ProvisioningResult<Option<DeploymentSnapshot>> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => {
                let snapshot = serde_json::from_slice(&bytes).map_err(|e| {
                    ProvisioningError::StateStore(format!(
                        "Corrupt snapshot at {}: {}",
                        self.path.display(),
                        e
                    ))
                })?;
                Ok(Some(snapshot))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn save(&self, snapshot: &DeploymentSnapshot) -> ProvisioningResult<()> {
        let bytes = serde_json::to_vec_pretty(snapshot)?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let temp = self.temp_path();
        tokio::fs::write(&temp, &bytes).await?;
        tokio::fs::rename(&temp, &self.path).await?;

        debug!(path = %self.path.display(), bytes = bytes.len(), "Snapshot saved");
        Ok(())
    }
}
