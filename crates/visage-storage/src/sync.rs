//! Best-effort mirror of the local gallery files to a remote blob store.
//!
//! The local index/metadata pair is the system of record for a process; the
//! remote copy is a bridge between processes. Every operation here reports
//! a [`SyncOutcome`] instead of an error: failures are logged at WARN and
//! absorbed so that enrollment, deletion and recognition never stall on the
//! network.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use tokio::fs;
use tracing::{debug, info, warn};
use visage_core::{BlobStore, Result, SyncBackendKind, SyncConfig};

use crate::filesystem::{write_atomic, FilesystemBlobStore};
use crate::http::HttpBlobStore;

/// Result of one push or pull.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Local file uploaded, replacing any previous blob.
    Uploaded { bytes: usize },
    /// Remote blob downloaded over the local file.
    Downloaded { bytes: usize },
    /// Pull found no blob under the key; local file left untouched.
    RemoteMissing,
    /// No remote store is configured.
    Skipped,
    /// The operation failed; the reason was logged.
    Failed(String),
}

impl SyncOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, SyncOutcome::Failed(_))
    }
}

/// Outcomes for both files of the persistence pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairSync {
    pub index: SyncOutcome,
    pub metadata: SyncOutcome,
}

impl PairSync {
    pub fn any_failed(&self) -> bool {
        self.index.is_failure() || self.metadata.is_failure()
    }
}

/// Mirror between the local gallery files and a remote blob store.
#[derive(Clone)]
pub struct DurableSync {
    backend: Option<Arc<dyn BlobStore>>,
    index_key: String,
    metadata_key: String,
}

impl DurableSync {
    pub fn new(
        backend: Arc<dyn BlobStore>,
        index_key: impl Into<String>,
        metadata_key: impl Into<String>,
    ) -> Self {
        Self {
            backend: Some(backend),
            index_key: index_key.into(),
            metadata_key: metadata_key.into(),
        }
    }

    /// A sync with no remote store; every operation reports `Skipped`.
    pub fn disabled() -> Self {
        Self {
            backend: None,
            index_key: visage_core::defaults::INDEX_KEY.to_string(),
            metadata_key: visage_core::defaults::METADATA_KEY.to_string(),
        }
    }

    /// Build the configured backend.
    pub fn from_config(config: &SyncConfig) -> Result<Self> {
        let backend: Arc<dyn BlobStore> = match config.backend {
            SyncBackendKind::None => {
                info!(subsystem = "storage", component = "durable_sync", "Remote sync disabled");
                return Ok(Self::disabled());
            }
            SyncBackendKind::Filesystem => {
                let path = config.path.clone().ok_or_else(|| {
                    visage_core::Error::Config("filesystem sync requires a path".to_string())
                })?;
                Arc::new(FilesystemBlobStore::new(path))
            }
            SyncBackendKind::Http => {
                let url = config.url.clone().ok_or_else(|| {
                    visage_core::Error::Config("http sync requires a URL".to_string())
                })?;
                let mut store = HttpBlobStore::new(url);
                if let Some(token) = &config.token {
                    store = store.with_token(token.clone());
                }
                Arc::new(store)
            }
        };
        info!(
            subsystem = "storage",
            component = "durable_sync",
            backend = backend.backend_name(),
            index_key = %config.index_key,
            metadata_key = %config.metadata_key,
            "Remote sync enabled"
        );
        Ok(Self::new(
            backend,
            config.index_key.clone(),
            config.metadata_key.clone(),
        ))
    }

    pub fn is_enabled(&self) -> bool {
        self.backend.is_some()
    }

    pub fn index_key(&self) -> &str {
        &self.index_key
    }

    pub fn metadata_key(&self) -> &str {
        &self.metadata_key
    }

    /// Upload `local_path` under `key`, deleting any existing blob first.
    pub async fn push(&self, local_path: &Path, key: &str) -> SyncOutcome {
        let Some(backend) = &self.backend else {
            return SyncOutcome::Skipped;
        };
        let start = Instant::now();
        let outcome = match push_inner(backend.as_ref(), local_path, key).await {
            Ok(bytes) => SyncOutcome::Uploaded { bytes },
            Err(e) => SyncOutcome::Failed(e.to_string()),
        };
        log_outcome("push", key, local_path, &outcome, start);
        outcome
    }

    /// Download `key` over `local_path` if the blob exists.
    ///
    /// A missing blob is a no-op; an existing local file is never removed.
    pub async fn pull(&self, key: &str, local_path: &Path) -> SyncOutcome {
        let Some(backend) = &self.backend else {
            return SyncOutcome::Skipped;
        };
        let start = Instant::now();
        let outcome = match pull_inner(backend.as_ref(), key, local_path).await {
            Ok(Some(bytes)) => SyncOutcome::Downloaded { bytes },
            Ok(None) => SyncOutcome::RemoteMissing,
            Err(e) => SyncOutcome::Failed(e.to_string()),
        };
        log_outcome("pull", key, local_path, &outcome, start);
        outcome
    }

    /// Push both files of the pair. Both are attempted even if one fails.
    pub async fn push_pair(&self, index_path: &Path, metadata_path: &Path) -> PairSync {
        let index = self.push(index_path, &self.index_key).await;
        let metadata = self.push(metadata_path, &self.metadata_key).await;
        PairSync { index, metadata }
    }

    /// Pull both files of the pair. Both are attempted even if one fails.
    pub async fn pull_pair(&self, index_path: &Path, metadata_path: &Path) -> PairSync {
        let index = self.pull(&self.index_key, index_path).await;
        let metadata = self.pull(&self.metadata_key, metadata_path).await;
        PairSync { index, metadata }
    }
}

async fn push_inner(backend: &dyn BlobStore, local_path: &Path, key: &str) -> Result<usize> {
    let data = fs::read(local_path).await?;
    if backend.exists(key).await? {
        backend.delete(key).await?;
    }
    backend.put(key, &data).await?;
    Ok(data.len())
}

async fn pull_inner(backend: &dyn BlobStore, key: &str, local_path: &Path) -> Result<Option<usize>> {
    if !backend.exists(key).await? {
        return Ok(None);
    }
    let data = backend.get(key).await?;
    write_atomic(local_path, &data).await?;
    Ok(Some(data.len()))
}

fn log_outcome(op: &str, key: &str, path: &Path, outcome: &SyncOutcome, start: Instant) {
    let duration_ms = start.elapsed().as_millis() as u64;
    match outcome {
        SyncOutcome::Failed(reason) => warn!(
            subsystem = "storage",
            component = "durable_sync",
            op,
            sync_key = %key,
            path = %path.display(),
            duration_ms,
            error = %reason,
            "Remote sync failed; continuing with local files"
        ),
        SyncOutcome::RemoteMissing => debug!(
            subsystem = "storage",
            component = "durable_sync",
            op,
            sync_key = %key,
            duration_ms,
            "Remote blob does not exist"
        ),
        SyncOutcome::Uploaded { bytes } | SyncOutcome::Downloaded { bytes } => debug!(
            subsystem = "storage",
            component = "durable_sync",
            op,
            sync_key = %key,
            path = %path.display(),
            bytes,
            duration_ms,
            "Remote sync complete"
        ),
        SyncOutcome::Skipped => {}
    }
}
