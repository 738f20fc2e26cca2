//! Shared gallery context: files, sync, detector, threshold, and the cache.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{Mutex, MutexGuard};
use tracing::info;
use visage_core::defaults::RECOGNITION_THRESHOLD;
use visage_core::{FaceDetector, IdentitySummary, Result, VisageConfig};
use visage_storage::DurableSync;

use crate::freshness::{CacheState, FreshnessCache, GallerySnapshot};
use crate::persistence::GalleryFiles;

/// Everything the engines share.
///
/// Mutations (and cache refreshes) serialise on the cache mutex. Readers take
/// an `Arc` snapshot of the store and release the lock before matching.
pub struct Gallery {
    files: GalleryFiles,
    sync: DurableSync,
    detector: Arc<dyn FaceDetector>,
    threshold: f32,
    cache: Mutex<FreshnessCache>,
}

/// Point-in-time view of the cache, for health reporting.
#[derive(Debug, Clone, Serialize)]
pub struct GalleryStatus {
    pub state: &'static str,
    pub entries: Option<usize>,
    pub identities: Option<usize>,
    pub reloads: u64,
    pub last_reload_at: Option<DateTime<Utc>>,
    pub sync_enabled: bool,
}

impl Gallery {
    pub fn new(files: GalleryFiles, sync: DurableSync, detector: Arc<dyn FaceDetector>) -> Self {
        Self {
            files,
            sync,
            detector,
            threshold: RECOGNITION_THRESHOLD,
            cache: Mutex::new(FreshnessCache::default()),
        }
    }

    pub fn from_config(
        config: &VisageConfig,
        sync: DurableSync,
        detector: Arc<dyn FaceDetector>,
    ) -> Self {
        Self::new(GalleryFiles::from_config(config), sync, detector)
            .with_threshold(config.threshold)
            .with_remote_refresh_interval(config.sync.remote_refresh_interval)
    }

    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_remote_refresh_interval(mut self, interval: Option<Duration>) -> Self {
        self.cache = Mutex::new(FreshnessCache::new(interval));
        self
    }

    pub fn files(&self) -> &GalleryFiles {
        &self.files
    }

    pub fn sync(&self) -> &DurableSync {
        &self.sync
    }

    pub fn detector(&self) -> &Arc<dyn FaceDetector> {
        &self.detector
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    pub fn dimension(&self) -> usize {
        self.files.dimension()
    }

    pub(crate) async fn lock(&self) -> MutexGuard<'_, FreshnessCache> {
        self.cache.lock().await
    }

    /// Prepare the local files at startup.
    ///
    /// Pulls the remote pair when the local one is incomplete, then creates
    /// whatever is still missing as an empty gallery.
    pub async fn bootstrap(&self) -> Result<()> {
        let _guard = self.cache.lock().await;
        if !self.files.exists().await && self.sync.is_enabled() {
            let pulled = self
                .sync
                .pull_pair(self.files.index_path(), self.files.metadata_path())
                .await;
            info!(
                subsystem = "gallery",
                component = "bootstrap",
                index = ?pulled.index,
                metadata = ?pulled.metadata,
                "Pulled remote gallery for missing local files"
            );
        }
        self.files.ensure_exists().await?;
        Ok(())
    }

    /// Current gallery, refreshed if the files changed.
    pub async fn snapshot(&self) -> GallerySnapshot {
        let mut cache = self.cache.lock().await;
        cache.refresh(&self.files, &self.sync).await
    }

    /// Enrolled identities, or `None` when no gallery can be loaded.
    pub async fn identities(&self) -> Option<Vec<IdentitySummary>> {
        self.snapshot().await.store().map(|store| store.identities())
    }

    pub async fn status(&self) -> GalleryStatus {
        let cache = self.cache.lock().await;
        let store = match cache.state() {
            CacheState::Ready(store) => Some(store.clone()),
            _ => None,
        };
        GalleryStatus {
            state: cache.state().name(),
            entries: store.as_ref().map(|s| s.len()),
            identities: store.as_ref().map(|s| s.identities().len()),
            reloads: cache.reload_count(),
            last_reload_at: cache.last_reload_at(),
            sync_enabled: self.sync.is_enabled(),
        }
    }
}
