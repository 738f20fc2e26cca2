//! In-memory copy of the gallery, reloaded when the files underneath change.
//!
//! The cache remembers the [`PairStamp`] of the files it last loaded (or
//! wrote). On each read it compares the current stamps: unchanged files are
//! served from memory, changed files trigger a remote pull followed by a local
//! reload. With a remote refresh interval configured, a pull is also forced
//! once the previous one is older than the interval, so that writes made by
//! other hosts become visible even when the local files are quiet.
//!
//! After a failed push the local pair is ahead of the remote. Until a later
//! push succeeds, every pull is preceded by a re-push and skipped if that
//! re-push fails, so the stale remote never overwrites newer local writes.
//!
//! The cache does no locking of its own; [`crate::Gallery`] owns it behind a
//! mutex.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};
use visage_storage::{DurableSync, PairSync};

use crate::persistence::{GalleryFiles, LoadOutcome, PairStamp};
use crate::store::EmbeddingStore;

/// What the cache currently holds.
#[derive(Debug, Clone)]
pub enum CacheState {
    /// Nothing has been loaded yet.
    Unloaded,
    /// The last load attempt found no usable gallery.
    Unavailable { reason: String },
    Ready(Arc<EmbeddingStore>),
}

impl CacheState {
    pub fn name(&self) -> &'static str {
        match self {
            CacheState::Unloaded => "unloaded",
            CacheState::Unavailable { .. } => "unavailable",
            CacheState::Ready(_) => "ready",
        }
    }
}

/// What a reader gets back from [`FreshnessCache::refresh`].
#[derive(Debug, Clone)]
pub enum GallerySnapshot {
    /// A local file is absent.
    Missing,
    /// The files exist but could not be loaded.
    Unavailable,
    Ready(Arc<EmbeddingStore>),
}

impl GallerySnapshot {
    pub fn store(&self) -> Option<&Arc<EmbeddingStore>> {
        match self {
            GallerySnapshot::Ready(store) => Some(store),
            _ => None,
        }
    }
}

#[derive(Debug)]
pub struct FreshnessCache {
    state: CacheState,
    seen: Option<PairStamp>,
    last_pull: Option<Instant>,
    last_reload_at: Option<DateTime<Utc>>,
    reloads: u64,
    remote_refresh_interval: Option<Duration>,
    remote_behind: bool,
}

impl Default for FreshnessCache {
    fn default() -> Self {
        Self::new(None)
    }
}

impl FreshnessCache {
    pub fn new(remote_refresh_interval: Option<Duration>) -> Self {
        Self {
            state: CacheState::Unloaded,
            seen: None,
            last_pull: None,
            last_reload_at: None,
            reloads: 0,
            remote_refresh_interval,
            remote_behind: false,
        }
    }

    pub fn state(&self) -> &CacheState {
        &self.state
    }

    /// The loaded store, if any.
    pub fn loaded(&self) -> Option<Arc<EmbeddingStore>> {
        match &self.state {
            CacheState::Ready(store) => Some(store.clone()),
            _ => None,
        }
    }

    pub fn reload_count(&self) -> u64 {
        self.reloads
    }

    pub fn last_reload_at(&self) -> Option<DateTime<Utc>> {
        self.last_reload_at
    }

    /// Whether local writes have not reached the remote yet.
    pub fn remote_behind(&self) -> bool {
        self.remote_behind
    }

    /// Record the result of pushing the local pair.
    pub fn record_push(&mut self, pushed: &PairSync) {
        self.remote_behind = pushed.any_failed();
    }

    fn remote_due(&self) -> bool {
        match self.remote_refresh_interval {
            Some(interval) => self
                .last_pull
                .map_or(true, |pulled| pulled.elapsed() >= interval),
            None => false,
        }
    }

    /// Whether a read seeing `current` must reload.
    pub fn is_stale(&self, current: &PairStamp) -> bool {
        match self.state {
            CacheState::Ready(_) => self.seen.as_ref() != Some(current) || self.remote_due(),
            _ => true,
        }
    }

    /// Serve the gallery, reloading first if the files changed.
    pub async fn refresh(&mut self, files: &GalleryFiles, sync: &DurableSync) -> GallerySnapshot {
        let Some(current) = files.stamps().await else {
            debug!(
                subsystem = "gallery",
                component = "freshness",
                "Gallery files missing locally"
            );
            return GallerySnapshot::Missing;
        };

        if !self.is_stale(&current) {
            if let Some(store) = self.loaded() {
                return GallerySnapshot::Ready(store);
            }
        }

        self.reload(files, sync, true).await;
        match &self.state {
            CacheState::Ready(store) => GallerySnapshot::Ready(store.clone()),
            _ if files.exists().await => GallerySnapshot::Unavailable,
            _ => GallerySnapshot::Missing,
        }
    }

    /// Pull (optionally) and load the pair from disk, recording its stamps.
    pub async fn reload(&mut self, files: &GalleryFiles, sync: &DurableSync, pull: bool) {
        let start = Instant::now();
        let mut pulled = false;
        if pull {
            if self.remote_behind {
                let pushed = sync.push_pair(files.index_path(), files.metadata_path()).await;
                self.record_push(&pushed);
            }
            if self.remote_behind {
                warn!(
                    subsystem = "gallery",
                    component = "freshness",
                    "Remote still behind local gallery; skipping pull"
                );
            } else {
                sync.pull_pair(files.index_path(), files.metadata_path()).await;
                pulled = true;
            }
            self.last_pull = Some(Instant::now());
        }

        self.state = match files.load().await {
            LoadOutcome::Loaded(store) => CacheState::Ready(Arc::new(store)),
            LoadOutcome::Missing => CacheState::Unavailable {
                reason: "gallery files missing".to_string(),
            },
            LoadOutcome::Corrupt(reason) => {
                warn!(
                    subsystem = "gallery",
                    component = "freshness",
                    error = %reason,
                    "Gallery files unusable; treating gallery as empty"
                );
                CacheState::Unavailable { reason }
            }
        };
        self.seen = files.stamps().await;
        self.reloads += 1;
        self.last_reload_at = Some(Utc::now());

        info!(
            subsystem = "gallery",
            component = "freshness",
            op = "reload",
            state = self.state.name(),
            entry_count = self.loaded().map(|s| s.len()).unwrap_or(0),
            pulled,
            duration_ms = start.elapsed().as_millis() as u64,
            "Gallery reloaded"
        );
    }

    /// Adopt a store this process just wrote to `files`.
    pub async fn commit(&mut self, store: Arc<EmbeddingStore>, files: &GalleryFiles) {
        self.state = CacheState::Ready(store);
        self.seen = files.stamps().await;
    }

    /// Forget the loaded store so the next read reloads.
    pub fn invalidate(&mut self) {
        self.state = CacheState::Unloaded;
        self.seen = None;
    }

    /// The store as currently on local disk, without contacting the remote.
    ///
    /// Uses the cached copy when the local stamps still match it.
    pub async fn current_local(&self, files: &GalleryFiles) -> LoadOutcome {
        if let (Some(store), Some(current)) = (self.loaded(), files.stamps().await) {
            if self.seen == Some(current) {
                return LoadOutcome::Loaded((*store).clone());
            }
        }
        files.load().await
    }
}
