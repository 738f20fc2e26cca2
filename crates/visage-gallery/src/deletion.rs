//! Removing every entry of an identity from the gallery.

use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tracing::{error, info, warn};
use visage_core::{Error, Result};

use crate::freshness::CacheState;
use crate::gallery::Gallery;

/// Result of a deletion attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DeleteOutcome {
    /// Entries removed, persisted, and the reload from storage succeeded.
    Deleted { removed: usize, remaining: usize },
    /// No entry carries the name; nothing was written.
    NotFound,
    /// No gallery is loaded in memory, so there is nothing to delete from.
    GalleryNotLoaded,
    /// The rebuilt gallery was written but reloading it failed.
    ReloadFailed { reason: String },
}

impl DeleteOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, DeleteOutcome::Deleted { .. })
    }
}

#[derive(Clone)]
pub struct DeletionEngine {
    gallery: Arc<Gallery>,
}

impl DeletionEngine {
    pub fn new(gallery: Arc<Gallery>) -> Self {
        Self { gallery }
    }

    /// Remove every entry labelled `name`.
    ///
    /// The retained entries keep their relative order. After the rebuilt
    /// pair is written and pushed, the gallery is reloaded through the same
    /// path readers use; when the push failed the reload skips the remote
    /// pull so the stale remote copy cannot resurrect the deleted entries.
    pub async fn delete(&self, name: &str) -> Result<DeleteOutcome> {
        let start = Instant::now();
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::InvalidInput("identity name must not be empty".to_string()));
        }

        let files = self.gallery.files();
        let sync = self.gallery.sync();
        let mut cache = self.gallery.lock().await;

        let Some(store) = cache.loaded() else {
            warn!(
                subsystem = "gallery",
                component = "deletion",
                label = %name,
                "Delete requested with no gallery loaded"
            );
            return Ok(DeleteOutcome::GalleryNotLoaded);
        };

        let Some(rebuilt) = store.rebuild_excluding(name) else {
            info!(
                subsystem = "gallery",
                component = "deletion",
                label = %name,
                "Identity not enrolled; nothing deleted"
            );
            return Ok(DeleteOutcome::NotFound);
        };
        let removed = store.len() - rebuilt.len();

        if let Err(e) = files.save(&rebuilt).await {
            cache.invalidate();
            return Err(e);
        }
        cache.commit(Arc::new(rebuilt), files).await;

        let pushed = sync
            .push_pair(files.index_path(), files.metadata_path())
            .await;
        cache.record_push(&pushed);
        cache.reload(files, sync, !pushed.any_failed()).await;

        let outcome = match cache.state() {
            CacheState::Ready(reloaded) => DeleteOutcome::Deleted {
                removed,
                remaining: reloaded.len(),
            },
            CacheState::Unavailable { reason } => DeleteOutcome::ReloadFailed {
                reason: reason.clone(),
            },
            CacheState::Unloaded => DeleteOutcome::ReloadFailed {
                reason: "gallery not reloaded".to_string(),
            },
        };
        drop(cache);

        match &outcome {
            DeleteOutcome::Deleted { removed, remaining } => info!(
                subsystem = "gallery",
                component = "deletion",
                op = "delete",
                label = %name,
                removed,
                remaining,
                sync_failed = pushed.any_failed(),
                duration_ms = start.elapsed().as_millis() as u64,
                "Identity deleted"
            ),
            other => error!(
                subsystem = "gallery",
                component = "deletion",
                op = "delete",
                label = %name,
                outcome = ?other,
                "Gallery reload after delete failed"
            ),
        }
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enrollment::EnrollmentEngine;
    use crate::persistence::{GalleryFiles, LoadOutcome};
    use tempfile::TempDir;
    use visage_inference::mock::{face_at, MockEmbeddingGenerator, MockFaceDetector};
    use visage_storage::DurableSync;

    fn detector() -> MockFaceDetector {
        MockFaceDetector::new()
            .with_image(b"alice", vec![face_at(0.0, MockEmbeddingGenerator::basis(0, 512))])
            .with_image(b"bob", vec![face_at(0.0, MockEmbeddingGenerator::basis(1, 512))])
    }

    fn setup(dir: &TempDir) -> (EnrollmentEngine, DeletionEngine, Arc<Gallery>) {
        let files = GalleryFiles::new(dir.path().join("index.bin"), dir.path().join("metadata.json"));
        let gallery = Arc::new(Gallery::new(
            files,
            DurableSync::disabled(),
            Arc::new(detector()),
        ));
        (
            EnrollmentEngine::new(gallery.clone()),
            DeletionEngine::new(gallery.clone()),
            gallery,
        )
    }

    #[tokio::test]
    async fn test_delete_before_load_is_not_loaded() {
        let dir = TempDir::new().unwrap();
        let (_, deletion, _) = setup(&dir);
        assert_eq!(
            deletion.delete("alice").await.unwrap(),
            DeleteOutcome::GalleryNotLoaded
        );
    }

    #[tokio::test]
    async fn test_delete_removes_all_entries() {
        let dir = TempDir::new().unwrap();
        let (enrollment, deletion, gallery) = setup(&dir);
        enrollment.enroll(b"alice", "alice").await.unwrap();
        enrollment.enroll(b"bob", "bob").await.unwrap();
        enrollment.enroll(b"alice", "alice").await.unwrap();

        let outcome = deletion.delete("alice").await.unwrap();
        assert_eq!(
            outcome,
            DeleteOutcome::Deleted {
                removed: 2,
                remaining: 1
            }
        );
        assert!(outcome.is_success());

        match gallery.files().load().await {
            LoadOutcome::Loaded(store) => assert_eq!(store.labels(), &["bob".to_string()]),
            other => panic!("expected Loaded, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_delete_unknown_name_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let (enrollment, deletion, gallery) = setup(&dir);
        enrollment.enroll(b"alice", "alice").await.unwrap();
        let before = std::fs::read(gallery.files().index_path()).unwrap();

        assert_eq!(
            deletion.delete("mallory").await.unwrap(),
            DeleteOutcome::NotFound
        );
        assert_eq!(std::fs::read(gallery.files().index_path()).unwrap(), before);
    }

    #[tokio::test]
    async fn test_delete_last_identity_succeeds() {
        let dir = TempDir::new().unwrap();
        let (enrollment, deletion, gallery) = setup(&dir);
        enrollment.enroll(b"alice", "alice").await.unwrap();

        assert_eq!(
            deletion.delete("alice").await.unwrap(),
            DeleteOutcome::Deleted {
                removed: 1,
                remaining: 0
            }
        );
        assert_eq!(gallery.identities().await.unwrap().len(), 0);
    }

    #[tokio::test]
    async fn test_delete_blank_name_rejected() {
        let dir = TempDir::new().unwrap();
        let (_, deletion, _) = setup(&dir);
        assert!(deletion.delete("").await.is_err());
    }
}
