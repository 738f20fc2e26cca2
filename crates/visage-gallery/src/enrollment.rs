//! Adding identities to the gallery.

use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tracing::{debug, info, warn};
use visage_core::{Error, Result};

use crate::gallery::Gallery;
use crate::persistence::LoadOutcome;
use crate::store::EmbeddingStore;

/// Result of an enrollment attempt.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum EnrollOutcome {
    /// The first detected face was stored under the name.
    Enrolled {
        position: usize,
        total: usize,
        /// The remote push failed; the local files are still up to date.
        sync_failed: bool,
    },
    /// The image contained no face; nothing changed.
    NoFaceDetected,
    /// The detector returned an embedding that cannot be normalized.
    InvalidEmbedding { reason: String },
}

impl EnrollOutcome {
    pub fn is_enrolled(&self) -> bool {
        matches!(self, EnrollOutcome::Enrolled { .. })
    }
}

#[derive(Clone)]
pub struct EnrollmentEngine {
    gallery: Arc<Gallery>,
}

impl EnrollmentEngine {
    pub fn new(gallery: Arc<Gallery>) -> Self {
        Self { gallery }
    }

    /// Store the first face found in `image` under `name`.
    ///
    /// The gallery is persisted locally before the call returns; a local
    /// write failure is an error. The remote push is best effort.
    pub async fn enroll(&self, image: &[u8], name: &str) -> Result<EnrollOutcome> {
        let start = Instant::now();
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::InvalidInput("identity name must not be empty".to_string()));
        }

        let faces = self.gallery.detector().detect(image).await?;
        let Some(face) = faces.first() else {
            info!(
                subsystem = "gallery",
                component = "enrollment",
                label = %name,
                "No face detected; nothing enrolled"
            );
            return Ok(EnrollOutcome::NoFaceDetected);
        };
        if faces.len() > 1 {
            debug!(
                subsystem = "gallery",
                component = "enrollment",
                face_count = faces.len(),
                "Several faces detected; enrolling the first"
            );
        }

        let embedding = match face.unit_embedding(self.gallery.dimension()) {
            Ok(embedding) => embedding,
            Err(e) => {
                warn!(
                    subsystem = "gallery",
                    component = "enrollment",
                    label = %name,
                    error = %e,
                    "Detected face has an unusable embedding"
                );
                return Ok(EnrollOutcome::InvalidEmbedding {
                    reason: e.to_string(),
                });
            }
        };

        let files = self.gallery.files();
        let mut cache = self.gallery.lock().await;

        let mut store = match cache.current_local(files).await {
            LoadOutcome::Loaded(store) => store,
            LoadOutcome::Missing => EmbeddingStore::new(self.gallery.dimension()),
            LoadOutcome::Corrupt(reason) => match cache.loaded() {
                // A torn pair from another writer must not discard what we already hold.
                Some(loaded) => {
                    warn!(
                        subsystem = "gallery",
                        component = "enrollment",
                        error = %reason,
                        entry_count = loaded.len(),
                        "Gallery files unusable; enrolling into the last loaded gallery"
                    );
                    (*loaded).clone()
                }
                None => {
                    warn!(
                        subsystem = "gallery",
                        component = "enrollment",
                        error = %reason,
                        "Existing gallery unusable; enrolling into an empty one"
                    );
                    EmbeddingStore::new(self.gallery.dimension())
                }
            },
        };

        let position = store.insert(embedding, name)?;
        files.save(&store).await?;

        let pushed = self
            .gallery
            .sync()
            .push_pair(files.index_path(), files.metadata_path())
            .await;

        let total = store.len();
        cache.commit(Arc::new(store), files).await;
        cache.record_push(&pushed);
        drop(cache);

        info!(
            subsystem = "gallery",
            component = "enrollment",
            op = "enroll",
            label = %name,
            position,
            entry_count = total,
            sync_failed = pushed.any_failed(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Identity enrolled"
        );
        Ok(EnrollOutcome::Enrolled {
            position,
            total,
            sync_failed: pushed.any_failed(),
        })
    }
}
