//! Frame recognition: detect faces, then label each against the gallery.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, trace, warn};
use visage_core::defaults::RECOGNITION_K;
use visage_core::{classify, DetectedFace, Identity, RecognizedFace, Result};

use crate::freshness::GallerySnapshot;
use crate::gallery::Gallery;
use crate::store::EmbeddingStore;

#[derive(Clone)]
pub struct RecognitionEngine {
    gallery: Arc<Gallery>,
}

impl RecognitionEngine {
    pub fn new(gallery: Arc<Gallery>) -> Self {
        Self { gallery }
    }

    /// Label every face in `frame`, in detection order.
    ///
    /// Returns no faces (and runs no detection) while the local gallery
    /// files are absent. A gallery that exists but cannot be loaded matches
    /// nothing, so every detected face comes back `Unknown`.
    pub async fn recognize(&self, frame: &[u8]) -> Result<Vec<RecognizedFace>> {
        let start = Instant::now();

        let store = match self.gallery.snapshot().await {
            GallerySnapshot::Missing => {
                debug!(
                    subsystem = "gallery",
                    component = "recognition",
                    "No gallery on disk; skipping detection"
                );
                return Ok(Vec::new());
            }
            GallerySnapshot::Unavailable => None,
            GallerySnapshot::Ready(store) => Some(store),
        };

        let faces = self.gallery.detector().detect(frame).await?;
        let results: Vec<RecognizedFace> = faces
            .iter()
            .map(|face| self.match_face(face, store.as_deref()))
            .collect();

        info!(
            subsystem = "gallery",
            component = "recognition",
            op = "recognize",
            face_count = results.len(),
            known_count = results.iter().filter(|r| r.label.is_known()).count(),
            entry_count = store.as_ref().map(|s| s.len()).unwrap_or(0),
            duration_ms = start.elapsed().as_millis() as u64,
            "Recognition complete"
        );
        Ok(results)
    }

    /// Label a single detected face against `store`.
    pub fn match_face(&self, face: &DetectedFace, store: Option<&EmbeddingStore>) -> RecognizedFace {
        let unknown = RecognizedFace {
            bbox: face.bbox,
            label: Identity::Unknown,
            distance: None,
        };

        let embedding = match face.unit_embedding(self.gallery.dimension()) {
            Ok(embedding) => embedding,
            Err(e) => {
                warn!(
                    subsystem = "gallery",
                    component = "recognition",
                    error = %e,
                    "Unusable face embedding; reporting Unknown"
                );
                return unknown;
            }
        };

        let Some(store) = store else {
            return unknown;
        };
        let Some(hit) = store.search(&embedding, RECOGNITION_K).into_iter().next() else {
            return unknown;
        };
        let Some(label) = store.label(hit.position) else {
            return unknown;
        };

        let identity = classify(hit.distance, self.gallery.threshold(), label);
        trace!(
            subsystem = "gallery",
            component = "recognition",
            label = %identity,
            nearest = label,
            distance = hit.distance,
            "Face matched"
        );
        RecognizedFace {
            bbox: face.bbox,
            label: identity,
            distance: Some(hit.distance),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::GalleryFiles;
    use tempfile::TempDir;
    use visage_core::Embedding;
    use visage_inference::mock::{face_at, MockEmbeddingGenerator, MockFaceDetector};
    use visage_storage::DurableSync;

    fn engine(dir: &TempDir, detector: MockFaceDetector) -> RecognitionEngine {
        let files = GalleryFiles::new(dir.path().join("index.bin"), dir.path().join("metadata.json"));
        let gallery = Gallery::new(files, DurableSync::disabled(), Arc::new(detector));
        RecognitionEngine::new(Arc::new(gallery))
    }

    fn store_with_alice() -> EmbeddingStore {
        let mut store = EmbeddingStore::default();
        store
            .insert(
                Embedding::normalized(&MockEmbeddingGenerator::basis(0, 512)).unwrap(),
                "alice",
            )
            .unwrap();
        store
    }

    #[tokio::test]
    async fn test_missing_gallery_skips_detection() {
        let dir = TempDir::new().unwrap();
        let detector = MockFaceDetector::new()
            .with_default_faces(vec![face_at(0.0, MockEmbeddingGenerator::basis(0, 512))]);
        let engine = engine(&dir, detector.clone());

        assert!(engine.recognize(b"frame").await.unwrap().is_empty());
        assert_eq!(detector.detect_call_count(), 0);
    }

    #[test]
    fn test_match_face_without_store_is_unknown() {
        let dir = TempDir::new().unwrap();
        let engine = engine(&dir, MockFaceDetector::new());
        let face = face_at(0.0, MockEmbeddingGenerator::basis(0, 512));
        let result = engine.match_face(&face, None);
        assert_eq!(result.label, Identity::Unknown);
        assert_eq!(result.distance, None);
    }

    #[test]
    fn test_match_face_normalizes_raw_embedding() {
        let dir = TempDir::new().unwrap();
        let engine = engine(&dir, MockFaceDetector::new());
        let raw = MockEmbeddingGenerator::scaled(&MockEmbeddingGenerator::basis(0, 512), 37.5);
        let result = engine.match_face(&face_at(0.0, raw), Some(&store_with_alice()));
        assert_eq!(result.label, Identity::Known("alice".to_string()));
        assert!(result.distance.unwrap() < 1e-6);
    }

    #[test]
    fn test_match_face_far_embedding_is_unknown_with_distance() {
        let dir = TempDir::new().unwrap();
        let engine = engine(&dir, MockFaceDetector::new());
        let face = face_at(0.0, MockEmbeddingGenerator::basis(1, 512));
        let result = engine.match_face(&face, Some(&store_with_alice()));
        assert_eq!(result.label, Identity::Unknown);
        assert_eq!(result.distance, Some(2.0));
    }

    #[test]
    fn test_match_face_bad_embedding_is_unknown() {
        let dir = TempDir::new().unwrap();
        let engine = engine(&dir, MockFaceDetector::new());
        let store = store_with_alice();
        assert_eq!(
            engine
                .match_face(&face_at(0.0, vec![0.0; 512]), Some(&store))
                .label,
            Identity::Unknown
        );
        assert_eq!(
            engine
                .match_face(&face_at(0.0, vec![1.0; 128]), Some(&store))
                .distance,
            None
        );
    }
}
