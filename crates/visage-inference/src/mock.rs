//! Mock face detector for deterministic testing.
//!
//! Provides a [`FaceDetector`] that answers from a table of image bytes to
//! faces, plus generators for 512-d embeddings with controlled geometry.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use visage_core::{BoundingBox, DetectedFace, FaceDetector};
//! use visage_inference::mock::{MockFaceDetector, MockEmbeddingGenerator};
//!
//! # async fn demo() {
//! let alice = DetectedFace::new(
//!     BoundingBox::new(0.0, 0.0, 64.0, 64.0),
//!     MockEmbeddingGenerator::basis(0, 512),
//! );
//! let detector = MockFaceDetector::new().with_image(b"frame-1", vec![alice]);
//! let faces = detector.detect(b"frame-1").await.unwrap();
//! assert_eq!(faces.len(), 1);
//! # }
//! ```

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use visage_core::{BoundingBox, DetectedFace, Error, FaceDetector, Result};

/// Mock detector for testing.
#[derive(Clone)]
pub struct MockFaceDetector {
    config: Arc<MockConfig>,
    call_log: Arc<Mutex<Vec<MockCall>>>,
}

#[derive(Debug, Clone)]
struct MockConfig {
    images: HashMap<Vec<u8>, Vec<DetectedFace>>,
    default_faces: Vec<DetectedFace>,
    latency_ms: u64,
    failure_rate: f64,
    healthy: bool,
}

#[derive(Debug, Clone)]
pub struct MockCall {
    pub image_len: usize,
    pub face_count: usize,
    pub timestamp: std::time::Instant,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            images: HashMap::new(),
            default_faces: Vec::new(),
            latency_ms: 0,
            failure_rate: 0.0,
            healthy: true,
        }
    }
}

impl MockFaceDetector {
    /// Create a new mock detector that finds no faces anywhere.
    pub fn new() -> Self {
        Self {
            config: Arc::new(MockConfig::default()),
            call_log: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Return `faces` whenever exactly these image bytes are submitted.
    pub fn with_image(mut self, image: impl AsRef<[u8]>, faces: Vec<DetectedFace>) -> Self {
        Arc::make_mut(&mut self.config)
            .images
            .insert(image.as_ref().to_vec(), faces);
        self
    }

    /// Faces returned for images without an explicit mapping.
    pub fn with_default_faces(mut self, faces: Vec<DetectedFace>) -> Self {
        Arc::make_mut(&mut self.config).default_faces = faces;
        self
    }

    /// Set simulated latency for every detection.
    pub fn with_latency_ms(mut self, latency_ms: u64) -> Self {
        Arc::make_mut(&mut self.config).latency_ms = latency_ms;
        self
    }

    /// Set failure rate (0.0 - 1.0) for testing error handling.
    pub fn with_failure_rate(mut self, rate: f64) -> Self {
        Arc::make_mut(&mut self.config).failure_rate = rate.clamp(0.0, 1.0);
        self
    }

    /// Set what the health probe reports.
    pub fn with_health(mut self, healthy: bool) -> Self {
        Arc::make_mut(&mut self.config).healthy = healthy;
        self
    }

    /// Get all logged calls for assertion.
    pub fn get_calls(&self) -> Vec<MockCall> {
        self.call_log.lock().unwrap().clone()
    }

    /// Get number of detect calls.
    pub fn detect_call_count(&self) -> usize {
        self.call_log.lock().unwrap().len()
    }

    fn should_fail(&self) -> bool {
        use rand::Rng;
        if self.config.failure_rate > 0.0 {
            rand::thread_rng().gen::<f64>() < self.config.failure_rate
        } else {
            false
        }
    }
}

impl Default for MockFaceDetector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FaceDetector for MockFaceDetector {
    async fn detect(&self, image: &[u8]) -> Result<Vec<DetectedFace>> {
        if self.config.latency_ms > 0 {
            tokio::time::sleep(tokio::time::Duration::from_millis(self.config.latency_ms)).await;
        }
        if self.should_fail() {
            return Err(Error::Detection("Simulated failure for testing".to_string()));
        }

        let faces = self
            .config
            .images
            .get(image)
            .cloned()
            .unwrap_or_else(|| self.config.default_faces.clone());

        self.call_log.lock().unwrap().push(MockCall {
            image_len: image.len(),
            face_count: faces.len(),
            timestamp: std::time::Instant::now(),
        });
        Ok(faces)
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(self.config.healthy)
    }

    fn model_name(&self) -> &str {
        "mock-face-detector"
    }
}

/// Mock embedding generator with deterministic output.
pub struct MockEmbeddingGenerator;

impl MockEmbeddingGenerator {
    /// One-hot vector on axis `axis`. Distinct axes are at squared distance 2.
    pub fn basis(axis: usize, dimension: usize) -> Vec<f32> {
        let mut vec = vec![0.0; dimension];
        vec[axis % dimension] = 1.0;
        vec
    }

    /// Generate a unit vector from a seed (random-like but deterministic).
    pub fn generate_with_seed(seed: u64, dimension: usize) -> Vec<f32> {
        let mut vec = vec![0.0; dimension];
        let mut state = seed;

        // Simple LCG for deterministic pseudo-random values
        for item in vec.iter_mut() {
            state = state.wrapping_mul(1664525).wrapping_add(1013904223);
            *item = ((state % 1000) as f32) / 1000.0 - 0.5;
        }

        Self::normalize(&mut vec);
        vec
    }

    /// Unit vector on the circle spanned by axes 0 and 1 at `angle` radians
    /// from axis 0. Its squared distance to `basis(0)` is `2 - 2 cos(angle)`.
    pub fn at_angle(angle: f32, dimension: usize) -> Vec<f32> {
        let mut vec = vec![0.0; dimension];
        vec[0] = angle.cos();
        vec[1] = angle.sin();
        vec
    }

    /// Scale a vector, producing an un-normalized "raw model output".
    pub fn scaled(vec: &[f32], factor: f32) -> Vec<f32> {
        vec.iter().map(|v| v * factor).collect()
    }

    fn normalize(vec: &mut [f32]) {
        let magnitude: f32 = vec.iter().map(|x| x * x).sum::<f32>().sqrt();
        if magnitude > 0.0 {
            vec.iter_mut().for_each(|x| *x /= magnitude);
        }
    }
}

/// A face at a fixed box with the given embedding.
pub fn face_at(x: f32, embedding: Vec<f32>) -> DetectedFace {
    DetectedFace::new(BoundingBox::new(x, 10.0, x + 100.0, 130.0), embedding)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_detector_maps_images() {
        let face = face_at(0.0, MockEmbeddingGenerator::basis(3, 512));
        let detector = MockFaceDetector::new().with_image(b"frame", vec![face.clone()]);

        assert_eq!(detector.detect(b"frame").await.unwrap(), vec![face]);
        assert!(detector.detect(b"other").await.unwrap().is_empty());
        assert_eq!(detector.detect_call_count(), 2);
    }

    #[tokio::test]
    async fn test_mock_detector_default_faces() {
        let face = face_at(5.0, MockEmbeddingGenerator::basis(1, 512));
        let detector = MockFaceDetector::new().with_default_faces(vec![face]);
        assert_eq!(detector.detect(b"anything").await.unwrap().len(), 1);
        assert_eq!(detector.get_calls()[0].face_count, 1);
    }

    #[tokio::test]
    async fn test_mock_detector_failure_simulation() {
        let detector = MockFaceDetector::new().with_failure_rate(1.0);
        let err = detector.detect(b"frame").await.unwrap_err();
        assert!(matches!(err, Error::Detection(_)));
    }

    #[tokio::test]
    async fn test_mock_detector_latency_simulation() {
        let detector = MockFaceDetector::new().with_latency_ms(20);
        let start = std::time::Instant::now();
        detector.detect(b"frame").await.unwrap();
        assert!(start.elapsed().as_millis() >= 20, "Should simulate latency");
    }

    #[test]
    fn test_basis_vectors_are_two_apart() {
        let a = MockEmbeddingGenerator::basis(0, 512);
        let b = MockEmbeddingGenerator::basis(1, 512);
        let dist: f32 = a.iter().zip(&b).map(|(x, y)| (x - y) * (x - y)).sum();
        assert_eq!(dist, 2.0);
    }

    #[test]
    fn test_generate_with_seed_deterministic_and_unit() {
        let e1 = MockEmbeddingGenerator::generate_with_seed(42, 512);
        let e2 = MockEmbeddingGenerator::generate_with_seed(42, 512);
        let e3 = MockEmbeddingGenerator::generate_with_seed(43, 512);
        assert_eq!(e1, e2);
        assert_ne!(e1, e3);
        let magnitude: f32 = e1.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((magnitude - 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_at_angle_distance() {
        let base = MockEmbeddingGenerator::basis(0, 512);
        let v = MockEmbeddingGenerator::at_angle(std::f32::consts::FRAC_PI_2, 512);
        let dist: f32 = base.iter().zip(&v).map(|(x, y)| (x - y) * (x - y)).sum();
        assert!((dist - 2.0).abs() < 1e-5);
    }
}
