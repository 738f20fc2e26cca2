//! # visage-inference
//!
//! Face detection backend abstraction for visage.
//!
//! This crate provides:
//! - [`HttpFaceDetector`]: client for a detection/embedding sidecar
//! - [`LazyDetector`]: at-most-once detector initialisation shared by all engines
//! - `mock` (feature `mock`): deterministic detector and embedding generators for tests
//!
//! # Example
//!
//! ```rust,no_run
//! use visage_inference::HttpFaceDetector;
//! use visage_core::FaceDetector;
//!
//! #[tokio::main]
//! async fn main() {
//!     let detector = HttpFaceDetector::new("http://127.0.0.1:8501".to_string());
//!     let image = std::fs::read("frame.jpg").unwrap();
//!     let faces = detector.detect(&image).await.unwrap();
//!     println!("{} faces", faces.len());
//! }
//! ```

pub mod detector;
pub mod lazy;

// Mock detector for testing
#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use detector::HttpFaceDetector;
pub use lazy::LazyDetector;
