//! # visage-gallery
//!
//! The face gallery: an exact L2 index of unit-length embeddings with a
//! parallel label list, persisted as an index/metadata file pair, mirrored to
//! an optional remote store, and served through a freshness-checked cache.
//!
//! ## Engines
//!
//! - [`RecognitionEngine`]: label every face in a frame
//! - [`EnrollmentEngine`]: add the first face of an image under a name
//! - [`DeletionEngine`]: remove every entry of a name
//!
//! All three share one [`Gallery`].
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use visage_core::VisageConfig;
//! use visage_gallery::{Gallery, RecognitionEngine};
//! use visage_inference::HttpFaceDetector;
//! use visage_storage::DurableSync;
//!
//! # async fn demo() -> visage_core::Result<()> {
//! let config = VisageConfig::default();
//! let detector = Arc::new(HttpFaceDetector::from_config(&config.detector));
//! let gallery = Arc::new(Gallery::from_config(&config, DurableSync::disabled(), detector));
//! gallery.bootstrap().await?;
//!
//! let engine = RecognitionEngine::new(gallery);
//! let frame = std::fs::read("frame.jpg")?;
//! for face in engine.recognize(&frame).await? {
//!     println!("{} at {:?}", face.label, face.bbox);
//! }
//! # Ok(())
//! # }
//! ```

pub mod codec;
pub mod deletion;
pub mod enrollment;
pub mod freshness;
pub mod gallery;
pub mod persistence;
pub mod recognition;
pub mod store;

pub use deletion::{DeleteOutcome, DeletionEngine};
pub use enrollment::{EnrollOutcome, EnrollmentEngine};
pub use freshness::{CacheState, FreshnessCache, GallerySnapshot};
pub use gallery::{Gallery, GalleryStatus};
pub use persistence::{FileStamp, GalleryFiles, LoadOutcome, PairStamp};
pub use recognition::RecognitionEngine;
pub use store::{EmbeddingStore, FlatIndex, NearestMatch, Neighbor};
