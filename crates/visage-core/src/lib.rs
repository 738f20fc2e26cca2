//! # visage-core
//!
//! Core types, traits, and abstractions for the visage face gallery.
//!
//! This crate provides the foundational data structures and trait definitions
//! that other visage crates depend on.

pub mod config;
pub mod defaults;
pub mod error;
pub mod logging;
pub mod models;
pub mod traits;

// Re-export commonly used types at crate root
pub use config::{ConfigError, DetectorConfig, SyncBackendKind, SyncConfig, VisageConfig};
pub use error::{Error, Result};
pub use models::*;
pub use traits::*;
