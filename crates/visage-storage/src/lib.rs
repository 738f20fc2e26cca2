//! # visage-storage
//!
//! Remote blob store backends and the best-effort durable sync that mirrors
//! the local gallery files to them.
//!
//! - [`FilesystemBlobStore`]: a shared directory (NFS mount, synced folder)
//! - [`HttpBlobStore`]: an HTTP object store addressed as `{base_url}/{key}`
//! - [`DurableSync`]: push/pull of the index/metadata pair, never failing hard

pub mod filesystem;
pub mod http;
pub mod sync;

pub use filesystem::{write_atomic, FilesystemBlobStore};
pub use http::HttpBlobStore;
pub use sync::{DurableSync, PairSync, SyncOutcome};
