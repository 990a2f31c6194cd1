//! Blob storage abstraction for tabwash.
//!
//! The [`BlobStore`] trait is the only way the pipeline touches artifact
//! bytes. Artifacts are keyed by a flat filename inside one of two fixed
//! [`Namespace`]s, so the same name can exist as raw and cleaned at once.
//!
//! Implementations must be `Send + Sync`; the HTTP server shares a single
//! store across request handlers.
//!
//! # Operations
//!
//! | Method | Purpose |
//! |--------|---------|
//! | [`put`](BlobStore::put) | Write (or overwrite) an artifact, returning its location |
//! | [`get`](BlobStore::get) | Read an artifact, `None` when absent |
//! | [`exists`](BlobStore::exists) | Presence check |
//! | [`list`](BlobStore::list) | Sorted names in a namespace |
//! | [`location`](BlobStore::location) | Human-readable location of a key |

pub mod fs;
pub mod memory;

pub use fs::FsBlobStore;
pub use memory::MemoryBlobStore;

use std::io;

use crate::models::Namespace;

/// Durable byte storage keyed by `(namespace, filename)`.
pub trait BlobStore: Send + Sync {
    /// Writes `bytes` under `name`, replacing any previous artifact.
    ///
    /// Returns the artifact's location as reported by [`location`](Self::location).
    fn put(&self, namespace: Namespace, name: &str, bytes: &[u8]) -> io::Result<String>;

    fn get(&self, namespace: Namespace, name: &str) -> io::Result<Option<Vec<u8>>>;

    fn exists(&self, namespace: Namespace, name: &str) -> io::Result<bool>;

    /// Names stored in `namespace`, sorted ascending. An empty or missing
    /// namespace yields an empty list.
    fn list(&self, namespace: Namespace) -> io::Result<Vec<String>>;

    fn location(&self, namespace: Namespace, name: &str) -> String;
}
