//! Object storage seam.
//!
//! Everything the report pipeline needs from a bucket goes through `ObjectStore`:
//! prefix listing, payload fetch, whole-object put and a time-bounded read link.
//! `AppState` carries one `Arc<dyn ObjectStore>` per bucket; tests swap in
//! `MemoryStore`.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use thiserror::Error;

#[cfg(test)]
pub mod memory;
pub mod s3;

pub use s3::S3Store;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("object not found: {0}")]
    NotFound(String),

    #[error("{operation} failed for '{key}': {message}")]
    Backend {
        operation: &'static str,
        key: String,
        message: String,
    },

    #[error("invalid presign duration: {0}")]
    Presign(String),
}

/// One entry of a prefix listing.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectSummary {
    pub key: String,
    pub last_modified: Option<DateTime<Utc>>,
}

/// A fetched object. `last_modified` is the store's own HTTP-date rendering, kept verbatim.
#[derive(Debug, Clone)]
pub struct StoredObject {
    pub body: Bytes,
    pub last_modified: Option<String>,
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Lists every object whose key starts with `prefix`, following continuation pages.
    async fn list(&self, prefix: &str) -> Result<Vec<ObjectSummary>, StorageError>;

    async fn get(&self, key: &str) -> Result<StoredObject, StorageError>;

    /// Writes the whole body under `key`. A failed put leaves no object behind.
    async fn put(&self, key: &str, body: Bytes, content_type: &str) -> Result<(), StorageError>;

    /// Returns a URL that reads `key` without further credentials until `ttl` elapses.
    async fn presign_get(&self, key: &str, ttl: Duration) -> Result<String, StorageError>;
}
