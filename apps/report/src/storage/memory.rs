//! In-memory `ObjectStore` used by tests in place of S3.

use std::collections::BTreeMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};

use super::{ObjectStore, ObjectSummary, StorageError, StoredObject};

#[derive(Debug, Clone)]
struct MemoryObject {
    body: Bytes,
    last_modified: DateTime<Utc>,
}

#[derive(Default)]
pub struct MemoryStore {
    objects: Mutex<BTreeMap<String, MemoryObject>>,
    fail_puts: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose every `put` fails, for exercising the persist failure path.
    pub fn failing_puts() -> Self {
        Self {
            fail_puts: true,
            ..Self::default()
        }
    }

    pub fn insert(&self, key: &str, body: impl Into<Bytes>, last_modified: DateTime<Utc>) {
        self.objects.lock().unwrap().insert(
            key.to_string(),
            MemoryObject {
                body: body.into(),
                last_modified,
            },
        );
    }

    pub fn keys(&self) -> Vec<String> {
        self.objects.lock().unwrap().keys().cloned().collect()
    }

    /// Resolves a URL produced by `presign_get` back to the stored bytes.
    pub fn fetch_url(&self, url: &str) -> Option<Bytes> {
        let rest = url.strip_prefix("memory://")?;
        let (key, expires) = rest.split_once("?expires=")?;
        let expires: i64 = expires.parse().ok()?;
        if Utc::now().timestamp() > expires {
            return None;
        }
        self.objects
            .lock()
            .unwrap()
            .get(key)
            .map(|o| o.body.clone())
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn list(&self, prefix: &str) -> Result<Vec<ObjectSummary>, StorageError> {
        Ok(self
            .objects
            .lock()
            .unwrap()
            .iter()
            .filter(|(key, _)| key.starts_with(prefix))
            .map(|(key, o)| ObjectSummary {
                key: key.clone(),
                last_modified: Some(o.last_modified),
            })
            .collect())
    }

    async fn get(&self, key: &str) -> Result<StoredObject, StorageError> {
        let objects = self.objects.lock().unwrap();
        let object = objects
            .get(key)
            .ok_or_else(|| StorageError::NotFound(key.to_string()))?;
        Ok(StoredObject {
            body: object.body.clone(),
            last_modified: Some(
                object
                    .last_modified
                    .format("%a, %d %b %Y %H:%M:%S GMT")
                    .to_string(),
            ),
        })
    }

    async fn put(&self, key: &str, body: Bytes, _content_type: &str) -> Result<(), StorageError> {
        if self.fail_puts {
            return Err(StorageError::Backend {
                operation: "PutObject",
                key: key.to_string(),
                message: "injected failure".to_string(),
            });
        }
        self.insert(key, body, Utc::now());
        Ok(())
    }

    async fn presign_get(&self, key: &str, ttl: Duration) -> Result<String, StorageError> {
        if !self.objects.lock().unwrap().contains_key(key) {
            return Err(StorageError::NotFound(key.to_string()));
        }
        let expires = Utc::now().timestamp() + ttl.as_secs() as i64;
        Ok(format!("memory://{key}?expires={expires}"))
    }
}
