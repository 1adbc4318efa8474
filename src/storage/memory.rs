//! In-memory artifact store for tests

use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Mutex;

use super::{ArtifactStore, StorageError};

/// Object stored by [`MemoryStore`]
#[derive(Debug, Clone)]
pub struct StoredObject {
    pub key: String,
    pub bytes: Bytes,
    pub content_type: String,
}

/// Keeps uploads in a vector; optionally fails every upload
pub struct MemoryStore {
    base_url: String,
    fail: bool,
    objects: Mutex<Vec<StoredObject>>,
}

impl MemoryStore {
    pub fn new(base_url: &str) -> Self {
        MemoryStore {
            base_url: base_url.to_string(),
            fail: false,
            objects: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        MemoryStore {
            fail: true,
            ..MemoryStore::new("https://unused.example.com")
        }
    }

    pub fn objects(&self) -> Vec<StoredObject> {
        self.objects.lock().unwrap().clone()
    }
}

#[async_trait]
impl ArtifactStore for MemoryStore {
    async fn put(&self, data: Bytes, key: &str, content_type: &str) -> Result<String, StorageError> {
        if self.fail {
            return Err(StorageError::UploadFailed("memory store set to fail".to_string()));
        }
        self.objects.lock().unwrap().push(StoredObject {
            key: key.to_string(),
            bytes: data,
            content_type: content_type.to_string(),
        });
        Ok(super::r2::public_url(&self.base_url, key))
    }
}
