use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

use super::blobs::BlobStore;
use super::types::StorageError;

/// Process-local [`BlobStore`]. Nothing survives the process.
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    blobs: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a blob directly, e.g. to simulate data written by an older build.
    pub fn insert(&self, key: &str, bytes: impl Into<Vec<u8>>) {
        self.lock().insert(key.to_string(), bytes.into());
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Vec<u8>>> {
        // A poisoned map is still a valid map; nothing is mid-update while locked.
        self.blobs.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn read_blob(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        Ok(self.lock().get(key).cloned())
    }

    async fn write_blob(&self, key: &str, bytes: &[u8]) -> Result<(), StorageError> {
        self.lock().insert(key.to_string(), bytes.to_vec());
        Ok(())
    }
}
