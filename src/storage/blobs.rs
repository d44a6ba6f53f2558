use async_trait::async_trait;

use super::schema::Database;
use super::types::StorageError;

/// Durable key/value storage of whole byte blobs.
///
/// A write always replaces the full value under its key. There are no
/// partial or incremental writes.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Read the blob stored under `key`, or `None` if nothing was ever written.
    async fn read_blob(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError>;

    /// Replace the blob stored under `key`.
    async fn write_blob(&self, key: &str, bytes: &[u8]) -> Result<(), StorageError>;
}

#[async_trait]
impl BlobStore for Database {
    async fn read_blob(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        let row: Option<(Vec<u8>,)> = sqlx::query_as("SELECT value FROM blobs WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StorageError::Read(e.to_string()))?;

        Ok(row.map(|(value,)| value))
    }

    async fn write_blob(&self, key: &str, bytes: &[u8]) -> Result<(), StorageError> {
        sqlx::query(
            r#"
            INSERT INTO blobs (key, value, updated_at)
            VALUES (?, ?, datetime('now'))
            ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
        "#,
        )
        .bind(key)
        .bind(bytes)
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Write(e.to_string()))?;

        tracing::debug!(key = %key, bytes = bytes.len(), "Blob written");
        Ok(())
    }
}
