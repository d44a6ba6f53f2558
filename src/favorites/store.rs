use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;

use crate::model::{FavoriteKey, Follower};
use crate::storage::BlobStore;

/// Blob key the favorites list is persisted under.
pub const FAVORITES_KEY: &str = "favorites";

/// Errors from [`FavoriteStore`] operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PersistenceError {
    /// Stored favorites could not be read or decoded
    #[error("Unable to load favorites: {0}")]
    LoadFailed(String),
    /// Favorites could not be encoded or written after an add
    #[error("Unable to save favorite: {0}")]
    SaveFailed(String),
    /// Favorites could not be written after a remove
    #[error("Unable to remove favorite: {0}")]
    DeleteFailed(String),
}

/// Durable, deduplicated set of favorited followers.
///
/// Share one instance behind an `Arc` between every screen that reads or
/// writes favorites. All operations go through a single async mutex, so a
/// read-modify-write on the whole set is never interleaved with another and
/// concurrent adds/removes of different followers cannot lose each other's
/// writes.
///
/// The set is loaded from the [`BlobStore`] on first access and cached.
/// The cache is cleared while a write is pending and only refilled once the
/// write succeeds, so a failed or cancelled write is followed by a reload.
pub struct FavoriteStore {
    blobs: Arc<dyn BlobStore>,
    cache: Mutex<Option<Vec<Follower>>>,
}

impl FavoriteStore {
    pub fn new(blobs: Arc<dyn BlobStore>) -> Self {
        Self {
            blobs,
            cache: Mutex::new(None),
        }
    }

    /// Add a favorite.
    ///
    /// Returns `Ok(false)` without writing if a follower with the same `id`
    /// is already stored.
    ///
    /// # Errors
    ///
    /// - [`PersistenceError::LoadFailed`] if the stored set cannot be read
    /// - [`PersistenceError::SaveFailed`] if the new set cannot be written
    pub async fn add(&self, follower: Follower) -> Result<bool, PersistenceError> {
        let mut cache = self.cache.lock().await;
        let current = self.loaded(&mut cache).await?;

        if current.iter().any(|f| f.id == follower.id) {
            tracing::debug!(id = follower.id, "Already a favorite, skipping write");
            return Ok(false);
        }

        let mut next = current.clone();
        next.push(follower);
        // Drop the cache while the write is pending. If this future is
        // cancelled after the blob lands, the next call reloads from the blob.
        cache.take();
        self.persist(&next)
            .await
            .map_err(PersistenceError::SaveFailed)?;

        tracing::debug!(count = next.len(), "Favorite added");
        *cache = Some(next);
        Ok(true)
    }

    /// Remove every favorite matching `key`.
    ///
    /// Removing something that is not stored is a successful no-op and
    /// returns `Ok(false)`.
    ///
    /// # Errors
    ///
    /// - [`PersistenceError::LoadFailed`] if the stored set cannot be read
    /// - [`PersistenceError::DeleteFailed`] if the new set cannot be written
    pub async fn remove(&self, key: impl Into<FavoriteKey>) -> Result<bool, PersistenceError> {
        let key = key.into();
        let mut cache = self.cache.lock().await;
        let current = self.loaded(&mut cache).await?;

        let next: Vec<Follower> = current.iter().filter(|f| !key.matches(f)).cloned().collect();
        if next.len() == current.len() {
            return Ok(false);
        }

        cache.take();
        self.persist(&next)
            .await
            .map_err(PersistenceError::DeleteFailed)?;

        tracing::debug!(key = ?key, count = next.len(), "Favorite removed");
        *cache = Some(next);
        Ok(true)
    }

    /// All favorites in insertion order.
    ///
    /// Nothing persisted yet is an empty list, not an error.
    pub async fn list(&self) -> Result<Vec<Follower>, PersistenceError> {
        let mut cache = self.cache.lock().await;
        Ok(self.loaded(&mut cache).await?.clone())
    }

    /// Membership test. Any load failure reads as "not a favorite".
    pub async fn contains(&self, key: impl Into<FavoriteKey>) -> bool {
        let key = key.into();
        let mut cache = self.cache.lock().await;
        match self.loaded(&mut cache).await {
            Ok(favorites) => favorites.iter().any(|f| key.matches(f)),
            Err(e) => {
                tracing::warn!(key = ?key, error = %e, "Favorite lookup failed, treating as not favorited");
                false
            }
        }
    }

    /// Return the cached set, loading it first if this is the first access.
    /// A failed load is not cached, so the next call retries.
    async fn loaded<'a>(
        &self,
        cache: &'a mut Option<Vec<Follower>>,
    ) -> Result<&'a Vec<Follower>, PersistenceError> {
        if cache.is_none() {
            let favorites = self.load().await?;
            tracing::info!(count = favorites.len(), "Loaded favorites");
            *cache = Some(favorites);
        }
        // Populated just above.
        Ok(cache.get_or_insert_with(Vec::new))
    }

    async fn load(&self) -> Result<Vec<Follower>, PersistenceError> {
        let bytes = self
            .blobs
            .read_blob(FAVORITES_KEY)
            .await
            .map_err(|e| PersistenceError::LoadFailed(e.to_string()))?;

        match bytes {
            None => Ok(Vec::new()),
            Some(bytes) => serde_json::from_slice(&bytes).map_err(|e| {
                tracing::warn!(error = %e, "Stored favorites are corrupt");
                PersistenceError::LoadFailed(e.to_string())
            }),
        }
    }

    async fn persist(&self, favorites: &[Follower]) -> Result<(), String> {
        let bytes = serde_json::to_vec(favorites).map_err(|e| e.to_string())?;
        self.blobs
            .write_blob(FAVORITES_KEY, &bytes)
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, "Failed to persist favorites");
                e.to_string()
            })
    }
}
