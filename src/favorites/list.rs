use std::sync::Arc;

use super::store::{FavoriteStore, PersistenceError};
use crate::model::Follower;

/// Shown when the favorites list loads empty.
pub const EMPTY_FAVORITES_MESSAGE: &str = "No favorites yet. Add one on the follower screen.";

/// Snapshot of the favorites set for a listing screen.
///
/// Reads and removals go straight to the shared [`FavoriteStore`]; this type
/// only keeps the last loaded snapshot and a display message.
pub struct FavoritesList {
    store: Arc<FavoriteStore>,
    favorites: Vec<Follower>,
    message: Option<String>,
}

impl FavoritesList {
    pub fn new(store: Arc<FavoriteStore>) -> Self {
        Self {
            store,
            favorites: Vec::new(),
            message: None,
        }
    }

    pub fn favorites(&self) -> &[Follower] {
        &self.favorites
    }

    /// Empty-state or error message, if any.
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// Reload the snapshot from the store.
    ///
    /// On failure the previous snapshot is kept and the error becomes the
    /// display message.
    pub async fn reload(&mut self) -> Result<(), PersistenceError> {
        match self.store.list().await {
            Ok(favorites) => {
                self.favorites = favorites;
                self.update_empty_message();
                Ok(())
            }
            Err(e) => {
                self.message = Some(e.to_string());
                Err(e)
            }
        }
    }

    /// Remove the favorite at `index` in the current snapshot.
    ///
    /// Returns the removed follower, or `None` if `index` is out of range.
    /// The entry is removed by `id`, so a snapshot that is stale relative to
    /// the store still removes the right follower.
    pub async fn remove_at(&mut self, index: usize) -> Result<Option<Follower>, PersistenceError> {
        let Some(target) = self.favorites.get(index).cloned() else {
            return Ok(None);
        };

        if let Err(e) = self.store.remove(&target).await {
            self.message = Some(e.to_string());
            return Err(e);
        }

        self.favorites.retain(|f| f.id != target.id);
        self.update_empty_message();
        tracing::debug!(id = target.id, remaining = self.favorites.len(), "Favorite removed from list");
        Ok(Some(target))
    }

    fn update_empty_message(&mut self) {
        self.message = self
            .favorites
            .is_empty()
            .then(|| EMPTY_FAVORITES_MESSAGE.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryBlobStore;

    fn follower(id: u64, login: &str) -> Follower {
        Follower {
            login: login.to_string(),
            id,
            avatar_url: format!("https://example.com/avatar{id}.png"),
            url: format!("https://api.github.com/users/{login}"),
        }
    }

    async fn seeded_store(count: u64) -> Arc<FavoriteStore> {
        let store = Arc::new(FavoriteStore::new(Arc::new(MemoryBlobStore::new())));
        for id in 1..=count {
            store.add(follower(id, &format!("user{id}"))).await.unwrap();
        }
        store
    }

    #[tokio::test]
    async fn test_reload_empty_sets_message() {
        let mut list = FavoritesList::new(seeded_store(0).await);
        list.reload().await.unwrap();
        assert!(list.favorites().is_empty());
        assert_eq!(list.message(), Some(EMPTY_FAVORITES_MESSAGE));
    }

    #[tokio::test]
    async fn test_reload_lists_favorites() {
        let mut list = FavoritesList::new(seeded_store(3).await);
        list.reload().await.unwrap();
        assert_eq!(list.favorites().len(), 3);
        assert_eq!(list.message(), None);
    }

    #[tokio::test]
    async fn test_remove_at_updates_store_and_snapshot() {
        let store = seeded_store(3).await;
        let mut list = FavoritesList::new(store.clone());
        list.reload().await.unwrap();

        let removed = list.remove_at(1).await.unwrap().unwrap();
        assert_eq!(removed.login, "user2");
        assert_eq!(list.favorites().len(), 2);
        assert!(!store.contains(2u64).await);
    }

    #[tokio::test]
    async fn test_remove_last_shows_empty_message() {
        let mut list = FavoritesList::new(seeded_store(1).await);
        list.reload().await.unwrap();

        list.remove_at(0).await.unwrap();
        assert!(list.favorites().is_empty());
        assert_eq!(list.message(), Some(EMPTY_FAVORITES_MESSAGE));
    }

    #[tokio::test]
    async fn test_remove_out_of_range_is_none() {
        let mut list = FavoritesList::new(seeded_store(1).await);
        list.reload().await.unwrap();
        assert!(list.remove_at(5).await.unwrap().is_none());
        assert_eq!(list.favorites().len(), 1);
    }

    #[tokio::test]
    async fn test_reload_corrupt_keeps_snapshot_and_reports() {
        let blobs = Arc::new(MemoryBlobStore::new());
        blobs.insert(super::super::store::FAVORITES_KEY, "garbage");
        let mut list = FavoritesList::new(Arc::new(FavoriteStore::new(blobs)));

        assert!(list.reload().await.is_err());
        assert!(list.favorites().is_empty());
        assert!(list.message().unwrap().starts_with("Unable to load favorites"));
    }
}
