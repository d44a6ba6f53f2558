//! Integration tests for the favorites lifecycle: add, dedupe, toggle, list,
//! remove, and survival across store instances.
//!
//! Each test creates its own in-memory SQLite database for isolation, except
//! the reopen test, which needs a real file.

use chrono::{TimeZone, Utc};
use followfeed::favorites::{
    FavoriteStore, FavoriteToggle, FavoritesList, PersistenceError, ToggleError,
    EMPTY_FAVORITES_MESSAGE, FAVORITES_KEY,
};
use followfeed::model::{FavoriteKey, Follower, UserProfile};
use followfeed::storage::{BlobStore, Database};
use pretty_assertions::assert_eq;
use std::sync::Arc;

async fn test_db() -> Arc<Database> {
    Arc::new(Database::open(":memory:").await.unwrap())
}

fn follower(id: u64, login: &str) -> Follower {
    Follower {
        login: login.to_string(),
        id,
        avatar_url: format!("https://avatars.example.com/u/{id}"),
        url: format!("https://github.com/{login}"),
    }
}

fn profile(id: u64, login: &str) -> UserProfile {
    UserProfile {
        login: login.to_string(),
        id,
        avatar_url: format!("https://avatars.example.com/u/{id}"),
        name: None,
        location: None,
        bio: Some("bio".to_string()),
        public_repos: 3,
        public_gists: 0,
        html_url: format!("https://github.com/{login}"),
        following: 1,
        followers: 2,
        created_at: Utc.with_ymd_and_hms(2020, 5, 1, 0, 0, 0).unwrap(),
    }
}

fn ids(followers: &[Follower]) -> Vec<u64> {
    followers.iter().map(|f| f.id).collect()
}

// ============================================================================
// Store
// ============================================================================

#[tokio::test]
async fn test_add_is_idempotent_by_id() {
    let store = FavoriteStore::new(test_db().await);

    assert!(store.add(follower(7, "alice")).await.unwrap());
    assert!(store.add(follower(8, "bob")).await.unwrap());
    // Same id, different display data: ignored
    assert!(!store.add(follower(7, "alice-renamed")).await.unwrap());

    let listed = store.list().await.unwrap();
    assert_eq!(ids(&listed), vec![7, 8]);
    assert_eq!(listed[0].login, "alice");
}

#[tokio::test]
async fn test_remove_absent_is_noop() {
    let store = FavoriteStore::new(test_db().await);
    store.add(follower(1, "one")).await.unwrap();

    assert!(!store.remove(99u64).await.unwrap());
    assert_eq!(ids(&store.list().await.unwrap()), vec![1]);
}

#[tokio::test]
async fn test_remove_by_login() {
    let store = FavoriteStore::new(test_db().await);
    store.add(follower(1, "one")).await.unwrap();
    store.add(follower(2, "two")).await.unwrap();

    assert!(store.remove(FavoriteKey::Login("one".to_string())).await.unwrap());
    assert!(!store.contains("one").await);
    assert!(store.contains(2u64).await);
}

#[tokio::test]
async fn test_empty_store_lists_nothing() {
    let store = FavoriteStore::new(test_db().await);
    assert!(store.list().await.unwrap().is_empty());
    assert!(!store.contains(1u64).await);
}

#[tokio::test]
async fn test_favorites_survive_new_store_instance() {
    let db = test_db().await;
    {
        let store = FavoriteStore::new(db.clone());
        store.add(follower(3, "three")).await.unwrap();
        store.add(follower(1, "one")).await.unwrap();
    }

    let reopened = FavoriteStore::new(db);
    assert_eq!(ids(&reopened.list().await.unwrap()), vec![3, 1]);
}

#[tokio::test]
async fn test_favorites_survive_database_reopen() {
    let dir = std::env::temp_dir().join("followfeed_favorites_reopen");
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("favorites.db");
    std::fs::remove_file(&path).ok();
    let path_str = path.to_str().unwrap();

    {
        let db = Arc::new(Database::open(path_str).await.unwrap());
        let store = FavoriteStore::new(db);
        store.add(follower(42, "answer")).await.unwrap();
    }

    let db = Arc::new(Database::open(path_str).await.unwrap());
    let store = FavoriteStore::new(db);
    assert!(store.contains(42u64).await);

    std::fs::remove_dir_all(&dir).ok();
}

#[tokio::test]
async fn test_corrupt_blob_is_load_failure_and_contains_false() {
    let db = test_db().await;
    db.write_blob(FAVORITES_KEY, b"{not json").await.unwrap();
    let store = FavoriteStore::new(db);

    assert!(matches!(
        store.list().await,
        Err(PersistenceError::LoadFailed(_))
    ));
    assert!(!store.contains(1u64).await);
    assert!(matches!(
        store.add(follower(1, "one")).await,
        Err(PersistenceError::LoadFailed(_))
    ));
}

#[tokio::test]
async fn test_concurrent_adds_are_all_kept() {
    let store = Arc::new(FavoriteStore::new(test_db().await));

    let handles: Vec<_> = (0..20u64)
        .map(|id| {
            let store = Arc::clone(&store);
            tokio::spawn(async move { store.add(follower(id, &format!("user{id}"))).await })
        })
        .collect();
    for handle in handles {
        assert!(handle.await.unwrap().unwrap());
    }

    let mut listed = ids(&store.list().await.unwrap());
    listed.sort_unstable();
    assert_eq!(listed, (0..20).collect::<Vec<u64>>());
}

// ============================================================================
// Toggle + list
// ============================================================================

#[tokio::test]
async fn test_toggle_then_list_then_remove() {
    let store = Arc::new(FavoriteStore::new(test_db().await));

    let mut toggle = FavoriteToggle::new(profile(583231, "octocat"), store.clone());
    toggle.wait().await.unwrap();
    assert!(!toggle.is_favorite());

    toggle.toggle().unwrap();
    assert!(matches!(toggle.toggle(), Err(ToggleError::Busy)));
    toggle.wait().await.unwrap();
    assert!(toggle.is_favorite());

    let mut list = FavoritesList::new(store.clone());
    list.reload().await.unwrap();
    assert_eq!(list.favorites().len(), 1);
    assert_eq!(list.favorites()[0].url, "https://github.com/octocat");

    list.remove_at(0).await.unwrap();
    assert_eq!(list.message(), Some(EMPTY_FAVORITES_MESSAGE));

    // A new toggle for the same profile sees the removal
    let mut toggle = FavoriteToggle::new(profile(583231, "octocat"), store);
    toggle.wait().await.unwrap();
    assert!(!toggle.is_favorite());
}

#[tokio::test]
async fn test_toggle_reflects_existing_favorite() {
    let store = Arc::new(FavoriteStore::new(test_db().await));
    store.add(follower(9, "nine")).await.unwrap();

    let mut toggle = FavoriteToggle::new(profile(9, "nine"), store);
    toggle.wait().await.unwrap();
    assert!(toggle.is_favorite());

    toggle.toggle().unwrap();
    toggle.wait().await.unwrap();
    assert!(!toggle.is_favorite());
}
