//! Profile detail loading for a single subject.

use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::favorites::{FavoriteStore, FavoriteToggle};
use crate::model::UserProfile;
use crate::remote::{RemoteCollection, TransportError};
use crate::util::catch_task_panic;

#[derive(Debug)]
pub enum ProfileEvent {
    Loaded {
        generation: u64,
        result: Result<UserProfile, TransportError>,
    },
}

/// Loads and holds the [`UserProfile`] for one subject.
///
/// Follows the same ownership model as the feed controller: the fetch runs
/// in a spawned task and the owner applies the result. Reloading or
/// switching subject invalidates any earlier in-flight result.
pub struct ProfileController {
    remote: Arc<dyn RemoteCollection>,
    subject: String,
    profile: Option<UserProfile>,
    loading: bool,
    error: Option<TransportError>,
    generation: u64,
    fetch_handle: Option<JoinHandle<()>>,
    event_tx: mpsc::Sender<ProfileEvent>,
    event_rx: mpsc::Receiver<ProfileEvent>,
}

impl ProfileController {
    /// Create a controller for `subject` and start loading it.
    pub fn new(subject: impl Into<String>, remote: Arc<dyn RemoteCollection>) -> Self {
        let (event_tx, event_rx) = mpsc::channel(4);
        let mut controller = Self {
            remote,
            subject: subject.into(),
            profile: None,
            loading: false,
            error: None,
            generation: 0,
            fetch_handle: None,
            event_tx,
            event_rx,
        };
        controller.reload();
        controller
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn profile(&self) -> Option<&UserProfile> {
        self.profile.as_ref()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> Option<&TransportError> {
        self.error.as_ref()
    }

    /// Switch to another subject. The old profile is cleared right away.
    pub fn set_subject(&mut self, subject: impl Into<String>) {
        self.subject = subject.into();
        self.profile = None;
        self.reload();
    }

    /// Fetch the profile again, superseding any fetch in flight.
    pub fn reload(&mut self) {
        if let Some(handle) = self.fetch_handle.take() {
            handle.abort();
        }
        self.generation = self.generation.wrapping_add(1);
        self.loading = true;
        self.error = None;

        let generation = self.generation;
        let subject = self.subject.clone();
        let remote = Arc::clone(&self.remote);
        let tx = self.event_tx.clone();

        self.fetch_handle = Some(tokio::spawn(async move {
            let result = match catch_task_panic(remote.fetch_detail(&subject)).await {
                Ok(result) => result,
                Err(panic_msg) => {
                    tracing::error!(task = "profile_fetch", error = %panic_msg, "Background task panicked");
                    Err(TransportError::Network(format!("internal error: {panic_msg}")))
                }
            };
            if let Err(e) = tx.send(ProfileEvent::Loaded { generation, result }).await {
                tracing::warn!(error = %e, event = "ProfileLoaded", "Channel send failed (receiver dropped)");
            }
        }));
    }

    /// Wait for the in-flight fetch. `None` when nothing is loading.
    pub async fn next_event(&mut self) -> Option<ProfileEvent> {
        if !self.loading {
            return None;
        }
        self.event_rx.recv().await
    }

    /// Wait until the current fetch has been applied.
    pub async fn settle(&mut self) {
        while let Some(event) = self.next_event().await {
            self.handle_event(event);
        }
    }

    pub fn handle_event(&mut self, event: ProfileEvent) {
        let ProfileEvent::Loaded { generation, result } = event;
        if generation != self.generation {
            tracing::debug!(
                expected = self.generation,
                got = generation,
                "Ignoring stale profile result (generation mismatch)"
            );
            return;
        }

        self.loading = false;
        self.fetch_handle = None;
        match result {
            Ok(profile) => {
                tracing::debug!(login = %profile.login, id = profile.id, "Profile loaded");
                self.profile = Some(profile);
            }
            Err(e) => {
                tracing::warn!(subject = %self.subject, error = %e, "Profile fetch failed");
                self.error = Some(e);
            }
        }
    }

    /// Favorite toggle bound to the loaded profile, if it has loaded.
    pub fn favorite_toggle(&self, store: Arc<FavoriteStore>) -> Option<FavoriteToggle> {
        self.profile
            .clone()
            .map(|profile| FavoriteToggle::new(profile, store))
    }
}

impl Drop for ProfileController {
    fn drop(&mut self) {
        if let Some(handle) = self.fetch_handle.take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Follower;
    use crate::storage::MemoryBlobStore;
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn profile(login: &str, id: u64) -> UserProfile {
        UserProfile {
            login: login.to_string(),
            id,
            avatar_url: format!("https://example.com/{login}.png"),
            name: Some("The Octocat".to_string()),
            location: None,
            bio: None,
            public_repos: 8,
            public_gists: 8,
            following: 9,
            followers: 140,
            html_url: format!("https://github.com/{login}"),
            created_at: Utc.with_ymd_and_hms(2011, 1, 25, 18, 44, 36).unwrap(),
        }
    }

    struct DetailRemote {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl RemoteCollection for DetailRemote {
        async fn fetch_page(&self, _subject: &str, _page: u32) -> Result<Vec<Follower>, TransportError> {
            Ok(Vec::new())
        }

        async fn fetch_detail(&self, subject: &str) -> Result<UserProfile, TransportError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match subject {
                "octocat" => Ok(profile("octocat", 583231)),
                "hubot" => Ok(profile("hubot", 480938)),
                "limited" => Err(TransportError::RateLimited),
                _ => Err(TransportError::NotFound),
            }
        }
    }

    fn remote() -> Arc<DetailRemote> {
        Arc::new(DetailRemote {
            calls: AtomicUsize::new(0),
        })
    }

    #[tokio::test]
    async fn test_loads_profile() {
        let mut controller = ProfileController::new("octocat", remote());
        assert!(controller.is_loading());
        controller.settle().await;

        assert!(!controller.is_loading());
        assert_eq!(controller.profile().unwrap().id, 583231);
        assert!(controller.error().is_none());
    }

    #[tokio::test]
    async fn test_error_is_kept() {
        let mut controller = ProfileController::new("nobody", remote());
        controller.settle().await;
        assert!(controller.profile().is_none());
        assert_eq!(controller.error(), Some(&TransportError::NotFound));
    }

    #[tokio::test]
    async fn test_reload_clears_error() {
        let remote = remote();
        let mut controller = ProfileController::new("limited", remote.clone());
        controller.settle().await;
        assert_eq!(controller.error(), Some(&TransportError::RateLimited));

        controller.reload();
        assert!(controller.error().is_none());
        controller.settle().await;
        assert_eq!(remote.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_set_subject_ignores_earlier_result() {
        let mut controller = ProfileController::new("octocat", remote());
        controller.set_subject("hubot");
        controller.settle().await;
        assert_eq!(controller.profile().unwrap().login, "hubot");

        let stale = ProfileEvent::Loaded {
            generation: 1,
            result: Ok(profile("octocat", 583231)),
        };
        controller.handle_event(stale);
        assert_eq!(controller.profile().unwrap().login, "hubot");
    }

    #[tokio::test]
    async fn test_favorite_toggle_requires_profile() {
        let store = Arc::new(FavoriteStore::new(Arc::new(MemoryBlobStore::new())));
        let mut controller = ProfileController::new("octocat", remote());
        assert!(controller.favorite_toggle(store.clone()).is_none());

        controller.settle().await;
        let mut toggle = controller.favorite_toggle(store.clone()).unwrap();
        toggle.wait().await.unwrap();
        assert!(!toggle.is_favorite());

        toggle.toggle_on().unwrap();
        toggle.wait().await.unwrap();
        assert!(toggle.is_favorite());
        assert!(store.contains(583231u64).await);
    }
}
