use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;

use super::store::{FavoriteStore, PersistenceError};
use crate::model::{Follower, UserProfile};
use crate::util::catch_task_panic;

/// Errors surfaced by [`FavoriteToggle`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ToggleError {
    /// Another toggle for this profile has not finished yet
    #[error("A favorite update is already in progress")]
    Busy,
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
    /// The background task died before reporting a result
    #[error("Internal error in {task} task: {error}")]
    TaskPanicked { task: &'static str, error: String },
}

/// Results delivered from background store calls.
#[derive(Debug)]
pub enum ToggleEvent {
    /// Initial membership lookup finished
    StatusResolved { favorite: bool },
    Added(Result<(), ToggleError>),
    Removed(Result<(), ToggleError>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PendingToggle {
    Add,
    Remove,
}

/// Favorite flag for one profile, backed by a shared [`FavoriteStore`].
///
/// The flag only changes after the store confirms a write, so a failure
/// leaves it at its previous value. Store calls run in spawned tasks and
/// report back through this toggle's own channel; the owner applies them
/// with [`handle_event`](Self::handle_event) (or [`wait`](Self::wait)).
///
/// Only one add/remove may be in flight. A second toggle while one is
/// pending fails with [`ToggleError::Busy`] and makes no store call.
pub struct FavoriteToggle {
    profile: UserProfile,
    store: Arc<FavoriteStore>,
    is_favorite: bool,
    lookup_pending: bool,
    /// Set once any add/remove has been confirmed; a slower initial lookup
    /// must not overwrite it.
    confirmed: bool,
    pending: Option<PendingToggle>,
    error: Option<String>,
    event_tx: mpsc::Sender<ToggleEvent>,
    event_rx: mpsc::Receiver<ToggleEvent>,
}

impl FavoriteToggle {
    /// Bind `profile` to `store` and start the initial membership lookup.
    ///
    /// The flag reads `false` until the lookup resolves. Must be called
    /// from within a Tokio runtime.
    pub fn new(profile: UserProfile, store: Arc<FavoriteStore>) -> Self {
        let (event_tx, event_rx) = mpsc::channel(8);
        let mut toggle = Self {
            profile,
            store,
            is_favorite: false,
            lookup_pending: true,
            confirmed: false,
            pending: None,
            error: None,
            event_tx,
            event_rx,
        };
        toggle.spawn_lookup();
        toggle
    }

    pub fn profile(&self) -> &UserProfile {
        &self.profile
    }

    pub fn is_favorite(&self) -> bool {
        self.is_favorite
    }

    pub fn is_busy(&self) -> bool {
        self.pending.is_some()
    }

    /// Message from the most recent failed toggle, cleared by the next one.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Start adding the profile to favorites.
    pub fn toggle_on(&mut self) -> Result<(), ToggleError> {
        self.begin(PendingToggle::Add)
    }

    /// Start removing the profile from favorites.
    pub fn toggle_off(&mut self) -> Result<(), ToggleError> {
        self.begin(PendingToggle::Remove)
    }

    /// Flip the current flag.
    pub fn toggle(&mut self) -> Result<(), ToggleError> {
        if self.is_favorite {
            self.toggle_off()
        } else {
            self.toggle_on()
        }
    }

    /// Wait for the next background result and apply it.
    ///
    /// Returns `None` if nothing is outstanding.
    pub async fn next_event(&mut self) -> Option<ToggleEvent> {
        if !self.lookup_pending && self.pending.is_none() {
            return None;
        }
        self.event_rx.recv().await
    }

    /// Apply every outstanding result. Returns the error of the last
    /// add/remove applied, if it failed.
    pub async fn wait(&mut self) -> Result<(), ToggleError> {
        let mut outcome = Ok(());
        while let Some(event) = self.next_event().await {
            if let Err(e) = self.handle_event(event) {
                outcome = Err(e);
            }
        }
        outcome
    }

    /// Apply a background result to the flag.
    ///
    /// Returns the store error for a failed add/remove; the flag keeps its
    /// pre-toggle value in that case.
    pub fn handle_event(&mut self, event: ToggleEvent) -> Result<(), ToggleError> {
        match event {
            ToggleEvent::StatusResolved { favorite } => {
                self.lookup_pending = false;
                if self.confirmed {
                    tracing::debug!(
                        id = self.profile.id,
                        favorite,
                        "Ignoring favorite lookup superseded by a confirmed toggle"
                    );
                } else {
                    self.is_favorite = favorite;
                }
                Ok(())
            }
            ToggleEvent::Added(result) => self.finish(PendingToggle::Add, result),
            ToggleEvent::Removed(result) => self.finish(PendingToggle::Remove, result),
        }
    }

    fn finish(
        &mut self,
        kind: PendingToggle,
        result: Result<(), ToggleError>,
    ) -> Result<(), ToggleError> {
        if self.pending != Some(kind) {
            tracing::debug!(id = self.profile.id, ?kind, "Ignoring unexpected toggle result");
            return Ok(());
        }
        self.pending = None;

        match result {
            Ok(()) => {
                self.is_favorite = kind == PendingToggle::Add;
                self.confirmed = true;
                tracing::debug!(id = self.profile.id, favorite = self.is_favorite, "Favorite toggled");
                Ok(())
            }
            Err(e) => {
                tracing::warn!(id = self.profile.id, ?kind, error = %e, "Favorite toggle failed");
                self.error = Some(e.to_string());
                Err(e)
            }
        }
    }

    fn begin(&mut self, kind: PendingToggle) -> Result<(), ToggleError> {
        if self.pending.is_some() {
            return Err(ToggleError::Busy);
        }
        self.pending = Some(kind);
        self.error = None;

        let store = Arc::clone(&self.store);
        let tx = self.event_tx.clone();
        let follower = Follower::from(&self.profile);

        tokio::spawn(async move {
            let event = match kind {
                PendingToggle::Add => {
                    let result = catch_task_panic(store.add(follower)).await;
                    ToggleEvent::Added(flatten(result, "favorite_add"))
                }
                PendingToggle::Remove => {
                    let result = catch_task_panic(store.remove(follower.id)).await;
                    ToggleEvent::Removed(flatten(result, "favorite_remove"))
                }
            };
            if let Err(e) = tx.send(event).await {
                tracing::warn!(error = %e, "Toggle result dropped (receiver gone)");
            }
        });
        Ok(())
    }

    fn spawn_lookup(&mut self) {
        let store = Arc::clone(&self.store);
        let tx = self.event_tx.clone();
        let id = self.profile.id;

        tokio::spawn(async move {
            let favorite = match catch_task_panic(store.contains(id)).await {
                Ok(favorite) => favorite,
                Err(panic_msg) => {
                    tracing::error!(task = "favorite_lookup", error = %panic_msg, "Background task panicked");
                    false
                }
            };
            if let Err(e) = tx.send(ToggleEvent::StatusResolved { favorite }).await {
                tracing::warn!(error = %e, "Favorite lookup dropped (receiver gone)");
            }
        });
    }
}

fn flatten(
    result: Result<Result<bool, PersistenceError>, String>,
    task: &'static str,
) -> Result<(), ToggleError> {
    match result {
        Ok(Ok(_)) => Ok(()),
        Ok(Err(e)) => Err(ToggleError::Persistence(e)),
        Err(panic_msg) => {
            tracing::error!(task, error = %panic_msg, "Background task panicked");
            Err(ToggleError::TaskPanicked {
                task,
                error: panic_msg,
            })
        }
    }
}
