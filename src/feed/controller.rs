use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::model::Follower;
use crate::remote::{RemoteCollection, TransportError, PAGE_SIZE};
use crate::util::catch_task_panic;

/// How close to the end of the list an item must be to trigger prefetch.
pub const DEFAULT_PREFETCH_THRESHOLD: usize = 5;

/// Shown when the first page comes back empty.
pub const EMPTY_FEED_MESSAGE: &str = "This user doesn't have any followers.";

// ============================================================================
// State
// ============================================================================

/// Coarse phase of a feed, derived from [`FeedState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedPhase {
    Idle,
    Loading,
    Error,
    Exhausted,
}

/// Observable state of a paginated feed.
///
/// `items` only grows while the subject stays the same. `exhausted` never
/// goes back to `false` except through a subject change.
#[derive(Debug, Clone)]
pub struct FeedState {
    /// Followers in arrival order. Shared so derived views can hold it cheaply.
    pub items: Arc<Vec<Follower>>,
    /// Page number the next request will use (1-based)
    pub next_page: u32,
    pub exhausted: bool,
    pub loading: bool,
    /// Last transport failure, cleared when the next request starts
    pub error: Option<TransportError>,
    /// True once any page has been applied for the current subject
    pub fetched: bool,
}

impl FeedState {
    fn new() -> Self {
        Self {
            items: Arc::new(Vec::new()),
            next_page: 1,
            exhausted: false,
            loading: false,
            error: None,
            fetched: false,
        }
    }

    pub fn phase(&self) -> FeedPhase {
        if self.loading {
            FeedPhase::Loading
        } else if self.exhausted {
            FeedPhase::Exhausted
        } else if self.error.is_some() {
            FeedPhase::Error
        } else {
            FeedPhase::Idle
        }
    }

    /// True when pages were fetched and the subject turned out to have no
    /// followers at all.
    pub fn is_empty_result(&self) -> bool {
        self.fetched && self.items.is_empty()
    }

    /// Message to display instead of the list, if any.
    pub fn message(&self) -> Option<String> {
        if let Some(error) = &self.error {
            Some(error.to_string())
        } else if self.is_empty_result() {
            Some(EMPTY_FEED_MESSAGE.to_string())
        } else {
            None
        }
    }
}

// ============================================================================
// Events
// ============================================================================

/// Result of a background page fetch, delivered to the owning controller.
#[derive(Debug)]
pub enum FeedEvent {
    PageLoaded {
        generation: u64,
        page: u32,
        result: Result<Vec<Follower>, TransportError>,
    },
}

/// What applying a [`FeedEvent`] did to the feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageOutcome {
    /// Page appended. `exhausted` is true if it was the last page.
    Appended { count: usize, exhausted: bool },
    /// Fetch failed; items unchanged and the same page will be retried.
    Failed(TransportError),
    /// Result belonged to a superseded request and was discarded.
    Stale,
}

// ============================================================================
// Controller
// ============================================================================

/// Drives sequential page fetches for one subject into a growing list.
///
/// The controller is owned by a single task and mutated only through
/// `&mut self`. Each fetch runs in a spawned task tagged with the current
/// generation and reports back over this controller's channel; the owner
/// applies results with [`handle_event`](Self::handle_event). Results from a
/// previous subject are discarded by generation.
pub struct FeedController {
    remote: Arc<dyn RemoteCollection>,
    subject: String,
    state: FeedState,
    generation: u64,
    prefetch_threshold: usize,
    fetch_handle: Option<JoinHandle<()>>,
    event_tx: mpsc::Sender<FeedEvent>,
    event_rx: mpsc::Receiver<FeedEvent>,
}

impl FeedController {
    /// Create a feed for `subject` and immediately request page 1.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new(subject: impl Into<String>, remote: Arc<dyn RemoteCollection>) -> Self {
        let (event_tx, event_rx) = mpsc::channel(8);
        let mut controller = Self {
            remote,
            subject: subject.into(),
            state: FeedState::new(),
            generation: 0,
            prefetch_threshold: DEFAULT_PREFETCH_THRESHOLD,
            fetch_handle: None,
            event_tx,
            event_rx,
        };
        controller.request_next_page();
        controller
    }

    pub fn with_prefetch_threshold(mut self, threshold: usize) -> Self {
        self.prefetch_threshold = threshold;
        self
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn state(&self) -> &FeedState {
        &self.state
    }

    pub fn items(&self) -> &Arc<Vec<Follower>> {
        &self.state.items
    }

    /// Request the next page.
    ///
    /// No-op (returns `false`) while a request is in flight or after the feed
    /// is exhausted, so repeated calls from an edge-triggered signal issue at
    /// most one fetch.
    pub fn request_next_page(&mut self) -> bool {
        if self.state.loading || self.state.exhausted {
            return false;
        }

        // Capture the page for this request before advancing the counter.
        let page = self.state.next_page;
        self.state.next_page += 1;
        self.state.loading = true;
        self.state.error = None;

        let generation = self.generation;
        let subject = self.subject.clone();
        let remote = Arc::clone(&self.remote);
        let tx = self.event_tx.clone();

        tracing::debug!(subject = %subject, page, generation, "Requesting follower page");

        self.fetch_handle = Some(tokio::spawn(async move {
            let result = match catch_task_panic(remote.fetch_page(&subject, page)).await {
                Ok(result) => result,
                Err(panic_msg) => {
                    tracing::error!(task = "page_fetch", page, error = %panic_msg, "Background task panicked");
                    Err(TransportError::Network(format!("internal error: {panic_msg}")))
                }
            };
            if let Err(e) = tx
                .send(FeedEvent::PageLoaded {
                    generation,
                    page,
                    result,
                })
                .await
            {
                tracing::warn!(error = %e, event = "PageLoaded", "Channel send failed (receiver dropped)");
            }
        }));

        true
    }

    /// True when `observed` sits within the prefetch window at the end of
    /// the list.
    pub fn should_load_more(&self, observed: &Follower) -> bool {
        let items = &self.state.items;
        let window_start = items.len().saturating_sub(self.prefetch_threshold);
        items
            .iter()
            .rposition(|f| f.id == observed.id)
            .is_some_and(|index| index >= window_start)
    }

    /// Request the next page if `observed` is near the end of the list.
    pub fn load_more_if_needed(&mut self, observed: &Follower) -> bool {
        self.should_load_more(observed) && self.request_next_page()
    }

    /// Switch to a new subject.
    ///
    /// Aborts any in-flight fetch, invalidates its result, and resets to an
    /// empty idle feed at page 1. No request is issued.
    pub fn set_subject(&mut self, subject: impl Into<String>) {
        if let Some(handle) = self.fetch_handle.take() {
            handle.abort();
        }
        self.generation = self.generation.wrapping_add(1);
        self.subject = subject.into();
        self.state = FeedState::new();
        tracing::debug!(subject = %self.subject, generation = self.generation, "Feed subject changed");
    }

    /// Wait for the in-flight fetch to report.
    ///
    /// Returns `None` when nothing is in flight.
    pub async fn next_event(&mut self) -> Option<FeedEvent> {
        if !self.state.loading {
            return None;
        }
        self.event_rx.recv().await
    }

    /// Wait for the in-flight fetch and apply it, skipping stale results.
    ///
    /// Returns `None` when nothing is in flight.
    pub async fn settle(&mut self) -> Option<PageOutcome> {
        while let Some(event) = self.next_event().await {
            match self.handle_event(event) {
                PageOutcome::Stale => continue,
                outcome => return Some(outcome),
            }
        }
        None
    }

    /// Apply a fetch result to the feed state.
    pub fn handle_event(&mut self, event: FeedEvent) -> PageOutcome {
        let FeedEvent::PageLoaded {
            generation,
            page,
            result,
        } = event;

        if generation != self.generation {
            tracing::debug!(
                expected = self.generation,
                got = generation,
                page,
                "Ignoring stale page result (generation mismatch)"
            );
            return PageOutcome::Stale;
        }

        self.state.loading = false;
        self.fetch_handle = None;

        match result {
            Ok(followers) => self.append_page(followers),
            Err(e) => {
                // Roll back so the retry asks for the same page.
                self.state.next_page = page;
                tracing::warn!(subject = %self.subject, page, error = %e, "Follower page fetch failed");
                self.state.error = Some(e.clone());
                PageOutcome::Failed(e)
            }
        }
    }

    fn append_page(&mut self, followers: Vec<Follower>) -> PageOutcome {
        let count = followers.len();
        if count < PAGE_SIZE {
            self.state.exhausted = true;
        }
        self.state.fetched = true;

        if count > 0 {
            Arc::make_mut(&mut self.state.items).extend(followers);
        }

        if self.state.exhausted {
            tracing::info!(
                subject = %self.subject,
                total = self.state.items.len(),
                "Follower list exhausted"
            );
        }

        PageOutcome::Appended {
            count,
            exhausted: self.state.exhausted,
        }
    }
}

impl Drop for FeedController {
    fn drop(&mut self) {
        if let Some(handle) = self.fetch_handle.take() {
            handle.abort();
        }
    }
}
