use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use crate::model::Follower;

/// Quiet period after the last keystroke before a query is applied.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);

/// Longest accepted debounce. Larger values are clamped.
pub const MAX_DEBOUNCE: Duration = Duration::from_secs(10);

/// Debounced, case-insensitive filter over a follower list.
///
/// Query changes are held as pending until the debounce window passes with
/// no newer query; a newer query re-arms the window. Item changes recompute
/// immediately against the last applied query. An empty applied query shows
/// the source list itself (same `Arc`, not a copy).
///
/// The view holds no timer task. The owner polls [`tick`](Self::tick) or
/// awaits [`settle`](Self::settle), or sleeps until [`deadline`](Self::deadline)
/// alongside other events.
#[derive(Debug)]
pub struct FilterView {
    debounce: Duration,
    items: Arc<Vec<Follower>>,
    query: String,
    pending: Option<PendingQuery>,
    visible: Arc<Vec<Follower>>,
}

#[derive(Debug)]
struct PendingQuery {
    query: String,
    deadline: Instant,
}

impl FilterView {
    pub fn new(debounce: Duration) -> Self {
        if debounce > MAX_DEBOUNCE {
            tracing::warn!(
                requested_ms = debounce.as_millis() as u64,
                max_ms = MAX_DEBOUNCE.as_millis() as u64,
                "Debounce too long, clamping"
            );
        }
        let items = Arc::new(Vec::new());
        Self {
            debounce: debounce.min(MAX_DEBOUNCE),
            visible: Arc::clone(&items),
            items,
            query: String::new(),
            pending: None,
        }
    }

    /// The query currently applied to `visible_items`.
    pub fn query(&self) -> &str {
        &self.query
    }

    /// Query waiting for its debounce window to pass.
    pub fn pending_query(&self) -> Option<&str> {
        self.pending.as_ref().map(|p| p.query.as_str())
    }

    /// When the pending query becomes due, if there is one.
    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|p| p.deadline)
    }

    pub fn items(&self) -> &Arc<Vec<Follower>> {
        &self.items
    }

    pub fn visible_items(&self) -> &Arc<Vec<Follower>> {
        &self.visible
    }

    /// Record a new query and (re)start the debounce window.
    pub fn set_query(&mut self, query: impl Into<String>) {
        self.pending = Some(PendingQuery {
            query: query.into(),
            deadline: Instant::now() + self.debounce,
        });
    }

    /// Replace the source list and recompute right away with the applied
    /// query. A pending query stays pending.
    pub fn set_items(&mut self, items: Arc<Vec<Follower>>) {
        self.items = items;
        self.recompute();
    }

    /// Apply the pending query if its window has passed.
    ///
    /// Returns `true` if a query was applied.
    pub fn tick(&mut self) -> bool {
        let due = self
            .pending
            .as_ref()
            .is_some_and(|p| Instant::now() >= p.deadline);
        if !due {
            return false;
        }

        if let Some(pending) = self.pending.take() {
            self.query = pending.query;
            self.recompute();
            tracing::debug!(
                query = %self.query,
                matched = self.visible.len(),
                total = self.items.len(),
                "Filter applied"
            );
        }
        true
    }

    /// Sleep until the pending query is due and apply it.
    ///
    /// Returns `false` immediately when nothing is pending.
    pub async fn settle(&mut self) -> bool {
        match self.deadline() {
            Some(deadline) => {
                tokio::time::sleep_until(deadline).await;
                self.tick()
            }
            None => false,
        }
    }

    fn recompute(&mut self) {
        self.visible = filter_followers(&self.items, &self.query);
    }
}

impl Default for FilterView {
    fn default() -> Self {
        Self::new(DEFAULT_DEBOUNCE)
    }
}

/// Followers whose login contains `query`, ignoring case, in source order.
///
/// An empty query returns `items` itself.
pub fn filter_followers(items: &Arc<Vec<Follower>>, query: &str) -> Arc<Vec<Follower>> {
    if query.is_empty() {
        return Arc::clone(items);
    }
    let needle = query.to_lowercase();
    Arc::new(
        items
            .iter()
            .filter(|f| f.login.to_lowercase().contains(&needle))
            .cloned()
            .collect(),
    )
}
