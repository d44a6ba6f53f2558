use std::sync::Arc;

use super::controller::{FeedController, PageOutcome};
use super::filter::FilterView;
use crate::model::Follower;

/// Something that changed the browser's visible list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BrowserUpdate {
    /// A page fetch reported back
    Page(PageOutcome),
    /// A debounced query was applied
    Filtered,
}

/// Follower list screen state: a paginated feed with a debounced filter on
/// top.
///
/// Owns both halves and keeps them in step. Every appended page is pushed
/// into the filter at once; query changes wait for the debounce window.
pub struct FollowerBrowser {
    feed: FeedController,
    filter: FilterView,
}

impl FollowerBrowser {
    pub fn new(feed: FeedController, mut filter: FilterView) -> Self {
        filter.set_items(Arc::clone(feed.items()));
        Self { feed, filter }
    }

    pub fn feed(&self) -> &FeedController {
        &self.feed
    }

    pub fn filter(&self) -> &FilterView {
        &self.filter
    }

    /// List to display: the filtered view of everything loaded so far.
    pub fn visible_items(&self) -> &Arc<Vec<Follower>> {
        self.filter.visible_items()
    }

    pub fn set_query(&mut self, query: impl Into<String>) {
        self.filter.set_query(query);
    }

    /// Prefetch when `observed` is near the end of the loaded list.
    pub fn load_more_if_needed(&mut self, observed: &Follower) -> bool {
        self.feed.load_more_if_needed(observed)
    }

    pub fn request_next_page(&mut self) -> bool {
        self.feed.request_next_page()
    }

    /// Point the browser at a different subject and fetch its first page.
    pub fn set_subject(&mut self, subject: impl Into<String>) {
        self.feed.set_subject(subject);
        self.filter.set_items(Arc::clone(self.feed.items()));
        self.feed.request_next_page();
    }

    /// Wait for the next page result or debounce deadline, whichever comes
    /// first, and apply it.
    ///
    /// Returns `None` when no page is in flight and no query is pending.
    pub async fn next_update(&mut self) -> Option<BrowserUpdate> {
        let deadline = self.filter.deadline();
        if deadline.is_none() && !self.feed.state().loading {
            return None;
        }
        let sleep_target = deadline.unwrap_or_else(tokio::time::Instant::now);

        tokio::select! {
            Some(event) = self.feed.next_event() => {
                let outcome = self.feed.handle_event(event);
                if matches!(outcome, PageOutcome::Appended { .. }) {
                    self.filter.set_items(Arc::clone(self.feed.items()));
                }
                Some(BrowserUpdate::Page(outcome))
            }
            _ = tokio::time::sleep_until(sleep_target), if deadline.is_some() => {
                self.filter.tick();
                Some(BrowserUpdate::Filtered)
            }
            else => None,
        }
    }

    /// Apply updates until nothing is in flight or pending.
    pub async fn run_until_idle(&mut self) {
        while let Some(update) = self.next_update().await {
            tracing::trace!(?update, "Browser update");
        }
    }
}
