//! Paginated follower feeds.
//!
//! - `controller` - sequential page fetching into a growing list
//!   ([`FeedController`]), with prefetch near the end of the list
//! - `filter` - debounced substring filter over the loaded list
//!   ([`FilterView`])
//! - `browser` - both of the above wired together for one screen
//!   ([`FollowerBrowser`])
//!
//! # Example
//!
//! ```ignore
//! use followfeed::feed::{FeedController, FilterView, FollowerBrowser};
//!
//! let feed = FeedController::new("octocat", remote);
//! let mut browser = FollowerBrowser::new(feed, FilterView::default());
//! browser.set_query("oct");
//! browser.run_until_idle().await;
//! ```

mod browser;
mod controller;
mod filter;

pub use browser::{BrowserUpdate, FollowerBrowser};
pub use controller::{
    FeedController, FeedEvent, FeedPhase, FeedState, PageOutcome, DEFAULT_PREFETCH_THRESHOLD,
    EMPTY_FEED_MESSAGE,
};
pub use filter::{filter_followers, FilterView, DEFAULT_DEBOUNCE, MAX_DEBOUNCE};
