//! Persisted favorites.
//!
//! - `store` - the durable, deduplicated set ([`FavoriteStore`]), shared by
//!   every consumer behind an `Arc`
//! - `toggle` - favorite flag for one profile ([`FavoriteToggle`])
//! - `list` - snapshot for a favorites listing ([`FavoritesList`])

mod list;
mod store;
mod toggle;

pub use list::{FavoritesList, EMPTY_FAVORITES_MESSAGE};
pub use store::{FavoriteStore, PersistenceError, FAVORITES_KEY};
pub use toggle::{FavoriteToggle, ToggleError, ToggleEvent};
