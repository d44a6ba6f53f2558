//! Incremental follower feed with debounced filtering and a persisted
//! favorites set.
//!
//! - [`feed`] - paginated follower list and its filter
//! - [`favorites`] - deduplicated favorites store, toggle, and listing
//! - [`profile`] - profile detail loader
//! - [`remote`] - the fetch capability and its GitHub implementation
//! - [`storage`] - blob persistence (SQLite or in-memory)

pub mod config;
pub mod favorites;
pub mod feed;
pub mod model;
pub mod profile;
pub mod remote;
pub mod storage;
pub mod util;
