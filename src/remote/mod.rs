//! Remote follower-collection access.
//!
//! The feed and profile controllers depend only on the [`RemoteCollection`]
//! trait. [`GithubClient`] implements it over the GitHub REST API with
//! `reqwest`.
//!
//! # Page contract
//!
//! Pages are 1-based and hold at most [`PAGE_SIZE`] followers. A page
//! shorter than [`PAGE_SIZE`] is the only end-of-data signal.

mod github;

pub use github::GithubClient;

use crate::model::{Follower, UserProfile};
use async_trait::async_trait;
use thiserror::Error;

/// Fixed number of followers per page requested from the remote source.
pub const PAGE_SIZE: usize = 100;

/// Errors surfaced by a [`RemoteCollection`].
///
/// `Clone` so the last failure can be kept on controller state.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    /// Connection, TLS, timeout, or unexpected HTTP status
    #[error("Unable to complete request: {0}")]
    Network(String),
    /// Remote API quota exhausted
    #[error("Rate limited by the server. Please try again later.")]
    RateLimited,
    /// Subject does not exist
    #[error("User not found")]
    NotFound,
    /// Response body could not be decoded
    #[error("Invalid data received from the server: {0}")]
    Decode(String),
}

/// Capability that fetches follower pages and profile details for a subject.
#[async_trait]
pub trait RemoteCollection: Send + Sync {
    /// Fetch one page (1-based) of the subject's followers.
    async fn fetch_page(&self, subject: &str, page: u32) -> Result<Vec<Follower>, TransportError>;

    /// Fetch the subject's profile detail.
    async fn fetch_detail(&self, subject: &str) -> Result<UserProfile, TransportError>;
}
