//! Domain records shared by the feed, profile, and favorites layers.
//!
//! [`Follower`] is the compact identity record that appears in paginated
//! follower lists and in the persisted favorites set. [`UserProfile`] is the
//! richer detail projection of the same account.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};

// ============================================================================
// Follower
// ============================================================================

/// Summary record for one account in a follower list.
///
/// Equality and hashing are defined by `id` alone: two records with the same
/// `id` are the same follower even if the login or avatar changed upstream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Follower {
    pub login: String,
    pub id: u64,
    pub avatar_url: String,
    /// Profile link. Older favorites blobs may lack it.
    #[serde(default)]
    pub url: String,
}

impl PartialEq for Follower {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Follower {}

impl Hash for Follower {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

// ============================================================================
// UserProfile
// ============================================================================

/// Detail record for a single account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub login: String,
    pub id: u64,
    pub avatar_url: String,
    pub name: Option<String>,
    pub location: Option<String>,
    pub bio: Option<String>,
    pub public_repos: u32,
    pub public_gists: u32,
    pub html_url: String,
    pub following: u32,
    pub followers: u32,
    pub created_at: DateTime<Utc>,
}

impl From<&UserProfile> for Follower {
    fn from(profile: &UserProfile) -> Self {
        Follower {
            login: profile.login.clone(),
            id: profile.id,
            avatar_url: profile.avatar_url.clone(),
            url: profile.html_url.clone(),
        }
    }
}

// ============================================================================
// Favorite lookup key
// ============================================================================

/// Key used to look up or remove a favorite.
///
/// `Id` is the identity key. `Login` exists for callers that only know the
/// username (e.g. a profile screen that has not loaded its detail yet).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FavoriteKey {
    Id(u64),
    Login(String),
}

impl FavoriteKey {
    pub fn matches(&self, follower: &Follower) -> bool {
        match self {
            FavoriteKey::Id(id) => follower.id == *id,
            FavoriteKey::Login(login) => follower.login == *login,
        }
    }
}

impl From<u64> for FavoriteKey {
    fn from(id: u64) -> Self {
        FavoriteKey::Id(id)
    }
}

impl From<&str> for FavoriteKey {
    fn from(login: &str) -> Self {
        FavoriteKey::Login(login.to_string())
    }
}

impl From<&Follower> for FavoriteKey {
    fn from(follower: &Follower) -> Self {
        FavoriteKey::Id(follower.id)
    }
}
