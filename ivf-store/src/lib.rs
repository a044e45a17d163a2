//! Persistence and identity for the IVF tracker.
//!
//! Each user's [`TrackerData`](ivf_core::TrackerData) lives in one JSON blob keyed
//! by user id. A [`Session`] owns the backend, the authentication directory and
//! the active user's snapshot; switching users swaps the snapshot wholesale.

mod auth;
mod backend;
mod session;
mod tracker;

pub use auth::{AuthDirectory, AuthError, User};
pub use backend::{FileStore, KeyValueStore, MemoryStore};
pub use session::Session;
pub use tracker::{LastViewedDay, TrackerStore};

use ivf_meds::MutationError;
use serde::{Deserialize, Serialize};

/// Storage keys and hashing cost.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct StoreConfig {
    pub data_key_prefix: String,
    pub auth_key: String,
    pub preferences_key_prefix: String,
    pub password_iterations: u32,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            data_key_prefix: "ivf-tracker-data".to_string(),
            auth_key: "ivf-tracker-auth".to_string(),
            preferences_key_prefix: "ivf-tracker-prefs".to_string(),
            password_iterations: 100_000,
        }
    }
}

impl StoreConfig {
    pub fn data_key(&self, user_id: &str) -> String {
        format!("{}-{user_id}", self.data_key_prefix)
    }

    pub fn preferences_key(&self, user_id: &str) -> String {
        format!("{}-{user_id}", self.preferences_key_prefix)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid JSON blob: {0}")]
    Serde(#[from] serde_json::Error),
    #[error(transparent)]
    Mutation(#[from] MutationError),
    #[error("No user is signed in")]
    NoActiveUser,
}
