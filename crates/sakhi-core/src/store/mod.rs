//! Remote and local store layer.
//!
//! The remote store is a Supabase PostgREST backend; the local store is a
//! per-profile JSON fallback used whenever the remote side is unconfigured
//! or rejects a write with a known schema error. Fallback decisions are made
//! on structured error kinds, never by inspecting error message text.

mod activity;
mod crop;
mod local;
mod profile;
mod remote;

use thiserror::Error;

pub use activity::{ActivityStore, SyncReport};
pub use crop::CropStore;
pub use local::{JsonFileStore, LocalStore, MemoryStore, LEGACY_ACTIVITIES_KEY};
pub use profile::ProfileStore;
pub use remote::{ActivityApi, CropApi, ProfileApi, SupabaseRest};

/// Result type alias for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors from the store layer, classified by kind.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Remote store unreachable by design; always triggers fallback.
    #[error("Remote store is not configured")]
    NotConfigured,

    /// A lookup legitimately found no record.
    #[error("Record not found")]
    NotFound,

    /// Known schema/validation mismatch reported by the remote store;
    /// fallback-eligible for writes.
    #[error("Remote schema error: {0}")]
    Schema(String),

    /// Remote store reachable but the request failed; surfaced to the caller.
    #[error("Store API error: {0}")]
    Api(String),

    /// Transport failure.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Payload (de)serialization failure.
    #[error("Failed to parse JSON payload: {0}")]
    Json(#[from] serde_json::Error),

    /// Local fallback storage failure.
    #[error("Local storage error: {0}")]
    Local(String),
}

impl StoreError {
    /// Whether a failed remote write may fall back to local storage.
    ///
    /// Only missing configuration and known schema mismatches qualify;
    /// everything else surfaces to the caller.
    #[must_use]
    pub const fn is_fallback_eligible(&self) -> bool {
        matches!(self, Self::NotConfigured | Self::Schema(_))
    }
}
