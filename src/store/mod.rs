pub mod json;

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::domain::{Collection, FeedItem, Source};

pub use json::JsonStore;

/// Read failures carry enough shape for the caller to decide whether
/// "empty" or "broken" is the right interpretation. A missing file is
/// legitimate empty state and is already absorbed by the load methods;
/// the other variants are real failures.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("cache directory unavailable at {path}: {source}")]
    CacheDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("cache file not found: {path}")]
    Missing { path: PathBuf },

    #[error("failed to decode {path}: {source}")]
    Decode {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("cache I/O failed at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Disk persistence, one JSON document per logical dataset.
///
/// Saves are best-effort: a write failure is logged and swallowed, since
/// failing to cache must never block showing already-fetched data.
#[async_trait]
pub trait Store {
    /// Overwrite the feed-items document and stamp the cache metadata.
    async fn save_feed_items(&self, items: &[FeedItem]);

    /// Missing file yields an empty list. Each item's relative-time label
    /// is recomputed against the current clock.
    async fn load_feed_items(&self) -> Result<Vec<FeedItem>, StoreError>;

    async fn save_sources(&self, sources: &[Source]);
    async fn load_sources(&self) -> Result<Vec<Source>, StoreError>;

    async fn save_collections(&self, collections: &[Collection]);
    async fn load_collections(&self) -> Result<Vec<Collection>, StoreError>;

    async fn save_saved_folders(&self, folders: &[Collection]);
    async fn load_saved_folders(&self) -> Result<Vec<Collection>, StoreError>;

    /// Timestamp of the last successful feed-items save, if any.
    async fn last_updated(&self) -> Option<DateTime<Utc>>;

    /// True iff the last save is younger than `max_age`.
    async fn is_cache_valid(&self, max_age: Duration) -> bool;

    /// Delete every file in the cache directory. Succeeds when the
    /// directory is already empty or missing.
    async fn clear_cache(&self) -> Result<(), StoreError>;
}
