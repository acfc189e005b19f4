use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::domain::{Collection, FeedItem, Source};
use crate::store::{Store, StoreError};

const FEED_ITEMS_FILE: &str = "feed_items.json";
const SOURCES_FILE: &str = "sources.json";
const COLLECTIONS_FILE: &str = "collections.json";
const SAVED_FOLDERS_FILE: &str = "saved_folders.json";
const METADATA_FILE: &str = "metadata.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CacheMetadata {
    last_updated: DateTime<Utc>,
}

/// JSON-document store rooted at an app-private cache directory. The
/// directory is recreated on demand, and every write goes through a
/// temp-file-then-rename so a crash mid-write cannot corrupt a document.
pub struct JsonStore {
    dir: PathBuf,
}

impl JsonStore {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|e| StoreError::CacheDir {
            path: dir.clone(),
            source: e,
        })?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn doc_path(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    async fn read_doc<T: DeserializeOwned>(&self, name: &str) -> Result<T, StoreError> {
        let path = self.doc_path(name);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(StoreError::Missing { path })
            }
            Err(e) => return Err(StoreError::Io { path, source: e }),
        };
        serde_json::from_slice(&bytes).map_err(|e| StoreError::Decode { path, source: e })
    }

    /// Missing document reads as an empty list; decode and I/O failures
    /// still surface.
    async fn read_list<T: DeserializeOwned>(&self, name: &str) -> Result<Vec<T>, StoreError> {
        match self.read_doc(name).await {
            Ok(list) => Ok(list),
            Err(StoreError::Missing { .. }) => Ok(Vec::new()),
            Err(e) => Err(e),
        }
    }

    async fn write_doc<T: Serialize>(&self, name: &str, value: &T) -> Result<(), StoreError> {
        let path = self.doc_path(name);
        let bytes = serde_json::to_vec_pretty(value).map_err(|e| StoreError::Decode {
            path: path.clone(),
            source: e,
        })?;

        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| StoreError::CacheDir {
                path: self.dir.clone(),
                source: e,
            })?;

        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &bytes)
            .await
            .map_err(|e| StoreError::Io {
                path: tmp.clone(),
                source: e,
            })?;
        if let Err(e) = tokio::fs::rename(&tmp, &path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(StoreError::Io { path, source: e });
        }
        Ok(())
    }

    async fn write_best_effort<T: Serialize>(&self, name: &str, value: &T) {
        if let Err(e) = self.write_doc(name, value).await {
            warn!(error = %e, "cache write failed");
        }
    }
}

#[async_trait]
impl Store for JsonStore {
    async fn save_feed_items(&self, items: &[FeedItem]) {
        self.write_best_effort(FEED_ITEMS_FILE, &items).await;
        let metadata = CacheMetadata {
            last_updated: Utc::now(),
        };
        self.write_best_effort(METADATA_FILE, &metadata).await;
    }

    async fn load_feed_items(&self) -> Result<Vec<FeedItem>, StoreError> {
        let mut items: Vec<FeedItem> = self.read_list(FEED_ITEMS_FILE).await?;
        let now = Utc::now();
        for item in &mut items {
            item.refresh_time_ago(now);
        }
        Ok(items)
    }

    async fn save_sources(&self, sources: &[Source]) {
        self.write_best_effort(SOURCES_FILE, &sources).await;
    }

    async fn load_sources(&self) -> Result<Vec<Source>, StoreError> {
        self.read_list(SOURCES_FILE).await
    }

    async fn save_collections(&self, collections: &[Collection]) {
        self.write_best_effort(COLLECTIONS_FILE, &collections).await;
    }

    async fn load_collections(&self) -> Result<Vec<Collection>, StoreError> {
        self.read_list(COLLECTIONS_FILE).await
    }

    async fn save_saved_folders(&self, folders: &[Collection]) {
        self.write_best_effort(SAVED_FOLDERS_FILE, &folders).await;
    }

    async fn load_saved_folders(&self) -> Result<Vec<Collection>, StoreError> {
        self.read_list(SAVED_FOLDERS_FILE).await
    }

    async fn last_updated(&self) -> Option<DateTime<Utc>> {
        self.read_doc::<CacheMetadata>(METADATA_FILE)
            .await
            .ok()
            .map(|m| m.last_updated)
    }

    async fn is_cache_valid(&self, max_age: Duration) -> bool {
        let Some(last) = self.last_updated().await else {
            return false;
        };
        let Ok(max_age) = chrono::Duration::from_std(max_age) else {
            return false;
        };
        Utc::now().signed_duration_since(last) < max_age
    }

    async fn clear_cache(&self) -> Result<(), StoreError> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
            Err(e) => {
                return Err(StoreError::Io {
                    path: self.dir.clone(),
                    source: e,
                })
            }
        };

        loop {
            let entry = entries.next_entry().await.map_err(|e| StoreError::Io {
                path: self.dir.clone(),
                source: e,
            })?;
            let Some(entry) = entry else { break };
            let path = entry.path();
            let is_dir = entry
                .file_type()
                .await
                .map(|t| t.is_dir())
                .unwrap_or(false);
            let removed = if is_dir {
                tokio::fs::remove_dir_all(&path).await
            } else {
                tokio::fs::remove_file(&path).await
            };
            if let Err(e) = removed {
                return Err(StoreError::Io { path, source: e });
            }
        }
        Ok(())
    }
}
