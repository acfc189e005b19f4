use std::collections::{HashMap, VecDeque};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use bytes::Bytes;
use futures::stream::{self, StreamExt};
use sha2::{Digest, Sha256};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::domain::FeedItem;
use crate::fetcher::Fetcher;

pub const MEMORY_CAPACITY: usize = 100;
pub const PRELOAD_CONCURRENCY: usize = 4;

/// Two-tier image cache keyed by URL: a bounded in-memory tier with
/// recency eviction in front of a content-addressed disk tier. A miss in
/// both tiers goes to the network; any failure along the way degrades to
/// "no image" rather than an error.
#[derive(Clone)]
pub struct AssetCache {
    fetcher: Arc<dyn Fetcher + Send + Sync>,
    memory: Arc<Mutex<MemoryTier>>,
    dir: PathBuf,
}

struct MemoryTier {
    entries: HashMap<String, Bytes>,
    order: VecDeque<String>,
    capacity: usize,
}

impl MemoryTier {
    fn new(capacity: usize) -> Self {
        Self {
            entries: HashMap::new(),
            order: VecDeque::new(),
            capacity: capacity.max(1),
        }
    }

    fn get(&mut self, key: &str) -> Option<Bytes> {
        let value = self.entries.get(key).cloned()?;
        self.touch(key);
        Some(value)
    }

    fn touch(&mut self, key: &str) {
        if let Some(pos) = self.order.iter().position(|k| k == key) {
            if let Some(key) = self.order.remove(pos) {
                self.order.push_back(key);
            }
        }
    }

    fn insert(&mut self, key: String, value: Bytes) {
        if self.entries.contains_key(&key) {
            self.entries.insert(key.clone(), value);
            self.touch(&key);
            return;
        }
        while self.entries.len() >= self.capacity {
            match self.order.pop_front() {
                Some(oldest) => {
                    self.entries.remove(&oldest);
                }
                None => break,
            }
        }
        self.order.push_back(key.clone());
        self.entries.insert(key, value);
    }

    fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }
}

impl AssetCache {
    pub fn new(fetcher: Arc<dyn Fetcher + Send + Sync>, dir: impl Into<PathBuf>) -> Self {
        Self::with_capacity(fetcher, dir, MEMORY_CAPACITY)
    }

    pub fn with_capacity(
        fetcher: Arc<dyn Fetcher + Send + Sync>,
        dir: impl Into<PathBuf>,
        capacity: usize,
    ) -> Self {
        Self {
            fetcher,
            memory: Arc::new(Mutex::new(MemoryTier::new(capacity))),
            dir: dir.into(),
        }
    }

    /// Deterministic, filesystem-safe name for a cached asset.
    fn cache_key(url: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(url.as_bytes());
        hex::encode(hasher.finalize())
    }

    fn disk_path(&self, key: &str) -> PathBuf {
        self.dir.join(key)
    }

    /// Memory, then disk (promoting the hit), then network with
    /// write-through. `None` means "no image"; callers treat that as
    /// normal.
    pub async fn get(&self, url: &str) -> Option<Bytes> {
        let key = Self::cache_key(url);

        if let Some(bytes) = self.memory.lock().await.get(&key) {
            return Some(bytes);
        }

        let path = self.disk_path(&key);
        if let Ok(bytes) = tokio::fs::read(&path).await {
            let bytes = Bytes::from(bytes);
            self.memory.lock().await.insert(key, bytes.clone());
            return Some(bytes);
        }

        match self.fetcher.fetch(url).await {
            Ok(bytes) => {
                self.store_to_disk(&path, &bytes).await;
                self.memory.lock().await.insert(key, bytes.clone());
                Some(bytes)
            }
            Err(e) => {
                debug!(url, error = %e, "asset fetch failed");
                None
            }
        }
    }

    async fn store_to_disk(&self, path: &Path, bytes: &Bytes) {
        if let Err(e) = self.try_store_to_disk(path, bytes).await {
            warn!(path = %path.display(), error = %e, "failed to cache asset on disk");
        }
    }

    async fn try_store_to_disk(&self, path: &Path, bytes: &Bytes) -> std::io::Result<()> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let tmp = path.with_extension("tmp");
        tokio::fs::write(&tmp, bytes).await?;
        if let Err(e) = tokio::fs::rename(&tmp, path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e);
        }
        Ok(())
    }

    /// Warm both tiers for the first `limit` items' lead images and source
    /// logos so the initial render paints instantly. Bounded fan-out;
    /// failures are silent.
    pub async fn preload(&self, items: &[FeedItem], limit: usize) {
        let mut urls: Vec<String> = Vec::new();
        for item in items.iter().take(limit) {
            if let Some(url) = &item.image_url {
                urls.push(url.clone());
            }
            if !item.source_logo.is_empty() {
                urls.push(item.source_logo.clone());
            }
        }
        urls.sort();
        urls.dedup();

        stream::iter(urls)
            .for_each_concurrent(PRELOAD_CONCURRENCY, |url| async move {
                let _ = self.get(&url).await;
            })
            .await;
    }

    /// Wipe both tiers.
    pub async fn clear(&self) -> std::io::Result<()> {
        self.memory.lock().await.clear();
        match tokio::fs::remove_dir_all(&self.dir).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// Total bytes held by the disk tier, for cache-management display.
    pub async fn size(&self) -> u64 {
        let mut total = 0;
        let Ok(mut entries) = tokio::fs::read_dir(&self.dir).await else {
            return 0;
        };
        while let Ok(Some(entry)) = entries.next_entry().await {
            if let Ok(metadata) = entry.metadata().await {
                total += metadata.len();
            }
        }
        total
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::GazetteError;
    use crate::domain::{RawItem, Source};
    use async_trait::async_trait;
    use chrono::Utc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::tempdir;

    struct CountingFetcher {
        calls: AtomicUsize,
        fail: bool,
    }

    impl CountingFetcher {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail: false,
            }
        }

        fn failing() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail: true,
            }
        }
    }

    #[async_trait]
    impl Fetcher for CountingFetcher {
        async fn fetch(&self, url: &str) -> crate::app::Result<Bytes> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(GazetteError::Other(format!("unreachable: {url}")))
            } else {
                Ok(Bytes::from(format!("payload:{url}")))
            }
        }
    }

    #[tokio::test]
    async fn test_second_get_never_hits_network() {
        let dir = tempdir().unwrap();
        let fetcher = Arc::new(CountingFetcher::new());
        let cache = AssetCache::new(fetcher.clone(), dir.path().join("assets"));

        let first = cache.get("https://img.example/a.png").await.unwrap();
        let second = cache.get("https://img.example/a.png").await.unwrap();

        assert_eq!(first, second);
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_disk_hit_survives_memory_eviction() {
        let dir = tempdir().unwrap();
        let fetcher = Arc::new(CountingFetcher::new());
        let cache = AssetCache::with_capacity(fetcher.clone(), dir.path().join("assets"), 1);

        cache.get("https://img.example/a.png").await.unwrap();
        // evicts a.png from the single-slot memory tier
        cache.get("https://img.example/b.png").await.unwrap();
        cache.get("https://img.example/a.png").await.unwrap();

        // the third call is served from disk, not the network
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_fetch_failure_means_no_image() {
        let dir = tempdir().unwrap();
        let cache = AssetCache::new(Arc::new(CountingFetcher::failing()), dir.path().join("assets"));
        assert!(cache.get("https://img.example/a.png").await.is_none());
    }

    #[tokio::test]
    async fn test_memory_tier_recency_eviction() {
        let mut tier = MemoryTier::new(2);
        tier.insert("a".into(), Bytes::from_static(b"1"));
        tier.insert("b".into(), Bytes::from_static(b"2"));
        // touch "a" so "b" becomes the eviction candidate
        tier.get("a");
        tier.insert("c".into(), Bytes::from_static(b"3"));

        assert!(tier.get("a").is_some());
        assert!(tier.get("b").is_none());
        assert!(tier.get("c").is_some());
    }

    #[tokio::test]
    async fn test_preload_respects_limit() {
        let dir = tempdir().unwrap();
        let fetcher = Arc::new(CountingFetcher::new());
        let cache = AssetCache::new(fetcher.clone(), dir.path().join("assets"));

        let source = Source::new("Wire", "https://wire.example/feed");
        let items: Vec<FeedItem> = (0..5)
            .map(|i| {
                FeedItem::from_raw(
                    &source,
                    RawItem {
                        title: format!("story {i}"),
                        image_url: Some(format!("https://img.example/{i}.png")),
                        ..Default::default()
                    },
                    Utc::now(),
                )
            })
            .collect();

        cache.preload(&items, 2).await;
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_clear_and_size() {
        let dir = tempdir().unwrap();
        let fetcher = Arc::new(CountingFetcher::new());
        let cache = AssetCache::new(fetcher.clone(), dir.path().join("assets"));

        assert_eq!(cache.size().await, 0);
        cache.get("https://img.example/a.png").await.unwrap();
        assert!(cache.size().await > 0);

        cache.clear().await.unwrap();
        assert_eq!(cache.size().await, 0);

        // cleared on disk too, so the next get re-fetches
        cache.get("https://img.example/a.png").await.unwrap();
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 2);
    }
}
