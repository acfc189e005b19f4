use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{watch, Mutex};
use tracing::{info, warn};

use crate::assets::AssetCache;
use crate::domain::{format_relative, FeedFilter, FeedItem};
use crate::fetcher::parallel::ParallelFetcher;
use crate::merge;
use crate::store::{Store, StoreError};

/// Minimum age before a non-forced sync refetches.
pub const FRESHNESS_WINDOW: Duration = Duration::from_secs(300);

/// How many leading articles get their images prefetched after a sync.
pub const PRELOAD_LIMIT: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedState {
    Empty,
    Loading,
    Ready(DataOrigin),
    Error(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataOrigin {
    Network,
    Cache,
}

/// Immutable view of the engine, published on every state transition.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub state: FeedState,
    pub items: Vec<FeedItem>,
    pub last_synced: Option<DateTime<Utc>>,
    pub online: bool,
}

impl Snapshot {
    fn initial() -> Self {
        Self {
            state: FeedState::Empty,
            items: Vec::new(),
            last_synced: None,
            online: true,
        }
    }
}

/// The single entry point over fetching, merging, persistence, and asset
/// prefetch. Owns the only mutable copy of the current feed; everything
/// handed out is a clone.
pub struct SyncEngine {
    store: Arc<dyn Store + Send + Sync>,
    fetcher: ParallelFetcher,
    assets: AssetCache,
    freshness_window: Duration,
    preload_limit: usize,
    inner: Mutex<Snapshot>,
    publisher: watch::Sender<Snapshot>,
}

impl SyncEngine {
    pub fn new(
        store: Arc<dyn Store + Send + Sync>,
        fetcher: ParallelFetcher,
        assets: AssetCache,
    ) -> Self {
        Self::with_tuning(store, fetcher, assets, FRESHNESS_WINDOW, PRELOAD_LIMIT)
    }

    pub fn with_tuning(
        store: Arc<dyn Store + Send + Sync>,
        fetcher: ParallelFetcher,
        assets: AssetCache,
        freshness_window: Duration,
        preload_limit: usize,
    ) -> Self {
        let (publisher, _) = watch::channel(Snapshot::initial());
        Self {
            store,
            fetcher,
            assets,
            freshness_window,
            preload_limit,
            inner: Mutex::new(Snapshot::initial()),
            publisher,
        }
    }

    /// Watch the stream of snapshots. The current snapshot is available
    /// immediately.
    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.publisher.subscribe()
    }

    pub async fn snapshot(&self) -> Snapshot {
        self.inner.lock().await.clone()
    }

    fn publish(&self, snapshot: &Snapshot) {
        self.publisher.send_replace(snapshot.clone());
    }

    /// Cold-start path: surface whatever the durable store has, as fast as
    /// possible and independent of connectivity. A fresher snapshot that
    /// arrived in the meantime is never clobbered.
    pub async fn load_cached_snapshot(&self) {
        let items = match self.store.load_feed_items().await {
            Ok(items) => items,
            Err(e) => {
                warn!(error = %e, "feed cache unreadable, starting empty");
                Vec::new()
            }
        };
        if items.is_empty() {
            return;
        }
        let last = self.store.last_updated().await;

        let mut inner = self.inner.lock().await;
        if inner.state == FeedState::Empty {
            inner.items = items;
            inner.last_synced = last;
            inner.state = FeedState::Ready(DataOrigin::Cache);
            self.publish(&inner);
        }
    }

    /// Refresh the feed. At most one sync is in flight: a call that
    /// observes `Loading` returns it unchanged and does no work. A
    /// non-forced call with a fresh, non-empty snapshot is a no-op.
    pub async fn sync(&self, force: bool) -> FeedState {
        let online = {
            let mut inner = self.inner.lock().await;
            if inner.state == FeedState::Loading {
                return FeedState::Loading;
            }
            if !force && !inner.items.is_empty() && self.is_fresh(inner.last_synced) {
                return inner.state.clone();
            }
            inner.state = FeedState::Loading;
            self.publish(&inner);
            inner.online
        };

        if !online {
            info!("offline, serving from durable store");
            return self.load_from_store().await;
        }

        let sources = match self.store.load_sources().await {
            Ok(sources) => sources,
            Err(e) => {
                warn!(error = %e, "source configuration unreadable");
                Vec::new()
            }
        };

        let batches = self.fetcher.fetch_sources(sources).await;
        let merged = merge::merge(batches, Utc::now());

        if merged.is_empty() {
            info!("no source produced articles, falling back to cached feed");
            return self.load_from_store().await;
        }

        // persist only after a complete merge; a cancelled sync leaves the
        // previous cache intact
        self.store.save_feed_items(&merged).await;

        let preload: Vec<FeedItem> = merged.iter().take(self.preload_limit).cloned().collect();
        let assets = self.assets.clone();
        let limit = self.preload_limit;
        tokio::spawn(async move {
            assets.preload(&preload, limit).await;
        });

        let mut inner = self.inner.lock().await;
        inner.items = merged;
        inner.last_synced = Some(Utc::now());
        inner.state = FeedState::Ready(DataOrigin::Network);
        self.publish(&inner);
        inner.state.clone()
    }

    fn is_fresh(&self, last_synced: Option<DateTime<Utc>>) -> bool {
        let Some(last) = last_synced else {
            return false;
        };
        let Ok(window) = chrono::Duration::from_std(self.freshness_window) else {
            return false;
        };
        Utc::now().signed_duration_since(last) < window
    }

    /// Serve the durable store. Ends in `Ready(Cache)` when anything is
    /// available, otherwise in the one user-facing error state: nothing to
    /// show anywhere.
    async fn load_from_store(&self) -> FeedState {
        let items = match self.store.load_feed_items().await {
            Ok(items) => items,
            Err(e) => {
                warn!(error = %e, "feed cache unreadable");
                Vec::new()
            }
        };
        let last = self.store.last_updated().await;

        let mut inner = self.inner.lock().await;
        if !items.is_empty() {
            inner.items = items;
            inner.last_synced = last;
            inner.state = FeedState::Ready(DataOrigin::Cache);
        } else if !inner.items.is_empty() {
            // disk cache is gone but the in-memory feed still has articles
            inner.state = FeedState::Ready(DataOrigin::Cache);
        } else {
            inner.state =
                FeedState::Error("no articles available, either from the network or cached".into());
        }
        self.publish(&inner);
        inner.state.clone()
    }

    /// Connectivity edge from an external monitor. Coming back online with
    /// an empty feed triggers an immediate forced sync.
    pub async fn set_online(&self, online: bool) {
        let trigger = {
            let mut inner = self.inner.lock().await;
            if inner.online == online {
                return;
            }
            inner.online = online;
            self.publish(&inner);
            online && inner.items.is_empty()
        };
        if trigger {
            self.sync(true).await;
        }
    }

    /// Featured article plus the remaining list for a facet selection.
    /// `(None, [])` when nothing matches. Never mutates the feed.
    pub async fn filtered(&self, filter: &FeedFilter) -> (Option<FeedItem>, Vec<FeedItem>) {
        let inner = self.inner.lock().await;
        let mut matching = inner.items.iter().filter(|item| filter.matches(item)).cloned();
        let featured = matching.next();
        (featured, matching.collect())
    }

    /// Pagination hook. The merged feed is fully resident, so there is
    /// never a further page; repeated calls are safe.
    pub async fn load_more(&self) -> bool {
        false
    }

    /// Present only while serving cached articles without connectivity.
    pub async fn status_message(&self) -> Option<String> {
        let inner = self.inner.lock().await;
        if inner.online || inner.state != FeedState::Ready(DataOrigin::Cache) {
            return None;
        }
        let age = match inner.last_synced {
            Some(ts) => format_relative(Some(ts), Utc::now()),
            None => "earlier".to_string(),
        };
        Some(format!("Offline, showing cached articles as of {age}"))
    }

    /// Drop everything: durable documents, both asset tiers, and the
    /// in-memory feed.
    pub async fn clear_cache(&self) -> Result<(), StoreError> {
        self.store.clear_cache().await?;
        if let Err(e) = self.assets.clear().await {
            warn!(error = %e, "failed to clear asset cache");
        }
        let mut inner = self.inner.lock().await;
        inner.items.clear();
        inner.last_synced = None;
        inner.state = FeedState::Empty;
        self.publish(&inner);
        Ok(())
    }
}
