use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::app::error::{GazetteError, Result};
use crate::assets::AssetCache;
use crate::config::Config;
use crate::fetcher::http_fetcher::HttpFetcher;
use crate::fetcher::parallel::ParallelFetcher;
use crate::fetcher::Fetcher;
use crate::store::JsonStore;
use crate::sync::SyncEngine;

/// Composition root: constructs and owns every component. Nothing in the
/// crate reaches for global state; consumers receive their dependencies
/// from here.
pub struct AppContext {
    pub config: Config,
    pub store: Arc<JsonStore>,
    pub assets: AssetCache,
    pub engine: SyncEngine,
}

impl AppContext {
    pub fn new(config: Config) -> Result<Self> {
        let cache_dir = Self::default_cache_dir()?;
        Self::with_cache_dir(config, cache_dir)
    }

    pub fn with_cache_dir(config: Config, cache_dir: PathBuf) -> Result<Self> {
        let store = Arc::new(JsonStore::new(&cache_dir)?);

        let fetcher: Arc<dyn Fetcher + Send + Sync> = Arc::new(HttpFetcher::with_options(
            Duration::from_secs(config.fetch.timeout_secs),
            &config.fetch.user_agent,
        ));
        let parallel = ParallelFetcher::with_workers(fetcher.clone(), config.fetch.workers);

        let assets = AssetCache::with_capacity(
            fetcher.clone(),
            cache_dir.join("assets"),
            config.cache.memory_entries,
        );

        let engine = SyncEngine::with_tuning(
            store.clone(),
            parallel,
            assets.clone(),
            Duration::from_secs(config.sync.freshness_window_secs),
            config.sync.preload_limit,
        );

        Ok(Self {
            config,
            store,
            assets,
            engine,
        })
    }

    fn default_cache_dir() -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| GazetteError::Other("Could not find cache directory".into()))?;
        Ok(cache_dir.join("gazette"))
    }
}
