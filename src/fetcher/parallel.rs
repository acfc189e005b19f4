use std::sync::Arc;

use tokio::sync::Semaphore;

use crate::domain::{RawItem, Source};
use crate::fetcher::Fetcher;
use crate::normalizer::Normalizer;

pub const DEFAULT_WORKERS: usize = 8;

/// Fetches every enabled source concurrently, one task per source behind a
/// semaphore. A failing source is logged and contributes nothing; the
/// others are unaffected.
pub struct ParallelFetcher {
    fetcher: Arc<dyn Fetcher + Send + Sync>,
    normalizer: Normalizer,
    semaphore: Arc<Semaphore>,
}

impl ParallelFetcher {
    pub fn new(fetcher: Arc<dyn Fetcher + Send + Sync>) -> Self {
        Self::with_workers(fetcher, DEFAULT_WORKERS)
    }

    pub fn with_workers(fetcher: Arc<dyn Fetcher + Send + Sync>, workers: usize) -> Self {
        Self {
            fetcher,
            normalizer: Normalizer::new(),
            semaphore: Arc::new(Semaphore::new(workers)),
        }
    }

    /// Returns the batches of sources that produced a payload. An empty
    /// result means every source failed; the caller decides what that
    /// implies.
    pub async fn fetch_sources(&self, sources: Vec<Source>) -> Vec<(Source, Vec<RawItem>)> {
        let mut handles = Vec::new();

        for source in sources.into_iter().filter(|s| s.is_enabled) {
            let fetcher = self.fetcher.clone();
            let semaphore = self.semaphore.clone();
            let normalizer = self.normalizer.clone();

            handles.push(tokio::spawn(async move {
                let _permit = semaphore.acquire().await.expect("Semaphore closed");

                match fetcher.fetch(&source.url).await {
                    Ok(body) => {
                        let items = normalizer.normalize(&body);
                        tracing::debug!(
                            source = %source.name,
                            count = items.len(),
                            "fetched source"
                        );
                        Some((source, items))
                    }
                    Err(e) => {
                        tracing::warn!(source = %source.name, error = %e, "failed to fetch source");
                        None
                    }
                }
            }));
        }

        let mut batches = Vec::new();
        for handle in handles {
            match handle.await {
                Ok(Some(batch)) => batches.push(batch),
                Ok(None) => {}
                Err(e) => {
                    tracing::error!("Task join error: {}", e);
                }
            }
        }

        batches
    }
}
