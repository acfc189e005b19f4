pub mod http_fetcher;
pub mod parallel;

use async_trait::async_trait;
use bytes::Bytes;

use crate::app::Result;

#[async_trait]
pub trait Fetcher {
    async fn fetch(&self, url: &str) -> Result<Bytes>;
}
