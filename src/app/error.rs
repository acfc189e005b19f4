use thiserror::Error;

use crate::config::ConfigError;
use crate::store::StoreError;

#[derive(Error, Debug)]
pub enum GazetteError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Cache error: {0}")]
    Store(#[from] StoreError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Source not found: {0}")]
    SourceNotFound(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, GazetteError>;
