use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::domain::Source;

/// Maximum number of tags carried by an article.
pub const MAX_TAGS: usize = 3;

/// Tag applied when a feed entry carries no categories.
pub const DEFAULT_TAG: &str = "News";

/// Parser output for a single feed entry. Exists only during one fetch
/// cycle; the merge pipeline turns it into a [`FeedItem`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawItem {
    pub title: String,
    pub description: String,
    pub link: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub author: Option<String>,
    pub categories: Vec<String>,
    pub image_url: Option<String>,
}

/// The durable, reader-facing article record.
///
/// `time_ago` is derived from `published_at` and is never persisted; it is
/// recomputed against the current clock every time items are loaded.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeedItem {
    pub id: String,
    pub title: String,
    pub source_name: String,
    pub source_logo: String,
    pub accent_color: String,
    pub author: Option<String>,
    pub tags: Vec<String>,
    pub image_url: Option<String>,
    pub article_url: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    #[serde(skip)]
    pub time_ago: String,
}

impl FeedItem {
    pub fn from_raw(source: &Source, raw: RawItem, now: DateTime<Utc>) -> Self {
        let id = match raw.link.as_deref() {
            Some(link) if !link.is_empty() => link.to_string(),
            _ => Self::generate_id(&source.url, &raw.title),
        };

        let mut tags: Vec<String> = raw
            .categories
            .into_iter()
            .filter(|c| !c.trim().is_empty())
            .take(MAX_TAGS)
            .collect();
        if tags.is_empty() {
            tags.push(DEFAULT_TAG.to_string());
        }

        let mut item = Self {
            id,
            title: raw.title,
            source_name: source.name.clone(),
            source_logo: source.logo_url.clone(),
            accent_color: source.color_hex.clone(),
            author: raw.author,
            tags,
            image_url: raw.image_url,
            article_url: raw.link,
            published_at: raw.published_at,
            time_ago: String::new(),
        };
        item.refresh_time_ago(now);
        item
    }

    /// Generate a deterministic fallback ID for entries without a link.
    pub fn generate_id(source_url: &str, title: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(source_url.as_bytes());
        hasher.update(title.trim().to_lowercase().as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Title key used for cross-source duplicate detection.
    pub fn normalized_title(&self) -> String {
        self.title.trim().to_lowercase()
    }

    pub fn refresh_time_ago(&mut self, now: DateTime<Utc>) {
        self.time_ago = format_relative(self.published_at, now);
    }

    pub fn display_title(&self) -> &str {
        if self.title.is_empty() {
            "(Untitled)"
        } else {
            &self.title
        }
    }
}

/// Render a timestamp relative to `now` ("just now", "5m ago", "3h ago").
/// Dates older than a week fall back to an absolute date; a missing
/// timestamp renders as an empty string.
pub fn format_relative(ts: Option<DateTime<Utc>>, now: DateTime<Utc>) -> String {
    let Some(ts) = ts else {
        return String::new();
    };

    let delta = now.signed_duration_since(ts);
    if delta.num_seconds() < 60 {
        "just now".to_string()
    } else if delta.num_minutes() < 60 {
        format!("{}m ago", delta.num_minutes())
    } else if delta.num_hours() < 24 {
        format!("{}h ago", delta.num_hours())
    } else if delta.num_days() < 7 {
        format!("{}d ago", delta.num_days())
    } else {
        ts.format("%b %-d, %Y").to_string()
    }
}
