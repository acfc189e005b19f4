use serde::{Deserialize, Serialize};

use crate::domain::FeedItem;

/// Facet selection applied to the merged feed. Empty facets match
/// everything; within a facet any value may match, across facets all
/// selected facets must match.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct FeedFilter {
    #[serde(default)]
    pub sources: Vec<String>,
    #[serde(default)]
    pub authors: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl FeedFilter {
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty() && self.authors.is_empty() && self.tags.is_empty()
    }

    pub fn matches(&self, item: &FeedItem) -> bool {
        let source_ok =
            self.sources.is_empty() || self.sources.iter().any(|s| *s == item.source_name);
        let author_ok = self.authors.is_empty()
            || item
                .author
                .as_deref()
                .map(|a| self.authors.iter().any(|sel| sel == a))
                .unwrap_or(false);
        let tag_ok =
            self.tags.is_empty() || item.tags.iter().any(|t| self.tags.iter().any(|sel| sel == t));
        source_ok && author_ok && tag_ok
    }
}

/// How a collection decides which articles belong to it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Membership {
    /// Matches every article.
    CatchAll,
    /// Matches by source/author/tag selection.
    Filter(FeedFilter),
    /// Explicit article ids, for saved folders.
    Saved {
        #[serde(default)]
        item_ids: Vec<String>,
    },
}

/// A user-defined named grouping of articles. Created and edited by user
/// action, never auto-deleted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Collection {
    pub id: String,
    pub name: String,
    pub icon: String,
    pub color_hex: String,
    pub cover_image_url: Option<String>,
    pub membership: Membership,
}

impl Collection {
    pub fn matches(&self, item: &FeedItem) -> bool {
        match &self.membership {
            Membership::CatchAll => true,
            Membership::Filter(filter) => filter.matches(item),
            Membership::Saved { item_ids } => item_ids.iter().any(|id| *id == item.id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{RawItem, Source};
    use chrono::Utc;

    fn item(source: &str, author: Option<&str>, tags: &[&str]) -> FeedItem {
        let raw = RawItem {
            title: format!("{source} story"),
            author: author.map(String::from),
            categories: tags.iter().map(|t| t.to_string()).collect(),
            link: Some(format!("https://{source}.example/story")),
            ..Default::default()
        };
        FeedItem::from_raw(&Source::new(source, format!("https://{source}.example/feed")), raw, Utc::now())
    }

    #[test]
    fn test_empty_filter_matches_all() {
        let filter = FeedFilter::default();
        assert!(filter.matches(&item("wire", None, &[])));
    }

    #[test]
    fn test_filter_and_across_facets() {
        let filter = FeedFilter {
            sources: vec!["wire".into()],
            tags: vec!["tech".into()],
            ..Default::default()
        };
        assert!(filter.matches(&item("wire", None, &["tech"])));
        assert!(!filter.matches(&item("wire", None, &["sports"])));
        assert!(!filter.matches(&item("ledger", None, &["tech"])));
    }

    #[test]
    fn test_author_facet_requires_author() {
        let filter = FeedFilter {
            authors: vec!["Ada".into()],
            ..Default::default()
        };
        assert!(filter.matches(&item("wire", Some("Ada"), &[])));
        assert!(!filter.matches(&item("wire", None, &[])));
    }

    #[test]
    fn test_catch_all_collection() {
        let collection = Collection {
            id: "all".into(),
            name: "Everything".into(),
            icon: "tray".into(),
            color_hex: "#000000".into(),
            cover_image_url: None,
            membership: Membership::CatchAll,
        };
        assert!(collection.matches(&item("wire", None, &[])));
    }

    #[test]
    fn test_saved_collection_matches_by_id() {
        let article = item("wire", None, &[]);
        let collection = Collection {
            id: "saved".into(),
            name: "Read later".into(),
            icon: "bookmark".into(),
            color_hex: "#000000".into(),
            cover_image_url: None,
            membership: Membership::Saved {
                item_ids: vec![article.id.clone()],
            },
        };
        assert!(collection.matches(&article));
        assert!(!collection.matches(&item("ledger", None, &[])));
    }

    #[test]
    fn test_membership_serde_round_trip() {
        let membership = Membership::Filter(FeedFilter {
            tags: vec!["tech".into()],
            ..Default::default()
        });
        let json = serde_json::to_string(&membership).unwrap();
        let back: Membership = serde_json::from_str(&json).unwrap();
        assert_eq!(membership, back);
    }
}
