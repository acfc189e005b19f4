use std::cmp::Ordering;
use std::collections::HashSet;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::domain::{FeedItem, RawItem, Source};

/// Combine per-source batches into one chronologically ordered,
/// duplicate-free feed. Deterministic for a fixed input: the sort is
/// stable and duplicate resolution always keeps the first item in sort
/// order.
pub fn merge(batches: Vec<(Source, Vec<RawItem>)>, now: DateTime<Utc>) -> Vec<FeedItem> {
    let mut items = Vec::new();
    for (source, raws) in batches {
        for raw in raws {
            items.push(FeedItem::from_raw(&source, raw, now));
        }
    }
    sort_newest_first(&mut items);
    dedup_by_title(items)
}

/// Newest first; undated items sort after every dated item and keep their
/// first-seen order among themselves.
pub fn sort_newest_first(items: &mut [FeedItem]) {
    items.sort_by(|a, b| match (&a.published_at, &b.published_at) {
        (Some(a_ts), Some(b_ts)) => b_ts.cmp(a_ts),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
}

/// Drop later occurrences of an already-seen normalized title. Protects
/// against the same wire story arriving from several sources under
/// different links.
pub fn dedup_by_title(items: Vec<FeedItem>) -> Vec<FeedItem> {
    let mut seen = HashSet::new();
    let mut out = Vec::with_capacity(items.len());
    for item in items {
        if seen.insert(item.normalized_title()) {
            out.push(item);
        } else {
            debug!(
                source = %item.source_name,
                title = %item.title,
                "dropping duplicate title"
            );
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    fn raw(title: &str, minutes_ago: Option<i64>) -> RawItem {
        RawItem {
            title: title.into(),
            published_at: minutes_ago.map(|m| now() - chrono::Duration::minutes(m)),
            ..Default::default()
        }
    }

    #[test]
    fn test_merge_orders_newest_first() {
        let source = Source::new("Wire", "https://wire.example/feed");
        let merged = merge(
            vec![(
                source,
                vec![raw("old", Some(60)), raw("new", Some(5)), raw("mid", Some(30))],
            )],
            now(),
        );
        let titles: Vec<&str> = merged.iter().map(|i| i.title.as_str()).collect();
        assert_eq!(titles, vec!["new", "mid", "old"]);
    }

    #[test]
    fn test_undated_sort_last_in_first_seen_order() {
        let source = Source::new("Wire", "https://wire.example/feed");
        let merged = merge(
            vec![(
                source,
                vec![raw("undated-a", None), raw("dated", Some(10)), raw("undated-b", None)],
            )],
            now(),
        );
        let titles: Vec<&str> = merged.iter().map(|i| i.title.as_str()).collect();
        assert_eq!(titles, vec!["dated", "undated-a", "undated-b"]);
    }

    #[test]
    fn test_merge_is_deterministic() {
        let batches = || {
            vec![
                (
                    Source::new("A", "https://a.example/feed"),
                    vec![raw("one", Some(10)), raw("two", None)],
                ),
                (
                    Source::new("B", "https://b.example/feed"),
                    vec![raw("three", Some(5)), raw("four", None)],
                ),
            ]
        };
        let first = merge(batches(), now());
        let second = merge(batches(), now());
        assert_eq!(first, second);
    }

    #[test]
    fn test_dedup_keeps_newest_copy() {
        let merged = merge(
            vec![
                (
                    Source::new("A", "https://a.example/feed"),
                    vec![raw("Cats save the day", Some(0))],
                ),
                (
                    Source::new("B", "https://b.example/feed"),
                    vec![raw("cats SAVE the Day  ", Some(10))],
                ),
            ],
            now(),
        );
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].source_name, "A");
        assert_eq!(merged[0].title, "Cats save the day");
    }

    #[test]
    fn test_dedup_is_idempotent() {
        let source = Source::new("Wire", "https://wire.example/feed");
        let merged = merge(
            vec![(
                source,
                vec![raw("same", Some(10)), raw("same", Some(20)), raw("other", Some(5))],
            )],
            now(),
        );
        let again = dedup_by_title(merged.clone());
        assert_eq!(merged, again);
    }

    #[test]
    fn test_distinct_titles_survive() {
        let merged = merge(
            vec![
                (
                    Source::new("A", "https://a.example/feed"),
                    vec![raw("alpha", Some(1))],
                ),
                (
                    Source::new("B", "https://b.example/feed"),
                    vec![raw("beta", Some(2))],
                ),
            ],
            now(),
        );
        assert_eq!(merged.len(), 2);
    }
}
