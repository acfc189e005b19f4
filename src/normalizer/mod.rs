use feed_rs::model::{Entry, Link, MediaObject};
use feed_rs::parser;
use html_escape::decode_html_entities;
use regex::Regex;
use tracing::debug;

use crate::domain::RawItem;

/// Turns raw feed bytes into normalized items.
///
/// Parsing is tolerant: a document the parser rejects outright degrades to
/// an empty batch, and individual entries keep whatever fields were
/// present. Callers never see an error.
#[derive(Clone)]
pub struct Normalizer {
    img_pattern: Regex,
    tag_pattern: Regex,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Normalizer {
    pub fn new() -> Self {
        Self {
            img_pattern: Regex::new(r#"(?i)<img[^>]+src\s*=\s*["']([^"']+)["']"#)
                .expect("valid img pattern"),
            tag_pattern: Regex::new(r"<[^>]*>?").expect("valid tag pattern"),
        }
    }

    /// Parse RSS or Atom bytes into a batch of [`RawItem`].
    pub fn normalize(&self, body: &[u8]) -> Vec<RawItem> {
        let feed = match parser::parse(body) {
            Ok(feed) => feed,
            Err(e) => {
                debug!(error = %e, "unparsable feed document, skipping");
                return Vec::new();
            }
        };

        feed.entries
            .into_iter()
            .map(|entry| self.to_raw_item(entry))
            .collect()
    }

    fn to_raw_item(&self, entry: Entry) -> RawItem {
        let link = entry
            .links
            .iter()
            .find(|l| l.rel.as_deref() != Some("enclosure"))
            .or_else(|| entry.links.first())
            .map(|l| l.href.clone());

        let author = entry
            .authors
            .first()
            .map(|a| a.name.clone())
            .filter(|name| !name.is_empty());

        let categories: Vec<String> = entry
            .categories
            .iter()
            .map(|c| c.label.clone().unwrap_or_else(|| c.term.clone()))
            .filter(|c| !c.is_empty())
            .collect();

        let mut image_url = media_image(&entry.media).or_else(|| enclosure_image(&entry.links));

        let title = entry
            .title
            .map(|t| decode_html_entities(&t.content).trim().to_string())
            .unwrap_or_default();

        let description_html = entry
            .summary
            .map(|s| s.content)
            .or_else(|| entry.content.and_then(|c| c.body))
            .unwrap_or_default();

        if image_url.is_none() {
            image_url = self.inline_image(&description_html);
        }

        RawItem {
            title,
            description: self.strip_html(&description_html),
            link,
            published_at: entry.published.or(entry.updated),
            author,
            categories,
            image_url,
        }
    }

    /// First `<img src>` inside an (often entity-escaped) HTML fragment.
    fn inline_image(&self, html: &str) -> Option<String> {
        let decoded = decode_html_entities(html);
        self.img_pattern
            .captures(&decoded)
            .map(|caps| caps[1].to_string())
    }

    /// Strip markup from an HTML fragment, keeping the text.
    ///
    /// A character scanner handles well-formed markup; input that ends
    /// inside an unterminated tag falls back to a blunt regex scrub.
    pub fn strip_html(&self, html: &str) -> String {
        let stripped = match strip_tags(html) {
            Some(text) => text,
            None => self.tag_pattern.replace_all(html, " ").to_string(),
        };
        collapse_whitespace(&decode_html_entities(&stripped))
    }
}

/// Remove `<...>` spans. Returns `None` when the input ends mid-tag.
fn strip_tags(input: &str) -> Option<String> {
    let mut out = String::with_capacity(input.len());
    let mut in_tag = false;
    for ch in input.chars() {
        match ch {
            '<' if !in_tag => in_tag = true,
            '>' if in_tag => {
                in_tag = false;
                out.push(' ');
            }
            _ if !in_tag => out.push(ch),
            _ => {}
        }
    }
    if in_tag {
        None
    } else {
        Some(out)
    }
}

fn collapse_whitespace(input: &str) -> String {
    input.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// URL from `media:content` or `media:thumbnail`. RSS enclosures also land
/// here after parsing.
fn media_image(media: &[MediaObject]) -> Option<String> {
    for object in media {
        let with_url = || object.content.iter().filter(|c| c.url.is_some());
        let content = with_url()
            .find(|c| {
                c.content_type
                    .as_ref()
                    .map(|m| m.to_string().starts_with("image"))
                    .unwrap_or(false)
            })
            .or_else(|| with_url().next());
        if let Some(content) = content {
            return content.url.as_ref().map(|u| u.to_string());
        }
        if let Some(thumbnail) = object.thumbnails.first() {
            return Some(thumbnail.image.uri.clone());
        }
    }
    None
}

/// Enclosure-style link carrying an image media type.
fn enclosure_image(links: &[Link]) -> Option<String> {
    links
        .iter()
        .find(|l| {
            l.media_type
                .as_deref()
                .map(|m| m.starts_with("image/"))
                .unwrap_or(false)
        })
        .map(|l| l.href.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    const RSS_SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>Test Feed</title>
    <description>A test feed</description>
    <item>
      <title>Test Item 1</title>
      <link>https://example.com/item1</link>
      <author>jane@example.com (Jane Doe)</author>
      <category>Tech</category>
      <pubDate>Mon, 01 Jan 2024 00:00:00 GMT</pubDate>
      <description>&lt;p&gt;This is &lt;b&gt;item 1&lt;/b&gt;&lt;/p&gt;</description>
    </item>
    <item>
      <title>Test Item 2</title>
      <link>https://example.com/item2</link>
      <description>This is item 2</description>
    </item>
  </channel>
</rss>"#;

    const ATOM_SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>Atom Test Feed</title>
  <entry>
    <title>Atom Entry 1</title>
    <link href="https://example.com/atom1"/>
    <id>atom-entry-1</id>
    <updated>2024-01-01T00:00:00Z</updated>
    <summary>This is Atom entry 1</summary>
  </entry>
</feed>"#;

    const MEDIA_SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0" xmlns:media="http://search.yahoo.com/mrss/">
  <channel>
    <title>Media Feed</title>
    <item>
      <title>With Media</title>
      <link>https://example.com/media</link>
      <media:content url="https://example.com/lead.jpg" type="image/jpeg"/>
    </item>
  </channel>
</rss>"#;

    #[test]
    fn test_parse_rss() {
        let items = Normalizer::new().normalize(RSS_SAMPLE.as_bytes());
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].title, "Test Item 1");
        assert_eq!(items[0].link.as_deref(), Some("https://example.com/item1"));
        assert_eq!(items[0].description, "This is item 1");
        assert_eq!(items[0].categories, vec!["Tech".to_string()]);
        assert!(items[0].published_at.is_some());
    }

    #[test]
    fn test_parse_atom() {
        let items = Normalizer::new().normalize(ATOM_SAMPLE.as_bytes());
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].title, "Atom Entry 1");
        assert_eq!(items[0].link.as_deref(), Some("https://example.com/atom1"));
        assert!(items[0].published_at.is_some());
    }

    #[test]
    fn test_undated_entry_has_no_timestamp() {
        let items = Normalizer::new().normalize(RSS_SAMPLE.as_bytes());
        assert!(items[1].published_at.is_none());
    }

    #[test]
    fn test_malformed_document_yields_empty_batch() {
        let items = Normalizer::new().normalize(b"this is not xml at all {{{");
        assert!(items.is_empty());
    }

    #[test]
    fn test_media_content_image() {
        let items = Normalizer::new().normalize(MEDIA_SAMPLE.as_bytes());
        assert_eq!(items.len(), 1);
        assert_eq!(
            items[0].image_url.as_deref(),
            Some("https://example.com/lead.jpg")
        );
    }

    #[test]
    fn test_inline_image_fallback() {
        let normalizer = Normalizer::new();
        let html = r#"&lt;p&gt;Story&lt;/p&gt;&lt;img src="https://example.com/pic.png" /&gt;"#;
        assert_eq!(
            normalizer.inline_image(html).as_deref(),
            Some("https://example.com/pic.png")
        );
        assert_eq!(normalizer.inline_image("<p>no image</p>"), None);
    }

    #[test]
    fn test_strip_html_keeps_text() {
        let normalizer = Normalizer::new();
        assert_eq!(
            normalizer.strip_html("<p>Hello <b>world</b></p>"),
            "Hello world"
        );
        assert_eq!(normalizer.strip_html("a &amp; b"), "a & b");
    }

    #[test]
    fn test_strip_html_tolerates_broken_markup() {
        let normalizer = Normalizer::new();
        assert_eq!(normalizer.strip_html("text <b>bold</b> then <unclosed"), "text bold then");
    }
}
