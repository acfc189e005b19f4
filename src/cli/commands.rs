use std::path::Path;
use std::time::Duration;

use crate::app::{AppContext, GazetteError, Result};
use crate::domain::{Collection, FeedFilter, FeedItem, Membership, Source};
use crate::store::Store;
use crate::sync::{DataOrigin, FeedState};

pub async fn add_source(
    ctx: &AppContext,
    name: &str,
    url: &str,
    logo: &str,
    color: &str,
) -> Result<()> {
    url::Url::parse(url)?;

    let mut sources = ctx.store.load_sources().await?;
    if sources.iter().any(|s| s.url == url) {
        println!("Source already exists: {}", url);
        return Ok(());
    }

    let mut source = Source::new(name, url);
    source.logo_url = logo.to_string();
    source.color_hex = color.to_string();
    sources.push(source);

    ctx.store.save_sources(&sources).await;
    println!("Added source: {} ({})", name, url);

    // pull the new source into the feed right away
    sync(ctx, true, false).await
}

pub async fn remove_source(ctx: &AppContext, source: &str) -> Result<()> {
    let mut sources = ctx.store.load_sources().await?;
    let before = sources.len();
    sources.retain(|s| s.id != source && s.url != source);

    if sources.len() == before {
        return Err(GazetteError::SourceNotFound(source.to_string()));
    }

    ctx.store.save_sources(&sources).await;
    println!("Removed source: {}", source);
    Ok(())
}

pub async fn list_sources(ctx: &AppContext) -> Result<()> {
    let sources = ctx.store.load_sources().await?;

    if sources.is_empty() {
        println!("No sources configured");
        return Ok(());
    }

    for source in sources {
        let marker = if source.is_enabled { " " } else { "-" };
        println!("{} {} [{}]\n    {}", marker, source.name, source.id, source.url);
    }

    Ok(())
}

pub async fn sync(ctx: &AppContext, force: bool, offline: bool) -> Result<()> {
    ctx.engine.load_cached_snapshot().await;
    if offline {
        ctx.engine.set_online(false).await;
    }

    let state = ctx.engine.sync(force).await;
    let snapshot = ctx.engine.snapshot().await;

    match state {
        FeedState::Ready(DataOrigin::Network) => {
            println!("Synced {} articles", snapshot.items.len());
        }
        FeedState::Ready(DataOrigin::Cache) => {
            println!("Serving {} cached articles", snapshot.items.len());
        }
        FeedState::Loading => {
            println!("A sync is already running");
        }
        FeedState::Error(message) => {
            println!("Sync failed: {}", message);
        }
        FeedState::Empty => {
            println!("Nothing to sync yet; add a source first");
        }
    }

    if let Some(status) = ctx.engine.status_message().await {
        println!("{}", status);
    }

    Ok(())
}

pub async fn show(
    ctx: &AppContext,
    limit: usize,
    tags: Vec<String>,
    authors: Vec<String>,
    sources: Vec<String>,
    collection: Option<String>,
) -> Result<()> {
    ctx.engine.load_cached_snapshot().await;

    let (featured, rest) = match collection {
        Some(name) => {
            let Some(collection) = find_collection(ctx, &name).await? else {
                return Err(GazetteError::Other(format!("No collection named {name}")));
            };
            collection_view(ctx, &collection).await
        }
        None => {
            let filter = FeedFilter {
                sources,
                authors,
                tags,
            };
            ctx.engine.filtered(&filter).await
        }
    };

    let Some(featured) = featured else {
        println!("No articles. Run `gazette sync` first, or widen the filter.");
        return Ok(());
    };

    print_item("★", &featured);
    for item in rest.iter().take(limit.saturating_sub(1)) {
        print_item(" ", item);
    }

    Ok(())
}

async fn find_collection(ctx: &AppContext, name: &str) -> Result<Option<Collection>> {
    let mut collections = ctx.store.load_collections().await?;
    collections.extend(ctx.store.load_saved_folders().await?);
    Ok(collections.into_iter().find(|c| c.name == name))
}

async fn collection_view(
    ctx: &AppContext,
    collection: &Collection,
) -> (Option<FeedItem>, Vec<FeedItem>) {
    match &collection.membership {
        Membership::Filter(filter) => ctx.engine.filtered(filter).await,
        _ => {
            let snapshot = ctx.engine.snapshot().await;
            let mut matching = snapshot.items.iter().filter(|i| collection.matches(i)).cloned();
            let featured = matching.next();
            (featured, matching.collect())
        }
    }
}

fn print_item(marker: &str, item: &FeedItem) {
    let when = if item.time_ago.is_empty() {
        "        ".to_string()
    } else {
        format!("{:>8}", item.time_ago)
    };
    println!(
        "{} {} {} ({})",
        marker,
        when,
        item.display_title(),
        item.source_name
    );
}

pub async fn status(ctx: &AppContext) -> Result<()> {
    ctx.engine.load_cached_snapshot().await;
    let snapshot = ctx.engine.snapshot().await;

    let state = match &snapshot.state {
        FeedState::Empty => "empty".to_string(),
        FeedState::Loading => "loading".to_string(),
        FeedState::Ready(DataOrigin::Network) => "ready (network)".to_string(),
        FeedState::Ready(DataOrigin::Cache) => "ready (cache)".to_string(),
        FeedState::Error(message) => format!("error: {message}"),
    };

    println!("State:        {}", state);
    println!("Articles:     {}", snapshot.items.len());
    match snapshot.last_synced {
        Some(ts) => println!("Last sync:    {}", ts.to_rfc3339()),
        None => println!("Last sync:    never"),
    }

    let window = Duration::from_secs(ctx.config.sync.freshness_window_secs);
    println!(
        "Cache fresh:  {}",
        if ctx.store.is_cache_valid(window).await {
            "yes"
        } else {
            "no"
        }
    );
    println!("Asset cache:  {}", format_size(ctx.assets.size().await));

    Ok(())
}

pub async fn clear_cache(ctx: &AppContext) -> Result<()> {
    ctx.engine.clear_cache().await?;
    println!("Cache cleared");
    Ok(())
}

pub async fn watch(ctx: &AppContext, interval: &str) -> Result<()> {
    let secs = parse_interval(interval).map_err(GazetteError::Other)?;
    let period = Duration::from_secs(secs);

    println!("Refreshing every {} (Ctrl-C to stop)", format_interval(secs));
    ctx.engine.load_cached_snapshot().await;

    loop {
        sync(ctx, true, false).await?;

        tokio::select! {
            _ = tokio::time::sleep(period) => {}
            _ = tokio::signal::ctrl_c() => {
                println!("Stopped");
                return Ok(());
            }
        }
    }
}

/// Import sources from an OPML file
pub async fn import_opml(ctx: &AppContext, path: &Path) -> Result<()> {
    let content = std::fs::read_to_string(path)?;
    let outlines = parse_opml(&content);

    if outlines.is_empty() {
        println!("No feeds found in OPML file");
        return Ok(());
    }

    println!("Found {} feeds in OPML file", outlines.len());

    let mut sources = ctx.store.load_sources().await?;
    let mut added = 0;
    let mut skipped = 0;

    for (title, url) in outlines {
        if sources.iter().any(|s| s.url == url) {
            skipped += 1;
            continue;
        }
        println!("  + {}", title);
        sources.push(Source::new(title, url));
        added += 1;
    }

    ctx.store.save_sources(&sources).await;
    println!("Import complete: {} added, {} skipped (already exist)", added, skipped);

    if added > 0 {
        sync(ctx, true, false).await?;
    }

    Ok(())
}

/// Parse OPML content and extract feed URLs with titles
fn parse_opml(content: &str) -> Vec<(String, String)> {
    let mut feeds = Vec::new();

    // line-oriented scan: find outline elements carrying an xmlUrl
    for line in content.lines() {
        if line.contains("xmlUrl") {
            if let (Some(title), Some(url)) = (
                extract_attr(line, "title").or_else(|| extract_attr(line, "text")),
                extract_attr(line, "xmlUrl"),
            ) {
                feeds.push((title, url));
            }
        }
    }

    feeds
}

/// Extract an attribute value from an XML element string
fn extract_attr(line: &str, attr: &str) -> Option<String> {
    let pattern = format!("{}=\"", attr);
    let start = line.find(&pattern)? + pattern.len();
    let rest = &line[start..];
    let end = rest.find('"')?;
    Some(html_escape::decode_html_entities(&rest[..end]).to_string())
}

/// Parse an interval string like "30s", "15m", "6h", "1d" into seconds.
pub fn parse_interval(s: &str) -> std::result::Result<u64, String> {
    let s = s.trim().to_lowercase();

    if let Some(hours) = s.strip_suffix('h') {
        hours
            .parse::<u64>()
            .map(|h| h * 3600)
            .map_err(|_| format!("Invalid hours: {}", hours))
    } else if let Some(minutes) = s.strip_suffix('m') {
        minutes
            .parse::<u64>()
            .map(|m| m * 60)
            .map_err(|_| format!("Invalid minutes: {}", minutes))
    } else if let Some(days) = s.strip_suffix('d') {
        days.parse::<u64>()
            .map(|d| d * 86400)
            .map_err(|_| format!("Invalid days: {}", days))
    } else if let Some(secs) = s.strip_suffix('s') {
        secs.parse::<u64>()
            .map_err(|_| format!("Invalid seconds: {}", secs))
    } else {
        s.parse::<u64>()
            .map_err(|_| format!("Invalid interval: {}. Use format like '15m' or '1h'", s))
    }
}

/// Format an interval in seconds for display.
pub fn format_interval(secs: u64) -> String {
    if secs >= 86400 && secs % 86400 == 0 {
        format!("{}d", secs / 86400)
    } else if secs >= 3600 && secs % 3600 == 0 {
        format!("{}h", secs / 3600)
    } else if secs >= 60 && secs % 60 == 0 {
        format!("{}m", secs / 60)
    } else {
        format!("{}s", secs)
    }
}

fn format_size(bytes: u64) -> String {
    if bytes >= 1_048_576 {
        format!("{:.1} MiB", bytes as f64 / 1_048_576.0)
    } else if bytes >= 1024 {
        format!("{:.1} KiB", bytes as f64 / 1024.0)
    } else {
        format!("{} B", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_interval() {
        assert_eq!(parse_interval("30s").unwrap(), 30);
        assert_eq!(parse_interval("15m").unwrap(), 900);
        assert_eq!(parse_interval("2h").unwrap(), 7200);
        assert_eq!(parse_interval("1d").unwrap(), 86400);
        assert_eq!(parse_interval("45").unwrap(), 45);
        assert!(parse_interval("soon").is_err());
    }

    #[test]
    fn test_format_interval() {
        assert_eq!(format_interval(900), "15m");
        assert_eq!(format_interval(7200), "2h");
        assert_eq!(format_interval(86400), "1d");
        assert_eq!(format_interval(45), "45s");
    }

    #[test]
    fn test_parse_opml() {
        let opml = r#"<opml version="1.0">
<body>
<outline text="Rust Blog" title="Rust Blog" type="rss" xmlUrl="https://blog.rust-lang.org/feed.xml"/>
<outline text="No URL here"/>
</body>
</opml>"#;
        let feeds = parse_opml(opml);
        assert_eq!(feeds.len(), 1);
        assert_eq!(feeds[0].0, "Rust Blog");
        assert_eq!(feeds[0].1, "https://blog.rust-lang.org/feed.xml");
    }

    #[test]
    fn test_extract_attr_decodes_entities() {
        let line = r#"<outline title="A &amp; B" xmlUrl="https://a.example/feed"/>"#;
        assert_eq!(extract_attr(line, "title").unwrap(), "A & B");
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(2048), "2.0 KiB");
        assert_eq!(format_size(3 * 1_048_576), "3.0 MiB");
    }
}
