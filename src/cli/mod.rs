pub mod commands;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "gazette")]
#[command(about = "A personal news aggregator", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Add a news source
    Add {
        /// Display name for the source
        name: String,
        /// Feed URL (RSS or Atom)
        url: String,
        /// Logo image URL
        #[arg(long, default_value = "")]
        logo: String,
        /// Accent color, e.g. "#4A90D9"
        #[arg(long, default_value = "#4A90D9")]
        color: String,
    },
    /// Remove a source by id or URL
    Remove {
        /// Source id or feed URL
        source: String,
    },
    /// List configured sources
    Sources,
    /// Import sources from an OPML file
    Import {
        /// Path to the OPML file
        path: std::path::PathBuf,
    },
    /// Refresh the feed from all enabled sources
    Sync {
        /// Ignore the freshness window
        #[arg(long)]
        force: bool,
        /// Treat the network as unavailable
        #[arg(long)]
        offline: bool,
    },
    /// Show the current feed
    Show {
        /// Maximum number of articles to print
        #[arg(short, long, default_value_t = 20)]
        limit: usize,
        /// Only articles carrying one of these tags
        #[arg(long)]
        tag: Vec<String>,
        /// Only articles by one of these authors
        #[arg(long)]
        author: Vec<String>,
        /// Only articles from one of these sources
        #[arg(long)]
        source: Vec<String>,
        /// Show a named collection instead of the raw feed
        #[arg(long)]
        collection: Option<String>,
    },
    /// Print engine state, cache age, and asset cache size
    Status,
    /// Delete all cached data
    ClearCache,
    /// Periodically refresh the feed
    Watch {
        /// Refresh interval (e.g. "30s", "15m", "1h")
        #[arg(short, long, default_value = "15m")]
        interval: String,
    },
}
