//! # Gazette
//!
//! A personal news aggregator core: feed synchronization and multi-tier
//! caching, usable offline and tolerant of flaky networks.
//!
//! ## Architecture
//!
//! ```text
//! ParallelFetcher → Normalizer → merge → JsonStore
//!                                  ↓
//!                              SyncEngine → subscribers
//!                                  ↓
//!                              AssetCache
//! ```
//!
//! - [`fetcher`]: concurrent per-source HTTP retrieval with failure isolation
//! - [`normalizer`]: tolerant RSS/Atom parsing into unified items
//! - [`merge`]: cross-source merge, dedup, and ranking
//! - [`store`]: JSON-document persistence with atomic writes
//! - [`assets`]: two-tier (memory + disk) image cache
//! - [`sync`]: the orchestrating state machine consumed by frontends

/// Application context and error handling.
///
/// The [`AppContext`](app::AppContext) struct wires together all
/// components: store, fetcher, asset cache, sync engine.
pub mod app;

/// Two-tier image cache with bounded concurrent preload.
pub mod assets;

/// Command-line interface using clap.
///
/// Defines the CLI structure and subcommands:
/// - `add <name> <url>` / `remove <source>` / `sources` - manage sources
/// - `import <file>` - import sources from OPML
/// - `sync [--force] [--offline]` - refresh the feed
/// - `show` / `status` - inspect the feed and engine
/// - `clear-cache` - drop all cached data
/// - `watch --interval 15m` - periodic refresh
pub mod cli;

/// Configuration loaded from `~/.config/gazette/config.toml`.
pub mod config;

/// Core domain models.
///
/// - [`Source`](domain::Source): a configured feed endpoint
/// - [`RawItem`](domain::RawItem): parser output for one entry
/// - [`FeedItem`](domain::FeedItem): the durable article record
/// - [`Collection`](domain::Collection): user-defined article grouping
pub mod domain;

/// HTTP fetching.
///
/// - [`Fetcher`](fetcher::Fetcher): async trait for retrieval
/// - [`HttpFetcher`](fetcher::http_fetcher::HttpFetcher): reqwest-based implementation
/// - [`ParallelFetcher`](fetcher::parallel::ParallelFetcher): concurrent fetching with semaphore
pub mod fetcher;

/// Cross-source merge, dedup, and ranking of fetched items.
pub mod merge;

/// Feed parsing and normalization.
///
/// Converts RSS and Atom documents into [`RawItem`](domain::RawItem)
/// batches without ever failing the caller.
pub mod normalizer;

/// JSON-document persistence layer.
///
/// - [`Store`](store::Store): trait defining storage operations
/// - [`JsonStore`](store::JsonStore): file-backed implementation
pub mod store;

/// The orchestrating state machine.
///
/// [`SyncEngine`](sync::SyncEngine) owns the in-memory feed, coordinates
/// fetch/merge/persist cycles, and publishes immutable snapshots.
pub mod sync;
