//! Feed ingestion: fetching, parsing and normalizing RSS/Atom entries.
//!
//! - [`fetcher`] - HTTP retrieval with retry and size limits
//! - [`parser`] - `feed-rs` parsing into [`RawEntry`] records
//! - [`extract`] - [`RawEntry`] to [`FeedItem`] normalization
//! - [`tags`] - hashtag sanitizing and the ordered [`TagSet`]
//! - [`ingest`] - the above, plus per-feed auto/ignore tags
//!
//! # Example
//!
//! ```ignore
//! use pod_feeder::feed::{ingest_feed, IngestOptions};
//!
//! let items = ingest_feed(&client, "https://example.com/feed.xml", &IngestOptions::default()).await?;
//! ```

mod entry;
mod extract;
mod fetcher;
mod ingest;
mod item;
mod markdown;
mod parser;
mod tags;

pub use entry::{RawEntry, TextBlock, TypedLink};
pub use extract::{extract_item, find_image, ExtractOptions};
pub use fetcher::{fetch_entries, fetch_feed, FetchError, RetryPolicy};
pub use ingest::{ingest_feed, items_from_entries, IngestOptions};
pub use item::FeedItem;
pub use markdown::{html_to_markdown, render_block};
pub use parser::parse_entries;
pub use tags::{sanitize, TagSet};
