use super::entry::RawEntry;
use super::extract::{extract_item, ExtractOptions};
use super::fetcher::{fetch_entries, FetchError};
use super::item::FeedItem;

/// Per-feed tagging options applied during ingestion.
#[derive(Debug, Clone, Default)]
pub struct IngestOptions {
    pub category_tags: bool,
    /// Added to every item.
    pub auto_tags: Vec<String>,
    /// Removed from every item, after auto tags.
    pub ignore_tags: Vec<String>,
}

/// Turns raw entries into items, applying auto and ignore tags.
///
/// Ignore tags are applied last so they win over both category and auto
/// tags.
pub fn items_from_entries(entries: &[RawEntry], options: &IngestOptions, now: i64) -> Vec<FeedItem> {
    let extract = ExtractOptions {
        category_tags: options.category_tags,
    };
    entries
        .iter()
        .map(|entry| {
            let mut item = extract_item(entry, extract, now);
            item.tags.add(&options.auto_tags);
            item.tags.remove(&options.ignore_tags);
            item
        })
        .collect()
}

/// Fetches a feed and normalizes every entry.
pub async fn ingest_feed(
    client: &reqwest::Client,
    url: &str,
    options: &IngestOptions,
) -> Result<Vec<FeedItem>, FetchError> {
    let entries = fetch_entries(client, url).await?;
    let now = chrono::Utc::now().timestamp();
    Ok(items_from_entries(&entries, options, now))
}
