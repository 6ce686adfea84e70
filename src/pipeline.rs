//! One run of the feed bridge: ingest, queue, then publish what is pending.
//!
//! Every step is awaited in sequence; nothing in a cycle runs concurrently.
use anyhow::{Context, Result};

use crate::config::Settings;
use crate::feed::{ingest_feed, FeedItem};
use crate::publish::{publish, Poster, PublishOptions};
use crate::storage::Store;

/// What a cycle did, for the end-of-run log line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Entries found in the feed.
    pub fetched: usize,
    /// Entries that were new and got queued.
    pub queued: usize,
    pub published: usize,
    /// Publish attempts that failed; those items stay pending.
    pub failed: usize,
}

/// Queues items, skipping guids already known. Returns how many were new.
pub async fn queue_items(store: &Store, feed_id: &str, items: &[FeedItem]) -> Result<usize> {
    let mut queued = 0;
    for item in items {
        if store
            .insert_if_absent(feed_id, item)
            .await
            .with_context(|| format!("Failed to queue item {}", item.guid))?
        {
            tracing::debug!(feed_id = %feed_id, guid = %item.guid, "Queued new item");
            queued += 1;
        }
    }
    Ok(queued)
}

/// Publishes pending items oldest first, marking each posted on success.
///
/// A failed post is logged and skipped; the item stays pending for the next
/// run until it ages past `max_age_secs`. Returns `(published, failed)`.
pub async fn publish_pending<P: Poster>(
    store: &Store,
    poster: &P,
    feed_id: &str,
    max_age_secs: i64,
    limit: Option<u32>,
    options: &PublishOptions,
) -> Result<(usize, usize)> {
    let pending = store
        .select_pending(feed_id, max_age_secs, limit)
        .await
        .context("Failed to select pending items")?;

    let mut published = 0;
    let mut failed = 0;
    for record in pending {
        let guid = &record.item.guid;
        match publish(poster, &record.item, options).await {
            Ok(()) => {
                store
                    .mark_posted(guid)
                    .await
                    .with_context(|| format!("Failed to mark {} as posted", guid))?;
                tracing::info!(feed_id = %feed_id, guid = %guid, title = %record.item.title, "Published item");
                published += 1;
            }
            Err(e) => {
                tracing::warn!(
                    feed_id = %feed_id,
                    guid = %guid,
                    error = %e,
                    "Failed to publish item, will retry on a later run"
                );
                failed += 1;
            }
        }
    }
    Ok((published, failed))
}

/// Runs one full cycle for the configured feed.
///
/// `poster` of `None` is fetch-only: items are queued and nothing is sent.
/// A fetch failure aborts before anything is written.
pub async fn run_cycle<P: Poster>(
    store: &Store,
    client: &reqwest::Client,
    settings: &Settings,
    poster: Option<&P>,
) -> Result<CycleReport> {
    let items = ingest_feed(client, settings.feed_url.as_str(), &settings.ingest)
        .await
        .with_context(|| format!("Failed to fetch feed {}", settings.feed_url))?;

    if let Some(item) = items.first() {
        tracing::debug!(
            guid = %item.guid,
            title = %item.title,
            link = %item.link,
            image = ?item.image,
            tags = %item.tags.to_hashtag_line(),
            time = item.timestamp,
            "First feed item"
        );
    }

    let mut report = CycleReport {
        fetched: items.len(),
        queued: queue_items(store, &settings.feed_id, &items).await?,
        ..Default::default()
    };

    if let Some(poster) = poster {
        let (published, failed) = publish_pending(
            store,
            poster,
            &settings.feed_id,
            settings.max_age_secs(),
            settings.limit,
            &settings.publish,
        )
        .await?;
        report.published = published;
        report.failed = failed;
    } else {
        tracing::info!(feed_id = %settings.feed_id, "Fetch-only run, skipping publish");
    }

    Ok(report)
}
