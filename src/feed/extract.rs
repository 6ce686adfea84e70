use regex::Regex;
use sha2::{Digest, Sha256};
use std::sync::LazyLock;

use super::entry::{RawEntry, TypedLink};
use super::item::FeedItem;
use super::markdown::render_block;
use super::tags::{sanitize, TagSet};

/// Image URLs recognized in `media:content`. The match is anchored at the
/// start only, so query strings after the extension are dropped.
static IMAGE_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^https?://.*/.*\.(?:gif|jpg|jpeg|png)").expect("image URL pattern is valid")
});

/// Category label that feeds use for "no category"; never turned into a tag.
const UNCATEGORIZED: &str = "uncategorized";

/// Options for [`extract_item`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ExtractOptions {
    /// Turn the entry's categories into hashtags.
    pub category_tags: bool,
}

/// Builds a [`FeedItem`] from a raw entry.
///
/// Missing fields degrade to empty values; this never fails. `now` is the
/// ingestion time, used when the entry has no publish time.
pub fn extract_item(entry: &RawEntry, options: ExtractOptions, now: i64) -> FeedItem {
    let title = entry.title.clone().unwrap_or_default();
    let link = entry.link.clone().unwrap_or_default();

    let guid = match entry.id.as_deref().map(str::trim) {
        Some(id) if !id.is_empty() => id.to_string(),
        _ => {
            tracing::debug!(title = %title, link = %link, "Entry has no id, deriving one");
            fallback_guid(&link, &title, entry.published)
        }
    };

    let mut tags = TagSet::new();
    if options.category_tags {
        let uncategorized = sanitize(UNCATEGORIZED);
        tags.add(
            entry
                .categories
                .iter()
                .filter(|term| sanitize(term) != uncategorized),
        );
    }

    FeedItem {
        guid,
        title,
        link,
        image: find_image(&entry.media_urls, &entry.links),
        body: entry.content.first().and_then(render_block),
        summary: entry.summary.as_ref().and_then(render_block),
        tags,
        timestamp: entry.published.unwrap_or(now),
    }
}

/// Picks the cover image: first media URL with an image extension, then
/// the first link typed `image/*`.
pub fn find_image(media_urls: &[String], links: &[TypedLink]) -> Option<String> {
    media_urls
        .iter()
        .find_map(|url| {
            let m = IMAGE_URL.find(url)?;
            url::Url::parse(m.as_str()).ok()?;
            Some(m.as_str().to_string())
        })
        .or_else(|| {
            links
                .iter()
                .find(|l| {
                    l.media_type
                        .as_deref()
                        .is_some_and(|t| t.trim_start().starts_with("image/"))
                })
                .map(|l| l.href.clone())
        })
}

/// Stable id for entries that carry none, so re-fetching still deduplicates.
fn fallback_guid(link: &str, title: &str, published: Option<i64>) -> String {
    let input = format!(
        "{}|{}|{}",
        link,
        title,
        published.map(|p| p.to_string()).unwrap_or_default()
    );
    let hash = Sha256::digest(input.as_bytes());
    format!("{:x}", hash)
}
