use feed_rs::model::{Entry, Link};
use feed_rs::parser::{self, ParseFeedError};

use super::entry::{RawEntry, TextBlock, TypedLink};

/// Parses RSS/Atom bytes into raw entries, in document order.
pub fn parse_entries(bytes: &[u8]) -> Result<Vec<RawEntry>, ParseFeedError> {
    let feed = parser::parse(bytes)?;
    Ok(feed.entries.into_iter().map(raw_entry).collect())
}

fn raw_entry(entry: Entry) -> RawEntry {
    let link = primary_link(&entry.links).map(|l| l.href.clone());
    let published = entry.published.or(entry.updated).map(|dt| dt.timestamp());

    let content = entry
        .content
        .into_iter()
        .filter_map(|c| {
            let value = c.body?;
            Some(TextBlock::new(c.content_type.essence().to_string(), value))
        })
        .collect();

    let summary = entry
        .summary
        .map(|s| TextBlock::new(s.content_type.essence().to_string(), s.content));

    let mut links: Vec<TypedLink> = entry
        .links
        .into_iter()
        .map(|l| TypedLink {
            href: l.href,
            media_type: l.media_type,
        })
        .collect();

    // Enclosures and media objects: URLs feed the media scan, declared
    // types also make them candidates for the typed-link scan.
    let mut media_urls = Vec::new();
    for object in entry.media {
        for media in object.content {
            let Some(url) = media.url else { continue };
            let href = url.to_string();
            if let Some(mime) = media.content_type {
                links.push(TypedLink {
                    href: href.clone(),
                    media_type: Some(mime.essence().to_string()),
                });
            }
            media_urls.push(href);
        }
    }

    let id = if entry.id.trim().is_empty() {
        None
    } else {
        Some(entry.id)
    };

    RawEntry {
        id,
        title: entry.title.map(|t| t.content),
        link,
        published,
        content,
        summary,
        media_urls,
        links,
        categories: entry.categories.into_iter().map(|c| c.term).collect(),
    }
}

/// The entry's alternate link, or its first link when none is marked.
fn primary_link(links: &[Link]) -> Option<&Link> {
    links
        .iter()
        .find(|l| l.rel.as_deref().is_none_or(|r| r == "alternate"))
        .or_else(|| links.first())
}
