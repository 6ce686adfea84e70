//! Formatting queued items as posts and delivering them to a pod.

mod client;
mod format;

pub use client::{Audience, PodClient, PodCredentials, PostError, Poster, PUBLIC};
pub use format::{format_message, ContentMode, FormatOptions, DEFAULT_BRANDING};

use crate::feed::FeedItem;

/// Everything needed to turn an item into a delivered post.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PublishOptions {
    pub format: FormatOptions,
    pub audience: Audience,
}

/// Formats an item and makes one delivery attempt.
///
/// There is no retry here: a failed item stays pending in the queue and is
/// picked up again by a later run.
pub async fn publish<P: Poster>(
    poster: &P,
    item: &FeedItem,
    options: &PublishOptions,
) -> Result<(), PostError> {
    let message = format_message(item, &options.format);
    tracing::debug!(guid = %item.guid, message = %message, "Publishing item");
    poster.post(&message, &options.audience).await
}
