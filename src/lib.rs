//! Bridges an RSS/Atom feed to a diaspora* pod.
//!
//! Each run fetches the feed, queues entries it has not seen before in a
//! SQLite file, and posts queued entries that are still inside the retry
//! window.

pub mod config;
pub mod feed;
pub mod pipeline;
pub mod publish;
pub mod storage;
