//! Durable queue of feed items, backed by a single SQLite table.

mod queue;
mod schema;
mod types;

pub use schema::Store;
pub use types::{QueueRecord, StoreError};
