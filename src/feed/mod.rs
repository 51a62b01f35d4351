//! Quote feed module
//!
//! Delivers per-market quote updates from an external source

mod jsonl;
mod types;

pub use jsonl::JsonLinesFeed;
pub use types::{FeedError, QuoteUpdate};

use async_trait::async_trait;
use tokio::sync::mpsc;

/// An event delivered by a feed
///
/// Malformed input is surfaced rather than dropped so the consumer can
/// count it toward the feed error rate.
#[derive(Debug, Clone)]
pub enum FeedEvent {
    /// A well-formed quote update
    Quote(QuoteUpdate),
    /// An update that could not be parsed or failed validation
    Malformed(FeedError),
}

/// Trait for quote feed implementations
#[async_trait]
pub trait QuoteFeed: Send + Sync {
    /// Subscribe to quote updates
    async fn subscribe(&self) -> anyhow::Result<mpsc::Receiver<FeedEvent>>;
}
