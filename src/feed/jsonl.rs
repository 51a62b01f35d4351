//! JSON-lines quote feed
//!
//! Reads one `QuoteUpdate` JSON object per line from any async reader
//! (a capture file, stdin, a pipe from an upstream connector).

use super::{FeedEvent, QuoteFeed, QuoteUpdate};
use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc;

/// Channel capacity between the reader task and the engine
const FEED_CHANNEL_CAPACITY: usize = 1024;

/// Feed that parses newline-delimited JSON quote updates
pub struct JsonLinesFeed<R> {
    reader: Mutex<Option<R>>,
    source: String,
}

impl<R> JsonLinesFeed<R>
where
    R: AsyncBufRead + Unpin + Send + 'static,
{
    /// Create a feed over the given reader; `source` is used for logging only
    pub fn new(reader: R, source: impl Into<String>) -> Self {
        Self {
            reader: Mutex::new(Some(reader)),
            source: source.into(),
        }
    }

    /// Parse a single line; blank lines and `#` comments yield nothing
    fn parse_line(line: &str) -> Option<FeedEvent> {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            return None;
        }
        Some(match QuoteUpdate::from_json(trimmed) {
            Ok(update) => FeedEvent::Quote(update),
            Err(e) => FeedEvent::Malformed(e),
        })
    }

    /// Run the read loop until EOF, I/O failure, or the receiver is dropped
    async fn run_read_loop(reader: R, tx: mpsc::Sender<FeedEvent>, source: String) {
        let mut lines = reader.lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    let Some(event) = Self::parse_line(&line) else {
                        continue;
                    };
                    if tx.send(event).await.is_err() {
                        tracing::debug!(%source, "Feed receiver dropped, stopping feed");
                        break;
                    }
                }
                Ok(None) => {
                    tracing::info!(%source, "Feed reached end of input");
                    break;
                }
                Err(e) => {
                    tracing::warn!(%source, error = %e, "Feed read failed, stopping feed");
                    break;
                }
            }
        }
    }
}

#[async_trait]
impl<R> QuoteFeed for JsonLinesFeed<R>
where
    R: AsyncBufRead + Unpin + Send + 'static,
{
    async fn subscribe(&self) -> anyhow::Result<mpsc::Receiver<FeedEvent>> {
        let reader = self
            .reader
            .lock()
            .take()
            .ok_or_else(|| anyhow::anyhow!("feed {} already subscribed", self.source))?;

        let (tx, rx) = mpsc::channel(FEED_CHANNEL_CAPACITY);
        let source = self.source.clone();

        tracing::info!(%source, "Subscribing to JSON-lines feed");

        tokio::spawn(async move {
            Self::run_read_loop(reader, tx, source).await;
        });

        Ok(rx)
    }
}
