//! Quote feed types

use crate::market::{MarketId, Side};
use crate::quote::Quote;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A top-of-book update for one side of a market
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteUpdate {
    /// Market identifier
    #[serde(alias = "market")]
    pub market_id: MarketId,
    /// Side being quoted
    pub side: Side,
    /// Best bid
    #[serde(default)]
    pub bid: Option<Decimal>,
    /// Best ask
    #[serde(default)]
    pub ask: Option<Decimal>,
    /// Size available at the best ask
    #[serde(default)]
    pub size: Decimal,
    /// Source timestamp
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

/// Transient feed errors; the offending event is skipped
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FeedError {
    /// Payload could not be decoded
    #[error("malformed update: {0}")]
    Malformed(String),
    /// Market identifier missing or empty
    #[error("update has no market id")]
    MissingMarket,
    /// Price outside the binary range [0, 1]
    #[error("{field} price out of range: {value}")]
    PriceOutOfRange { field: &'static str, value: Decimal },
    /// Bid above ask
    #[error("crossed book: bid {bid} > ask {ask}")]
    CrossedBook { bid: Decimal, ask: Decimal },
    /// Negative size
    #[error("negative size: {0}")]
    NegativeSize(Decimal),
}

impl QuoteUpdate {
    /// Parse and validate a JSON payload
    pub fn from_json(payload: &str) -> Result<Self, FeedError> {
        let update: QuoteUpdate =
            serde_json::from_str(payload).map_err(|e| FeedError::Malformed(e.to_string()))?;
        update.validate()?;
        Ok(update)
    }

    /// Check structural sanity of the update
    pub fn validate(&self) -> Result<(), FeedError> {
        if self.market_id.trim().is_empty() {
            return Err(FeedError::MissingMarket);
        }
        for (field, value) in [("bid", self.bid), ("ask", self.ask)] {
            if let Some(value) = value {
                if value < Decimal::ZERO || value > Decimal::ONE {
                    return Err(FeedError::PriceOutOfRange { field, value });
                }
            }
        }
        if let (Some(bid), Some(ask)) = (self.bid, self.ask) {
            if bid > ask {
                return Err(FeedError::CrossedBook { bid, ask });
            }
        }
        if self.size < Decimal::ZERO {
            return Err(FeedError::NegativeSize(self.size));
        }
        Ok(())
    }

    /// Convert into a book quote
    pub fn into_quote(self) -> Quote {
        Quote {
            market_id: self.market_id,
            side: self.side,
            bid: self.bid,
            ask: self.ask,
            size: self.size,
            timestamp: self.timestamp,
        }
    }
}
