//! Market definitions
//!
//! A binary market pairs a YES and a NO instrument on the same event.
//! Markets are supplied at startup and never change afterwards.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Market identifier
pub type MarketId = String;

/// One side of a binary market
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    /// YES shares
    Yes,
    /// NO shares
    No,
}

impl Side {
    /// The complementary side
    pub fn other(self) -> Side {
        match self {
            Side::Yes => Side::No,
            Side::No => Side::Yes,
        }
    }

    /// Stable lowercase name, used in idempotency keys and metric labels
    pub fn as_str(self) -> &'static str {
        match self {
            Side::Yes => "yes",
            Side::No => "no",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Yes => write!(f, "YES"),
            Side::No => write!(f, "NO"),
        }
    }
}

/// A binary YES/NO market with a fixed trading window
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Market {
    /// Unique market identifier
    pub id: MarketId,
    /// Underlying asset symbol (e.g. "BTC"); feed freshness is tracked per asset
    pub asset: String,
    /// End of the trading window / settlement time
    pub window_end: DateTime<Utc>,
    /// Whether the venue charges taker fees on this market
    #[serde(default)]
    pub fees_enabled: bool,
}

impl Market {
    /// Create a fee-free market
    pub fn new(id: impl Into<String>, asset: impl Into<String>, window_end: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            asset: asset.into(),
            window_end,
            fees_enabled: false,
        }
    }

    /// Time remaining until the window closes (negative once expired)
    pub fn time_to_expiry(&self, now: DateTime<Utc>) -> chrono::Duration {
        self.window_end - now
    }
}
