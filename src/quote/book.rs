//! Latest-quote state per market side

use crate::market::{MarketId, Side};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Best bid/ask for one side of a market
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    /// Market identifier
    pub market_id: MarketId,
    /// Side this quote prices
    pub side: Side,
    /// Best bid, if any
    pub bid: Option<Decimal>,
    /// Best ask, if any
    pub ask: Option<Decimal>,
    /// Size available at the best ask
    pub size: Decimal,
    /// Quote timestamp
    pub timestamp: DateTime<Utc>,
}

impl Quote {
    /// Best ask if it is a tradeable binary price (strictly between 0 and 1)
    pub fn valid_ask(&self) -> Option<Decimal> {
        self.ask
            .filter(|ask| *ask > Decimal::ZERO && *ask < Decimal::ONE)
    }

    /// Get mid price
    ///
    /// Falls back to whichever side of the book is present.
    pub fn mid_price(&self) -> Option<Decimal> {
        match (self.bid, self.ask) {
            (Some(bid), Some(ask)) => Some((bid + ask) / Decimal::TWO),
            (Some(bid), None) => Some(bid),
            (None, Some(ask)) => Some(ask),
            (None, None) => None,
        }
    }

    /// Get spread
    pub fn spread(&self) -> Option<Decimal> {
        match (self.bid, self.ask) {
            (Some(bid), Some(ask)) => Some(ask - bid),
            _ => None,
        }
    }
}

/// Latest quote per (market, side)
///
/// Quotes are replaced wholesale; no history is kept.
#[derive(Debug, Default)]
pub struct QuoteBook {
    quotes: HashMap<(MarketId, Side), Quote>,
}

impl QuoteBook {
    /// Create an empty book
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the quote for the quote's market and side
    pub fn apply(&mut self, quote: Quote) {
        self.quotes
            .insert((quote.market_id.clone(), quote.side), quote);
    }

    /// Latest quote for one side
    pub fn get(&self, market_id: &str, side: Side) -> Option<&Quote> {
        self.quotes.get(&(market_id.to_string(), side))
    }

    /// Latest YES and NO quotes, if both sides have been seen
    pub fn pair(&self, market_id: &str) -> Option<(&Quote, &Quote)> {
        Some((self.get(market_id, Side::Yes)?, self.get(market_id, Side::No)?))
    }

    /// Mid prices for both sides
    pub fn mids(&self, market_id: &str) -> Option<(Decimal, Decimal)> {
        let (yes, no) = self.pair(market_id)?;
        Some((yes.mid_price()?, no.mid_price()?))
    }

    /// Number of quotes held
    pub fn len(&self) -> usize {
        self.quotes.len()
    }

    /// True when no quote has been applied
    pub fn is_empty(&self) -> bool {
        self.quotes.is_empty()
    }
}
