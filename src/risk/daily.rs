//! Daily loss accounting
//!
//! Realized losses accumulate through the day; mark-to-market is replaced
//! per market on each update. Everything resets at 00:00 UTC.

use crate::market::MarketId;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use std::collections::HashMap;

/// Realized plus mark-to-market P&L for the current UTC day
#[derive(Debug, Clone)]
pub struct DailyLossCounter {
    day: NaiveDate,
    realized: Decimal,
    marks: HashMap<MarketId, Decimal>,
}

impl DailyLossCounter {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            day: now.date_naive(),
            realized: Decimal::ZERO,
            marks: HashMap::new(),
        }
    }

    /// Clear the counter if `now` falls on a later UTC day; returns true on rollover
    pub fn roll(&mut self, now: DateTime<Utc>) -> bool {
        let today = now.date_naive();
        if today <= self.day {
            return false;
        }
        tracing::info!(
            previous_day = %self.day,
            daily_pnl = %self.daily_pnl(),
            "Daily loss counter reset"
        );
        self.day = today;
        self.realized = Decimal::ZERO;
        self.marks.clear();
        true
    }

    /// Add realized P&L (negative for losses such as fees)
    pub fn record_realized(&mut self, amount: Decimal) {
        self.realized += amount;
    }

    /// Replace the mark-to-market value of a market
    pub fn mark(&mut self, market_id: &str, unrealized: Decimal) {
        self.marks.insert(market_id.to_string(), unrealized);
    }

    pub fn day(&self) -> NaiveDate {
        self.day
    }

    pub fn realized(&self) -> Decimal {
        self.realized
    }

    pub fn unrealized(&self) -> Decimal {
        self.marks.values().copied().sum()
    }

    pub fn daily_pnl(&self) -> Decimal {
        self.realized + self.unrealized()
    }

    /// Loss counted against the daily limit (never negative)
    pub fn daily_loss(&self) -> Decimal {
        (-self.daily_pnl()).max(Decimal::ZERO)
    }
}
