//! Risk management types

use super::{BreakerState, TripReason};
use crate::market::MarketId;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;

/// Pre-trade rejection reasons
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RiskError {
    /// Trading is halted
    #[error("Circuit breaker open: {0}")]
    BreakerOpen(TripReason),
    /// Pausing after an order failure
    #[error("Cooling down after order failure: {remaining_secs}s remaining")]
    Cooldown { remaining_secs: i64 },
    /// Market cost basis would exceed its limit
    #[error("Position in {market_id} would reach {projected}, limit {limit}")]
    MarketLimit {
        market_id: MarketId,
        projected: Decimal,
        limit: Decimal,
    },
    /// Total cost basis would exceed its limit
    #[error("Total exposure would reach {projected}, limit {limit}")]
    TotalLimit { projected: Decimal, limit: Decimal },
    /// Rate limiter has no capacity
    #[error("Order rate limit reached")]
    RateLimited,
}

impl RiskError {
    /// Short label for logs and metrics
    pub fn code(&self) -> &'static str {
        match self {
            RiskError::BreakerOpen(_) => "breaker_open",
            RiskError::Cooldown { .. } => "cooldown",
            RiskError::MarketLimit { .. } => "market_limit",
            RiskError::TotalLimit { .. } => "total_limit",
            RiskError::RateLimited => "rate_limited",
        }
    }
}

/// Point-in-time risk view
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskStatus {
    pub breaker: BreakerState,
    pub trips: u64,
    pub daily_pnl: Decimal,
    pub daily_loss: Decimal,
    pub realized_pnl: Decimal,
    pub unrealized_pnl: Decimal,
    /// Order attempts and failures in the error-rate window
    pub order_attempts: usize,
    pub order_failures: usize,
    pub feed_errors_last_minute: usize,
    /// Last quote receipt time per asset
    pub last_quote: Vec<(String, DateTime<Utc>)>,
    pub cooldown_until: Option<DateTime<Utc>>,
}

impl RiskStatus {
    pub fn trading_allowed(&self) -> bool {
        !self.breaker.is_open()
    }
}
