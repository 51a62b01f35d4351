//! Execution types

use crate::config::ExecutionMode;
use crate::market::{MarketId, Side};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

/// Deterministic order key; a retried submission reuses the same key so the
/// venue can reject the duplicate instead of executing twice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IdempotencyKey(Uuid);

impl IdempotencyKey {
    /// Derive the key for (market, side, time bucket)
    pub fn derive(market_id: &str, side: Side, bucket: i64) -> Self {
        let name = format!("{}|{}|{}", market_id, side.as_str(), bucket);
        Self(Uuid::new_v5(&Uuid::NAMESPACE_OID, name.as_bytes()))
    }

    /// Underlying UUID
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl fmt::Display for IdempotencyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A limit buy handed to the execution collaborator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderIntent {
    /// Idempotency key
    pub key: IdempotencyKey,
    /// Market identifier
    pub market_id: MarketId,
    /// Side to buy
    pub side: Side,
    /// Shares to buy
    pub quantity: Decimal,
    /// Maximum price per share
    pub limit_price: Decimal,
    /// Paper or live
    pub mode: ExecutionMode,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl OrderIntent {
    /// Notional value at the limit price
    pub fn notional(&self) -> Decimal {
        self.quantity * self.limit_price
    }
}

/// A fill (executed trade)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fill {
    /// Key of the intent this fill belongs to
    pub key: IdempotencyKey,
    /// Market identifier
    pub market_id: MarketId,
    /// Trade side
    pub side: Side,
    /// Fill size
    pub quantity: Decimal,
    /// Fill price
    pub price: Decimal,
    /// Fees paid
    pub fees: Decimal,
    /// Fill timestamp
    pub timestamp: DateTime<Utc>,
    /// Paper or live
    pub mode: ExecutionMode,
}

/// Outcome reported asynchronously for a live intent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ExecutionOutcome {
    /// Intent (partially or fully) filled
    Filled(Fill),
    /// Intent rejected by the venue
    Rejected { reason: String },
}

/// Asynchronous report from the execution collaborator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionReport {
    /// Key of the intent being reported
    pub key: IdempotencyKey,
    /// What happened
    pub outcome: ExecutionOutcome,
}

/// Execution errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExecutionError {
    /// Submission could not be delivered to the venue
    #[error("submission failed: {0}")]
    Submission(String),
    /// Venue refused the order synchronously
    #[error("order rejected: {0}")]
    Rejected(String),
    /// Cancel request failed
    #[error("cancel failed: {0}")]
    Cancel(String),
}
