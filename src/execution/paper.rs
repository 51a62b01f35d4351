//! Paper trading execution engine

use super::{Fill, OrderIntent};
use crate::config::ExecutionMode;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

/// Paper trading execution engine with simulated fills
///
/// Every intent fills immediately and in full at its limit price.
#[derive(Debug, Clone)]
pub struct PaperEngine {
    fee_rate: Decimal,
}

impl PaperEngine {
    /// Create a new paper trading engine
    pub fn new(fee_rate: Decimal) -> Self {
        Self { fee_rate }
    }

    /// Synthesize the fill for an intent
    pub fn fill(&self, intent: &OrderIntent, now: DateTime<Utc>) -> Fill {
        let fees = intent.quantity * intent.limit_price * self.fee_rate;
        tracing::info!(
            key = %intent.key,
            market = %intent.market_id,
            side = %intent.side,
            quantity = %intent.quantity,
            price = %intent.limit_price,
            "Paper order filled"
        );
        Fill {
            key: intent.key,
            market_id: intent.market_id.clone(),
            side: intent.side,
            quantity: intent.quantity,
            price: intent.limit_price,
            fees,
            timestamp: now,
            mode: ExecutionMode::Paper,
        }
    }
}
