//! Engine status and shutdown snapshot

use crate::config::ExecutionMode;
use crate::position::PositionSnapshot;
use crate::risk::BreakerState;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

/// Status published after every tick and control action
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EngineStatus {
    pub mode: ExecutionMode,
    pub breaker: BreakerState,
    pub daily_pnl: Decimal,
    pub daily_loss: Decimal,
    pub realized_pnl: Decimal,
    pub unrealized_pnl: Decimal,
    /// Cost basis held across markets
    pub total_exposure: Decimal,
    pub locked_profit: Decimal,
    pub orders_last_minute: usize,
    /// Live intents awaiting a report
    pub pending_orders: usize,
    pub positions: Vec<PositionSnapshot>,
    pub updated_at: DateTime<Utc>,
}

impl EngineStatus {
    /// Status before the engine has processed anything
    pub fn initial(mode: ExecutionMode, now: DateTime<Utc>) -> Self {
        Self {
            mode,
            breaker: BreakerState::Closed,
            daily_pnl: Decimal::ZERO,
            daily_loss: Decimal::ZERO,
            realized_pnl: Decimal::ZERO,
            unrealized_pnl: Decimal::ZERO,
            total_exposure: Decimal::ZERO,
            locked_profit: Decimal::ZERO,
            orders_last_minute: 0,
            pending_orders: 0,
            positions: Vec::new(),
            updated_at: now,
        }
    }

    pub fn trading_allowed(&self) -> bool {
        !self.breaker.is_open()
    }
}

/// State handed to the surrounding process on shutdown for persistence
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FinalSnapshot {
    pub positions: Vec<PositionSnapshot>,
    pub breaker: BreakerState,
    pub daily_pnl: Decimal,
    pub fills: usize,
    pub taken_at: DateTime<Utc>,
}

impl FinalSnapshot {
    /// Snapshot as pretty-printed JSON
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
