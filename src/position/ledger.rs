//! Position ledger
//!
//! Owns every market position. The only mutation is `apply_fill`; callers
//! serialize fills per market (the engine runs a single writer).

use super::{MarketPosition, PositionSnapshot, SidePosition};
use crate::execution::Fill;
use crate::market::MarketId;
use rust_decimal::Decimal;
use std::collections::HashMap;
use thiserror::Error;

/// Ledger errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LedgerError {
    /// Fill quantity must be positive
    #[error("fill quantity must be positive: {0}")]
    NonPositiveQuantity(Decimal),
    /// Fill price outside the binary range
    #[error("fill price out of range: {0}")]
    PriceOutOfRange(Decimal),
    /// Fees cannot be negative
    #[error("negative fees: {0}")]
    NegativeFees(Decimal),
}

/// Tracks YES/NO inventory per market
///
/// Fills are folded into running cost bases and not retained.
#[derive(Debug, Default)]
pub struct PositionLedger {
    positions: HashMap<MarketId, MarketPosition>,
    fill_count: usize,
}

impl PositionLedger {
    /// Create an empty ledger
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a fill and return the updated side position
    pub fn apply_fill(&mut self, fill: &Fill) -> Result<SidePosition, LedgerError> {
        if fill.quantity <= Decimal::ZERO {
            return Err(LedgerError::NonPositiveQuantity(fill.quantity));
        }
        if fill.price < Decimal::ZERO || fill.price > Decimal::ONE {
            return Err(LedgerError::PriceOutOfRange(fill.price));
        }
        if fill.fees < Decimal::ZERO {
            return Err(LedgerError::NegativeFees(fill.fees));
        }

        let position = self
            .positions
            .entry(fill.market_id.clone())
            .or_insert_with(|| MarketPosition::new(fill.market_id.clone()));
        let side = position.side_mut(fill.side);
        side.add(fill.quantity, fill.price, fill.fees);
        let updated = side.clone();

        tracing::debug!(
            market = %fill.market_id,
            side = %fill.side,
            quantity = %fill.quantity,
            price = %fill.price,
            average = ?updated.average_price(),
            matched = %position.matched_pairs(),
            "Fill applied"
        );

        self.fill_count += 1;
        Ok(updated)
    }

    /// Position for a market, if any fill has been applied
    pub fn position(&self, market_id: &str) -> Option<&MarketPosition> {
        self.positions.get(market_id)
    }

    /// Snapshot of a market; flat when nothing has been filled
    pub fn snapshot(&self, market_id: &str) -> PositionSnapshot {
        self.positions
            .get(market_id)
            .map(MarketPosition::snapshot)
            .unwrap_or_else(|| PositionSnapshot::flat(market_id))
    }

    /// Snapshots of every market with inventory, ordered by market id
    pub fn snapshots(&self) -> Vec<PositionSnapshot> {
        let mut snapshots: Vec<_> = self.positions.values().map(MarketPosition::snapshot).collect();
        snapshots.sort_by(|a, b| a.market_id.cmp(&b.market_id));
        snapshots
    }

    /// Unrealized P&L for a market at the given mid prices
    pub fn unrealized_pnl(&self, market_id: &str, mid_yes: Decimal, mid_no: Decimal) -> Decimal {
        self.positions
            .get(market_id)
            .map(|p| p.unrealized_pnl(mid_yes, mid_no))
            .unwrap_or_default()
    }

    /// Cost basis committed to a market
    pub fn market_cost(&self, market_id: &str) -> Decimal {
        self.positions
            .get(market_id)
            .map(MarketPosition::total_cost)
            .unwrap_or_default()
    }

    /// Cost basis committed across all markets
    pub fn total_cost(&self) -> Decimal {
        self.positions.values().map(MarketPosition::total_cost).sum()
    }

    /// Profit guaranteed at settlement across all markets
    pub fn total_locked_profit(&self) -> Decimal {
        self.positions.values().map(MarketPosition::locked_profit).sum()
    }

    /// Number of fills applied so far
    pub fn fill_count(&self) -> usize {
        self.fill_count
    }

    /// Number of markets with inventory
    pub fn market_count(&self) -> usize {
        self.positions.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ExecutionMode;
    use crate::execution::IdempotencyKey;
    use crate::market::Side;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn fill(market: &str, side: Side, quantity: Decimal, price: Decimal) -> Fill {
        Fill {
            key: IdempotencyKey::derive(market, side, 0),
            market_id: market.to_string(),
            side,
            quantity,
            price,
            fees: dec!(0),
            timestamp: Utc::now(),
            mode: ExecutionMode::Paper,
        }
    }

    #[test]
    fn test_ledger_creation() {
        let ledger = PositionLedger::new();
        assert_eq!(ledger.market_count(), 0);
        assert_eq!(ledger.total_cost(), dec!(0));
        assert_eq!(ledger.fill_count(), 0);
    }

    #[test]
    fn test_apply_fill_returns_updated_side() {
        let mut ledger = PositionLedger::new();
        let updated = ledger
            .apply_fill(&fill("m1", Side::Yes, dec!(10), dec!(0.45)))
            .unwrap();
        assert_eq!(updated.quantity, dec!(10));
        assert_eq!(updated.average_price(), Some(dec!(0.45)));

        let updated = ledger
            .apply_fill(&fill("m1", Side::Yes, dec!(30), dec!(0.49)))
            .unwrap();
        assert_eq!(updated.quantity, dec!(40));
        // (4.5 + 14.7) / 40
        assert_eq!(updated.average_price(), Some(dec!(0.48)));
    }

    #[test]
    fn test_apply_fill_rejects_invalid() {
        let mut ledger = PositionLedger::new();
        assert_eq!(
            ledger.apply_fill(&fill("m1", Side::Yes, dec!(0), dec!(0.45))),
            Err(LedgerError::NonPositiveQuantity(dec!(0)))
        );
        assert_eq!(
            ledger.apply_fill(&fill("m1", Side::Yes, dec!(1), dec!(1.2))),
            Err(LedgerError::PriceOutOfRange(dec!(1.2)))
        );
        let mut bad_fees = fill("m1", Side::No, dec!(1), dec!(0.5));
        bad_fees.fees = dec!(-0.01);
        assert_eq!(
            ledger.apply_fill(&bad_fees),
            Err(LedgerError::NegativeFees(dec!(-0.01)))
        );
        assert_eq!(ledger.market_count(), 0);
        assert_eq!(ledger.fill_count(), 0);
    }

    #[test]
    fn test_incremental_average_matches_replay() {
        let fills = [
            (dec!(7), dec!(0.41)),
            (dec!(3), dec!(0.47)),
            (dec!(11), dec!(0.39)),
            (dec!(2.5), dec!(0.53)),
            (dec!(13), dec!(0.44)),
        ];
        let mut ledger = PositionLedger::new();
        for (qty, price) in fills {
            ledger.apply_fill(&fill("m1", Side::No, qty, price)).unwrap();
        }

        let replay_cost: Decimal = fills.iter().map(|(q, p)| q * p).sum();
        let replay_qty: Decimal = fills.iter().map(|(q, _)| *q).sum();
        let snap = ledger.snapshot("m1");
        assert_eq!(snap.no_quantity, replay_qty);
        assert_eq!(snap.no_average, Some(replay_cost / replay_qty));
    }

    #[test]
    fn test_matched_pairs_monotonic() {
        let mut ledger = PositionLedger::new();
        let mut last = dec!(0);
        for (side, qty) in [
            (Side::Yes, dec!(5)),
            (Side::No, dec!(3)),
            (Side::No, dec!(4)),
            (Side::Yes, dec!(1)),
            (Side::Yes, dec!(6)),
            (Side::No, dec!(2)),
        ] {
            ledger.apply_fill(&fill("m1", side, qty, dec!(0.48))).unwrap();
            let snap = ledger.snapshot("m1");
            assert_eq!(snap.matched_pairs, snap.yes_quantity.min(snap.no_quantity));
            assert!(snap.matched_pairs >= last);
            assert!(snap.imbalance >= dec!(0) && snap.imbalance <= dec!(1));
            last = snap.matched_pairs;
        }
        assert_eq!(last, dec!(9));
    }

    #[test]
    fn test_settlement_scenario() {
        let mut ledger = PositionLedger::new();
        ledger.apply_fill(&fill("m1", Side::Yes, dec!(10), dec!(0.45))).unwrap();
        ledger.apply_fill(&fill("m1", Side::No, dec!(10), dec!(0.52))).unwrap();

        let snap = ledger.snapshot("m1");
        assert_eq!(snap.matched_pairs, dec!(10));
        assert_eq!(snap.imbalance, dec!(0));
        assert_eq!(snap.locked_profit, dec!(0.30));
        assert_eq!(ledger.unrealized_pnl("m1", dec!(0.5), dec!(0.5)), dec!(0.30));
        assert_eq!(ledger.total_locked_profit(), dec!(0.30));
    }

    #[test]
    fn test_costs_per_market_and_total() {
        let mut ledger = PositionLedger::new();
        ledger.apply_fill(&fill("m1", Side::Yes, dec!(10), dec!(0.50))).unwrap();
        ledger.apply_fill(&fill("m2", Side::No, dec!(20), dec!(0.40))).unwrap();

        assert_eq!(ledger.market_cost("m1"), dec!(5));
        assert_eq!(ledger.market_cost("m2"), dec!(8));
        assert_eq!(ledger.market_cost("unknown"), dec!(0));
        assert_eq!(ledger.total_cost(), dec!(13));

        let snapshots = ledger.snapshots();
        assert_eq!(snapshots.len(), 2);
        assert_eq!(snapshots[0].market_id, "m1");
        assert_eq!(snapshots[1].market_id, "m2");
        assert_eq!(ledger.fill_count(), 2);
    }

    #[test]
    fn test_snapshot_unknown_market_is_flat() {
        let ledger = PositionLedger::new();
        let snap = ledger.snapshot("nope");
        assert_eq!(snap.yes_quantity, dec!(0));
        assert_eq!(snap.imbalance, dec!(0));
        assert_eq!(ledger.unrealized_pnl("nope", dec!(0.5), dec!(0.5)), dec!(0));
    }
}
