//! Position types

use crate::market::{MarketId, Side};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Inventory held on one side of a market
///
/// The cost basis is stored as a running total rather than an average so
/// that the average is always exactly `cost_basis / quantity`, identical to
/// replaying every fill from scratch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SidePosition {
    /// Shares held
    pub quantity: Decimal,
    /// Total amount paid for the shares held
    pub cost_basis: Decimal,
    /// Fees paid on fills for this side
    pub fees: Decimal,
}

impl SidePosition {
    /// Volume-weighted average cost; undefined while flat
    pub fn average_price(&self) -> Option<Decimal> {
        if self.quantity.is_zero() {
            return None;
        }
        Some(self.cost_basis / self.quantity)
    }

    /// Add shares bought at `price`
    ///
    /// Equivalent to `new_avg = (old_avg * old_qty + price * qty) / (old_qty + qty)`.
    pub fn add(&mut self, quantity: Decimal, price: Decimal, fees: Decimal) {
        self.quantity += quantity;
        self.cost_basis += quantity * price;
        self.fees += fees;
    }

    /// True when no shares are held
    pub fn is_flat(&self) -> bool {
        self.quantity.is_zero()
    }
}

/// YES and NO inventory for one market
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketPosition {
    /// Market identifier
    pub market_id: MarketId,
    /// YES inventory
    pub yes: SidePosition,
    /// NO inventory
    pub no: SidePosition,
}

impl MarketPosition {
    /// Create a flat position
    pub fn new(market_id: impl Into<String>) -> Self {
        Self {
            market_id: market_id.into(),
            yes: SidePosition::default(),
            no: SidePosition::default(),
        }
    }

    /// Inventory for a side
    pub fn side(&self, side: Side) -> &SidePosition {
        match side {
            Side::Yes => &self.yes,
            Side::No => &self.no,
        }
    }

    pub(crate) fn side_mut(&mut self, side: Side) -> &mut SidePosition {
        match side {
            Side::Yes => &mut self.yes,
            Side::No => &mut self.no,
        }
    }

    /// Number of complete YES+NO pairs
    pub fn matched_pairs(&self) -> Decimal {
        self.yes.quantity.min(self.no.quantity)
    }

    /// Shares on `side` without a counterpart
    pub fn unmatched(&self, side: Side) -> Decimal {
        self.side(side).quantity - self.matched_pairs()
    }

    /// Total shares across both sides
    pub fn total_shares(&self) -> Decimal {
        self.yes.quantity + self.no.quantity
    }

    /// `|yes - no| / (yes + no)`, 0 when flat
    pub fn imbalance(&self) -> Decimal {
        imbalance_of(self.yes.quantity, self.no.quantity)
    }

    /// Imbalance after hypothetically adding `quantity` to `side`
    pub fn imbalance_after(&self, side: Side, quantity: Decimal) -> Decimal {
        match side {
            Side::Yes => imbalance_of(self.yes.quantity + quantity, self.no.quantity),
            Side::No => imbalance_of(self.yes.quantity, self.no.quantity + quantity),
        }
    }

    /// Smaller side over larger side; 1 when flat
    pub fn balance_ratio(&self) -> Decimal {
        let larger = self.yes.quantity.max(self.no.quantity);
        if larger.is_zero() {
            return Decimal::ONE;
        }
        self.yes.quantity.min(self.no.quantity) / larger
    }

    /// Average YES cost plus average NO cost, once both sides are held
    pub fn pair_cost(&self) -> Option<Decimal> {
        Some(self.yes.average_price()? + self.no.average_price()?)
    }

    /// Cost basis attributable to matched pairs
    pub fn matched_cost_basis(&self) -> Decimal {
        let matched = self.matched_pairs();
        let yes_avg = self.yes.average_price().unwrap_or_default();
        let no_avg = self.no.average_price().unwrap_or_default();
        matched * (yes_avg + no_avg)
    }

    /// Profit guaranteed at settlement by the matched pairs
    pub fn locked_profit(&self) -> Decimal {
        self.matched_pairs() * Decimal::ONE - self.matched_cost_basis()
    }

    /// Total cost basis across both sides
    pub fn total_cost(&self) -> Decimal {
        self.yes.cost_basis + self.no.cost_basis
    }

    /// Total fees paid across both sides
    pub fn total_fees(&self) -> Decimal {
        self.yes.fees + self.no.fees
    }

    /// Unrealized P&L at the given mid prices
    ///
    /// Matched pairs are valued at their settlement payout of 1.00; only the
    /// unmatched remainder is marked to market.
    pub fn unrealized_pnl(&self, mid_yes: Decimal, mid_no: Decimal) -> Decimal {
        let mut pnl = self.locked_profit();
        for (side, mid) in [(Side::Yes, mid_yes), (Side::No, mid_no)] {
            let unmatched = self.unmatched(side);
            if let Some(avg) = self.side(side).average_price() {
                pnl += unmatched * (mid - avg);
            }
        }
        pnl
    }

    /// Point-in-time summary
    pub fn snapshot(&self) -> PositionSnapshot {
        PositionSnapshot {
            market_id: self.market_id.clone(),
            yes_quantity: self.yes.quantity,
            yes_average: self.yes.average_price(),
            no_quantity: self.no.quantity,
            no_average: self.no.average_price(),
            matched_pairs: self.matched_pairs(),
            imbalance: self.imbalance(),
            balance_ratio: self.balance_ratio(),
            pair_cost: self.pair_cost(),
            locked_profit: self.locked_profit(),
            total_cost: self.total_cost(),
            fees: self.total_fees(),
        }
    }
}

fn imbalance_of(yes: Decimal, no: Decimal) -> Decimal {
    let total = yes + no;
    if total.is_zero() {
        return Decimal::ZERO;
    }
    (yes - no).abs() / total
}

/// Read-only view of a market position handed to the strategy and status
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionSnapshot {
    pub market_id: MarketId,
    pub yes_quantity: Decimal,
    pub yes_average: Option<Decimal>,
    pub no_quantity: Decimal,
    pub no_average: Option<Decimal>,
    pub matched_pairs: Decimal,
    pub imbalance: Decimal,
    pub balance_ratio: Decimal,
    pub pair_cost: Option<Decimal>,
    /// Profit guaranteed by matched pairs at settlement
    pub locked_profit: Decimal,
    pub total_cost: Decimal,
    pub fees: Decimal,
}

impl PositionSnapshot {
    /// Snapshot of a market with no inventory
    pub fn flat(market_id: impl Into<String>) -> Self {
        MarketPosition::new(market_id).snapshot()
    }

    /// Quantity held on a side
    pub fn quantity(&self, side: Side) -> Decimal {
        match side {
            Side::Yes => self.yes_quantity,
            Side::No => self.no_quantity,
        }
    }

    /// Average cost on a side, if held
    pub fn average(&self, side: Side) -> Option<Decimal> {
        match side {
            Side::Yes => self.yes_average,
            Side::No => self.no_average,
        }
    }

    /// Imbalance after hypothetically adding `quantity` to `side`
    pub fn imbalance_after(&self, side: Side, quantity: Decimal) -> Decimal {
        match side {
            Side::Yes => imbalance_of(self.yes_quantity + quantity, self.no_quantity),
            Side::No => imbalance_of(self.yes_quantity, self.no_quantity + quantity),
        }
    }

    /// Unmatched shares on `side` after hypothetically adding `quantity` to it
    pub fn unmatched_after(&self, side: Side, quantity: Decimal) -> Decimal {
        let own = self.quantity(side) + quantity;
        let other = self.quantity(side.other());
        (own - other).max(Decimal::ZERO)
    }
}
