//! Strategy parameters and signal types

use crate::market::Side;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Pair-cost strategy parameters
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StrategyParams {
    /// Maximum hypothetical pair cost for an entry
    #[serde(default = "default_pair_cost_threshold")]
    pub pair_cost_threshold: Decimal,
    /// Shares per entry
    #[serde(default = "default_order_size")]
    pub order_size: Decimal,
    /// Minimum size at the best ask on both sides
    #[serde(default = "default_min_liquidity")]
    pub min_liquidity: Decimal,
    /// Maximum |yes - no| / (yes + no) after an entry
    #[serde(default = "default_max_imbalance")]
    pub max_imbalance: Decimal,
    /// No new entries this close to the window end
    #[serde(default = "default_expiry_safety_margin_secs")]
    pub expiry_safety_margin_secs: u64,
    #[serde(default = "default_slippage_buffer")]
    pub slippage_buffer: Decimal,
    #[serde(default = "default_safety_margin")]
    pub safety_margin: Decimal,
    /// Extra margin on markets that charge fees
    #[serde(default = "default_fee_enabled_extra_margin")]
    pub fee_enabled_extra_margin: Decimal,
}

fn default_pair_cost_threshold() -> Decimal {
    dec!(0.99)
}

fn default_order_size() -> Decimal {
    dec!(5)
}

fn default_min_liquidity() -> Decimal {
    dec!(10)
}

fn default_max_imbalance() -> Decimal {
    dec!(0.3)
}

fn default_expiry_safety_margin_secs() -> u64 {
    60
}

fn default_slippage_buffer() -> Decimal {
    dec!(0.002)
}

fn default_safety_margin() -> Decimal {
    dec!(0.001)
}

fn default_fee_enabled_extra_margin() -> Decimal {
    dec!(0.01)
}

impl Default for StrategyParams {
    fn default() -> Self {
        Self {
            pair_cost_threshold: default_pair_cost_threshold(),
            order_size: default_order_size(),
            min_liquidity: default_min_liquidity(),
            max_imbalance: default_max_imbalance(),
            expiry_safety_margin_secs: default_expiry_safety_margin_secs(),
            slippage_buffer: default_slippage_buffer(),
            safety_margin: default_safety_margin(),
            fee_enabled_extra_margin: default_fee_enabled_extra_margin(),
        }
    }
}

/// A proposed entry on one side
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    /// Limit price (the current best ask)
    pub price: Decimal,
    /// Shares to buy
    pub size: Decimal,
    /// Pair cost the position would have after the fill
    pub pair_cost: Decimal,
    /// Threshold the pair cost was checked against
    pub threshold: Decimal,
}

/// Output of a strategy evaluation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Signal {
    BuyYes(Entry),
    BuyNo(Entry),
    Hold(HoldReason),
}

impl Signal {
    /// Build a buy signal for a side
    pub fn buy(side: Side, entry: Entry) -> Self {
        match side {
            Side::Yes => Signal::BuyYes(entry),
            Side::No => Signal::BuyNo(entry),
        }
    }

    /// Side to buy, if any
    pub fn side(&self) -> Option<Side> {
        match self {
            Signal::BuyYes(_) => Some(Side::Yes),
            Signal::BuyNo(_) => Some(Side::No),
            Signal::Hold(_) => None,
        }
    }

    pub fn entry(&self) -> Option<&Entry> {
        match self {
            Signal::BuyYes(entry) | Signal::BuyNo(entry) => Some(entry),
            Signal::Hold(_) => None,
        }
    }

    pub fn is_hold(&self) -> bool {
        matches!(self, Signal::Hold(_))
    }
}

/// Why an evaluation produced no entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum HoldReason {
    /// Side has no ask strictly between 0 and 1
    NoValidAsk(Side),
    /// Size at the best ask below `min_liquidity`
    InsufficientLiquidity { side: Side, size: Decimal },
    /// Inside the expiry safety margin (or expired)
    NearExpiry,
    /// No side keeps pair cost under the threshold
    AboveThreshold { best_pair_cost: Decimal },
    /// A side is cheap enough but would breach `max_imbalance`
    ImbalanceLimit(Side),
}

impl HoldReason {
    /// Short label for logs and metrics
    pub fn as_str(&self) -> &'static str {
        match self {
            HoldReason::NoValidAsk(_) => "no_valid_ask",
            HoldReason::InsufficientLiquidity { .. } => "insufficient_liquidity",
            HoldReason::NearExpiry => "near_expiry",
            HoldReason::AboveThreshold { .. } => "above_threshold",
            HoldReason::ImbalanceLimit(_) => "imbalance_limit",
        }
    }
}

impl fmt::Display for HoldReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HoldReason::NoValidAsk(side) => write!(f, "no valid {} ask", side),
            HoldReason::InsufficientLiquidity { side, size } => {
                write!(f, "{} liquidity {} below minimum", side, size)
            }
            HoldReason::NearExpiry => write!(f, "inside expiry safety margin"),
            HoldReason::AboveThreshold { best_pair_cost } => {
                write!(f, "best pair cost {} not below threshold", best_pair_cost)
            }
            HoldReason::ImbalanceLimit(side) => {
                write!(f, "buying {} would exceed max imbalance", side)
            }
        }
    }
}
