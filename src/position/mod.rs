//! Position ledger module
//!
//! Per-market YES/NO inventory and cost-basis bookkeeping

mod ledger;
mod types;

pub use ledger::{LedgerError, PositionLedger};
pub use types::{MarketPosition, PositionSnapshot, SidePosition};
