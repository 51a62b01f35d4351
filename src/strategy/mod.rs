//! Entry signal generation
//!
//! Evaluates latest quotes and the current position of a market

mod engine;
mod types;

pub use engine::StrategyEngine;
pub use types::{Entry, HoldReason, Signal, StrategyParams};
