//! parity-arb: pair-cost arbitrage engine for binary YES/NO markets
//!
//! Buys YES and NO shares of the same market whenever the combined average
//! cost of a pair stays below 1.00, locking in the difference at settlement.
//!
//! This library provides the core components for:
//! - Quote ingestion from a JSON-lines feed
//! - Per-market YES/NO position ledger with exact average costs
//! - Stateless pair-cost entry strategy
//! - Risk management with a global circuit breaker
//! - Idempotent, rate-limited order dispatch (paper or live)
//! - A serialized engine loop with kill switch, reset and status
//! - Structured logging and Prometheus metrics

pub mod cli;
pub mod config;
pub mod engine;
pub mod execution;
pub mod feed;
pub mod market;
pub mod position;
pub mod quote;
pub mod risk;
pub mod strategy;
pub mod telemetry;
