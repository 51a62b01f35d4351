//! Quote module
//!
//! Top-of-book quotes for each side of a market

mod book;

pub use book::{Quote, QuoteBook};
