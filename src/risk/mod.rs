//! Risk management module
//!
//! Circuit breaker, daily loss, feed freshness and pre-trade limits

mod breaker;
mod daily;
mod limits;
mod manager;
mod types;
mod window;

pub use breaker::{BreakerState, CircuitBreaker, TripReason};
pub use daily::DailyLossCounter;
pub use limits::RiskLimits;
pub use manager::RiskManager;
pub use types::{RiskError, RiskStatus};
pub use window::RollingWindow;
