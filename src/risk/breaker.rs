//! Global circuit breaker
//!
//! CLOSED -> OPEN happens automatically on any trip condition. OPEN -> CLOSED
//! only through an explicit reset; there is no half-open probing.

use crate::telemetry::{increment_counter_with_reason, set_gauge, CounterMetric, GaugeMetric};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Why the breaker opened
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "code", rename_all = "snake_case")]
pub enum TripReason {
    DailyLossLimit { loss: Decimal, limit: Decimal },
    StaleData { asset: String, age_secs: i64 },
    OrderErrorRate { failed: usize, attempts: usize },
    FeedErrorRate { errors: usize },
    KillSwitch,
}

impl TripReason {
    /// Stable reason code for logs and metrics
    pub fn code(&self) -> &'static str {
        match self {
            TripReason::DailyLossLimit { .. } => "daily_loss_limit",
            TripReason::StaleData { .. } => "stale_data",
            TripReason::OrderErrorRate { .. } => "order_error_rate",
            TripReason::FeedErrorRate { .. } => "feed_error_rate",
            TripReason::KillSwitch => "kill_switch",
        }
    }
}

impl fmt::Display for TripReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TripReason::DailyLossLimit { loss, limit } => {
                write!(f, "daily loss {} reached limit {}", loss, limit)
            }
            TripReason::StaleData { asset, age_secs } => {
                write!(f, "no {} quote for {}s", asset, age_secs)
            }
            TripReason::OrderErrorRate { failed, attempts } => {
                write!(f, "{} of {} orders failed", failed, attempts)
            }
            TripReason::FeedErrorRate { errors } => {
                write!(f, "{} malformed feed events in the last minute", errors)
            }
            TripReason::KillSwitch => write!(f, "manual kill switch"),
        }
    }
}

/// Breaker state
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum BreakerState {
    #[default]
    Closed,
    Open {
        reason: TripReason,
        tripped_at: DateTime<Utc>,
    },
}

impl BreakerState {
    pub fn is_open(&self) -> bool {
        matches!(self, BreakerState::Open { .. })
    }

    pub fn reason(&self) -> Option<&TripReason> {
        match self {
            BreakerState::Open { reason, .. } => Some(reason),
            BreakerState::Closed => None,
        }
    }
}

/// Process-wide halt switch
#[derive(Debug, Default)]
pub struct CircuitBreaker {
    state: BreakerState,
    trips: u64,
}

impl CircuitBreaker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &BreakerState {
        &self.state
    }

    pub fn is_open(&self) -> bool {
        self.state.is_open()
    }

    /// Number of CLOSED -> OPEN transitions since start
    pub fn trips(&self) -> u64 {
        self.trips
    }

    /// Open the breaker; returns false if it was already open
    ///
    /// The first reason is kept while open.
    pub fn trip(&mut self, reason: TripReason, now: DateTime<Utc>) -> bool {
        if self.is_open() {
            return false;
        }
        tracing::error!(
            reason = reason.code(),
            detail = %reason,
            "Circuit breaker tripped, halting all markets"
        );
        increment_counter_with_reason(CounterMetric::BreakerTrips, reason.code());
        set_gauge(GaugeMetric::BreakerOpen, 1.0);
        self.state = BreakerState::Open {
            reason,
            tripped_at: now,
        };
        self.trips += 1;
        true
    }

    /// Close the breaker; returns the reason it was open for, if any
    pub fn reset(&mut self) -> Option<TripReason> {
        match std::mem::take(&mut self.state) {
            BreakerState::Open { reason, tripped_at } => {
                tracing::warn!(
                    reason = reason.code(),
                    tripped_at = %tripped_at,
                    "Circuit breaker reset"
                );
                set_gauge(GaugeMetric::BreakerOpen, 0.0);
                Some(reason)
            }
            BreakerState::Closed => None,
        }
    }
}
