//! Risk manager
//!
//! Single authority for "is trading safe". Holds the circuit breaker, the
//! daily loss counter, feed freshness and error windows behind one lock so
//! every trip, reset and approval is serialized.

use super::breaker::{BreakerState, CircuitBreaker, TripReason};
use super::daily::DailyLossCounter;
use super::limits::RiskLimits;
use super::types::{RiskError, RiskStatus};
use super::window::RollingWindow;
use crate::config::duration_secs;
use crate::execution::OrderRequest;
use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use std::collections::HashMap;

const FEED_ERROR_WINDOW_SECS: i64 = 60;

struct RiskState {
    limits: RiskLimits,
    breaker: CircuitBreaker,
    daily: DailyLossCounter,
    /// Last quote receipt per asset
    freshness: HashMap<String, DateTime<Utc>>,
    orders: RollingWindow,
    feed_errors: RollingWindow,
    cooldown_until: Option<DateTime<Utc>>,
}

impl RiskState {
    fn check_trips(&mut self, now: DateTime<Utc>) -> Option<TripReason> {
        self.daily.roll(now);

        let loss = self.daily.daily_loss();
        if loss >= self.limits.max_daily_loss {
            return Some(TripReason::DailyLossLimit {
                loss,
                limit: self.limits.max_daily_loss,
            });
        }

        let timeout = duration_secs(self.limits.stale_data_timeout_secs);
        let stalest = self
            .freshness
            .iter()
            .filter(|(_, last)| now - **last > timeout)
            .min_by(|a, b| a.1.cmp(b.1).then_with(|| a.0.cmp(b.0)));
        if let Some((asset, last)) = stalest {
            return Some(TripReason::StaleData {
                asset: asset.clone(),
                age_secs: (now - *last).num_seconds(),
            });
        }

        let attempts = self.orders.count(now);
        if attempts > 0 && attempts >= self.limits.min_orders_for_error_rate as usize {
            let failed = self.orders.failures(now);
            let rate = Decimal::from(failed) / Decimal::from(attempts);
            if rate > self.limits.max_order_error_rate {
                return Some(TripReason::OrderErrorRate { failed, attempts });
            }
        }

        let errors = self.feed_errors.count(now);
        if errors > self.limits.max_feed_errors_per_minute as usize {
            return Some(TripReason::FeedErrorRate { errors });
        }

        None
    }

    fn evaluate(&mut self, now: DateTime<Utc>) {
        if self.breaker.is_open() {
            return;
        }
        if let Some(reason) = self.check_trips(now) {
            self.breaker.trip(reason, now);
        }
    }
}

/// Gatekeeper shared between the engine loop and its control handle
pub struct RiskManager {
    state: Mutex<RiskState>,
}

impl RiskManager {
    pub fn new(limits: RiskLimits, now: DateTime<Utc>) -> Self {
        let error_window = duration_secs(limits.error_rate_window_secs);
        Self {
            state: Mutex::new(RiskState {
                limits,
                breaker: CircuitBreaker::new(),
                daily: DailyLossCounter::new(now),
                freshness: HashMap::new(),
                orders: RollingWindow::new(error_window),
                feed_errors: RollingWindow::new(Duration::seconds(FEED_ERROR_WINDOW_SECS)),
                cooldown_until: None,
            }),
        }
    }

    pub fn limits(&self) -> RiskLimits {
        self.state.lock().limits.clone()
    }

    /// Start the staleness clock for an asset that has not quoted yet
    pub fn watch_asset(&self, asset: &str, now: DateTime<Utc>) {
        self.state
            .lock()
            .freshness
            .entry(asset.to_string())
            .or_insert(now);
    }

    /// Record that a quote for `asset` was received
    pub fn record_quote(&self, asset: &str, received_at: DateTime<Utc>) {
        let mut state = self.state.lock();
        let last = state
            .freshness
            .entry(asset.to_string())
            .or_insert(received_at);
        if received_at > *last {
            *last = received_at;
        }
    }

    /// Record a malformed feed event
    pub fn record_feed_error(&self, now: DateTime<Utc>) {
        self.state.lock().feed_errors.record(now, true);
    }

    /// Record the final outcome of an order attempt
    pub fn record_order_result(&self, succeeded: bool, now: DateTime<Utc>) {
        let mut state = self.state.lock();
        state.orders.record(now, !succeeded);
        if !succeeded {
            let cooldown = duration_secs(state.limits.cooldown_after_error_secs);
            state.cooldown_until = Some(now + cooldown);
        }
    }

    /// Add realized P&L for the day (fees are negative)
    pub fn record_realized(&self, amount: Decimal, now: DateTime<Utc>) {
        let mut state = self.state.lock();
        state.daily.roll(now);
        state.daily.record_realized(amount);
    }

    /// Replace a market's mark-to-market P&L
    pub fn mark_to_market(&self, market_id: &str, unrealized: Decimal, now: DateTime<Utc>) {
        let mut state = self.state.lock();
        state.daily.roll(now);
        state.daily.mark(market_id, unrealized);
    }

    /// Check every trip condition, opening the breaker if any holds
    pub fn evaluate(&self, now: DateTime<Utc>) -> BreakerState {
        let mut state = self.state.lock();
        state.evaluate(now);
        state.breaker.state().clone()
    }

    /// Manual kill switch; returns false if already halted
    pub fn kill(&self, now: DateTime<Utc>) -> bool {
        self.state.lock().breaker.trip(TripReason::KillSwitch, now)
    }

    /// Explicit reset after review
    ///
    /// Clears the error windows and cooldown. Loss and freshness are kept, so
    /// a condition that still holds trips again on the next evaluation.
    pub fn reset(&self) -> Option<TripReason> {
        let mut state = self.state.lock();
        let previous = state.breaker.reset();
        if previous.is_some() {
            state.orders.clear();
            state.feed_errors.clear();
            state.cooldown_until = None;
        }
        previous
    }

    pub fn is_trading_allowed(&self) -> bool {
        !self.state.lock().breaker.is_open()
    }

    pub fn breaker_state(&self) -> BreakerState {
        self.state.lock().breaker.state().clone()
    }

    pub fn daily_pnl(&self) -> Decimal {
        self.state.lock().daily.daily_pnl()
    }

    /// Approve or reject an order
    ///
    /// `market_cost` and `total_cost` are the current cost bases; limits
    /// apply to the cost basis after the order. Never mutates positions.
    pub fn pre_trade_check(
        &self,
        request: &OrderRequest,
        market_cost: Decimal,
        total_cost: Decimal,
        has_rate_capacity: bool,
        now: DateTime<Utc>,
    ) -> Result<(), RiskError> {
        let mut state = self.state.lock();
        state.evaluate(now);
        if let Some(reason) = state.breaker.state().reason() {
            return Err(RiskError::BreakerOpen(reason.clone()));
        }

        if let Some(until) = state.cooldown_until {
            if now < until {
                return Err(RiskError::Cooldown {
                    remaining_secs: (until - now).num_seconds(),
                });
            }
            state.cooldown_until = None;
        }

        let notional = request.quantity * request.limit_price;
        let projected_market = market_cost + notional;
        if projected_market > state.limits.max_position_per_market {
            return Err(RiskError::MarketLimit {
                market_id: request.market_id.clone(),
                projected: projected_market,
                limit: state.limits.max_position_per_market,
            });
        }

        let projected_total = total_cost + notional;
        if projected_total > state.limits.max_position_total {
            return Err(RiskError::TotalLimit {
                projected: projected_total,
                limit: state.limits.max_position_total,
            });
        }

        if !has_rate_capacity {
            return Err(RiskError::RateLimited);
        }

        Ok(())
    }

    pub fn status(&self, now: DateTime<Utc>) -> RiskStatus {
        let mut state = self.state.lock();
        state.daily.roll(now);
        let mut last_quote: Vec<(String, DateTime<Utc>)> = state
            .freshness
            .iter()
            .map(|(asset, at)| (asset.clone(), *at))
            .collect();
        last_quote.sort();
        RiskStatus {
            breaker: state.breaker.state().clone(),
            trips: state.breaker.trips(),
            daily_pnl: state.daily.daily_pnl(),
            daily_loss: state.daily.daily_loss(),
            realized_pnl: state.daily.realized(),
            unrealized_pnl: state.daily.unrealized(),
            order_attempts: state.orders.count(now),
            order_failures: state.orders.failures(now),
            feed_errors_last_minute: state.feed_errors.count(now),
            last_quote,
            cooldown_until: state.cooldown_until.filter(|until| *until > now),
        }
    }
}
