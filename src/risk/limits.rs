//! Risk limits

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;

/// Loss, exposure, freshness and error-rate limits
#[derive(Debug, Clone, Deserialize)]
pub struct RiskLimits {
    /// Daily loss (USD) at which the breaker trips
    #[serde(default = "default_max_daily_loss")]
    pub max_daily_loss: Decimal,
    /// Maximum cost basis (USD) held in one market
    #[serde(default = "default_max_position_per_market")]
    pub max_position_per_market: Decimal,
    /// Maximum cost basis (USD) held across all markets
    #[serde(default = "default_max_position_total")]
    pub max_position_total: Decimal,
    /// Seconds without a quote for an asset before the breaker trips
    #[serde(default = "default_stale_data_timeout_secs")]
    pub stale_data_timeout_secs: u64,
    #[serde(default = "default_max_orders_per_minute")]
    pub max_orders_per_minute: u32,
    /// Failed / attempted orders in the error window that trips the breaker
    #[serde(default = "default_max_order_error_rate")]
    pub max_order_error_rate: Decimal,
    #[serde(default = "default_error_rate_window_secs")]
    pub error_rate_window_secs: u64,
    /// Attempts required in the window before the error rate is considered
    #[serde(default = "default_min_orders_for_error_rate")]
    pub min_orders_for_error_rate: u32,
    #[serde(default = "default_max_feed_errors_per_minute")]
    pub max_feed_errors_per_minute: u32,
    /// Pause on new entries after an order failure
    #[serde(default = "default_cooldown_after_error_secs")]
    pub cooldown_after_error_secs: u64,
}

fn default_max_daily_loss() -> Decimal {
    dec!(50)
}

fn default_max_position_per_market() -> Decimal {
    dec!(100)
}

fn default_max_position_total() -> Decimal {
    dec!(500)
}

fn default_stale_data_timeout_secs() -> u64 {
    60
}

fn default_max_orders_per_minute() -> u32 {
    50
}

fn default_max_order_error_rate() -> Decimal {
    dec!(0.5)
}

fn default_error_rate_window_secs() -> u64 {
    300
}

fn default_min_orders_for_error_rate() -> u32 {
    4
}

fn default_max_feed_errors_per_minute() -> u32 {
    20
}

fn default_cooldown_after_error_secs() -> u64 {
    30
}

impl Default for RiskLimits {
    fn default() -> Self {
        Self {
            max_daily_loss: default_max_daily_loss(),
            max_position_per_market: default_max_position_per_market(),
            max_position_total: default_max_position_total(),
            stale_data_timeout_secs: default_stale_data_timeout_secs(),
            max_orders_per_minute: default_max_orders_per_minute(),
            max_order_error_rate: default_max_order_error_rate(),
            error_rate_window_secs: default_error_rate_window_secs(),
            min_orders_for_error_rate: default_min_orders_for_error_rate(),
            max_feed_errors_per_minute: default_max_feed_errors_per_minute(),
            cooldown_after_error_secs: default_cooldown_after_error_secs(),
        }
    }
}
