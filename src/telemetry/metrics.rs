//! Prometheus metrics

use metrics_exporter_prometheus::PrometheusBuilder;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::net::SocketAddr;

/// Gauge metric types
#[derive(Debug, Clone, Copy)]
pub enum GaugeMetric {
    /// Realized plus mark-to-market P&L for the current day
    DailyPnl,
    /// Mark-to-market P&L across markets
    UnrealizedPnl,
    /// Loss counted against max_daily_loss
    DailyLoss,
    /// Total cost basis held
    TotalExposure,
    /// 1 while the circuit breaker is open
    BreakerOpen,
    /// Submissions in the trailing minute
    OrdersLastMinute,
    /// Matched YES/NO pairs across markets
    MatchedPairs,
    /// Profit guaranteed at settlement
    LockedProfit,
}

/// Counter metric types
#[derive(Debug, Clone, Copy)]
pub enum CounterMetric {
    /// Fills applied to the ledger
    Fills,
    /// Pre-trade checks rejected, labelled by reason
    PreTradeRejections,
    /// Dispatches deferred by the rate limiter
    DeferredDispatches,
    /// Dispatches suppressed as duplicates
    DuplicateDispatches,
    /// Failed or rejected orders
    OrderFailures,
    /// Breaker trips, labelled by reason
    BreakerTrips,
    /// Feed events that failed to parse or validate
    MalformedFeedEvents,
    /// Execution reports refused by the dispatcher, labelled by reason
    IgnoredReports,
}

impl GaugeMetric {
    fn name(self) -> &'static str {
        match self {
            GaugeMetric::DailyPnl => "parity_arb_daily_pnl_usd",
            GaugeMetric::UnrealizedPnl => "parity_arb_unrealized_pnl_usd",
            GaugeMetric::DailyLoss => "parity_arb_daily_loss_usd",
            GaugeMetric::TotalExposure => "parity_arb_total_exposure_usd",
            GaugeMetric::BreakerOpen => "parity_arb_breaker_open",
            GaugeMetric::OrdersLastMinute => "parity_arb_orders_last_minute",
            GaugeMetric::MatchedPairs => "parity_arb_matched_pairs",
            GaugeMetric::LockedProfit => "parity_arb_locked_profit_usd",
        }
    }
}

impl CounterMetric {
    fn name(self) -> &'static str {
        match self {
            CounterMetric::Fills => "parity_arb_fills_total",
            CounterMetric::PreTradeRejections => "parity_arb_pretrade_rejections_total",
            CounterMetric::DeferredDispatches => "parity_arb_deferred_dispatches_total",
            CounterMetric::DuplicateDispatches => "parity_arb_duplicate_dispatches_total",
            CounterMetric::OrderFailures => "parity_arb_order_failures_total",
            CounterMetric::BreakerTrips => "parity_arb_breaker_trips_total",
            CounterMetric::MalformedFeedEvents => "parity_arb_malformed_feed_events_total",
            CounterMetric::IgnoredReports => "parity_arb_ignored_reports_total",
        }
    }
}

/// Start the Prometheus scrape endpoint on the given port
pub fn init_metrics(port: u16) -> anyhow::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| anyhow::anyhow!("Failed to start metrics exporter: {}", e))?;
    tracing::info!(%addr, "Metrics exporter listening");
    Ok(())
}

/// Set a gauge value
pub fn set_gauge(metric: GaugeMetric, value: f64) {
    ::metrics::gauge!(metric.name()).set(value);
}

/// Set a gauge from a decimal amount
pub fn set_gauge_decimal(metric: GaugeMetric, value: Decimal) {
    set_gauge(metric, value.to_f64().unwrap_or_default());
}

/// Increment a counter by one
pub fn increment_counter(metric: CounterMetric) {
    ::metrics::counter!(metric.name()).increment(1);
}

/// Increment a counter by one under a `reason` label
pub fn increment_counter_with_reason(metric: CounterMetric, reason: &'static str) {
    ::metrics::counter!(metric.name(), "reason" => reason).increment(1);
}
