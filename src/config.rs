//! Configuration types for parity-arb
//!
//! Loaded once at startup from TOML, validated, then treated as immutable.

use crate::market::Market;
use crate::risk::RiskLimits;
use crate::strategy::StrategyParams;
use crate::telemetry::LogFormat;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use thiserror::Error;

/// Hard ceiling on `max_position_per_market` regardless of config
pub const ABSOLUTE_MAX_POSITION: Decimal = dec!(1000);
/// Hard ceiling on `max_daily_loss` regardless of config
pub const ABSOLUTE_MAX_DAILY_LOSS: Decimal = dec!(200);
/// Environment variable that must be `true` for live mode to take effect
pub const LIVE_TRADING_ENV: &str = "LIVE_TRADING";
/// Environment variable holding the signing key for live trading
pub const PRIVATE_KEY_ENV: &str = "POLYMARKET_PRIVATE_KEY";
/// Upper bound on every duration setting, in seconds
pub const MAX_DURATION_SECS: u64 = 86_400;

/// Duration setting as a chrono span, clamped to `MAX_DURATION_SECS`
pub fn duration_secs(secs: u64) -> chrono::Duration {
    chrono::Duration::seconds(secs.min(MAX_DURATION_SECS) as i64)
}

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub execution: ExecutionConfig,
    #[serde(default)]
    pub strategy: StrategyParams,
    #[serde(default)]
    pub risk: RiskLimits,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
    /// Markets to trade
    #[serde(default)]
    pub markets: Vec<Market>,
}

/// Execution configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ExecutionConfig {
    /// Paper or live
    #[serde(default)]
    pub mode: ExecutionMode,
    /// Simulated fee rate applied to paper fills
    #[serde(default)]
    pub fee_rate: Decimal,
    /// Width of the idempotency key time bucket
    #[serde(default = "default_idempotency_window_secs")]
    pub idempotency_window_secs: u64,
    /// A live intent with no report after this long is expired and cancelled
    #[serde(default = "default_pending_timeout_secs")]
    pub pending_timeout_secs: u64,
}

/// Execution mode: paper trading or live
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    #[default]
    Paper,
    Live,
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionMode::Paper => write!(f, "paper"),
            ExecutionMode::Live => write!(f, "live"),
        }
    }
}

fn default_idempotency_window_secs() -> u64 {
    5
}

fn default_pending_timeout_secs() -> u64 {
    120
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            mode: ExecutionMode::Paper,
            fee_rate: Decimal::ZERO,
            idempotency_window_secs: default_idempotency_window_secs(),
            pending_timeout_secs: default_pending_timeout_secs(),
        }
    }
}

/// Engine loop configuration
#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    /// Interval of the periodic breaker/status tick
    #[serde(default = "default_tick_interval_secs")]
    pub tick_interval_secs: u64,
}

fn default_tick_interval_secs() -> u64 {
    60
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tick_interval_secs: default_tick_interval_secs(),
        }
    }
}

/// Telemetry configuration
#[derive(Debug, Clone, Deserialize)]
pub struct TelemetryConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub log_format: LogFormat,
    /// Prometheus exporter port; no exporter when unset
    #[serde(default)]
    pub metrics_port: Option<u16>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: LogFormat::default(),
            metrics_port: None,
        }
    }
}

/// Startup configuration errors; all are fatal
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// TOML could not be parsed
    #[error("failed to parse config: {0}")]
    Parse(String),
    /// Parameter outside its allowed range
    #[error("invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
    /// Market with an empty id
    #[error("market id must not be empty")]
    EmptyMarketId,
    /// Two markets share an id
    #[error("duplicate market id: {0}")]
    DuplicateMarket(String),
    /// Live mode without a signing credential
    #[error("missing credential: {0} must be set for live trading")]
    MissingCredential(&'static str),
    /// Credential present but malformed
    #[error("invalid credential: {0} must be 0x followed by 64 hex characters")]
    InvalidCredential(&'static str),
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.into(),
    }
}

impl Config {
    /// Load and validate configuration from a TOML file
    pub fn load(path: impl AsRef<std::path::Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = Self::parse(&content)?;
        Ok(config)
    }

    /// Parse and validate configuration from TOML text
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: Config =
            toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Apply the environment: live-trading gate, then credential check
    pub fn apply_environment(self) -> Result<Self, ConfigError> {
        let config = self.apply_live_gate(std::env::var(LIVE_TRADING_ENV).ok().as_deref());
        config.check_credentials(std::env::var(PRIVATE_KEY_ENV).ok().as_deref())?;
        Ok(config)
    }

    /// Check every parameter range
    pub fn validate(&self) -> Result<(), ConfigError> {
        let s = &self.strategy;
        if s.pair_cost_threshold < dec!(0.90) || s.pair_cost_threshold >= Decimal::ONE {
            return Err(invalid("pair_cost_threshold", "must be in [0.90, 1.00)"));
        }
        if s.order_size <= Decimal::ZERO {
            return Err(invalid("order_size", "must be positive"));
        }
        if s.min_liquidity < Decimal::ZERO {
            return Err(invalid("min_liquidity", "must not be negative"));
        }
        if s.max_imbalance <= Decimal::ZERO || s.max_imbalance > Decimal::ONE {
            return Err(invalid("max_imbalance", "must be in (0, 1]"));
        }
        for (field, value) in [
            ("slippage_buffer", s.slippage_buffer),
            ("safety_margin", s.safety_margin),
            ("fee_enabled_extra_margin", s.fee_enabled_extra_margin),
        ] {
            if value < Decimal::ZERO || value >= dec!(0.1) {
                return Err(invalid(field, "must be in [0, 0.1)"));
            }
        }

        let r = &self.risk;
        if r.max_daily_loss <= Decimal::ZERO || r.max_daily_loss > ABSOLUTE_MAX_DAILY_LOSS {
            return Err(invalid(
                "max_daily_loss",
                format!("must be in (0, {ABSOLUTE_MAX_DAILY_LOSS}]"),
            ));
        }
        if r.max_position_per_market <= Decimal::ZERO
            || r.max_position_per_market > ABSOLUTE_MAX_POSITION
        {
            return Err(invalid(
                "max_position_per_market",
                format!("must be in (0, {ABSOLUTE_MAX_POSITION}]"),
            ));
        }
        if r.max_position_total < r.max_position_per_market {
            return Err(invalid(
                "max_position_total",
                "must be at least max_position_per_market",
            ));
        }
        if r.max_orders_per_minute == 0 {
            return Err(invalid("max_orders_per_minute", "must be positive"));
        }
        if r.max_order_error_rate <= Decimal::ZERO || r.max_order_error_rate > Decimal::ONE {
            return Err(invalid("max_order_error_rate", "must be in (0, 1]"));
        }

        if self.execution.fee_rate < Decimal::ZERO || self.execution.fee_rate >= Decimal::ONE {
            return Err(invalid("fee_rate", "must be in [0, 1)"));
        }
        for (field, value) in [
            ("stale_data_timeout_secs", r.stale_data_timeout_secs),
            ("error_rate_window_secs", r.error_rate_window_secs),
            ("idempotency_window_secs", self.execution.idempotency_window_secs),
            ("pending_timeout_secs", self.execution.pending_timeout_secs),
            ("tick_interval_secs", self.engine.tick_interval_secs),
        ] {
            if value == 0 || value > MAX_DURATION_SECS {
                return Err(invalid(field, format!("must be in [1, {MAX_DURATION_SECS}]")));
            }
        }
        for (field, value) in [
            ("cooldown_after_error_secs", r.cooldown_after_error_secs),
            ("expiry_safety_margin_secs", s.expiry_safety_margin_secs),
        ] {
            if value > MAX_DURATION_SECS {
                return Err(invalid(field, format!("must be at most {MAX_DURATION_SECS}")));
            }
        }

        let mut seen = HashSet::new();
        for market in &self.markets {
            if market.id.trim().is_empty() {
                return Err(ConfigError::EmptyMarketId);
            }
            if !seen.insert(market.id.as_str()) {
                return Err(ConfigError::DuplicateMarket(market.id.clone()));
            }
        }
        Ok(())
    }

    /// Force paper mode unless the live-trading environment flag is `true`
    pub fn apply_live_gate(mut self, live_trading_env: Option<&str>) -> Self {
        let opted_in = live_trading_env
            .map(|v| v.trim().eq_ignore_ascii_case("true"))
            .unwrap_or(false);
        if self.execution.mode == ExecutionMode::Live && !opted_in {
            tracing::warn!(
                env = LIVE_TRADING_ENV,
                "Live mode requested but {} is not 'true', forcing paper mode",
                LIVE_TRADING_ENV
            );
            self.execution.mode = ExecutionMode::Paper;
        }
        self
    }

    /// Live mode requires a well-formed signing key
    pub fn check_credentials(&self, private_key: Option<&str>) -> Result<(), ConfigError> {
        if self.execution.mode != ExecutionMode::Live {
            return Ok(());
        }
        let key = private_key
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .ok_or(ConfigError::MissingCredential(PRIVATE_KEY_ENV))?;
        let well_formed = key.len() == 66
            && key.starts_with("0x")
            && key[2..].chars().all(|c| c.is_ascii_hexdigit());
        if !well_formed {
            return Err(ConfigError::InvalidCredential(PRIVATE_KEY_ENV));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL: &str = r#"
        [execution]
        mode = "paper"
        fee_rate = 0.001
        idempotency_window_secs = 10

        [strategy]
        pair_cost_threshold = 0.98
        order_size = 10
        min_liquidity = 25
        max_imbalance = 0.4
        expiry_safety_margin_secs = 120

        [risk]
        max_daily_loss = 75
        max_position_per_market = 150
        max_position_total = 600
        stale_data_timeout_secs = 30
        max_orders_per_minute = 20

        [engine]
        tick_interval_secs = 15

        [telemetry]
        log_level = "debug"
        log_format = "json"
        metrics_port = 9090

        [[markets]]
        id = "btc-15m"
        asset = "BTC"
        window_end = "2026-10-19T12:15:00Z"

        [[markets]]
        id = "eth-15m"
        asset = "ETH"
        window_end = "2026-10-19T12:15:00Z"
        fees_enabled = true
    "#;

    #[test]
    fn test_config_deserialize() {
        let config = Config::parse(FULL).unwrap();
        assert_eq!(config.execution.mode, ExecutionMode::Paper);
        assert_eq!(config.execution.fee_rate, dec!(0.001));
        assert_eq!(config.strategy.pair_cost_threshold, dec!(0.98));
        assert_eq!(config.strategy.expiry_safety_margin_secs, 120);
        assert_eq!(config.risk.max_orders_per_minute, 20);
        assert_eq!(config.engine.tick_interval_secs, 15);
        assert_eq!(config.telemetry.log_format, LogFormat::Json);
        assert_eq!(config.telemetry.metrics_port, Some(9090));
        assert_eq!(config.markets.len(), 2);
        assert!(config.markets[1].fees_enabled);
    }

    #[test]
    fn test_config_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.execution.mode, ExecutionMode::Paper);
        assert_eq!(config.strategy.pair_cost_threshold, dec!(0.99));
        assert_eq!(config.strategy.order_size, dec!(5));
        assert_eq!(config.strategy.max_imbalance, dec!(0.3));
        assert_eq!(config.risk.max_daily_loss, dec!(50));
        assert_eq!(config.risk.stale_data_timeout_secs, 60);
        assert_eq!(config.risk.max_orders_per_minute, 50);
        assert_eq!(config.engine.tick_interval_secs, 60);
        assert_eq!(config.execution.pending_timeout_secs, 120);
        assert!(config.telemetry.metrics_port.is_none());
        assert!(config.markets.is_empty());
    }

    #[test]
    fn test_config_parse_error() {
        let err = Config::parse("[strategy\norder_size = 1").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_threshold_range() {
        let err = Config::parse("[strategy]\npair_cost_threshold = 1.0").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                field: "pair_cost_threshold",
                ..
            }
        ));
        assert!(Config::parse("[strategy]\npair_cost_threshold = 0.85").is_err());
        assert!(Config::parse("[strategy]\npair_cost_threshold = 0.90").is_ok());
    }

    #[test]
    fn test_absolute_caps() {
        let err = Config::parse("[risk]\nmax_daily_loss = 500").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "max_daily_loss", .. }));

        let err = Config::parse(
            "[risk]\nmax_position_per_market = 5000\nmax_position_total = 10000",
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                field: "max_position_per_market",
                ..
            }
        ));
    }

    #[test]
    fn test_total_below_per_market() {
        let err = Config::parse("[risk]\nmax_position_per_market = 200\nmax_position_total = 100")
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                field: "max_position_total",
                ..
            }
        ));
    }

    #[test]
    fn test_zero_rate_limit_rejected() {
        assert!(Config::parse("[risk]\nmax_orders_per_minute = 0").is_err());
        assert!(Config::parse("[risk]\nstale_data_timeout_secs = 0").is_err());
        assert!(Config::parse("[strategy]\norder_size = 0").is_err());
        assert!(Config::parse("[strategy]\nmax_imbalance = 1.5").is_err());
    }

    #[test]
    fn test_duration_caps() {
        for toml in [
            "[risk]\nstale_data_timeout_secs = 9223372036854775807",
            "[risk]\nerror_rate_window_secs = 9300000000000000",
            "[risk]\ncooldown_after_error_secs = 86401",
            "[strategy]\nexpiry_safety_margin_secs = 10000000000000000",
            "[execution]\npending_timeout_secs = 0",
            "[execution]\nidempotency_window_secs = 90000",
            "[engine]\ntick_interval_secs = 100000",
        ] {
            assert!(
                matches!(Config::parse(toml), Err(ConfigError::Invalid { .. })),
                "accepted {toml}"
            );
        }
        assert!(Config::parse("[risk]\nstale_data_timeout_secs = 86400").is_ok());
        assert!(Config::parse("[risk]\ncooldown_after_error_secs = 0").is_ok());
    }

    #[test]
    fn test_duration_secs_clamped() {
        assert_eq!(duration_secs(30), chrono::Duration::seconds(30));
        assert_eq!(duration_secs(u64::MAX), chrono::Duration::seconds(86_400));
    }

    #[test]
    fn test_duplicate_market_rejected() {
        let toml = r#"
            [[markets]]
            id = "m1"
            asset = "BTC"
            window_end = "2026-10-19T12:15:00Z"

            [[markets]]
            id = "m1"
            asset = "ETH"
            window_end = "2026-10-19T12:15:00Z"
        "#;
        assert_eq!(
            Config::parse(toml).unwrap_err(),
            ConfigError::DuplicateMarket("m1".to_string())
        );
    }

    #[test]
    fn test_live_gate_forces_paper() {
        let live = Config::parse("[execution]\nmode = \"live\"").unwrap();
        assert_eq!(live.execution.mode, ExecutionMode::Live);

        let gated = live.clone().apply_live_gate(None);
        assert_eq!(gated.execution.mode, ExecutionMode::Paper);

        let gated = live.clone().apply_live_gate(Some("false"));
        assert_eq!(gated.execution.mode, ExecutionMode::Paper);

        let allowed = live.apply_live_gate(Some("TRUE"));
        assert_eq!(allowed.execution.mode, ExecutionMode::Live);
    }

    #[test]
    fn test_credentials_only_required_live() {
        let paper = Config::default();
        assert!(paper.check_credentials(None).is_ok());

        let live = Config::parse("[execution]\nmode = \"live\"")
            .unwrap()
            .apply_live_gate(Some("true"));
        assert_eq!(
            live.check_credentials(None),
            Err(ConfigError::MissingCredential(PRIVATE_KEY_ENV))
        );
        assert_eq!(
            live.check_credentials(Some("0x1234")),
            Err(ConfigError::InvalidCredential(PRIVATE_KEY_ENV))
        );
        let key = format!("0x{}", "ab".repeat(32));
        assert!(live.check_credentials(Some(&key)).is_ok());
    }

    #[test]
    fn test_config_load_nonexistent() {
        let result = Config::load("/nonexistent/path/config.toml");
        assert!(result.is_err());
    }

    #[test]
    fn test_execution_mode_display() {
        assert_eq!(ExecutionMode::Paper.to_string(), "paper");
        assert_eq!(ExecutionMode::Live.to_string(), "live");
        assert_ne!(ExecutionMode::Paper, ExecutionMode::Live);
    }
}
