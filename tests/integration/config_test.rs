//! Integration tests for configuration loading

use parity_arb::config::{Config, ConfigError, ExecutionMode};
use rust_decimal_macros::dec;
use std::io::Write;

#[test]
fn test_config_example_loads() {
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/config.toml.example");
    let config = Config::load(path).unwrap();
    assert_eq!(config.execution.mode, ExecutionMode::Paper);
    assert_eq!(config.strategy.pair_cost_threshold, dec!(0.99));
    assert_eq!(config.risk.max_orders_per_minute, 50);
    assert!(config.markets.is_empty());
}

#[test]
fn test_load_from_file_with_markets() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"
        [strategy]
        order_size = 10

        [[markets]]
        id = "btc-15m"
        asset = "BTC"
        window_end = "2026-10-19T12:15:00Z"
        "#
    )
    .unwrap();

    let config = Config::load(file.path()).unwrap();
    assert_eq!(config.strategy.order_size, dec!(10));
    assert_eq!(config.markets[0].asset, "BTC");
    assert!(!config.markets[0].fees_enabled);
}

#[test]
fn test_invalid_file_is_fatal() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "[risk]\nmax_daily_loss = 1000\n").unwrap();

    let err = Config::load(file.path()).unwrap_err();
    let config_err = err.downcast_ref::<ConfigError>().unwrap();
    assert!(matches!(
        config_err,
        ConfigError::Invalid {
            field: "max_daily_loss",
            ..
        }
    ));
}

#[test]
fn test_live_config_without_opt_in_runs_paper() {
    let config = Config::parse("[execution]\nmode = \"live\"")
        .unwrap()
        .apply_live_gate(Some("yes"));
    assert_eq!(config.execution.mode, ExecutionMode::Paper);
    assert!(config.check_credentials(None).is_ok());
}
