use clap::Parser;
use parity_arb::cli::{Cli, Commands};
use parity_arb::config::Config;
use std::path::Path;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let env_file = dotenvy::dotenv().ok();

    // Load configuration
    let config = if Path::new(&cli.config).exists() {
        Config::load(&cli.config)?
    } else {
        eprintln!("Warning: {} not found, using default configuration", cli.config);
        Config::parse(include_str!("../config.toml.example"))?
    };

    // Initialize telemetry
    parity_arb::telemetry::init_telemetry(&config.telemetry)?;
    if let Some(path) = env_file {
        tracing::debug!(path = %path.display(), "Loaded .env");
    }

    let config = config.apply_environment()?;

    match cli.command {
        Commands::Run(args) => {
            tracing::info!(mode = %config.execution.mode, "Starting engine");
            args.execute(&config).await?;
        }
        Commands::Config => {
            println!("Current configuration:");
            println!("  Execution: {} (fee rate {})", config.execution.mode, config.execution.fee_rate);
            println!(
                "  Strategy: threshold={}, order_size={}, min_liquidity={}, max_imbalance={}",
                config.strategy.pair_cost_threshold,
                config.strategy.order_size,
                config.strategy.min_liquidity,
                config.strategy.max_imbalance
            );
            println!(
                "  Risk: max_daily_loss={}, per_market={}, total={}, stale_after={}s, orders/min={}",
                config.risk.max_daily_loss,
                config.risk.max_position_per_market,
                config.risk.max_position_total,
                config.risk.stale_data_timeout_secs,
                config.risk.max_orders_per_minute
            );
            println!("  Tick: {}s", config.engine.tick_interval_secs);
            println!("  Markets:");
            for market in &config.markets {
                println!(
                    "    {} ({}) ends {}{}",
                    market.id,
                    market.asset,
                    market.window_end,
                    if market.fees_enabled { ", fees" } else { "" }
                );
            }
        }
    }

    Ok(())
}
