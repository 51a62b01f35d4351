//! Run command implementation

use crate::config::{Config, ExecutionMode};
use crate::engine::Orchestrator;
use crate::feed::{JsonLinesFeed, QuoteFeed};
use anyhow::Context;
use chrono::Utc;
use clap::Args;
use std::path::PathBuf;
use tokio::io::BufReader;
use tokio::sync::mpsc;

#[derive(Args, Debug)]
pub struct RunArgs {
    /// JSON-lines quote updates; reads stdin when omitted
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// Write the final snapshot here instead of stdout
    #[arg(long)]
    pub snapshot: Option<PathBuf>,
}

impl RunArgs {
    pub async fn execute(&self, config: &Config) -> anyhow::Result<()> {
        if config.execution.mode == ExecutionMode::Live {
            anyhow::bail!("live mode needs an execution client and none is bundled with this binary");
        }
        if config.markets.is_empty() {
            tracing::warn!("No markets configured, every quote will be ignored");
        }

        let feed_rx = match &self.input {
            Some(path) => {
                let file = tokio::fs::File::open(path)
                    .await
                    .with_context(|| format!("Failed to open {}", path.display()))?;
                JsonLinesFeed::new(BufReader::new(file), path.display().to_string())
                    .subscribe()
                    .await?
            }
            None => {
                JsonLinesFeed::new(BufReader::new(tokio::io::stdin()), "stdin")
                    .subscribe()
                    .await?
            }
        };

        let engine = Orchestrator::paper(config, Utc::now());
        let handle = engine.handle();
        // paper fills are synchronous; nothing reports asynchronously
        let (_report_tx, report_rx) = mpsc::channel(1);
        let mut task = tokio::spawn(engine.run(feed_rx, report_rx));

        let snapshot = tokio::select! {
            result = &mut task => result?,
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Ctrl-C received, shutting down");
                handle.shutdown().await;
                task.await?
            }
        };

        let json = snapshot.to_json()?;
        match &self.snapshot {
            Some(path) => {
                tokio::fs::write(path, json)
                    .await
                    .with_context(|| format!("Failed to write {}", path.display()))?;
                tracing::info!(path = %path.display(), "Final snapshot written");
            }
            None => println!("{}", json),
        }

        Ok(())
    }
}
