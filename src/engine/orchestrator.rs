//! Engine orchestrator
//!
//! Wires feed -> strategy -> risk -> dispatcher -> ledger in one serialized
//! loop:
//! 1. Record freshness for every quote event, keep only the latest quote per side
//! 2. Evaluate each touched market once against its ledger snapshot
//! 3. Pass entries through the pre-trade check, then dispatch
//! 4. Apply fills to the ledger and losses to the risk manager
//!
//! A periodic tick re-evaluates the breaker so staleness is caught even
//! when no data arrives.

use super::handle::{Control, EngineHandle};
use super::status::{EngineStatus, FinalSnapshot};
use crate::config::Config;
use crate::execution::{
    DispatchOutcome, DispatcherParams, ExecutionOutcome, ExecutionReport, Fill, IntentStatus,
    OrderIntent, OrderIntentDispatcher, OrderRequest, PaperEngine,
};
use crate::feed::{FeedError, FeedEvent, QuoteUpdate};
use crate::market::{Market, MarketId};
use crate::position::PositionLedger;
use crate::quote::QuoteBook;
use crate::risk::RiskManager;
use crate::strategy::{Signal, StrategyEngine};
use crate::telemetry::{
    increment_counter, increment_counter_with_reason, set_gauge, set_gauge_decimal,
    CounterMetric, GaugeMetric,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::time::MissedTickBehavior;

/// Most feed events drained into one batch
const MAX_BATCH: usize = 256;
const CONTROL_CHANNEL_CAPACITY: usize = 16;

/// Single-writer engine over all configured markets
pub struct Orchestrator {
    markets: HashMap<MarketId, Market>,
    book: QuoteBook,
    ledger: PositionLedger,
    strategy: StrategyEngine,
    risk: Arc<RiskManager>,
    dispatcher: OrderIntentDispatcher,
    tick_interval: std::time::Duration,
    status_tx: watch::Sender<EngineStatus>,
    control_tx: mpsc::Sender<Control>,
    control_rx: mpsc::Receiver<Control>,
}

impl Orchestrator {
    /// Build an engine for the configured markets
    ///
    /// Every market's asset starts its staleness clock at `now`.
    pub fn new(config: &Config, dispatcher: OrderIntentDispatcher, now: DateTime<Utc>) -> Self {
        let risk = Arc::new(RiskManager::new(config.risk.clone(), now));
        let (status_tx, _) = watch::channel(EngineStatus::initial(dispatcher.mode(), now));
        let (control_tx, control_rx) = mpsc::channel(CONTROL_CHANNEL_CAPACITY);

        let mut orchestrator = Self {
            markets: HashMap::new(),
            book: QuoteBook::new(),
            ledger: PositionLedger::new(),
            strategy: StrategyEngine::new(config.strategy.clone()),
            risk,
            dispatcher,
            tick_interval: std::time::Duration::from_secs(config.engine.tick_interval_secs.max(1)),
            status_tx,
            control_tx,
            control_rx,
        };
        for market in &config.markets {
            orchestrator.add_market(market.clone(), now);
        }
        orchestrator
    }

    /// Engine with a local paper venue
    pub fn paper(config: &Config, now: DateTime<Utc>) -> Self {
        let dispatcher = OrderIntentDispatcher::paper(
            DispatcherParams::from_config(config),
            PaperEngine::new(config.execution.fee_rate),
        );
        Self::new(config, dispatcher, now)
    }

    /// Register a market and start watching its asset
    pub fn add_market(&mut self, market: Market, now: DateTime<Utc>) {
        self.risk.watch_asset(&market.asset, now);
        tracing::info!(
            market = %market.id,
            asset = %market.asset,
            window_end = %market.window_end,
            "Market registered"
        );
        self.markets.insert(market.id.clone(), market);
    }

    pub fn handle(&self) -> EngineHandle {
        EngineHandle::new(
            Arc::clone(&self.risk),
            self.status_tx.subscribe(),
            self.control_tx.clone(),
        )
    }

    pub fn risk(&self) -> &Arc<RiskManager> {
        &self.risk
    }

    pub fn ledger(&self) -> &PositionLedger {
        &self.ledger
    }

    pub fn quotes(&self) -> &QuoteBook {
        &self.book
    }

    pub fn dispatcher(&self) -> &OrderIntentDispatcher {
        &self.dispatcher
    }

    /// Apply a batch of quote updates and evaluate each touched market once
    ///
    /// Returns the dispatch outcome of every market that produced an entry.
    pub async fn on_quotes(
        &mut self,
        batch: Vec<QuoteUpdate>,
        now: DateTime<Utc>,
    ) -> Vec<(MarketId, DispatchOutcome)> {
        let mut touched: Vec<MarketId> = Vec::new();
        for update in batch {
            let Some(market) = self.markets.get(&update.market_id) else {
                tracing::debug!(market = %update.market_id, "Quote for unknown market ignored");
                continue;
            };
            self.risk.record_quote(&market.asset, now);
            if !touched.contains(&update.market_id) {
                touched.push(update.market_id.clone());
            }
            self.book.apply(update.into_quote());
        }

        let mut outcomes = Vec::new();
        for market_id in touched {
            if let Some(outcome) = self.evaluate_market(&market_id, now).await {
                outcomes.push((market_id, outcome));
            }
        }
        outcomes
    }

    /// Count a malformed feed event toward the feed error rate
    pub fn on_feed_error(&mut self, error: &FeedError, now: DateTime<Utc>) {
        tracing::warn!(error = %error, "Skipping malformed feed event");
        increment_counter(CounterMetric::MalformedFeedEvents);
        self.risk.record_feed_error(now);
    }

    /// Apply an asynchronous execution report
    ///
    /// Reports the dispatcher refuses (unknown key, already settled, overfill)
    /// leave the ledger untouched.
    pub fn on_report(&mut self, report: ExecutionReport, now: DateTime<Utc>) {
        let update = match self.dispatcher.complete(&report) {
            Ok(update) => update,
            Err(e) => {
                tracing::warn!(key = %report.key, error = %e, "Execution report ignored");
                increment_counter_with_reason(CounterMetric::IgnoredReports, e.code());
                return;
            }
        };
        // only the first final report of a pending intent counts as an attempt result
        let settles =
            update.previous == IntentStatus::Pending && update.status != IntentStatus::Pending;
        match report.outcome {
            ExecutionOutcome::Filled(fill) => {
                if settles {
                    self.risk.record_order_result(true, now);
                }
                self.apply_fill(&fill, now);
            }
            ExecutionOutcome::Rejected { reason } => {
                tracing::warn!(key = %report.key, reason = %reason, "Order rejected");
                increment_counter(CounterMetric::OrderFailures);
                self.risk.record_order_result(false, now);
            }
        }
    }

    /// Expire live intents that outlived the pending timeout
    ///
    /// Each one counts as a failed order and gets a best-effort cancel.
    pub async fn expire_pending(&mut self, now: DateTime<Utc>) -> Vec<OrderIntent> {
        let expired = self.dispatcher.expire_pending(now);
        for intent in &expired {
            tracing::warn!(
                key = %intent.key,
                market = %intent.market_id,
                side = %intent.side,
                "Live intent expired without a report"
            );
            increment_counter(CounterMetric::OrderFailures);
            self.risk.record_order_result(false, now);
            self.dispatcher.cancel(&intent.key).await;
        }
        expired
    }

    /// Periodic breaker evaluation and status publication
    pub fn tick(&mut self, now: DateTime<Utc>) -> EngineStatus {
        for market_id in self.markets.keys() {
            self.refresh_mark(market_id, now);
        }
        self.risk.evaluate(now);
        let status = self.publish(now);
        tracing::info!(
            breaker = ?status.breaker,
            daily_pnl = %status.daily_pnl,
            exposure = %status.total_exposure,
            locked_profit = %status.locked_profit,
            orders_last_minute = status.orders_last_minute,
            "Engine tick"
        );
        status
    }

    /// Current status without publishing it
    pub fn status(&self, now: DateTime<Utc>) -> EngineStatus {
        let risk = self.risk.status(now);
        EngineStatus {
            mode: self.dispatcher.mode(),
            breaker: risk.breaker,
            daily_pnl: risk.daily_pnl,
            daily_loss: risk.daily_loss,
            realized_pnl: risk.realized_pnl,
            unrealized_pnl: risk.unrealized_pnl,
            total_exposure: self.ledger.total_cost(),
            locked_profit: self.ledger.total_locked_profit(),
            orders_last_minute: self.dispatcher.orders_last_minute(now),
            pending_orders: self.dispatcher.pending().len(),
            positions: self.ledger.snapshots(),
            updated_at: now,
        }
    }

    pub fn final_snapshot(&self, now: DateTime<Utc>) -> FinalSnapshot {
        FinalSnapshot {
            positions: self.ledger.snapshots(),
            breaker: self.risk.breaker_state(),
            daily_pnl: self.risk.daily_pnl(),
            fills: self.ledger.fill_count(),
            taken_at: now,
        }
    }

    /// Drive the engine until shutdown or the feed ends
    pub async fn run(
        mut self,
        mut feed_rx: mpsc::Receiver<FeedEvent>,
        mut report_rx: mpsc::Receiver<ExecutionReport>,
    ) -> FinalSnapshot {
        let mut ticker = tokio::time::interval(self.tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut reports_open = true;

        tracing::info!(
            mode = %self.dispatcher.mode(),
            markets = self.markets.len(),
            tick_secs = self.tick_interval.as_secs(),
            "Engine started"
        );

        loop {
            tokio::select! {
                biased;

                control = self.control_rx.recv() => match control {
                    Some(Control::Publish) => {
                        self.publish(Utc::now());
                    }
                    Some(Control::Shutdown) | None => {
                        tracing::info!("Shutdown requested");
                        break;
                    }
                },

                report = report_rx.recv(), if reports_open => match report {
                    Some(report) => self.on_report(report, Utc::now()),
                    None => reports_open = false,
                },

                event = feed_rx.recv() => match event {
                    Some(first) => {
                        let mut events = vec![first];
                        while events.len() < MAX_BATCH {
                            match feed_rx.try_recv() {
                                Ok(event) => events.push(event),
                                Err(_) => break,
                            }
                        }
                        self.on_feed_events(events, Utc::now()).await;
                    }
                    None => {
                        tracing::info!("Feed ended");
                        break;
                    }
                },

                _ = ticker.tick() => {
                    let now = Utc::now();
                    self.expire_pending(now).await;
                    self.tick(now);
                }
            }
        }

        self.dispatcher.cancel_pending().await;
        let now = Utc::now();
        self.publish(now);
        let snapshot = self.final_snapshot(now);
        tracing::info!(
            markets = snapshot.positions.len(),
            fills = snapshot.fills,
            daily_pnl = %snapshot.daily_pnl,
            breaker = ?snapshot.breaker,
            "Engine stopped"
        );
        snapshot
    }

    async fn on_feed_events(&mut self, events: Vec<FeedEvent>, now: DateTime<Utc>) {
        let mut batch = Vec::with_capacity(events.len());
        for event in events {
            match event {
                FeedEvent::Quote(update) => batch.push(update),
                FeedEvent::Malformed(error) => self.on_feed_error(&error, now),
            }
        }
        if !batch.is_empty() {
            self.on_quotes(batch, now).await;
        }
    }

    async fn evaluate_market(&mut self, market_id: &str, now: DateTime<Utc>) -> Option<DispatchOutcome> {
        self.refresh_mark(market_id, now);
        if self.risk.evaluate(now).is_open() {
            return None;
        }

        if self.dispatcher.has_pending(market_id) {
            tracing::debug!(market = %market_id, "Entry held while an intent is in flight");
            return None;
        }

        let market = self.markets.get(market_id)?;
        let (quote_yes, quote_no) = self.book.pair(market_id)?;
        let snapshot = self.ledger.snapshot(market_id);
        let signal = self
            .strategy
            .evaluate(market, quote_yes, quote_no, &snapshot, now);

        let (side, entry) = match &signal {
            Signal::Hold(reason) => {
                tracing::debug!(market = %market_id, reason = %reason, "Hold");
                return None;
            }
            Signal::BuyYes(entry) | Signal::BuyNo(entry) => (signal.side()?, entry),
        };

        let request = OrderRequest {
            market_id: market_id.to_string(),
            side,
            quantity: entry.size,
            limit_price: entry.price,
        };

        if let Err(rejection) = self.risk.pre_trade_check(
            &request,
            self.ledger.market_cost(market_id) + self.dispatcher.pending_exposure(market_id),
            self.ledger.total_cost() + self.dispatcher.total_pending_exposure(),
            self.dispatcher.has_capacity(now),
            now,
        ) {
            tracing::info!(
                market = %market_id,
                side = %side,
                reason = rejection.code(),
                detail = %rejection,
                "Entry rejected by risk"
            );
            increment_counter_with_reason(CounterMetric::PreTradeRejections, rejection.code());
            return None;
        }

        tracing::info!(
            market = %market_id,
            side = %side,
            price = %entry.price,
            size = %entry.size,
            pair_cost = %entry.pair_cost,
            "Entry approved"
        );

        let outcome = self.dispatcher.submit(&request, now).await;
        match &outcome {
            DispatchOutcome::Filled { fill, .. } => {
                self.risk.record_order_result(true, now);
                let fill = fill.clone();
                self.apply_fill(&fill, now);
            }
            DispatchOutcome::Submitted(_) => {}
            DispatchOutcome::Failed { .. } => {
                increment_counter(CounterMetric::OrderFailures);
                self.risk.record_order_result(false, now);
            }
            DispatchOutcome::Deferred => increment_counter(CounterMetric::DeferredDispatches),
            DispatchOutcome::Duplicate(_) => increment_counter(CounterMetric::DuplicateDispatches),
        }
        Some(outcome)
    }

    fn apply_fill(&mut self, fill: &Fill, now: DateTime<Utc>) {
        match self.ledger.apply_fill(fill) {
            Ok(position) => {
                increment_counter(CounterMetric::Fills);
                if fill.fees > Decimal::ZERO {
                    self.risk.record_realized(-fill.fees, now);
                }
                tracing::info!(
                    market = %fill.market_id,
                    side = %fill.side,
                    quantity = %fill.quantity,
                    price = %fill.price,
                    held = %position.quantity,
                    mode = %fill.mode,
                    "Fill recorded"
                );
                self.refresh_mark(&fill.market_id, now);
            }
            Err(e) => {
                tracing::error!(key = %fill.key, market = %fill.market_id, error = %e, "Fill rejected by ledger");
            }
        }
    }

    fn refresh_mark(&self, market_id: &str, now: DateTime<Utc>) {
        if let Some((mid_yes, mid_no)) = self.book.mids(market_id) {
            let unrealized = self.ledger.unrealized_pnl(market_id, mid_yes, mid_no);
            self.risk.mark_to_market(market_id, unrealized, now);
        }
    }

    fn publish(&self, now: DateTime<Utc>) -> EngineStatus {
        let status = self.status(now);
        set_gauge_decimal(GaugeMetric::DailyPnl, status.daily_pnl);
        set_gauge_decimal(GaugeMetric::UnrealizedPnl, status.unrealized_pnl);
        set_gauge_decimal(GaugeMetric::DailyLoss, status.daily_loss);
        set_gauge_decimal(GaugeMetric::TotalExposure, status.total_exposure);
        set_gauge_decimal(GaugeMetric::LockedProfit, status.locked_profit);
        set_gauge_decimal(
            GaugeMetric::MatchedPairs,
            status.positions.iter().map(|p| p.matched_pairs).sum(),
        );
        set_gauge(GaugeMetric::OrdersLastMinute, status.orders_last_minute as f64);
        set_gauge(
            GaugeMetric::BreakerOpen,
            if status.breaker.is_open() { 1.0 } else { 0.0 },
        );
        self.status_tx.send_replace(status.clone());
        status
    }
}
