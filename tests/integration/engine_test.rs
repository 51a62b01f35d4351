//! End-to-end engine tests

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use parity_arb::config::{Config, ExecutionMode};
use parity_arb::engine::Orchestrator;
use parity_arb::execution::{
    DispatchOutcome, DispatcherParams, ExecutionClient, ExecutionError, ExecutionOutcome,
    ExecutionReport, Fill, IdempotencyKey, IntentStatus, OrderIntent, OrderIntentDispatcher,
};
use parity_arb::feed::{FeedEvent, JsonLinesFeed, QuoteFeed, QuoteUpdate};
use parity_arb::market::{Market, Side};
use parity_arb::risk::TripReason;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::io::Cursor;
use std::sync::Arc;
use tokio::io::BufReader;
use tokio::sync::mpsc;

#[derive(Default)]
struct RecordingClient {
    submitted: Mutex<Vec<OrderIntent>>,
    cancelled: Mutex<Vec<IdempotencyKey>>,
    fail_submissions: bool,
}

#[async_trait]
impl ExecutionClient for RecordingClient {
    async fn submit(&self, intent: &OrderIntent) -> Result<(), ExecutionError> {
        if self.fail_submissions {
            return Err(ExecutionError::Submission("venue unavailable".to_string()));
        }
        self.submitted.lock().push(intent.clone());
        Ok(())
    }

    async fn cancel(&self, key: &IdempotencyKey) -> Result<(), ExecutionError> {
        self.cancelled.lock().push(*key);
        Ok(())
    }
}

fn start() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2026-10-19T12:00:00Z")
        .unwrap()
        .with_timezone(&Utc)
}

fn config(now: DateTime<Utc>) -> Config {
    let mut config = Config::default();
    config.strategy.order_size = dec!(10);
    config.markets = vec![
        Market::new("btc-15m", "BTC", now + Duration::minutes(15)),
        Market::new("eth-15m", "ETH", now + Duration::minutes(15)),
    ];
    config
}

fn update(market: &str, side: Side, ask: Decimal) -> QuoteUpdate {
    QuoteUpdate {
        market_id: market.to_string(),
        side,
        bid: Some(ask - dec!(0.02)),
        ask: Some(ask),
        size: dec!(100),
        timestamp: start(),
    }
}

fn live_engine(client: Arc<RecordingClient>, now: DateTime<Utc>) -> Orchestrator {
    live_engine_with(client, config(now), now)
}

fn live_engine_with(
    client: Arc<RecordingClient>,
    mut config: Config,
    now: DateTime<Utc>,
) -> Orchestrator {
    config.execution.mode = ExecutionMode::Live;
    let dispatcher = OrderIntentDispatcher::live(DispatcherParams::from_config(&config), client);
    Orchestrator::new(&config, dispatcher, now)
}

fn pair(market: &str) -> Vec<QuoteUpdate> {
    vec![
        update(market, Side::Yes, dec!(0.45)),
        update(market, Side::No, dec!(0.52)),
    ]
}

fn filled(intent: &OrderIntent, side: Side, price: Decimal) -> ExecutionReport {
    ExecutionReport {
        key: intent.key,
        outcome: ExecutionOutcome::Filled(Fill {
            key: intent.key,
            market_id: intent.market_id.clone(),
            side,
            quantity: intent.quantity,
            price,
            fees: Decimal::ZERO,
            timestamp: start(),
            mode: ExecutionMode::Live,
        }),
    }
}

#[tokio::test]
async fn test_paper_replay_locks_profit() {
    let now = Utc::now();
    let input = [
        r#"{"market":"btc-15m","side":"yes","bid":"0.43","ask":"0.45","size":"100"}"#,
        r#"{"market":"btc-15m","side":"no","bid":"0.50","ask":"0.52","size":"100"}"#,
        "garbage",
        r#"{"market":"unknown","side":"yes","ask":"0.10","size":"100"}"#,
    ]
    .join("\n");
    let feed = JsonLinesFeed::new(BufReader::new(Cursor::new(input.into_bytes())), "replay");
    let feed_rx = feed.subscribe().await.unwrap();
    let (_report_tx, report_rx) = mpsc::channel(1);

    let engine = Orchestrator::paper(&config(now), now);
    let handle = engine.handle();
    let snapshot = engine.run(feed_rx, report_rx).await;

    assert_eq!(snapshot.fills, 1);
    assert_eq!(snapshot.positions.len(), 1);
    assert_eq!(snapshot.positions[0].yes_quantity, dec!(10));
    assert!(!snapshot.breaker.is_open());
    assert_eq!(handle.status().positions, snapshot.positions);
}

#[tokio::test]
async fn test_live_intent_applied_on_fill_report() {
    let client = Arc::new(RecordingClient::default());
    let mut engine = live_engine(Arc::clone(&client), start());

    let outcomes = engine
        .on_quotes(
            vec![
                update("btc-15m", Side::Yes, dec!(0.45)),
                update("btc-15m", Side::No, dec!(0.52)),
            ],
            start() + Duration::seconds(1),
        )
        .await;
    assert_eq!(outcomes.len(), 1);
    let intent = match &outcomes[0].1 {
        DispatchOutcome::Submitted(intent) => intent.clone(),
        other => panic!("expected submitted, got {:?}", other),
    };
    assert_eq!(client.submitted.lock().len(), 1);
    assert_eq!(engine.ledger().fill_count(), 0);

    // the market is held while its intent is in flight
    let again = engine
        .on_quotes(
            vec![update("btc-15m", Side::Yes, dec!(0.45))],
            start() + Duration::seconds(2),
        )
        .await;
    assert!(again.is_empty());
    assert_eq!(client.submitted.lock().len(), 1);

    let fill = Fill {
        key: intent.key,
        market_id: intent.market_id.clone(),
        side: intent.side,
        quantity: intent.quantity,
        price: dec!(0.44),
        fees: Decimal::ZERO,
        timestamp: start() + Duration::seconds(3),
        mode: ExecutionMode::Live,
    };
    engine.on_report(
        ExecutionReport {
            key: intent.key,
            outcome: ExecutionOutcome::Filled(fill),
        },
        start() + Duration::seconds(3),
    );

    let snapshot = engine.ledger().snapshot("btc-15m");
    assert_eq!(snapshot.yes_quantity, dec!(10));
    assert_eq!(snapshot.yes_average, Some(dec!(0.44)));
    assert_eq!(engine.dispatcher().status(&intent.key), Some(IntentStatus::Filled));
}

#[tokio::test]
async fn test_rejections_trip_order_error_rate() {
    let client = Arc::new(RecordingClient::default());
    let mut engine = live_engine(Arc::clone(&client), start());
    let markets = ["btc-15m", "eth-15m"];

    // four intents across two markets and two buckets, every one rejected
    let mut keys = Vec::new();
    for (i, market) in markets.iter().cycle().take(4).enumerate() {
        let now = start() + Duration::seconds(1 + 40 * i as i64);
        let outcomes = engine
            .on_quotes(
                vec![
                    update(market, Side::Yes, dec!(0.45)),
                    update(market, Side::No, dec!(0.52)),
                ],
                now,
            )
            .await;
        if let Some((_, DispatchOutcome::Submitted(intent))) = outcomes.first() {
            keys.push(intent.key);
            engine.on_report(
                ExecutionReport {
                    key: intent.key,
                    outcome: ExecutionOutcome::Rejected {
                        reason: "insufficient balance".to_string(),
                    },
                },
                now,
            );
        }
    }
    assert_eq!(keys.len(), 4);

    let status = engine.tick(start() + Duration::seconds(125));
    assert_eq!(
        status.breaker.reason(),
        Some(&TripReason::OrderErrorRate {
            failed: 4,
            attempts: 4
        })
    );
}

#[tokio::test]
async fn test_failed_submission_starts_cooldown() {
    let client = Arc::new(RecordingClient {
        fail_submissions: true,
        ..RecordingClient::default()
    });
    let mut engine = live_engine(client, start());

    let first = engine
        .on_quotes(
            vec![
                update("btc-15m", Side::Yes, dec!(0.45)),
                update("btc-15m", Side::No, dec!(0.52)),
            ],
            start() + Duration::seconds(1),
        )
        .await;
    assert!(matches!(first[0].1, DispatchOutcome::Failed { .. }));

    // the other market is blocked too while cooling down
    let second = engine
        .on_quotes(
            vec![
                update("eth-15m", Side::Yes, dec!(0.45)),
                update("eth-15m", Side::No, dec!(0.52)),
            ],
            start() + Duration::seconds(10),
        )
        .await;
    assert!(second.is_empty());
    assert!(engine.risk().is_trading_allowed());
}

#[tokio::test]
async fn test_shutdown_cancels_in_flight_live_orders() {
    let now = Utc::now();
    let client = Arc::new(RecordingClient::default());
    let engine = live_engine(Arc::clone(&client), now);
    let handle = engine.handle();

    let (feed_tx, feed_rx) = mpsc::channel(16);
    let (_report_tx, report_rx) = mpsc::channel(16);
    let task = tokio::spawn(engine.run(feed_rx, report_rx));

    for side_ask in [(Side::Yes, dec!(0.45)), (Side::No, dec!(0.52))] {
        let mut quote = update("btc-15m", side_ask.0, side_ask.1);
        quote.timestamp = now;
        feed_tx.send(FeedEvent::Quote(quote)).await.unwrap();
    }

    for _ in 0..200 {
        if !client.submitted.lock().is_empty() {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    handle.shutdown().await;
    let snapshot = task.await.unwrap();

    let submitted = client.submitted.lock().clone();
    assert_eq!(submitted.len(), 1);
    assert_eq!(client.cancelled.lock().as_slice(), &[submitted[0].key]);
    assert_eq!(snapshot.fills, 0);
}

#[tokio::test]
async fn test_in_flight_intent_blocks_repeat_entries() {
    let client = Arc::new(RecordingClient::default());
    let mut config = config(start());
    config.risk.max_position_per_market = dec!(10);
    let mut engine = live_engine_with(Arc::clone(&client), config, start());

    // a new idempotency bucket every batch, no reports
    for i in 0..6 {
        engine
            .on_quotes(pair("btc-15m"), start() + Duration::seconds(1 + 5 * i))
            .await;
    }

    let submitted = client.submitted.lock().clone();
    assert_eq!(submitted.len(), 1);
    assert_eq!(submitted[0].side, Side::Yes);
    assert_eq!(engine.dispatcher().pending_exposure("btc-15m"), dec!(4.50));
}

#[tokio::test]
async fn test_in_flight_notional_counts_toward_total_limit() {
    let client = Arc::new(RecordingClient::default());
    let mut config = config(start());
    config.risk.max_position_per_market = dec!(6);
    config.risk.max_position_total = dec!(6);
    let mut engine = live_engine_with(Arc::clone(&client), config, start());

    let first = engine
        .on_quotes(pair("btc-15m"), start() + Duration::seconds(1))
        .await;
    assert!(matches!(first[0].1, DispatchOutcome::Submitted(_)));

    // 4.50 in flight plus 4.50 more would exceed the 6.00 total
    let second = engine
        .on_quotes(pair("eth-15m"), start() + Duration::seconds(2))
        .await;
    assert!(second.is_empty());
    assert_eq!(client.submitted.lock().len(), 1);
}

#[tokio::test]
async fn test_redelivered_and_unknown_fill_reports_ignored() {
    let client = Arc::new(RecordingClient::default());
    let mut engine = live_engine(Arc::clone(&client), start());

    let outcomes = engine
        .on_quotes(pair("btc-15m"), start() + Duration::seconds(1))
        .await;
    let DispatchOutcome::Submitted(intent) = outcomes[0].1.clone() else {
        panic!("expected submitted, got {:?}", outcomes[0].1);
    };

    let report = filled(&intent, Side::Yes, dec!(0.45));
    engine.on_report(report.clone(), start() + Duration::seconds(2));
    engine.on_report(report, start() + Duration::seconds(3));

    let mut stranger = intent.clone();
    stranger.key = IdempotencyKey::derive("btc-15m", Side::No, 42);
    engine.on_report(
        filled(&stranger, Side::No, dec!(0.52)),
        start() + Duration::seconds(4),
    );

    let snapshot = engine.ledger().snapshot("btc-15m");
    assert_eq!(snapshot.yes_quantity, dec!(10));
    assert_eq!(snapshot.no_quantity, dec!(0));
    assert_eq!(engine.ledger().fill_count(), 1);
    assert_eq!(engine.risk().status(start() + Duration::seconds(4)).order_attempts, 1);
}

#[tokio::test]
async fn test_unreported_intent_expires_and_is_cancelled() {
    let client = Arc::new(RecordingClient::default());
    let mut engine = live_engine(Arc::clone(&client), start());

    engine
        .on_quotes(pair("btc-15m"), start() + Duration::seconds(1))
        .await;
    let key = client.submitted.lock()[0].key;

    assert!(engine
        .expire_pending(start() + Duration::seconds(60))
        .await
        .is_empty());
    let expired = engine.expire_pending(start() + Duration::seconds(121)).await;
    assert_eq!(expired.len(), 1);
    assert_eq!(client.cancelled.lock().as_slice(), &[key]);
    assert_eq!(engine.dispatcher().status(&key), Some(IntentStatus::Expired));

    let now = start() + Duration::seconds(121);
    let status = engine.status(now);
    assert_eq!(status.pending_orders, 0);
    assert_eq!(engine.risk().status(now).order_failures, 1);
}
