//! Order intent dispatcher
//!
//! Turns approved signals into idempotent order intents under the order
//! rate limit, and tracks each intent until it is filled or fails.

use super::{
    ExecutionClient, ExecutionError, ExecutionOutcome, ExecutionReport, Fill, IdempotencyKey,
    OrderIntent, PaperEngine, RateLimiter,
};
use crate::config::{Config, ExecutionMode, MAX_DURATION_SECS};
use crate::market::{MarketId, Side};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

/// Buckets of key history kept for duplicate detection
const KEY_RETENTION_BUCKETS: i64 = 10;

fn clamp_secs(secs: u64) -> i64 {
    secs.min(MAX_DURATION_SECS) as i64
}

/// Dispatcher parameters
#[derive(Debug, Clone)]
pub struct DispatcherParams {
    /// Maximum submissions per trailing minute
    pub max_orders_per_minute: u32,
    /// Width of the idempotency time bucket in seconds
    pub idempotency_window_secs: i64,
    /// Age after which an unreported live intent is expired
    pub pending_timeout_secs: i64,
}

impl DispatcherParams {
    /// Extract dispatcher parameters from the validated configuration
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_orders_per_minute: config.risk.max_orders_per_minute,
            idempotency_window_secs: clamp_secs(config.execution.idempotency_window_secs),
            pending_timeout_secs: clamp_secs(config.execution.pending_timeout_secs),
        }
    }
}

/// A buy the engine wants placed
#[derive(Debug, Clone, PartialEq)]
pub struct OrderRequest {
    pub market_id: MarketId,
    pub side: Side,
    pub quantity: Decimal,
    pub limit_price: Decimal,
}

/// Result of a dispatch attempt
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchOutcome {
    /// Paper intent filled locally; the fill must be applied to the ledger
    Filled { intent: OrderIntent, fill: Fill },
    /// Live intent acknowledged; a report will follow
    Submitted(OrderIntent),
    /// Live submission failed
    Failed {
        intent: OrderIntent,
        error: ExecutionError,
    },
    /// No rate-limit capacity; the signal is dropped for this tick
    Deferred,
    /// An intent with this key is already pending or filled
    Duplicate(IdempotencyKey),
}

/// Lifecycle of an idempotency key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntentStatus {
    /// Live intent awaiting reports; may be partly filled
    Pending,
    Filled,
    /// Submission failed or the venue rejected it
    Failed,
    /// No report within the pending timeout; a cancel was requested but
    /// late fills are still accepted
    Expired,
}

/// Why an execution report was not applied
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ReportError {
    #[error("no intent with key {0}")]
    UnknownKey(IdempotencyKey),
    #[error("intent {key} is already {status:?}")]
    AlreadySettled {
        key: IdempotencyKey,
        status: IntentStatus,
    },
    #[error("fill for {key} does not match the intent's market or side")]
    Mismatch { key: IdempotencyKey },
    #[error("fill for {key} exceeds the intent: {filled} + {quantity} > {ordered}")]
    Overfill {
        key: IdempotencyKey,
        filled: Decimal,
        quantity: Decimal,
        ordered: Decimal,
    },
}

impl ReportError {
    /// Short label for logs and metrics
    pub fn code(&self) -> &'static str {
        match self {
            ReportError::UnknownKey(_) => "unknown_key",
            ReportError::AlreadySettled { .. } => "already_settled",
            ReportError::Mismatch { .. } => "mismatch",
            ReportError::Overfill { .. } => "overfill",
        }
    }
}

/// Status change caused by an accepted report
#[derive(Debug, Clone, PartialEq)]
pub struct ReportUpdate {
    pub intent: OrderIntent,
    pub previous: IntentStatus,
    pub status: IntentStatus,
}

#[derive(Debug, Clone)]
struct KeyEntry {
    status: IntentStatus,
    bucket: i64,
    intent: OrderIntent,
    /// Quantity reported filled so far
    filled: Decimal,
}

impl KeyEntry {
    fn open_notional(&self) -> Decimal {
        (self.intent.quantity - self.filled) * self.intent.limit_price
    }
}

enum Venue {
    Paper(PaperEngine),
    Live(Arc<dyn ExecutionClient>),
}

/// Creates and routes order intents
pub struct OrderIntentDispatcher {
    params: DispatcherParams,
    venue: Venue,
    limiter: RateLimiter,
    keys: HashMap<IdempotencyKey, KeyEntry>,
}

impl OrderIntentDispatcher {
    /// Dispatcher that synthesizes fills locally
    pub fn paper(params: DispatcherParams, engine: PaperEngine) -> Self {
        Self::with_venue(params, Venue::Paper(engine))
    }

    /// Dispatcher that forwards intents to a live execution client
    pub fn live(params: DispatcherParams, client: Arc<dyn ExecutionClient>) -> Self {
        Self::with_venue(params, Venue::Live(client))
    }

    fn with_venue(params: DispatcherParams, venue: Venue) -> Self {
        Self {
            limiter: RateLimiter::per_minute(params.max_orders_per_minute),
            params,
            venue,
            keys: HashMap::new(),
        }
    }

    /// Mode intents are created in
    pub fn mode(&self) -> ExecutionMode {
        match self.venue {
            Venue::Paper(_) => ExecutionMode::Paper,
            Venue::Live(_) => ExecutionMode::Live,
        }
    }

    /// Whether the rate limiter would admit an order now
    pub fn has_capacity(&self, now: DateTime<Utc>) -> bool {
        self.limiter.has_capacity(now)
    }

    /// Orders admitted in the trailing minute
    pub fn orders_last_minute(&self, now: DateTime<Utc>) -> usize {
        self.limiter.in_window(now)
    }

    /// Idempotency bucket for a timestamp
    pub fn bucket(&self, now: DateTime<Utc>) -> i64 {
        now.timestamp()
            .div_euclid(self.params.idempotency_window_secs.max(1))
    }

    /// Create and route an intent for `request`
    pub async fn submit(&mut self, request: &OrderRequest, now: DateTime<Utc>) -> DispatchOutcome {
        let bucket = self.bucket(now);
        self.prune_keys(bucket);

        let key = IdempotencyKey::derive(&request.market_id, request.side, bucket);
        if let Some(entry) = self.keys.get(&key) {
            if entry.status != IntentStatus::Failed {
                tracing::info!(%key, market = %request.market_id, side = %request.side, "Duplicate intent suppressed");
                return DispatchOutcome::Duplicate(key);
            }
            tracing::info!(%key, market = %request.market_id, "Retrying failed intent with same key");
        }

        if !self.limiter.try_acquire(now) {
            tracing::info!(
                market = %request.market_id,
                side = %request.side,
                next = ?self.limiter.next_available_at(now),
                "Order deferred by rate limiter"
            );
            return DispatchOutcome::Deferred;
        }

        let intent = OrderIntent {
            key,
            market_id: request.market_id.clone(),
            side: request.side,
            quantity: request.quantity,
            limit_price: request.limit_price,
            mode: self.mode(),
            created_at: now,
        };

        let outcome = match &self.venue {
            Venue::Paper(engine) => {
                let fill = engine.fill(&intent, now);
                DispatchOutcome::Filled {
                    intent: intent.clone(),
                    fill,
                }
            }
            Venue::Live(client) => match client.submit(&intent).await {
                Ok(()) => {
                    tracing::info!(%key, market = %intent.market_id, side = %intent.side, "Live intent submitted");
                    DispatchOutcome::Submitted(intent.clone())
                }
                Err(error) => {
                    tracing::warn!(%key, market = %intent.market_id, error = %error, "Live submission failed");
                    DispatchOutcome::Failed {
                        intent: intent.clone(),
                        error,
                    }
                }
            },
        };

        let (status, filled) = match &outcome {
            DispatchOutcome::Filled { fill, .. } => (IntentStatus::Filled, fill.quantity),
            DispatchOutcome::Failed { .. } => (IntentStatus::Failed, Decimal::ZERO),
            _ => (IntentStatus::Pending, Decimal::ZERO),
        };
        self.keys.insert(
            key,
            KeyEntry {
                status,
                bucket,
                intent,
                filled,
            },
        );
        outcome
    }

    /// Record an asynchronous report
    ///
    /// Reports for unknown keys, for settled intents, or fills beyond the
    /// ordered quantity are refused so at-least-once delivery cannot double
    /// count. Partial fills keep the intent pending until fully filled.
    pub fn complete(&mut self, report: &ExecutionReport) -> Result<ReportUpdate, ReportError> {
        let key = report.key;
        let entry = self
            .keys
            .get_mut(&key)
            .ok_or(ReportError::UnknownKey(key))?;
        let previous = entry.status;

        match &report.outcome {
            ExecutionOutcome::Filled(fill) => {
                if !matches!(previous, IntentStatus::Pending | IntentStatus::Expired) {
                    return Err(ReportError::AlreadySettled { key, status: previous });
                }
                if fill.market_id != entry.intent.market_id || fill.side != entry.intent.side {
                    return Err(ReportError::Mismatch { key });
                }
                if entry.filled + fill.quantity > entry.intent.quantity {
                    return Err(ReportError::Overfill {
                        key,
                        filled: entry.filled,
                        quantity: fill.quantity,
                        ordered: entry.intent.quantity,
                    });
                }
                entry.filled += fill.quantity;
                if entry.filled == entry.intent.quantity {
                    entry.status = IntentStatus::Filled;
                }
            }
            ExecutionOutcome::Rejected { .. } => {
                if previous != IntentStatus::Pending {
                    return Err(ReportError::AlreadySettled { key, status: previous });
                }
                entry.status = IntentStatus::Failed;
            }
        }

        Ok(ReportUpdate {
            intent: entry.intent.clone(),
            previous,
            status: entry.status,
        })
    }

    /// Expire live intents with no final report after the pending timeout
    pub fn expire_pending(&mut self, now: DateTime<Utc>) -> Vec<OrderIntent> {
        let timeout = chrono::Duration::seconds(self.params.pending_timeout_secs.max(1));
        let mut expired = Vec::new();
        for entry in self.keys.values_mut() {
            if entry.status == IntentStatus::Pending && now - entry.intent.created_at >= timeout {
                entry.status = IntentStatus::Expired;
                expired.push(entry.intent.clone());
            }
        }
        expired
    }

    /// Unfilled notional of pending intents in one market
    pub fn pending_exposure(&self, market_id: &str) -> Decimal {
        self.keys
            .values()
            .filter(|e| e.status == IntentStatus::Pending && e.intent.market_id == market_id)
            .map(KeyEntry::open_notional)
            .sum()
    }

    /// Unfilled notional of pending intents across all markets
    pub fn total_pending_exposure(&self) -> Decimal {
        self.keys
            .values()
            .filter(|e| e.status == IntentStatus::Pending)
            .map(KeyEntry::open_notional)
            .sum()
    }

    /// Whether a market has an intent awaiting reports
    pub fn has_pending(&self, market_id: &str) -> bool {
        self.keys
            .values()
            .any(|e| e.status == IntentStatus::Pending && e.intent.market_id == market_id)
    }

    /// Status of a key, if it is still tracked
    pub fn status(&self, key: &IdempotencyKey) -> Option<IntentStatus> {
        self.keys.get(key).map(|e| e.status)
    }

    /// Intents still awaiting a live report
    pub fn pending(&self) -> Vec<OrderIntent> {
        self.keys
            .values()
            .filter(|e| e.status == IntentStatus::Pending)
            .map(|e| e.intent.clone())
            .collect()
    }

    /// Best-effort cancel of every pending live intent
    pub async fn cancel_pending(&self) {
        let Venue::Live(client) = &self.venue else {
            return;
        };
        for intent in self.pending() {
            Self::request_cancel(client.as_ref(), &intent.key).await;
        }
    }

    /// Best-effort cancel of one live intent
    pub async fn cancel(&self, key: &IdempotencyKey) {
        if let Venue::Live(client) = &self.venue {
            Self::request_cancel(client.as_ref(), key).await;
        }
    }

    async fn request_cancel(client: &dyn ExecutionClient, key: &IdempotencyKey) {
        if let Err(e) = client.cancel(key).await {
            tracing::warn!(%key, error = %e, "Cancel request failed");
        } else {
            tracing::info!(%key, "Cancel requested for in-flight intent");
        }
    }

    fn prune_keys(&mut self, bucket: i64) {
        self.keys.retain(|_, entry| {
            entry.status == IntentStatus::Pending || bucket - entry.bucket < KEY_RETENTION_BUCKETS
        });
    }
}
