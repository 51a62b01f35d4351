//! Execution module
//!
//! Order intents, rate limiting, and paper/live routing

mod dispatcher;
mod paper;
mod rate_limit;
mod types;

pub use dispatcher::{
    DispatchOutcome, DispatcherParams, IntentStatus, OrderIntentDispatcher, OrderRequest,
    ReportError, ReportUpdate,
};
pub use paper::PaperEngine;
pub use rate_limit::RateLimiter;
pub use types::{
    ExecutionError, ExecutionOutcome, ExecutionReport, Fill, IdempotencyKey, OrderIntent,
};

use async_trait::async_trait;

/// Trait for execution venue implementations
///
/// `submit` only acknowledges delivery; fills and rejections arrive later as
/// `ExecutionReport`s on the engine's report channel.
#[async_trait]
pub trait ExecutionClient: Send + Sync {
    /// Submit an order intent
    async fn submit(&self, intent: &OrderIntent) -> Result<(), ExecutionError>;
    /// Request cancellation of an in-flight intent
    async fn cancel(&self, key: &IdempotencyKey) -> Result<(), ExecutionError>;
}
