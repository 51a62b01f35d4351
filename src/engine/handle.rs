//! Control handle for a running engine

use super::status::EngineStatus;
use crate::risk::{RiskManager, TripReason};
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};

/// Messages from handles to the engine loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Control {
    /// Publish a fresh status
    Publish,
    /// Stop the loop and return the final snapshot
    Shutdown,
}

/// Kill switch, reset, status and shutdown for the surrounding process
///
/// Kill and reset act on the risk manager directly, so they take effect
/// before the engine's next trade approval.
#[derive(Clone)]
pub struct EngineHandle {
    risk: Arc<RiskManager>,
    status: watch::Receiver<EngineStatus>,
    control: mpsc::Sender<Control>,
}

impl EngineHandle {
    pub(crate) fn new(
        risk: Arc<RiskManager>,
        status: watch::Receiver<EngineStatus>,
        control: mpsc::Sender<Control>,
    ) -> Self {
        Self {
            risk,
            status,
            control,
        }
    }

    /// Trip the breaker manually; returns false if already halted
    pub fn kill(&self) -> bool {
        let tripped = self.risk.kill(Utc::now());
        self.request_publish();
        tripped
    }

    /// Close the breaker after review; returns the reason it was open for
    pub fn reset(&self) -> Option<TripReason> {
        let previous = self.risk.reset();
        self.request_publish();
        previous
    }

    /// Latest published status
    pub fn status(&self) -> EngineStatus {
        self.status.borrow().clone()
    }

    /// Receiver notified on every published status
    pub fn subscribe(&self) -> watch::Receiver<EngineStatus> {
        self.status.clone()
    }

    pub fn is_trading_allowed(&self) -> bool {
        self.risk.is_trading_allowed()
    }

    /// Ask the engine to stop
    pub async fn shutdown(&self) {
        if self.control.send(Control::Shutdown).await.is_err() {
            tracing::debug!("Engine already stopped");
        }
    }

    fn request_publish(&self) {
        // a full channel already has a publish or shutdown queued
        let _ = self.control.try_send(Control::Publish);
    }
}
