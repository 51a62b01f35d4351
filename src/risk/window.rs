//! Trailing time windows for error rates

use chrono::{DateTime, Duration, Utc};
use std::collections::VecDeque;

/// Timestamped outcomes within a trailing span
#[derive(Debug, Clone)]
pub struct RollingWindow {
    span: Duration,
    events: VecDeque<(DateTime<Utc>, bool)>,
}

impl RollingWindow {
    pub fn new(span: Duration) -> Self {
        Self {
            span,
            events: VecDeque::new(),
        }
    }

    /// Record an event; `failed` marks it as an error
    pub fn record(&mut self, now: DateTime<Utc>, failed: bool) {
        self.prune(now);
        self.events.push_back((now, failed));
    }

    /// Events inside the window
    pub fn count(&mut self, now: DateTime<Utc>) -> usize {
        self.prune(now);
        self.events.len()
    }

    /// Failed events inside the window
    pub fn failures(&mut self, now: DateTime<Utc>) -> usize {
        self.prune(now);
        self.events.iter().filter(|(_, failed)| *failed).count()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }

    fn prune(&mut self, now: DateTime<Utc>) {
        let cutoff = now - self.span;
        while let Some((at, _)) = self.events.front() {
            if *at > cutoff {
                break;
            }
            self.events.pop_front();
        }
    }
}
