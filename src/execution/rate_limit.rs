//! Order rate limiting
//!
//! Token bucket of `capacity` tokens where each token returns to the bucket
//! exactly one window after it was consumed. No trailing window ever holds
//! more than `capacity` admissions.

use chrono::{DateTime, Duration, Utc};
use std::collections::VecDeque;

/// Sliding-window token bucket
#[derive(Debug, Clone)]
pub struct RateLimiter {
    capacity: usize,
    window: Duration,
    admitted: VecDeque<DateTime<Utc>>,
}

impl RateLimiter {
    /// Create a limiter admitting `capacity` orders per `window`
    pub fn new(capacity: u32, window: Duration) -> Self {
        Self {
            capacity: capacity as usize,
            window,
            admitted: VecDeque::with_capacity(capacity as usize),
        }
    }

    /// Limiter admitting `max_orders_per_minute` per trailing minute
    pub fn per_minute(max_orders_per_minute: u32) -> Self {
        Self::new(max_orders_per_minute, Duration::seconds(60))
    }

    /// Admissions inside the trailing window ending at `now`
    pub fn in_window(&self, now: DateTime<Utc>) -> usize {
        self.admitted
            .iter()
            .filter(|t| now - **t < self.window)
            .count()
    }

    /// Tokens available at `now`
    pub fn available(&self, now: DateTime<Utc>) -> usize {
        self.capacity.saturating_sub(self.in_window(now))
    }

    /// Whether a token could be taken at `now`
    pub fn has_capacity(&self, now: DateTime<Utc>) -> bool {
        self.available(now) > 0
    }

    /// Take a token if one is available
    pub fn try_acquire(&mut self, now: DateTime<Utc>) -> bool {
        self.prune(now);
        if self.admitted.len() >= self.capacity {
            return false;
        }
        self.admitted.push_back(now);
        true
    }

    /// When the next token frees up; `None` when one is available now
    pub fn next_available_at(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        if self.has_capacity(now) {
            return None;
        }
        let oldest_in_window = self
            .admitted
            .iter()
            .find(|t| now - **t < self.window)?;
        Some(*oldest_in_window + self.window)
    }

    /// Configured capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn prune(&mut self, now: DateTime<Utc>) {
        while let Some(oldest) = self.admitted.front() {
            if now - *oldest >= self.window {
                self.admitted.pop_front();
            } else {
                break;
            }
        }
    }
}
