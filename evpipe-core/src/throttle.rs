//! Delivery rate limiter.
//!
//! A sliding-window admission log shared by every in-flight delivery. At
//! most `max_count` admissions fall inside any window of `period`,
//! regardless of how many tasks call [`RateLimiter::acquire`] at once.
//!
//! The accounting lock is held only while the log is updated, never while
//! a caller waits or while the caller's HTTP request runs.

use crate::config::ThrottleConfig;
use std::collections::VecDeque;
use std::num::NonZeroU32;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::time::Instant;
use tracing::trace;

/// Shared admission gate for the delivery stage.
///
/// Cloning is cheap; clones share one admission log.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    inner: Arc<RateLimiterInner>,
}

#[derive(Debug)]
struct RateLimiterInner {
    max_count: usize,
    period: Duration,
    admitted: Mutex<VecDeque<Instant>>,
}

impl RateLimiter {
    /// Create a limiter admitting `max_count` callers per `period`.
    ///
    /// A zero `period` admits every caller immediately.
    pub fn new(max_count: NonZeroU32, period: Duration) -> Self {
        let max_count = max_count.get() as usize;
        Self {
            inner: Arc::new(RateLimiterInner {
                max_count,
                period,
                admitted: Mutex::new(VecDeque::with_capacity(max_count)),
            }),
        }
    }

    pub fn from_config(config: &ThrottleConfig) -> Self {
        Self::new(config.max_count, config.period)
    }

    /// Wait until the caller is admitted. Never fails.
    ///
    /// Cancel-safe: dropping the future before it resolves consumes no slot.
    pub async fn acquire(&self) {
        loop {
            match self.try_admit(Instant::now()) {
                Ok(()) => return,
                Err(wait) => {
                    trace!(wait_ms = wait.as_millis() as u64, "Rate limit reached, waiting");
                    tokio::time::sleep(wait).await;
                }
            }
        }
    }

    /// Record an admission at `now` if the window has room; otherwise
    /// return how long until the oldest admission leaves the window.
    fn try_admit(&self, now: Instant) -> Result<(), Duration> {
        let inner = &self.inner;
        let mut admitted = inner
            .admitted
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        while let Some(&oldest) = admitted.front() {
            if now.saturating_duration_since(oldest) >= inner.period {
                admitted.pop_front();
            } else {
                break;
            }
        }

        if admitted.len() < inner.max_count {
            admitted.push_back(now);
            return Ok(());
        }

        match admitted.front() {
            Some(&oldest) => Err((oldest + inner.period).saturating_duration_since(now)),
            None => Ok(()),
        }
    }
}
