//! Process-wide query rate limiting.
//!
//! Admissions are handed out as evenly spaced time slots, one every
//! `1 / queries_per_second`. The schedule is continuous, so it carries over
//! from one scrape cycle to the next instead of resetting.

use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::{sleep_until, Instant};
use tracing::trace;

/// Shared allowance of registry queries per second.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateBudget {
    pub queries_per_second: f64,
    pub enabled: bool,
}

impl RateBudget {
    /// A limit that is zero, negative or not a number disables rate limiting.
    pub fn from_limit(queries_per_second: f64) -> Self {
        Self {
            queries_per_second,
            enabled: queries_per_second.is_finite() && queries_per_second > 0.0,
        }
    }

    pub fn disabled() -> Self {
        Self::from_limit(0.0)
    }

    /// Spacing between admissions. `None` when disabled, or when the limit is
    /// so small that the spacing does not fit in a `Duration`.
    pub fn interval(&self) -> Option<Duration> {
        if !self.enabled {
            return None;
        }
        Duration::try_from_secs_f64(1.0 / self.queries_per_second).ok()
    }

    /// True when an enabled limit has a usable admission spacing.
    pub fn is_representable(&self) -> bool {
        !self.enabled || self.interval().is_some()
    }
}

#[derive(Debug)]
pub struct RateLimiter {
    interval: Option<Duration>,
    next_slot: Mutex<Option<Instant>>,
}

impl RateLimiter {
    /// A budget without a representable spacing gives a disabled limiter.
    /// Configuration validation rejects such budgets.
    pub fn new(budget: RateBudget) -> Self {
        Self {
            interval: budget.interval(),
            next_slot: Mutex::new(None),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.interval.is_some()
    }

    /// Waits until the caller may issue one query.
    ///
    /// Returns immediately when rate limiting is disabled. Slots are reserved
    /// under the lock and waited for outside of it, so concurrent callers queue
    /// up in arrival order without holding each other up beyond their slot.
    pub async fn admit(&self) {
        let Some(interval) = self.interval else {
            return;
        };

        let slot = {
            let mut next_slot = self.next_slot.lock().await;
            let now = Instant::now();
            let slot = match *next_slot {
                Some(reserved) if reserved > now => reserved,
                _ => now,
            };
            *next_slot = Some(slot + interval);
            slot
        };

        trace!(
            wait_ms = slot.saturating_duration_since(Instant::now()).as_millis() as u64,
            "Rate limiter slot reserved"
        );
        sleep_until(slot).await;
    }
}
