//! Token bucket used for per-network rate accounting.

use std::time::Instant;

const SECONDS_PER_MINUTE: f64 = 60.0;

/// A token bucket that refills continuously.
///
/// Credits accrue at `rate_per_minute / 60` per second up to a capacity equal
/// to `rate_per_minute`, so a fresh bucket admits a full minute's budget at
/// once. The bucket is not synchronized; the store serializes access to it.
#[derive(Debug, Clone)]
pub struct TokenBucket {
    /// Maximum number of credits, also the number added per minute
    capacity: f64,
    /// Credits currently available
    tokens: f64,
    /// Instant the credits were last brought up to date
    last_refill: Instant,
}

impl TokenBucket {
    /// Create a full bucket.
    pub fn new(rate_per_minute: u32, now: Instant) -> Self {
        let capacity = f64::from(rate_per_minute);
        Self {
            capacity,
            tokens: capacity,
            last_refill: now,
        }
    }

    /// Take one credit if available.
    ///
    /// Returns `true` and deducts a credit when at least one is available at
    /// `now`; otherwise returns `false` and leaves the balance untouched.
    pub fn allow(&mut self, now: Instant) -> bool {
        self.refill(now);

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    /// Credits available at `now`, without consuming any.
    pub fn available(&self, now: Instant) -> f64 {
        let elapsed = now.saturating_duration_since(self.last_refill);
        let earned = elapsed.as_secs_f64() * self.capacity / SECONDS_PER_MINUTE;
        (self.tokens + earned).min(self.capacity)
    }

    /// Maximum number of credits.
    pub fn capacity(&self) -> f64 {
        self.capacity
    }

    fn refill(&mut self, now: Instant) {
        // Instants earlier than the last refill add nothing.
        if now > self.last_refill {
            self.tokens = self.available(now);
            self.last_refill = now;
        }
    }
}
