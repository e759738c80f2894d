//! Request rate limiting
//!
//! One `RateLimiter` is shared by every execution path that issues page
//! fetches. It hands out send slots spaced by a uniform random delay drawn
//! from the configured bounds, so the aggregate request rate stays bounded
//! no matter how many workers are running. A worker acquires its slot
//! before each fetch; the first slot is available immediately.

use rand::Rng;
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;

/// Shared, slot-based rate limiter
pub struct RateLimiter {
    delay_min_secs: f64,
    delay_max_secs: f64,
    next_slot: Mutex<Instant>,
}

impl RateLimiter {
    /// Creates a limiter with the given delay bounds in seconds
    pub fn new(delay_min_secs: f64, delay_max_secs: f64) -> Self {
        Self {
            delay_min_secs,
            delay_max_secs,
            next_slot: Mutex::new(Instant::now()),
        }
    }

    /// Samples a delay uniformly at random from [min, max]
    fn sample_delay(&self) -> Duration {
        let secs = if self.delay_max_secs > self.delay_min_secs {
            rand::thread_rng().gen_range(self.delay_min_secs..self.delay_max_secs)
        } else {
            self.delay_min_secs
        };
        Duration::from_secs_f64(secs)
    }

    /// Waits until this caller's send slot arrives
    ///
    /// Claims the next free slot, pushes the shared slot forward by a
    /// fresh delay sample, and sleeps until the claimed slot. Concurrent
    /// callers serialize on the slot clock, not on each other's sleeps.
    ///
    /// # Returns
    ///
    /// The duration actually waited, for logging
    pub async fn acquire(&self) -> Duration {
        let (slot, waited) = {
            let mut next = self.next_slot.lock().unwrap();
            let now = Instant::now();
            let slot = (*next).max(now);
            *next = slot + self.sample_delay();
            (slot, slot.saturating_duration_since(now))
        };

        tokio::time::sleep_until(slot).await;
        waited
    }
}
