// src/clock.rs

// clock module definition and implementations

// dependencies
use std::time::Duration;
use tokio::time::Instant;

/// Clock trait to abstract time retrieval.
/// Implementors must be thread-safe (Send + Sync).
/// The `now` method returns the monotonic time elapsed since the clock's origin.
/// Only differences between readings are meaningful, so any fixed origin works.
pub trait Clock: Send + Sync {
    fn now(&self) -> Duration;
}

/// Monotonic clock anchored on the tokio time source.
/// Under a paused tokio runtime it advances together with `tokio::time::sleep`,
/// which keeps waits computed by the limiter consistent with the time slept.
/// This is the default clock used by the RateLimiter.
#[derive(Debug, Clone)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}
