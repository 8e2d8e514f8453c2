// src/bucket.rs

// per-key sliding window usage tracking

// dependencies
use std::collections::VecDeque;
use std::time::Duration;

/// Usage history for a single API key.
///
/// Timestamps are clock readings (see [`crate::Clock`]) in ascending order.
/// A timestamp `t` counts against the quota while `t + window > now`; expired
/// entries are pruned lazily before every read or write.
#[derive(Debug, Clone)]
pub struct KeyBucket {
    key: String,
    limit: usize,
    window: Duration,
    timestamps: VecDeque<Duration>,
}

impl KeyBucket {
    pub fn new(key: impl Into<String>, limit: usize, window: Duration) -> Self {
        Self {
            key: key.into(),
            limit,
            window,
            timestamps: VecDeque::with_capacity(limit),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Drop every timestamp that has left the window ending at `now`.
    pub fn prune(&mut self, now: Duration) {
        while let Some(&oldest) = self.timestamps.front() {
            match self.expires_at(oldest) {
                Some(expiry) if expiry <= now => {
                    self.timestamps.pop_front();
                }
                _ => break,
            }
        }
    }

    /// Number of requests charged within the window ending at `now`.
    pub fn used(&mut self, now: Duration) -> usize {
        self.prune(now);
        self.timestamps.len()
    }

    pub fn is_available(&mut self, now: Duration) -> bool {
        self.used(now) < self.limit
    }

    /// Slots left in the current window. Zero when the bucket has overshot.
    pub fn available_slots(&mut self, now: Duration) -> usize {
        self.limit.saturating_sub(self.used(now))
    }

    /// Time until the next slot frees up, zero if one is free now.
    pub fn wait_until_available(&mut self, now: Duration) -> Duration {
        if self.is_available(now) {
            return Duration::ZERO;
        }
        // the window is saturated, so the front entry is the next to expire;
        // an overshot bucket needs several expiries, the front one is the
        // earliest useful re-check
        match self.timestamps.front() {
            Some(&oldest) => self
                .expires_at(oldest)
                .map_or(Duration::MAX, |expiry| expiry.saturating_sub(now)),
            None => Duration::ZERO,
        }
    }

    // None when the expiry lies beyond what a Duration can hold: never expires
    fn expires_at(&self, timestamp: Duration) -> Option<Duration> {
        timestamp.checked_add(self.window)
    }

    /// Charge one request at `now`.
    ///
    /// This is an unconditional charge: callers that need the quota enforced
    /// check `is_available` first under the same lock. Returns `false` when the
    /// charge pushed the bucket past its limit.
    pub fn record(&mut self, now: Duration) -> bool {
        self.prune(now);
        // a clock reading never goes backwards, but keep the deque sorted even
        // if a caller hands in a stale `now`
        let now = match self.timestamps.back() {
            Some(&last) if last > now => last,
            _ => now,
        };
        self.timestamps.push_back(now);
        self.timestamps.len() <= self.limit
    }
}
