// src/config.rs

//! Configuration types for the key limiter

// dependencies
use crate::errors::LimiterError;
use std::time::Duration;

/// Default per-key quota, matching the upstream API's published limit.
pub const DEFAULT_REQUESTS_PER_MINUTE: u32 = 250;

/// Default length of the sliding window.
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(60);

/// Configuration for rate limiter behavior
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LimiterConfig {
    pub(crate) requests_per_minute: u32,
    pub(crate) window: Duration,
}

impl LimiterConfig {
    /// Create a new configuration with a per-key quota and the default 60s window
    pub fn new(requests_per_minute: u32) -> Self {
        Self {
            requests_per_minute,
            window: DEFAULT_WINDOW,
        }
    }

    /// Builder-style: set the per-key quota
    pub fn requests_per_minute(mut self, requests_per_minute: u32) -> Self {
        self.requests_per_minute = requests_per_minute;
        self
    }

    /// Builder-style: set the sliding window length
    ///
    /// The quota still counts requests per window; the name keeps the upstream
    /// terminology even when the window is not a minute.
    pub fn window(mut self, window: Duration) -> Self {
        self.window = window;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), LimiterError> {
        if self.requests_per_minute == 0 {
            return Err(LimiterError::InvalidQuota);
        }
        if self.window.is_zero() {
            return Err(LimiterError::InvalidWindow);
        }
        Ok(())
    }
}

impl Default for LimiterConfig {
    fn default() -> Self {
        Self::new(DEFAULT_REQUESTS_PER_MINUTE)
    }
}
