// src/errors.rs

// error handling for the key limiter and batch scheduler types

// dependencies
use thiserror::Error;

/// Error type for RateLimiter configuration and accounting issues.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LimiterError {
    #[error("At least one API key is required")]
    EmptyKeyList,
    #[error("Duplicate API key at position {0}")]
    DuplicateKey(usize),
    #[error("Requests per minute must be positive")]
    InvalidQuota,
    #[error("Window must be longer than zero")]
    InvalidWindow,
    #[error("Key is not managed by this limiter")]
    UnknownKey,
}

/// Error returned by `BatchScheduler::run` when a fetch fails.
///
/// Carries the results of every batch that finished before the failing one,
/// in input order, so the caller can keep the work already done.
#[derive(Debug, Error)]
#[error("batch {batch} failed after {} items completed", .completed.len())]
pub struct BatchError<T, E> {
    /// Results of all batches that completed before the failure.
    pub completed: Vec<T>,
    /// Zero-based index of the batch that failed.
    pub batch: usize,
    /// The error returned by the failing fetch.
    #[source]
    pub source: E,
}

impl<T, E> BatchError<T, E> {
    /// Consume the error and return the underlying fetch error.
    pub fn into_source(self) -> E {
        self.source
    }
}
