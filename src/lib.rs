// src/lib.rs

//! # Keyring Limiter
//!
//! Shares a set of API keys across many callers while keeping each key inside
//! its own sliding-window request quota.
//!
//! - [`RateLimiter::acquire`] hands out a key with a free slot, waiting when
//!   every key is saturated.
//! - [`RateLimiter::distribute`] plans bulk work as waves that fit the quota.
//! - [`BatchScheduler`] runs such a plan, one wave per window, and returns the
//!   results in input order.
//!
//! ## Quick Example
//!
//! ```rust
//! use keyring_limiter::RateLimiter;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let limiter = RateLimiter::new(["key-a", "key-b"], 250).unwrap();
//!
//! let key = limiter.acquire().await;
//! assert_eq!(key, "key-a");
//! assert_eq!(limiter.usage("key-a"), Some(1));
//!
//! let plan = limiter.distribute(600);
//! assert_eq!(plan.len(), 2);
//! # }
//! ```

// private modules
mod bucket;
mod clock;
mod config;
mod errors;
mod key_limiter;
mod scheduler;

// public API exports
pub use bucket::KeyBucket;
pub use clock::{Clock, MonotonicClock};
pub use config::{DEFAULT_REQUESTS_PER_MINUTE, DEFAULT_WINDOW, LimiterConfig};
pub use errors::{BatchError, LimiterError};
pub use key_limiter::{Acquisition, Assignment, Batch, KeyUsage, RateLimiter, Reservation};
pub use scheduler::BatchScheduler;
