// src/scheduler.rs

// runs bulk work wave by wave against a shared limiter

// dependencies
use crate::clock::{Clock, MonotonicClock};
use crate::errors::BatchError;
use crate::key_limiter::{Batch, RateLimiter, Reservation};
use futures::future::try_join_all;
use std::future::Future;
use std::sync::Arc;
use tracing::debug;

/// Executes bulk work through a shared [`RateLimiter`].
///
/// Each batch runs concurrently; batches run one after another, one quota
/// window apart. Dropping the future returned by
/// [`BatchScheduler::run`] cancels the fetches in flight and skips every batch
/// not yet started, without touching other users of the limiter.
#[derive(Debug)]
pub struct BatchScheduler<C = MonotonicClock>
where
    C: Clock,
{
    limiter: Arc<RateLimiter<C>>,
}

impl<C> Clone for BatchScheduler<C>
where
    C: Clock,
{
    fn clone(&self) -> Self {
        Self {
            limiter: Arc::clone(&self.limiter),
        }
    }
}

impl<C> BatchScheduler<C>
where
    C: Clock,
{
    pub fn new(limiter: Arc<RateLimiter<C>>) -> Self {
        Self { limiter }
    }

    pub fn limiter(&self) -> &Arc<RateLimiter<C>> {
        &self.limiter
    }

    /// Run `fetch` once per item, each call paired with a key with a free slot.
    ///
    /// The first wave starts at once with whatever slots are free; each later wave
    /// starts one window after the previous one finished. Every wave claims its
    /// slots through `RateLimiter::reserve` right before it starts, so callers
    /// sharing the limiter in the meantime are accounted for. Results come back
    /// in the order of `items`. The first failing fetch ends the run; the error
    /// carries the results of the batches completed before it.
    pub async fn run<I, T, E, F, Fut>(&self, items: Vec<I>, fetch: F) -> Result<Vec<T>, BatchError<T, E>>
    where
        F: Fn(I, String) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let count = items.len();
        let mut pending: Vec<Option<I>> = items.into_iter().map(Some).collect();
        let mut results = Vec::with_capacity(count);
        let mut number = 0;

        while results.len() < count {
            if number > 0 {
                debug!(
                    batch = number,
                    delay_ms = self.limiter.window().as_millis() as u64,
                    "waiting for quota window"
                );
                tokio::time::sleep(self.limiter.window()).await;
            }

            let batch = self.reserve(results.len(), count - results.len()).await;
            debug!(batch = number, size = batch.len(), remaining = count - results.len(), "starting batch");

            let mut fetches = Vec::with_capacity(batch.len());
            for assignment in batch.into_assignments() {
                // reservations hand out each remaining item exactly once
                if let Some(item) = pending[assignment.item].take() {
                    fetches.push(fetch(item, assignment.key));
                }
            }

            match try_join_all(fetches).await {
                Ok(batch_results) => results.extend(batch_results),
                Err(source) => {
                    debug!(batch = number, "batch failed");
                    return Err(BatchError {
                        completed: results,
                        batch: number,
                        source,
                    });
                }
            }
            number += 1;
        }

        Ok(results)
    }

    // claim a non-empty wave, sleeping until a slot frees if every key is full
    async fn reserve(&self, first_item: usize, count: usize) -> Batch {
        loop {
            match self.limiter.reserve(first_item, count) {
                Reservation::Granted(batch) => return batch,
                Reservation::Wait(wait) => {
                    debug!(wait_ms = wait.as_millis() as u64, "all keys saturated, waiting");
                    tokio::time::sleep(wait).await;
                }
            }
        }
    }
}
