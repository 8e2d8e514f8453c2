// src/key_limiter.rs

// keyring-limiter: shares a set of API keys across callers while keeping every
// key inside its own sliding-window quota.

// dependencies
use crate::bucket::KeyBucket;
use crate::clock::{Clock, MonotonicClock};
use crate::config::LimiterConfig;
use crate::errors::LimiterError;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info, warn};

/// The main RateLimiter model.
/// C is the clock type, defaulting to MonotonicClock.
/// Bucket state and the rotation cursor sit behind one mutex so that every
/// check-and-reserve step is atomic; the lock is never held across an await.
#[derive(Debug)]
pub struct RateLimiter<C = MonotonicClock>
where
    C: Clock,
{
    keys: Vec<String>,
    index: HashMap<String, usize>,
    limit: usize,
    window: Duration,
    state: Mutex<LimiterState>,
    clock: C,
}

#[derive(Debug)]
struct LimiterState {
    buckets: Vec<KeyBucket>,
    cursor: usize,
}

/// Outcome of a single non-suspending acquisition attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Acquisition {
    /// A slot was reserved on this key.
    Granted(String),
    /// Every key is saturated; the earliest slot frees up after this long.
    Wait(Duration),
}

/// Outcome of reserving a wave of slots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reservation {
    /// These assignments are charged and may run right away.
    Granted(Batch),
    /// No key has a free slot; the earliest one frees up after this long.
    Wait(Duration),
}

/// One unit of planned work: the item at `item` (input position) runs on `key`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    pub item: usize,
    pub key: String,
    pub(crate) bucket: usize,
}

/// A wave of assignments meant to run concurrently.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    delay: Duration,
    assignments: Vec<Assignment>,
}

impl Batch {
    /// Time to wait after the previous batch finished before starting this one.
    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn assignments(&self) -> &[Assignment] {
        &self.assignments
    }

    pub fn len(&self) -> usize {
        self.assignments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }

    /// Number of assignments placed on `key` in this batch.
    pub fn count_for(&self, key: &str) -> usize {
        self.assignments.iter().filter(|a| a.key == key).count()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Assignment> {
        self.assignments.iter()
    }

    pub fn into_assignments(self) -> Vec<Assignment> {
        self.assignments
    }
}

impl<'a> IntoIterator for &'a Batch {
    type Item = &'a Assignment;
    type IntoIter = std::slice::Iter<'a, Assignment>;

    fn into_iter(self) -> Self::IntoIter {
        self.assignments.iter()
    }
}

/// Point-in-time usage of one key, for monitoring.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyUsage {
    /// Position of the key in the limiter's key list.
    pub position: usize,
    /// Requests charged in the current window.
    pub used: usize,
    /// Slots left in the current window.
    pub available: usize,
    /// Time until the next slot frees up, zero if one is free now.
    pub retry_after: Duration,
}

impl RateLimiter<MonotonicClock> {
    /// Create a limiter over `keys` with the default 60s window.
    pub fn new<I, K>(keys: I, requests_per_minute: u32) -> Result<Self, LimiterError>
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        Self::with_config(keys, LimiterConfig::new(requests_per_minute), MonotonicClock::new())
    }
}

// methods for the RateLimiter type
impl<C> RateLimiter<C>
where
    C: Clock,
{
    // method to create a new rate limiter from a config object
    pub fn with_config<I, K>(keys: I, config: LimiterConfig, clock: C) -> Result<Self, LimiterError>
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        config.validate()?;
        let keys: Vec<String> = keys.into_iter().map(Into::into).collect();
        if keys.is_empty() {
            return Err(LimiterError::EmptyKeyList);
        }

        let mut index = HashMap::with_capacity(keys.len());
        for (position, key) in keys.iter().enumerate() {
            if index.insert(key.clone(), position).is_some() {
                return Err(LimiterError::DuplicateKey(position));
            }
        }

        let limit = config.requests_per_minute as usize;
        let buckets = keys
            .iter()
            .map(|key| KeyBucket::new(key.clone(), limit, config.window))
            .collect();

        info!(
            keys = keys.len(),
            requests_per_window = limit,
            window_secs = config.window.as_secs_f64(),
            "rate limiter initialized"
        );

        Ok(Self {
            keys,
            index,
            limit,
            window: config.window,
            state: Mutex::new(LimiterState { buckets, cursor: 0 }),
            clock,
        })
    }

    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Per-key quota within one window.
    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Theoretical maximum throughput per window across all keys.
    pub fn capacity(&self) -> usize {
        self.keys.len() * self.limit
    }

    /// Obtain a key with a free slot, waiting for one if every key is saturated.
    ///
    /// The returned key has already been charged. Each wait is the computed time
    /// until the earliest slot expires; after it the scan restarts from the
    /// cursor, since other callers may have taken slots in the meantime.
    pub async fn acquire(&self) -> String {
        loop {
            match self.try_acquire() {
                Acquisition::Granted(key) => return key,
                Acquisition::Wait(wait) => {
                    debug!(wait_ms = wait.as_millis() as u64, "all keys saturated, waiting");
                    tokio::time::sleep(wait).await;
                }
            }
        }
    }

    /// Single non-suspending acquisition attempt.
    pub fn try_acquire(&self) -> Acquisition {
        let now = self.clock.now();
        let mut state = self.state.lock();
        let len = state.buckets.len();
        let start = state.cursor;

        for offset in 0..len {
            let position = (start + offset) % len;
            let bucket = &mut state.buckets[position];
            if bucket.is_available(now) {
                bucket.record(now);
                state.cursor = (position + 1) % len;
                debug!(position, "key granted");
                return Acquisition::Granted(self.keys[position].clone());
            }
        }

        // every bucket is saturated, so each wait is strictly positive
        let wait = state
            .buckets
            .iter_mut()
            .map(|bucket| bucket.wait_until_available(now))
            .min()
            .unwrap_or(self.window);
        Acquisition::Wait(wait)
    }

    /// Charge one request against `key`, for keys obtained without `acquire`.
    pub fn record(&self, key: &str) -> Result<(), LimiterError> {
        let position = *self.index.get(key).ok_or(LimiterError::UnknownKey)?;
        let now = self.clock.now();
        let mut state = self.state.lock();
        if !state.buckets[position].record(now) {
            warn!(position, limit = self.limit, "key charged beyond its window quota");
        }
        Ok(())
    }

    /// Next key in rotation, without any quota check or accounting.
    pub fn next_key(&self) -> String {
        let mut state = self.state.lock();
        let position = state.cursor;
        state.cursor = (position + 1) % state.buckets.len();
        self.keys[position].clone()
    }

    /// Plan `count` units of work as waves that stay within every key's quota.
    ///
    /// The first batch uses the slots each key has free right now, filling one
    /// key before moving to the next, starting at the cursor. Remaining demand
    /// goes into follow-up batches of full capacity, each to start one window
    /// after the previous one. Planning reserves nothing; use `reserve` to claim
    /// the slots of a wave right before running it.
    pub fn distribute(&self, count: usize) -> Vec<Batch> {
        if count == 0 {
            return Vec::new();
        }

        let now = self.clock.now();
        let (start, mut slots) = {
            let mut state = self.state.lock();
            let slots: Vec<usize> = state
                .buckets
                .iter_mut()
                .map(|bucket| bucket.available_slots(now))
                .collect();
            (state.cursor, slots)
        };

        let mut batches = Vec::new();
        let mut next_item = 0;
        let mut delay = Duration::ZERO;

        while next_item < count {
            let assignments = self.fill(start, &slots, next_item, count - next_item);
            next_item += assignments.len();

            // an exhausted snapshot yields no first wave; the full-capacity wave
            // then inherits the one-window delay
            if !assignments.is_empty() {
                batches.push(Batch { delay, assignments });
            }
            delay = self.window;
            slots.fill(self.limit);
        }

        debug!(count, batches = batches.len(), "distribution planned");
        batches
    }

    /// Claim the slots free right now for items `first_item..first_item + count`.
    ///
    /// Slots are filled the same way as the first batch of `distribute`, and every
    /// assignment is charged under the same lock that read the free slots, so the
    /// wave can run without pushing any key past its quota. When no slot is free
    /// the result says how long until the earliest one frees up.
    pub fn reserve(&self, first_item: usize, count: usize) -> Reservation {
        let now = self.clock.now();
        let mut state = self.state.lock();
        let slots: Vec<usize> = state
            .buckets
            .iter_mut()
            .map(|bucket| bucket.available_slots(now))
            .collect();

        let assignments = self.fill(state.cursor, &slots, first_item, count);
        if assignments.is_empty() && count > 0 {
            let wait = state
                .buckets
                .iter_mut()
                .map(|bucket| bucket.wait_until_available(now))
                .min()
                .unwrap_or(self.window);
            return Reservation::Wait(wait);
        }

        for assignment in &assignments {
            state.buckets[assignment.bucket].record(now);
        }
        debug!(first_item, reserved = assignments.len(), "wave reserved");
        Reservation::Granted(Batch {
            delay: Duration::ZERO,
            assignments,
        })
    }

    // fill up to `count` items into `slots`, one key at a time from `start`
    fn fill(&self, start: usize, slots: &[usize], first_item: usize, count: usize) -> Vec<Assignment> {
        let len = slots.len();
        let mut assignments = Vec::with_capacity(count.min(self.capacity()));
        let mut item = first_item;
        let end = first_item + count;

        for offset in 0..len {
            if item == end {
                break;
            }
            let position = (start + offset) % len;
            let take = slots[position].min(end - item);
            for _ in 0..take {
                assignments.push(Assignment {
                    item,
                    key: self.keys[position].clone(),
                    bucket: position,
                });
                item += 1;
            }
        }
        assignments
    }

    /// Requests charged to `key` in the current window.
    pub fn usage(&self, key: &str) -> Option<usize> {
        let position = *self.index.get(key)?;
        let now = self.clock.now();
        Some(self.state.lock().buckets[position].used(now))
    }

    /// Usage of every key, in key order.
    pub fn snapshot(&self) -> Vec<KeyUsage> {
        let now = self.clock.now();
        let mut state = self.state.lock();
        state
            .buckets
            .iter_mut()
            .enumerate()
            .map(|(position, bucket)| KeyUsage {
                position,
                used: bucket.used(now),
                available: bucket.available_slots(now),
                retry_after: bucket.wait_until_available(now),
            })
            .collect()
    }
}
