// tests/keylimiter/concurrency_tests.rs

#[cfg(test)]
mod tests {
    use crate::fixtures::test_clock::TestClock;
    use keyring_limiter::{Acquisition, LimiterConfig, MonotonicClock, RateLimiter};
    use std::collections::HashMap;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;
    use tokio::time::Instant;

    #[test]
    fn racing_threads_never_oversubscribe_a_key() {
        let clock = TestClock::new(0.0);
        let limiter = Arc::new(
            RateLimiter::with_config(["key-a", "key-b", "key-c"], LimiterConfig::new(25), clock).unwrap(),
        );

        let handles: Vec<_> = (0..32)
            .map(|_| {
                let limiter = Arc::clone(&limiter);
                thread::spawn(move || {
                    (0..20)
                        .filter(|_| matches!(limiter.try_acquire(), Acquisition::Granted(_)))
                        .count()
                })
            })
            .collect();

        let granted: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();

        assert_eq!(granted, 75);
        for key in limiter.keys() {
            assert_eq!(limiter.usage(key), Some(25));
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_acquires_below_capacity_all_succeed() {
        let clock = TestClock::new(0.0);
        let limiter = Arc::new(
            RateLimiter::with_config(["key-a", "key-b", "key-c", "key-d"], LimiterConfig::new(50), clock).unwrap(),
        );

        let tasks: Vec<_> = (0..16)
            .map(|_| {
                let limiter = Arc::clone(&limiter);
                tokio::spawn(async move {
                    let mut keys = Vec::new();
                    for _ in 0..10 {
                        keys.push(limiter.acquire().await);
                    }
                    keys
                })
            })
            .collect();

        let mut per_key: HashMap<String, usize> = HashMap::new();
        for task in tasks {
            for key in task.await.unwrap() {
                *per_key.entry(key).or_default() += 1;
            }
        }

        assert_eq!(per_key.values().sum::<usize>(), 160);
        // round-robin spreads the load evenly while nothing saturates
        for key in limiter.keys() {
            assert_eq!(per_key[key], 40);
            assert_eq!(limiter.usage(key), Some(40));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn saturating_callers_respect_every_rolling_window() {
        let window = Duration::from_secs(60);
        let limiter = Arc::new(
            RateLimiter::with_config(["key-a", "key-b"], LimiterConfig::new(10).window(window), MonotonicClock::new())
                .unwrap(),
        );
        let started = Instant::now();

        let tasks: Vec<_> = (0..50)
            .map(|_| {
                let limiter = Arc::clone(&limiter);
                tokio::spawn(async move {
                    let key = limiter.acquire().await;
                    (key, started.elapsed())
                })
            })
            .collect();

        let mut grants: HashMap<String, Vec<Duration>> = HashMap::new();
        for task in tasks {
            let (key, at) = task.await.unwrap();
            grants.entry(key).or_default().push(at);
        }

        assert_eq!(grants.values().map(Vec::len).sum::<usize>(), 50);
        for times in grants.values_mut() {
            times.sort();
            for pair in times.windows(11) {
                assert!(pair[10] - pair[0] >= window, "more than 10 grants inside one window");
            }
        }
        // 20 grants per window: the last ten go out two windows in
        let last = grants.values().flatten().max().copied().unwrap();
        assert!(last >= Duration::from_secs(120));
        assert!(last < Duration::from_secs(121));
    }
}
