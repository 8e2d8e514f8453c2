// tests/keylimiter/error_tests.rs

#[cfg(test)]
mod tests {
    use crate::fixtures::test_clock::TestClock;
    use keyring_limiter::{BatchError, LimiterConfig, LimiterError, RateLimiter};
    use std::error::Error;

    #[derive(Debug, thiserror::Error)]
    #[error("upstream returned 500")]
    struct ServerError;

    #[test]
    fn record_rejects_unknown_key() {
        let limiter = RateLimiter::with_config(["key-a"], LimiterConfig::new(5), TestClock::new(0.0)).unwrap();

        let result = limiter.record("key-z");
        assert_eq!(result, Err(LimiterError::UnknownKey));
        assert_eq!(limiter.usage("key-a"), Some(0));
    }

    #[test]
    fn usage_of_unknown_key_is_none() {
        let limiter = RateLimiter::with_config(["key-a"], LimiterConfig::new(5), TestClock::new(0.0)).unwrap();
        assert_eq!(limiter.usage("key-z"), None);
    }

    #[test]
    fn limiter_errors_do_not_leak_keys() {
        let result = RateLimiter::new(["secret-1", "secret-1"], 5);
        let message = result.unwrap_err().to_string();
        assert!(!message.contains("secret-1"));
        assert_eq!(message, "Duplicate API key at position 1");
    }

    #[test]
    fn error_messages() {
        assert_eq!(LimiterError::EmptyKeyList.to_string(), "At least one API key is required");
        assert_eq!(LimiterError::InvalidQuota.to_string(), "Requests per minute must be positive");
        assert_eq!(LimiterError::InvalidWindow.to_string(), "Window must be longer than zero");
    }

    #[test]
    fn batch_error_exposes_fetch_error_as_source() {
        let error = BatchError {
            completed: vec![1, 2, 3],
            batch: 1,
            source: ServerError,
        };

        assert_eq!(error.to_string(), "batch 1 failed after 3 items completed");
        assert_eq!(error.source().unwrap().to_string(), "upstream returned 500");
        assert!(matches!(error.into_source(), ServerError));
    }
}
