//! Endpoint pool and retry policy.
//!
//! The pool is a plain ordered list with a rotating cursor; it never talks
//! to the network itself. Only the invoker mutates the cursor.

use std::time::Duration;

use crate::error::{PayoutError, Result};

/// Ordered, de-duplicated list of RPC endpoint URLs with one active cursor.
#[derive(Debug, Clone)]
pub struct EndpointPool {
    endpoints: Vec<String>,
    active: usize,
}

impl EndpointPool {
    /// Trims and de-duplicates `urls` preserving first-seen order. At least
    /// one non-empty URL must survive.
    pub fn new<I, S>(urls: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut endpoints: Vec<String> = Vec::new();
        for url in urls {
            let cleaned = url.as_ref().trim();
            if cleaned.is_empty() {
                continue;
            }
            if !endpoints.iter().any(|existing| existing == cleaned) {
                endpoints.push(cleaned.to_string());
            }
        }
        if endpoints.is_empty() {
            return Err(PayoutError::Configuration(
                "at least one non-empty rpc endpoint url is required".to_string(),
            ));
        }
        Ok(Self { endpoints, active: 0 })
    }

    pub fn active_url(&self) -> &str {
        &self.endpoints[self.active]
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }

    pub fn urls(&self) -> &[String] {
        &self.endpoints
    }

    /// Advances the cursor to the next endpoint, wrapping around. A no-op
    /// for single-endpoint pools.
    pub fn rotate(&mut self) {
        if self.endpoints.len() > 1 {
            self.active = (self.active + 1) % self.endpoints.len();
        }
    }
}

/// Retry budget applied per endpoint, plus the shared backoff and transport
/// timeout. Process-wide per manager instance; only changed through explicit
/// reconfiguration.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_retries_per_endpoint: usize,
    pub backoff: Duration,
    pub timeout: Duration,
}

impl RetryPolicy {
    pub const DEFAULT_MAX_RETRIES: usize = 3;
    pub const DEFAULT_BACKOFF: Duration = Duration::from_millis(500);
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

    pub fn new(max_retries_per_endpoint: usize, backoff: Duration, timeout: Duration) -> Result<Self> {
        if max_retries_per_endpoint < 1 {
            return Err(PayoutError::Configuration(
                "max_retries_per_endpoint must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            max_retries_per_endpoint,
            backoff,
            timeout,
        })
    }

    /// Capped linear backoff: `backoff * min(attempts, 4)`.
    pub fn backoff_for_attempt(&self, attempts: usize) -> Duration {
        self.backoff * attempts.min(4) as u32
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries_per_endpoint: Self::DEFAULT_MAX_RETRIES,
            backoff: Self::DEFAULT_BACKOFF,
            timeout: Self::DEFAULT_TIMEOUT,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_trims_and_deduplicates_preserving_order() {
        let pool = EndpointPool::new([
            "  https://a.example ",
            "https://b.example",
            "https://a.example",
            "",
            "   ",
            "https://c.example",
        ])
        .unwrap();
        assert_eq!(
            pool.urls(),
            &[
                "https://a.example".to_string(),
                "https://b.example".to_string(),
                "https://c.example".to_string(),
            ]
        );
        assert_eq!(pool.active_url(), "https://a.example");
    }

    #[test]
    fn pool_rejects_effectively_empty_input() {
        let err = EndpointPool::new(["", "   "]).unwrap_err();
        assert!(matches!(err, PayoutError::Configuration(_)));
    }

    #[test]
    fn rotation_wraps_and_single_endpoint_is_a_noop() {
        let mut pool = EndpointPool::new(["a", "b", "c"]).unwrap();
        pool.rotate();
        assert_eq!(pool.active_url(), "b");
        pool.rotate();
        pool.rotate();
        assert_eq!(pool.active_url(), "a");

        let mut single = EndpointPool::new(["only"]).unwrap();
        single.rotate();
        assert_eq!(single.active_url(), "only");
    }

    #[test]
    fn retry_policy_rejects_zero_retries() {
        let err = RetryPolicy::new(0, Duration::ZERO, Duration::from_secs(1)).unwrap_err();
        assert!(matches!(err, PayoutError::Configuration(_)));
    }

    #[test]
    fn backoff_is_linear_and_capped_at_four() {
        let policy =
            RetryPolicy::new(3, Duration::from_millis(100), Duration::from_secs(1)).unwrap();
        assert_eq!(policy.backoff_for_attempt(1), Duration::from_millis(100));
        assert_eq!(policy.backoff_for_attempt(3), Duration::from_millis(300));
        assert_eq!(policy.backoff_for_attempt(4), Duration::from_millis(400));
        assert_eq!(policy.backoff_for_attempt(10), Duration::from_millis(400));
    }
}
