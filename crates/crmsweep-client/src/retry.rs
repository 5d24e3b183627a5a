use crate::error::ClientError;
use rand::Rng;
use std::time::Duration;

/// Exponential backoff with jitter for per-operation retries against the
/// CRM. Only errors that classify as retryable are attempted again.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub max_retries: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(30),
            max_retries: 3,
        }
    }
}

impl RetryPolicy {
    pub fn run<T>(
        &self,
        mut op: impl FnMut() -> Result<T, ClientError>,
    ) -> Result<T, ClientError> {
        let mut attempt = 0u32;
        loop {
            match op() {
                Ok(value) => return Ok(value),
                Err(err) if attempt < self.max_retries && err.is_retryable() => {
                    std::thread::sleep(self.delay_for(attempt));
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Doubling delay capped at `max_delay`, jittered uniformly into the
    /// upper half of the window so concurrent workers fan out.
    fn delay_for(&self, attempt: u32) -> Duration {
        let base = self
            .initial_delay
            .saturating_mul(2u32.saturating_pow(attempt))
            .min(self.max_delay);
        let millis = base.as_millis() as u64;
        if millis == 0 {
            return base;
        }
        let jittered = rand::thread_rng().gen_range(millis / 2..=millis);
        Duration::from_millis(jittered)
    }
}

#[cfg(test)]
mod tests {
    use super::RetryPolicy;
    use crate::error::ClientError;
    use std::time::Duration;

    fn fast_policy() -> RetryPolicy {
        RetryPolicy {
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(4),
            max_retries: 3,
        }
    }

    fn http(status: u16) -> ClientError {
        ClientError::Http {
            status,
            message: String::new(),
        }
    }

    #[test]
    fn retries_transient_errors_until_success() {
        let mut calls = 0;
        let result = fast_policy().run(|| {
            calls += 1;
            if calls < 3 {
                Err(http(503))
            } else {
                Ok(calls)
            }
        });
        assert_eq!(result.expect("eventually succeeds"), 3);
    }

    #[test]
    fn gives_up_after_max_retries() {
        let mut calls = 0;
        let result: Result<(), _> = fast_policy().run(|| {
            calls += 1;
            Err(http(429))
        });
        assert!(result.is_err());
        // One initial attempt plus three retries.
        assert_eq!(calls, 4);
    }

    #[test]
    fn non_retryable_errors_fail_immediately() {
        let mut calls = 0;
        let result: Result<(), _> = fast_policy().run(|| {
            calls += 1;
            Err(http(404))
        });
        assert!(result.is_err());
        assert_eq!(calls, 1);
    }

    #[test]
    fn delay_never_exceeds_the_cap() {
        let policy = fast_policy();
        for attempt in 0..10 {
            assert!(policy.delay_for(attempt) <= policy.max_delay);
        }
    }
}
