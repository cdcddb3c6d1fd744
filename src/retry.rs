//! Retry logic with exponential backoff for answer acquisition and storage.

use std::future::Future;
use std::time::Duration;

use crate::config::RetryConfig;
use crate::error::{AnswerError, DiverdictError, StorageError};

/// A retry policy that implements exponential backoff with optional jitter.
#[derive(Debug, Clone, Default)]
pub struct RetryPolicy {
    config: RetryConfig,
}

impl RetryPolicy {
    /// Create a new retry policy with the given configuration.
    #[must_use]
    pub const fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    /// Create a retry policy with no retries (fail immediately).
    #[must_use]
    pub fn no_retry() -> Self {
        Self {
            config: RetryConfig {
                max_retries: 0,
                ..Default::default()
            },
        }
    }

    /// Get the underlying configuration.
    #[must_use]
    pub const fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Calculate the delay for a given attempt number (0-indexed).
    #[must_use]
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss,
        clippy::cast_possible_wrap
    )]
    pub fn calculate_delay(&self, attempt: usize) -> Duration {
        // attempt as i32 is safe because powi uses i32 and retries stay small
        let base_delay = self.config.initial_delay_ms as f64
            * self.config.backoff_multiplier.powi(attempt as i32);
        let capped_delay = base_delay.min(self.config.max_delay_ms as f64);

        let final_delay = if self.config.add_jitter {
            // Jitter: random value between 0.5 and 1.5 of the delay
            let jitter_factor = 0.5 + simple_random() * 1.0;
            capped_delay * jitter_factor
        } else {
            capped_delay
        };

        // final_delay is always positive and capped, safe to truncate to u64
        Duration::from_millis(final_delay as u64)
    }

    /// Execute an async operation with retry logic.
    ///
    /// The operation will be retried up to `max_retries` times if it returns
    /// a recoverable error. The delay between retries follows exponential
    /// backoff with optional jitter.
    ///
    /// # Errors
    ///
    /// Returns the last error if all retry attempts fail.
    ///
    /// # Panics
    ///
    /// This function should not panic under normal conditions. The internal
    /// expect is a safeguard that should never be reached.
    pub async fn retry<T, E, F, Fut>(&self, mut operation: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Retryable,
    {
        let mut last_error: Option<E> = None;

        for attempt in 0..=self.config.max_retries {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(e) => {
                    if !e.is_retryable() || attempt == self.config.max_retries {
                        return Err(e);
                    }

                    tracing::warn!(
                        attempt = attempt + 1,
                        max_retries = self.config.max_retries,
                        "Operation failed, retrying: {:?}",
                        e.error_message()
                    );

                    last_error = Some(e);

                    let delay = self.calculate_delay(attempt);
                    tokio::time::sleep(delay).await;
                }
            }
        }

        // This should not be reached, but return the last error if it somehow is
        Err(last_error.expect("retry loop should have returned"))
    }

    /// Execute an async operation with retry logic and a custom retryable check.
    ///
    /// # Errors
    ///
    /// Returns the last error if all retry attempts fail.
    ///
    /// # Panics
    ///
    /// This function should not panic under normal conditions. The internal
    /// expect is a safeguard that should never be reached.
    pub async fn retry_with_check<T, E, F, Fut, C>(
        &self,
        mut operation: F,
        is_retryable: C,
    ) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        C: Fn(&E) -> bool,
    {
        let mut last_error: Option<E> = None;

        for attempt in 0..=self.config.max_retries {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(e) => {
                    if !is_retryable(&e) || attempt == self.config.max_retries {
                        return Err(e);
                    }

                    last_error = Some(e);

                    let delay = self.calculate_delay(attempt);
                    tokio::time::sleep(delay).await;
                }
            }
        }

        Err(last_error.expect("retry loop should have returned"))
    }
}

/// Trait for errors that can indicate whether they are retryable.
pub trait Retryable {
    /// Returns true if the error is transient and the operation should be retried.
    fn is_retryable(&self) -> bool;

    /// Returns a human-readable error message for logging.
    fn error_message(&self) -> String;
}

impl Retryable for DiverdictError {
    fn is_retryable(&self) -> bool {
        match self {
            DiverdictError::Answer(e) => e.is_retryable(),
            DiverdictError::Storage(e) => e.is_retryable(),
            // Catalog problems degrade to an empty catalog instead of retrying
            DiverdictError::Catalog(_) => false,
            DiverdictError::Pipeline(_) => false,
            DiverdictError::Config(_) => false,
            // IO errors might be transient
            DiverdictError::Io(e) => {
                matches!(
                    e.kind(),
                    std::io::ErrorKind::TimedOut
                        | std::io::ErrorKind::ConnectionReset
                        | std::io::ErrorKind::ConnectionAborted
                        | std::io::ErrorKind::Interrupted
                )
            }
            DiverdictError::Serialization(_) => false,
        }
    }

    fn error_message(&self) -> String {
        self.to_string()
    }
}

impl Retryable for AnswerError {
    fn is_retryable(&self) -> bool {
        match self {
            // Provider failures and empty payloads might be transient
            AnswerError::Provider(_) | AnswerError::EmptyAnswer(_) => true,
            // These are input problems, retrying cannot fix them
            AnswerError::QuestionTooLong { .. } | AnswerError::EmptyQuestion => false,
        }
    }

    fn error_message(&self) -> String {
        self.to_string()
    }
}

impl Retryable for StorageError {
    fn is_retryable(&self) -> bool {
        match self {
            // Backend failures might be transient
            StorageError::Backend(_) => true,
            StorageError::NotFound(_) | StorageError::Serialization(_) => false,
        }
    }

    fn error_message(&self) -> String {
        self.to_string()
    }
}

/// Simple pseudo-random number generator for jitter.
/// Uses a basic LCG (Linear Congruential Generator) seeded from system time.
#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
fn simple_random() -> f64 {
    use std::cell::Cell;
    use std::time::SystemTime;

    thread_local! {
        static SEED: Cell<u64> = Cell::new(
            SystemTime::now()
                .duration_since(SystemTime::UNIX_EPOCH)
                .map(|d| d.as_nanos() as u64)
                .unwrap_or(12345)
        );
    }

    SEED.with(|seed| {
        let mut s = seed.get();
        // LCG parameters from Numerical Recipes
        s = s.wrapping_mul(6_364_136_223_846_793_005).wrapping_add(1);
        seed.set(s);
        // Convert to f64 in range [0, 1)
        (s >> 11) as f64 / (1u64 << 53) as f64
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_retry_config_defaults() {
        let config = RetryConfig::default();
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.initial_delay_ms, 100);
        assert_eq!(config.max_delay_ms, 5000);
        assert!((config.backoff_multiplier - 2.0).abs() < f64::EPSILON);
        assert!(config.add_jitter);
    }

    #[test]
    fn test_retry_policy_no_retry() {
        let policy = RetryPolicy::no_retry();
        assert_eq!(policy.config().max_retries, 0);
    }

    #[test]
    fn test_calculate_delay_no_jitter() {
        let policy = RetryPolicy::new(
            RetryConfig::new()
                .with_initial_delay_ms(100)
                .with_backoff_multiplier(2.0)
                .with_max_delay_ms(10000)
                .with_jitter(false),
        );

        assert_eq!(policy.calculate_delay(0).as_millis(), 100);
        assert_eq!(policy.calculate_delay(1).as_millis(), 200);
        assert_eq!(policy.calculate_delay(2).as_millis(), 400);
    }

    #[test]
    fn test_calculate_delay_capped() {
        let policy = RetryPolicy::new(
            RetryConfig::new()
                .with_initial_delay_ms(1000)
                .with_backoff_multiplier(10.0)
                .with_max_delay_ms(5000)
                .with_jitter(false),
        );

        // Attempt 2: 1000 * 10^2 = 100000, capped to 5000
        assert_eq!(policy.calculate_delay(2).as_millis(), 5000);
    }

    #[test]
    #[allow(clippy::cast_possible_truncation)]
    fn test_calculate_delay_with_jitter() {
        let policy = RetryPolicy::new(
            RetryConfig::new()
                .with_initial_delay_ms(100)
                .with_backoff_multiplier(2.0)
                .with_max_delay_ms(10000)
                .with_jitter(true),
        );

        // Base is 100ms, with jitter factor 0.5-1.5, result is 50-150ms
        let ms = policy.calculate_delay(0).as_millis() as u64;
        assert!(ms >= 50, "delay {ms} should be >= 50");
        assert!(ms <= 150, "delay {ms} should be <= 150");
    }

    #[tokio::test]
    async fn test_retry_success_first_attempt() {
        let policy = RetryPolicy::new(RetryConfig::new().with_max_retries(3));
        let attempt_count = Arc::new(AtomicUsize::new(0));
        let count_clone = Arc::clone(&attempt_count);

        let result: Result<i32, AnswerError> = policy
            .retry(|| {
                let count = Arc::clone(&count_clone);
                async move {
                    count.fetch_add(1, Ordering::SeqCst);
                    Ok(42)
                }
            })
            .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(attempt_count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_retry_success_after_failures() {
        let policy = RetryPolicy::new(
            RetryConfig::new()
                .with_max_retries(3)
                .with_initial_delay_ms(1)
                .with_jitter(false),
        );
        let attempt_count = Arc::new(AtomicUsize::new(0));
        let count_clone = Arc::clone(&attempt_count);

        let result: Result<i32, AnswerError> = policy
            .retry(|| {
                let count = Arc::clone(&count_clone);
                async move {
                    let attempts = count.fetch_add(1, Ordering::SeqCst);
                    if attempts < 2 {
                        Err(AnswerError::Provider("transient error".to_string()))
                    } else {
                        Ok(42)
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(attempt_count.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retry_all_attempts_fail() {
        let policy = RetryPolicy::new(
            RetryConfig::new()
                .with_max_retries(2)
                .with_initial_delay_ms(1)
                .with_jitter(false),
        );
        let attempt_count = Arc::new(AtomicUsize::new(0));
        let count_clone = Arc::clone(&attempt_count);

        let result: Result<i32, AnswerError> = policy
            .retry(|| {
                let count = Arc::clone(&count_clone);
                async move {
                    count.fetch_add(1, Ordering::SeqCst);
                    Err(AnswerError::Provider("persistent error".to_string()))
                }
            })
            .await;

        assert!(result.is_err());
        // Initial attempt + 2 retries = 3 total attempts
        assert_eq!(attempt_count.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retry_non_retryable_error() {
        let policy = RetryPolicy::new(
            RetryConfig::new()
                .with_max_retries(3)
                .with_initial_delay_ms(1)
                .with_jitter(false),
        );
        let attempt_count = Arc::new(AtomicUsize::new(0));
        let count_clone = Arc::clone(&attempt_count);

        let result: Result<i32, AnswerError> = policy
            .retry(|| {
                let count = Arc::clone(&count_clone);
                async move {
                    count.fetch_add(1, Ordering::SeqCst);
                    Err(AnswerError::EmptyQuestion)
                }
            })
            .await;

        assert!(result.is_err());
        // Should fail immediately without retries
        assert_eq!(attempt_count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_retry_with_custom_check() {
        let policy = RetryPolicy::new(
            RetryConfig::new()
                .with_max_retries(3)
                .with_initial_delay_ms(1)
                .with_jitter(false),
        );
        let attempt_count = Arc::new(AtomicUsize::new(0));
        let count_clone = Arc::clone(&attempt_count);

        // Custom check: only retry if error contains "retry"
        let result: Result<i32, String> = policy
            .retry_with_check(
                || {
                    let count = Arc::clone(&count_clone);
                    async move {
                        let attempts = count.fetch_add(1, Ordering::SeqCst);
                        if attempts < 2 {
                            Err("retry this error".to_string())
                        } else {
                            Ok(42)
                        }
                    }
                },
                |e: &String| e.contains("retry"),
            )
            .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(attempt_count.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_answer_error_retryable() {
        assert!(AnswerError::Provider("test".to_string()).is_retryable());
        assert!(AnswerError::EmptyAnswer("model_a".to_string()).is_retryable());
        assert!(!AnswerError::EmptyQuestion.is_retryable());
        assert!(
            !AnswerError::QuestionTooLong {
                length: 6000,
                max: 5000
            }
            .is_retryable()
        );
    }

    #[test]
    fn test_storage_error_retryable() {
        assert!(StorageError::Backend("test".to_string()).is_retryable());
        assert!(!StorageError::NotFound("q".to_string()).is_retryable());
        assert!(!StorageError::Serialization("test".to_string()).is_retryable());
    }

    #[test]
    fn test_diverdict_error_retryable() {
        assert!(
            DiverdictError::Answer(AnswerError::Provider("test".to_string())).is_retryable()
        );
        assert!(
            DiverdictError::Storage(StorageError::Backend("test".to_string())).is_retryable()
        );
        assert!(!DiverdictError::Config("test".to_string()).is_retryable());
    }

    #[test]
    fn test_simple_random_range() {
        for _ in 0..100 {
            let r = simple_random();
            assert!((0.0..1.0).contains(&r), "random value {r} out of range");
        }
    }
}
