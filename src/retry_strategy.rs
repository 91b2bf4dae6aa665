//! Retry strategy module.
//!
//! Provides retry policy configuration and the attempt loop used for
//! every outbound call:
//! - Exponential backoff with a configurable multiplier
//! - Structured retry classification (status code / error kind, never
//!   message text)
//! - Optional jitter and delay cap
//!
//! The strategy is independent of the request queue and can wrap any
//! async operation.

use crate::error::{ConfigValidationError, Error, Result, ValidationResult};
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, error, warn};

/// Retry configuration.
#[derive(Debug, Clone, serde::Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Maximum number of retry attempts after the initial one.
    pub retries: u32,
    /// Base delay before the first retry, in milliseconds.
    pub retry_delay_ms: u64,
    /// Multiplier applied to the delay for each further retry.
    pub backoff_multiplier: f64,
    /// Maximum delay in milliseconds to prevent excessive backoff.
    pub max_delay_ms: u64,
    /// Jitter factor (0.0-1.0) to add randomness and prevent thundering herd.
    pub jitter_factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            retries: 3,
            retry_delay_ms: 1000,
            backoff_multiplier: 2.0,
            max_delay_ms: 60_000,
            jitter_factor: 0.0,
        }
    }
}

impl RetryConfig {
    /// Creates a conservative retry configuration with fewer retries and
    /// shorter delays.
    pub fn conservative() -> Self {
        Self {
            retries: 1,
            retry_delay_ms: 500,
            backoff_multiplier: 1.0,
            max_delay_ms: 5000,
            jitter_factor: 0.0,
        }
    }

    /// Creates an aggressive retry configuration with more retries and a
    /// jittered, capped backoff.
    pub fn aggressive() -> Self {
        Self {
            retries: 5,
            retry_delay_ms: 1000,
            backoff_multiplier: 2.0,
            max_delay_ms: 30_000,
            jitter_factor: 0.2,
        }
    }

    /// Validates the retry configuration parameters.
    ///
    /// # Returns
    ///
    /// Returns `Ok(ValidationResult)` if the configuration is valid; the
    /// result may carry warnings for suboptimal but valid configurations.
    ///
    /// Returns `Err(ConfigValidationError)` if the configuration is invalid.
    ///
    /// # Validation Rules
    ///
    /// - `retries` must be <= 10 (excessive retries amplify outages)
    /// - `retry_delay_ms` must be >= 10 (too short delays hammer the backend)
    /// - `backoff_multiplier` must be >= 1.0
    ///
    /// # Example
    ///
    /// ```rust
    /// use genpipe::retry_strategy::RetryConfig;
    ///
    /// assert!(RetryConfig::default().validate().is_ok());
    ///
    /// let invalid = RetryConfig {
    ///     retries: 15,
    ///     ..Default::default()
    /// };
    /// assert!(invalid.validate().is_err());
    /// ```
    pub fn validate(&self) -> std::result::Result<ValidationResult, ConfigValidationError> {
        let mut warnings = Vec::new();

        if self.retries > 10 {
            return Err(ConfigValidationError::too_high("retries", self.retries, 10));
        }

        if self.retry_delay_ms < 10 {
            return Err(ConfigValidationError::too_low(
                "retry_delay_ms",
                self.retry_delay_ms,
                10,
            ));
        }

        if self.backoff_multiplier < 1.0 {
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            return Err(ConfigValidationError::too_low(
                "backoff_multiplier",
                self.backoff_multiplier.max(0.0) as u64,
                1,
            ));
        }

        if self.max_delay_ms < self.retry_delay_ms {
            warnings.push(format!(
                "max_delay_ms ({}) is below retry_delay_ms ({}); the cap applies from the first retry",
                self.max_delay_ms, self.retry_delay_ms
            ));
        }

        Ok(ValidationResult::with_warnings(warnings))
    }
}

/// Retry strategy: the attempt loop plus its backoff calculation.
#[derive(Debug, Clone)]
pub struct RetryStrategy {
    config: RetryConfig,
}

impl RetryStrategy {
    /// Creates a new retry strategy with the given configuration.
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    /// Creates a retry strategy with default configuration.
    pub fn default_strategy() -> Self {
        Self::new(RetryConfig::default())
    }

    /// Returns a reference to the retry configuration.
    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Returns the maximum number of retries.
    pub fn retries(&self) -> u32 {
        self.config.retries
    }

    /// Determines whether a failed attempt should be retried.
    ///
    /// # Arguments
    ///
    /// * `error` - The error to evaluate.
    /// * `attempt` - The number of attempts that have already failed
    ///   (0 after the initial attempt).
    ///
    /// Classification is purely structural: the error's `retriable`
    /// status flag and kind decide, message text is never inspected.
    pub fn should_retry(&self, error: &Error, attempt: u32) -> bool {
        attempt < self.config.retries && error.is_retryable()
    }

    /// Calculates the backoff delay before retry number `attempt + 1`.
    ///
    /// The delay grows as `retry_delay_ms × backoff_multiplier^attempt`
    /// (attempt starting at 0 for the first retry), capped at
    /// `max_delay_ms`, with optional jitter on top.
    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let base_ms = self.config.retry_delay_ms as f64;
        let exponential_ms = base_ms * self.config.backoff_multiplier.powi(attempt as i32);
        let capped_ms = exponential_ms.min(self.config.max_delay_ms as f64);

        let jitter_ms = if self.config.jitter_factor > 0.0 {
            use rand::Rng;
            rand::rng().random::<f64>() * capped_ms * self.config.jitter_factor
        } else {
            0.0
        };

        Duration::from_millis((capped_ms + jitter_ms) as u64)
    }

    /// Executes an async operation with automatic retry.
    ///
    /// On success at any attempt the result is returned immediately. A
    /// non-retriable failure, or a failure after the attempt budget is
    /// spent, propagates the last error unchanged. The backoff wait is a
    /// `tokio::time::sleep`, so unrelated tasks keep running.
    ///
    /// Total attempts made = `retries + 1`.
    pub async fn run<T, F, Fut>(&self, operation: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 0;
        loop {
            match operation().await {
                Ok(value) => {
                    debug!(attempt = attempt + 1, "operation completed successfully");
                    return Ok(value);
                }
                Err(e) => {
                    if self.should_retry(&e, attempt) {
                        let delay = self.delay_for(attempt);

                        warn!(
                            attempt = attempt + 1,
                            delay_ms = %delay.as_millis(),
                            error = %e,
                            "operation failed, retrying after backoff"
                        );

                        sleep(delay).await;
                        attempt += 1;
                    } else {
                        error!(
                            attempt = attempt + 1,
                            error = %e,
                            retryable = e.is_retryable(),
                            "operation failed, not retrying"
                        );
                        return Err(e);
                    }
                }
            }
        }
    }
}
