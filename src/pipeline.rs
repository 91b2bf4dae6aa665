//! Pipeline composition root.
//!
//! Ties the queue, the timeout wrapper, the retry strategy and the
//! cancellation registry together behind one explicit instance. The
//! application's composition root constructs a single [`Pipeline`] and
//! hands it to every call site; there is no process-wide singleton.
//!
//! Control flow for a queued submission:
//!
//! ```text
//! submit ──► queue (priority, single-flight, spacing)
//!               └─► retry loop ──► timeout wrapper ──► operation
//! ```
//!
//! Each retry attempt gets a fresh timeout wrapper and a fresh registry
//! entry; the caller-supplied cancellation signal spans all attempts.

use crate::error::{ConfigValidationError, Result, ValidationResult};
use crate::queue::{Operation, RequestQueue};
use crate::rate_limiter::{RateLimiter, RateLimiterConfig};
use crate::registry::ActiveRequestRegistry;
use crate::retry_strategy::{RetryConfig, RetryStrategy};
use crate::timeout::with_timeout;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Pipeline-wide configuration.
#[derive(Debug, Clone, serde::Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Minimum gap between consecutive queue dispatch starts, in milliseconds.
    pub min_request_interval_ms: u64,
    /// Per-attempt deadline applied when a request does not override it,
    /// in milliseconds.
    pub default_timeout_ms: u64,
    /// Default retry policy; individual requests may override its knobs.
    pub retry: RetryConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            min_request_interval_ms: 1000,
            default_timeout_ms: 60_000,
            retry: RetryConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Validates the configuration, delegating to the retry policy's own
    /// validation.
    pub fn validate(&self) -> std::result::Result<ValidationResult, ConfigValidationError> {
        if self.default_timeout_ms < 100 {
            return Err(ConfigValidationError::too_low(
                "default_timeout_ms",
                self.default_timeout_ms,
                100,
            ));
        }
        self.retry.validate()
    }
}

/// Per-request overrides. Every field falls back to the pipeline
/// defaults when left unset.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    /// Per-attempt deadline override, in milliseconds.
    pub timeout_ms: Option<u64>,
    /// Retry budget override.
    pub retries: Option<u32>,
    /// Base backoff delay override, in milliseconds.
    pub retry_delay_ms: Option<u64>,
    /// Backoff multiplier override.
    pub backoff_multiplier: Option<f64>,
    /// Queue priority; higher dispatches earlier. Defaults to 0.
    pub priority: i32,
    /// Single-flight key. A submission under an already-queued key
    /// supersedes the older entry. Keyless submissions never supersede.
    pub id: Option<String>,
    /// External cancellation signal spanning all attempts of this request.
    pub signal: Option<CancellationToken>,
}

impl RequestOptions {
    /// Sets the per-attempt deadline in milliseconds.
    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = Some(timeout_ms);
        self
    }

    /// Sets the retry budget.
    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = Some(retries);
        self
    }

    /// Sets the base backoff delay in milliseconds.
    pub fn with_retry_delay_ms(mut self, retry_delay_ms: u64) -> Self {
        self.retry_delay_ms = Some(retry_delay_ms);
        self
    }

    /// Sets the backoff multiplier.
    pub fn with_backoff_multiplier(mut self, backoff_multiplier: f64) -> Self {
        self.backoff_multiplier = Some(backoff_multiplier);
        self
    }

    /// Sets the queue priority.
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Sets the single-flight key.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Attaches an external cancellation signal.
    pub fn with_signal(mut self, signal: CancellationToken) -> Self {
        self.signal = Some(signal);
        self
    }
}

/// The resilient request pipeline.
///
/// Owns the request queue, the in-flight registry and the default
/// policies. One instance serves the whole application.
///
/// # Example
///
/// ```rust,no_run
/// use genpipe::pipeline::{Pipeline, PipelineConfig, RequestOptions};
///
/// # async fn example() -> genpipe::error::Result<()> {
/// let pipeline: Pipeline<String> = Pipeline::new(PipelineConfig::default());
///
/// let options = RequestOptions::default().with_id("content-generate");
/// let text = pipeline
///     .submit(options, || async { Ok("generated post".to_string()) })
///     .await?;
/// # Ok(())
/// # }
/// ```
pub struct Pipeline<T> {
    queue: RequestQueue<T>,
    registry: Arc<ActiveRequestRegistry>,
    config: PipelineConfig,
    submit_seq: AtomicU64,
}

impl<T> std::fmt::Debug for Pipeline<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("config", &self.config)
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

impl<T: Send + 'static> Pipeline<T> {
    /// Creates a pipeline from the given configuration.
    pub fn new(config: PipelineConfig) -> Self {
        let limiter = RateLimiter::new(RateLimiterConfig::new(Duration::from_millis(
            config.min_request_interval_ms,
        )));
        Self {
            queue: RequestQueue::new(limiter),
            registry: Arc::new(ActiveRequestRegistry::new()),
            config,
            submit_seq: AtomicU64::new(0),
        }
    }

    /// Returns the pipeline configuration.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Returns the in-flight request registry.
    pub fn registry(&self) -> &ActiveRequestRegistry {
        &self.registry
    }

    /// Number of submissions still waiting for dispatch.
    pub async fn pending_count(&self) -> usize {
        self.queue.pending_count().await
    }

    fn strategy_for(&self, options: &RequestOptions) -> RetryStrategy {
        let mut retry = self.config.retry.clone();
        if let Some(retries) = options.retries {
            retry.retries = retries;
        }
        if let Some(delay) = options.retry_delay_ms {
            retry.retry_delay_ms = delay;
        }
        if let Some(multiplier) = options.backoff_multiplier {
            retry.backoff_multiplier = multiplier;
        }
        RetryStrategy::new(retry)
    }

    fn timeout_for(&self, options: &RequestOptions) -> Duration {
        Duration::from_millis(options.timeout_ms.unwrap_or(self.config.default_timeout_ms))
    }

    /// Runs an operation through timeout and retry without queueing.
    ///
    /// For calls that must bypass the serial queue (the queue's spacing
    /// and ordering do not apply) while keeping the deadline, the
    /// cancel-all registration and the retry policy.
    pub async fn execute<F, Fut>(&self, options: RequestOptions, operation: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let strategy = self.strategy_for(&options);
        let timeout = self.timeout_for(&options);
        let signal = options.signal.clone();
        let registry = &self.registry;

        strategy
            .run(|| with_timeout(registry, timeout, signal.clone(), operation()))
            .await
    }

    /// Submits an operation to the serial queue and waits for its outcome.
    ///
    /// The full composition: queue ordering and spacing, then per-attempt
    /// timeout wrapping, then the retry policy. The queue holds the slot
    /// until the operation settles, retries included.
    pub async fn submit<F, Fut>(&self, options: RequestOptions, operation: F) -> Result<T>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let id = options.id.clone().unwrap_or_else(|| {
            format!("request-{}", self.submit_seq.fetch_add(1, Ordering::Relaxed))
        });
        let priority = options.priority;
        let strategy = self.strategy_for(&options);
        let timeout = self.timeout_for(&options);
        let signal = options.signal.clone();
        let registry = Arc::clone(&self.registry);
        let operation = Arc::new(operation);

        let op: Operation<T> = Box::new(move || {
            let strategy = strategy.clone();
            let registry = Arc::clone(&registry);
            let operation = Arc::clone(&operation);
            let signal = signal.clone();
            Box::pin(async move {
                strategy
                    .run(|| {
                        let registry = Arc::clone(&registry);
                        let operation = Arc::clone(&operation);
                        let signal = signal.clone();
                        async move { with_timeout(&registry, timeout, signal, operation()).await }
                    })
                    .await
            })
        });

        self.queue.submit(id, priority, op).await
    }

    /// Aborts every in-flight call and rejects all still-queued entries
    /// with a cancellation error.
    ///
    /// This is the user-facing "cancel generation" hook: nothing survives
    /// except the outcome notifications to the original callers.
    pub async fn cancel_all(&self) {
        info!("cancelling pipeline: aborting in-flight and queued requests");
        self.registry.cancel_all();
        self.queue.clear_pending().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use std::sync::atomic::AtomicU32;
    use tokio::time::sleep;

    fn fast_config() -> PipelineConfig {
        PipelineConfig {
            min_request_interval_ms: 1,
            default_timeout_ms: 1000,
            retry: RetryConfig {
                retries: 2,
                retry_delay_ms: 10,
                ..Default::default()
            },
        }
    }

    #[test]
    fn test_pipeline_config_default() {
        let config = PipelineConfig::default();
        assert_eq!(config.min_request_interval_ms, 1000);
        assert_eq!(config.default_timeout_ms, 60_000);
        assert_eq!(config.retry.retries, 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_pipeline_config_validation() {
        let config = PipelineConfig {
            default_timeout_ms: 10,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = PipelineConfig {
            retry: RetryConfig {
                retries: 12,
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_request_options_builder() {
        let options = RequestOptions::default()
            .with_timeout_ms(5000)
            .with_retries(1)
            .with_retry_delay_ms(50)
            .with_backoff_multiplier(3.0)
            .with_priority(7)
            .with_id("image-generate");

        assert_eq!(options.timeout_ms, Some(5000));
        assert_eq!(options.retries, Some(1));
        assert_eq!(options.priority, 7);
        assert_eq!(options.id.as_deref(), Some("image-generate"));
    }

    #[tokio::test]
    async fn test_execute_retries_then_succeeds() {
        let pipeline: Pipeline<&str> = Pipeline::new(fast_config());
        let calls = AtomicU32::new(0);

        let result = pipeline
            .execute(RequestOptions::default(), || async {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                if n == 0 {
                    Err(Error::http(502, "bad gateway"))
                } else {
                    Ok("caption")
                }
            })
            .await;

        assert_eq!(result.unwrap(), "caption");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(pipeline.registry().is_idle());
    }

    #[tokio::test]
    async fn test_execute_applies_per_request_timeout() {
        let pipeline: Pipeline<()> = Pipeline::new(fast_config());

        let options = RequestOptions::default().with_timeout_ms(20).with_retries(0);
        let result = pipeline
            .execute(options, || async {
                sleep(Duration::from_secs(5)).await;
                Ok(())
            })
            .await;

        assert!(matches!(result.unwrap_err(), Error::Timeout(_)));
    }

    #[tokio::test]
    async fn test_submit_composes_retry_and_timeout() {
        let pipeline: Pipeline<u32> = Pipeline::new(fast_config());
        let calls = Arc::new(AtomicU32::new(0));

        let calls_clone = Arc::clone(&calls);
        let result = pipeline
            .submit(RequestOptions::default(), move || {
                let calls = Arc::clone(&calls_clone);
                async move {
                    let n = calls.fetch_add(1, Ordering::SeqCst);
                    if n < 2 {
                        Err(Error::http(500, "flaky"))
                    } else {
                        Ok(9)
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), 9);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_submit_client_error_fails_fast() {
        let pipeline: Pipeline<u32> = Pipeline::new(fast_config());
        let calls = Arc::new(AtomicU32::new(0));

        let calls_clone = Arc::clone(&calls);
        let result = pipeline
            .submit(RequestOptions::default(), move || {
                let calls = Arc::clone(&calls_clone);
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err(Error::http(404, "missing"))
                }
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(result.unwrap_err().to_string(), "HTTP 404: missing");
    }

    #[tokio::test]
    async fn test_keyless_submissions_do_not_supersede() {
        let pipeline = Arc::new(Pipeline::<u32>::new(fast_config()));

        let mut handles = Vec::new();
        for value in 0..3u32 {
            let pipeline_clone = Arc::clone(&pipeline);
            handles.push(tokio::spawn(async move {
                pipeline_clone
                    .submit(RequestOptions::default(), move || async move { Ok(value) })
                    .await
            }));
        }

        for handle in handles {
            assert!(handle.await.unwrap().is_ok());
        }
    }

    #[tokio::test]
    async fn test_cancel_all_rejects_queued_and_aborts_in_flight() {
        let pipeline = Arc::new(Pipeline::<u32>::new(PipelineConfig {
            min_request_interval_ms: 1,
            ..fast_config()
        }));

        // In-flight request that would run for a long time.
        let pipeline_clone = Arc::clone(&pipeline);
        let in_flight = tokio::spawn(async move {
            pipeline_clone
                .submit(RequestOptions::default().with_id("slow"), || async {
                    sleep(Duration::from_secs(30)).await;
                    Ok(1)
                })
                .await
        });
        sleep(Duration::from_millis(20)).await;

        // Queued request behind it.
        let pipeline_clone = Arc::clone(&pipeline);
        let queued = tokio::spawn(async move {
            pipeline_clone
                .submit(RequestOptions::default().with_id("behind"), || async {
                    Ok(2)
                })
                .await
        });
        sleep(Duration::from_millis(20)).await;

        pipeline.cancel_all().await;

        let in_flight_err = in_flight.await.unwrap().unwrap_err();
        assert!(in_flight_err.as_cancelled().is_some());

        let queued_err = queued.await.unwrap().unwrap_err();
        assert!(queued_err.as_cancelled().is_some());

        assert!(pipeline.registry().is_idle());
        assert_eq!(pipeline.pending_count().await, 0);
    }

    #[tokio::test]
    async fn test_external_signal_spans_all_attempts() {
        let pipeline: Pipeline<u32> = Pipeline::new(fast_config());
        let signal = CancellationToken::new();

        let signal_clone = signal.clone();
        tokio::spawn(async move {
            sleep(Duration::from_millis(30)).await;
            signal_clone.cancel();
        });

        let options = RequestOptions::default().with_signal(signal);
        let result = pipeline
            .execute(options, || async {
                sleep(Duration::from_secs(10)).await;
                Ok(0)
            })
            .await;

        assert!(matches!(result.unwrap_err(), Error::Cancelled(_)));
    }
}
