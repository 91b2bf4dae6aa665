//! Rate Limiter Module
//!
//! Enforces a minimum spacing between consecutive request dispatches so
//! the queue never hammers the generation API faster than the backend
//! allows.
//!
//! # Features
//!
//! - **Minimum Interval**: a fixed gap between dispatch starts
//! - **Async-Friendly**: built on tokio for async/await support
//! - **Thread-Safe**: uses `Arc<Mutex<>>` for concurrent access
//!
//! # Example
//!
//! ```rust
//! use genpipe::rate_limiter::{RateLimiter, RateLimiterConfig};
//! use std::time::Duration;
//!
//! # async fn example() {
//! // At most one dispatch every 500ms
//! let config = RateLimiterConfig::new(Duration::from_millis(500));
//! let limiter = RateLimiter::new(config);
//!
//! // Wait for permission to dispatch a request
//! limiter.wait().await;
//! // Dispatch the request here
//! # }
//! ```

use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::time::sleep;

/// Rate limiter configuration.
#[derive(Debug, Clone)]
pub struct RateLimiterConfig {
    /// Minimum gap between the start times of two consecutive dispatches.
    pub min_interval: Duration,
}

impl RateLimiterConfig {
    /// Create a new rate limiter configuration.
    ///
    /// # Arguments
    ///
    /// * `min_interval` - Minimum spacing between dispatch starts
    pub fn new(min_interval: Duration) -> Self {
        Self { min_interval }
    }
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        // Default: one dispatch per second
        Self::new(Duration::from_millis(1000))
    }
}

/// Internal state of the rate limiter.
#[derive(Debug)]
struct RateLimiterState {
    /// Start time of the most recent dispatch.
    last_dispatch: Option<Instant>,
}

/// Rate limiter enforcing a minimum inter-dispatch interval.
///
/// This structure is thread-safe and can be shared across multiple tasks.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    config: RateLimiterConfig,
    state: Arc<Mutex<RateLimiterState>>,
}

impl RateLimiter {
    /// Create a new rate limiter with the given configuration.
    pub fn new(config: RateLimiterConfig) -> Self {
        Self {
            config,
            state: Arc::new(Mutex::new(RateLimiterState {
                last_dispatch: None,
            })),
        }
    }

    /// Returns a reference to the limiter configuration.
    pub fn config(&self) -> &RateLimiterConfig {
        &self.config
    }

    /// Wait until a dispatch may start, then record its start time.
    ///
    /// Suspends until at least `min_interval` has elapsed since the
    /// previous recorded dispatch start. The first call never waits.
    pub async fn wait(&self) {
        loop {
            let remaining = {
                let mut state = self.state.lock().await;
                match state.last_dispatch {
                    None => {
                        state.last_dispatch = Some(Instant::now());
                        return;
                    }
                    Some(last) => {
                        let elapsed = last.elapsed();
                        if elapsed >= self.config.min_interval {
                            state.last_dispatch = Some(Instant::now());
                            return;
                        }
                        self.config.min_interval - elapsed
                    }
                }
            };

            sleep(remaining).await;
        }
    }

    /// Try to start a dispatch without waiting.
    ///
    /// Returns `true` (and records the dispatch start) if the interval has
    /// already elapsed, `false` if the dispatch would have to wait.
    pub async fn try_acquire(&self) -> bool {
        let mut state = self.state.lock().await;
        let ready = state
            .last_dispatch
            .is_none_or(|last| last.elapsed() >= self.config.min_interval);
        if ready {
            state.last_dispatch = Some(Instant::now());
        }
        ready
    }

    /// Reset the limiter, forgetting the last dispatch time.
    pub async fn reset(&self) {
        let mut state = self.state.lock().await;
        state.last_dispatch = None;
    }
}
