//! # genpipe
//!
//! Resilient request pipeline for the content-generation dashboard's
//! outbound API traffic.
//!
//! Every call to the generation backend (post text, images, uploads,
//! status patches) goes through one shared pipeline that provides:
//!
//! - **Timeouts**: each attempt is bounded and aborted past its deadline
//! - **Retries**: exponential backoff with structured, status-code based
//!   classification of non-retriable failures
//! - **Rate limiting**: a minimum spacing between queue dispatches
//! - **Single-flight keys**: a re-submitted request supersedes its
//!   still-pending predecessor
//! - **Cancel-all**: one call aborts every in-flight request and rejects
//!   all queued work
//!
//! # Example
//!
//! ```rust,no_run
//! use genpipe::prelude::*;
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     try_init_logging(&LogConfig::default());
//!
//!     let client = GenerationClient::new(ClientConfig {
//!         base_url: "https://api.example.com".to_string(),
//!         ..Default::default()
//!     })?;
//!
//!     let post = client
//!         .generate_content(json!({ "brand": "acme", "topic": "launch week" }))
//!         .await?;
//!     println!("{post}");
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
// Global lint policy:
// - module_name_repetitions: common library naming pattern (RetryConfig in retry_strategy)
// - missing_errors_doc / missing_panics_doc: too verbose for every Result-returning function
// - must_use_candidate: not all return values need #[must_use]
// - return_self_not_must_use: builder pattern methods return Self
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::return_self_not_must_use)]

// Re-exports of external dependencies
pub use serde_json;

// Core modules
pub mod client;
pub mod config;
pub mod error;
pub mod logging;
pub mod pipeline;
pub mod queue;
pub mod rate_limiter;
pub mod registry;
pub mod response;
pub mod retry_strategy;
pub mod timeout;

// Re-exports of core types for convenience
pub use client::{ClientConfig, GenerationClient};
pub use config::ProxyConfig;
pub use error::{
    ConfigValidationError, ContextExt, Error, HttpErrorDetails, NetworkError, ParseError, Result,
    ValidationResult,
};
pub use pipeline::{Pipeline, PipelineConfig, RequestOptions};
pub use queue::{Operation, RequestQueue};
pub use rate_limiter::{RateLimiter, RateLimiterConfig};
pub use registry::ActiveRequestRegistry;
pub use response::{ensure_success, parse_json};
pub use retry_strategy::{RetryConfig, RetryStrategy};
pub use timeout::with_timeout;
// Re-export CancellationToken for convenient access
pub use tokio_util::sync::CancellationToken;

/// Prelude module for convenient imports
///
/// Import everything you need with:
/// ```rust
/// use genpipe::prelude::*;
/// ```
pub mod prelude {
    pub use crate::client::{ClientConfig, GenerationClient};
    pub use crate::config::ProxyConfig;
    pub use crate::error::{ContextExt, Error, Result};
    pub use crate::logging::{LogConfig, LogFormat, LogLevel, init_logging, try_init_logging};
    pub use crate::pipeline::{Pipeline, PipelineConfig, RequestOptions};
    pub use crate::rate_limiter::{RateLimiter, RateLimiterConfig};
    pub use crate::registry::ActiveRequestRegistry;
    pub use crate::retry_strategy::{RetryConfig, RetryStrategy};
    // Re-export CancellationToken for convenient access
    pub use tokio_util::sync::CancellationToken;
}

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
        assert_eq!(NAME, "genpipe");
    }
}
