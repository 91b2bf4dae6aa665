//! # Error Handling
//!
//! Error types for the request pipeline, designed around these principles:
//!
//! 1. **Type Safety**: Strongly-typed errors using `thiserror` for compile-time guarantees
//! 2. **API Stability**: All public enums use `#[non_exhaustive]` for forward compatibility
//! 3. **Structured Classification**: retry decisions branch on a status code
//!    and an explicit `retriable` flag, never on message text
//! 4. **Context Rich**: Full error chain support with context attachment
//! 5. **Performance**: Optimized memory layout using `Cow<'static, str>` and `Box`
//! 6. **Thread Safety**: All error types implement `Send + Sync + 'static`
//!
//! ## Error Hierarchy
//!
//! ```text
//! Error (main error type)
//! ├── Http        - Non-success HTTP response (status, body, retriable flag)
//! ├── Network     - Transport layer errors (via NetworkError)
//! ├── Timeout     - Deadline elapsed
//! ├── Cancelled   - Aborted via a cancellation token or cancel-all
//! ├── Superseded  - Replaced by a newer same-key submission
//! ├── InvalidRequest - Caller-side misuse
//! ├── Parse       - Payload decoding errors (via ParseError)
//! ├── Config      - Invalid pipeline configuration
//! └── Context     - Error with additional context
//! ```
//!
//! ## HTTP failure message shape
//!
//! An `Error::Http` displays as `HTTP <status>: <body>` — callers and the
//! surrounding application surface this text directly, so the format is
//! stable:
//!
//! ```rust
//! use genpipe::error::Error;
//!
//! let err = Error::http(500, "boom");
//! assert_eq!(err.to_string(), "HTTP 500: boom");
//! ```

mod config;
mod context;
mod convert;
mod details;
mod network;
mod parse;

use std::borrow::Cow;
use std::error::Error as StdError;
use thiserror::Error;

pub use config::{ConfigValidationError, ValidationResult};
pub use context::ContextExt;
pub use details::{HttpErrorDetails, NON_RETRIABLE_STATUSES};
pub use network::NetworkError;
pub use parse::ParseError;

/// Result type alias for all pipeline operations.
pub type Result<T> = std::result::Result<T, Error>;

/// The primary error type for the `genpipe` library.
///
/// Design constraints:
/// - All large variants are boxed to keep enum size ≤ 56 bytes
/// - Uses `Cow<'static, str>` for zero-allocation static strings
/// - Verify with: `assert!(std::mem::size_of::<Error>() <= 56);`
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// Non-success HTTP response. Displays as `HTTP <status>: <body>`.
    /// Boxed to reduce enum size.
    #[error("{0}")]
    Http(Box<HttpErrorDetails>),

    /// Network-related errors encapsulating transport layer issues.
    /// Boxed to reduce enum size.
    #[error("Network error: {0}")]
    Network(Box<NetworkError>),

    /// Operation exceeded its allotted duration.
    #[error("Timeout: {0}")]
    Timeout(Cow<'static, str>),

    /// Operation was aborted via a cancellation token or cancel-all.
    #[error("Cancelled: {0}")]
    Cancelled(Cow<'static, str>),

    /// A newer submission with the same key replaced this request before
    /// it settled.
    #[error("Superseded: {0}")]
    Superseded(Cow<'static, str>),

    /// Invalid request parameters.
    #[error("Invalid request: {0}")]
    InvalidRequest(Cow<'static, str>),

    /// Errors during payload parsing. Boxed to reduce enum size.
    #[error("Parse error: {0}")]
    Parse(Box<ParseError>),

    /// Invalid pipeline configuration.
    #[error("Invalid configuration: {0}")]
    Config(ConfigValidationError),

    /// Error with additional context, preserving the error chain.
    #[error("{context}")]
    Context {
        /// Context message describing what operation failed
        context: String,
        /// The underlying error
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    // ==================== Constructor Methods ====================

    /// Creates an HTTP error from a status code and body text.
    ///
    /// The `retriable` flag is derived from the status code: 401, 403 and
    /// 404 are permanent client errors, everything else may be retried.
    ///
    /// # Example
    ///
    /// ```rust
    /// use genpipe::error::Error;
    ///
    /// let err = Error::http(502, "Bad Gateway");
    /// assert!(err.is_retryable());
    ///
    /// let err = Error::http(404, "Not Found");
    /// assert!(!err.is_retryable());
    /// ```
    pub fn http(status: u16, body: impl Into<String>) -> Self {
        Self::Http(Box::new(HttpErrorDetails::new(status, body)))
    }

    /// Creates a network error from a message.
    pub fn network(msg: impl Into<String>) -> Self {
        Self::Network(Box::new(NetworkError::ConnectionFailed(msg.into())))
    }

    /// Creates a timeout error.
    /// Accepts both `&'static str` (zero allocation) and `String`.
    pub fn timeout(msg: impl Into<Cow<'static, str>>) -> Self {
        Self::Timeout(msg.into())
    }

    /// Creates a cancelled error.
    ///
    /// Use this when an operation is aborted via a `CancellationToken` or
    /// the registry's cancel-all.
    pub fn cancelled(msg: impl Into<Cow<'static, str>>) -> Self {
        Self::Cancelled(msg.into())
    }

    /// Creates a superseded error.
    ///
    /// Returned to the original caller when a newer submission with the
    /// same key replaces a still-pending request.
    pub fn superseded(msg: impl Into<Cow<'static, str>>) -> Self {
        Self::Superseded(msg.into())
    }

    /// Creates an invalid request error.
    pub fn invalid_request(msg: impl Into<Cow<'static, str>>) -> Self {
        Self::InvalidRequest(msg.into())
    }

    // ==================== Context Methods ====================

    /// Attaches context to an existing error.
    ///
    /// # Example
    ///
    /// ```rust
    /// use genpipe::error::Error;
    ///
    /// let err = Error::network("Connection refused")
    ///     .context("Failed to generate image");
    /// ```
    #[must_use]
    pub fn context(self, context: impl Into<String>) -> Self {
        Self::Context {
            context: context.into(),
            source: Box::new(self),
        }
    }

    // ==================== Chain Traversal Methods ====================

    /// Internal helper: creates an iterator that traverses the error chain.
    /// Automatically penetrates Context layers.
    fn iter_chain(&self) -> impl Iterator<Item = &Error> {
        std::iter::successors(Some(self), |err| match err {
            Error::Context { source, .. } => Some(source.as_ref()),
            _ => None,
        })
    }

    /// Returns the root cause of the error, skipping Context layers.
    #[must_use]
    pub fn root_cause(&self) -> &Error {
        self.iter_chain().last().unwrap_or(self)
    }

    /// Generates a detailed error report with the full chain.
    #[must_use]
    pub fn report(&self) -> String {
        use std::fmt::Write;
        let mut report = String::new();
        report.push_str(&self.to_string());

        let mut current: Option<&(dyn StdError + 'static)> = self.source();
        while let Some(err) = current {
            let _ = write!(report, "\nCaused by: {err}");
            current = err.source();
        }
        report
    }

    // ==================== Helper Methods (Context Penetrating) ====================

    /// Checks if this error is retryable (penetrates Context layers).
    ///
    /// Returns `true` for:
    /// - `Http` responses whose `retriable` flag is set (every non-2xx
    ///   status except 401/403/404)
    /// - every `Network` variant
    /// - `Timeout`
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Http(details) => details.retriable,
            Error::Network(_) | Error::Timeout(_) => true,
            Error::Context { source, .. } => source.is_retryable(),
            _ => false,
        }
    }

    /// Returns the HTTP status code if this is an HTTP error
    /// (penetrates Context layers).
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Http(details) => Some(details.status),
            Error::Context { source, .. } => source.status(),
            _ => None,
        }
    }

    /// Checks if this is a cancelled error (penetrates Context layers).
    /// Returns the error message.
    #[must_use]
    pub fn as_cancelled(&self) -> Option<&str> {
        match self {
            Error::Cancelled(msg) => Some(msg.as_ref()),
            Error::Context { source, .. } => source.as_cancelled(),
            _ => None,
        }
    }

    /// Checks if this is a superseded error (penetrates Context layers).
    /// Returns the error message.
    #[must_use]
    pub fn as_superseded(&self) -> Option<&str> {
        match self {
            Error::Superseded(msg) => Some(msg.as_ref()),
            Error::Context { source, .. } => source.as_superseded(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests;
