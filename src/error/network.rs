//! Network-related error types.

use std::error::Error as StdError;
use thiserror::Error;

/// Encapsulated network errors hiding implementation details.
///
/// This type wraps all transport-level errors without exposing third-party
/// library types (like `reqwest::Error`) in the public API. This ensures
/// API stability even when underlying HTTP libraries change.
///
/// # Retryable Errors
///
/// All `NetworkError` variants are considered retryable by the retry
/// policy: connectivity problems are transient by nature and a later
/// attempt may succeed.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum NetworkError {
    /// Request timed out at the transport level.
    #[error("Request timeout")]
    Timeout,

    /// Connection could not be established.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Opaque transport error for underlying issues.
    /// Uses `Box<dyn StdError>` to hide implementation details while preserving the source.
    #[error("Transport error")]
    Transport(#[source] Box<dyn StdError + Send + Sync + 'static>),
}
