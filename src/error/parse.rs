//! Payload parsing error types.

use thiserror::Error;

/// Errors raised while decoding a response payload.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ParseError {
    /// JSON deserialization failure.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// Payload decoded but did not have the expected shape.
    #[error("Unexpected payload shape: {0}")]
    UnexpectedShape(String),
}
