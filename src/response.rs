//! Response validation and payload decoding.
//!
//! A completed network response passes through [`ensure_success`] before
//! any payload handling: a 2xx response is returned unchanged, everything
//! else becomes a structured [`Error::Http`] whose text is the stable
//! `HTTP <status>: <body>` shape the rest of the application surfaces.

use crate::error::{Error, Result};
use reqwest::Response;
use serde_json::Value;
use tracing::{debug, error};

/// Placeholder body used when a failing response's body cannot be read.
const UNREADABLE_BODY: &str = "Unknown error";

/// Fails fast on a non-success response.
///
/// A response with a 2xx status is returned unchanged. Otherwise the body
/// is read as text (a secondary read error is swallowed and replaced by a
/// placeholder) and the call fails with [`Error::Http`], carrying the
/// structured status code and the retriable flag the retry policy
/// branches on.
///
/// # Example
///
/// ```rust,no_run
/// use genpipe::response::ensure_success;
///
/// # async fn example(response: reqwest::Response) -> genpipe::error::Result<()> {
/// let response = ensure_success(response).await?;
/// # Ok(())
/// # }
/// ```
pub async fn ensure_success(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response
        .text()
        .await
        .unwrap_or_else(|_| UNREADABLE_BODY.to_string());
    let err = Error::http(status.as_u16(), body);
    error!(status = status.as_u16(), error = %err, "HTTP error response");
    Err(err)
}

/// Decodes a response body the tolerant way: JSON when the body parses,
/// otherwise the raw text wrapped in `Value::String`.
pub async fn parse_json(response: Response) -> Result<Value> {
    let body_text = response
        .text()
        .await
        .map_err(|e| Error::network(format!("Failed to read response body: {e}")))?;

    let body_preview: String = body_text.chars().take(200).collect();
    debug!(
        body_length = body_text.len(),
        body_preview = %body_preview,
        "response body received"
    );

    Ok(serde_json::from_str(&body_text).unwrap_or_else(|_| Value::String(body_text)))
}
