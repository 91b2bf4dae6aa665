//! Error detail structures.

use super::convert::truncate_message;

/// HTTP status codes that are never retried.
///
/// 401/403 indicate a credential problem and 404 a missing resource;
/// repeating the request cannot change the outcome.
pub const NON_RETRIABLE_STATUSES: [u16; 3] = [401, 403, 404];

/// Details for a non-success HTTP response.
///
/// Extracted to a separate struct and boxed to keep the `Error` enum size
/// small. The `retriable` flag is set by the response validator from the
/// structured status code, so the retry policy never has to pattern-match
/// on message text.
///
/// Note: `#[non_exhaustive]` allows adding fields in future versions without breaking changes.
///
/// # Example
///
/// ```rust
/// use genpipe::error::HttpErrorDetails;
///
/// let details = HttpErrorDetails::new(503, "Service Unavailable");
/// assert_eq!(details.status, 503);
/// assert!(details.retriable);
///
/// let details = HttpErrorDetails::new(404, "Not Found");
/// assert!(!details.retriable);
/// ```
#[derive(Debug)]
#[non_exhaustive]
pub struct HttpErrorDetails {
    /// HTTP status code of the failing response.
    pub status: u16,
    /// Response body text (truncated when oversized).
    pub body: String,
    /// Whether the retry policy may re-attempt the request.
    pub retriable: bool,
}

impl HttpErrorDetails {
    /// Creates details for a failing response, deriving `retriable` from
    /// the status code.
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: truncate_message(body.into()),
            retriable: !NON_RETRIABLE_STATUSES.contains(&status),
        }
    }

    /// Creates details with an explicit `retriable` override.
    pub fn with_retriable(status: u16, body: impl Into<String>, retriable: bool) -> Self {
        Self {
            status,
            body: truncate_message(body.into()),
            retriable,
        }
    }
}

impl std::fmt::Display for HttpErrorDetails {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "HTTP {}: {}", self.status, self.body)
    }
}
