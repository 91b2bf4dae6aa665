//! Timeout wrapper for network calls.
//!
//! Bounds a single attempt to a maximum duration and wires it into the
//! [`ActiveRequestRegistry`] so cancel-all can abort it mid-flight. A
//! caller-supplied [`CancellationToken`] is chained in: aborting the
//! external token aborts the wrapped call, while the wrapper's own abort
//! never propagates back to the caller's token.

use crate::error::{Error, Result};
use crate::registry::ActiveRequestRegistry;
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// Runs `future` with a deadline and registry-backed cancellation.
///
/// The call is tracked in `registry` for exactly its own lifetime; the
/// entry is removed on every exit path before the outcome is returned.
///
/// Outcomes:
/// - the future settles in time: its result is returned unchanged
/// - the deadline elapses: the in-flight future is dropped (aborting the
///   underlying request) and an [`Error::Timeout`] is returned
/// - the token fires (external signal or cancel-all): the future is
///   dropped and an [`Error::Cancelled`] is returned
pub async fn with_timeout<T, Fut>(
    registry: &ActiveRequestRegistry,
    timeout: Duration,
    signal: Option<CancellationToken>,
    future: Fut,
) -> Result<T>
where
    Fut: Future<Output = Result<T>>,
{
    let token = match signal {
        Some(external) => external.child_token(),
        None => CancellationToken::new(),
    };
    let request_id = registry.register(token.clone());

    let outcome = tokio::select! {
        biased;
        () = token.cancelled() => Err(Error::cancelled("request aborted")),
        attempt = tokio::time::timeout(timeout, future) => match attempt {
            Ok(result) => result,
            Err(_elapsed) => {
                token.cancel();
                warn!(timeout_ms = %timeout.as_millis(), "request timed out");
                Err(Error::timeout(format!(
                    "request timed out after {}ms",
                    timeout.as_millis()
                )))
            }
        },
    };

    registry.remove(request_id);
    outcome
}
