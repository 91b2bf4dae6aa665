//! Active request registry.
//!
//! Tracks the cancellation handle of every in-flight call so a single
//! cancel-all can abort the lot — the building block behind the user
//! facing "cancel generation" action.

use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Registry of in-flight request cancellation tokens.
///
/// Entries exist only while their call is in flight: the timeout wrapper
/// registers a token when a timed call starts and removes it before the
/// call's outcome is returned, so the registry never holds an entry for a
/// settled request.
#[derive(Debug, Default)]
pub struct ActiveRequestRegistry {
    entries: DashMap<u64, CancellationToken>,
    next_id: AtomicU64,
}

impl ActiveRequestRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Tracks a token under a fresh request id.
    pub(crate) fn register(&self, token: CancellationToken) -> u64 {
        let request_id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.entries.insert(request_id, token);
        debug!(request_id, "registered in-flight request");
        request_id
    }

    /// Stops tracking a request. Must happen before its outcome settles.
    pub(crate) fn remove(&self, request_id: u64) {
        self.entries.remove(&request_id);
    }

    /// Aborts every tracked in-flight call and clears the registry.
    ///
    /// Cancellation is best-effort: cancelling a token whose call has
    /// already finished is a no-op.
    pub fn cancel_all(&self) {
        let aborted = self.entries.len();
        for entry in self.entries.iter() {
            entry.value().cancel();
        }
        self.entries.clear();
        info!(aborted, "cancelled all in-flight requests");
    }

    /// Number of currently tracked in-flight calls.
    pub fn active_count(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` when no calls are in flight.
    pub fn is_idle(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_and_remove() {
        let registry = ActiveRequestRegistry::new();
        assert!(registry.is_idle());

        let token = CancellationToken::new();
        let id = registry.register(token.clone());
        assert_eq!(registry.active_count(), 1);

        registry.remove(id);
        assert!(registry.is_idle());
        assert!(!token.is_cancelled());
    }

    #[test]
    fn test_fresh_ids() {
        let registry = ActiveRequestRegistry::new();
        let a = registry.register(CancellationToken::new());
        let b = registry.register(CancellationToken::new());
        assert_ne!(a, b);
    }

    #[test]
    fn test_cancel_all_aborts_and_clears() {
        let registry = ActiveRequestRegistry::new();
        let first = CancellationToken::new();
        let second = CancellationToken::new();
        registry.register(first.clone());
        registry.register(second.clone());

        registry.cancel_all();

        assert!(first.is_cancelled());
        assert!(second.is_cancelled());
        assert!(registry.is_idle());
    }

    #[test]
    fn test_cancel_all_on_empty_registry() {
        let registry = ActiveRequestRegistry::new();
        registry.cancel_all();
        assert!(registry.is_idle());
    }
}
