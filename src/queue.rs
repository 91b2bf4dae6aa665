//! Request queue with priority dispatch and single-flight keys.
//!
//! Serializes submitted operations through one background dispatch loop:
//! - **Priority ordering**: the queue is re-sorted by descending priority
//!   before every dispatch; equal priorities keep arrival order
//! - **Rate limiting**: consecutive dispatch starts are spaced by the
//!   queue's [`RateLimiter`]
//! - **Single-flight by key**: submitting under an already-queued key
//!   rejects the older entry with [`Error::Superseded`] first
//! - **Lazy lifecycle**: the loop starts on the first submission and
//!   exits when the queue drains
//!
//! The queue executes each operation to full settlement (including any
//! retries composed into it) before dequeuing the next entry; a failure
//! never stops the loop.

use crate::error::{Error, Result};
use crate::rate_limiter::RateLimiter;
use futures::future::BoxFuture;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{Mutex, oneshot};
use tracing::{debug, warn};

/// A re-invocable asynchronous unit of work producing one logical
/// network call (with whatever timeout/retry behavior is composed in).
pub type Operation<T> = Box<dyn Fn() -> BoxFuture<'static, Result<T>> + Send + Sync>;

/// One queued unit of work awaiting dispatch.
struct QueuedRequest<T> {
    id: String,
    priority: i32,
    op: Operation<T>,
    tx: oneshot::Sender<Result<T>>,
}

struct QueueInner<T> {
    entries: Mutex<Vec<QueuedRequest<T>>>,
    running: AtomicBool,
    limiter: RateLimiter,
}

/// Serial request queue with priority ordering and key-based
/// single-flight semantics.
///
/// Cloning is cheap; clones share the same queue state.
pub struct RequestQueue<T> {
    inner: Arc<QueueInner<T>>,
}

impl<T> Clone for RequestQueue<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Send + 'static> RequestQueue<T> {
    /// Creates an empty queue dispatching through the given rate limiter.
    pub fn new(limiter: RateLimiter) -> Self {
        Self {
            inner: Arc::new(QueueInner {
                entries: Mutex::new(Vec::new()),
                running: AtomicBool::new(false),
                limiter,
            }),
        }
    }

    /// Submits an operation under `id` with the given priority and waits
    /// for its outcome.
    ///
    /// If an entry with the same `id` is still queued, it is removed and
    /// rejected with [`Error::Superseded`] before the new entry is
    /// enqueued, so at most one entry per key is ever outstanding.
    pub async fn submit(&self, id: impl Into<String>, priority: i32, op: Operation<T>) -> Result<T> {
        let id = id.into();
        let (tx, rx) = oneshot::channel();

        {
            let mut entries = self.inner.entries.lock().await;
            if let Some(pos) = entries.iter().position(|entry| entry.id == id) {
                let superseded = entries.remove(pos);
                debug!(id = %superseded.id, "rejecting superseded queued request");
                let _ = superseded.tx.send(Err(Error::superseded(format!(
                    "request '{}' superseded by a newer submission",
                    superseded.id
                ))));
            }
            entries.push(QueuedRequest {
                id,
                priority,
                op,
                tx,
            });
        }

        self.spawn_dispatch_loop();

        match rx.await {
            Ok(result) => result,
            // The sender is only dropped if the dispatch task is torn down
            // mid-settlement (runtime shutdown).
            Err(_) => Err(Error::cancelled("request dropped without settling")),
        }
    }

    /// Rejects every still-queued entry with [`Error::Cancelled`] and
    /// empties the queue.
    ///
    /// The entry currently being executed (if any) is not affected; the
    /// registry-backed abort handles that path.
    pub async fn clear_pending(&self) {
        let mut entries = self.inner.entries.lock().await;
        let dropped = entries.len();
        for entry in entries.drain(..) {
            let _ = entry
                .tx
                .send(Err(Error::cancelled("request cancelled before dispatch")));
        }
        if dropped > 0 {
            debug!(dropped, "cleared pending queue entries");
        }
    }

    /// Number of entries waiting for dispatch.
    pub async fn pending_count(&self) -> usize {
        self.inner.entries.lock().await.len()
    }

    /// Starts the dispatch loop unless one is already running.
    ///
    /// The loop claims entries one at a time: re-sort by descending
    /// priority, pop the front, wait out the rate-limit spacing, execute
    /// to settlement, settle the caller's channel. It marks itself idle
    /// under the queue lock so a racing submission always observes either
    /// a running loop or an empty queue.
    fn spawn_dispatch_loop(&self) {
        if self.inner.running.swap(true, Ordering::SeqCst) {
            return;
        }

        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            debug!("dispatch loop started");
            loop {
                let entry = {
                    let mut entries = inner.entries.lock().await;
                    if entries.is_empty() {
                        inner.running.store(false, Ordering::SeqCst);
                        break;
                    }
                    entries.sort_by(|a, b| b.priority.cmp(&a.priority));
                    entries.remove(0)
                };

                inner.limiter.wait().await;

                let result = (entry.op)().await;
                match &result {
                    Ok(_) => debug!(id = %entry.id, "queued request settled"),
                    Err(e) => warn!(id = %entry.id, error = %e, "queued request failed"),
                }
                // The receiver may be gone (caller stopped waiting); that
                // is not an error for the loop.
                let _ = entry.tx.send(result);
            }
            debug!("dispatch loop idle");
        });
    }
}
