//! Pending-request registry
//!
//! Every in-flight gateway call holds a [`PendingGuard`]. The guard keeps the
//! call's [`PendingRequest`] in the registry and removes it when dropped, so
//! deregistration happens on success, failure, cancellation, or when the
//! awaiting future is dropped.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;

use super::Endpoint;

/// Monotonic identifier of a gateway call
pub type RequestId = u64;

/// An in-flight call
#[derive(Debug, Clone)]
pub struct PendingRequest {
    /// Endpoint being called
    pub endpoint: Endpoint,
    /// Cancellation handle for this call
    pub token: CancellationToken,
    /// When the call was registered
    pub created_at: DateTime<Utc>,
}

/// Set of pending calls keyed by [`RequestId`].
///
/// Cloning shares the same underlying set.
#[derive(Debug, Clone, Default)]
pub struct PendingRegistry {
    next_id: Arc<AtomicU64>,
    entries: Arc<Mutex<HashMap<RequestId, PendingRequest>>>,
}

impl PendingRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a call and return the guard that owns its registration
    pub fn register(&self, endpoint: Endpoint) -> PendingGuard {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let token = CancellationToken::new();
        self.lock().insert(
            id,
            PendingRequest {
                endpoint,
                token: token.clone(),
                created_at: Utc::now(),
            },
        );
        tracing::trace!(request_id = id, endpoint = %endpoint, "Registered pending request");

        PendingGuard {
            id,
            token,
            registry: self.clone(),
        }
    }

    /// Cancel every registered call and return how many were cancelled.
    ///
    /// Entries stay registered until their own guard drops; the awaiting
    /// side observes the cancellation and settles as cancelled.
    pub fn cancel_all(&self) -> usize {
        let entries = self.lock();
        for (id, pending) in entries.iter() {
            tracing::debug!(
                request_id = *id,
                endpoint = %pending.endpoint,
                age_ms = (Utc::now() - pending.created_at).num_milliseconds(),
                "Cancelling pending request"
            );
            pending.token.cancel();
        }
        entries.len()
    }

    /// Number of registered calls
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// True when nothing is pending
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Snapshot of the registered calls, ordered by id
    pub fn snapshot(&self) -> Vec<(RequestId, PendingRequest)> {
        let mut entries: Vec<_> = self
            .lock()
            .iter()
            .map(|(id, pending)| (*id, pending.clone()))
            .collect();
        entries.sort_by_key(|(id, _)| *id);
        entries
    }

    fn remove(&self, id: RequestId) {
        self.lock().remove(&id);
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<RequestId, PendingRequest>> {
        // A panic while holding this lock cannot leave the map half-updated.
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Registration of one call; deregisters on drop
#[derive(Debug)]
pub struct PendingGuard {
    id: RequestId,
    token: CancellationToken,
    registry: PendingRegistry,
}

impl PendingGuard {
    /// Id of the registered call
    pub fn id(&self) -> RequestId {
        self.id
    }

    /// Cancellation handle of the registered call
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        self.registry.remove(self.id);
        tracing::trace!(request_id = self.id, "Removed pending request");
    }
}
