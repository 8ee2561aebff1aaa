//! Sessions waiting for a resource to become ready.
//!
//! A session enters the wait queue when it tries to connect to a resource
//! the host judged unavailable, and leaves it either by being handed off
//! (once the resource answers a readiness probe) or by disconnecting. A
//! waiting session holds no demand; the queue is distinct from the demand
//! tracker.

use std::collections::{HashMap, HashSet};

use lull_core::{ResourceId, SessionId};
use parking_lot::Mutex;

/// Per-resource sets of sessions deferred until readiness.
#[derive(Default)]
pub struct WaitQueue {
    queued: Mutex<HashMap<ResourceId, HashSet<SessionId>>>,
}

impl WaitQueue {
    /// Create an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a session for a resource.
    ///
    /// Returns the queue length after the insert; re-queueing an already
    /// waiting session does not grow it.
    pub fn enqueue(&self, resource: &ResourceId, session: &SessionId) -> usize {
        let mut queued = self.queued.lock();
        let set = queued.entry(resource.clone()).or_default();
        set.insert(session.clone());
        set.len()
    }

    /// Remove a session from whichever queue holds it.
    ///
    /// Returns the resource it was waiting for and whether that queue is
    /// now empty, or `None` if the session was not waiting anywhere.
    pub fn remove(&self, session: &SessionId) -> Option<(ResourceId, bool)> {
        let mut queued = self.queued.lock();
        for (resource, set) in queued.iter_mut() {
            if set.remove(session) {
                return Some((resource.clone(), set.is_empty()));
            }
        }
        None
    }

    /// Take every session currently queued for a resource.
    pub fn drain(&self, resource: &ResourceId) -> Vec<SessionId> {
        let mut queued = self.queued.lock();
        queued
            .get_mut(resource)
            .map(|set| set.drain().collect())
            .unwrap_or_default()
    }

    /// Number of sessions waiting for a resource.
    #[must_use]
    pub fn len(&self, resource: &ResourceId) -> usize {
        self.queued.lock().get(resource).map_or(0, HashSet::len)
    }

    /// Whether no session is waiting for the resource.
    #[must_use]
    pub fn is_empty(&self, resource: &ResourceId) -> bool {
        self.len(resource) == 0
    }
}
