//! Per-resource session demand tracking.
//!
//! The demand tracker is the source of truth for "is anyone using this
//! resource". Membership changes and the counts they produce are atomic
//! under one short-lived lock, so the controller observes each transition
//! to one and to zero exactly once per occupancy interval.

use std::collections::{HashMap, HashSet};

use lull_core::{ResourceId, SessionId};
use parking_lot::Mutex;

/// Result of adding a session to a resource's demand set.
#[derive(Debug)]
pub struct JoinOutcome {
    /// Size of the demand set after the join.
    pub count: usize,
    /// Resource the session was displaced from, when it was found attached
    /// elsewhere. A well-behaved host detaches first, so this is only set
    /// when events arrive out of order.
    pub displaced: Option<ResourceId>,
}

#[derive(Default)]
struct DemandState {
    /// Sessions currently attached, per resource. Entries are created on
    /// first reference and cleared rather than removed, so counts stay
    /// queryable for the resource's full lifetime.
    sessions: HashMap<ResourceId, HashSet<SessionId>>,
    /// Which resource a session is attached to. A session is at one
    /// resource at most.
    by_session: HashMap<SessionId, ResourceId>,
}

/// Tracks which sessions are attached to which resource.
#[derive(Default)]
pub struct DemandTracker {
    state: Mutex<DemandState>,
}

impl DemandTracker {
    /// Create an empty tracker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create the demand set for a resource without adding any session.
    pub fn ensure(&self, resource: &ResourceId) {
        self.state
            .lock()
            .sessions
            .entry(resource.clone())
            .or_default();
    }

    /// Add a session to a resource's demand set.
    ///
    /// Re-adding a session already attached to the same resource does not
    /// change the count. A session found attached elsewhere is moved, and
    /// the outcome names the resource it left.
    pub fn join(&self, resource: &ResourceId, session: &SessionId) -> JoinOutcome {
        let mut state = self.state.lock();

        let mut displaced = None;
        if let Some(previous) = state.by_session.get(session).cloned() {
            if previous == *resource {
                return JoinOutcome {
                    count: state.sessions.get(resource).map_or(0, HashSet::len),
                    displaced: None,
                };
            }
            if let Some(set) = state.sessions.get_mut(&previous) {
                set.remove(session);
            }
            tracing::debug!(
                session = %session,
                from = %previous,
                to = %resource,
                "session moved between resources"
            );
            displaced = Some(previous);
        }

        let set = state.sessions.entry(resource.clone()).or_default();
        set.insert(session.clone());
        let count = set.len();
        state.by_session.insert(session.clone(), resource.clone());

        JoinOutcome { count, displaced }
    }

    /// Remove a session from whichever resource holds it.
    ///
    /// Returns the resource and its remaining count, or `None` if the
    /// session was not tracked anywhere.
    pub fn leave(&self, session: &SessionId) -> Option<(ResourceId, usize)> {
        let mut state = self.state.lock();
        let resource = state.by_session.remove(session)?;
        let remaining = match state.sessions.get_mut(&resource) {
            Some(set) => {
                set.remove(session);
                set.len()
            }
            None => 0,
        };
        Some((resource, remaining))
    }

    /// Number of sessions attached to a resource.
    #[must_use]
    pub fn count(&self, resource: &ResourceId) -> usize {
        self.state
            .lock()
            .sessions
            .get(resource)
            .map_or(0, HashSet::len)
    }

    /// The resource a session is currently attached to, if any.
    #[must_use]
    pub fn resource_of(&self, session: &SessionId) -> Option<ResourceId> {
        self.state.lock().by_session.get(session).cloned()
    }

    /// Whether a resource has ever been referenced.
    #[must_use]
    pub fn is_tracked(&self, resource: &ResourceId) -> bool {
        self.state.lock().sessions.contains_key(resource)
    }
}
