//! Deferred stop actions with per-resource cancellation.
//!
//! Arming a resource schedules its action after a delay; arming again
//! replaces the pending timer, and disarming cancels it. The race between
//! a cancellation and a timer about to fire is resolved at a single commit
//! point: the sleep winning the select in the timer task. A cancellation
//! observed before that point wins; one observed after it has no effect on
//! the committed run.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use lull_core::ResourceId;
use parking_lot::Mutex;
use tokio::sync::oneshot;

struct ArmedTimer {
    generation: u64,
    /// Dropping the sender wakes the timer task's cancel branch.
    _cancel: oneshot::Sender<()>,
}

/// Schedules at most one cancellable deferred action per resource.
#[derive(Default)]
pub struct CooldownScheduler {
    timers: Arc<Mutex<HashMap<ResourceId, ArmedTimer>>>,
    generation: AtomicU64,
}

impl CooldownScheduler {
    /// Create a scheduler with no armed timers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule `on_fire` to run after `delay`, replacing any timer already
    /// armed for this resource.
    ///
    /// The action runs at most once, and never after a cancellation that
    /// was observed before the fire committed.
    pub fn arm<F, Fut>(&self, resource: ResourceId, delay: Duration, on_fire: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let generation = self.generation.fetch_add(1, Ordering::Relaxed);
        let (cancel_tx, mut cancel_rx) = oneshot::channel::<()>();

        // Replacing the entry drops the previous sender, which cancels the
        // previous timer task.
        self.timers.lock().insert(
            resource.clone(),
            ArmedTimer {
                generation,
                _cancel: cancel_tx,
            },
        );

        let timers = Arc::clone(&self.timers);
        tokio::spawn(async move {
            tokio::select! {
                biased;
                _ = &mut cancel_rx => return,
                () = tokio::time::sleep(delay) => {}
            }

            // Committed: the action runs even if a disarm races it from
            // here on. The entry is cleared first (unless a newer timer
            // already replaced it) so `is_armed` reflects the commit.
            {
                let mut timers = timers.lock();
                if timers
                    .get(&resource)
                    .is_some_and(|t| t.generation == generation)
                {
                    timers.remove(&resource);
                }
            }

            on_fire().await;
        });
    }

    /// Cancel the pending timer for a resource, if any.
    ///
    /// A timer whose fire has already committed is unaffected.
    pub fn disarm(&self, resource: &ResourceId) {
        self.timers.lock().remove(resource);
    }

    /// Whether a timer is currently armed for this resource.
    #[must_use]
    pub fn is_armed(&self, resource: &ResourceId) -> bool {
        self.timers.lock().contains_key(resource)
    }
}
