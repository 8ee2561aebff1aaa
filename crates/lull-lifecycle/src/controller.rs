//! The lifecycle controller: host events in, panel commands out.
//!
//! The controller orchestrates demand tracking, cooldown timers, and
//! readiness watches in response to the three events the host reports:
//! a session attached to a resource, a session detached, and a session
//! blocked on a resource that is not reachable yet.
//!
//! Entry points hand off to background tasks immediately, so the host's
//! event dispatch never blocks on network I/O. Work for one resource is
//! serialized by a per-resource lock; distinct resources proceed
//! independently.

use std::collections::HashMap;
use std::sync::Arc;

use lull_core::{ResourceId, SessionId};
use lull_panel::PanelClient;
use parking_lot::Mutex;
use tokio::sync::{Mutex as AsyncMutex, Notify, OwnedMutexGuard};

use crate::cooldown::CooldownScheduler;
use crate::demand::DemandTracker;
use crate::host::{ReadinessCheck, SessionHandoff};
use crate::probe::AvailabilityProber;
use crate::queue::WaitQueue;
use crate::types::{LifecycleConfig, ResourcePhase};

struct Inner<P, H> {
    config: LifecycleConfig,
    panel: Arc<P>,
    host: Arc<H>,
    demand: DemandTracker,
    cooldowns: CooldownScheduler,
    queue: WaitQueue,
    prober: AvailabilityProber<H>,
    /// Per-resource serialization of event handling.
    locks: Mutex<HashMap<ResourceId, Arc<AsyncMutex<()>>>>,
    /// Resources with a readiness watch in flight; the notify cancels the
    /// watch when its queue empties.
    watches: Mutex<HashMap<ResourceId, Arc<Notify>>>,
}

/// Handle to the lifecycle controller.
///
/// Cloning is cheap; clones share all state. The host typically keeps one
/// clone and calls the three `session_*` entry points from its event
/// dispatch.
pub struct LifecycleController<P, H> {
    inner: Arc<Inner<P, H>>,
}

impl<P, H> Clone for LifecycleController<P, H> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<P, H> LifecycleController<P, H>
where
    P: PanelClient + 'static,
    H: ReadinessCheck + SessionHandoff + 'static,
{
    /// Create a controller over a panel client and the host's primitives.
    ///
    /// Demand sets for every mapped resource are created up front so
    /// their counts are queryable before any event arrives.
    #[must_use]
    pub fn new(config: LifecycleConfig, panel: Arc<P>, host: Arc<H>) -> Self {
        let demand = DemandTracker::new();
        for resource in config.servers.keys() {
            demand.ensure(resource);
        }

        let prober = AvailabilityProber::new(Arc::clone(&host), config.probe_timeout);

        Self {
            inner: Arc::new(Inner {
                config,
                panel,
                host,
                demand,
                cooldowns: CooldownScheduler::new(),
                queue: WaitQueue::new(),
                prober,
                locks: Mutex::new(HashMap::new()),
                watches: Mutex::new(HashMap::new()),
            }),
        }
    }

    // =========================================================================
    // Host entry points (fire-and-forget)
    // =========================================================================

    /// A session attached directly to an already reachable resource.
    ///
    /// Returns immediately; the work runs on a background task.
    pub fn session_attached(&self, resource: ResourceId, session: SessionId) {
        let this = self.clone();
        tokio::spawn(async move { this.handle_attached(resource, session).await });
    }

    /// A session disconnected or is leaving its resource.
    ///
    /// Returns immediately; the work runs on a background task.
    pub fn session_detached(&self, session: SessionId) {
        let this = self.clone();
        tokio::spawn(async move { this.handle_detached(session).await });
    }

    /// A session tried to connect to a resource the host judged
    /// unavailable.
    ///
    /// Returns immediately; the work runs on a background task.
    pub fn session_blocked(&self, resource: ResourceId, session: SessionId) {
        let this = self.clone();
        tokio::spawn(async move { this.handle_blocked(resource, session).await });
    }

    // =========================================================================
    // Event handling
    // =========================================================================

    /// Handle an attach to completion.
    ///
    /// [`Self::session_attached`] is the fire-and-forget wrapper around
    /// this.
    pub async fn handle_attached(&self, resource: ResourceId, session: SessionId) {
        let serial = self.resource_lock(&resource).await;

        // A session that connects anywhere stops waiting. If it was the
        // last one queued, the readiness watch has nothing left to do.
        if let Some((waited_for, now_empty)) = self.inner.queue.remove(&session) {
            tracing::debug!(
                session = %session,
                resource = %waited_for,
                "session connected while queued"
            );
            if now_empty {
                self.cancel_watch(&waited_for);
            }
        }

        let outcome = self.inner.demand.join(&resource, &session);
        tracing::debug!(
            resource = %resource,
            session = %session,
            count = outcome.count,
            "session attached"
        );

        // Arriving while cooling cancels the pending stop, whatever the
        // count now is.
        self.inner.cooldowns.disarm(&resource);

        if outcome.count == 1 {
            self.start_resource(&resource).await;
        }

        drop(serial);

        // A displaced session is an implicit detach for the resource it
        // left; give that resource its zero-demand handling too.
        if let Some(previous) = outcome.displaced {
            let _serial = self.resource_lock(&previous).await;
            if self.inner.demand.count(&previous) == 0 {
                self.arm_cooldown(&previous);
            }
        }
    }

    /// Handle a detach to completion.
    ///
    /// [`Self::session_detached`] is the fire-and-forget wrapper around
    /// this.
    pub async fn handle_detached(&self, session: SessionId) {
        // A waiting session that disconnects leaves its queue; when that
        // empties the queue, the readiness watch is cancelled.
        if let Some((resource, now_empty)) = self.inner.queue.remove(&session) {
            tracing::debug!(
                resource = %resource,
                session = %session,
                "waiting session left the queue"
            );
            if now_empty {
                self.cancel_watch(&resource);
            }
        }

        loop {
            let Some(resource) = self.inner.demand.resource_of(&session) else {
                return;
            };
            let serial = self.resource_lock(&resource).await;

            // The session may have moved while we waited for the lock;
            // mutating under the wrong resource's lock would break
            // per-resource ordering.
            if self.inner.demand.resource_of(&session).as_ref() != Some(&resource) {
                drop(serial);
                continue;
            }

            let Some((resource, remaining)) = self.inner.demand.leave(&session) else {
                return;
            };
            tracing::debug!(
                resource = %resource,
                session = %session,
                remaining,
                "session detached"
            );

            if remaining == 0 {
                self.arm_cooldown(&resource);
            }
            return;
        }
    }

    /// Handle a blocked connection attempt to completion.
    ///
    /// [`Self::session_blocked`] is the fire-and-forget wrapper around
    /// this.
    pub async fn handle_blocked(&self, resource: ResourceId, session: SessionId) {
        let _serial = self.resource_lock(&resource).await;

        let queued = self.inner.queue.enqueue(&resource, &session);
        let present = queued + self.inner.demand.count(&resource);
        tracing::debug!(
            resource = %resource,
            session = %session,
            queued,
            "session waiting for resource"
        );

        // Only the first queued-or-joined session triggers a start; the
        // panel treats start-when-running as a no-op anyway.
        if present == 1 {
            self.start_resource(&resource).await;
        }

        self.ensure_watch(&resource);
    }

    // =========================================================================
    // Introspection
    // =========================================================================

    /// Derived phase of a resource.
    #[must_use]
    pub fn phase_of(&self, resource: &ResourceId) -> ResourcePhase {
        if self.inner.demand.count(resource) > 0 {
            ResourcePhase::Active
        } else if self.inner.cooldowns.is_armed(resource) {
            ResourcePhase::Cooling
        } else if !self.inner.queue.is_empty(resource)
            || self.inner.watches.lock().contains_key(resource)
        {
            ResourcePhase::Starting
        } else {
            ResourcePhase::Idle
        }
    }

    /// Number of sessions currently attached to a resource.
    #[must_use]
    pub fn sessions_attached(&self, resource: &ResourceId) -> usize {
        self.inner.demand.count(resource)
    }

    /// Number of sessions queued for a resource.
    #[must_use]
    pub fn sessions_waiting(&self, resource: &ResourceId) -> usize {
        self.inner.queue.len(resource)
    }

    // =========================================================================
    // Internals
    // =========================================================================

    /// Acquire the per-resource serialization lock.
    async fn resource_lock(&self, resource: &ResourceId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.inner.locks.lock();
            Arc::clone(locks.entry(resource.clone()).or_default())
        };
        lock.lock_owned().await
    }

    /// Issue a start command if the resource is mapped to a panel
    /// instance.
    async fn start_resource(&self, resource: &ResourceId) {
        let Some(instance) = self.inner.config.instance_for(resource) else {
            tracing::debug!(resource = %resource, "no panel mapping for resource; start skipped");
            return;
        };

        tracing::info!(resource = %resource, instance = %instance, "starting resource");
        if let Err(err) = self.inner.panel.start_server(instance).await {
            // No retry here: a later join or blocked arrival re-triggers.
            tracing::error!(
                resource = %resource,
                instance = %instance,
                error = %err,
                "start command failed"
            );
        }
    }

    /// Issue a stop command if the resource is mapped to a panel instance.
    async fn stop_resource(&self, resource: &ResourceId) {
        let Some(instance) = self.inner.config.instance_for(resource) else {
            tracing::debug!(resource = %resource, "no panel mapping for resource; stop skipped");
            return;
        };

        tracing::info!(resource = %resource, instance = %instance, "stopping idle resource");
        if let Err(err) = self.inner.panel.stop_server(instance).await {
            tracing::error!(
                resource = %resource,
                instance = %instance,
                error = %err,
                "stop command failed"
            );
        }
    }

    /// Arm the inactivity timer whose fire stops the resource.
    fn arm_cooldown(&self, resource: &ResourceId) {
        let delay = self.inner.config.inactivity_timeout;
        tracing::debug!(
            resource = %resource,
            delay_seconds = delay.as_secs(),
            "demand hit zero; arming stop timer"
        );

        let this = self.clone();
        let fired_for = resource.clone();
        self.inner
            .cooldowns
            .arm(resource.clone(), delay, move || async move {
                this.stop_resource(&fired_for).await;
            });
    }

    /// Start a readiness watch for the resource unless one is running.
    fn ensure_watch(&self, resource: &ResourceId) {
        let cancel = {
            let mut watches = self.inner.watches.lock();
            if watches.contains_key(resource) {
                return;
            }
            let cancel = Arc::new(Notify::new());
            watches.insert(resource.clone(), Arc::clone(&cancel));
            cancel
        };

        tracing::debug!(resource = %resource, "starting readiness watch");
        let this = self.clone();
        let resource = resource.clone();
        tokio::spawn(async move { this.run_watch(resource, cancel).await });
    }

    /// Cancel the watch for a resource, if one is running.
    fn cancel_watch(&self, resource: &ResourceId) {
        if let Some(cancel) = self.inner.watches.lock().remove(resource) {
            cancel.notify_one();
            tracing::debug!(resource = %resource, "readiness watch cancelled");
        }
    }

    /// Remove the watch entry, unless a newer watch already replaced it.
    fn clear_watch_entry(&self, resource: &ResourceId, cancel: &Arc<Notify>) {
        let mut watches = self.inner.watches.lock();
        if watches
            .get(resource)
            .is_some_and(|current| Arc::ptr_eq(current, cancel))
        {
            watches.remove(resource);
        }
    }

    /// Watch a starting resource and hand queued sessions off once it
    /// answers.
    async fn run_watch(&self, resource: ResourceId, cancel: Arc<Notify>) {
        let ready = tokio::select! {
            ready = self.inner.prober.wait_until_ready(
                &resource,
                self.inner.config.probe_attempts,
                self.inner.config.probe_interval,
            ) => ready,
            // The queue emptied; whoever cancelled removed the entry.
            () = cancel.notified() => return,
        };

        if !ready {
            let waiting = self.inner.queue.len(&resource);
            tracing::warn!(
                resource = %resource,
                waiting,
                "resource did not become ready; sessions stay queued until another arrival re-arms the watch"
            );
            self.clear_watch_entry(&resource, &cancel);
            return;
        }

        let _serial = self.resource_lock(&resource).await;
        self.clear_watch_entry(&resource, &cancel);

        for session in self.inner.queue.drain(&resource) {
            self.inner.host.transfer(&session, &resource).await;
            let outcome = self.inner.demand.join(&resource, &session);
            tracing::debug!(
                resource = %resource,
                session = %session,
                count = outcome.count,
                "queued session handed off"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::ProbeError;
    use async_trait::async_trait;
    use lull_panel::NoopPanelClient;

    fn r(name: &str) -> ResourceId {
        ResourceId::from(name)
    }

    fn s(id: &str) -> SessionId {
        SessionId::from(id)
    }

    /// Host whose resources are always ready and whose transfers vanish.
    struct AlwaysReadyHost;

    #[async_trait]
    impl ReadinessCheck for AlwaysReadyHost {
        async fn check(&self, _resource: &ResourceId) -> Result<(), ProbeError> {
            Ok(())
        }
    }

    #[async_trait]
    impl SessionHandoff for AlwaysReadyHost {
        async fn transfer(&self, _session: &SessionId, _resource: &ResourceId) {}
    }

    fn controller() -> LifecycleController<NoopPanelClient, AlwaysReadyHost> {
        LifecycleController::new(
            LifecycleConfig::default(),
            Arc::new(NoopPanelClient::new()),
            Arc::new(AlwaysReadyHost),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn phases_follow_demand() {
        let controller = controller();

        assert_eq!(controller.phase_of(&r("survival")), ResourcePhase::Idle);

        controller.handle_attached(r("survival"), s("a")).await;
        assert_eq!(controller.phase_of(&r("survival")), ResourcePhase::Active);
        assert_eq!(controller.sessions_attached(&r("survival")), 1);

        controller.handle_detached(s("a")).await;
        assert_eq!(controller.phase_of(&r("survival")), ResourcePhase::Cooling);

        controller.handle_attached(r("survival"), s("b")).await;
        assert_eq!(controller.phase_of(&r("survival")), ResourcePhase::Active);
    }

    #[tokio::test(start_paused = true)]
    async fn entry_points_hand_off_to_background_tasks() {
        let controller = controller();

        controller.session_attached(r("survival"), s("a"));
        controller.session_blocked(r("creative"), s("b"));
        controller.session_detached(s("a"));

        // Let the spawned handlers and the readiness watch settle.
        tokio::time::sleep(std::time::Duration::from_secs(1)).await;

        assert_eq!(controller.phase_of(&r("survival")), ResourcePhase::Cooling);
        // The host was ready, so the queued session was handed off.
        assert_eq!(controller.sessions_attached(&r("creative")), 1);
        assert_eq!(controller.sessions_waiting(&r("creative")), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn detached_unknown_session_is_a_noop() {
        let controller = controller();
        controller.handle_detached(s("ghost")).await;
        assert_eq!(controller.phase_of(&r("survival")), ResourcePhase::Idle);
    }
}
