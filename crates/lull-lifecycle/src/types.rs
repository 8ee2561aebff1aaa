//! Configuration and derived status types for the lifecycle controller.

use std::collections::HashMap;
use std::time::Duration;

use lull_core::{InstanceId, ResourceId};

/// Static configuration consumed by the lifecycle controller.
///
/// The host assembles this from its own configuration surface; the
/// controller never reads files.
#[derive(Debug, Clone)]
pub struct LifecycleConfig {
    /// Resource name → panel instance id. Resources absent from this map
    /// are tracked but never started or stopped.
    pub servers: HashMap<ResourceId, InstanceId>,
    /// How long a resource may sit with zero demand before it is stopped.
    pub inactivity_timeout: Duration,
    /// Upper bound on a single readiness check.
    pub probe_timeout: Duration,
    /// Spacing between readiness checks while watching a starting
    /// resource.
    pub probe_interval: Duration,
    /// Number of readiness checks before a watch gives up.
    pub probe_attempts: u32,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            servers: HashMap::new(),
            inactivity_timeout: Duration::from_secs(30 * 60),
            probe_timeout: Duration::from_secs(1),
            probe_interval: Duration::from_secs(5),
            // Two minutes of watching at the default interval.
            probe_attempts: 24,
        }
    }
}

impl LifecycleConfig {
    /// Look up the panel instance id mapped to a resource.
    #[must_use]
    pub fn instance_for(&self, resource: &ResourceId) -> Option<&InstanceId> {
        self.servers.get(resource)
    }
}

/// Conceptual per-resource state, derived from demand, timers, and
/// watches.
///
/// The controller does not store this anywhere; it is computed on request
/// for logging and introspection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourcePhase {
    /// No demand, no pending stop, nothing queued.
    Idle,
    /// At least one session is attached.
    Active,
    /// Demand dropped to zero; a stop timer is armed.
    Cooling,
    /// Sessions are queued or a readiness watch is running.
    Starting,
}
