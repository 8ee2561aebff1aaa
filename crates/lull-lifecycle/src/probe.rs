//! Readiness probing with bounded retries.
//!
//! Wraps the host's readiness primitive: a single check is bounded by a
//! short timeout and collapses every failure to "not ready"; a watch
//! retries at a fixed interval until the resource answers or the attempt
//! budget is spent. Both are ordinary futures; dropping them is the
//! cancellation path, so an abandoned watch leaves no work behind.

use std::sync::Arc;
use std::time::Duration;

use lull_core::ResourceId;

use crate::host::ReadinessCheck;

/// Polls a resource's readiness through the host's check primitive.
pub struct AvailabilityProber<C> {
    check: Arc<C>,
    timeout: Duration,
}

impl<C: ReadinessCheck> AvailabilityProber<C> {
    /// Create a prober bounding each check by `timeout`.
    #[must_use]
    pub fn new(check: Arc<C>, timeout: Duration) -> Self {
        Self { check, timeout }
    }

    /// Best-effort single readiness check.
    ///
    /// Timeouts, refused connections, and protocol errors all come back
    /// as `false`; nothing is raised to the caller.
    pub async fn is_ready_now(&self, resource: &ResourceId) -> bool {
        match tokio::time::timeout(self.timeout, self.check.check(resource)).await {
            Ok(Ok(())) => true,
            Ok(Err(err)) => {
                tracing::debug!(resource = %resource, error = %err, "readiness check failed");
                false
            }
            Err(_) => {
                tracing::debug!(resource = %resource, "readiness check timed out");
                false
            }
        }
    }

    /// Repeatedly check readiness at `interval` spacing.
    ///
    /// Returns `true` as soon as a check succeeds, `false` once
    /// `max_attempts` checks have failed.
    pub async fn wait_until_ready(
        &self,
        resource: &ResourceId,
        max_attempts: u32,
        interval: Duration,
    ) -> bool {
        for attempt in 1..=max_attempts {
            if self.is_ready_now(resource).await {
                tracing::debug!(resource = %resource, attempt, "resource became ready");
                return true;
            }
            if attempt < max_attempts {
                tokio::time::sleep(interval).await;
            }
        }
        false
    }
}
