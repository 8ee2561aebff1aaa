//! Traits the proxy host implements for the controller.
//!
//! The controller owns no connection handling of its own: the host
//! supplies a readiness primitive and a session hand-off primitive, and
//! invokes the controller's entry points from its own event dispatch.

use async_trait::async_trait;
use lull_core::{ResourceId, SessionId};
use thiserror::Error;

/// Failure of a host readiness check.
///
/// The prober collapses this to "not ready"; it never reaches a caller of
/// the controller.
#[derive(Debug, Error)]
#[error("readiness check failed: {0}")]
pub struct ProbeError(pub String);

/// A host-supplied readiness primitive, e.g. a protocol-level ping.
#[async_trait]
pub trait ReadinessCheck: Send + Sync {
    /// Check whether a resource can accept connections right now.
    ///
    /// # Errors
    ///
    /// Any error means "not ready"; the failure detail is used for
    /// diagnostics only.
    async fn check(&self, resource: &ResourceId) -> Result<(), ProbeError>;
}

/// A host-supplied hand-off primitive that moves a waiting session onto a
/// resource that has become ready.
#[async_trait]
pub trait SessionHandoff: Send + Sync {
    /// Transfer the session. The host decides what a transfer means; for
    /// a proxy, typically a server switch for the held connection.
    async fn transfer(&self, session: &SessionId, resource: &ResourceId);
}
