//! Authentication error types.

use thiserror::Error;

/// A result type using `AuthError`.
pub type Result<T> = std::result::Result<T, AuthError>;

/// Errors that can occur while obtaining a panel bearer token.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The token endpoint could not be reached.
    #[error("token request failed: {0}")]
    Request(String),

    /// The token endpoint answered with a non-success status.
    #[error("token endpoint returned status {status}: {body}")]
    Endpoint {
        /// HTTP status returned by the endpoint.
        status: u16,
        /// Response body, kept for diagnostics.
        body: String,
    },

    /// The token endpoint answered 2xx but the body was not the expected
    /// shape.
    #[error("malformed token response: {0}")]
    MalformedResponse(String),

    /// A refresh performed by a concurrent caller failed; its error is
    /// relayed to every waiter.
    #[error("token refresh failed: {0}")]
    RefreshFailed(String),

    /// An internal error occurred.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AuthError {
    /// Returns `true` if a later attempt might succeed without any
    /// configuration change.
    #[must_use]
    pub const fn is_retriable(&self) -> bool {
        matches!(
            self,
            Self::Request(_) | Self::RefreshFailed(_) | Self::Internal(_)
        )
    }
}
