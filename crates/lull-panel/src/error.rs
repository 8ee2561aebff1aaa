//! Panel client error types.

use thiserror::Error;

/// A result type using `PanelError`.
pub type Result<T> = std::result::Result<T, PanelError>;

/// Errors that can occur when issuing panel commands.
#[derive(Debug, Error)]
pub enum PanelError {
    /// Obtaining a bearer token failed.
    #[error("authentication failed: {0}")]
    Auth(#[from] lull_auth::AuthError),

    /// The panel could not be reached.
    #[error("panel request failed: {0}")]
    Request(String),

    /// The panel rejected a command with a non-success status.
    #[error("panel {action} command returned status {status}: {body}")]
    Command {
        /// The command that was rejected (`start` or `stop`).
        action: &'static str,
        /// HTTP status returned by the panel.
        status: u16,
        /// Response body, kept for diagnostics.
        body: String,
    },
}
