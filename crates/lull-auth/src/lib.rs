//! Panel authentication for lull.
//!
//! The panel's management API is bearer-authenticated; tokens come from an
//! OAuth2 client-credentials exchange against the panel's own token
//! endpoint. This crate provides:
//!
//! - [`AuthConfig`]: panel URL and client credentials
//! - [`TokenCache`]: cached token with proactive refresh and
//!   single-flight coordination between concurrent callers
//!
//! # Example
//!
//! ```no_run
//! use lull_auth::{AuthConfig, TokenCache};
//!
//! # async fn example() -> Result<(), lull_auth::AuthError> {
//! let cache = TokenCache::new(AuthConfig {
//!     base_url: "https://panel.example.net".to_string(),
//!     client_id: "my-client".to_string(),
//!     client_secret: "my-secret".to_string(),
//! });
//!
//! let token = cache.get_token().await?;
//! println!("bearer {token}");
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod token;

pub use error::{AuthError, Result};
pub use token::{CachedToken, TokenCache};

/// Configuration for panel authentication.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Base URL of the panel (e.g. `https://panel.example.net`).
    pub base_url: String,
    /// OAuth2 client id issued by the panel.
    pub client_id: String,
    /// OAuth2 client secret issued by the panel.
    pub client_secret: String,
}

impl AuthConfig {
    /// Get the OAuth2 token endpoint URL.
    #[must_use]
    pub fn token_url(&self) -> String {
        format!("{}/oauth2/token", self.base_url)
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            base_url: "https://your.panel.domain".to_string(),
            client_id: "your-client-id-here".to_string(),
            client_secret: "your-client-secret-here".to_string(),
        }
    }
}
