//! Panel control API client for lull.
//!
//! This crate issues the start and stop commands that the lifecycle
//! controller decides on, against the panel's daemon API:
//!
//! ```text
//! POST {base}/proxy/daemon/server/{instance}/start
//! POST {base}/proxy/daemon/server/{instance}/stop
//! ```
//!
//! Both are empty-body, bearer-authenticated requests; tokens come from
//! the shared [`lull_auth::TokenCache`]. There are no retries at this
//! layer; a failed command is reported and the caller's event flow is
//! what re-triggers it.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use lull_auth::{AuthConfig, TokenCache};
//! use lull_core::InstanceId;
//! use lull_panel::{HttpPanelClient, PanelClient};
//!
//! # async fn example() -> Result<(), lull_panel::PanelError> {
//! let tokens = Arc::new(TokenCache::new(AuthConfig {
//!     base_url: "https://panel.example.net".to_string(),
//!     client_id: "my-client".to_string(),
//!     client_secret: "my-secret".to_string(),
//! }));
//!
//! let panel = HttpPanelClient::new("https://panel.example.net", tokens);
//! panel.start_server(&InstanceId::new("abc123")).await?;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod client;
pub mod error;

pub use client::{HttpPanelClient, NoopPanelClient, PanelClient};
pub use error::{PanelError, Result};

// Re-export commonly used types from dependencies for convenience
pub use lull_core::InstanceId;
