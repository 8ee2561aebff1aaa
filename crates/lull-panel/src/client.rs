//! HTTP client for the panel's daemon control API.
//!
//! This module provides the [`PanelClient`] trait and its HTTP
//! implementation for issuing start and stop commands against managed
//! server instances. Each call is a single bearer-authenticated request;
//! retry policy belongs to the caller.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use lull_auth::TokenCache;
use lull_core::InstanceId;

use crate::error::{PanelError, Result};

/// Trait for panel daemon commands.
///
/// This trait abstracts the control API interface, allowing for mock
/// implementations in tests.
#[async_trait]
pub trait PanelClient: Send + Sync {
    /// Ask the panel daemon to start an instance.
    ///
    /// Starting an instance that is already running is expected to be a
    /// no-op on the panel side.
    ///
    /// # Errors
    ///
    /// Returns an error if authentication fails, the panel is unreachable,
    /// or the command is rejected with a non-success status.
    async fn start_server(&self, instance: &InstanceId) -> Result<()>;

    /// Ask the panel daemon to stop an instance.
    ///
    /// # Errors
    ///
    /// Returns an error if authentication fails, the panel is unreachable,
    /// or the command is rejected with a non-success status.
    async fn stop_server(&self, instance: &InstanceId) -> Result<()>;
}

/// HTTP client for the panel daemon API.
///
/// Commands are empty-body POSTs to
/// `{base}/proxy/daemon/server/{instance}/start` and `.../stop`,
/// authenticated with a bearer token obtained from the shared
/// [`TokenCache`].
pub struct HttpPanelClient {
    client: reqwest::Client,
    base_url: String,
    tokens: Arc<TokenCache>,
}

impl HttpPanelClient {
    /// Create a new panel client.
    ///
    /// # Arguments
    ///
    /// * `base_url` - The base URL of the panel (e.g. `https://panel.example.net`)
    /// * `tokens` - Token cache used to authenticate each command
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be created (should never happen
    /// with default TLS).
    #[must_use]
    pub fn new(base_url: impl Into<String>, tokens: Arc<TokenCache>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(5))
            .build()
            .expect("failed to create HTTP client");

        Self::with_client(client, base_url, tokens)
    }

    /// Create a panel client with a custom reqwest client.
    #[must_use]
    pub fn with_client(
        client: reqwest::Client,
        base_url: impl Into<String>,
        tokens: Arc<TokenCache>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            tokens,
        }
    }

    /// Get the base URL of the panel.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn command(&self, action: &'static str, instance: &InstanceId) -> Result<()> {
        let token = self.tokens.get_token().await?;
        let url = format!(
            "{}/proxy/daemon/server/{}/{}",
            self.base_url, instance, action
        );

        let response = self
            .client
            .post(&url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| PanelError::Request(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            tracing::debug!(instance = %instance, action, "panel accepted command");
            Ok(())
        } else {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(
                instance = %instance,
                action,
                status = status.as_u16(),
                body = %body,
                "panel rejected command"
            );
            Err(PanelError::Command {
                action,
                status: status.as_u16(),
                body,
            })
        }
    }
}

#[async_trait]
impl PanelClient for HttpPanelClient {
    async fn start_server(&self, instance: &InstanceId) -> Result<()> {
        self.command("start", instance).await
    }

    async fn stop_server(&self, instance: &InstanceId) -> Result<()> {
        self.command("stop", instance).await
    }
}

/// A no-op panel client for hosts running without a panel.
///
/// This client simply logs commands without issuing any requests, so the
/// rest of the lifecycle machinery can run unchanged.
#[derive(Debug, Clone, Default)]
pub struct NoopPanelClient;

impl NoopPanelClient {
    /// Create a new no-op panel client.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl PanelClient for NoopPanelClient {
    async fn start_server(&self, instance: &InstanceId) -> Result<()> {
        tracing::warn!(
            instance = %instance,
            "NoopPanelClient: start requested but no panel configured"
        );
        Ok(())
    }

    async fn stop_server(&self, instance: &InstanceId) -> Result<()> {
        tracing::warn!(
            instance = %instance,
            "NoopPanelClient: stop requested but no panel configured"
        );
        Ok(())
    }
}
