//! Bearer-token acquisition and caching.
//!
//! The panel issues short-lived bearer tokens through an OAuth2
//! client-credentials grant. [`TokenCache`] keeps the current token and
//! refreshes it once it comes within the safety margin of expiry. Callers
//! that arrive while a refresh is in flight wait for that refresh instead
//! of issuing their own; its outcome, success or failure, is published to
//! every waiter. A failed refresh never touches whatever token is already
//! cached.

use std::time::Duration;

use parking_lot::Mutex;
use serde::Deserialize;
use tokio::sync::watch;
use tokio::time::Instant;

use crate::error::{AuthError, Result};
use crate::AuthConfig;

/// Subtracted from the reported lifetime so a token is refreshed before the
/// panel stops accepting it.
const EXPIRY_MARGIN: Duration = Duration::from_secs(30);

/// Lifetime assumed when the endpoint omits `expires_in`.
const DEFAULT_EXPIRES_IN: u64 = 3600;

/// A bearer token together with its computed expiry.
#[derive(Debug, Clone)]
pub struct CachedToken {
    value: String,
    expires_at: Instant,
}

impl CachedToken {
    fn new(value: String, expires_in: Duration, now: Instant) -> Self {
        let usable = expires_in.saturating_sub(EXPIRY_MARGIN);
        Self {
            value,
            expires_at: now + usable,
        }
    }

    /// Whether the token is still usable at `now`.
    #[must_use]
    pub fn is_valid(&self, now: Instant) -> bool {
        now < self.expires_at
    }

    /// The raw bearer value.
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }
}

/// Outcome of one refresh, as published to concurrent waiters. `None`
/// until the refresh completes.
type RefreshOutcome = Option<std::result::Result<String, String>>;

/// Token endpoint response body.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: Option<u64>,
}

struct CacheState {
    token: Option<CachedToken>,
    in_flight: Option<watch::Receiver<RefreshOutcome>>,
}

enum Role {
    Leader(watch::Sender<RefreshOutcome>),
    Follower(watch::Receiver<RefreshOutcome>),
}

/// Caches the panel bearer token and coordinates refreshes.
///
/// At most one refresh is ever in flight: the first caller that finds the
/// cache invalid performs the exchange, and every caller that arrives
/// while it runs waits on the same result.
pub struct TokenCache {
    config: AuthConfig,
    client: reqwest::Client,
    state: Mutex<CacheState>,
}

impl TokenCache {
    /// Create a new token cache.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be created (should never happen
    /// with default TLS).
    #[must_use]
    pub fn new(config: AuthConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .expect("failed to create HTTP client");

        Self::with_client(client, config)
    }

    /// Create a token cache with a custom reqwest client.
    #[must_use]
    pub fn with_client(client: reqwest::Client, config: AuthConfig) -> Self {
        Self {
            config,
            client,
            state: Mutex::new(CacheState {
                token: None,
                in_flight: None,
            }),
        }
    }

    /// Return a valid bearer token, refreshing it if necessary.
    ///
    /// A cached token is reused while the current time is before its
    /// expiry minus the safety margin. Outside that window the first
    /// caller performs one network refresh and every concurrent caller
    /// waits on it; a failed refresh is reported to all of them.
    ///
    /// # Errors
    ///
    /// Returns an error if the refresh fails; see [`AuthError`].
    pub async fn get_token(&self) -> Result<String> {
        let role = {
            let mut state = self.state.lock();

            if let Some(token) = state
                .token
                .as_ref()
                .filter(|t| t.is_valid(Instant::now()))
            {
                tracing::debug!("reusing cached panel token");
                return Ok(token.value.clone());
            }

            // A refresh whose future was dropped leaves a closed channel
            // behind; treat it as absent and take over as leader.
            if state
                .in_flight
                .as_ref()
                .is_some_and(|rx| rx.has_changed().is_err())
            {
                state.in_flight = None;
            }

            match &state.in_flight {
                Some(rx) => Role::Follower(rx.clone()),
                None => {
                    let (tx, rx) = watch::channel(None);
                    state.in_flight = Some(rx);
                    Role::Leader(tx)
                }
            }
        };

        match role {
            Role::Leader(tx) => {
                let outcome = self.refresh().await;
                let mut state = self.state.lock();
                state.in_flight = None;
                match outcome {
                    Ok(token) => {
                        let value = token.value.clone();
                        state.token = Some(token);
                        let _ = tx.send(Some(Ok(value.clone())));
                        Ok(value)
                    }
                    Err(err) => {
                        let _ = tx.send(Some(Err(err.to_string())));
                        Err(err)
                    }
                }
            }
            Role::Follower(mut rx) => loop {
                if let Some(outcome) = rx.borrow_and_update().clone() {
                    return outcome.map_err(AuthError::RefreshFailed);
                }
                if rx.changed().await.is_err() {
                    return Err(AuthError::RefreshFailed(
                        "refresh abandoned before completing".to_string(),
                    ));
                }
            },
        }
    }

    /// Fetch a token eagerly, logging the outcome.
    ///
    /// Intended for host startup: verifies the configured credentials and
    /// warms the cache so the first panel command does not pay the
    /// exchange latency. Failure is logged, not returned; the next
    /// command will retry.
    pub async fn prefetch(&self) {
        match self.get_token().await {
            Ok(_) => tracing::info!("panel credentials verified"),
            Err(err) => tracing::error!(error = %err, "panel credential check failed"),
        }
    }

    /// Perform one client-credentials exchange against the token endpoint.
    async fn refresh(&self) -> Result<CachedToken> {
        let url = self.config.token_url();
        tracing::debug!(url = %url, "requesting panel token");

        let response = self
            .client
            .post(&url)
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
            ])
            .send()
            .await
            .map_err(|e| AuthError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(
                status = status.as_u16(),
                "token endpoint refused the credential grant"
            );
            return Err(AuthError::Endpoint {
                status: status.as_u16(),
                body,
            });
        }

        let body: TokenResponse = response
            .json()
            .await
            .map_err(|e| AuthError::MalformedResponse(e.to_string()))?;

        let expires_in = Duration::from_secs(body.expires_in.unwrap_or(DEFAULT_EXPIRES_IN));
        tracing::debug!(
            expires_in_seconds = expires_in.as_secs(),
            "fetched new panel token"
        );

        Ok(CachedToken::new(
            body.access_token,
            expires_in,
            Instant::now(),
        ))
    }
}
