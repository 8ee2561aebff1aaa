//! Demand-driven lifecycle control for panel-managed game servers.
//!
//! This crate decides when backend server instances start and stop based
//! on live client presence: the first session to ask for a resource
//! starts it, total inactivity stops it after a cooldown, and sessions
//! that arrive before the instance answers are queued and handed off once
//! a readiness watch succeeds.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    Proxy host (events)                      │
//! └─────────────────────────────────────────────────────────────┘
//!        │ attached / detached / blocked          ▲ transfer, ping
//!        ▼                                        │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    LifecycleController                      │
//! │  ┌─────────────┐ ┌──────────────┐ ┌─────────────────────┐  │
//! │  │   Demand    │ │   Cooldown   │ │    Wait queue +     │  │
//! │  │   tracker   │ │   timers     │ │  readiness watches  │  │
//! │  └─────────────┘ └──────────────┘ └─────────────────────┘  │
//! └─────────────────────────────────────────────────────────────┘
//!                              │ start / stop
//!                              ▼
//!                      ┌──────────────┐
//!                      │ Panel client │
//!                      │  (lull-panel)│
//!                      └──────────────┘
//! ```
//!
//! The host owns connection handling and event dispatch; the controller
//! owns no subscription machinery. All controller state is in-memory and
//! rebuilt from live events.
//!
//! # Usage
//!
//! ```no_run
//! use std::collections::HashMap;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use lull_lifecycle::{
//!     LifecycleConfig, LifecycleController, ProbeError, ReadinessCheck, ResourceId,
//!     SessionHandoff, SessionId,
//! };
//! use lull_panel::NoopPanelClient;
//!
//! struct MyHost;
//!
//! #[async_trait::async_trait]
//! impl ReadinessCheck for MyHost {
//!     async fn check(&self, _resource: &ResourceId) -> Result<(), ProbeError> {
//!         Ok(()) // e.g. ping the backend
//!     }
//! }
//!
//! #[async_trait::async_trait]
//! impl SessionHandoff for MyHost {
//!     async fn transfer(&self, _session: &SessionId, _resource: &ResourceId) {
//!         // e.g. switch the held connection over
//!     }
//! }
//!
//! # fn example() {
//! let mut servers = HashMap::new();
//! servers.insert(ResourceId::from("survival"), "abc123".into());
//!
//! let config = LifecycleConfig {
//!     servers,
//!     inactivity_timeout: Duration::from_secs(30 * 60),
//!     ..LifecycleConfig::default()
//! };
//!
//! let controller =
//!     LifecycleController::new(config, Arc::new(NoopPanelClient::new()), Arc::new(MyHost));
//!
//! // Wired into the host's event dispatch:
//! controller.session_attached(ResourceId::from("survival"), SessionId::from("player-1"));
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod controller;
pub mod cooldown;
pub mod demand;
pub mod host;
pub mod probe;
pub mod queue;
pub mod types;

pub use controller::LifecycleController;
pub use cooldown::CooldownScheduler;
pub use demand::{DemandTracker, JoinOutcome};
pub use host::{ProbeError, ReadinessCheck, SessionHandoff};
pub use probe::AvailabilityProber;
pub use queue::WaitQueue;
pub use types::{LifecycleConfig, ResourcePhase};

// Re-export commonly used types from dependencies for convenience
pub use lull_core::{InstanceId, ResourceId, SessionId};
pub use lull_panel::PanelClient;
