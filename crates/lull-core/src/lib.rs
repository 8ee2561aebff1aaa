//! Core types for lull.
//!
//! This crate provides the identifier types used throughout the lull
//! workspace:
//!
//! - [`ResourceId`]: a manageable backend resource, named by the host
//! - [`SessionId`]: one live client connection
//! - [`InstanceId`]: the panel-side server id commands are addressed to
//!
//! # Example
//!
//! ```
//! use lull_core::{InstanceId, ResourceId, SessionId};
//!
//! let resource = ResourceId::new("survival");
//! let session = SessionId::new("d6b0c5a0-conn");
//! let instance = InstanceId::new("abc123");
//!
//! assert_eq!(resource.as_str(), "survival");
//! println!("{session} wants {resource} (instance {instance})");
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod ids;

pub use ids::{InstanceId, ResourceId, SessionId};
