//! Telecast Core - shared library for Telecast.
//!
//! Telecast drives Samsung TVs on behalf of a home-automation hub: it polls a
//! status feed for requested actions (power, volume, transport keys) and
//! sends the matching remote-control keys to each TV, falling back to
//! wake-on-LAN when a TV is off.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`samsung`]: Remote control client (WebSocket JSON-RPC with legacy TCP fallback)
//! - [`discovery`]: Multicast presence listener and per-device address channels
//! - [`services`]: Reconciliation loop, status feed client, wake-on-LAN
//! - [`bootstrap`]: Composition root wiring one loop per configured TV
//! - [`state`]: Configuration types
//! - [`error`]: Centralized error types
//!
//! # Abstraction Traits
//!
//! The reconciliation loop depends on traits rather than concrete network
//! clients so it can be tested without a TV or hub:
//!
//! - [`RemoteFactory`](samsung::RemoteFactory) / [`RemoteControl`](samsung::RemoteControl)
//! - [`StatusFeed`](services::StatusFeed)
//! - [`WakeSender`](services::WakeSender)

#![allow(missing_docs)]
#![warn(clippy::all)]

pub mod bootstrap;
pub mod discovery;
pub mod error;
pub mod protocol_constants;
pub mod samsung;
pub mod services;
pub mod state;

// Re-export commonly used types at the crate root
pub use error::{ErrorCode, TelecastError, TelecastResult};
pub use state::{Config, DeviceConfig, DiscoveryConfig, RemoteConfig};

// Re-export remote control types
pub use samsung::{RemoteClient, RemoteControl, RemoteFactory, RemoteKey, SamsungRemoteFactory};

// Re-export discovery types
pub use discovery::{AddressRoutes, Announcement, DiscoveryError, DiscoveryListener};

// Re-export service types
pub use services::{DesiredState, DeviceReconciler, HttpStatusFeed, StatusFeed, WakeSender};

// Re-export bootstrap types
pub use bootstrap::{bootstrap_services, bootstrap_services_with, BootstrappedServices, Collaborators};
