//! Application services layer.
//!
//! This module contains the per-device control logic and the external
//! collaborators it talks to (status feed, wake-on-LAN).

pub mod reconciler;
pub mod status_feed;
pub mod wake;

pub use reconciler::{CycleOutcome, DeviceReconciler, ReconcilerSettings};
pub use status_feed::{DesiredState, FeedError, FeedResult, HttpStatusFeed, StatusFeed};
pub use wake::{MagicPacketSender, WakeError, WakeSender};
