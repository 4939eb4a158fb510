//! TV presence discovery.
//!
//! # Module Structure
//!
//! - `types` - Announcement wire types, `DiscoveryError`, interface filtering
//! - `listener` - Multicast socket setup and the receive loop
//! - `routes` - Per-device address channels fed by the listener
//! - `search` - One-shot reporting of visible TVs

mod listener;
mod routes;
mod search;
mod types;

pub use listener::{get_interfaces, DiscoveryListener};
pub use routes::{AddressReceiver, AddressRoutes};
pub use search::{describe, search, DeviceDescription, DeviceDetails};
pub use types::{
    is_virtual_interface, AddressUpdate, Announcement, AnnouncementEndpoints, DiscoveryError,
    DiscoveryResult, EndpointUri,
};
