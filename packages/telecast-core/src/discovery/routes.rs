//! Per-device address channels.
//!
//! The orchestrator builds one [`AddressRoutes`] for all managed devices. The
//! discovery listener publishes into it; each reconciliation loop owns the
//! receiver for its own device.

use std::collections::HashMap;

use tokio::sync::watch;

use super::types::{AddressUpdate, Announcement};

/// Receiving end of a device's address channel.
///
/// Single slot, last write wins. `None` means no address has been announced.
pub type AddressReceiver = watch::Receiver<Option<String>>;

/// Maps device IDs to the sending side of their address channel.
pub struct AddressRoutes {
    senders: HashMap<String, watch::Sender<Option<String>>>,
}

impl AddressRoutes {
    /// Creates one channel per device ID.
    ///
    /// Returns the routes together with the receivers, keyed by device ID.
    pub fn new<I, S>(device_ids: I) -> (Self, HashMap<String, AddressReceiver>)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut senders = HashMap::new();
        let mut receivers = HashMap::new();
        for id in device_ids {
            let id = id.into();
            let (tx, rx) = watch::channel(None);
            senders.insert(id.clone(), tx);
            receivers.insert(id, rx);
        }
        (Self { senders }, receivers)
    }

    /// Publishes an address to the matching device channel.
    ///
    /// Returns `false` for unknown devices, which are dropped silently.
    /// Re-announcing an unchanged address does not wake the receiver.
    pub fn publish(&self, update: AddressUpdate) -> bool {
        let Some(sender) = self.senders.get(&update.device_id) else {
            return false;
        };
        let address = update.address;
        sender.send_if_modified(|current| {
            if current.as_deref() == Some(address.as_str()) {
                false
            } else {
                *current = Some(address);
                true
            }
        });
        true
    }

    /// Extracts the address from an announcement and publishes it.
    pub fn route(&self, announcement: &Announcement) -> bool {
        if !self.senders.contains_key(&announcement.device_id) {
            return false;
        }
        match AddressUpdate::try_from(announcement) {
            Ok(update) => self.publish(update),
            Err(e) => {
                log::warn!("[Discovery] {}", e);
                false
            }
        }
    }
}
