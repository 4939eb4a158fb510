//! Shared types for TV presence discovery.

use serde::Deserialize;
use thiserror::Error;
use url::Url;

/// Errors that can occur during discovery.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// Failed to create or bind the UDP socket.
    #[error("failed to bind UDP socket: {0}")]
    SocketBind(#[source] std::io::Error),

    /// Could not join the multicast group on any interface.
    #[error("failed to join multicast group: {0}")]
    SocketJoin(String),

    /// Reading from the socket failed; the listener cannot continue.
    #[error("failed to receive announcement: {0}")]
    Receive(#[source] std::io::Error),

    /// A datagram was not a valid announcement.
    #[error("malformed announcement: {0}")]
    Malformed(#[from] serde_json::Error),

    /// An announcement had no usable connection URI.
    #[error("announcement from {0} has no usable connection URI")]
    MissingHost(String),

    /// Fetching a device description failed.
    #[error("device description request failed: {0}")]
    Describe(String),
}

/// Convenient Result alias for discovery operations.
pub type DiscoveryResult<T> = Result<T, DiscoveryError>;

/// A connection descriptor inside an announcement.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EndpointUri {
    /// URI of the device's REST API for this protocol version.
    pub uri: String,
}

/// Versioned connection descriptors of an announcement.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct AnnouncementEndpoints {
    /// Pre-2016 API descriptor.
    #[serde(default)]
    pub v1: Option<EndpointUri>,
    /// Current API descriptor.
    #[serde(default)]
    pub v2: Option<EndpointUri>,
}

/// A presence announcement multicast by a TV.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Announcement {
    /// Device ID; matches `DeviceConfig::id`.
    #[serde(rename = "sid")]
    pub device_id: String,

    /// Connection descriptors.
    #[serde(default)]
    pub data: AnnouncementEndpoints,

    /// Remote control capability string, if advertised.
    #[serde(default)]
    pub remote: Option<String>,

    /// Announcement lifetime in seconds.
    #[serde(default)]
    pub ttl: Option<u16>,

    /// Announcement type (e.g. `alive`).
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
}

impl Announcement {
    /// Parses a datagram payload.
    pub fn parse(datagram: &[u8]) -> DiscoveryResult<Self> {
        Ok(serde_json::from_slice(datagram)?)
    }

    /// Returns the connection URI, preferring v2 over v1.
    pub fn descriptor_uri(&self) -> Option<&str> {
        self.data
            .v2
            .as_ref()
            .or(self.data.v1.as_ref())
            .map(|endpoint| endpoint.uri.as_str())
    }

    /// Extracts the device's current address from the connection URI.
    pub fn address(&self) -> DiscoveryResult<String> {
        self.descriptor_uri()
            .and_then(|uri| Url::parse(uri).ok())
            .and_then(|url| url.host_str().map(str::to_string))
            .ok_or_else(|| DiscoveryError::MissingHost(self.device_id.clone()))
    }
}

/// A resolved address for one device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressUpdate {
    /// Device the address belongs to.
    pub device_id: String,
    /// Host component of the announced URI.
    pub address: String,
}

impl TryFrom<&Announcement> for AddressUpdate {
    type Error = DiscoveryError;

    fn try_from(announcement: &Announcement) -> DiscoveryResult<Self> {
        Ok(Self {
            device_id: announcement.device_id.clone(),
            address: announcement.address()?,
        })
    }
}

/// Virtual interface prefixes to skip when joining the multicast group.
pub const VIRTUAL_INTERFACE_PREFIXES: &[&str] = &[
    "lo", "docker", "veth", "br-", "virbr", "vmnet", "vbox", "tun", "tap",
];

/// Checks if an interface name belongs to a virtual/container interface.
pub fn is_virtual_interface(name: &str) -> bool {
    let name_lower = name.to_lowercase();
    VIRTUAL_INTERFACE_PREFIXES
        .iter()
        .any(|prefix| name_lower.starts_with(prefix))
}

#[cfg(test)]
mod tests {
    use super::*;

    const ANNOUNCEMENT: &str = r#"{
        "data": {
            "v1": {"uri": "http://192.168.1.20:8001/ms/1.0/"},
            "v2": {"uri": "http://192.168.1.21:8001/api/v2/"}
        },
        "remote": "1.0",
        "sid": "uuid:0ee5c4d0-2a8e-4cd8-a3ce-88c4b0e9b4a1",
        "ttl": 8000,
        "type": "alive"
    }"#;

    #[test]
    fn parses_announcement() {
        let announcement = Announcement::parse(ANNOUNCEMENT.as_bytes()).unwrap();
        assert_eq!(
            announcement.device_id,
            "uuid:0ee5c4d0-2a8e-4cd8-a3ce-88c4b0e9b4a1"
        );
        assert_eq!(announcement.ttl, Some(8000));
        assert_eq!(announcement.kind.as_deref(), Some("alive"));
    }

    #[test]
    fn address_prefers_v2() {
        let announcement = Announcement::parse(ANNOUNCEMENT.as_bytes()).unwrap();
        assert_eq!(announcement.address().unwrap(), "192.168.1.21");
    }

    #[test]
    fn address_falls_back_to_v1() {
        let announcement = Announcement::parse(
            br#"{"sid":"tv","data":{"v1":{"uri":"http://10.0.0.9:8001/ms/1.0/"}}}"#,
        )
        .unwrap();
        assert_eq!(announcement.address().unwrap(), "10.0.0.9");
    }

    #[test]
    fn missing_uri_is_reported() {
        let announcement = Announcement::parse(br#"{"sid":"tv"}"#).unwrap();
        assert!(matches!(
            announcement.address(),
            Err(DiscoveryError::MissingHost(id)) if id == "tv"
        ));
    }

    #[test]
    fn malformed_datagram_is_rejected() {
        assert!(matches!(
            Announcement::parse(b"M-SEARCH * HTTP/1.1"),
            Err(DiscoveryError::Malformed(_))
        ));
        assert!(Announcement::parse(br#"{"data":{}}"#).is_err());
    }

    #[test]
    fn address_update_from_announcement() {
        let announcement = Announcement::parse(ANNOUNCEMENT.as_bytes()).unwrap();
        let update = AddressUpdate::try_from(&announcement).unwrap();
        assert_eq!(update.address, "192.168.1.21");
        assert_eq!(update.device_id, announcement.device_id);
    }

    #[test]
    fn test_is_virtual_interface() {
        assert!(is_virtual_interface("lo"));
        assert!(is_virtual_interface("docker0"));
        assert!(is_virtual_interface("veth1234"));
        assert!(!is_virtual_interface("eth0"));
        assert!(!is_virtual_interface("wlan0"));
    }
}
