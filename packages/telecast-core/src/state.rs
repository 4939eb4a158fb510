//! Core configuration types.
//!
//! [`Config`] describes the managed TVs and how to reach both them and the
//! status feed. The standalone server builds it from its YAML file; tests
//! build it directly.

use std::collections::HashSet;
use std::net::Ipv4Addr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{TelecastError, TelecastResult};
use crate::protocol_constants::{
    DEFAULT_APPLICATION_ID, DEFAULT_APPLICATION_NAME, DEFAULT_CONNECT_TIMEOUT_MS,
    DEFAULT_POLL_INTERVAL_MS, DEFAULT_VOLUME_STEP_DELAY_MS, DISCOVERY_MULTICAST_GROUP,
    DISCOVERY_PORT, LEGACY_PORT, MIN_RECV_BUFFER_SIZE, WEBSOCKET_PORT,
};

/// A TV managed by this process.
///
/// Field aliases accept the JSON layout used by earlier config files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Opaque device ID, matched against the `sid` of discovery announcements.
    #[serde(alias = "ID")]
    pub id: String,

    /// MAC address used for wake-on-LAN (`AA:BB:CC:DD:EE:FF`).
    #[serde(alias = "MACAddress")]
    pub mac_address: String,

    /// Static address to use until discovery reports one.
    #[serde(default, alias = "Host", skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
}

impl DeviceConfig {
    /// Creates a device with no static address.
    pub fn new(id: impl Into<String>, mac_address: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            mac_address: mac_address.into(),
            host: None,
        }
    }
}

/// How to identify ourselves to a TV and where its remote services listen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// Application ID sent in the WebSocket URL and legacy handshake.
    pub application_id: String,

    /// Application name sent in the legacy handshake.
    pub application_name: String,

    /// Port of the WebSocket remote API.
    pub websocket_port: u16,

    /// Port of the legacy TCP remote service.
    pub legacy_port: u16,

    /// Timeout applied to each connect, handshake and read step (ms).
    pub connect_timeout_ms: u64,
}

impl RemoteConfig {
    /// Returns the per-step timeout as a [`Duration`].
    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            application_id: DEFAULT_APPLICATION_ID.to_string(),
            application_name: DEFAULT_APPLICATION_NAME.to_string(),
            websocket_port: WEBSOCKET_PORT,
            legacy_port: LEGACY_PORT,
            connect_timeout_ms: DEFAULT_CONNECT_TIMEOUT_MS,
        }
    }
}

/// Multicast presence listener settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// Multicast group TVs announce on.
    pub multicast_group: Ipv4Addr,

    /// UDP port of announcements.
    pub port: u16,

    /// Requested socket receive buffer size (bytes, at least 8 KiB).
    pub recv_buffer_size: usize,
}

impl DiscoveryConfig {
    /// Returns the receive buffer size, clamped to the protocol minimum.
    #[must_use]
    pub fn effective_recv_buffer_size(&self) -> usize {
        self.recv_buffer_size.max(MIN_RECV_BUFFER_SIZE)
    }
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        let [a, b, c, d] = DISCOVERY_MULTICAST_GROUP;
        Self {
            multicast_group: Ipv4Addr::new(a, b, c, d),
            port: DISCOVERY_PORT,
            recv_buffer_size: MIN_RECV_BUFFER_SIZE,
        }
    }
}

/// Configuration for the Telecast core.
///
/// All fields have sensible defaults except `server_url` and `devices`,
/// which [`Config::validate`] requires.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base URL of the status feed.
    pub server_url: String,

    /// Path of the per-device endpoint, relative to `server_url`.
    pub feed_path: String,

    /// TVs to manage, one reconciliation loop each.
    pub devices: Vec<DeviceConfig>,

    /// Remote protocol settings shared by all TVs.
    pub remote: RemoteConfig,

    /// Delay between reconciliation cycles (ms).
    pub poll_interval_ms: u64,

    /// Delay after each volume step (ms).
    pub volume_step_delay_ms: u64,

    /// Discovery listener settings.
    pub discovery: DiscoveryConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_url: String::new(),
            feed_path: "device/endpoint".to_string(),
            devices: Vec::new(),
            remote: RemoteConfig::default(),
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            volume_step_delay_ms: DEFAULT_VOLUME_STEP_DELAY_MS,
            discovery: DiscoveryConfig::default(),
        }
    }
}

impl Config {
    /// Returns the reconciliation cadence.
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Returns the delay applied after each volume step.
    #[must_use]
    pub fn volume_step_delay(&self) -> Duration {
        Duration::from_millis(self.volume_step_delay_ms)
    }

    /// Validates the configuration before services are started.
    ///
    /// # Errors
    ///
    /// Returns [`TelecastError::Configuration`] describing the first problem found.
    pub fn validate(&self) -> TelecastResult<()> {
        if self.devices.is_empty() {
            return Err(TelecastError::Configuration(
                "at least one device must be configured".into(),
            ));
        }

        url::Url::parse(&self.server_url).map_err(|e| {
            TelecastError::Configuration(format!("invalid server_url {:?}: {}", self.server_url, e))
        })?;

        if self.poll_interval_ms == 0 {
            return Err(TelecastError::Configuration(
                "poll_interval_ms must be >= 1".into(),
            ));
        }

        let mut seen = HashSet::new();
        for device in &self.devices {
            if device.id.is_empty() {
                return Err(TelecastError::Configuration("device id cannot be empty".into()));
            }
            if !seen.insert(device.id.as_str()) {
                return Err(TelecastError::Configuration(format!(
                    "duplicate device id {}",
                    device.id
                )));
            }
            if !is_valid_mac(&device.mac_address) {
                return Err(TelecastError::Configuration(format!(
                    "device {} has invalid MAC address {:?}",
                    device.id, device.mac_address
                )));
            }
        }

        Ok(())
    }
}

/// Checks for six `:`-separated two-digit hex octets.
pub fn is_valid_mac(mac: &str) -> bool {
    let octets: Vec<&str> = mac.split(':').collect();
    octets.len() == 6
        && octets
            .iter()
            .all(|o| o.len() == 2 && o.chars().all(|c| c.is_ascii_hexdigit()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> Config {
        Config {
            server_url: "http://hub.local:8080/".into(),
            devices: vec![DeviceConfig::new("uuid:living-room", "AA:BB:CC:DD:EE:FF")],
            ..Default::default()
        }
    }

    #[test]
    fn defaults_match_protocol() {
        let config = Config::default();
        assert_eq!(config.remote.websocket_port, 8001);
        assert_eq!(config.remote.legacy_port, 55000);
        assert_eq!(config.remote.connect_timeout(), Duration::from_secs(1));
        assert_eq!(config.poll_interval(), Duration::from_secs(1));
        assert_eq!(config.volume_step_delay(), Duration::from_millis(500));
        assert_eq!(
            config.discovery.multicast_group,
            Ipv4Addr::new(224, 0, 0, 7)
        );
    }

    #[test]
    fn valid_config_passes() {
        assert!(valid_config().validate().is_ok());
    }

    #[test]
    fn empty_devices_rejected() {
        let config = Config {
            devices: vec![],
            ..valid_config()
        };
        assert!(matches!(
            config.validate(),
            Err(TelecastError::Configuration(msg)) if msg.contains("at least one device")
        ));
    }

    #[test]
    fn duplicate_ids_rejected() {
        let mut config = valid_config();
        config
            .devices
            .push(DeviceConfig::new("uuid:living-room", "11:22:33:44:55:66"));
        assert!(config.validate().is_err());
    }

    #[test]
    fn bad_server_url_rejected() {
        let config = Config {
            server_url: "not a url".into(),
            ..valid_config()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn mac_validation() {
        assert!(is_valid_mac("AA:BB:CC:DD:EE:FF"));
        assert!(is_valid_mac("d8:e0:e1:e7:e6:ba"));
        assert!(!is_valid_mac("AA:BB:CC:DD:EE"));
        assert!(!is_valid_mac("AA-BB-CC-DD-EE-FF"));
        assert!(!is_valid_mac("GG:BB:CC:DD:EE:FF"));
    }

    #[test]
    fn recv_buffer_clamped_to_minimum() {
        let discovery = DiscoveryConfig {
            recv_buffer_size: 512,
            ..Default::default()
        };
        assert_eq!(discovery.effective_recv_buffer_size(), 8192);
    }

    #[test]
    fn device_accepts_legacy_field_names() {
        let device: DeviceConfig = serde_json::from_str(
            r#"{"ID":"uuid:tv","MACAddress":"AA:BB:CC:DD:EE:FF","Host":"10.0.0.5"}"#,
        )
        .unwrap();
        assert_eq!(device.id, "uuid:tv");
        assert_eq!(device.host.as_deref(), Some("10.0.0.5"));
    }
}
