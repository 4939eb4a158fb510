//! Server configuration.
//!
//! Supports loading from YAML files with environment variable overrides.
//! YAML is a superset of JSON, so the older JSON layout
//! (`{"TVs": [{"ID", "MACAddress", "Host"}], "ServerURL"}`) loads as well.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use telecast_core::{Config, DeviceConfig, DiscoveryConfig, RemoteConfig};

/// Server configuration loaded from YAML with environment overrides.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Base URL of the status feed.
    /// Override: `TELECAST_SERVER_URL`
    #[serde(alias = "ServerURL")]
    pub server_url: String,

    /// Path of the per-device endpoint, relative to `server_url`.
    pub feed_path: String,

    /// TVs to manage.
    #[serde(alias = "TVs")]
    pub devices: Vec<DeviceConfig>,

    /// Milliseconds between reconciliation cycles.
    /// Override: `TELECAST_POLL_INTERVAL_MS`
    pub poll_interval_ms: u64,

    /// Milliseconds to wait after each volume step.
    pub volume_step_delay_ms: u64,

    /// Remote protocol settings.
    pub remote: RemoteConfig,

    /// Discovery listener settings.
    pub discovery: DiscoveryConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        let core = Config::default();
        Self {
            server_url: core.server_url,
            feed_path: core.feed_path,
            devices: core.devices,
            poll_interval_ms: core.poll_interval_ms,
            volume_step_delay_ms: core.volume_step_delay_ms,
            remote: core.remote,
            discovery: core.discovery,
        }
    }
}

impl ServerConfig {
    /// Loads configuration from a YAML file, then applies environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = if let Some(path) = path {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?
        } else {
            Self::default()
        };

        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Applies overrides looked up by variable name.
    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup("TELECAST_SERVER_URL") {
            self.server_url = url;
        }

        if let Some(val) = lookup("TELECAST_POLL_INTERVAL_MS") {
            match val.parse() {
                Ok(interval) => self.poll_interval_ms = interval,
                Err(_) => log::warn!("Ignoring invalid TELECAST_POLL_INTERVAL_MS={:?}", val),
            }
        }

        // Note: TELECAST_LOG_LEVEL is handled by clap via #[arg(env = ...)] in main.rs
    }

    /// Converts to telecast-core's Config type.
    pub fn to_core_config(&self) -> Config {
        Config {
            server_url: self.server_url.clone(),
            feed_path: self.feed_path.clone(),
            devices: self
                .devices
                .iter()
                .cloned()
                .map(|mut device| {
                    device.host = device.host.filter(|host| !host.is_empty());
                    device
                })
                .collect(),
            remote: self.remote.clone(),
            poll_interval_ms: self.poll_interval_ms,
            volume_step_delay_ms: self.volume_step_delay_ms,
            discovery: self.discovery.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn write_config(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn loads_yaml() {
        let file = write_config(
            r#"
server_url: "http://hub.local:8080/"
poll_interval_ms: 2000
devices:
  - id: "uuid:living-room"
    mac_address: "AA:BB:CC:DD:EE:FF"
    host: "10.0.0.5"
remote:
  application_name: "Hub Remote"
"#,
        );

        let config = ServerConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.server_url, "http://hub.local:8080/");
        assert_eq!(config.poll_interval_ms, 2000);
        assert_eq!(config.devices.len(), 1);
        assert_eq!(config.devices[0].host.as_deref(), Some("10.0.0.5"));
        assert_eq!(config.remote.application_name, "Hub Remote");
        assert_eq!(config.remote.application_id, "google-home-samsung");
        assert_eq!(config.remote.legacy_port, 55000);
    }

    #[test]
    fn loads_legacy_json_layout() {
        let file = write_config(
            r#"{
                "TVs": [
                    {"MACAddress": "d8:e0:e1:e7:e6:ba", "ID": "uuid:0ee5c4d0", "Host": ""}
                ],
                "ServerURL": "http://hub.local:8080/"
            }"#,
        );

        let config = ServerConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.server_url, "http://hub.local:8080/");
        assert_eq!(config.devices[0].id, "uuid:0ee5c4d0");

        let core = config.to_core_config();
        assert_eq!(core.devices[0].host, None);
        assert!(core.validate().is_ok());
    }

    #[test]
    fn missing_file_is_an_error() {
        let result = ServerConfig::load(Some(Path::new("/nonexistent/telecast.yaml")));
        assert!(result.is_err());
    }

    #[test]
    fn overrides_replace_file_values() {
        let vars: HashMap<&str, &str> = [
            ("TELECAST_SERVER_URL", "http://other:9000/"),
            ("TELECAST_POLL_INTERVAL_MS", "250"),
        ]
        .into_iter()
        .collect();

        let mut config = ServerConfig::default();
        config.apply_overrides(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.server_url, "http://other:9000/");
        assert_eq!(config.poll_interval_ms, 250);
    }

    #[test]
    fn invalid_override_is_ignored() {
        let mut config = ServerConfig::default();
        config.apply_overrides(|key| {
            (key == "TELECAST_POLL_INTERVAL_MS").then(|| "soon".to_string())
        });
        assert_eq!(config.poll_interval_ms, 1000);
    }
}
