//! Search mode: report TVs visible on the network.
//!
//! Used to find the device IDs and MAC addresses that go into the config
//! file. Each newly seen device is described once via its REST API.

use std::collections::HashSet;

use reqwest::Client;
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::listener::DiscoveryListener;
use super::types::{Announcement, DiscoveryError, DiscoveryResult};

/// Hardware details reported under `device` in a description.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct DeviceDetails {
    #[serde(rename = "modelName", default)]
    pub model_name: String,

    #[serde(rename = "wifiMac", default)]
    pub wifi_mac: String,

    #[serde(default)]
    pub ip: String,

    #[serde(rename = "networkType", default)]
    pub network_type: String,
}

/// Response of the TV's REST description endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct DeviceDescription {
    #[serde(default)]
    pub id: String,

    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub device: DeviceDetails,
}

/// Fetches the description advertised in an announcement.
pub async fn describe(
    client: &Client,
    announcement: &Announcement,
) -> DiscoveryResult<DeviceDescription> {
    let uri = announcement
        .descriptor_uri()
        .ok_or_else(|| DiscoveryError::MissingHost(announcement.device_id.clone()))?;

    let response = client
        .get(uri)
        .send()
        .await
        .and_then(|r| r.error_for_status())
        .map_err(|e| DiscoveryError::Describe(e.to_string()))?;

    response
        .json::<DeviceDescription>()
        .await
        .map_err(|e| DiscoveryError::Describe(e.to_string()))
}

/// Logs every new device heard by `listener` until `cancel` fires.
///
/// Announcements are deduplicated by device ID, so a TV is reported once no
/// matter how often it re-announces.
pub async fn search(
    listener: DiscoveryListener,
    client: Client,
    cancel: CancellationToken,
) -> DiscoveryResult<()> {
    let (tx, mut rx) = mpsc::unbounded_channel::<Announcement>();
    let mut seen = HashSet::new();

    let listen = listener.run(cancel.clone(), move |announcement| {
        if seen.insert(announcement.device_id.clone()) {
            let _ = tx.send(announcement);
        }
    });

    let report = async {
        while let Some(announcement) = rx.recv().await {
            match describe(&client, &announcement).await {
                Ok(description) => log_description(&announcement, &description),
                Err(e) => log::warn!(
                    "[Discovery] Found {} but could not describe it: {}",
                    announcement.device_id,
                    e
                ),
            }
        }
    };

    let (result, ()) = tokio::join!(listen, report);
    result
}

fn log_description(announcement: &Announcement, description: &DeviceDescription) {
    let address = announcement.address().unwrap_or_default();
    log::info!("[Discovery] Found {} at {}", description.name, address);
    log::info!("[Discovery]   ID: {}", announcement.device_id);
    log::info!("[Discovery]   Model: {}", description.device.model_name);
    log::info!("[Discovery]   MAC: {}", description.device.wifi_mac);
}
