//! Client for the home-automation status feed.
//!
//! The feed is polled once per reconciliation cycle with
//! `GET <server_url>/<feed_path>?deviceID=<id>` and answers with the actions
//! the hub wants performed on that TV.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;
use url::Url;

/// Errors returned by a status feed.
#[derive(Debug, Error)]
pub enum FeedError {
    /// Request could not be sent or the body could not be read.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Feed answered with a non-success status.
    #[error("HTTP error status: {0}")]
    HttpStatus(u16),

    /// Feed answered with an empty body; there is no more work for the device.
    #[error("status feed ended")]
    EndOfStream,

    /// Body was not a valid desired-state document.
    #[error("failed to decode desired state: {0}")]
    Decode(#[from] serde_json::Error),

    /// Feed URL could not be built from the configuration.
    #[error("invalid feed URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

/// Convenient Result alias for status feed operations.
pub type FeedResult<T> = Result<T, FeedError>;

/// Actions requested by the hub for one device.
///
/// Fields are independent and may co-occur.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct DesiredState {
    #[serde(rename = "TVSwitchedOn", default)]
    pub power_on: bool,

    #[serde(rename = "TVSwitchedOff", default)]
    pub power_off: bool,

    /// Number of volume-up steps.
    #[serde(rename = "VolumeUp", default)]
    pub volume_up: u32,

    /// Number of volume-down steps.
    #[serde(rename = "VolumeDown", default)]
    pub volume_down: u32,

    #[serde(rename = "VolumeMute", default)]
    pub mute: bool,

    #[serde(rename = "Pause", default)]
    pub pause: bool,

    #[serde(rename = "Play", default)]
    pub play: bool,

    #[serde(rename = "OK", default)]
    pub confirm: bool,
}

impl DesiredState {
    /// Returns true if no action is requested.
    pub fn is_idle(&self) -> bool {
        *self == Self::default()
    }
}

/// Decodes a feed response body.
///
/// An empty (or whitespace-only) body is [`FeedError::EndOfStream`].
pub fn decode_desired_state(body: &[u8]) -> FeedResult<DesiredState> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(FeedError::EndOfStream);
    }
    Ok(serde_json::from_slice(body)?)
}

/// Source of desired state for a device.
#[async_trait]
pub trait StatusFeed: Send + Sync {
    /// Fetches the current desired state for `device_id`.
    async fn fetch(&self, device_id: &str) -> FeedResult<DesiredState>;
}

/// [`StatusFeed`] backed by an HTTP endpoint.
pub struct HttpStatusFeed {
    client: Client,
    endpoint: Url,
}

impl HttpStatusFeed {
    /// Creates a feed client for `<server_url>/<feed_path>`.
    ///
    /// A missing trailing slash on `server_url` is added, so
    /// `http://hub:8080` and `http://hub:8080/` behave the same.
    pub fn new(client: Client, server_url: &str, feed_path: &str) -> FeedResult<Self> {
        let mut base = server_url.to_string();
        if !base.ends_with('/') {
            base.push('/');
        }
        let endpoint = Url::parse(&base)?.join(feed_path.trim_start_matches('/'))?;
        Ok(Self { client, endpoint })
    }

    /// URL queried for `device_id`.
    pub fn device_url(&self, device_id: &str) -> Url {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut().append_pair("deviceID", device_id);
        url
    }
}

#[async_trait]
impl StatusFeed for HttpStatusFeed {
    async fn fetch(&self, device_id: &str) -> FeedResult<DesiredState> {
        let response = self.client.get(self.device_url(device_id)).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FeedError::HttpStatus(status.as_u16()));
        }

        let body = response.bytes().await?;
        decode_desired_state(&body)
    }
}
