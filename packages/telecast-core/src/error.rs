//! Centralized error types for the Telecast core library.
//!
//! Each subsystem defines its own `thiserror` enum next to the code that
//! produces it. [`TelecastError`] aggregates them for the bootstrap and
//! configuration paths, where a failure stops the process.

use thiserror::Error;

use crate::discovery::DiscoveryError;
use crate::services::status_feed::FeedError;

/// Trait for error types that provide machine-readable error codes.
pub trait ErrorCode {
    /// Returns a machine-readable error code for logs and exit reports.
    fn code(&self) -> &'static str;
}

impl ErrorCode for DiscoveryError {
    fn code(&self) -> &'static str {
        match self {
            Self::SocketBind(_) => "socket_bind_failed",
            Self::SocketJoin(_) => "multicast_join_failed",
            Self::Receive(_) => "discovery_receive_failed",
            Self::Malformed(_) => "malformed_announcement",
            Self::MissingHost(_) => "announcement_missing_host",
            Self::Describe(_) => "device_description_failed",
        }
    }
}

impl ErrorCode for FeedError {
    fn code(&self) -> &'static str {
        match self {
            Self::Http(_) => "http_request_failed",
            Self::HttpStatus(_) => "http_error_status",
            Self::EndOfStream => "feed_end_of_stream",
            Self::Decode(_) => "feed_decode_failed",
            Self::InvalidUrl(_) => "feed_invalid_url",
        }
    }
}

/// Application-wide error type for Telecast.
#[derive(Debug, Error)]
pub enum TelecastError {
    /// Discovery listener could not be set up or failed.
    #[error("Discovery failed: {0}")]
    Discovery(String),

    /// Status feed request failed.
    #[error("Status feed failed: {0}")]
    Feed(String),

    /// Configuration error (missing or invalid settings).
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl TelecastError {
    /// Returns a machine-readable error code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Discovery(_) => "discovery_failed",
            Self::Feed(_) => "feed_error",
            Self::Configuration(_) => "configuration_error",
            Self::Internal(_) => "internal_error",
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Result Type Aliases
// ─────────────────────────────────────────────────────────────────────────────

// Re-export Result type aliases from their defining modules
pub use crate::discovery::DiscoveryResult;
pub use crate::samsung::client::RemoteResult;
pub use crate::services::status_feed::FeedResult;

/// Convenient Result alias for application-wide operations.
pub type TelecastResult<T> = Result<T, TelecastError>;

impl From<DiscoveryError> for TelecastError {
    fn from(err: DiscoveryError) -> Self {
        Self::Discovery(err.to_string())
    }
}

impl From<FeedError> for TelecastError {
    fn from(err: FeedError) -> Self {
        match err {
            FeedError::InvalidUrl(_) => Self::Configuration(err.to_string()),
            other => Self::Feed(other.to_string()),
        }
    }
}
