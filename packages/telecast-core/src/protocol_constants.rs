//! Fixed protocol constants that should NOT be changed.
//!
//! These values are defined by the TV firmware and the discovery feed, and
//! changing them would break interoperability with real devices.

// ─────────────────────────────────────────────────────────────────────────────
// Legacy Remote Protocol (TCP)
// ─────────────────────────────────────────────────────────────────────────────

/// TCP port of the legacy (pre-2016) remote control service.
pub const LEGACY_PORT: u16 = 55000;

/// Application name carried in every legacy envelope.
///
/// The TV only accepts frames tagged with this identifier.
pub const LEGACY_ENVELOPE_APP_NAME: &str = "iphone..iapp.samsung";

/// Control bytes that open a legacy handshake payload.
pub const LEGACY_HANDSHAKE_HEADER: [u8; 2] = [0x64, 0x00];

/// Reserved prefix that opens a legacy key command payload.
pub const LEGACY_COMMAND_PREFIX: [u8; 3] = [0x00, 0x00, 0x00];

/// Size of the buffer used to read the legacy acknowledgment.
pub const LEGACY_RESPONSE_BUFFER_SIZE: usize = 64;

// ─────────────────────────────────────────────────────────────────────────────
// WebSocket Remote Protocol
// ─────────────────────────────────────────────────────────────────────────────

/// Port of the WebSocket remote control API.
pub const WEBSOCKET_PORT: u16 = 8001;

/// Path of the remote control channel on the WebSocket API.
pub const WEBSOCKET_REMOTE_PATH: &str = "/api/v2/channels/samsung.remote.control";

/// JSON-RPC method used for key presses.
pub const REMOTE_CONTROL_METHOD: &str = "ms.remote.control";

// ─────────────────────────────────────────────────────────────────────────────
// Discovery
// ─────────────────────────────────────────────────────────────────────────────

/// Multicast group TVs announce themselves on.
pub const DISCOVERY_MULTICAST_GROUP: [u8; 4] = [224, 0, 0, 7];

/// UDP port of presence announcements.
pub const DISCOVERY_PORT: u16 = 8001;

/// Minimum socket receive buffer. Announcements are unbounded JSON.
pub const MIN_RECV_BUFFER_SIZE: usize = 8 * 1024;

/// Size of the datagram read buffer (largest possible UDP payload).
pub const DATAGRAM_BUFFER_SIZE: usize = 64 * 1024;

// ─────────────────────────────────────────────────────────────────────────────
// Timing
// ─────────────────────────────────────────────────────────────────────────────

/// Connect/handshake/read timeout for a single remote session step (ms).
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 1000;

/// Reconciliation cadence per device (ms).
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;

/// Delay after each volume step; matches TV input debounce (ms).
pub const DEFAULT_VOLUME_STEP_DELAY_MS: u64 = 500;

/// Timeout for status feed and device description HTTP requests (seconds).
pub const HTTP_TIMEOUT_SECS: u64 = 10;

// ─────────────────────────────────────────────────────────────────────────────
// Application Identity
// ─────────────────────────────────────────────────────────────────────────────

/// Default application ID presented to the TV.
pub const DEFAULT_APPLICATION_ID: &str = "google-home-samsung";

/// Default human-readable application name presented to the TV.
pub const DEFAULT_APPLICATION_NAME: &str = "Google Samsung Remote";
