//! Wake-on-LAN fallback.

use thiserror::Error;
use wakey::WolPacket;

/// Errors that can occur while sending a wake packet.
#[derive(Debug, Error)]
pub enum WakeError {
    /// MAC address could not be parsed.
    #[error("invalid MAC address {mac}: {reason}")]
    InvalidMac { mac: String, reason: String },

    /// Packet could not be broadcast.
    #[error("failed to send magic packet: {0}")]
    Send(String),
}

/// Sends wake signals. Fire-and-forget: success only means the packet left.
pub trait WakeSender: Send + Sync {
    /// Broadcasts a wake packet for `mac` (`AA:BB:CC:DD:EE:FF`).
    fn wake(&self, mac: &str) -> Result<(), WakeError>;
}

/// Broadcasts a standard magic packet to 255.255.255.255:9.
#[derive(Debug, Default, Clone, Copy)]
pub struct MagicPacketSender;

impl WakeSender for MagicPacketSender {
    fn wake(&self, mac: &str) -> Result<(), WakeError> {
        let packet = WolPacket::from_string(mac, ':').map_err(|e| WakeError::InvalidMac {
            mac: mac.to_string(),
            reason: e.to_string(),
        })?;
        packet
            .send_magic()
            .map_err(|e| WakeError::Send(e.to_string()))?;
        log::info!("[Wake] Sent magic packet to {}", mac);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_malformed_mac() {
        let result = MagicPacketSender.wake("not-a-mac");
        assert!(matches!(result, Err(WakeError::InvalidMac { mac, .. }) if mac == "not-a-mac"));
    }
}
