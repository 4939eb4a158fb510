//! Trait abstractions for TV remote control.
//!
//! The reconciliation loop depends on these traits rather than on
//! [`RemoteClient`](super::client::RemoteClient) so that command sequencing
//! can be tested without a TV on the network.

use async_trait::async_trait;

/// One controllable TV session.
///
/// All operations report failure as `false`; network problems are never
/// fatal to the caller.
#[async_trait]
pub trait RemoteControl: Send {
    /// Opens a session, preferring the WebSocket protocol.
    async fn connect(&mut self) -> bool;

    /// Sends one key press over the open session.
    ///
    /// Returns `false` without touching the network when not connected.
    async fn send_command(&mut self, key: &str) -> bool;

    /// Closes the session. Closing twice is a no-op.
    async fn close(&mut self);

    /// Connects, sends one key, and always closes what was opened.
    ///
    /// Returns `true` only if both the connect and the send succeeded.
    async fn send_single_command(&mut self, key: &str) -> bool {
        if !self.connect().await {
            return false;
        }
        let sent = self.send_command(key).await;
        self.close().await;
        sent
    }
}

/// Creates remote sessions for a given address.
///
/// Used by the reconciliation loop, which only learns the address of a TV at
/// runtime.
pub trait RemoteFactory: Send + Sync {
    /// Returns a disconnected remote targeting `host`.
    fn remote_for(&self, host: &str) -> Box<dyn RemoteControl>;
}
