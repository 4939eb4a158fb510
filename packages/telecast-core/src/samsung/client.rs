//! Dual-protocol remote control client.
//!
//! [`RemoteClient`] owns at most one session with a TV. `connect` tries the
//! WebSocket API first and falls back to the legacy TCP protocol; the chosen
//! protocol is fixed until `close`.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use serde::Serialize;
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use url::Url;

use super::codec::{self, CodecError};
use super::traits::{RemoteControl, RemoteFactory};
use crate::protocol_constants::{
    LEGACY_RESPONSE_BUFFER_SIZE, REMOTE_CONTROL_METHOD, WEBSOCKET_REMOTE_PATH,
};
use crate::state::RemoteConfig;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

// ─────────────────────────────────────────────────────────────────────────────
// Error Types
// ─────────────────────────────────────────────────────────────────────────────

/// Errors that can occur while talking to a TV.
///
/// These stay inside the client; the public API reports them as `false`.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// A network step did not finish in time.
    #[error("{step} timed out after {}ms", .limit.as_millis())]
    Timeout {
        /// Which step timed out.
        step: &'static str,
        /// The configured limit.
        limit: Duration,
    },

    /// WebSocket handshake or transfer failed.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tungstenite::Error),

    /// TCP connect, read or write failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A legacy frame could not be built.
    #[error("legacy framing failed: {0}")]
    Codec(#[from] CodecError),

    /// The WebSocket request could not be serialized.
    #[error("failed to encode request: {0}")]
    Json(#[from] serde_json::Error),

    /// The WebSocket URL could not be built from the host.
    #[error("invalid remote URL: {0}")]
    Url(#[from] url::ParseError),
}

/// Convenient Result alias for remote control operations.
pub type RemoteResult<T> = Result<T, RemoteError>;

/// Runs `fut` with a deadline, mapping both the timeout and the inner error.
async fn with_timeout<T, E, F>(limit: Duration, step: &'static str, fut: F) -> RemoteResult<T>
where
    F: Future<Output = Result<T, E>>,
    RemoteError: From<E>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result.map_err(RemoteError::from),
        Err(_) => Err(RemoteError::Timeout { step, limit }),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Session State
// ─────────────────────────────────────────────────────────────────────────────

/// Protocol selected by a successful `connect`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionMode {
    /// Binary framed protocol on TCP port 55000.
    Legacy,
    /// JSON-RPC over WebSocket on port 8001.
    WebSocket,
}

impl std::fmt::Display for SessionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Legacy => write!(f, "legacy"),
            Self::WebSocket => write!(f, "WebSocket"),
        }
    }
}

enum Session {
    Disconnected,
    Legacy(TcpStream),
    WebSocket(Box<WsStream>),
}

/// JSON-RPC key press request.
#[derive(Debug, Serialize)]
struct RemoteControlRequest<'a> {
    method: &'static str,
    params: KeyPressParams<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct KeyPressParams<'a> {
    cmd: &'static str,
    data_of_cmd: &'a str,
    option: bool,
    type_of_remote: &'static str,
}

impl<'a> RemoteControlRequest<'a> {
    fn click(key: &'a str) -> Self {
        Self {
            method: REMOTE_CONTROL_METHOD,
            params: KeyPressParams {
                cmd: "Click",
                data_of_cmd: key,
                option: false,
                type_of_remote: "SendRemoteKey",
            },
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Client
// ─────────────────────────────────────────────────────────────────────────────

/// Remote control for one TV.
pub struct RemoteClient {
    host: String,
    config: RemoteConfig,
    session: Session,
}

impl RemoteClient {
    /// Creates a disconnected client for the TV at `host`.
    pub fn new(host: impl Into<String>, config: RemoteConfig) -> Self {
        Self {
            host: host.into(),
            config,
            session: Session::Disconnected,
        }
    }

    /// Protocol of the open session, or `None` when disconnected.
    pub fn mode(&self) -> Option<SessionMode> {
        match self.session {
            Session::Disconnected => None,
            Session::Legacy(_) => Some(SessionMode::Legacy),
            Session::WebSocket(_) => Some(SessionMode::WebSocket),
        }
    }

    fn websocket_url(&self) -> RemoteResult<Url> {
        let mut url = Url::parse(&format!(
            "ws://{}:{}{}",
            self.host, self.config.websocket_port, WEBSOCKET_REMOTE_PATH
        ))?;
        url.query_pairs_mut()
            .append_pair("name", &self.config.application_id);
        Ok(url)
    }

    async fn open_websocket(&self) -> RemoteResult<WsStream> {
        let limit = self.config.connect_timeout();
        let url = self.websocket_url()?;
        let (mut ws, _response) =
            with_timeout(limit, "WebSocket handshake", connect_async(url.as_str())).await?;

        // The TV greets every new channel with one unsolicited message.
        match tokio::time::timeout(limit, ws.next()).await {
            Ok(Some(Ok(_greeting))) => {}
            Ok(Some(Err(e))) => {
                log::warn!("[Remote] Error reading initial message from {}: {}", self.host, e)
            }
            Ok(None) => log::warn!("[Remote] {} closed the channel before greeting", self.host),
            Err(_) => log::warn!("[Remote] No greeting from {} within {:?}", self.host, limit),
        }

        Ok(ws)
    }

    async fn open_legacy(&self) -> RemoteResult<TcpStream> {
        with_timeout(
            self.config.connect_timeout(),
            "legacy connect",
            TcpStream::connect((self.host.as_str(), self.config.legacy_port)),
        )
        .await
    }
}

/// Writes handshake + key frames and waits for the TV's acknowledgment.
///
/// Returns the number of acknowledgment bytes read. Zero counts as success:
/// the protocol has no application-level ack, so the absence of a read error
/// is the only signal available.
async fn send_legacy(
    stream: &mut TcpStream,
    host: &str,
    config: &RemoteConfig,
    key: &str,
) -> RemoteResult<usize> {
    let limit = config.connect_timeout();
    let handshake = codec::wrap(&codec::encode_handshake(
        host,
        &config.application_id,
        &config.application_name,
    )?)?;
    let command = codec::wrap(&codec::encode_command(key)?)?;

    with_timeout(limit, "legacy handshake write", stream.write_all(&handshake)).await?;
    with_timeout(limit, "legacy command write", stream.write_all(&command)).await?;

    let mut response = [0u8; LEGACY_RESPONSE_BUFFER_SIZE];
    with_timeout(limit, "legacy acknowledgment", stream.read(&mut response)).await
}

async fn send_websocket(ws: &mut WsStream, limit: Duration, key: &str) -> RemoteResult<()> {
    let body = serde_json::to_string(&RemoteControlRequest::click(key))?;
    with_timeout(limit, "WebSocket send", ws.send(Message::text(body))).await
}

#[async_trait]
impl RemoteControl for RemoteClient {
    async fn connect(&mut self) -> bool {
        if self.mode().is_some() {
            self.close().await;
        }

        let ws_error = match self.open_websocket().await {
            Ok(ws) => {
                log::debug!("[Remote] Connected to {} via WebSocket", self.host);
                self.session = Session::WebSocket(Box::new(ws));
                return true;
            }
            Err(e) => e,
        };

        match self.open_legacy().await {
            Ok(stream) => {
                log::debug!(
                    "[Remote] Connected to {} via legacy protocol (WebSocket: {})",
                    self.host,
                    ws_error
                );
                self.session = Session::Legacy(stream);
                true
            }
            Err(legacy_error) => {
                log::warn!(
                    "[Remote] Failed to connect to TV at {} (WebSocket: {}; legacy: {})",
                    self.host,
                    ws_error,
                    legacy_error
                );
                false
            }
        }
    }

    async fn send_command(&mut self, key: &str) -> bool {
        let limit = self.config.connect_timeout();
        let result = match &mut self.session {
            Session::Disconnected => {
                log::warn!("[Remote] Not connected to TV at {}, dropping {}", self.host, key);
                return false;
            }
            Session::Legacy(stream) => send_legacy(stream, &self.host, &self.config, key)
                .await
                .map(|ack_len| {
                    log::trace!(
                        "[Remote] {} acknowledged {} with {} byte(s)",
                        self.host,
                        key,
                        ack_len
                    );
                }),
            Session::WebSocket(ws) => send_websocket(ws, limit, key).await,
        };

        match result {
            Ok(()) => {
                log::info!("[Remote] Sent {} to {}", key, self.host);
                true
            }
            Err(e) => {
                log::warn!("[Remote] Failed to send {} to {}: {}", key, self.host, e);
                false
            }
        }
    }

    async fn close(&mut self) {
        let limit = self.config.connect_timeout();
        match std::mem::replace(&mut self.session, Session::Disconnected) {
            Session::Disconnected => {}
            Session::Legacy(mut stream) => {
                if let Err(e) = stream.shutdown().await {
                    log::debug!("[Remote] Error closing legacy socket to {}: {}", self.host, e);
                }
            }
            Session::WebSocket(ws) => {
                let mut ws = *ws;
                let frame = CloseFrame {
                    code: CloseCode::Normal,
                    reason: "".into(),
                };
                // Inherent close sends the frame; `SinkExt::close` would not.
                let closing = WebSocketStream::close(&mut ws, Some(frame));
                if let Err(e) = with_timeout(limit, "WebSocket close", closing).await {
                    log::debug!("[Remote] Error closing WebSocket to {}: {}", self.host, e);
                }
            }
        }
    }
}

/// Creates [`RemoteClient`]s that share one [`RemoteConfig`].
#[derive(Debug, Clone, Default)]
pub struct SamsungRemoteFactory {
    config: RemoteConfig,
}

impl SamsungRemoteFactory {
    /// Creates a factory using `config` for every client.
    pub fn new(config: RemoteConfig) -> Self {
        Self { config }
    }
}

impl RemoteFactory for SamsungRemoteFactory {
    fn remote_for(&self, host: &str) -> Box<dyn RemoteControl> {
        Box::new(RemoteClient::new(host, self.config.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio::net::TcpListener;
    use tokio::sync::mpsc;

    const LOCALHOST: &str = "127.0.0.1";

    fn config(websocket_port: u16, legacy_port: u16) -> RemoteConfig {
        RemoteConfig {
            websocket_port,
            legacy_port,
            ..Default::default()
        }
    }

    /// Returns a loopback port with nothing listening on it.
    async fn closed_port() -> u16 {
        let listener = TcpListener::bind((LOCALHOST, 0)).await.unwrap();
        listener.local_addr().unwrap().port()
    }

    /// Fake WebSocket TV: greets each client, forwards every received message.
    async fn spawn_websocket_tv() -> (u16, mpsc::UnboundedReceiver<Message>) {
        let listener = TcpListener::bind((LOCALHOST, 0)).await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let (tx, rx) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let tx = tx.clone();
                tokio::spawn(async move {
                    let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
                    ws.send(Message::text(r#"{"event":"ms.channel.connect"}"#))
                        .await
                        .unwrap();
                    while let Some(Ok(message)) = ws.next().await {
                        let _ = tx.send(message);
                    }
                });
            }
        });

        (port, rx)
    }

    async fn next_message(rx: &mut mpsc::UnboundedReceiver<Message>) -> Message {
        tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .unwrap()
            .unwrap()
    }

    /// Reads `count` complete envelopes from the stream.
    async fn read_frames(stream: &mut TcpStream, count: usize) -> Vec<Vec<u8>> {
        let mut buf = Vec::new();
        let mut frames = Vec::new();
        let mut chunk = [0u8; 512];

        while frames.len() < count {
            let n = stream.read(&mut chunk).await.unwrap();
            assert!(n > 0, "client closed before sending all frames");
            buf.extend_from_slice(&chunk[..n]);

            while let Ok(envelope) = codec::unwrap(&buf) {
                let consumed = 5 + envelope.app_name.len() + envelope.payload.len();
                frames.push(envelope.payload.to_vec());
                buf.drain(..consumed);
                if frames.len() == count {
                    break;
                }
            }
        }
        frames
    }

    /// How a fake legacy TV answers once it has read handshake + command.
    #[derive(Clone, Copy)]
    enum LegacyReply {
        /// Write these bytes (nothing when empty), then close.
        Ack(&'static [u8]),
        /// Keep the connection open without answering.
        Silent,
        /// Abort the connection with a TCP reset.
        Reset,
    }

    /// Fake legacy TV. Forwards the received payloads, then replies per `reply`.
    async fn spawn_legacy_tv(
        reply: LegacyReply,
    ) -> (u16, Arc<AtomicUsize>, mpsc::UnboundedReceiver<Vec<Vec<u8>>>) {
        let listener = TcpListener::bind((LOCALHOST, 0)).await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let accepted = Arc::new(AtomicUsize::new(0));
        let (tx, rx) = mpsc::unbounded_channel();

        let counter = Arc::clone(&accepted);
        tokio::spawn(async move {
            while let Ok((mut stream, _)) = listener.accept().await {
                counter.fetch_add(1, Ordering::SeqCst);
                let tx = tx.clone();
                tokio::spawn(async move {
                    let frames = read_frames(&mut stream, 2).await;
                    let _ = tx.send(frames);
                    match reply {
                        LegacyReply::Ack(ack) => {
                            if !ack.is_empty() {
                                stream.write_all(ack).await.unwrap();
                            }
                            let _ = stream.shutdown().await;
                        }
                        LegacyReply::Silent => {
                            tokio::time::sleep(Duration::from_secs(30)).await;
                        }
                        LegacyReply::Reset => {
                            socket2::SockRef::from(&stream)
                                .set_linger(Some(Duration::ZERO))
                                .unwrap();
                            drop(stream);
                        }
                    }
                });
            }
        });

        (port, accepted, rx)
    }

    #[tokio::test]
    async fn websocket_preferred_when_both_reachable() {
        let (ws_port, _rx) = spawn_websocket_tv().await;
        let (legacy_port, legacy_accepts, _frames) = spawn_legacy_tv(LegacyReply::Ack(b"ok")).await;

        let mut client = RemoteClient::new(LOCALHOST, config(ws_port, legacy_port));
        assert!(client.connect().await);
        assert_eq!(client.mode(), Some(SessionMode::WebSocket));
        assert_eq!(legacy_accepts.load(Ordering::SeqCst), 0);
        client.close().await;
    }

    #[tokio::test]
    async fn websocket_sends_json_rpc_click() {
        let (ws_port, mut rx) = spawn_websocket_tv().await;
        let mut client = RemoteClient::new(LOCALHOST, config(ws_port, closed_port().await));

        assert!(client.connect().await);
        assert!(client.send_command("KEY_VOLUP").await);

        let Message::Text(text) = next_message(&mut rx).await else {
            panic!("expected a text frame");
        };
        let value: serde_json::Value = serde_json::from_str(text.as_str()).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "method": "ms.remote.control",
                "params": {
                    "Cmd": "Click",
                    "DataOfCmd": "KEY_VOLUP",
                    "Option": false,
                    "TypeOfRemote": "SendRemoteKey"
                }
            })
        );
        client.close().await;
    }

    #[tokio::test]
    async fn falls_back_to_legacy_when_websocket_unreachable() {
        let (legacy_port, accepted, mut frames_rx) = spawn_legacy_tv(LegacyReply::Ack(b"\x00\x01ok")).await;
        let mut client = RemoteClient::new(LOCALHOST, config(closed_port().await, legacy_port));

        assert!(client.connect().await);
        assert_eq!(client.mode(), Some(SessionMode::Legacy));
        assert!(client.send_command("KEY_MUTE").await);
        assert_eq!(accepted.load(Ordering::SeqCst), 1);

        let frames = frames_rx.recv().await.unwrap();
        let (host, rest) = codec::decode_field(&frames[0][2..]).unwrap();
        let (app_id, rest) = codec::decode_field(rest).unwrap();
        let (app_name, _) = codec::decode_field(rest).unwrap();
        assert_eq!(host, LOCALHOST);
        assert_eq!(app_id, "google-home-samsung");
        assert_eq!(app_name, "Google Samsung Remote");

        let (key, _) = codec::decode_field(&frames[1][3..]).unwrap();
        assert_eq!(key, "KEY_MUTE");
        client.close().await;
    }

    /// Documented limitation: a TV that closes without replying still counts
    /// as an accepted command, because the legacy protocol has no ack.
    #[tokio::test]
    async fn legacy_zero_length_ack_counts_as_success() {
        let (legacy_port, _accepted, _frames) = spawn_legacy_tv(LegacyReply::Ack(b"")).await;
        let mut client = RemoteClient::new(LOCALHOST, config(closed_port().await, legacy_port));

        assert!(client.connect().await);
        assert!(client.send_command("KEY_POWER").await);
        client.close().await;
    }

    #[tokio::test]
    async fn legacy_silent_tv_fails_after_timeout() {
        let (legacy_port, _accepted, _frames) = spawn_legacy_tv(LegacyReply::Silent).await;
        let remote = RemoteConfig {
            connect_timeout_ms: 200,
            ..config(closed_port().await, legacy_port)
        };
        let mut client = RemoteClient::new(LOCALHOST, remote);

        assert!(client.connect().await);
        let started = tokio::time::Instant::now();
        assert!(!client.send_command("KEY_POWER").await);
        assert!(started.elapsed() >= Duration::from_millis(200));
        client.close().await;
    }

    #[tokio::test]
    async fn legacy_reset_fails_command() {
        let (legacy_port, _accepted, _frames) = spawn_legacy_tv(LegacyReply::Reset).await;
        let mut client = RemoteClient::new(LOCALHOST, config(closed_port().await, legacy_port));

        assert!(client.connect().await);
        assert!(!client.send_command("KEY_POWER").await);
        client.close().await;
    }

    #[tokio::test]
    async fn websocket_close_sends_normal_closure() {
        let (ws_port, mut rx) = spawn_websocket_tv().await;
        let mut client = RemoteClient::new(LOCALHOST, config(ws_port, closed_port().await));

        assert!(client.connect().await);
        client.close().await;

        match next_message(&mut rx).await {
            Message::Close(Some(frame)) => assert_eq!(frame.code, CloseCode::Normal),
            other => panic!("expected close frame, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn connect_fails_when_nothing_listens() {
        let mut client =
            RemoteClient::new(LOCALHOST, config(closed_port().await, closed_port().await));
        assert!(!client.connect().await);
        assert_eq!(client.mode(), None);
    }

    #[tokio::test]
    async fn send_without_connect_fails() {
        let mut client =
            RemoteClient::new(LOCALHOST, config(closed_port().await, closed_port().await));
        assert!(!client.send_command("KEY_POWER").await);
    }

    #[tokio::test]
    async fn close_is_idempotent() {
        let (ws_port, _rx) = spawn_websocket_tv().await;
        let mut client = RemoteClient::new(LOCALHOST, config(ws_port, closed_port().await));

        assert!(client.connect().await);
        client.close().await;
        client.close().await;
        assert_eq!(client.mode(), None);
        assert!(!client.send_command("KEY_POWER").await);
    }

    #[tokio::test]
    async fn single_command_releases_session() {
        let (legacy_port, _accepted, mut frames_rx) = spawn_legacy_tv(LegacyReply::Ack(b"ok")).await;
        let mut client = RemoteClient::new(LOCALHOST, config(closed_port().await, legacy_port));

        assert!(client.send_single_command("KEY_PLAY").await);
        assert_eq!(client.mode(), None);

        let frames = frames_rx.recv().await.unwrap();
        let (key, _) = codec::decode_field(&frames[1][3..]).unwrap();
        assert_eq!(key, "KEY_PLAY");
    }

    #[tokio::test]
    async fn single_command_fails_when_unreachable() {
        let mut client =
            RemoteClient::new(LOCALHOST, config(closed_port().await, closed_port().await));
        assert!(!client.send_single_command("KEY_PLAY").await);
        assert_eq!(client.mode(), None);
    }

    #[test]
    fn websocket_url_carries_application_id() {
        let client = RemoteClient::new("10.0.0.5", RemoteConfig::default());
        assert_eq!(
            client.websocket_url().unwrap().as_str(),
            "ws://10.0.0.5:8001/api/v2/channels/samsung.remote.control?name=google-home-samsung"
        );
    }
}
