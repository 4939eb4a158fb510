//! Multicast presence listener.
//!
//! TVs periodically multicast a JSON announcement to 224.0.0.7:8001. The
//! listener joins that group on every usable interface and hands each parsed
//! announcement to a callback.
//!
//! A malformed datagram is logged and skipped; a socket read error ends the
//! listener with [`DiscoveryError::Receive`] so the caller can stop the
//! process.

use local_ip_address::list_afinet_netifas;
use socket2::{Domain, Protocol, Socket, Type};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use tokio::net::UdpSocket;
use tokio_util::sync::CancellationToken;

use super::types::{is_virtual_interface, Announcement, DiscoveryError, DiscoveryResult};
use crate::protocol_constants::DATAGRAM_BUFFER_SIZE;
use crate::state::DiscoveryConfig;

/// Returns the IPv4 addresses of all non-virtual, non-loopback interfaces.
pub fn get_interfaces() -> Vec<(String, Ipv4Addr)> {
    list_afinet_netifas()
        .unwrap_or_else(|e| {
            log::warn!("[Discovery] Failed to list network interfaces: {}", e);
            Vec::new()
        })
        .into_iter()
        .filter_map(|(name, addr)| {
            if is_virtual_interface(&name) {
                log::debug!("[Discovery] Skipping virtual interface: {}", name);
                return None;
            }
            match addr {
                IpAddr::V4(ipv4) if !ipv4.is_loopback() => Some((name, ipv4)),
                _ => None,
            }
        })
        .collect()
}

/// Creates the multicast socket and joins the announcement group.
///
/// Sets up socket options for a shared multicast port:
/// - SO_REUSEADDR / SO_REUSEPORT so other listeners can coexist
/// - SO_RCVBUF large enough for unbounded JSON announcements
fn create_socket(config: &DiscoveryConfig) -> DiscoveryResult<UdpSocket> {
    let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))
        .map_err(DiscoveryError::SocketBind)?;

    if let Err(e) = socket.set_reuse_address(true) {
        log::warn!("[Discovery] Failed to set SO_REUSEADDR: {}", e);
    }

    #[cfg(unix)]
    if let Err(e) = socket.set_reuse_port(true) {
        log::warn!("[Discovery] Failed to set SO_REUSEPORT: {}", e);
    }

    let recv_buffer = config.effective_recv_buffer_size();
    if let Err(e) = socket.set_recv_buffer_size(recv_buffer) {
        log::warn!(
            "[Discovery] Failed to set receive buffer to {} bytes: {}",
            recv_buffer,
            e
        );
    }

    socket
        .set_nonblocking(true)
        .map_err(DiscoveryError::SocketBind)?;

    let bind_addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), config.port);
    socket
        .bind(&bind_addr.into())
        .map_err(DiscoveryError::SocketBind)?;

    let group = config.multicast_group;
    let mut joined = 0;
    for (name, ip) in get_interfaces() {
        match socket.join_multicast_v4(&group, &ip) {
            Ok(()) => {
                log::debug!("[Discovery] Joined {} on {} ({})", group, name, ip);
                joined += 1;
            }
            Err(e) => log::warn!(
                "[Discovery] Failed to join {} on {} ({}): {}",
                group,
                name,
                ip,
                e
            ),
        }
    }

    if joined == 0 {
        // Let the OS pick the default multicast interface.
        socket
            .join_multicast_v4(&group, &Ipv4Addr::UNSPECIFIED)
            .map_err(|e| DiscoveryError::SocketJoin(e.to_string()))?;
        log::debug!("[Discovery] Joined {} on default interface", group);
    }

    let std_socket: std::net::UdpSocket = socket.into();
    UdpSocket::from_std(std_socket).map_err(DiscoveryError::SocketBind)
}

/// Listens for presence announcements until cancelled or the socket fails.
pub struct DiscoveryListener {
    socket: UdpSocket,
}

impl DiscoveryListener {
    /// Binds the multicast socket described by `config`.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn bind(config: &DiscoveryConfig) -> DiscoveryResult<Self> {
        let socket = create_socket(config)?;
        log::info!(
            "[Discovery] Listening for announcements on {}:{}",
            config.multicast_group,
            config.port
        );
        Ok(Self { socket })
    }

    /// Wraps an already-bound socket (e.g. a unicast socket in tests).
    pub fn from_socket(socket: UdpSocket) -> Self {
        Self { socket }
    }

    /// Local address of the underlying socket.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Receives announcements and passes each valid one to `on_announcement`.
    ///
    /// Returns `Ok(())` when `cancel` fires, or [`DiscoveryError::Receive`]
    /// when the socket fails.
    pub async fn run<F>(
        self,
        cancel: CancellationToken,
        mut on_announcement: F,
    ) -> DiscoveryResult<()>
    where
        F: FnMut(Announcement),
    {
        let mut buf = vec![0u8; DATAGRAM_BUFFER_SIZE];

        loop {
            let (len, src) = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    log::info!("[Discovery] Listener stopped");
                    return Ok(());
                }
                result = self.socket.recv_from(&mut buf) => {
                    result.map_err(DiscoveryError::Receive)?
                }
            };

            match Announcement::parse(&buf[..len]) {
                Ok(announcement) => {
                    log::trace!(
                        "[Discovery] Announcement from {}: {}",
                        src,
                        announcement.device_id
                    );
                    on_announcement(announcement);
                }
                Err(e) => log::warn!("[Discovery] Ignoring datagram from {}: {}", src, e),
            }
        }
    }
}
