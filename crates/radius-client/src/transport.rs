//! Per-role UDP transport and server state tracking
//!
//! Each server role (authentication, accounting) owns its candidate server
//! list, the wildcard-bound sockets for the address families that list
//! needs, and the counters for every server. Sockets are connected to the
//! active server so that only its datagrams are received.

use crate::config::ServerConfig;
use crate::error::ClientResult;
use crate::ledger::ServerRole;
use std::io;
use std::net::SocketAddr;
use tokio::net::UdpSocket;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Receive buffer size; a datagram filling it completely is treated as
/// truncated and dropped.
pub(crate) const RECV_BUF_LEN: usize = 4096;

/// Counters for one configured server, following the RFC 2618/2620 client
/// MIB layout
///
/// Plain integers: all mutation happens on the client's event task, which
/// owns the transport outright.
#[derive(Debug, Default, Clone)]
pub(crate) struct ServerStats {
    /// Requests sent with this server active (first transmissions)
    pub requests: u64,
    /// Retransmissions sent with this server active
    pub retransmissions: u64,
    /// Access-Accept packets received
    pub access_accepts: u64,
    /// Access-Reject packets received
    pub access_rejects: u64,
    /// Access-Challenge packets received
    pub access_challenges: u64,
    /// Accounting-Response packets received
    pub responses: u64,
    /// Datagrams that failed to parse
    pub malformed_responses: u64,
    /// Responses every handler rejected for a bad authenticator
    pub bad_authenticators: u64,
    /// Retry intervals that expired without a response
    pub timeouts: u64,
    /// Responses no handler recognized
    pub unknown_types: u64,
    /// Datagrams dropped before dispatch (oversized or unmatched)
    pub packets_dropped: u64,
    /// Last observed round trip in hundredths of a second
    pub round_trip_time: u32,
}

/// One candidate server for a role
#[derive(Debug)]
pub(crate) struct Server {
    pub address: SocketAddr,
    pub secret: Vec<u8>,
    pub name: Option<String>,
    pub stats: ServerStats,
}

impl Server {
    fn from_config(config: &ServerConfig) -> ClientResult<Self> {
        Ok(Server {
            address: config.socket_addr()?,
            secret: config.secret.clone().into_bytes(),
            name: config.name.clone(),
            stats: ServerStats::default(),
        })
    }

    /// Log label: the configured name when there is one, the address
    /// otherwise
    pub(crate) fn label(&self) -> String {
        match &self.name {
            Some(name) => format!("{} ({})", name, self.address),
            None => self.address.to_string(),
        }
    }
}

/// Whether a send failure suggests the local interface went away, in which
/// case the sockets are closed and reopened on the next transmission
fn is_interface_error(kind: io::ErrorKind) -> bool {
    matches!(
        kind,
        io::ErrorKind::NotConnected
            | io::ErrorKind::NetworkUnreachable
            | io::ErrorKind::PermissionDenied
            | io::ErrorKind::InvalidInput
    )
}

/// Sockets plus server bookkeeping for one role
pub(crate) struct RoleTransport {
    role: ServerRole,
    servers: Vec<Server>,
    /// Index of the server traffic is directed at; None until the first
    /// server change selects one
    active: Option<usize>,
    sock_v4: Option<UdpSocket>,
    sock_v6: Option<UdpSocket>,
    /// Whether the active server's family socket is currently connected
    connected: bool,
    recv_buf: Vec<u8>,
    /// When this role last failed over, for cool-down suppression
    pub(crate) last_failover: Option<Instant>,
}

impl RoleTransport {
    pub(crate) fn new(role: ServerRole, configs: &[ServerConfig]) -> ClientResult<Self> {
        let mut servers = Vec::with_capacity(configs.len());
        for config in configs {
            servers.push(Server::from_config(config)?);
        }
        Ok(RoleTransport {
            role,
            servers,
            active: None,
            sock_v4: None,
            sock_v6: None,
            connected: false,
            recv_buf: vec![0u8; RECV_BUF_LEN],
            last_failover: None,
        })
    }

    pub(crate) fn is_configured(&self) -> bool {
        !self.servers.is_empty()
    }

    pub(crate) fn server_count(&self) -> usize {
        self.servers.len()
    }

    pub(crate) fn servers(&self) -> &[Server] {
        &self.servers
    }

    pub(crate) fn active_index(&self) -> Option<usize> {
        self.active
    }

    pub(crate) fn is_active(&self, index: usize) -> bool {
        self.active == Some(index)
    }

    pub(crate) fn set_active(&mut self, index: usize) {
        self.active = Some(index);
    }

    pub(crate) fn is_connected(&self) -> bool {
        self.connected
    }

    pub(crate) fn active_server(&self) -> Option<&Server> {
        self.active.and_then(|i| self.servers.get(i))
    }

    pub(crate) fn active_server_mut(&mut self) -> Option<&mut Server> {
        match self.active {
            Some(i) => self.servers.get_mut(i),
            None => None,
        }
    }

    /// Bind wildcard sockets for the address families the server list
    /// needs. Sockets that already exist are kept. Fails only when no
    /// socket at all could be opened.
    pub(crate) async fn open_sockets(&mut self) -> io::Result<()> {
        let need_v4 = self.servers.iter().any(|s| s.address.is_ipv4());
        let need_v6 = self.servers.iter().any(|s| s.address.is_ipv6());

        if need_v4 && self.sock_v4.is_none() {
            match UdpSocket::bind(("0.0.0.0", 0)).await {
                Ok(sock) => self.sock_v4 = Some(sock),
                Err(err) => {
                    warn!(role = %self.role, error = %err, "Failed to open IPv4 RADIUS socket")
                }
            }
        }
        if need_v6 && self.sock_v6.is_none() {
            match UdpSocket::bind(("::", 0)).await {
                Ok(sock) => self.sock_v6 = Some(sock),
                Err(err) => {
                    warn!(role = %self.role, error = %err, "Failed to open IPv6 RADIUS socket")
                }
            }
        }

        if self.sock_v4.is_none() && self.sock_v6.is_none() {
            return Err(io::Error::other("no RADIUS client socket could be opened"));
        }
        Ok(())
    }

    /// Connect the family-matching socket to the active server
    pub(crate) async fn connect_active(&mut self) -> io::Result<()> {
        self.connected = false;
        let Some(address) = self.active_server().map(|s| s.address) else {
            return Err(io::Error::other("no active server selected"));
        };
        let sock = if address.is_ipv4() {
            self.sock_v4.as_ref()
        } else {
            self.sock_v6.as_ref()
        };
        let Some(sock) = sock else {
            return Err(io::Error::other(
                "no socket matching the server address family",
            ));
        };
        sock.connect(address).await?;
        self.connected = true;
        debug!(role = %self.role, server = %address, "Connected RADIUS socket");
        Ok(())
    }

    /// Reopen and reconnect after an error teardown. Failures are logged
    /// and the transport stays disconnected for the next attempt.
    pub(crate) async fn reinit(&mut self) {
        if self.connected {
            return;
        }
        if let Err(err) = self.open_sockets().await {
            info!(role = %self.role, error = %err, "RADIUS socket reinit failed");
            return;
        }
        if self.active.is_none() {
            return;
        }
        if let Err(err) = self.connect_active().await {
            info!(role = %self.role, error = %err, "Reconnect to RADIUS server failed");
        }
    }

    /// Send one datagram to the active server. Errors are logged, and the
    /// kinds that suggest a dead interface close the sockets so the next
    /// transmission reinitializes them.
    pub(crate) async fn send(&mut self, wire: &[u8]) {
        let Some(address) = self.active_server().map(|s| s.address) else {
            debug!(role = %self.role, "No active server, dropping outbound message");
            return;
        };
        let sock = if address.is_ipv4() {
            self.sock_v4.as_ref()
        } else {
            self.sock_v6.as_ref()
        };
        let Some(sock) = sock else {
            debug!(role = %self.role, "No socket for the active server, dropping outbound message");
            return;
        };

        if let Err(err) = sock.send(wire).await {
            info!(role = %self.role, server = %address, error = %err, "Failed to send RADIUS message");
            if is_interface_error(err.kind()) {
                info!(role = %self.role, "Send failure suggests interface change, closing sockets for reinit");
                self.close_sockets();
            }
        }
    }

    /// Wait for a datagram from the active server. Never resolves while the
    /// transport has no connected socket.
    pub(crate) async fn recv(&mut self) -> io::Result<usize> {
        if !self.connected {
            return std::future::pending().await;
        }
        let want_v4 = match self.active_server() {
            Some(server) => server.address.is_ipv4(),
            None => return std::future::pending().await,
        };
        let sock = if want_v4 {
            self.sock_v4.as_ref()
        } else {
            self.sock_v6.as_ref()
        };
        let Some(sock) = sock else {
            return std::future::pending().await;
        };
        sock.recv(&mut self.recv_buf).await
    }

    /// Bytes of the last received datagram
    pub(crate) fn datagram(&self, len: usize) -> &[u8] {
        &self.recv_buf[..len]
    }

    pub(crate) fn recv_capacity(&self) -> usize {
        self.recv_buf.len()
    }

    fn close_sockets(&mut self) {
        self.sock_v4 = None;
        self.sock_v6 = None;
        self.connected = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_configs(addresses: &[&str]) -> Vec<ServerConfig> {
        addresses
            .iter()
            .map(|a| ServerConfig {
                address: a.to_string(),
                secret: "test_secret".to_string(),
                name: None,
            })
            .collect()
    }

    #[test]
    fn test_new_parses_servers() {
        let transport = RoleTransport::new(
            ServerRole::Auth,
            &test_configs(&["192.168.1.1:1812", "192.168.1.2:1812"]),
        )
        .unwrap();

        assert_eq!(transport.server_count(), 2);
        assert!(transport.is_configured());
        assert!(transport.active_index().is_none());
        assert!(!transport.is_connected());
        assert_eq!(transport.servers()[0].secret, b"test_secret");
    }

    #[test]
    fn test_new_rejects_bad_address() {
        let result = RoleTransport::new(ServerRole::Auth, &test_configs(&["bad"]));
        assert!(result.is_err());
    }

    #[test]
    fn test_unconfigured_role() {
        let transport = RoleTransport::new(ServerRole::Acct, &[]).unwrap();
        assert!(!transport.is_configured());
        assert_eq!(transport.server_count(), 0);
    }

    #[test]
    fn test_stats_start_at_zero() {
        let transport =
            RoleTransport::new(ServerRole::Auth, &test_configs(&["192.168.1.1:1812"])).unwrap();
        let stats = &transport.servers()[0].stats;
        assert_eq!(stats.requests, 0);
        assert_eq!(stats.timeouts, 0);
        assert_eq!(stats.round_trip_time, 0);
    }

    #[test]
    fn test_interface_error_kinds() {
        assert!(is_interface_error(io::ErrorKind::NotConnected));
        assert!(is_interface_error(io::ErrorKind::NetworkUnreachable));
        assert!(is_interface_error(io::ErrorKind::PermissionDenied));
        assert!(is_interface_error(io::ErrorKind::InvalidInput));
        assert!(!is_interface_error(io::ErrorKind::WouldBlock));
        assert!(!is_interface_error(io::ErrorKind::ConnectionRefused));
    }

    #[tokio::test]
    async fn test_open_connect_send() {
        let peer = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let peer_addr = peer.local_addr().unwrap();

        let mut transport =
            RoleTransport::new(ServerRole::Auth, &test_configs(&[&peer_addr.to_string()]))
                .unwrap();
        transport.open_sockets().await.unwrap();
        transport.set_active(0);
        transport.connect_active().await.unwrap();
        assert!(transport.is_connected());

        transport.send(b"ping").await;
        let mut buf = [0u8; 16];
        let (n, _) = peer.recv_from(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"ping");
    }

    #[tokio::test]
    async fn test_only_needed_families_bound() {
        let mut transport =
            RoleTransport::new(ServerRole::Auth, &test_configs(&["127.0.0.1:1812"])).unwrap();
        transport.open_sockets().await.unwrap();
        assert!(transport.sock_v4.is_some());
        assert!(transport.sock_v6.is_none());
    }
}
