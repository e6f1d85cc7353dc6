//! Client facade and event task
//!
//! [`RadiusClient`] is a cheap-to-clone handle over a command channel. All
//! real work happens on a single spawned task that owns the sockets, the
//! pending-request ledger, the handler chains and the per-server counters,
//! so none of that state needs locking.
//!
//! The task multiplexes five event sources: commands from handles, datagrams
//! on the authentication and accounting sockets, the retransmission timer
//! and the optional primary-restoration timer.

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};
use crate::handler::{ChainResult, HandlerRegistry, ResponseHandler};
use crate::ledger::{EntryHandle, Ledger, MessageType, PendingRequest, ServerRole, StationId};
use crate::stats::render_mib;
use crate::transport::RoleTransport;
use radius_proto::{Code, Packet};
use std::io;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{self, Duration, Instant, Interval, MissedTickBehavior};
use tracing::{debug, info, warn};

enum Command {
    Send {
        message: Packet,
        message_type: MessageType,
        station: StationId,
    },
    RegisterHandler {
        message_type: MessageType,
        handler: Box<dyn ResponseHandler>,
    },
    NextIdentifier {
        reply: oneshot::Sender<u8>,
    },
    Flush,
    FlushStation {
        message_type: MessageType,
        station: StationId,
    },
    Stats {
        reply: oneshot::Sender<String>,
    },
    Shutdown {
        reply: oneshot::Sender<()>,
    },
}

/// Handle to a running RADIUS client
///
/// Sending is fire-and-forget: a request that gets no response is
/// retransmitted with exponential backoff, moved to a fallback server when
/// one is configured, and eventually abandoned. Delivery failures surface
/// through registered handlers never being called, and through the
/// statistics.
#[derive(Clone)]
pub struct RadiusClient {
    tx: mpsc::UnboundedSender<Command>,
}

impl RadiusClient {
    /// Validate the configuration, open the sockets and spawn the event
    /// task
    pub async fn start(config: ClientConfig) -> ClientResult<RadiusClient> {
        config.validate()?;
        let (tx, rx) = mpsc::unbounded_channel();
        let actor = ClientActor::new(config, rx).await?;
        tokio::spawn(actor.run());
        Ok(RadiusClient { tx })
    }

    /// Queue a request for transmission to the active server of its role
    ///
    /// The identifier of `message` should come from
    /// [`next_identifier`](Self::next_identifier) so that stale entries with
    /// a recycled identifier are purged first.
    pub fn send(
        &self,
        message: Packet,
        message_type: MessageType,
        station: StationId,
    ) -> ClientResult<()> {
        self.tx
            .send(Command::Send {
                message,
                message_type,
                station,
            })
            .map_err(|_| ClientError::ShuttingDown)
    }

    /// Append a response handler to the chain for `message_type`'s role.
    /// Handlers stay registered for the client's lifetime.
    pub fn register_handler<H>(&self, message_type: MessageType, handler: H) -> ClientResult<()>
    where
        H: ResponseHandler + 'static,
    {
        self.tx
            .send(Command::RegisterHandler {
                message_type,
                handler: Box::new(handler),
            })
            .map_err(|_| ClientError::ShuttingDown)
    }

    /// Allocate the next RADIUS identifier
    pub async fn next_identifier(&self) -> ClientResult<u8> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Command::NextIdentifier { reply })
            .map_err(|_| ClientError::ShuttingDown)?;
        rx.await.map_err(|_| ClientError::ShuttingDown)
    }

    /// Drop every pending request
    pub fn flush(&self) -> ClientResult<()> {
        self.tx
            .send(Command::Flush)
            .map_err(|_| ClientError::ShuttingDown)
    }

    /// Drop pending requests of one type for one station, regardless of
    /// their retry state
    pub fn flush_station(&self, message_type: MessageType, station: StationId) -> ClientResult<()> {
        self.tx
            .send(Command::FlushStation {
                message_type,
                station,
            })
            .map_err(|_| ClientError::ShuttingDown)
    }

    /// Render the per-server counters as `key=value` lines
    pub async fn stats(&self) -> ClientResult<String> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Command::Stats { reply })
            .map_err(|_| ClientError::ShuttingDown)?;
        rx.await.map_err(|_| ClientError::ShuttingDown)
    }

    /// Stop the event task, dropping all pending requests. Safe to call on
    /// a client that has already stopped.
    pub async fn shutdown(&self) -> ClientResult<()> {
        let (reply, rx) = oneshot::channel();
        if self.tx.send(Command::Shutdown { reply }).is_err() {
            return Ok(());
        }
        let _ = rx.await;
        Ok(())
    }
}

/// Timer future for the retransmission scan; never resolves while no scan
/// is scheduled
async fn retry_timer(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

/// Timer future for primary restoration; never resolves when disabled
async fn restore_timer(interval: Option<&mut Interval>) {
    match interval {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}

struct ClientActor {
    rx: mpsc::UnboundedReceiver<Command>,
    config: ClientConfig,
    auth: RoleTransport,
    acct: RoleTransport,
    ledger: Ledger,
    handlers: HandlerRegistry,
    next_identifier: u8,
    /// When the next retransmission scan runs; None while the ledger is
    /// empty
    retry_deadline: Option<Instant>,
    restore: Option<Interval>,
}

impl ClientActor {
    async fn new(config: ClientConfig, rx: mpsc::UnboundedReceiver<Command>) -> ClientResult<Self> {
        let auth = RoleTransport::new(ServerRole::Auth, &config.auth_servers)?;
        let acct = RoleTransport::new(ServerRole::Acct, &config.acct_servers)?;

        let restore = if config.retry_primary_interval > 0 {
            let period = Duration::from_secs(config.retry_primary_interval);
            let mut interval = time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            Some(interval)
        } else {
            None
        };

        let mut actor = ClientActor {
            rx,
            auth,
            acct,
            ledger: Ledger::new(config.max_pending),
            handlers: HandlerRegistry::new(),
            next_identifier: 0,
            retry_deadline: None,
            restore,
            config,
        };

        if actor.auth.is_configured() {
            actor.auth.open_sockets().await?;
            actor.change_server(ServerRole::Auth, 0).await;
        }
        if actor.acct.is_configured() {
            actor.acct.open_sockets().await?;
            actor.change_server(ServerRole::Acct, 0).await;
        }
        Ok(actor)
    }

    async fn run(mut self) {
        loop {
            tokio::select! {
                command = self.rx.recv() => {
                    match command {
                        Some(command) => {
                            if !self.on_command(command).await {
                                break;
                            }
                        }
                        None => {
                            self.ledger.begin_shutdown();
                            self.ledger.flush_all();
                            break;
                        }
                    }
                }
                result = self.auth.recv() => {
                    self.on_datagram(ServerRole::Auth, result);
                }
                result = self.acct.recv() => {
                    self.on_datagram(ServerRole::Acct, result);
                }
                _ = retry_timer(self.retry_deadline) => {
                    self.on_retry_timer().await;
                }
                _ = restore_timer(self.restore.as_mut()) => {
                    self.restore_primary().await;
                }
            }
        }
        debug!("RADIUS client event task stopped");
    }

    /// Returns false when the task should stop
    async fn on_command(&mut self, command: Command) -> bool {
        match command {
            Command::Send {
                message,
                message_type,
                station,
            } => self.on_send(message, message_type, station).await,
            Command::RegisterHandler {
                message_type,
                handler,
            } => self.handlers.register(message_type, handler),
            Command::NextIdentifier { reply } => {
                let _ = reply.send(self.allocate_identifier());
            }
            Command::Flush => {
                let flushed = self.ledger.flush_all();
                debug!(count = flushed, "Flushed all pending RADIUS requests");
                self.rearm_retry_timer();
            }
            Command::FlushStation {
                message_type,
                station,
            } => {
                let removed = self.ledger.remove_matching(message_type, station);
                if removed > 0 {
                    debug!(
                        count = removed,
                        station = %station,
                        "Flushed pending RADIUS requests for station"
                    );
                    self.rearm_retry_timer();
                }
            }
            Command::Stats { reply } => {
                let text = render_mib(
                    &self.auth,
                    &self.acct,
                    self.ledger.pending_for_role(ServerRole::Auth),
                    self.ledger.pending_for_role(ServerRole::Acct),
                );
                let _ = reply.send(text);
            }
            Command::Shutdown { reply } => {
                self.ledger.begin_shutdown();
                let flushed = self.ledger.flush_all();
                info!(dropped = flushed, "RADIUS client shutting down");
                let _ = reply.send(());
                return false;
            }
        }
        true
    }

    async fn on_send(&mut self, mut message: Packet, message_type: MessageType, station: StationId) {
        // A fresh interim accounting update supersedes a still-pending one
        // for the same station
        if message_type == MessageType::AcctInterim {
            let removed = self.ledger.remove_matching(MessageType::AcctInterim, station);
            if removed > 0 {
                debug!(station = %station, "Removed pending interim accounting update");
            }
        }

        let role = message_type.class();
        let transport = match role {
            ServerRole::Auth => &mut self.auth,
            ServerRole::Acct => &mut self.acct,
        };
        if !transport.is_configured() {
            warn!(role = %role, "No RADIUS server configured, dropping message");
            return;
        }
        if !transport.is_connected() {
            transport.reinit().await;
            if !transport.is_connected() {
                warn!(role = %role, "RADIUS server not reachable, dropping message");
                return;
            }
        }
        let Some((secret, server_address)) = transport
            .active_server()
            .map(|s| (s.secret.clone(), s.address))
        else {
            warn!(role = %role, "No active RADIUS server, dropping message");
            return;
        };

        let wire = match message_type {
            MessageType::Auth => message.finalize(&secret),
            MessageType::Acct | MessageType::AcctInterim => message.finalize_acct(&secret),
        };
        let wire = match wire {
            Ok(wire) => wire,
            Err(err) => {
                warn!(role = %role, error = %err, "Encoding RADIUS message failed, dropping it");
                return;
            }
        };

        if let Some(server) = transport.active_server_mut() {
            server.stats.requests += 1;
        }
        debug!(
            role = %role,
            server = %server_address,
            id = message.identifier,
            code = ?message.code,
            station = %station,
            "Sending RADIUS message"
        );
        if self.config.msg_dumps {
            debug!("Outgoing message:\n{}", message.dump());
        }
        transport.send(&wire).await;

        let entry = PendingRequest::new(
            message,
            wire,
            message_type,
            station,
            secret,
            Instant::now(),
            self.first_wait(),
        );
        if self.ledger.insert(entry).is_none() {
            return;
        }
        self.rearm_retry_timer();
    }

    async fn on_retry_timer(&mut self) {
        if self.ledger.is_empty() {
            self.retry_deadline = None;
            return;
        }
        let now = Instant::now();
        for handle in self.ledger.due_handles(now) {
            self.retransmit(handle, now).await;
        }
        self.rearm_retry_timer();

        // Entries stuck past the threshold argue for a different server
        let mut stuck_auth = 0u32;
        let mut stuck_acct = 0u32;
        for entry in self.ledger.iter() {
            if entry.attempts > self.config.retry.failover_threshold {
                match entry.message_type.class() {
                    ServerRole::Auth => stuck_auth += 1,
                    ServerRole::Acct => stuck_acct += 1,
                }
            }
        }
        if stuck_auth > 0 {
            self.try_failover(ServerRole::Auth, stuck_auth).await;
        }
        if stuck_acct > 0 {
            self.try_failover(ServerRole::Acct, stuck_acct).await;
        }
    }

    /// One retransmission step for a due entry. The handle may already be
    /// stale if an earlier step this scan triggered a ledger flush.
    async fn retransmit(&mut self, handle: EntryHandle, now: Instant) {
        let Some(entry) = self.ledger.get(handle) else {
            return;
        };
        let role = entry.message_type.class();

        let transport = match role {
            ServerRole::Auth => &mut self.auth,
            ServerRole::Acct => &mut self.acct,
        };
        if !transport.is_connected() {
            transport.reinit().await;
            if !transport.is_connected() && transport.server_count() > 1 {
                self.try_failover(role, 0).await;
            }
        }

        let Some(entry) = self.ledger.get(handle) else {
            return;
        };
        let attempts = entry.attempts;
        let identifier = entry.message.identifier;
        let station = entry.station;

        let transport = match role {
            ServerRole::Auth => &mut self.auth,
            ServerRole::Acct => &mut self.acct,
        };
        if let Some(server) = transport.active_server_mut() {
            if attempts == 0 {
                server.stats.requests += 1;
            } else {
                server.stats.timeouts += 1;
                server.stats.retransmissions += 1;
            }
        }

        if attempts >= self.config.retry.max_retries {
            info!(
                role = %role,
                id = identifier,
                station = %station,
                "Removing un-ACKed RADIUS message after too many attempts"
            );
            self.ledger.remove(handle);
            return;
        }

        let max_wait = self.max_wait();
        let Some(entry) = self.ledger.get_mut(handle) else {
            return;
        };
        entry.attempts += 1;
        entry.last_sent_at = now;
        debug!(
            role = %role,
            id = identifier,
            attempts = entry.attempts,
            "Resending RADIUS message"
        );
        match role {
            ServerRole::Auth => self.auth.send(&entry.wire).await,
            ServerRole::Acct => self.acct.send(&entry.wire).await,
        }
        entry.next_retry_at = now + entry.next_backoff;
        entry.next_backoff = (entry.next_backoff * 2).min(max_wait);
    }

    /// Move a role to its next candidate server, unless the role has only
    /// one or a recent failover is still settling. `stuck` entries are
    /// charged as timeouts against the server being left.
    async fn try_failover(&mut self, role: ServerRole, stuck: u32) -> bool {
        let cooldown = Duration::from_secs(self.config.retry.failover_cooldown);
        let transport = match role {
            ServerRole::Auth => &mut self.auth,
            ServerRole::Acct => &mut self.acct,
        };
        if transport.server_count() < 2 {
            return false;
        }
        if let Some(last) = transport.last_failover
            && last.elapsed() < cooldown
        {
            debug!(role = %role, "Failover suppressed during cool-down");
            return false;
        }

        if stuck > 0
            && let Some(server) = transport.active_server_mut()
        {
            server.stats.timeouts += u64::from(stuck);
        }
        let next = match transport.active_index() {
            Some(index) => (index + 1) % transport.server_count(),
            None => 0,
        };
        if let Some(server) = transport.active_server() {
            warn!(
                role = %role,
                server = %server.label(),
                stuck,
                "No response from RADIUS server, failing over"
            );
        }
        transport.last_failover = Some(Instant::now());
        self.change_server(role, next).await;
        true
    }

    /// Make `new_index` the role's active server
    ///
    /// A first selection or a shared-secret change invalidates in-flight
    /// authenticators, so the whole ledger is flushed. Moving between
    /// servers with the same secret instead rewinds every entry's retry
    /// state and schedules a prompt rescan.
    async fn change_server(&mut self, role: ServerRole, new_index: usize) {
        let first_wait = self.first_wait();
        let transport = match role {
            ServerRole::Auth => &mut self.auth,
            ServerRole::Acct => &mut self.acct,
        };
        let old_index = transport.active_index();
        match old_index {
            Some(old) => info!(
                role = %role,
                old = %transport.servers()[old].label(),
                new = %transport.servers()[new_index].label(),
                "Changing RADIUS server"
            ),
            None => info!(
                role = %role,
                server = %transport.servers()[new_index].label(),
                "Selecting RADIUS server"
            ),
        }
        let secret_changed = match old_index {
            Some(old) => transport.servers()[old].secret != transport.servers()[new_index].secret,
            None => true,
        };
        transport.set_active(new_index);

        if secret_changed {
            let flushed = self.ledger.flush_all();
            if flushed > 0 {
                debug!(
                    count = flushed,
                    "Flushed pending requests after shared secret change"
                );
            }
            self.rearm_retry_timer();
        } else {
            self.ledger.reset_backoff(first_wait);
            if !self.ledger.is_empty() {
                self.retry_deadline = Some(Instant::now() + first_wait);
            }
        }

        let transport = match role {
            ServerRole::Auth => &mut self.auth,
            ServerRole::Acct => &mut self.acct,
        };
        if let Err(err) = transport.connect_active().await {
            info!(role = %role, error = %err, "Connecting to RADIUS server failed");
        }
    }

    /// Periodic check moving traffic back to each role's first configured
    /// server
    async fn restore_primary(&mut self) {
        if self.auth.is_configured()
            && self.auth.is_connected()
            && self.auth.active_index() != Some(0)
        {
            info!(
                role = %ServerRole::Auth,
                server = %self.auth.servers()[0].label(),
                "Retrying primary RADIUS server"
            );
            self.change_server(ServerRole::Auth, 0).await;
        }
        if self.acct.is_configured()
            && self.acct.is_connected()
            && self.acct.active_index() != Some(0)
        {
            info!(
                role = %ServerRole::Acct,
                server = %self.acct.servers()[0].label(),
                "Retrying primary RADIUS server"
            );
            self.change_server(ServerRole::Acct, 0).await;
        }
    }

    fn on_datagram(&mut self, role: ServerRole, result: io::Result<usize>) {
        let n = match result {
            Ok(n) => n,
            Err(err) => {
                info!(role = %role, error = %err, "RADIUS socket receive failed");
                return;
            }
        };
        let transport = match role {
            ServerRole::Auth => &mut self.auth,
            ServerRole::Acct => &mut self.acct,
        };
        debug!(role = %role, len = n, "Received message from RADIUS server");

        // A datagram filling the whole buffer was probably truncated
        if n == transport.recv_capacity() {
            info!(role = %role, len = n, "Possibly too long UDP frame for our buffer, dropping it");
            if let Some(server) = transport.active_server_mut() {
                server.stats.packets_dropped += 1;
            }
            return;
        }

        let response = match Packet::decode(transport.datagram(n)) {
            Ok(response) => response,
            Err(err) => {
                debug!(role = %role, error = %err, "Parsing incoming RADIUS message failed");
                if let Some(server) = transport.active_server_mut() {
                    server.stats.malformed_responses += 1;
                }
                return;
            }
        };
        if self.config.msg_dumps {
            debug!("Incoming message:\n{}", response.dump());
        }

        if let Some(server) = transport.active_server_mut() {
            match response.code {
                Code::AccessAccept => server.stats.access_accepts += 1,
                Code::AccessReject => server.stats.access_rejects += 1,
                Code::AccessChallenge => server.stats.access_challenges += 1,
                Code::AccountingResponse => server.stats.responses += 1,
                _ => {}
            }
        }

        let Some(entry) = self.ledger.take_matching(role, response.identifier) else {
            debug!(
                role = %role,
                id = response.identifier,
                code = ?response.code,
                "No matching pending request, dropping response"
            );
            if let Some(server) = transport.active_server_mut() {
                server.stats.packets_dropped += 1;
            }
            return;
        };

        let rtt = Instant::now().duration_since(entry.last_sent_at);
        if let Some(server) = transport.active_server_mut() {
            server.stats.round_trip_time = (rtt.as_millis() / 10) as u32;
        }
        debug!(
            role = %role,
            id = response.identifier,
            rtt_ms = rtt.as_millis() as u64,
            "Response matched a pending request"
        );

        match self
            .handlers
            .dispatch(role, response, &entry.message, &entry.shared_secret)
        {
            ChainResult::Claimed => {}
            ChainResult::Unclaimed {
                invalid_authenticator,
            } => {
                if let Some(server) = transport.active_server_mut() {
                    if invalid_authenticator {
                        server.stats.bad_authenticators += 1;
                    } else {
                        server.stats.unknown_types += 1;
                    }
                }
                debug!(role = %role, "No handler claimed the response, dropping it");
            }
        }
        self.rearm_retry_timer();
    }

    /// Hand out the next 8-bit identifier. A stale entry still holding it
    /// is purged so the old request cannot swallow the new reply.
    fn allocate_identifier(&mut self) -> u8 {
        let id = self.next_identifier;
        self.next_identifier = self.next_identifier.wrapping_add(1);
        let purged = self.ledger.purge_identifier(id);
        if purged > 0 {
            debug!(id, count = purged, "Purged stale requests holding a reused identifier");
            self.rearm_retry_timer();
        }
        id
    }

    /// Schedule the next scan at the earliest deadline over all entries
    fn rearm_retry_timer(&mut self) {
        self.retry_deadline = self.ledger.next_deadline();
    }

    fn first_wait(&self) -> Duration {
        Duration::from_secs(self.config.retry.first_wait)
    }

    fn max_wait(&self) -> Duration {
        Duration::from_secs(self.config.retry.max_wait)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerConfig;

    const STATION: StationId = StationId([0x02, 0x00, 0x00, 0x00, 0x00, 0x01]);

    fn create_test_config(addresses: &[&str]) -> ClientConfig {
        ClientConfig {
            auth_servers: addresses
                .iter()
                .map(|a| ServerConfig {
                    address: a.to_string(),
                    secret: "test_secret".to_string(),
                    name: None,
                })
                .collect(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_start_rejects_empty_config() {
        let result = RadiusClient::start(ClientConfig::default()).await;
        assert!(matches!(result, Err(ClientError::Configuration(_))));
    }

    #[tokio::test]
    async fn test_identifier_allocation_wraps() {
        let (_tx, rx) = mpsc::unbounded_channel();
        let mut actor = ClientActor::new(create_test_config(&["127.0.0.1:1812"]), rx)
            .await
            .unwrap();

        for expected in 0u8..=255 {
            assert_eq!(actor.allocate_identifier(), expected);
        }
        assert_eq!(actor.allocate_identifier(), 0);
    }

    #[tokio::test]
    async fn test_send_after_shutdown_errors() {
        let client = RadiusClient::start(create_test_config(&["127.0.0.1:1812"]))
            .await
            .unwrap();
        client.shutdown().await.unwrap();

        let message = Packet::new(Code::AccessRequest, 0, [0u8; 16]);
        let result = client.send(message, MessageType::Auth, STATION);
        assert!(matches!(result, Err(ClientError::ShuttingDown)));
    }

    #[tokio::test]
    async fn test_shutdown_twice_is_ok() {
        let client = RadiusClient::start(create_test_config(&["127.0.0.1:1812"]))
            .await
            .unwrap();
        client.shutdown().await.unwrap();
        client.shutdown().await.unwrap();
    }
}
