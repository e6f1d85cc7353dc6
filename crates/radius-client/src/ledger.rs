//! Pending request store
//!
//! Every request handed to the client stays here, together with its frozen
//! wire bytes and retry state, until a response arrives, it is flushed, or
//! its transmission attempts run out. The store is bounded: when it is full
//! the oldest entry is shed to make room for the newest.
//!
//! Entries live in a slot arena and are addressed three ways: by insertion
//! order (newest first) for retry scans and shedding, by (server role,
//! identifier) for response correlation, and by handle for mutation during
//! a scan.

use radius_proto::Packet;
use std::collections::{HashMap, VecDeque};
use std::fmt;
use tokio::time::{Duration, Instant};
use tracing::{debug, info};

/// MAC address of the station a request concerns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StationId(pub [u8; 6]);

impl StationId {
    pub const fn new(octets: [u8; 6]) -> Self {
        StationId(octets)
    }
}

impl fmt::Display for StationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let o = self.0;
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            o[0], o[1], o[2], o[3], o[4], o[5]
        )
    }
}

/// Which server role a request belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServerRole {
    Auth,
    Acct,
}

impl fmt::Display for ServerRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServerRole::Auth => write!(f, "authentication"),
            ServerRole::Acct => write!(f, "accounting"),
        }
    }
}

/// Kind of request being tracked
///
/// Interim accounting updates are a distinct kind so that a newer update can
/// displace an older pending one for the same station, but they share the
/// accounting socket and identifier space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageType {
    /// Access-Request on the authentication socket
    Auth,
    /// Accounting-Request (start, stop, on, off)
    Acct,
    /// Accounting-Request carrying an Interim-Update
    AcctInterim,
}

impl MessageType {
    /// The server role this kind of request is sent to
    pub fn class(self) -> ServerRole {
        match self {
            MessageType::Auth => ServerRole::Auth,
            MessageType::Acct | MessageType::AcctInterim => ServerRole::Acct,
        }
    }
}

/// One un-ACKed request and its retry state
#[derive(Debug)]
pub(crate) struct PendingRequest {
    /// The request as built by the caller (plus finalization attributes)
    pub message: Packet,
    /// Frozen wire bytes; retransmissions resend these verbatim
    pub wire: Vec<u8>,
    /// Kind of request
    pub message_type: MessageType,
    /// Station this request concerns
    pub station: StationId,
    /// Secret of the server the request was finalized for
    pub shared_secret: Vec<u8>,
    /// When the request was first transmitted
    pub first_sent_at: Instant,
    /// When the request was last transmitted
    pub last_sent_at: Instant,
    /// When the next retransmission is due
    pub next_retry_at: Instant,
    /// Interval to schedule after the next retransmission
    pub next_backoff: Duration,
    /// Transmissions so far
    pub attempts: u8,
}

impl PendingRequest {
    pub(crate) fn new(
        message: Packet,
        wire: Vec<u8>,
        message_type: MessageType,
        station: StationId,
        shared_secret: Vec<u8>,
        now: Instant,
        first_wait: Duration,
    ) -> Self {
        PendingRequest {
            message,
            wire,
            message_type,
            station,
            shared_secret,
            first_sent_at: now,
            last_sent_at: now,
            next_retry_at: now + first_wait,
            next_backoff: first_wait * 2,
            attempts: 1,
        }
    }
}

/// Handle to an arena slot
///
/// Only valid across a single retry scan: a slot freed mid-scan reads back
/// as vacant, and no inserts happen while a scan holds handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct EntryHandle(usize);

/// Bounded store of pending requests
pub(crate) struct Ledger {
    slots: Vec<Option<PendingRequest>>,
    free: Vec<usize>,
    /// Slot indices, newest first
    order: VecDeque<usize>,
    /// (role, identifier) to slot
    index: HashMap<(ServerRole, u8), usize>,
    max_entries: usize,
    shutting_down: bool,
}

impl Ledger {
    pub(crate) fn new(max_entries: usize) -> Self {
        Ledger {
            slots: Vec::new(),
            free: Vec::new(),
            order: VecDeque::new(),
            index: HashMap::new(),
            max_entries,
            shutting_down: false,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.order.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Track a new request. Returns None once shutdown has begun.
    pub(crate) fn insert(&mut self, entry: PendingRequest) -> Option<EntryHandle> {
        if self.shutting_down {
            debug!("Client is shutting down, dropping new request");
            return None;
        }

        // An identifier maps to at most one entry per role; a newer request
        // with a recycled identifier displaces the stale holder.
        let key = (entry.message_type.class(), entry.message.identifier);
        if let Some(&stale) = self.index.get(&key) {
            debug!(
                id = entry.message.identifier,
                role = %key.0,
                "Replacing pending request with recycled identifier"
            );
            self.remove_slot(stale);
        }

        if self.order.len() >= self.max_entries
            && let Some(&oldest) = self.order.back()
        {
            info!("Removing oldest un-ACKed request, pending list is full");
            self.remove_slot(oldest);
        }

        let slot = match self.free.pop() {
            Some(slot) => {
                self.slots[slot] = Some(entry);
                slot
            }
            None => {
                self.slots.push(Some(entry));
                self.slots.len() - 1
            }
        };
        self.order.push_front(slot);
        self.index.insert(key, slot);
        Some(EntryHandle(slot))
    }

    /// Remove and return the entry a response correlates with
    pub(crate) fn take_matching(&mut self, role: ServerRole, identifier: u8) -> Option<PendingRequest> {
        let slot = *self.index.get(&(role, identifier))?;
        self.remove_slot(slot)
    }

    /// Remove all entries with exactly this message type and station.
    /// Returns the number removed.
    pub(crate) fn remove_matching(&mut self, message_type: MessageType, station: StationId) -> usize {
        let matching: Vec<usize> = self
            .order
            .iter()
            .copied()
            .filter(|&slot| {
                self.slots[slot]
                    .as_ref()
                    .is_some_and(|e| e.message_type == message_type && e.station == station)
            })
            .collect();
        for slot in &matching {
            self.remove_slot(*slot);
        }
        matching.len()
    }

    /// Remove all entries using this identifier, regardless of role.
    /// Returns the number removed.
    pub(crate) fn purge_identifier(&mut self, identifier: u8) -> usize {
        let matching: Vec<usize> = self
            .order
            .iter()
            .copied()
            .filter(|&slot| {
                self.slots[slot]
                    .as_ref()
                    .is_some_and(|e| e.message.identifier == identifier)
            })
            .collect();
        for slot in &matching {
            self.remove_slot(*slot);
        }
        matching.len()
    }

    /// Drop every entry. Returns the number removed.
    pub(crate) fn flush_all(&mut self) -> usize {
        let removed = self.order.len();
        self.slots.clear();
        self.free.clear();
        self.order.clear();
        self.index.clear();
        removed
    }

    /// Rewind retry state of every entry so it retransmits promptly on a
    /// fresh server: attempts cleared, schedule restarted from first send
    pub(crate) fn reset_backoff(&mut self, first_wait: Duration) {
        for slot in &self.order {
            if let Some(entry) = self.slots[*slot].as_mut() {
                entry.attempts = 0;
                entry.next_retry_at = entry.first_sent_at + first_wait;
                entry.next_backoff = first_wait * 2;
            }
        }
    }

    /// Earliest scheduled retransmission over all entries
    pub(crate) fn next_deadline(&self) -> Option<Instant> {
        self.iter().map(|e| e.next_retry_at).min()
    }

    /// Handles of entries due at `now`, newest first
    pub(crate) fn due_handles(&self, now: Instant) -> Vec<EntryHandle> {
        self.order
            .iter()
            .copied()
            .filter(|&slot| {
                self.slots[slot]
                    .as_ref()
                    .is_some_and(|e| e.next_retry_at <= now)
            })
            .map(EntryHandle)
            .collect()
    }

    pub(crate) fn get(&self, handle: EntryHandle) -> Option<&PendingRequest> {
        self.slots.get(handle.0).and_then(|s| s.as_ref())
    }

    pub(crate) fn get_mut(&mut self, handle: EntryHandle) -> Option<&mut PendingRequest> {
        self.slots.get_mut(handle.0).and_then(|s| s.as_mut())
    }

    pub(crate) fn remove(&mut self, handle: EntryHandle) -> Option<PendingRequest> {
        self.remove_slot(handle.0)
    }

    /// Entries pending for one server role
    pub(crate) fn pending_for_role(&self, role: ServerRole) -> usize {
        self.iter()
            .filter(|e| e.message_type.class() == role)
            .count()
    }

    /// All entries, newest first
    pub(crate) fn iter(&self) -> impl Iterator<Item = &PendingRequest> {
        self.order
            .iter()
            .filter_map(|&slot| self.slots[slot].as_ref())
    }

    /// Stop accepting new entries
    pub(crate) fn begin_shutdown(&mut self) {
        self.shutting_down = true;
    }

    fn remove_slot(&mut self, slot: usize) -> Option<PendingRequest> {
        let entry = self.slots.get_mut(slot)?.take()?;
        let key = (entry.message_type.class(), entry.message.identifier);
        if self.index.get(&key) == Some(&slot) {
            self.index.remove(&key);
        }
        self.order.retain(|&s| s != slot);
        self.free.push(slot);
        Some(entry)
    }
}
