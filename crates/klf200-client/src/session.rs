//! Session table: correlation state for in-flight requests.
//!
//! Every request occupies exactly one slot, keyed either by its own
//! command id (non-session commands, which therefore allow at most one
//! in-flight instance) or by the 16-bit session id the pipeline
//! allocated. The table also owns the two counters: the local request
//! id (monotonic 32-bit) and the session id (modular 16-bit). One lock
//! around the whole table keeps registration and dispatch serialized,
//! so a confirmation can only be routed after its request is
//! registered.

use std::collections::HashMap;

use klf200_proto::Reply;
use serde::Serialize;
use tokio::sync::oneshot;

use crate::error::ClientError;
use crate::event::RequestInfo;

/// Key of a session-table slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionKey {
    /// Non-session command, keyed by its request command id.
    Cmd(u16),
    /// Session command, keyed by the allocated session id.
    Session(u16),
}

/// Result of a completed request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CommandResult {
    /// The command produced no body.
    None,
    /// A single decoded value.
    One(Reply),
    /// An accumulated notification stream.
    Many(Vec<Reply>),
}

impl CommandResult {
    /// Whether there is nothing to render.
    #[must_use]
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }
}

/// Completion side of a registered request, held by the dispatcher.
#[derive(Debug)]
pub struct SessionEntry {
    /// Request identity for events.
    pub request: RequestInfo,
    /// Whether completion waits for a terminal notification.
    pub stream: bool,
    /// Confirmation handle; consumed when the confirmation arrives.
    pub cfm_tx: Option<oneshot::Sender<std::result::Result<(), ClientError>>>,
    /// Completion handle; consumed when the session finishes.
    pub done_tx: Option<oneshot::Sender<std::result::Result<CommandResult, ClientError>>>,
    /// Accumulated stream notifications.
    pub acc: Vec<Reply>,
}

impl SessionEntry {
    /// Deliver an error on whichever handle the pipeline still awaits.
    pub fn fail(&mut self, error: ClientError) {
        if let Some(tx) = self.cfm_tx.take() {
            let _ = tx.send(Err(error));
            self.done_tx = None;
        } else if let Some(tx) = self.done_tx.take() {
            let _ = tx.send(Err(error));
        }
    }

    /// Deliver a successful completion on both handles.
    pub fn complete(&mut self, result: CommandResult) {
        if let Some(tx) = self.cfm_tx.take() {
            let _ = tx.send(Ok(()));
        }
        if let Some(tx) = self.done_tx.take() {
            let _ = tx.send(Ok(result));
        }
    }
}

/// The table plus its counters. Guarded by one `std::sync::Mutex` in
/// the engine; none of these methods block.
#[derive(Debug, Default)]
pub struct SessionTable {
    entries: HashMap<SessionKey, SessionEntry>,
    last_request_id: u32,
    last_session_id: u16,
    closed: bool,
}

impl SessionTable {
    /// Create an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate the next session id: `(prev + 1) mod 0x10000`.
    pub fn next_session_id(&mut self) -> u16 {
        self.last_session_id = self.last_session_id.wrapping_add(1);
        self.last_session_id
    }

    /// Allocate the next local request id.
    pub fn next_request_id(&mut self) -> u32 {
        self.last_request_id = self.last_request_id.wrapping_add(1);
        self.last_request_id
    }

    /// Seed the session counter (test hook for wrap-around scenarios).
    pub fn seed_session_id(&mut self, value: u16) {
        self.last_session_id = value;
    }

    /// Whether a slot is live.
    #[must_use]
    pub fn contains(&self, key: &SessionKey) -> bool {
        self.entries.contains_key(key)
    }

    /// Number of outstanding requests.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no request is outstanding.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether the connection has been torn down.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Register a request. Fails when the connection is closed;
    /// callers must check [`Self::contains`] first (a live slot means
    /// back off and retry).
    pub fn register(
        &mut self,
        key: SessionKey,
        entry: SessionEntry,
    ) -> std::result::Result<(), ClientError> {
        if self.closed {
            return Err(ClientError::Disconnected);
        }
        debug_assert!(!self.entries.contains_key(&key));
        self.entries.insert(key, entry);
        Ok(())
    }

    /// Borrow a live slot.
    pub fn get_mut(&mut self, key: &SessionKey) -> Option<&mut SessionEntry> {
        self.entries.get_mut(key)
    }

    /// Remove a slot.
    pub fn remove(&mut self, key: &SessionKey) -> Option<SessionEntry> {
        self.entries.remove(key)
    }

    /// Remove a slot only if it still belongs to `request_id` (timeout
    /// path; guards against a slot reused by a later request).
    pub fn remove_if_request(&mut self, key: &SessionKey, request_id: u32) -> Option<SessionEntry> {
        if self.entries.get(key).is_some_and(|entry| entry.request.id == request_id) {
            self.entries.remove(key)
        } else {
            None
        }
    }

    /// The attribution target for an unaddressed gateway error: the
    /// sole outstanding request, if there is exactly one.
    pub fn sole_entry_key(&self) -> Option<SessionKey> {
        if self.entries.len() == 1 {
            self.entries.keys().next().copied()
        } else {
            None
        }
    }

    /// Mark the table closed and drain every outstanding request.
    pub fn close(&mut self) -> Vec<(SessionKey, SessionEntry)> {
        self.closed = true;
        self.entries.drain().collect()
    }
}
