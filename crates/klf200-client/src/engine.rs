//! The dispatch engine: single consumer of inbound frames.
//!
//! A spawned reader task owns the transport's read half, feeds the SLIP
//! splitter, and hands every complete frame to [`Engine::handle_frame`].
//! Dispatch looks the command up in the registry, resolves the owning
//! session slot (by session id or by request command id), decodes the
//! payload, and drives the slot's completion handles. The table lock is
//! held for the whole lookup-decode-complete step, so a confirmation
//! can never overtake the registration of its request.

use std::net::SocketAddr;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use klf200_proto::payload::{self, gateway};
use klf200_proto::registry::{self, ids};
use klf200_proto::{frame::ChecksumCheck, frame::Frame, slip, ProtoError, Reply, Role};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite};
use tokio::sync::broadcast;

use crate::error::ClientError;
use crate::event::{Event, NotificationEvent, RequestInfo};
use crate::session::{CommandResult, SessionKey, SessionTable};

/// Read buffer granularity.
const READ_CHUNK: usize = 4096;

/// Capacity of the event broadcast channel.
const EVENT_CAPACITY: usize = 64;

/// Boxed write half of the transport.
pub(crate) type Writer = Box<dyn AsyncWrite + Send + Unpin>;

/// Boxed read half of the transport.
pub(crate) type Reader = Box<dyn AsyncRead + Send + Unpin>;

/// Shared engine state: session table, write half, event channel.
pub(crate) struct Engine {
    /// Session table plus counters, one lock for the whole
    /// register/dispatch critical section.
    table: Mutex<SessionTable>,
    /// Write half; `None` once the connection is torn down. Doubles as
    /// the send mutex: whoever holds the lock is the one writer.
    pub(crate) writer: tokio::sync::Mutex<Option<Writer>>,
    events: broadcast::Sender<Event>,
    /// Peer address for lifecycle events.
    pub(crate) peer: Option<SocketAddr>,
    pub(crate) confirmation_timeout: Duration,
    pub(crate) session_timeout: Duration,
    strict_checksum: bool,
}

impl Engine {
    pub(crate) fn new(
        writer: Writer,
        peer: Option<SocketAddr>,
        confirmation_timeout: Duration,
        session_timeout: Duration,
        strict_checksum: bool,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            table: Mutex::new(SessionTable::new()),
            writer: tokio::sync::Mutex::new(Some(writer)),
            events,
            peer,
            confirmation_timeout,
            session_timeout,
            strict_checksum,
        }
    }

    /// Lock the session table, recovering from a poisoned lock (no
    /// invariant outlives a panicking holder here).
    pub(crate) fn table(&self) -> MutexGuard<'_, SessionTable> {
        self.table.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Subscribe to the event surface.
    pub(crate) fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.events.subscribe()
    }

    /// Emit an event; observers that lag or unsubscribe are ignored.
    pub(crate) fn emit(&self, event: Event) {
        let _ = self.events.send(event);
    }

    /// Process one raw SLIP frame from the wire.
    pub(crate) fn handle_frame(&self, raw: &[u8]) {
        let decoded = match slip::decode(raw).and_then(|bytes| Frame::decode(&bytes)) {
            Ok(decoded) => decoded,
            Err(error) => {
                tracing::warn!(%error, "dropping malformed frame");
                self.emit(Event::Error { message: error.to_string(), request: None });
                return;
            }
        };

        if let ChecksumCheck::Mismatch { computed, found } = decoded.checksum {
            let error = ProtoError::ChecksumMismatch { computed, found };
            if self.strict_checksum {
                self.emit(Event::Error { message: error.to_string(), request: None });
                return;
            }
            // Deployed gateways get this wrong; keep the frame.
            tracing::warn!(%error, command = decoded.frame.command, "tolerating checksum mismatch");
        }

        let frame = decoded.frame;
        let Some(spec) = registry::by_id(frame.command) else {
            let error = ProtoError::UnknownCommand(frame.command);
            tracing::debug!(%error, "dropping frame");
            self.emit(Event::Error { message: error.to_string(), request: None });
            return;
        };

        if spec.role == Role::Request {
            let error = ProtoError::UnexpectedRole(spec.name);
            self.emit(Event::Error { message: error.to_string(), request: None });
            return;
        }

        tracing::trace!(name = spec.name, len = frame.payload.len(), "frame received");

        if spec.id == ids::GW_ERROR_NTF {
            self.handle_error_ntf(&frame.payload);
            return;
        }

        let session_id = match payload::session_id(spec, &frame.payload) {
            Ok(session_id) => session_id,
            Err(error) => {
                self.emit(Event::Error { message: error.to_string(), request: None });
                return;
            }
        };
        let key = match (session_id, spec.req) {
            (Some(id), _) => Some(SessionKey::Session(id)),
            (None, Some(req_id)) => Some(SessionKey::Cmd(req_id)),
            (None, None) => None,
        };

        let reply = match payload::decode_reply(spec, &frame.payload) {
            Ok(reply) => reply,
            Err(error) => {
                self.fail_key(key, &error);
                return;
            }
        };

        let request = self.route(spec.role, spec.terminator, key, reply.clone());

        self.emit(Event::Notification(NotificationEvent {
            command: spec.id,
            name: spec.name,
            bytes: frame.payload,
            payload: reply,
            request,
        }));
    }

    /// Route a decoded frame into its session slot. Returns the
    /// request the frame belonged to, if one was found.
    fn route(
        &self,
        role: Role,
        terminator: bool,
        key: Option<SessionKey>,
        reply: Option<Reply>,
    ) -> Option<RequestInfo> {
        let key = key?;
        let mut table = self.table();
        let entry = table.get_mut(&key)?;
        let request = entry.request.clone();

        let completion = match role {
            Role::Confirmation if entry.stream => {
                if let Some(tx) = entry.cfm_tx.take() {
                    let _ = tx.send(Ok(()));
                }
                None
            }
            Role::Confirmation => Some(match reply {
                Some(reply) if !reply.is_empty() => CommandResult::One(reply),
                _ => CommandResult::None,
            }),
            Role::Notification => {
                let finishes =
                    terminator || reply.as_ref().is_some_and(Reply::finishes_stream);
                if let Some(reply) = reply.clone() {
                    if !reply.is_empty() {
                        entry.acc.extend(reply.into_items());
                    }
                }
                if finishes {
                    let acc = std::mem::take(&mut entry.acc);
                    Some(stream_result(terminator, acc, reply.as_ref()))
                } else {
                    None
                }
            }
            Role::Request => None,
        };

        if let Some(result) = completion {
            if let Some(mut entry) = table.remove(&key) {
                entry.complete(result);
            }
        }
        Some(request)
    }

    /// `GW_ERROR_NTF`: surface the gateway status, attributing (and
    /// failing) the sole in-flight request when the table holds exactly
    /// one.
    fn handle_error_ntf(&self, payload: &[u8]) {
        let gateway_error = match gateway::decode_error_ntf(payload) {
            Ok(error) => error,
            Err(error) => {
                self.emit(Event::Error { message: error.to_string(), request: None });
                return;
            }
        };
        let error = ProtoError::Gateway(gateway_error);
        tracing::debug!(%error, "gateway error notification");

        let request = {
            let mut table = self.table();
            table
                .sole_entry_key()
                .and_then(|key| table.remove(&key))
                .map(|mut entry| {
                    entry.fail(ClientError::Proto(error.clone()));
                    entry.request
                })
        };
        self.emit(Event::Error { message: error.to_string(), request });
    }

    /// Fail the session owning `key` with a decode/domain error.
    fn fail_key(&self, key: Option<SessionKey>, error: &ProtoError) {
        let request = key.and_then(|key| self.table().remove(&key)).map(|mut entry| {
            entry.fail(ClientError::Proto(error.clone()));
            entry.request
        });
        self.emit(Event::Error { message: error.to_string(), request });
    }

    /// Fail a session from the pipeline's timeout path.
    pub(crate) fn expire(&self, key: SessionKey, request_id: u32, error: &ClientError) {
        let request = self
            .table()
            .remove_if_request(&key, request_id)
            .map(|entry| entry.request);
        if let Some(request) = request {
            tracing::debug!(name = request.name, %error, "request expired");
            self.emit(Event::Error { message: error.to_string(), request: Some(request) });
        }
    }

    /// Tear the connection down: close the table, fail everything
    /// outstanding, drop the write half, emit `Disconnected`. Safe to
    /// call more than once.
    pub(crate) async fn shutdown(&self) {
        let drained = {
            let mut table = self.table();
            if table.is_closed() {
                return;
            }
            table.close()
        };
        for (_, mut entry) in drained {
            let request = entry.request.clone();
            entry.fail(ClientError::Disconnected);
            self.emit(Event::Error {
                message: ClientError::Disconnected.to_string(),
                request: Some(request),
            });
        }
        *self.writer.lock().await = None;
        self.emit(Event::Disconnected { peer: self.peer });
        tracing::debug!(peer = ?self.peer, "connection closed");
    }

}

/// Build the result of a finished notification stream.
///
/// A terminator that itself carries a record (node and group
/// information queries answer with exactly one terminal notification)
/// yields that record; everything else yields the accumulated list, or
/// nothing when the stream stayed empty.
fn stream_result(terminator: bool, acc: Vec<Reply>, terminal: Option<&Reply>) -> CommandResult {
    if terminator {
        if let Some(reply) = terminal.filter(|reply| !reply.is_empty()) {
            return CommandResult::One(reply.clone());
        }
    }
    if acc.is_empty() {
        CommandResult::None
    } else {
        CommandResult::Many(acc)
    }
}

/// Reader task: pull bytes until EOF or error, then tear down.
pub(crate) async fn run_reader(engine: std::sync::Arc<Engine>, mut read: Reader) {
    let mut splitter = slip::Splitter::new();
    let mut buf = BytesMut::with_capacity(READ_CHUNK);
    loop {
        match read.read_buf(&mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                let chunk: Bytes = buf.split().freeze();
                engine.emit(Event::Data { bytes: chunk.clone() });
                for raw in splitter.push(&chunk) {
                    engine.handle_frame(&raw);
                }
            }
            Err(error) => {
                tracing::debug!(%error, "transport read failed");
                engine.emit(Event::Error { message: format!("read failed: {error}"), request: None });
                break;
            }
        }
    }
    engine.shutdown().await;
}
