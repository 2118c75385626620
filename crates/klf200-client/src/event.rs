//! Observable connection events.
//!
//! Every externally visible side effect of the engine is mirrored onto
//! a broadcast channel: lifecycle transitions, raw bytes in both
//! directions, requests and their outcomes, decoded notifications, and
//! errors attributed to requests. Observers subscribe read-only; the
//! engine never waits for them.

use std::net::SocketAddr;

use bytes::Bytes;
use klf200_proto::Reply;

/// Identity of an in-flight request, attached to events it caused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestInfo {
    /// Local monotonically increasing request id.
    pub id: u32,
    /// Command id of the request.
    pub command: u16,
    /// Command name of the request.
    pub name: &'static str,
    /// Session id, for session-bearing commands.
    pub session_id: Option<u16>,
}

/// A decoded (or raw) inbound confirmation or notification.
#[derive(Debug, Clone)]
pub struct NotificationEvent {
    /// Command id of the frame.
    pub command: u16,
    /// Command name of the frame.
    pub name: &'static str,
    /// Raw payload bytes.
    pub bytes: Bytes,
    /// Decoded payload, when a decoder exists.
    pub payload: Option<Reply>,
    /// The request this frame was routed to, when one was found.
    pub request: Option<RequestInfo>,
}

/// One observable connection event.
#[derive(Debug, Clone)]
pub enum Event {
    /// TLS connect started.
    Connecting {
        /// Host being dialled.
        host: String,
    },
    /// Transport established; the connection is authenticating.
    Connected {
        /// Peer socket address, when the transport reports one.
        peer: Option<SocketAddr>,
        /// SHA-256 fingerprint of the peer certificate, hex encoded.
        fingerprint: Option<String>,
    },
    /// The connection is gone (local disconnect, transport close, or
    /// fatal error).
    Disconnected {
        /// Peer socket address, when the transport reported one.
        peer: Option<SocketAddr>,
    },
    /// Raw bytes written to the transport.
    Send {
        /// The SLIP-encoded frame as written.
        bytes: Bytes,
    },
    /// Raw bytes read from the transport.
    Data {
        /// The chunk as read (may hold partial or multiple frames).
        bytes: Bytes,
    },
    /// A request frame went out on the wire.
    Request {
        /// The request.
        request: RequestInfo,
    },
    /// A request completed.
    Response {
        /// The request.
        request: RequestInfo,
        /// The decoded result.
        result: crate::session::CommandResult,
    },
    /// An inbound confirmation or notification was processed.
    Notification(NotificationEvent),
    /// An error occurred; attributed to a request when one was
    /// involved.
    Error {
        /// Human-readable description.
        message: String,
        /// The request the error is attributed to, if any.
        request: Option<RequestInfo>,
    },
}
