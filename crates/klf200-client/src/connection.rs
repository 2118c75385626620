//! Connection lifecycle and the request pipeline.
//!
//! A [`Connection`] owns the engine and the spawned reader task. The
//! lifecycle is `connect` (TLS + password handshake) → requests →
//! `disconnect`; a transport close or fatal protocol error tears the
//! connection down from the reader side and fails everything
//! outstanding.
//!
//! The request pipeline serializes writers (one outbound frame at a
//! time), enforces at most one in-flight instance per non-session
//! command by cooperative backoff on the session slot, and correlates
//! replies through the session table.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use klf200_proto::payload;
use klf200_proto::registry;
use klf200_proto::{frame::Frame, slip, ProtoError};
use serde_json::{json, Value};
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::sync::{broadcast, oneshot};
use tokio::task::AbortHandle;

use crate::config::Config;
use crate::engine::{self, Engine};
use crate::error::{ClientError, Result};
use crate::event::{Event, RequestInfo};
use crate::session::{CommandResult, SessionEntry, SessionKey};
use crate::transport;

/// Cooperative backoff while a same-key session slot is live.
const SLOT_BACKOFF: Duration = Duration::from_millis(100);

/// An authenticated gateway connection.
pub struct Connection {
    engine: Arc<Engine>,
    reader: AbortHandle,
    fingerprint: Option<String>,
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("fingerprint", &self.fingerprint)
            .finish_non_exhaustive()
    }
}

impl Connection {
    /// Connect to the gateway over TLS and authenticate.
    ///
    /// Fatal errors (authentication failure, transport close before
    /// authentication) propagate; the connection is torn down.
    pub async fn connect(config: Config) -> Result<Self> {
        tracing::debug!(host = %config.host, port = config.port, "connecting");
        let tls = transport::connect(&config).await?;
        let (read, write) = tokio::io::split(tls.stream);
        Self::open_with(
            Box::new(read),
            Box::new(write),
            config,
            Some(tls.peer),
            tls.fingerprint,
        )
        .await
    }

    /// Run a connection over a caller-supplied byte stream and
    /// authenticate.
    ///
    /// This is the gateway-impersonation seam: tests drive it with one
    /// end of a duplex pipe and a scripted peer on the other.
    pub async fn open<S>(stream: S, config: Config) -> Result<Self>
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let (read, write) = tokio::io::split(stream);
        Self::open_with(Box::new(read), Box::new(write), config, None, None).await
    }

    async fn open_with(
        read: engine::Reader,
        write: engine::Writer,
        config: Config,
        peer: Option<SocketAddr>,
        fingerprint: Option<String>,
    ) -> Result<Self> {
        let engine = Arc::new(Engine::new(
            write,
            peer,
            config.confirmation_timeout,
            config.session_timeout,
            config.strict_checksum,
        ));
        let reader = tokio::spawn(engine::run_reader(Arc::clone(&engine), read)).abort_handle();

        let connection = Self { engine, reader, fingerprint };
        connection.engine.emit(Event::Connecting { host: config.host.clone() });
        connection.engine.emit(Event::Connected {
            peer,
            fingerprint: connection.fingerprint.clone(),
        });

        match connection
            .try_request("GW_PASSWORD_ENTER_REQ", json!({ "password": config.password }))
            .await
        {
            Ok(_) => {
                tracing::debug!("authenticated");
                Ok(connection)
            }
            Err(error) => {
                connection.disconnect().await;
                Err(match error {
                    ClientError::Proto(ProtoError::AuthenticationFailed) => {
                        ClientError::AuthenticationFailed
                    }
                    other => other,
                })
            }
        }
    }

    /// Peer socket address, when the transport reports one.
    #[must_use]
    pub fn peer(&self) -> Option<SocketAddr> {
        self.engine.peer
    }

    /// SHA-256 fingerprint of the gateway's certificate, hex encoded.
    #[must_use]
    pub fn fingerprint(&self) -> Option<&str> {
        self.fingerprint.as_deref()
    }

    /// Subscribe to the event surface.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.engine.subscribe()
    }

    /// Number of requests currently in flight.
    #[must_use]
    pub fn outstanding_requests(&self) -> usize {
        self.engine.table().len()
    }

    /// Issue a request and surface failures only on the event channel.
    ///
    /// Per-command errors do not end the connection; this entry point
    /// mirrors that by returning `None` and leaving the error to
    /// [`Event::Error`] observers. Use [`Connection::try_request`] when
    /// the caller wants the error value itself.
    pub async fn request(&self, name: &str, params: Value) -> Option<CommandResult> {
        match self.try_request(name, params).await {
            Ok(result) => Some(result),
            Err(error) => {
                tracing::debug!(name, %error, "request failed");
                None
            }
        }
    }

    /// Issue a request and return its result or error.
    pub async fn try_request(&self, name: &str, params: Value) -> Result<CommandResult> {
        let spec = match registry::request_by_name(name) {
            Ok(spec) => spec,
            Err(error) => return Err(self.early_failure(None, error.into())),
        };

        // Session commands get a fresh id before encoding; the encoder
        // writes it into the payload.
        let session_id = spec.session.then(|| self.engine.table().next_session_id());

        let wire = match payload::encode_request(spec, &params, session_id)
            .and_then(|bytes| Frame::new(spec.id, bytes))
        {
            Ok(frame) => Bytes::from(slip::encode(&frame.encode())),
            Err(error) => return Err(self.early_failure(None, error.into())),
        };

        // Register the slot, backing off while an earlier request for
        // the same key is still live.
        let key = session_id.map_or(SessionKey::Cmd(spec.id), SessionKey::Session);
        let (request, cfm_rx, done_rx) = loop {
            {
                let mut table = self.engine.table();
                if table.is_closed() {
                    return Err(ClientError::Disconnected);
                }
                if !table.contains(&key) {
                    let request = RequestInfo {
                        id: table.next_request_id(),
                        command: spec.id,
                        name: spec.name,
                        session_id,
                    };
                    let (cfm_tx, cfm_rx) = oneshot::channel();
                    let (done_tx, done_rx) = oneshot::channel();
                    table.register(
                        key,
                        SessionEntry {
                            request: request.clone(),
                            stream: spec.stream,
                            cfm_tx: Some(cfm_tx),
                            done_tx: Some(done_tx),
                            acc: Vec::new(),
                        },
                    )?;
                    break (request, cfm_rx, done_rx);
                }
            }
            tracing::trace!(name = spec.name, "slot busy, backing off");
            tokio::time::sleep(SLOT_BACKOFF).await;
        };

        // Write phase: the writer lock is the send mutex.
        {
            let mut writer = self.engine.writer.lock().await;
            let Some(writer) = writer.as_mut() else {
                self.engine.table().remove(&key);
                return Err(ClientError::Disconnected);
            };
            if let Err(error) = write_frame(writer, &wire).await {
                self.engine.table().remove(&key);
                return Err(self.early_failure(Some(request), error.into()));
            }
            self.engine.emit(Event::Send { bytes: wire });
            self.engine.emit(Event::Request { request: request.clone() });
        }
        tracing::debug!(name = spec.name, id = request.id, session = ?session_id, "request sent");

        // Confirmation, then (for streams) the terminal frame.
        match tokio::time::timeout(self.engine.confirmation_timeout, cfm_rx).await {
            Err(_) => {
                let error = ClientError::ConfirmationTimeout(self.engine.confirmation_timeout);
                self.engine.expire(key, request.id, &error);
                return Err(error);
            }
            Ok(Err(_)) => return Err(ClientError::Disconnected),
            Ok(Ok(Err(error))) => return Err(error),
            Ok(Ok(Ok(()))) => {}
        }

        let result = match tokio::time::timeout(self.engine.session_timeout, done_rx).await {
            Err(_) => {
                let error = ClientError::SessionTimeout(self.engine.session_timeout);
                self.engine.expire(key, request.id, &error);
                return Err(error);
            }
            Ok(Err(_)) => return Err(ClientError::Disconnected),
            Ok(Ok(Err(error))) => return Err(error),
            Ok(Ok(Ok(result))) => result,
        };

        self.engine.emit(Event::Response { request, result: result.clone() });
        Ok(result)
    }

    /// Close the connection. In-flight requests fail with
    /// `Disconnected`.
    pub async fn disconnect(&self) {
        {
            let mut writer = self.engine.writer.lock().await;
            if let Some(writer) = writer.as_mut() {
                let _ = writer.shutdown().await;
            }
        }
        self.engine.shutdown().await;
        self.reader.abort();
    }

    /// Emit an error that never reached the dispatcher, then hand it
    /// back for propagation.
    fn early_failure(&self, request: Option<RequestInfo>, error: ClientError) -> ClientError {
        self.engine.emit(Event::Error { message: error.to_string(), request });
        error
    }

    /// Seed the session-id counter. Test hook for exercising specific
    /// id sequences and wrap-around.
    #[doc(hidden)]
    pub fn seed_session_id(&self, value: u16) {
        self.engine.table().seed_session_id(value);
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.reader.abort();
    }
}

async fn write_frame(writer: &mut engine::Writer, wire: &[u8]) -> std::io::Result<()> {
    writer.write_all(wire).await?;
    writer.flush().await
}
