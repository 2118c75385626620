//! Client error type.

use std::time::Duration;

use klf200_proto::ProtoError;
use thiserror::Error;

/// Result alias for client operations.
pub type Result<T> = std::result::Result<T, ClientError>;

/// Errors surfaced by the connection and the request pipeline.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Codec or gateway-reported protocol error.
    #[error("protocol error: {0}")]
    Proto(#[from] ProtoError),

    /// Transport-level I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Host string could not be used as a TLS server name.
    #[error("invalid host name {0:?}")]
    InvalidHost(String),

    /// The connection is closed; outstanding and new requests fail
    /// with this.
    #[error("disconnected")]
    Disconnected,

    /// The gateway rejected the password. Fatal to `connect`.
    #[error("authentication failed")]
    AuthenticationFailed,

    /// No confirmation arrived in time.
    #[error("no confirmation within {0:?}")]
    ConfirmationTimeout(Duration),

    /// The confirmation arrived but the notification stream never
    /// finished.
    #[error("session did not finish within {0:?}")]
    SessionTimeout(Duration),
}

impl ClientError {
    /// Whether this error ends the connection (as opposed to failing a
    /// single request).
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::AuthenticationFailed
                | Self::Disconnected
                | Self::Io(_)
                | Self::Proto(ProtoError::AuthenticationFailed)
        )
    }
}
