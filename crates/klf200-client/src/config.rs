//! Connection configuration.

use std::time::Duration;

/// Default TLS port of the gateway.
pub const DEFAULT_PORT: u16 = 51200;

/// How long to wait for a confirmation frame.
pub const CONFIRMATION_TIMEOUT: Duration = Duration::from_secs(5);

/// How long to wait for a notification stream to finish.
pub const SESSION_TIMEOUT: Duration = Duration::from_secs(60);

/// Settings for one gateway connection.
#[derive(Debug, Clone)]
pub struct Config {
    /// Gateway host name or address.
    pub host: String,
    /// Gateway TLS port.
    pub port: u16,
    /// Gateway password (the value printed on the unit's label unless
    /// changed).
    pub password: String,
    /// Confirmation timeout.
    pub confirmation_timeout: Duration,
    /// Stream completion timeout.
    pub session_timeout: Duration,
    /// Reject frames whose checksum does not verify instead of
    /// tolerating them with a warning.
    pub strict_checksum: bool,
}

impl Config {
    /// Configuration for `host` with the given password and default
    /// port and timeouts.
    pub fn new(host: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: DEFAULT_PORT,
            password: password.into(),
            confirmation_timeout: CONFIRMATION_TIMEOUT,
            session_timeout: SESSION_TIMEOUT,
            strict_checksum: false,
        }
    }

    /// Override the TLS port.
    #[must_use]
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Override both timeouts. The confirmation timeout keeps its
    /// default unless the stream timeout is shorter.
    #[must_use]
    pub fn session_timeout(mut self, timeout: Duration) -> Self {
        self.session_timeout = timeout;
        if timeout < self.confirmation_timeout {
            self.confirmation_timeout = timeout;
        }
        self
    }

    /// Override the confirmation timeout.
    #[must_use]
    pub fn confirmation_timeout(mut self, timeout: Duration) -> Self {
        self.confirmation_timeout = timeout;
        self
    }

    /// Enable strict checksum checking.
    #[must_use]
    pub fn strict_checksum(mut self, strict: bool) -> Self {
        self.strict_checksum = strict;
        self
    }
}
