//! Protocol error types.

use thiserror::Error;

/// Result alias for protocol operations.
pub type Result<T> = std::result::Result<T, ProtoError>;

/// Errors produced by the SLIP codec, the frame codec, the command
/// registry, and the payload encoders/decoders.
///
/// Framing and codec variants indicate a malformed byte stream; the
/// domain variants carry a status the gateway itself reported.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtoError {
    /// SLIP-level framing violation (bad delimiter or escape sequence).
    #[error("SLIP framing error: {0}")]
    Framing(&'static str),

    /// First frame byte is not the KLF 200 protocol identifier (0x00).
    #[error("unknown protocol byte {0:#04x}")]
    UnknownProtocol(u8),

    /// Frame shorter than the fixed header plus checksum.
    #[error("frame too short: {actual} bytes")]
    FrameTooShort {
        /// Bytes actually present.
        actual: usize,
    },

    /// Length field disagrees with the number of bytes on the wire.
    #[error("frame length field {declared} does not match {actual} frame bytes")]
    LengthMismatch {
        /// Value of the length field.
        declared: usize,
        /// Bytes actually present.
        actual: usize,
    },

    /// XOR checksum over the frame body does not match the trailing byte.
    ///
    /// Only raised in strict mode; tolerant decoding reports the mismatch
    /// out of band and keeps the frame.
    #[error("checksum mismatch: computed {computed:#04x}, frame carries {found:#04x}")]
    ChecksumMismatch {
        /// XOR over all bytes before the checksum byte.
        computed: u8,
        /// Checksum byte found on the wire.
        found: u8,
    },

    /// Payload exceeds the 250-byte frame limit.
    #[error("payload too large: {size} bytes (limit 250)")]
    PayloadTooLarge {
        /// Offending payload size.
        size: usize,
    },

    /// Received command id not present in the registry.
    #[error("unknown command id {0:#06x}")]
    UnknownCommand(u16),

    /// Command name not present in the registry.
    #[error("unknown command name {0:?}")]
    UnknownCommandName(String),

    /// Attempt to send a command whose role is not `REQUEST`.
    #[error("{0} is not a request")]
    NotARequest(&'static str),

    /// Inbound frame carries a request command id.
    #[error("inbound frame has request role: {0}")]
    UnexpectedRole(&'static str),

    /// Payload length differs from the decoder's declared size.
    #[error("{name}: payload is {actual} bytes, expected {expected}")]
    PayloadLength {
        /// Command whose decoder rejected the payload.
        name: &'static str,
        /// Size the decoder requires.
        expected: usize,
        /// Size found on the wire.
        actual: usize,
    },

    /// Request parameters failed validation or deserialization.
    #[error("invalid parameters for {name}: {reason}")]
    InvalidParams {
        /// Command being encoded.
        name: &'static str,
        /// Human-readable cause.
        reason: String,
    },

    /// Password rejected during the enter-password exchange. Fatal to
    /// connection bring-up.
    #[error("authentication failed")]
    AuthenticationFailed,

    /// New password rejected by `GW_PASSWORD_CHANGE_REQ`.
    #[error("invalid password")]
    InvalidPassword,

    /// Generic non-zero confirmation status.
    #[error("request failed")]
    RequestFailed,

    /// Node index outside the gateway's system table.
    #[error("invalid node id")]
    InvalidNodeId,

    /// Group index unknown to the gateway.
    #[error("invalid group id")]
    InvalidGroupId,

    /// Gateway has no nodes in its system table.
    #[error("system table empty")]
    EmptySystemTable,

    /// Session command was rejected at the frame level.
    #[error("command rejected by gateway")]
    CommandRejected,

    /// Session id collides with a session the gateway still tracks.
    #[error("session id already in use")]
    SessionInUse,

    /// Group type does not permit the requested operation.
    #[error("invalid group type")]
    InvalidGroupType,

    /// A parameter value was rejected by the gateway.
    #[error("invalid parameter")]
    InvalidParameter,

    /// Asynchronous `GW_ERROR_NTF` status.
    #[error("gateway error: {0}")]
    Gateway(GatewayError),
}

/// Status codes carried by `GW_ERROR_NTF`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayError {
    /// 0 — not further defined.
    NotFurtherDefined,
    /// 1 — command unknown to the gateway.
    UnknownCommand,
    /// 2 — frame structure rejected.
    InvalidFrame,
    /// 7 — gateway busy, retry later.
    Busy,
    /// 8 — bad system table index.
    BadSystemTableIndex,
    /// 12 — command requires authentication.
    NotAuthenticated,
    /// Any code the 3.18 specification does not name.
    Other(u8),
}

impl GatewayError {
    /// Map a wire status byte to its error kind.
    pub fn from_code(code: u8) -> Self {
        match code {
            0 => Self::NotFurtherDefined,
            1 => Self::UnknownCommand,
            2 => Self::InvalidFrame,
            7 => Self::Busy,
            8 => Self::BadSystemTableIndex,
            12 => Self::NotAuthenticated,
            other => Self::Other(other),
        }
    }

    /// The wire status byte for this error.
    pub fn code(self) -> u8 {
        match self {
            Self::NotFurtherDefined => 0,
            Self::UnknownCommand => 1,
            Self::InvalidFrame => 2,
            Self::Busy => 7,
            Self::BadSystemTableIndex => 8,
            Self::NotAuthenticated => 12,
            Self::Other(code) => code,
        }
    }
}

impl std::fmt::Display for GatewayError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFurtherDefined => write!(f, "not further defined"),
            Self::UnknownCommand => write!(f, "unknown command"),
            Self::InvalidFrame => write!(f, "invalid frame structure"),
            Self::Busy => write!(f, "busy"),
            Self::BadSystemTableIndex => write!(f, "bad system table index"),
            Self::NotAuthenticated => write!(f, "not authenticated"),
            Self::Other(code) => write!(f, "status {code}"),
        }
    }
}
