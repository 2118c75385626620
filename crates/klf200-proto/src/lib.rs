//! Wire protocol for the VELUX KLF 200 gateway.
//!
//! The gateway speaks a framed binary protocol over TLS: every logical
//! frame is SLIP-delimited ([`slip`]), carries a 16-bit command id and
//! an XOR checksum ([`frame`]), and belongs to a command catalogued in
//! the static [`registry`]. The [`payload`] module holds the typed
//! encoders and decoders for the command subset a client exercises,
//! and [`position`] the 16-bit position code shared by the movement
//! commands.
//!
//! This crate is pure: no I/O, no async, no connection state. The
//! session and dispatch machinery lives in `klf200-client`.

pub mod error;
pub mod frame;
pub mod payload;
pub mod position;
pub mod registry;
pub mod slip;

pub use error::{GatewayError, ProtoError};
pub use frame::{ChecksumCheck, DecodedFrame, Frame, MAX_PAYLOAD};
pub use payload::Reply;
pub use position::{Position, Velocity};
pub use registry::{CommandSpec, Role};
