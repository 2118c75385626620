//! Session engine and transport for the VELUX KLF 200 gateway.
//!
//! The gateway multiplexes three logical flows over one TLS byte
//! stream: confirmations, per-session notifications, and broadcast
//! notifications. This crate owns the demultiplexing: the
//! [`Connection`] serializes outbound requests, a reader task feeds
//! every inbound frame through the dispatcher, and a session table
//! correlates replies back to the request that caused them.
//!
//! ```no_run
//! use klf200_client::{Config, Connection};
//!
//! # async fn run() -> Result<(), klf200_client::ClientError> {
//! let config = Config::new("192.168.1.30", "velux123");
//! let connection = Connection::connect(config).await?;
//! let version = connection
//!     .try_request("GW_GET_PROTOCOL_VERSION_REQ", serde_json::Value::Null)
//!     .await?;
//! println!("{}", serde_json::to_string_pretty(&version).unwrap_or_default());
//! # Ok(())
//! # }
//! ```

mod config;
mod connection;
mod engine;
mod error;
mod event;
mod session;
mod transport;

pub use config::{Config, DEFAULT_PORT};
pub use connection::Connection;
pub use error::{ClientError, Result};
pub use event::{Event, NotificationEvent, RequestInfo};
pub use session::CommandResult;
