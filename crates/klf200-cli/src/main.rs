//! `velux` — command-line client for the KLF 200 gateway.
//!
//! ```text
//! velux [-hVD] [-H host[:port]] [-P password] [-t timeout] (info | <COMMAND> [<JSON-params>])
//! ```
//!
//! `<COMMAND>` is a registry name with the `GW_` prefix and `_REQ`
//! suffix stripped (`GET_PROTOCOL_VERSION`, `STATUS_REQUEST`, …).
//! Results print as pretty JSON; commands without a response body print
//! nothing. Exit code 0 on success, 1 on a protocol or command
//! failure, 2 on usage errors.

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use klf200_client::{Config, Connection, Event};
use serde_json::Value;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line client for the KLF 200 gateway
#[derive(Parser, Debug)]
#[command(name = "velux")]
#[command(about = "Talk to a VELUX KLF 200 gateway over its TLS API")]
#[command(version)]
struct Args {
    /// Gateway host, as host or host:port
    #[arg(short = 'H', long, env = "VELUX_HOST")]
    host: Option<String>,

    /// Gateway password (printed on the unit's label unless changed)
    #[arg(short = 'P', long, env = "VELUX_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Seconds to wait for a command to finish
    #[arg(short = 't', long, default_value_t = 60)]
    timeout: u64,

    /// Increase verbosity (repeat: log, debug, verbose, very verbose)
    #[arg(short = 'D', action = clap::ArgAction::Count)]
    debug: u8,

    /// `info` or a command name without the GW_ prefix / _REQ suffix
    command: String,

    /// JSON parameters for the command
    params: Option<String>,
}

/// Split `host[:port]`, falling back to the default port.
fn parse_host(value: &str) -> Result<(String, u16), String> {
    match value.rsplit_once(':') {
        None => Ok((value.to_owned(), klf200_client::DEFAULT_PORT)),
        Some((host, port)) => {
            let port = port.parse().map_err(|_| format!("bad port in {value:?}"))?;
            Ok((host.to_owned(), port))
        }
    }
}

/// Map a CLI command word onto its registry name.
fn registry_name(command: &str) -> String {
    format!("GW_{}_REQ", command.to_uppercase())
}

fn init_tracing(debug: u8) {
    let filter = match debug {
        0 => "warn",
        1 => "klf200_client=info,velux=info,warn",
        2 => "klf200_client=debug,velux=debug,warn",
        _ => "trace",
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Forward connection events into the log at an appropriate level.
fn spawn_event_logger(connection: &Connection) {
    let mut events = connection.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match event {
                Event::Send { bytes } => {
                    tracing::trace!(bytes = %hex_dump(&bytes), "-> wire");
                }
                Event::Data { bytes } => {
                    tracing::trace!(bytes = %hex_dump(&bytes), "<- wire");
                }
                Event::Request { request } => {
                    tracing::debug!(name = request.name, id = request.id, "request");
                }
                Event::Response { request, .. } => {
                    tracing::debug!(name = request.name, id = request.id, "response");
                }
                Event::Notification(notification) => {
                    tracing::debug!(name = notification.name, "notification");
                }
                Event::Error { message, .. } => tracing::warn!(%message, "gateway error"),
                _ => {}
            }
        }
    });
}

fn hex_dump(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect::<Vec<_>>().join(" ")
}

fn print_result(value: &Value) {
    if !value.is_null() {
        match serde_json::to_string_pretty(value) {
            Ok(rendered) => println!("{rendered}"),
            Err(error) => eprintln!("velux: render failed: {error}"),
        }
    }
}

/// The aggregate `info` command: version, protocol, state, connection
/// metadata.
async fn run_info(connection: &Connection) -> Result<Value, klf200_client::ClientError> {
    let version = connection.try_request("GW_GET_VERSION_REQ", Value::Null).await?;
    let protocol = connection.try_request("GW_GET_PROTOCOL_VERSION_REQ", Value::Null).await?;
    let state = connection.try_request("GW_GET_STATE_REQ", Value::Null).await?;

    Ok(serde_json::json!({
        "address": connection.peer().map(|peer| peer.to_string()),
        "fingerprint": connection.fingerprint(),
        "version": version,
        "protocolVersion": protocol,
        "state": state,
    }))
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(args.debug);

    let Some(host) = args.host else {
        eprintln!("velux: no host given (use -H or VELUX_HOST)");
        return ExitCode::from(2);
    };
    let Some(password) = args.password else {
        eprintln!("velux: no password given (use -P or VELUX_PASSWORD)");
        return ExitCode::from(2);
    };
    let (host, port) = match parse_host(&host) {
        Ok(parsed) => parsed,
        Err(message) => {
            eprintln!("velux: {message}");
            return ExitCode::from(2);
        }
    };

    let params: Value = match &args.params {
        None => Value::Null,
        Some(text) => match serde_json::from_str(text) {
            Ok(value) => value,
            Err(error) => {
                eprintln!("velux: parameters are not valid JSON: {error}");
                return ExitCode::from(2);
            }
        },
    };

    if args.command != "info"
        && klf200_proto::registry::request_by_name(&registry_name(&args.command)).is_err()
    {
        eprintln!("velux: unknown command {:?}", args.command);
        return ExitCode::from(2);
    }

    let config = Config::new(host, password)
        .port(port)
        .session_timeout(Duration::from_secs(args.timeout));

    let connection = match Connection::connect(config).await {
        Ok(connection) => connection,
        Err(error) => {
            eprintln!("velux: connect failed: {error}");
            return ExitCode::FAILURE;
        }
    };
    if args.debug > 0 {
        spawn_event_logger(&connection);
    }

    let outcome = if args.command == "info" {
        run_info(&connection).await
    } else {
        connection
            .try_request(&registry_name(&args.command), params)
            .await
            .map(|result| serde_json::to_value(&result).unwrap_or(Value::Null))
    };

    let code = match outcome {
        Ok(value) => {
            print_result(&value);
            ExitCode::SUCCESS
        }
        Err(error) => {
            eprintln!("velux: {error}");
            ExitCode::FAILURE
        }
    };

    connection.disconnect().await;
    code
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_parsing() {
        assert_eq!(
            parse_host("gateway.local").unwrap(),
            ("gateway.local".to_owned(), klf200_client::DEFAULT_PORT)
        );
        assert_eq!(
            parse_host("10.0.0.5:4433").unwrap(),
            ("10.0.0.5".to_owned(), 4433)
        );
        assert!(parse_host("host:notaport").is_err());
    }

    #[test]
    fn command_name_mapping() {
        assert_eq!(registry_name("GET_PROTOCOL_VERSION"), "GW_GET_PROTOCOL_VERSION_REQ");
        assert_eq!(registry_name("status_request"), "GW_STATUS_REQUEST_REQ");
    }
}
