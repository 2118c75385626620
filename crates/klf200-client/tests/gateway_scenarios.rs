//! End-to-end scenarios against a scripted fake gateway.
//!
//! The fake gateway sits on the far end of an in-memory duplex pipe —
//! the same byte-stream seam a real TLS connection uses — and plays
//! back scripted confirmation/notification sequences while asserting
//! on the frames the client writes.

use std::time::Duration;

use klf200_client::{ClientError, CommandResult, Config, Connection, Event};
use klf200_proto::{frame::Frame, slip, GatewayError, ProtoError, Reply};
use serde_json::{json, Value};
use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream};

/// Scripted gateway end of the duplex pipe.
struct FakeGateway {
    stream: DuplexStream,
    splitter: slip::Splitter,
    frames: Vec<Vec<u8>>,
}

impl FakeGateway {
    fn new(stream: DuplexStream) -> Self {
        Self { stream, splitter: slip::Splitter::new(), frames: Vec::new() }
    }

    /// Read the next frame off the wire.
    async fn recv(&mut self) -> Frame {
        loop {
            if !self.frames.is_empty() {
                let raw = self.frames.remove(0);
                let bytes = slip::decode(&raw).expect("client sent valid SLIP");
                let decoded = Frame::decode(&bytes).expect("client sent a valid frame");
                assert!(decoded.checksum_ok(), "client sent a bad checksum");
                return decoded.frame;
            }
            let mut buf = [0u8; 1024];
            let n = self.stream.read(&mut buf).await.expect("gateway read");
            assert!(n > 0, "client closed the stream while a frame was expected");
            self.frames.extend(self.splitter.push(&buf[..n]));
        }
    }

    /// Read a frame and assert its command id.
    async fn expect(&mut self, command: u16) -> Frame {
        let frame = self.recv().await;
        assert_eq!(
            frame.command, command,
            "expected command {command:#06x}, got {:#06x}",
            frame.command
        );
        frame
    }

    /// Assert that no frame arrives within `window`.
    async fn expect_silence(&mut self, window: Duration) {
        assert!(self.frames.is_empty(), "frame already buffered");
        let mut buf = [0u8; 1024];
        let read = tokio::time::timeout(window, self.stream.read(&mut buf)).await;
        assert!(read.is_err(), "client wrote during the silence window");
    }

    /// Send a frame to the client.
    async fn send(&mut self, command: u16, payload: &[u8]) {
        let wire = slip::encode(&Frame::new(command, payload.to_vec()).unwrap().encode());
        self.stream.write_all(&wire).await.expect("gateway write");
    }

    /// Send raw bytes (for malformed-frame scenarios).
    async fn send_raw(&mut self, bytes: &[u8]) {
        self.stream.write_all(bytes).await.expect("gateway write");
    }

    /// Answer the password handshake with the given status.
    async fn answer_password(&mut self, status: u8) -> Frame {
        let frame = self.expect(0x3000).await;
        self.send(0x3001, &[status]).await;
        frame
    }
}

fn test_config(password: &str) -> Config {
    Config::new("gateway.test", password)
        .confirmation_timeout(Duration::from_secs(2))
        .session_timeout(Duration::from_secs(5))
}

/// Connect a client to a fresh fake gateway, completing the password
/// handshake.
async fn connect_pair(config: Config) -> (Connection, FakeGateway) {
    let (client_end, gateway_end) = tokio::io::duplex(4096);
    let mut gateway = FakeGateway::new(gateway_end);
    let connecting = tokio::spawn(Connection::open(client_end, config));
    gateway.answer_password(0).await;
    let connection = connecting.await.expect("join").expect("authentication succeeds");
    (connection, gateway)
}

fn node_record(node_id: u8) -> Vec<u8> {
    let mut payload = vec![0u8; 124];
    payload[0] = node_id;
    payload[4..8].copy_from_slice(b"Node");
    payload
}

fn system_table_ntf(indices: &[u8], remaining: u8) -> Vec<u8> {
    let mut payload = vec![indices.len() as u8];
    for &index in indices {
        let mut entry = [0u8; 11];
        entry[0] = index;
        payload.extend_from_slice(&entry);
    }
    payload.push(remaining);
    payload
}

#[tokio::test]
async fn password_success_sends_the_documented_frame() {
    let (client_end, gateway_end) = tokio::io::duplex(4096);
    let mut gateway = FakeGateway::new(gateway_end);
    let connecting = tokio::spawn(Connection::open(client_end, test_config("abc")));

    let frame = gateway.answer_password(0).await;
    // Payload: "abc" zero-padded to 32 bytes; wire frame 00 23 30 00 …
    assert_eq!(frame.payload.len(), 32);
    assert_eq!(&frame.payload[..3], b"abc");
    assert!(frame.payload[3..].iter().all(|&b| b == 0));
    let wire = frame.encode();
    assert_eq!(&wire[..4], &[0x00, 0x23, 0x30, 0x00]);

    let connection = connecting.await.expect("join").expect("authenticated");
    assert_eq!(connection.outstanding_requests(), 0);
}

#[tokio::test]
async fn password_failure_is_fatal() {
    let (client_end, gateway_end) = tokio::io::duplex(4096);
    let mut gateway = FakeGateway::new(gateway_end);
    let connecting = tokio::spawn(Connection::open(client_end, test_config("wrong")));

    gateway.answer_password(1).await;

    let error = connecting.await.expect("join").expect_err("authentication fails");
    assert!(matches!(error, ClientError::AuthenticationFailed), "{error:?}");
}

#[tokio::test]
async fn transport_close_before_authentication_is_fatal() {
    let (client_end, gateway_end) = tokio::io::duplex(4096);
    let mut gateway = FakeGateway::new(gateway_end);
    let connecting = tokio::spawn(Connection::open(client_end, test_config("abc")));

    gateway.expect(0x3000).await;
    drop(gateway);

    let error = connecting.await.expect("join").expect_err("connect fails");
    assert!(matches!(error, ClientError::Disconnected), "{error:?}");
}

#[tokio::test]
async fn protocol_version_decodes_dotted() {
    let (connection, mut gateway) = connect_pair(test_config("abc")).await;

    let request = tokio::spawn(async move {
        let result = connection
            .try_request("GW_GET_PROTOCOL_VERSION_REQ", Value::Null)
            .await
            .expect("request succeeds");
        (connection, result)
    });

    gateway.expect(0x000A).await;
    gateway.send(0x000B, &[0x00, 0x03, 0x00, 0x12]).await;

    let (_connection, result) = request.await.expect("join");
    assert_eq!(serde_json::to_value(&result).unwrap(), json!("3.18"));
}

#[tokio::test]
async fn system_table_stream_accumulates_in_order() {
    let (connection, mut gateway) = connect_pair(test_config("abc")).await;

    let request = tokio::spawn(async move {
        let result = connection
            .try_request("GW_CS_GET_SYSTEMTABLE_DATA_REQ", Value::Null)
            .await
            .expect("request succeeds");
        (connection, result)
    });

    gateway.expect(0x0100).await;
    gateway.send(0x0101, &[]).await;
    gateway.send(0x0102, &system_table_ntf(&[0, 1], 1)).await;
    gateway.send(0x0102, &system_table_ntf(&[2], 0)).await;

    let (_connection, result) = request.await.expect("join");
    let CommandResult::Many(entries) = result else { panic!("expected a list: {result:?}") };
    let indices: Vec<u8> = entries
        .iter()
        .map(|reply| match reply {
            Reply::SystemTableEntry(entry) => entry.index,
            other => panic!("unexpected reply {other:?}"),
        })
        .collect();
    assert_eq!(indices, vec![0, 1, 2]);
}

#[tokio::test]
async fn command_send_allocates_the_next_session_id() {
    let (connection, mut gateway) = connect_pair(test_config("abc")).await;
    connection.seed_session_id(0x0041);

    let request = tokio::spawn(async move {
        let result = connection
            .try_request("GW_COMMAND_SEND_REQ", json!({"position": 0, "node_ids": [2, 3]}))
            .await
            .expect("request succeeds");
        (connection, result)
    });

    let frame = gateway.expect(0x0300).await;
    assert_eq!(&frame.payload[..2], &[0x00, 0x42], "session id must be prev + 1");
    assert_eq!(frame.payload.len(), 66);

    gateway.send(0x0301, &[0x00, 0x42, 0x01]).await; // accepted

    let mut run_status = [0u8; 13];
    run_status[0..2].copy_from_slice(&[0x00, 0x42]);
    run_status[3] = 2;
    gateway.send(0x0302, &run_status).await;
    run_status[3] = 3;
    gateway.send(0x0302, &run_status).await;

    gateway.send(0x0304, &[0x00, 0x42]).await; // session finished

    let (connection, result) = request.await.expect("join");
    let CommandResult::Many(replies) = result else { panic!("expected a list: {result:?}") };
    let nodes: Vec<u8> = replies
        .iter()
        .map(|reply| match reply {
            Reply::RunStatus(status) => status.node_id,
            other => panic!("unexpected reply {other:?}"),
        })
        .collect();
    assert_eq!(nodes, vec![2, 3]);
    assert_eq!(connection.outstanding_requests(), 0);
}

#[tokio::test]
async fn concurrent_non_session_requests_serialize() {
    let (connection, mut gateway) = connect_pair(test_config("abc")).await;
    let connection = std::sync::Arc::new(connection);

    let first = {
        let connection = std::sync::Arc::clone(&connection);
        tokio::spawn(async move { connection.try_request("GW_GET_VERSION_REQ", Value::Null).await })
    };
    let second = {
        let connection = std::sync::Arc::clone(&connection);
        tokio::spawn(async move { connection.try_request("GW_GET_VERSION_REQ", Value::Null).await })
    };

    gateway.expect(0x0008).await;
    // The second caller must not hit the wire while the first is live.
    gateway.expect_silence(Duration::from_millis(150)).await;
    gateway.send(0x0009, &[0, 2, 0, 0, 71, 0, 5, 14, 3]).await;

    gateway.expect(0x0008).await;
    gateway.send(0x0009, &[0, 2, 0, 0, 71, 0, 5, 14, 3]).await;

    let first = first.await.expect("join").expect("first succeeds");
    let second = second.await.expect("join").expect("second succeeds");
    assert!(matches!(first, CommandResult::One(Reply::Version(_))));
    assert!(matches!(second, CommandResult::One(Reply::Version(_))));
}

#[tokio::test]
async fn node_information_completes_on_its_record() {
    let (connection, mut gateway) = connect_pair(test_config("abc")).await;

    let request = tokio::spawn(async move {
        let result = connection
            .try_request("GW_GET_NODE_INFORMATION_REQ", json!({"node_id": 4}))
            .await
            .expect("request succeeds");
        (connection, result)
    });

    let frame = gateway.expect(0x0200).await;
    assert_eq!(&frame.payload[..], &[4]);
    gateway.send(0x0201, &[0, 4]).await;
    gateway.send(0x0210, &node_record(4)).await;

    let (_connection, result) = request.await.expect("join");
    let CommandResult::One(Reply::Node(node)) = result else {
        panic!("expected a node record: {result:?}")
    };
    assert_eq!(node.node_id, 4);
    assert_eq!(node.name, "Node");
}

#[tokio::test]
async fn invalid_node_id_fails_the_request_not_the_connection() {
    let (connection, mut gateway) = connect_pair(test_config("abc")).await;

    let request = tokio::spawn(async move {
        let error = connection
            .try_request("GW_GET_NODE_INFORMATION_REQ", json!({"node_id": 250}))
            .await
            .expect_err("gateway rejects the node id");
        (connection, error)
    });

    gateway.expect(0x0200).await;
    gateway.send(0x0201, &[2, 250]).await; // invalid node index

    let (connection, error) = request.await.expect("join");
    assert!(
        matches!(error, ClientError::Proto(ProtoError::InvalidNodeId)),
        "{error:?}"
    );

    // The connection stays usable.
    let request = tokio::spawn(async move {
        connection.try_request("GW_GET_STATE_REQ", Value::Null).await
    });
    gateway.expect(0x000C).await;
    gateway.send(0x000D, &[2, 0, 0, 0, 0, 0]).await;
    let result = request.await.expect("join").expect("request succeeds");
    assert!(matches!(result, CommandResult::One(Reply::GatewayState(_))));
}

#[tokio::test]
async fn gateway_error_is_attributed_to_the_sole_request() {
    let (connection, mut gateway) = connect_pair(test_config("abc")).await;

    let request = tokio::spawn(async move {
        connection.try_request("GW_GET_STATE_REQ", Value::Null).await
    });

    gateway.expect(0x000C).await;
    gateway.send(0x0000, &[7]).await; // busy

    let error = request.await.expect("join").expect_err("request fails");
    assert!(
        matches!(
            error,
            ClientError::Proto(ProtoError::Gateway(GatewayError::Busy))
        ),
        "{error:?}"
    );
}

#[tokio::test]
async fn confirmation_timeout_clears_the_slot() {
    let config = test_config("abc").confirmation_timeout(Duration::from_millis(150));
    let (connection, mut gateway) = connect_pair(config).await;

    let error = connection
        .try_request("GW_GET_STATE_REQ", Value::Null)
        .await
        .expect_err("gateway never confirms");
    assert!(matches!(error, ClientError::ConfirmationTimeout(_)), "{error:?}");
    assert_eq!(connection.outstanding_requests(), 0);

    gateway.expect(0x000C).await; // the frame did go out
}

#[tokio::test]
async fn disconnect_fails_requests_in_flight() {
    let (connection, mut gateway) = connect_pair(test_config("abc")).await;

    let request = tokio::spawn(async move {
        let error = connection
            .try_request("GW_GET_STATE_REQ", Value::Null)
            .await
            .expect_err("connection drops mid-request");
        (connection, error)
    });

    gateway.expect(0x000C).await;
    drop(gateway);

    let (connection, error) = request.await.expect("join");
    assert!(matches!(error, ClientError::Disconnected), "{error:?}");
    assert_eq!(connection.outstanding_requests(), 0);
}

#[tokio::test]
async fn checksum_mismatch_is_tolerated_by_default() {
    let (connection, mut gateway) = connect_pair(test_config("abc")).await;

    let request = tokio::spawn(async move {
        connection.try_request("GW_GET_PROTOCOL_VERSION_REQ", Value::Null).await
    });

    gateway.expect(0x000A).await;
    let mut wire = Frame::new(0x000B, vec![0x00, 0x03, 0x00, 0x12]).unwrap().encode();
    let last = wire.len() - 1;
    wire[last] ^= 0x55;
    gateway.send_raw(&slip::encode(&wire)).await;

    let result = request.await.expect("join").expect("tolerant mode keeps the frame");
    assert_eq!(serde_json::to_value(&result).unwrap(), json!("3.18"));
}

#[tokio::test]
async fn strict_checksum_rejects_the_frame() {
    let config = test_config("abc")
        .strict_checksum(true)
        .confirmation_timeout(Duration::from_millis(150));
    let (connection, mut gateway) = connect_pair(config).await;

    let request = tokio::spawn(async move {
        connection.try_request("GW_GET_PROTOCOL_VERSION_REQ", Value::Null).await
    });

    gateway.expect(0x000A).await;
    let mut wire = Frame::new(0x000B, vec![0x00, 0x03, 0x00, 0x12]).unwrap().encode();
    let last = wire.len() - 1;
    wire[last] ^= 0x55;
    gateway.send_raw(&slip::encode(&wire)).await;

    let error = request.await.expect("join").expect_err("strict mode drops the frame");
    assert!(matches!(error, ClientError::ConfirmationTimeout(_)), "{error:?}");
}

#[tokio::test]
async fn unknown_command_ids_are_dropped_without_harm() {
    let (connection, mut gateway) = connect_pair(test_config("abc")).await;
    let mut events = connection.subscribe();

    gateway.send(0x7777, &[1, 2, 3]).await;

    let request = tokio::spawn(async move {
        let result = connection.try_request("GW_GET_STATE_REQ", Value::Null).await;
        (connection, result)
    });
    gateway.expect(0x000C).await;
    gateway.send(0x000D, &[1, 0, 0, 0, 0, 0]).await;
    let (_connection, result) = request.await.expect("join");
    result.expect("connection survives the unknown frame");

    let mut saw_unknown = false;
    while let Ok(event) = events.try_recv() {
        if let Event::Error { message, .. } = event {
            saw_unknown |= message.contains("unknown command id");
        }
    }
    assert!(saw_unknown, "unknown id should surface on the error channel");
}

#[tokio::test]
async fn events_trace_the_request_lifecycle() {
    let (connection, mut gateway) = connect_pair(test_config("abc")).await;
    let mut events = connection.subscribe();

    let request = tokio::spawn(async move {
        let result = connection.try_request("GW_GET_VERSION_REQ", Value::Null).await;
        (connection, result)
    });
    gateway.expect(0x0008).await;
    gateway.send(0x0009, &[0, 2, 0, 0, 71, 0, 5, 14, 3]).await;
    let (_connection, result) = request.await.expect("join");
    result.expect("request succeeds");

    let (mut saw_send, mut saw_request, mut saw_notification, mut saw_response) =
        (false, false, false, false);
    while let Ok(event) = events.try_recv() {
        match event {
            Event::Send { .. } => saw_send = true,
            Event::Request { request } => {
                assert_eq!(request.name, "GW_GET_VERSION_REQ");
                saw_request = true;
            }
            Event::Notification(notification) => {
                assert_eq!(notification.name, "GW_GET_VERSION_CFM");
                assert!(notification.request.is_some());
                saw_notification = true;
            }
            Event::Response { result, .. } => {
                assert!(matches!(result, CommandResult::One(Reply::Version(_))));
                saw_response = true;
            }
            _ => {}
        }
    }
    assert!(saw_send && saw_request && saw_notification && saw_response);
}

#[tokio::test]
async fn observational_request_returns_none_on_failure() {
    let (connection, mut gateway) = connect_pair(test_config("abc")).await;
    let mut events = connection.subscribe();

    let request = tokio::spawn(async move {
        let result = connection
            .request("GW_GET_NODE_INFORMATION_REQ", json!({"node_id": 250}))
            .await;
        (connection, result)
    });
    gateway.expect(0x0200).await;
    gateway.send(0x0201, &[2, 250]).await;

    let (_connection, result) = request.await.expect("join");
    assert!(result.is_none());

    let mut attributed = false;
    while let Ok(event) = events.try_recv() {
        if let Event::Error { request: Some(request), .. } = event {
            attributed |= request.name == "GW_GET_NODE_INFORMATION_REQ";
        }
    }
    assert!(attributed, "the error must carry the originating request");
}
