//! Payload codecs for the command set.
//!
//! Decoded inbound payloads are [`Reply`] values; outbound request
//! parameters arrive as JSON ([`serde_json::Value`], the generic
//! parameter surface the CLI exposes) and are deserialized into typed
//! parameter structs before encoding.
//!
//! Codecs exist for connection bring-up and for the command subset the
//! CLI exercises. Registered commands without a codec pass through as
//! raw notifications; requests without an encoder accept either no
//! parameters or an explicit byte array.

pub mod command;
pub mod gateway;
pub mod group;
pub mod node;
pub mod scene;

use serde::Serialize;
use serde_json::Value;

use crate::error::{ProtoError, Result};
use crate::registry::{ids, CommandSpec, Role};

pub use command::{
    MainInfo, NodeStatus, ParameterValue, RemainingTime, RunStatus, SessionAccepted, SessionRef,
};
pub use gateway::{GatewayState, LocalTime, PasswordChanged, ProtocolVersion, Version};
pub use group::GroupInfo;
pub use node::{NodeInfo, NodeInfoChanged, NodePositionChanged, SystemTableChunk, SystemTableEntry};
pub use scene::{Scene, SceneListChunk};

/// A count reported by a streaming confirmation (nodes, groups, scenes).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Count {
    /// Number of records the stream will carry.
    pub count: u8,
}

/// A decoded confirmation or notification payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Reply {
    /// Confirmation without a meaningful body.
    Empty,
    /// Software/hardware version record.
    Version(Version),
    /// Wire protocol version.
    ProtocolVersion(ProtocolVersion),
    /// Gateway state machine snapshot.
    GatewayState(GatewayState),
    /// Local time snapshot.
    LocalTime(LocalTime),
    /// Password echo from a password change.
    PasswordChanged(PasswordChanged),
    /// One system-table notification (carries its own remaining count).
    SystemTable(SystemTableChunk),
    /// A single system-table record (after flattening).
    SystemTableEntry(SystemTableEntry),
    /// Node count from the all-nodes confirmation.
    NodeCount(Count),
    /// One node record.
    Node(Box<NodeInfo>),
    /// Broadcast position update.
    NodePositionChanged(NodePositionChanged),
    /// Broadcast node metadata update.
    NodeInfoChanged(NodeInfoChanged),
    /// Group count from the all-groups confirmation.
    GroupCount(Count),
    /// One group record.
    Group(GroupInfo),
    /// Scene count from the scene-list confirmation.
    SceneCount(Count),
    /// One scene-list notification (carries its own remaining count).
    SceneList(SceneListChunk),
    /// A single scene record (after flattening).
    Scene(Scene),
    /// Session command accepted by the gateway.
    SessionAccepted(SessionAccepted),
    /// Per-node command progress.
    RunStatus(RunStatus),
    /// Per-node remaining run time.
    RemainingTime(RemainingTime),
    /// Per-node status-request record.
    NodeStatus(NodeStatus),
    /// Wink acknowledged for a session.
    Wink(SessionRef),
    /// End of a session.
    SessionFinished(SessionRef),
    /// End of a record stream (all nodes / all groups).
    Finished,
}

impl Reply {
    /// Whether this reply contributes no value to a request's result.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty | Self::Finished | Self::SessionFinished(_))
    }

    /// Whether this reply finishes its stream on its own (a chunk whose
    /// remaining counter reached zero).
    #[must_use]
    pub fn finishes_stream(&self) -> bool {
        match self {
            Self::SystemTable(chunk) => chunk.remaining == 0,
            Self::SceneList(chunk) => chunk.remaining == 0,
            _ => false,
        }
    }

    /// Flatten a chunked reply into the items it contributes to an
    /// accumulated result.
    #[must_use]
    pub fn into_items(self) -> Vec<Reply> {
        match self {
            Self::SystemTable(chunk) => {
                chunk.entries.into_iter().map(Reply::SystemTableEntry).collect()
            }
            Self::SceneList(chunk) => chunk.scenes.into_iter().map(Reply::Scene).collect(),
            other => vec![other],
        }
    }
}

/// Extract the 16-bit session id a confirmation or notification carries.
///
/// Returns `None` for commands outside the session family. Most session
/// replies lead with the session id; the scene activation confirmations
/// put their status byte first.
///
/// # Errors
///
/// `PayloadLength` when the payload cannot hold the id.
pub fn session_id(spec: &CommandSpec, payload: &[u8]) -> Result<Option<u16>> {
    if !spec.session || spec.role == Role::Request {
        return Ok(None);
    }
    let offset = match spec.id {
        ids::GW_ACTIVATE_SCENE_CFM | ids::GW_STOP_SCENE_CFM => 1,
        _ => 0,
    };
    let bytes = payload.get(offset..offset + 2).ok_or(ProtoError::PayloadLength {
        name: spec.name,
        expected: offset + 2,
        actual: payload.len(),
    })?;
    Ok(Some(u16::from_be_bytes([bytes[0], bytes[1]])))
}

/// Decode an inbound payload.
///
/// `Ok(None)` means the command has no registered decoder; the caller
/// should surface the raw bytes. Domain statuses the gateway reports
/// (rejected commands, bad indices, failed authentication) come back as
/// errors.
pub fn decode_reply(spec: &CommandSpec, payload: &[u8]) -> Result<Option<Reply>> {
    let reply = match spec.id {
        ids::GW_PASSWORD_ENTER_CFM => gateway::decode_password_enter_cfm(payload)?,
        ids::GW_PASSWORD_CHANGE_CFM => gateway::decode_password_change_cfm(payload)?,
        ids::GW_PASSWORD_CHANGE_NTF => gateway::decode_password_change_ntf(payload)?,
        ids::GW_GET_VERSION_CFM => gateway::decode_version_cfm(payload)?,
        ids::GW_GET_PROTOCOL_VERSION_CFM => gateway::decode_protocol_version_cfm(payload)?,
        ids::GW_GET_STATE_CFM => gateway::decode_state_cfm(payload)?,
        ids::GW_GET_LOCAL_TIME_CFM => gateway::decode_local_time_cfm(payload)?,
        0x2001 | 0x0241 | 0x0243 => gateway::decode_empty_cfm(spec.name, payload)?,
        ids::GW_CS_GET_SYSTEMTABLE_DATA_CFM => Reply::Empty,
        ids::GW_CS_GET_SYSTEMTABLE_DATA_NTF => node::decode_system_table_ntf(payload)?,
        ids::GW_GET_NODE_INFORMATION_CFM => node::decode_node_info_cfm(payload)?,
        ids::GW_GET_NODE_INFORMATION_NTF | ids::GW_GET_ALL_NODES_INFORMATION_NTF => {
            Reply::Node(Box::new(node::decode_node_record(spec.name, payload)?))
        }
        ids::GW_GET_ALL_NODES_INFORMATION_CFM => node::decode_all_nodes_cfm(payload)?,
        ids::GW_GET_ALL_NODES_INFORMATION_FINISHED_NTF => Reply::Finished,
        ids::GW_NODE_STATE_POSITION_CHANGED_NTF => node::decode_position_changed_ntf(payload)?,
        ids::GW_NODE_INFORMATION_CHANGED_NTF => node::decode_info_changed_ntf(payload)?,
        ids::GW_GET_GROUP_INFORMATION_CFM => group::decode_group_info_cfm(payload)?,
        ids::GW_GET_GROUP_INFORMATION_NTF | ids::GW_GET_ALL_GROUPS_INFORMATION_NTF => {
            Reply::Group(group::decode_group_record(spec.name, payload)?)
        }
        ids::GW_GET_ALL_GROUPS_INFORMATION_CFM => group::decode_all_groups_cfm(payload)?,
        ids::GW_GET_ALL_GROUPS_INFORMATION_FINISHED_NTF => Reply::Finished,
        ids::GW_GET_SCENE_LIST_CFM => scene::decode_scene_list_cfm(payload)?,
        ids::GW_GET_SCENE_LIST_NTF => scene::decode_scene_list_ntf(payload)?,
        ids::GW_ACTIVATE_SCENE_CFM | ids::GW_STOP_SCENE_CFM => {
            scene::decode_scene_session_cfm(spec.name, payload)?
        }
        ids::GW_COMMAND_SEND_CFM | ids::GW_STATUS_REQUEST_CFM | ids::GW_WINK_SEND_CFM => {
            command::decode_session_cfm(spec.name, payload)?
        }
        ids::GW_ACTIVATE_PRODUCTGROUP_CFM => command::decode_productgroup_cfm(payload)?,
        ids::GW_COMMAND_RUN_STATUS_NTF => command::decode_run_status_ntf(payload)?,
        ids::GW_COMMAND_REMAINING_TIME_NTF => command::decode_remaining_time_ntf(payload)?,
        ids::GW_STATUS_REQUEST_NTF => command::decode_status_request_ntf(payload)?,
        ids::GW_WINK_SEND_NTF => command::decode_wink_ntf(payload)?,
        ids::GW_SESSION_FINISHED_NTF => command::decode_session_finished_ntf(payload)?,
        _ => return Ok(None),
    };
    Ok(Some(reply))
}

/// Encode request parameters for the wire.
///
/// `session` must be supplied for session-bearing commands; it is the
/// id the pipeline allocated for this exchange. Commands without a
/// typed encoder accept `null` (empty payload) or a JSON array of bytes
/// (raw payload); for session commands the allocated session id is
/// prepended, so raw parameters carry everything after it.
pub fn encode_request(spec: &CommandSpec, params: &Value, session: Option<u16>) -> Result<Vec<u8>> {
    debug_assert_eq!(spec.role, Role::Request);

    match spec.id {
        ids::GW_PASSWORD_ENTER_REQ => gateway::encode_password_enter(params),
        ids::GW_PASSWORD_CHANGE_REQ => gateway::encode_password_change(params),
        ids::GW_SET_UTC_REQ => gateway::encode_set_utc(params),
        ids::GW_RTC_SET_TIME_ZONE_REQ => gateway::encode_time_zone(params),
        ids::GW_GET_NODE_INFORMATION_REQ => node::encode_node_query(params),
        ids::GW_GET_GROUP_INFORMATION_REQ => group::encode_group_query(params),
        ids::GW_GET_ALL_GROUPS_INFORMATION_REQ => group::encode_all_groups_query(params),
        ids::GW_COMMAND_SEND_REQ => {
            command::encode_command_send(params, need_session(spec.name, session)?)
        }
        ids::GW_STATUS_REQUEST_REQ => {
            command::encode_status_request(params, need_session(spec.name, session)?)
        }
        ids::GW_WINK_SEND_REQ => command::encode_wink(params, need_session(spec.name, session)?),
        ids::GW_ACTIVATE_PRODUCTGROUP_REQ => {
            command::encode_activate_productgroup(params, need_session(spec.name, session)?)
        }
        ids::GW_ACTIVATE_SCENE_REQ => {
            scene::encode_activate_scene(params, need_session(spec.name, session)?)
        }
        ids::GW_STOP_SCENE_REQ => {
            scene::encode_stop_scene(params, need_session(spec.name, session)?)
        }
        _ => {
            let body = encode_untyped(spec.name, params)?;
            if spec.session {
                let session = need_session(spec.name, session)?;
                let mut out = session.to_be_bytes().to_vec();
                out.extend(body);
                Ok(out)
            } else {
                Ok(body)
            }
        }
    }
}

fn need_session(name: &'static str, session: Option<u16>) -> Result<u16> {
    session.ok_or(ProtoError::InvalidParams {
        name,
        reason: "session id not allocated".to_owned(),
    })
}

/// Fallback encoder: no parameters, or an explicit byte array.
fn encode_untyped(name: &'static str, params: &Value) -> Result<Vec<u8>> {
    match params {
        Value::Null => Ok(Vec::new()),
        Value::Array(items) => items
            .iter()
            .map(|item| {
                item.as_u64()
                    .and_then(|n| u8::try_from(n).ok())
                    .ok_or_else(|| ProtoError::InvalidParams {
                        name,
                        reason: format!("not a byte: {item}"),
                    })
            })
            .collect(),
        other => Err(ProtoError::InvalidParams {
            name,
            reason: format!("command has no parameter encoder, got {other}"),
        }),
    }
}

/// Deserialize a typed parameter struct from the JSON surface.
///
/// `null` is treated as an empty object so parameter structs whose
/// fields all carry defaults can be omitted entirely.
pub(crate) fn parse_params<T: serde::de::DeserializeOwned>(
    name: &'static str,
    params: &Value,
) -> Result<T> {
    let value = if params.is_null() {
        Value::Object(serde_json::Map::new())
    } else {
        params.clone()
    };
    serde_json::from_value(value)
        .map_err(|e| ProtoError::InvalidParams { name, reason: e.to_string() })
}

/// Require an exact payload size.
pub(crate) fn expect_len(name: &'static str, payload: &[u8], expected: usize) -> Result<()> {
    if payload.len() == expected {
        Ok(())
    } else {
        Err(ProtoError::PayloadLength { name, expected, actual: payload.len() })
    }
}

/// Require a minimum payload size.
pub(crate) fn min_len(name: &'static str, payload: &[u8], expected: usize) -> Result<()> {
    if payload.len() >= expected {
        Ok(())
    } else {
        Err(ProtoError::PayloadLength { name, expected, actual: payload.len() })
    }
}

/// Read a zero-terminated text field.
pub(crate) fn text(bytes: &[u8]) -> String {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..end]).into_owned()
}

/// Write a zero-padded text field of fixed width.
pub(crate) fn encode_text(name: &'static str, value: &str, width: usize) -> Result<Vec<u8>> {
    let bytes = value.as_bytes();
    if bytes.len() > width {
        return Err(ProtoError::InvalidParams {
            name,
            reason: format!("text longer than {width} bytes"),
        });
    }
    let mut out = vec![0u8; width];
    out[..bytes.len()].copy_from_slice(bytes);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::registry;

    #[test]
    fn untyped_requests_accept_null_and_byte_arrays() {
        let spec = registry::by_id(0x0001).unwrap(); // GW_REBOOT_REQ
        assert_eq!(encode_request(spec, &Value::Null, None).unwrap(), Vec::<u8>::new());

        let spec = registry::by_id(0x0103).unwrap(); // GW_CS_DISCOVER_NODES_REQ
        assert_eq!(encode_request(spec, &json!([4]), None).unwrap(), vec![4]);

        assert!(encode_request(spec, &json!([256]), None).is_err());
        assert!(encode_request(spec, &json!({"x": 1}), None).is_err());
    }

    #[test]
    fn session_commands_require_a_session_id() {
        let spec = registry::by_id(registry::ids::GW_COMMAND_SEND_REQ).unwrap();
        let params = json!({"node_ids": [1], "position": 50});
        assert!(matches!(
            encode_request(spec, &params, None),
            Err(ProtoError::InvalidParams { .. })
        ));
    }

    #[test]
    fn raw_session_requests_prepend_the_session_id() {
        let spec = registry::by_id(0x0320).unwrap(); // GW_MODE_SEND_REQ, no typed encoder
        let payload = encode_request(spec, &json!([1, 0, 0]), Some(0x0102)).unwrap();
        assert_eq!(payload, vec![0x01, 0x02, 1, 0, 0]);
    }

    #[test]
    fn session_id_extraction() {
        let spec = registry::by_id(registry::ids::GW_COMMAND_SEND_CFM).unwrap();
        assert_eq!(session_id(spec, &[0x00, 0x42, 0x01]).unwrap(), Some(0x0042));

        // Scene activation confirmations lead with the status byte.
        let spec = registry::by_id(registry::ids::GW_ACTIVATE_SCENE_CFM).unwrap();
        assert_eq!(session_id(spec, &[0x00, 0x12, 0x34]).unwrap(), Some(0x1234));

        let spec = registry::by_id(registry::ids::GW_GET_VERSION_CFM).unwrap();
        assert_eq!(session_id(spec, &[]).unwrap(), None);

        let spec = registry::by_id(registry::ids::GW_SESSION_FINISHED_NTF).unwrap();
        assert!(session_id(spec, &[0x01]).is_err());
    }

    #[test]
    fn chunk_flattening() {
        let chunk = Reply::SystemTable(SystemTableChunk {
            entries: vec![
                SystemTableEntry::test_entry(0),
                SystemTableEntry::test_entry(1),
            ],
            remaining: 0,
        });
        assert!(chunk.finishes_stream());
        let items = chunk.into_items();
        assert_eq!(items.len(), 2);
        assert!(matches!(items[0], Reply::SystemTableEntry(_)));
    }
}
