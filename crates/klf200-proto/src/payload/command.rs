//! Session command payloads: command send, status request, wink, and
//! product group activation, plus the notifications they stream.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ProtoError, Result};
use crate::payload::{expect_len, min_len, parse_params, Reply};
use crate::position::{position_at, Position};

/// Maximum nodes addressable by one command.
const MAX_NODES: usize = 20;
/// Functional parameter slots in a command frame (MP plus FP1..FP16).
const PARAMETER_SLOTS: usize = 17;

/// Reference to a session, used by frames that carry nothing else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SessionRef {
    /// The session this frame belongs to.
    pub session_id: u16,
}

/// A session command the gateway accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SessionAccepted {
    /// The session id the request carried.
    pub session_id: u16,
}

/// `GW_COMMAND_RUN_STATUS_NTF` — per-node progress of a movement.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunStatus {
    /// Owning session.
    pub session_id: u16,
    /// Who produced the status (8 = local user, …).
    pub status_id: u8,
    /// Node the status concerns.
    pub node_id: u8,
    /// Parameter the value refers to (0 = main parameter).
    pub node_parameter: u8,
    /// Current value of that parameter.
    pub parameter_value: Position,
    /// Run state (0 completed, 1 failed, 2 active).
    pub run_status: u8,
    /// Detailed reply code.
    pub status_reply: u8,
    /// Additional information code.
    pub information_code: u32,
}

/// `GW_COMMAND_REMAINING_TIME_NTF` — seconds a node still needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RemainingTime {
    /// Owning session.
    pub session_id: u16,
    /// Node the time refers to.
    pub node_id: u8,
    /// Parameter the time refers to.
    pub node_parameter: u8,
    /// Remaining seconds.
    pub seconds: u16,
}

/// Position block of a status-request record when the gateway reports
/// main info (status type 3).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MainInfo {
    /// Target position of the main parameter.
    pub target: Position,
    /// Current position of the main parameter.
    pub current_position: Position,
    /// Seconds until the movement completes.
    pub remaining_time: u16,
    /// io address of the controller that last moved the node.
    pub last_master_execution_address: u32,
    /// Originator of the last command.
    pub last_command_originator: u8,
}

/// One functional-parameter value in a status-request record.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ParameterValue {
    /// Parameter index.
    pub parameter: u8,
    /// Parameter value.
    pub value: Position,
}

/// `GW_STATUS_REQUEST_NTF` — per-node answer to a status request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeStatus {
    /// Owning session.
    pub session_id: u16,
    /// Who produced the status.
    pub status_id: u8,
    /// Node the record concerns.
    pub node_id: u8,
    /// Run state.
    pub run_status: u8,
    /// Detailed reply code.
    pub status_reply: u8,
    /// Requested status type (0 target, 1 current, 2 remaining, 3 main).
    pub status_type: u8,
    /// Main-info block, present for status type 3.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub main_info: Option<MainInfo>,
    /// Per-parameter values, present for status types 0..=2.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<ParameterValue>,
}

#[derive(Debug, Deserialize)]
struct CommandSendParams {
    #[serde(alias = "nodeIds")]
    node_ids: Vec<u8>,
    position: Position,
    #[serde(default, alias = "commandOriginator")]
    command_originator: Option<u8>,
    #[serde(default, alias = "priorityLevel")]
    priority_level: Option<u8>,
    #[serde(default, alias = "parameterActive")]
    parameter_active: u8,
    #[serde(default, alias = "lockTime")]
    lock_time: u8,
}

#[derive(Debug, Deserialize)]
struct StatusRequestParams {
    #[serde(alias = "nodeIds")]
    node_ids: Vec<u8>,
    #[serde(default = "default_status_type", alias = "statusType")]
    status_type: u8,
    #[serde(default, alias = "fpi1")]
    fpi1: u8,
    #[serde(default, alias = "fpi2")]
    fpi2: u8,
}

fn default_status_type() -> u8 {
    3
}

#[derive(Debug, Deserialize)]
struct WinkParams {
    #[serde(alias = "nodeIds")]
    node_ids: Vec<u8>,
    #[serde(default = "default_wink_state", alias = "winkState")]
    wink_state: bool,
    #[serde(default = "default_wink_time", alias = "winkTime")]
    wink_time: u8,
    #[serde(default, alias = "commandOriginator")]
    command_originator: Option<u8>,
    #[serde(default, alias = "priorityLevel")]
    priority_level: Option<u8>,
}

fn default_wink_state() -> bool {
    true
}

fn default_wink_time() -> u8 {
    254
}

#[derive(Debug, Deserialize)]
struct ActivateProductGroupParams {
    #[serde(alias = "groupId")]
    group_id: u8,
    position: Position,
    #[serde(default)]
    velocity: u8,
    #[serde(default, alias = "commandOriginator")]
    command_originator: Option<u8>,
    #[serde(default, alias = "priorityLevel")]
    priority_level: Option<u8>,
}

/// Validate and copy a node index array into its fixed 20-byte field.
fn node_index_array(name: &'static str, node_ids: &[u8]) -> Result<(u8, [u8; MAX_NODES])> {
    if node_ids.is_empty() || node_ids.len() > MAX_NODES {
        return Err(ProtoError::InvalidParams {
            name,
            reason: format!("between 1 and {MAX_NODES} node ids required"),
        });
    }
    let mut array = [0u8; MAX_NODES];
    array[..node_ids.len()].copy_from_slice(node_ids);
    Ok((node_ids.len() as u8, array))
}

/// Encode `GW_COMMAND_SEND_REQ` (66 bytes).
pub fn encode_command_send(params: &Value, session: u16) -> Result<Vec<u8>> {
    const NAME: &str = "GW_COMMAND_SEND_REQ";
    let params: CommandSendParams = parse_params(NAME, params)?;
    let (count, indexes) = node_index_array(NAME, &params.node_ids)?;

    let mut out = Vec::with_capacity(66);
    out.extend_from_slice(&session.to_be_bytes());
    out.push(params.command_originator.unwrap_or(1));
    out.push(params.priority_level.unwrap_or(3));
    out.push(params.parameter_active);
    out.push(0); // FPI1: no functional parameters active
    out.push(0); // FPI2
    // Parameter slot 0 is the main parameter; FP slots stay zero.
    out.extend_from_slice(&params.position.to_raw().to_be_bytes());
    out.extend_from_slice(&[0u8; (PARAMETER_SLOTS - 1) * 2]);
    out.push(count);
    out.extend_from_slice(&indexes);
    out.push(0); // priority level lock
    out.push(0); // PL 0..3
    out.push(0); // PL 4..7
    out.push(params.lock_time);
    Ok(out)
}

/// Encode `GW_STATUS_REQUEST_REQ` (26 bytes).
pub fn encode_status_request(params: &Value, session: u16) -> Result<Vec<u8>> {
    const NAME: &str = "GW_STATUS_REQUEST_REQ";
    let params: StatusRequestParams = parse_params(NAME, params)?;
    let (count, indexes) = node_index_array(NAME, &params.node_ids)?;

    let mut out = Vec::with_capacity(26);
    out.extend_from_slice(&session.to_be_bytes());
    out.push(count);
    out.extend_from_slice(&indexes);
    out.push(params.status_type);
    out.push(params.fpi1);
    out.push(params.fpi2);
    Ok(out)
}

/// Encode `GW_WINK_SEND_REQ` (27 bytes).
pub fn encode_wink(params: &Value, session: u16) -> Result<Vec<u8>> {
    const NAME: &str = "GW_WINK_SEND_REQ";
    let params: WinkParams = parse_params(NAME, params)?;
    let (count, indexes) = node_index_array(NAME, &params.node_ids)?;

    let mut out = Vec::with_capacity(27);
    out.extend_from_slice(&session.to_be_bytes());
    out.push(params.command_originator.unwrap_or(1));
    out.push(params.priority_level.unwrap_or(3));
    out.push(u8::from(params.wink_state));
    out.push(params.wink_time);
    out.push(count);
    out.extend_from_slice(&indexes);
    Ok(out)
}

/// Encode `GW_ACTIVATE_PRODUCTGROUP_REQ` (13 bytes).
pub fn encode_activate_productgroup(params: &Value, session: u16) -> Result<Vec<u8>> {
    const NAME: &str = "GW_ACTIVATE_PRODUCTGROUP_REQ";
    let params: ActivateProductGroupParams = parse_params(NAME, params)?;

    let mut out = Vec::with_capacity(13);
    out.extend_from_slice(&session.to_be_bytes());
    out.push(params.command_originator.unwrap_or(1));
    out.push(params.priority_level.unwrap_or(3));
    out.push(params.group_id);
    out.push(0); // parameter id: main parameter
    out.extend_from_slice(&params.position.to_raw().to_be_bytes());
    out.push(params.velocity);
    out.push(0); // priority level lock
    out.push(0); // PL 0..3
    out.push(0); // PL 4..7
    out.push(0); // lock time
    Ok(out)
}

/// Decode the session confirmations that lead with the session id
/// (`GW_COMMAND_SEND_CFM`, `GW_STATUS_REQUEST_CFM`, `GW_WINK_SEND_CFM`):
/// status 1 accepted, 0 rejected.
pub fn decode_session_cfm(name: &'static str, payload: &[u8]) -> Result<Reply> {
    expect_len(name, payload, 3)?;
    let session_id = u16::from_be_bytes([payload[0], payload[1]]);
    if payload[2] == 1 {
        Ok(Reply::SessionAccepted(SessionAccepted { session_id }))
    } else {
        Err(ProtoError::CommandRejected)
    }
}

/// Decode `GW_ACTIVATE_PRODUCTGROUP_CFM`, whose status uses its own
/// code table (0 is the accepted case).
pub fn decode_productgroup_cfm(payload: &[u8]) -> Result<Reply> {
    expect_len("GW_ACTIVATE_PRODUCTGROUP_CFM", payload, 3)?;
    let session_id = u16::from_be_bytes([payload[0], payload[1]]);
    match payload[2] {
        0 => Ok(Reply::SessionAccepted(SessionAccepted { session_id })),
        1 => Err(ProtoError::InvalidGroupId),
        2 => Err(ProtoError::SessionInUse),
        3 => Err(ProtoError::Gateway(crate::error::GatewayError::Busy)),
        4 => Err(ProtoError::InvalidGroupType),
        6 => Err(ProtoError::InvalidParameter),
        _ => Err(ProtoError::RequestFailed),
    }
}

/// Decode `GW_COMMAND_RUN_STATUS_NTF` (13 bytes).
pub fn decode_run_status_ntf(payload: &[u8]) -> Result<Reply> {
    const NAME: &str = "GW_COMMAND_RUN_STATUS_NTF";
    expect_len(NAME, payload, 13)?;
    Ok(Reply::RunStatus(RunStatus {
        session_id: u16::from_be_bytes([payload[0], payload[1]]),
        status_id: payload[2],
        node_id: payload[3],
        node_parameter: payload[4],
        parameter_value: position_at(NAME, payload, 5)?,
        run_status: payload[7],
        status_reply: payload[8],
        information_code: u32::from_be_bytes([payload[9], payload[10], payload[11], payload[12]]),
    }))
}

/// Decode `GW_COMMAND_REMAINING_TIME_NTF` (6 bytes).
pub fn decode_remaining_time_ntf(payload: &[u8]) -> Result<Reply> {
    expect_len("GW_COMMAND_REMAINING_TIME_NTF", payload, 6)?;
    Ok(Reply::RemainingTime(RemainingTime {
        session_id: u16::from_be_bytes([payload[0], payload[1]]),
        node_id: payload[2],
        node_parameter: payload[3],
        seconds: u16::from_be_bytes([payload[4], payload[5]]),
    }))
}

/// Decode `GW_STATUS_REQUEST_NTF`.
///
/// The tail depends on the requested status type: type 3 carries a
/// fixed main-info block, types 0..=2 carry a counted list of
/// parameter/value pairs.
pub fn decode_status_request_ntf(payload: &[u8]) -> Result<Reply> {
    const NAME: &str = "GW_STATUS_REQUEST_NTF";
    min_len(NAME, payload, 7)?;

    let status_type = payload[6];
    let mut status = NodeStatus {
        session_id: u16::from_be_bytes([payload[0], payload[1]]),
        status_id: payload[2],
        node_id: payload[3],
        run_status: payload[4],
        status_reply: payload[5],
        status_type,
        main_info: None,
        parameters: Vec::new(),
    };

    if status_type == 3 {
        expect_len(NAME, payload, 18)?;
        status.main_info = Some(MainInfo {
            target: position_at(NAME, payload, 7)?,
            current_position: position_at(NAME, payload, 9)?,
            remaining_time: u16::from_be_bytes([payload[11], payload[12]]),
            last_master_execution_address: u32::from_be_bytes([
                payload[13],
                payload[14],
                payload[15],
                payload[16],
            ]),
            last_command_originator: payload[17],
        });
    } else {
        min_len(NAME, payload, 8)?;
        let count = payload[7] as usize;
        expect_len(NAME, payload, 8 + count * 3)?;
        for chunk in payload[8..].chunks_exact(3) {
            status.parameters.push(ParameterValue {
                parameter: chunk[0],
                value: Position::from_raw(u16::from_be_bytes([chunk[1], chunk[2]])),
            });
        }
    }

    Ok(Reply::NodeStatus(status))
}

/// Decode `GW_WINK_SEND_NTF`: the session whose wink ran.
pub fn decode_wink_ntf(payload: &[u8]) -> Result<Reply> {
    min_len("GW_WINK_SEND_NTF", payload, 2)?;
    Ok(Reply::Wink(SessionRef { session_id: u16::from_be_bytes([payload[0], payload[1]]) }))
}

/// Decode `GW_SESSION_FINISHED_NTF`.
pub fn decode_session_finished_ntf(payload: &[u8]) -> Result<Reply> {
    expect_len("GW_SESSION_FINISHED_NTF", payload, 2)?;
    Ok(Reply::SessionFinished(SessionRef {
        session_id: u16::from_be_bytes([payload[0], payload[1]]),
    }))
}
