//! Group payloads: group information records and their queries.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ProtoError, Result};
use crate::payload::{min_len, parse_params, text, Count, Reply};
use crate::position::Velocity;

/// Size of a group information record.
const GROUP_RECORD: usize = 98;
/// Bytes in the membership bitmap (200 bits for nodes 0..=199).
const BITMAP_BYTES: usize = 25;

/// A group record (`GW_GET_GROUP_INFORMATION_NTF` /
/// `GW_GET_ALL_GROUPS_INFORMATION_NTF`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupInfo {
    /// Group id (0..=99).
    pub group_id: u8,
    /// Sort order in the gateway UI.
    pub order: u16,
    /// Room/placement index.
    pub placement: u8,
    /// UTF-8 group name.
    pub name: String,
    /// Configured velocity.
    pub velocity: Velocity,
    /// Group type (0 user, 1 room, 2 house, 3 all).
    pub group_type: u8,
    /// Number of member nodes the gateway reports.
    pub object_count: u8,
    /// Member node ids decoded from the 200-bit bitmap.
    pub nodes: Vec<u8>,
    /// Revision counter.
    pub revision: u16,
}

#[derive(Debug, Deserialize)]
struct GroupParams {
    #[serde(alias = "groupId")]
    group_id: u8,
}

#[derive(Debug, Deserialize, Default)]
struct AllGroupsParams {
    #[serde(default, alias = "useFilter")]
    use_filter: bool,
    #[serde(default, alias = "groupType")]
    group_type: u8,
}

/// Encode `GW_GET_GROUP_INFORMATION_REQ`: the group index.
pub fn encode_group_query(params: &Value) -> Result<Vec<u8>> {
    let params: GroupParams = parse_params("GW_GET_GROUP_INFORMATION_REQ", params)?;
    Ok(vec![params.group_id])
}

/// Encode `GW_GET_ALL_GROUPS_INFORMATION_REQ`: filter flag plus group
/// type.
pub fn encode_all_groups_query(params: &Value) -> Result<Vec<u8>> {
    let params: AllGroupsParams = parse_params("GW_GET_ALL_GROUPS_INFORMATION_REQ", params)?;
    Ok(vec![u8::from(params.use_filter), params.group_type])
}

/// Decode `GW_GET_GROUP_INFORMATION_CFM`: status plus group id.
pub fn decode_group_info_cfm(payload: &[u8]) -> Result<Reply> {
    min_len("GW_GET_GROUP_INFORMATION_CFM", payload, 2)?;
    match payload[0] {
        0 => Ok(Reply::Empty),
        2 => Err(ProtoError::InvalidGroupId),
        _ => Err(ProtoError::RequestFailed),
    }
}

/// Decode `GW_GET_ALL_GROUPS_INFORMATION_CFM`: status plus group count.
pub fn decode_all_groups_cfm(payload: &[u8]) -> Result<Reply> {
    min_len("GW_GET_ALL_GROUPS_INFORMATION_CFM", payload, 2)?;
    match payload[0] {
        0 => Ok(Reply::GroupCount(Count { count: payload[1] })),
        _ => Err(ProtoError::RequestFailed),
    }
}

/// Decode a group information record.
///
/// The membership bitmap packs node `n` into bit `n % 8` of byte
/// `n / 8`.
pub fn decode_group_record(name: &'static str, payload: &[u8]) -> Result<GroupInfo> {
    min_len(name, payload, GROUP_RECORD)?;

    let bitmap = &payload[71..71 + BITMAP_BYTES];
    let mut nodes = Vec::new();
    for node in 0u8..200 {
        if bitmap[usize::from(node) / 8] & (1 << (node % 8)) != 0 {
            nodes.push(node);
        }
    }

    Ok(GroupInfo {
        group_id: payload[0],
        order: u16::from_be_bytes([payload[1], payload[2]]),
        placement: payload[3],
        name: text(&payload[4..68]),
        velocity: Velocity::from_raw(payload[68]),
        group_type: payload[69],
        object_count: payload[70],
        nodes,
        revision: u16::from_be_bytes([payload[96], payload[97]]),
    })
}
