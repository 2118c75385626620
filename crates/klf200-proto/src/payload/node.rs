//! Node payloads: the system table stream, node information records,
//! and the broadcast state notifications.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ProtoError, Result};
use crate::payload::{expect_len, min_len, parse_params, text, Count, Reply};
use crate::position::{position_at, Position, Velocity};

/// Bytes per system-table entry.
const SYSTEM_TABLE_ENTRY: usize = 11;
/// Size of a node information record.
const NODE_RECORD: usize = 124;

/// One actuator in the gateway's system table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SystemTableEntry {
    /// System table index (0..=199).
    pub index: u8,
    /// io-homecontrol actuator address, three bytes hex.
    pub address: String,
    /// Raw actuator type word (type and subtype).
    pub actuator_type: u16,
    /// Power-mode bitfield as reported by the actuator.
    pub power_mode: u8,
    /// io manufacturer id.
    pub manufacturer: u8,
    /// Backbone address, three bytes hex.
    pub backbone: String,
}

#[cfg(test)]
impl SystemTableEntry {
    pub(crate) fn test_entry(index: u8) -> Self {
        Self {
            index,
            address: "000000".to_owned(),
            actuator_type: 0,
            power_mode: 0,
            manufacturer: 0,
            backbone: "000000".to_owned(),
        }
    }
}

/// One `GW_CS_GET_SYSTEMTABLE_DATA_NTF` frame: a batch of entries plus
/// the number of entries still to come.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SystemTableChunk {
    /// Entries in this frame.
    pub entries: Vec<SystemTableEntry>,
    /// Entries remaining after this frame; zero ends the stream.
    pub remaining: u8,
}

/// A node information record (`GW_GET_NODE_INFORMATION_NTF` /
/// `GW_GET_ALL_NODES_INFORMATION_NTF`).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeInfo {
    /// Node id (0..=199).
    pub node_id: u8,
    /// Sort order in the gateway UI.
    pub order: u16,
    /// Room/placement index.
    pub placement: u8,
    /// UTF-8 node name.
    pub name: String,
    /// Configured velocity.
    pub velocity: Velocity,
    /// Raw node type word (type and subtype).
    pub node_type: u16,
    /// Product group.
    pub product_group: u8,
    /// Product type.
    pub product_type: u8,
    /// Node variation (kip window, flat roof, …).
    pub variation: u8,
    /// Power mode.
    pub power_mode: u8,
    /// Firmware build number.
    pub build_number: u8,
    /// Serial number, eight bytes hex.
    pub serial: String,
    /// Operating state.
    pub state: u8,
    /// Current position of the main parameter.
    pub current_position: Position,
    /// Target position of the main parameter.
    pub target: Position,
    /// Functional parameter 1.
    pub fp1: Position,
    /// Functional parameter 2.
    pub fp2: Position,
    /// Functional parameter 3.
    pub fp3: Position,
    /// Functional parameter 4.
    pub fp4: Position,
    /// Seconds until the current movement completes.
    pub remaining_time: u16,
    /// Timestamp of the last known position, epoch seconds.
    pub timestamp: u32,
    /// Number of configured alias entries.
    pub alias_count: u8,
}

/// Broadcast `GW_NODE_STATE_POSITION_CHANGED_NTF`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodePositionChanged {
    /// Node id.
    pub node_id: u8,
    /// Operating state.
    pub state: u8,
    /// Current position of the main parameter.
    pub current_position: Position,
    /// Target position of the main parameter.
    pub target: Position,
    /// Functional parameter 1.
    pub fp1: Position,
    /// Functional parameter 2.
    pub fp2: Position,
    /// Functional parameter 3.
    pub fp3: Position,
    /// Functional parameter 4.
    pub fp4: Position,
    /// Seconds until the current movement completes.
    pub remaining_time: u16,
    /// Timestamp of the update, epoch seconds.
    pub timestamp: u32,
}

/// Broadcast `GW_NODE_INFORMATION_CHANGED_NTF`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeInfoChanged {
    /// Node id.
    pub node_id: u8,
    /// UTF-8 node name.
    pub name: String,
    /// Sort order in the gateway UI.
    pub order: u16,
    /// Room/placement index.
    pub placement: u8,
    /// Node variation.
    pub variation: u8,
}

#[derive(Debug, Deserialize)]
struct NodeParams {
    #[serde(alias = "nodeId")]
    node_id: u8,
}

fn hex_bytes(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// Encode `GW_GET_NODE_INFORMATION_REQ`: the node index.
pub fn encode_node_query(params: &Value) -> Result<Vec<u8>> {
    let params: NodeParams = parse_params("GW_GET_NODE_INFORMATION_REQ", params)?;
    Ok(vec![params.node_id])
}

/// Decode `GW_CS_GET_SYSTEMTABLE_DATA_NTF`.
///
/// Layout: entry count, `count × 11` entry bytes, remaining count.
pub fn decode_system_table_ntf(payload: &[u8]) -> Result<Reply> {
    const NAME: &str = "GW_CS_GET_SYSTEMTABLE_DATA_NTF";
    min_len(NAME, payload, 2)?;
    let count = payload[0] as usize;
    expect_len(NAME, payload, 2 + count * SYSTEM_TABLE_ENTRY)?;

    let mut entries = Vec::with_capacity(count);
    for chunk in payload[1..1 + count * SYSTEM_TABLE_ENTRY].chunks_exact(SYSTEM_TABLE_ENTRY) {
        entries.push(SystemTableEntry {
            index: chunk[0],
            address: hex_bytes(&chunk[1..4]),
            actuator_type: u16::from_be_bytes([chunk[4], chunk[5]]),
            power_mode: chunk[6],
            manufacturer: chunk[7],
            backbone: hex_bytes(&chunk[8..11]),
        });
    }
    let remaining = payload[payload.len() - 1];
    Ok(Reply::SystemTable(SystemTableChunk { entries, remaining }))
}

/// Decode `GW_GET_NODE_INFORMATION_CFM`: status plus node id.
pub fn decode_node_info_cfm(payload: &[u8]) -> Result<Reply> {
    expect_len("GW_GET_NODE_INFORMATION_CFM", payload, 2)?;
    match payload[0] {
        0 => Ok(Reply::Empty),
        2 => Err(ProtoError::InvalidNodeId),
        _ => Err(ProtoError::RequestFailed),
    }
}

/// Decode `GW_GET_ALL_NODES_INFORMATION_CFM`: status plus node count.
pub fn decode_all_nodes_cfm(payload: &[u8]) -> Result<Reply> {
    expect_len("GW_GET_ALL_NODES_INFORMATION_CFM", payload, 2)?;
    match payload[0] {
        0 => Ok(Reply::NodeCount(Count { count: payload[1] })),
        _ => Err(ProtoError::EmptySystemTable),
    }
}

/// Decode a 124-byte node information record.
pub fn decode_node_record(name: &'static str, payload: &[u8]) -> Result<NodeInfo> {
    expect_len(name, payload, NODE_RECORD)?;
    Ok(NodeInfo {
        node_id: payload[0],
        order: u16::from_be_bytes([payload[1], payload[2]]),
        placement: payload[3],
        name: text(&payload[4..68]),
        velocity: Velocity::from_raw(payload[68]),
        node_type: u16::from_be_bytes([payload[69], payload[70]]),
        product_group: payload[71],
        product_type: payload[72],
        variation: payload[73],
        power_mode: payload[74],
        build_number: payload[75],
        serial: hex_bytes(&payload[76..84]),
        state: payload[84],
        current_position: position_at(name, payload, 85)?,
        target: position_at(name, payload, 87)?,
        fp1: position_at(name, payload, 89)?,
        fp2: position_at(name, payload, 91)?,
        fp3: position_at(name, payload, 93)?,
        fp4: position_at(name, payload, 95)?,
        remaining_time: u16::from_be_bytes([payload[97], payload[98]]),
        timestamp: u32::from_be_bytes([payload[99], payload[100], payload[101], payload[102]]),
        alias_count: payload[103],
        // The 20-byte alias array that follows is not decoded.
    })
}

/// Decode broadcast `GW_NODE_STATE_POSITION_CHANGED_NTF` (20 bytes).
pub fn decode_position_changed_ntf(payload: &[u8]) -> Result<Reply> {
    const NAME: &str = "GW_NODE_STATE_POSITION_CHANGED_NTF";
    expect_len(NAME, payload, 20)?;
    Ok(Reply::NodePositionChanged(NodePositionChanged {
        node_id: payload[0],
        state: payload[1],
        current_position: position_at(NAME, payload, 2)?,
        target: position_at(NAME, payload, 4)?,
        fp1: position_at(NAME, payload, 6)?,
        fp2: position_at(NAME, payload, 8)?,
        fp3: position_at(NAME, payload, 10)?,
        fp4: position_at(NAME, payload, 12)?,
        remaining_time: u16::from_be_bytes([payload[14], payload[15]]),
        timestamp: u32::from_be_bytes([payload[16], payload[17], payload[18], payload[19]]),
    }))
}

/// Decode broadcast `GW_NODE_INFORMATION_CHANGED_NTF` (69 bytes).
pub fn decode_info_changed_ntf(payload: &[u8]) -> Result<Reply> {
    expect_len("GW_NODE_INFORMATION_CHANGED_NTF", payload, 69)?;
    Ok(Reply::NodeInfoChanged(NodeInfoChanged {
        node_id: payload[0],
        name: text(&payload[1..65]),
        order: u16::from_be_bytes([payload[65], payload[66]]),
        placement: payload[67],
        variation: payload[68],
    }))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn system_table_payload(indices: &[u8], remaining: u8) -> Vec<u8> {
        let mut payload = vec![indices.len() as u8];
        for &index in indices {
            let mut entry = [0u8; SYSTEM_TABLE_ENTRY];
            entry[0] = index;
            entry[1..4].copy_from_slice(&[0x0A, 0x1B, 0x2C]);
            entry[4..6].copy_from_slice(&0x0040u16.to_be_bytes());
            entry[7] = 5;
            payload.extend_from_slice(&entry);
        }
        payload.push(remaining);
        payload
    }

    #[test]
    fn system_table_chunk() {
        let reply = decode_system_table_ntf(&system_table_payload(&[0, 1], 1)).unwrap();
        let Reply::SystemTable(chunk) = reply else { panic!("wrong variant") };
        assert_eq!(chunk.entries.len(), 2);
        assert_eq!(chunk.entries[0].address, "0a1b2c");
        assert_eq!(chunk.entries[0].actuator_type, 0x0040);
        assert_eq!(chunk.entries[0].manufacturer, 5);
        assert_eq!(chunk.remaining, 1);
        assert!(!Reply::SystemTable(chunk).finishes_stream());
    }

    #[test]
    fn system_table_length_must_match_count() {
        let mut payload = system_table_payload(&[0], 0);
        payload.push(0xFF);
        assert!(matches!(
            decode_system_table_ntf(&payload),
            Err(ProtoError::PayloadLength { .. })
        ));
    }

    #[test]
    fn node_cfm_statuses() {
        assert_eq!(decode_node_info_cfm(&[0, 3]).unwrap(), Reply::Empty);
        assert_eq!(decode_node_info_cfm(&[2, 0]), Err(ProtoError::InvalidNodeId));
        assert_eq!(decode_node_info_cfm(&[1, 0]), Err(ProtoError::RequestFailed));
        assert_eq!(decode_all_nodes_cfm(&[1, 0]), Err(ProtoError::EmptySystemTable));
        let Reply::NodeCount(count) = decode_all_nodes_cfm(&[0, 7]).unwrap() else {
            panic!("wrong variant")
        };
        assert_eq!(count.count, 7);
    }

    fn node_record() -> Vec<u8> {
        let mut payload = vec![0u8; NODE_RECORD];
        payload[0] = 4; // node id
        payload[1..3].copy_from_slice(&2u16.to_be_bytes());
        payload[4..11].copy_from_slice(b"Bedroom");
        payload[68] = 1; // slow
        payload[69..71].copy_from_slice(&0x0101u16.to_be_bytes());
        payload[76..84].copy_from_slice(&[0, 1, 2, 3, 4, 5, 6, 7]);
        payload[85..87].copy_from_slice(&0xC800u16.to_be_bytes()); // 100%
        payload[87..89].copy_from_slice(&0xF7FFu16.to_be_bytes()); // unknown
        payload[99..103].copy_from_slice(&1_650_000_000u32.to_be_bytes());
        payload[103] = 1;
        payload
    }

    #[test]
    fn node_record_fields() {
        let node = decode_node_record("GW_GET_NODE_INFORMATION_NTF", &node_record()).unwrap();
        assert_eq!(node.node_id, 4);
        assert_eq!(node.name, "Bedroom");
        assert_eq!(node.velocity, Velocity::Slow);
        assert_eq!(node.serial, "0001020304050607");
        assert_eq!(node.current_position, Position::Percent(100));
        assert_eq!(node.target, Position::Unknown);
        assert_eq!(node.timestamp, 1_650_000_000);
        assert_eq!(node.alias_count, 1);
    }

    #[test]
    fn node_record_length_is_exact() {
        assert!(matches!(
            decode_node_record("GW_GET_NODE_INFORMATION_NTF", &[0u8; 123]),
            Err(ProtoError::PayloadLength { .. })
        ));
    }

    #[test]
    fn node_query_params() {
        assert_eq!(encode_node_query(&json!({"node_id": 9})).unwrap(), vec![9]);
        assert_eq!(encode_node_query(&json!({"nodeId": 9})).unwrap(), vec![9]);
        assert!(encode_node_query(&json!({})).is_err());
    }

    #[test]
    fn position_changed_broadcast() {
        let mut payload = vec![0u8; 20];
        payload[0] = 3;
        payload[2..4].copy_from_slice(&0x6400u16.to_be_bytes()); // 50%
        let Reply::NodePositionChanged(update) = decode_position_changed_ntf(&payload).unwrap()
        else {
            panic!("wrong variant")
        };
        assert_eq!(update.node_id, 3);
        assert_eq!(update.current_position, Position::Percent(50));
    }
}
