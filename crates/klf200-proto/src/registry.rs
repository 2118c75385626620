//! Static command registry.
//!
//! One [`CommandSpec`] per command of the KLF 200 API (Technical
//! Specification 3.18). The table drives three lookups: by name (the
//! request API), by numeric id (inbound dispatch), and by structural
//! flags (session keying, stream completion, session termination).
//!
//! The registry is deliberately complete even where no payload codec
//! exists; a registered command without a codec still round-trips as a
//! raw notification.

use crate::error::{ProtoError, Result};

/// Direction and multiplicity of a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Client → gateway, exactly one per exchange.
    Request,
    /// Gateway → client, exactly one per request.
    Confirmation,
    /// Gateway → client, zero or more, solicited or broadcast.
    Notification,
}

/// Static description of one command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandSpec {
    /// 16-bit command id.
    pub id: u16,
    /// Canonical `GW_*` name.
    pub name: &'static str,
    /// Command role.
    pub role: Role,
    /// For confirmations and solicited notifications: the request that
    /// spawns them. `None` marks a broadcast notification.
    pub req: Option<u16>,
    /// Whether the command carries a 16-bit session id (requests assign
    /// one; confirmations and notifications reference it in their first
    /// two payload bytes).
    pub session: bool,
    /// For requests: completion is signalled by a terminal notification
    /// rather than by the confirmation.
    pub stream: bool,
    /// For notifications: receiving this frame ends its session.
    pub terminator: bool,
}

/// Well-known command ids referenced outside the table.
pub mod ids {
    #![allow(missing_docs)]

    pub const GW_ERROR_NTF: u16 = 0x0000;
    pub const GW_GET_VERSION_REQ: u16 = 0x0008;
    pub const GW_GET_VERSION_CFM: u16 = 0x0009;
    pub const GW_GET_PROTOCOL_VERSION_REQ: u16 = 0x000A;
    pub const GW_GET_PROTOCOL_VERSION_CFM: u16 = 0x000B;
    pub const GW_GET_STATE_REQ: u16 = 0x000C;
    pub const GW_GET_STATE_CFM: u16 = 0x000D;
    pub const GW_CS_GET_SYSTEMTABLE_DATA_REQ: u16 = 0x0100;
    pub const GW_CS_GET_SYSTEMTABLE_DATA_CFM: u16 = 0x0101;
    pub const GW_CS_GET_SYSTEMTABLE_DATA_NTF: u16 = 0x0102;
    pub const GW_GET_NODE_INFORMATION_REQ: u16 = 0x0200;
    pub const GW_GET_NODE_INFORMATION_CFM: u16 = 0x0201;
    pub const GW_GET_ALL_NODES_INFORMATION_REQ: u16 = 0x0202;
    pub const GW_GET_ALL_NODES_INFORMATION_CFM: u16 = 0x0203;
    pub const GW_GET_ALL_NODES_INFORMATION_NTF: u16 = 0x0204;
    pub const GW_GET_ALL_NODES_INFORMATION_FINISHED_NTF: u16 = 0x0205;
    pub const GW_NODE_INFORMATION_CHANGED_NTF: u16 = 0x020C;
    pub const GW_GET_NODE_INFORMATION_NTF: u16 = 0x0210;
    pub const GW_NODE_STATE_POSITION_CHANGED_NTF: u16 = 0x0211;
    pub const GW_GET_GROUP_INFORMATION_REQ: u16 = 0x0220;
    pub const GW_GET_GROUP_INFORMATION_CFM: u16 = 0x0221;
    pub const GW_GET_ALL_GROUPS_INFORMATION_REQ: u16 = 0x0229;
    pub const GW_GET_ALL_GROUPS_INFORMATION_CFM: u16 = 0x022A;
    pub const GW_GET_ALL_GROUPS_INFORMATION_NTF: u16 = 0x022B;
    pub const GW_GET_ALL_GROUPS_INFORMATION_FINISHED_NTF: u16 = 0x022C;
    pub const GW_GET_GROUP_INFORMATION_NTF: u16 = 0x0230;
    pub const GW_HOUSE_STATUS_MONITOR_ENABLE_REQ: u16 = 0x0240;
    pub const GW_HOUSE_STATUS_MONITOR_DISABLE_REQ: u16 = 0x0242;
    pub const GW_COMMAND_SEND_REQ: u16 = 0x0300;
    pub const GW_COMMAND_SEND_CFM: u16 = 0x0301;
    pub const GW_COMMAND_RUN_STATUS_NTF: u16 = 0x0302;
    pub const GW_COMMAND_REMAINING_TIME_NTF: u16 = 0x0303;
    pub const GW_SESSION_FINISHED_NTF: u16 = 0x0304;
    pub const GW_STATUS_REQUEST_REQ: u16 = 0x0305;
    pub const GW_STATUS_REQUEST_CFM: u16 = 0x0306;
    pub const GW_STATUS_REQUEST_NTF: u16 = 0x0307;
    pub const GW_WINK_SEND_REQ: u16 = 0x0308;
    pub const GW_WINK_SEND_CFM: u16 = 0x0309;
    pub const GW_WINK_SEND_NTF: u16 = 0x030A;
    pub const GW_GET_SCENE_LIST_REQ: u16 = 0x040C;
    pub const GW_GET_SCENE_LIST_CFM: u16 = 0x040D;
    pub const GW_GET_SCENE_LIST_NTF: u16 = 0x040E;
    pub const GW_ACTIVATE_SCENE_REQ: u16 = 0x0412;
    pub const GW_ACTIVATE_SCENE_CFM: u16 = 0x0413;
    pub const GW_STOP_SCENE_REQ: u16 = 0x0415;
    pub const GW_STOP_SCENE_CFM: u16 = 0x0416;
    pub const GW_ACTIVATE_PRODUCTGROUP_REQ: u16 = 0x0447;
    pub const GW_ACTIVATE_PRODUCTGROUP_CFM: u16 = 0x0448;
    pub const GW_SET_UTC_REQ: u16 = 0x2000;
    pub const GW_RTC_SET_TIME_ZONE_REQ: u16 = 0x2002;
    pub const GW_GET_LOCAL_TIME_REQ: u16 = 0x2004;
    pub const GW_GET_LOCAL_TIME_CFM: u16 = 0x2005;
    pub const GW_PASSWORD_ENTER_REQ: u16 = 0x3000;
    pub const GW_PASSWORD_ENTER_CFM: u16 = 0x3001;
    pub const GW_PASSWORD_CHANGE_REQ: u16 = 0x3002;
    pub const GW_PASSWORD_CHANGE_CFM: u16 = 0x3003;
    pub const GW_PASSWORD_CHANGE_NTF: u16 = 0x3004;
}

const fn req(id: u16, name: &'static str) -> CommandSpec {
    CommandSpec { id, name, role: Role::Request, req: None, session: false, stream: false, terminator: false }
}

const fn req_stream(id: u16, name: &'static str) -> CommandSpec {
    CommandSpec { id, name, role: Role::Request, req: None, session: false, stream: true, terminator: false }
}

const fn req_session(id: u16, name: &'static str) -> CommandSpec {
    CommandSpec { id, name, role: Role::Request, req: None, session: true, stream: true, terminator: false }
}

const fn cfm(id: u16, name: &'static str, spawned_by: u16) -> CommandSpec {
    CommandSpec { id, name, role: Role::Confirmation, req: Some(spawned_by), session: false, stream: false, terminator: false }
}

const fn cfm_session(id: u16, name: &'static str, spawned_by: u16) -> CommandSpec {
    CommandSpec { id, name, role: Role::Confirmation, req: Some(spawned_by), session: true, stream: false, terminator: false }
}

const fn ntf(id: u16, name: &'static str, spawned_by: u16) -> CommandSpec {
    CommandSpec { id, name, role: Role::Notification, req: Some(spawned_by), session: false, stream: false, terminator: false }
}

const fn ntf_end(id: u16, name: &'static str, spawned_by: u16) -> CommandSpec {
    CommandSpec { id, name, role: Role::Notification, req: Some(spawned_by), session: false, stream: false, terminator: true }
}

const fn ntf_session(id: u16, name: &'static str, spawned_by: u16) -> CommandSpec {
    CommandSpec { id, name, role: Role::Notification, req: Some(spawned_by), session: true, stream: false, terminator: false }
}

const fn ntf_session_end(id: u16, name: &'static str, spawned_by: u16) -> CommandSpec {
    CommandSpec { id, name, role: Role::Notification, req: Some(spawned_by), session: true, stream: false, terminator: true }
}

const fn broadcast(id: u16, name: &'static str) -> CommandSpec {
    CommandSpec { id, name, role: Role::Notification, req: None, session: false, stream: false, terminator: false }
}

/// The complete command table, sorted by id.
#[rustfmt::skip]
pub const COMMANDS: &[CommandSpec] = &[
    broadcast(0x0000, "GW_ERROR_NTF"),
    req(0x0001, "GW_REBOOT_REQ"),
    cfm(0x0002, "GW_REBOOT_CFM", 0x0001),
    req(0x0003, "GW_SET_FACTORY_DEFAULT_REQ"),
    cfm(0x0004, "GW_SET_FACTORY_DEFAULT_CFM", 0x0003),
    req(0x0008, "GW_GET_VERSION_REQ"),
    cfm(0x0009, "GW_GET_VERSION_CFM", 0x0008),
    req(0x000A, "GW_GET_PROTOCOL_VERSION_REQ"),
    cfm(0x000B, "GW_GET_PROTOCOL_VERSION_CFM", 0x000A),
    req(0x000C, "GW_GET_STATE_REQ"),
    cfm(0x000D, "GW_GET_STATE_CFM", 0x000C),
    req(0x000E, "GW_LEAVE_LEARN_STATE_REQ"),
    cfm(0x000F, "GW_LEAVE_LEARN_STATE_CFM", 0x000E),
    req(0x00E0, "GW_GET_NETWORK_SETUP_REQ"),
    cfm(0x00E1, "GW_GET_NETWORK_SETUP_CFM", 0x00E0),
    req(0x00E2, "GW_SET_NETWORK_SETUP_REQ"),
    cfm(0x00E3, "GW_SET_NETWORK_SETUP_CFM", 0x00E2),
    req_stream(0x0100, "GW_CS_GET_SYSTEMTABLE_DATA_REQ"),
    cfm(0x0101, "GW_CS_GET_SYSTEMTABLE_DATA_CFM", 0x0100),
    ntf(0x0102, "GW_CS_GET_SYSTEMTABLE_DATA_NTF", 0x0100),
    req_stream(0x0103, "GW_CS_DISCOVER_NODES_REQ"),
    cfm(0x0104, "GW_CS_DISCOVER_NODES_CFM", 0x0103),
    ntf_end(0x0105, "GW_CS_DISCOVER_NODES_NTF", 0x0103),
    req(0x0106, "GW_CS_REMOVE_NODES_REQ"),
    cfm(0x0107, "GW_CS_REMOVE_NODES_CFM", 0x0106),
    req(0x0108, "GW_CS_VIRGIN_STATE_REQ"),
    cfm(0x0109, "GW_CS_VIRGIN_STATE_CFM", 0x0108),
    req_stream(0x010A, "GW_CS_CONTROLLER_COPY_REQ"),
    cfm(0x010B, "GW_CS_CONTROLLER_COPY_CFM", 0x010A),
    ntf_end(0x010C, "GW_CS_CONTROLLER_COPY_NTF", 0x010A),
    ntf_end(0x010D, "GW_CS_CONTROLLER_COPY_CANCEL_NTF", 0x010A),
    req_stream(0x010E, "GW_CS_RECEIVE_KEY_REQ"),
    cfm(0x010F, "GW_CS_RECEIVE_KEY_CFM", 0x010E),
    ntf_end(0x0110, "GW_CS_RECEIVE_KEY_NTF", 0x010E),
    broadcast(0x0111, "GW_CS_PGC_JOB_NTF"),
    broadcast(0x0112, "GW_CS_SYSTEM_TABLE_UPDATE_NTF"),
    req_stream(0x0113, "GW_CS_GENERATE_NEW_KEY_REQ"),
    cfm(0x0114, "GW_CS_GENERATE_NEW_KEY_CFM", 0x0113),
    ntf_end(0x0115, "GW_CS_GENERATE_NEW_KEY_NTF", 0x0113),
    req_stream(0x0116, "GW_CS_REPAIR_KEY_REQ"),
    cfm(0x0117, "GW_CS_REPAIR_KEY_CFM", 0x0116),
    ntf_end(0x0118, "GW_CS_REPAIR_KEY_NTF", 0x0116),
    req_stream(0x0119, "GW_CS_ACTIVATE_CONFIGURATION_MODE_REQ"),
    cfm(0x011A, "GW_CS_ACTIVATE_CONFIGURATION_MODE_CFM", 0x0119),
    ntf_end(0x011B, "GW_CS_ACTIVATE_CONFIGURATION_MODE_NTF", 0x0119),
    req_stream(0x0200, "GW_GET_NODE_INFORMATION_REQ"),
    cfm(0x0201, "GW_GET_NODE_INFORMATION_CFM", 0x0200),
    req_stream(0x0202, "GW_GET_ALL_NODES_INFORMATION_REQ"),
    cfm(0x0203, "GW_GET_ALL_NODES_INFORMATION_CFM", 0x0202),
    ntf(0x0204, "GW_GET_ALL_NODES_INFORMATION_NTF", 0x0202),
    ntf_end(0x0205, "GW_GET_ALL_NODES_INFORMATION_FINISHED_NTF", 0x0202),
    req(0x0206, "GW_SET_NODE_VARIATION_REQ"),
    cfm(0x0207, "GW_SET_NODE_VARIATION_CFM", 0x0206),
    req(0x0208, "GW_SET_NODE_NAME_REQ"),
    cfm(0x0209, "GW_SET_NODE_NAME_CFM", 0x0208),
    req(0x020A, "GW_SET_NODE_VELOCITY_REQ"),
    cfm(0x020B, "GW_SET_NODE_VELOCITY_CFM", 0x020A),
    broadcast(0x020C, "GW_NODE_INFORMATION_CHANGED_NTF"),
    req(0x020D, "GW_SET_NODE_ORDER_AND_PLACEMENT_REQ"),
    cfm(0x020E, "GW_SET_NODE_ORDER_AND_PLACEMENT_CFM", 0x020D),
    ntf_end(0x0210, "GW_GET_NODE_INFORMATION_NTF", 0x0200),
    broadcast(0x0211, "GW_NODE_STATE_POSITION_CHANGED_NTF"),
    req_stream(0x0220, "GW_GET_GROUP_INFORMATION_REQ"),
    cfm(0x0221, "GW_GET_GROUP_INFORMATION_CFM", 0x0220),
    req(0x0222, "GW_SET_GROUP_INFORMATION_REQ"),
    cfm(0x0223, "GW_SET_GROUP_INFORMATION_CFM", 0x0222),
    broadcast(0x0224, "GW_GROUP_INFORMATION_CHANGED_NTF"),
    req(0x0225, "GW_DELETE_GROUP_REQ"),
    cfm(0x0226, "GW_DELETE_GROUP_CFM", 0x0225),
    req(0x0227, "GW_NEW_GROUP_REQ"),
    cfm(0x0228, "GW_NEW_GROUP_CFM", 0x0227),
    req_stream(0x0229, "GW_GET_ALL_GROUPS_INFORMATION_REQ"),
    cfm(0x022A, "GW_GET_ALL_GROUPS_INFORMATION_CFM", 0x0229),
    ntf(0x022B, "GW_GET_ALL_GROUPS_INFORMATION_NTF", 0x0229),
    ntf_end(0x022C, "GW_GET_ALL_GROUPS_INFORMATION_FINISHED_NTF", 0x0229),
    broadcast(0x022D, "GW_GROUP_DELETED_NTF"),
    ntf_end(0x0230, "GW_GET_GROUP_INFORMATION_NTF", 0x0220),
    req(0x0240, "GW_HOUSE_STATUS_MONITOR_ENABLE_REQ"),
    cfm(0x0241, "GW_HOUSE_STATUS_MONITOR_ENABLE_CFM", 0x0240),
    req(0x0242, "GW_HOUSE_STATUS_MONITOR_DISABLE_REQ"),
    cfm(0x0243, "GW_HOUSE_STATUS_MONITOR_DISABLE_CFM", 0x0242),
    req_session(0x0300, "GW_COMMAND_SEND_REQ"),
    cfm_session(0x0301, "GW_COMMAND_SEND_CFM", 0x0300),
    ntf_session(0x0302, "GW_COMMAND_RUN_STATUS_NTF", 0x0300),
    ntf_session(0x0303, "GW_COMMAND_REMAINING_TIME_NTF", 0x0300),
    ntf_session_end(0x0304, "GW_SESSION_FINISHED_NTF", 0x0300),
    req_session(0x0305, "GW_STATUS_REQUEST_REQ"),
    cfm_session(0x0306, "GW_STATUS_REQUEST_CFM", 0x0305),
    ntf_session(0x0307, "GW_STATUS_REQUEST_NTF", 0x0305),
    req_session(0x0308, "GW_WINK_SEND_REQ"),
    cfm_session(0x0309, "GW_WINK_SEND_CFM", 0x0308),
    ntf_session(0x030A, "GW_WINK_SEND_NTF", 0x0308),
    req_session(0x0310, "GW_SET_LIMITATION_REQ"),
    cfm_session(0x0311, "GW_SET_LIMITATION_CFM", 0x0310),
    req_session(0x0312, "GW_GET_LIMITATION_STATUS_REQ"),
    cfm_session(0x0313, "GW_GET_LIMITATION_STATUS_CFM", 0x0312),
    ntf_session(0x0314, "GW_LIMITATION_STATUS_NTF", 0x0312),
    req_session(0x0320, "GW_MODE_SEND_REQ"),
    cfm_session(0x0321, "GW_MODE_SEND_CFM", 0x0320),
    ntf_session(0x0322, "GW_MODE_SEND_NTF", 0x0320),
    req_stream(0x0400, "GW_INITIALIZE_SCENE_REQ"),
    cfm(0x0401, "GW_INITIALIZE_SCENE_CFM", 0x0400),
    ntf_end(0x0402, "GW_INITIALIZE_SCENE_NTF", 0x0400),
    req(0x0403, "GW_INITIALIZE_SCENE_CANCEL_REQ"),
    cfm(0x0404, "GW_INITIALIZE_SCENE_CANCEL_CFM", 0x0403),
    req_stream(0x0405, "GW_RECORD_SCENE_REQ"),
    cfm(0x0406, "GW_RECORD_SCENE_CFM", 0x0405),
    ntf_end(0x0407, "GW_RECORD_SCENE_NTF", 0x0405),
    req(0x0408, "GW_DELETE_SCENE_REQ"),
    cfm(0x0409, "GW_DELETE_SCENE_CFM", 0x0408),
    req(0x040A, "GW_RENAME_SCENE_REQ"),
    cfm(0x040B, "GW_RENAME_SCENE_CFM", 0x040A),
    req_stream(0x040C, "GW_GET_SCENE_LIST_REQ"),
    cfm(0x040D, "GW_GET_SCENE_LIST_CFM", 0x040C),
    ntf(0x040E, "GW_GET_SCENE_LIST_NTF", 0x040C),
    req_stream(0x040F, "GW_GET_SCENE_INFORMATION_REQ"),
    cfm(0x0410, "GW_GET_SCENE_INFORMATION_CFM", 0x040F),
    ntf_end(0x0411, "GW_GET_SCENE_INFORMATION_NTF", 0x040F),
    req_session(0x0412, "GW_ACTIVATE_SCENE_REQ"),
    cfm_session(0x0413, "GW_ACTIVATE_SCENE_CFM", 0x0412),
    req_session(0x0415, "GW_STOP_SCENE_REQ"),
    cfm_session(0x0416, "GW_STOP_SCENE_CFM", 0x0415),
    broadcast(0x0419, "GW_SCENE_INFORMATION_CHANGED_NTF"),
    req_session(0x0447, "GW_ACTIVATE_PRODUCTGROUP_REQ"),
    cfm_session(0x0448, "GW_ACTIVATE_PRODUCTGROUP_CFM", 0x0447),
    ntf_session(0x0449, "GW_ACTIVATE_PRODUCTGROUP_NTF", 0x0447),
    req(0x0460, "GW_GET_CONTACT_INPUT_LINK_LIST_REQ"),
    cfm(0x0461, "GW_GET_CONTACT_INPUT_LINK_LIST_CFM", 0x0460),
    req(0x0462, "GW_SET_CONTACT_INPUT_LINK_REQ"),
    cfm(0x0463, "GW_SET_CONTACT_INPUT_LINK_CFM", 0x0462),
    req(0x0464, "GW_REMOVE_CONTACT_INPUT_LINK_REQ"),
    cfm(0x0465, "GW_REMOVE_CONTACT_INPUT_LINK_CFM", 0x0464),
    req(0x0500, "GW_GET_ACTIVATION_LOG_HEADER_REQ"),
    cfm(0x0501, "GW_GET_ACTIVATION_LOG_HEADER_CFM", 0x0500),
    req(0x0502, "GW_CLEAR_ACTIVATION_LOG_REQ"),
    cfm(0x0503, "GW_CLEAR_ACTIVATION_LOG_CFM", 0x0502),
    req(0x0504, "GW_GET_ACTIVATION_LOG_LINE_REQ"),
    cfm(0x0505, "GW_GET_ACTIVATION_LOG_LINE_CFM", 0x0504),
    broadcast(0x0506, "GW_ACTIVATION_LOG_UPDATED_NTF"),
    req(0x0507, "GW_GET_MULTIPLE_ACTIVATION_LOG_LINES_REQ"),
    ntf(0x0508, "GW_GET_MULTIPLE_ACTIVATION_LOG_LINES_NTF", 0x0507),
    cfm(0x0509, "GW_GET_MULTIPLE_ACTIVATION_LOG_LINES_CFM", 0x0507),
    req(0x2000, "GW_SET_UTC_REQ"),
    cfm(0x2001, "GW_SET_UTC_CFM", 0x2000),
    req(0x2002, "GW_RTC_SET_TIME_ZONE_REQ"),
    cfm(0x2003, "GW_RTC_SET_TIME_ZONE_CFM", 0x2002),
    req(0x2004, "GW_GET_LOCAL_TIME_REQ"),
    cfm(0x2005, "GW_GET_LOCAL_TIME_CFM", 0x2004),
    req(0x3000, "GW_PASSWORD_ENTER_REQ"),
    cfm(0x3001, "GW_PASSWORD_ENTER_CFM", 0x3000),
    req(0x3002, "GW_PASSWORD_CHANGE_REQ"),
    cfm(0x3003, "GW_PASSWORD_CHANGE_CFM", 0x3002),
    broadcast(0x3004, "GW_PASSWORD_CHANGE_NTF"),
];

/// Look up a command by numeric id.
#[must_use]
pub fn by_id(id: u16) -> Option<&'static CommandSpec> {
    COMMANDS
        .binary_search_by_key(&id, |spec| spec.id)
        .ok()
        .map(|index| &COMMANDS[index])
}

/// Look up a command by canonical name.
#[must_use]
pub fn by_name(name: &str) -> Option<&'static CommandSpec> {
    COMMANDS.iter().find(|spec| spec.name == name)
}

/// Look up a request by name, rejecting other roles.
///
/// # Errors
///
/// `UnknownCommandName` if absent, `NotARequest` if the name resolves
/// to a confirmation or notification.
pub fn request_by_name(name: &str) -> Result<&'static CommandSpec> {
    let spec = by_name(name).ok_or_else(|| ProtoError::UnknownCommandName(name.to_owned()))?;
    if spec.role != Role::Request {
        return Err(ProtoError::NotARequest(spec.name));
    }
    Ok(spec)
}
