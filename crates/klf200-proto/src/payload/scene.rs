//! Scene payloads: the scene list stream and scene activation.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ProtoError, Result};
use crate::payload::{command::SessionAccepted, expect_len, min_len, parse_params, text, Count, Reply};

/// Bytes per scene-list entry: id plus 64-byte name.
const SCENE_ENTRY: usize = 65;

/// One saved scene.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Scene {
    /// Scene id.
    pub scene_id: u8,
    /// UTF-8 scene name.
    pub name: String,
}

/// One `GW_GET_SCENE_LIST_NTF` frame: a batch of scenes plus the number
/// still to come.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SceneListChunk {
    /// Scenes in this frame.
    pub scenes: Vec<Scene>,
    /// Scenes remaining after this frame; zero ends the stream.
    pub remaining: u8,
}

#[derive(Debug, Deserialize)]
struct ActivateSceneParams {
    #[serde(alias = "sceneId")]
    scene_id: u8,
    #[serde(default, alias = "commandOriginator")]
    command_originator: Option<u8>,
    #[serde(default, alias = "priorityLevel")]
    priority_level: Option<u8>,
    #[serde(default)]
    velocity: u8,
}

#[derive(Debug, Deserialize)]
struct StopSceneParams {
    #[serde(alias = "sceneId")]
    scene_id: u8,
    #[serde(default, alias = "commandOriginator")]
    command_originator: Option<u8>,
    #[serde(default, alias = "priorityLevel")]
    priority_level: Option<u8>,
}

/// Decode `GW_GET_SCENE_LIST_CFM`: total scene count.
pub fn decode_scene_list_cfm(payload: &[u8]) -> Result<Reply> {
    expect_len("GW_GET_SCENE_LIST_CFM", payload, 1)?;
    Ok(Reply::SceneCount(Count { count: payload[0] }))
}

/// Decode `GW_GET_SCENE_LIST_NTF`.
///
/// Layout: scene count, `count × 65` scene bytes, remaining count.
pub fn decode_scene_list_ntf(payload: &[u8]) -> Result<Reply> {
    const NAME: &str = "GW_GET_SCENE_LIST_NTF";
    min_len(NAME, payload, 2)?;
    let count = payload[0] as usize;
    expect_len(NAME, payload, 2 + count * SCENE_ENTRY)?;

    let mut scenes = Vec::with_capacity(count);
    for chunk in payload[1..1 + count * SCENE_ENTRY].chunks_exact(SCENE_ENTRY) {
        scenes.push(Scene { scene_id: chunk[0], name: text(&chunk[1..]) });
    }
    let remaining = payload[payload.len() - 1];
    Ok(Reply::SceneList(SceneListChunk { scenes, remaining }))
}

/// Decode `GW_ACTIVATE_SCENE_CFM` / `GW_STOP_SCENE_CFM`.
///
/// Unlike the other session confirmations these lead with the status
/// byte: 0 accepted, 1 invalid parameter, 2 rejected.
pub fn decode_scene_session_cfm(name: &'static str, payload: &[u8]) -> Result<Reply> {
    expect_len(name, payload, 3)?;
    let session_id = u16::from_be_bytes([payload[1], payload[2]]);
    match payload[0] {
        0 => Ok(Reply::SessionAccepted(SessionAccepted { session_id })),
        1 => Err(ProtoError::InvalidParameter),
        _ => Err(ProtoError::RequestFailed),
    }
}

/// Encode `GW_ACTIVATE_SCENE_REQ`.
pub fn encode_activate_scene(params: &Value, session: u16) -> Result<Vec<u8>> {
    let params: ActivateSceneParams = parse_params("GW_ACTIVATE_SCENE_REQ", params)?;
    let mut out = Vec::with_capacity(6);
    out.extend_from_slice(&session.to_be_bytes());
    out.push(params.command_originator.unwrap_or(1));
    out.push(params.priority_level.unwrap_or(3));
    out.push(params.scene_id);
    out.push(params.velocity);
    Ok(out)
}

/// Encode `GW_STOP_SCENE_REQ`.
pub fn encode_stop_scene(params: &Value, session: u16) -> Result<Vec<u8>> {
    let params: StopSceneParams = parse_params("GW_STOP_SCENE_REQ", params)?;
    let mut out = Vec::with_capacity(5);
    out.extend_from_slice(&session.to_be_bytes());
    out.push(params.command_originator.unwrap_or(1));
    out.push(params.priority_level.unwrap_or(3));
    out.push(params.scene_id);
    Ok(out)
}
