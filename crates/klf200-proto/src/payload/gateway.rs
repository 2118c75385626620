//! Gateway housekeeping payloads: passwords, versions, state, clock.

use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

use crate::error::{ProtoError, Result};
use crate::payload::{encode_text, expect_len, min_len, parse_params, text, Reply};

/// Width of a password field on the wire.
const PASSWORD_WIDTH: usize = 32;
/// Width of the RTC time-zone string.
const TIME_ZONE_WIDTH: usize = 64;

/// `GW_GET_VERSION_CFM` — firmware and hardware identification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Version {
    /// Six-part software version, rendered `a.b.c.d.e.f`.
    pub software: String,
    /// Hardware revision.
    pub hardware: u8,
    /// Product group (14 for the KLF 200).
    pub product_group: u8,
    /// Product type (3 for the KLF 200).
    pub product_type: u8,
}

/// `GW_GET_PROTOCOL_VERSION_CFM` — wire protocol version.
///
/// Serializes as the dotted string the gateway documentation uses
/// (`"3.18"`), not as a struct.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProtocolVersion {
    /// Major version word.
    pub major: u16,
    /// Minor version word.
    pub minor: u16,
}

impl std::fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

impl Serialize for ProtocolVersion {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// `GW_GET_STATE_CFM` — gateway state machine snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GatewayState {
    /// Main state (0 test, 1 idle, 2 learn, …).
    pub state: u8,
    /// Sub-state within the main state.
    pub sub_state: u8,
    /// Raw state data word.
    pub state_data: u32,
}

/// `GW_GET_LOCAL_TIME_CFM` — the gateway's clock.
///
/// Field semantics follow `struct tm`: `month` is 0-based, `week_day`
/// counts from Sunday, `year` is years since 1900.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LocalTime {
    /// Seconds since the UNIX epoch, UTC.
    pub utc: u32,
    /// Second, 0..=61.
    pub second: u8,
    /// Minute, 0..=59.
    pub minute: u8,
    /// Hour, 0..=23.
    pub hour: u8,
    /// Day of month, 1..=31.
    pub day_of_month: u8,
    /// Month since January, 0..=11.
    pub month: u8,
    /// Years since 1900.
    pub year: u16,
    /// Days since Sunday, 0..=6.
    pub week_day: u8,
    /// Days since January 1st, 0..=365.
    pub day_of_year: u16,
    /// Daylight saving flag: 1 in effect, 0 not, other unknown.
    pub daylight_saving: u8,
}

/// `GW_PASSWORD_CHANGE_NTF` — the new password, echoed to every other
/// connected client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PasswordChanged {
    /// The password now in effect.
    pub password: String,
}

#[derive(Debug, Deserialize)]
struct PasswordParams {
    password: String,
}

#[derive(Debug, Deserialize)]
struct PasswordChangeParams {
    #[serde(alias = "oldPassword")]
    old_password: String,
    #[serde(alias = "newPassword")]
    new_password: String,
}

#[derive(Debug, Deserialize)]
struct UtcParams {
    #[serde(alias = "time")]
    utc: u32,
}

#[derive(Debug, Deserialize)]
struct TimeZoneParams {
    #[serde(alias = "timeZone")]
    time_zone: String,
}

/// Encode `GW_PASSWORD_ENTER_REQ`: one zero-padded 32-byte field.
pub fn encode_password_enter(params: &Value) -> Result<Vec<u8>> {
    let params: PasswordParams = parse_params("GW_PASSWORD_ENTER_REQ", params)?;
    encode_text("GW_PASSWORD_ENTER_REQ", &params.password, PASSWORD_WIDTH)
}

/// Encode `GW_PASSWORD_CHANGE_REQ`: old and new password, 32 bytes each.
pub fn encode_password_change(params: &Value) -> Result<Vec<u8>> {
    let params: PasswordChangeParams = parse_params("GW_PASSWORD_CHANGE_REQ", params)?;
    let mut out = encode_text("GW_PASSWORD_CHANGE_REQ", &params.old_password, PASSWORD_WIDTH)?;
    out.extend(encode_text("GW_PASSWORD_CHANGE_REQ", &params.new_password, PASSWORD_WIDTH)?);
    Ok(out)
}

/// Encode `GW_SET_UTC_REQ`: epoch seconds, big-endian.
pub fn encode_set_utc(params: &Value) -> Result<Vec<u8>> {
    let params: UtcParams = parse_params("GW_SET_UTC_REQ", params)?;
    Ok(params.utc.to_be_bytes().to_vec())
}

/// Encode `GW_RTC_SET_TIME_ZONE_REQ`: zero-padded 64-byte zone string.
pub fn encode_time_zone(params: &Value) -> Result<Vec<u8>> {
    let params: TimeZoneParams = parse_params("GW_RTC_SET_TIME_ZONE_REQ", params)?;
    encode_text("GW_RTC_SET_TIME_ZONE_REQ", &params.time_zone, TIME_ZONE_WIDTH)
}

/// Decode `GW_PASSWORD_ENTER_CFM`. A non-zero status is fatal.
pub fn decode_password_enter_cfm(payload: &[u8]) -> Result<Reply> {
    expect_len("GW_PASSWORD_ENTER_CFM", payload, 1)?;
    if payload[0] == 0 {
        Ok(Reply::Empty)
    } else {
        Err(ProtoError::AuthenticationFailed)
    }
}

/// Decode `GW_PASSWORD_CHANGE_CFM`.
pub fn decode_password_change_cfm(payload: &[u8]) -> Result<Reply> {
    expect_len("GW_PASSWORD_CHANGE_CFM", payload, 1)?;
    if payload[0] == 0 {
        Ok(Reply::Empty)
    } else {
        Err(ProtoError::InvalidPassword)
    }
}

/// Decode `GW_PASSWORD_CHANGE_NTF`.
pub fn decode_password_change_ntf(payload: &[u8]) -> Result<Reply> {
    expect_len("GW_PASSWORD_CHANGE_NTF", payload, PASSWORD_WIDTH)?;
    Ok(Reply::PasswordChanged(PasswordChanged { password: text(payload) }))
}

/// Decode `GW_GET_VERSION_CFM`.
pub fn decode_version_cfm(payload: &[u8]) -> Result<Reply> {
    expect_len("GW_GET_VERSION_CFM", payload, 9)?;
    let software = payload[..6]
        .iter()
        .map(u8::to_string)
        .collect::<Vec<_>>()
        .join(".");
    Ok(Reply::Version(Version {
        software,
        hardware: payload[6],
        product_group: payload[7],
        product_type: payload[8],
    }))
}

/// Decode `GW_GET_PROTOCOL_VERSION_CFM`: two big-endian words.
pub fn decode_protocol_version_cfm(payload: &[u8]) -> Result<Reply> {
    expect_len("GW_GET_PROTOCOL_VERSION_CFM", payload, 4)?;
    Ok(Reply::ProtocolVersion(ProtocolVersion {
        major: u16::from_be_bytes([payload[0], payload[1]]),
        minor: u16::from_be_bytes([payload[2], payload[3]]),
    }))
}

/// Decode `GW_GET_STATE_CFM`.
pub fn decode_state_cfm(payload: &[u8]) -> Result<Reply> {
    min_len("GW_GET_STATE_CFM", payload, 2)?;
    let state_data = if payload.len() >= 6 {
        u32::from_be_bytes([payload[2], payload[3], payload[4], payload[5]])
    } else {
        0
    };
    Ok(Reply::GatewayState(GatewayState { state: payload[0], sub_state: payload[1], state_data }))
}

/// Decode `GW_GET_LOCAL_TIME_CFM`.
pub fn decode_local_time_cfm(payload: &[u8]) -> Result<Reply> {
    expect_len("GW_GET_LOCAL_TIME_CFM", payload, 15)?;
    Ok(Reply::LocalTime(LocalTime {
        utc: u32::from_be_bytes([payload[0], payload[1], payload[2], payload[3]]),
        second: payload[4],
        minute: payload[5],
        hour: payload[6],
        day_of_month: payload[7],
        month: payload[8],
        year: u16::from_be_bytes([payload[9], payload[10]]),
        week_day: payload[11],
        day_of_year: u16::from_be_bytes([payload[12], payload[13]]),
        daylight_saving: payload[14],
    }))
}

/// Decode a confirmation that carries no body.
pub fn decode_empty_cfm(name: &'static str, payload: &[u8]) -> Result<Reply> {
    expect_len(name, payload, 0)?;
    Ok(Reply::Empty)
}

/// Decode `GW_ERROR_NTF` into its gateway status.
pub fn decode_error_ntf(payload: &[u8]) -> Result<crate::error::GatewayError> {
    expect_len("GW_ERROR_NTF", payload, 1)?;
    Ok(crate::error::GatewayError::from_code(payload[0]))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn password_is_zero_padded() {
        let payload = encode_password_enter(&json!({"password": "abc"})).unwrap();
        assert_eq!(payload.len(), 32);
        assert_eq!(&payload[..3], b"abc");
        assert!(payload[3..].iter().all(|&b| b == 0));
    }

    #[test]
    fn password_over_32_bytes_is_rejected() {
        let long = "x".repeat(33);
        assert!(matches!(
            encode_password_enter(&json!({ "password": long })),
            Err(ProtoError::InvalidParams { .. })
        ));
    }

    #[test]
    fn password_change_concatenates_both_fields() {
        let payload =
            encode_password_change(&json!({"old_password": "a", "new_password": "b"})).unwrap();
        assert_eq!(payload.len(), 64);
        assert_eq!(payload[0], b'a');
        assert_eq!(payload[32], b'b');
    }

    #[test]
    fn password_enter_status() {
        assert_eq!(decode_password_enter_cfm(&[0]).unwrap(), Reply::Empty);
        assert_eq!(decode_password_enter_cfm(&[1]), Err(ProtoError::AuthenticationFailed));
        assert!(matches!(
            decode_password_enter_cfm(&[]),
            Err(ProtoError::PayloadLength { .. })
        ));
    }

    #[test]
    fn protocol_version_renders_dotted() {
        let reply = decode_protocol_version_cfm(&[0x00, 0x03, 0x00, 0x12]).unwrap();
        let Reply::ProtocolVersion(version) = reply else { panic!("wrong variant") };
        assert_eq!(version.to_string(), "3.18");
        assert_eq!(serde_json::to_value(version).unwrap(), json!("3.18"));
    }

    #[test]
    fn version_renders_six_parts() {
        let reply = decode_version_cfm(&[0, 2, 0, 0, 71, 0, 5, 14, 3]).unwrap();
        let Reply::Version(version) = reply else { panic!("wrong variant") };
        assert_eq!(version.software, "0.2.0.0.71.0");
        assert_eq!(version.product_group, 14);
    }

    #[test]
    fn state_with_and_without_data() {
        let reply = decode_state_cfm(&[1, 2, 0, 0, 0, 5]).unwrap();
        assert_eq!(
            reply,
            Reply::GatewayState(GatewayState { state: 1, sub_state: 2, state_data: 5 })
        );
        let reply = decode_state_cfm(&[2, 0]).unwrap();
        assert_eq!(
            reply,
            Reply::GatewayState(GatewayState { state: 2, sub_state: 0, state_data: 0 })
        );
    }

    #[test]
    fn local_time_fields() {
        let mut payload = vec![0u8; 15];
        payload[..4].copy_from_slice(&1_700_000_000u32.to_be_bytes());
        payload[6] = 13;
        payload[9..11].copy_from_slice(&124u16.to_be_bytes());
        let Reply::LocalTime(time) = decode_local_time_cfm(&payload).unwrap() else {
            panic!("wrong variant")
        };
        assert_eq!(time.utc, 1_700_000_000);
        assert_eq!(time.hour, 13);
        assert_eq!(time.year, 124);
    }

    #[test]
    fn utc_encoding() {
        let payload = encode_set_utc(&json!({"utc": 0x1234_5678u32})).unwrap();
        assert_eq!(payload, vec![0x12, 0x34, 0x56, 0x78]);
    }

    #[test]
    fn error_ntf_codes() {
        use crate::error::GatewayError;
        assert_eq!(decode_error_ntf(&[7]).unwrap(), GatewayError::Busy);
        assert!(decode_error_ntf(&[]).is_err());
    }
}
