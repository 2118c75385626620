//! Position and velocity codes shared by the movement commands.
//!
//! Actuator positions travel as 16-bit codes: a percent scale in steps
//! of 0x200, a relative window centred on 0xCC00, and a handful of
//! named sentinels. The same code appears in command parameters, run
//! status notifications, and node records.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{ProtoError, Result};

/// Raw code per percentage point.
const PERCENT_STEP: u32 = 0x0200;
/// Highest absolute-percent code (100%).
const PERCENT_MAX: u16 = 0xC800;
/// Centre of the relative window (offset 0).
const RELATIVE_ZERO: u16 = 0xCC00;
/// Inclusive upper bound of the relative window (+100%). The lower
/// bound is exclusive: 0xC800 belongs to the percent scale, so -100%
/// encodes one code above it.
const RELATIVE_END: u16 = 0xD000;

const TARGET: u16 = 0xD100;
const CURRENT: u16 = 0xD200;
const DEFAULT: u16 = 0xD300;
const IGNORE: u16 = 0xD400;
const UNKNOWN: u16 = 0xF7FF;

/// A decoded 16-bit position code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Position {
    /// Absolute position, 0..=100 percent.
    Percent(u8),
    /// Relative movement, -100..=100 percent from the current position.
    Relative(i8),
    /// Go to the target position.
    Target,
    /// Hold the current position.
    Current,
    /// Go to the configured default.
    Default,
    /// Leave this parameter untouched.
    Ignore,
    /// Position not known to the gateway.
    Unknown,
    /// Any other raw code.
    Raw(u16),
}

impl Position {
    /// Decode a wire code.
    #[must_use]
    pub fn from_raw(raw: u16) -> Self {
        match raw {
            0..=PERCENT_MAX => {
                let percent = (u32::from(raw) + PERCENT_STEP / 2) / PERCENT_STEP;
                Self::Percent(percent.min(100) as u8)
            }
            TARGET => Self::Target,
            CURRENT => Self::Current,
            DEFAULT => Self::Default,
            IGNORE => Self::Ignore,
            UNKNOWN => Self::Unknown,
            raw if raw > PERCENT_MAX && raw <= RELATIVE_END => {
                let delta = i32::from(raw) - i32::from(RELATIVE_ZERO);
                // 1024 raw units span 100 percent in each direction.
                let offset = (delta * 100 + delta.signum() * 512) / 1024;
                Self::Relative(offset.clamp(-100, 100) as i8)
            }
            other => Self::Raw(other),
        }
    }

    /// Encode to a wire code.
    #[must_use]
    pub fn to_raw(self) -> u16 {
        match self {
            Self::Percent(percent) => (u32::from(percent.min(100)) * PERCENT_STEP) as u16,
            Self::Relative(offset) => {
                let delta = i32::from(offset.clamp(-100, 100)) * 1024 / 100;
                let raw = i32::from(RELATIVE_ZERO) + delta;
                // -100% lands on the percent-scale boundary; keep the
                // code inside the window so it decodes back as relative.
                raw.clamp(i32::from(PERCENT_MAX) + 1, i32::from(RELATIVE_END)) as u16
            }
            Self::Target => TARGET,
            Self::Current => CURRENT,
            Self::Default => DEFAULT,
            Self::Ignore => IGNORE,
            Self::Unknown => UNKNOWN,
            Self::Raw(raw) => raw,
        }
    }
}

impl Serialize for Position {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match *self {
            Self::Percent(percent) => serializer.serialize_u8(percent),
            Self::Relative(offset) => {
                use serde::ser::SerializeMap;
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("relative", &offset)?;
                map.end()
            }
            Self::Target => serializer.serialize_str("target"),
            Self::Current => serializer.serialize_str("current"),
            Self::Default => serializer.serialize_str("default"),
            Self::Ignore => serializer.serialize_str("ignore"),
            Self::Unknown => serializer.serialize_str("unknown"),
            Self::Raw(raw) => {
                use serde::ser::SerializeMap;
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("raw", &raw)?;
                map.end()
            }
        }
    }
}

impl<'de> Deserialize<'de> for Position {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Percent(u8),
            Name(String),
            Fields { relative: Option<i8>, raw: Option<u16> },
        }

        match Repr::deserialize(deserializer)? {
            Repr::Percent(percent) if percent <= 100 => Ok(Self::Percent(percent)),
            Repr::Percent(percent) => {
                Err(D::Error::custom(format!("percent out of range: {percent}")))
            }
            Repr::Name(name) => match name.as_str() {
                "target" => Ok(Self::Target),
                "current" => Ok(Self::Current),
                "default" => Ok(Self::Default),
                "ignore" => Ok(Self::Ignore),
                "unknown" => Ok(Self::Unknown),
                other => Err(D::Error::custom(format!("unknown position {other:?}"))),
            },
            Repr::Fields { relative: Some(offset), raw: None } => Ok(Self::Relative(offset)),
            Repr::Fields { relative: None, raw: Some(raw) } => Ok(Self::Raw(raw)),
            Repr::Fields { .. } => Err(D::Error::custom("expected `relative` or `raw`")),
        }
    }
}

/// Velocity code used by node records and movement commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Velocity {
    /// 0 — actuator default.
    Default,
    /// 1 — silent mode.
    Slow,
    /// 2 — fast mode.
    Fast,
    /// 255 — the actuator does not report a velocity.
    NotSupported,
}

impl Velocity {
    /// Decode a wire byte; unassigned codes map to `NotSupported`.
    #[must_use]
    pub fn from_raw(raw: u8) -> Self {
        match raw {
            0 => Self::Default,
            1 => Self::Slow,
            2 => Self::Fast,
            _ => Self::NotSupported,
        }
    }

    /// Encode to a wire byte.
    #[must_use]
    pub fn to_raw(self) -> u8 {
        match self {
            Self::Default => 0,
            Self::Slow => 1,
            Self::Fast => 2,
            Self::NotSupported => 255,
        }
    }
}

/// Parse a 16-bit position out of a payload at `offset`.
///
/// # Errors
///
/// `PayloadLength` when the payload is too short.
pub(crate) fn position_at(name: &'static str, payload: &[u8], offset: usize) -> Result<Position> {
    let bytes = payload
        .get(offset..offset + 2)
        .ok_or(ProtoError::PayloadLength { name, expected: offset + 2, actual: payload.len() })?;
    Ok(Position::from_raw(u16::from_be_bytes([bytes[0], bytes[1]])))
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn percent_scale() {
        assert_eq!(Position::from_raw(0x0000), Position::Percent(0));
        assert_eq!(Position::from_raw(0x0200), Position::Percent(1));
        assert_eq!(Position::from_raw(0xC800), Position::Percent(100));
        // Half a step rounds up.
        assert_eq!(Position::from_raw(0x0100), Position::Percent(1));
        assert_eq!(Position::from_raw(0x00FF), Position::Percent(0));
    }

    #[test]
    fn sentinels() {
        assert_eq!(Position::from_raw(0xD100), Position::Target);
        assert_eq!(Position::from_raw(0xD200), Position::Current);
        assert_eq!(Position::from_raw(0xD300), Position::Default);
        assert_eq!(Position::from_raw(0xD400), Position::Ignore);
        assert_eq!(Position::from_raw(0xF7FF), Position::Unknown);
        assert_eq!(Position::Target.to_raw(), 0xD100);
    }

    #[test]
    fn relative_window() {
        assert_eq!(Position::from_raw(0xCC00), Position::Relative(0));
        assert_eq!(Position::Relative(50).to_raw(), 0xCC00 + 512);
        assert_eq!(Position::from_raw(0xCC00 + 512), Position::Relative(50));
        assert_eq!(Position::from_raw(0xCC00 - 512), Position::Relative(-50));
    }

    #[test]
    fn relative_extremes() {
        // +100% is the inclusive top of the window.
        assert_eq!(Position::Relative(100).to_raw(), 0xD000);
        assert_eq!(Position::from_raw(0xD000), Position::Relative(100));
        // -100% must stay off the percent-scale boundary at 0xC800.
        assert_eq!(Position::Relative(-100).to_raw(), 0xC801);
        assert_eq!(Position::from_raw(0xC801), Position::Relative(-100));
        assert_eq!(Position::from_raw(0xC800), Position::Percent(100));
    }

    #[test]
    fn unnamed_codes_stay_raw() {
        assert_eq!(Position::from_raw(0xD500), Position::Raw(0xD500));
        assert_eq!(Position::from_raw(0xFFFF), Position::Raw(0xFFFF));
    }

    #[test]
    fn json_forms() {
        assert_eq!(serde_json::to_value(Position::Percent(25)).unwrap(), serde_json::json!(25));
        assert_eq!(
            serde_json::to_value(Position::Target).unwrap(),
            serde_json::json!("target")
        );
        assert_eq!(
            serde_json::from_value::<Position>(serde_json::json!(0)).unwrap(),
            Position::Percent(0)
        );
        assert_eq!(
            serde_json::from_value::<Position>(serde_json::json!("ignore")).unwrap(),
            Position::Ignore
        );
        assert_eq!(
            serde_json::from_value::<Position>(serde_json::json!({"relative": -20})).unwrap(),
            Position::Relative(-20)
        );
        assert!(serde_json::from_value::<Position>(serde_json::json!(101)).is_err());
    }

    proptest! {
        #[test]
        fn percent_round_trip(percent in 0u8..=100) {
            let raw = Position::Percent(percent).to_raw();
            prop_assert_eq!(Position::from_raw(raw), Position::Percent(percent));
        }

        #[test]
        fn relative_round_trip(offset in -100i8..=100) {
            let raw = Position::Relative(offset).to_raw();
            prop_assert!(raw > 0xC800 && raw <= 0xD000);
            prop_assert_eq!(Position::from_raw(raw), Position::Relative(offset));
        }

        #[test]
        fn velocity_round_trip(code in prop_oneof![Just(0u8), Just(1), Just(2), Just(255)]) {
            prop_assert_eq!(Velocity::from_raw(code).to_raw(), code);
        }
    }
}
