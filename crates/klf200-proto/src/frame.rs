//! Wire frame codec.
//!
//! A KLF 200 frame, inside the SLIP envelope, is:
//!
//! `[0x00, length, cmd_hi, cmd_lo, payload…, checksum]`
//!
//! where `length = payload + 3` (command id, payload, checksum) and the
//! checksum is the XOR of every preceding byte. Payloads are at most
//! 250 bytes, so a whole frame fits in 255 bytes.
//!
//! Decoding validates cheapest-first: protocol byte, length field,
//! checksum. Deployed gateways have been observed to emit frames whose
//! checksum does not verify; the decoder therefore reports checksum
//! validity in [`DecodedFrame::checksum_ok`] instead of failing, and the
//! caller picks tolerant or strict handling.

use bytes::Bytes;

use crate::error::{ProtoError, Result};

/// Fixed protocol identifier, first byte of every frame.
pub const PROTOCOL_ID: u8 = 0x00;

/// Maximum payload size in bytes.
pub const MAX_PAYLOAD: usize = 250;

/// Bytes surrounding the payload: protocol id, length, command id,
/// checksum.
const OVERHEAD: usize = 5;

/// A logical frame: command id plus payload bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// 16-bit command id.
    pub command: u16,
    /// Raw payload bytes (may be empty).
    pub payload: Bytes,
}

/// Result of [`Frame::decode`]: the frame plus checksum validity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedFrame {
    /// The decoded frame.
    pub frame: Frame,
    /// Outcome of the checksum comparison.
    pub checksum: ChecksumCheck,
}

/// Outcome of comparing the trailing checksum byte against the XOR of
/// the frame body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChecksumCheck {
    /// Checksum verified.
    Valid,
    /// Checksum did not verify; both sides of the comparison are kept
    /// for diagnostics.
    Mismatch {
        /// XOR over all bytes before the checksum byte.
        computed: u8,
        /// Checksum byte found on the wire.
        found: u8,
    },
}

/// XOR of all bytes in `data`.
fn xor(data: &[u8]) -> u8 {
    data.iter().fold(0, |acc, b| acc ^ b)
}

impl Frame {
    /// Create a frame, enforcing the payload limit.
    ///
    /// # Errors
    ///
    /// `ProtoError::PayloadTooLarge` above 250 bytes.
    pub fn new(command: u16, payload: impl Into<Bytes>) -> Result<Self> {
        let payload = payload.into();
        if payload.len() > MAX_PAYLOAD {
            return Err(ProtoError::PayloadTooLarge { size: payload.len() });
        }
        Ok(Self { command, payload })
    }

    /// Encode to wire bytes (without the SLIP envelope).
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        debug_assert!(self.payload.len() <= MAX_PAYLOAD);

        let mut out = Vec::with_capacity(self.payload.len() + OVERHEAD);
        out.push(PROTOCOL_ID);
        out.push((self.payload.len() + 3) as u8);
        out.extend_from_slice(&self.command.to_be_bytes());
        out.extend_from_slice(&self.payload);
        out.push(xor(&out));
        out
    }

    /// Decode wire bytes (after SLIP unstuffing).
    ///
    /// # Errors
    ///
    /// - `ProtoError::FrameTooShort` below the five-byte minimum
    /// - `ProtoError::UnknownProtocol` if the first byte is not 0x00
    /// - `ProtoError::LengthMismatch` if the length field disagrees with
    ///   the byte count
    ///
    /// A checksum mismatch is not an error here; it is reported through
    /// [`DecodedFrame::checksum`].
    pub fn decode(bytes: &[u8]) -> Result<DecodedFrame> {
        if bytes.len() < OVERHEAD {
            return Err(ProtoError::FrameTooShort { actual: bytes.len() });
        }
        if bytes[0] != PROTOCOL_ID {
            return Err(ProtoError::UnknownProtocol(bytes[0]));
        }

        let declared = bytes[1] as usize;
        if declared + 2 != bytes.len() {
            return Err(ProtoError::LengthMismatch { declared, actual: bytes.len() });
        }

        let computed = xor(&bytes[..bytes.len() - 1]);
        let found = bytes[bytes.len() - 1];
        let checksum = if computed == found {
            ChecksumCheck::Valid
        } else {
            ChecksumCheck::Mismatch { computed, found }
        };

        let command = u16::from_be_bytes([bytes[2], bytes[3]]);
        let payload = Bytes::copy_from_slice(&bytes[4..bytes.len() - 1]);

        Ok(DecodedFrame { frame: Self { command, payload }, checksum })
    }
}

impl DecodedFrame {
    /// Whether the checksum verified.
    #[must_use]
    pub fn checksum_ok(&self) -> bool {
        matches!(self.checksum, ChecksumCheck::Valid)
    }

    /// Fold the checksum outcome back into a hard error (strict mode).
    ///
    /// # Errors
    ///
    /// `ProtoError::ChecksumMismatch` when the checksum did not verify.
    pub fn strict(self) -> Result<Frame> {
        match self.checksum {
            ChecksumCheck::Valid => Ok(self.frame),
            ChecksumCheck::Mismatch { computed, found } => {
                Err(ProtoError::ChecksumMismatch { computed, found })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn encode_password_enter_frame() {
        // GW_PASSWORD_ENTER_REQ with password "abc": a 32-byte
        // zero-padded payload, length field 0x23.
        let mut payload = vec![0u8; 32];
        payload[..3].copy_from_slice(b"abc");
        let frame = Frame::new(0x3000, payload).unwrap();
        let wire = frame.encode();

        assert_eq!(wire[0], 0x00);
        assert_eq!(wire[1], 0x23);
        assert_eq!(&wire[2..4], &[0x30, 0x00]);
        assert_eq!(&wire[4..7], b"abc");
        assert!(wire[7..36].iter().all(|&b| b == 0));
        let expected_checksum = wire[..wire.len() - 1].iter().fold(0u8, |a, b| a ^ b);
        assert_eq!(*wire.last().unwrap(), expected_checksum);
    }

    #[test]
    fn reject_oversized_payload() {
        let result = Frame::new(0x0300, vec![0u8; MAX_PAYLOAD + 1]);
        assert!(matches!(result, Err(ProtoError::PayloadTooLarge { size: 251 })));
    }

    #[test]
    fn reject_unknown_protocol_byte() {
        let mut wire = Frame::new(0x000C, Bytes::new()).unwrap().encode();
        wire[0] = 0x01;
        assert_eq!(Frame::decode(&wire), Err(ProtoError::UnknownProtocol(0x01)));
    }

    #[test]
    fn reject_length_mismatch() {
        let mut wire = Frame::new(0x000C, Bytes::new()).unwrap().encode();
        wire[1] = wire[1].wrapping_add(1);
        assert!(matches!(Frame::decode(&wire), Err(ProtoError::LengthMismatch { .. })));
    }

    #[test]
    fn checksum_mismatch_is_tolerated() {
        let mut wire = Frame::new(0x000A, Bytes::new()).unwrap().encode();
        let last = wire.len() - 1;
        wire[last] ^= 0xFF;
        let decoded = Frame::decode(&wire).unwrap();
        assert!(!decoded.checksum_ok());
        assert_eq!(decoded.frame.command, 0x000A);
        assert!(matches!(decoded.strict(), Err(ProtoError::ChecksumMismatch { .. })));
    }

    proptest! {
        #[test]
        fn round_trip(command in any::<u16>(), payload in prop::collection::vec(any::<u8>(), 0..=MAX_PAYLOAD)) {
            let frame = Frame::new(command, payload.clone()).unwrap();
            let wire = frame.encode();
            prop_assert_eq!(wire.len(), payload.len() + OVERHEAD);

            let decoded = Frame::decode(&wire).unwrap();
            prop_assert!(decoded.checksum_ok());
            prop_assert_eq!(decoded.frame.command, command);
            prop_assert_eq!(&decoded.frame.payload[..], &payload[..]);
        }

        #[test]
        fn checksum_is_xor_of_preceding_bytes(command in any::<u16>(), payload in prop::collection::vec(any::<u8>(), 0..32)) {
            let wire = Frame::new(command, payload).unwrap().encode();
            let expected = wire[..wire.len() - 1].iter().fold(0u8, |a, b| a ^ b);
            prop_assert_eq!(wire[wire.len() - 1], expected);
        }
    }
}
