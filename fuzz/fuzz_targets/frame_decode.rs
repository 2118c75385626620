//! Fuzz target for the wire frame codec and payload decoders.
//!
//! # Strategy
//!
//! - Raw bytes: arbitrary buffers through `Frame::decode`
//! - Valid frames: arbitrary command/payload pairs re-encoded and fed
//!   through every registered payload decoder
//!
//! # Invariants
//!
//! - NEVER panic on malformed input
//! - Checksum tolerance: decode succeeds structurally even when the
//!   checksum byte is wrong, and reports the mismatch
//! - Payload decoders reject length mismatches with an error, not a
//!   slice panic

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use klf200_proto::{frame::Frame, payload, registry};

#[derive(Debug, Arbitrary)]
struct Input {
    bytes: Vec<u8>,
    command: u16,
    corrupt_checksum: bool,
}

fuzz_target!(|input: Input| {
    // Arbitrary bytes through the frame decoder.
    let _ = Frame::decode(&input.bytes);

    // A well-formed frame, optionally with a corrupted checksum.
    let payload_bytes: Vec<u8> =
        input.bytes.iter().copied().take(klf200_proto::MAX_PAYLOAD).collect();
    let Ok(frame) = Frame::new(input.command, payload_bytes) else {
        return;
    };
    let mut wire = frame.encode();
    if input.corrupt_checksum {
        let last = wire.len() - 1;
        wire[last] ^= 0xA5;
    }
    let decoded = Frame::decode(&wire).expect("well-formed frame must decode");
    assert_eq!(decoded.checksum_ok(), !input.corrupt_checksum);

    // Every registered decoder must handle the payload gracefully.
    if let Some(spec) = registry::by_id(decoded.frame.command) {
        let _ = payload::session_id(spec, &decoded.frame.payload);
        let _ = payload::decode_reply(spec, &decoded.frame.payload);
    }
});
