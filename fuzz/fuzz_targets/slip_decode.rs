//! Fuzz target for the SLIP codec and stream splitter.
//!
//! # Strategy
//!
//! - Raw bytes: arbitrary buffers through `decode` (malformed escapes,
//!   stray delimiters)
//! - Chunked streams: the same bytes pushed through `Splitter` in
//!   arbitrary chunk sizes
//! - Round trip: `decode(encode(x)) == x` for arbitrary payloads
//!
//! # Invariants
//!
//! - NEVER panic on malformed input
//! - Every frame the splitter yields starts and ends with END
//! - Encoding then decoding is the identity

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use klf200_proto::slip;

#[derive(Debug, Arbitrary)]
struct Input {
    bytes: Vec<u8>,
    chunk: u8,
}

fuzz_target!(|input: Input| {
    // decode must reject or accept, never panic.
    let _ = slip::decode(&input.bytes);

    // Round trip for the same bytes treated as a payload.
    let encoded = slip::encode(&input.bytes);
    assert_eq!(slip::decode(&encoded).ok().as_deref(), Some(input.bytes.as_slice()));

    // The splitter must tolerate arbitrary chunking.
    let chunk = usize::from(input.chunk).max(1);
    let mut splitter = slip::Splitter::new();
    for piece in input.bytes.chunks(chunk) {
        for frame in splitter.push(piece) {
            assert_eq!(frame.first(), Some(&slip::END));
            assert_eq!(frame.last(), Some(&slip::END));
            let _ = slip::decode(&frame);
        }
    }
});
