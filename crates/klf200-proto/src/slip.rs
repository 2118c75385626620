//! SLIP framing (RFC 1055).
//!
//! The KLF 200 wraps every wire frame in SLIP: a frame is delimited by
//! `END` bytes on both sides, and `END`/`ESC` occurrences inside the
//! payload are byte-stuffed with two-byte escape sequences. One encoded
//! frame carries exactly one logical frame; [`decode`] therefore takes a
//! single delimited frame, and [`Splitter`] cuts a chunked byte stream
//! into such frames first.

use crate::error::{ProtoError, Result};

/// Frame delimiter.
pub const END: u8 = 0xC0;
/// Escape introducer.
pub const ESC: u8 = 0xDB;
/// Escaped `END`.
pub const ESC_END: u8 = 0xDC;
/// Escaped `ESC`.
pub const ESC_ESC: u8 = 0xDD;

/// SLIP-encode one logical frame.
///
/// Produces `END, stuffed payload, END`. Every `END` in the payload
/// becomes `ESC ESC_END`, every `ESC` becomes `ESC ESC_ESC`.
#[must_use]
pub fn encode(payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(payload.len() + 2);
    out.push(END);
    for &byte in payload {
        match byte {
            END => out.extend_from_slice(&[ESC, ESC_END]),
            ESC => out.extend_from_slice(&[ESC, ESC_ESC]),
            other => out.push(other),
        }
    }
    out.push(END);
    out
}

/// Decode one SLIP frame.
///
/// The input must begin and end with `END`. The interior must not
/// contain a bare `END`, and every `ESC` must be followed by `ESC_END`
/// or `ESC_ESC`. The input is not modified; the unstuffed payload is
/// returned in a fresh buffer no larger than the input.
///
/// # Errors
///
/// `ProtoError::Framing` on a missing delimiter, an interior `END`, or
/// a malformed escape pair.
pub fn decode(frame: &[u8]) -> Result<Vec<u8>> {
    if frame.len() < 2 || frame[0] != END || frame[frame.len() - 1] != END {
        return Err(ProtoError::Framing("frame not delimited by END bytes"));
    }

    let interior = &frame[1..frame.len() - 1];
    let mut out = Vec::with_capacity(interior.len());
    let mut i = 0;
    while i < interior.len() {
        match interior[i] {
            END => return Err(ProtoError::Framing("END delimiter inside frame")),
            ESC => {
                let escaped = interior
                    .get(i + 1)
                    .ok_or(ProtoError::Framing("truncated escape sequence"))?;
                match *escaped {
                    ESC_END => out.push(END),
                    ESC_ESC => out.push(ESC),
                    _ => return Err(ProtoError::Framing("invalid escape sequence")),
                }
                i += 2;
            }
            other => {
                out.push(other);
                i += 1;
            }
        }
    }
    Ok(out)
}

/// Incremental frame splitter for a chunked byte stream.
///
/// Feed arbitrary chunks with [`Splitter::push`]; complete delimited
/// frames (including both `END` bytes, ready for [`decode`]) come back
/// in arrival order. Bytes outside a frame are discarded, and an `END`
/// immediately following an opening `END` is treated as the real frame
/// start, so idle delimiters between frames are transparent.
#[derive(Debug, Default)]
pub struct Splitter {
    buf: Vec<u8>,
    in_frame: bool,
}

impl Splitter {
    /// Create an empty splitter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Consume a chunk, returning every frame it completes.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<Vec<u8>> {
        let mut frames = Vec::new();
        for &byte in chunk {
            if !self.in_frame {
                if byte == END {
                    self.in_frame = true;
                    self.buf.push(END);
                }
                continue;
            }
            if byte == END && self.buf.len() == 1 {
                // Empty frame: the previous END was idle noise.
                continue;
            }
            self.buf.push(byte);
            if byte == END {
                frames.push(std::mem::take(&mut self.buf));
                self.in_frame = false;
            }
        }
        frames
    }

    /// Number of buffered bytes belonging to an unfinished frame.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.buf.len()
    }
}
