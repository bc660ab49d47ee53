//! LZSS decompression of container sections.
//!
//! The variant used by XTR containers is the classic ring-buffer LZSS:
//!
//! - a flag byte provides eight selectors, least significant bit first
//! - a set selector copies one literal byte
//! - a cleared selector reads two bytes `b0, b1` forming a 12-bit window slot
//!   `b0 | (b1 & 0xF0) << 4` and a 4-bit length `(b1 & 0x0F) + THRESHOLD + 1`
//!
//! The window is 4096 bytes, zero filled, with the write cursor starting at
//! `WINDOW_SIZE - LOOKAHEAD - CURSOR_BIAS` (0xFEE). The slot is an absolute window
//! position, so a reference reaches `(cursor - slot) mod 4096` bytes back.

use tracing::instrument;

use crate::error::{DecompressError, Result};

/// Bits used for the window slot of a back-reference
pub const OFFSET_BITS: u32 = 12;

/// Bits used for the length of a back-reference
pub const LENGTH_BITS: u32 = 4;

/// References never encode lengths at or below this value
pub const THRESHOLD: usize = 2;

/// Distance between the end of the lookahead area and the initial cursor
pub const CURSOR_BIAS: usize = 2;

pub const WINDOW_SIZE: usize = 1 << OFFSET_BITS;

/// Longest match a reference can produce
pub const MAX_MATCH: usize = (1 << LENGTH_BITS) + THRESHOLD;

/// Lookahead area reserved in front of the cursor
pub const LOOKAHEAD: usize = 1 << LENGTH_BITS;

const WINDOW_MASK: usize = WINDOW_SIZE - 1;

/// Window position where decoding starts writing
pub const INITIAL_CURSOR: usize = WINDOW_SIZE - LOOKAHEAD - CURSOR_BIAS;

/// Sliding history of one decompression
///
/// A fresh window is created for every call so no history can carry over
/// between sections.
struct Window {
    buffer: Box<[u8; WINDOW_SIZE]>,
    cursor: usize,
}

impl Window {
    fn new() -> Self {
        Self {
            buffer: Box::new([0u8; WINDOW_SIZE]),
            cursor: INITIAL_CURSOR,
        }
    }

    fn push(&mut self, byte: u8) {
        self.buffer[self.cursor] = byte;
        self.cursor = (self.cursor + 1) & WINDOW_MASK;
    }

    fn get(&self, slot: usize) -> u8 {
        self.buffer[slot & WINDOW_MASK]
    }
}

/// Result of a decode that did not enforce exact sizes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decoded {
    /// Exactly `expected` bytes of output
    pub data: Vec<u8>,

    /// Compressed bytes actually consumed
    pub consumed: usize,

    /// Bytes the final back-reference would have produced past `expected`
    pub excess: usize,
}

impl Decoded {
    /// Compressed bytes left over after the output was complete
    pub fn remaining(&self, input_len: usize) -> usize {
        input_len - self.consumed
    }
}

/// Decode until `expected` bytes are produced
///
/// Running out of input before that point is always an error. Leftover input and
/// overlong references are reported through [`Decoded`] instead, see [`decompress`]
/// for the strict variant.
#[instrument(skip(input), fields(input_len = input.len()), err)]
pub fn decode(input: &[u8], expected: usize) -> Result<Decoded> {
    let mut window = Window::new();
    let mut data = Vec::with_capacity(expected);
    let mut pos = 0usize;
    let mut flags = 0u32;
    let mut excess = 0usize;

    let underrun = |produced: usize| DecompressError::SizeMismatch { expected, produced };

    while data.len() < expected {
        flags >>= 1;
        if flags & 0x100 == 0 {
            let byte = *input.get(pos).ok_or_else(|| underrun(data.len()))?;
            pos += 1;
            flags = u32::from(byte) | 0xFF00;
        }

        if flags & 1 != 0 {
            let byte = *input.get(pos).ok_or_else(|| underrun(data.len()))?;
            pos += 1;

            data.push(byte);
            window.push(byte);
        } else {
            let pair = input
                .get(pos..pos + 2)
                .ok_or_else(|| underrun(data.len()))?;
            pos += 2;

            let slot = usize::from(pair[0]) | (usize::from(pair[1] & 0xF0) << 4);
            let length = usize::from(pair[1] & 0x0F) + THRESHOLD + 1;

            for k in 0..length {
                let byte = window.get(slot + k);
                window.push(byte);
                if data.len() < expected {
                    data.push(byte);
                } else {
                    excess += 1;
                }
            }
        }
    }

    Ok(Decoded {
        data,
        consumed: pos,
        excess,
    })
}

/// Decompress a section token stream into exactly `expected` bytes
///
/// The whole input must be consumed and no reference may run past the declared size.
pub fn decompress(input: &[u8], expected: usize) -> Result<Vec<u8>> {
    let decoded = decode(input, expected)?;

    if decoded.excess > 0 {
        return Err(DecompressError::OutputOverflow {
            excess: decoded.excess,
        }
        .into());
    }

    let remaining = decoded.remaining(input.len());
    if remaining > 0 {
        return Err(DecompressError::OverrunInput { remaining }.into());
    }

    Ok(decoded.data)
}
