//! LZF Compression Codec
//!
//! A fast LZ77-family codec. The compressed stream alternates literal runs
//! and short back-references and ends with a 4-byte big-endian trailer
//! holding the uncompressed length, so the decoder can size its output
//! exactly before it starts.
//!
//! Stream grammar:
//!
//! ```text
//! literal:   000LLLLL  <L+1 raw bytes>                  L + 1 in 1..=32
//! short ref: LLLooooo  oooooooo                         L in 1..=6, length L + 2
//! long ref:  111ooooo  LLLLLLLL  oooooooo               length L + 9
//! trailer:   u32 big-endian uncompressed length
//! ```
//!
//! The 13-bit `o` field is the back-reference distance minus one.

use bytes::BufMut;
use thiserror::Error;

/// Longest literal run a single control byte can describe
pub const MAX_LITERAL: usize = 1 << 5;

/// Farthest a back-reference may reach
pub const MAX_OFFSET: usize = 1 << 13;

/// Longest back-reference (8 + 256)
pub const MAX_REFERENCE: usize = (1 << 8) + (1 << 3);

/// Size of the uncompressed-length trailer
pub const TRAILER_SIZE: usize = 4;

/// Smallest hash table (2^8 entries)
pub const MIN_LEVEL: u8 = 8;

/// Largest hash table (2^16 entries)
pub const MAX_LEVEL: u8 = 16;

/// Default hash table size (2^14 entries)
pub const DEFAULT_LEVEL: u8 = 14;

/// Default cap on the decompressed size of a single stream
pub const DEFAULT_MAX_OUTPUT: usize = 16 * 1024 * 1024;

/// Shortest match worth encoding
const MIN_MATCH: usize = 3;

/// Length code that escapes to an extra length byte
const LONG_CODE: usize = 7;

const EMPTY_SLOT: usize = usize::MAX;

/// Codec errors
///
/// Every way a stream can fail to encode or decode maps to one of these.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("Stream of {0} bytes is too short to hold the length trailer")]
    MissingTrailer(usize),

    #[error("Stream truncated at byte {position}")]
    Truncated { position: usize },

    #[error("Back-reference distance {distance} exceeds {available} decoded bytes")]
    InvalidReference { distance: usize, available: usize },

    #[error("Decoded data overruns declared length {expected}")]
    Overrun { expected: usize },

    #[error("Declared length {declared} exceeds limit {limit}")]
    OutputTooLarge { declared: usize, limit: usize },

    #[error("Input of {0} bytes exceeds the 4 GiB trailer limit")]
    InputTooLarge(usize),

    #[error("Range {offset}..{offset}+{length} out of bounds for buffer of {len} bytes")]
    OutOfRange {
        offset: usize,
        length: usize,
        len: usize,
    },

    #[error("Compression level {0} outside {MIN_LEVEL}..={MAX_LEVEL}")]
    InvalidLevel(u8),
}

/// LZF codec
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LzfCodec {
    level: u8,
    max_output: usize,
}

impl LzfCodec {
    /// Create a codec with a hash table of `2^level` entries
    pub fn new(level: u8) -> Result<Self, CodecError> {
        if !(MIN_LEVEL..=MAX_LEVEL).contains(&level) {
            return Err(CodecError::InvalidLevel(level));
        }
        Ok(LzfCodec {
            level,
            max_output: DEFAULT_MAX_OUTPUT,
        })
    }

    /// Limit the size a stream may declare when decompressing
    pub fn with_max_output(mut self, max_output: usize) -> Self {
        self.max_output = max_output;
        self
    }

    /// Compression level
    pub fn level(&self) -> u8 {
        self.level
    }

    /// Decompression size limit
    pub fn max_output(&self) -> usize {
        self.max_output
    }

    /// Compress `data[offset..offset + length]`
    pub fn compress_range(
        &self,
        data: &[u8],
        offset: usize,
        length: usize,
    ) -> Result<Vec<u8>, CodecError> {
        self.compress(slice_range(data, offset, length)?)
    }

    /// Decompress `data[offset..offset + length]`
    pub fn decompress_range(
        &self,
        data: &[u8],
        offset: usize,
        length: usize,
    ) -> Result<Vec<u8>, CodecError> {
        self.decompress(slice_range(data, offset, length)?)
    }

    /// Compress `input`, appending the length trailer
    pub fn compress(&self, input: &[u8]) -> Result<Vec<u8>, CodecError> {
        let len = input.len();
        let declared = u32::try_from(len).map_err(|_| CodecError::InputTooLarge(len))?;

        // Worst case: one control byte per 32 literals
        let mut out = Vec::with_capacity(len + len / MAX_LITERAL + 1 + TRAILER_SIZE);
        let mut table = vec![EMPTY_SLOT; 1usize << self.level];

        let mut literal_start = 0;
        let mut ip = 0;

        while ip + MIN_MATCH <= len {
            let slot = self.hash(&input[ip..ip + MIN_MATCH]);
            let candidate = table[slot];
            table[slot] = ip;

            let matched = candidate != EMPTY_SLOT
                && ip - candidate <= MAX_OFFSET
                && input[candidate..candidate + MIN_MATCH] == input[ip..ip + MIN_MATCH];

            if !matched {
                ip += 1;
                continue;
            }

            let limit = MAX_REFERENCE.min(len - ip);
            let mut length = MIN_MATCH;
            while length < limit && input[candidate + length] == input[ip + length] {
                length += 1;
            }

            emit_literals(&mut out, &input[literal_start..ip]);
            emit_reference(&mut out, ip - candidate - 1, length);

            // Keep interior positions discoverable for later matches
            for position in ip + 1..ip + length {
                if position + MIN_MATCH > len {
                    break;
                }
                let slot = self.hash(&input[position..position + MIN_MATCH]);
                table[slot] = position;
            }

            ip += length;
            literal_start = ip;
        }

        emit_literals(&mut out, &input[literal_start..]);
        out.put_u32(declared);

        tracing::trace!(input = len, output = out.len(), "lzf compressed");
        Ok(out)
    }

    /// Decompress a stream produced by [`compress`](Self::compress)
    pub fn decompress(&self, data: &[u8]) -> Result<Vec<u8>, CodecError> {
        if data.len() < TRAILER_SIZE {
            return Err(CodecError::MissingTrailer(data.len()));
        }

        let (body, trailer) = data.split_at(data.len() - TRAILER_SIZE);
        let expected = u32::from_be_bytes([trailer[0], trailer[1], trailer[2], trailer[3]]) as usize;
        if expected > self.max_output {
            return Err(CodecError::OutputTooLarge {
                declared: expected,
                limit: self.max_output,
            });
        }

        let mut out = Vec::with_capacity(expected);
        let mut ip = 0;
        let next = |ip: &mut usize| -> Result<u8, CodecError> {
            let byte = *body
                .get(*ip)
                .ok_or(CodecError::Truncated { position: *ip })?;
            *ip += 1;
            Ok(byte)
        };

        while out.len() < expected {
            let control = next(&mut ip)? as usize;

            if control < MAX_LITERAL {
                let run = control + 1;
                let literal = body
                    .get(ip..ip + run)
                    .ok_or(CodecError::Truncated { position: body.len() })?;
                if out.len() + run > expected {
                    return Err(CodecError::Overrun { expected });
                }
                out.extend_from_slice(literal);
                ip += run;
                continue;
            }

            let mut length = control >> 5;
            if length == LONG_CODE {
                length += next(&mut ip)? as usize;
            }
            length += 2;

            let distance = (((control & 0x1F) << 8) | next(&mut ip)? as usize) + 1;
            if distance > out.len() {
                return Err(CodecError::InvalidReference {
                    distance,
                    available: out.len(),
                });
            }
            if out.len() + length > expected {
                return Err(CodecError::Overrun { expected });
            }

            // Byte at a time: the source may overlap what is being written
            let start = out.len() - distance;
            for i in 0..length {
                let byte = out[start + i];
                out.push(byte);
            }
        }

        Ok(out)
    }

    #[inline]
    fn hash(&self, bytes: &[u8]) -> usize {
        let value = (bytes[0] as u32) << 16 | (bytes[1] as u32) << 8 | bytes[2] as u32;
        (value.wrapping_mul(0x9E37_79B1) >> (32 - self.level as u32)) as usize
    }
}

impl Default for LzfCodec {
    fn default() -> Self {
        LzfCodec {
            level: DEFAULT_LEVEL,
            max_output: DEFAULT_MAX_OUTPUT,
        }
    }
}

fn slice_range(data: &[u8], offset: usize, length: usize) -> Result<&[u8], CodecError> {
    offset
        .checked_add(length)
        .and_then(|end| data.get(offset..end))
        .ok_or(CodecError::OutOfRange {
            offset,
            length,
            len: data.len(),
        })
}

fn emit_literals(out: &mut Vec<u8>, literals: &[u8]) {
    for chunk in literals.chunks(MAX_LITERAL) {
        out.push((chunk.len() - 1) as u8);
        out.extend_from_slice(chunk);
    }
}

fn emit_reference(out: &mut Vec<u8>, offset: usize, length: usize) {
    debug_assert!(offset < MAX_OFFSET);
    debug_assert!((MIN_MATCH..=MAX_REFERENCE).contains(&length));

    let code = length - 2;
    let high = (offset >> 8) as u8;
    if code < LONG_CODE {
        out.push(((code as u8) << 5) | high);
    } else {
        out.push(((LONG_CODE as u8) << 5) | high);
        out.push((code - LONG_CODE) as u8);
    }
    out.push((offset & 0xFF) as u8);
}
