//! Record payload to text
//!
//! Payloads are stored either as raw UTF-16LE (`base_char == 0`,
//! `bits_per_char == 16`) or as a bit-packed stream of fixed-width codes.
//! Packed codes below `0x20` select from [`CONTROL_CHARS`]; the rest map to
//! code point `base_char - 0x20 + code`. The stream is read as one
//! little-endian integer, lowest bits first, and ends at the first zero code.

use crate::error::{FormatError, Result};
use crate::record::entry::TableRecord;
use crate::record::header::RecordHeader;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// Characters for packed codes `0x00..0x20`
pub const CONTROL_CHARS: [char; 32] = [
    '\0', '0', '1', '2', '3', '4', '5', '6', 's', 't', 'r', 'n', 'u', 'm', '(', ')', '[', ']',
    '<', '>', '%', '#', '/', ':', '-', '\'', '"', ' ', ',', '.', '!', '\n',
];

/// Widths up to this size are decoded through a cached lookup table
pub const MAX_TABLE_BITS: u8 = 16;

/// Widest packed code the unpacker accepts
pub const MAX_BITS_PER_CHAR: u8 = 32;

/// Map one packed code to its character.
pub fn map_code(base_char: u16, code: u32) -> char {
    if code < 0x20 {
        return CONTROL_CHARS[code as usize];
    }
    (code - 0x20)
        .checked_add(u32::from(base_char))
        .and_then(char::from_u32)
        .unwrap_or(char::REPLACEMENT_CHARACTER)
}

/// Little-endian bit cursor over a byte slice
struct BitReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> BitReader<'a> {
    const fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Read the next `width` bits. Bits past the end read as zero.
    fn read(&mut self, width: u8) -> u32 {
        let mut value = 0u64;
        let mut filled = 0usize;
        let width = width as usize;
        while filled < width {
            let byte = self.data.get(self.pos / 8).copied().unwrap_or(0);
            let offset = self.pos % 8;
            let take = (8 - offset).min(width - filled);
            let chunk = (u64::from(byte) >> offset) & ((1u64 << take) - 1);
            value |= chunk << filled;
            filled += take;
            self.pos += take;
        }
        value as u32
    }
}

/// Decodes record payloads, caching one lookup table per
/// `(base_char, bits_per_char)` pair.
#[derive(Debug, Default)]
pub struct RecordUnpacker {
    charsets: RwLock<HashMap<(u16, u8), Arc<[char]>>>,
}

impl RecordUnpacker {
    /// Create an unpacker with an empty lookup table cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of lookup tables built so far
    pub fn cached_charsets(&self) -> usize {
        self.charsets.read().len()
    }

    fn charset(&self, base_char: u16, bits: u8) -> Arc<[char]> {
        if let Some(table) = self.charsets.read().get(&(base_char, bits)) {
            return Arc::clone(table);
        }
        let table: Arc<[char]> = (0..1u32 << bits)
            .map(|code| map_code(base_char, code))
            .collect();
        Arc::clone(
            self.charsets
                .write()
                .entry((base_char, bits))
                .or_insert(table),
        )
    }

    /// Decode a record, or `None` if it is corrupt or unsupported.
    pub fn unpack(&self, record: &TableRecord) -> Option<String> {
        self.try_unpack(record).ok()
    }

    /// Decode a record, reporting why it was rejected.
    pub fn try_unpack(&self, record: &TableRecord) -> Result<String> {
        let header = record.header()?;
        let payload = record.payload()?;
        self.unpack_payload(&header, payload)
    }

    /// Decode an already validated (and decrypted) payload.
    pub fn unpack_payload(&self, header: &RecordHeader, payload: &[u8]) -> Result<String> {
        if header.is_utf16() {
            return Ok(decode_utf16(payload));
        }

        let bits = header.bits_per_char;
        if bits == 0 || bits > MAX_BITS_PER_CHAR {
            return Err(FormatError::UnsupportedWidth(bits));
        }

        let max_chars = payload.len() * 8 / bits as usize;
        let mut reader = BitReader::new(payload);
        let mut text = String::with_capacity(max_chars);

        if bits <= MAX_TABLE_BITS {
            let charset = self.charset(header.base_char, bits);
            for _ in 0..max_chars {
                let code = reader.read(bits);
                if code == 0 {
                    break;
                }
                text.push(charset[code as usize]);
            }
        } else {
            for _ in 0..max_chars {
                let code = reader.read(bits);
                if code == 0 {
                    break;
                }
                text.push(map_code(header.base_char, code));
            }
        }

        Ok(text)
    }
}

/// Decode UTF-16LE up to the first null code unit.
fn decode_utf16(payload: &[u8]) -> String {
    let units: Vec<u16> = payload
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .take_while(|&unit| unit != 0)
        .collect();
    String::from_utf16_lossy(&units)
}
