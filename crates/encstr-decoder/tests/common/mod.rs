//! Fixture builders shared by the integration tests.

#![allow(dead_code)]
#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use encstr_crypto::RecordCipher;
use encstr_formats::record::CONTROL_CHARS;

/// English language id used throughout the tests.
pub const EN: encstr_decoder::LanguageId = encstr_decoder::LanguageId(0);

/// Raw little-endian bytes of a token sequence.
pub fn raw_tokens(tokens: &[u16]) -> Vec<u8> {
    tokens.iter().flat_map(|t| t.to_le_bytes()).collect()
}

/// Encode a table index (and optional key) the way references carry them.
///
/// The key must be at least `0x7F00`; a single-token key is read as no key.
pub fn encode_reference(index: u64, key: u64) -> Vec<u8> {
    let mut tokens = encode_value(index);
    if key != 0 {
        tokens.extend(encode_value(key));
    }
    raw_tokens(&tokens)
}

fn encode_value(mut value: u64) -> Vec<u16> {
    const RANGE: u64 = 0x7F00;
    let mut tokens = vec![0x0100 + (value % RANGE) as u16];
    value /= RANGE;
    while value > 0 {
        tokens.push(0x8000 | (0x0100 + (value % RANGE) as u16));
        value /= RANGE;
    }
    tokens.reverse();
    tokens
}

/// 6-byte record header followed by `payload`.
pub fn record(base_char: u16, bits: u8, payload: &[u8]) -> Vec<u8> {
    let total = (6 + payload.len()) as u16;
    let mut raw = total.to_le_bytes().to_vec();
    raw.extend_from_slice(&base_char.to_le_bytes());
    raw.push(bits);
    raw.push(0);
    raw.extend_from_slice(payload);
    raw
}

/// UTF-16LE record, null terminated.
pub fn utf16_record(text: &str) -> Vec<u8> {
    let payload: Vec<u8> = text
        .encode_utf16()
        .chain(std::iter::once(0))
        .flat_map(u16::to_le_bytes)
        .collect();
    record(0, 16, &payload)
}

/// Header-only record, used to pad a file up to a wanted index.
pub fn filler() -> Vec<u8> {
    record(0, 16, &[])
}

/// Pack `text` into a little-endian bit stream of `bits`-wide codes.
pub fn pack_text(text: &str, base_char: u16, bits: u8) -> Vec<u8> {
    let mut codes: Vec<u32> = text
        .chars()
        .map(|c| {
            if (c as u32) >= u32::from(base_char) {
                c as u32 - u32::from(base_char) + 0x20
            } else {
                CONTROL_CHARS
                    .iter()
                    .position(|&control| control == c)
                    .expect("character not encodable") as u32
            }
        })
        .collect();
    codes.push(0);

    let total_bits = codes.len() * bits as usize;
    let mut out = vec![0u8; total_bits.div_ceil(8)];
    let mut pos = 0usize;
    for code in codes {
        for bit in 0..bits as usize {
            if (code >> bit) & 1 == 1 {
                out[pos / 8] |= 1 << (pos % 8);
            }
            pos += 1;
        }
    }
    out
}

/// Bit-packed record, payload encrypted with `key` unless it is 0.
pub fn packed_record(text: &str, base_char: u16, bits: u8, key: u64) -> Vec<u8> {
    let mut payload = pack_text(text, base_char, bits);
    if key != 0 {
        RecordCipher::new(key).unwrap().apply(&mut payload).unwrap();
    }
    record(base_char, bits, &payload)
}

/// Resource file with index 0 as a filler followed by `records`.
pub fn resource_file(records: &[Vec<u8>]) -> Vec<u8> {
    let mut file = filler();
    for record in records {
        file.extend_from_slice(record);
    }
    file
}
