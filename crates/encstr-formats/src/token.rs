//! Encoded string reference tokens
//!
//! An encoded reference is a sequence of `u16` tokens. Each token holds a
//! 15-bit magnitude and a continuation flag (`0x8000`). Magnitudes below
//! [`BASE`] are not valid digits. A value is a run of continuation tokens
//! closed by one token without the flag, accumulated big-end first in base
//! [`RANGE`]:
//!
//! ```text
//! index = ((d0 * RANGE) + d1) * RANGE + ... + dn
//! ```
//!
//! The first value is the string table index. If the token after it is a
//! continuation token, a second value follows: the cipher key for the record.

use std::fmt;

/// Smallest valid digit magnitude
pub const BASE: u16 = 0x0100;

/// Continuation flag
pub const MORE: u16 = 0x8000;

/// Radix of the digit encoding
pub const RANGE: u64 = (MORE - BASE) as u64;

/// Table index and cipher key recovered from an encoded reference
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ParsedReference {
    /// String table index; 0 means no reference
    pub index: u64,
    /// Cipher key; 0 means the record is stored in plaintext
    pub key: u64,
}

impl ParsedReference {
    /// Whether the reference resolves to nothing
    pub const fn is_null(&self) -> bool {
        self.index == 0
    }

    /// Whether the referenced record is encrypted
    pub const fn is_encrypted(&self) -> bool {
        self.key != 0
    }
}

impl fmt::Display for ParsedReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "index={} key={:016x}", self.index, self.key)
    }
}

/// Accumulate one value starting at `*pos`.
///
/// Stops on a zero token, an invalid digit (without consuming it) or after
/// a token without the continuation flag. Overflow wraps.
fn read_value(tokens: &[u16], pos: &mut usize) -> u64 {
    let mut value = 0u64;
    while let Some(&token) = tokens.get(*pos) {
        if token == 0 {
            break;
        }
        let Some(digit) = (token & !MORE).checked_sub(BASE) else {
            break;
        };
        *pos += 1;
        if token & MORE == 0 {
            return value.wrapping_add(u64::from(digit));
        }
        value = value.wrapping_add(u64::from(digit)).wrapping_mul(RANGE);
    }
    value
}

/// Parse a token sequence into its table index and cipher key.
///
/// Parsing never fails: malformed input yields whatever was accumulated
/// before the first invalid token.
pub fn parse_tokens(tokens: &[u16]) -> ParsedReference {
    let mut pos = 0;
    let index = read_value(tokens, &mut pos);

    let key = match tokens.get(pos) {
        Some(&token) if token != 0 && token & MORE != 0 => read_value(tokens, &mut pos),
        _ => 0,
    };

    ParsedReference { index, key }
}

/// Split raw reference bytes into little-endian tokens.
///
/// Stops at the first zero token; an odd trailing byte is dropped.
pub fn tokens_from_bytes(raw: &[u8]) -> Vec<u16> {
    raw.chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .take_while(|&token| token != 0)
        .collect()
}

/// Parse a raw little-endian reference.
pub fn parse_reference(raw: &[u8]) -> ParsedReference {
    parse_tokens(&tokens_from_bytes(raw))
}
