//! Inline player names
//!
//! Player names are not looked up in a string table. They travel inline
//! behind a reserved prefix instead:
//!
//! ```text
//! A9 0B | 2 reserved bytes | c0 00 | c1 00 | ... | 00 00
//! ```
//!
//! Each character is a little-endian pair whose low byte is the ASCII code.
//! A pair with a low byte of 0 or 1 and a high byte of 0 ends the name.

/// Reserved prefix (`0x0BA9` little-endian)
pub const INLINE_NAME_PREFIX: [u8; 2] = [0xA9, 0x0B];

/// Offset of the first character pair
pub const INLINE_NAME_OFFSET: usize = 4;

/// Whether `raw` carries an inline name rather than a table reference
pub fn is_inline_name(raw: &[u8]) -> bool {
    raw.starts_with(&INLINE_NAME_PREFIX)
}

/// Decode the inline name in `raw`, or `None` if the prefix is missing.
pub fn decode_inline_name(raw: &[u8]) -> Option<String> {
    if !is_inline_name(raw) {
        return None;
    }

    let body = raw.get(INLINE_NAME_OFFSET..).unwrap_or_default();
    let name = body
        .chunks_exact(2)
        .take_while(|pair| !(pair[0] <= 1 && pair[1] == 0))
        .map(|pair| {
            char::from_u32(u32::from(u16::from_le_bytes([pair[0], pair[1]])))
                .unwrap_or(char::REPLACEMENT_CHARACTER)
        })
        .collect();
    Some(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(name: &str, terminator: u8) -> Vec<u8> {
        let mut raw = INLINE_NAME_PREFIX.to_vec();
        raw.extend_from_slice(&[0x00, 0x00]);
        for b in name.bytes() {
            raw.extend_from_slice(&[b, 0]);
        }
        raw.extend_from_slice(&[terminator, 0]);
        raw
    }

    #[test]
    fn test_decode_name() {
        assert_eq!(
            decode_inline_name(&encode("Mhenlo", 0)).as_deref(),
            Some("Mhenlo")
        );
    }

    #[test]
    fn test_terminator_one() {
        let mut raw = encode("Cynn", 1);
        raw.extend_from_slice(&[b'X', 0]);
        assert_eq!(decode_inline_name(&raw).as_deref(), Some("Cynn"));
    }

    #[test]
    fn test_end_of_buffer_terminates() {
        let mut raw = encode("Devona", 0);
        raw.truncate(raw.len() - 2);
        assert_eq!(decode_inline_name(&raw).as_deref(), Some("Devona"));
    }

    #[test]
    fn test_prefix_only() {
        assert_eq!(decode_inline_name(&[0xA9, 0x0B]).as_deref(), Some(""));
        assert_eq!(decode_inline_name(&[0xA9, 0x0B, 0x00]).as_deref(), Some(""));
    }

    #[test]
    fn test_not_a_name() {
        assert!(!is_inline_name(&[0x01, 0x81]));
        assert!(!is_inline_name(&[0xA9]));
        assert_eq!(decode_inline_name(&[0x05, 0x01]), None);
    }
}
