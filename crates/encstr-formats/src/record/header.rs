//! Fixed 6-byte string table record header
//!
//! ```text
//! u16 total_size (LE) | u16 base_char (LE) | u8 bits_per_char | u8 flags
//! ```

use crate::error::{FormatError, Result};
use binrw::{BinRead, BinWrite, io::Cursor};

/// Size of the record header in bytes
pub const RECORD_HEADER_SIZE: usize = 6;

/// Header at the start of every string table record
#[derive(BinRead, BinWrite, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[brw(little)]
pub struct RecordHeader {
    /// Size of the whole record including this header
    pub total_size: u16,
    /// First code point of the packed alphabet (minus 0x20)
    pub base_char: u16,
    /// Width of each packed character code
    pub bits_per_char: u8,
    /// Record flags (not interpreted by the decoder)
    pub flags: u8,
}

impl RecordHeader {
    /// Read a header from the start of `data`.
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < RECORD_HEADER_SIZE {
            return Err(FormatError::TruncatedHeader {
                expected: RECORD_HEADER_SIZE,
                actual: data.len(),
            });
        }
        let mut cursor = Cursor::new(&data[..RECORD_HEADER_SIZE]);
        Ok(Self::read(&mut cursor)?)
    }

    /// Serialize the header to its 6-byte wire form.
    pub fn to_bytes(&self) -> Result<[u8; RECORD_HEADER_SIZE]> {
        let mut buf = [0u8; RECORD_HEADER_SIZE];
        self.write(&mut Cursor::new(&mut buf[..]))?;
        Ok(buf)
    }

    /// Payload length implied by `total_size`, if the size is large enough
    /// to carry any payload
    pub fn payload_len(&self) -> Option<usize> {
        (self.total_size as usize)
            .checked_sub(RECORD_HEADER_SIZE)
            .filter(|&len| len > 0)
    }

    /// Whether the payload is stored as raw UTF-16LE
    pub const fn is_utf16(&self) -> bool {
        self.base_char == 0 && self.bits_per_char == 16
    }
}
