//! Raw string table record

use crate::error::{FormatError, Result};
use crate::record::header::{RECORD_HEADER_SIZE, RecordHeader};
use bytes::Bytes;

/// One string table entry as stored in its resource file.
///
/// The bytes are kept exactly as sliced out of the file, which may be shorter
/// than the header's `total_size` when the file was cut off. Validation
/// happens when the payload is requested.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRecord {
    raw: Bytes,
}

impl TableRecord {
    /// Wrap raw record bytes
    pub fn new(raw: Bytes) -> Self {
        Self { raw }
    }

    /// Raw bytes including the header
    pub fn raw(&self) -> &Bytes {
        &self.raw
    }

    /// Number of stored bytes
    pub fn len(&self) -> usize {
        self.raw.len()
    }

    /// Whether no bytes are stored
    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    /// Parse the record header
    pub fn header(&self) -> Result<RecordHeader> {
        RecordHeader::parse(&self.raw)
    }

    /// Validated payload window `[6, total_size)`.
    ///
    /// Fails unless `6 < total_size <= stored length`.
    pub fn payload(&self) -> Result<&[u8]> {
        let header = self.header()?;
        header
            .payload_len()
            .map(|len| RECORD_HEADER_SIZE + len)
            .filter(|&total| total <= self.raw.len())
            .map(|total| &self.raw[RECORD_HEADER_SIZE..total])
            .ok_or(FormatError::RecordSize {
                total_size: header.total_size,
                available: self.raw.len(),
            })
    }
}

impl From<Vec<u8>> for TableRecord {
    fn from(raw: Vec<u8>) -> Self {
        Self::new(Bytes::from(raw))
    }
}
