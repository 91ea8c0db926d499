//! Error types for string table formats

use thiserror::Error;

/// Errors that can occur when reading records and resource files
#[derive(Debug, Error)]
pub enum FormatError {
    /// Not enough bytes for a fixed-size header
    #[error("Truncated header: expected {expected} bytes, got {actual} bytes")]
    TruncatedHeader {
        /// Header size in bytes
        expected: usize,
        /// Bytes available
        actual: usize,
    },

    /// Record size field is out of bounds for the stored bytes
    #[error("Invalid record size {total_size}: {available} bytes available")]
    RecordSize {
        /// Size claimed by the record header
        total_size: u16,
        /// Bytes actually stored for the record
        available: usize,
    },

    /// Bit width the unpacker cannot handle
    #[error("Unsupported bits per character: {0}")]
    UnsupportedWidth(u8),

    /// Binary read/write error
    #[error("Binary parsing error: {0}")]
    BinRead(String),

    /// IO error during parsing
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<binrw::Error> for FormatError {
    fn from(e: binrw::Error) -> Self {
        Self::BinRead(e.to_string())
    }
}

/// Result type alias for format operations
pub type Result<T> = std::result::Result<T, FormatError>;
