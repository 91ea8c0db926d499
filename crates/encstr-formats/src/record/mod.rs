//! String table records
//!
//! Every entry of a string table resource file is a record: a 6-byte header
//! followed by `total_size - 6` payload bytes. The payload may be RC4
//! encrypted (see `encstr-crypto`); once decrypted it is either raw UTF-16LE
//! or a bit-packed character stream.
//!
//! # Usage
//!
//! ```rust
//! use encstr_formats::record::{RecordUnpacker, TableRecord};
//!
//! // total_size 8, UTF-16LE payload "A"
//! let record = TableRecord::from(vec![8, 0, 0, 0, 16, 0, b'A', 0]);
//! let unpacker = RecordUnpacker::new();
//! assert_eq!(unpacker.unpack(&record).as_deref(), Some("A"));
//! ```

pub mod entry;
pub mod header;
pub mod unpack;

// Re-export main types
pub use entry::TableRecord;
pub use header::{RECORD_HEADER_SIZE, RecordHeader};
pub use unpack::{CONTROL_CHARS, RecordUnpacker, map_code};
