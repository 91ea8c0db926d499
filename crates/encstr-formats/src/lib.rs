//! Formats for encoded string references and string tables
//!
//! This crate covers every byte-level format the string decoder touches:
//!
//! - **Tokens**: `u16` encoded references carrying a table index and an
//!   optional cipher key ([`token`])
//! - **Records**: 6-byte header plus UTF-16LE or bit-packed payload
//!   ([`record`])
//! - **Resource files**: flat record runs that make up one table slot
//!   ([`resource`])
//! - **Inline names**: player names carried behind a reserved prefix
//!   ([`name`])
//! - **Postprocessing**: grammar tag and bracket cleanup ([`postprocess`])
//!
//! Decryption lives in `encstr-crypto`; table assembly and scheduling live in
//! `encstr-decoder`.

#![warn(missing_docs)]
#![allow(clippy::cast_possible_truncation)] // Intentional for binary format parsing
#![allow(clippy::cast_lossless)] // Sometimes clearer than From
#![allow(clippy::doc_markdown)] // Format terms don't need backticks
#![allow(clippy::module_name_repetitions)] // Clear naming is preferred

pub mod error;
pub mod name;
pub mod postprocess;
pub mod record;
pub mod resource;
pub mod token;

pub use error::{FormatError, Result};
pub use record::{RecordHeader, RecordUnpacker, TableRecord};
pub use resource::{ParseEnd, RecordLimits, ResourceRecords};
pub use token::{ParsedReference, parse_reference, parse_tokens, tokens_from_bytes};
