//! Non-blocking decoder for encoded string references.
//!
//! A client stores translatable text as short `u16` token sequences instead of
//! literal strings. This crate turns those references back into text:
//!
//! 1. Parse the tokens into a table index and optional cipher key
//! 2. Look the index up in the string table for the active language
//! 3. RC4-decrypt the record when a key is present
//! 4. Unpack the UTF-16 or bit-packed payload
//! 5. Strip grammar tags and bracket escapes
//!
//! String tables are assembled lazily from resource files fetched through a
//! [`ContentStore`]; which files make up a language comes from a
//! [`TableMetadataProvider`]. Both are supplied by the host.
//!
//! [`StringDecoder::decode`] never blocks. Work runs on a single background
//! worker and the caller polls until the text shows up in the cache.
//!
//! # Example
//!
//! ```rust
//! use encstr_decoder::{
//!     LanguageId, LanguageLayout, MemoryContentStore, StaticMetadata, StringDecoder,
//! };
//! use std::sync::Arc;
//!
//! # fn main() -> Result<(), encstr_decoder::DecoderError> {
//! // One file holding a single UTF-16 record "Hi" at index 1
//! let store = Arc::new(MemoryContentStore::new());
//! store.insert("strings-en-0", vec![
//!     6, 0, 0, 0, 16, 0, // index 0: header only
//!     10, 0, 0, 0, 16, 0, b'H', 0, b'i', 0,
//! ]);
//! let metadata = Arc::new(
//!     StaticMetadata::new(LanguageId(0))
//!         .with_language(LanguageId(0), LanguageLayout::from_files(256, ["strings-en-0"])),
//! );
//!
//! let decoder = StringDecoder::new(store, metadata)?;
//! let reference = 0x0101u16.to_le_bytes();
//!
//! // First call starts the table load, the next one queues the decode
//! assert_eq!(decoder.decode(&reference, None), "");
//! decoder.wait_idle()?;
//! assert_eq!(decoder.decode(&reference, None), "");
//! decoder.wait_idle()?;
//! assert_eq!(decoder.decode(&reference, None), "Hi");
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![allow(clippy::must_use_candidate)]

use thiserror::Error;

// Decoder configuration
pub mod config;

// Host collaborators
pub mod provider;

// Per-language string tables
pub mod table;

// Decoded text cache and pending set
pub mod cache;

// Work counters
pub mod stats;

// Background worker
mod worker;

// Decode scheduling
pub mod decoder;

pub use cache::CacheKey;
pub use config::{DecoderConfig, TableLoadPolicy};
pub use decoder::StringDecoder;
pub use provider::{
    ContentStore, DirectoryContentStore, LanguageId, LanguageLayout, LanguageSlot,
    MemoryContentStore, StaticMetadata, TableMetadataProvider,
};
pub use stats::DecoderStatsSnapshot;
pub use table::{SlotReport, StringTable, TableLoadSummary};

/// Result type for decoder operations.
pub type Result<T> = std::result::Result<T, DecoderError>;

/// Errors raised on the decoder's internal seams.
///
/// None of these cross [`StringDecoder::decode`]; they surface from explicit
/// operations such as [`StringDecoder::load_language`], from collaborators
/// and from configuration loading.
#[derive(Debug, Error)]
pub enum DecoderError {
    /// The content store could not provide a file
    #[error("Failed to fetch file '{file_id}': {reason}")]
    Fetch {
        /// Opaque file identifier
        file_id: String,
        /// Store-specific failure description
        reason: String,
    },

    /// I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The metadata provider knows no layout for a language
    #[error("No string table layout for language {0}")]
    UnknownLanguage(LanguageId),

    /// Another thread is still building the table for a language
    #[error("String table for language {0} is still loading")]
    TableLoading(LanguageId),

    /// A reset discarded the table while it was being built
    #[error("String table for language {0} was discarded by a reset")]
    TableDiscarded(LanguageId),

    /// The background worker is gone
    #[error("Decode worker stopped")]
    WorkerStopped,

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Layout manifest could not be parsed
    #[error("Invalid layout manifest: {0}")]
    Manifest(#[from] serde_json::Error),
}
