//! Host collaborators
//!
//! The decoder does not know where resource files live or which files make up
//! a language's string table. The host supplies both through
//! [`ContentStore`] and [`TableMetadataProvider`]. Reference implementations
//! cover in-memory data, a directory of extracted files and a fixed layout
//! manifest.

use crate::{DecoderError, Result};
use bytes::Bytes;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use tracing::debug;

/// Client language identifier
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct LanguageId(pub u32);

impl fmt::Display for LanguageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One resource file contributing a segment of a string table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguageSlot {
    /// Opaque identifier passed to the content store
    pub file_id: String,
    /// Table index of the file's first record
    pub start_index: u64,
    /// End of the index range reserved for the file (exclusive)
    pub end_index: u64,
}

/// Files making up one language's string table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguageLayout {
    /// Index range reserved per slot
    pub entries_per_file: u32,
    /// Slots in index order
    pub slots: Vec<LanguageSlot>,
}

impl LanguageLayout {
    /// Lay out files back to back, slot `n` starting at
    /// `n * entries_per_file`.
    pub fn from_files<I, S>(entries_per_file: u32, files: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let per_file = u64::from(entries_per_file);
        let slots = files
            .into_iter()
            .enumerate()
            .map(|(slot, file_id)| {
                let start_index = slot as u64 * per_file;
                LanguageSlot {
                    file_id: file_id.into(),
                    start_index,
                    end_index: start_index + per_file,
                }
            })
            .collect();
        Self {
            entries_per_file,
            slots,
        }
    }
}

/// Source of raw resource file bytes
pub trait ContentStore: Send + Sync {
    /// Fetch a file by its opaque identifier
    fn fetch_file(&self, file_id: &str) -> Result<Bytes>;
}

/// Source of string table layouts and the active language
pub trait TableMetadataProvider: Send + Sync {
    /// Language the host is currently displaying
    fn current_language(&self) -> LanguageId;

    /// Layout of the string table for `language`, if the host has one
    fn language_layout(&self, language: LanguageId) -> Option<LanguageLayout>;
}

/// Content store backed by an in-memory map
#[derive(Debug, Default)]
pub struct MemoryContentStore {
    files: DashMap<String, Bytes>,
}

impl MemoryContentStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a file
    pub fn insert(&self, file_id: impl Into<String>, data: impl Into<Bytes>) {
        self.files.insert(file_id.into(), data.into());
    }

    /// Remove a file
    pub fn remove(&self, file_id: &str) -> Option<Bytes> {
        self.files.remove(file_id).map(|(_, data)| data)
    }

    /// Number of stored files
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Whether the store holds no files
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl ContentStore for MemoryContentStore {
    fn fetch_file(&self, file_id: &str) -> Result<Bytes> {
        self.files
            .get(file_id)
            .map(|data| data.clone())
            .ok_or_else(|| DecoderError::Fetch {
                file_id: file_id.to_string(),
                reason: "not present in memory store".to_string(),
            })
    }
}

/// Content store reading extracted files from a directory.
///
/// File identifiers are treated as relative paths below the root; absolute
/// paths and parent components are refused.
#[derive(Debug, Clone)]
pub struct DirectoryContentStore {
    root: PathBuf,
}

impl DirectoryContentStore {
    /// Serve files from `root`
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, file_id: &str) -> Result<PathBuf> {
        let relative = Path::new(file_id);
        let plain = !file_id.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !plain {
            return Err(DecoderError::Fetch {
                file_id: file_id.to_string(),
                reason: "identifier is not a plain relative path".to_string(),
            });
        }
        Ok(self.root.join(relative))
    }
}

impl ContentStore for DirectoryContentStore {
    fn fetch_file(&self, file_id: &str) -> Result<Bytes> {
        let path = self.resolve(file_id)?;
        debug!("Reading resource file {}", path.display());
        std::fs::read(&path)
            .map(Bytes::from)
            .map_err(|e| DecoderError::Fetch {
                file_id: file_id.to_string(),
                reason: e.to_string(),
            })
    }
}

/// Language entry of a layout manifest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestLanguage {
    /// Language identifier
    pub language: LanguageId,
    /// Index range reserved per file
    pub entries_per_file: u32,
    /// File identifiers in slot order
    pub files: Vec<String>,
}

/// JSON layout manifest understood by [`StaticMetadata`]
///
/// ```json
/// {
///   "current_language": 0,
///   "languages": [
///     { "language": 0, "entries_per_file": 1024, "files": ["en-0", "en-1"] }
///   ]
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutManifest {
    /// Language reported as current
    pub current_language: LanguageId,
    /// Known languages
    pub languages: Vec<ManifestLanguage>,
}

/// Metadata provider with fixed layouts and a settable current language
#[derive(Debug, Default)]
pub struct StaticMetadata {
    current: AtomicU32,
    layouts: HashMap<LanguageId, LanguageLayout>,
}

impl StaticMetadata {
    /// Create a provider with no layouts
    pub fn new(current: LanguageId) -> Self {
        Self {
            current: AtomicU32::new(current.0),
            layouts: HashMap::new(),
        }
    }

    /// Add a language layout
    #[must_use]
    pub fn with_language(mut self, language: LanguageId, layout: LanguageLayout) -> Self {
        self.layouts.insert(language, layout);
        self
    }

    /// Build a provider from a parsed manifest
    pub fn from_manifest(manifest: LayoutManifest) -> Self {
        manifest.languages.into_iter().fold(
            Self::new(manifest.current_language),
            |metadata, entry| {
                let layout = LanguageLayout::from_files(entry.entries_per_file, entry.files);
                metadata.with_language(entry.language, layout)
            },
        )
    }

    /// Parse a JSON layout manifest
    pub fn from_json(json: &str) -> Result<Self> {
        let manifest: LayoutManifest = serde_json::from_str(json)?;
        Ok(Self::from_manifest(manifest))
    }

    /// Read a JSON layout manifest from disk
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Change the language reported as current
    pub fn set_current_language(&self, language: LanguageId) {
        self.current.store(language.0, Ordering::Relaxed);
    }

    /// Languages with a layout
    pub fn languages(&self) -> Vec<LanguageId> {
        let mut languages: Vec<LanguageId> = self.layouts.keys().copied().collect();
        languages.sort_unstable();
        languages
    }
}

impl TableMetadataProvider for StaticMetadata {
    fn current_language(&self) -> LanguageId {
        LanguageId(self.current.load(Ordering::Relaxed))
    }

    fn language_layout(&self, language: LanguageId) -> Option<LanguageLayout> {
        self.layouts.get(&language).cloned()
    }
}
