//! String table resource files
//!
//! A resource file is a flat run of records with no file header. Each record
//! starts with its own little-endian `u16` size. Parsing stops at the first
//! size outside [`RecordLimits`], which is how files with a corrupt tail are
//! cut short. A record that claims more bytes than the file holds is yielded
//! with whatever bytes remain and ends the parse; the record itself is then
//! rejected when it is unpacked.

use bytes::Bytes;

/// Accepted range of record sizes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordLimits {
    /// Smallest acceptable record size (header only)
    pub min_entry_size: u16,
    /// Largest acceptable record size
    pub max_entry_size: u16,
}

impl Default for RecordLimits {
    fn default() -> Self {
        Self {
            min_entry_size: 6,
            max_entry_size: 8192,
        }
    }
}

impl RecordLimits {
    /// Whether `size` is a plausible record size
    pub const fn accepts(&self, size: u16) -> bool {
        size >= self.min_entry_size && size <= self.max_entry_size
    }
}

/// Why a resource file parse ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseEnd {
    /// Every byte was consumed by records
    Exhausted,
    /// A size field outside the accepted range
    InvalidSize {
        /// Offset of the size field
        offset: usize,
        /// Size read at that offset
        entry_size: u16,
    },
    /// The file ended inside a size field or record
    Truncated {
        /// Offset of the last record
        offset: usize,
        /// Bytes left at that offset
        remaining: usize,
    },
}

impl ParseEnd {
    /// Whether the file parsed cleanly to its end
    pub const fn is_clean(&self) -> bool {
        matches!(self, Self::Exhausted)
    }
}

/// Iterator over the raw records of one resource file.
///
/// Yields zero-copy slices of the file. [`ResourceRecords::end`] reports why
/// iteration stopped once it has.
#[derive(Debug, Clone)]
pub struct ResourceRecords {
    data: Bytes,
    offset: usize,
    limits: RecordLimits,
    end: Option<ParseEnd>,
}

impl ResourceRecords {
    /// Start parsing `data` with the given limits
    pub fn new(data: Bytes, limits: RecordLimits) -> Self {
        Self {
            data,
            offset: 0,
            limits,
            end: None,
        }
    }

    /// Reason parsing stopped, once the iterator is exhausted
    pub const fn end(&self) -> Option<ParseEnd> {
        self.end
    }
}

impl Iterator for ResourceRecords {
    type Item = Bytes;

    fn next(&mut self) -> Option<Bytes> {
        if self.end.is_some() {
            return None;
        }

        let remaining = self.data.len() - self.offset;
        if remaining == 0 {
            self.end = Some(ParseEnd::Exhausted);
            return None;
        }
        if remaining < 2 {
            self.end = Some(ParseEnd::Truncated {
                offset: self.offset,
                remaining,
            });
            return None;
        }

        let entry_size =
            u16::from_le_bytes([self.data[self.offset], self.data[self.offset + 1]]);
        if !self.limits.accepts(entry_size) {
            self.end = Some(ParseEnd::InvalidSize {
                offset: self.offset,
                entry_size,
            });
            return None;
        }

        let start = self.offset;
        let size = entry_size as usize;
        if size > remaining {
            // Keep the cut-off record; unpacking rejects it later
            self.end = Some(ParseEnd::Truncated {
                offset: start,
                remaining,
            });
            self.offset = self.data.len();
            return Some(self.data.slice(start..));
        }

        self.offset += size;
        Some(self.data.slice(start..start + size))
    }
}
