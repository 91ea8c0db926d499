//! Per-language string tables
//!
//! A string table maps a global index to the raw record stored for it. The
//! table for one language is spread over several resource files ("slots");
//! slot `n` owns the indices starting at its `start_index`, and records are
//! numbered consecutively from there in file order.

use crate::provider::{ContentStore, LanguageId, LanguageLayout, LanguageSlot};
use encstr_formats::{ParseEnd, RecordLimits, ResourceRecords, TableRecord};
use serde::Serialize;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Outcome of loading one slot
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SlotReport {
    /// File identifier of the slot
    pub file_id: String,
    /// First index assigned to the slot
    pub start_index: u64,
    /// Records stored from the file
    pub records: usize,
    /// Fetch failure, if the slot was skipped
    pub fetch_error: Option<String>,
    /// Whether parsing reached the end of the file
    pub clean: bool,
}

/// Summary of one table load
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TableLoadSummary {
    /// Language of the table
    pub language: LanguageId,
    /// Records stored across all slots
    pub records: usize,
    /// Slots whose file could not be fetched
    pub skipped_slots: usize,
    /// Per-slot details in layout order
    pub slots: Vec<SlotReport>,
    /// Wall time spent loading
    #[serde(skip)]
    pub elapsed: Duration,
}

/// Index to record map for one language
#[derive(Debug, Default)]
pub struct StringTable {
    language: LanguageId,
    records: HashMap<u64, TableRecord>,
    summary: TableLoadSummary,
}

impl StringTable {
    fn empty(language: LanguageId) -> Self {
        Self {
            language,
            records: HashMap::new(),
            summary: TableLoadSummary {
                language,
                ..TableLoadSummary::default()
            },
        }
    }

    /// Assemble the table for `language` from the files in `layout`.
    ///
    /// Slots whose file cannot be fetched are skipped; their indices stay
    /// unresolved.
    pub fn load(
        language: LanguageId,
        layout: &LanguageLayout,
        store: &dyn ContentStore,
        limits: RecordLimits,
    ) -> Self {
        let started = Instant::now();
        let mut table = Self::empty(language);

        for slot in &layout.slots {
            let report = table.load_slot(slot, store, limits);
            if report.fetch_error.is_some() {
                table.summary.skipped_slots += 1;
            }
            table.summary.slots.push(report);
        }

        table.summary.records = table.records.len();
        table.summary.elapsed = started.elapsed();
        info!(
            "Loaded string table for language {}: {} records from {} slots ({} skipped) in {:?}",
            language,
            table.summary.records,
            layout.slots.len(),
            table.summary.skipped_slots,
            table.summary.elapsed
        );
        table
    }

    fn load_slot(
        &mut self,
        slot: &LanguageSlot,
        store: &dyn ContentStore,
        limits: RecordLimits,
    ) -> SlotReport {
        let mut report = SlotReport {
            file_id: slot.file_id.clone(),
            start_index: slot.start_index,
            records: 0,
            fetch_error: None,
            clean: false,
        };

        let data = match store.fetch_file(&slot.file_id) {
            Ok(data) => data,
            Err(e) => {
                warn!("Skipping string table slot '{}': {e}", slot.file_id);
                report.fetch_error = Some(e.to_string());
                return report;
            }
        };

        let file_len = data.len();
        let mut parser = ResourceRecords::new(data, limits);
        let mut index = slot.start_index;
        for raw in parser.by_ref() {
            self.records.insert(index, TableRecord::new(raw));
            index = index.wrapping_add(1);
            report.records += 1;
        }

        let end = parser.end();
        report.clean = end.is_none_or(|end| end.is_clean());
        match end {
            Some(ParseEnd::InvalidSize { offset, entry_size }) => warn!(
                "String table slot '{}' stopped at offset {offset}/{file_len}: invalid record size {entry_size}",
                slot.file_id
            ),
            Some(ParseEnd::Truncated { offset, remaining }) => warn!(
                "String table slot '{}' truncated at offset {offset} ({remaining} bytes left)",
                slot.file_id
            ),
            Some(ParseEnd::Exhausted) | None => {}
        }

        debug!(
            "Slot '{}' contributed {} records starting at index {}",
            slot.file_id, report.records, slot.start_index
        );
        report
    }

    /// Record stored at `index`
    pub fn get(&self, index: u64) -> Option<&TableRecord> {
        self.records.get(&index)
    }

    /// Stored records in no particular order
    pub fn iter(&self) -> impl Iterator<Item = (u64, &TableRecord)> {
        self.records.iter().map(|(index, record)| (*index, record))
    }

    /// Number of stored records
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the table holds no records
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Language of the table
    pub const fn language(&self) -> LanguageId {
        self.language
    }

    /// Load summary
    pub const fn summary(&self) -> &TableLoadSummary {
        &self.summary
    }
}
