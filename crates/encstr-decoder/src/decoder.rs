//! Decode scheduling
//!
//! [`StringDecoder`] owns the string tables, the decoded text cache and the
//! background worker. Callers poll [`StringDecoder::decode`]; the first call
//! for a reference schedules work and returns an empty string, later calls
//! return the cached text once the worker has produced it.

use crate::cache::{CacheKey, Claim, DecodeCache};
use crate::config::{DecoderConfig, TableLoadPolicy};
use crate::provider::{ContentStore, LanguageId, TableMetadataProvider};
use crate::stats::{DecoderStats, DecoderStatsSnapshot};
use crate::table::{StringTable, TableLoadSummary};
use crate::worker::{Task, Worker};
use crate::{DecoderError, Result};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use encstr_crypto::RecordCipher;
use encstr_formats::{RecordUnpacker, name, parse_reference, postprocess};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, trace, warn};

#[derive(Debug, Clone)]
enum TableState {
    Loading,
    Ready(Arc<StringTable>),
}

/// State shared with the worker thread
struct Shared {
    config: DecoderConfig,
    store: Arc<dyn ContentStore>,
    metadata: Arc<dyn TableMetadataProvider>,
    tables: DashMap<LanguageId, TableState>,
    cache: DecodeCache,
    unpacker: RecordUnpacker,
    stats: DecoderStats,
}

impl Shared {
    fn ready_table(&self, language: LanguageId) -> Option<Arc<StringTable>> {
        match self.tables.get(&language)?.value() {
            TableState::Ready(table) => Some(Arc::clone(table)),
            TableState::Loading => None,
        }
    }

    fn build_table(&self, language: LanguageId) -> Option<StringTable> {
        let layout = self.metadata.language_layout(language)?;
        Some(StringTable::load(
            language,
            &layout,
            self.store.as_ref(),
            self.config.record_limits(),
        ))
    }

    fn install_table(&self, table: Arc<StringTable>, generation: u64) -> bool {
        let language = table.language();
        let installed = self.cache.commit(generation, || {
            self.tables.insert(language, TableState::Ready(table));
        });
        if installed {
            DecoderStats::bump(&self.stats.tables_loaded);
        } else {
            debug!("Discarding string table for language {language} built before reset");
        }
        installed
    }

    /// Drop a `Loading` marker placed under `generation` so a later call
    /// can claim the load again
    fn release_table(&self, language: LanguageId, generation: u64) {
        self.cache.commit(generation, || {
            self.tables
                .remove_if(&language, |_, state| matches!(state, TableState::Loading));
        });
    }

    /// Load a table whose `Loading` marker was placed under `generation`.
    ///
    /// A language without a layout is released again, so the next decode
    /// retries once the metadata provider knows it.
    fn load_table(&self, language: LanguageId, generation: u64) {
        if self.cache.generation() != generation {
            debug!("Skipping string table load for language {language} queued before reset");
            return;
        }
        match self.build_table(language) {
            Some(table) => {
                self.install_table(Arc::new(table), generation);
            }
            None => {
                debug!("{}", DecoderError::UnknownLanguage(language));
                self.release_table(language, generation);
            }
        }
    }

    fn run_decode(&self, key: &CacheKey, generation: u64) {
        DecoderStats::bump(&self.stats.pipeline_runs);
        let text = self.resolve(key);
        if !self.cache.complete(key, generation, text) {
            debug!("Discarding decode of {:02x?} started before reset", key.raw);
        }
    }

    /// parse, lookup, decrypt, unpack, postprocess
    fn resolve(&self, key: &CacheKey) -> Option<String> {
        let reference = parse_reference(&key.raw);
        trace!("Resolving {reference} for language {}", key.language);

        let Some(table) = self.ready_table(key.language) else {
            debug!("No string table for language {}", key.language);
            return None;
        };

        // Index 0 is never a real entry
        let record = if reference.is_null() {
            None
        } else {
            table.get(reference.index)
        };
        let Some(record) = record else {
            DecoderStats::bump(&self.stats.lookup_misses);
            debug!("No record for {reference}");
            return None;
        };

        let parts = record
            .header()
            .and_then(|header| record.payload().map(|payload| (header, payload)));
        let (header, payload) = match parts {
            Ok(parts) => parts,
            Err(e) => {
                DecoderStats::bump(&self.stats.corrupt_records);
                debug!("Corrupt record at index {}: {e}", reference.index);
                return None;
            }
        };

        let mut payload = payload.to_vec();
        if reference.is_encrypted() {
            if let Err(e) = RecordCipher::new(reference.key).and_then(|c| c.apply(&mut payload)) {
                warn!("Failed to decrypt record at index {}: {e}", reference.index);
                return None;
            }
            DecoderStats::bump(&self.stats.decryptions);
        }

        match self.unpacker.unpack_payload(&header, &payload) {
            Ok(text) => Some(postprocess::process(&text)),
            Err(e) => {
                DecoderStats::bump(&self.stats.unpack_failures);
                debug!("Failed to unpack record at index {}: {e}", reference.index);
                None
            }
        }
    }

    fn handle(&self, task: Task) {
        match task {
            Task::LoadTable {
                language,
                generation,
            } => self.load_table(language, generation),
            Task::Decode { key, generation } => self.run_decode(&key, generation),
            Task::Barrier(_) => {}
        }
    }
}

/// Non-blocking decoder for encoded string references.
///
/// Every public method takes `&self`; the decoder can be shared between
/// threads behind an [`Arc`].
pub struct StringDecoder {
    shared: Arc<Shared>,
    worker: Worker,
}

impl StringDecoder {
    /// Create a decoder with the default configuration
    pub fn new(
        store: Arc<dyn ContentStore>,
        metadata: Arc<dyn TableMetadataProvider>,
    ) -> Result<Self> {
        Self::with_config(store, metadata, DecoderConfig::default())
    }

    /// Create a decoder with a custom configuration
    pub fn with_config(
        store: Arc<dyn ContentStore>,
        metadata: Arc<dyn TableMetadataProvider>,
        config: DecoderConfig,
    ) -> Result<Self> {
        config.validate()?;

        let shared = Arc::new(Shared {
            config,
            store,
            metadata,
            tables: DashMap::new(),
            cache: DecodeCache::new(),
            unpacker: RecordUnpacker::new(),
            stats: DecoderStats::default(),
        });

        let handler = Arc::clone(&shared);
        let worker = Worker::spawn(&shared.config.worker_thread_name, move |task| {
            handler.handle(task);
        })?;

        Ok(Self { shared, worker })
    }

    /// Decode a raw reference.
    ///
    /// Returns the text if it is cached. Otherwise schedules whatever work is
    /// missing (table load or decode) and returns an empty string; poll again
    /// later. Unresolvable references stay empty. A language the metadata
    /// provider has no layout for is looked up again on every call, so it
    /// starts resolving as soon as the provider learns it.
    ///
    /// `language` defaults to the metadata provider's current language.
    pub fn decode(&self, raw: &[u8], language: Option<LanguageId>) -> String {
        if let Some(name) = name::decode_inline_name(raw) {
            DecoderStats::bump(&self.shared.stats.inline_names);
            return name;
        }

        let language = language.unwrap_or_else(|| self.shared.metadata.current_language());
        let key = CacheKey::new(language, raw);
        if let Some(text) = self.shared.cache.get(&key) {
            DecoderStats::bump(&self.shared.stats.cache_hits);
            return text;
        }
        DecoderStats::bump(&self.shared.stats.cache_misses);

        if !self.ensure_table(language) {
            return String::new();
        }

        match self.shared.cache.claim(&key) {
            Claim::Cached(text) => text,
            Claim::Pending => String::new(),
            Claim::Claimed(generation) => {
                trace!("Queueing decode of {raw:02x?}");
                let task = Task::Decode {
                    key: key.clone(),
                    generation,
                };
                if let Err(e) = self.worker.submit(task) {
                    warn!("Failed to queue decode: {e}");
                    self.shared.cache.complete(&key, generation, None);
                }
                String::new()
            }
        }
    }

    /// Cached text for a reference, without scheduling any work
    pub fn try_get_result(&self, raw: &[u8], language: Option<LanguageId>) -> Option<String> {
        if let Some(name) = name::decode_inline_name(raw) {
            return Some(name);
        }
        let language = language.unwrap_or_else(|| self.shared.metadata.current_language());
        self.shared.cache.get(&CacheKey::new(language, raw))
    }

    /// Whether the table for `language` is ready, starting its load if it
    /// was never requested.
    fn ensure_table(&self, language: LanguageId) -> bool {
        if let Some(state) = self.shared.tables.get(&language) {
            return matches!(state.value(), TableState::Ready(_));
        }

        let claimed = self.shared.cache.with_generation(|generation| {
            match self.shared.tables.entry(language) {
                Entry::Occupied(_) => None,
                Entry::Vacant(slot) => {
                    slot.insert(TableState::Loading);
                    Some(generation)
                }
            }
        });
        let Some(generation) = claimed else {
            return self.is_language_loaded(language);
        };

        match self.shared.config.table_load {
            TableLoadPolicy::Worker => {
                debug!("Queueing string table load for language {language}");
                let task = Task::LoadTable {
                    language,
                    generation,
                };
                if let Err(e) = self.worker.submit(task) {
                    warn!("Failed to queue string table load: {e}");
                    self.shared.tables.remove(&language);
                }
                false
            }
            TableLoadPolicy::Caller => {
                self.shared.load_table(language, generation);
                self.is_language_loaded(language)
            }
        }
    }

    /// Build the table for `language` on the calling thread.
    ///
    /// Returns the summary of the table already loaded, if any. If a load is
    /// already queued on the worker, waits for it instead of building a
    /// second copy.
    ///
    /// # Errors
    ///
    /// - [`DecoderError::UnknownLanguage`] if the metadata provider has no
    ///   layout for `language`
    /// - [`DecoderError::TableLoading`] if another caller is still building it
    /// - [`DecoderError::TableDiscarded`] if a [`reset`](Self::reset) landed
    ///   while it was being built
    pub fn load_language(&self, language: LanguageId) -> Result<TableLoadSummary> {
        let claimed = self.shared.cache.with_generation(|generation| {
            match self.shared.tables.entry(language) {
                Entry::Occupied(slot) => Err(slot.get().clone()),
                Entry::Vacant(slot) => {
                    slot.insert(TableState::Loading);
                    Ok(generation)
                }
            }
        });

        let generation = match claimed {
            Ok(generation) => generation,
            Err(TableState::Ready(table)) => return Ok(table.summary().clone()),
            Err(TableState::Loading) => return self.await_table(language),
        };

        let Some(table) = self.shared.build_table(language) else {
            self.shared.release_table(language, generation);
            return Err(DecoderError::UnknownLanguage(language));
        };
        let summary = table.summary().clone();
        if self.shared.install_table(Arc::new(table), generation) {
            Ok(summary)
        } else {
            Err(DecoderError::TableDiscarded(language))
        }
    }

    /// Wait for a load claimed elsewhere
    fn await_table(&self, language: LanguageId) -> Result<TableLoadSummary> {
        debug!("String table for language {language} already loading, waiting for worker");
        self.wait_idle()?;
        match self.shared.ready_table(language) {
            Some(table) => Ok(table.summary().clone()),
            None if self.shared.metadata.language_layout(language).is_none() => {
                Err(DecoderError::UnknownLanguage(language))
            }
            None => Err(DecoderError::TableLoading(language)),
        }
    }

    /// Whether the table for `language` has been built
    pub fn is_language_loaded(&self, language: LanguageId) -> bool {
        self.shared.ready_table(language).is_some()
    }

    /// Block until every task queued so far has finished.
    ///
    /// `decode` never calls this. Safe to call from inside an async runtime,
    /// though it blocks the calling thread.
    pub fn wait_idle(&self) -> Result<()> {
        self.worker.wait_idle()
    }

    /// Drop every table, cached text and pending marker.
    ///
    /// Tasks already queued still run but their results are discarded.
    /// Counters are kept.
    pub fn reset(&self) {
        let generation = self.shared.cache.reset(|| self.shared.tables.clear());
        debug!("Decoder reset (generation {generation})");
    }

    /// Snapshot of the work counters
    pub fn stats(&self) -> DecoderStatsSnapshot {
        self.shared.stats.snapshot()
    }

    /// Number of cached texts
    pub fn cached_len(&self) -> usize {
        self.shared.cache.len()
    }

    /// Number of decodes in flight
    pub fn pending_len(&self) -> usize {
        self.shared.cache.pending_len()
    }

    /// Active configuration
    pub fn config(&self) -> &DecoderConfig {
        &self.shared.config
    }
}

impl fmt::Debug for StringDecoder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StringDecoder")
            .field("config", &self.shared.config)
            .field("tables", &self.shared.tables.len())
            .field("cached", &self.shared.cache.len())
            .field("pending", &self.shared.cache.pending_len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::provider::{LanguageLayout, MemoryContentStore, StaticMetadata};
    use pretty_assertions::assert_eq;

    const EN: LanguageId = LanguageId(0);
    const DE: LanguageId = LanguageId(3);

    fn utf16_record(text: &str) -> Vec<u8> {
        let payload: Vec<u8> = text
            .encode_utf16()
            .chain(std::iter::once(0))
            .flat_map(u16::to_le_bytes)
            .collect();
        let mut raw = ((6 + payload.len()) as u16).to_le_bytes().to_vec();
        raw.extend_from_slice(&[0, 0, 16, 0]);
        raw.extend_from_slice(&payload);
        raw
    }

    fn table_file(texts: &[&str]) -> Vec<u8> {
        // Index 0 is a placeholder
        let mut file = vec![6, 0, 0, 0, 16, 0];
        for text in texts {
            file.extend(utf16_record(text));
        }
        file
    }

    fn reference(index: u16) -> [u8; 2] {
        (0x0100 + index).to_le_bytes()
    }

    fn decoder(config: DecoderConfig) -> StringDecoder {
        let store = Arc::new(MemoryContentStore::new());
        store.insert("en", table_file(&["[M]Ranger", "cost[lbracket]5g[rbracket]"]));
        store.insert("de", table_file(&["Waldläufer"]));
        let metadata = Arc::new(
            StaticMetadata::new(EN)
                .with_language(EN, LanguageLayout::from_files(1024, ["en"]))
                .with_language(DE, LanguageLayout::from_files(1024, ["de"])),
        );
        StringDecoder::with_config(store, metadata, config).unwrap()
    }

    fn poll(decoder: &StringDecoder, raw: &[u8], language: Option<LanguageId>) -> String {
        for _ in 0..3 {
            let text = decoder.decode(raw, language);
            if !text.is_empty() {
                return text;
            }
            decoder.wait_idle().unwrap();
        }
        decoder.decode(raw, language)
    }

    #[test]
    fn test_decode_after_polling() {
        let decoder = decoder(DecoderConfig::default());
        let raw = reference(1);

        assert_eq!(decoder.decode(&raw, None), "");
        assert!(decoder.try_get_result(&raw, None).is_none());
        decoder.wait_idle().unwrap();
        assert!(decoder.is_language_loaded(EN));

        assert_eq!(decoder.decode(&raw, None), "");
        decoder.wait_idle().unwrap();
        assert_eq!(decoder.decode(&raw, None), "Ranger");
        assert_eq!(decoder.try_get_result(&raw, None).as_deref(), Some("Ranger"));
    }

    #[test]
    fn test_postprocessing_applied() {
        let decoder = decoder(DecoderConfig::default());
        assert_eq!(poll(&decoder, &reference(2), None), "cost[5g]");
    }

    #[test]
    fn test_language_hint() {
        let decoder = decoder(DecoderConfig::default());
        assert_eq!(poll(&decoder, &reference(1), Some(DE)), "Waldläufer");
        assert_eq!(poll(&decoder, &reference(1), Some(EN)), "Ranger");
        assert_eq!(decoder.stats().tables_loaded, 2);
    }

    #[test]
    fn test_caller_load_policy() {
        let decoder = decoder(DecoderConfig::new().with_table_load(TableLoadPolicy::Caller));
        let raw = reference(1);

        // Table is built inline so the decode is queued by the first call
        assert_eq!(decoder.decode(&raw, None), "");
        assert!(decoder.is_language_loaded(EN));
        decoder.wait_idle().unwrap();
        assert_eq!(decoder.decode(&raw, None), "Ranger");
    }

    #[test]
    fn test_cache_hit_skips_pipeline() {
        let decoder = decoder(DecoderConfig::default());
        let raw = reference(1);
        assert_eq!(poll(&decoder, &raw, None), "Ranger");

        let runs = decoder.stats().pipeline_runs;
        assert_eq!(decoder.decode(&raw, None), "Ranger");
        assert_eq!(decoder.decode(&raw, None), "Ranger");
        let stats = decoder.stats();
        assert_eq!(stats.pipeline_runs, runs);
        assert!(stats.cache_hits >= 2);
    }

    #[test]
    fn test_unknown_index_stays_empty() {
        let decoder = decoder(DecoderConfig::default());
        assert_eq!(poll(&decoder, &reference(40), None), "");
        assert_eq!(poll(&decoder, &reference(0), None), "");
        decoder.wait_idle().unwrap();

        // Misses are not cached, so each poll reran the pipeline
        assert!(decoder.stats().lookup_misses >= 4);
        assert_eq!(decoder.cached_len(), 0);
        assert_eq!(decoder.pending_len(), 0);
    }

    #[test]
    fn test_unknown_language_not_loaded() {
        let decoder = decoder(DecoderConfig::default());
        assert_eq!(poll(&decoder, &reference(1), Some(LanguageId(9))), "");
        assert!(!decoder.is_language_loaded(LanguageId(9)));
        assert_eq!(decoder.stats().tables_loaded, 0);
        assert!(matches!(
            decoder.load_language(LanguageId(10)),
            Err(DecoderError::UnknownLanguage(LanguageId(10)))
        ));
        assert!(!decoder.is_language_loaded(LanguageId(10)));
    }

    /// Metadata whose German layout can be added after start-up
    struct LateMetadata {
        german: parking_lot::Mutex<Option<LanguageLayout>>,
    }

    impl TableMetadataProvider for LateMetadata {
        fn current_language(&self) -> LanguageId {
            DE
        }

        fn language_layout(&self, language: LanguageId) -> Option<LanguageLayout> {
            if language == DE {
                self.german.lock().clone()
            } else {
                None
            }
        }
    }

    #[test]
    fn test_language_resolves_once_layout_appears() {
        let store = Arc::new(MemoryContentStore::new());
        store.insert("de", table_file(&["Waldläufer"]));
        let metadata = Arc::new(LateMetadata {
            german: parking_lot::Mutex::new(None),
        });
        let decoder = StringDecoder::new(store, metadata.clone()).unwrap();

        assert_eq!(poll(&decoder, &reference(1), None), "");
        assert!(!decoder.is_language_loaded(DE));

        *metadata.german.lock() = Some(LanguageLayout::from_files(1024, ["de"]));
        assert_eq!(poll(&decoder, &reference(1), None), "Waldläufer");
        assert_eq!(decoder.stats().tables_loaded, 1);
    }

    #[test]
    fn test_load_language_waits_for_queued_load() {
        let decoder = decoder(DecoderConfig::default());
        assert_eq!(decoder.decode(&reference(1), None), "");

        // The worker owns the load; this call must not build a second table
        let summary = decoder.load_language(EN).unwrap();
        assert_eq!(summary.records, 3);
        decoder.wait_idle().unwrap();
        assert_eq!(decoder.stats().tables_loaded, 1);
    }

    #[test]
    fn test_inline_name_bypasses_everything() {
        let decoder = decoder(DecoderConfig::default());
        let raw = [0xA9, 0x0B, 0, 0, b'G', 0, b'w', 0, b'e', 0, b'n', 0, 0, 0];
        assert_eq!(decoder.decode(&raw, None), "Gwen");
        assert_eq!(decoder.try_get_result(&raw, None).as_deref(), Some("Gwen"));

        let stats = decoder.stats();
        assert_eq!(stats.inline_names, 1);
        assert_eq!(stats.cache_misses, 0);
        assert!(!decoder.is_language_loaded(EN));
    }

    #[test]
    fn test_load_language_explicitly() {
        let decoder = decoder(DecoderConfig::default());
        let summary = decoder.load_language(EN).unwrap();
        assert_eq!(summary.records, 3);
        assert!(decoder.is_language_loaded(EN));

        // Table is ready, so the first decode already queues the pipeline
        assert_eq!(decoder.decode(&reference(1), None), "");
        decoder.wait_idle().unwrap();
        assert_eq!(decoder.decode(&reference(1), None), "Ranger");
    }

    #[test]
    fn test_reset_clears_everything() {
        let decoder = decoder(DecoderConfig::default());
        assert_eq!(poll(&decoder, &reference(1), None), "Ranger");
        assert_eq!(decoder.cached_len(), 1);

        decoder.reset();
        assert_eq!(decoder.cached_len(), 0);
        assert!(!decoder.is_language_loaded(EN));
        assert!(decoder.try_get_result(&reference(1), None).is_none());
        assert_eq!(poll(&decoder, &reference(1), None), "Ranger");
    }

    #[test]
    fn test_reset_discards_queued_work() {
        let decoder = decoder(DecoderConfig::new().with_table_load(TableLoadPolicy::Caller));
        assert_eq!(decoder.decode(&reference(1), None), "");
        decoder.reset();
        decoder.wait_idle().unwrap();

        // The decode queued before the reset was dropped
        assert_eq!(decoder.cached_len(), 0);
        assert_eq!(decoder.pending_len(), 0);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let store = Arc::new(MemoryContentStore::new());
        let metadata = Arc::new(StaticMetadata::new(EN));
        let config = DecoderConfig::new().with_worker_thread_name("");
        assert!(matches!(
            StringDecoder::with_config(store, metadata, config),
            Err(DecoderError::Config(_))
        ));
    }
}
