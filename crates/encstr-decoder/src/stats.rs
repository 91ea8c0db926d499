//! Work counters
//!
//! Counters are updated with relaxed atomics; a snapshot is not a consistent
//! cut across counters.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub(crate) struct DecoderStats {
    pub(crate) cache_hits: AtomicU64,
    pub(crate) cache_misses: AtomicU64,
    pub(crate) pipeline_runs: AtomicU64,
    pub(crate) decryptions: AtomicU64,
    pub(crate) lookup_misses: AtomicU64,
    pub(crate) corrupt_records: AtomicU64,
    pub(crate) unpack_failures: AtomicU64,
    pub(crate) tables_loaded: AtomicU64,
    pub(crate) inline_names: AtomicU64,
}

impl DecoderStats {
    pub(crate) fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> DecoderStatsSnapshot {
        let load = |counter: &AtomicU64| counter.load(Ordering::Relaxed);
        DecoderStatsSnapshot {
            cache_hits: load(&self.cache_hits),
            cache_misses: load(&self.cache_misses),
            pipeline_runs: load(&self.pipeline_runs),
            decryptions: load(&self.decryptions),
            lookup_misses: load(&self.lookup_misses),
            corrupt_records: load(&self.corrupt_records),
            unpack_failures: load(&self.unpack_failures),
            tables_loaded: load(&self.tables_loaded),
            inline_names: load(&self.inline_names),
        }
    }
}

/// Point-in-time copy of the decoder's work counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DecoderStatsSnapshot {
    /// `decode` calls answered from the cache
    pub cache_hits: u64,
    /// `decode` calls that found no cached text
    pub cache_misses: u64,
    /// Decode pipelines run on the worker
    pub pipeline_runs: u64,
    /// Records decrypted
    pub decryptions: u64,
    /// References whose index had no record
    pub lookup_misses: u64,
    /// Records with an invalid size or header
    pub corrupt_records: u64,
    /// Records whose payload could not be unpacked
    pub unpack_failures: u64,
    /// String tables built
    pub tables_loaded: u64,
    /// Inline player names served
    pub inline_names: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot() {
        let stats = DecoderStats::default();
        DecoderStats::bump(&stats.cache_hits);
        DecoderStats::bump(&stats.cache_hits);
        DecoderStats::bump(&stats.pipeline_runs);

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.cache_hits, 2);
        assert_eq!(snapshot.pipeline_runs, 1);
        assert_eq!(snapshot.decryptions, 0);
        assert_ne!(snapshot, DecoderStatsSnapshot::default());
    }
}
