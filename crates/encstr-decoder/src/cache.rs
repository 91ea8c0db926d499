//! Decoded text cache and pending set
//!
//! The cache and the set of keys with a decode in flight are consulted
//! together: a key is claimed for decoding under the pending lock after
//! re-checking the cache, and a finished decode lands in the cache before
//! its pending marker is cleared. A caller therefore never sees a key that
//! is neither cached nor pending while its result is being published.
//!
//! A generation counter is bumped on [`DecodeCache::reset`]. Work claimed
//! under an older generation is discarded when it completes.

use crate::provider::LanguageId;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::collections::HashSet;

/// Cache key: language plus the exact raw reference bytes
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    /// Language the reference was resolved against
    pub language: LanguageId,
    /// Raw reference bytes
    pub raw: Box<[u8]>,
}

impl CacheKey {
    /// Build a key from borrowed bytes
    pub fn new(language: LanguageId, raw: &[u8]) -> Self {
        Self {
            language,
            raw: raw.into(),
        }
    }
}

/// Result of trying to claim a key for decoding
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Claim {
    /// Text is already cached
    Cached(String),
    /// Another decode of the key is in flight
    Pending,
    /// The caller owns the decode; carries the generation to complete with
    Claimed(u64),
}

#[derive(Debug, Default)]
struct PendingSet {
    generation: u64,
    keys: HashSet<CacheKey>,
}

/// Decoded text keyed by [`CacheKey`], plus in-flight markers
#[derive(Debug, Default)]
pub(crate) struct DecodeCache {
    entries: DashMap<CacheKey, String>,
    pending: Mutex<PendingSet>,
}

impl DecodeCache {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn get(&self, key: &CacheKey) -> Option<String> {
        self.entries.get(key).map(|text| text.clone())
    }

    /// Check-and-insert into the pending set
    pub(crate) fn claim(&self, key: &CacheKey) -> Claim {
        let mut pending = self.pending.lock();
        if let Some(text) = self.get(key) {
            return Claim::Cached(text);
        }
        if pending.keys.contains(key) {
            return Claim::Pending;
        }
        pending.keys.insert(key.clone());
        Claim::Claimed(pending.generation)
    }

    /// Publish the outcome of a claimed decode.
    ///
    /// Returns `false` when the claim predates a reset and was dropped.
    pub(crate) fn complete(&self, key: &CacheKey, generation: u64, text: Option<String>) -> bool {
        let mut pending = self.pending.lock();
        if pending.generation != generation {
            return false;
        }
        if let Some(text) = text {
            self.entries.insert(key.clone(), text);
        }
        pending.keys.remove(key);
        true
    }

    /// Run `f` with the current generation, serialized against resets
    pub(crate) fn with_generation<R, F: FnOnce(u64) -> R>(&self, f: F) -> R {
        let pending = self.pending.lock();
        f(pending.generation)
    }

    /// Run `f` only if no reset happened since `generation`
    pub(crate) fn commit<F: FnOnce()>(&self, generation: u64, f: F) -> bool {
        let pending = self.pending.lock();
        if pending.generation != generation {
            return false;
        }
        f();
        drop(pending);
        true
    }

    /// Drop every entry and pending marker, running `f` under the same lock
    pub(crate) fn reset<F: FnOnce()>(&self, f: F) -> u64 {
        let mut pending = self.pending.lock();
        pending.generation = pending.generation.wrapping_add(1);
        pending.keys.clear();
        self.entries.clear();
        f();
        pending.generation
    }

    pub(crate) fn generation(&self) -> u64 {
        self.pending.lock().generation
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn pending_len(&self) -> usize {
        self.pending.lock().keys.len()
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;

    fn key(raw: &[u8]) -> CacheKey {
        CacheKey::new(LanguageId(0), raw)
    }

    #[test]
    fn test_claim_once() {
        let cache = DecodeCache::new();
        let k = key(&[1, 1]);
        assert_eq!(cache.claim(&k), Claim::Claimed(0));
        assert_eq!(cache.claim(&k), Claim::Pending);
        assert_eq!(cache.pending_len(), 1);

        assert!(cache.complete(&k, 0, Some("text".to_string())));
        assert_eq!(cache.claim(&k), Claim::Cached("text".to_string()));
        assert_eq!(cache.pending_len(), 0);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_failed_decode_not_cached() {
        let cache = DecodeCache::new();
        let k = key(&[2, 1]);
        assert_eq!(cache.claim(&k), Claim::Claimed(0));
        assert!(cache.complete(&k, 0, None));
        assert!(cache.get(&k).is_none());
        assert_eq!(cache.claim(&k), Claim::Claimed(0));
    }

    #[test]
    fn test_languages_are_separate() {
        let cache = DecodeCache::new();
        let en = CacheKey::new(LanguageId(0), &[1, 1]);
        let de = CacheKey::new(LanguageId(3), &[1, 1]);
        assert_eq!(cache.claim(&en), Claim::Claimed(0));
        assert_eq!(cache.claim(&de), Claim::Claimed(0));
    }

    #[test]
    fn test_reset_discards_stale_work() {
        let cache = DecodeCache::new();
        let k = key(&[3, 1]);
        let Claim::Claimed(generation) = cache.claim(&k) else {
            panic!("expected claim");
        };

        let mut cleared = false;
        assert_eq!(cache.reset(|| cleared = true), 1);
        assert!(cleared);
        assert_eq!(cache.pending_len(), 0);

        assert!(!cache.complete(&k, generation, Some("stale".to_string())));
        assert!(cache.get(&k).is_none());
        assert!(!cache.commit(generation, || unreachable!()));
        assert_eq!(cache.generation(), 1);
        assert_eq!(cache.claim(&k), Claim::Claimed(1));
    }
}
