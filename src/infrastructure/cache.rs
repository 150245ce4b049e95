//! # Caches
//!
//! Process-lifetime in-memory caches with lazy expiry.
//!
//! [`TtlCache`] is the building block: entries expire on read, and after
//! every write expired entries are swept and the oldest entries are evicted
//! until the size cap holds. [`EnhancementCache`] composes two of them for
//! enhanced quotes and benefit extractions, keyed by content hashes.
//!
//! Map mutations never span an `.await`; each operation takes the lock,
//! finishes, and releases it.

use crate::domain::entities::{EnhancedQuote, EmploymentRequest, StandardizedBenefitData};
use crate::domain::value_objects::{ProviderKind, QuoteType, Timestamp};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::debug;

/// Default size cap for every cache.
pub const DEFAULT_MAX_ENTRIES: usize = 100;

/// Default lifetime of a cached enhanced quote.
pub const DEFAULT_RESULT_TTL: Duration = Duration::from_secs(30 * 60);

/// Default lifetime of a cached benefit extraction.
pub const DEFAULT_EXTRACTION_TTL: Duration = Duration::from_secs(60 * 60);

/// Hex-encoded SHA-256 of the canonical JSON encoding of `value`.
///
/// Object keys are emitted in sorted order, so equal values hash equally.
#[must_use]
pub fn content_hash(value: &Value) -> String {
    let digest = Sha256::digest(value.to_string().as_bytes());
    digest.iter().map(|byte| format!("{byte:02x}")).collect()
}

/// Hit/miss counters and size of one cache.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    /// Live entries, including not-yet-swept expired ones.
    pub entries: usize,
    /// Successful lookups.
    pub hits: u64,
    /// Failed or expired lookups.
    pub misses: u64,
    /// `hits / (hits + misses)`, or zero before any lookup.
    pub hit_rate: f64,
}

#[derive(Debug, Clone)]
struct CacheEntry<T> {
    value: T,
    inserted_at: Timestamp,
    expires_at: Timestamp,
}

/// Size-capped cache with per-entry expiry.
#[derive(Debug)]
pub struct TtlCache<T> {
    ttl: Duration,
    max_entries: usize,
    entries: Mutex<HashMap<String, CacheEntry<T>>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<T: Clone> TtlCache<T> {
    /// Creates an empty cache.
    ///
    /// A `max_entries` of zero is treated as one.
    #[must_use]
    pub fn new(ttl: Duration, max_entries: usize) -> Self {
        Self {
            ttl,
            max_entries: max_entries.max(1),
            entries: Mutex::new(HashMap::new()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Returns the entry lifetime.
    #[inline]
    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Returns a clone of the live value under `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<T> {
        self.get_at(key, Timestamp::now())
    }

    /// Like [`TtlCache::get`], evaluated at `now`.
    #[must_use]
    pub fn get_at(&self, key: &str, now: Timestamp) -> Option<T> {
        let mut entries = self.entries.lock();
        let live = match entries.get(key) {
            Some(entry) if now.is_before(&entry.expires_at) => Some(entry.value.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        };
        drop(entries);

        let counter = if live.is_some() { &self.hits } else { &self.misses };
        counter.fetch_add(1, Ordering::Relaxed);
        live
    }

    /// Returns true if a live value exists. Does not touch the counters.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        let now = Timestamp::now();
        self.entries
            .lock()
            .get(key)
            .is_some_and(|entry| now.is_before(&entry.expires_at))
    }

    /// Stores `value` under `key`.
    pub fn insert(&self, key: impl Into<String>, value: T) {
        self.insert_at(key, value, Timestamp::now());
    }

    /// Like [`TtlCache::insert`], as if written at `now`.
    pub fn insert_at(&self, key: impl Into<String>, value: T, now: Timestamp) {
        let ttl_ms = i64::try_from(self.ttl.as_millis()).unwrap_or(i64::MAX);
        let entry = CacheEntry {
            value,
            inserted_at: now,
            expires_at: now.add_millis(ttl_ms),
        };

        let mut entries = self.entries.lock();
        entries.insert(key.into(), entry);
        entries.retain(|_, e| now.is_before(&e.expires_at));

        if entries.len() > self.max_entries {
            let mut by_age: Vec<(String, Timestamp)> = entries
                .iter()
                .map(|(k, e)| (k.clone(), e.inserted_at))
                .collect();
            by_age.sort_by_key(|(_, inserted_at)| *inserted_at);
            let excess = entries.len() - self.max_entries;
            for (key, _) in by_age.into_iter().take(excess) {
                entries.remove(&key);
            }
            debug!(evicted = excess, "cache size cap enforced");
        }
    }

    /// Removes `key`. Returns true if it was present.
    pub fn remove(&self, key: &str) -> bool {
        self.entries.lock().remove(key).is_some()
    }

    /// Returns the number of stored entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Returns true if nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops every entry and resets the counters.
    pub fn clear(&self) {
        self.entries.lock().clear();
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
    }

    /// Returns the current counters.
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let lookups = hits.saturating_add(misses);
        #[allow(clippy::cast_precision_loss)]
        let hit_rate = if lookups == 0 {
            0.0
        } else {
            hits as f64 / lookups as f64
        };
        CacheStats {
            entries: self.len(),
            hits,
            misses,
            hit_rate,
        }
    }
}

/// Counters for both halves of the [`EnhancementCache`].
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnhancementCacheStats {
    /// Enhanced quote cache.
    pub results: CacheStats,
    /// Benefit extraction cache.
    pub extractions: CacheStats,
}

/// Cache of enhanced quotes and benefit extractions.
#[derive(Debug)]
pub struct EnhancementCache {
    results: TtlCache<EnhancedQuote>,
    extractions: TtlCache<StandardizedBenefitData>,
}

impl Default for EnhancementCache {
    fn default() -> Self {
        Self::new(DEFAULT_RESULT_TTL, DEFAULT_EXTRACTION_TTL, DEFAULT_MAX_ENTRIES)
    }
}

impl EnhancementCache {
    /// Creates empty caches.
    #[must_use]
    pub fn new(result_ttl: Duration, extraction_ttl: Duration, max_entries: usize) -> Self {
        Self {
            results: TtlCache::new(result_ttl, max_entries),
            extractions: TtlCache::new(extraction_ttl, max_entries),
        }
    }

    /// Builds the result key from everything that affects an enhancement.
    ///
    /// `quote` is the caller's quote input as JSON; only its hash enters the key.
    #[must_use]
    pub fn result_key(
        provider: ProviderKind,
        request: &EmploymentRequest,
        quote_type: QuoteType,
        quote: &Value,
    ) -> String {
        let projection = json!({
            "provider": provider.as_str(),
            "country": request.country_code.trim().to_uppercase(),
            "baseSalary": request.base_salary.normalize().to_string(),
            "currency": request.currency.trim().to_uppercase(),
            "contractDuration": request.contract_duration_months,
            "employmentType": request.employment_type.as_str(),
            "quoteType": quote_type.as_str(),
            "localOfficeBenefits": serde_json::to_value(&request.local_office_benefits).unwrap_or(Value::Null),
            "quoteHash": content_hash(quote),
        });
        format!("enhancement:{}", content_hash(&projection))
    }

    /// Builds the extraction key for a provider response.
    #[must_use]
    pub fn extraction_key(provider: ProviderKind, original_response: &Value) -> String {
        let projection = json!({
            "provider": provider.as_str(),
            "response": content_hash(original_response),
        });
        format!("extraction:{}", content_hash(&projection))
    }

    /// Stores an enhanced quote.
    pub fn set(&self, key: impl Into<String>, quote: EnhancedQuote) {
        self.results.insert(key, quote);
    }

    /// Returns a cached enhanced quote.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<EnhancedQuote> {
        self.results.get(key)
    }

    /// Returns true if an enhanced quote is cached under `key`.
    #[must_use]
    pub fn has(&self, key: &str) -> bool {
        self.results.contains(key)
    }

    /// Removes a cached enhanced quote.
    pub fn delete(&self, key: &str) -> bool {
        self.results.remove(key)
    }

    /// Stores a benefit extraction.
    pub fn set_extraction(&self, key: impl Into<String>, data: StandardizedBenefitData) {
        self.extractions.insert(key, data);
    }

    /// Returns a cached benefit extraction.
    #[must_use]
    pub fn get_extraction(&self, key: &str) -> Option<StandardizedBenefitData> {
        self.extractions.get(key)
    }

    /// Returns counters for both caches.
    #[must_use]
    pub fn stats(&self) -> EnhancementCacheStats {
        EnhancementCacheStats {
            results: self.results.stats(),
            extractions: self.extractions.stats(),
        }
    }

    /// Empties both caches.
    pub fn clear(&self) {
        self.results.clear();
        self.extractions.clear();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn at(millis: i64) -> Timestamp {
        Timestamp::from_millis(millis).unwrap()
    }

    mod ttl_cache {
        use super::*;

        #[test]
        fn expires_lazily_on_read() {
            let cache = TtlCache::new(Duration::from_secs(10), 10);
            cache.insert_at("k", 1_u32, at(1_000));

            assert_eq!(cache.get_at("k", at(5_000)), Some(1));
            assert_eq!(cache.get_at("k", at(11_000)), None);
            assert!(cache.is_empty());

            let stats = cache.stats();
            assert_eq!(stats.hits, 1);
            assert_eq!(stats.misses, 1);
            assert!((stats.hit_rate - 0.5).abs() < f64::EPSILON);
        }

        #[test]
        fn evicts_oldest_beyond_cap() {
            let cache = TtlCache::new(Duration::from_secs(600), 2);
            cache.insert_at("a", 'a', at(1_000));
            cache.insert_at("b", 'b', at(2_000));
            cache.insert_at("c", 'c', at(3_000));

            assert_eq!(cache.len(), 2);
            assert_eq!(cache.get_at("a", at(3_500)), None);
            assert_eq!(cache.get_at("b", at(3_500)), Some('b'));
            assert_eq!(cache.get_at("c", at(3_500)), Some('c'));
        }

        #[test]
        fn write_sweeps_expired_entries() {
            let cache = TtlCache::new(Duration::from_secs(1), 10);
            cache.insert_at("old", 1, at(0));
            cache.insert_at("new", 2, at(5_000));
            assert_eq!(cache.len(), 1);
        }

        #[test]
        fn clear_resets_counters() {
            let cache: TtlCache<u8> = TtlCache::new(Duration::from_secs(1), 10);
            let _ = cache.get("missing");
            cache.clear();
            assert_eq!(cache.stats(), CacheStats::default());
        }

        #[test]
        fn remove_and_contains() {
            let cache = TtlCache::new(Duration::from_secs(60), 10);
            cache.insert("k", 7);
            assert!(cache.contains("k"));
            assert!(cache.remove("k"));
            assert!(!cache.contains("k"));
            assert!(!cache.remove("k"));
        }
    }

    mod keys {
        use super::*;

        fn request() -> EmploymentRequest {
            EmploymentRequest::new("PT", Decimal::new(1000, 0), "EUR")
        }

        #[test]
        fn content_hash_ignores_key_order() {
            let a: Value = serde_json::from_str(r#"{"x":1,"y":2}"#).unwrap();
            let b: Value = serde_json::from_str(r#"{"y":2,"x":1}"#).unwrap();
            assert_eq!(content_hash(&a), content_hash(&b));
            assert_eq!(content_hash(&a).len(), 64);
        }

        #[test]
        fn result_key_depends_on_quote_type_and_quote() {
            let quote = json!({"salary": "1000"});
            let all = EnhancementCache::result_key(ProviderKind::Deel, &request(), QuoteType::AllInclusive, &quote);
            let stat = EnhancementCache::result_key(ProviderKind::Deel, &request(), QuoteType::StatutoryOnly, &quote);
            let other = EnhancementCache::result_key(
                ProviderKind::Deel,
                &request(),
                QuoteType::AllInclusive,
                &json!({"salary": "1001"}),
            );
            assert_ne!(all, stat);
            assert_ne!(all, other);
            assert_eq!(
                all,
                EnhancementCache::result_key(ProviderKind::Deel, &request(), QuoteType::AllInclusive, &quote)
            );
        }

        #[test]
        fn extraction_key_depends_on_provider() {
            let body = json!({"costs": []});
            assert_ne!(
                EnhancementCache::extraction_key(ProviderKind::Deel, &body),
                EnhancementCache::extraction_key(ProviderKind::Remote, &body)
            );
        }
    }
}
