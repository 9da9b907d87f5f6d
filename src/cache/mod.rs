use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::config::CacheConfig;
use crate::normalize::{NormalizedRecord, ViewType};

pub mod clock;

pub use clock::{Clock, ManualClock, SystemClock};

/// Staleness bucket deciding how long an entry stays valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TtlClass {
    Price,
    Company,
}

impl TtlClass {
    pub fn for_view(view: ViewType) -> Self {
        match view {
            ViewType::PriceOnly => TtlClass::Price,
            ViewType::Summary | ViewType::Full => TtlClass::Company,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub class: TtlClass,
    pub symbol: String,
}

impl CacheKey {
    pub fn new(class: TtlClass, symbol: impl Into<String>) -> Self {
        Self {
            class,
            symbol: symbol.into(),
        }
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    record: NormalizedRecord,
    stored_at: Instant,
    /// Insertion order, breaks ties between equal `stored_at` values.
    seq: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
    pub hit_ratio: Option<f64>,
}

#[derive(Default)]
struct Entries {
    map: HashMap<CacheKey, CacheEntry>,
    next_seq: u64,
}

/// Bounded, TTL-aware record cache shared by every request worker.
///
/// Expired entries are ignored on read but only physically removed by size pressure.
pub struct CacheStore {
    entries: Mutex<Entries>,
    price_ttl: Duration,
    company_ttl: Duration,
    max_entries: usize,
    clock: Arc<dyn Clock>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl CacheStore {
    pub fn new(config: &CacheConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: &CacheConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Mutex::new(Entries::default()),
            price_ttl: config.price_ttl(),
            company_ttl: config.company_ttl(),
            max_entries: config.max_entries.max(1),
            clock,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn ttl(&self, class: TtlClass) -> Duration {
        match class {
            TtlClass::Price => self.price_ttl,
            TtlClass::Company => self.company_ttl,
        }
    }

    /// Return the stored record while it is younger than its class TTL.
    pub fn get(&self, key: &CacheKey) -> Option<NormalizedRecord> {
        self.get_if(key, |_| true)
    }

    /// Like [`CacheStore::get`], but a fresh record rejected by `accept` also counts as a miss.
    pub fn get_if<F>(&self, key: &CacheKey, accept: F) -> Option<NormalizedRecord>
    where
        F: FnOnce(&NormalizedRecord) -> bool,
    {
        let now = self.clock.now();
        let ttl = self.ttl(key.class);

        let found = self
            .lock()
            .map
            .get(key)
            .filter(|entry| now.saturating_duration_since(entry.stored_at) < ttl)
            .filter(|entry| accept(&entry.record))
            .map(|entry| entry.record.clone());

        let counter = if found.is_some() {
            &self.hits
        } else {
            &self.misses
        };
        counter.fetch_add(1, Ordering::Relaxed);
        found
    }

    /// Store `record` under `key`, replacing any previous entry.
    ///
    /// Inserting a new key into a full store first evicts the single oldest entry,
    /// regardless of its class or expiry.
    pub fn put(&self, key: CacheKey, record: NormalizedRecord) {
        let stored_at = self.clock.now();
        let mut entries = self.lock();

        if entries.map.len() >= self.max_entries && !entries.map.contains_key(&key) {
            let oldest = entries
                .map
                .iter()
                .min_by_key(|(_, entry)| (entry.stored_at, entry.seq))
                .map(|(key, _)| key.clone());
            if let Some(oldest) = oldest {
                log::debug!("Evicting {:?}:{} to make room", oldest.class, oldest.symbol);
                entries.map.remove(&oldest);
            }
        }

        let seq = entries.next_seq;
        entries.next_seq += 1;
        entries.map.insert(
            key,
            CacheEntry {
                record,
                stored_at,
                seq,
            },
        );
    }

    /// Number of physically present entries, expired ones included.
    pub fn size(&self) -> usize {
        self.lock().map.len()
    }

    /// Drop every entry and return how many were removed.
    pub fn clear(&self) -> usize {
        let mut entries = self.lock();
        let removed = entries.map.len();
        entries.map.clear();
        removed
    }

    pub fn stats(&self) -> CacheStats {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let lookups = hits + misses;
        CacheStats {
            entries: self.size(),
            hits,
            misses,
            hit_ratio: (lookups > 0).then(|| hits as f64 / lookups as f64),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Entries> {
        // poisoning cannot leave a half-written entry behind
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
