//! TTL-bounded memo of position evaluations.

use crate::clock::Clock;
use crate::maintenance::{PeriodicTask, TaskError};
use crate::metrics::EngineMetrics;
use chrono::{DateTime, TimeDelta, Utc};
use derive_getters::Getters;
use parking_lot::RwLock;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tracing::{debug, instrument};

/// A cached score.
#[derive(Debug, Clone, Copy, PartialEq, Getters, derive_new::new)]
pub struct CacheEntry {
    /// Static evaluation from the side to move's perspective.
    score: f64,
    /// When the entry was written.
    inserted_at: DateTime<Utc>,
}

#[derive(Debug)]
struct Slot {
    entry: CacheEntry,
    last_used: u64,
}

#[derive(Debug, Default)]
struct CacheInner {
    entries: HashMap<String, Slot>,
    // Recency queue, least recent first. A key may appear more than once;
    // only the element whose tick matches the slot's `last_used` counts.
    order: VecDeque<(String, u64)>,
    tick: u64,
}

impl CacheInner {
    fn next_tick(&mut self) -> u64 {
        self.tick += 1;
        self.tick
    }

    fn mark_used(&mut self, key: &str) {
        let tick = self.next_tick();
        if let Some(slot) = self.entries.get_mut(key) {
            slot.last_used = tick;
            self.order.push_back((key.to_string(), tick));
        }
    }

    fn evict_least_recent(&mut self) -> bool {
        while let Some((key, tick)) = self.order.pop_front() {
            if self.entries.get(&key).is_some_and(|s| s.last_used == tick) {
                self.entries.remove(&key);
                return true;
            }
        }
        false
    }

    fn compact_order(&mut self) {
        let mut live: Vec<(String, u64)> = self
            .entries
            .iter()
            .map(|(k, s)| (k.clone(), s.last_used))
            .collect();
        live.sort_by_key(|(_, tick)| *tick);
        self.order = live.into();
    }
}

/// Shared position-score cache.
///
/// A hit requires `now - inserted_at < ttl`; stale entries read as misses even
/// before a sweep removes them. When full, the least recently used entry is
/// replaced; both hits and writes count as a use.
/// Search results never depend on the cache's contents.
#[derive(Debug)]
pub struct PositionCache {
    inner: RwLock<CacheInner>,
    ttl: TimeDelta,
    capacity: usize,
    clock: Arc<dyn Clock>,
    metrics: EngineMetrics,
}

impl PositionCache {
    /// Creates a cache.
    #[instrument(skip(clock, metrics))]
    pub fn new(
        ttl: TimeDelta,
        capacity: usize,
        clock: Arc<dyn Clock>,
        metrics: EngineMetrics,
    ) -> Self {
        debug!("Creating position cache");
        Self {
            inner: RwLock::new(CacheInner::default()),
            ttl,
            capacity,
            clock,
            metrics,
        }
    }

    /// Configured time-to-live.
    pub fn ttl(&self) -> TimeDelta {
        self.ttl
    }

    /// Looks up a score. `None` is a miss, not an error.
    pub fn get(&self, key: &str) -> Option<f64> {
        let now = self.clock.now();
        let mut inner = self.inner.write();
        let hit = inner
            .entries
            .get(key)
            .filter(|slot| now - slot.entry.inserted_at < self.ttl)
            .map(|slot| slot.entry.score);
        match hit {
            Some(_) => {
                inner.mark_used(key);
                self.metrics.cache_hits.inc();
            }
            None => self.metrics.cache_misses.inc(),
        }
        hit
    }

    /// Stores a score, replacing the least recently used entry if the cache
    /// is full.
    pub fn set(&self, key: &str, score: f64) {
        if self.capacity == 0 {
            return;
        }
        let now = self.clock.now();
        let mut inner = self.inner.write();

        if !inner.entries.contains_key(key) && inner.entries.len() >= self.capacity {
            inner.evict_least_recent();
        }
        let tick = inner.next_tick();
        inner.entries.insert(
            key.to_string(),
            Slot {
                entry: CacheEntry::new(score, now),
                last_used: tick,
            },
        );
        inner.order.push_back((key.to_string(), tick));

        if inner.order.len() > self.capacity.saturating_mul(2) {
            inner.compact_order();
        }
    }

    /// Raw entry, ignoring the TTL.
    pub fn entry(&self, key: &str) -> Option<CacheEntry> {
        self.inner.read().entries.get(key).map(|slot| slot.entry)
    }

    /// Deletes every expired entry, returning how many were removed.
    #[instrument(skip(self))]
    pub fn sweep(&self) -> usize {
        let now = self.clock.now();
        let ttl = self.ttl;
        let mut inner = self.inner.write();
        let before = inner.entries.len();
        inner
            .entries
            .retain(|_, slot| now - slot.entry.inserted_at < ttl);
        let removed = before - inner.entries.len();
        if removed > 0 {
            inner.compact_order();
            debug!(removed, remaining = inner.entries.len(), "Swept expired cache entries");
        }
        removed
    }

    /// Number of stored entries, expired or not.
    pub fn len(&self) -> usize {
        self.inner.read().entries.len()
    }

    /// Whether the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops everything.
    pub fn clear(&self) {
        let mut inner = self.inner.write();
        inner.entries.clear();
        inner.order.clear();
    }
}

impl PeriodicTask for PositionCache {
    fn name(&self) -> &'static str {
        "cache_sweep"
    }

    fn run_once(&self) -> Result<usize, TaskError> {
        Ok(self.sweep())
    }
}
