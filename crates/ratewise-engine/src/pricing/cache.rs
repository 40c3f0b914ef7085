//! In-memory rate cache
//!
//! Holds the last composed breakdown per asset until its `next_update`,
//! so repeated quotes within the hour see one consistent rate.
//! Pool mutations invalidate the asset's entry.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use ratewise_common::RateBreakdown;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

/// Cache hit/miss counters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub entry_count: u64,
    pub hits: u64,
    pub misses: u64,
}

/// Per-asset rate cache backed by DashMap
pub struct RateCache {
    entries: DashMap<String, RateBreakdown>,
    max_entries: usize,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl RateCache {
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: DashMap::new(),
            max_entries: max_entries.max(1),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Fresh breakdown for `asset`, if any
    pub fn get(&self, asset: &str, now: DateTime<Utc>) -> Option<RateBreakdown> {
        let fresh = self
            .entries
            .get(asset)
            .filter(|entry| entry.is_fresh(now))
            .map(|entry| entry.clone());

        match fresh {
            Some(breakdown) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                debug!(asset, "Rate cache hit");
                Some(breakdown)
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Cache a computed breakdown; degraded breakdowns are never cached
    pub fn insert(&self, breakdown: &RateBreakdown) {
        if breakdown.is_degraded() {
            return;
        }

        if self.entries.len() >= self.max_entries && !self.entries.contains_key(&breakdown.asset) {
            let now = breakdown.computed_at;
            self.entries.retain(|_, v| v.is_fresh(now));

            if self.entries.len() >= self.max_entries {
                // Shard guards must drop before remove()
                let oldest = self
                    .entries
                    .iter()
                    .min_by_key(|e| e.computed_at)
                    .map(|e| e.key().clone());
                if let Some(oldest) = oldest {
                    self.entries.remove(&oldest);
                }
            }
        }

        self.entries
            .insert(breakdown.asset.clone(), breakdown.clone());
    }

    pub fn invalidate(&self, asset: &str) -> bool {
        let removed = self.entries.remove(asset).is_some();
        if removed {
            debug!(asset, "Invalidated cached rate");
        }
        removed
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entry_count: self.entries.len() as u64,
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

impl Default for RateCache {
    fn default() -> Self {
        Self::new(1024)
    }
}
