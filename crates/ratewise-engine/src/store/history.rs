//! Rate history storage
//!
//! Snapshots are keyed by (asset, hour bucket); recording twice within the
//! same UTC hour keeps the later value.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use ratewise_common::{RateSnapshot, Result, RATE_UPDATE_INTERVAL_SECS};

use crate::oracle::normalize_asset;

/// Trait for rate snapshot backends
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Upsert a snapshot into its hour bucket
    async fn record(&self, snapshot: RateSnapshot) -> Result<()>;

    /// Snapshots with `from <= recorded_at < to`, oldest first
    async fn range(
        &self,
        asset: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<RateSnapshot>>;

    /// Drop snapshots recorded before `cutoff`; returns how many were removed
    async fn prune(&self, cutoff: DateTime<Utc>) -> Result<usize>;
}

fn hour_bucket(at: DateTime<Utc>) -> i64 {
    at.timestamp().div_euclid(RATE_UPDATE_INTERVAL_SECS)
}

/// In-memory history store
pub struct InMemoryHistoryStore {
    by_asset: RwLock<HashMap<String, BTreeMap<i64, RateSnapshot>>>,
}

impl InMemoryHistoryStore {
    pub fn new() -> Self {
        Self {
            by_asset: RwLock::new(HashMap::new()),
        }
    }

    /// Total snapshots across all assets
    pub fn len(&self) -> usize {
        self.by_asset.read().values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for InMemoryHistoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HistoryStore for InMemoryHistoryStore {
    async fn record(&self, mut snapshot: RateSnapshot) -> Result<()> {
        snapshot.asset = normalize_asset(&snapshot.asset);
        let bucket = hour_bucket(snapshot.recorded_at);
        self.by_asset
            .write()
            .entry(snapshot.asset.clone())
            .or_default()
            .insert(bucket, snapshot);
        Ok(())
    }

    async fn range(
        &self,
        asset: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<RateSnapshot>> {
        if from >= to {
            return Ok(Vec::new());
        }

        let guard = self.by_asset.read();
        let Some(series) = guard.get(&normalize_asset(asset)) else {
            return Ok(Vec::new());
        };

        Ok(series
            .range(hour_bucket(from)..=hour_bucket(to))
            .map(|(_, s)| s)
            .filter(|s| s.recorded_at >= from && s.recorded_at < to)
            .cloned()
            .collect())
    }

    async fn prune(&self, cutoff: DateTime<Utc>) -> Result<usize> {
        let mut guard = self.by_asset.write();
        let mut removed = 0;
        for series in guard.values_mut() {
            let before = series.len();
            series.retain(|_, s| s.recorded_at >= cutoff);
            removed += before - series.len();
        }
        guard.retain(|_, series| !series.is_empty());
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn snapshot(asset: &str, at: DateTime<Utc>, rate: f64) -> RateSnapshot {
        RateSnapshot {
            asset: asset.to_string(),
            recorded_at: at,
            effective_rate: rate,
            apy: rate,
        }
    }

    fn at(day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, day, hour, minute, 0).unwrap()
    }

    #[tokio::test]
    async fn test_same_hour_upserts() {
        let store = InMemoryHistoryStore::new();
        store.record(snapshot("ethereum", at(1, 10, 5), 0.05)).await.unwrap();
        store.record(snapshot("ethereum", at(1, 10, 45), 0.06)).await.unwrap();
        store.record(snapshot("ethereum", at(1, 11, 0), 0.07)).await.unwrap();

        assert_eq!(store.len(), 2);
        let all = store.range("ethereum", at(1, 0, 0), at(2, 0, 0)).await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].effective_rate, 0.06);
        assert_eq!(all[1].effective_rate, 0.07);
    }

    #[tokio::test]
    async fn test_range_is_half_open() {
        let store = InMemoryHistoryStore::new();
        store.record(snapshot("bitcoin", at(1, 0, 0), 0.05)).await.unwrap();
        store.record(snapshot("bitcoin", at(2, 0, 0), 0.06)).await.unwrap();

        let day_one = store.range("BITCOIN", at(1, 0, 0), at(2, 0, 0)).await.unwrap();
        assert_eq!(day_one.len(), 1);
        assert!(store.range("bitcoin", at(2, 0, 0), at(1, 0, 0)).await.unwrap().is_empty());
        assert!(store.range("solana", at(1, 0, 0), at(3, 0, 0)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_prune() {
        let store = InMemoryHistoryStore::new();
        store.record(snapshot("ethereum", at(1, 0, 0), 0.05)).await.unwrap();
        store.record(snapshot("ethereum", at(3, 0, 0), 0.05)).await.unwrap();
        store.record(snapshot("bitcoin", at(1, 5, 0), 0.05)).await.unwrap();

        assert_eq!(store.prune(at(2, 0, 0)).await.unwrap(), 2);
        assert_eq!(store.len(), 1);
    }
}
