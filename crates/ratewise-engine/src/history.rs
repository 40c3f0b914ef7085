//! Rate history
//!
//! Daily aggregation of stored snapshots, and the background recorder that
//! computes every tracked asset on a fixed interval.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Days, NaiveDate, Utc};
use ratewise_common::{RateHistoryPoint, RateSnapshot, MAX_HISTORY_DAYS};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::service::RateEngine;

/// `[start of the oldest day, start of tomorrow)` covering the last `days` UTC days
///
/// `days` is capped at 365; `0` yields no window.
pub fn history_window(days: u32, now: DateTime<Utc>) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    let days = days.min(MAX_HISTORY_DAYS);
    if days == 0 {
        return None;
    }

    let today = now.date_naive();
    let first = today.checked_sub_days(Days::new(u64::from(days - 1)))?;
    let tomorrow = today.succ_opt()?;
    Some((midnight(first)?, midnight(tomorrow)?))
}

fn midnight(date: NaiveDate) -> Option<DateTime<Utc>> {
    date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc())
}

/// Latest snapshot of each UTC day, ascending by date
pub fn daily_points(snapshots: &[RateSnapshot]) -> Vec<RateHistoryPoint> {
    let mut latest: BTreeMap<NaiveDate, &RateSnapshot> = BTreeMap::new();
    for snapshot in snapshots {
        latest
            .entry(snapshot.recorded_at.date_naive())
            .and_modify(|current| {
                if snapshot.recorded_at >= current.recorded_at {
                    *current = snapshot;
                }
            })
            .or_insert(snapshot);
    }

    latest
        .into_iter()
        .map(|(date, s)| RateHistoryPoint {
            date,
            rate: s.effective_rate,
            apy: s.apy,
        })
        .collect()
}

/// Periodically computes rates for tracked assets and prunes old snapshots
pub struct SnapshotRecorder {
    engine: Arc<RateEngine>,
    assets: Vec<String>,
    interval: Duration,
}

impl SnapshotRecorder {
    pub fn new(engine: Arc<RateEngine>, config: &EngineConfig) -> Self {
        Self {
            engine,
            assets: config.assets.clone(),
            interval: config.history.snapshot_interval(),
        }
    }

    /// Compute every tracked asset once, then prune
    ///
    /// Returns how many assets produced a non-degraded rate.
    pub async fn record_once(&self) -> usize {
        let mut recorded = 0;
        for asset in &self.assets {
            let breakdown = self.engine.calculate_rate(asset).await;
            if breakdown.is_degraded() {
                debug!(asset = %asset, "Skipping degraded snapshot");
            } else {
                recorded += 1;
            }
        }

        let pruned = self.engine.prune_history(Utc::now()).await;
        debug!(recorded, pruned, "Snapshot pass complete");
        recorded
    }

    /// Run until `shutdown` flips to true or its sender is dropped
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut timer = tokio::time::interval(self.interval);
        timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        info!(
            assets = self.assets.len(),
            interval_secs = self.interval.as_secs(),
            "Snapshot recorder started"
        );

        loop {
            tokio::select! {
                _ = timer.tick() => {
                    let recorded = self.record_once().await;
                    if recorded < self.assets.len() {
                        warn!(recorded, total = self.assets.len(), "Some snapshots were degraded");
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!("Snapshot recorder stopping");
                        break;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn snapshot(at: DateTime<Utc>, rate: f64) -> RateSnapshot {
        RateSnapshot {
            asset: "ethereum".to_string(),
            recorded_at: at,
            effective_rate: rate,
            apy: rate * 1.05,
        }
    }

    #[test]
    fn test_window_bounds() {
        let now = Utc.with_ymd_and_hms(2026, 3, 10, 15, 30, 0).unwrap();

        let (from, to) = history_window(1, now).unwrap();
        assert_eq!(from, Utc.with_ymd_and_hms(2026, 3, 10, 0, 0, 0).unwrap());
        assert_eq!(to, Utc.with_ymd_and_hms(2026, 3, 11, 0, 0, 0).unwrap());

        let (from, _) = history_window(7, now).unwrap();
        assert_eq!(from, Utc.with_ymd_and_hms(2026, 3, 4, 0, 0, 0).unwrap());

        assert!(history_window(0, now).is_none());
    }

    #[test]
    fn test_window_capped_at_a_year() {
        let now = Utc.with_ymd_and_hms(2026, 3, 10, 0, 0, 0).unwrap();
        assert_eq!(history_window(10_000, now), history_window(365, now));
    }

    #[test]
    fn test_latest_per_day() {
        let points = daily_points(&[
            snapshot(Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap(), 0.05),
            snapshot(Utc.with_ymd_and_hms(2026, 3, 1, 23, 0, 0).unwrap(), 0.07),
            snapshot(Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap(), 0.06),
            snapshot(Utc.with_ymd_and_hms(2026, 3, 3, 1, 0, 0).unwrap(), 0.08),
        ]);

        assert_eq!(points.len(), 2);
        assert_eq!(points[0].date, NaiveDate::from_ymd_opt(2026, 3, 1).unwrap());
        assert_eq!(points[0].rate, 0.07);
        assert_eq!(points[1].rate, 0.08);
        assert!(points[0].date < points[1].date);
    }

    #[test]
    fn test_no_snapshots() {
        assert!(daily_points(&[]).is_empty());
    }
}
