//! Prometheus metrics for the rate engine

use prometheus::{HistogramOpts, HistogramVec, IntCounterVec, GaugeVec, Opts, Registry};
use ratewise_common::{DegradedReason, RateBreakdown};

/// Engine metrics
pub struct EngineMetrics {
    pub rate_calculations_total: IntCounterVec,
    pub degraded_results_total: IntCounterVec,
    pub oracle_failures_total: IntCounterVec,
    pub pool_conflicts_total: IntCounterVec,
    pub effective_rate: GaugeVec,
    pub rate_duration_seconds: HistogramVec,
}

impl EngineMetrics {
    pub fn new() -> prometheus::Result<Self> {
        Ok(Self {
            rate_calculations_total: IntCounterVec::new(
                Opts::new(
                    "ratewise_rate_calculations_total",
                    "Rate calculations by asset",
                ),
                &["asset"],
            )?,
            degraded_results_total: IntCounterVec::new(
                Opts::new(
                    "ratewise_degraded_results_total",
                    "Fallback results by entry point and reason",
                ),
                &["operation", "reason"],
            )?,
            oracle_failures_total: IntCounterVec::new(
                Opts::new(
                    "ratewise_oracle_failures_total",
                    "Oracle calls that failed after retries",
                ),
                &["oracle"],
            )?,
            pool_conflicts_total: IntCounterVec::new(
                Opts::new(
                    "ratewise_pool_version_conflicts_total",
                    "Pool compare-and-swap conflicts by asset",
                ),
                &["asset"],
            )?,
            effective_rate: GaugeVec::new(
                Opts::new("ratewise_effective_rate", "Last effective rate by asset"),
                &["asset"],
            )?,
            rate_duration_seconds: HistogramVec::new(
                HistogramOpts::new(
                    "ratewise_rate_duration_seconds",
                    "Time to compute a rate, including oracle calls",
                )
                .buckets(vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]),
                &["asset"],
            )?,
        })
    }

    pub fn register(&self, registry: &Registry) -> prometheus::Result<()> {
        registry.register(Box::new(self.rate_calculations_total.clone()))?;
        registry.register(Box::new(self.degraded_results_total.clone()))?;
        registry.register(Box::new(self.oracle_failures_total.clone()))?;
        registry.register(Box::new(self.pool_conflicts_total.clone()))?;
        registry.register(Box::new(self.effective_rate.clone()))?;
        registry.register(Box::new(self.rate_duration_seconds.clone()))?;
        Ok(())
    }

    pub(crate) fn observe_rate(&self, breakdown: &RateBreakdown, elapsed_secs: f64) {
        let asset = breakdown.asset.as_str();
        self.rate_calculations_total.with_label_values(&[asset]).inc();
        self.effective_rate
            .with_label_values(&[asset])
            .set(breakdown.effective_rate);
        self.rate_duration_seconds
            .with_label_values(&[asset])
            .observe(elapsed_secs);
        if let Some(reason) = breakdown.degraded {
            self.observe_degraded("calculate_rate", reason);
        }
    }

    pub(crate) fn observe_degraded(&self, operation: &str, reason: DegradedReason) {
        self.degraded_results_total
            .with_label_values(&[operation, reason.as_str()])
            .inc();
    }

    pub(crate) fn observe_oracle_failure(&self, oracle: &str) {
        self.oracle_failures_total.with_label_values(&[oracle]).inc();
    }

    pub(crate) fn observe_pool_conflict(&self, asset: &str) {
        self.pool_conflicts_total.with_label_values(&[asset]).inc();
    }
}
