//! Rate types - composed rate breakdowns and their history
//!
//! ```text
//! effective = clamp(base + volatility_premium + utilization_factor + risk_adjustment, min, max)
//! apy       = (1 + effective / 365)^365 - 1
//! ```

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::signal::{RateSignal, SignalProvenance};

/// Why a returned value is a safe substitute rather than a computed one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DegradedReason {
    /// A signal source errored or timed out
    OracleUnavailable,
    /// The adapter had to default most of the signal
    InsufficientSignal,
    /// A non-finite intermediate value
    NumericError,
    /// The pool/position/history store failed
    StoreUnavailable,
    Internal,
}

impl DegradedReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DegradedReason::OracleUnavailable => "oracle_unavailable",
            DegradedReason::InsufficientSignal => "insufficient_signal",
            DegradedReason::NumericError => "numeric_error",
            DegradedReason::StoreUnavailable => "store_unavailable",
            DegradedReason::Internal => "internal",
        }
    }
}

/// Base rate and the clamp window every composed rate lands in
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RateBounds {
    pub base_rate: f64,
    pub min_rate: f64,
    pub max_rate: f64,
}

impl RateBounds {
    pub fn new(base_rate: f64, min_rate: f64, max_rate: f64) -> Self {
        Self {
            base_rate,
            min_rate,
            max_rate,
        }
    }

    /// Clamp a rate into `[min_rate, max_rate]`
    ///
    /// NaN maps to `min_rate` so a clamped value is always inside the window.
    #[inline]
    pub fn clamp(&self, rate: f64) -> f64 {
        if rate.is_nan() {
            return self.min_rate;
        }
        rate.max(self.min_rate).min(self.max_rate)
    }

    #[inline]
    pub fn contains(&self, rate: f64) -> bool {
        rate >= self.min_rate && rate <= self.max_rate
    }
}

impl Default for RateBounds {
    fn default() -> Self {
        Self {
            base_rate: 0.02,
            min_rate: 0.01,
            max_rate: 0.30,
        }
    }
}

/// Composed variable rate for one asset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateBreakdown {
    pub asset: String,
    pub base_rate: f64,
    pub volatility_premium: f64,
    pub utilization_factor: f64,
    pub risk_adjustment: f64,
    /// Always within the configured [`RateBounds`]
    pub effective_rate: f64,
    pub apy: f64,
    /// Pool utilization the factor was computed from
    pub utilization: f64,
    /// Start of the next hour after computation
    pub next_update: DateTime<Utc>,
    pub computed_at: DateTime<Utc>,
    /// Adapted signal (absent on degraded results)
    pub signal: Option<RateSignal>,
    pub provenance: Option<SignalProvenance>,
    /// Set when the fallback guard substituted this value
    pub degraded: Option<DegradedReason>,
}

impl RateBreakdown {
    #[inline]
    pub fn is_degraded(&self) -> bool {
        self.degraded.is_some()
    }

    /// Whether this breakdown is still current at `now`
    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now < self.next_update
    }
}

/// Persisted rate observation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateSnapshot {
    pub asset: String,
    pub recorded_at: DateTime<Utc>,
    pub effective_rate: f64,
    pub apy: f64,
}

impl From<&RateBreakdown> for RateSnapshot {
    fn from(breakdown: &RateBreakdown) -> Self {
        Self {
            asset: breakdown.asset.clone(),
            recorded_at: breakdown.computed_at,
            effective_rate: breakdown.effective_rate,
            apy: breakdown.apy,
        }
    }
}

/// One day of rate history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateHistoryPoint {
    pub date: NaiveDate,
    pub rate: f64,
    pub apy: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounds_clamp() {
        let bounds = RateBounds::default();
        assert_eq!(bounds.clamp(0.5), 0.30);
        assert_eq!(bounds.clamp(-0.2), 0.01);
        assert_eq!(bounds.clamp(0.11), 0.11);
        assert_eq!(bounds.clamp(f64::NAN), 0.01);
        assert_eq!(bounds.clamp(f64::INFINITY), 0.30);
        assert!(bounds.contains(bounds.clamp(f64::NEG_INFINITY)));
    }

    #[test]
    fn test_degraded_reason_serde() {
        let json = serde_json::to_string(&DegradedReason::OracleUnavailable).unwrap();
        assert_eq!(json, "\"oracle_unavailable\"");
        assert_eq!(DegradedReason::StoreUnavailable.as_str(), "store_unavailable");
    }
}
