//! Rate composer
//!
//! Blends the adapted signal and pool utilization into one clamped rate:
//!
//! ```text
//! effective_vol      = hist_vol × (1 − 0.5·conf) + pred_vol × 0.5·conf
//! volatility_premium = effective_vol × 0.12 × regime × risk + (1 − conf) × 0.025
//! utilization_factor = u × 0.05                          (u ≤ 0.80)
//!                    = 0.80 × 0.05 + (u − 0.80) × 0.5    (u > 0.80)
//! risk_adjustment    = trend premium/discount + drawdown band + trend-strength add-on
//! effective_rate     = clamp(base + premium + factor + adjustment, min, max)
//! ```

use chrono::{DateTime, TimeZone, Utc};
use ratewise_common::{
    RateBounds, RateBreakdown, RateSignal, RatewiseError, Result, Trend, COMPOUNDS_PER_YEAR,
    JUMP_SLOPE, OPTIMAL_UTILIZATION, RATE_UPDATE_INTERVAL_SECS, UTILIZATION_SLOPE,
};
use tracing::debug;

use crate::signal::AdaptedSignal;

/// Share of effective volatility charged as premium
const VOLATILITY_PREMIUM_SHARE: f64 = 0.12;

/// Premium per unit of missing confidence
const UNCERTAINTY_PREMIUM: f64 = 0.025;

const BEARISH_MIN_CONFIDENCE: f64 = 0.6;
const BEARISH_CONFIDENCE_CAP: f64 = 0.95;
const BEARISH_WEIGHT: f64 = 0.4;
const BEARISH_MAX_PREMIUM: f64 = 0.08;

const BULLISH_MIN_CONFIDENCE: f64 = 0.7;
const BULLISH_MIN_CHANGE_PERCENT: f64 = 5.0;
const BULLISH_WEIGHT: f64 = 0.1;
const BULLISH_MAX_DISCOUNT: f64 = 0.02;

/// (drawdown floor, add-on), checked in order
const DRAWDOWN_BANDS: [(f64, f64); 3] = [(0.25, 0.03), (0.15, 0.02), (0.10, 0.01)];

const TREND_STRENGTH_THRESHOLD: f64 = 15.0;
const TREND_STRENGTH_PREMIUM: f64 = 0.015;

/// Annualized yield of a periodic rate with daily compounding
#[inline]
pub fn compound_apy(rate: f64) -> f64 {
    let periods = COMPOUNDS_PER_YEAR as f64;
    (1.0 + rate / periods).powi(COMPOUNDS_PER_YEAR) - 1.0
}

/// Start of the next hour after `now`
pub fn next_rate_update(now: DateTime<Utc>) -> DateTime<Utc> {
    let next = (now.timestamp().div_euclid(RATE_UPDATE_INTERVAL_SECS) + 1) * RATE_UPDATE_INTERVAL_SECS;
    Utc.timestamp_opt(next, 0)
        .single()
        .unwrap_or_else(|| now + chrono::Duration::seconds(RATE_UPDATE_INTERVAL_SECS))
}

/// Kinked utilization curve, 10x steeper above the optimal point
pub fn utilization_factor(utilization: f64) -> f64 {
    let u = utilization.max(0.0);
    if u <= OPTIMAL_UTILIZATION {
        u * UTILIZATION_SLOPE
    } else {
        OPTIMAL_UTILIZATION * UTILIZATION_SLOPE + (u - OPTIMAL_UTILIZATION) * JUMP_SLOPE
    }
}

/// Confidence-weighted blend of historical and forecast volatility, scaled
/// by regime and risk multipliers, plus an uncertainty term
pub fn volatility_premium(signal: &RateSignal) -> f64 {
    let confidence = signal.confidence_score;
    let effective_vol = signal.annualized_volatility * (1.0 - 0.5 * confidence)
        + signal.predicted_volatility * (0.5 * confidence);

    let premium = effective_vol
        * VOLATILITY_PREMIUM_SHARE
        * signal.volatility_regime.multiplier()
        * signal.risk_level.multiplier();

    premium + (1.0 - confidence) * UNCERTAINTY_PREMIUM
}

/// Trend, drawdown, and trend-strength adjustments
pub fn risk_adjustment(signal: &RateSignal) -> f64 {
    let confidence = signal.confidence_score;
    let change = signal.predicted_change_percent;
    let mut adjustment = 0.0;

    match signal.trend {
        Trend::Bearish if confidence > BEARISH_MIN_CONFIDENCE => {
            let severity = change.abs() / 100.0;
            let premium = (severity * confidence.min(BEARISH_CONFIDENCE_CAP) * BEARISH_WEIGHT)
                .min(BEARISH_MAX_PREMIUM);
            debug!(premium, change, confidence, "Bearish adjustment");
            adjustment += premium;
        }
        Trend::Bullish
            if confidence > BULLISH_MIN_CONFIDENCE && change > BULLISH_MIN_CHANGE_PERCENT =>
        {
            let discount = (change / 100.0 * confidence * BULLISH_WEIGHT).min(BULLISH_MAX_DISCOUNT);
            adjustment -= discount;
        }
        _ => {}
    }

    if let Some((_, add_on)) = DRAWDOWN_BANDS
        .iter()
        .find(|(floor, _)| signal.max_drawdown > *floor)
    {
        adjustment += add_on;
    }

    if signal.trend_strength > TREND_STRENGTH_THRESHOLD {
        adjustment += TREND_STRENGTH_PREMIUM;
    }

    adjustment
}

/// Composes a [`RateBreakdown`] from an adapted signal and pool utilization
#[derive(Debug, Clone, Copy)]
pub struct RateComposer {
    bounds: RateBounds,
}

impl RateComposer {
    pub fn new(bounds: RateBounds) -> Self {
        Self { bounds }
    }

    pub fn bounds(&self) -> RateBounds {
        self.bounds
    }

    /// Compose the effective rate
    ///
    /// Fails only on non-finite inputs or results; the fallback guard turns
    /// that into a degraded rate.
    pub fn compose(
        &self,
        asset: &str,
        adapted: &AdaptedSignal,
        utilization: f64,
        now: DateTime<Utc>,
    ) -> Result<RateBreakdown> {
        if !utilization.is_finite() {
            return Err(RatewiseError::Numeric(format!(
                "utilization is not finite: {utilization}"
            )));
        }

        let signal = &adapted.signal;
        let volatility_premium = volatility_premium(signal);
        let utilization_factor = utilization_factor(utilization);
        let risk_adjustment = risk_adjustment(signal);

        let raw = self.bounds.base_rate + volatility_premium + utilization_factor + risk_adjustment;
        if !raw.is_finite() {
            return Err(RatewiseError::Numeric(format!(
                "composed rate is not finite for {asset}"
            )));
        }

        let effective_rate = self.bounds.clamp(raw);
        let apy = compound_apy(effective_rate);
        if !apy.is_finite() {
            return Err(RatewiseError::Numeric(format!("apy is not finite for {asset}")));
        }

        debug!(
            asset,
            volatility_premium,
            utilization_factor,
            risk_adjustment,
            raw,
            effective_rate,
            "Composed rate"
        );

        Ok(RateBreakdown {
            asset: asset.to_string(),
            base_rate: self.bounds.base_rate,
            volatility_premium,
            utilization_factor,
            risk_adjustment,
            effective_rate,
            apy,
            utilization,
            next_update: next_rate_update(now),
            computed_at: now,
            signal: Some(signal.clone()),
            provenance: Some(adapted.provenance.clone()),
            degraded: None,
        })
    }
}
