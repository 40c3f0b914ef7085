//! Signal adapter
//!
//! Normalizes partial oracle payloads into one fully-populated [`RateSignal`].
//! Adapting never fails: a missing, non-finite, or unparseable field takes its
//! default and is counted in the provenance so callers can judge quality.

use std::str::FromStr;

use ratewise_common::{
    MarketVolatility, PredictionPayload, RateSignal, SignalProvenance, SignalQuality,
    VolatilityForecast,
};
use tracing::debug;

/// Adapted signal plus where it came from
#[derive(Debug, Clone, PartialEq)]
pub struct AdaptedSignal {
    pub signal: RateSignal,
    pub provenance: SignalProvenance,
}

/// Oracle payloads as they arrived; any of them may be absent
#[derive(Debug, Clone, Copy, Default)]
pub struct RawSignals<'a> {
    pub prediction: Option<&'a PredictionPayload>,
    pub forecast: Option<&'a VolatilityForecast>,
    pub market: Option<&'a MarketVolatility>,
}

/// Stateless adapter from raw oracle payloads to [`RateSignal`]
#[derive(Debug, Clone, Copy, Default)]
pub struct SignalAdapter;

impl SignalAdapter {
    pub fn adapt(raw: RawSignals<'_>) -> AdaptedSignal {
        let defaults = RateSignal::default();
        let mut defaulted = 0usize;

        let prediction = raw.prediction;
        let forecast = raw.forecast;
        let market = raw.market;

        let trend = pick_parsed(
            prediction.and_then(|p| p.trend.as_deref()),
            defaults.trend,
            &mut defaulted,
        );
        let predicted_change_percent = pick_finite(
            prediction.and_then(|p| p.predicted_change_percent),
            defaults.predicted_change_percent,
            &mut defaulted,
        );
        let confidence_score = pick_finite(
            prediction.and_then(|p| p.confidence_score),
            defaults.confidence_score,
            &mut defaulted,
        )
        .clamp(0.0, 1.0);

        let predicted_volatility = pick_finite(
            forecast.and_then(|f| f.predicted_volatility),
            defaults.predicted_volatility,
            &mut defaulted,
        )
        .max(0.0);
        let risk_level = pick_parsed(
            forecast.and_then(|f| f.risk_level.as_deref()),
            defaults.risk_level,
            &mut defaulted,
        );
        let trend_strength = pick_finite(
            forecast.and_then(|f| f.trend_strength),
            defaults.trend_strength,
            &mut defaulted,
        )
        .abs();

        let annualized_volatility = pick_finite(
            market.and_then(|m| m.annualized_volatility),
            defaults.annualized_volatility,
            &mut defaulted,
        )
        .max(0.0);
        let volatility_regime = pick_parsed(
            market.and_then(|m| m.volatility_regime.as_deref()),
            defaults.volatility_regime,
            &mut defaulted,
        );
        let max_drawdown = pick_finite(
            market.and_then(|m| m.max_drawdown),
            defaults.max_drawdown,
            &mut defaulted,
        )
        .abs()
        .min(1.0);

        let signal = RateSignal {
            trend,
            predicted_change_percent,
            confidence_score,
            predicted_volatility,
            risk_level,
            trend_strength,
            annualized_volatility,
            volatility_regime,
            max_drawdown,
        };

        let provenance = SignalProvenance {
            model_version: prediction
                .and_then(|p| p.model_version.clone())
                .unwrap_or_else(|| "unknown".to_string()),
            data_source: prediction
                .and_then(|p| p.data_source.clone())
                .unwrap_or_else(|| "unknown".to_string()),
            quality: SignalQuality::from_defaulted(defaulted),
            defaulted_fields: defaulted,
        };

        debug!(defaulted, quality = ?provenance.quality, "Adapted rate signal");

        AdaptedSignal { signal, provenance }
    }
}

fn pick_finite(value: Option<f64>, default: f64, defaulted: &mut usize) -> f64 {
    match value {
        Some(v) if v.is_finite() => v,
        _ => {
            *defaulted += 1;
            default
        }
    }
}

fn pick_parsed<T: FromStr>(value: Option<&str>, default: T, defaulted: &mut usize) -> T {
    match value.and_then(|v| v.parse().ok()) {
        Some(v) => v,
        None => {
            *defaulted += 1;
            default
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratewise_common::{RiskLevel, Trend, VolatilityRegime};

    fn full_prediction() -> PredictionPayload {
        PredictionPayload {
            trend: Some("bearish".to_string()),
            predicted_change_percent: Some(-8.0),
            confidence_score: Some(0.8),
            model_version: Some("1.0.0".to_string()),
            data_source: Some("yfinance".to_string()),
        }
    }

    fn full_forecast() -> VolatilityForecast {
        VolatilityForecast {
            predicted_volatility: Some(0.04),
            risk_level: Some("high".to_string()),
            trend_strength: Some(8.0),
        }
    }

    fn full_market() -> MarketVolatility {
        MarketVolatility {
            daily_volatility: Some(0.035),
            annualized_volatility: Some(0.67),
            volatility_regime: Some("high".to_string()),
            max_drawdown: Some(0.15),
            calculation_window: Some(30),
        }
    }

    #[test]
    fn test_missing_everything_yields_defaults() {
        let adapted = SignalAdapter::adapt(RawSignals::default());

        assert_eq!(adapted.signal, RateSignal::default());
        assert_eq!(adapted.signal.annualized_volatility, 0.5);
        assert_eq!(adapted.signal.predicted_volatility, 0.03);
        assert_eq!(adapted.signal.confidence_score, 0.5);
        assert_eq!(adapted.signal.trend, Trend::Neutral);
        assert_eq!(adapted.signal.risk_level, RiskLevel::Medium);
        assert_eq!(adapted.signal.volatility_regime, VolatilityRegime::Medium);
        assert_eq!(adapted.provenance.defaulted_fields, 9);
        assert_eq!(adapted.provenance.quality, SignalQuality::Insufficient);
        assert_eq!(adapted.provenance.model_version, "unknown");
    }

    #[test]
    fn test_complete_payloads_pass_through() {
        let prediction = full_prediction();
        let forecast = full_forecast();
        let market = full_market();
        let adapted = SignalAdapter::adapt(RawSignals {
            prediction: Some(&prediction),
            forecast: Some(&forecast),
            market: Some(&market),
        });

        assert_eq!(adapted.provenance.quality, SignalQuality::Complete);
        assert_eq!(adapted.signal.trend, Trend::Bearish);
        assert_eq!(adapted.signal.confidence_score, 0.8);
        assert_eq!(adapted.signal.risk_level, RiskLevel::High);
        assert_eq!(adapted.signal.volatility_regime, VolatilityRegime::High);
        assert_eq!(adapted.signal.max_drawdown, 0.15);
        assert_eq!(adapted.provenance.data_source, "yfinance");
    }

    #[test]
    fn test_partial_payload_counts_defaults() {
        let prediction = PredictionPayload {
            trend: Some("bullish".to_string()),
            confidence_score: Some(0.9),
            ..Default::default()
        };
        let market = full_market();
        let adapted = SignalAdapter::adapt(RawSignals {
            prediction: Some(&prediction),
            forecast: None,
            market: Some(&market),
        });

        // predicted_change + the three forecast fields
        assert_eq!(adapted.provenance.defaulted_fields, 4);
        assert_eq!(adapted.provenance.quality, SignalQuality::Partial);
        assert_eq!(adapted.signal.predicted_volatility, 0.03);
    }

    #[test]
    fn test_garbage_values_are_normalized() {
        let prediction = PredictionPayload {
            trend: Some("sideways".to_string()),
            predicted_change_percent: Some(f64::NAN),
            confidence_score: Some(1.7),
            ..Default::default()
        };
        let forecast = VolatilityForecast {
            predicted_volatility: Some(-0.2),
            risk_level: Some("catastrophic".to_string()),
            trend_strength: Some(-20.0),
        };
        let market = MarketVolatility {
            annualized_volatility: Some(f64::INFINITY),
            max_drawdown: Some(-0.3),
            ..Default::default()
        };
        let adapted = SignalAdapter::adapt(RawSignals {
            prediction: Some(&prediction),
            forecast: Some(&forecast),
            market: Some(&market),
        });

        let s = &adapted.signal;
        assert_eq!(s.trend, Trend::Neutral);
        assert_eq!(s.predicted_change_percent, 0.0);
        assert_eq!(s.confidence_score, 1.0);
        assert_eq!(s.predicted_volatility, 0.0);
        assert_eq!(s.risk_level, RiskLevel::Medium);
        assert_eq!(s.trend_strength, 20.0);
        assert_eq!(s.annualized_volatility, 0.5);
        assert_eq!(s.max_drawdown, 0.3);
    }
}
