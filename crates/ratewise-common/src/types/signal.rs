//! Rate signals - what the oracles say about an asset
//!
//! Two layers live here:
//! - Raw oracle payloads ([`PredictionPayload`], [`VolatilityForecast`],
//!   [`MarketVolatility`]), where every field may be missing and categorical
//!   fields arrive as free-form strings.
//! - The adapted [`RateSignal`], fully populated with typed fields, which is
//!   the only thing the rate composer reads.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Default historical (annualized) volatility when the market oracle omits it
pub const DEFAULT_ANNUALIZED_VOLATILITY: f64 = 0.5;

/// Default forecast volatility when the prediction oracle omits it
pub const DEFAULT_PREDICTED_VOLATILITY: f64 = 0.03;

/// Default forecast confidence
pub const DEFAULT_CONFIDENCE: f64 = 0.5;

/// Default max drawdown (sits on the lowest drawdown band edge, adds nothing)
pub const DEFAULT_MAX_DRAWDOWN: f64 = 0.10;

/// Number of fields in a [`RateSignal`]
pub const SIGNAL_FIELD_COUNT: usize = 9;

/// Forecast price direction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    Bullish,
    Bearish,
    #[default]
    Neutral,
}

impl FromStr for Trend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bullish" => Ok(Trend::Bullish),
            "bearish" => Ok(Trend::Bearish),
            "neutral" => Ok(Trend::Neutral),
            other => Err(format!("unknown trend: {other}")),
        }
    }
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Trend::Bullish => "bullish",
            Trend::Bearish => "bearish",
            Trend::Neutral => "neutral",
        };
        f.write_str(s)
    }
}

/// Forecast risk bucket derived from predicted volatility and confidence
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    #[default]
    Medium,
    High,
    VeryHigh,
}

impl RiskLevel {
    /// Premium multiplier applied to the volatility premium
    pub fn multiplier(&self) -> f64 {
        match self {
            RiskLevel::Low => 0.8,
            RiskLevel::Medium => 1.0,
            RiskLevel::High => 1.3,
            RiskLevel::VeryHigh => 1.6,
        }
    }

    /// Classify a forecast: `risk_score = volatility × (2 − confidence)`
    pub fn classify(predicted_volatility: f64, confidence: f64) -> Self {
        let risk_score = predicted_volatility * (2.0 - confidence);
        if risk_score < 0.03 {
            RiskLevel::Low
        } else if risk_score < 0.08 {
            RiskLevel::Medium
        } else if risk_score < 0.15 {
            RiskLevel::High
        } else {
            RiskLevel::VeryHigh
        }
    }
}

impl FromStr for RiskLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace([' ', '-'], "_").as_str() {
            "low" => Ok(RiskLevel::Low),
            "medium" => Ok(RiskLevel::Medium),
            "high" => Ok(RiskLevel::High),
            "very_high" => Ok(RiskLevel::VeryHigh),
            other => Err(format!("unknown risk level: {other}")),
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
            RiskLevel::VeryHigh => "very_high",
        };
        f.write_str(s)
    }
}

/// Coarse bucket for recent realized volatility
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VolatilityRegime {
    Low,
    #[default]
    Medium,
    High,
    Extreme,
}

impl VolatilityRegime {
    /// Premium multiplier applied to the volatility premium
    pub fn multiplier(&self) -> f64 {
        match self {
            VolatilityRegime::Low => 0.6,
            VolatilityRegime::Medium => 1.0,
            VolatilityRegime::High => 1.4,
            VolatilityRegime::Extreme => 2.0,
        }
    }

    /// Classify an annualized volatility
    pub fn classify(annualized_volatility: f64) -> Self {
        if annualized_volatility < 0.3 {
            VolatilityRegime::Low
        } else if annualized_volatility < 0.6 {
            VolatilityRegime::Medium
        } else if annualized_volatility < 1.0 {
            VolatilityRegime::High
        } else {
            VolatilityRegime::Extreme
        }
    }
}

impl FromStr for VolatilityRegime {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(VolatilityRegime::Low),
            "medium" => Ok(VolatilityRegime::Medium),
            "high" => Ok(VolatilityRegime::High),
            "extreme" => Ok(VolatilityRegime::Extreme),
            other => Err(format!("unknown volatility regime: {other}")),
        }
    }
}

impl fmt::Display for VolatilityRegime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            VolatilityRegime::Low => "low",
            VolatilityRegime::Medium => "medium",
            VolatilityRegime::High => "high",
            VolatilityRegime::Extreme => "extreme",
        };
        f.write_str(s)
    }
}

/// Raw price forecast from a prediction oracle
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PredictionPayload {
    pub trend: Option<String>,
    pub predicted_change_percent: Option<f64>,
    pub confidence_score: Option<f64>,
    pub model_version: Option<String>,
    pub data_source: Option<String>,
}

/// Raw volatility forecast from a prediction oracle
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VolatilityForecast {
    pub predicted_volatility: Option<f64>,
    pub risk_level: Option<String>,
    pub trend_strength: Option<f64>,
}

/// Raw realized-volatility metrics from a market oracle
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarketVolatility {
    pub daily_volatility: Option<f64>,
    pub annualized_volatility: Option<f64>,
    pub volatility_regime: Option<String>,
    pub max_drawdown: Option<f64>,
    pub calculation_window: Option<usize>,
}

/// Spot price from a market oracle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpotQuote {
    pub asset: String,
    pub current_price: rust_decimal::Decimal,
    pub source: String,
}

/// Adapted, fully-populated signal the composer works from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateSignal {
    pub trend: Trend,
    pub predicted_change_percent: f64,
    /// Always within [0, 1]
    pub confidence_score: f64,
    pub predicted_volatility: f64,
    pub risk_level: RiskLevel,
    pub trend_strength: f64,
    pub annualized_volatility: f64,
    pub volatility_regime: VolatilityRegime,
    /// Always within [0, 1]
    pub max_drawdown: f64,
}

impl Default for RateSignal {
    fn default() -> Self {
        Self {
            trend: Trend::Neutral,
            predicted_change_percent: 0.0,
            confidence_score: DEFAULT_CONFIDENCE,
            predicted_volatility: DEFAULT_PREDICTED_VOLATILITY,
            risk_level: RiskLevel::Medium,
            trend_strength: 0.0,
            annualized_volatility: DEFAULT_ANNUALIZED_VOLATILITY,
            volatility_regime: VolatilityRegime::Medium,
            max_drawdown: DEFAULT_MAX_DRAWDOWN,
        }
    }
}

/// How much of a signal came from the oracles rather than defaults
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalQuality {
    /// Every field came from an oracle
    Complete,
    /// Some fields were defaulted
    Partial,
    /// More than half the fields were defaulted
    Insufficient,
}

impl SignalQuality {
    pub fn from_defaulted(defaulted: usize) -> Self {
        if defaulted == 0 {
            SignalQuality::Complete
        } else if defaulted * 2 > SIGNAL_FIELD_COUNT {
            SignalQuality::Insufficient
        } else {
            SignalQuality::Partial
        }
    }
}

/// Where a signal came from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalProvenance {
    pub model_version: String,
    pub data_source: String,
    pub quality: SignalQuality,
    /// Number of [`RateSignal`] fields filled from defaults
    pub defaulted_fields: usize,
}
