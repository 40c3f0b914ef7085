//! # Ratewise Common
//!
//! Shared types, errors, and constants for the Ratewise variable-rate lending engine.
//!
//! ## Core Types
//!
//! - [`RateSignal`]: adapted oracle input (trend, confidence, volatility, drawdown)
//! - [`RateBreakdown`]: composed rate with its components and APY
//! - [`Pool`]/[`PoolStats`]: pool totals and their supply-side view
//! - [`BorrowQuote`]: collateral-ratio-tiered loan pricing
//! - [`UserPosition`]/[`HealthReport`]: wallet positions and solvency
//!
//! ## Rate Formula
//!
//! ```text
//! rate = base + volatility_premium + utilization_factor + risk_adjustment
//! ```
//!
//! clamped into `[min_rate, max_rate]`.

pub mod error;
pub mod types;

// Re-export commonly used types at crate root
pub use error::{OracleError, RatewiseError, Result, StoreError};
pub use types::{
    loan::{BorrowQuote, BorrowRequest, LOAN_LIQUIDATION_THRESHOLD},
    pool::{Pool, PoolAction, PoolStats, DEFAULT_RESERVE_FACTOR},
    position::{
        BorrowedAsset, HealthFactor, HealthReport, HealthStatus, SuppliedAsset, UserPosition,
        AGGREGATE_LIQUIDATION_THRESHOLD,
    },
    rate::{DegradedReason, RateBounds, RateBreakdown, RateHistoryPoint, RateSnapshot},
    signal::{
        MarketVolatility, PredictionPayload, RateSignal, RiskLevel, SignalProvenance,
        SignalQuality, SpotQuote, Trend, VolatilityForecast, VolatilityRegime,
    },
};

/// Ratewise version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Utilization above which the steep slope applies
pub const OPTIMAL_UTILIZATION: f64 = 0.80;

/// Utilization slope below the kink
pub const UTILIZATION_SLOPE: f64 = 0.05;

/// Utilization slope above the kink (10x the gentle slope)
pub const JUMP_SLOPE: f64 = 0.5;

/// Compounding periods per year for APY
pub const COMPOUNDS_PER_YEAR: i32 = 365;

/// Added to the base rate when the fallback guard substitutes a rate
pub const FALLBACK_RATE_SPREAD: f64 = 0.03;

/// Rates refresh on the hour
pub const RATE_UPDATE_INTERVAL_SECS: i64 = 3600;

/// Upper bound on requested rate history
pub const MAX_HISTORY_DAYS: u32 = 365;
