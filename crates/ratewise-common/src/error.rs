//! Error types for the Ratewise engine
//!
//! Provides a unified error type and domain-specific error variants.
//! None of these cross a public `RateEngine` entry point: the engine turns
//! them into a [`DegradedReason`](crate::DegradedReason) on the returned value.

use rust_decimal::Decimal;
use thiserror::Error;

/// Result type alias using RatewiseError
pub type Result<T> = std::result::Result<T, RatewiseError>;

/// Unified error type for Ratewise operations
#[derive(Debug, Error)]
pub enum RatewiseError {
    // Upstream signal sources
    #[error("Oracle error: {0}")]
    Oracle(#[from] OracleError),

    // Pool / position / history stores
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    // Adapter had to default most of the signal
    #[error("Insufficient signal: {defaulted} of {total} fields defaulted")]
    InsufficientSignal { defaulted: usize, total: usize },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    // Non-finite intermediate or result
    #[error("Numeric error: {0}")]
    Numeric(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Errors raised by prediction and market oracles
#[derive(Debug, Error, Clone, PartialEq)]
pub enum OracleError {
    #[error("{oracle} oracle unavailable for {asset}: {reason}")]
    Unavailable {
        oracle: String,
        asset: String,
        reason: String,
    },

    #[error("{oracle} oracle timed out after {elapsed_ms}ms")]
    Timeout { oracle: String, elapsed_ms: u64 },

    #[error("Unknown asset: {0}")]
    UnknownAsset(String),

    #[error("Malformed oracle payload: {0}")]
    Malformed(String),
}

/// Errors raised by pool, position, and history stores
#[derive(Debug, Error, Clone, PartialEq)]
pub enum StoreError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Version conflict: expected {expected}, found {found}")]
    VersionConflict { expected: u64, found: u64 },

    #[error("Amount must be positive, got {0}")]
    InvalidAmount(Decimal),

    #[error("Amount {0} would overflow the pool totals")]
    AmountOverflow(Decimal),

    #[error("Insufficient liquidity: requested {requested}, available {available}")]
    InsufficientLiquidity {
        requested: Decimal,
        available: Decimal,
    },

    #[error("Backend error: {0}")]
    Backend(String),
}

impl From<serde_json::Error> for RatewiseError {
    fn from(err: serde_json::Error) -> Self {
        RatewiseError::Serialization(err.to_string())
    }
}

impl From<anyhow::Error> for RatewiseError {
    fn from(err: anyhow::Error) -> Self {
        RatewiseError::Internal(err.to_string())
    }
}

impl RatewiseError {
    /// Map an error onto the marker a degraded result carries
    pub fn degraded_reason(&self) -> crate::DegradedReason {
        use crate::DegradedReason;
        match self {
            RatewiseError::Oracle(_) => DegradedReason::OracleUnavailable,
            RatewiseError::Store(_) => DegradedReason::StoreUnavailable,
            RatewiseError::InsufficientSignal { .. } => DegradedReason::InsufficientSignal,
            RatewiseError::Numeric(_) | RatewiseError::InvalidInput(_) => {
                DegradedReason::NumericError
            }
            RatewiseError::Config(_)
            | RatewiseError::Serialization(_)
            | RatewiseError::Internal(_) => DegradedReason::Internal,
        }
    }
}
