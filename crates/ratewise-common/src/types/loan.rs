//! Per-loan pricing types

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::rate::DegradedReason;

/// Collateral ratio at which a single loan becomes liquidatable
pub const LOAN_LIQUIDATION_THRESHOLD: Decimal = dec!(1.15);

/// Request for a personalized borrow rate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BorrowRequest {
    /// Asset to borrow
    pub asset: String,
    pub amount: Decimal,
    pub collateral_asset: String,
    pub collateral_amount: Decimal,
}

impl BorrowRequest {
    pub fn new(
        asset: impl Into<String>,
        amount: Decimal,
        collateral_asset: impl Into<String>,
        collateral_amount: Decimal,
    ) -> Self {
        Self {
            asset: asset.into(),
            amount,
            collateral_asset: collateral_asset.into(),
            collateral_amount,
        }
    }
}

/// Personalized rate for one collateralized loan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BorrowQuote {
    pub quote_id: Uuid,
    /// Composed pool rate the quote starts from
    pub base_rate: f64,
    /// Collateral-ratio tier adjustment
    pub rate_adjustment: f64,
    pub final_rate: f64,
    pub apy: f64,
    /// `collateral_value / borrow_value`, 0 when the borrow value is not positive
    pub collateral_ratio: Decimal,
    /// `collateral_ratio / LOAN_LIQUIDATION_THRESHOLD`
    pub health_factor: Decimal,
    pub liquidation_threshold: Decimal,
    pub computed_at: DateTime<Utc>,
    pub degraded: Option<DegradedReason>,
}

impl BorrowQuote {
    #[inline]
    pub fn is_degraded(&self) -> bool {
        self.degraded.is_some()
    }
}
