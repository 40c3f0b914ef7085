//! Borrow pricer - collateral-ratio-tiered loan pricing

use chrono::{DateTime, Utc};
use ratewise_common::{BorrowQuote, DegradedReason, RateBounds, LOAN_LIQUIDATION_THRESHOLD};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing::{debug, warn};

use super::composer::compound_apy;

/// (minimum collateral ratio, rate adjustment), checked in order
const RATIO_TIERS: [(Decimal, f64); 3] = [
    (dec!(2.0), -0.005), // well collateralized
    (dec!(1.5), 0.0),    // standard
    (dec!(1.25), 0.02),  // thin
];

/// Adjustment below the last tier
const UNDER_COLLATERALIZED_ADJUSTMENT: f64 = 0.05;

/// Loan amounts and unit prices
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoanInputs {
    pub borrow_amount: Decimal,
    pub borrow_price: Decimal,
    pub collateral_amount: Decimal,
    pub collateral_price: Decimal,
}

impl LoanInputs {
    /// `borrow_amount × borrow_price`, `None` past the `Decimal` range
    pub fn borrow_value(&self) -> Option<Decimal> {
        self.borrow_amount.checked_mul(self.borrow_price)
    }

    /// `collateral_amount × collateral_price`, `None` past the `Decimal` range
    pub fn collateral_value(&self) -> Option<Decimal> {
        self.collateral_amount.checked_mul(self.collateral_price)
    }

    /// Collateral ratio with both values saturated, and whether either overflowed
    fn saturated_ratio(&self) -> (Decimal, bool) {
        let borrow = self.borrow_value();
        let collateral = self.collateral_value();
        let overflowed = borrow.is_none() || collateral.is_none();

        let ratio = collateral_ratio(
            collateral.unwrap_or_else(|| self.collateral_amount.saturating_mul(self.collateral_price)),
            borrow.unwrap_or_else(|| self.borrow_amount.saturating_mul(self.borrow_price)),
        );
        (ratio, overflowed)
    }
}

/// `collateral_value / borrow_value`
///
/// Non-positive borrow value or negative collateral value yields 0 rather than an error.
/// A quotient past the `Decimal` range saturates to `Decimal::MAX`.
pub fn collateral_ratio(collateral_value: Decimal, borrow_value: Decimal) -> Decimal {
    if borrow_value <= Decimal::ZERO || collateral_value < Decimal::ZERO {
        return Decimal::ZERO;
    }
    collateral_value
        .checked_div(borrow_value)
        .unwrap_or(Decimal::MAX)
}

/// Rate adjustment for a collateral ratio
pub fn tier_adjustment(ratio: Decimal) -> f64 {
    RATIO_TIERS
        .iter()
        .find(|(floor, _)| ratio >= *floor)
        .map(|(_, adjustment)| *adjustment)
        .unwrap_or(UNDER_COLLATERALIZED_ADJUSTMENT)
}

/// Per-loan health factor against [`LOAN_LIQUIDATION_THRESHOLD`]
pub fn loan_health_factor(ratio: Decimal) -> Decimal {
    ratio
        .checked_div(LOAN_LIQUIDATION_THRESHOLD)
        .unwrap_or(Decimal::ZERO)
}

/// Personalizes a composed rate for one loan
#[derive(Debug, Clone, Copy)]
pub struct BorrowPricer {
    bounds: RateBounds,
}

impl BorrowPricer {
    pub fn new(bounds: RateBounds) -> Self {
        Self { bounds }
    }

    /// Price a loan on top of the pool's composed `base_rate`
    ///
    /// Loan values past the `Decimal` range are saturated and the quote is
    /// marked `numeric_error`.
    pub fn price(&self, base_rate: f64, inputs: &LoanInputs, now: DateTime<Utc>) -> BorrowQuote {
        let (ratio, overflowed) = inputs.saturated_ratio();
        if overflowed {
            warn!(%ratio, "Loan value overflowed, pricing on saturated values");
        }
        let rate_adjustment = tier_adjustment(ratio);
        let final_rate = self.bounds.clamp(base_rate + rate_adjustment);

        debug!(%ratio, rate_adjustment, final_rate, "Priced borrow");

        BorrowQuote {
            quote_id: uuid::Uuid::now_v7(),
            base_rate,
            rate_adjustment,
            final_rate,
            apy: compound_apy(final_rate),
            collateral_ratio: ratio,
            health_factor: loan_health_factor(ratio),
            liquidation_threshold: LOAN_LIQUIDATION_THRESHOLD,
            computed_at: now,
            degraded: overflowed.then_some(DegradedReason::NumericError),
        }
    }

    /// Price a loan whose spot prices could not be read
    ///
    /// Priced as ratio 0, the most conservative tier.
    pub fn price_without_prices(
        &self,
        base_rate: f64,
        reason: DegradedReason,
        now: DateTime<Utc>,
    ) -> BorrowQuote {
        let inputs = LoanInputs {
            borrow_amount: Decimal::ZERO,
            borrow_price: Decimal::ZERO,
            collateral_amount: Decimal::ZERO,
            collateral_price: Decimal::ZERO,
        };
        let mut quote = self.price(base_rate, &inputs, now);
        quote.degraded = Some(reason);
        quote
    }
}
