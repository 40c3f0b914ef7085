//! Lending pool state
//!
//! A pool is the one piece of shared mutable state the engine reads.
//! Key characteristics:
//! - Totals only change through [`Pool::apply`]
//! - Version field for optimistic concurrency (compare-and-swap in stores)
//! - Writes keep `total_borrowed <= total_supplied`; reads tolerate either

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::types::rate::DegradedReason;

/// Default share of interest retained by the protocol
pub const DEFAULT_RESERVE_FACTOR: f64 = 0.1;

/// A supply/borrow mutation against a pool
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", content = "amount", rename_all = "snake_case")]
pub enum PoolAction {
    Supply(Decimal),
    Withdraw(Decimal),
    Borrow(Decimal),
    Repay(Decimal),
}

impl PoolAction {
    pub fn amount(&self) -> Decimal {
        match self {
            PoolAction::Supply(a)
            | PoolAction::Withdraw(a)
            | PoolAction::Borrow(a)
            | PoolAction::Repay(a) => *a,
        }
    }
}

/// Lending pool totals for one asset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pool {
    pub asset: String,
    pub total_supplied: Decimal,
    pub total_borrowed: Decimal,
    /// Within [0, 1]
    pub reserve_factor: f64,
    /// Version for optimistic concurrency control
    pub version: u64,
    /// Timestamp of last modification (Unix milliseconds)
    pub updated_at: i64,
}

impl Pool {
    /// Create an empty pool
    pub fn new(asset: impl Into<String>, reserve_factor: f64) -> Self {
        Self {
            asset: asset.into(),
            total_supplied: Decimal::ZERO,
            total_borrowed: Decimal::ZERO,
            reserve_factor: reserve_factor.clamp(0.0, 1.0),
            version: 0,
            updated_at: chrono::Utc::now().timestamp_millis(),
        }
    }

    /// Create a pool with seeded totals
    pub fn with_totals(
        asset: impl Into<String>,
        total_supplied: Decimal,
        total_borrowed: Decimal,
        reserve_factor: f64,
    ) -> Self {
        let mut pool = Self::new(asset, reserve_factor);
        pool.total_supplied = total_supplied;
        pool.total_borrowed = total_borrowed;
        pool
    }

    /// `total_borrowed / total_supplied`, 0 when nothing is supplied
    pub fn utilization(&self) -> f64 {
        if self.total_supplied <= Decimal::ZERO {
            return 0.0;
        }
        self.total_borrowed
            .checked_div(self.total_supplied)
            .and_then(|u| u.to_f64())
            .unwrap_or(0.0)
    }

    /// `total_supplied − total_borrowed`, saturating at the `Decimal` range
    #[inline]
    pub fn available_liquidity(&self) -> Decimal {
        self.total_supplied.saturating_sub(self.total_borrowed)
    }

    /// Apply a mutation, bumping the version on success
    pub fn apply(&mut self, action: PoolAction) -> Result<(), StoreError> {
        let amount = action.amount();
        if amount <= Decimal::ZERO {
            return Err(StoreError::InvalidAmount(amount));
        }

        match action {
            PoolAction::Supply(_) => {
                self.total_supplied = self
                    .total_supplied
                    .checked_add(amount)
                    .ok_or(StoreError::AmountOverflow(amount))?;
            }
            PoolAction::Withdraw(_) => {
                let available = self.available_liquidity();
                if amount > available {
                    return Err(StoreError::InsufficientLiquidity {
                        requested: amount,
                        available,
                    });
                }
                self.total_supplied -= amount;
            }
            PoolAction::Borrow(_) => {
                let available = self.available_liquidity();
                if amount > available {
                    return Err(StoreError::InsufficientLiquidity {
                        requested: amount,
                        available,
                    });
                }
                self.total_borrowed = self
                    .total_borrowed
                    .checked_add(amount)
                    .ok_or(StoreError::AmountOverflow(amount))?;
            }
            PoolAction::Repay(_) => {
                // Overpayment settles the debt, it does not go negative
                self.total_borrowed = self
                    .total_borrowed
                    .saturating_sub(amount)
                    .max(Decimal::ZERO);
            }
        }

        self.version += 1;
        self.updated_at = chrono::Utc::now().timestamp_millis();
        Ok(())
    }
}

/// Supply-side view of a pool at the current composed rate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoolStats {
    pub asset: String,
    pub total_supplied: Decimal,
    pub total_borrowed: Decimal,
    pub utilization_rate: f64,
    pub available_liquidity: Decimal,
    pub current_interest_rate: f64,
    pub supply_apy: f64,
    pub borrow_apy: f64,
    pub degraded: Option<DegradedReason>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_utilization() {
        let pool = Pool::with_totals("ethereum", dec!(10000), dec!(6500), 0.1);
        assert!((pool.utilization() - 0.65).abs() < 1e-12);
        assert_eq!(pool.available_liquidity(), dec!(3500));
    }

    #[test]
    fn test_empty_pool_utilization_is_zero() {
        let pool = Pool::new("ethereum", 0.1);
        assert_eq!(pool.utilization(), 0.0);
        assert_eq!(pool.available_liquidity(), Decimal::ZERO);
    }

    #[test]
    fn test_apply_bumps_version() {
        let mut pool = Pool::new("ethereum", 0.1);
        pool.apply(PoolAction::Supply(dec!(1000))).unwrap();
        pool.apply(PoolAction::Borrow(dec!(400))).unwrap();
        assert_eq!(pool.version, 2);
        assert_eq!(pool.total_borrowed, dec!(400));
    }

    #[test]
    fn test_borrow_cannot_exceed_liquidity() {
        let mut pool = Pool::with_totals("ethereum", dec!(100), dec!(90), 0.1);
        let err = pool.apply(PoolAction::Borrow(dec!(20))).unwrap_err();
        assert_eq!(
            err,
            StoreError::InsufficientLiquidity {
                requested: dec!(20),
                available: dec!(10),
            }
        );
        assert_eq!(pool.version, 0);
    }

    #[test]
    fn test_withdraw_cannot_strand_borrows() {
        let mut pool = Pool::with_totals("ethereum", dec!(100), dec!(60), 0.1);
        assert!(pool.apply(PoolAction::Withdraw(dec!(50))).is_err());
        pool.apply(PoolAction::Withdraw(dec!(40))).unwrap();
        assert_eq!(pool.utilization(), 1.0);
    }

    #[test]
    fn test_non_positive_amounts_rejected() {
        let mut pool = Pool::new("ethereum", 0.1);
        assert_eq!(
            pool.apply(PoolAction::Supply(dec!(0))),
            Err(StoreError::InvalidAmount(dec!(0)))
        );
        assert!(pool.apply(PoolAction::Repay(dec!(-5))).is_err());
    }

    #[test]
    fn test_repay_saturates_at_zero() {
        let mut pool = Pool::with_totals("ethereum", dec!(100), dec!(30), 0.1);
        pool.apply(PoolAction::Repay(dec!(50))).unwrap();
        assert_eq!(pool.total_borrowed, Decimal::ZERO);
    }

    #[test]
    fn test_supply_overflow_is_an_error() {
        let mut pool = Pool::with_totals("ethereum", dec!(10000), dec!(6500), 0.1);
        assert_eq!(
            pool.apply(PoolAction::Supply(Decimal::MAX)),
            Err(StoreError::AmountOverflow(Decimal::MAX))
        );
        assert_eq!(pool.total_supplied, dec!(10000));
        assert_eq!(pool.version, 0);
    }

    #[test]
    fn test_reserve_factor_clamped() {
        assert_eq!(Pool::new("x", 1.5).reserve_factor, 1.0);
        assert_eq!(Pool::new("x", -0.2).reserve_factor, 0.0);
    }
}
