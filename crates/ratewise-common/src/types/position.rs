//! Wallet positions and aggregate solvency
//!
//! The aggregate health factor weights collateral by
//! [`AGGREGATE_LIQUIDATION_THRESHOLD`] (0.85). This is a different constant
//! from the per-loan [`LOAN_LIQUIDATION_THRESHOLD`](crate::LOAN_LIQUIDATION_THRESHOLD)
//! (1.15); the two are kept apart on purpose until the product rules say
//! how they relate.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::types::rate::DegradedReason;

/// Share of collateral value counted toward aggregate solvency
pub const AGGREGATE_LIQUIDATION_THRESHOLD: Decimal = dec!(0.85);

/// A supplied asset within a position
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuppliedAsset {
    pub asset: String,
    pub amount: Decimal,
    pub value_usd: Decimal,
    pub apy: f64,
}

/// A borrowed asset within a position
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BorrowedAsset {
    pub asset: String,
    pub amount: Decimal,
    pub value_usd: Decimal,
    pub rate: f64,
}

/// Read model of a wallet's supplies and borrows
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserPosition {
    pub wallet_address: String,
    pub supplied: Vec<SuppliedAsset>,
    pub borrowed: Vec<BorrowedAsset>,
    pub total_supplied_usd: Decimal,
    pub total_borrowed_usd: Decimal,
}

impl UserPosition {
    /// A wallet with nothing supplied or borrowed
    pub fn empty(wallet_address: impl Into<String>) -> Self {
        Self {
            wallet_address: wallet_address.into(),
            supplied: Vec::new(),
            borrowed: Vec::new(),
            total_supplied_usd: Decimal::ZERO,
            total_borrowed_usd: Decimal::ZERO,
        }
    }

    /// Build a position, deriving the USD totals from the entries
    pub fn from_entries(
        wallet_address: impl Into<String>,
        supplied: Vec<SuppliedAsset>,
        borrowed: Vec<BorrowedAsset>,
    ) -> Self {
        let total_supplied_usd = supplied
            .iter()
            .fold(Decimal::ZERO, |total, s| total.saturating_add(s.value_usd));
        let total_borrowed_usd = borrowed
            .iter()
            .fold(Decimal::ZERO, |total, b| total.saturating_add(b.value_usd));
        Self {
            wallet_address: wallet_address.into(),
            supplied,
            borrowed,
            total_supplied_usd,
            total_borrowed_usd,
        }
    }

    #[inline]
    pub fn net_worth_usd(&self) -> Decimal {
        self.total_supplied_usd.saturating_sub(self.total_borrowed_usd)
    }
}

/// Aggregate health factor
///
/// `NoDebt` replaces the "infinite" factor so that serialization and
/// comparisons stay unambiguous.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthFactor {
    Finite(Decimal),
    NoDebt,
}

impl HealthFactor {
    pub fn value(&self) -> Option<Decimal> {
        match self {
            HealthFactor::Finite(v) => Some(*v),
            HealthFactor::NoDebt => None,
        }
    }

    /// Below 1 the position can be liquidated
    pub fn is_liquidatable(&self) -> bool {
        matches!(self, HealthFactor::Finite(v) if *v < Decimal::ONE)
    }
}

/// Ordered solvency bands
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Danger,
    AtRisk,
    Moderate,
    Healthy,
    NoDebt,
}

impl HealthStatus {
    /// Classify a finite health factor
    pub fn classify(health_factor: Decimal) -> Self {
        if health_factor > dec!(2) {
            HealthStatus::Healthy
        } else if health_factor > dec!(1.5) {
            HealthStatus::Moderate
        } else if health_factor > dec!(1.1) {
            HealthStatus::AtRisk
        } else {
            HealthStatus::Danger
        }
    }
}

/// Aggregate solvency of one wallet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthReport {
    pub wallet_address: String,
    pub health_factor: HealthFactor,
    pub status: HealthStatus,
    pub total_collateral_usd: Decimal,
    pub total_debt_usd: Decimal,
    pub liquidation_threshold: Decimal,
    pub degraded: Option<DegradedReason>,
}
