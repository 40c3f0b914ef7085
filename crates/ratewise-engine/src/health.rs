//! Position health evaluator
//!
//! ```text
//! health_factor = total_collateral_usd × 0.85 / total_debt_usd
//! ```
//!
//! classified into `healthy (> 2)`, `moderate (> 1.5)`, `at_risk (> 1.1)`,
//! otherwise `danger`. A wallet without debt gets [`HealthFactor::NoDebt`].

use ratewise_common::{
    DegradedReason, HealthFactor, HealthReport, HealthStatus, UserPosition,
    AGGREGATE_LIQUIDATION_THRESHOLD,
};
use rust_decimal::Decimal;

#[derive(Debug, Clone, Copy, Default)]
pub struct HealthEvaluator;

impl HealthEvaluator {
    pub fn evaluate(position: &UserPosition) -> HealthReport {
        let collateral = position.total_supplied_usd;
        let debt = position.total_borrowed_usd;

        let (health_factor, status) = if debt <= Decimal::ZERO {
            (HealthFactor::NoDebt, HealthStatus::NoDebt)
        } else {
            // a quotient past the Decimal range saturates
            let factor = collateral
                .saturating_mul(AGGREGATE_LIQUIDATION_THRESHOLD)
                .checked_div(debt)
                .unwrap_or(Decimal::MAX);
            (HealthFactor::Finite(factor), HealthStatus::classify(factor))
        };

        HealthReport {
            wallet_address: position.wallet_address.clone(),
            health_factor,
            status,
            total_collateral_usd: collateral,
            total_debt_usd: debt,
            liquidation_threshold: AGGREGATE_LIQUIDATION_THRESHOLD,
            degraded: None,
        }
    }

    /// Report for a wallet whose positions could not be read
    pub fn unavailable(wallet_address: &str, reason: DegradedReason) -> HealthReport {
        let mut report = Self::evaluate(&UserPosition::empty(wallet_address));
        report.degraded = Some(reason);
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn position(collateral: Decimal, debt: Decimal) -> UserPosition {
        UserPosition {
            total_supplied_usd: collateral,
            total_borrowed_usd: debt,
            ..UserPosition::empty("0xabc")
        }
    }

    #[test]
    fn test_no_debt_sentinel() {
        let report = HealthEvaluator::evaluate(&position(dec!(1000), Decimal::ZERO));
        assert_eq!(report.health_factor, HealthFactor::NoDebt);
        assert_eq!(report.status, HealthStatus::NoDebt);
        assert_eq!(report.liquidation_threshold, dec!(0.85));
    }

    #[test]
    fn test_reference_factor() {
        let report = HealthEvaluator::evaluate(&position(dec!(8500), dec!(5000)));
        assert_eq!(report.health_factor, HealthFactor::Finite(dec!(1.445)));
        // 1.445 sits in the (1.1, 1.5] band
        assert_eq!(report.status, HealthStatus::AtRisk);
    }

    #[test]
    fn test_bands() {
        // 11250 × 0.85 / 4500 = 2.125
        let healthy = HealthEvaluator::evaluate(&position(dec!(11250), dec!(4500)));
        assert_eq!(healthy.status, HealthStatus::Healthy);

        // 10000 × 0.85 / 5000 = 1.7
        let moderate = HealthEvaluator::evaluate(&position(dec!(10000), dec!(5000)));
        assert_eq!(moderate.status, HealthStatus::Moderate);

        // 1000 × 0.85 / 1000 = 0.85
        let danger = HealthEvaluator::evaluate(&position(dec!(1000), dec!(1000)));
        assert_eq!(danger.status, HealthStatus::Danger);
        assert!(danger.health_factor.is_liquidatable());
    }

    #[test]
    fn test_overflowing_factor_saturates_healthy() {
        let report = HealthEvaluator::evaluate(&position(Decimal::MAX, dec!(0.0000001)));
        assert_eq!(report.health_factor, HealthFactor::Finite(Decimal::MAX));
        assert_eq!(report.status, HealthStatus::Healthy);
        assert!(!report.health_factor.is_liquidatable());
    }

    #[test]
    fn test_unavailable_is_marked() {
        let report = HealthEvaluator::unavailable("0xdef", DegradedReason::StoreUnavailable);
        assert_eq!(report.degraded, Some(DegradedReason::StoreUnavailable));
        assert_eq!(report.total_debt_usd, Decimal::ZERO);
        assert_eq!(report.wallet_address, "0xdef");
    }
}
