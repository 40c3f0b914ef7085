//! Pool accountant - supply-side view of a pool at the composed rate

use ratewise_common::{Pool, PoolStats, RateBreakdown};

/// Derives utilization, liquidity, and split yields from pool totals
#[derive(Debug, Clone, Copy, Default)]
pub struct PoolAccountant;

impl PoolAccountant {
    /// Stats for `pool` priced at `composed`
    ///
    /// Suppliers earn the borrow APY less the reserve factor.
    pub fn stats(pool: &Pool, composed: &RateBreakdown) -> PoolStats {
        let reserve_factor = pool.reserve_factor.clamp(0.0, 1.0);
        PoolStats {
            asset: pool.asset.clone(),
            total_supplied: pool.total_supplied,
            total_borrowed: pool.total_borrowed,
            utilization_rate: pool.utilization(),
            available_liquidity: pool.available_liquidity(),
            current_interest_rate: composed.effective_rate,
            supply_apy: composed.apy * (1.0 - reserve_factor),
            borrow_apy: composed.apy,
            degraded: composed.degraded,
        }
    }
}
