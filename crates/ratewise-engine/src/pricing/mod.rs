//! Pricing module
//!
//! Provides the deterministic pricing arithmetic:
//! - Rate composition (volatility, utilization, risk)
//! - Collateral-ratio-tiered loan pricing
//! - A per-asset rate cache

pub mod borrow;
pub mod cache;
pub mod composer;

pub use borrow::{BorrowPricer, LoanInputs};
pub use cache::{CacheStats, RateCache};
pub use composer::{compound_apy, next_rate_update, RateComposer};
