//! Ratewise Engine - variable-rate lending pool rate and risk engine
//!
//! Turns oracle forecasts and pool utilization into:
//! - An effective borrow rate per asset ([`RateEngine::calculate_rate`])
//! - Collateral-tiered loan quotes ([`RateEngine::calculate_borrow_rate`])
//! - Pool supply/borrow yields ([`RateEngine::get_pool_stats`])
//! - Wallet solvency ([`RateEngine::calculate_health`])
//!
//! Reads never fail: when an oracle or store misbehaves the engine returns a
//! deterministic substitute marked with a [`DegradedReason`](ratewise_common::DegradedReason).

pub mod config;
pub mod guard;
pub mod health;
pub mod history;
pub mod oracle;
pub mod pool;
pub mod pricing;
pub mod service;
pub mod signal;
pub mod store;
pub mod telemetry;

pub use config::EngineConfig;
pub use guard::{fallback_breakdown, FallbackGuard};
pub use health::HealthEvaluator;
pub use history::SnapshotRecorder;
pub use oracle::{
    supported_assets, InMemoryMarketOracle, MarketOracle, PredictionOracle, SupportedAsset,
    TrendPredictionOracle,
};
pub use pool::PoolAccountant;
pub use pricing::{BorrowPricer, RateCache, RateComposer};
pub use service::{RateEngine, RateEngineBuilder};
pub use signal::{AdaptedSignal, RawSignals, SignalAdapter};
pub use store::{
    HistoryStore, InMemoryHistoryStore, InMemoryPoolStore, InMemoryPositionStore, PoolStore,
    PositionStore,
};
pub use telemetry::EngineMetrics;

/// Assets tracked when `RATEWISE_ASSETS` is unset
pub const DEFAULT_ASSETS: &[&str] = &["ethereum", "bitcoin", "chainlink", "uniswap"];
