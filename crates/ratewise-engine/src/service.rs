//! Rate engine service
//!
//! The public entry points. Every read operation returns a complete value:
//! upstream or arithmetic failures become a result marked `degraded` rather
//! than an error. Only pool mutations report errors to the caller.

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use ratewise_common::types::signal::SIGNAL_FIELD_COUNT;
use ratewise_common::{
    BorrowQuote, BorrowRequest, DegradedReason, HealthReport, Pool, PoolAction, PoolStats,
    RateBreakdown, RateHistoryPoint, RateSnapshot, RatewiseError, Result, SignalQuality,
    StoreError, UserPosition, DEFAULT_RESERVE_FACTOR,
};
use tracing::{debug, info, instrument, warn};

use crate::config::EngineConfig;
use crate::guard::{fallback_breakdown, FallbackGuard};
use crate::health::HealthEvaluator;
use crate::history::{daily_points, history_window};
use crate::oracle::{
    normalize_asset, InMemoryMarketOracle, MarketOracle, PredictionOracle, TrendPredictionOracle,
};
use crate::pool::PoolAccountant;
use crate::pricing::{BorrowPricer, CacheStats, LoanInputs, RateCache, RateComposer};
use crate::signal::{RawSignals, SignalAdapter};
use crate::store::{
    HistoryStore, InMemoryHistoryStore, InMemoryPoolStore, InMemoryPositionStore, PoolStore,
    PositionStore,
};
use crate::telemetry::EngineMetrics;

/// Attempts for a pool mutation before a version conflict is returned
pub const MAX_POOL_ATTEMPTS: usize = 3;

const PREDICTION_ORACLE: &str = "prediction";
const MARKET_ORACLE: &str = "market";
const POOL_STORE: &str = "pool";
const POSITION_STORE: &str = "position";
const HISTORY_STORE: &str = "history";

/// Variable-rate lending engine
pub struct RateEngine {
    config: EngineConfig,
    composer: RateComposer,
    pricer: BorrowPricer,
    guard: FallbackGuard,
    cache: RateCache,
    prediction: Arc<dyn PredictionOracle>,
    market: Arc<dyn MarketOracle>,
    pools: Arc<dyn PoolStore>,
    positions: Arc<dyn PositionStore>,
    history: Arc<dyn HistoryStore>,
    metrics: Arc<EngineMetrics>,
}

impl RateEngine {
    pub fn builder(config: EngineConfig) -> RateEngineBuilder {
        RateEngineBuilder::new(config)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn metrics(&self) -> &Arc<EngineMetrics> {
        &self.metrics
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Effective variable rate for `asset`
    #[instrument(skip(self))]
    pub async fn calculate_rate(&self, asset: &str) -> RateBreakdown {
        let asset = normalize_asset(asset);
        let started = Instant::now();
        let now = Utc::now();

        if self.config.cache_enabled {
            if let Some(cached) = self.cache.get(&asset, now) {
                return cached;
            }
        }

        let breakdown = match self.compose_rate(&asset, now).await {
            Ok(breakdown) => breakdown,
            Err(err) => {
                let reason = err.degraded_reason();
                warn!(asset = %asset, error = %err, reason = reason.as_str(), "Using fallback rate");
                fallback_breakdown(&self.composer.bounds(), &asset, reason, now)
            }
        };

        self.metrics
            .observe_rate(&breakdown, started.elapsed().as_secs_f64());

        if !breakdown.is_degraded() {
            if self.config.cache_enabled {
                self.cache.insert(&breakdown);
            }
            let snapshot = RateSnapshot::from(&breakdown);
            if let Err(err) = self
                .guard
                .store_call(HISTORY_STORE, self.history.record(snapshot))
                .await
            {
                warn!(asset = %asset, error = %err, "Failed to record rate snapshot");
            }
        }

        breakdown
    }

    async fn compose_rate(&self, asset: &str, now: DateTime<Utc>) -> Result<RateBreakdown> {
        let (prediction, forecast, market, pool) = tokio::join!(
            self.guarded(PREDICTION_ORACLE, || self.prediction.get_prediction(asset)),
            self.guarded(PREDICTION_ORACLE, || {
                self.prediction.get_volatility_prediction(asset)
            }),
            self.guarded(MARKET_ORACLE, || self.market.get_volatility(asset)),
            self.guard.store_call(POOL_STORE, self.pools.get_pool(asset)),
        );
        let (prediction, forecast, market, pool) = (prediction?, forecast?, market?, pool?);

        let adapted = SignalAdapter::adapt(RawSignals {
            prediction: Some(&prediction),
            forecast: Some(&forecast),
            market: Some(&market),
        });

        if self.config.reject_insufficient_signal
            && adapted.provenance.quality == SignalQuality::Insufficient
        {
            return Err(RatewiseError::InsufficientSignal {
                defaulted: adapted.provenance.defaulted_fields,
                total: SIGNAL_FIELD_COUNT,
            });
        }

        let utilization = pool.map(|p| p.utilization()).unwrap_or(0.0);
        self.composer.compose(asset, &adapted, utilization, now)
    }

    async fn guarded<T, F, Fut>(&self, oracle: &str, op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let result = self.guard.call(oracle, op).await;
        if result.is_err() {
            self.metrics.observe_oracle_failure(oracle);
        }
        result
    }

    /// Personalized rate for one collateralized loan
    #[instrument(skip(self, request), fields(asset = %request.asset, collateral = %request.collateral_asset))]
    pub async fn calculate_borrow_rate(&self, request: &BorrowRequest) -> BorrowQuote {
        let rate = self.calculate_rate(&request.asset).await;

        let (borrow_spot, collateral_spot) = tokio::join!(
            self.guarded(MARKET_ORACLE, || self.market.get_spot(&request.asset)),
            self.guarded(MARKET_ORACLE, || {
                self.market.get_spot(&request.collateral_asset)
            }),
        );

        let now = Utc::now();
        let mut quote = match (borrow_spot, collateral_spot) {
            (Ok(borrow), Ok(collateral)) => self.pricer.price(
                rate.effective_rate,
                &LoanInputs {
                    borrow_amount: request.amount,
                    borrow_price: borrow.current_price,
                    collateral_amount: request.collateral_amount,
                    collateral_price: collateral.current_price,
                },
                now,
            ),
            (Err(err), _) | (_, Err(err)) => {
                warn!(error = %err, "Spot price unavailable, pricing at zero collateral");
                self.metrics
                    .observe_degraded("calculate_borrow_rate", DegradedReason::OracleUnavailable);
                self.pricer.price_without_prices(
                    rate.effective_rate,
                    DegradedReason::OracleUnavailable,
                    now,
                )
            }
        };

        if let Some(reason @ DegradedReason::NumericError) = quote.degraded {
            self.metrics.observe_degraded("calculate_borrow_rate", reason);
        }
        if quote.degraded.is_none() {
            quote.degraded = rate.degraded;
        }
        quote
    }

    /// Utilization, liquidity, and supply/borrow APY for a pool
    #[instrument(skip(self))]
    pub async fn get_pool_stats(&self, asset: &str) -> PoolStats {
        let asset = normalize_asset(asset);

        let (pool, store_failure) = match self
            .guard
            .store_call(POOL_STORE, self.pools.get_pool(&asset))
            .await
        {
            Ok(Some(pool)) => (pool, None),
            Ok(None) => (Pool::new(&asset, DEFAULT_RESERVE_FACTOR), None),
            Err(err) => {
                warn!(asset = %asset, error = %err, "Pool store unavailable, reporting empty pool");
                self.metrics
                    .observe_degraded("get_pool_stats", DegradedReason::StoreUnavailable);
                (
                    Pool::new(&asset, DEFAULT_RESERVE_FACTOR),
                    Some(DegradedReason::StoreUnavailable),
                )
            }
        };

        let rate = self.calculate_rate(&asset).await;
        let mut stats = PoolAccountant::stats(&pool, &rate);
        if store_failure.is_some() {
            stats.degraded = store_failure;
        }
        stats
    }

    /// Aggregate health of a wallet's positions
    #[instrument(skip(self))]
    pub async fn calculate_health(&self, wallet_address: &str) -> HealthReport {
        match self.read_position(wallet_address).await {
            Ok(position) => {
                let position = position.unwrap_or_else(|| UserPosition::empty(wallet_address));
                let report = HealthEvaluator::evaluate(&position);
                debug!(status = ?report.status, "Evaluated health");
                report
            }
            Err(err) => {
                warn!(error = %err, "Position store unavailable, reporting no debt");
                self.metrics
                    .observe_degraded("calculate_health", DegradedReason::StoreUnavailable);
                HealthEvaluator::unavailable(wallet_address, DegradedReason::StoreUnavailable)
            }
        }
    }

    async fn read_position(&self, wallet_address: &str) -> Result<Option<UserPosition>> {
        self.guard
            .store_call(POSITION_STORE, self.positions.get_position(wallet_address))
            .await
    }

    /// Supplies and borrows of a wallet; empty when unknown
    #[instrument(skip(self))]
    pub async fn get_user_positions(&self, wallet_address: &str) -> UserPosition {
        match self.read_position(wallet_address).await {
            Ok(position) => position.unwrap_or_else(|| UserPosition::empty(wallet_address)),
            Err(err) => {
                warn!(error = %err, "Position store unavailable, reporting empty position");
                self.metrics
                    .observe_degraded("get_user_positions", DegradedReason::StoreUnavailable);
                UserPosition::empty(wallet_address)
            }
        }
    }

    /// One point per UTC day over the last `days` days, oldest first
    #[instrument(skip(self))]
    pub async fn get_rate_history(&self, asset: &str, days: u32) -> Vec<RateHistoryPoint> {
        let Some((from, to)) = history_window(days, Utc::now()) else {
            return Vec::new();
        };

        let asset = normalize_asset(asset);
        match self
            .guard
            .store_call(HISTORY_STORE, self.history.range(&asset, from, to))
            .await
        {
            Ok(snapshots) => daily_points(&snapshots),
            Err(err) => {
                warn!(error = %err, "History store unavailable, returning empty history");
                self.metrics
                    .observe_degraded("get_rate_history", DegradedReason::StoreUnavailable);
                Vec::new()
            }
        }
    }

    /// Apply a supply/withdraw/borrow/repay to a pool
    ///
    /// Retries version conflicts up to [`MAX_POOL_ATTEMPTS`] times and drops
    /// the asset's cached rate on success.
    #[instrument(skip(self))]
    pub async fn apply_pool_action(&self, asset: &str, action: PoolAction) -> Result<Pool> {
        let asset = normalize_asset(asset);
        let mut last_conflict = None;

        for attempt in 1..=MAX_POOL_ATTEMPTS {
            let version = self
                .guard
                .store_call(POOL_STORE, self.pools.get_pool(&asset))
                .await?
                .map(|p| p.version)
                .unwrap_or(0);

            match self
                .guard
                .store_call(POOL_STORE, self.pools.apply(&asset, action, version))
                .await
            {
                Ok(pool) => {
                    self.cache.invalidate(&asset);
                    info!(
                        asset = %asset,
                        version = pool.version,
                        utilization = pool.utilization(),
                        "Pool updated"
                    );
                    return Ok(pool);
                }
                Err(RatewiseError::Store(conflict @ StoreError::VersionConflict { .. })) => {
                    debug!(attempt, error = %conflict, "Pool version conflict");
                    self.metrics.observe_pool_conflict(&asset);
                    last_conflict = Some(conflict);
                }
                Err(err) => return Err(err),
            }
        }

        Err(last_conflict
            .map(RatewiseError::from)
            .unwrap_or_else(|| RatewiseError::Internal("pool update not attempted".to_string())))
    }

    /// Drop snapshots older than the retention window
    pub async fn prune_history(&self, now: DateTime<Utc>) -> usize {
        let cutoff = now - chrono::Duration::days(i64::from(self.config.history.retention_days));
        match self
            .guard
            .store_call(HISTORY_STORE, self.history.prune(cutoff))
            .await
        {
            Ok(removed) => removed,
            Err(err) => {
                warn!(error = %err, "Failed to prune rate history");
                0
            }
        }
    }
}

/// Builder for [`RateEngine`]
///
/// Collaborators left unset default to the in-memory implementations: a
/// market oracle with reference spot prices, a trend predictor over the
/// market oracle in use, the reference ethereum pool, and empty position and
/// history stores.
pub struct RateEngineBuilder {
    config: EngineConfig,
    prediction: Option<Arc<dyn PredictionOracle>>,
    market: Option<Arc<dyn MarketOracle>>,
    pools: Option<Arc<dyn PoolStore>>,
    positions: Option<Arc<dyn PositionStore>>,
    history: Option<Arc<dyn HistoryStore>>,
    metrics: Option<Arc<EngineMetrics>>,
}

impl RateEngineBuilder {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            prediction: None,
            market: None,
            pools: None,
            positions: None,
            history: None,
            metrics: None,
        }
    }

    pub fn prediction_oracle(mut self, oracle: Arc<dyn PredictionOracle>) -> Self {
        self.prediction = Some(oracle);
        self
    }

    pub fn market_oracle(mut self, oracle: Arc<dyn MarketOracle>) -> Self {
        self.market = Some(oracle);
        self
    }

    pub fn pool_store(mut self, store: Arc<dyn PoolStore>) -> Self {
        self.pools = Some(store);
        self
    }

    pub fn position_store(mut self, store: Arc<dyn PositionStore>) -> Self {
        self.positions = Some(store);
        self
    }

    pub fn history_store(mut self, store: Arc<dyn HistoryStore>) -> Self {
        self.history = Some(store);
        self
    }

    pub fn metrics(mut self, metrics: Arc<EngineMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn build(self) -> Result<RateEngine> {
        self.config.validate()?;

        let metrics = match self.metrics {
            Some(metrics) => metrics,
            None => Arc::new(
                EngineMetrics::new().map_err(|e| RatewiseError::Internal(e.to_string()))?,
            ),
        };

        let market: Arc<dyn MarketOracle> = match self.market {
            Some(market) => market,
            None => Arc::new(InMemoryMarketOracle::with_reference_prices()),
        };
        let prediction: Arc<dyn PredictionOracle> = match self.prediction {
            Some(prediction) => prediction,
            None => Arc::new(TrendPredictionOracle::new(Arc::clone(&market))),
        };
        let pools: Arc<dyn PoolStore> = match self.pools {
            Some(pools) => pools,
            None => Arc::new(InMemoryPoolStore::with_reference_pool()),
        };
        let positions: Arc<dyn PositionStore> = match self.positions {
            Some(positions) => positions,
            None => Arc::new(InMemoryPositionStore::new()),
        };
        let history: Arc<dyn HistoryStore> = match self.history {
            Some(history) => history,
            None => Arc::new(InMemoryHistoryStore::new()),
        };

        let bounds = self.config.bounds();
        Ok(RateEngine {
            composer: RateComposer::new(bounds),
            pricer: BorrowPricer::new(bounds),
            guard: FallbackGuard::new(&self.config.oracle),
            cache: RateCache::default(),
            prediction,
            market,
            pools,
            positions,
            history,
            metrics,
            config: self.config,
        })
    }
}
