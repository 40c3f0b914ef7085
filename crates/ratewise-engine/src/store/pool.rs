//! Pool storage

use async_trait::async_trait;
use dashmap::DashMap;
use ratewise_common::{Pool, PoolAction, Result, StoreError, DEFAULT_RESERVE_FACTOR};
use rust_decimal_macros::dec;
use tracing::debug;

use crate::oracle::normalize_asset;

/// Trait for pool storage backends
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PoolStore: Send + Sync {
    /// Current pool state; `None` for an asset with no pool yet
    async fn get_pool(&self, asset: &str) -> Result<Option<Pool>>;

    /// Insert or replace a pool unconditionally (seeding)
    async fn put_pool(&self, pool: Pool) -> Result<()>;

    /// Apply a mutation if the stored version equals `expected_version`
    ///
    /// An asset with no pool has version 0. Returns the updated pool.
    async fn apply(&self, asset: &str, action: PoolAction, expected_version: u64) -> Result<Pool>;
}

/// In-memory pool store
///
/// Each asset's entry is locked for the duration of a compare-and-swap.
pub struct InMemoryPoolStore {
    pools: DashMap<String, Pool>,
}

impl InMemoryPoolStore {
    pub fn new() -> Self {
        Self {
            pools: DashMap::new(),
        }
    }

    /// A store holding the reference ethereum pool (10000 supplied, 6500 borrowed)
    pub fn with_reference_pool() -> Self {
        let store = Self::new();
        let pool = Pool::with_totals("ethereum", dec!(10000), dec!(6500), DEFAULT_RESERVE_FACTOR);
        store.pools.insert(pool.asset.clone(), pool);
        store
    }

    pub fn len(&self) -> usize {
        self.pools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pools.is_empty()
    }
}

impl Default for InMemoryPoolStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PoolStore for InMemoryPoolStore {
    async fn get_pool(&self, asset: &str) -> Result<Option<Pool>> {
        Ok(self.pools.get(&normalize_asset(asset)).map(|p| p.clone()))
    }

    async fn put_pool(&self, mut pool: Pool) -> Result<()> {
        pool.asset = normalize_asset(&pool.asset);
        self.pools.insert(pool.asset.clone(), pool);
        Ok(())
    }

    async fn apply(&self, asset: &str, action: PoolAction, expected_version: u64) -> Result<Pool> {
        let key = normalize_asset(asset);
        let mut entry = self
            .pools
            .entry(key.clone())
            .or_insert_with(|| Pool::new(key.clone(), DEFAULT_RESERVE_FACTOR));

        if entry.version != expected_version {
            return Err(StoreError::VersionConflict {
                expected: expected_version,
                found: entry.version,
            }
            .into());
        }

        entry.apply(action)?;
        debug!(asset = %key, ?action, version = entry.version, "Applied pool action");
        Ok(entry.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratewise_common::RatewiseError;
    use rust_decimal::Decimal;

    #[tokio::test]
    async fn test_apply_bumps_version() {
        let store = InMemoryPoolStore::with_reference_pool();
        let pool = store.get_pool("ethereum").await.unwrap().unwrap();
        assert_eq!(pool.version, 0);

        let updated = store
            .apply("ethereum", PoolAction::Borrow(dec!(500)), pool.version)
            .await
            .unwrap();
        assert_eq!(updated.version, 1);
        assert_eq!(updated.total_borrowed, dec!(7000));
    }

    #[tokio::test]
    async fn test_stale_version_conflicts() {
        let store = InMemoryPoolStore::with_reference_pool();
        store.apply("ethereum", PoolAction::Supply(dec!(1)), 0).await.unwrap();

        let err = store
            .apply("ethereum", PoolAction::Supply(dec!(1)), 0)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            RatewiseError::Store(StoreError::VersionConflict { expected: 0, found: 1 })
        ));
    }

    #[tokio::test]
    async fn test_borrow_beyond_liquidity_rejected() {
        let store = InMemoryPoolStore::with_reference_pool();
        let err = store
            .apply("ethereum", PoolAction::Borrow(dec!(3500.01)), 0)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            RatewiseError::Store(StoreError::InsufficientLiquidity { .. })
        ));

        let pool = store.get_pool("ethereum").await.unwrap().unwrap();
        assert_eq!(pool.total_borrowed, dec!(6500));
        assert_eq!(pool.version, 0);
    }

    #[tokio::test]
    async fn test_supply_creates_pool() {
        let store = InMemoryPoolStore::new();
        assert!(store.get_pool("bitcoin").await.unwrap().is_none());

        let pool = store
            .apply("Bitcoin", PoolAction::Supply(dec!(2)), 0)
            .await
            .unwrap();
        assert_eq!(pool.asset, "bitcoin");
        assert_eq!(pool.total_supplied, dec!(2));
        assert_eq!(pool.total_borrowed, Decimal::ZERO);
    }
}
