//! Position storage

use async_trait::async_trait;
use dashmap::DashMap;
use ratewise_common::{BorrowedAsset, Result, SuppliedAsset, UserPosition};
use rust_decimal_macros::dec;

/// Trait for wallet position backends
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PositionStore: Send + Sync {
    async fn get_position(&self, wallet_address: &str) -> Result<Option<UserPosition>>;

    async fn put_position(&self, position: UserPosition) -> Result<()>;
}

/// In-memory position store keyed by lowercased wallet address
pub struct InMemoryPositionStore {
    positions: DashMap<String, UserPosition>,
}

impl InMemoryPositionStore {
    pub fn new() -> Self {
        Self {
            positions: DashMap::new(),
        }
    }

    /// Reference position: 5 ETH supplied ($11,250), 2 ETH borrowed ($4,500)
    pub fn reference_position(wallet_address: &str) -> UserPosition {
        UserPosition::from_entries(
            wallet_address,
            vec![SuppliedAsset {
                asset: "ethereum".to_string(),
                amount: dec!(5),
                value_usd: dec!(11250),
                apy: 0.045,
            }],
            vec![BorrowedAsset {
                asset: "ethereum".to_string(),
                amount: dec!(2),
                value_usd: dec!(4500),
                rate: 0.08,
            }],
        )
    }
}

impl Default for InMemoryPositionStore {
    fn default() -> Self {
        Self::new()
    }
}

fn wallet_key(wallet_address: &str) -> String {
    wallet_address.trim().to_ascii_lowercase()
}

#[async_trait]
impl PositionStore for InMemoryPositionStore {
    async fn get_position(&self, wallet_address: &str) -> Result<Option<UserPosition>> {
        Ok(self
            .positions
            .get(&wallet_key(wallet_address))
            .map(|p| p.clone()))
    }

    async fn put_position(&self, position: UserPosition) -> Result<()> {
        self.positions
            .insert(wallet_key(&position.wallet_address), position);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_roundtrip_case_insensitive() {
        let store = InMemoryPositionStore::new();
        store
            .put_position(InMemoryPositionStore::reference_position("0xAbC"))
            .await
            .unwrap();

        let position = store.get_position("0xabc").await.unwrap().unwrap();
        assert_eq!(position.total_supplied_usd, dec!(11250));
        assert_eq!(position.total_borrowed_usd, dec!(4500));
        assert_eq!(position.net_worth_usd(), dec!(6750));

        assert!(store.get_position("0xdef").await.unwrap().is_none());
    }
}
