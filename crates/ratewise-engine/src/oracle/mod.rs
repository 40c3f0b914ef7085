//! Oracle contracts
//!
//! The engine reads two upstream sources:
//! - a prediction oracle (price forecast and forecast volatility)
//! - a market oracle (spot prices and realized volatility)
//!
//! Both are async and may fail or hang; callers go through the
//! [`FallbackGuard`](crate::guard::FallbackGuard).

pub mod market;
pub mod prediction;

use async_trait::async_trait;
use ratewise_common::{MarketVolatility, PredictionPayload, Result, SpotQuote, VolatilityForecast};
use serde::Serialize;

pub use market::{InMemoryMarketOracle, VolatilityMetrics, VOLATILITY_WINDOW};
pub use prediction::TrendPredictionOracle;

/// Price forecasts for an asset
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PredictionOracle: Send + Sync {
    async fn get_prediction(&self, asset: &str) -> Result<PredictionPayload>;

    async fn get_volatility_prediction(&self, asset: &str) -> Result<VolatilityForecast>;
}

/// Spot prices and realized volatility for an asset
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MarketOracle: Send + Sync {
    async fn get_spot(&self, asset: &str) -> Result<SpotQuote>;

    async fn get_volatility(&self, asset: &str) -> Result<MarketVolatility>;

    /// Daily closes, oldest first, at most `days` long
    async fn get_price_history(&self, asset: &str, days: usize) -> Result<Vec<f64>>;
}

/// An asset the engine quotes rates for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SupportedAsset {
    pub id: &'static str,
    pub symbol: &'static str,
    pub name: &'static str,
}

const SUPPORTED_ASSETS: [SupportedAsset; 4] = [
    SupportedAsset {
        id: "ethereum",
        symbol: "ETH",
        name: "Ethereum",
    },
    SupportedAsset {
        id: "bitcoin",
        symbol: "BTC",
        name: "Bitcoin",
    },
    SupportedAsset {
        id: "chainlink",
        symbol: "LINK",
        name: "Chainlink",
    },
    SupportedAsset {
        id: "uniswap",
        symbol: "UNI",
        name: "Uniswap",
    },
];

pub fn supported_assets() -> &'static [SupportedAsset] {
    &SUPPORTED_ASSETS
}

/// Asset ids are matched case-insensitively
pub(crate) fn normalize_asset(asset: &str) -> String {
    asset.trim().to_ascii_lowercase()
}
