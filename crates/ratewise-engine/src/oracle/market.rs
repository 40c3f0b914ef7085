//! In-memory market oracle and realized-volatility metrics

use async_trait::async_trait;
use dashmap::DashMap;
use ratewise_common::{
    MarketVolatility, OracleError, Result, SpotQuote, VolatilityRegime,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing::debug;

use super::{normalize_asset, MarketOracle};

/// Closes needed before realized volatility is computed
pub const VOLATILITY_WINDOW: usize = 30;

/// Extra history requested beyond the window
const HISTORY_PADDING_DAYS: usize = 7;

const SOURCE: &str = "in_memory";

/// Realized volatility over a closing-price series
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VolatilityMetrics {
    /// Population stddev of simple daily returns
    pub daily_volatility: f64,
    /// `daily_volatility × √365`
    pub annualized_volatility: f64,
    /// Largest peak-to-trough decline, in [0, 1]
    pub max_drawdown: f64,
    pub regime: VolatilityRegime,
    pub window: usize,
}

impl VolatilityMetrics {
    /// Compute metrics from closes (oldest first)
    ///
    /// Returns `None` with fewer than `window` closes or any non-positive close.
    pub fn from_prices(prices: &[f64], window: usize) -> Option<Self> {
        if prices.len() < window.max(2) || prices.iter().any(|p| !p.is_finite() || *p <= 0.0) {
            return None;
        }

        let returns: Vec<f64> = prices.windows(2).map(|w| (w[1] - w[0]) / w[0]).collect();
        let daily_volatility = std_dev(&returns);
        let annualized_volatility = daily_volatility * 365f64.sqrt();

        let mut peak = prices[0];
        let mut max_drawdown = 0.0f64;
        for &price in prices {
            peak = peak.max(price);
            max_drawdown = max_drawdown.max((peak - price) / peak);
        }

        Some(Self {
            daily_volatility,
            annualized_volatility,
            max_drawdown,
            regime: VolatilityRegime::classify(annualized_volatility),
            window,
        })
    }

    /// Metrics reported when there is not enough history
    pub fn reference() -> Self {
        Self {
            daily_volatility: 0.035,
            annualized_volatility: 0.67,
            max_drawdown: 0.15,
            regime: VolatilityRegime::Medium,
            window: VOLATILITY_WINDOW,
        }
    }
}

impl From<VolatilityMetrics> for MarketVolatility {
    fn from(m: VolatilityMetrics) -> Self {
        MarketVolatility {
            daily_volatility: Some(m.daily_volatility),
            annualized_volatility: Some(m.annualized_volatility),
            volatility_regime: Some(m.regime.to_string()),
            max_drawdown: Some(m.max_drawdown),
            calculation_window: Some(m.window),
        }
    }
}

/// Population standard deviation; 0 for fewer than one sample
pub(crate) fn std_dev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    variance.sqrt()
}

#[derive(Debug, Clone)]
struct Feed {
    spot: Decimal,
    history: Vec<f64>,
}

/// Market oracle backed by in-memory price feeds
pub struct InMemoryMarketOracle {
    feeds: DashMap<String, Feed>,
}

impl InMemoryMarketOracle {
    /// An oracle with no feeds
    pub fn new() -> Self {
        Self {
            feeds: DashMap::new(),
        }
    }

    /// An oracle seeded with reference spot prices and no history
    pub fn with_reference_prices() -> Self {
        let oracle = Self::new();
        for (asset, price) in [
            ("ethereum", dec!(2250.50)),
            ("bitcoin", dec!(43500)),
            ("chainlink", dec!(14.20)),
            ("uniswap", dec!(6.50)),
            ("solana", dec!(120)),
        ] {
            oracle.set_spot(asset, price);
        }
        oracle
    }

    pub fn set_spot(&self, asset: &str, price: Decimal) {
        self.feeds
            .entry(normalize_asset(asset))
            .and_modify(|feed| feed.spot = price)
            .or_insert_with(|| Feed {
                spot: price,
                history: Vec::new(),
            });
    }

    /// Replace an asset's daily closes (oldest first)
    ///
    /// Fails with `UnknownAsset` if the asset has no spot price yet.
    pub fn set_history(&self, asset: &str, closes: Vec<f64>) -> Result<()> {
        let key = normalize_asset(asset);
        let mut feed = self
            .feeds
            .get_mut(&key)
            .ok_or(OracleError::UnknownAsset(key.clone()))?;
        feed.history = closes;
        Ok(())
    }

    fn feed(&self, asset: &str) -> Result<Feed> {
        let key = normalize_asset(asset);
        self.feeds
            .get(&key)
            .map(|feed| feed.clone())
            .ok_or_else(|| OracleError::UnknownAsset(key).into())
    }
}

impl Default for InMemoryMarketOracle {
    fn default() -> Self {
        Self::with_reference_prices()
    }
}

#[async_trait]
impl MarketOracle for InMemoryMarketOracle {
    async fn get_spot(&self, asset: &str) -> Result<SpotQuote> {
        let feed = self.feed(asset)?;
        Ok(SpotQuote {
            asset: normalize_asset(asset),
            current_price: feed.spot,
            source: SOURCE.to_string(),
        })
    }

    async fn get_volatility(&self, asset: &str) -> Result<MarketVolatility> {
        let history = self
            .get_price_history(asset, VOLATILITY_WINDOW + HISTORY_PADDING_DAYS)
            .await?;

        let metrics = VolatilityMetrics::from_prices(&history, VOLATILITY_WINDOW).unwrap_or_else(|| {
            debug!(asset, points = history.len(), "Not enough history, using reference volatility");
            VolatilityMetrics::reference()
        });
        Ok(metrics.into())
    }

    async fn get_price_history(&self, asset: &str, days: usize) -> Result<Vec<f64>> {
        let feed = self.feed(asset)?;
        let start = feed.history.len().saturating_sub(days);
        Ok(feed.history[start..].to_vec())
    }
}
