//! Trend-following prediction oracle
//!
//! Projects the spot price's distance from its 30-day mean forward a week,
//! damped by half. Used where no trained forecasting model is available.

use std::sync::Arc;

use async_trait::async_trait;
use ratewise_common::{
    OracleError, PredictionPayload, Result, RiskLevel, Trend, VolatilityForecast,
};
use rust_decimal::prelude::ToPrimitive;
use tracing::debug;

use super::market::std_dev;
use super::{MarketOracle, PredictionOracle};

pub const MODEL_VERSION: &str = "trend_v1";

const DATA_SOURCE: &str = "trend_following";
const MOVING_AVERAGE_DAYS: usize = 30;
const PROJECTION_DAYS: usize = 7;
const DAMPENING: f64 = 0.5;
const CONFIDENCE: f64 = 0.6;

/// Moving-average trend predictor over a [`MarketOracle`]
pub struct TrendPredictionOracle<M: MarketOracle + ?Sized> {
    market: Arc<M>,
}

impl<M: MarketOracle + ?Sized> TrendPredictionOracle<M> {
    pub fn new(market: Arc<M>) -> Self {
        Self { market }
    }

    /// `(spot − ma_30) / ma_30`
    async fn trend(&self, asset: &str) -> Result<f64> {
        let spot = self
            .market
            .get_spot(asset)
            .await?
            .current_price
            .to_f64()
            .ok_or_else(|| OracleError::Malformed(format!("spot price for {asset} is not representable")))?;

        let closes = self.market.get_price_history(asset, MOVING_AVERAGE_DAYS).await?;
        let moving_average = if closes.is_empty() {
            spot
        } else {
            closes.iter().sum::<f64>() / closes.len() as f64
        };

        if !(moving_average.is_finite() && moving_average > 0.0) {
            return Err(OracleError::Malformed(format!(
                "moving average for {asset} is {moving_average}"
            ))
            .into());
        }

        Ok((spot - moving_average) / moving_average)
    }
}

/// Daily projected prices compounding `daily_change`, starting at 1
fn project(trend: f64) -> Vec<f64> {
    let daily_change = trend / PROJECTION_DAYS as f64 * DAMPENING;
    let mut price = 1.0;
    (0..PROJECTION_DAYS)
        .map(|_| {
            price *= 1.0 + daily_change;
            price
        })
        .collect()
}

#[async_trait]
impl<M: MarketOracle + ?Sized> PredictionOracle for TrendPredictionOracle<M> {
    async fn get_prediction(&self, asset: &str) -> Result<PredictionPayload> {
        let trend = self.trend(asset).await?;
        let direction = if trend > 0.0 { Trend::Bullish } else { Trend::Bearish };

        debug!(asset, trend, %direction, "Trend prediction");

        Ok(PredictionPayload {
            trend: Some(direction.to_string()),
            predicted_change_percent: Some(trend * 100.0),
            confidence_score: Some(CONFIDENCE),
            model_version: Some(MODEL_VERSION.to_string()),
            data_source: Some(DATA_SOURCE.to_string()),
        })
    }

    async fn get_volatility_prediction(&self, asset: &str) -> Result<VolatilityForecast> {
        let trend = self.trend(asset).await?;
        let projected = project(trend);
        let changes: Vec<f64> = projected.windows(2).map(|w| (w[1] - w[0]) / w[0]).collect();
        let predicted_volatility = std_dev(&changes);

        Ok(VolatilityForecast {
            predicted_volatility: Some(predicted_volatility),
            risk_level: Some(RiskLevel::classify(predicted_volatility, CONFIDENCE).to_string()),
            trend_strength: Some((trend * 100.0).abs()),
        })
    }
}
