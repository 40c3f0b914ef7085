//! Engine configuration

use std::time::Duration;

use ratewise_common::{RateBounds, RatewiseError, Result};
use serde::{Deserialize, Serialize};

/// Ratewise engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Base rate and clamp window
    pub rates: RateSettings,
    /// Oracle call discipline
    pub oracle: OracleSettings,
    /// Snapshot history settings
    pub history: HistorySettings,
    /// Cache composed rates until their next update
    pub cache_enabled: bool,
    /// Route insufficient signals to the fallback instead of composing from defaults
    pub reject_insufficient_signal: bool,
    /// Assets the snapshot recorder tracks
    pub assets: Vec<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            rates: RateSettings::default(),
            oracle: OracleSettings::default(),
            history: HistorySettings::default(),
            cache_enabled: true,
            reject_insufficient_signal: false,
            assets: crate::DEFAULT_ASSETS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from environment (and `.env` if present)
    pub fn load() -> Result<Self> {
        let _ = dotenvy::dotenv();

        let mut cfg = Self::default();

        if let Some(v) = env_parse("RATEWISE_BASE_RATE") {
            cfg.rates.base_rate = v;
        }
        if let Some(v) = env_parse("RATEWISE_MIN_RATE") {
            cfg.rates.min_rate = v;
        }
        if let Some(v) = env_parse("RATEWISE_MAX_RATE") {
            cfg.rates.max_rate = v;
        }

        if let Some(v) = env_parse("RATEWISE_ORACLE_TIMEOUT_MS") {
            cfg.oracle.timeout_ms = v;
        }
        if let Some(v) = env_parse("RATEWISE_ORACLE_RETRIES") {
            cfg.oracle.retries = v;
        }
        if let Some(v) = env_parse("RATEWISE_RETRY_BACKOFF_MS") {
            cfg.oracle.backoff_ms = v;
        }

        if let Some(v) = env_parse("RATEWISE_HISTORY_RETENTION_DAYS") {
            cfg.history.retention_days = v;
        }
        if let Some(v) = env_parse("RATEWISE_SNAPSHOT_INTERVAL_SECS") {
            cfg.history.snapshot_interval_secs = v;
        }

        if let Some(v) = env_parse("RATEWISE_CACHE_ENABLED") {
            cfg.cache_enabled = v;
        }
        if let Some(v) = env_parse("RATEWISE_REJECT_INSUFFICIENT_SIGNAL") {
            cfg.reject_insufficient_signal = v;
        }
        if let Ok(assets) = std::env::var("RATEWISE_ASSETS") {
            let parsed = parse_assets(&assets);
            if !parsed.is_empty() {
                cfg.assets = parsed;
            }
        }

        cfg.validate()?;
        Ok(cfg)
    }

    /// Reject rate windows the composer cannot honor
    pub fn validate(&self) -> Result<()> {
        let r = &self.rates;
        if !(r.base_rate.is_finite() && r.min_rate.is_finite() && r.max_rate.is_finite()) {
            return Err(RatewiseError::Config("rates must be finite".to_string()));
        }
        if r.min_rate < 0.0 || r.base_rate < 0.0 {
            return Err(RatewiseError::Config("rates must be non-negative".to_string()));
        }
        if r.min_rate > r.max_rate {
            return Err(RatewiseError::Config(format!(
                "min_rate {} exceeds max_rate {}",
                r.min_rate, r.max_rate
            )));
        }
        if r.base_rate < r.min_rate || r.base_rate > r.max_rate {
            return Err(RatewiseError::Config(format!(
                "base_rate {} outside [{}, {}]",
                r.base_rate, r.min_rate, r.max_rate
            )));
        }
        if self.oracle.timeout_ms == 0 {
            return Err(RatewiseError::Config("oracle timeout must be positive".to_string()));
        }
        Ok(())
    }

    pub fn bounds(&self) -> RateBounds {
        RateBounds::new(self.rates.base_rate, self.rates.min_rate, self.rates.max_rate)
    }
}

/// Rate window settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateSettings {
    pub base_rate: f64,
    pub min_rate: f64,
    pub max_rate: f64,
}

impl Default for RateSettings {
    fn default() -> Self {
        let bounds = RateBounds::default();
        Self {
            base_rate: bounds.base_rate,
            min_rate: bounds.min_rate,
            max_rate: bounds.max_rate,
        }
    }
}

/// Oracle timeout and retry settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OracleSettings {
    /// Per-attempt timeout
    pub timeout_ms: u64,
    /// Extra attempts after the first
    pub retries: u32,
    /// Backoff before the first retry, doubled each time
    pub backoff_ms: u64,
}

impl OracleSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn backoff(&self) -> Duration {
        Duration::from_millis(self.backoff_ms)
    }
}

impl Default for OracleSettings {
    fn default() -> Self {
        Self {
            timeout_ms: 2000,
            retries: 1,
            backoff_ms: 100,
        }
    }
}

/// Rate history settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistorySettings {
    /// Snapshots older than this are pruned
    pub retention_days: u32,
    /// How often the recorder computes every tracked asset
    pub snapshot_interval_secs: u64,
}

impl HistorySettings {
    pub fn snapshot_interval(&self) -> Duration {
        Duration::from_secs(self.snapshot_interval_secs.max(1))
    }
}

impl Default for HistorySettings {
    fn default() -> Self {
        Self {
            retention_days: ratewise_common::MAX_HISTORY_DAYS,
            snapshot_interval_secs: ratewise_common::RATE_UPDATE_INTERVAL_SECS as u64,
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

fn parse_assets(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_ascii_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}
