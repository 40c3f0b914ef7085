//! Fallback guard
//!
//! Bounds every oracle call with a timeout and a small number of retries, and
//! builds the deterministic degraded rate returned when composition cannot
//! proceed. Store calls get the same timeout but a single attempt. Entry
//! points never surface these errors to their callers.

use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, Utc};
use ratewise_common::{
    DegradedReason, OracleError, RateBounds, RateBreakdown, RatewiseError, Result, StoreError,
    FALLBACK_RATE_SPREAD, RATE_UPDATE_INTERVAL_SECS,
};
use tracing::warn;

use crate::config::OracleSettings;
use crate::pricing::compound_apy;

const FALLBACK_VOLATILITY_PREMIUM: f64 = 0.02;
const FALLBACK_UTILIZATION_FACTOR: f64 = 0.01;

/// Timeout and bounded retry around oracle calls
#[derive(Debug, Clone, Copy)]
pub struct FallbackGuard {
    timeout: Duration,
    retries: u32,
    backoff: Duration,
}

impl FallbackGuard {
    pub fn new(settings: &OracleSettings) -> Self {
        Self {
            timeout: settings.timeout(),
            retries: settings.retries,
            backoff: settings.backoff(),
        }
    }

    /// Run `op` under the per-attempt timeout, retrying transient failures
    ///
    /// Backoff doubles after every failed attempt. Unknown assets and
    /// malformed payloads are not retried.
    pub async fn call<T, F, Fut>(&self, oracle: &str, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut backoff = self.backoff;
        let mut attempt = 0u32;

        loop {
            let outcome = match tokio::time::timeout(self.timeout, op()).await {
                Ok(result) => result,
                Err(_) => Err(OracleError::Timeout {
                    oracle: oracle.to_string(),
                    elapsed_ms: self.timeout.as_millis() as u64,
                }
                .into()),
            };

            match outcome {
                Ok(value) => return Ok(value),
                Err(err) if attempt < self.retries && is_transient(&err) => {
                    attempt += 1;
                    warn!(oracle, attempt, error = %err, "Oracle call failed, retrying");
                    tokio::time::sleep(backoff).await;
                    backoff = backoff.saturating_mul(2);
                }
                Err(err) => return Err(err),
            }
        }
    }
}

impl FallbackGuard {
    /// Run one store call under the per-attempt timeout, without retries
    pub async fn store_call<T, Fut>(&self, store: &str, call: Fut) -> Result<T>
    where
        Fut: Future<Output = Result<T>>,
    {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result,
            Err(_) => {
                warn!(store, timeout_ms = self.timeout.as_millis() as u64, "Store call timed out");
                Err(StoreError::Backend(format!(
                    "{store} store timed out after {}ms",
                    self.timeout.as_millis()
                ))
                .into())
            }
        }
    }
}

impl Default for FallbackGuard {
    fn default() -> Self {
        Self::new(&OracleSettings::default())
    }
}

fn is_transient(err: &RatewiseError) -> bool {
    !matches!(
        err,
        RatewiseError::Oracle(OracleError::UnknownAsset(_) | OracleError::Malformed(_))
            | RatewiseError::InvalidInput(_)
    )
}

/// Deterministic degraded rate: `clamp(base_rate + 0.03)`, valid for one hour
pub fn fallback_breakdown(
    bounds: &RateBounds,
    asset: &str,
    reason: DegradedReason,
    now: DateTime<Utc>,
) -> RateBreakdown {
    let effective_rate = bounds.clamp(bounds.base_rate + FALLBACK_RATE_SPREAD);

    RateBreakdown {
        asset: asset.to_string(),
        base_rate: bounds.base_rate,
        volatility_premium: FALLBACK_VOLATILITY_PREMIUM,
        utilization_factor: FALLBACK_UTILIZATION_FACTOR,
        risk_adjustment: 0.0,
        effective_rate,
        apy: compound_apy(effective_rate),
        utilization: 0.0,
        next_update: now + chrono::Duration::seconds(RATE_UPDATE_INTERVAL_SECS),
        computed_at: now,
        signal: None,
        provenance: None,
        degraded: Some(reason),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn guard(retries: u32) -> FallbackGuard {
        FallbackGuard::new(&OracleSettings {
            timeout_ms: 50,
            retries,
            backoff_ms: 10,
        })
    }

    #[test]
    fn test_fallback_rate() {
        let now = Utc::now();
        let b = fallback_breakdown(
            &RateBounds::default(),
            "ethereum",
            DegradedReason::OracleUnavailable,
            now,
        );
        assert!((b.effective_rate - 0.05).abs() < 1e-12);
        assert_eq!(b.volatility_premium, 0.02);
        assert_eq!(b.utilization_factor, 0.01);
        assert_eq!(b.risk_adjustment, 0.0);
        assert_eq!(b.next_update - now, chrono::Duration::hours(1));
        assert_eq!(b.degraded, Some(DegradedReason::OracleUnavailable));
        assert!(b.signal.is_none());
    }

    #[test]
    fn test_fallback_rate_is_clamped() {
        let bounds = RateBounds::new(0.29, 0.01, 0.30);
        let b = fallback_breakdown(&bounds, "bitcoin", DegradedReason::NumericError, Utc::now());
        assert_eq!(b.effective_rate, 0.30);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_after_retries() {
        let calls = AtomicU32::new(0);
        let result: Result<()> = guard(2)
            .call("prediction", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async {
                    tokio::time::sleep(Duration::from_secs(60)).await;
                    Ok(())
                }
            })
            .await;

        assert!(matches!(
            result,
            Err(RatewiseError::Oracle(OracleError::Timeout { elapsed_ms: 50, .. }))
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_recovers_on_retry() {
        let calls = AtomicU32::new(0);
        let result = guard(1)
            .call("market", || {
                let attempt = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if attempt == 0 {
                        Err(OracleError::Unavailable {
                            oracle: "market".to_string(),
                            asset: "ethereum".to_string(),
                            reason: "connection reset".to_string(),
                        }
                        .into())
                    } else {
                        Ok(42)
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hanging_store_call_times_out() {
        let result: Result<()> = guard(3).store_call("pool", std::future::pending()).await;
        assert!(matches!(
            result,
            Err(RatewiseError::Store(StoreError::Backend(_)))
        ));
    }

    #[tokio::test]
    async fn test_store_call_passes_through() {
        let result = guard(0).store_call("pool", async { Ok(7) }).await;
        assert_eq!(result.unwrap(), 7);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_asset_not_retried() {
        let calls = AtomicU32::new(0);
        let result: Result<()> = guard(3)
            .call("market", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(OracleError::UnknownAsset("dogecoin".to_string()).into()) }
            })
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
