//! Read-through rate cache with logical expiry.
//!
//! The backing key-value store has no TTL of its own: every record carries its
//! capture timestamp and staleness is decided here on read.

use std::{collections::HashMap, sync::Arc, time::Duration};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::{domain::CurrencyCode, errors::CacheError};

/// Hexagonal port for a string key-value store (Redis in production).
///
/// Single-key get/set must be atomic; no cross-key transactions are needed.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Connectivity check, called once when the cache gateway is built.
    async fn ping(&self) -> Result<(), CacheError>;

    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    async fn set(&self, key: &str, value: &str) -> Result<(), CacheError>;
}

/// Process-local store. Used when no external cache is configured and in tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn ping(&self) -> Result<(), CacheError> {
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        Ok(self.inner.lock().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), CacheError> {
        self.inner
            .lock()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Stored record: `{"timestamp": <unix seconds>, "rate": <target per source unit>}`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CachedRate {
    pub timestamp: f64,
    pub rate: f64,
}

impl CachedRate {
    pub fn new(rate: f64, captured_at: DateTime<Utc>) -> Self {
        Self {
            timestamp: unix_seconds(captured_at),
            rate,
        }
    }

    pub fn is_fresh(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        let captured_micros = (self.timestamp * 1_000_000.0).round() as i64;
        let age_micros = now.timestamp_micros().saturating_sub(captured_micros);
        i128::from(age_micros) < ttl.as_micros() as i128
    }
}

fn unix_seconds(t: DateTime<Utc>) -> f64 {
    t.timestamp_micros() as f64 / 1_000_000.0
}

pub fn cache_key(from: &CurrencyCode, to: &CurrencyCode) -> String {
    format!("{from}_{to}")
}

/// Rate cache gateway.
///
/// `ready` is decided once by probing the store at construction. When the probe
/// fails, reads short-circuit to "no entry" and writes are skipped for the rest of
/// the session. Store faults are swallowed (and logged) unless `diagnostic` is on,
/// in which case they are returned to the caller.
pub struct RateCache {
    store: Option<Arc<dyn KeyValueStore>>,
    ttl: Duration,
    diagnostic: bool,
    ready: bool,
    probe_error: Option<String>,
}

impl RateCache {
    pub async fn connect(store: Arc<dyn KeyValueStore>, ttl: Duration, diagnostic: bool) -> Self {
        let (ready, probe_error) = match store.ping().await {
            Ok(()) => (true, None),
            Err(e) => {
                warn!("rate cache unavailable, conversions will bypass it: {e}");
                (false, Some(e.to_string()))
            }
        };

        Self {
            store: Some(store),
            ttl,
            diagnostic,
            ready,
            probe_error,
        }
    }

    /// A gateway with no backing store. Never reports errors.
    pub fn disabled(ttl: Duration, diagnostic: bool) -> Self {
        Self {
            store: None,
            ttl,
            diagnostic,
            ready: false,
            probe_error: None,
        }
    }

    /// A gateway whose store could not even be set up. Behaves like a failed
    /// probe: silent by default, `Unavailable` on every read in diagnostic mode.
    pub fn unavailable(err: CacheError, ttl: Duration, diagnostic: bool) -> Self {
        warn!("rate cache unavailable, conversions will bypass it: {err}");
        Self {
            store: None,
            ttl,
            diagnostic,
            ready: false,
            probe_error: Some(err.to_string()),
        }
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    fn ready_store(&self) -> Result<Option<&Arc<dyn KeyValueStore>>, CacheError> {
        match (&self.store, self.ready) {
            (Some(store), true) => Ok(Some(store)),
            _ => match (&self.probe_error, self.diagnostic) {
                (Some(e), true) => Err(CacheError::Unavailable(e.clone())),
                _ => Ok(None),
            },
        }
    }

    fn degrade<T>(&self, err: CacheError, fallback: T) -> Result<T, CacheError> {
        if self.diagnostic {
            return Err(err);
        }
        warn!("rate cache fault ignored: {err}");
        Ok(fallback)
    }

    pub async fn read_valid(
        &self,
        from: &CurrencyCode,
        to: &CurrencyCode,
    ) -> Result<Option<f64>, CacheError> {
        self.read_valid_at(from, to, Utc::now()).await
    }

    /// Fresh cached rate for the pair, or `None` when absent, undecodable or stale.
    pub async fn read_valid_at(
        &self,
        from: &CurrencyCode,
        to: &CurrencyCode,
        now: DateTime<Utc>,
    ) -> Result<Option<f64>, CacheError> {
        let Some(store) = self.ready_store()? else {
            return Ok(None);
        };

        let key = cache_key(from, to);
        let raw = match store.get(&key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return Ok(None),
            Err(e) => return self.degrade(e, None),
        };

        let record: CachedRate = match serde_json::from_str(&raw) {
            Ok(r) => r,
            Err(e) => {
                return self.degrade(
                    CacheError::Decode {
                        key,
                        reason: e.to_string(),
                    },
                    None,
                )
            }
        };

        if !record.is_fresh(now, self.ttl) {
            debug!("cached rate {key} is stale");
            return Ok(None);
        }

        Ok(Some(record.rate))
    }

    /// Upsert the rate for the pair. Last writer wins.
    pub async fn write_rate(
        &self,
        from: &CurrencyCode,
        to: &CurrencyCode,
        rate: f64,
        captured_at: DateTime<Utc>,
    ) -> Result<(), CacheError> {
        let (Some(store), true) = (&self.store, self.ready) else {
            return Ok(());
        };

        let key = cache_key(from, to);
        let value = match serde_json::to_string(&CachedRate::new(rate, captured_at)) {
            Ok(v) => v,
            Err(e) => return self.degrade(CacheError::Encode(e.to_string()), ()),
        };

        match store.set(&key, &value).await {
            Ok(()) => {
                debug!("cached rate {key}={rate}");
                Ok(())
            }
            Err(e) => self.degrade(e, ()),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Store that fails every call and counts them.
    #[derive(Default)]
    pub(crate) struct DownStore {
        pub(crate) calls: AtomicUsize,
    }

    #[async_trait]
    impl KeyValueStore for DownStore {
        async fn ping(&self) -> Result<(), CacheError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(CacheError::Backend("connection refused".to_string()))
        }

        async fn get(&self, _key: &str) -> Result<Option<String>, CacheError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(CacheError::Backend("connection refused".to_string()))
        }

        async fn set(&self, _key: &str, _value: &str) -> Result<(), CacheError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(CacheError::Backend("connection refused".to_string()))
        }
    }

    /// Store that answers the probe but fails afterwards.
    #[derive(Default)]
    pub(crate) struct FlakyStore;

    #[async_trait]
    impl KeyValueStore for FlakyStore {
        async fn ping(&self) -> Result<(), CacheError> {
            Ok(())
        }

        async fn get(&self, _key: &str) -> Result<Option<String>, CacheError> {
            Err(CacheError::Backend("read timeout".to_string()))
        }

        async fn set(&self, _key: &str, _value: &str) -> Result<(), CacheError> {
            Err(CacheError::Backend("read only replica".to_string()))
        }
    }

    fn usd() -> CurrencyCode {
        CurrencyCode::new("USD")
    }

    fn rub() -> CurrencyCode {
        CurrencyCode::new("RUB")
    }

    const TTL: Duration = Duration::from_secs(3600);

    #[tokio::test]
    async fn write_then_read_round_trips() {
        let cache = RateCache::connect(Arc::new(MemoryStore::new()), TTL, false).await;
        assert!(cache.is_ready());

        let now = Utc::now();
        cache.write_rate(&usd(), &rub(), 95.25, now).await.unwrap();
        assert_eq!(
            cache.read_valid_at(&usd(), &rub(), now).await.unwrap(),
            Some(95.25)
        );
        // Pairs are directional.
        assert_eq!(cache.read_valid_at(&rub(), &usd(), now).await.unwrap(), None);
    }

    #[tokio::test]
    async fn record_format_is_timestamp_and_rate() {
        let store = Arc::new(MemoryStore::new());
        let cache = RateCache::connect(store.clone(), TTL, false).await;
        let at = DateTime::<Utc>::from_timestamp(1_700_000_000, 0).unwrap();
        cache.write_rate(&usd(), &rub(), 95.0, at).await.unwrap();

        let raw = store.get("USD_RUB").await.unwrap().unwrap();
        let v: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(v["timestamp"].as_f64(), Some(1_700_000_000.0));
        assert_eq!(v["rate"].as_f64(), Some(95.0));
    }

    #[tokio::test]
    async fn stale_record_reads_as_absent() {
        let cache = RateCache::connect(Arc::new(MemoryStore::new()), TTL, false).await;
        let at = DateTime::<Utc>::from_timestamp(1_700_000_000, 0).unwrap();
        cache.write_rate(&usd(), &rub(), 95.0, at).await.unwrap();

        let almost = at + chrono::Duration::seconds(3599);
        let expired = at + chrono::Duration::seconds(3600);
        assert_eq!(
            cache.read_valid_at(&usd(), &rub(), almost).await.unwrap(),
            Some(95.0)
        );
        assert_eq!(cache.read_valid_at(&usd(), &rub(), expired).await.unwrap(), None);
    }

    #[tokio::test]
    async fn zero_rate_is_a_hit() {
        let cache = RateCache::connect(Arc::new(MemoryStore::new()), TTL, false).await;
        let now = Utc::now();
        cache.write_rate(&usd(), &rub(), 0.0, now).await.unwrap();
        assert_eq!(
            cache.read_valid_at(&usd(), &rub(), now).await.unwrap(),
            Some(0.0)
        );
    }

    #[tokio::test]
    async fn undecodable_record_is_a_miss_unless_diagnostic() {
        let store = Arc::new(MemoryStore::new());
        store.set("USD_RUB", "not json").await.unwrap();

        let cache = RateCache::connect(store.clone(), TTL, false).await;
        assert_eq!(cache.read_valid(&usd(), &rub()).await.unwrap(), None);

        let diag = RateCache::connect(store, TTL, true).await;
        assert!(matches!(
            diag.read_valid(&usd(), &rub()).await,
            Err(CacheError::Decode { .. })
        ));
    }

    #[tokio::test]
    async fn failed_probe_disables_cache_without_further_calls() {
        let store = Arc::new(DownStore::default());
        let cache = RateCache::connect(store.clone(), TTL, false).await;
        assert!(!cache.is_ready());
        assert_eq!(store.calls.load(Ordering::SeqCst), 1);

        assert_eq!(cache.read_valid(&usd(), &rub()).await.unwrap(), None);
        cache
            .write_rate(&usd(), &rub(), 95.0, Utc::now())
            .await
            .unwrap();
        assert_eq!(store.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failed_probe_surfaces_in_diagnostic_mode() {
        let cache = RateCache::connect(Arc::new(DownStore::default()), TTL, true).await;
        assert!(matches!(
            cache.read_valid(&usd(), &rub()).await,
            Err(CacheError::Unavailable(_))
        ));
    }

    #[tokio::test]
    async fn runtime_faults_degrade_by_default() {
        let cache = RateCache::connect(Arc::new(FlakyStore), TTL, false).await;
        assert!(cache.is_ready());
        assert_eq!(cache.read_valid(&usd(), &rub()).await.unwrap(), None);
        assert!(cache
            .write_rate(&usd(), &rub(), 95.0, Utc::now())
            .await
            .is_ok());

        let diag = RateCache::connect(Arc::new(FlakyStore), TTL, true).await;
        assert!(diag.read_valid(&usd(), &rub()).await.is_err());
        assert!(diag
            .write_rate(&usd(), &rub(), 95.0, Utc::now())
            .await
            .is_err());
    }

    #[tokio::test]
    async fn disabled_cache_is_silent() {
        let cache = RateCache::disabled(TTL, true);
        assert!(!cache.is_ready());
        assert_eq!(cache.read_valid(&usd(), &rub()).await.unwrap(), None);
        assert!(cache
            .write_rate(&usd(), &rub(), 95.0, Utc::now())
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn unavailable_cache_reports_setup_error_only_in_diagnostic_mode() {
        let err = || CacheError::Backend("invalid redis url".to_string());

        let quiet = RateCache::unavailable(err(), TTL, false);
        assert!(!quiet.is_ready());
        assert_eq!(quiet.read_valid(&usd(), &rub()).await.unwrap(), None);

        let diag = RateCache::unavailable(err(), TTL, true);
        match diag.read_valid(&usd(), &rub()).await {
            Err(CacheError::Unavailable(msg)) => assert!(msg.contains("invalid redis url")),
            other => panic!("unexpected {other:?}"),
        }
    }
}
