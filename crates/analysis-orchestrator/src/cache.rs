use analysis_core::{AnalysisError, Bar, MarketDataProvider, OptionChain};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;

/// Internal cache entry with timestamp
struct CacheEntry<T> {
    data: T,
    cached_at: DateTime<Utc>,
}

/// Freshness windows for memoized provider calls
#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub history_ttl: Duration,
    pub expiries_ttl: Duration,
    pub chain_ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            history_ttl: Duration::seconds(300),
            expiries_ttl: Duration::seconds(60),
            chain_ttl: Duration::seconds(60),
        }
    }
}

/// Memoizes another provider. Only successful responses are cached.
pub struct CachedProvider<P> {
    inner: P,
    config: CacheConfig,
    /// Keyed by `symbol:days`
    history_cache: DashMap<String, CacheEntry<Vec<Bar>>>,
    expiries_cache: DashMap<String, CacheEntry<Vec<String>>>,
    /// Keyed by `symbol:expiry`
    chain_cache: DashMap<String, CacheEntry<OptionChain>>,
}

impl<P: MarketDataProvider> CachedProvider<P> {
    pub fn new(inner: P) -> Self {
        Self::with_config(inner, CacheConfig::default())
    }

    pub fn with_config(inner: P, config: CacheConfig) -> Self {
        Self {
            inner,
            config,
            history_cache: DashMap::new(),
            expiries_cache: DashMap::new(),
            chain_cache: DashMap::new(),
        }
    }

    pub fn inner(&self) -> &P {
        &self.inner
    }

    /// Drop every cached response
    pub fn clear(&self) {
        self.history_cache.clear();
        self.expiries_cache.clear();
        self.chain_cache.clear();
    }
}

fn lookup<T: Clone>(cache: &DashMap<String, CacheEntry<T>>, key: &str, ttl: Duration) -> Option<T> {
    let entry = cache.get(key)?;
    if Utc::now() - entry.cached_at < ttl {
        tracing::debug!("Cache hit for {}", key);
        Some(entry.data.clone())
    } else {
        None
    }
}

fn store<T>(cache: &DashMap<String, CacheEntry<T>>, key: String, data: T) {
    cache.insert(key, CacheEntry {
        data,
        cached_at: Utc::now(),
    });
}

#[async_trait]
impl<P: MarketDataProvider> MarketDataProvider for CachedProvider<P> {
    async fn fetch_history(&self, symbol: &str, period_days: i64) -> Result<Vec<Bar>, AnalysisError> {
        let key = format!("{}:{}", symbol, period_days);
        if let Some(bars) = lookup(&self.history_cache, &key, self.config.history_ttl) {
            return Ok(bars);
        }

        let bars = self.inner.fetch_history(symbol, period_days).await?;
        store(&self.history_cache, key, bars.clone());
        Ok(bars)
    }

    async fn fetch_expiries(&self, symbol: &str) -> Result<Vec<String>, AnalysisError> {
        if let Some(expiries) = lookup(&self.expiries_cache, symbol, self.config.expiries_ttl) {
            return Ok(expiries);
        }

        let expiries = self.inner.fetch_expiries(symbol).await?;
        store(&self.expiries_cache, symbol.to_string(), expiries.clone());
        Ok(expiries)
    }

    async fn fetch_option_chain(&self, symbol: &str, expiry: &str) -> Result<OptionChain, AnalysisError> {
        let key = format!("{}:{}", symbol, expiry);
        if let Some(chain) = lookup(&self.chain_cache, &key, self.config.chain_ttl) {
            return Ok(chain);
        }

        let chain = self.inner.fetch_option_chain(symbol, expiry).await?;
        store(&self.chain_cache, key, chain.clone());
        Ok(chain)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingProvider {
        history_calls: AtomicUsize,
        chain_calls: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl MarketDataProvider for CountingProvider {
        async fn fetch_history(&self, _symbol: &str, _period_days: i64) -> Result<Vec<Bar>, AnalysisError> {
            self.history_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(AnalysisError::ApiError("boom".to_string()));
            }
            Ok(Vec::new())
        }

        async fn fetch_expiries(&self, _symbol: &str) -> Result<Vec<String>, AnalysisError> {
            Ok(vec!["2025-01-30".to_string()])
        }

        async fn fetch_option_chain(&self, _symbol: &str, _expiry: &str) -> Result<OptionChain, AnalysisError> {
            self.chain_calls.fetch_add(1, Ordering::SeqCst);
            Ok(OptionChain::default())
        }
    }

    #[tokio::test]
    async fn test_history_is_memoized_per_key() {
        let cached = CachedProvider::new(CountingProvider::default());

        cached.fetch_history("TCS.NS", 90).await.unwrap();
        cached.fetch_history("TCS.NS", 90).await.unwrap();
        assert_eq!(cached.inner().history_calls.load(Ordering::SeqCst), 1);

        // different period is a different key
        cached.fetch_history("TCS.NS", 30).await.unwrap();
        assert_eq!(cached.inner().history_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_chain_is_keyed_by_expiry() {
        let cached = CachedProvider::new(CountingProvider::default());

        cached.fetch_option_chain("TCS.NS", "2025-01-30").await.unwrap();
        cached.fetch_option_chain("TCS.NS", "2025-01-30").await.unwrap();
        cached.fetch_option_chain("TCS.NS", "2025-02-27").await.unwrap();
        assert_eq!(cached.inner().chain_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_stale_entries_are_refetched() {
        let config = CacheConfig {
            history_ttl: Duration::zero(),
            ..CacheConfig::default()
        };
        let cached = CachedProvider::with_config(CountingProvider::default(), config);

        cached.fetch_history("TCS.NS", 90).await.unwrap();
        cached.fetch_history("TCS.NS", 90).await.unwrap();
        assert_eq!(cached.inner().history_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_errors_are_not_cached() {
        let provider = CountingProvider {
            fail: true,
            ..CountingProvider::default()
        };
        let cached = CachedProvider::new(provider);

        assert!(cached.fetch_history("TCS.NS", 90).await.is_err());
        assert!(cached.fetch_history("TCS.NS", 90).await.is_err());
        assert_eq!(cached.inner().history_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_clear() {
        let cached = CachedProvider::new(CountingProvider::default());
        cached.fetch_option_chain("TCS.NS", "2025-01-30").await.unwrap();
        cached.clear();
        cached.fetch_option_chain("TCS.NS", "2025-01-30").await.unwrap();
        assert_eq!(cached.inner().chain_calls.load(Ordering::SeqCst), 2);
    }
}
