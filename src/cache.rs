//! Fetch-result cache
//!
//! A keyed memoization cache for per-symbol fetch outcomes, backed by a sled
//! key-value store with TTL stamping. Deterministic re-fetches inside the TTL
//! window are served from here instead of hitting the API again.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::time::{Duration, SystemTime};
use tracing::{debug, warn};

use crate::dataset::FetchOutcome;
use crate::market_data::SeriesFetcher;
use crate::retry::RetryPolicy;

#[derive(Serialize, Deserialize)]
struct CachedOutcome {
    outcome: FetchOutcome,
    stored_at: SystemTime,
}

/// TTL cache for fetch outcomes, keyed by (symbol, api key)
pub struct FetchCache {
    db: sled::Db,
    ttl: Duration,
}

impl FetchCache {
    /// Open the cache. With a path the cache persists across runs; without
    /// one it is backed by a temporary tree that dies with the process.
    pub fn open(path: Option<&str>, ttl: Duration) -> Result<Self> {
        let db = match path {
            Some(path) => sled::open(path)
                .context(format!("Failed to open fetch cache at {}", path))?,
            None => sled::Config::new()
                .temporary(true)
                .open()
                .context("Failed to open temporary fetch cache")?,
        };

        Ok(Self { db, ttl })
    }

    fn cache_key(symbol: &str, api_key: &str) -> Vec<u8> {
        let mut hasher = Sha256::new();
        hasher.update(symbol.as_bytes());
        hasher.update(b"\0");
        hasher.update(api_key.as_bytes());
        hasher.finalize().to_vec()
    }

    /// Look up a cached outcome; expired and unreadable entries are removed
    pub fn get(&self, symbol: &str, api_key: &str) -> Result<Option<FetchOutcome>> {
        let key = Self::cache_key(symbol, api_key);
        let raw = match self.db.get(&key).context("Failed to read fetch cache")? {
            Some(raw) => raw,
            None => return Ok(None),
        };

        let cached: CachedOutcome = match serde_json::from_slice(&raw) {
            Ok(cached) => cached,
            Err(e) => {
                warn!("Discarding unreadable cache entry for {}: {}", symbol, e);
                self.db.remove(&key).context("Failed to remove cache entry")?;
                return Ok(None);
            }
        };

        let age = SystemTime::now()
            .duration_since(cached.stored_at)
            .unwrap_or(Duration::ZERO);
        if age < self.ttl {
            Ok(Some(cached.outcome))
        } else {
            debug!("Cache entry for {} expired ({:?} old)", symbol, age);
            self.db.remove(&key).context("Failed to remove cache entry")?;
            Ok(None)
        }
    }

    pub fn put(&self, symbol: &str, api_key: &str, outcome: &FetchOutcome) -> Result<()> {
        let entry = CachedOutcome {
            outcome: outcome.clone(),
            stored_at: SystemTime::now(),
        };
        let raw = serde_json::to_vec(&entry).context("Failed to serialize cache entry")?;
        self.db
            .insert(Self::cache_key(symbol, api_key), raw)
            .context("Failed to write fetch cache")?;
        Ok(())
    }
}

/// A fetcher with the cache and retry policy composed around it
///
/// Cache hits short-circuit the network entirely; misses go through the
/// retry policy, and both `Series` and `NoData` outcomes are cached.
pub struct CachedFetcher<F: SeriesFetcher> {
    inner: F,
    cache: FetchCache,
    retry: RetryPolicy,
    api_key: String,
}

impl<F: SeriesFetcher> CachedFetcher<F> {
    pub fn new(inner: F, cache: FetchCache, retry: RetryPolicy, api_key: impl Into<String>) -> Self {
        Self {
            inner,
            cache,
            retry,
            api_key: api_key.into(),
        }
    }
}

#[async_trait]
impl<F: SeriesFetcher> SeriesFetcher for CachedFetcher<F> {
    async fn fetch_daily(&self, symbol: &str) -> Result<FetchOutcome> {
        if let Some(outcome) = self.cache.get(symbol, &self.api_key)? {
            debug!("Serving cached daily series for {}", symbol);
            return Ok(outcome);
        }

        let op_name = format!("fetch {}", symbol);
        let outcome = self
            .retry
            .run(&op_name, || self.inner.fetch_daily(symbol))
            .await?;

        self.cache.put(symbol, &self.api_key, &outcome)?;
        Ok(outcome)
    }
}
