use std::{future::Future, sync::Arc, time::Duration};

use moka::future::Cache;
use tracing::debug;

use crate::{
    error::FetchError,
    model::{WeatherBundle, WeatherQuery},
};

pub const DEFAULT_TTL: Duration = Duration::from_secs(60 * 60);

/// Cache key: the exact place name and credential a bundle was fetched with.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    place_name: String,
    api_key: String,
}

impl From<&WeatherQuery> for CacheKey {
    fn from(query: &WeatherQuery) -> Self {
        Self {
            place_name: query.place_name().to_string(),
            api_key: query.api_key().to_string(),
        }
    }
}

/// Time-bounded store of assembled bundles.
///
/// Entries live for `ttl` from insertion; reads never extend that. Lookups
/// are lock-free for concurrent readers.
#[derive(Clone)]
pub struct BundleCache {
    ttl: Duration,
    cache: Cache<CacheKey, Arc<WeatherBundle>>,
}

impl std::fmt::Debug for BundleCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BundleCache")
            .field("ttl", &self.ttl)
            .field("entries", &self.cache.entry_count())
            .finish()
    }
}

impl BundleCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            cache: Cache::builder().time_to_live(ttl).build(),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub async fn get(&self, key: &CacheKey) -> Option<Arc<WeatherBundle>> {
        self.cache.get(key).await
    }

    pub async fn insert(&self, key: CacheKey, bundle: Arc<WeatherBundle>) {
        self.cache.insert(key, bundle).await;
    }

    /// Returns the cached bundle or runs `init` to produce it.
    ///
    /// Concurrent callers for one key share a single `init`; only the first
    /// runs it and the rest receive its outcome. Errors are handed back to
    /// every waiter and nothing is stored. If the running caller is dropped
    /// mid-way, a waiting caller takes over.
    pub async fn get_or_try_insert_with<F>(
        &self,
        key: CacheKey,
        init: F,
    ) -> Result<Arc<WeatherBundle>, FetchError>
    where
        F: Future<Output = Result<Arc<WeatherBundle>, FetchError>>,
    {
        self.cache.try_get_with(key, init).await.map_err(|err| {
            debug!(error = %err, "bundle initialisation failed");
            err.as_ref().clone()
        })
    }

    pub async fn invalidate(&self, key: &CacheKey) {
        self.cache.invalidate(key).await;
    }

    /// Number of live entries, after pending expiry housekeeping has run.
    pub async fn entry_count(&self) -> u64 {
        self.cache.run_pending_tasks().await;
        self.cache.entry_count()
    }
}

impl Default for BundleCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}
