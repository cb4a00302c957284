//! Fetch orchestration: cache lookup, then the three upstream calls.

use std::{sync::Arc, time::Duration};

use tracing::{info, instrument, warn};

use crate::{
    cache::{BundleCache, CacheKey},
    error::FetchError,
    model::{WeatherBundle, WeatherQuery},
    provider::{OpenWeatherProvider, WeatherProvider, openweather::DEFAULT_BASE_URL},
};

/// Knobs for building a client against OpenWeather.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientSettings {
    pub base_url: String,
    pub timeout: Duration,
    pub cache_ttl: Duration,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(10),
            cache_ttl: crate::cache::DEFAULT_TTL,
        }
    }
}

/// Produces `WeatherBundle`s for queries, one upstream round per cache miss.
///
/// Overlapping fetches of the same query are coalesced by the cache so only
/// one reaches upstream. Nothing is retried: a failure goes straight back to
/// the caller.
#[derive(Debug)]
pub struct WeatherClient {
    provider: Arc<dyn WeatherProvider>,
    cache: Arc<BundleCache>,
}

impl WeatherClient {
    pub fn new(provider: Arc<dyn WeatherProvider>, cache: Arc<BundleCache>) -> Self {
        Self { provider, cache }
    }

    /// Client backed by the real OpenWeather API.
    pub fn open_weather(settings: &ClientSettings) -> Result<Self, FetchError> {
        let provider = OpenWeatherProvider::new(settings.base_url.clone(), settings.timeout)?;
        Ok(Self::new(
            Arc::new(provider),
            Arc::new(BundleCache::new(settings.cache_ttl)),
        ))
    }

    pub fn cache(&self) -> &Arc<BundleCache> {
        &self.cache
    }

    #[instrument(skip(self), fields(place = %query.place_name()))]
    pub async fn fetch(&self, query: &WeatherQuery) -> Result<Arc<WeatherBundle>, FetchError> {
        let key = CacheKey::from(query);

        if let Some(bundle) = self.cache.get(&key).await {
            info!("cache hit");
            return Ok(bundle);
        }

        self.cache
            .get_or_try_insert_with(key, async {
                info!("cache miss, fetching from upstream");
                self.fetch_upstream(query).await.map(Arc::new)
            })
            .await
    }

    async fn fetch_upstream(&self, query: &WeatherQuery) -> Result<WeatherBundle, FetchError> {
        let api_key = query.api_key();

        let current = self.provider.current(query.place_name(), api_key).await?;
        let at = current.coordinates;

        let forecast = self.provider.forecast(at, api_key).await?;

        let air_quality = match self.provider.air_quality(at, api_key).await {
            Ok(Some(sample)) => Some(sample),
            Ok(None) => {
                warn!("air quality response was empty; continuing without it");
                None
            }
            Err(err) => {
                warn!(error = %err, "air quality request failed; continuing without it");
                None
            }
        };

        Ok(WeatherBundle::new(current, forecast, air_quality))
    }
}
