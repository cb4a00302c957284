use async_trait::async_trait;
use std::fmt::Debug;

use crate::{
    error::FetchError,
    model::{AirQualitySample, Coordinates, CurrentConditions, ForecastEntry},
};

pub mod openweather;

pub use openweather::OpenWeatherProvider;

/// One method per upstream endpoint. Implementations own transport, status
/// classification and decoding into the domain model.
#[async_trait]
pub trait WeatherProvider: Send + Sync + Debug {
    /// Current conditions by place name. Reports `NotFound` and
    /// `Unauthorized` distinctly.
    async fn current(
        &self,
        place_name: &str,
        api_key: &str,
    ) -> Result<CurrentConditions, FetchError>;

    /// 5-day/3-hour forecast at the given coordinates.
    async fn forecast(
        &self,
        at: Coordinates,
        api_key: &str,
    ) -> Result<Vec<ForecastEntry>, FetchError>;

    /// Air quality at the given coordinates. `Ok(None)` when the upstream
    /// answer is empty or unreadable.
    async fn air_quality(
        &self,
        at: Coordinates,
        api_key: &str,
    ) -> Result<Option<AirQualitySample>, FetchError>;
}
