use std::{collections::HashMap, time::Duration};

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::{
    error::FetchError,
    model::{
        AirQualitySample, AqiCategory, Coordinates, CurrentConditions, ForecastEntry, Pollutant,
    },
};

use super::WeatherProvider;

pub const DEFAULT_BASE_URL: &str = "https://api.openweathermap.org";

const CURRENT_PATH: &str = "/data/2.5/weather";
const FORECAST_PATH: &str = "/data/2.5/forecast";
const AIR_POLLUTION_PATH: &str = "/data/2.5/air_pollution";

#[derive(Debug, Clone)]
pub struct OpenWeatherProvider {
    base_url: String,
    http: Client,
}

impl OpenWeatherProvider {
    /// Every request made through this provider is bounded by `timeout`.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, FetchError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::Network {
                cause: e.to_string(),
            })?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<(StatusCode, String), FetchError> {
        let url = format!("{}{}", self.base_url, path);

        let res = self.http.get(&url).query(query).send().await?;
        let status = res.status();
        let body = res.text().await?;

        debug!(path, %status, bytes = body.len(), "OpenWeather responded");
        Ok((status, body))
    }
}

#[async_trait]
impl WeatherProvider for OpenWeatherProvider {
    #[instrument(skip(self, api_key))]
    async fn current(
        &self,
        place_name: &str,
        api_key: &str,
    ) -> Result<CurrentConditions, FetchError> {
        let (status, body) = self
            .get(
                CURRENT_PATH,
                &[("q", place_name), ("appid", api_key), ("units", "metric")],
            )
            .await?;

        match Envelope::parse(&body).effective_code(status) {
            200..=299 => {}
            404 => return Err(FetchError::NotFound(place_name.to_string())),
            code => return Err(failure(code, &body)),
        }

        let parsed: OwCurrentResponse =
            serde_json::from_str(&body).map_err(|e| FetchError::Decode {
                endpoint: "current weather",
                message: e.to_string(),
            })?;

        Ok(parsed.into_domain())
    }

    #[instrument(skip(self, api_key))]
    async fn forecast(
        &self,
        at: Coordinates,
        api_key: &str,
    ) -> Result<Vec<ForecastEntry>, FetchError> {
        let (lat, lon) = (at.lat.to_string(), at.lon.to_string());
        let (status, body) = self
            .get(
                FORECAST_PATH,
                &[
                    ("lat", lat.as_str()),
                    ("lon", lon.as_str()),
                    ("appid", api_key),
                    ("units", "metric"),
                ],
            )
            .await?;

        if !status.is_success() {
            return Err(failure(status.as_u16(), &body));
        }

        let parsed: OwForecastResponse =
            serde_json::from_str(&body).map_err(|e| FetchError::Decode {
                endpoint: "forecast",
                message: e.to_string(),
            })?;

        Ok(parsed
            .list
            .into_iter()
            .map(OwForecastEntry::into_domain)
            .collect())
    }

    #[instrument(skip(self, api_key))]
    async fn air_quality(
        &self,
        at: Coordinates,
        api_key: &str,
    ) -> Result<Option<AirQualitySample>, FetchError> {
        let (lat, lon) = (at.lat.to_string(), at.lon.to_string());
        let (status, body) = self
            .get(
                AIR_POLLUTION_PATH,
                &[
                    ("lat", lat.as_str()),
                    ("lon", lon.as_str()),
                    ("appid", api_key),
                ],
            )
            .await?;

        if !status.is_success() {
            return Err(failure(status.as_u16(), &body));
        }

        let parsed: OwAirResponse = match serde_json::from_str(&body) {
            Ok(parsed) => parsed,
            Err(e) => {
                debug!(error = %e, "unreadable air pollution body");
                return Ok(None);
            }
        };

        Ok(parsed
            .list
            .into_iter()
            .next()
            .and_then(OwAirEntry::into_domain))
    }
}

/// Maps a non-success upstream code to a failure. Not-found is left to the
/// caller because only the current-conditions call reports it as such.
fn failure(code: u16, body: &str) -> FetchError {
    match code {
        401 => FetchError::Unauthorized,
        status => FetchError::Upstream {
            status,
            message: Envelope::parse(body)
                .message
                .unwrap_or_else(|| truncate_body(body)),
        },
    }
}

/// The `cod`/`message` pair OpenWeather puts in every JSON body. `cod` is a
/// number on some endpoints and a string on others.
#[derive(Debug, Default, Deserialize)]
struct Envelope {
    #[serde(default)]
    cod: Option<serde_json::Value>,
    #[serde(default)]
    message: Option<String>,
}

impl Envelope {
    fn parse(body: &str) -> Self {
        serde_json::from_str(body).unwrap_or_default()
    }

    fn code(&self) -> Option<u16> {
        match self.cod.as_ref()? {
            serde_json::Value::Number(n) => n.as_u64().and_then(|n| u16::try_from(n).ok()),
            serde_json::Value::String(s) => s.parse().ok(),
            _ => None,
        }
    }

    /// HTTP status wins when it reports failure; otherwise trust the body.
    fn effective_code(&self, status: StatusCode) -> u16 {
        if status.is_success() {
            self.code().unwrap_or(status.as_u16())
        } else {
            status.as_u16()
        }
    }
}

#[derive(Debug, Deserialize)]
struct OwCoord {
    lat: f64,
    lon: f64,
}

#[derive(Debug, Deserialize)]
struct OwMain {
    temp: f64,
    feels_like: f64,
    pressure: f64,
    humidity: u8,
}

#[derive(Debug, Deserialize)]
struct OwWeather {
    id: u16,
    #[serde(default)]
    main: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    icon: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OwWind {
    speed: f64,
    #[serde(default)]
    deg: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct OwClouds {
    all: u8,
}

#[derive(Debug, Deserialize)]
struct OwSys {
    #[serde(default)]
    country: Option<String>,
    sunrise: i64,
    sunset: i64,
}

#[derive(Debug, Deserialize)]
struct OwCurrentResponse {
    coord: OwCoord,
    weather: Vec<OwWeather>,
    main: OwMain,
    #[serde(default)]
    visibility: Option<u32>,
    wind: OwWind,
    #[serde(default)]
    clouds: Option<OwClouds>,
    dt: i64,
    sys: OwSys,
    #[serde(default)]
    timezone: i32,
    name: String,
}

impl OwCurrentResponse {
    fn into_domain(self) -> CurrentConditions {
        let weather = self.weather.into_iter().next();
        let (condition_code, condition_main, condition_description, icon) = match weather {
            Some(w) => (w.id, w.main, w.description, w.icon),
            None => (0, "Unknown".to_string(), "Unknown".to_string(), None),
        };

        CurrentConditions {
            location_name: self.name,
            country_code: self.sys.country.unwrap_or_default(),
            coordinates: Coordinates {
                lat: self.coord.lat,
                lon: self.coord.lon,
            },
            temperature_c: self.main.temp,
            feels_like_c: self.main.feels_like,
            humidity_pct: self.main.humidity,
            pressure_hpa: self.main.pressure,
            wind_speed_mps: self.wind.speed,
            wind_direction_deg: self.wind.deg,
            cloudiness_pct: self.clouds.map(|c| c.all),
            visibility_m: self.visibility,
            sunrise_epoch: self.sys.sunrise,
            sunset_epoch: self.sys.sunset,
            condition_code,
            condition_main,
            condition_description,
            icon,
            observed_at_epoch: self.dt,
            utc_offset_secs: self.timezone,
        }
    }
}

#[derive(Debug, Deserialize)]
struct OwForecastEntry {
    dt: i64,
    main: OwMain,
    weather: Vec<OwWeather>,
    wind: OwWind,
}

impl OwForecastEntry {
    fn into_domain(self) -> ForecastEntry {
        let weather = self.weather.into_iter().next();
        let (condition_code, condition_description, icon) = match weather {
            Some(w) => (w.id, w.description, w.icon),
            None => (0, "Unknown".to_string(), None),
        };

        ForecastEntry {
            timestamp_epoch: self.dt,
            temperature_c: self.main.temp,
            feels_like_c: self.main.feels_like,
            humidity_pct: self.main.humidity,
            condition_code,
            condition_description,
            wind_speed_mps: self.wind.speed,
            pressure_hpa: self.main.pressure,
            icon,
        }
    }
}

#[derive(Debug, Deserialize)]
struct OwForecastResponse {
    list: Vec<OwForecastEntry>,
}

#[derive(Debug, Deserialize)]
struct OwAqiMain {
    aqi: u8,
}

#[derive(Debug, Deserialize)]
struct OwAirEntry {
    main: OwAqiMain,
    #[serde(default)]
    components: HashMap<String, f64>,
}

impl OwAirEntry {
    fn into_domain(self) -> Option<AirQualitySample> {
        let aqi_category = AqiCategory::new(self.main.aqi)?;

        let pollutant_concentrations = self
            .components
            .into_iter()
            .filter_map(|(key, value)| Pollutant::from_component_key(&key).map(|p| (p, value)))
            .collect();

        Some(AirQualitySample {
            aqi_category,
            pollutant_concentrations,
        })
    }
}

#[derive(Debug, Deserialize)]
struct OwAirResponse {
    #[serde(default)]
    list: Vec<OwAirEntry>,
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    if body.chars().count() > MAX {
        let head: String = body.chars().take(MAX).collect();
        format!("{head}...")
    } else {
        body.to_string()
    }
}
