use std::{collections::BTreeMap, fmt};

use chrono::{DateTime, FixedOffset, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::error::FetchError;

/// Input to every fetch: a place name and the credential to query it with.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct WeatherQuery {
    place_name: String,
    api_key: String,
}

impl WeatherQuery {
    /// Validates both parts. The place name is trimmed; an empty one is an
    /// input error, an empty key is a configuration error.
    pub fn new(
        place_name: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Result<Self, FetchError> {
        let place_name = place_name.into().trim().to_string();
        let api_key = api_key.into().trim().to_string();

        if api_key.is_empty() {
            return Err(FetchError::MissingCredential);
        }
        if place_name.is_empty() {
            return Err(FetchError::EmptyPlaceName);
        }

        Ok(Self { place_name, api_key })
    }

    pub fn place_name(&self) -> &str {
        &self.place_name
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }
}

impl fmt::Debug for WeatherQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeatherQuery")
            .field("place_name", &self.place_name)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

impl fmt::Display for Coordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.4}, {:.4}", self.lat, self.lon)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentConditions {
    pub location_name: String,
    pub country_code: String,
    pub coordinates: Coordinates,
    pub temperature_c: f64,
    pub feels_like_c: f64,
    pub humidity_pct: u8,
    pub pressure_hpa: f64,
    pub wind_speed_mps: f64,
    pub wind_direction_deg: Option<f64>,
    pub cloudiness_pct: Option<u8>,
    pub visibility_m: Option<u32>,
    pub sunrise_epoch: i64,
    pub sunset_epoch: i64,
    pub condition_code: u16,
    /// Short group name, e.g. "Clouds".
    pub condition_main: String,
    pub condition_description: String,
    pub icon: Option<String>,
    pub observed_at_epoch: i64,
    /// Shift from UTC in seconds at the queried location.
    pub utc_offset_secs: i32,
}

impl CurrentConditions {
    pub fn sunrise_local(&self) -> Option<DateTime<FixedOffset>> {
        local_time(self.sunrise_epoch, self.utc_offset_secs)
    }

    pub fn sunset_local(&self) -> Option<DateTime<FixedOffset>> {
        local_time(self.sunset_epoch, self.utc_offset_secs)
    }

    pub fn observed_local(&self) -> Option<DateTime<FixedOffset>> {
        local_time(self.observed_at_epoch, self.utc_offset_secs)
    }

    pub fn icon_url(&self) -> Option<String> {
        self.icon.as_deref().map(icon_url)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastEntry {
    pub timestamp_epoch: i64,
    pub temperature_c: f64,
    pub feels_like_c: f64,
    pub humidity_pct: u8,
    pub condition_code: u16,
    pub condition_description: String,
    pub wind_speed_mps: f64,
    pub pressure_hpa: f64,
    pub icon: Option<String>,
}

impl ForecastEntry {
    pub fn time_utc(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.timestamp_epoch, 0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Pollutant {
    #[serde(rename = "CO")]
    Co,
    #[serde(rename = "NO")]
    No,
    #[serde(rename = "NO2")]
    No2,
    #[serde(rename = "O3")]
    O3,
    #[serde(rename = "SO2")]
    So2,
    #[serde(rename = "PM2.5")]
    Pm2_5,
    #[serde(rename = "PM10")]
    Pm10,
    #[serde(rename = "NH3")]
    Nh3,
}

impl Pollutant {
    pub const fn all() -> &'static [Pollutant] {
        &[
            Pollutant::Co,
            Pollutant::No,
            Pollutant::No2,
            Pollutant::O3,
            Pollutant::So2,
            Pollutant::Pm2_5,
            Pollutant::Pm10,
            Pollutant::Nh3,
        ]
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Pollutant::Co => "CO",
            Pollutant::No => "NO",
            Pollutant::No2 => "NO2",
            Pollutant::O3 => "O3",
            Pollutant::So2 => "SO2",
            Pollutant::Pm2_5 => "PM2.5",
            Pollutant::Pm10 => "PM10",
            Pollutant::Nh3 => "NH3",
        }
    }

    /// Key used by the OpenWeather `components` object.
    pub fn from_component_key(key: &str) -> Option<Self> {
        match key {
            "co" => Some(Pollutant::Co),
            "no" => Some(Pollutant::No),
            "no2" => Some(Pollutant::No2),
            "o3" => Some(Pollutant::O3),
            "so2" => Some(Pollutant::So2),
            "pm2_5" => Some(Pollutant::Pm2_5),
            "pm10" => Some(Pollutant::Pm10),
            "nh3" => Some(Pollutant::Nh3),
            _ => None,
        }
    }
}

impl fmt::Display for Pollutant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Upstream air quality index, 1 (good) to 5 (very poor).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct AqiCategory(u8);

impl AqiCategory {
    pub fn new(value: u8) -> Option<Self> {
        (1..=5).contains(&value).then_some(Self(value))
    }

    pub fn value(&self) -> u8 {
        self.0
    }

    pub fn label(&self) -> &'static str {
        match self.0 {
            1 => "Good",
            2 => "Fair",
            3 => "Moderate",
            4 => "Poor",
            _ => "Very Poor",
        }
    }
}

impl TryFrom<u8> for AqiCategory {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        AqiCategory::new(value).ok_or_else(|| format!("AQI category {value} is outside 1..=5"))
    }
}

impl From<AqiCategory> for u8 {
    fn from(value: AqiCategory) -> Self {
        value.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AirQualitySample {
    pub aqi_category: AqiCategory,
    /// Concentrations in µg/m³.
    pub pollutant_concentrations: BTreeMap<Pollutant, f64>,
}

/// Everything one successful fetch produced.
///
/// Fields are read-only once built; the forecast is kept in timestamp order,
/// including when a bundle is deserialized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "BundleParts")]
pub struct WeatherBundle {
    current: CurrentConditions,
    forecast: Vec<ForecastEntry>,
    air_quality: Option<AirQualitySample>,
}

#[derive(Deserialize)]
struct BundleParts {
    current: CurrentConditions,
    forecast: Vec<ForecastEntry>,
    #[serde(default)]
    air_quality: Option<AirQualitySample>,
}

impl From<BundleParts> for WeatherBundle {
    fn from(parts: BundleParts) -> Self {
        Self::new(parts.current, parts.forecast, parts.air_quality)
    }
}

impl WeatherBundle {
    pub fn new(
        current: CurrentConditions,
        mut forecast: Vec<ForecastEntry>,
        air_quality: Option<AirQualitySample>,
    ) -> Self {
        forecast.sort_by_key(|entry| entry.timestamp_epoch);

        Self {
            current,
            forecast,
            air_quality,
        }
    }

    pub fn current(&self) -> &CurrentConditions {
        &self.current
    }

    pub fn forecast(&self) -> &[ForecastEntry] {
        &self.forecast
    }

    pub fn air_quality(&self) -> Option<&AirQualitySample> {
        self.air_quality.as_ref()
    }
}

pub fn icon_url(icon: &str) -> String {
    format!("https://openweathermap.org/img/wn/{icon}@2x.png")
}

fn local_time(epoch: i64, utc_offset_secs: i32) -> Option<DateTime<FixedOffset>> {
    let offset = FixedOffset::east_opt(utc_offset_secs)?;
    offset.timestamp_opt(epoch, 0).single()
}
