//! Core library for the `skycast` weather dashboard.
//!
//! This crate defines:
//! - Configuration & credential resolution
//! - The OpenWeather provider behind the `WeatherProvider` seam
//! - A strongly-typed weather bundle and a TTL cache for it
//! - Daily aggregation and display units for the presentation layer
//!
//! It is used by `skycast-cli`, but can also be reused by other front ends.

pub mod cache;
pub mod client;
pub mod config;
pub mod daily;
pub mod error;
pub mod model;
pub mod provider;
pub mod units;

pub use cache::{BundleCache, CacheKey};
pub use client::{ClientSettings, WeatherClient};
pub use config::Config;
pub use daily::{DailySummary, summarize_days};
pub use error::FetchError;
pub use model::{
    AirQualitySample, AqiCategory, Coordinates, CurrentConditions, ForecastEntry, Pollutant,
    WeatherBundle, WeatherQuery,
};
pub use provider::{OpenWeatherProvider, WeatherProvider};
pub use units::UnitSystem;
