//! Plain-text dashboard output.

use chrono::{DateTime, FixedOffset};
use skycast_core::{
    AirQualitySample, CurrentConditions, DailySummary, FetchError, UnitSystem, WeatherBundle,
    summarize_days,
};

pub fn dashboard(bundle: &WeatherBundle, units: UnitSystem) -> String {
    let mut out = String::new();
    out.push_str(&current(bundle.current(), units));
    out.push('\n');
    out.push_str(&forecast(
        &summarize_days(bundle.forecast(), bundle.current().utc_offset_secs),
        units,
    ));
    out.push('\n');
    match bundle.air_quality() {
        Some(sample) => out.push_str(&air_quality(sample)),
        None => out.push_str("Air quality: not available\n"),
    }
    out
}

pub fn current(c: &CurrentConditions, units: UnitSystem) -> String {
    let wind = match c.wind_direction_deg {
        Some(deg) => format!("{} from {deg:.0}°", units.format_speed(c.wind_speed_mps)),
        None => units.format_speed(c.wind_speed_mps),
    };

    let mut lines = vec![
        format!(
            "Weather in {}, {}  ({})",
            c.location_name, c.country_code, c.coordinates
        ),
        format!(
            "  Condition    {} ({})",
            c.condition_main,
            title_case(&c.condition_description)
        ),
        format!(
            "  Temperature  {} (feels like {})",
            units.format_temperature(c.temperature_c),
            units.format_temperature(c.feels_like_c)
        ),
        format!("  Humidity     {}%", c.humidity_pct),
        format!("  Wind         {wind}"),
        format!("  Pressure     {:.0} hPa", c.pressure_hpa),
        format!(
            "  Visibility   {}",
            or_na(c.visibility_m.map(|v| format!("{v} m")))
        ),
        format!(
            "  Cloudiness   {}",
            or_na(c.cloudiness_pct.map(|v| format!("{v}%")))
        ),
        format!(
            "  Sunrise {} | Sunset {}  (local time, UTC{})",
            clock(c.sunrise_local()),
            clock(c.sunset_local()),
            offset_label(c.utc_offset_secs)
        ),
    ];
    if let Some(url) = c.icon_url() {
        lines.push(format!("  Icon         {url}"));
    }

    block(lines)
}

pub fn forecast(days: &[DailySummary], units: UnitSystem) -> String {
    let mut out = String::from("5-Day Forecast\n");

    if days.is_empty() {
        out.push_str("  no forecast data\n");
        return out;
    }

    out.push_str(&format!(
        "  {:<12}{:>10}{:>10}{:>10}  Condition\n",
        "Day", "Min", "Max", "Humidity"
    ));
    for day in days {
        out.push_str(&format!(
            "  {:<12}{:>10}{:>10}{:>9.0}%  {}\n",
            day.date.format("%a %d %b").to_string(),
            units.format_temperature(day.temp_min_c),
            units.format_temperature(day.temp_max_c),
            day.humidity_mean_pct,
            title_case(&day.condition_description)
        ));
    }

    out
}

pub fn air_quality(sample: &AirQualitySample) -> String {
    let header = format!(
        "Air quality: AQI {} ({})",
        sample.aqi_category.value(),
        sample.aqi_category.label()
    );
    let pollutants = sample
        .pollutant_concentrations
        .iter()
        .map(|(pollutant, value)| format!("  {:<6}{value:>10.2} µg/m³", pollutant.symbol()));

    block(std::iter::once(header).chain(pollutants))
}

/// Actionable message per failure category.
pub fn failure(err: &FetchError) -> String {
    let hint = match err {
        FetchError::MissingCredential | FetchError::EmptyPlaceName => return err.to_string(),
        FetchError::NotFound(_) => {
            "Check the spelling, or add a country code (e.g. \"Lahore,PK\")."
        }
        FetchError::Unauthorized => {
            "Check the API key with `skycast configure`. New keys can take a while to activate."
        }
        FetchError::Upstream { .. } | FetchError::Decode { .. } => {
            "OpenWeather had a problem answering. Try again later."
        }
        FetchError::Network { .. } | FetchError::Timeout => {
            "Check your internet connection and try again."
        }
    };
    format!("{err}\nHint: {hint}")
}

/// Joins lines, each terminated by a newline.
fn block(lines: impl IntoIterator<Item = String>) -> String {
    lines.into_iter().map(|line| line + "\n").collect()
}

fn clock(t: Option<DateTime<FixedOffset>>) -> String {
    t.map(|t| t.format("%H:%M").to_string())
        .unwrap_or_else(|| "--:--".to_string())
}

fn offset_label(secs: i32) -> String {
    let sign = if secs < 0 { '-' } else { '+' };
    let secs = secs.unsigned_abs();
    format!("{sign}{:02}:{:02}", secs / 3600, (secs % 3600) / 60)
}

fn or_na(value: Option<String>) -> String {
    value.unwrap_or_else(|| "N/A".to_string())
}

fn title_case(s: &str) -> String {
    s.split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
