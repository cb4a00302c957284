//! Reduces the 3-hourly forecast to one row per local calendar day.

use std::collections::BTreeMap;

use chrono::{FixedOffset, NaiveDate, Offset, TimeZone, Utc};
use serde::Serialize;

use crate::model::ForecastEntry;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailySummary {
    pub date: NaiveDate,
    pub temp_max_c: f64,
    pub temp_min_c: f64,
    pub humidity_mean_pct: f64,
    /// Most frequent condition of the day; ties go to the earliest one.
    pub condition_code: u16,
    pub condition_description: String,
    pub entries: usize,
}

/// Groups `forecast` by day in the location's own offset.
///
/// Entries whose timestamp cannot be represented are skipped. An invalid
/// offset falls back to UTC.
pub fn summarize_days(forecast: &[ForecastEntry], utc_offset_secs: i32) -> Vec<DailySummary> {
    let offset = FixedOffset::east_opt(utc_offset_secs).unwrap_or_else(|| Utc.fix());

    let mut days: BTreeMap<NaiveDate, Vec<&ForecastEntry>> = BTreeMap::new();
    for entry in forecast {
        let Some(local) = offset.timestamp_opt(entry.timestamp_epoch, 0).single() else {
            continue;
        };
        days.entry(local.date_naive()).or_default().push(entry);
    }

    days.into_iter()
        .map(|(date, entries)| summarize_day(date, &entries))
        .collect()
}

fn summarize_day(date: NaiveDate, entries: &[&ForecastEntry]) -> DailySummary {
    let temp_max_c = entries
        .iter()
        .map(|e| e.temperature_c)
        .fold(f64::NEG_INFINITY, f64::max);
    let temp_min_c = entries
        .iter()
        .map(|e| e.temperature_c)
        .fold(f64::INFINITY, f64::min);
    let humidity_mean_pct =
        entries.iter().map(|e| f64::from(e.humidity_pct)).sum::<f64>() / entries.len() as f64;

    // (count, first position, description) per condition code
    let mut tally: BTreeMap<u16, (usize, usize, &str)> = BTreeMap::new();
    for (pos, entry) in entries.iter().enumerate() {
        tally
            .entry(entry.condition_code)
            .and_modify(|(count, _, _)| *count += 1)
            .or_insert((1, pos, entry.condition_description.as_str()));
    }

    let (condition_code, (_, _, description)) = tally
        .into_iter()
        .max_by(|(_, (ca, pa, _)), (_, (cb, pb, _))| ca.cmp(cb).then(pb.cmp(pa)))
        .unwrap_or((0, (0, 0, "")));

    DailySummary {
        date,
        temp_max_c,
        temp_min_c,
        humidity_mean_pct,
        condition_code,
        condition_description: description.to_string(),
        entries: entries.len(),
    }
}
