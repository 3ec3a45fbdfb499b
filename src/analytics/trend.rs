//! Interval trend rollups of metric observations.
//!
//! [`rollup`] groups observations into calendar-aligned intervals and
//! computes per-group averages; [`with_changes`] layers period-over-period
//! change and an up/down/stable tag on top.

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate, Weekday};

use crate::analytics::types::{TrendDirection, TrendEntry, TrendInterval, TrendPoint};
use crate::analytics::utility::mean;
use crate::recorder::MetricObservation;

/// Minimum absolute change between consecutive period averages before a
/// trend counts as up or down. Exact on purpose: it is a noise filter and
/// fixtures depend on it.
const CHANGE_THRESHOLD: f64 = 0.01;

/// Anchor date for the interval containing `date`. Anchors sort in
/// chronological group order, so a `BTreeMap` keyed on them yields groups
/// ascending by first timestamp.
fn anchor(date: NaiveDate, interval: TrendInterval) -> NaiveDate {
    match interval {
        TrendInterval::Day => date,
        TrendInterval::Week => date.week(Weekday::Mon).first_day(),
        TrendInterval::Month => date.with_day(1).unwrap_or(date),
    }
}

fn label(anchor: NaiveDate, interval: TrendInterval) -> String {
    match interval {
        TrendInterval::Day => anchor.format("%Y-%m-%d").to_string(),
        TrendInterval::Week => anchor.format("%G-W%V").to_string(),
        TrendInterval::Month => anchor.format("%Y-%m").to_string(),
    }
}

/// Groups observations by calendar interval, ascending.
///
/// Output length equals the number of distinct intervals that contain at
/// least one observation.
pub fn rollup(observations: &[MetricObservation], interval: TrendInterval) -> Vec<TrendPoint> {
    let mut groups: BTreeMap<NaiveDate, Vec<&MetricObservation>> = BTreeMap::new();
    for obs in observations {
        let key = anchor(obs.timestamp.date_naive(), interval);
        groups.entry(key).or_default().push(obs);
    }

    groups
        .into_iter()
        .filter_map(|(key, group)| {
            let first_timestamp = group.iter().map(|o| o.timestamp).min()?;
            let values: Vec<f64> = group.iter().map(|o| o.value).collect();
            let min_value = values.iter().copied().fold(f64::INFINITY, f64::min);
            let max_value = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);

            Some(TrendPoint {
                period: label(key, interval),
                avg_value: mean(&values),
                min_value,
                max_value,
                count: values.len(),
                first_timestamp,
            })
        })
        .collect()
}

/// Computes `change = current avg - previous avg` (0 for the first period)
/// and tags each point up, down, or stable against [`CHANGE_THRESHOLD`].
pub fn with_changes(points: Vec<TrendPoint>) -> Vec<TrendEntry> {
    let mut previous_avg: Option<f64> = None;
    points
        .into_iter()
        .map(|point| {
            let change = match previous_avg {
                Some(prev) => point.avg_value - prev,
                None => 0.0,
            };
            previous_avg = Some(point.avg_value);

            let trend = if change > CHANGE_THRESHOLD {
                TrendDirection::Up
            } else if change < -CHANGE_THRESHOLD {
                TrendDirection::Down
            } else {
                TrendDirection::Stable
            };

            TrendEntry {
                point,
                change,
                trend,
            }
        })
        .collect()
}
