//! Result types produced by the aggregation query engine.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::TelemetryError;

/// Calendar-aligned grouping interval for trend rollups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendInterval {
    /// Calendar day (`YYYY-MM-DD`).
    Day,
    /// ISO week; groups are anchored on the week's Monday and labeled
    /// `YYYY-Www` with the ISO week-numbering year.
    Week,
    /// Calendar month (`YYYY-MM`).
    Month,
}

impl FromStr for TrendInterval {
    type Err = TelemetryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "day" => Ok(TrendInterval::Day),
            "week" => Ok(TrendInterval::Week),
            "month" => Ok(TrendInterval::Month),
            other => Err(TelemetryError::validation(format!(
                "unrecognized trend interval '{other}' (expected day, week, or month)"
            ))),
        }
    }
}

/// One interval's rollup of metric observations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendPoint {
    pub period: String,
    pub avg_value: f64,
    pub min_value: f64,
    pub max_value: f64,
    pub count: usize,
    pub first_timestamp: DateTime<Utc>,
}

/// Direction tag derived from the change between consecutive rollups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Up,
    Down,
    Stable,
}

/// A [`TrendPoint`] extended with period-over-period change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendEntry {
    #[serde(flatten)]
    pub point: TrendPoint,
    pub change: f64,
    pub trend: TrendDirection,
}

/// Fleet-wide statistical summary for one metric kind.
///
/// `std_dev` is the population standard deviation. An empty window yields
/// the all-zero summary rather than an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FleetStats {
    pub avg_value: f64,
    pub min_value: f64,
    pub max_value: f64,
    pub std_dev: f64,
    pub count: usize,
}

impl FleetStats {
    pub fn zero() -> Self {
        Self {
            avg_value: 0.0,
            min_value: 0.0,
            max_value: 0.0,
            std_dev: 0.0,
            count: 0,
        }
    }
}

/// A vehicle's standing against the fleet for one metric kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleComparison {
    pub vehicle_avg: f64,
    pub fleet_avg: f64,
    pub difference: f64,
    pub percent_difference: f64,
    pub percentile_rank: f64,
}

/// Summed usage-bucket totals for one vehicle over a window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageSummary {
    pub vehicle_id: String,
    pub bucket_count: usize,
    pub hours_operated: f64,
    pub distance_traveled: f64,
    pub fuel_consumed: f64,
    pub idle_time: f64,
    /// Overall distance/fuel across the window, absent when no fuel was
    /// consumed.
    pub efficiency: Option<f64>,
}
