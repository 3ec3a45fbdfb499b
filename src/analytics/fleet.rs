//! Fleet-wide statistical summaries.

use crate::analytics::types::FleetStats;
use crate::analytics::utility::{mean, stddev};

/// Summarizes a set of observation values across the whole fleet.
///
/// An empty input yields the all-zero summary, never an error.
pub fn summarize(values: &[f64]) -> FleetStats {
    if values.is_empty() {
        return FleetStats::zero();
    }

    let avg_value = mean(values);
    FleetStats {
        avg_value,
        min_value: values.iter().copied().fold(f64::INFINITY, f64::min),
        max_value: values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        std_dev: stddev(values, avg_value),
        count: values.len(),
    }
}
