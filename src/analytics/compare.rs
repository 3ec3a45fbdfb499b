//! Vehicle-vs-fleet comparison and percentile ranking.

use std::collections::HashMap;

use crate::analytics::types::VehicleComparison;
use crate::analytics::utility::mean;
use crate::recorder::MetricObservation;

/// Per-vehicle average values over a window, sorted ascending by average
/// (ties broken by vehicle id for a deterministic ranking).
pub fn vehicle_averages(observations: &[MetricObservation]) -> Vec<(String, f64)> {
    let mut values_by_vehicle: HashMap<&str, Vec<f64>> = HashMap::new();
    for obs in observations {
        values_by_vehicle
            .entry(obs.vehicle_id.as_str())
            .or_default()
            .push(obs.value);
    }

    let mut averages: Vec<(String, f64)> = values_by_vehicle
        .into_iter()
        .map(|(vehicle, values)| (vehicle.to_string(), mean(&values)))
        .collect();
    averages.sort_by(|a, b| a.1.total_cmp(&b.1).then_with(|| a.0.cmp(&b.0)));
    averages
}

/// Percentile rank of `vehicle_id` within the ascending ranking:
/// `position / (N - 1) * 100` with `position` the 0-indexed rank.
///
/// A vehicle absent from the ranking gets 0; a vehicle that is the sole
/// member gets 100 (trivially at the top).
pub fn percentile_rank(ranked: &[(String, f64)], vehicle_id: &str) -> f64 {
    let Some(position) = ranked.iter().position(|(id, _)| id == vehicle_id) else {
        return 0.0;
    };
    if ranked.len() == 1 {
        return 100.0;
    }
    position as f64 / (ranked.len() - 1) as f64 * 100.0
}

/// Builds the full comparison from the fleet's observations in a window.
///
/// Never errors: a vehicle with no observations compares at average 0 and
/// percentile 0, and a zero fleet average pins `percent_difference` to 0
/// (avoids divide-by-zero, not a statistically meaningful value).
pub fn compare(observations: &[MetricObservation], vehicle_id: &str) -> VehicleComparison {
    let ranked = vehicle_averages(observations);

    let vehicle_avg = ranked
        .iter()
        .find(|(id, _)| id == vehicle_id)
        .map(|(_, avg)| *avg)
        .unwrap_or(0.0);
    let all_values: Vec<f64> = observations.iter().map(|o| o.value).collect();
    let fleet_avg = mean(&all_values);

    let difference = vehicle_avg - fleet_avg;
    let percent_difference = if fleet_avg == 0.0 {
        0.0
    } else {
        difference / fleet_avg * 100.0
    };

    VehicleComparison {
        vehicle_avg,
        fleet_avg,
        difference,
        percent_difference,
        percentile_rank: percentile_rank(&ranked, vehicle_id),
    }
}
