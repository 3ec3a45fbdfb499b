//! Aggregation query engine.
//!
//! Read-only rollups over stored observations and usage buckets: interval
//! trends, fleet-wide statistics, and vehicle-vs-fleet comparisons. Every
//! query recomputes from current stored state — there is no long-lived
//! aggregate cache, so concurrent writers are tolerated by construction.

pub mod compare;
pub mod fleet;
pub mod trend;
pub mod types;
pub mod utility;

use std::sync::Arc;

use crate::analytics::types::{
    FleetStats, TrendEntry, TrendInterval, UsageSummary, VehicleComparison,
};
use crate::error::Result;
use crate::recorder::MetricType;
use crate::storage::{TelemetryStore, TimeRange};

/// Query facade over a [`TelemetryStore`].
pub struct AnalyticsEngine {
    store: Arc<dyn TelemetryStore>,
}

impl AnalyticsEngine {
    pub fn new(store: Arc<dyn TelemetryStore>) -> Self {
        Self { store }
    }

    /// Trend rollup for one vehicle and metric, grouped by calendar
    /// interval and tagged with period-over-period change.
    pub async fn trend(
        &self,
        vehicle_id: &str,
        metric_type: MetricType,
        range: &TimeRange,
        interval: TrendInterval,
    ) -> Result<Vec<TrendEntry>> {
        let observations = self
            .store
            .observations_in_range(Some(vehicle_id), metric_type, range)
            .await?;
        Ok(trend::with_changes(trend::rollup(&observations, interval)))
    }

    /// Fleet-wide summary for one metric over a window. Empty windows
    /// yield the all-zero summary.
    pub async fn fleet_stats(
        &self,
        metric_type: MetricType,
        range: &TimeRange,
    ) -> Result<FleetStats> {
        let observations = self
            .store
            .observations_in_range(None, metric_type, range)
            .await?;
        let values: Vec<f64> = observations.iter().map(|o| o.value).collect();
        Ok(fleet::summarize(&values))
    }

    /// One vehicle's standing against the whole fleet for a metric.
    pub async fn compare(
        &self,
        vehicle_id: &str,
        metric_type: MetricType,
        range: &TimeRange,
    ) -> Result<VehicleComparison> {
        let observations = self
            .store
            .observations_in_range(None, metric_type, range)
            .await?;
        Ok(compare::compare(&observations, vehicle_id))
    }

    /// Summed usage-bucket totals for one vehicle over a window.
    pub async fn usage_summary(
        &self,
        vehicle_id: &str,
        range: &TimeRange,
    ) -> Result<UsageSummary> {
        let buckets = self.store.buckets_in_range(vehicle_id, range).await?;

        let mut summary = UsageSummary {
            vehicle_id: vehicle_id.to_string(),
            bucket_count: buckets.len(),
            hours_operated: 0.0,
            distance_traveled: 0.0,
            fuel_consumed: 0.0,
            idle_time: 0.0,
            efficiency: None,
        };
        for bucket in &buckets {
            summary.hours_operated += bucket.hours_operated;
            summary.distance_traveled += bucket.distance_traveled;
            summary.fuel_consumed += bucket.fuel_consumed.unwrap_or(0.0);
            summary.idle_time += bucket.idle_time.unwrap_or(0.0);
        }
        if summary.fuel_consumed > 0.0 {
            summary.efficiency = Some(summary.distance_traveled / summary.fuel_consumed);
        }

        Ok(summary)
    }
}
