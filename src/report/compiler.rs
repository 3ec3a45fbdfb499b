//! Report generation.
//!
//! Each request runs `Requested → Gathering → Compiling → Persisted`.
//! Gathering fetches usage stats, metric aggregates, and registry metadata
//! concurrently; a collaborator failure degrades to a placeholder instead
//! of aborting, so the report always completes. Compiling is a pure merge:
//! every aggregate it consumes treats empty results as zero, so arithmetic
//! on absent data cannot fail.

use std::sync::Arc;

use serde_json::json;
use tracing::{debug, warn};

use crate::analytics::AnalyticsEngine;
use crate::analytics::types::TrendInterval;
use crate::error::{Result, TelemetryError};
use crate::recorder::MetricType;
use crate::report::types::{AnalyticsReport, ReportPeriod, ReportType};
use crate::services::registry::VehicleRegistry;
use crate::storage::{TelemetryStore, TimeRange};

/// One report generation request.
#[derive(Debug, Clone)]
pub struct ReportRequest {
    pub report_type: ReportType,
    pub period: ReportPeriod,
    pub window: TimeRange,
    pub vehicle_id: Option<String>,
}

/// Phases of one generation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Requested,
    Gathering,
    Compiling,
    Persisted,
}

impl Phase {
    fn as_str(&self) -> &'static str {
        match self {
            Phase::Requested => "requested",
            Phase::Gathering => "gathering",
            Phase::Compiling => "compiling",
            Phase::Persisted => "persisted",
        }
    }
}

/// Metric kinds each report type aggregates over.
fn metric_set(report_type: ReportType) -> &'static [MetricType] {
    match report_type {
        ReportType::Fleet => &MetricType::ALL,
        ReportType::Vehicle => &[
            MetricType::FuelEfficiency,
            MetricType::Utilization,
            MetricType::CostPerHour,
        ],
        ReportType::Utilization => &[MetricType::Utilization, MetricType::EngineHours],
        ReportType::Cost => &[MetricType::CostPerHour, MetricType::CostPerKm],
        ReportType::Maintenance => &[MetricType::MaintenanceFrequency, MetricType::CostPerHour],
    }
}

/// Trend grouping used inside a report, scaled to the report cadence.
fn trend_interval(period: ReportPeriod) -> TrendInterval {
    match period {
        ReportPeriod::Daily | ReportPeriod::Weekly | ReportPeriod::Custom => TrendInterval::Day,
        ReportPeriod::Monthly | ReportPeriod::Quarterly => TrendInterval::Week,
        ReportPeriod::Yearly => TrendInterval::Month,
    }
}

/// Compiles and persists immutable report snapshots.
pub struct ReportCompiler {
    store: Arc<dyn TelemetryStore>,
    analytics: AnalyticsEngine,
    registry: Arc<dyn VehicleRegistry>,
}

impl ReportCompiler {
    pub fn new(store: Arc<dyn TelemetryStore>, registry: Arc<dyn VehicleRegistry>) -> Self {
        Self {
            analytics: AnalyticsEngine::new(store.clone()),
            store,
            registry,
        }
    }

    fn enter(&self, phase: Phase, request: &ReportRequest) {
        debug!(
            phase = phase.as_str(),
            report_type = request.report_type.as_str(),
            period = request.period.as_str(),
            "Report phase"
        );
    }

    /// Runs one generation request to completion and returns the persisted
    /// snapshot.
    #[tracing::instrument(skip(self, request), fields(
        report_type = request.report_type.as_str(),
        period = request.period.as_str(),
    ))]
    pub async fn generate(&self, request: ReportRequest) -> Result<AnalyticsReport> {
        self.enter(Phase::Requested, &request);

        let data = if request.report_type.is_vehicle_scoped() {
            let vehicle_id = request.vehicle_id.clone().ok_or_else(|| {
                TelemetryError::validation(format!(
                    "{} reports require a vehicle id",
                    request.report_type.as_str()
                ))
            })?;
            self.compile_vehicle(&request, &vehicle_id).await?
        } else {
            self.compile_fleet(&request).await?
        };

        let report = AnalyticsReport::new(
            request.report_type,
            request.period,
            request.window,
            request.vehicle_id.clone(),
            data,
        );
        self.store.insert_report(report.clone()).await?;
        self.enter(Phase::Persisted, &request);

        Ok(report)
    }

    async fn compile_vehicle(
        &self,
        request: &ReportRequest,
        vehicle_id: &str,
    ) -> Result<serde_json::Value> {
        let metrics = metric_set(request.report_type);
        let interval = trend_interval(request.period);
        let window = request.window;

        self.enter(Phase::Gathering, request);
        let (usage, comparisons, trends, vehicle) = tokio::join!(
            self.analytics.usage_summary(vehicle_id, &window),
            self.gather_comparisons(vehicle_id, metrics, &window),
            self.gather_trends(vehicle_id, metrics, &window, interval),
            self.vehicle_metadata(vehicle_id),
        );
        let usage = usage?;
        let comparisons = comparisons?;
        let trends = trends?;

        self.enter(Phase::Compiling, request);
        Ok(json!({
            "vehicle": vehicle,
            "usage": usage,
            "comparisons": comparisons,
            "trends": trends,
        }))
    }

    async fn compile_fleet(&self, request: &ReportRequest) -> Result<serde_json::Value> {
        let window = request.window;

        self.enter(Phase::Gathering, request);
        let (metrics, counts) = tokio::join!(
            self.gather_fleet_stats(metric_set(request.report_type), &window),
            self.fleet_counts_metadata(),
        );
        let metrics = metrics?;

        self.enter(Phase::Compiling, request);
        Ok(json!({
            "fleet": counts,
            "metrics": metrics,
        }))
    }

    async fn gather_comparisons(
        &self,
        vehicle_id: &str,
        metrics: &[MetricType],
        window: &TimeRange,
    ) -> Result<serde_json::Value> {
        let mut out = serde_json::Map::new();
        for metric in metrics {
            let comparison = self.analytics.compare(vehicle_id, *metric, window).await?;
            out.insert(metric.as_str().to_string(), serde_json::to_value(comparison)?);
        }
        Ok(out.into())
    }

    async fn gather_trends(
        &self,
        vehicle_id: &str,
        metrics: &[MetricType],
        window: &TimeRange,
        interval: TrendInterval,
    ) -> Result<serde_json::Value> {
        let mut out = serde_json::Map::new();
        for metric in metrics {
            let entries = self
                .analytics
                .trend(vehicle_id, *metric, window, interval)
                .await?;
            out.insert(metric.as_str().to_string(), serde_json::to_value(entries)?);
        }
        Ok(out.into())
    }

    async fn gather_fleet_stats(
        &self,
        metrics: &[MetricType],
        window: &TimeRange,
    ) -> Result<serde_json::Value> {
        let mut out = serde_json::Map::new();
        for metric in metrics {
            let stats = self.analytics.fleet_stats(*metric, window).await?;
            out.insert(metric.as_str().to_string(), serde_json::to_value(stats)?);
        }
        Ok(out.into())
    }

    /// Registry lookup with graceful degradation: report availability is
    /// prioritized over completeness of enrichment.
    async fn vehicle_metadata(&self, vehicle_id: &str) -> serde_json::Value {
        match self.registry.get_vehicle(vehicle_id).await {
            Ok(Some(summary)) => {
                serde_json::to_value(summary).unwrap_or_else(|_| json!({ "id": vehicle_id }))
            }
            Ok(None) => {
                warn!(vehicle_id, "Vehicle not known to registry, using placeholder");
                json!({ "id": vehicle_id })
            }
            Err(e) => {
                warn!(vehicle_id, error = %e, "Registry lookup failed, using placeholder");
                json!({ "id": vehicle_id })
            }
        }
    }

    async fn fleet_counts_metadata(&self) -> serde_json::Value {
        match self.registry.fleet_counts().await {
            Ok(counts) => serde_json::to_value(counts)
                .unwrap_or_else(|_| json!({ "count_by_type": {}, "count_by_status": {} })),
            Err(e) => {
                warn!(error = %e, "Fleet counts unavailable, using placeholder");
                json!({ "count_by_type": {}, "count_by_status": {} })
            }
        }
    }
}
