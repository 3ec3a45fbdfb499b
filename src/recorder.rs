//! Immutable metric observations.
//!
//! The recorder is a pure append: no dedup, no upsert. Multiple
//! observations for the same `(vehicle_id, metric_type, timestamp)` coexist
//! as independent samples.

use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, TelemetryError};
use crate::storage::TelemetryStore;

/// Recognized performance metric kinds.
///
/// The wire names (`fuelEfficiency`, `costPerHour`, ...) drive downstream
/// aggregation semantics, so unrecognized names are rejected at the
/// recorder boundary rather than silently dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MetricType {
    FuelEfficiency,
    Utilization,
    CostPerHour,
    CostPerKm,
    MaintenanceFrequency,
    EngineHours,
}

impl MetricType {
    /// All metric kinds, in a stable order used by fleet reports.
    pub const ALL: [MetricType; 6] = [
        MetricType::FuelEfficiency,
        MetricType::Utilization,
        MetricType::CostPerHour,
        MetricType::CostPerKm,
        MetricType::MaintenanceFrequency,
        MetricType::EngineHours,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MetricType::FuelEfficiency => "fuelEfficiency",
            MetricType::Utilization => "utilization",
            MetricType::CostPerHour => "costPerHour",
            MetricType::CostPerKm => "costPerKm",
            MetricType::MaintenanceFrequency => "maintenanceFrequency",
            MetricType::EngineHours => "engineHours",
        }
    }
}

impl FromStr for MetricType {
    type Err = TelemetryError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "fuelEfficiency" => Ok(MetricType::FuelEfficiency),
            "utilization" => Ok(MetricType::Utilization),
            "costPerHour" => Ok(MetricType::CostPerHour),
            "costPerKm" => Ok(MetricType::CostPerKm),
            "maintenanceFrequency" => Ok(MetricType::MaintenanceFrequency),
            "engineHours" => Ok(MetricType::EngineHours),
            other => Err(TelemetryError::validation(format!(
                "unrecognized metric type '{other}'"
            ))),
        }
    }
}

impl std::fmt::Display for MetricType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single immutable time-series point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricObservation {
    pub vehicle_id: String,
    pub metric_type: MetricType,
    pub timestamp: DateTime<Utc>,
    pub value: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

/// Appends metric observations to the store.
pub struct MetricRecorder {
    store: Arc<dyn TelemetryStore>,
}

impl MetricRecorder {
    pub fn new(store: Arc<dyn TelemetryStore>) -> Self {
        Self { store }
    }

    /// Records one observation. `value` must be a finite number.
    pub async fn record(
        &self,
        vehicle_id: &str,
        metric_type: MetricType,
        timestamp: DateTime<Utc>,
        value: f64,
        unit: Option<&str>,
    ) -> Result<MetricObservation> {
        if !value.is_finite() {
            return Err(TelemetryError::validation(format!(
                "metric value for {metric_type} must be finite, got {value}"
            )));
        }

        let observation = MetricObservation {
            vehicle_id: vehicle_id.to_string(),
            metric_type,
            timestamp,
            value,
            unit: unit.map(str::to_string),
        };
        self.store.insert_observation(observation.clone()).await?;
        debug!(vehicle_id, metric = %metric_type, value, "Observation recorded");
        Ok(observation)
    }
}
