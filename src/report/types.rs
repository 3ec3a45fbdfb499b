//! Report snapshot types.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::TelemetryError;
use crate::storage::TimeRange;

/// What a report covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportType {
    Fleet,
    Vehicle,
    Utilization,
    Cost,
    Maintenance,
}

impl ReportType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportType::Fleet => "fleet",
            ReportType::Vehicle => "vehicle",
            ReportType::Utilization => "utilization",
            ReportType::Cost => "cost",
            ReportType::Maintenance => "maintenance",
        }
    }

    /// Fleet reports cover every vehicle; the others are vehicle-scoped.
    pub fn is_vehicle_scoped(&self) -> bool {
        !matches!(self, ReportType::Fleet)
    }
}

impl FromStr for ReportType {
    type Err = TelemetryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fleet" => Ok(ReportType::Fleet),
            "vehicle" => Ok(ReportType::Vehicle),
            "utilization" => Ok(ReportType::Utilization),
            "cost" => Ok(ReportType::Cost),
            "maintenance" => Ok(ReportType::Maintenance),
            other => Err(TelemetryError::validation(format!(
                "unrecognized report type '{other}'"
            ))),
        }
    }
}

/// Reporting cadence a snapshot was generated for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportPeriod {
    Daily,
    Weekly,
    Monthly,
    Quarterly,
    Yearly,
    Custom,
}

impl ReportPeriod {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportPeriod::Daily => "daily",
            ReportPeriod::Weekly => "weekly",
            ReportPeriod::Monthly => "monthly",
            ReportPeriod::Quarterly => "quarterly",
            ReportPeriod::Yearly => "yearly",
            ReportPeriod::Custom => "custom",
        }
    }
}

impl FromStr for ReportPeriod {
    type Err = TelemetryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "daily" => Ok(ReportPeriod::Daily),
            "weekly" => Ok(ReportPeriod::Weekly),
            "monthly" => Ok(ReportPeriod::Monthly),
            "quarterly" => Ok(ReportPeriod::Quarterly),
            "yearly" => Ok(ReportPeriod::Yearly),
            "custom" => Ok(ReportPeriod::Custom),
            other => Err(TelemetryError::validation(format!(
                "unrecognized report period '{other}'"
            ))),
        }
    }
}

/// An immutable report snapshot.
///
/// `data` is the opaque payload produced by the compiler. Once persisted it
/// is never edited; regeneration creates a new snapshot with a fresh `id`
/// and `generated_at`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyticsReport {
    pub id: Uuid,
    pub report_type: ReportType,
    pub period: ReportPeriod,
    pub window_start: DateTime<Utc>,
    pub window_end: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vehicle_id: Option<String>,
    pub data: serde_json::Value,
    pub generated_at: DateTime<Utc>,
}

impl AnalyticsReport {
    pub fn new(
        report_type: ReportType,
        period: ReportPeriod,
        window: TimeRange,
        vehicle_id: Option<String>,
        data: serde_json::Value,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            report_type,
            period,
            window_start: window.start,
            window_end: window.end,
            vehicle_id,
            data,
            generated_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_type_round_trip() {
        for s in ["fleet", "vehicle", "utilization", "cost", "maintenance"] {
            assert_eq!(s.parse::<ReportType>().unwrap().as_str(), s);
        }
        assert!("weekly".parse::<ReportType>().is_err());
    }

    #[test]
    fn test_report_period_round_trip() {
        for s in ["daily", "weekly", "monthly", "quarterly", "yearly", "custom"] {
            assert_eq!(s.parse::<ReportPeriod>().unwrap().as_str(), s);
        }
        assert!("hourly".parse::<ReportPeriod>().is_err());
    }
}
