//! Trait and types for the external vehicle registry.
//!
//! The registry owns vehicle inventory metadata; this core only consults
//! it while compiling reports, and every call site must tolerate failure
//! (the compiler substitutes a placeholder rather than aborting).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TelemetryError};

/// Display metadata for one vehicle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VehicleSummary {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vehicle_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

/// Fleet composition counts.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FleetCounts {
    #[serde(default)]
    pub count_by_type: HashMap<String, u64>,
    #[serde(default)]
    pub count_by_status: HashMap<String, u64>,
}

/// Abstraction over the vehicle registry service.
#[async_trait::async_trait]
pub trait VehicleRegistry: Send + Sync {
    /// Returns the vehicle's display metadata, or `None` if the registry
    /// does not know the id.
    async fn get_vehicle(&self, id: &str) -> Result<Option<VehicleSummary>>;

    /// Returns fleet-wide composition counts.
    async fn fleet_counts(&self) -> Result<FleetCounts>;
}

/// Registry stand-in for deployments with no registry configured.
///
/// Every call fails with [`TelemetryError::Collaborator`], which the report
/// compiler degrades to its placeholder path.
pub struct NullRegistry;

#[async_trait::async_trait]
impl VehicleRegistry for NullRegistry {
    async fn get_vehicle(&self, _id: &str) -> Result<Option<VehicleSummary>> {
        Err(TelemetryError::collaborator("no vehicle registry configured"))
    }

    async fn fleet_counts(&self) -> Result<FleetCounts> {
        Err(TelemetryError::collaborator("no vehicle registry configured"))
    }
}
