use std::time::Duration;

use reqwest::StatusCode;

use crate::error::{Result, TelemetryError};
use crate::services::registry::{FleetCounts, VehicleRegistry, VehicleSummary};

/// HTTP client for the vehicle registry service.
///
/// Failures map to [`TelemetryError::Collaborator`]; callers (the report
/// compiler) degrade rather than abort, so this client never needs retry
/// logic of its own.
pub struct HttpVehicleRegistry {
    base_url: String,
    token: Option<String>,
    client: reqwest::Client,
}

impl HttpVehicleRegistry {
    pub fn new(base_url: String, token: Option<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| TelemetryError::collaborator(format!("registry client: {e}")))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
            client,
        })
    }

    fn get(&self, path: &str) -> reqwest::RequestBuilder {
        let mut req = self.client.get(format!("{}{}", self.base_url, path));
        if let Some(token) = &self.token {
            req = req.header("Authorization", format!("Bearer {token}"));
        }
        req
    }
}

#[async_trait::async_trait]
impl VehicleRegistry for HttpVehicleRegistry {
    async fn get_vehicle(&self, id: &str) -> Result<Option<VehicleSummary>> {
        let response = self
            .get(&format!("/v1/vehicles/{id}"))
            .send()
            .await
            .map_err(|e| TelemetryError::collaborator(format!("vehicle lookup: {e}")))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(TelemetryError::collaborator(format!(
                "registry returned status {}",
                response.status()
            )));
        }

        // Parse as generic JSON and extract only the fields we display.
        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| TelemetryError::collaborator(format!("vehicle response: {e}")))?;

        let summary = VehicleSummary {
            id: json["id"].as_str().unwrap_or(id).to_string(),
            name: json["name"].as_str().map(str::to_string),
            vehicle_type: json["type"].as_str().map(str::to_string),
            status: json["status"].as_str().map(str::to_string),
        };
        Ok(Some(summary))
    }

    async fn fleet_counts(&self) -> Result<FleetCounts> {
        let response = self
            .get("/v1/fleet/counts")
            .send()
            .await
            .map_err(|e| TelemetryError::collaborator(format!("fleet counts: {e}")))?;

        if !response.status().is_success() {
            return Err(TelemetryError::collaborator(format!(
                "registry returned status {}",
                response.status()
            )));
        }

        response
            .json::<FleetCounts>()
            .await
            .map_err(|e| TelemetryError::collaborator(format!("fleet counts response: {e}")))
    }
}
