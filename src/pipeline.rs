//! Event dispatch into the accumulator and recorder.
//!
//! One [`Pipeline`] per logical stream consumer. Dependencies are injected
//! explicitly; there is no module-level state. Within one partition
//! (recommended partition key: vehicle id) the transport calls
//! [`Pipeline::handle`] once per event in delivery order; across
//! partitions concurrent pipelines are safe because all bucket mutation
//! goes through the store's atomic increment.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::accumulator::{BucketAccumulator, UsageStatsBucket};
use crate::error::{Result, TelemetryError};
use crate::events::{
    Classified, EventEnvelope, MaintenanceEvent, SensorReadingEvent, classify,
};
use crate::recorder::{MetricRecorder, MetricType};
use crate::storage::TelemetryStore;

/// What one event produced.
#[derive(Debug, Clone, PartialEq)]
pub enum Handled {
    /// A sensor reading: the updated bucket (if the reading carried any
    /// usage delta) plus the number of derived observations recorded.
    Sensor {
        bucket: Option<UsageStatsBucket>,
        observations: usize,
    },
    /// A maintenance event and its derived observations.
    Maintenance { observations: usize },
    /// Lifecycle and location events are classified but consumed by
    /// external collaborators, not this core.
    Lifecycle,
    Location,
    /// Unrecognized topic or stale (duplicate) reading.
    Skipped,
}

/// Stream-facing entry point of the telemetry core.
pub struct Pipeline {
    accumulator: BucketAccumulator,
    recorder: MetricRecorder,
}

impl Pipeline {
    pub fn new(store: Arc<dyn TelemetryStore>) -> Self {
        Self {
            accumulator: BucketAccumulator::new(store.clone()),
            recorder: MetricRecorder::new(store),
        }
    }

    /// Classifies and applies one event envelope.
    ///
    /// Errors are per-event: the caller logs and keeps consuming. An
    /// unrecognized topic is not an error (`Handled::Skipped`), and a
    /// stale sequence number is downgraded to a skip here because
    /// redelivery is expected under at-least-once transport.
    #[tracing::instrument(skip(self, payload))]
    pub async fn handle(&self, topic: &str, payload: serde_json::Value) -> Result<Handled> {
        let envelope = EventEnvelope {
            topic: topic.to_string(),
            payload,
        };

        match classify(&envelope) {
            Classified::SensorReading => self.handle_sensor(envelope).await,
            Classified::Maintenance => self.handle_maintenance(envelope).await,
            Classified::VehicleLifecycle => {
                debug!(topic, "Lifecycle event passed through");
                Ok(Handled::Lifecycle)
            }
            Classified::Location => {
                debug!(topic, "Location event passed through");
                Ok(Handled::Location)
            }
            Classified::Unrecognized => {
                warn!(topic, "Unrecognized topic, skipping event");
                Ok(Handled::Skipped)
            }
        }
    }

    async fn handle_sensor(&self, envelope: EventEnvelope) -> Result<Handled> {
        let reading: SensorReadingEvent = serde_json::from_value(envelope.payload)
            .map_err(|e| TelemetryError::malformed(&envelope.topic, e.to_string()))?;

        let bucket = match self.accumulator.apply_sensor_event(&reading).await {
            Ok(bucket) => bucket,
            Err(TelemetryError::StaleSequence {
                vehicle_id, seq, last,
            }) => {
                warn!(vehicle_id = %vehicle_id, seq, last, "Duplicate reading skipped");
                return Ok(Handled::Skipped);
            }
            Err(e) => return Err(e),
        };

        let mut observations = 0;
        if let Some(hours) = reading.hours_operated {
            self.recorder
                .record(
                    &reading.vehicle_id,
                    MetricType::EngineHours,
                    reading.timestamp,
                    hours,
                    Some("h"),
                )
                .await?;
            observations += 1;
        }
        if let (Some(distance), Some(fuel)) = (reading.distance_traveled, reading.fuel_consumed) {
            if distance > 0.0 && fuel > 0.0 {
                self.recorder
                    .record(
                        &reading.vehicle_id,
                        MetricType::FuelEfficiency,
                        reading.timestamp,
                        distance / fuel,
                        Some("km/L"),
                    )
                    .await?;
                observations += 1;
            }
        }

        Ok(Handled::Sensor {
            bucket,
            observations,
        })
    }

    async fn handle_maintenance(&self, envelope: EventEnvelope) -> Result<Handled> {
        let event: MaintenanceEvent = serde_json::from_value(envelope.payload)
            .map_err(|e| TelemetryError::malformed(&envelope.topic, e.to_string()))?;

        self.recorder
            .record(
                &event.vehicle_id,
                MetricType::MaintenanceFrequency,
                event.timestamp,
                1.0,
                Some("events"),
            )
            .await?;
        let mut observations = 1;

        if let (Some(cost), Some(downtime)) = (event.cost, event.downtime_hours) {
            if downtime > 0.0 {
                self.recorder
                    .record(
                        &event.vehicle_id,
                        MetricType::CostPerHour,
                        event.timestamp,
                        cost / downtime,
                        None,
                    )
                    .await?;
                observations += 1;
            }
        }

        debug!(
            vehicle_id = %event.vehicle_id,
            maintenance_type = %event.maintenance_type,
            observations,
            "Maintenance event recorded"
        );
        Ok(Handled::Maintenance { observations })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use serde_json::json;

    fn pipeline() -> (Arc<MemoryStore>, Pipeline) {
        let store = Arc::new(MemoryStore::new());
        let pipeline = Pipeline::new(store.clone());
        (store, pipeline)
    }

    #[tokio::test]
    async fn test_sensor_event_updates_bucket_and_derives_metrics() {
        let (_store, pipeline) = pipeline();

        let handled = pipeline
            .handle(
                "sensor-data",
                json!({
                    "vehicle_id": "V1",
                    "timestamp": "2024-03-01T10:05:00Z",
                    "hours_operated": 0.75,
                    "distance_traveled": 10.0,
                    "fuel_consumed": 1.0
                }),
            )
            .await
            .unwrap();

        match handled {
            Handled::Sensor {
                bucket: Some(bucket),
                observations,
            } => {
                assert_eq!(bucket.distance_traveled, 10.0);
                assert_eq!(bucket.efficiency, Some(10.0));
                // engineHours + fuelEfficiency
                assert_eq!(observations, 2);
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unrecognized_topic_is_skipped_not_an_error() {
        let (_store, pipeline) = pipeline();
        let handled = pipeline
            .handle("driver-chat", json!({"anything": true}))
            .await
            .unwrap();
        assert_eq!(handled, Handled::Skipped);
    }

    #[tokio::test]
    async fn test_malformed_sensor_payload_is_reported() {
        let (_store, pipeline) = pipeline();
        let result = pipeline
            .handle("sensor-data", json!({"timestamp": "not-a-time"}))
            .await;
        assert!(matches!(
            result,
            Err(TelemetryError::MalformedEvent { .. })
        ));
    }

    #[tokio::test]
    async fn test_stale_sequence_is_downgraded_to_skip() {
        let (_store, pipeline) = pipeline();
        let payload = json!({
            "vehicle_id": "V1",
            "timestamp": "2024-03-01T10:05:00Z",
            "distance_traveled": 5.0,
            "seq": 7
        });

        let first = pipeline.handle("sensor-data", payload.clone()).await.unwrap();
        assert!(matches!(first, Handled::Sensor { bucket: Some(_), .. }));

        let second = pipeline.handle("sensor-data", payload).await.unwrap();
        assert_eq!(second, Handled::Skipped);
    }

    #[tokio::test]
    async fn test_maintenance_event_records_frequency_and_cost() {
        let (_store, pipeline) = pipeline();

        let handled = pipeline
            .handle(
                "maintenance-events",
                json!({
                    "vehicle_id": "V1",
                    "timestamp": "2024-03-01T09:00:00Z",
                    "maintenance_type": "oil_change",
                    "cost": 120.0,
                    "downtime_hours": 2.0
                }),
            )
            .await
            .unwrap();

        assert_eq!(handled, Handled::Maintenance { observations: 2 });
    }

    #[tokio::test]
    async fn test_lifecycle_and_location_pass_through() {
        let (_store, pipeline) = pipeline();
        assert_eq!(
            pipeline
                .handle("vehicle-events", json!({"vehicle_id": "V1"}))
                .await
                .unwrap(),
            Handled::Lifecycle
        );
        assert_eq!(
            pipeline
                .handle("vehicle-location", json!({"vehicle_id": "V1"}))
                .await
                .unwrap(),
            Handled::Location
        );
    }
}
