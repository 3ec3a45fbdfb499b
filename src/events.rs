//! Event envelope classification for the telemetry stream.
//!
//! The transport delivers `{topic, payload}` envelopes. [`classify`] maps
//! the topic to a tagged variant; payload parsing and validation belong to
//! the next stage, so unknown topics are a [`Classified::Unrecognized`]
//! result rather than an error and the consumer keeps going.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A raw event as delivered by the stream transport.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope {
    pub topic: String,
    pub payload: serde_json::Value,
}

/// Classification of an envelope by topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classified {
    /// Vehicle created/updated/retired or status changed (`vehicle-events`,
    /// `vehicle-status`). Consumed by the registry, not this core.
    VehicleLifecycle,
    /// GPS position update (`vehicle-location`). Consumed elsewhere.
    Location,
    /// Operating-time/distance/fuel reading (`sensor-data`).
    SensorReading,
    /// Maintenance performed or scheduled (`maintenance-events`).
    Maintenance,
    /// Topic not known to this consumer.
    Unrecognized,
}

/// Maps a topic to its event kind. Pure function, no side effects.
pub fn classify(envelope: &EventEnvelope) -> Classified {
    match envelope.topic.as_str() {
        "vehicle-events" | "vehicle-status" => Classified::VehicleLifecycle,
        "vehicle-location" => Classified::Location,
        "sensor-data" => Classified::SensorReading,
        "maintenance-events" => Classified::Maintenance,
        _ => Classified::Unrecognized,
    }
}

/// Payload of a `sensor-data` event.
///
/// All magnitude fields are optional; a reading carrying none of them is
/// still well-formed (it just has nothing to accumulate). `seq` is the
/// optional producer-assigned, monotonically increasing per-vehicle
/// sequence number used by the duplicate-delivery guard.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensorReadingEvent {
    pub vehicle_id: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hours_operated: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance_traveled: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fuel_consumed: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub idle_time: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seq: Option<u64>,
}

/// Payload of a `maintenance-events` event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaintenanceEvent {
    pub vehicle_id: String,
    pub timestamp: DateTime<Utc>,
    pub maintenance_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub downtime_hours: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn envelope(topic: &str) -> EventEnvelope {
        EventEnvelope {
            topic: topic.to_string(),
            payload: serde_json::json!({}),
        }
    }

    #[test]
    fn test_classify_known_topics() {
        assert_eq!(
            classify(&envelope("vehicle-events")),
            Classified::VehicleLifecycle
        );
        assert_eq!(
            classify(&envelope("vehicle-status")),
            Classified::VehicleLifecycle
        );
        assert_eq!(classify(&envelope("vehicle-location")), Classified::Location);
        assert_eq!(classify(&envelope("sensor-data")), Classified::SensorReading);
        assert_eq!(
            classify(&envelope("maintenance-events")),
            Classified::Maintenance
        );
    }

    #[test]
    fn test_classify_unknown_topic_is_not_an_error() {
        assert_eq!(classify(&envelope("driver-chat")), Classified::Unrecognized);
        assert_eq!(classify(&envelope("")), Classified::Unrecognized);
    }

    #[test]
    fn test_sensor_reading_tolerates_extra_fields() {
        let payload = serde_json::json!({
            "vehicle_id": "V1",
            "timestamp": "2024-03-01T10:05:00Z",
            "distance_traveled": 10.0,
            "firmware_version": "2.4.1"
        });
        let reading: SensorReadingEvent = serde_json::from_value(payload).unwrap();
        assert_eq!(reading.vehicle_id, "V1");
        assert_eq!(reading.distance_traveled, Some(10.0));
        assert!(reading.seq.is_none());
    }
}
