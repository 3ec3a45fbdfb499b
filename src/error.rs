//! Error types for the telemetry core.

use thiserror::Error;

/// Result type alias for telemetry operations.
pub type Result<T> = std::result::Result<T, TelemetryError>;

/// Errors that can occur while ingesting, accumulating, or querying
/// telemetry.
///
/// None of these are fatal to the consumer loop: malformed events are
/// dropped, validation failures are rejected at the component boundary,
/// stale sequence numbers are skipped, and collaborator failures degrade
/// to placeholders in the report compiler.
#[derive(Error, Debug)]
pub enum TelemetryError {
    /// Event payload could not be parsed or is missing required fields.
    #[error("malformed event on topic '{topic}': {reason}")]
    MalformedEvent { topic: String, reason: String },

    /// Input rejected at the accumulator or recorder boundary.
    #[error("validation error: {0}")]
    Validation(String),

    /// Reading carried a sequence number at or below the last applied one.
    #[error("stale sequence {seq} for vehicle '{vehicle_id}' (last applied {last})")]
    StaleSequence {
        vehicle_id: String,
        seq: u64,
        last: u64,
    },

    /// Transient storage failure; safe to retry from outside the core.
    #[error("storage error: {0}")]
    Storage(String),

    /// Serialization/deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// An external collaborator (e.g. the vehicle registry) failed.
    #[error("collaborator unavailable: {0}")]
    Collaborator(String),

    /// Resource not found.
    #[error("not found: {0}")]
    NotFound(String),
}

impl TelemetryError {
    /// Create a new validation error.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a new storage error.
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    /// Create a new collaborator error.
    pub fn collaborator(msg: impl Into<String>) -> Self {
        Self::Collaborator(msg.into())
    }

    /// Create a malformed-event error for the given topic.
    pub fn malformed(topic: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedEvent {
            topic: topic.into(),
            reason: reason.into(),
        }
    }
}
