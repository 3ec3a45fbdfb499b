//! Hourly usage-bucket accumulation.
//!
//! Sensor readings are folded into one [`UsageStatsBucket`] per vehicle per
//! clock hour. All mutation goes through
//! [`TelemetryStore::increment_bucket`](crate::storage::TelemetryStore::increment_bucket),
//! a single atomic apply-and-fetch, so concurrent readings for the same
//! vehicle and window never lose updates.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, TelemetryError};
use crate::events::SensorReadingEvent;
use crate::storage::{SequenceAdvance, TelemetryStore};

/// Accumulated operating activity for one vehicle within one hour window.
///
/// `window_start` is aligned to the top of the hour and `window_end` is
/// exactly one hour later. Buckets are append-only history: updates are
/// additive, never overwrites, except `efficiency` which is recomputed
/// from the running totals on every update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageStatsBucket {
    pub vehicle_id: String,
    pub window_start: DateTime<Utc>,
    pub window_end: DateTime<Utc>,
    pub hours_operated: f64,
    pub distance_traveled: f64,
    pub fuel_consumed: Option<f64>,
    pub idle_time: Option<f64>,
    pub efficiency: Option<f64>,
}

impl UsageStatsBucket {
    /// A zeroed bucket for the window containing `window_start`.
    pub fn empty(vehicle_id: &str, window_start: DateTime<Utc>) -> Self {
        Self {
            vehicle_id: vehicle_id.to_string(),
            window_start,
            window_end: window_start + Duration::hours(1),
            hours_operated: 0.0,
            distance_traveled: 0.0,
            fuel_consumed: None,
            idle_time: None,
            efficiency: None,
        }
    }

    /// Adds `delta` to the running totals and recomputes `efficiency`.
    ///
    /// Callers must hold whatever lock makes this atomic with respect to
    /// other writers of the same bucket; see the store contract.
    pub fn accumulate(&mut self, delta: &BucketDelta) {
        if let Some(h) = delta.hours_operated {
            self.hours_operated += h;
        }
        if let Some(d) = delta.distance_traveled {
            self.distance_traveled += d;
        }
        if let Some(f) = delta.fuel_consumed {
            *self.fuel_consumed.get_or_insert(0.0) += f;
        }
        if let Some(i) = delta.idle_time {
            *self.idle_time.get_or_insert(0.0) += i;
        }

        self.efficiency = match self.fuel_consumed {
            Some(fuel) if fuel > 0.0 => Some(self.distance_traveled / fuel),
            _ => None,
        };
    }
}

/// Identity of a bucket: one per `(vehicle_id, window_start)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BucketKey {
    pub vehicle_id: String,
    pub window_start: DateTime<Utc>,
}

impl BucketKey {
    /// Key for the window that `timestamp` falls into.
    pub fn for_timestamp(vehicle_id: &str, timestamp: DateTime<Utc>) -> Self {
        Self {
            vehicle_id: vehicle_id.to_string(),
            window_start: align_to_hour(timestamp),
        }
    }
}

/// Floors a timestamp to the top of its UTC hour.
///
/// This is the tie-break rule for bucket identity: a reading belongs to
/// exactly one window, determined solely by its timestamp's hour.
pub fn align_to_hour(timestamp: DateTime<Utc>) -> DateTime<Utc> {
    let overshoot_secs = timestamp.timestamp().rem_euclid(3600);
    timestamp
        - Duration::seconds(overshoot_secs)
        - Duration::nanoseconds(i64::from(timestamp.timestamp_subsec_nanos()))
}

/// Incremental update extracted from a single sensor reading.
///
/// Absent fields leave the corresponding total untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BucketDelta {
    pub hours_operated: Option<f64>,
    pub distance_traveled: Option<f64>,
    pub fuel_consumed: Option<f64>,
    pub idle_time: Option<f64>,
}

impl BucketDelta {
    pub fn from_reading(reading: &SensorReadingEvent) -> Self {
        Self {
            hours_operated: reading.hours_operated,
            distance_traveled: reading.distance_traveled,
            fuel_consumed: reading.fuel_consumed,
            idle_time: reading.idle_time,
        }
    }

    /// True when no field is present, i.e. nothing to accumulate.
    pub fn is_empty(&self) -> bool {
        self.hours_operated.is_none()
            && self.distance_traveled.is_none()
            && self.fuel_consumed.is_none()
            && self.idle_time.is_none()
    }

    /// Every present field must be a finite, non-negative magnitude.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("hours_operated", self.hours_operated),
            ("distance_traveled", self.distance_traveled),
            ("fuel_consumed", self.fuel_consumed),
            ("idle_time", self.idle_time),
        ] {
            if let Some(v) = value {
                if !v.is_finite() || v < 0.0 {
                    return Err(TelemetryError::validation(format!(
                        "{name} must be finite and non-negative, got {v}"
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Applies sensor readings to hourly usage buckets.
///
/// Owns all bucket mutation. The store handle is injected; there is no
/// module-level state.
pub struct BucketAccumulator {
    store: Arc<dyn TelemetryStore>,
}

impl BucketAccumulator {
    pub fn new(store: Arc<dyn TelemetryStore>) -> Self {
        Self { store }
    }

    /// Applies a delta to the bucket for `(vehicle_id, hour of timestamp)`,
    /// creating the bucket on first touch. Returns the updated bucket.
    pub async fn apply_reading(
        &self,
        vehicle_id: &str,
        timestamp: DateTime<Utc>,
        delta: BucketDelta,
    ) -> Result<UsageStatsBucket> {
        delta.validate()?;
        let key = BucketKey::for_timestamp(vehicle_id, timestamp);
        let bucket = self.store.increment_bucket(key, delta).await?;
        debug!(
            vehicle_id,
            window_start = %bucket.window_start,
            hours_operated = bucket.hours_operated,
            distance_traveled = bucket.distance_traveled,
            "Bucket updated"
        );
        Ok(bucket)
    }

    /// Applies a full sensor event, running the duplicate-delivery guard
    /// when the reading carries a sequence number.
    ///
    /// Accumulation is best-effort under at-least-once delivery: without a
    /// `seq` a redelivered reading double-counts. With one, any reading at
    /// or below the last applied sequence for the vehicle is rejected with
    /// [`TelemetryError::StaleSequence`].
    ///
    /// Returns `None` when the reading carried nothing to accumulate.
    pub async fn apply_sensor_event(
        &self,
        reading: &SensorReadingEvent,
    ) -> Result<Option<UsageStatsBucket>> {
        let delta = BucketDelta::from_reading(reading);
        delta.validate()?;

        if let Some(seq) = reading.seq {
            match self
                .store
                .try_advance_sequence(&reading.vehicle_id, seq)
                .await?
            {
                SequenceAdvance::Advanced => {}
                SequenceAdvance::Stale { last } => {
                    return Err(TelemetryError::StaleSequence {
                        vehicle_id: reading.vehicle_id.clone(),
                        seq,
                        last,
                    });
                }
            }
        }

        if delta.is_empty() {
            return Ok(None);
        }

        let bucket = self
            .apply_reading(&reading.vehicle_id, reading.timestamp, delta)
            .await?;
        Ok(Some(bucket))
    }
}
