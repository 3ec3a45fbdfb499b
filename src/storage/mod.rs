//! Storage abstraction for the telemetry core.
//!
//! [`TelemetryStore`] fixes the contract the engine relies on — most
//! importantly that [`increment_bucket`](TelemetryStore::increment_bucket)
//! is a single atomic apply-and-fetch — while leaving the backing store
//! free. Any durable document or time-series store with atomic per-document
//! increments and timestamp range queries can implement it;
//! [`MemoryStore`] is the in-process reference implementation.

mod memory;

pub use memory::MemoryStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::accumulator::{BucketDelta, BucketKey, UsageStatsBucket};
use crate::error::Result;
use crate::recorder::{MetricObservation, MetricType};
use crate::report::{AnalyticsReport, ReportPeriod, ReportType};

/// An inclusive `[start, end]` time window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeRange {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        ts >= self.start && ts <= self.end
    }
}

/// Outcome of a sequence-guard check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceAdvance {
    /// The high-water mark moved forward; the reading is new.
    Advanced,
    /// The reading's sequence is at or below the last applied one.
    Stale { last: u64 },
}

/// Persistence operations required by the telemetry core.
///
/// Implementations must make `increment_bucket` atomic per key: two
/// concurrent increments for the same `(vehicle_id, window_start)` both
/// land, and each caller observes a state that includes its own delta.
/// A read-modify-write round trip at the call site is a lost-update bug,
/// not an acceptable implementation.
#[async_trait]
pub trait TelemetryStore: Send + Sync {
    /// Atomically applies `delta` to the bucket identified by `key`,
    /// creating the bucket if it does not exist, and returns the updated
    /// bucket (with `efficiency` recomputed from the new totals).
    async fn increment_bucket(
        &self,
        key: BucketKey,
        delta: BucketDelta,
    ) -> Result<UsageStatsBucket>;

    /// Buckets for one vehicle whose `window_start` lies in `range`,
    /// ascending by window.
    async fn buckets_in_range(
        &self,
        vehicle_id: &str,
        range: &TimeRange,
    ) -> Result<Vec<UsageStatsBucket>>;

    /// Atomically advances the per-vehicle sequence high-water mark.
    /// A single operation on purpose: a separate read-then-write pair
    /// would let two workers both pass the staleness check.
    async fn try_advance_sequence(&self, vehicle_id: &str, seq: u64) -> Result<SequenceAdvance>;

    /// Appends one observation. Observations are immutable once written.
    async fn insert_observation(&self, observation: MetricObservation) -> Result<()>;

    /// Observations of one metric kind within `range`, for one vehicle or
    /// (with `vehicle_id: None`) the whole fleet, ascending by timestamp.
    async fn observations_in_range(
        &self,
        vehicle_id: Option<&str>,
        metric_type: MetricType,
        range: &TimeRange,
    ) -> Result<Vec<MetricObservation>>;

    /// Persists one report snapshot. Reports are immutable once written;
    /// regeneration inserts a new snapshot with a fresh id.
    async fn insert_report(&self, report: AnalyticsReport) -> Result<()>;

    /// Reports of the given type and period, newest window first,
    /// optionally filtered by vehicle, capped at `limit`.
    async fn list_reports(
        &self,
        report_type: ReportType,
        period: ReportPeriod,
        vehicle_id: Option<&str>,
        limit: usize,
    ) -> Result<Vec<AnalyticsReport>>;

    /// Fetches one report by id.
    async fn get_report(&self, id: Uuid) -> Result<Option<AnalyticsReport>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_time_range_is_inclusive() {
        let start = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 3, 2, 0, 0, 0).unwrap();
        let range = TimeRange::new(start, end);

        assert!(range.contains(start));
        assert!(range.contains(end));
        assert!(range.contains(start + chrono::Duration::hours(12)));
        assert!(!range.contains(end + chrono::Duration::seconds(1)));
        assert!(!range.contains(start - chrono::Duration::seconds(1)));
    }
}
