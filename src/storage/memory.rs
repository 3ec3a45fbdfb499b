//! In-memory reference implementation of [`TelemetryStore`].
//!
//! Bucket increments go through the sharded map's entry API, which holds
//! the shard lock for the whole apply-and-fetch, satisfying the atomic
//! increment contract. Used by the CLI and the test suite.

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use parking_lot::RwLock;
use uuid::Uuid;

use async_trait::async_trait;

use crate::accumulator::{BucketDelta, BucketKey, UsageStatsBucket};
use crate::error::Result;
use crate::recorder::{MetricObservation, MetricType};
use crate::report::{AnalyticsReport, ReportPeriod, ReportType};
use crate::storage::{SequenceAdvance, TelemetryStore, TimeRange};

#[derive(Debug, Default)]
pub struct MemoryStore {
    buckets: DashMap<BucketKey, UsageStatsBucket>,
    sequences: DashMap<String, u64>,
    observations: RwLock<Vec<MetricObservation>>,
    reports: RwLock<Vec<AnalyticsReport>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TelemetryStore for MemoryStore {
    async fn increment_bucket(
        &self,
        key: BucketKey,
        delta: BucketDelta,
    ) -> Result<UsageStatsBucket> {
        let vehicle_id = key.vehicle_id.clone();
        let window_start = key.window_start;

        // Entry holds the shard lock across the whole update, so the
        // increment and the returned snapshot are one atomic step.
        let mut entry = self
            .buckets
            .entry(key)
            .or_insert_with(|| UsageStatsBucket::empty(&vehicle_id, window_start));
        entry.value_mut().accumulate(&delta);
        Ok(entry.value().clone())
    }

    async fn buckets_in_range(
        &self,
        vehicle_id: &str,
        range: &TimeRange,
    ) -> Result<Vec<UsageStatsBucket>> {
        let mut buckets: Vec<UsageStatsBucket> = self
            .buckets
            .iter()
            .filter(|e| e.key().vehicle_id == vehicle_id && range.contains(e.key().window_start))
            .map(|e| e.value().clone())
            .collect();
        buckets.sort_by_key(|b| b.window_start);
        Ok(buckets)
    }

    async fn try_advance_sequence(&self, vehicle_id: &str, seq: u64) -> Result<SequenceAdvance> {
        match self.sequences.entry(vehicle_id.to_string()) {
            Entry::Occupied(mut occupied) => {
                let last = *occupied.get();
                if seq <= last {
                    Ok(SequenceAdvance::Stale { last })
                } else {
                    occupied.insert(seq);
                    Ok(SequenceAdvance::Advanced)
                }
            }
            Entry::Vacant(vacant) => {
                vacant.insert(seq);
                Ok(SequenceAdvance::Advanced)
            }
        }
    }

    async fn insert_observation(&self, observation: MetricObservation) -> Result<()> {
        self.observations.write().push(observation);
        Ok(())
    }

    async fn observations_in_range(
        &self,
        vehicle_id: Option<&str>,
        metric_type: MetricType,
        range: &TimeRange,
    ) -> Result<Vec<MetricObservation>> {
        let mut observations: Vec<MetricObservation> = self
            .observations
            .read()
            .iter()
            .filter(|o| {
                o.metric_type == metric_type
                    && range.contains(o.timestamp)
                    && vehicle_id.is_none_or(|id| o.vehicle_id == id)
            })
            .cloned()
            .collect();
        observations.sort_by_key(|o| o.timestamp);
        Ok(observations)
    }

    async fn insert_report(&self, report: AnalyticsReport) -> Result<()> {
        self.reports.write().push(report);
        Ok(())
    }

    async fn list_reports(
        &self,
        report_type: ReportType,
        period: ReportPeriod,
        vehicle_id: Option<&str>,
        limit: usize,
    ) -> Result<Vec<AnalyticsReport>> {
        let mut reports: Vec<AnalyticsReport> = self
            .reports
            .read()
            .iter()
            .filter(|r| {
                r.report_type == report_type
                    && r.period == period
                    && (vehicle_id.is_none() || r.vehicle_id.as_deref() == vehicle_id)
            })
            .cloned()
            .collect();
        reports.sort_by(|a, b| b.window_end.cmp(&a.window_end));
        reports.truncate(limit);
        Ok(reports)
    }

    async fn get_report(&self, id: Uuid) -> Result<Option<AnalyticsReport>> {
        Ok(self.reports.read().iter().find(|r| r.id == id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use std::sync::Arc;

    fn ts(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, h, m, 0).unwrap()
    }

    fn distance_delta(d: f64) -> BucketDelta {
        BucketDelta {
            distance_traveled: Some(d),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_increment_creates_then_accumulates() {
        let store = MemoryStore::new();
        let key = BucketKey::for_timestamp("V1", ts(10, 5));

        let first = store
            .increment_bucket(key.clone(), distance_delta(10.0))
            .await
            .unwrap();
        assert_eq!(first.distance_traveled, 10.0);
        assert_eq!(first.window_start, ts(10, 0));
        assert_eq!(first.window_end, ts(11, 0));

        let second = store
            .increment_bucket(key, distance_delta(15.0))
            .await
            .unwrap();
        assert_eq!(second.distance_traveled, 25.0);
    }

    #[tokio::test]
    async fn test_concurrent_increments_lose_nothing() {
        let store = Arc::new(MemoryStore::new());
        let key = BucketKey::for_timestamp("V1", ts(10, 5));

        let mut tasks = Vec::new();
        for _ in 0..64 {
            let store = store.clone();
            let key = key.clone();
            tasks.push(tokio::spawn(async move {
                store.increment_bucket(key, distance_delta(1.0)).await
            }));
        }
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        let range = TimeRange::new(ts(10, 0), ts(11, 0));
        let buckets = store.buckets_in_range("V1", &range).await.unwrap();
        assert_eq!(buckets.len(), 1);
        assert_eq!(buckets[0].distance_traveled, 64.0);
    }

    #[tokio::test]
    async fn test_sequence_guard_advances_and_rejects() {
        let store = MemoryStore::new();

        assert_eq!(
            store.try_advance_sequence("V1", 5).await.unwrap(),
            SequenceAdvance::Advanced
        );
        assert_eq!(
            store.try_advance_sequence("V1", 6).await.unwrap(),
            SequenceAdvance::Advanced
        );
        assert_eq!(
            store.try_advance_sequence("V1", 6).await.unwrap(),
            SequenceAdvance::Stale { last: 6 }
        );
        assert_eq!(
            store.try_advance_sequence("V1", 3).await.unwrap(),
            SequenceAdvance::Stale { last: 6 }
        );

        // Other vehicles keep their own high-water mark.
        assert_eq!(
            store.try_advance_sequence("V2", 1).await.unwrap(),
            SequenceAdvance::Advanced
        );
    }

    #[tokio::test]
    async fn test_buckets_in_range_filters_and_sorts() {
        let store = MemoryStore::new();
        for (vehicle, hour) in [("V1", 12), ("V1", 10), ("V2", 10)] {
            store
                .increment_bucket(
                    BucketKey::for_timestamp(vehicle, ts(hour, 30)),
                    distance_delta(1.0),
                )
                .await
                .unwrap();
        }

        let range = TimeRange::new(ts(9, 0), ts(13, 0));
        let buckets = store.buckets_in_range("V1", &range).await.unwrap();
        assert_eq!(buckets.len(), 2);
        assert_eq!(buckets[0].window_start, ts(10, 0));
        assert_eq!(buckets[1].window_start, ts(12, 0));
    }

    #[tokio::test]
    async fn test_reports_listed_newest_window_first() {
        let store = MemoryStore::new();
        let base = ts(0, 0);
        for days in [1, 3, 2] {
            let end = base + Duration::days(days);
            store
                .insert_report(AnalyticsReport::new(
                    ReportType::Fleet,
                    ReportPeriod::Daily,
                    TimeRange::new(base, end),
                    None,
                    serde_json::json!({}),
                ))
                .await
                .unwrap();
        }

        let reports = store
            .list_reports(ReportType::Fleet, ReportPeriod::Daily, None, 2)
            .await
            .unwrap();
        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].window_end, base + Duration::days(3));
        assert_eq!(reports[1].window_end, base + Duration::days(2));

        let by_id = store.get_report(reports[0].id).await.unwrap();
        assert_eq!(by_id.unwrap().id, reports[0].id);
    }
}
