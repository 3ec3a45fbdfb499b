//! End-to-end tests: event envelopes in, buckets/observations/reports out.

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use serde_json::json;

use fleet_telemetry::analytics::AnalyticsEngine;
use fleet_telemetry::analytics::types::TrendInterval;
use fleet_telemetry::pipeline::Pipeline;
use fleet_telemetry::recorder::{MetricRecorder, MetricType};
use fleet_telemetry::report::{ReportCompiler, ReportPeriod, ReportRequest, ReportType};
use fleet_telemetry::services::registry::NullRegistry;
use fleet_telemetry::storage::{MemoryStore, TelemetryStore, TimeRange};

fn ts(day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, day, hour, minute, 0).unwrap()
}

fn sensor_payload(
    vehicle: &str,
    timestamp: DateTime<Utc>,
    distance: f64,
    fuel: f64,
) -> serde_json::Value {
    json!({
        "vehicle_id": vehicle,
        "timestamp": timestamp.to_rfc3339(),
        "distance_traveled": distance,
        "fuel_consumed": fuel
    })
}

#[tokio::test]
async fn test_readings_split_across_hour_windows() {
    let store = Arc::new(MemoryStore::new());
    let pipeline = Pipeline::new(store.clone());

    // 10:05, 10:40 land in [10:00, 11:00); 11:10 lands in [11:00, 12:00).
    for (minute_ts, distance, fuel) in [
        (ts(1, 10, 5), 10.0, 1.0),
        (ts(1, 10, 40), 15.0, 1.0),
        (ts(1, 11, 10), 20.0, 2.0),
    ] {
        pipeline
            .handle("sensor-data", sensor_payload("V1", minute_ts, distance, fuel))
            .await
            .unwrap();
    }

    let range = TimeRange::new(ts(1, 0, 0), ts(1, 23, 0));
    let buckets = store.buckets_in_range("V1", &range).await.unwrap();
    assert_eq!(buckets.len(), 2);

    assert_eq!(buckets[0].window_start, ts(1, 10, 0));
    assert_eq!(buckets[0].window_end, ts(1, 11, 0));
    assert_eq!(buckets[0].distance_traveled, 25.0);
    assert_eq!(buckets[0].fuel_consumed, Some(2.0));
    assert_eq!(buckets[0].efficiency, Some(12.5));

    assert_eq!(buckets[1].window_start, ts(1, 11, 0));
    assert_eq!(buckets[1].distance_traveled, 20.0);
    assert_eq!(buckets[1].fuel_consumed, Some(2.0));
    assert_eq!(buckets[1].efficiency, Some(10.0));
}

#[tokio::test]
async fn test_fleet_stats_and_percentile_from_recorded_utilization() {
    let store = Arc::new(MemoryStore::new());
    let recorder = MetricRecorder::new(store.clone());

    // Utilization arrives from an external producer, one sample per vehicle.
    for (vehicle, value) in [("V1", 0.5), ("V2", 0.7), ("V3", 0.9)] {
        recorder
            .record(vehicle, MetricType::Utilization, ts(1, 12, 0), value, None)
            .await
            .unwrap();
    }

    let engine = AnalyticsEngine::new(store.clone());
    let range = TimeRange::new(ts(1, 0, 0), ts(2, 0, 0));

    let stats = engine
        .fleet_stats(MetricType::Utilization, &range)
        .await
        .unwrap();
    assert!((stats.avg_value - 0.7).abs() < 1e-12);
    assert_eq!(stats.min_value, 0.5);
    assert_eq!(stats.max_value, 0.9);
    assert_eq!(stats.count, 3);

    let comparison = engine
        .compare("V2", MetricType::Utilization, &range)
        .await
        .unwrap();
    assert_eq!(comparison.percentile_rank, 50.0);
    assert!((comparison.vehicle_avg - 0.7).abs() < 1e-12);
}

#[tokio::test]
async fn test_fleet_stats_empty_window_is_all_zero() {
    let store = Arc::new(MemoryStore::new());
    let engine = AnalyticsEngine::new(store);

    let range = TimeRange::new(ts(1, 0, 0), ts(2, 0, 0));
    let stats = engine
        .fleet_stats(MetricType::CostPerKm, &range)
        .await
        .unwrap();

    assert_eq!(stats.avg_value, 0.0);
    assert_eq!(stats.min_value, 0.0);
    assert_eq!(stats.max_value, 0.0);
    assert_eq!(stats.std_dev, 0.0);
    assert_eq!(stats.count, 0);
}

#[tokio::test]
async fn test_trend_over_derived_fuel_efficiency() {
    let store = Arc::new(MemoryStore::new());
    let pipeline = Pipeline::new(store.clone());

    // Derived fuelEfficiency per reading: 10, 12, 8 over three days.
    for (day, distance, fuel) in [(1, 10.0, 1.0), (2, 24.0, 2.0), (3, 8.0, 1.0)] {
        pipeline
            .handle(
                "sensor-data",
                sensor_payload("V1", ts(day, 9, 0), distance, fuel),
            )
            .await
            .unwrap();
    }

    let engine = AnalyticsEngine::new(store);
    let range = TimeRange::new(ts(1, 0, 0), ts(4, 0, 0));
    let entries = engine
        .trend("V1", MetricType::FuelEfficiency, &range, TrendInterval::Day)
        .await
        .unwrap();

    assert_eq!(entries.len(), 3);
    assert_eq!(entries[0].point.period, "2024-03-01");
    assert_eq!(entries[0].change, 0.0);
    assert_eq!(entries[1].change, 2.0);
    assert_eq!(entries[2].change, -4.0);
}

#[tokio::test]
async fn test_duplicate_sequence_double_count_is_prevented() {
    let store = Arc::new(MemoryStore::new());
    let pipeline = Pipeline::new(store.clone());

    let payload = json!({
        "vehicle_id": "V1",
        "timestamp": ts(1, 10, 5).to_rfc3339(),
        "distance_traveled": 10.0,
        "seq": 1
    });

    // At-least-once transport redelivers the same reading.
    pipeline.handle("sensor-data", payload.clone()).await.unwrap();
    pipeline.handle("sensor-data", payload).await.unwrap();

    let range = TimeRange::new(ts(1, 0, 0), ts(1, 23, 0));
    let buckets = store.buckets_in_range("V1", &range).await.unwrap();
    assert_eq!(buckets.len(), 1);
    assert_eq!(buckets[0].distance_traveled, 10.0);
}

#[tokio::test]
async fn test_mixed_log_compiles_a_vehicle_report() {
    let store = Arc::new(MemoryStore::new());
    let pipeline = Pipeline::new(store.clone());

    let events = [
        (
            "sensor-data",
            sensor_payload("V1", ts(1, 10, 5), 30.0, 3.0),
        ),
        (
            "maintenance-events",
            json!({
                "vehicle_id": "V1",
                "timestamp": ts(1, 14, 0).to_rfc3339(),
                "maintenance_type": "brake_inspection",
                "cost": 200.0,
                "downtime_hours": 4.0
            }),
        ),
        ("vehicle-events", json!({"vehicle_id": "V1", "status": "active"})),
        ("unknown-topic", json!({})),
    ];
    for (topic, payload) in events {
        pipeline.handle(topic, payload).await.unwrap();
    }

    let compiler = ReportCompiler::new(store.clone(), Arc::new(NullRegistry));
    let report = compiler
        .generate(ReportRequest {
            report_type: ReportType::Vehicle,
            period: ReportPeriod::Daily,
            window: TimeRange::new(ts(1, 0, 0), ts(2, 0, 0)),
            vehicle_id: Some("V1".to_string()),
        })
        .await
        .unwrap();

    assert_eq!(report.data["vehicle"], json!({"id": "V1"}));
    assert_eq!(report.data["usage"]["distance_traveled"], json!(30.0));
    assert_eq!(report.data["usage"]["fuel_consumed"], json!(3.0));
    assert_eq!(report.data["usage"]["efficiency"], json!(10.0));
    // V1 is the only vehicle with fuelEfficiency samples, so it ranks at
    // the top and matches the fleet average exactly.
    let comparison = &report.data["comparisons"]["fuelEfficiency"];
    assert_eq!(comparison["vehicle_avg"], json!(10.0));
    assert_eq!(comparison["percentile_rank"], json!(100.0));

    let listed = store
        .list_reports(ReportType::Vehicle, ReportPeriod::Daily, Some("V1"), 5)
        .await
        .unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, report.id);
}
