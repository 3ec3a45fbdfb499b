//! CSV export of usage buckets.
//!
//! Supports pretty-printing, JSON serialization, and CSV append for
//! downstream spreadsheet/warehouse loads.

use anyhow::Result;
use tracing::{debug, info};

use crate::accumulator::UsageStatsBucket;
use csv::WriterBuilder;
use std::fs::OpenOptions;
use std::path::Path;

/// Logs a bucket using Rust's debug pretty-print format.
pub fn print_pretty(bucket: &UsageStatsBucket) {
    debug!("{:#?}", bucket);
}

/// Logs a serializable value as pretty-printed JSON.
pub fn print_json(value: &impl serde::Serialize) -> Result<()> {
    info!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Appends a [`UsageStatsBucket`] as a row to a CSV file.
///
/// Creates the file with headers if it does not already exist.
pub fn append_record(path: &str, bucket: &UsageStatsBucket) -> Result<()> {
    let file_exists = Path::new(path).exists();
    debug!(path, file_exists, "Appending CSV record");

    let file = OpenOptions::new().append(true).create(true).open(path)?;

    let mut writer = WriterBuilder::new()
        .has_headers(!file_exists) // IMPORTANT when appending
        .from_writer(file);

    writer.serialize(bucket)?;
    writer.flush()?;

    Ok(())
}

/// Appends every bucket in window order and reports how many rows landed.
pub fn export_buckets(path: &str, buckets: &[UsageStatsBucket]) -> Result<usize> {
    for bucket in buckets {
        append_record(path, bucket)?;
    }
    info!(path, rows = buckets.len(), "Bucket export complete");
    Ok(buckets.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use std::env;
    use std::fs;

    fn temp_path(name: &str) -> String {
        format!("{}/{}", env::temp_dir().display(), name)
    }

    fn bucket() -> UsageStatsBucket {
        let start = Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap();
        let mut bucket = UsageStatsBucket::empty("V1", start);
        bucket.accumulate(&crate::accumulator::BucketDelta {
            distance_traveled: Some(25.0),
            fuel_consumed: Some(2.0),
            ..Default::default()
        });
        bucket
    }

    #[test]
    fn test_print_pretty_does_not_panic() {
        print_pretty(&bucket());
    }

    #[test]
    fn test_print_json_does_not_panic() {
        print_json(&bucket()).unwrap();
    }

    #[test]
    fn test_append_record_creates_file() {
        let path = temp_path("fleet_telemetry_test_create.csv");
        let _ = fs::remove_file(&path); // clean up any prior run

        append_record(&path, &bucket()).unwrap();

        assert!(Path::new(&path).exists());
        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("V1"));

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_append_record_writes_header_once() {
        let path = temp_path("fleet_telemetry_test_header.csv");
        let _ = fs::remove_file(&path);

        append_record(&path, &bucket()).unwrap();
        append_record(&path, &bucket()).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        // Header line should appear exactly once
        let header_count = content
            .lines()
            .filter(|l| l.contains("window_start"))
            .count();
        assert_eq!(header_count, 1);

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_export_buckets_appends_all_rows() {
        let path = temp_path("fleet_telemetry_test_rows.csv");
        let _ = fs::remove_file(&path);

        let rows = export_buckets(&path, &[bucket(), bucket()]).unwrap();
        assert_eq!(rows, 2);

        let content = fs::read_to_string(&path).unwrap();
        // 1 header + 2 data rows
        assert_eq!(content.lines().count(), 3);

        fs::remove_file(&path).unwrap();
    }
}
