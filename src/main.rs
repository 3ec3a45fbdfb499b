//! CLI entry point for the fleet telemetry engine.
//!
//! Provides subcommands for replaying event logs through the aggregation
//! pipeline, generating report snapshots, running aggregate queries, and
//! exporting usage buckets to CSV.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use clap::{Parser, Subcommand};
use fleet_telemetry::analytics::AnalyticsEngine;
use fleet_telemetry::analytics::types::TrendInterval;
use fleet_telemetry::error::TelemetryError;
use fleet_telemetry::events::EventEnvelope;
use fleet_telemetry::export::{export_buckets, print_json};
use fleet_telemetry::infra::registry::HttpVehicleRegistry;
use fleet_telemetry::pipeline::{Handled, Pipeline};
use fleet_telemetry::recorder::MetricType;
use fleet_telemetry::report::{ReportCompiler, ReportPeriod, ReportRequest, ReportType};
use fleet_telemetry::services::registry::{NullRegistry, VehicleRegistry};
use fleet_telemetry::storage::{MemoryStore, TelemetryStore, TimeRange};
use std::ffi::OsStr;
use tracing::{error, info, warn};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "fleet_telemetry")]
#[command(about = "Telemetry aggregation engine for fleet sensor events", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay an NDJSON event log through the aggregation pipeline
    Consume {
        /// Path to a file of {"topic", "payload"} lines, or '-' for stdin
        #[arg(value_name = "FILE")]
        input: String,
    },
    /// Replay an event log, then generate and persist a report snapshot
    Report {
        /// Event log to replay before compiling the report
        #[arg(value_name = "FILE")]
        input: String,

        /// Report type: fleet, vehicle, utilization, cost, or maintenance
        #[arg(short = 't', long, default_value = "fleet")]
        report_type: String,

        /// Report period: daily, weekly, monthly, quarterly, yearly, custom
        #[arg(short, long, default_value = "daily")]
        period: String,

        /// Vehicle id (required for vehicle-scoped report types)
        #[arg(short, long)]
        vehicle: Option<String>,

        /// Window start (RFC 3339); default derived from the period
        #[arg(long)]
        start: Option<String>,

        /// Window end (RFC 3339); defaults to now
        #[arg(long)]
        end: Option<String>,

        /// Base URL of the vehicle registry service
        #[arg(long, env = "REGISTRY_URL")]
        registry_url: Option<String>,

        /// Bearer token for the vehicle registry service
        #[arg(long, env = "REGISTRY_TOKEN")]
        registry_token: Option<String>,
    },
    /// Trend rollup for one vehicle and metric
    Trend {
        #[arg(value_name = "FILE")]
        input: String,

        #[arg(short, long)]
        vehicle: String,

        /// Metric type wire name, e.g. fuelEfficiency or utilization
        #[arg(short, long)]
        metric: String,

        /// Grouping interval: day, week, or month
        #[arg(short, long, default_value = "day")]
        interval: String,

        #[arg(long)]
        start: Option<String>,

        #[arg(long)]
        end: Option<String>,
    },
    /// Fleet-wide statistics for one metric
    FleetStats {
        #[arg(value_name = "FILE")]
        input: String,

        #[arg(short, long)]
        metric: String,

        #[arg(long)]
        start: Option<String>,

        #[arg(long)]
        end: Option<String>,
    },
    /// Compare one vehicle against the fleet for one metric
    Compare {
        #[arg(value_name = "FILE")]
        input: String,

        #[arg(short, long)]
        vehicle: String,

        #[arg(short, long)]
        metric: String,

        #[arg(long)]
        start: Option<String>,

        #[arg(long)]
        end: Option<String>,
    },
    /// Export one vehicle's usage buckets to CSV
    Export {
        #[arg(value_name = "FILE")]
        input: String,

        /// CSV file to append bucket rows to
        #[arg(short, long, default_value = "buckets.csv")]
        output: String,

        #[arg(short, long)]
        vehicle: String,

        #[arg(long)]
        start: Option<String>,

        #[arg(long)]
        end: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/fleet_telemetry.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("fleet_telemetry.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse().unwrap()));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse().unwrap()));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();

    let store = Arc::new(MemoryStore::new());
    let pipeline = Pipeline::new(store.clone());

    match cli.command {
        Commands::Consume { input } => {
            replay(&pipeline, &input).await?;
        }
        Commands::Report {
            input,
            report_type,
            period,
            vehicle,
            start,
            end,
            registry_url,
            registry_token,
        } => {
            replay(&pipeline, &input).await?;

            let report_type: ReportType = report_type.parse()?;
            let period: ReportPeriod = period.parse()?;
            let window = report_window(period, start.as_deref(), end.as_deref())?;

            let registry: Arc<dyn VehicleRegistry> = match registry_url {
                Some(url) => Arc::new(HttpVehicleRegistry::new(url, registry_token)?),
                None => Arc::new(NullRegistry),
            };

            let compiler = ReportCompiler::new(store.clone(), registry);
            let report = compiler
                .generate(ReportRequest {
                    report_type,
                    period,
                    window,
                    vehicle_id: vehicle,
                })
                .await?;

            info!(report_id = %report.id, "Report persisted");
            print_json(&report)?;
        }
        Commands::Trend {
            input,
            vehicle,
            metric,
            interval,
            start,
            end,
        } => {
            replay(&pipeline, &input).await?;

            let metric: MetricType = metric.parse()?;
            let interval: TrendInterval = interval.parse()?;
            let range = parse_range(start.as_deref(), end.as_deref())?;

            let engine = AnalyticsEngine::new(store.clone());
            let entries = engine.trend(&vehicle, metric, &range, interval).await?;
            print_json(&entries)?;
        }
        Commands::FleetStats {
            input,
            metric,
            start,
            end,
        } => {
            replay(&pipeline, &input).await?;

            let metric: MetricType = metric.parse()?;
            let range = parse_range(start.as_deref(), end.as_deref())?;

            let engine = AnalyticsEngine::new(store.clone());
            let stats = engine.fleet_stats(metric, &range).await?;
            print_json(&stats)?;
        }
        Commands::Compare {
            input,
            vehicle,
            metric,
            start,
            end,
        } => {
            replay(&pipeline, &input).await?;

            let metric: MetricType = metric.parse()?;
            let range = parse_range(start.as_deref(), end.as_deref())?;

            let engine = AnalyticsEngine::new(store.clone());
            let comparison = engine.compare(&vehicle, metric, &range).await?;
            print_json(&comparison)?;
        }
        Commands::Export {
            input,
            output,
            vehicle,
            start,
            end,
        } => {
            replay(&pipeline, &input).await?;

            let range = parse_range(start.as_deref(), end.as_deref())?;
            let buckets = store.buckets_in_range(&vehicle, &range).await?;
            if buckets.is_empty() {
                warn!(vehicle = %vehicle, "No buckets in range, nothing exported");
            } else {
                export_buckets(&output, &buckets)?;
            }
        }
    }

    Ok(())
}

/// Replays an NDJSON event log through the pipeline, one envelope per line.
///
/// Per-event failures are logged and skipped so a bad line never stops the
/// drain; the summary counts tell the operator what happened.
#[tracing::instrument(skip(pipeline))]
async fn replay(pipeline: &Pipeline, input: &str) -> Result<()> {
    let reader: Box<dyn BufRead> = if input == "-" {
        Box::new(BufReader::new(std::io::stdin()))
    } else {
        Box::new(BufReader::new(File::open(input)?))
    };

    let mut applied = 0usize;
    let mut skipped = 0usize;
    let mut failed = 0usize;

    for (line_no, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        let envelope: EventEnvelope = match serde_json::from_str(&line) {
            Ok(envelope) => envelope,
            Err(e) => {
                error!(line = line_no + 1, error = %e, "Envelope parse failed");
                failed += 1;
                continue;
            }
        };

        match pipeline.handle(&envelope.topic, envelope.payload).await {
            Ok(Handled::Skipped) => skipped += 1,
            Ok(_) => applied += 1,
            Err(e @ TelemetryError::MalformedEvent { .. })
            | Err(e @ TelemetryError::Validation(_)) => {
                warn!(line = line_no + 1, error = %e, "Event rejected");
                failed += 1;
            }
            Err(e) => {
                error!(line = line_no + 1, error = %e, "Event processing failed");
                failed += 1;
            }
        }
    }

    info!(applied, skipped, failed, "Replay complete");
    Ok(())
}

fn parse_ts(s: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(s)?.with_timezone(&Utc))
}

/// Explicit `[start, end]` range; either bound defaults to all of history.
fn parse_range(start: Option<&str>, end: Option<&str>) -> Result<TimeRange> {
    let start = match start {
        Some(s) => parse_ts(s)?,
        None => DateTime::<Utc>::MIN_UTC,
    };
    let end = match end {
        Some(s) => parse_ts(s)?,
        None => DateTime::<Utc>::MAX_UTC,
    };
    Ok(TimeRange::new(start, end))
}

/// Report window: explicit bounds win, otherwise the window ends now and
/// spans one period's worth of time.
fn report_window(
    period: ReportPeriod,
    start: Option<&str>,
    end: Option<&str>,
) -> Result<TimeRange> {
    let end = match end {
        Some(s) => parse_ts(s)?,
        None => Utc::now(),
    };
    let start = match start {
        Some(s) => parse_ts(s)?,
        None => {
            let span = match period {
                ReportPeriod::Daily | ReportPeriod::Custom => Duration::days(1),
                ReportPeriod::Weekly => Duration::weeks(1),
                ReportPeriod::Monthly => Duration::days(30),
                ReportPeriod::Quarterly => Duration::days(90),
                ReportPeriod::Yearly => Duration::days(365),
            };
            end - span
        }
    };
    Ok(TimeRange::new(start, end))
}
