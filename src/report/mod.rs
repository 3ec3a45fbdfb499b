//! Report compilation and snapshot types.
//!
//! The compiler stitches aggregate results and registry metadata into
//! immutable, versioned report snapshots.

pub mod compiler;
pub mod types;

pub use compiler::{ReportCompiler, ReportRequest};
pub use types::{AnalyticsReport, ReportPeriod, ReportType};
