//! Export orchestration
//!
//! This module provides the run-level logic of the exporter:
//! - Pass ordering and pagination
//! - Progress and health reporting
//! - Summary and reporting

pub mod coordinator;
pub mod monitor;
pub mod summary;

pub use coordinator::{member_structures, ExportCoordinator, TIMESTAMP_FORMAT};
pub use monitor::{ProgressSink, RunMonitor, TracingProgressSink};
pub use summary::ExportSummary;
