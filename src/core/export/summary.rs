//! Export summary and reporting
//!
//! This module defines the structure reporting the result of one export run.

use crate::core::builders::BuildReport;
use crate::core::writer::WrittenFile;
use crate::domain::Health;
use serde::Serialize;
use std::time::Duration;

/// Summary of an export run
#[derive(Debug, Clone, Serialize)]
pub struct ExportSummary {
    /// Run identifier
    pub run_id: String,

    /// Run timestamp, as embedded in file names
    pub timestamp: String,

    /// Files were validated but not written
    pub dry_run: bool,

    /// One report per category, in pass order
    pub categories: Vec<BuildReport>,

    /// Final run health
    pub health: Health,

    /// Error that aborted the run, if any
    pub fatal_error: Option<String>,

    /// Duration of the run
    #[serde(skip)]
    pub duration: Duration,
}

impl ExportSummary {
    /// Create a new empty export summary
    pub fn new(run_id: impl Into<String>, timestamp: impl Into<String>, dry_run: bool) -> Self {
        Self {
            run_id: run_id.into(),
            timestamp: timestamp.into(),
            dry_run,
            categories: Vec::new(),
            health: Health::Ok,
            fatal_error: None,
            duration: Duration::from_secs(0),
        }
    }

    /// Set the duration
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    /// Adds the merged report of one category
    pub fn add_report(&mut self, report: BuildReport) {
        self.health = self.health.worsen(report.health);
        self.categories.push(report);
    }

    /// Records the error that aborted the run
    pub fn set_fatal(&mut self, error: impl ToString) {
        self.health = Health::Fatal;
        self.fatal_error = Some(error.to_string());
    }

    /// Report of one category
    pub fn report(&self, category: &str) -> Option<&BuildReport> {
        self.categories.iter().find(|report| report.category == category)
    }

    /// Every file produced by the run
    pub fn files(&self) -> impl Iterator<Item = &WrittenFile> {
        self.categories.iter().flat_map(|report| report.files.iter())
    }

    /// Every issue raised by the run
    pub fn issues(&self) -> impl Iterator<Item = &String> {
        self.categories.iter().flat_map(|report| report.issues.iter())
    }

    pub fn total_emitted(&self) -> usize {
        self.categories.iter().map(|report| report.emitted).sum()
    }

    pub fn total_skipped(&self) -> usize {
        self.categories.iter().map(|report| report.skipped).sum()
    }

    /// Check if the run completed without any degradation
    pub fn is_successful(&self) -> bool {
        self.health == Health::Ok
    }

    /// Log the summary
    pub fn log_summary(&self) {
        tracing::info!(
            run_id = %self.run_id,
            timestamp = %self.timestamp,
            health = %self.health,
            emitted = self.total_emitted(),
            skipped = self.total_skipped(),
            files = self.files().count(),
            duration_secs = self.duration.as_secs(),
            dry_run = self.dry_run,
            "Export completed"
        );

        for report in &self.categories {
            tracing::info!(
                category = %report.category,
                processed = report.processed,
                emitted = report.emitted,
                restricted = report.restricted,
                skipped = report.skipped,
                records = report.records,
                dropped_references = report.dropped_references,
                files = report.files.len(),
                health = %report.health,
                "Category summary"
            );
        }

        for issue in self.issues() {
            tracing::warn!(issue = %issue, "Export issue");
        }

        if let Some(error) = &self.fatal_error {
            tracing::error!(error = %error, "Export aborted");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::builders::{SkipReason, Step};

    #[test]
    fn test_new_summary() {
        let summary = ExportSummary::new("run", "20260101_120000", false);
        assert_eq!(summary.health, Health::Ok);
        assert!(summary.is_successful());
        assert_eq!(summary.files().count(), 0);
    }

    #[test]
    fn test_reports_drive_health() {
        let mut summary = ExportSummary::new("run", "20260101_120000", false);

        let mut pupils = BuildReport::new("Eleve");
        pupils.record_step("e1", &Step::Emitted);
        summary.add_report(pupils);
        assert!(summary.is_successful());

        let mut teachers = BuildReport::new("Enseignant");
        teachers.record_step("t1", &Step::Skipped(SkipReason::NoProfile));
        summary.add_report(teachers);

        assert_eq!(summary.health, Health::Warn);
        assert_eq!(summary.total_emitted(), 1);
        assert_eq!(summary.total_skipped(), 1);
        assert_eq!(summary.issues().count(), 1);
        assert!(summary.report("Enseignant").is_some());
    }

    #[test]
    fn test_fatal() {
        let mut summary = ExportSummary::new("run", "20260101_120000", true);
        summary.set_fatal("index unreachable");
        assert_eq!(summary.health, Health::Fatal);
        assert_eq!(summary.fatal_error.as_deref(), Some("index unreachable"));
    }
}
