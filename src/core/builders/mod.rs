//! Entity builders
//!
//! One builder per output category. Each consumes attribute records, a
//! restriction list and the member structures, feeds its own paginated
//! writer and, for the person categories, the staging store.
//!
//! Every entity goes through one step that ends as:
//! - `Ok(Step::Emitted)`: records were handed to the writer
//! - `Ok(Step::Skipped(reason))`: the entity is dropped, the run goes on
//! - `Err(_)`: the run aborts
//!
//! Pupils and teachers must be built before schools and groups: the
//! structure passes only learn memberships and codes through staging.

pub mod common;
pub mod group;
pub mod pupil;
pub mod reconcile;
pub mod responsible;
pub mod school;
pub mod teacher;

pub use group::GroupBuilder;
pub use pupil::PupilBuilder;
pub use reconcile::{reconcile, ClassToken, GroupToken, Reconciliation, SubjectLink};
pub use responsible::ResponsibleBuilder;
pub use school::SchoolBuilder;
pub use teacher::TeacherBuilder;

use crate::adapters::restriction::RestrictionList;
use crate::adapters::staging::StagingStore;
use crate::config::AttributeConfig;
use crate::core::export::monitor::RunMonitor;
use crate::core::helper::CodeHelper;
use crate::core::validator::CodeValidator;
use crate::core::writer::{GarRecord, WriterSettings, WrittenFile};
use crate::domain::{AttributeRecord, Health, MissingAttribute, Result, Uai};
use async_trait::async_trait;
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Why an entity was not emitted
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// Join key absent from the restriction list
    Restricted,
    /// A mandatory attribute is missing or blank
    MissingAttribute(String),
    /// No (school, profile) pair could be resolved
    NoProfile,
    /// The entity only references structures outside the export
    OutOfScope,
    /// The identifier was already emitted in this pass
    Duplicate,
    /// A built record breaks a structural rule of its envelope
    Invalid(String),
}

impl SkipReason {
    /// Whether this skip makes the run partial
    pub fn degrades_health(&self) -> bool {
        matches!(
            self,
            SkipReason::MissingAttribute(_)
                | SkipReason::NoProfile
                | SkipReason::Duplicate
                | SkipReason::Invalid(_)
        )
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::Restricted => f.write_str("not in restriction list"),
            SkipReason::MissingAttribute(attribute) => {
                write!(f, "missing mandatory attribute '{attribute}'")
            }
            SkipReason::NoProfile => f.write_str("no national profile resolved"),
            SkipReason::OutOfScope => f.write_str("no structure in scope"),
            SkipReason::Duplicate => f.write_str("duplicate identifier"),
            SkipReason::Invalid(message) => write!(f, "invalid record: {message}"),
        }
    }
}

impl From<MissingAttribute> for SkipReason {
    fn from(err: MissingAttribute) -> Self {
        SkipReason::MissingAttribute(err.attribute)
    }
}

/// Outcome of one entity
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    Emitted,
    Skipped(SkipReason),
}

/// Shorthand used inside entity steps: a skip is returned as `Err`
pub(crate) type Attempt<T> = std::result::Result<T, SkipReason>;

/// Checks every record of one entity before any of them is written or staged
///
/// A violation here skips the entity alone. The writer still checks each
/// envelope on flush, where a violation is fatal.
pub(crate) fn check_entity<R: GarRecord>(records: &[R]) -> Attempt<()> {
    records
        .iter()
        .try_for_each(GarRecord::check)
        .map_err(SkipReason::Invalid)
}

/// UAIs legitimately part of this export
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemberStructures(BTreeSet<Uai>);

impl MemberStructures {
    pub fn contains(&self, uai: &Uai) -> bool {
        self.0.contains(uai)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Uai> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<Uai> for MemberStructures {
    fn from_iter<I: IntoIterator<Item = Uai>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// One page of input for a builder
#[derive(Clone, Copy)]
pub struct BuildInput<'a> {
    pub records: &'a [AttributeRecord],
    pub restriction: Option<&'a RestrictionList>,
    pub members: &'a MemberStructures,
    /// Entries of the pass read before this page
    pub offset: usize,
    /// Entries of the whole pass
    pub pass_total: usize,
}

impl<'a> BuildInput<'a> {
    /// A page holding the whole pass
    pub fn new(
        records: &'a [AttributeRecord],
        restriction: Option<&'a RestrictionList>,
        members: &'a MemberStructures,
    ) -> Self {
        Self {
            records,
            restriction,
            members,
            offset: 0,
            pass_total: records.len(),
        }
    }

    /// Places this page inside a pass of `pass_total` entries
    pub fn within_pass(mut self, offset: usize, pass_total: usize) -> Self {
        self.offset = offset;
        self.pass_total = pass_total;
        self
    }

    /// Reports progress for the entity at `position` in this page
    ///
    /// The percentage covers the whole pass, not the page.
    pub fn report_progress(&self, monitor: &RunMonitor, position: usize, label: &str) {
        let total = self.pass_total.max(self.offset + self.records.len());
        monitor.progress(self.offset + position + 1, total, label);
    }
}

/// Collaborators shared by every builder of a run
pub struct BuildContext {
    pub helper: Arc<CodeHelper>,
    pub validator: Arc<CodeValidator>,
    pub staging: Arc<dyn StagingStore>,
    pub attributes: AttributeConfig,
    pub settings: Arc<WriterSettings>,
    pub monitor: Arc<RunMonitor>,
}

/// Counters of one builder pass
#[derive(Debug, Clone, Default, Serialize)]
pub struct BuildReport {
    pub category: String,
    /// Entities read
    pub processed: usize,
    /// Entities emitted
    pub emitted: usize,
    /// Entities filtered by the restriction list
    pub restricted: usize,
    /// Entities dropped for any other reason
    pub skipped: usize,
    /// Records handed to the writer, links included
    pub records: usize,
    /// References dropped by policy (invalid codes, conflicts, out of scope)
    pub dropped_references: usize,
    pub files: Vec<WrittenFile>,
    /// Warnings worth a line in the run summary
    pub issues: Vec<String>,
    pub health: Health,
    #[serde(skip)]
    pub duration: Duration,
}

impl BuildReport {
    pub fn new(category: &str) -> Self {
        Self {
            category: category.to_string(),
            ..Self::default()
        }
    }

    /// Accounts for one entity step
    pub fn record_step(&mut self, label: &str, step: &Step) {
        self.processed += 1;
        match step {
            Step::Emitted => self.emitted += 1,
            Step::Skipped(SkipReason::Restricted) => {
                self.restricted += 1;
                tracing::debug!(
                    category = %self.category,
                    entity = %label,
                    "Entity not in restriction list"
                );
            }
            Step::Skipped(reason) => {
                self.skipped += 1;
                crate::log_entity_skipped!(self.category, label, reason);
                if reason.degrades_health() {
                    self.health = self.health.worsen(Health::Warn);
                    self.issues.push(format!("{} {}: {}", self.category, label, reason));
                }
            }
        }
    }

    /// Merges the report of another page of the same category
    pub fn merge(&mut self, other: BuildReport) {
        self.processed += other.processed;
        self.emitted += other.emitted;
        self.restricted += other.restricted;
        self.skipped += other.skipped;
        self.records += other.records;
        self.dropped_references += other.dropped_references;
        self.files.extend(other.files);
        self.issues.extend(other.issues);
        self.health = self.health.worsen(other.health);
        self.duration += other.duration;
    }
}

/// A builder for one output category
#[async_trait]
pub trait EntityBuilder: Send {
    /// Category name, also used in output file names
    fn category(&self) -> &'static str;

    /// Builds one page of entities and flushes its writer
    ///
    /// # Errors
    ///
    /// Only fatal conditions are returned: index failures, staging
    /// failures, schema violations and I/O errors.
    async fn build(&mut self, input: BuildInput<'_>, page: usize) -> Result<BuildReport>;
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skip_reason_health() {
        assert!(!SkipReason::Restricted.degrades_health());
        assert!(!SkipReason::OutOfScope.degrades_health());
        assert!(SkipReason::NoProfile.degrades_health());
        assert!(SkipReason::Duplicate.degrades_health());
        assert!(SkipReason::from(MissingAttribute::new("sn")).degrades_health());
        assert!(SkipReason::Invalid("GARPersonNom is blank".into()).degrades_health());
    }

    #[test]
    fn test_progress_covers_whole_pass() {
        use crate::core::export::monitor::ProgressSink;
        use std::sync::Mutex;

        #[derive(Default)]
        struct Recorder(Mutex<Vec<u8>>);

        impl ProgressSink for Recorder {
            fn progress(&self, percent: u8, _label: &str) {
                self.0.lock().unwrap().push(percent);
            }

            fn health_changed(&self, _health: Health) {}
        }

        let recorder = Arc::new(Recorder::default());
        let monitor = RunMonitor::new(recorder.clone());
        let records = vec![AttributeRecord::new(); 2];
        let members = MemberStructures::default();

        let second_page = BuildInput::new(&records, None, &members).within_pass(2, 4);
        second_page.report_progress(&monitor, 0, "c");
        second_page.report_progress(&monitor, 1, "d");

        assert_eq!(*recorder.0.lock().unwrap(), vec![75, 100]);
    }

    #[test]
    fn test_report_counts_steps() {
        let mut report = BuildReport::new("Eleve");
        report.record_step("a", &Step::Emitted);
        report.record_step("b", &Step::Skipped(SkipReason::Restricted));
        report.record_step("c", &Step::Skipped(SkipReason::OutOfScope));
        assert_eq!(report.health, Health::Ok);

        report.record_step("d", &Step::Skipped(SkipReason::MissingAttribute("sn".into())));
        assert_eq!(report.processed, 4);
        assert_eq!(report.emitted, 1);
        assert_eq!(report.restricted, 1);
        assert_eq!(report.skipped, 2);
        assert_eq!(report.health, Health::Warn);
        assert_eq!(report.issues, vec!["Eleve d: missing mandatory attribute 'sn'"]);
    }

    #[test]
    fn test_report_merge() {
        let mut first = BuildReport::new("Etab");
        first.record_step("a", &Step::Emitted);
        let mut second = BuildReport::new("Etab");
        second.record_step("b", &Step::Skipped(SkipReason::NoProfile));

        first.merge(second);
        assert_eq!(first.processed, 2);
        assert_eq!(first.health, Health::Warn);
    }
}
