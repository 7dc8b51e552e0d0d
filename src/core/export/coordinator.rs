//! Export coordinator - main orchestrator for the export process
//!
//! This module runs the builder passes in dependency order: pupils and
//! teachers first, since they are the only writers of the staging store,
//! then schools and groups which read it back, then responsible parties.
//! The staging store lives for exactly one run.

use crate::adapters::restriction::RestrictionList;
use crate::adapters::source::{create_index_source, JsonFileSource, Source};
use crate::adapters::staging::{create_staging_store, StagingStore};
use crate::config::GarExportConfig;
use crate::core::builders::{
    BuildContext, BuildInput, BuildReport, EntityBuilder, GroupBuilder, MemberStructures,
    PupilBuilder, ResponsibleBuilder, SchoolBuilder, TeacherBuilder,
};
use crate::core::export::monitor::RunMonitor;
use crate::core::export::summary::ExportSummary;
use crate::core::helper::CodeHelper;
use crate::core::validator::CodeValidator;
use crate::core::writer::WriterSettings;
use crate::domain::{AttributeRecord, GarError, Health, Result, Uai};
use crate::logging::run_span;
use std::sync::Arc;
use std::time::Instant;
use tracing::Instrument;

/// Format of the run timestamp embedded in file names
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Export coordinator
pub struct ExportCoordinator {
    config: GarExportConfig,
    run_id: String,
    timestamp: String,
    staging: Arc<dyn StagingStore>,
    context: Arc<BuildContext>,
    monitor: Arc<RunMonitor>,
}

impl ExportCoordinator {
    /// Create a new export coordinator
    ///
    /// Connects the code index and prepares a fresh staging store.
    ///
    /// # Errors
    ///
    /// Returns an error if the helper configuration is invalid or if the
    /// index or the staging store cannot be set up.
    pub async fn new(config: GarExportConfig) -> Result<Self> {
        Self::with_monitor(config, Arc::new(RunMonitor::tracing())).await
    }

    /// Same as [`ExportCoordinator::new`], reporting to a custom monitor
    pub async fn with_monitor(config: GarExportConfig, monitor: Arc<RunMonitor>) -> Result<Self> {
        let run_id = uuid::Uuid::new_v4().to_string();
        let timestamp = chrono::Local::now().format(TIMESTAMP_FORMAT).to_string();

        let helper = Arc::new(CodeHelper::new(
            &config.profiles,
            &config.index,
            &config.output,
        )?);
        let index = create_index_source(&config.index).await?;
        let validator = Arc::new(CodeValidator::new(index, helper.clone(), &config.index));

        let staging = create_staging_store(&config.staging).await?;
        staging.prepare().await?;

        if !config.application.dry_run {
            tokio::fs::create_dir_all(&config.output.directory)
                .await
                .map_err(|e| {
                    GarError::Io(format!(
                        "Failed to create output directory {}: {}",
                        config.output.directory, e
                    ))
                })?;
        }

        let settings = Arc::new(WriterSettings::from_config(
            &config.output,
            config.application.dry_run,
            timestamp.clone(),
        ));

        let context = Arc::new(BuildContext {
            helper,
            validator,
            staging: staging.clone(),
            attributes: config.attributes.clone(),
            settings,
            monitor: monitor.clone(),
        });

        tracing::info!(
            run_id = %run_id,
            timestamp = %timestamp,
            staging = %staging.backend_name(),
            dry_run = config.application.dry_run,
            "Export coordinator ready"
        );

        Ok(Self {
            config,
            run_id,
            timestamp,
            staging,
            context,
            monitor,
        })
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn monitor(&self) -> &Arc<RunMonitor> {
        &self.monitor
    }

    /// Execute the export
    ///
    /// Fatal errors raised by a pass stop the run; they are recorded in the
    /// summary, whose health is then [`Health::Fatal`]. The staging store is
    /// discarded in every case.
    pub async fn execute_export(&self) -> Result<ExportSummary> {
        let span = run_span(&self.run_id, self.config.application.dry_run);
        self.run().instrument(span).await
    }

    async fn run(&self) -> Result<ExportSummary> {
        let start_time = Instant::now();
        let mut summary = ExportSummary::new(
            &self.run_id,
            &self.timestamp,
            self.config.application.dry_run,
        );

        tracing::info!(run_id = %self.run_id, "Starting export process");

        if let Err(e) = self.run_passes(&mut summary).await {
            tracing::error!(error = %e, "Export aborted");
            self.monitor.degrade(Health::Fatal);
            summary.set_fatal(&e);
        }

        if let Err(e) = self.staging.discard().await {
            tracing::warn!(error = %e, "Failed to discard staging store");
        }

        let summary = summary.with_duration(start_time.elapsed());
        summary.log_summary();
        Ok(summary)
    }

    async fn run_passes(&self, summary: &mut ExportSummary) -> Result<()> {
        let input = &self.config.input;

        let structures = JsonFileSource::new("structures", &input.structures)
            .entries()
            .await?;
        let members = member_structures(
            &structures,
            &self.config.attributes.structure.uai,
            &input.member_structures,
        );
        tracing::info!(count = members.len(), "Member structures");

        let restriction = match &input.restriction {
            Some(path) => Some(RestrictionList::load(path).await?),
            None => None,
        };
        let restriction = restriction.as_ref();

        let ctx = &self.context;

        if let Some(path) = &input.pupils {
            let records = JsonFileSource::new("pupils", path).entries().await?;
            let mut builder = PupilBuilder::new(ctx.clone());
            self.run_pass(&mut builder, &records, restriction, &members, summary)
                .await?;
        }

        if let Some(path) = &input.teachers {
            let records = JsonFileSource::new("teachers", path).entries().await?;
            let mut builder = TeacherBuilder::new(ctx.clone());
            self.run_pass(&mut builder, &records, restriction, &members, summary)
                .await?;
        }

        let mut builder = SchoolBuilder::new(ctx.clone());
        self.run_pass(&mut builder, &structures, restriction, &members, summary)
            .await?;

        let mut builder = GroupBuilder::new(ctx.clone());
        self.run_pass(&mut builder, &structures, restriction, &members, summary)
            .await?;

        if let Some(path) = &input.responsibles {
            let records = JsonFileSource::new("responsibles", path).entries().await?;
            let mut builder = ResponsibleBuilder::new(ctx.clone());
            self.run_pass(&mut builder, &records, restriction, &members, summary)
                .await?;
        }

        Ok(())
    }

    /// Runs one builder over every page of its input
    async fn run_pass(
        &self,
        builder: &mut dyn EntityBuilder,
        records: &[AttributeRecord],
        restriction: Option<&RestrictionList>,
        members: &MemberStructures,
        summary: &mut ExportSummary,
    ) -> Result<()> {
        let mut report = BuildReport::new(builder.category());
        let mut offset = 0;

        for (index, page) in pages(records, self.config.output.entries_per_page)
            .into_iter()
            .enumerate()
        {
            let input =
                BuildInput::new(page, restriction, members).within_pass(offset, records.len());
            offset += page.len();
            report.merge(builder.build(input, index + 1).await?);
        }

        self.monitor.degrade(report.health);
        summary.add_report(report);
        Ok(())
    }
}

/// UAIs of the structures snapshot, restricted to `explicit` when non-empty
pub fn member_structures(
    structures: &[AttributeRecord],
    uai_attribute: &str,
    explicit: &[String],
) -> MemberStructures {
    let explicit: Vec<Uai> = explicit
        .iter()
        .filter_map(|uai| Uai::new(uai.as_str()).ok())
        .collect();

    structures
        .iter()
        .filter_map(|record| record.optional(uai_attribute))
        .filter_map(|value| match Uai::new(value) {
            Ok(uai) => Some(uai),
            Err(e) => {
                tracing::warn!(value = %value, error = %e, "Structure with invalid UAI ignored");
                None
            }
        })
        .filter(|uai| explicit.is_empty() || explicit.contains(uai))
        .collect()
}

/// Splits the input in pages; there is always at least one page
fn pages(records: &[AttributeRecord], entries_per_page: usize) -> Vec<&[AttributeRecord]> {
    if records.is_empty() || entries_per_page == 0 {
        return vec![records];
    }
    records.chunks(entries_per_page).collect()
}
