//! Teacher builder
//!
//! Emits `GAREnseignant` records and their post disciplines. Profiles are
//! resolved per school from the function listed for that school, falling
//! back to the title. Disciplines and class/group teaching assignments are
//! staged for the structure passes.

use super::common::{
    attachment, birth_date, entity_label, functions_by_school, owned, person_id,
    profile_assignments, scoped_schools, scoped_tokens,
};
use super::{
    check_entity, Attempt, BuildContext, BuildInput, BuildReport, EntityBuilder, SkipReason, Step,
};
use crate::adapters::restriction::is_allowed;
use crate::core::writer::{PaginatedWriter, TeacherRecord};
use crate::domain::entities::{Teacher, TeacherDiscipline};
use crate::domain::{AttributeRecord, PersonId, Result, StaffRole, TeachingFact, Uai};
use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::Arc;
use std::time::Instant;

const CATEGORY: &str = "Enseignant";

pub struct TeacherBuilder {
    ctx: Arc<BuildContext>,
    seen: HashSet<String>,
}

impl TeacherBuilder {
    pub fn new(ctx: Arc<BuildContext>) -> Self {
        Self {
            ctx,
            seen: HashSet::new(),
        }
    }

    async fn build_one(
        &mut self,
        record: &AttributeRecord,
        input: &BuildInput<'_>,
        writer: &mut PaginatedWriter<TeacherRecord>,
        report: &mut BuildReport,
    ) -> Result<Step> {
        let ctx = self.ctx.clone();
        let attrs = &ctx.attributes.teacher;
        if !is_allowed(input.restriction, record.optional(&attrs.join_key)) {
            return Ok(Step::Skipped(SkipReason::Restricted));
        }

        let (person_id, teacher) = match self.identity(record, input, report) {
            Ok(identity) => identity,
            Err(reason) => return Ok(Step::Skipped(reason)),
        };
        let source = record.optional(&attrs.source).unwrap_or_default();

        let mut facts: BTreeMap<Uai, BTreeSet<TeachingFact>> = BTreeMap::new();
        let mut disciplines = Vec::new();

        for token in scoped_tokens(record, &attrs.disciplines, input.members, report) {
            let Some(code) = token.field(0) else { continue };
            facts
                .entry(token.uai().clone())
                .or_default()
                .insert(TeachingFact::discipline(source, code));
            disciplines.push(TeacherRecord::Discipline(TeacherDiscipline {
                uai: token.uai().to_string(),
                person_id: person_id.to_string(),
                discipline_code: code.to_string(),
            }));
        }

        for token in scoped_tokens(record, &attrs.class_subjects, input.members, report) {
            if let Some(division) = token.field(0) {
                facts
                    .entry(token.uai().clone())
                    .or_default()
                    .insert(TeachingFact::class_subject(source, division, token.field(1)));
            }
        }

        for token in scoped_tokens(record, &attrs.group_subjects, input.members, report) {
            if let Some(group) = token.field(0) {
                facts
                    .entry(token.uai().clone())
                    .or_default()
                    .insert(TeachingFact::group_subject(source, group, token.field(1)));
            }
        }

        let mut entity = vec![TeacherRecord::Teacher(teacher)];
        entity.extend(disciplines);
        if let Err(reason) = check_entity(&entity) {
            return Ok(Step::Skipped(reason));
        }

        for record in entity {
            writer.add(record).await?;
            report.records += 1;
        }

        for (uai, facts) in facts.iter().filter(|(_, facts)| !facts.is_empty()) {
            ctx.staging
                .append(uai, &person_id, StaffRole::Teacher, facts)
                .await?;
        }

        Ok(Step::Emitted)
    }

    /// Identity, schools and per-school profiles of a teacher
    fn identity(
        &mut self,
        record: &AttributeRecord,
        input: &BuildInput<'_>,
        report: &mut BuildReport,
    ) -> Attempt<(PersonId, Teacher)> {
        let attrs = &self.ctx.attributes.teacher;
        let person_id = person_id(record, &attrs.person_id)?;
        let last_name = record.mandatory(&attrs.last_name)?;
        let first_name = record.mandatory(&attrs.first_name)?;

        let schools = scoped_schools(record, &attrs.schools, input.members, report);
        if schools.is_empty() {
            return Err(SkipReason::OutOfScope);
        }

        let function_tokens = scoped_tokens(record, &attrs.functions, input.members, report);
        let functions = functions_by_school(&function_tokens);
        let title = record.optional(&attrs.title);
        let helper = &self.ctx.helper;
        let profiles = profile_assignments(&schools, |uai| {
            helper.resolve_profile(title, functions.get(uai).copied())
        });
        if profiles.is_empty() {
            return Err(SkipReason::NoProfile);
        }

        if !self.seen.insert(person_id.to_string()) {
            return Err(SkipReason::Duplicate);
        }

        let teacher = Teacher {
            person_id: person_id.to_string(),
            profiles,
            last_name: last_name.to_string(),
            first_name: first_name.to_string(),
            civility: owned(record.optional(&attrs.civility)),
            attachment: attachment(record, &attrs.attachment, &schools),
            birth_date: birth_date(record, &attrs.birth_date),
            mails: record.values(&attrs.mail).map(str::to_string).collect(),
            schools: schools.iter().map(Uai::to_string).collect(),
        };
        Ok((person_id, teacher))
    }
}

#[async_trait]
impl EntityBuilder for TeacherBuilder {
    fn category(&self) -> &'static str {
        CATEGORY
    }

    async fn build(&mut self, input: BuildInput<'_>, page: usize) -> Result<BuildReport> {
        let start = Instant::now();
        let mut report = BuildReport::new(CATEGORY);
        let mut writer =
            PaginatedWriter::new(self.ctx.helper.clone(), self.ctx.settings.clone(), page);
        let total = input.records.len();
        crate::log_builder_start!(CATEGORY, page, total);

        for (position, record) in input.records.iter().enumerate() {
            let label = entity_label(
                record,
                &self.ctx.attributes.teacher.person_id,
                &self.ctx.attributes.teacher.join_key,
            );
            crate::log_entity_progress!(CATEGORY, position + 1, total, label);
            input.report_progress(&self.ctx.monitor, position, &label);

            let step = self.build_one(record, &input, &mut writer, &mut report).await?;
            report.record_step(&label, &step);
        }

        report.files = writer.flush().await?;
        report.duration = start.elapsed();
        crate::log_builder_complete!(CATEGORY, report.emitted, report.skipped, report.duration);
        Ok(report)
    }
}
