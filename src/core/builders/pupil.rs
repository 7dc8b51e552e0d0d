//! Pupil builder
//!
//! Emits `GAREleve` records with their validated curriculum tracks and
//! subjects, and stages every track, subject, class and group membership
//! for the structure passes.

use super::common::{
    attachment, birth_date, entity_label, owned, person_id, profile_assignments, scoped_schools,
    scoped_tokens,
};
use super::{
    check_entity, Attempt, BuildContext, BuildInput, BuildReport, EntityBuilder, SkipReason, Step,
};
use crate::adapters::restriction::is_allowed;
use crate::core::helper::ObjectType;
use crate::core::writer::{PaginatedWriter, PupilRecord};
use crate::domain::entities::{Pupil, PupilSubject, PupilTrack};
use crate::domain::{AttributeRecord, PersonId, Result, StaffRole, TeachingFact, Uai};
use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::Arc;
use std::time::Instant;

const CATEGORY: &str = "Eleve";

pub struct PupilBuilder {
    ctx: Arc<BuildContext>,
    seen: HashSet<String>,
}

impl PupilBuilder {
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
        writer: &mut PaginatedWriter<PupilRecord>,
        report: &mut BuildReport,
    ) -> Result<Step> {
        let ctx = self.ctx.clone();
        let attrs = &ctx.attributes.pupil;
        if !is_allowed(input.restriction, record.optional(&attrs.join_key)) {
            return Ok(Step::Skipped(SkipReason::Restricted));
        }

        let (person_id, pupil) = match self.identity(record, input, report) {
            Ok(identity) => identity,
            Err(reason) => return Ok(Step::Skipped(reason)),
        };
        let source = record.optional(&attrs.source).unwrap_or_default();
        let person = person_id.to_string();

        let mut facts: BTreeMap<Uai, BTreeSet<TeachingFact>> = BTreeMap::new();
        let mut links = Vec::new();

        for token in scoped_tokens(record, &attrs.tracks, input.members, report) {
            let Some(code) = token.field(0) else { continue };
            if ctx
                .validator
                .is_code_valid(source, ObjectType::CurriculumTrack, code)
                .await?
            {
                facts
                    .entry(token.uai().clone())
                    .or_default()
                    .insert(TeachingFact::curriculum_track(source, code));
                links.push(PupilRecord::Track(PupilTrack {
                    uai: token.uai().to_string(),
                    person_id: person.clone(),
                    track_code: code.to_string(),
                }));
            } else {
                report.dropped_references += 1;
            }
        }

        for token in scoped_tokens(record, &attrs.subjects, input.members, report) {
            let Some(code) = token.field(0) else { continue };
            if ctx
                .validator
                .is_code_valid(source, ObjectType::Subject, code)
                .await?
            {
                facts
                    .entry(token.uai().clone())
                    .or_default()
                    .insert(TeachingFact::discipline(source, code));
                links.push(PupilRecord::Subject(PupilSubject {
                    uai: token.uai().to_string(),
                    person_id: person.clone(),
                    subject_code: code.to_string(),
                }));
            } else {
                report.dropped_references += 1;
            }
        }

        for token in scoped_tokens(record, &attrs.classes, input.members, report) {
            if let Some(division) = token.field(0) {
                facts
                    .entry(token.uai().clone())
                    .or_default()
                    .insert(TeachingFact::class_subject(source, division, None));
            }
        }

        for token in scoped_tokens(record, &attrs.groups, input.members, report) {
            if let Some(group) = token.field(0) {
                facts
                    .entry(token.uai().clone())
                    .or_default()
                    .insert(TeachingFact::group_subject(source, group, None));
            }
        }

        let mut entity = vec![PupilRecord::Pupil(pupil)];
        entity.extend(links);
        if let Err(reason) = check_entity(&entity) {
            return Ok(Step::Skipped(reason));
        }

        for record in entity {
            writer.add(record).await?;
            report.records += 1;
        }

        for (uai, facts) in facts.iter().filter(|(_, facts)| !facts.is_empty()) {
            ctx.staging
                .append(uai, &person_id, StaffRole::Student, facts)
                .await?;
        }

        Ok(Step::Emitted)
    }

    /// Identity, schools and profiles of a pupil
    fn identity(
        &mut self,
        record: &AttributeRecord,
        input: &BuildInput<'_>,
        report: &mut BuildReport,
    ) -> Attempt<(PersonId, Pupil)> {
        let attrs = &self.ctx.attributes.pupil;
        let person_id = person_id(record, &attrs.person_id)?;
        let last_name = record.mandatory(&attrs.last_name)?;
        let first_name = record.mandatory(&attrs.first_name)?;

        let schools = scoped_schools(record, &attrs.schools, input.members, report);
        if schools.is_empty() {
            return Err(SkipReason::OutOfScope);
        }

        let title = record
            .optional(&attrs.title)
            .unwrap_or(self.ctx.helper.pupil_title());
        let helper = &self.ctx.helper;
        let profiles = profile_assignments(&schools, |_| helper.resolve_profile(Some(title), None));
        if profiles.is_empty() {
            return Err(SkipReason::NoProfile);
        }

        if !self.seen.insert(person_id.to_string()) {
            return Err(SkipReason::Duplicate);
        }

        let pupil = Pupil {
            person_id: person_id.to_string(),
            profiles,
            last_name: last_name.to_string(),
            first_name: first_name.to_string(),
            civility: owned(record.optional(&attrs.civility)),
            attachment: attachment(record, &attrs.attachment, &schools),
            birth_date: birth_date(record, &attrs.birth_date),
            schools: schools.iter().map(Uai::to_string).collect(),
        };
        Ok((person_id, pupil))
    }
}

#[async_trait]
impl EntityBuilder for PupilBuilder {
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
                &self.ctx.attributes.pupil.person_id,
                &self.ctx.attributes.pupil.join_key,
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::restriction::RestrictionList;
    use crate::adapters::staging::{MemoryStagingStore, StagingStore};
    use crate::core::builders::testing::{context, members, output_of};
    use crate::domain::{FactType, Health};
    use tempfile::TempDir;

    fn pupil(uid: &str) -> AttributeRecord {
        AttributeRecord::new()
            .with("ENTPersonJointure", &[format!("AAF-{uid}").as_str()])
            .with("uid", &[uid])
            .with("ENTPersonSource", &["AC-RENNES"])
            .with("sn", &["Martin"])
            .with("givenName", &["Léa"])
            .with("ENTPersonDateNaissance", &["04/03/2012"])
            .with("ESCOUAI", &["0350063D"])
            .with("ENTPersonStructRattach", &["0350063D"])
            .with("ENTEleveClasses", &["0350063D$6A$6ème A"])
            .with("ENTEleveGroupes", &["0350063D$LATIN$Latin"])
            .with("ENTEleveMEF", &["0350063D$10010012110", "0350063D$99999999999"])
            .with("ENTEleveCodeEnseignements", &["0350063D$030100"])
    }

    #[tokio::test]
    async fn test_pupil_emitted_and_staged() {
        let dir = TempDir::new().unwrap();
        let staging = Arc::new(MemoryStagingStore::new());
        let mut builder = PupilBuilder::new(context(dir.path(), staging.clone()));
        let members = members(&["0350063D"]);
        let records = vec![pupil("e1")];

        let report = builder
            .build(BuildInput::new(&records, None, &members), 1)
            .await
            .unwrap();

        assert_eq!(report.emitted, 1);
        assert_eq!(report.records, 3);
        assert_eq!(report.dropped_references, 1);
        assert_eq!(report.health, Health::Ok);

        let xml = output_of(&report);
        assert!(xml.contains("<GARPersonIdentifiant>e1</GARPersonIdentifiant>"));
        assert!(xml.contains("<GARPersonProfil>National_elv</GARPersonProfil>"));
        assert!(xml.contains("<GARPersonDateNaissance>2012-03-04</GARPersonDateNaissance>"));
        assert!(xml.contains("<GARMEFCode>10010012110</GARMEFCode>"));
        assert!(!xml.contains("99999999999"));
        assert!(xml.contains("<GARMatiereCode>030100</GARMatiereCode>"));

        let staff = staging
            .query_by_uai(&Uai::new("0350063D").unwrap(), StaffRole::Student)
            .await
            .unwrap();
        assert_eq!(staff.len(), 1);
        assert_eq!(staff[0].facts_of(FactType::CurriculumTrack).count(), 1);
        assert_eq!(staff[0].facts_of(FactType::Discipline).count(), 1);
        assert_eq!(staff[0].facts_of(FactType::ClassSubject).count(), 1);
        assert_eq!(staff[0].facts_of(FactType::GroupSubject).count(), 1);
    }

    #[tokio::test]
    async fn test_missing_mandatory_attribute_skips_with_warn() {
        let dir = TempDir::new().unwrap();
        let staging = Arc::new(MemoryStagingStore::new());
        let mut builder = PupilBuilder::new(context(dir.path(), staging.clone()));
        let members = members(&["0350063D"]);

        let mut nameless = pupil("e2");
        nameless.insert("sn", vec![]);
        let records = vec![nameless, pupil("e1")];

        let report = builder
            .build(BuildInput::new(&records, None, &members), 1)
            .await
            .unwrap();

        assert_eq!(report.emitted, 1);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.health, Health::Warn);
        assert!(!output_of(&report).contains("<GARPersonIdentifiant>e2<"));
        assert_eq!(staging.len().await, 1);
    }

    #[tokio::test]
    async fn test_restricted_and_out_of_scope_do_not_degrade() {
        let dir = TempDir::new().unwrap();
        let staging = Arc::new(MemoryStagingStore::new());
        let mut builder = PupilBuilder::new(context(dir.path(), staging));
        let members = members(&["0290009C"]);
        let restriction = RestrictionList::from_ids(["AAF-e1"]);
        let records = vec![pupil("e1"), pupil("e2")];

        let report = builder
            .build(BuildInput::new(&records, Some(&restriction), &members), 1)
            .await
            .unwrap();

        assert_eq!(report.restricted, 1);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.emitted, 0);
        assert_eq!(report.health, Health::Ok);
        assert_eq!(report.files.len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_title_drops_pupil() {
        let dir = TempDir::new().unwrap();
        let staging = Arc::new(MemoryStagingStore::new());
        let mut builder = PupilBuilder::new(context(dir.path(), staging));
        let members = members(&["0350063D"]);
        let records = vec![pupil("e1").with("title", &["ASTRONAUTE"])];

        let report = builder
            .build(BuildInput::new(&records, None, &members), 1)
            .await
            .unwrap();

        assert_eq!(report.skipped, 1);
        assert_eq!(report.health, Health::Warn);
    }

    #[tokio::test]
    async fn test_duplicate_pupil() {
        let dir = TempDir::new().unwrap();
        let staging = Arc::new(MemoryStagingStore::new());
        let mut builder = PupilBuilder::new(context(dir.path(), staging));
        let members = members(&["0350063D"]);
        let records = vec![pupil("e1"), pupil("e1")];

        let report = builder
            .build(BuildInput::new(&records, None, &members), 1)
            .await
            .unwrap();

        assert_eq!(report.emitted, 1);
        assert_eq!(report.skipped, 1);
    }

    #[tokio::test]
    async fn test_oversized_identifier_skips_only_that_pupil() {
        let dir = TempDir::new().unwrap();
        let staging = Arc::new(MemoryStagingStore::new());
        let mut builder = PupilBuilder::new(context(dir.path(), staging.clone()));
        let members = members(&["0350063D"]);
        let long_id = "x".repeat(65);
        let records = vec![pupil("e1"), pupil(&long_id), pupil("e3")];

        let report = builder
            .build(BuildInput::new(&records, None, &members), 1)
            .await
            .unwrap();

        assert_eq!(report.emitted, 2);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.health, Health::Warn);
        assert!(report.issues[0].contains("GARPersonIdentifiant is longer than 64 characters"));

        let xml = output_of(&report);
        assert!(xml.contains("<GARPersonIdentifiant>e1</GARPersonIdentifiant>"));
        assert!(xml.contains("<GARPersonIdentifiant>e3</GARPersonIdentifiant>"));
        assert!(!xml.contains(&long_id));

        let staff = staging
            .query_by_uai(&Uai::new("0350063D").unwrap(), StaffRole::Student)
            .await
            .unwrap();
        assert_eq!(staff.len(), 2);
        assert!(staff.iter().all(|person| person.person_id.to_string() != long_id));
    }
}
