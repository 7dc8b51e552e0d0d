//! School builder
//!
//! Emits one `GAREtab` per member structure, followed by the curriculum
//! tracks and subjects staged for it by the person passes. Every code is
//! checked against the referential before it is emitted, with its label.

use super::common::{entity_label, lookup_all, owned, structure_uai, CodeKey};
use super::{
    check_entity, Attempt, BuildContext, BuildInput, BuildReport, EntityBuilder, SkipReason, Step,
};
use crate::adapters::restriction::is_allowed;
use crate::core::helper::ObjectType;
use crate::core::writer::{GarRecord, PaginatedWriter, SchoolRecord};
use crate::domain::entities::{CurriculumTrack, School, Subject};
use crate::domain::{AttributeRecord, FactType, Result, StaffRole, Uai};
use async_trait::async_trait;
use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;
use std::time::Instant;

const CATEGORY: &str = "Etab";

pub struct SchoolBuilder {
    ctx: Arc<BuildContext>,
    seen: HashSet<Uai>,
}

impl SchoolBuilder {
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
        writer: &mut PaginatedWriter<SchoolRecord>,
        report: &mut BuildReport,
    ) -> Result<Step> {
        let ctx = self.ctx.clone();
        if !is_allowed(
            input.restriction,
            record.optional(&ctx.attributes.structure.join_key),
        ) {
            return Ok(Step::Skipped(SkipReason::Restricted));
        }

        let (uai, school) = match self.identity(record, input) {
            Ok(identity) => identity,
            Err(reason) => return Ok(Step::Skipped(reason)),
        };

        let school = SchoolRecord::School(school);
        if let Err(reason) = check_entity(std::slice::from_ref(&school)) {
            return Ok(Step::Skipped(reason));
        }
        writer.add(school).await?;
        report.records += 1;

        let mut keys = BTreeSet::new();
        for role in [StaffRole::Student, StaffRole::Teacher] {
            for staff in ctx.staging.query_by_uai(&uai, role).await? {
                for fact in &staff.facts {
                    let Some(code) = fact.subject() else { continue };
                    let object_type = match fact.fact_type {
                        FactType::CurriculumTrack => ObjectType::CurriculumTrack,
                        FactType::Discipline | FactType::ClassSubject | FactType::GroupSubject => {
                            ObjectType::Subject
                        }
                    };
                    keys.insert(CodeKey {
                        object_type,
                        code: code.to_string(),
                        source: fact.source_id.clone(),
                    });
                }
            }
        }

        let mut emitted: BTreeSet<(ObjectType, String)> = BTreeSet::new();
        for (key, entry) in lookup_all(&ctx.validator, keys).await? {
            let Some(entry) = entry else {
                tracing::debug!(
                    uai = %uai,
                    object_type = %key.object_type,
                    code = %key.code,
                    source = %key.source,
                    "Code unknown to the referential, not exported"
                );
                report.dropped_references += 1;
                continue;
            };
            if !emitted.insert((key.object_type, entry.code.clone())) {
                continue;
            }

            let record = match key.object_type {
                ObjectType::CurriculumTrack => SchoolRecord::Track(CurriculumTrack {
                    uai: uai.to_string(),
                    code: entry.code,
                    label: entry.label,
                }),
                ObjectType::Subject => SchoolRecord::Subject(Subject {
                    uai: uai.to_string(),
                    code: entry.code,
                    label: entry.label,
                }),
            };
            if let Err(message) = record.check() {
                tracing::warn!(uai = %uai, error = %message, "Referential entry not exported");
                report.dropped_references += 1;
                continue;
            }
            writer.add(record).await?;
            report.records += 1;
        }

        Ok(Step::Emitted)
    }

    fn identity(&mut self, record: &AttributeRecord, input: &BuildInput<'_>) -> Attempt<(Uai, School)> {
        let attrs = &self.ctx.attributes.structure;
        let uai = structure_uai(record, &attrs.uai, input.members)?;
        let name = record.mandatory(&attrs.name)?;

        if !self.seen.insert(uai.clone()) {
            return Err(SkipReason::Duplicate);
        }

        let school = School {
            uai: uai.to_string(),
            name: name.to_string(),
            contract: record
                .optional(&attrs.contract)
                .and_then(|code| self.ctx.helper.resolve_contract(code)),
            phone: owned(record.optional(&attrs.phone)),
            mail: owned(record.optional(&attrs.mail)),
        };
        Ok((uai, school))
    }
}

#[async_trait]
impl EntityBuilder for SchoolBuilder {
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
                &self.ctx.attributes.structure.uai,
                &self.ctx.attributes.structure.join_key,
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
    use crate::adapters::staging::{MemoryStagingStore, StagingStore};
    use crate::core::builders::testing::{context, members, output_of};
    use crate::domain::{Health, PersonId, TeachingFact};
    use tempfile::TempDir;

    fn structure(uai: &str) -> AttributeRecord {
        AttributeRecord::new()
            .with("ENTStructureJointure", &["S1"])
            .with("ENTStructureUAI", &[uai])
            .with("ENTStructureNomCourant", &["Collège Anne de Bretagne"])
            .with("ENTEtablissementContrat", &["pu"])
            .with("telephoneNumber", &["+33 2 99 00 00 00"])
    }

    async fn stage(staging: &MemoryStagingStore, person: &str, role: StaffRole, facts: Vec<TeachingFact>) {
        staging
            .append(
                &Uai::new("0350063D").unwrap(),
                &PersonId::new(person).unwrap(),
                role,
                &facts.into_iter().collect(),
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_school_with_staged_codes() {
        let dir = TempDir::new().unwrap();
        let staging = Arc::new(MemoryStagingStore::new());
        stage(
            &staging,
            "e1",
            StaffRole::Student,
            vec![
                TeachingFact::curriculum_track("AC-RENNES", "10010012110"),
                TeachingFact::discipline("AC-RENNES", "030100"),
                TeachingFact::class_subject("AC-RENNES", "6A", None),
            ],
        )
        .await;
        stage(
            &staging,
            "t1",
            StaffRole::Teacher,
            vec![
                TeachingFact::discipline("AC-RENNES", "L0202"),
                TeachingFact::class_subject("AC-RENNES", "6A", Some("030100")),
                TeachingFact::group_subject("AC-RENNES", "LAT", Some("BOGUS")),
            ],
        )
        .await;

        let mut builder = SchoolBuilder::new(context(dir.path(), staging));
        let records = vec![structure("0350063D")];
        let members = members(&["0350063D"]);
        let report = builder
            .build(BuildInput::new(&records, None, &members), 1)
            .await
            .unwrap();

        assert_eq!(report.emitted, 1);
        // school, one track, two distinct subjects
        assert_eq!(report.records, 4);
        assert_eq!(report.dropped_references, 1);

        let xml = output_of(&report);
        assert!(xml.contains("<GARStructureContrat>PU</GARStructureContrat>"));
        assert!(xml.contains("<GARMEFLibelle>6EME</GARMEFLibelle>"));
        assert_eq!(xml.matches("<GARMatiereCode>030100</GARMatiereCode>").count(), 1);
        assert!(xml.contains("<GARMatiereLibelle>LETTRES MODERNES</GARMatiereLibelle>"));
        assert!(!xml.contains("BOGUS"));
        assert!(xml.find("<GARMEF>").unwrap() < xml.find("<GARMatiere>").unwrap());
    }

    #[tokio::test]
    async fn test_school_skips() {
        let dir = TempDir::new().unwrap();
        let staging = Arc::new(MemoryStagingStore::new());
        let mut builder = SchoolBuilder::new(context(dir.path(), staging));
        let records = vec![
            structure("0290009C"),
            AttributeRecord::new().with("ENTStructureUAI", &["0350063D"]),
            structure("0350063D"),
            structure("0350063D"),
        ];
        let members = members(&["0350063D"]);
        let report = builder
            .build(BuildInput::new(&records, None, &members), 1)
            .await
            .unwrap();

        assert_eq!(report.processed, 4);
        assert_eq!(report.emitted, 1);
        assert_eq!(report.skipped, 3);
        assert_eq!(report.health, Health::Warn);
        assert_eq!(report.issues.len(), 2);
    }

    #[tokio::test]
    async fn test_school_with_oversized_name_is_isolated() {
        let dir = TempDir::new().unwrap();
        let staging = Arc::new(MemoryStagingStore::new());
        let mut builder = SchoolBuilder::new(context(dir.path(), staging));
        let records = vec![
            structure("0290009C").with("ENTStructureNomCourant", &["x".repeat(501).as_str()]),
            structure("0350063D"),
        ];
        let members = members(&["0350063D", "0290009C"]);
        let report = builder
            .build(BuildInput::new(&records, None, &members), 1)
            .await
            .unwrap();

        assert_eq!(report.emitted, 1);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.health, Health::Warn);

        let xml = output_of(&report);
        assert!(xml.contains("<GARStructureUAI>0350063D</GARStructureUAI>"));
        assert!(!xml.contains("0290009C"));
    }
}
