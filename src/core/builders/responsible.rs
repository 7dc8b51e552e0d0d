//! Responsible party builder
//!
//! Emits `GARRespAff` records: staff affiliated to schools who manage
//! resource assignments. They are not staged.

use super::common::{
    entity_label, functions_by_school, owned, person_id, profile_assignments, scoped_schools,
    scoped_tokens,
};
use super::{
    check_entity, Attempt, BuildContext, BuildInput, BuildReport, EntityBuilder, SkipReason, Step,
};
use crate::adapters::restriction::is_allowed;
use crate::core::writer::{PaginatedWriter, ResponsibleRecord};
use crate::domain::entities::ResponsibleParty;
use crate::domain::{AttributeRecord, Result, Uai};
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

const CATEGORY: &str = "RespAff";

pub struct ResponsibleBuilder {
    ctx: Arc<BuildContext>,
    seen: HashSet<String>,
}

impl ResponsibleBuilder {
    pub fn new(ctx: Arc<BuildContext>) -> Self {
        Self {
            ctx,
            seen: HashSet::new(),
        }
    }

    fn build_one(
        &mut self,
        record: &AttributeRecord,
        input: &BuildInput<'_>,
        report: &mut BuildReport,
    ) -> Attempt<ResponsibleRecord> {
        let attrs = &self.ctx.attributes.responsible;
        if !is_allowed(input.restriction, record.optional(&attrs.join_key)) {
            return Err(SkipReason::Restricted);
        }

        let person_id = person_id(record, &attrs.person_id)?;
        let last_name = record.mandatory(&attrs.last_name)?;
        let first_name = record.mandatory(&attrs.first_name)?;
        let mail = record.mandatory(&attrs.mail)?;

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

        let responsible = ResponsibleRecord::Responsible(ResponsibleParty {
            person_id: person_id.to_string(),
            profiles,
            last_name: last_name.to_string(),
            first_name: first_name.to_string(),
            civility: owned(record.optional(&attrs.civility)),
            mail: mail.to_string(),
            schools: schools.iter().map(Uai::to_string).collect(),
        });
        check_entity(std::slice::from_ref(&responsible))?;
        Ok(responsible)
    }
}

#[async_trait]
impl EntityBuilder for ResponsibleBuilder {
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
                &self.ctx.attributes.responsible.person_id,
                &self.ctx.attributes.responsible.join_key,
            );
            crate::log_entity_progress!(CATEGORY, position + 1, total, label);
            input.report_progress(&self.ctx.monitor, position, &label);

            let step = match self.build_one(record, &input, &mut report) {
                Ok(responsible) => {
                    writer.add(responsible).await?;
                    report.records += 1;
                    Step::Emitted
                }
                Err(reason) => Step::Skipped(reason),
            };
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
    use crate::adapters::staging::MemoryStagingStore;
    use crate::core::builders::testing::{context, members, output_of};
    use crate::domain::Health;
    use tempfile::TempDir;

    fn responsible(uid: &str) -> AttributeRecord {
        AttributeRecord::new()
            .with("ENTPersonJointure", &[format!("J-{uid}").as_str()])
            .with("uid", &[uid])
            .with("sn", &["Leroy"])
            .with("givenName", &["Anne"])
            .with("mail", &["anne.leroy@ac-rennes.fr"])
            .with("ESCOUAI", &["0350063D"])
            .with("ENTPersonFonctions", &["0350063D$DOC"])
    }

    async fn build(
        records: Vec<AttributeRecord>,
        restriction: Option<&RestrictionList>,
    ) -> (BuildReport, String) {
        let dir = TempDir::new().unwrap();
        let mut builder =
            ResponsibleBuilder::new(context(dir.path(), Arc::new(MemoryStagingStore::new())));
        let members = members(&["0350063D"]);
        let report = builder
            .build(BuildInput::new(&records, restriction, &members), 1)
            .await
            .unwrap();
        let xml = output_of(&report);
        (report, xml)
    }

    #[tokio::test]
    async fn test_responsible_emitted() {
        let (report, xml) = build(vec![responsible("r1")], None).await;

        assert_eq!(report.emitted, 1);
        assert!(xml.contains("<GARRespAff>"));
        assert!(xml.contains("<GARPersonProfil>National_doc</GARPersonProfil>"));
        assert!(xml.contains("<GARRespAffEtab>0350063D</GARRespAffEtab>"));
    }

    #[tokio::test]
    async fn test_responsible_without_mail() {
        let mut record = responsible("r2");
        record.insert("mail", vec![]);
        let (report, xml) = build(vec![record], None).await;

        assert_eq!(report.emitted, 0);
        assert_eq!(report.health, Health::Warn);
        assert!(!xml.contains("<GARRespAff>"));
    }

    #[tokio::test]
    async fn test_responsible_with_oversized_mail_is_isolated() {
        let record = responsible("r4").with("mail", &["x".repeat(501).as_str()]);
        let (report, xml) = build(vec![record, responsible("r1")], None).await;

        assert_eq!(report.emitted, 1);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.health, Health::Warn);
        assert!(report.issues[0].contains("GARPersonMail is longer than 500 characters"));
        assert!(xml.contains("<GARPersonIdentifiant>r1</GARPersonIdentifiant>"));
        assert!(!xml.contains("<GARPersonIdentifiant>r4</GARPersonIdentifiant>"));
    }

    #[tokio::test]
    async fn test_responsible_restricted() {
        let restriction = RestrictionList::from_ids(["J-r1"]);
        let (report, _) = build(
            vec![responsible("r1"), responsible("r3")],
            Some(&restriction),
        )
        .await;

        assert_eq!(report.emitted, 1);
        assert_eq!(report.restricted, 1);
        assert_eq!(report.health, Health::Ok);
    }
}
