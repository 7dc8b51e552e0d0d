//! Group builder
//!
//! For every member structure: divisions and groups declared by the
//! structure record are reconciled against the memberships staged by the
//! person passes. Emits, in order, divisions, groups, memberships, then
//! the teacher class and group subjects whose subject code is valid.

use super::common::{entity_label, lookup_all, structure_uai, CodeKey};
use super::reconcile::{reconcile, ClassToken, GroupToken, SubjectLink, GROUP_STATUS};
use super::{Attempt, BuildContext, BuildInput, BuildReport, EntityBuilder, SkipReason, Step};
use crate::adapters::restriction::is_allowed;
use crate::core::helper::ObjectType;
use crate::core::writer::{schema, GarRecord, GroupRecord, PaginatedWriter};
use crate::domain::entities::{Division, Group, TeacherClassSubject, TeacherGroupSubject};
use crate::domain::{AttributeRecord, Health, Result, StaffRole, Token, Uai};
use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::Arc;
use std::time::Instant;

const CATEGORY: &str = "Groupe";

pub struct GroupBuilder {
    ctx: Arc<BuildContext>,
    seen: HashSet<Uai>,
}

impl GroupBuilder {
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
        writer: &mut PaginatedWriter<GroupRecord>,
        report: &mut BuildReport,
    ) -> Result<Step> {
        let ctx = self.ctx.clone();
        let attrs = &ctx.attributes.structure;
        if !is_allowed(input.restriction, record.optional(&attrs.join_key)) {
            return Ok(Step::Skipped(SkipReason::Restricted));
        }

        let uai = match self.school(record, input) {
            Ok(uai) => uai,
            Err(reason) => return Ok(Step::Skipped(reason)),
        };

        let classes = own_tokens(record, &attrs.classes, &uai, report)
            .into_iter()
            .filter_map(|token| {
                let code = token.field(0)?;
                Some(ClassToken {
                    code: code.to_string(),
                    label: token.field(1).unwrap_or(code).to_string(),
                })
            })
            .collect();
        let classes = declared(classes, &uai, report, |class: &ClassToken| {
            schema::check_division(&Division {
                uai: uai.to_string(),
                code: class.code.clone(),
                label: class.label.clone(),
            })
        });
        let groups = own_tokens(record, &attrs.groups, &uai, report)
            .into_iter()
            .filter_map(|token| {
                let code = token.field(0)?;
                Some(GroupToken {
                    code: code.to_string(),
                    label: token.field(1).unwrap_or(code).to_string(),
                    divisions: token.fields_from(2).map(str::to_string).collect(),
                })
            })
            .collect();
        let groups = declared(groups, &uai, report, |group: &GroupToken| {
            schema::check_group(&Group {
                uai: uai.to_string(),
                code: group.code.clone(),
                label: group.label.clone(),
                status: GROUP_STATUS.to_string(),
                divisions: group.divisions.clone(),
            })
        });

        let mut staff = ctx.staging.query_by_uai(&uai, StaffRole::Student).await?;
        staff.extend(ctx.staging.query_by_uai(&uai, StaffRole::Teacher).await?);

        let outcome = reconcile(&uai, classes, groups, &staff);
        report.dropped_references +=
            outcome.conflicts.len() + outcome.dropped_facts + outcome.dropped_structures;
        for code in &outcome.conflicts {
            report
                .issues
                .push(format!("{CATEGORY} {uai}: code '{code}' is both a division and a group"));
        }

        let keys: BTreeSet<CodeKey> = outcome
            .class_subjects
            .iter()
            .chain(&outcome.group_subjects)
            .map(|link| CodeKey {
                object_type: ObjectType::Subject,
                code: link.subject.clone(),
                source: link.source.clone(),
            })
            .collect();
        let validity: BTreeMap<CodeKey, bool> = lookup_all(&ctx.validator, keys)
            .await?
            .into_iter()
            .map(|(key, entry)| (key, entry.is_some()))
            .collect();
        let is_valid = |link: &SubjectLink| {
            let key = CodeKey {
                object_type: ObjectType::Subject,
                code: link.subject.clone(),
                source: link.source.clone(),
            };
            validity.get(&key).copied().unwrap_or(false)
        };

        let mut records = Vec::new();
        records.extend(outcome.divisions.into_iter().map(GroupRecord::Division));
        records.extend(outcome.groups.into_iter().map(GroupRecord::Group));
        records.extend(outcome.members.into_iter().map(GroupRecord::Member));

        // Several sources may carry the same subject for one target
        let mut class_links = BTreeSet::new();
        let mut group_links = BTreeSet::new();
        for link in &outcome.class_subjects {
            if !is_valid(link) {
                report.dropped_references += 1;
                continue;
            }
            class_links.insert(TeacherClassSubject {
                uai: uai.to_string(),
                person_id: link.person_id.clone(),
                division_code: link.target.clone(),
                subject_code: link.subject.clone(),
            });
        }
        for link in &outcome.group_subjects {
            if !is_valid(link) {
                report.dropped_references += 1;
                continue;
            }
            group_links.insert(TeacherGroupSubject {
                uai: uai.to_string(),
                person_id: link.person_id.clone(),
                group_code: link.target.clone(),
                subject_code: link.subject.clone(),
            });
        }
        records.extend(class_links.into_iter().map(GroupRecord::ClassSubject));
        records.extend(group_links.into_iter().map(GroupRecord::GroupSubject));

        for record in records {
            if let Err(message) = record.check() {
                invalid_reference(&uai, &message, report);
                continue;
            }
            writer.add(record).await?;
            report.records += 1;
        }

        Ok(Step::Emitted)
    }

    fn school(&mut self, record: &AttributeRecord, input: &BuildInput<'_>) -> Attempt<Uai> {
        let uai = structure_uai(record, &self.ctx.attributes.structure.uai, input.members)?;
        if !self.seen.insert(uai.clone()) {
            return Err(SkipReason::Duplicate);
        }
        Ok(uai)
    }
}

/// Declared divisions or groups that satisfy the envelope rules
///
/// A rejected declaration is left out before reconciliation, so no
/// membership or subject link can point at it.
fn declared<T>(
    tokens: Vec<T>,
    uai: &Uai,
    report: &mut BuildReport,
    check: impl Fn(&T) -> std::result::Result<(), String>,
) -> Vec<T> {
    tokens
        .into_iter()
        .filter(|token| match check(token) {
            Ok(()) => true,
            Err(message) => {
                invalid_reference(uai, &message, report);
                false
            }
        })
        .collect()
}

fn invalid_reference(uai: &Uai, message: &str, report: &mut BuildReport) {
    tracing::warn!(uai = %uai, error = %message, "Invalid group record not exported");
    report.dropped_references += 1;
    report.health = report.health.worsen(Health::Warn);
    report.issues.push(format!("{CATEGORY} {uai}: {message}"));
}

/// Tokens of a structure attribute that belong to the structure itself
fn own_tokens<'a>(
    record: &'a AttributeRecord,
    attribute: &str,
    uai: &Uai,
    report: &mut BuildReport,
) -> Vec<Token<'a>> {
    record
        .tokens(attribute)
        .into_iter()
        .filter_map(|token| match token {
            Ok(token) if token.uai() == uai => Some(token),
            Ok(token) => {
                tracing::debug!(
                    uai = %uai,
                    attribute = %attribute,
                    other = %token.uai(),
                    "Token of another structure ignored"
                );
                report.dropped_references += 1;
                None
            }
            Err(raw) => {
                tracing::debug!(attribute = %attribute, value = %raw, "Malformed token ignored");
                report.dropped_references += 1;
                None
            }
        })
        .collect()
}

#[async_trait]
impl EntityBuilder for GroupBuilder {
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
