//! Attribute helpers shared by the builders

use super::{Attempt, BuildReport, MemberStructures, SkipReason};
use crate::core::helper::{normalize_birth_date, NationalProfile, ObjectType};
use crate::core::validator::{CodeEntry, CodeValidator};
use crate::domain::entities::ProfileAssignment;
use crate::domain::{AttributeRecord, GarError, PersonId, Result, Token, Uai};
use futures::stream::{self, StreamExt, TryStreamExt};
use std::collections::{BTreeMap, BTreeSet};

/// Mandatory person identifier
pub(crate) fn person_id(record: &AttributeRecord, attribute: &str) -> Attempt<PersonId> {
    let value = record.mandatory(attribute)?;
    PersonId::new(value).map_err(|_| SkipReason::MissingAttribute(attribute.to_string()))
}

/// Label used in logs for an entity that may lack an identifier
pub(crate) fn entity_label(record: &AttributeRecord, id_attribute: &str, join_key: &str) -> String {
    record
        .optional(id_attribute)
        .or_else(|| record.optional(join_key))
        .unwrap_or("<unidentified>")
        .to_string()
}

/// Member schools listed by an attribute, deduplicated, in input order
pub(crate) fn scoped_schools(
    record: &AttributeRecord,
    attribute: &str,
    members: &MemberStructures,
    report: &mut BuildReport,
) -> Vec<Uai> {
    let mut schools: Vec<Uai> = Vec::new();
    for value in record.values(attribute) {
        let uai = match Uai::new(value) {
            Ok(uai) => uai,
            Err(e) => {
                tracing::debug!(attribute = %attribute, value = %value, error = %e, "Invalid UAI ignored");
                report.dropped_references += 1;
                continue;
            }
        };
        if !members.contains(&uai) {
            tracing::info!(attribute = %attribute, uai = %uai, "Structure out of scope dropped");
            report.dropped_references += 1;
            continue;
        }
        if !schools.contains(&uai) {
            schools.push(uai);
        }
    }
    schools
}

/// Tokens of an attribute whose UAI is a member structure
pub(crate) fn scoped_tokens<'a>(
    record: &'a AttributeRecord,
    attribute: &str,
    members: &MemberStructures,
    report: &mut BuildReport,
) -> Vec<Token<'a>> {
    record
        .tokens(attribute)
        .into_iter()
        .filter_map(|token| match token {
            Ok(token) if members.contains(token.uai()) => Some(token),
            Ok(token) => {
                tracing::info!(
                    attribute = %attribute,
                    uai = %token.uai(),
                    "Structure out of scope dropped"
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

/// First function listed per school by `UAI$function` tokens
pub(crate) fn functions_by_school<'a>(tokens: &[Token<'a>]) -> BTreeMap<Uai, &'a str> {
    let mut functions = BTreeMap::new();
    for token in tokens {
        if let Some(function) = token.field(0) {
            functions.entry(token.uai().clone()).or_insert(function);
        }
    }
    functions
}

/// Resolves one profile per school; schools without one get no assignment
pub(crate) fn profile_assignments(
    schools: &[Uai],
    mut resolve: impl FnMut(&Uai) -> Option<NationalProfile>,
) -> Vec<ProfileAssignment> {
    schools
        .iter()
        .filter_map(|uai| {
            resolve(uai).map(|profile| ProfileAssignment {
                uai: uai.to_string(),
                profile: profile.code().to_string(),
            })
        })
        .collect()
}

/// Optional birth date, normalized to `YYYY-MM-DD`
pub(crate) fn birth_date(record: &AttributeRecord, attribute: &str) -> Option<String> {
    let value = record.optional(attribute)?;
    let normalized = normalize_birth_date(value);
    if normalized.is_none() {
        tracing::debug!(attribute = %attribute, value = %value, "Unparseable birth date ignored");
    }
    normalized
}

/// Attachment structure, kept only when it is one of the person's schools
pub(crate) fn attachment(record: &AttributeRecord, attribute: &str, schools: &[Uai]) -> Option<String> {
    let uai = Uai::new(record.optional(attribute)?).ok()?;
    schools.contains(&uai).then(|| uai.into_inner())
}

pub(crate) fn owned(value: Option<&str>) -> Option<String> {
    value.map(str::to_string)
}

/// UAI of a structure record, which must be a member structure
pub(crate) fn structure_uai(
    record: &AttributeRecord,
    attribute: &str,
    members: &MemberStructures,
) -> Attempt<Uai> {
    let value = record.mandatory(attribute)?;
    let uai =
        Uai::new(value).map_err(|_| SkipReason::MissingAttribute(attribute.to_string()))?;
    if members.contains(&uai) {
        Ok(uai)
    } else {
        Err(SkipReason::OutOfScope)
    }
}

/// A code to look up in the referential
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) struct CodeKey {
    pub object_type: ObjectType,
    pub code: String,
    pub source: String,
}

/// Looks distinct codes up, at most `max_concurrent_queries` at a time
///
/// The map is ordered by object type, then code.
pub(crate) async fn lookup_all(
    validator: &CodeValidator,
    keys: BTreeSet<CodeKey>,
) -> Result<BTreeMap<CodeKey, Option<CodeEntry>>> {
    stream::iter(keys)
        .map(|key| async move {
            let entry = validator
                .lookup_code(&key.source, key.object_type, &key.code)
                .await?;
            Ok::<_, GarError>((key, entry))
        })
        .buffer_unordered(validator.max_concurrent_queries())
        .try_collect()
        .await
}
