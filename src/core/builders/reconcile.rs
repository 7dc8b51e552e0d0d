//! Group and division reconciliation
//!
//! Divisions and groups of a school share one code space in the output. A
//! code used by both is a conflict: neither side is emitted and no group
//! may list it as a division. Memberships are read back from staging and
//! only structures with members, or divisions listed by an emitted group,
//! survive.

use crate::domain::entities::{Division, Group, PersonInGroup};
use crate::domain::{FactType, Staff, StaffRole, Uai};
use std::collections::{BTreeMap, BTreeSet};

/// Status of every emitted group
pub const GROUP_STATUS: &str = "GROUPE";

/// A class declared by the school
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassToken {
    pub code: String,
    pub label: String,
}

/// A group declared by the school, with the divisions it spans
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupToken {
    pub code: String,
    pub label: String,
    pub divisions: Vec<String>,
}

/// A subject a teacher teaches in a division or group, not yet validated
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct SubjectLink {
    pub person_id: String,
    /// Division or group code
    pub target: String,
    pub subject: String,
    /// Source system of the subject code
    pub source: String,
}

/// Outcome of the reconciliation of one school
#[derive(Debug, Default)]
pub struct Reconciliation {
    pub divisions: Vec<Division>,
    pub groups: Vec<Group>,
    pub members: BTreeSet<PersonInGroup>,
    pub class_subjects: BTreeSet<SubjectLink>,
    pub group_subjects: BTreeSet<SubjectLink>,
    /// Codes declared both as a division and a group
    pub conflicts: BTreeSet<String>,
    /// Membership facts pointing to an unknown or conflicting code
    pub dropped_facts: usize,
    /// Divisions and groups left out for lack of members
    pub dropped_structures: usize,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Target {
    Division,
    Group,
}

/// Reconciles the divisions, groups and staged memberships of one school
pub fn reconcile(
    uai: &Uai,
    classes: Vec<ClassToken>,
    groups: Vec<GroupToken>,
    staff: &[Staff],
) -> Reconciliation {
    let mut outcome = Reconciliation::default();

    let mut divisions: BTreeMap<String, ClassToken> = BTreeMap::new();
    for class in classes {
        divisions.entry(class.code.clone()).or_insert(class);
    }

    let mut kept_groups: BTreeMap<String, GroupToken> = BTreeMap::new();
    for group in groups {
        if divisions.contains_key(&group.code) {
            tracing::warn!(
                uai = %uai,
                code = %group.code,
                "Code used by both a group and a division, neither is exported"
            );
            outcome.conflicts.insert(group.code);
            continue;
        }
        kept_groups.entry(group.code.clone()).or_insert(group);
    }
    for code in &outcome.conflicts {
        divisions.remove(code);
    }

    for group in kept_groups.values_mut() {
        let mut seen = BTreeSet::new();
        group.divisions.retain(|division| {
            let known = divisions.contains_key(division);
            if !known {
                tracing::debug!(
                    uai = %uai,
                    group = %group.code,
                    division = %division,
                    "Group division reference dropped"
                );
            }
            known && seen.insert(division.clone())
        });
    }

    let mut populated: BTreeSet<String> = BTreeSet::new();
    for person in staff {
        for (fact_type, target) in [
            (FactType::ClassSubject, Target::Division),
            (FactType::GroupSubject, Target::Group),
        ] {
            for fact in person.facts_of(fact_type) {
                let Some(code) = fact.group_code.as_deref() else {
                    continue;
                };
                let valid = match target {
                    Target::Division => divisions.contains_key(code),
                    Target::Group => kept_groups.contains_key(code),
                };
                if !valid {
                    tracing::warn!(
                        uai = %uai,
                        person_id = %person.person_id,
                        code = %code,
                        fact_type = %fact_type,
                        "Membership to an unknown or conflicting structure dropped"
                    );
                    outcome.dropped_facts += 1;
                    continue;
                }

                populated.insert(code.to_string());
                outcome.members.insert(PersonInGroup {
                    uai: uai.to_string(),
                    person_id: person.person_id.to_string(),
                    group_code: code.to_string(),
                });

                if let (StaffRole::Teacher, Some(subject)) = (person.role, fact.subject()) {
                    let link = SubjectLink {
                        person_id: person.person_id.to_string(),
                        target: code.to_string(),
                        subject: subject.to_string(),
                        source: fact.source_id.clone(),
                    };
                    match target {
                        Target::Division => outcome.class_subjects.insert(link),
                        Target::Group => outcome.group_subjects.insert(link),
                    };
                }
            }
        }
    }

    let mut referenced: BTreeSet<String> = BTreeSet::new();
    for (code, group) in kept_groups {
        if !populated.contains(&code) {
            tracing::info!(uai = %uai, group = %code, "Group without members not exported");
            outcome.dropped_structures += 1;
            continue;
        }
        referenced.extend(group.divisions.iter().cloned());
        outcome.groups.push(Group {
            uai: uai.to_string(),
            code: group.code,
            label: group.label,
            status: GROUP_STATUS.to_string(),
            divisions: group.divisions,
        });
    }

    for (code, class) in divisions {
        if !populated.contains(&code) && !referenced.contains(&code) {
            tracing::info!(uai = %uai, division = %code, "Division without members not exported");
            outcome.dropped_structures += 1;
            continue;
        }
        outcome.divisions.push(Division {
            uai: uai.to_string(),
            code: class.code,
            label: class.label,
        });
    }

    outcome
}
