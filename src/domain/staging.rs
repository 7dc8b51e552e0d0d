//! Staged teaching facts
//!
//! Person passes register, per (school, person), the set of teaching facts
//! that structure passes later read back: curriculum tracks and subjects to
//! validate and emit per school, and class/group memberships to reconcile.

use super::ids::{PersonId, Uai};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Kind of a staged fact
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FactType {
    /// Curriculum track (MEF) of a pupil
    CurriculumTrack,
    /// Subject followed (pupil) or taught as a post discipline (teacher)
    Discipline,
    /// Membership in a class (division), optionally with the subject taught there
    ClassSubject,
    /// Membership in a group, optionally with the subject taught there
    GroupSubject,
}

impl FactType {
    /// Stable storage name
    pub fn as_str(&self) -> &'static str {
        match self {
            FactType::CurriculumTrack => "CURRICULUM_TRACK",
            FactType::Discipline => "DISCIPLINE",
            FactType::ClassSubject => "CLASS_SUBJECT",
            FactType::GroupSubject => "GROUP_SUBJECT",
        }
    }
}

impl fmt::Display for FactType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FactType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CURRICULUM_TRACK" => Ok(FactType::CurriculumTrack),
            "DISCIPLINE" => Ok(FactType::Discipline),
            "CLASS_SUBJECT" => Ok(FactType::ClassSubject),
            "GROUP_SUBJECT" => Ok(FactType::GroupSubject),
            other => Err(format!("Unknown fact type '{other}'")),
        }
    }
}

/// One staged fact about a person in a school
///
/// For membership facts, `group_code` names the class or group and `code`
/// holds the subject, empty when the membership carries none.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TeachingFact {
    /// Source system the code comes from, drives index alias selection
    pub source_id: String,
    /// Track or subject code, may be empty for pure memberships
    pub code: String,
    /// Class or group code for membership facts
    pub group_code: Option<String>,
    /// Fact kind
    pub fact_type: FactType,
}

impl TeachingFact {
    /// Curriculum track fact
    pub fn curriculum_track(source_id: &str, code: &str) -> Self {
        Self::new(source_id, code, None, FactType::CurriculumTrack)
    }

    /// Discipline fact
    pub fn discipline(source_id: &str, code: &str) -> Self {
        Self::new(source_id, code, None, FactType::Discipline)
    }

    /// Class membership, with the subject taught if any
    pub fn class_subject(source_id: &str, division: &str, subject: Option<&str>) -> Self {
        Self::new(
            source_id,
            subject.unwrap_or_default(),
            Some(division.to_string()),
            FactType::ClassSubject,
        )
    }

    /// Group membership, with the subject taught if any
    pub fn group_subject(source_id: &str, group: &str, subject: Option<&str>) -> Self {
        Self::new(
            source_id,
            subject.unwrap_or_default(),
            Some(group.to_string()),
            FactType::GroupSubject,
        )
    }

    fn new(source_id: &str, code: &str, group_code: Option<String>, fact_type: FactType) -> Self {
        Self {
            source_id: source_id.to_string(),
            code: code.to_string(),
            group_code,
            fact_type,
        }
    }

    /// Subject or track code, `None` when empty
    pub fn subject(&self) -> Option<&str> {
        Some(self.code.as_str()).filter(|code| !code.is_empty())
    }
}

/// Role a person was staged under
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StaffRole {
    /// Pupil
    Student,
    /// Teacher or other teaching staff
    Teacher,
}

impl StaffRole {
    /// Stable storage name
    pub fn as_str(&self) -> &'static str {
        match self {
            StaffRole::Student => "STUDENT",
            StaffRole::Teacher => "TEACHER",
        }
    }
}

impl fmt::Display for StaffRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StaffRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "STUDENT" => Ok(StaffRole::Student),
            "TEACHER" => Ok(StaffRole::Teacher),
            other => Err(format!("Unknown staff role '{other}'")),
        }
    }
}

/// A person as staged for one school
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Staff {
    pub uai: Uai,
    pub person_id: PersonId,
    pub role: StaffRole,
    pub facts: BTreeSet<TeachingFact>,
}

impl Staff {
    /// Facts of one kind
    pub fn facts_of(&self, fact_type: FactType) -> impl Iterator<Item = &TeachingFact> {
        self.facts.iter().filter(move |fact| fact.fact_type == fact_type)
    }
}
