//! Envelope record types
//!
//! One enum per output category. Each variant is serialized as the GAR
//! element named by its rename.

use super::schema;
use crate::domain::entities::{
    CurriculumTrack, Division, Group, PersonInGroup, Pupil, PupilSubject, PupilTrack,
    ResponsibleParty, School, Subject, Teacher, TeacherClassSubject, TeacherDiscipline,
    TeacherGroupSubject,
};
use serde::Serialize;

/// A record that can be written in a category envelope
pub trait GarRecord: Serialize + Send + Sync {
    /// Root element of the category envelope
    const ROOT: &'static str;

    /// Category name used in output file names
    const CATEGORY: &'static str;

    /// Structural rules of the record
    fn check(&self) -> Result<(), String>;
}

/// Records of the pupil envelope
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum PupilRecord {
    #[serde(rename = "GAREleve")]
    Pupil(Pupil),
    #[serde(rename = "GARPersonMEF")]
    Track(PupilTrack),
    #[serde(rename = "GAREleveEnseignement")]
    Subject(PupilSubject),
}

impl GarRecord for PupilRecord {
    const ROOT: &'static str = "GAR-ENT-Eleve";
    const CATEGORY: &'static str = "Eleve";

    fn check(&self) -> Result<(), String> {
        match self {
            PupilRecord::Pupil(pupil) => schema::check_pupil(pupil),
            PupilRecord::Track(track) => schema::check_pupil_track(track),
            PupilRecord::Subject(subject) => schema::check_pupil_subject(subject),
        }
    }
}

/// Records of the teacher envelope
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum TeacherRecord {
    #[serde(rename = "GAREnseignant")]
    Teacher(Teacher),
    #[serde(rename = "GAREnsDisciplinesPostes")]
    Discipline(TeacherDiscipline),
}

impl GarRecord for TeacherRecord {
    const ROOT: &'static str = "GAR-ENT-Enseignant";
    const CATEGORY: &'static str = "Enseignant";

    fn check(&self) -> Result<(), String> {
        match self {
            TeacherRecord::Teacher(teacher) => schema::check_teacher(teacher),
            TeacherRecord::Discipline(discipline) => schema::check_teacher_discipline(discipline),
        }
    }
}

/// Records of the school envelope
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum SchoolRecord {
    #[serde(rename = "GAREtab")]
    School(School),
    #[serde(rename = "GARMEF")]
    Track(CurriculumTrack),
    #[serde(rename = "GARMatiere")]
    Subject(Subject),
}

impl GarRecord for SchoolRecord {
    const ROOT: &'static str = "GAR-ENT-Etab";
    const CATEGORY: &'static str = "Etab";

    fn check(&self) -> Result<(), String> {
        match self {
            SchoolRecord::School(school) => schema::check_school(school),
            SchoolRecord::Track(track) => schema::check_curriculum_track(track),
            SchoolRecord::Subject(subject) => schema::check_subject(subject),
        }
    }
}

/// Records of the group envelope
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum GroupRecord {
    #[serde(rename = "GARDivision")]
    Division(Division),
    #[serde(rename = "GARGroupe")]
    Group(Group),
    #[serde(rename = "GARPersonGroupe")]
    Member(PersonInGroup),
    #[serde(rename = "GAREnsClasseMatiere")]
    ClassSubject(TeacherClassSubject),
    #[serde(rename = "GAREnsGroupeMatiere")]
    GroupSubject(TeacherGroupSubject),
}

impl GarRecord for GroupRecord {
    const ROOT: &'static str = "GAR-ENT-Groupe";
    const CATEGORY: &'static str = "Groupe";

    fn check(&self) -> Result<(), String> {
        match self {
            GroupRecord::Division(division) => schema::check_division(division),
            GroupRecord::Group(group) => schema::check_group(group),
            GroupRecord::Member(member) => schema::check_person_in_group(member),
            GroupRecord::ClassSubject(link) => schema::check_teacher_class_subject(link),
            GroupRecord::GroupSubject(link) => schema::check_teacher_group_subject(link),
        }
    }
}

/// Records of the responsible party envelope
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ResponsibleRecord {
    #[serde(rename = "GARRespAff")]
    Responsible(ResponsibleParty),
}

impl GarRecord for ResponsibleRecord {
    const ROOT: &'static str = "GAR-ENT-RespAff";
    const CATEGORY: &'static str = "RespAff";

    fn check(&self) -> Result<(), String> {
        match self {
            ResponsibleRecord::Responsible(responsible) => schema::check_responsible(responsible),
        }
    }
}

/// Versioned root element holding one increment of records
#[derive(Debug, Serialize)]
pub(crate) struct Envelope<'a, R> {
    #[serde(rename = "@xmlns")]
    pub xmlns: &'a str,
    #[serde(rename = "@Version")]
    pub version: &'a str,
    #[serde(rename = "$value")]
    pub records: &'a [R],
}
