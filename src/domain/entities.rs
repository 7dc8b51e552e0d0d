//! GAR output records
//!
//! One struct per child element of the interchange files. Field order is the
//! element order in the output. Optional scalars are omitted when absent and
//! empty lists produce no element.

use serde::Serialize;

/// (school, national profile) pair carried by every person
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct ProfileAssignment {
    #[serde(rename = "GARStructureUAI")]
    pub uai: String,
    #[serde(rename = "GARPersonProfil")]
    pub profile: String,
}

/// `GAREleve`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Pupil {
    #[serde(rename = "GARPersonIdentifiant")]
    pub person_id: String,
    #[serde(rename = "GARPersonProfils")]
    pub profiles: Vec<ProfileAssignment>,
    #[serde(rename = "GARPersonNom")]
    pub last_name: String,
    #[serde(rename = "GARPersonPrenom")]
    pub first_name: String,
    #[serde(rename = "GARPersonCivilite", skip_serializing_if = "Option::is_none")]
    pub civility: Option<String>,
    #[serde(rename = "GARPersonStructRattach", skip_serializing_if = "Option::is_none")]
    pub attachment: Option<String>,
    #[serde(rename = "GARPersonDateNaissance", skip_serializing_if = "Option::is_none")]
    pub birth_date: Option<String>,
    #[serde(rename = "GARPersonEtab")]
    pub schools: Vec<String>,
}

/// `GARPersonMEF`: curriculum track of a pupil in a school
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PupilTrack {
    #[serde(rename = "GARStructureUAI")]
    pub uai: String,
    #[serde(rename = "GARPersonIdentifiant")]
    pub person_id: String,
    #[serde(rename = "GARMEFCode")]
    pub track_code: String,
}

/// `GAREleveEnseignement`: subject followed by a pupil in a school
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PupilSubject {
    #[serde(rename = "GARStructureUAI")]
    pub uai: String,
    #[serde(rename = "GARPersonIdentifiant")]
    pub person_id: String,
    #[serde(rename = "GARMatiereCode")]
    pub subject_code: String,
}

/// `GAREnseignant`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Teacher {
    #[serde(rename = "GARPersonIdentifiant")]
    pub person_id: String,
    #[serde(rename = "GARPersonProfils")]
    pub profiles: Vec<ProfileAssignment>,
    #[serde(rename = "GARPersonNom")]
    pub last_name: String,
    #[serde(rename = "GARPersonPrenom")]
    pub first_name: String,
    #[serde(rename = "GARPersonCivilite", skip_serializing_if = "Option::is_none")]
    pub civility: Option<String>,
    #[serde(rename = "GARPersonStructRattach", skip_serializing_if = "Option::is_none")]
    pub attachment: Option<String>,
    #[serde(rename = "GARPersonDateNaissance", skip_serializing_if = "Option::is_none")]
    pub birth_date: Option<String>,
    #[serde(rename = "GARPersonMail")]
    pub mails: Vec<String>,
    #[serde(rename = "GARPersonEtab")]
    pub schools: Vec<String>,
}

/// `GAREnsDisciplinesPostes`: post discipline of a teacher in a school
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TeacherDiscipline {
    #[serde(rename = "GARStructureUAI")]
    pub uai: String,
    #[serde(rename = "GARPersonIdentifiant")]
    pub person_id: String,
    #[serde(rename = "GAREnsDisciplinePosteCode")]
    pub discipline_code: String,
}

/// `GAREtab`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct School {
    #[serde(rename = "GARStructureUAI")]
    pub uai: String,
    #[serde(rename = "GARStructureNomCourant")]
    pub name: String,
    #[serde(rename = "GARStructureContrat", skip_serializing_if = "Option::is_none")]
    pub contract: Option<String>,
    #[serde(rename = "GARStructureTelephone", skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(rename = "GARStructureEmail", skip_serializing_if = "Option::is_none")]
    pub mail: Option<String>,
}

/// `GARMEF`: curriculum track available in a school
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CurriculumTrack {
    #[serde(rename = "GARStructureUAI")]
    pub uai: String,
    #[serde(rename = "GARMEFCode")]
    pub code: String,
    #[serde(rename = "GARMEFLibelle")]
    pub label: String,
}

/// `GARMatiere`: subject taught in a school
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Subject {
    #[serde(rename = "GARStructureUAI")]
    pub uai: String,
    #[serde(rename = "GARMatiereCode")]
    pub code: String,
    #[serde(rename = "GARMatiereLibelle")]
    pub label: String,
}

/// `GARDivision`: a class
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Division {
    #[serde(rename = "GARStructureUAI")]
    pub uai: String,
    #[serde(rename = "GARDivisionCode")]
    pub code: String,
    #[serde(rename = "GARDivisionLibelle")]
    pub label: String,
}

/// `GARGroupe`: a teaching group, possibly spanning several divisions
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Group {
    #[serde(rename = "GARStructureUAI")]
    pub uai: String,
    #[serde(rename = "GARGroupeCode")]
    pub code: String,
    #[serde(rename = "GARGroupeLibelle")]
    pub label: String,
    #[serde(rename = "GARGroupeStatut")]
    pub status: String,
    #[serde(rename = "GARGroupeDivAppartenance")]
    pub divisions: Vec<String>,
}

/// `GARPersonGroupe`: membership of a person in a division or group
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct PersonInGroup {
    #[serde(rename = "GARStructureUAI")]
    pub uai: String,
    #[serde(rename = "GARPersonIdentifiant")]
    pub person_id: String,
    #[serde(rename = "GARGroupeCode")]
    pub group_code: String,
}

/// `GAREnsClasseMatiere`: subject a teacher teaches in a division
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct TeacherClassSubject {
    #[serde(rename = "GARStructureUAI")]
    pub uai: String,
    #[serde(rename = "GARPersonIdentifiant")]
    pub person_id: String,
    #[serde(rename = "GARDivisionCode")]
    pub division_code: String,
    #[serde(rename = "GARMatiereCode")]
    pub subject_code: String,
}

/// `GAREnsGroupeMatiere`: subject a teacher teaches in a group
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct TeacherGroupSubject {
    #[serde(rename = "GARStructureUAI")]
    pub uai: String,
    #[serde(rename = "GARPersonIdentifiant")]
    pub person_id: String,
    #[serde(rename = "GARGroupeCode")]
    pub group_code: String,
    #[serde(rename = "GARMatiereCode")]
    pub subject_code: String,
}

/// `GARRespAff`: affiliated responsible party
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResponsibleParty {
    #[serde(rename = "GARPersonIdentifiant")]
    pub person_id: String,
    #[serde(rename = "GARPersonProfils")]
    pub profiles: Vec<ProfileAssignment>,
    #[serde(rename = "GARPersonNom")]
    pub last_name: String,
    #[serde(rename = "GARPersonPrenom")]
    pub first_name: String,
    #[serde(rename = "GARPersonCivilite", skip_serializing_if = "Option::is_none")]
    pub civility: Option<String>,
    #[serde(rename = "GARPersonMail")]
    pub mail: String,
    #[serde(rename = "GARRespAffEtab")]
    pub schools: Vec<String>,
}
