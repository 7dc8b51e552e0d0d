//! Structural rules checked on every flush
//!
//! A record breaking one of these rules never reaches the filesystem. Each
//! check returns the first violation as a message naming the element.

use crate::core::helper::SUPPORTED_PROFILES;
use crate::domain::entities::{
    CurriculumTrack, Division, Group, PersonInGroup, ProfileAssignment, Pupil, PupilSubject,
    PupilTrack, ResponsibleParty, School, Subject, Teacher, TeacherClassSubject,
    TeacherDiscipline, TeacherGroupSubject,
};
use crate::domain::ids::is_valid_uai;
use chrono::NaiveDate;

type Check = Result<(), String>;

/// Longest person identifier accepted
pub const MAX_IDENTIFIER_LEN: usize = 64;
/// Longest code accepted
pub const MAX_CODE_LEN: usize = 255;
/// Longest name or label accepted
pub const MAX_LABEL_LEN: usize = 500;

/// Accepted group statuses
pub const GROUP_STATUSES: [&str; 2] = ["GROUPE", "DIVISION"];

fn uai(element: &str, value: &str) -> Check {
    if is_valid_uai(value) {
        Ok(())
    } else {
        Err(format!("{element} '{value}' is not a valid UAI"))
    }
}

fn text(element: &str, value: &str, max: usize) -> Check {
    if value.trim().is_empty() {
        return Err(format!("{element} is blank"));
    }
    if value.chars().count() > max {
        return Err(format!("{element} is longer than {max} characters"));
    }
    Ok(())
}

fn identifier(value: &str) -> Check {
    text("GARPersonIdentifiant", value, MAX_IDENTIFIER_LEN)
}

fn code(element: &str, value: &str) -> Check {
    text(element, value, MAX_CODE_LEN)
}

fn label(element: &str, value: &str) -> Check {
    text(element, value, MAX_LABEL_LEN)
}

fn birth_date(value: &str) -> Check {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map(|_| ())
        .map_err(|_| format!("GARPersonDateNaissance '{value}' is not YYYY-MM-DD"))
}

fn contract(value: &str) -> Check {
    if value.len() == 2 && value.chars().all(|c| c.is_ascii_uppercase()) {
        Ok(())
    } else {
        Err(format!("GARStructureContrat '{value}' is not two upper-case letters"))
    }
}

/// Profiles and schools of a person
fn person_scope(profiles: &[ProfileAssignment], schools: &[String], schools_element: &str) -> Check {
    if schools.is_empty() {
        return Err(format!("{schools_element} is empty"));
    }
    for school in schools {
        uai(schools_element, school)?;
    }

    if profiles.is_empty() {
        return Err("GARPersonProfils is empty".to_string());
    }
    for assignment in profiles {
        uai("GARStructureUAI", &assignment.uai)?;
        if !SUPPORTED_PROFILES.contains(&assignment.profile.as_str()) {
            return Err(format!(
                "GARPersonProfil '{}' is not a supported profile",
                assignment.profile
            ));
        }
        if !schools.contains(&assignment.uai) {
            return Err(format!(
                "profile school {} is missing from {schools_element}",
                assignment.uai
            ));
        }
    }
    Ok(())
}

fn names(last_name: &str, first_name: &str) -> Check {
    label("GARPersonNom", last_name)?;
    label("GARPersonPrenom", first_name)
}

fn optional_person_fields(
    civility: Option<&str>,
    attachment: Option<&str>,
    birth: Option<&str>,
) -> Check {
    if let Some(civility) = civility {
        label("GARPersonCivilite", civility)?;
    }
    if let Some(attachment) = attachment {
        uai("GARPersonStructRattach", attachment)?;
    }
    if let Some(birth) = birth {
        birth_date(birth)?;
    }
    Ok(())
}

pub fn check_pupil(pupil: &Pupil) -> Check {
    identifier(&pupil.person_id)?;
    names(&pupil.last_name, &pupil.first_name)?;
    optional_person_fields(
        pupil.civility.as_deref(),
        pupil.attachment.as_deref(),
        pupil.birth_date.as_deref(),
    )?;
    person_scope(&pupil.profiles, &pupil.schools, "GARPersonEtab")
}

pub fn check_pupil_track(track: &PupilTrack) -> Check {
    uai("GARStructureUAI", &track.uai)?;
    identifier(&track.person_id)?;
    code("GARMEFCode", &track.track_code)
}

pub fn check_pupil_subject(subject: &PupilSubject) -> Check {
    uai("GARStructureUAI", &subject.uai)?;
    identifier(&subject.person_id)?;
    code("GARMatiereCode", &subject.subject_code)
}

pub fn check_teacher(teacher: &Teacher) -> Check {
    identifier(&teacher.person_id)?;
    names(&teacher.last_name, &teacher.first_name)?;
    optional_person_fields(
        teacher.civility.as_deref(),
        teacher.attachment.as_deref(),
        teacher.birth_date.as_deref(),
    )?;
    for mail in &teacher.mails {
        label("GARPersonMail", mail)?;
    }
    person_scope(&teacher.profiles, &teacher.schools, "GARPersonEtab")
}

pub fn check_teacher_discipline(discipline: &TeacherDiscipline) -> Check {
    uai("GARStructureUAI", &discipline.uai)?;
    identifier(&discipline.person_id)?;
    code("GAREnsDisciplinePosteCode", &discipline.discipline_code)
}

pub fn check_school(school: &School) -> Check {
    uai("GARStructureUAI", &school.uai)?;
    label("GARStructureNomCourant", &school.name)?;
    if let Some(value) = &school.contract {
        contract(value)?;
    }
    if let Some(phone) = &school.phone {
        label("GARStructureTelephone", phone)?;
    }
    if let Some(mail) = &school.mail {
        label("GARStructureEmail", mail)?;
    }
    Ok(())
}

pub fn check_curriculum_track(track: &CurriculumTrack) -> Check {
    uai("GARStructureUAI", &track.uai)?;
    code("GARMEFCode", &track.code)?;
    label("GARMEFLibelle", &track.label)
}

pub fn check_subject(subject: &Subject) -> Check {
    uai("GARStructureUAI", &subject.uai)?;
    code("GARMatiereCode", &subject.code)?;
    label("GARMatiereLibelle", &subject.label)
}

pub fn check_division(division: &Division) -> Check {
    uai("GARStructureUAI", &division.uai)?;
    code("GARDivisionCode", &division.code)?;
    label("GARDivisionLibelle", &division.label)
}

pub fn check_group(group: &Group) -> Check {
    uai("GARStructureUAI", &group.uai)?;
    code("GARGroupeCode", &group.code)?;
    label("GARGroupeLibelle", &group.label)?;
    if !GROUP_STATUSES.contains(&group.status.as_str()) {
        return Err(format!("GARGroupeStatut '{}' is not a known status", group.status));
    }
    for division in &group.divisions {
        code("GARGroupeDivAppartenance", division)?;
    }
    Ok(())
}

pub fn check_person_in_group(membership: &PersonInGroup) -> Check {
    uai("GARStructureUAI", &membership.uai)?;
    identifier(&membership.person_id)?;
    code("GARGroupeCode", &membership.group_code)
}

pub fn check_teacher_class_subject(link: &TeacherClassSubject) -> Check {
    uai("GARStructureUAI", &link.uai)?;
    identifier(&link.person_id)?;
    code("GARDivisionCode", &link.division_code)?;
    code("GARMatiereCode", &link.subject_code)
}

pub fn check_teacher_group_subject(link: &TeacherGroupSubject) -> Check {
    uai("GARStructureUAI", &link.uai)?;
    identifier(&link.person_id)?;
    code("GARGroupeCode", &link.group_code)?;
    code("GARMatiereCode", &link.subject_code)
}

pub fn check_responsible(responsible: &ResponsibleParty) -> Check {
    identifier(&responsible.person_id)?;
    names(&responsible.last_name, &responsible.first_name)?;
    if let Some(civility) = &responsible.civility {
        label("GARPersonCivilite", civility)?;
    }
    label("GARPersonMail", &responsible.mail)?;
    person_scope(&responsible.profiles, &responsible.schools, "GARRespAffEtab")
}
