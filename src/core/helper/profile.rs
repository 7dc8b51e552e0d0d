//! National profile mapping
//!
//! The mapping from directory titles and functions to national profiles is
//! data: one row per known value. Lookups are case-insensitive.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// National access profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum NationalProfile {
    /// Pupil
    Student,
    /// Teacher
    Teacher,
    /// Librarian / documentalist
    Documentalist,
    /// School life staff
    EducationStaff,
    /// Trainee teacher
    Trainee,
    /// Head of school
    Director,
    /// Administrative or technical staff
    Staff,
    /// Local authority staff
    Collectivity,
}

impl NationalProfile {
    /// Every profile, in declaration order
    pub const ALL: [NationalProfile; 8] = [
        NationalProfile::Student,
        NationalProfile::Teacher,
        NationalProfile::Documentalist,
        NationalProfile::EducationStaff,
        NationalProfile::Trainee,
        NationalProfile::Director,
        NationalProfile::Staff,
        NationalProfile::Collectivity,
    ];

    /// Code sent to the platform
    pub fn code(&self) -> &'static str {
        match self {
            NationalProfile::Student => "National_elv",
            NationalProfile::Teacher => "National_ens",
            NationalProfile::Documentalist => "National_doc",
            NationalProfile::EducationStaff => "National_evs",
            NationalProfile::Trainee => "National_etd",
            NationalProfile::Director => "National_dir",
            NationalProfile::Staff => "National_eta",
            NationalProfile::Collectivity => "National_col",
        }
    }

    /// Whether the platform accepts this profile as is
    pub fn is_supported(&self) -> bool {
        SUPPORTED_PROFILES.contains(&self.code())
    }
}

impl fmt::Display for NationalProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for NationalProfile {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NationalProfile::ALL
            .into_iter()
            .find(|profile| profile.code().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("Unknown national profile '{s}'"))
    }
}

/// Profile codes accepted in output files
pub const SUPPORTED_PROFILES: [&str; 5] = [
    "National_elv",
    "National_ens",
    "National_doc",
    "National_evs",
    "National_etd",
];

/// Known title and function values
const DEFAULT_ROWS: &[(&str, NationalProfile)] = &[
    ("ELEVE", NationalProfile::Student),
    ("ELV", NationalProfile::Student),
    ("ENS", NationalProfile::Teacher),
    ("ENSEIGNANT", NationalProfile::Teacher),
    ("ENSEIGNEMENT", NationalProfile::Teacher),
    ("DOC", NationalProfile::Documentalist),
    ("DOCUMENTATION", NationalProfile::Documentalist),
    ("EDU", NationalProfile::EducationStaff),
    ("EDUCATION", NationalProfile::EducationStaff),
    ("CPE", NationalProfile::EducationStaff),
    ("SURVEILLANCE", NationalProfile::EducationStaff),
    ("ETD", NationalProfile::Trainee),
    ("STAGIAIRE", NationalProfile::Trainee),
    ("DIR", NationalProfile::Director),
    ("DIRECTION", NationalProfile::Director),
    ("ADF", NationalProfile::Staff),
    ("ADMINISTRATIF", NationalProfile::Staff),
    ("ALB", NationalProfile::Staff),
    ("LABORATOIRE", NationalProfile::Staff),
    ("OUV", NationalProfile::Staff),
    ("COL", NationalProfile::Collectivity),
    ("COLLECTIVITE", NationalProfile::Collectivity),
];

/// Finite mapping table from directory values to national profiles
#[derive(Debug, Clone)]
pub struct ProfileTable {
    rows: HashMap<String, NationalProfile>,
}

impl ProfileTable {
    /// Default rows plus configured ones; configured rows win
    pub fn with_extra<'a>(
        extra: impl IntoIterator<Item = (&'a String, &'a String)>,
    ) -> Result<Self, String> {
        let mut table = Self::default();
        for (value, code) in extra {
            let profile = code.parse::<NationalProfile>()?;
            table.rows.insert(value.trim().to_uppercase(), profile);
        }
        Ok(table)
    }

    /// Looks one value up
    pub fn lookup(&self, value: &str) -> Option<NationalProfile> {
        self.rows.get(&value.trim().to_uppercase()).copied()
    }

    /// Resolves a (title, function) pair
    ///
    /// The function wins when it maps to a profile, the title is the
    /// fallback. A profile outside the supported list becomes
    /// [`NationalProfile::Teacher`].
    pub fn resolve(&self, title: Option<&str>, function: Option<&str>) -> Option<NationalProfile> {
        let resolved = function
            .and_then(|value| self.lookup(value))
            .or_else(|| title.and_then(|value| self.lookup(value)));

        match resolved {
            Some(profile) if profile.is_supported() => Some(profile),
            Some(profile) => {
                tracing::debug!(
                    profile = %profile,
                    "Unsupported national profile downgraded to {}",
                    NationalProfile::Teacher
                );
                Some(NationalProfile::Teacher)
            }
            None => {
                tracing::debug!(
                    title = title.unwrap_or_default(),
                    function = function.unwrap_or_default(),
                    "No national profile for title/function"
                );
                None
            }
        }
    }
}

impl Default for ProfileTable {
    fn default() -> Self {
        Self {
            rows: DEFAULT_ROWS
                .iter()
                .map(|(value, profile)| (value.to_string(), *profile))
                .collect(),
        }
    }
}
