//! Profile and code helper
//!
//! One long-lived [`CodeHelper`] is built per run and shared by every
//! builder. It owns the national profile table, the index alias cache and
//! the output file naming template.

pub mod profile;

pub use profile::{NationalProfile, ProfileTable, SUPPORTED_PROFILES};

use crate::config::{IndexConfig, OutputConfig, ProfileConfig};
use crate::domain::{GarError, Result};
use chrono::NaiveDate;
use std::collections::HashMap;
use std::fmt;
use std::sync::Mutex;

/// Kind of code checked against the external index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ObjectType {
    /// Curriculum track (MEF)
    CurriculumTrack,
    /// Subject (matière)
    Subject,
}

impl ObjectType {
    /// Object name substituted into alias templates
    pub fn alias_name(&self) -> &'static str {
        match self {
            ObjectType::CurriculumTrack => "mef",
            ObjectType::Subject => "matiere",
        }
    }
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.alias_name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct AliasKey {
    source: String,
    territory: String,
    object_type: ObjectType,
}

/// Shared profile, contract, alias and naming helper
pub struct CodeHelper {
    profiles: ProfileTable,
    pupil_title: String,
    alias_template: String,
    agricultural_alias_template: String,
    agricultural_pattern: String,
    file_template: String,
    aliases: Mutex<HashMap<AliasKey, String>>,
}

impl CodeHelper {
    /// Builds the helper from configuration
    pub fn new(
        profiles: &ProfileConfig,
        index: &IndexConfig,
        output: &OutputConfig,
    ) -> Result<Self> {
        let table = ProfileTable::with_extra(&profiles.extra)
            .map_err(|e| GarError::Configuration(format!("profiles.extra: {e}")))?;

        Ok(Self {
            profiles: table,
            pupil_title: profiles.pupil_title.clone(),
            alias_template: index.alias_template.clone(),
            agricultural_alias_template: index.agricultural_alias_template.clone(),
            agricultural_pattern: index.agricultural_pattern.to_lowercase(),
            file_template: output.file_template.clone(),
            aliases: Mutex::new(HashMap::new()),
        })
    }

    /// Resolves a national profile, preferring `function` over `title`
    ///
    /// Unknown values yield `None`. Known but unsupported profiles are
    /// downgraded to the teaching profile.
    pub fn resolve_profile(
        &self,
        title: Option<&str>,
        function: Option<&str>,
    ) -> Option<NationalProfile> {
        self.profiles.resolve(title, function)
    }

    /// Title assumed for pupils without one
    pub fn pupil_title(&self) -> &str {
        &self.pupil_title
    }

    /// Two-letter contract code: first two characters, upper-cased
    pub fn resolve_contract(&self, code: &str) -> Option<String> {
        let contract: String = code.trim().chars().take(2).collect::<String>().to_uppercase();
        if contract.chars().count() == 2 && contract.chars().all(|c| c.is_ascii_uppercase()) {
            Some(contract)
        } else {
            tracing::debug!(code = %code, "Contract code ignored");
            None
        }
    }

    /// Index alias for a source system, territory and object type
    ///
    /// Memoized per key. Source systems whose identifier contains the
    /// agricultural pattern use the agricultural alias family.
    pub fn resolve_index_alias(
        &self,
        source: &str,
        territory: &str,
        object_type: ObjectType,
    ) -> String {
        let key = AliasKey {
            source: source.to_string(),
            territory: territory.to_string(),
            object_type,
        };

        let mut aliases = match self.aliases.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        aliases
            .entry(key)
            .or_insert_with(|| {
                let template = if source.to_lowercase().contains(&self.agricultural_pattern) {
                    &self.agricultural_alias_template
                } else {
                    &self.alias_template
                };
                let alias = template
                    .replace("{territory}", &territory.to_lowercase())
                    .replace("{object}", object_type.alias_name());
                tracing::debug!(
                    source = %source,
                    territory = %territory,
                    object_type = %object_type,
                    alias = %alias,
                    "Resolved index alias"
                );
                alias
            })
            .clone()
    }

    /// Output file name for one written envelope
    pub fn file_name(&self, category: &str, timestamp: &str, page: usize, increment: usize) -> String {
        self.file_template
            .replace("{category}", category)
            .replace("{timestamp}", timestamp)
            .replace("{page}", &page.to_string())
            .replace("{increment}", &increment.to_string())
    }
}

/// Normalizes a birth date to `YYYY-MM-DD`
///
/// Accepts `YYYY-MM-DD`, `DD/MM/YYYY` and `YYYYMMDD`.
pub fn normalize_birth_date(value: &str) -> Option<String> {
    ["%Y-%m-%d", "%d/%m/%Y", "%Y%m%d"]
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(value.trim(), format).ok())
        .map(|date| date.format("%Y-%m-%d").to_string())
}
