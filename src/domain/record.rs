//! Attribute records and structured tokens
//!
//! Input snapshots are lists of attribute records: a map from attribute name
//! to a list of string values. Multi-valued attributes that carry structure
//! use `$`-separated tokens whose first field is a school UAI, e.g.
//! `0350063D$2NDE1$Seconde 1`.

use super::errors::MissingAttribute;
use super::ids::Uai;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

/// Token field separator
pub const TOKEN_SEPARATOR: char = '$';

/// One input record: attribute name to values
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct AttributeRecord {
    attributes: BTreeMap<String, Vec<String>>,
}

impl<'de> Deserialize<'de> for AttributeRecord {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(Self {
            attributes: deserialize_attributes(deserializer)?,
        })
    }
}

/// A single string is accepted where a list is expected
#[derive(Deserialize)]
#[serde(untagged)]
enum AttributeValue {
    One(String),
    Many(Vec<String>),
}

fn deserialize_attributes<'de, D>(deserializer: D) -> Result<BTreeMap<String, Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = BTreeMap::<String, AttributeValue>::deserialize(deserializer)?;
    Ok(raw
        .into_iter()
        .map(|(name, value)| {
            let values = match value {
                AttributeValue::One(v) => vec![v],
                AttributeValue::Many(vs) => vs,
            };
            (name, values)
        })
        .collect())
}

impl AttributeRecord {
    /// Creates an empty record
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style setter, mostly for tests and fixtures
    pub fn with(mut self, name: &str, values: &[&str]) -> Self {
        self.insert(name, values.iter().map(|v| v.to_string()).collect());
        self
    }

    /// Sets (replaces) the values of an attribute
    pub fn insert(&mut self, name: &str, values: Vec<String>) {
        self.attributes.insert(name.to_string(), values);
    }

    /// All non-blank values of an attribute, trimmed
    pub fn values<'a>(&'a self, name: &str) -> impl Iterator<Item = &'a str> + 'a {
        self.attributes
            .get(name)
            .into_iter()
            .flatten()
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    /// First non-blank value of an attribute
    ///
    /// An absent value is logged at DEBUG.
    pub fn optional(&self, name: &str) -> Option<&str> {
        let value = self.values(name).next();
        if value.is_none() {
            tracing::debug!(attribute = %name, "Optional attribute absent");
        }
        value
    }

    /// First non-blank value of an attribute, or a [`MissingAttribute`]
    pub fn mandatory(&self, name: &str) -> Result<&str, MissingAttribute> {
        self.values(name)
            .next()
            .ok_or_else(|| MissingAttribute::new(name))
    }

    /// Structured tokens of an attribute, malformed ones reported separately
    pub fn tokens<'a>(&'a self, name: &str) -> Vec<std::result::Result<Token<'a>, &'a str>> {
        self.values(name)
            .map(|raw| Token::parse(raw).ok_or(raw))
            .collect()
    }

    /// Whether the record has no attribute at all
    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }
}

/// A `$`-separated token whose first field is a valid UAI
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token<'a> {
    uai: Uai,
    fields: Vec<&'a str>,
}

impl<'a> Token<'a> {
    /// Parses a token; `None` when the leading UAI is invalid
    pub fn parse(raw: &'a str) -> Option<Self> {
        let mut parts = raw.split(TOKEN_SEPARATOR).map(str::trim);
        let uai = Uai::new(parts.next()?).ok()?;
        Some(Self {
            uai,
            fields: parts.collect(),
        })
    }

    /// School the token belongs to
    pub fn uai(&self) -> &Uai {
        &self.uai
    }

    /// Field after the UAI, zero-based, `None` when absent or blank
    pub fn field(&self, index: usize) -> Option<&'a str> {
        self.fields
            .get(index)
            .copied()
            .filter(|value| !value.is_empty())
    }

    /// Non-blank fields starting at `index`
    pub fn fields_from(&self, index: usize) -> impl Iterator<Item = &'a str> + '_ {
        self.fields
            .iter()
            .skip(index)
            .copied()
            .filter(|value| !value.is_empty())
    }
}
