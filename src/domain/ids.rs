//! Domain identifier types with validation
//!
//! Newtype wrappers for the identifiers that key the export: school UAIs
//! and opaque person identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// School identifier (UAI)
///
/// Seven digits followed by one letter. Input is trimmed and upper-cased.
///
/// # Examples
///
/// ```
/// use gar_export::domain::ids::Uai;
/// use std::str::FromStr;
///
/// let uai = Uai::from_str("0350063d").unwrap();
/// assert_eq!(uai.as_str(), "0350063D");
/// assert!(Uai::new("350063D").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Uai(String);

impl Uai {
    /// Creates a new Uai, checking the 7 digits + 1 letter layout
    pub fn new(uai: impl Into<String>) -> Result<Self, String> {
        let uai = uai.into().trim().to_ascii_uppercase();
        if !is_valid_uai(&uai) {
            return Err(format!("Invalid UAI '{uai}': expected 7 digits and 1 letter"));
        }
        Ok(Self(uai))
    }

    /// Returns the UAI as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes self and returns the inner String
    pub fn into_inner(self) -> String {
        self.0
    }
}

/// Checks the UAI layout on an already normalized value
pub fn is_valid_uai(value: &str) -> bool {
    let bytes = value.as_bytes();
    bytes.len() == 8
        && bytes[..7].iter().all(u8::is_ascii_digit)
        && bytes[7].is_ascii_uppercase()
}

impl fmt::Display for Uai {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Uai {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl AsRef<str> for Uai {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Opaque person identifier
///
/// Already pseudonymized upstream; only non-blankness is checked.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PersonId(String);

impl PersonId {
    /// Creates a new PersonId from a string
    pub fn new(id: impl Into<String>) -> Result<Self, String> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err("Person ID cannot be empty".to_string());
        }
        Ok(Self(id))
    }

    /// Returns the person ID as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PersonId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for PersonId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl AsRef<str> for PersonId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uai_valid() {
        let uai = Uai::new("0350063D").unwrap();
        assert_eq!(uai.as_str(), "0350063D");
        assert_eq!(uai.to_string(), "0350063D");
    }

    #[test]
    fn test_uai_normalized() {
        let uai = Uai::new(" 0350063d ").unwrap();
        assert_eq!(uai.as_str(), "0350063D");
    }

    #[test]
    fn test_uai_invalid() {
        assert!(Uai::new("").is_err());
        assert!(Uai::new("0350063").is_err());
        assert!(Uai::new("03500631").is_err());
        assert!(Uai::new("A350063D").is_err());
        assert!(Uai::new("0350063DD").is_err());
    }

    #[test]
    fn test_person_id() {
        let id = PersonId::from_str("e1a2b3").unwrap();
        assert_eq!(id.as_str(), "e1a2b3");
        assert!(PersonId::new("   ").is_err());
    }

    #[test]
    fn test_ids_ordering() {
        let a = Uai::new("0350001A").unwrap();
        let b = Uai::new("0350002A").unwrap();
        assert!(a < b);
    }
}
