//! Run health

use serde::{Deserialize, Serialize};
use std::fmt;

/// Overall health of an export run
///
/// Ordered `Ok < Warn < Fatal`. A run only ever gets worse.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum Health {
    /// Nothing worth reporting
    #[default]
    Ok,
    /// Entities were skipped, output is partial
    Warn,
    /// The run aborted
    Fatal,
}

impl Health {
    /// Returns the worse of both values
    pub fn worsen(self, other: Health) -> Health {
        self.max(other)
    }

    /// Numeric form used by the atomic holder
    pub(crate) fn as_u8(self) -> u8 {
        match self {
            Health::Ok => 0,
            Health::Warn => 1,
            Health::Fatal => 2,
        }
    }

    pub(crate) fn from_u8(value: u8) -> Health {
        match value {
            0 => Health::Ok,
            1 => Health::Warn,
            _ => Health::Fatal,
        }
    }
}

impl fmt::Display for Health {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Health::Ok => "OK",
            Health::Warn => "WARN",
            Health::Fatal => "FATAL",
        };
        f.write_str(label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_only_worsens() {
        assert_eq!(Health::Ok.worsen(Health::Warn), Health::Warn);
        assert_eq!(Health::Warn.worsen(Health::Ok), Health::Warn);
        assert_eq!(Health::Fatal.worsen(Health::Warn), Health::Fatal);
    }

    #[test]
    fn test_health_u8_roundtrip() {
        for health in [Health::Ok, Health::Warn, Health::Fatal] {
            assert_eq!(Health::from_u8(health.as_u8()), health);
        }
    }
}
