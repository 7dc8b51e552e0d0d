//! Core domain types and models
//!
//! This module contains the domain model for the GAR export:
//! identifiers, input attribute records, staged teaching facts, the GAR
//! output records, run health and errors.

pub mod entities;
pub mod errors;
pub mod health;
pub mod ids;
pub mod record;
pub mod result;
pub mod staging;

// Re-export commonly used types
pub use errors::{GarError, IndexError, MissingAttribute, StagingError};
pub use health::Health;
pub use ids::{PersonId, Uai};
pub use record::{AttributeRecord, Token};
pub use result::Result;
pub use staging::{FactType, Staff, StaffRole, TeachingFact};
