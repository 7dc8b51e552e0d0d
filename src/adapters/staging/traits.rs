//! Staging store abstraction
//!
//! The staging store is the only channel between the person passes
//! (pupils, teachers) and the structure passes (schools, groups). It is
//! scoped to one export run.

use crate::domain::{PersonId, Result, Staff, StaffRole, TeachingFact, Uai};
use async_trait::async_trait;
use std::collections::BTreeSet;

/// Run-scoped store of staged teaching facts
#[async_trait]
pub trait StagingStore: Send + Sync {
    /// Prepare the store for a new run
    ///
    /// # Errors
    ///
    /// Returns an error if the backing storage cannot be reached or its
    /// schema cannot be created.
    async fn prepare(&self) -> Result<()>;

    /// Append facts for one person at one school
    ///
    /// Idempotent per `(uai, person_id)`: a second call extends the same
    /// staff record with the union of facts and the latest role. All facts
    /// of one call are committed together or not at all.
    async fn append(
        &self,
        uai: &Uai,
        person_id: &PersonId,
        role: StaffRole,
        facts: &BTreeSet<TeachingFact>,
    ) -> Result<()>;

    /// Staff records of a school with the given role, ordered by person id
    async fn query_by_uai(&self, uai: &Uai, role: StaffRole) -> Result<Vec<Staff>>;

    /// Drop everything staged during this run
    async fn discard(&self) -> Result<()>;

    /// Backend name, for logs
    fn backend_name(&self) -> &str;
}
