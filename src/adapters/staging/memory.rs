//! In-memory staging store

use super::traits::StagingStore;
use crate::domain::{PersonId, Result, Staff, StaffRole, TeachingFact, Uai};
use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet};
use tokio::sync::RwLock;

/// Staging store held in process memory
///
/// Appends take the write lock for their whole duration, so an append for
/// a key is never observed half done.
#[derive(Debug, Default)]
pub struct MemoryStagingStore {
    staff: RwLock<BTreeMap<(Uai, PersonId), Staff>>,
}

impl MemoryStagingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of staged staff records
    pub async fn len(&self) -> usize {
        self.staff.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.staff.read().await.is_empty()
    }
}

#[async_trait]
impl StagingStore for MemoryStagingStore {
    async fn prepare(&self) -> Result<()> {
        self.staff.write().await.clear();
        Ok(())
    }

    async fn append(
        &self,
        uai: &Uai,
        person_id: &PersonId,
        role: StaffRole,
        facts: &BTreeSet<TeachingFact>,
    ) -> Result<()> {
        let mut staff = self.staff.write().await;
        let record = staff
            .entry((uai.clone(), person_id.clone()))
            .or_insert_with(|| Staff {
                uai: uai.clone(),
                person_id: person_id.clone(),
                role,
                facts: BTreeSet::new(),
            });

        record.role = role;
        record.facts.extend(facts.iter().cloned());

        tracing::trace!(
            uai = %uai,
            person_id = %person_id,
            role = %role,
            facts = record.facts.len(),
            "Staged facts"
        );

        Ok(())
    }

    async fn query_by_uai(&self, uai: &Uai, role: StaffRole) -> Result<Vec<Staff>> {
        let staff = self.staff.read().await;
        Ok(staff
            .values()
            .filter(|record| &record.uai == uai && record.role == role)
            .cloned()
            .collect())
    }

    async fn discard(&self) -> Result<()> {
        let mut staff = self.staff.write().await;
        let count = staff.len();
        staff.clear();
        tracing::debug!(count = count, "Discarded staged records");
        Ok(())
    }

    fn backend_name(&self) -> &str {
        "memory"
    }
}
