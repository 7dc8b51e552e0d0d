//! PostgreSQL staging store
//!
//! One staff row per (uai, person_id) and one fact row per distinct fact.
//! Every append runs in its own transaction.

use crate::adapters::postgresql::client::PostgreSQLClient;
use crate::adapters::staging::StagingStore;
use crate::domain::{
    FactType, PersonId, Result, Staff, StaffRole, StagingError, TeachingFact, Uai,
};
use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tokio_postgres::Row;

/// Staging store backed by PostgreSQL tables
pub struct PostgreSQLStagingStore {
    client: Arc<PostgreSQLClient>,
}

impl PostgreSQLStagingStore {
    pub fn new(client: PostgreSQLClient) -> Self {
        Self {
            client: Arc::new(client),
        }
    }

    /// Get a reference to the underlying client
    pub fn client(&self) -> &Arc<PostgreSQLClient> {
        &self.client
    }

    fn staff_table(&self) -> String {
        self.client.table("staff")
    }

    fn fact_table(&self) -> String {
        self.client.table("fact")
    }
}

#[async_trait]
impl StagingStore for PostgreSQLStagingStore {
    async fn prepare(&self) -> Result<()> {
        self.client.test_connection().await?;
        self.client.ensure_schema().await?;

        let conn = self.client.get_connection().await?;
        conn.batch_execute(&format!(
            "TRUNCATE {}, {}",
            self.fact_table(),
            self.staff_table()
        ))
        .await
        .map_err(|e| StagingError::Schema(format!("Failed to clear staging tables: {e}")))?;

        Ok(())
    }

    async fn append(
        &self,
        uai: &Uai,
        person_id: &PersonId,
        role: StaffRole,
        facts: &BTreeSet<TeachingFact>,
    ) -> Result<()> {
        let mut conn = self.client.get_connection().await?;
        let tx = conn
            .transaction()
            .await
            .map_err(|e| StagingError::Transaction(e.to_string()))?;

        let upsert = format!(
            "INSERT INTO {} (uai, person_id, role) VALUES ($1, $2, $3) \
             ON CONFLICT (uai, person_id) DO UPDATE SET role = EXCLUDED.role \
             RETURNING id",
            self.staff_table()
        );
        let row = tx
            .query_one(&upsert, &[&uai.as_str(), &person_id.as_str(), &role.as_str()])
            .await
            .map_err(|e| StagingError::Query(format!("Failed to upsert staff: {e}")))?;
        let staff_id: i64 = row.get(0);

        if !facts.is_empty() {
            let insert = format!(
                "INSERT INTO {} (staff_id, source_id, code, group_code, fact_type) \
                 VALUES ($1, $2, $3, $4, $5) ON CONFLICT DO NOTHING",
                self.fact_table()
            );
            let statement = tx
                .prepare(&insert)
                .await
                .map_err(|e| StagingError::Query(format!("Failed to prepare fact insert: {e}")))?;

            for fact in facts {
                let group_code = fact.group_code.as_deref().unwrap_or_default();
                tx.execute(
                    &statement,
                    &[
                        &staff_id,
                        &fact.source_id,
                        &fact.code,
                        &group_code,
                        &fact.fact_type.as_str(),
                    ],
                )
                .await
                .map_err(|e| StagingError::Query(format!("Failed to insert fact: {e}")))?;
            }
        }

        tx.commit()
            .await
            .map_err(|e| StagingError::Transaction(e.to_string()))?;

        tracing::trace!(
            uai = %uai,
            person_id = %person_id,
            role = %role,
            facts = facts.len(),
            "Staged facts"
        );

        Ok(())
    }

    async fn query_by_uai(&self, uai: &Uai, role: StaffRole) -> Result<Vec<Staff>> {
        let conn = self.client.get_connection().await?;
        let query = format!(
            "SELECT s.person_id, f.source_id, f.code, f.group_code, f.fact_type \
             FROM {} s LEFT JOIN {} f ON f.staff_id = s.id \
             WHERE s.uai = $1 AND s.role = $2 \
             ORDER BY s.person_id",
            self.staff_table(),
            self.fact_table()
        );

        let rows = conn
            .query(&query, &[&uai.as_str(), &role.as_str()])
            .await
            .map_err(|e| StagingError::Query(format!("Failed to query staff: {e}")))?;

        let mut staff: BTreeMap<PersonId, Staff> = BTreeMap::new();
        for row in rows {
            let person_id: String = row.get(0);
            let person_id = PersonId::new(person_id).map_err(StagingError::InvalidData)?;
            let record = staff.entry(person_id.clone()).or_insert_with(|| Staff {
                uai: uai.clone(),
                person_id,
                role,
                facts: BTreeSet::new(),
            });

            if let Some(fact) = fact_from_row(&row)? {
                record.facts.insert(fact);
            }
        }

        Ok(staff.into_values().collect())
    }

    async fn discard(&self) -> Result<()> {
        let conn = self.client.get_connection().await?;
        conn.batch_execute(&format!(
            "DROP TABLE IF EXISTS {}, {}",
            self.fact_table(),
            self.staff_table()
        ))
        .await
        .map_err(|e| StagingError::Query(format!("Failed to drop staging tables: {e}")))?;

        tracing::debug!(
            prefix = %self.client.table(""),
            "Dropped staging tables"
        );
        Ok(())
    }

    fn backend_name(&self) -> &str {
        "postgresql"
    }
}

/// Decode the fact columns of a joined row, `None` for a staff row without facts
fn fact_from_row(row: &Row) -> Result<Option<TeachingFact>> {
    let source_id: Option<String> = row.get(1);
    let code: Option<String> = row.get(2);
    let group_code: Option<String> = row.get(3);
    let fact_type: Option<String> = row.get(4);

    match (source_id, code, fact_type) {
        (Some(source_id), Some(code), Some(fact_type)) => {
            let fact_type: FactType = fact_type.parse().map_err(StagingError::InvalidData)?;
            Ok(Some(TeachingFact {
                source_id,
                code,
                group_code: group_code.filter(|value| !value.is_empty()),
                fact_type,
            }))
        }
        _ => Ok(None),
    }
}
