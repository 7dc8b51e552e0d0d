//! Staging store abstraction and factory

pub mod memory;
pub mod traits;

pub use memory::MemoryStagingStore;
pub use traits::StagingStore;

use crate::adapters::postgresql::{PostgreSQLClient, PostgreSQLStagingStore};
use crate::config::{StagingBackend, StagingConfig};
use crate::domain::{GarError, Result};
use std::sync::Arc;

/// Create the staging store based on the configuration
///
/// # Errors
///
/// Returns an error if the PostgreSQL section is missing or its client
/// cannot be created.
pub async fn create_staging_store(config: &StagingConfig) -> Result<Arc<dyn StagingStore>> {
    match config.backend {
        StagingBackend::Memory => {
            tracing::info!("Creating in-memory staging store");
            Ok(Arc::new(MemoryStagingStore::new()))
        }
        StagingBackend::PostgreSQL => {
            let pg_config = config.postgresql.as_ref().ok_or_else(|| {
                GarError::Configuration(
                    "staging.postgresql is required when backend = postgresql".to_string(),
                )
            })?;

            let client = PostgreSQLClient::new(pg_config.clone()).await?;
            tracing::info!(
                connection = %client.connection_string_safe(),
                "Creating PostgreSQL staging store"
            );
            Ok(Arc::new(PostgreSQLStagingStore::new(client)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_memory_store() {
        let store = create_staging_store(&StagingConfig::default()).await.unwrap();
        assert_eq!(store.backend_name(), "memory");
    }

    #[tokio::test]
    async fn test_create_postgresql_store_without_section() {
        let config = StagingConfig {
            backend: StagingBackend::PostgreSQL,
            postgresql: None,
        };
        assert!(matches!(
            create_staging_store(&config).await,
            Err(GarError::Configuration(_))
        ));
    }
}
