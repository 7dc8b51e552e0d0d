//! Input snapshot and code index sources

pub mod file;
pub mod http;
pub mod traits;

pub use file::{FileIndexSource, JsonFileSource};
pub use http::HttpIndexSource;
pub use traits::{SearchRequest, SearchSource, Source};

use crate::config::{IndexConfig, IndexKind};
use crate::domain::{GarError, Result};
use std::sync::Arc;

/// Create the code index configured for this run
///
/// # Errors
///
/// Returns a configuration error when the selected kind lacks its location,
/// or when a file snapshot cannot be loaded.
pub async fn create_index_source(config: &IndexConfig) -> Result<Arc<dyn SearchSource>> {
    match config.kind {
        IndexKind::Http => {
            let source = HttpIndexSource::new(config)?;
            tracing::info!(base_url = ?config.base_url, "Using HTTP code index");
            Ok(Arc::new(source))
        }
        IndexKind::File => {
            let path = config.path.as_deref().ok_or_else(|| {
                GarError::Configuration("index.path is required for a file index".to_string())
            })?;
            let source = FileIndexSource::load(path).await?;
            Ok(Arc::new(source))
        }
    }
}
