//! File-backed sources
//!
//! Input snapshots are JSON arrays of attribute records. The code index can
//! also be served from a JSON snapshot keyed by alias.

use super::traits::{SearchRequest, SearchSource, Source};
use crate::domain::{AttributeRecord, GarError, IndexError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Resource group read from a JSON snapshot file
pub struct JsonFileSource {
    name: String,
    path: PathBuf,
}

impl JsonFileSource {
    /// Creates a source over one snapshot file
    pub fn new(name: impl Into<String>, path: impl AsRef<Path>) -> Self {
        Self {
            name: name.into(),
            path: path.as_ref().to_path_buf(),
        }
    }
}

#[async_trait]
impl Source for JsonFileSource {
    async fn entries(&self) -> Result<Vec<AttributeRecord>> {
        let contents = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            GarError::Input(format!(
                "Failed to read {} snapshot {}: {}",
                self.name,
                self.path.display(),
                e
            ))
        })?;

        let entries: Vec<AttributeRecord> = serde_json::from_str(&contents).map_err(|e| {
            GarError::Input(format!(
                "Malformed {} snapshot {}: {}",
                self.name,
                self.path.display(),
                e
            ))
        })?;

        tracing::info!(
            source = %self.name,
            path = %self.path.display(),
            count = entries.len(),
            "Loaded input snapshot"
        );

        Ok(entries)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Code index served from a JSON snapshot: `{ "<alias>": [document, ...] }`
pub struct FileIndexSource {
    path: PathBuf,
    documents: HashMap<String, Vec<serde_json::Value>>,
}

impl FileIndexSource {
    /// Loads the snapshot
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let contents = tokio::fs::read_to_string(&path).await.map_err(|e| {
            GarError::Configuration(format!(
                "Failed to read code index snapshot {}: {}",
                path.display(),
                e
            ))
        })?;

        let documents: HashMap<String, Vec<serde_json::Value>> = serde_json::from_str(&contents)
            .map_err(|e| {
                GarError::Configuration(format!(
                    "Malformed code index snapshot {}: {}",
                    path.display(),
                    e
                ))
            })?;

        tracing::info!(
            path = %path.display(),
            aliases = documents.len(),
            "Loaded code index snapshot"
        );

        Ok(Self { path, documents })
    }

    /// Builds an index from in-memory documents
    pub fn from_documents(documents: HashMap<String, Vec<serde_json::Value>>) -> Self {
        Self {
            path: PathBuf::from("<memory>"),
            documents,
        }
    }
}

#[async_trait]
impl SearchSource for FileIndexSource {
    async fn search(&self, request: &SearchRequest) -> Result<serde_json::Value> {
        let alias = request.alias().ok_or_else(|| {
            IndexError::InvalidRequest(format!("unsupported search api '{}'", request.api))
        })?;
        let (field, value) = request.query_term().ok_or_else(|| {
            IndexError::InvalidRequest(format!("unsupported parameters '{}'", request.parameters))
        })?;

        let documents = self.documents.get(alias).ok_or_else(|| IndexError::ClientError {
            status: 404,
            message: format!("no such index alias '{alias}' in {}", self.path.display()),
        })?;

        let hits: Vec<serde_json::Value> = documents
            .iter()
            .filter(|doc| doc.get(field).and_then(|v| v.as_str()) == Some(value))
            .map(|doc| serde_json::json!({ "_source": doc }))
            .collect();

        Ok(serde_json::json!({
            "hits": {
                "total": hits.len(),
                "hits": hits,
            }
        }))
    }

    fn name(&self) -> &str {
        "file"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[tokio::test]
    async fn test_json_file_source_entries() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[{{"uid": "p1", "sn": "Martin"}}, {{"uid": ["p2"], "sn": ["Durand"]}}]"#
        )
        .unwrap();

        let source = JsonFileSource::new("pupils", file.path());
        let entries = source.entries().await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].optional("sn"), Some("Durand"));
    }

    #[tokio::test]
    async fn test_json_file_source_missing_file() {
        let source = JsonFileSource::new("pupils", "/nonexistent/pupils.json");
        let err = source.entries().await.unwrap_err();
        assert!(matches!(err, GarError::Input(_)));
    }

    #[tokio::test]
    async fn test_json_file_source_malformed() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{"not": "an array"}}"#).unwrap();

        let source = JsonFileSource::new("pupils", file.path());
        assert!(source.entries().await.is_err());
    }

    #[tokio::test]
    async fn test_file_index_search() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"rennes-matiere": [
                {{"identifiant": "030100", "libelle": "FRANCAIS"}},
                {{"identifiant": "061300", "libelle": "MATHEMATIQUES"}}
            ]}}"#
        )
        .unwrap();

        let index = FileIndexSource::load(file.path()).await.unwrap();
        let response = index
            .search(&SearchRequest::exact("rennes-matiere", "identifiant", "030100"))
            .await
            .unwrap();

        assert_eq!(response["hits"]["total"], 1);
        assert_eq!(response["hits"]["hits"][0]["_source"]["libelle"], "FRANCAIS");

        let response = index
            .search(&SearchRequest::exact("rennes-matiere", "identifiant", "999999"))
            .await
            .unwrap();
        assert_eq!(response["hits"]["total"], 0);
    }

    #[tokio::test]
    async fn test_file_index_unknown_alias() {
        let index = FileIndexSource::from_documents(HashMap::new());
        let err = index
            .search(&SearchRequest::exact("rennes-mef", "identifiant", "1"))
            .await
            .unwrap_err();
        assert!(matches!(err, GarError::Index(IndexError::ClientError { status: 404, .. })));
    }
}
