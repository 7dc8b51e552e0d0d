//! External code validator
//!
//! Confirms that a curriculum track or subject code exists in the national
//! referential before it is emitted. A code is valid only when the index
//! returns exactly one match. Query failures are never swallowed.

use crate::adapters::source::{SearchRequest, SearchSource};
use crate::config::IndexConfig;
use crate::core::helper::{CodeHelper, ObjectType};
use crate::domain::{IndexError, Result};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// A code known to the referential, with its label
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeEntry {
    pub code: String,
    pub label: String,
}

/// Code validator over the search index
pub struct CodeValidator {
    index: Arc<dyn SearchSource>,
    helper: Arc<CodeHelper>,
    territory: String,
    code_field: String,
    label_field: String,
    max_concurrent_queries: usize,
    /// (alias, code) -> lookup outcome
    cache: Mutex<HashMap<(String, String), Option<CodeEntry>>>,
}

impl CodeValidator {
    pub fn new(index: Arc<dyn SearchSource>, helper: Arc<CodeHelper>, config: &IndexConfig) -> Self {
        Self {
            index,
            helper,
            territory: config.territory.clone(),
            code_field: config.code_field.clone(),
            label_field: config.label_field.clone(),
            max_concurrent_queries: config.max_concurrent_queries.max(1),
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Upper bound on concurrent lookups
    pub fn max_concurrent_queries(&self) -> usize {
        self.max_concurrent_queries
    }

    /// Looks a code up in the referential of its source system
    ///
    /// Returns `None` when the index holds zero or several matches.
    ///
    /// # Errors
    ///
    /// Any index failure is returned as is: an unreachable index makes every
    /// code untrustworthy.
    pub async fn lookup_code(
        &self,
        source: &str,
        object_type: ObjectType,
        code: &str,
    ) -> Result<Option<CodeEntry>> {
        let code = code.trim();
        if code.is_empty() {
            return Ok(None);
        }

        let alias = self
            .helper
            .resolve_index_alias(source, &self.territory, object_type);
        let key = (alias, code.to_string());

        if let Some(cached) = self.cache.lock().await.get(&key) {
            return Ok(cached.clone());
        }

        let request = SearchRequest::exact(&key.0, &self.code_field, code);
        let response = self.index.search(&request).await?;
        let entry = self.parse_response(code, &response)?;

        if entry.is_none() {
            tracing::debug!(
                alias = %key.0,
                code = %code,
                object_type = %object_type,
                "Code not found in referential"
            );
        }

        self.cache.lock().await.insert(key, entry.clone());
        Ok(entry)
    }

    /// Whether a code exists exactly once in the referential
    pub async fn is_code_valid(
        &self,
        source: &str,
        object_type: ObjectType,
        code: &str,
    ) -> Result<bool> {
        Ok(self.lookup_code(source, object_type, code).await?.is_some())
    }

    fn parse_response(&self, code: &str, response: &serde_json::Value) -> Result<Option<CodeEntry>> {
        let hits = response
            .get("hits")
            .ok_or_else(|| IndexError::InvalidResponse("missing 'hits'".to_string()))?;

        let total = match hits.get("total") {
            Some(serde_json::Value::Number(n)) => n.as_u64(),
            Some(serde_json::Value::Object(o)) => o.get("value").and_then(|v| v.as_u64()),
            _ => None,
        }
        .ok_or_else(|| IndexError::InvalidResponse("missing 'hits.total'".to_string()))?;

        if total != 1 {
            return Ok(None);
        }

        let label = hits
            .get("hits")
            .and_then(|h| h.get(0))
            .and_then(|h| h.get("_source"))
            .and_then(|s| s.get(&self.label_field))
            .and_then(|l| l.as_str())
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .unwrap_or(code);

        Ok(Some(CodeEntry {
            code: code.to_string(),
            label: label.to_string(),
        }))
    }

    /// Number of cached lookups
    pub async fn cached(&self) -> usize {
        self.cache.lock().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::source::{FileIndexSource, HttpIndexSource};
    use crate::config::{IndexKind, OutputConfig, ProfileConfig, RetryConfig};
    use crate::domain::GarError;
    use mockito::Matcher;
    use serde_json::json;

    fn index_config(base_url: Option<String>) -> IndexConfig {
        IndexConfig {
            kind: IndexKind::Http,
            base_url,
            path: None,
            username: None,
            password: None,
            timeout_seconds: 5,
            territory: "rennes".to_string(),
            alias_template: "{territory}-{object}".to_string(),
            agricultural_alias_template: "{territory}-agri-{object}".to_string(),
            agricultural_pattern: "agri".to_string(),
            code_field: "identifiant".to_string(),
            label_field: "libelle".to_string(),
            max_concurrent_queries: 4,
            retry: RetryConfig {
                max_retries: 0,
                initial_delay_ms: 1,
                max_delay_ms: 1,
                backoff_multiplier: 1.0,
            },
        }
    }

    fn validator(index: Arc<dyn SearchSource>, config: &IndexConfig) -> CodeValidator {
        let helper =
            CodeHelper::new(&ProfileConfig::default(), config, &OutputConfig::default()).unwrap();
        CodeValidator::new(index, Arc::new(helper), config)
    }

    fn file_index() -> Arc<dyn SearchSource> {
        let mut documents = HashMap::new();
        documents.insert(
            "rennes-matiere".to_string(),
            vec![
                json!({"identifiant": "030100", "libelle": "FRANCAIS"}),
                json!({"identifiant": "061300", "libelle": "MATHEMATIQUES"}),
                json!({"identifiant": "DUP", "libelle": "A"}),
                json!({"identifiant": "DUP", "libelle": "B"}),
                json!({"identifiant": "NOLABEL"}),
            ],
        );
        documents.insert(
            "rennes-agri-mef".to_string(),
            vec![json!({"identifiant": "27621010001", "libelle": "BTSA"})],
        );
        Arc::new(FileIndexSource::from_documents(documents))
    }

    #[tokio::test]
    async fn test_lookup_code_with_label() {
        let validator = validator(file_index(), &index_config(None));
        let entry = validator
            .lookup_code("AC-RENNES", ObjectType::Subject, "030100")
            .await
            .unwrap();
        assert_eq!(
            entry,
            Some(CodeEntry {
                code: "030100".to_string(),
                label: "FRANCAIS".to_string()
            })
        );
    }

    #[tokio::test]
    async fn test_code_must_match_exactly_once() {
        let validator = validator(file_index(), &index_config(None));
        assert!(!validator
            .is_code_valid("AC-RENNES", ObjectType::Subject, "DUP")
            .await
            .unwrap());
        assert!(!validator
            .is_code_valid("AC-RENNES", ObjectType::Subject, "UNKNOWN")
            .await
            .unwrap());
        assert!(!validator
            .is_code_valid("AC-RENNES", ObjectType::Subject, "  ")
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_label_falls_back_to_code() {
        let validator = validator(file_index(), &index_config(None));
        let entry = validator
            .lookup_code("AC-RENNES", ObjectType::Subject, "NOLABEL")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(entry.label, "NOLABEL");
    }

    #[tokio::test]
    async fn test_agricultural_alias() {
        let validator = validator(file_index(), &index_config(None));
        assert!(validator
            .is_code_valid("SARAPIS-AGRI", ObjectType::CurriculumTrack, "27621010001")
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_unknown_alias_is_an_error() {
        let validator = validator(file_index(), &index_config(None));
        let err = validator
            .is_code_valid("AC-RENNES", ObjectType::CurriculumTrack, "10010012110")
            .await
            .unwrap_err();
        assert!(matches!(err, GarError::Index(_)));
    }

    #[tokio::test]
    async fn test_lookups_are_cached() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/rennes-matiere/_search")
            .match_query(Matcher::UrlEncoded(
                "q".to_string(),
                "identifiant:030100".to_string(),
            ))
            .with_status(200)
            .with_body(
                r#"{"hits":{"total":{"value":1},"hits":[{"_source":{"identifiant":"030100","libelle":"FRANCAIS"}}]}}"#,
            )
            .expect(1)
            .create_async()
            .await;

        let config = index_config(Some(server.url()));
        let index: Arc<dyn SearchSource> = Arc::new(HttpIndexSource::new(&config).unwrap());
        let validator = validator(index, &config);

        for _ in 0..3 {
            assert!(validator
                .is_code_valid("AC-RENNES", ObjectType::Subject, "030100")
                .await
                .unwrap());
        }
        assert_eq!(validator.cached().await, 1);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_index_failure_propagates() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/rennes-matiere/_search")
            .match_query(Matcher::Any)
            .with_status(500)
            .create_async()
            .await;

        let config = index_config(Some(server.url()));
        let index: Arc<dyn SearchSource> = Arc::new(HttpIndexSource::new(&config).unwrap());
        let validator = validator(index, &config);

        let err = validator
            .is_code_valid("AC-RENNES", ObjectType::Subject, "030100")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            GarError::Index(IndexError::ServerError { status: 500, .. })
        ));
        assert_eq!(validator.cached().await, 0);
    }

    #[tokio::test]
    async fn test_malformed_response() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/rennes-matiere/_search")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"took": 3}"#)
            .create_async()
            .await;

        let config = index_config(Some(server.url()));
        let index: Arc<dyn SearchSource> = Arc::new(HttpIndexSource::new(&config).unwrap());
        let validator = validator(index, &config);

        let err = validator
            .is_code_valid("AC-RENNES", ObjectType::Subject, "030100")
            .await
            .unwrap_err();
        assert!(matches!(err, GarError::Index(IndexError::InvalidResponse(_))));
    }
}
