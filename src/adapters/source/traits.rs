//! Source collaborator traits
//!
//! Input snapshots and the external code index are reached through these
//! traits so the builders and the validator never depend on a concrete
//! transport.

use crate::domain::{AttributeRecord, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A named resource group of attribute records
#[async_trait]
pub trait Source: Send + Sync {
    /// All records of the resource group
    async fn entries(&self) -> Result<Vec<AttributeRecord>>;

    /// Resource group name, for logs
    fn name(&self) -> &str;
}

/// Search request sent to the code index
///
/// `api` is the alias-scoped search path, `parameters` the query string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchRequest {
    pub api: String,
    pub parameters: String,
}

impl SearchRequest {
    /// Exact-match query on one field of an alias
    pub fn exact(alias: &str, field: &str, code: &str) -> Self {
        Self {
            api: format!("/{alias}/_search"),
            parameters: format!("q={field}:{code}"),
        }
    }

    /// Alias targeted by the request
    pub fn alias(&self) -> Option<&str> {
        self.api
            .strip_prefix('/')?
            .strip_suffix("/_search")
            .filter(|alias| !alias.is_empty())
    }

    /// (field, value) of a `q=field:value` query
    pub fn query_term(&self) -> Option<(&str, &str)> {
        self.parameters
            .split('&')
            .find_map(|param| param.strip_prefix("q="))
            .and_then(|term| term.split_once(':'))
    }
}

/// Code index answering search requests with a JSON document
#[async_trait]
pub trait SearchSource: Send + Sync {
    /// Runs a search, returning the raw response body
    async fn search(&self, request: &SearchRequest) -> Result<serde_json::Value>;

    /// Backend name, for logs
    fn name(&self) -> &str;
}
