//! HTTP code index client
//!
//! Talks to the search server holding the national code referentials.
//! Requests are retried with exponential backoff on transient failures
//! only; a 4xx answer or an unreadable body fails immediately.

use super::traits::{SearchRequest, SearchSource};
use crate::config::{IndexConfig, RetryConfig};
use crate::domain::{GarError, IndexError, Result};
use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use reqwest::{Client, ClientBuilder};
use secrecy::ExposeSecret;
use std::time::Duration;
use url::Url;

/// Search index reached over HTTP
pub struct HttpIndexSource {
    base_url: Url,
    client: Client,
    auth_header: Option<String>,
    retry: RetryConfig,
}

impl std::fmt::Debug for HttpIndexSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpIndexSource")
            .field("base_url", &self.base_url.as_str())
            .field("authenticated", &self.auth_header.is_some())
            .finish()
    }
}

impl HttpIndexSource {
    /// Creates a client for the configured index
    ///
    /// # Errors
    ///
    /// Returns a configuration error when the base URL is missing or
    /// malformed, or when the HTTP client cannot be built.
    pub fn new(config: &IndexConfig) -> Result<Self> {
        let base_url = config.base_url.as_deref().ok_or_else(|| {
            GarError::Configuration("index.base_url is required for an http index".to_string())
        })?;
        let base_url = Url::parse(base_url).map_err(|e| {
            GarError::Configuration(format!("Invalid index.base_url '{base_url}': {e}"))
        })?;

        let client = ClientBuilder::new()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .connect_timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| GarError::Configuration(format!("Failed to build HTTP client: {e}")))?;

        let auth_header = match (&config.username, &config.password) {
            (Some(username), Some(password)) => {
                let credentials = format!("{}:{}", username, password.expose_secret().as_str());
                let encoded = general_purpose::STANDARD.encode(credentials.as_bytes());
                Some(format!("Basic {encoded}"))
            }
            _ => None,
        };

        Ok(Self {
            base_url,
            client,
            auth_header,
            retry: config.retry.clone(),
        })
    }

    fn request_url(&self, request: &SearchRequest) -> Result<Url> {
        let mut url = self.base_url.join(request.api.trim_start_matches('/')).map_err(|e| {
            IndexError::InvalidRequest(format!("Invalid search api '{}': {}", request.api, e))
        })?;
        url.set_query(Some(&request.parameters));
        Ok(url)
    }

    async fn send_once(&self, url: &Url) -> Result<serde_json::Value> {
        let mut builder = self.client.get(url.clone());
        if let Some(auth) = &self.auth_header {
            builder = builder.header("Authorization", auth);
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                IndexError::Timeout(e.to_string())
            } else {
                IndexError::ConnectionFailed(e.to_string())
            }
        })?;

        let status = response.status();
        if status.is_server_error() {
            let message = response.text().await.unwrap_or_default();
            return Err(IndexError::ServerError {
                status: status.as_u16(),
                message,
            }
            .into());
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(IndexError::ClientError {
                status: status.as_u16(),
                message,
            }
            .into());
        }

        response
            .json::<serde_json::Value>()
            .await
            .map_err(|e| IndexError::InvalidResponse(e.to_string()).into())
    }

    /// Retry a request with exponential backoff
    async fn retry_request<F, T, Fut>(&self, operation: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<T>>,
    {
        let max_retries = self.retry.max_retries;
        let mut attempt = 0;

        loop {
            match operation().await {
                Ok(result) => return Ok(result),
                Err(GarError::Index(e)) if e.is_transient() && attempt < max_retries => {
                    attempt += 1;

                    let delay_ms = (self.retry.initial_delay_ms as f64
                        * self.retry.backoff_multiplier.powf((attempt - 1) as f64))
                        as u64;
                    let delay_ms = delay_ms.min(self.retry.max_delay_ms);

                    tracing::warn!(
                        attempt = attempt,
                        max_retries = max_retries,
                        delay_ms = delay_ms,
                        error = %e,
                        "Retrying index request after error"
                    );

                    tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[async_trait]
impl SearchSource for HttpIndexSource {
    async fn search(&self, request: &SearchRequest) -> Result<serde_json::Value> {
        let url = self.request_url(request)?;
        tracing::trace!(url = %url, "Querying code index");
        self.retry_request(|| self.send_once(&url)).await
    }

    fn name(&self) -> &str {
        "http"
    }
}
