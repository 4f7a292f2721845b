//! Provider adapters: one per external job source, consumed uniformly by the executor.
//!
//! Every adapter turns a [`SearchRequest`] into a provider-specific call and
//! returns standardized jobs or a typed [`ProviderError`]. Retry, timeout and
//! fallback decisions are NOT made here; they belong to `search::executor`.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::config::Config;
use crate::models::job::StandardizedJob;

pub mod adzuna;
pub mod jsearch;
pub mod normalize;
pub mod offline;
pub mod usajobs;

pub use offline::OFFLINE_PROVIDER_ID;

/// Transport-level ceiling for provider HTTP calls. The executor enforces its
/// own, shorter per-call timeout on top of this.
const HTTP_TIMEOUT_SECS: u64 = 30;

/// Static description of a provider, loaded once and read-only during a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderCapability {
    pub provider_id: String,
    pub cost_per_call: f64,
    pub supports_location_filter: bool,
    pub supports_experience_filter: bool,
    /// 0.0 – 1.0
    pub reliability_hint: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExperienceLevel {
    Entry,
    Mid,
    Senior,
}

/// Provider-independent search parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    pub query: String,
    pub location: Option<String>,
    pub experience: Option<ExperienceLevel>,
    pub max_age_days: u32,
    pub limit: usize,
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ProviderError {
    #[error("transient provider failure: {0}")]
    Transient(String),

    #[error("provider rate limited: {0}")]
    RateLimited(String),

    #[error("permanent provider failure: {0}")]
    Permanent(String),
}

impl ProviderError {
    /// Classifies a non-success HTTP status.
    pub fn from_status(status: u16, body: &str) -> Self {
        let message = format!("HTTP {status}: {}", truncate(body, 200));
        match status {
            429 => ProviderError::RateLimited(message),
            408 | 500..=599 => ProviderError::Transient(message),
            _ => ProviderError::Permanent(message),
        }
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, ProviderError::Transient(_))
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(e: reqwest::Error) -> Self {
        if let Some(status) = e.status() {
            return ProviderError::from_status(status.as_u16(), &e.to_string());
        }
        if e.is_decode() || e.is_builder() {
            ProviderError::Permanent(e.to_string())
        } else {
            // timeouts, connection resets, DNS failures
            ProviderError::Transient(e.to_string())
        }
    }
}

/// The adapter trait. Implement this to add a job source without touching
/// the planner or executor.
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    fn capability(&self) -> &ProviderCapability;

    async fn search(&self, request: &SearchRequest) -> Result<Vec<StandardizedJob>, ProviderError>;
}

/// Adapters available to a search session, keyed by provider id.
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    adapters: BTreeMap<String, Arc<dyn ProviderAdapter>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, adapter: Arc<dyn ProviderAdapter>) {
        let id = adapter.capability().provider_id.clone();
        self.adapters.insert(id, adapter);
    }

    pub fn with(mut self, adapter: Arc<dyn ProviderAdapter>) -> Self {
        self.register(adapter);
        self
    }

    pub fn get(&self, provider_id: &str) -> Option<Arc<dyn ProviderAdapter>> {
        self.adapters.get(provider_id).cloned()
    }

    pub fn capabilities(&self) -> Vec<ProviderCapability> {
        self.adapters
            .values()
            .map(|a| a.capability().clone())
            .collect()
    }

    /// Registers every provider whose credentials are configured. The
    /// offline generator is always present.
    pub fn from_config(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
            .build()
            .context("Failed to build provider HTTP client")?;

        let mut registry = Self::new().with(Arc::new(offline::OfflineProvider::new()));

        match &config.usajobs {
            Some(creds) => registry.register(Arc::new(usajobs::UsaJobsProvider::new(
                client.clone(),
                creds.api_key.clone(),
                creds.user_agent.clone(),
            ))),
            None => warn!("USAJobs credentials not set; provider disabled"),
        }

        match &config.jsearch {
            Some(creds) => registry.register(Arc::new(jsearch::JSearchProvider::new(
                client.clone(),
                creds.api_key.clone(),
                creds.host.clone(),
            ))),
            None => warn!("JSearch credentials not set; provider disabled"),
        }

        match &config.adzuna {
            Some(creds) => registry.register(Arc::new(adzuna::AdzunaProvider::new(
                client,
                creds.app_id.clone(),
                creds.app_key.clone(),
                creds.country.clone(),
            ))),
            None => warn!("Adzuna credentials not set; provider disabled"),
        }

        info!(
            "Registered job providers: {}",
            registry.adapters.keys().cloned().collect::<Vec<_>>().join(", ")
        );
        Ok(registry)
    }
}

/// Sends a request and decodes a JSON body, classifying failures for the executor.
pub(crate) async fn fetch_json<T: DeserializeOwned>(
    request: RequestBuilder,
    provider_id: &str,
) -> Result<T, ProviderError> {
    let response = request.send().await?;
    let status = response.status();

    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        warn!("{provider_id} returned {status}: {}", truncate(&body, 200));
        return Err(ProviderError::from_status(status.as_u16(), &body));
    }

    response.json::<T>().await.map_err(|e| {
        ProviderError::Permanent(format!("{provider_id} response could not be decoded: {e}"))
    })
}

fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_429_is_rate_limited() {
        assert!(matches!(
            ProviderError::from_status(429, "slow down"),
            ProviderError::RateLimited(_)
        ));
    }

    #[test]
    fn test_server_errors_are_transient() {
        assert!(ProviderError::from_status(503, "").is_transient());
        assert!(ProviderError::from_status(500, "").is_transient());
        assert!(ProviderError::from_status(408, "").is_transient());
    }

    #[test]
    fn test_client_errors_are_permanent() {
        assert!(matches!(
            ProviderError::from_status(400, "bad keyword"),
            ProviderError::Permanent(_)
        ));
        assert!(matches!(
            ProviderError::from_status(401, ""),
            ProviderError::Permanent(_)
        ));
    }

    #[test]
    fn test_registry_lists_capabilities() {
        let registry = ProviderRegistry::new().with(Arc::new(offline::OfflineProvider::new()));
        let caps = registry.capabilities();
        assert_eq!(caps.len(), 1);
        assert_eq!(caps[0].provider_id, OFFLINE_PROVIDER_ID);
        assert!(registry.get(OFFLINE_PROVIDER_ID).is_some());
        assert!(registry.get("jsearch").is_none());
    }
}
