use serde::{Deserialize, Serialize};

use crate::providers::OFFLINE_PROVIDER_ID;

/// One planned search for a career path: which provider, which query, at what cost.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchStrategy {
    pub provider_id: String,
    pub query: String,
    pub estimated_cost: f64,
    /// Lower is tried first.
    pub priority: usize,
    pub is_backup: bool,
}

impl SearchStrategy {
    /// The zero-cost synthetic fallback that closes every chain.
    pub fn offline(path_title: &str, priority: usize) -> Self {
        Self {
            provider_id: OFFLINE_PROVIDER_ID.to_string(),
            query: path_title.to_string(),
            estimated_cost: 0.0,
            priority,
            is_backup: priority > 0,
        }
    }

    pub fn is_offline(&self) -> bool {
        self.provider_id == OFFLINE_PROVIDER_ID
    }
}

/// A ranked candidate returned by a planning advisor. Untrusted until the
/// planner validates it against the registered providers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategySuggestion {
    pub provider_id: String,
    pub query: String,
    #[serde(default)]
    pub estimated_cost: Option<f64>,
}

impl StrategySuggestion {
    pub fn new(provider_id: &str, query: &str) -> Self {
        Self {
            provider_id: provider_id.to_string(),
            query: query.to_string(),
            estimated_cost: None,
        }
    }
}
