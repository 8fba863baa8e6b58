pub mod auth;
pub mod handlers;
pub mod routes;

pub use routes::*;

use crate::config::ApiKey;
use crate::enrichment::EnrichmentService;
use crate::registry::PluginRegistry;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<EnrichmentService>,
    pub registry: Arc<PluginRegistry>,
    /// API key -> key owner
    pub api_keys: Arc<HashMap<String, String>>,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(service: Arc<EnrichmentService>, registry: Arc<PluginRegistry>) -> Self {
        Self {
            service,
            registry,
            api_keys: Arc::new(HashMap::new()),
            started_at: Utc::now(),
        }
    }

    /// Set the accepted API keys
    pub fn with_api_keys(mut self, keys: &[ApiKey]) -> Self {
        self.api_keys = Arc::new(
            keys.iter()
                .map(|k| (k.key.clone(), k.name.clone()))
                .collect(),
        );
        self
    }
}
