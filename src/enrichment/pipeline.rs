use crate::cache::CacheClient;
use crate::enrichment::runner::PluginRunner;
use crate::error::{AppError, Result};
use crate::fanout::{BatchError, FanOut};
use crate::metrics::{
    CACHE_LOOKUPS_TOTAL, ENRICHMENT_REQUESTS_TOTAL, PLUGIN_EXECUTIONS_TOTAL,
    PLUGIN_EXECUTION_DURATION_SECONDS,
};
use crate::models::{DataType, EnrichmentRequest, EnrichmentResult, PluginManifest};
use crate::registry::PluginRegistry;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

const CACHE_KEY_PREFIX: &str = "enrichment:";

/// Cache key of one plugin's result for one piece of data
pub fn cache_key(plugin: &str, data: &str, data_type: DataType) -> String {
    let mut hasher = Sha256::new();
    for part in [plugin, data, data_type.as_ref()] {
        hasher.update((part.len() as u64).to_be_bytes());
        hasher.update(part.as_bytes());
    }
    format!("{}{:x}", CACHE_KEY_PREFIX, hasher.finalize())
}

/// Results of one orchestrated request
#[derive(Debug, Default)]
pub struct EnrichmentOutcome {
    /// Cache hits followed by fresh successes
    pub results: Vec<EnrichmentResult>,

    /// Every plugin that failed, if any did
    pub error: Option<BatchError>,
}

impl EnrichmentOutcome {
    pub fn is_complete(&self) -> bool {
        self.error.is_none()
    }
}

/// Cache-aside orchestration of the plugins registered for a request
pub struct EnrichmentPipeline {
    registry: Arc<PluginRegistry>,
    cache: Arc<dyn CacheClient>,
    runner: Arc<dyn PluginRunner>,
    fanout: FanOut,
}

impl EnrichmentPipeline {
    pub fn new(
        registry: Arc<PluginRegistry>,
        cache: Arc<dyn CacheClient>,
        runner: Arc<dyn PluginRunner>,
        fanout: FanOut,
    ) -> Self {
        Self {
            registry,
            cache,
            runner,
            fanout,
        }
    }

    pub fn cache_backend(&self) -> &'static str {
        self.cache.backend()
    }

    /// Enrich one request.
    ///
    /// Fails only when no plugin is registered for the request's type;
    /// individual plugin failures are reported in the outcome.
    pub async fn execute(&self, request: &EnrichmentRequest) -> Result<EnrichmentOutcome> {
        let start = Instant::now();
        let data_type = request.data_type;
        let index = self.registry.get_all().await?;

        let plugins = match index.plugins_for(data_type) {
            Some(plugins) => plugins,
            None => {
                ENRICHMENT_REQUESTS_TOTAL
                    .with_label_values(&[data_type.as_ref(), "no_enricher"])
                    .inc();
                return Err(AppError::NoEnricher(data_type));
            }
        };

        let enabled: Vec<Arc<PluginManifest>> =
            plugins.iter().filter(|p| p.enabled).cloned().collect();

        if enabled.is_empty() {
            debug!(data_type = %data_type, "All enrichers for this type are disabled");
            ENRICHMENT_REQUESTS_TOTAL
                .with_label_values(&[data_type.as_ref(), "complete"])
                .inc();
            return Ok(EnrichmentOutcome::default());
        }

        let mut results = Vec::with_capacity(enabled.len());
        let mut pending = Vec::new();

        for plugin in enabled {
            let key = cache_key(&plugin.name, &request.data, data_type);
            match self.lookup(&plugin, &key).await {
                Some(result) => results.push(result),
                None => pending.push(plugin),
            }
        }

        let cached = results.len();
        let executed = pending.len();

        let batch = self
            .fanout
            .execute(request, pending, |plugin, request| self.invoke(plugin, request))
            .await;

        results.extend(batch.successes);
        let outcome = EnrichmentOutcome {
            results,
            error: batch.error,
        };

        let label = if outcome.is_complete() { "complete" } else { "partial" };
        ENRICHMENT_REQUESTS_TOTAL
            .with_label_values(&[data_type.as_ref(), label])
            .inc();

        info!(
            data_type = %data_type,
            cached,
            executed,
            failed = outcome.error.as_ref().map_or(0, BatchError::len),
            duration_ms = start.elapsed().as_millis() as u64,
            "Enrichment completed"
        );

        Ok(outcome)
    }

    /// Cached result for `key`; any failure counts as a miss
    async fn lookup(&self, plugin: &PluginManifest, key: &str) -> Option<EnrichmentResult> {
        let backend = self.cache.backend();

        let bytes = match self.cache.get(key).await {
            Ok(bytes) => bytes,
            Err(AppError::NotFound(_)) => {
                CACHE_LOOKUPS_TOTAL.with_label_values(&[backend, "miss"]).inc();
                return None;
            }
            Err(e) => {
                warn!(plugin = %plugin.name, "Cache lookup failed, executing plugin: {}", e);
                CACHE_LOOKUPS_TOTAL.with_label_values(&[backend, "error"]).inc();
                return None;
            }
        };

        match serde_json::from_slice::<Map<String, Value>>(&bytes) {
            Ok(report) => {
                debug!(plugin = %plugin.name, "Using cached enrichment");
                CACHE_LOOKUPS_TOTAL.with_label_values(&[backend, "hit"]).inc();
                Some(EnrichmentResult::from_report(report))
            }
            Err(e) => {
                warn!(plugin = %plugin.name, "Discarding undecodable cache entry: {}", e);
                CACHE_LOOKUPS_TOTAL.with_label_values(&[backend, "error"]).inc();
                None
            }
        }
    }

    /// Run one plugin and cache its report on success
    async fn invoke(
        &self,
        plugin: Arc<PluginManifest>,
        request: &EnrichmentRequest,
    ) -> Result<EnrichmentResult> {
        let start = Instant::now();
        let outcome = self.runner.run(&plugin, &request.data).await;

        PLUGIN_EXECUTION_DURATION_SECONDS
            .with_label_values(&[plugin.name.as_str()])
            .observe(start.elapsed().as_secs_f64());

        let status = match &outcome {
            Ok(_) => "success",
            Err(AppError::Timeout(_)) => "timeout",
            Err(_) => "failure",
        };
        PLUGIN_EXECUTIONS_TOTAL
            .with_label_values(&[plugin.name.as_str(), status])
            .inc();

        let result = match outcome {
            Ok(result) => result,
            Err(e) => {
                warn!(plugin = %plugin.name, "Plugin execution failed: {}", e);
                return Err(e);
            }
        };

        self.store(&plugin, request, &result).await;
        Ok(result)
    }

    async fn store(&self, plugin: &PluginManifest, request: &EnrichmentRequest, result: &EnrichmentResult) {
        let key = cache_key(&plugin.name, &request.data, request.data_type);

        let encoded = match serde_json::to_vec(&result.report) {
            Ok(encoded) => encoded,
            Err(e) => {
                warn!(plugin = %plugin.name, "Failed to encode report for cache: {}", e);
                return;
            }
        };

        if let Err(e) = self.cache.set_with_ttl(&key, encoded, plugin.cache_ttl()).await {
            warn!(plugin = %plugin.name, "Failed to cache enrichment: {}", e);
        }
    }
}
