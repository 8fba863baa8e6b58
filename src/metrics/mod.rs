//! Prometheus metrics for the enrichment service.
//!
//! Everything lives in one global registry under the `enricher` namespace and
//! is exported in text format by the `/metrics` endpoint.
//!
//! # Example
//! ```no_run
//! use enricher::metrics::PLUGIN_EXECUTIONS_TOTAL;
//!
//! PLUGIN_EXECUTIONS_TOTAL
//!     .with_label_values(&["whois", "success"])
//!     .inc();
//! ```

use lazy_static::lazy_static;
use prometheus::{
    CounterVec, Gauge, GaugeVec, HistogramOpts, HistogramVec, Opts, Registry,
};

lazy_static! {
    /// Global Prometheus registry for all metrics
    pub static ref PROMETHEUS_REGISTRY: Registry = Registry::new();

    // ============================================================================
    // Enrichment Metrics
    // ============================================================================

    /// Total number of enrichment requests orchestrated
    ///
    /// Labels: data_type, outcome (complete, partial, no_enricher)
    pub static ref ENRICHMENT_REQUESTS_TOTAL: CounterVec = CounterVec::new(
        Opts::new("enrichment_requests_total", "Total number of enrichment requests")
            .namespace("enricher"),
        &["data_type", "outcome"]
    ).expect("Failed to create ENRICHMENT_REQUESTS_TOTAL metric");

    /// Total number of plugin executions
    ///
    /// Labels: plugin, status (success, failure, timeout)
    pub static ref PLUGIN_EXECUTIONS_TOTAL: CounterVec = CounterVec::new(
        Opts::new("plugin_executions_total", "Total number of plugin executions")
            .namespace("enricher"),
        &["plugin", "status"]
    ).expect("Failed to create PLUGIN_EXECUTIONS_TOTAL metric");

    /// Plugin execution duration in seconds
    ///
    /// Labels: plugin
    pub static ref PLUGIN_EXECUTION_DURATION_SECONDS: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            "plugin_execution_duration_seconds",
            "Plugin execution duration in seconds"
        )
        .namespace("enricher")
        .buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0]),
        &["plugin"]
    ).expect("Failed to create PLUGIN_EXECUTION_DURATION_SECONDS metric");

    /// Number of plugins loaded into the registry
    ///
    /// Labels: data_type
    pub static ref PLUGINS_LOADED: GaugeVec = GaugeVec::new(
        Opts::new("plugins_loaded", "Number of loaded plugins per data type")
            .namespace("enricher"),
        &["data_type"]
    ).expect("Failed to create PLUGINS_LOADED metric");

    // ============================================================================
    // Cache Metrics
    // ============================================================================

    /// Total number of cache lookups
    ///
    /// Labels: backend, result (hit, miss, error)
    pub static ref CACHE_LOOKUPS_TOTAL: CounterVec = CounterVec::new(
        Opts::new("cache_lookups_total", "Total number of cache lookups")
            .namespace("enricher"),
        &["backend", "result"]
    ).expect("Failed to create CACHE_LOOKUPS_TOTAL metric");

    // ============================================================================
    // Delivery Metrics
    // ============================================================================

    /// Total number of webhook deliveries
    ///
    /// Labels: status (success, failure)
    pub static ref WEBHOOK_DELIVERIES_TOTAL: CounterVec = CounterVec::new(
        Opts::new("webhook_deliveries_total", "Total number of webhook deliveries")
            .namespace("enricher"),
        &["status"]
    ).expect("Failed to create WEBHOOK_DELIVERIES_TOTAL metric");

    /// Webhook delivery duration in seconds
    pub static ref WEBHOOK_DELIVERY_DURATION_SECONDS: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            "webhook_delivery_duration_seconds",
            "Webhook delivery duration in seconds"
        )
        .namespace("enricher")
        .buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]),
        &["status"]
    ).expect("Failed to create WEBHOOK_DELIVERY_DURATION_SECONDS metric");

    // ============================================================================
    // System Metrics
    // ============================================================================

    /// Application build info
    ///
    /// Labels: version
    pub static ref BUILD_INFO: GaugeVec = GaugeVec::new(
        Opts::new("build_info", "Application build information")
            .namespace("enricher"),
        &["version"]
    ).expect("Failed to create BUILD_INFO metric");

    /// Application uptime in seconds
    pub static ref UPTIME_SECONDS: Gauge = Gauge::with_opts(
        Opts::new("uptime_seconds", "Application uptime in seconds")
            .namespace("enricher")
    ).expect("Failed to create UPTIME_SECONDS metric");
}

/// Register every metric with the global registry.
///
/// Call once at startup; a second call fails with `AlreadyReg`.
pub fn init_metrics() -> Result<(), prometheus::Error> {
    PROMETHEUS_REGISTRY.register(Box::new(ENRICHMENT_REQUESTS_TOTAL.clone()))?;
    PROMETHEUS_REGISTRY.register(Box::new(PLUGIN_EXECUTIONS_TOTAL.clone()))?;
    PROMETHEUS_REGISTRY.register(Box::new(PLUGIN_EXECUTION_DURATION_SECONDS.clone()))?;
    PROMETHEUS_REGISTRY.register(Box::new(PLUGINS_LOADED.clone()))?;

    PROMETHEUS_REGISTRY.register(Box::new(CACHE_LOOKUPS_TOTAL.clone()))?;

    PROMETHEUS_REGISTRY.register(Box::new(WEBHOOK_DELIVERIES_TOTAL.clone()))?;
    PROMETHEUS_REGISTRY.register(Box::new(WEBHOOK_DELIVERY_DURATION_SECONDS.clone()))?;

    PROMETHEUS_REGISTRY.register(Box::new(BUILD_INFO.clone()))?;
    PROMETHEUS_REGISTRY.register(Box::new(UPTIME_SECONDS.clone()))?;

    BUILD_INFO
        .with_label_values(&[env!("CARGO_PKG_VERSION")])
        .set(1.0);

    tracing::info!("Prometheus metrics initialized successfully");
    Ok(())
}

/// Encode the global registry in the Prometheus text exposition format
pub fn gather_metrics() -> String {
    use prometheus::Encoder;
    let encoder = prometheus::TextEncoder::new();
    let metric_families = PROMETHEUS_REGISTRY.gather();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!("Failed to encode metrics: {}", e);
        return String::from("# Error encoding metrics\n");
    }

    String::from_utf8(buffer).unwrap_or_else(|e| {
        tracing::error!("Failed to convert metrics to string: {}", e);
        String::from("# Error converting metrics\n")
    })
}
