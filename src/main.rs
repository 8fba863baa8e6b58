use clap::Parser;
use enricher::{
    api::{build_router, AppState},
    cache::create_cache,
    config::Config,
    delivery::{ResultDispatcher, WebhookSender},
    enrichment::{EnrichmentPipeline, EnrichmentService, ProcessRunner},
    fanout::FanOut,
    registry::PluginRegistry,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "enricher")]
#[command(about = "Runs pluggable enrichers against submitted data", version)]
struct Args {
    /// Configuration file (TOML or YAML)
    #[arg(short, long, env = "ENRICHER_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Load configuration
    let config = Config::load(args.config.as_deref()).map_err(|e| {
        eprintln!("Failed to load configuration: {}", e);
        e
    })?;

    init_tracing(&config);

    tracing::info!("Starting enricher v{}", env!("CARGO_PKG_VERSION"));

    // Initialize Prometheus metrics
    if config.observability.prometheus_enabled {
        if let Err(e) = enricher::metrics::init_metrics() {
            tracing::warn!("Failed to initialize metrics: {}", e);
            tracing::warn!("Continuing without metrics");
        }
    } else {
        tracing::info!("Prometheus metrics disabled in configuration");
    }

    // Load plugins before accepting traffic
    let registry = Arc::new(PluginRegistry::from_config(&config.enrichers));
    let index = registry.get_all().await?;
    tracing::info!(
        path = %config.enrichers.path.display(),
        plugins = index.plugin_count(),
        "Plugin registry loaded"
    );

    // Initialize cache backend
    let cache = create_cache(&config.cache)?;

    let runner = Arc::new(ProcessRunner::new(
        config.enrichers.default_execution_timeout(),
    ));
    let pipeline = Arc::new(EnrichmentPipeline::new(
        registry.clone(),
        cache,
        runner,
        FanOut::new(config.enrichers.max_concurrent),
    ));

    let sender = WebhookSender::from_config(&config.webhook)?;
    let dispatcher = Arc::new(ResultDispatcher::new(
        sender,
        FanOut::new(config.webhook.max_concurrent),
    ));

    let service = Arc::new(EnrichmentService::new(pipeline, dispatcher));

    if config.api.keys.is_empty() {
        tracing::warn!("No API keys configured, every enrichment request will be rejected");
    }

    let app_state = AppState::new(service, registry).with_api_keys(&config.api.keys);
    let app = build_router(app_state);

    // Start HTTP server
    let http_addr = config.bind_address();
    let http_listener = tokio::net::TcpListener::bind(&http_addr).await?;

    tracing::info!("HTTP API server listening on http://{}", http_addr);
    tracing::info!("   Health check: http://{}/health", http_addr);
    tracing::info!("   Enrichment: http://{}/enrichment", http_addr);

    axum::serve(http_listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Shut down gracefully");
    Ok(())
}

fn init_tracing(config: &Config) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("enricher={0},tower_http={0}", config.observability.log_level).into()
    });

    if config.observability.json_logs {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        return;
    }
    tracing::info!("Shutdown signal received");
}
