/// Enrichment orchestration
///
/// Cache-aside execution of the plugins registered for a request's data
/// type, followed by delivery of the results to the caller's webhook.

pub mod pipeline;
pub mod runner;
pub mod service;

pub use pipeline::{cache_key, EnrichmentOutcome, EnrichmentPipeline};
pub use runner::{PluginRunner, ProcessRunner};
pub use service::EnrichmentService;
