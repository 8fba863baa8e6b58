use crate::delivery::{DeliveryReport, ResultDispatcher};
use crate::enrichment::pipeline::EnrichmentPipeline;
use crate::error::Result;
use crate::models::EnrichmentRequest;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn, Instrument};
use uuid::Uuid;

/// Runs enrichment and delivery for accepted requests
pub struct EnrichmentService {
    pipeline: Arc<EnrichmentPipeline>,
    dispatcher: Arc<ResultDispatcher>,
}

impl EnrichmentService {
    pub fn new(pipeline: Arc<EnrichmentPipeline>, dispatcher: Arc<ResultDispatcher>) -> Self {
        Self {
            pipeline,
            dispatcher,
        }
    }

    pub fn pipeline(&self) -> &EnrichmentPipeline {
        &self.pipeline
    }

    /// Enrich a request and deliver whatever succeeded.
    ///
    /// Plugin failures do not stop delivery. A request with no registered
    /// enricher delivers nothing and returns the error.
    pub async fn process(&self, request: EnrichmentRequest) -> Result<DeliveryReport> {
        let outcome = match self.pipeline.execute(&request).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!("Enrichment failed, nothing to deliver: {}", e);
                return Err(e);
            }
        };

        if let Some(failures) = &outcome.error {
            warn!(
                failed = failures.len(),
                plugins = ?failures.sources(),
                "Enrichment finished with failures:\n{}",
                failures
            );
        }

        let report = self
            .dispatcher
            .dispatch(&request.webhook_uri, outcome.results)
            .await;

        info!(
            delivered = report.delivered,
            failed = report.failed(),
            "Enrichment results dispatched"
        );

        Ok(report)
    }

    /// Process a request on a detached task and return immediately
    pub fn submit(self: &Arc<Self>, request: EnrichmentRequest) -> JoinHandle<Result<DeliveryReport>> {
        let request_id = Uuid::new_v4();
        let span = tracing::info_span!(
            "enrichment",
            request_id = %request_id,
            data_type = %request.data_type
        );

        let service = Arc::clone(self);
        tokio::spawn(async move { service.process(request).await }.instrument(span))
    }
}
