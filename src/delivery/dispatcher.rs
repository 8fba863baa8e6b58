use crate::delivery::webhook::WebhookSender;
use crate::error::Result;
use crate::fanout::{BatchError, BatchItem, FanOut};
use crate::metrics::{WEBHOOK_DELIVERIES_TOTAL, WEBHOOK_DELIVERY_DURATION_SECONDS};
use crate::models::EnrichmentResult;
use std::time::Instant;
use tracing::{debug, warn};

/// One result addressed to the callback
struct Delivery {
    index: usize,
    result: EnrichmentResult,
}

impl BatchItem for Delivery {
    fn batch_label(&self) -> String {
        format!("delivery #{}", self.index)
    }
}

/// Outcome of delivering every result of a request
#[derive(Debug, Default)]
pub struct DeliveryReport {
    pub delivered: usize,
    pub error: Option<BatchError>,
}

impl DeliveryReport {
    pub fn failed(&self) -> usize {
        self.error.as_ref().map_or(0, BatchError::len)
    }
}

/// Fans results out to a webhook, one POST per result, no retries
pub struct ResultDispatcher {
    sender: WebhookSender,
    fanout: FanOut,
}

impl ResultDispatcher {
    pub fn new(sender: WebhookSender, fanout: FanOut) -> Self {
        Self { sender, fanout }
    }

    pub async fn dispatch(&self, url: &str, results: Vec<EnrichmentResult>) -> DeliveryReport {
        let deliveries = results
            .into_iter()
            .enumerate()
            .map(|(index, result)| Delivery { index, result })
            .collect();

        let batch = self
            .fanout
            .execute(url, deliveries, |delivery, url| self.deliver(delivery, url))
            .await;

        if let Some(error) = &batch.error {
            warn!(url = %url, failed = error.len(), "Some webhook deliveries failed:\n{}", error);
        }

        DeliveryReport {
            delivered: batch.successes.len(),
            error: batch.error,
        }
    }

    async fn deliver(&self, delivery: Delivery, url: &str) -> Result<()> {
        let start = Instant::now();
        let outcome = self.sender.send(url, &delivery.result).await;

        let status = if outcome.is_ok() { "success" } else { "failure" };
        WEBHOOK_DELIVERIES_TOTAL.with_label_values(&[status]).inc();
        WEBHOOK_DELIVERY_DURATION_SECONDS
            .with_label_values(&[status])
            .observe(start.elapsed().as_secs_f64());

        if outcome.is_ok() {
            debug!(url = %url, delivery = delivery.index, "Webhook delivered");
        }
        outcome
    }
}
