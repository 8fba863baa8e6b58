/// Asynchronous delivery of enrichment results to caller webhooks

pub mod dispatcher;
pub mod webhook;

pub use dispatcher::{DeliveryReport, ResultDispatcher};
pub use webhook::WebhookSender;
