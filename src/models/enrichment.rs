use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use strum::{AsRefStr, Display, EnumString};
use validator::Validate;

/// Kind of data an enrichment request carries
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum DataType {
    Url,
    Hash,
    File,
    Username,
}

/// Inbound enrichment request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct EnrichmentRequest {
    /// Callback that receives every enrichment result
    #[validate(url)]
    pub webhook_uri: String,

    /// Opaque payload handed to each plugin as its argument
    #[validate(length(min = 1))]
    pub data: String,

    #[serde(rename = "type")]
    pub data_type: DataType,
}

impl EnrichmentRequest {
    pub fn new(webhook_uri: impl Into<String>, data: impl Into<String>, data_type: DataType) -> Self {
        Self {
            webhook_uri: webhook_uri.into(),
            data: data.into(),
            data_type,
        }
    }
}

/// Report produced by a single plugin, either freshly or from cache.
///
/// The wire form (plugin stdout, cache, webhook body) is
/// `{"Report": {...}, "Errors": [...]}`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EnrichmentResult {
    #[serde(rename = "Report")]
    pub report: Map<String, Value>,

    #[serde(rename = "Errors", default)]
    pub errors: Vec<String>,
}

impl EnrichmentResult {
    /// Build a result from a bare report, as stored in the cache
    pub fn from_report(report: Map<String, Value>) -> Self {
        Self {
            report,
            errors: Vec::new(),
        }
    }

    /// True when the plugin reported no errors of its own
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}
