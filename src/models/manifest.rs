use crate::models::DataType;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::PathBuf;
use std::time::Duration;
use strum::Display;

/// Declared type of a plugin configuration argument
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ConfigArgType {
    String,
    Int,
    Bool,
    Float,
}

impl ConfigArgType {
    /// Check whether a JSON value has this dynamic type.
    ///
    /// `int` accepts integral numbers only, `float` accepts any number.
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            ConfigArgType::String => value.is_string(),
            ConfigArgType::Int => value.is_i64() || value.is_u64(),
            ConfigArgType::Bool => value.is_boolean(),
            ConfigArgType::Float => value.is_number(),
        }
    }
}

/// A configuration argument declared by a plugin manifest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigArg {
    pub name: String,

    #[serde(rename = "type")]
    pub arg_type: ConfigArgType,

    #[serde(default)]
    pub required: bool,

    /// `null` and absent are both treated as "no default"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<Value>,
}

/// Manifest of an external enrichment plugin (`settings.json`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginManifest {
    #[serde(default)]
    pub enabled: bool,

    pub name: String,

    /// Relative to the manifest directory on disk, absolute once loaded
    pub executable_path: PathBuf,

    /// Cache TTL of a successful result, in seconds
    #[serde(rename = "timeout", default)]
    pub timeout_secs: u64,

    /// Execution deadline in seconds; the service default applies when absent,
    /// zero disables the deadline
    #[serde(
        rename = "executionTimeout",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub execution_timeout_secs: Option<u64>,

    #[serde(default)]
    pub allowed_types: Vec<DataType>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default)]
    pub config_args: Vec<ConfigArg>,
}

impl PluginManifest {
    /// Minimal enabled manifest, mostly useful for tests and tooling
    pub fn new(
        name: impl Into<String>,
        executable_path: impl Into<PathBuf>,
        allowed_types: Vec<DataType>,
    ) -> Self {
        Self {
            enabled: true,
            name: name.into(),
            executable_path: executable_path.into(),
            timeout_secs: 0,
            execution_timeout_secs: None,
            allowed_types,
            author: None,
            source: None,
            description: None,
            config_args: Vec::new(),
        }
    }

    pub fn with_cache_ttl(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    pub fn with_execution_timeout(mut self, secs: u64) -> Self {
        self.execution_timeout_secs = Some(secs);
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// How long a successful result stays cached
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Execution deadline, falling back to the service-wide default.
    ///
    /// `None` when the effective deadline is zero: the plugin runs unbounded.
    pub fn execution_deadline(&self, default: Duration) -> Option<Duration> {
        let deadline = self
            .execution_timeout_secs
            .map(Duration::from_secs)
            .unwrap_or(default);
        (!deadline.is_zero()).then_some(deadline)
    }
}
