//! Shared fixtures for the integration tests
//!
//! Plugin directories on disk, a scripted fake plugin runner and helpers to
//! wire a pipeline together.

#![allow(dead_code)]

use async_trait::async_trait;
use enricher::cache::{CacheClient, InMemoryCache};
use enricher::enrichment::{EnrichmentPipeline, PluginRunner};
use enricher::error::{AppError, Result};
use enricher::fanout::FanOut;
use enricher::models::{DataType, EnrichmentResult, PluginManifest};
use enricher::registry::{PluginRegistry, RegistryIndex};
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Write an executable `#!/bin/sh` script
pub fn write_script(path: &Path, body: &str) {
    std::fs::write(path, format!("#!/bin/sh\n{}\n", body)).unwrap();
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755)).unwrap();
}

/// Create `<root>/<dir>/` holding `manifest` as `settings.json`, plus a `run.sh`
/// script when `script` is given
pub fn write_plugin_dir(root: &Path, dir: &str, manifest: &Value, script: Option<&str>) -> PathBuf {
    let plugin_dir = root.join(dir);
    std::fs::create_dir_all(&plugin_dir).unwrap();
    if let Some(body) = script {
        write_script(&plugin_dir.join("run.sh"), body);
    }
    std::fs::write(
        plugin_dir.join("settings.json"),
        serde_json::to_vec_pretty(manifest).unwrap(),
    )
    .unwrap();
    plugin_dir
}

/// Manifest JSON for a plugin whose executable is `run.sh`
pub fn manifest_json(name: &str, types: &[&str]) -> Value {
    json!({
        "enabled": true,
        "name": name,
        "executablePath": "run.sh",
        "timeout": 60,
        "allowedTypes": types,
        "configArgs": []
    })
}

/// Script printing a report that echoes the plugin name and its argument
pub fn echo_script(name: &str) -> String {
    format!(
        r#"printf '{{"Report": {{"plugin": "{}", "data": "%s"}}, "Errors": []}}' "$1""#,
        name
    )
}

/// In-memory manifest, never executed for real
pub fn plugin(name: &str, types: Vec<DataType>) -> PluginManifest {
    PluginManifest::new(name, format!("/opt/enrichers/{}/run.sh", name), types).with_cache_ttl(60)
}

pub fn report_for(plugin: &str, data: &str) -> EnrichmentResult {
    serde_json::from_value(json!({
        "Report": {"plugin": plugin, "data": data},
        "Errors": []
    }))
    .unwrap()
}

/// Plugin runner that records invocations and answers from a script
#[derive(Default)]
pub struct FakeRunner {
    calls: Mutex<HashMap<String, usize>>,
    failing: HashSet<String>,
    delay: Option<Duration>,
    active: AtomicUsize,
    peak: AtomicUsize,
}

impl FakeRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `plugin` fail on every invocation
    pub fn failing(mut self, plugin: &str) -> Self {
        self.failing.insert(plugin.to_string());
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self, plugin: &str) -> usize {
        self.calls.lock().unwrap().get(plugin).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().values().sum()
    }

    /// Highest number of invocations observed in flight at once
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PluginRunner for FakeRunner {
    async fn run(&self, plugin: &PluginManifest, data: &str) -> Result<EnrichmentResult> {
        *self
            .calls
            .lock()
            .unwrap()
            .entry(plugin.name.clone())
            .or_default() += 1;

        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.active.fetch_sub(1, Ordering::SeqCst);

        if self.failing.contains(&plugin.name) {
            return Err(AppError::plugin(&plugin.name, "exited with status 1: boom"));
        }
        Ok(report_for(&plugin.name, data))
    }
}

/// Cache whose every operation fails
pub struct BrokenCache;

#[async_trait]
impl CacheClient for BrokenCache {
    async fn get(&self, _key: &str) -> Result<Vec<u8>> {
        Err(AppError::Cache("connection refused".to_string()))
    }

    async fn set(&self, _key: &str, _value: Vec<u8>) -> Result<()> {
        Err(AppError::Cache("connection refused".to_string()))
    }

    async fn set_with_ttl(&self, _key: &str, _value: Vec<u8>, _ttl: Duration) -> Result<()> {
        Err(AppError::Cache("connection refused".to_string()))
    }

    async fn delete(&self, _keys: &[String]) -> Result<u64> {
        Err(AppError::Cache("connection refused".to_string()))
    }

    async fn clean(&self) -> Result<()> {
        Err(AppError::Cache("connection refused".to_string()))
    }

    fn backend(&self) -> &'static str {
        "broken"
    }
}

pub struct Harness {
    pub pipeline: Arc<EnrichmentPipeline>,
    pub runner: Arc<FakeRunner>,
    pub cache: Arc<InMemoryCache>,
    pub registry: Arc<PluginRegistry>,
}

/// Pipeline over in-memory plugins, an in-memory cache and `runner`
pub fn harness(plugins: Vec<PluginManifest>, runner: FakeRunner) -> Harness {
    let registry = Arc::new(PluginRegistry::from_index(RegistryIndex::from_plugins(plugins)));
    let cache = Arc::new(InMemoryCache::new());
    let runner = Arc::new(runner);
    let pipeline = Arc::new(EnrichmentPipeline::new(
        registry.clone(),
        cache.clone(),
        runner.clone(),
        FanOut::unbounded(),
    ));

    Harness {
        pipeline,
        runner,
        cache,
        registry,
    }
}
