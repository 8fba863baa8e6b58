//! Plugin registry
//!
//! Discovers plugin manifests on disk, validates them and indexes the
//! survivors by the data types they accept. The index is built once and
//! shared read-only afterwards.

pub mod loader;
pub mod validator;

pub use loader::{load_all, load_plugin};
pub use validator::validate;

use crate::config::EnrichersConfig;
use crate::error::{AppError, Result};
use crate::fanout::BatchItem;
use crate::models::{DataType, PluginManifest};
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::OnceCell;

impl BatchItem for PluginManifest {
    fn batch_label(&self) -> String {
        self.name.clone()
    }
}

/// Data type -> plugins accepting it, each list ordered by plugin name
#[derive(Debug, Clone, Default)]
pub struct RegistryIndex {
    by_type: HashMap<DataType, Vec<Arc<PluginManifest>>>,
    plugin_count: usize,
}

impl RegistryIndex {
    /// Build an index from already validated manifests
    pub fn from_plugins(plugins: impl IntoIterator<Item = PluginManifest>) -> Self {
        let mut index = Self::default();
        for plugin in plugins {
            index.insert(Arc::new(plugin));
        }
        index.sort();
        index
    }

    /// Index a plugin under every type it accepts, once per type
    pub fn insert(&mut self, plugin: Arc<PluginManifest>) {
        let mut types = plugin.allowed_types.clone();
        types.sort();
        types.dedup();

        for data_type in types {
            self.by_type
                .entry(data_type)
                .or_default()
                .push(plugin.clone());
        }
        self.plugin_count += 1;
    }

    pub(crate) fn sort(&mut self) {
        for plugins in self.by_type.values_mut() {
            plugins.sort_by(|a, b| a.name.cmp(&b.name));
        }
    }

    /// Plugins registered for `data_type`, `None` if the type is unknown
    pub fn plugins_for(&self, data_type: DataType) -> Option<&[Arc<PluginManifest>]> {
        self.by_type.get(&data_type).map(Vec::as_slice)
    }

    pub fn is_empty(&self) -> bool {
        self.by_type.is_empty()
    }

    /// Number of distinct plugins loaded
    pub fn plugin_count(&self) -> usize {
        self.plugin_count
    }

    /// Per-type view ordered by data type
    pub fn by_type(&self) -> BTreeMap<DataType, &[Arc<PluginManifest>]> {
        self.by_type
            .iter()
            .map(|(data_type, plugins)| (*data_type, plugins.as_slice()))
            .collect()
    }
}

/// Lazily loaded, process-wide plugin index
pub struct PluginRegistry {
    root: PathBuf,
    manifest_file: String,
    index: OnceCell<Arc<RegistryIndex>>,
}

impl PluginRegistry {
    pub fn new(root: impl Into<PathBuf>, manifest_file: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            manifest_file: manifest_file.into(),
            index: OnceCell::new(),
        }
    }

    pub fn from_config(config: &EnrichersConfig) -> Self {
        Self::new(config.path.clone(), config.manifest_file.clone())
    }

    /// Registry that serves a prebuilt index and never touches the disk
    pub fn from_index(index: RegistryIndex) -> Self {
        Self {
            root: PathBuf::new(),
            manifest_file: String::new(),
            index: OnceCell::from(Arc::new(index)),
        }
    }

    /// Return the index, loading it on first use.
    ///
    /// Concurrent first callers share a single load. A failed load is not
    /// cached, an empty index is.
    pub async fn get_all(&self) -> Result<Arc<RegistryIndex>> {
        self.index
            .get_or_try_init(|| async {
                let index = load_all(&self.root, &self.manifest_file).await?;
                record_loaded(&index);
                Ok::<_, AppError>(Arc::new(index))
            })
            .await
            .cloned()
    }

    /// Index if it has been loaded already
    pub fn loaded(&self) -> Option<Arc<RegistryIndex>> {
        self.index.get().cloned()
    }
}

fn record_loaded(index: &RegistryIndex) {
    for (data_type, plugins) in index.by_type() {
        crate::metrics::PLUGINS_LOADED
            .with_label_values(&[data_type.as_ref()])
            .set(plugins.len() as f64);
    }
}
