use crate::error::{AppError, Result};
use crate::models::PluginManifest;
use crate::registry::validator::validate;
use crate::registry::RegistryIndex;
use std::collections::HashSet;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

/// Load every plugin found directly below `root`.
///
/// Each subdirectory is loaded by its own task. A plugin that fails to load
/// or validate is logged and skipped; only an unreadable `root` is an error.
pub async fn load_all(root: &Path, manifest_file: &str) -> Result<RegistryIndex> {
    let mut entries = tokio::fs::read_dir(root).await.map_err(|e| {
        AppError::Configuration(format!(
            "Failed to read enrichers directory '{}': {}",
            root.display(),
            e
        ))
    })?;

    let mut tasks = JoinSet::new();

    loop {
        let entry = match entries.next_entry().await {
            Ok(Some(entry)) => entry,
            Ok(None) => break,
            Err(e) => {
                return Err(AppError::Configuration(format!(
                    "Failed to list enrichers directory '{}': {}",
                    root.display(),
                    e
                )))
            }
        };

        let dir = entry.path();
        match tokio::fs::metadata(&dir).await {
            Ok(meta) if meta.is_dir() => {}
            Ok(_) => continue,
            Err(e) => {
                warn!(path = %dir.display(), "Skipping unreadable entry: {}", e);
                continue;
            }
        }

        let manifest_file = manifest_file.to_string();
        tasks.spawn(async move {
            let result = load_plugin(&dir, &manifest_file).await;
            (dir, result)
        });
    }

    let mut index = RegistryIndex::default();
    let mut names = HashSet::new();

    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((dir, Ok(Some(manifest)))) => {
                if !names.insert(manifest.name.clone()) {
                    warn!(
                        plugin = %manifest.name,
                        path = %dir.display(),
                        "Duplicate plugin name, results will share cache keys"
                    );
                }
                info!(
                    plugin = %manifest.name,
                    enabled = manifest.enabled,
                    types = ?manifest.allowed_types,
                    "Loaded plugin"
                );
                index.insert(Arc::new(manifest));
            }
            Ok((dir, Ok(None))) => {
                debug!(path = %dir.display(), "No manifest found, skipping directory");
            }
            Ok((dir, Err(e))) => {
                warn!(path = %dir.display(), "Skipping plugin: {}", e);
            }
            Err(e) => {
                error!("Plugin load task failed: {}", e);
            }
        }
    }

    index.sort();

    if index.is_empty() {
        warn!(path = %root.display(), "No enrichers loaded");
    }

    Ok(index)
}

/// Read, resolve and validate the manifest of one plugin directory.
///
/// `Ok(None)` means the directory has no manifest file.
pub async fn load_plugin(dir: &Path, manifest_file: &str) -> Result<Option<PluginManifest>> {
    let path = dir.join(manifest_file);
    let raw = match tokio::fs::read(&path).await {
        Ok(raw) => raw,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    let mut manifest: PluginManifest = serde_json::from_slice(&raw)?;
    manifest.executable_path = resolve_executable(dir, &manifest.executable_path)?;
    validate(&manifest)?;

    Ok(Some(manifest))
}

fn resolve_executable(dir: &Path, executable: &Path) -> Result<PathBuf> {
    if executable.is_absolute() {
        return Ok(executable.to_path_buf());
    }
    Ok(std::path::absolute(dir.join(executable))?)
}
