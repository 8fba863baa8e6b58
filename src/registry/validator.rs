use crate::error::{AppError, Result};
use crate::models::{ConfigArg, PluginManifest};

/// Validate a loaded manifest whose `executable_path` is already resolved.
///
/// Rules are checked in order and the first violation is returned.
pub fn validate(manifest: &PluginManifest) -> Result<()> {
    if !manifest.executable_path.exists() {
        return Err(AppError::Validation(format!(
            "executable '{}' does not exist",
            manifest.executable_path.display()
        )));
    }

    if let Some(source) = manifest.source.as_deref().filter(|s| !s.is_empty()) {
        validate_source(source)?;
    }

    for arg in &manifest.config_args {
        validate_config_arg(arg)?;
    }

    if manifest.allowed_types.is_empty() {
        return Err(AppError::Validation(
            "allowedTypes must list at least one data type".to_string(),
        ));
    }

    if manifest.name.trim().is_empty() {
        return Err(AppError::Validation("name must not be empty".to_string()));
    }

    Ok(())
}

fn validate_source(source: &str) -> Result<()> {
    let url = reqwest::Url::parse(source)
        .map_err(|e| AppError::Validation(format!("source '{}' is not a URL: {}", source, e)))?;

    if url.host_str().is_none() {
        return Err(AppError::Validation(format!(
            "source '{}' must be an absolute URL with a host",
            source
        )));
    }

    Ok(())
}

fn validate_config_arg(arg: &ConfigArg) -> Result<()> {
    let Some(default) = arg.default_value.as_ref() else {
        return Ok(());
    };

    if arg.required {
        return Err(AppError::Validation(format!(
            "config arg '{}' is required and cannot have a default value",
            arg.name
        )));
    }

    if !arg.arg_type.matches(default) {
        return Err(AppError::Validation(format!(
            "config arg '{}' default {} is not of type {}",
            arg.name, default, arg.arg_type
        )));
    }

    Ok(())
}
