use crate::error::{AppError, Result};
use crate::models::{EnrichmentResult, PluginManifest};
use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

/// Invokes a plugin for one piece of data
#[async_trait]
pub trait PluginRunner: Send + Sync {
    async fn run(&self, plugin: &PluginManifest, data: &str) -> Result<EnrichmentResult>;
}

/// Runs plugins as child processes.
///
/// The data value is passed as the only argument and the result is read from
/// stdout. A child still running at its deadline is killed; a zero deadline
/// lets it run to completion.
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    default_deadline: Duration,
}

impl ProcessRunner {
    pub fn new(default_deadline: Duration) -> Self {
        Self { default_deadline }
    }
}

#[async_trait]
impl PluginRunner for ProcessRunner {
    async fn run(&self, plugin: &PluginManifest, data: &str) -> Result<EnrichmentResult> {
        let deadline = plugin.execution_deadline(self.default_deadline);

        let execution = Command::new(&plugin.executable_path)
            .arg(data)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output();

        let spawned = match deadline {
            Some(deadline) => tokio::time::timeout(deadline, execution)
                .await
                .map_err(|_| {
                    AppError::Timeout(format!(
                        "plugin '{}' exceeded its {}s deadline",
                        plugin.name,
                        deadline.as_secs_f64()
                    ))
                })?,
            None => execution.await,
        };

        let output = spawned.map_err(|e| {
            AppError::plugin(
                &plugin.name,
                format!("failed to spawn '{}': {}", plugin.executable_path.display(), e),
            )
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let exit = output
                .status
                .code()
                .map_or_else(|| "a signal".to_string(), |code| format!("status {}", code));
            return Err(AppError::plugin(
                &plugin.name,
                format!("exited with {}: {}", exit, stderr.trim()),
            ));
        }

        serde_json::from_slice::<EnrichmentResult>(&output.stdout).map_err(|e| {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let mut message = format!("malformed output: {}", e);
            if !stderr.trim().is_empty() {
                message.push_str(&format!(" (stderr: {})", stderr.trim()));
            }
            AppError::plugin(&plugin.name, message)
        })
    }
}
