//! The reference `file` export plugin: writes each request's payload to a
//! timestamped file under a configured output directory, or to stdout when
//! the destination is the literal `"-"` (spec.md §6).

use std::path::PathBuf;

use chrono::Utc;
use driftwatch_health::HealthStatus;
use driftwatch_model::{ConfigValue, DataType, ExportRequest, ExportResponse, ExportStatus};
use futures::future::BoxFuture;
use tokio::sync::RwLock;

use crate::context::ExportContext;
use crate::error::ExportError;
use crate::plugin::ExportPlugin;

fn data_type_kind(data_type: DataType) -> &'static str {
    match data_type {
        DataType::DriftReport => "drift_report",
        DataType::Snapshot => "snapshot",
        DataType::Correlation => "correlation",
        DataType::Baseline => "baseline",
        DataType::Timeline => "timeline",
        DataType::Metrics => "metrics",
        DataType::Events => "events",
        DataType::Alert => "alert",
    }
}

fn extension_for(format: &str) -> &str {
    match format {
        "yaml" | "yml" => "yaml",
        "text" | "txt" => "txt",
        _ => "json",
    }
}

fn encode(format: &str, data: &ConfigValue) -> Result<String, ExportError> {
    match format {
        "yaml" | "yml" => serde_yaml::to_string(data).map_err(|e| ExportError::PluginFailed {
            plugin: "file".to_string(),
            message: e.to_string(),
        }),
        "text" | "txt" => Ok(data.to_string()),
        _ => serde_json::to_string_pretty(data).map_err(|e| ExportError::PluginFailed {
            plugin: "file".to_string(),
            message: e.to_string(),
        }),
    }
}

pub struct FilePlugin {
    output_dir: RwLock<PathBuf>,
}

impl FilePlugin {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: RwLock::new(output_dir.into()),
        }
    }

    fn destination(request: &ExportRequest) -> Option<String> {
        request
            .options
            .get("destination")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string())
    }
}

impl ExportPlugin for FilePlugin {
    fn name(&self) -> &str {
        "file"
    }

    fn supported_formats(&self) -> Vec<String> {
        vec!["json".to_string(), "yaml".to_string(), "text".to_string()]
    }

    fn initialize(&self, _ctx: &ExportContext) -> BoxFuture<'_, Result<(), ExportError>> {
        Box::pin(async move {
            let dir = self.output_dir.read().await.clone();
            tokio::fs::create_dir_all(&dir)
                .await
                .map_err(|e| ExportError::InvalidConfig {
                    plugin: "file".to_string(),
                    message: format!("cannot create output directory {}: {e}", dir.display()),
                })
        })
    }

    fn validate(&self) -> BoxFuture<'_, Result<(), ExportError>> {
        Box::pin(async { Ok(()) })
    }

    fn start(&self) -> BoxFuture<'_, Result<(), ExportError>> {
        Box::pin(async { Ok(()) })
    }

    fn stop(&self) -> BoxFuture<'_, Result<(), ExportError>> {
        Box::pin(async { Ok(()) })
    }

    fn export(&self, _ctx: &ExportContext, request: ExportRequest) -> BoxFuture<'_, Result<ExportResponse, ExportError>> {
        Box::pin(async move {
            let body = encode(&request.format, &request.data)?;

            if Self::destination(&request).as_deref() == Some("-") {
                println!("{body}");
                let mut response = ExportResponse::pending(request.id);
                response.plugin_name = Some("file".to_string());
                response.status = ExportStatus::Completed;
                response.output_path = Some("-".to_string());
                return Ok(response);
            }

            let filename = format!(
                "{}-{}.{}",
                data_type_kind(request.data_type),
                Utc::now().format("%Y%m%d-%H%M%S"),
                extension_for(&request.format)
            );
            let path = self.output_dir.read().await.join(&filename);
            tokio::fs::write(&path, body.as_bytes())
                .await
                .map_err(|e| ExportError::PluginFailed {
                    plugin: "file".to_string(),
                    message: format!("writing {}: {e}", path.display()),
                })?;

            let mut response = ExportResponse::pending(request.id);
            response.plugin_name = Some("file".to_string());
            response.status = ExportStatus::Completed;
            response.output_path = Some(path.display().to_string());
            Ok(response)
        })
    }

    fn health_check(&self) -> BoxFuture<'_, HealthStatus> {
        Box::pin(async move {
            let dir = self.output_dir.read().await.clone();
            if tokio::fs::metadata(&dir).await.is_ok() {
                HealthStatus::Healthy
            } else {
                HealthStatus::Degraded
            }
        })
    }

    fn update_config(&self, settings: ConfigValue) -> BoxFuture<'_, Result<(), ExportError>> {
        Box::pin(async move {
            if let ConfigValue::Map(map) = settings {
                if let Some(dir) = map.get("output_dir").and_then(|v| v.as_str()) {
                    *self.output_dir.write().await = PathBuf::from(dir);
                }
            }
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn writes_json_file_named_by_kind_and_timestamp() {
        let dir = std::env::temp_dir().join(format!("driftwatch-file-plugin-test-{}", std::process::id()));
        let plugin = FilePlugin::new(&dir);
        plugin.initialize(&ExportContext::default()).await.unwrap();

        let request = ExportRequest::new("json", DataType::Snapshot, ConfigValue::Bool(true));
        let response = plugin.export(&ExportContext::default(), request).await.unwrap();

        let path = response.output_path.unwrap();
        assert!(path.contains("snapshot-"));
        assert!(path.ends_with(".json"));
        assert!(tokio::fs::metadata(&path).await.is_ok());

        let _ = tokio::fs::remove_dir_all(&dir).await;
    }

    #[tokio::test]
    async fn stdout_destination_skips_the_filesystem() {
        let plugin = FilePlugin::new(std::env::temp_dir());
        let mut request = ExportRequest::new("text", DataType::Metrics, ConfigValue::Null);
        request.options.insert("destination".to_string(), ConfigValue::String("-".to_string()));

        let response = plugin.export(&ExportContext::default(), request).await.unwrap();
        assert_eq!(response.output_path.as_deref(), Some("-"));
    }
}
