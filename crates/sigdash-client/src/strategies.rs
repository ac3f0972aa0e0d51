//! Strategy file management endpoints.

use reqwest::header::CONTENT_DISPOSITION;
use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::client::DashboardApi;
use crate::error::{ClientError, ClientResult};
use crate::types::{ApiMessage, StrategyFile, StrategyStatus, StrategyUpload};

/// Body of `PUT /api/strategies/{id}/info`.
#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StrategyInfoUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

/// Result of importing the builtin strategies.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BuiltinImport {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub count: usize,
    #[serde(default)]
    pub strategies: Vec<StrategyFile>,
}

/// A downloaded strategy file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrategyDownload {
    pub filename: String,
    pub bytes: Vec<u8>,
}

impl DashboardApi {
    /// List every uploaded strategy.
    pub async fn list_strategies(&self) -> ClientResult<Vec<StrategyFile>> {
        let request = self.client.get(self.url("/api/strategies"));
        self.send_json(request, "/api/strategies").await
    }

    /// Upload a validated strategy file.
    pub async fn upload_strategy(&self, upload: StrategyUpload) -> ClientResult<StrategyFile> {
        let size = upload.bytes.len();
        let part = Part::bytes(upload.bytes)
            .file_name(upload.filename.clone())
            .mime_str("text/x-python")
            .map_err(|e| ClientError::HttpClient(format!("Invalid upload part: {e}")))?;

        let mut form = Form::new().part("file", part);
        if let Some(description) = upload.description {
            form = form.text("description", description);
        }

        let request = self
            .client
            .post(self.url("/api/strategies/upload"))
            .multipart(form);
        let file: StrategyFile = self.send_json(request, "/api/strategies/upload").await?;

        info!(id = file.id, filename = %upload.filename, size, "Uploaded strategy file");
        Ok(file)
    }

    /// Download a strategy file's source.
    pub async fn download_strategy(&self, id: i64) -> ClientResult<StrategyDownload> {
        let path = format!("/api/strategies/{id}/download");
        let response = self.send(self.client.get(self.url(&path)), &path).await?;

        let filename = response
            .headers()
            .get(CONTENT_DISPOSITION)
            .and_then(|v| v.to_str().ok())
            .and_then(attachment_filename)
            .unwrap_or_else(|| format!("strategy_{id}.py"));

        let bytes = response
            .bytes()
            .await
            .map_err(|e| ClientError::Transport(format!("{path}: failed to read body: {e}")))?;

        Ok(StrategyDownload {
            filename,
            bytes: bytes.to_vec(),
        })
    }

    /// Ask the backend to reload a strategy without a restart.
    pub async fn reload_strategy(&self, id: i64) -> ClientResult<ApiMessage> {
        let path = format!("/api/strategies/{id}/reload");
        let message: ApiMessage = self.send_json(self.client.post(self.url(&path)), &path).await?;
        info!(id, "Hot-reloaded strategy");
        Ok(message)
    }

    /// Change a strategy's status.
    pub async fn set_strategy_status(
        &self,
        id: i64,
        status: StrategyStatus,
    ) -> ClientResult<StrategyFile> {
        let path = format!("/api/strategies/{id}/status");
        let body = serde_json::json!({ "status": status.to_string() });
        self.send_json(self.client.put(self.url(&path)).json(&body), &path)
            .await
    }

    /// Update a strategy's description and/or display name.
    pub async fn update_strategy_info(
        &self,
        id: i64,
        update: &StrategyInfoUpdate,
    ) -> ClientResult<StrategyFile> {
        if update.description.is_none() && update.display_name.is_none() {
            return Err(ClientError::Validation("nothing to update".to_string()));
        }
        let path = format!("/api/strategies/{id}/info");
        self.send_json(self.client.put(self.url(&path)).json(update), &path)
            .await
    }

    /// Delete a strategy file.
    pub async fn delete_strategy(&self, id: i64) -> ClientResult<ApiMessage> {
        let path = format!("/api/strategies/{id}");
        let message: ApiMessage = self
            .send_json(self.client.delete(self.url(&path)), &path)
            .await?;
        info!(id, "Deleted strategy");
        Ok(message)
    }

    /// Import the strategies bundled with the backend.
    pub async fn import_builtin_strategies(&self) -> ClientResult<BuiltinImport> {
        let path = "/api/strategies/import-builtin";
        self.send_json(self.client.post(self.url(path)), path).await
    }
}

/// Extract `filename="..."` from a Content-Disposition header.
fn attachment_filename(header: &str) -> Option<String> {
    header.split(';').map(str::trim).find_map(|part| {
        part.strip_prefix("filename=")
            .map(|name| name.trim_matches('"').to_string())
            .filter(|name| !name.is_empty())
    })
}
