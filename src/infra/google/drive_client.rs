use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, LOCATION};
use reqwest::{Client, Response};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

use crate::core::articles::{DocumentSink, PublishError, PublishedDocument};
use crate::core::auth::AccessTokenSource;

const DRIVE_UPLOAD_BASE: &str = "https://www.googleapis.com";

/// Uploads with this target type are converted to a native Google Doc.
const GOOGLE_DOC_MIME: &str = "application/vnd.google-apps.document";
const TEXT_MIME: &str = "text/plain; charset=UTF-8";

/// Creates Google Docs from plain text through the Drive v3 resumable upload.
pub struct GoogleDriveClient {
    client: Client,
    tokens: Arc<dyn AccessTokenSource>,
    base_url: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DriveFile {
    id: String,
    #[serde(default)]
    web_view_link: Option<String>,
}

impl GoogleDriveClient {
    pub fn new(client: Client, tokens: Arc<dyn AccessTokenSource>) -> Self {
        Self {
            client,
            tokens,
            base_url: DRIVE_UPLOAD_BASE.to_string(),
        }
    }

    /// Points uploads at another host (a local stub in tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn session_url(&self) -> String {
        format!(
            "{}/upload/drive/v3/files?uploadType=resumable&supportsAllDrives=true&fields=id,webViewLink",
            self.base_url
        )
    }

    fn file_metadata(folder_id: &str, name: &str) -> serde_json::Value {
        json!({
            "name": name,
            "parents": [folder_id],
            "mimeType": GOOGLE_DOC_MIME,
        })
    }

    async fn ensure_success(response: Response) -> Result<Response, PublishError> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        Err(PublishError::Api { status, body })
    }
}

#[async_trait]
impl DocumentSink for GoogleDriveClient {
    async fn publish(
        &self,
        folder_id: &str,
        name: &str,
        content: &str,
    ) -> Result<PublishedDocument, PublishError> {
        let token = self.tokens.access_token().await?;
        let bytes = content.as_bytes().to_vec();

        // Step 1: open an upload session carrying the file metadata.
        let response = self
            .client
            .post(self.session_url())
            .bearer_auth(&token)
            .header("X-Upload-Content-Type", TEXT_MIME)
            .header("X-Upload-Content-Length", bytes.len())
            .json(&Self::file_metadata(folder_id, name))
            .send()
            .await
            .map_err(|e| PublishError::Request(e.to_string()))?;
        let response = Self::ensure_success(response).await?;

        let session_uri = response
            .headers()
            .get(LOCATION)
            .and_then(|value| value.to_str().ok())
            .ok_or(PublishError::MissingUploadSession)?
            .to_string();

        tracing::debug!("Opened upload session for '{}'", name);

        // Step 2: send the whole body in one request.
        let response = self
            .client
            .put(&session_uri)
            .bearer_auth(&token)
            .header(CONTENT_TYPE, TEXT_MIME)
            .body(bytes)
            .send()
            .await
            .map_err(|e| PublishError::Request(e.to_string()))?;
        let response = Self::ensure_success(response).await?;

        let file: DriveFile = response
            .json()
            .await
            .map_err(|e| PublishError::Request(format!("invalid Drive response: {}", e)))?;

        Ok(PublishedDocument {
            id: file.id,
            link: file.web_view_link,
        })
    }
}
