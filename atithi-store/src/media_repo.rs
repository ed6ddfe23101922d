use async_trait::async_trait;
use atithi_core::document::{StoredDocument, UploadFile, UploadOptions};
use atithi_core::repository::{DocumentStore, DocumentStoreError};
use serde::Deserialize;
use tracing::info;

use crate::app_config::MediaConfig;

/// Client for the hosted media store's unsigned upload endpoint. Configured
/// once at startup and reused read-only; deletion is not offered because it
/// requires a server-held credential this client never has.
pub struct CloudinaryClient {
    http: reqwest::Client,
    api_base: String,
    cloud_name: String,
    upload_preset: String,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    secure_url: String,
    public_id: String,
    bytes: u64,
    format: Option<String>,
}

impl CloudinaryClient {
    pub fn new(config: &MediaConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_base: config.api_base.clone(),
            cloud_name: config.cloud_name.clone(),
            upload_preset: config.upload_preset.clone(),
        }
    }
}

#[async_trait]
impl DocumentStore for CloudinaryClient {
    async fn upload(
        &self,
        file: &UploadFile,
        options: &UploadOptions,
    ) -> Result<StoredDocument, DocumentStoreError> {
        let part = reqwest::multipart::Part::bytes(file.bytes.clone())
            .file_name(file.name.clone())
            .mime_str(&file.content_type)
            .map_err(|e| DocumentStoreError::Rejected(e.to_string()))?;

        let form = reqwest::multipart::Form::new()
            .text("upload_preset", self.upload_preset.clone())
            .text("folder", options.folder.clone())
            .text("resource_type", options.resource_type_hint.clone())
            .part("file", part);

        let url = format!("{}/{}/upload", self.api_base, self.cloud_name);
        let response = self
            .http
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| DocumentStoreError::Unavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(DocumentStoreError::Rejected(format!(
                "upload endpoint returned {}",
                response.status()
            )));
        }

        let body: UploadResponse = response
            .json()
            .await
            .map_err(|e| DocumentStoreError::Malformed(e.to_string()))?;

        info!(public_id = %body.public_id, bytes = body.bytes, "document stored");

        Ok(StoredDocument {
            url: body.secure_url,
            public_id: body.public_id,
            size_bytes: body.bytes,
            format: body.format,
        })
    }
}
