// Client for the external background-removal API (remove.bg compatible).

use crate::{headers::XApiKey, upload::ImageUpload};
use bytes::Bytes;
use headers::HeaderMapExt;
use reqwest::{
    StatusCode,
    header::HeaderMap,
    multipart::{Form, Part},
};
use thiserror::Error;
use tracing::debug;

pub const DEFAULT_PROVIDER_URL: &str = "https://api.remove.bg/v1.0/removebg";

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Remove.bg API key not configured")]
    MissingApiKey,

    /// The provider answered with a non-2xx status; `body` is its raw text.
    #[error("Remove.bg API error: {} - {body}", .status.as_u16())]
    Rejected { status: StatusCode, body: String },

    #[error("failed to build provider request: {0}")]
    InvalidRequest(String),

    #[error("provider request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Forwards uploads to the provider. The API key is fixed at construction
/// and shared read-only by every request.
#[derive(Debug, Clone)]
pub struct ProviderClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: Option<XApiKey>,
}

impl ProviderClient {
    /// A blank key is treated as missing.
    pub fn new(endpoint: impl Into<String>, api_key: Option<String>) -> Self {
        let api_key = api_key
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty())
            .map(XApiKey);

        Self {
            http: reqwest::Client::new(),
            endpoint: endpoint.into(),
            api_key,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    pub fn ensure_configured(&self) -> Result<(), ProviderError> {
        if self.is_configured() {
            Ok(())
        } else {
            Err(ProviderError::MissingApiKey)
        }
    }

    /// Sends one request to the provider and returns the processed image bytes.
    /// Nothing is retried.
    pub async fn remove_background(&self, upload: &ImageUpload) -> Result<Bytes, ProviderError> {
        let api_key = self.api_key.clone().ok_or(ProviderError::MissingApiKey)?;

        let image_part = Part::bytes(upload.bytes.to_vec())
            .file_name(upload.filename.clone())
            .mime_str(&upload.content_type)
            .map_err(|e| ProviderError::InvalidRequest(format!("invalid content type: {}", e)))?;

        let form = Form::new()
            .part("image_file", image_part)
            .text("size", "auto");

        let mut headers = HeaderMap::new();
        headers.typed_insert(api_key);

        debug!(
            "Forwarding {} bytes ({}) to {}",
            upload.size(),
            upload.content_type,
            self.endpoint
        );

        let response = self
            .http
            .post(&self.endpoint)
            .headers(headers)
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await?;
            return Err(ProviderError::Rejected { status, body });
        }

        Ok(response.bytes().await?)
    }
}
