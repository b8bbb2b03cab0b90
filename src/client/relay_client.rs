// HTTP client for a running relay

use crate::{
    upload::{ImageUpload, UPLOAD_FIELD_NAME},
    web::{ErrorBody, REMOVE_BACKGROUND_PATH},
};
use bytes::Bytes;
use reqwest::multipart::{Form, Part};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ClientError {
    /// The relay answered with an error; `message` is what it said.
    #[error("{message}")]
    Relay { status: u16, message: String },

    #[error("Failed to reach the relay: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid upload: {0}")]
    InvalidUpload(String),
}

#[derive(Debug, Clone)]
pub struct RelayClient {
    http: reqwest::Client,
    endpoint: String,
}

impl RelayClient {
    /// `base_url` is the relay origin, e.g. `http://localhost:3000`.
    pub fn new(base_url: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: format!("{}{}", base_url.trim_end_matches('/'), REMOVE_BACKGROUND_PATH),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub async fn remove_background(&self, upload: &ImageUpload) -> Result<Bytes, ClientError> {
        let part = Part::bytes(upload.bytes.to_vec())
            .file_name(upload.filename.clone())
            .mime_str(&upload.content_type)
            .map_err(|e| ClientError::InvalidUpload(e.to_string()))?;
        let form = Form::new().part(UPLOAD_FIELD_NAME, part);

        debug!("Submitting {} to {}", upload.filename, self.endpoint);
        let response = self.http.post(&self.endpoint).multipart(form).send().await?;

        let status = response.status();
        if status.is_success() {
            return Ok(response.bytes().await?);
        }

        // Fall back to the status line when the relay (or a proxy) sent no envelope
        let body = response.bytes().await.unwrap_or_default();
        let message = serde_json::from_slice::<ErrorBody>(&body)
            .map(|envelope| envelope.error)
            .unwrap_or_else(|_| {
                format!(
                    "API Error: {} {}",
                    status.as_u16(),
                    status.canonical_reason().unwrap_or_default()
                )
            });

        Err(ClientError::Relay {
            status: status.as_u16(),
            message,
        })
    }
}
