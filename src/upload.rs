// Upload constraints shared by the relay endpoint and the upload client.

use bytes::Bytes;
use mime::Mime;
use thiserror::Error;

/// Largest image accepted for background removal.
pub const MAX_UPLOAD_SIZE_BYTES: usize = 12 * 1024 * 1024; // 12MB

/// Multipart field carrying the image, both towards the relay and inside it.
pub const UPLOAD_FIELD_NAME: &str = "image";

/// Reasons an upload is refused before it ever reaches the provider.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum UploadRejection {
    #[error("Only image files are allowed")]
    InvalidType,
    #[error("File size too large. Maximum size is 12MB.")]
    TooLarge,
    #[error("Uploaded image is empty")]
    Empty,
}

/// An image selected for upload, held entirely in memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageUpload {
    pub filename: String,
    pub content_type: String,
    pub bytes: Bytes,
}

impl ImageUpload {
    pub fn new(
        filename: impl Into<String>,
        content_type: impl Into<String>,
        bytes: impl Into<Bytes>,
    ) -> Self {
        Self {
            filename: filename.into(),
            content_type: content_type.into(),
            bytes: bytes.into(),
        }
    }

    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    pub fn validate(&self) -> Result<(), UploadRejection> {
        check_content_type(&self.content_type)?;
        if self.bytes.is_empty() {
            return Err(UploadRejection::Empty);
        }
        check_size(self.size())
    }
}

/// Accepts any `image/*` media type, parameters included.
pub fn check_content_type(content_type: &str) -> Result<(), UploadRejection> {
    match content_type.parse::<Mime>() {
        Ok(mime) if mime.type_() == mime::IMAGE => Ok(()),
        _ => Err(UploadRejection::InvalidType),
    }
}

pub fn check_size(size: usize) -> Result<(), UploadRejection> {
    if size > MAX_UPLOAD_SIZE_BYTES {
        Err(UploadRejection::TooLarge)
    } else {
        Ok(())
    }
}
