use axum::{
    extract::{
        Multipart,
        multipart::{Field, MultipartError},
    },
    http::StatusCode,
};
use tracing::debug;

use super::error::ApiError;
use crate::upload::{self, ImageUpload, UPLOAD_FIELD_NAME};

// Fallback name when the client sends the part without a filename
const DEFAULT_FILENAME: &str = "upload.png";

/// Pulls the single `image` field out of a multipart upload.
///
/// The content type is checked before any bytes are read, and the field is
/// abandoned as soon as it grows past the upload limit.
pub async fn extract_upload(mut multipart: Multipart) -> Result<ImageUpload, ApiError> {
    let mut upload_opt: Option<ImageUpload> = None;
    let mut ignored_fields = 0;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(UPLOAD_FIELD_NAME) {
            let field_name = field.name().unwrap_or("unnamed").to_string();
            debug!("Ignoring multipart field: {}", field_name);
            ignored_fields += 1;
            continue;
        }

        if upload_opt.is_some() {
            return Err(ApiError::BadRequest(
                "Unexpected field: only one image file is accepted".to_string(),
            ));
        }

        upload_opt = Some(read_image_field(field).await?);
    }

    if ignored_fields > 0 {
        debug!(
            "Ignored {} non-image fields in multipart request",
            ignored_fields
        );
    }

    let upload = upload_opt
        .ok_or_else(|| ApiError::BadRequest("No image file provided".to_string()))?;
    upload.validate()?;
    Ok(upload)
}

async fn read_image_field(mut field: Field<'_>) -> Result<ImageUpload, ApiError> {
    let content_type = field.content_type().unwrap_or_default().to_string();
    upload::check_content_type(&content_type)?;

    let filename = field
        .file_name()
        .filter(|name| !name.is_empty())
        .unwrap_or(DEFAULT_FILENAME)
        .to_string();
    debug!(
        "Receiving image '{}' with content type: {}",
        filename, content_type
    );

    let mut data = Vec::new();
    while let Some(chunk) = field.chunk().await.map_err(multipart_error)? {
        upload::check_size(data.len() + chunk.len())?;
        data.extend_from_slice(&chunk);
    }

    Ok(ImageUpload::new(filename, content_type, data))
}

// A body cut off by the router's size limit is reported like any other oversized upload
fn multipart_error(err: MultipartError) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::FileTooLarge
    } else {
        ApiError::BadRequest(format!("Failed to process multipart request: {}", err))
    }
}
