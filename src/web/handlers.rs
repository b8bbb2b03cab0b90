// API handlers for the relay

use super::{
    SharedProvider,
    error::ApiError,
    extract_request_data::extract_upload,
    models::PROCESSED_FILENAME,
};
use crate::headers::Attachment;
use axum::{
    extract::{Multipart, State, multipart::MultipartRejection},
    response::{IntoResponse, Response},
};
use axum_extra::TypedHeader;
use headers::ContentType;
use tracing::{info, warn};
use uuid::Uuid;

// --- POST /api/remove-background ---
// Forwards the uploaded image to the provider and returns the processed PNG
pub async fn remove_background(
    State(provider): State<SharedProvider>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, ApiError> {
    // No point reading the upload if it can never be forwarded
    provider.ensure_configured()?;
    let multipart = multipart.map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;

    let request_id = Uuid::new_v4();
    let upload = extract_upload(multipart).await?;
    info!(
        "Remove background request: request_id={}, filename={}, content_type={}, size={}",
        request_id,
        upload.filename,
        upload.content_type,
        upload.size()
    );

    let image = provider.remove_background(&upload).await.inspect_err(|err| {
        warn!("Provider call failed: request_id={}, error={}", request_id, err);
    })?;

    info!(
        "Remove background completed: request_id={}, output_size={}",
        request_id,
        image.len()
    );

    Ok((
        TypedHeader(ContentType::png()),
        TypedHeader(Attachment::new(PROCESSED_FILENAME)),
        image,
    )
        .into_response())
}

// Any other method on the relay route
pub async fn method_not_allowed() -> ApiError {
    ApiError::MethodNotAllowed
}
