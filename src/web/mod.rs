// Web server for the relay
// Handles the background removal endpoint and the static entry page

mod app;
mod error;
mod extract_request_data;
mod handlers;
mod listeners;
mod models;

pub use app::create_app;
pub use listeners::{WILDCARD_HOST, create_listener};
pub use models::ErrorBody;

use crate::{provider::ProviderClient, upload::MAX_UPLOAD_SIZE_BYTES};
use std::sync::Arc;

pub const REMOVE_BACKGROUND_PATH: &str = "/api/remove-background";

// Room for multipart boundaries and small text fields on top of the image itself
pub const MAX_REQUEST_BODY_BYTES: usize = MAX_UPLOAD_SIZE_BYTES + 64 * 1024;

pub type SharedProvider = Arc<ProviderClient>;
