// Wire-level response bodies for the relay endpoint

use serde::{Deserialize, Serialize};

/// Filename the processed image is offered under.
pub const PROCESSED_FILENAME: &str = "background-removed.png";

/// Uniform error envelope, shared with the upload client.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ErrorBody {
    pub error: String,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
