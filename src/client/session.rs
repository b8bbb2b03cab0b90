// Upload flow for one user: select, submit, preview, download, reset.
//
// State transitions:
//   Idle -> FileSelected -> Submitting -> ImageReady | Errored
//   ImageReady | Errored -> FileSelected (new selection) | Idle (reset)

use super::{
    history::History,
    relay_client::{ClientError, RelayClient},
};
use crate::upload::{ImageUpload, UploadRejection};
use bytes::Bytes;
use std::{
    path::{Path, PathBuf},
    time::{SystemTime, UNIX_EPOCH},
};
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    FileSelected,
    Submitting,
    ImageReady,
    Errored,
}

/// A processed image held in memory; `id` plays the role of a local object URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessedImage {
    pub id: Uuid,
    pub bytes: Bytes,
}

impl ProcessedImage {
    pub fn new(bytes: Bytes) -> Self {
        Self {
            id: Uuid::new_v4(),
            bytes,
        }
    }
}

/// Messages shown inline to the user.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Please select a valid image file.")]
    InvalidFileType,
    #[error("File size must be less than 12MB.")]
    FileTooLarge,
    #[error("Please select a non-empty image file.")]
    EmptyFile,
    #[error("Please select an image first.")]
    NoFileSelected,
    #[error("An image is already being processed.")]
    Busy,
    #[error("No submission in flight.")]
    NotSubmitting,
    #[error("No processed image available for download.")]
    NothingToDownload,
    #[error("No history entry at position {0}.")]
    NoSuchHistoryEntry(usize),
    #[error(transparent)]
    Submit(#[from] ClientError),
    #[error("Failed to save image: {0}")]
    Save(#[from] std::io::Error),
}

impl From<UploadRejection> for SessionError {
    fn from(rejection: UploadRejection) -> Self {
        match rejection {
            UploadRejection::InvalidType => Self::InvalidFileType,
            UploadRejection::TooLarge => Self::FileTooLarge,
            UploadRejection::Empty => Self::EmptyFile,
        }
    }
}

#[derive(Debug)]
pub struct UploadSession {
    state: SessionState,
    selected: Option<ImageUpload>,
    processed: Option<ProcessedImage>,
    error: Option<String>,
    history: History<ProcessedImage>,
}

impl Default for UploadSession {
    fn default() -> Self {
        Self::new()
    }
}

impl UploadSession {
    pub fn new() -> Self {
        Self {
            state: SessionState::Idle,
            selected: None,
            processed: None,
            error: None,
            history: History::default(),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn selected(&self) -> Option<&ImageUpload> {
        self.selected.as_ref()
    }

    /// The image currently on display, if any.
    pub fn processed(&self) -> Option<&ProcessedImage> {
        self.processed.as_ref()
    }

    /// The inline error message, if one is showing.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn history(&self) -> &History<ProcessedImage> {
        &self.history
    }

    pub fn is_loading(&self) -> bool {
        self.state == SessionState::Submitting
    }

    pub fn upload_enabled(&self) -> bool {
        !self.is_loading()
    }

    pub fn submit_enabled(&self) -> bool {
        !self.is_loading() && self.selected.is_some()
    }

    /// Validates and selects a file. A rejected file leaves the session as it was,
    /// apart from the error message.
    pub fn select_file(&mut self, upload: ImageUpload) -> Result<(), SessionError> {
        if self.is_loading() {
            return Err(self.record(SessionError::Busy));
        }
        if let Err(rejection) = upload.validate() {
            return Err(self.record(rejection.into()));
        }

        debug!("Selected {} ({} bytes)", upload.filename, upload.size());
        self.selected = Some(upload);
        self.processed = None;
        self.error = None;
        self.state = SessionState::FileSelected;
        Ok(())
    }

    /// Marks the selected file as in flight and hands back what to send.
    pub fn begin_submit(&mut self) -> Result<ImageUpload, SessionError> {
        if self.is_loading() {
            return Err(self.record(SessionError::Busy));
        }
        let Some(upload) = self.selected.clone() else {
            return Err(self.record(SessionError::NoFileSelected));
        };

        self.error = None;
        self.state = SessionState::Submitting;
        Ok(upload)
    }

    /// Applies the relay's answer to the in-flight submission.
    pub fn finish_submit(
        &mut self,
        result: Result<Bytes, ClientError>,
    ) -> Result<ProcessedImage, SessionError> {
        if !self.is_loading() {
            // Reset while the request was in flight; the late answer is dropped
            return Err(SessionError::NotSubmitting);
        }

        match result {
            Ok(bytes) => {
                let image = ProcessedImage::new(bytes);
                self.history.push(image.clone());
                self.processed = Some(image.clone());
                self.error = None;
                self.state = SessionState::ImageReady;
                Ok(image)
            }
            Err(err) => {
                self.processed = None;
                self.state = SessionState::Errored;
                Err(self.record(err.into()))
            }
        }
    }

    /// Submits the selected file through `client` and waits for the result.
    pub async fn process(&mut self, client: &RelayClient) -> Result<ProcessedImage, SessionError> {
        let upload = self.begin_submit()?;
        info!("Submitting {} to {}", upload.filename, client.endpoint());

        let result = client.remove_background(&upload).await;
        if let Err(err) = &result {
            warn!("Background removal failed for {}: {}", upload.filename, err);
        }
        self.finish_submit(result)
    }

    /// Shows a previous result again.
    pub fn show_from_history(&mut self, index: usize) -> Result<&ProcessedImage, SessionError> {
        if self.is_loading() {
            return Err(self.record(SessionError::Busy));
        }
        let Some(image) = self.history.get(index).cloned() else {
            return Err(self.record(SessionError::NoSuchHistoryEntry(index)));
        };

        self.error = None;
        self.state = SessionState::ImageReady;
        Ok(&*self.processed.insert(image))
    }

    /// Saves the displayed image into `dir` under a timestamped name.
    pub async fn download(&mut self, dir: &Path) -> Result<PathBuf, SessionError> {
        let Some(bytes) = self.processed.as_ref().map(|image| image.bytes.clone()) else {
            return Err(self.record(SessionError::NothingToDownload));
        };

        let path = dir.join(download_filename(SystemTime::now()));
        if let Err(err) = tokio::fs::write(&path, &bytes).await {
            return Err(self.record(err.into()));
        }
        info!("Saved {} bytes to {}", bytes.len(), path.display());
        Ok(path)
    }

    /// Back to the initial empty state. History is kept.
    pub fn reset(&mut self) {
        self.state = SessionState::Idle;
        self.selected = None;
        self.processed = None;
        self.error = None;
    }

    fn record(&mut self, err: SessionError) -> SessionError {
        self.error = Some(err.to_string());
        err
    }
}

/// `background-removed-<unix millis>.png`
pub fn download_filename(now: SystemTime) -> String {
    let millis = now
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();
    format!("background-removed-{}.png", millis)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::upload::MAX_UPLOAD_SIZE_BYTES;
    use std::time::Duration;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::method,
    };

    fn png(name: &str) -> ImageUpload {
        ImageUpload::new(name, "image/png", &b"png-bytes"[..])
    }

    fn relay_failure(message: &str) -> ClientError {
        ClientError::Relay {
            status: 400,
            message: message.to_string(),
        }
    }

    fn submit_ok(session: &mut UploadSession, body: &'static [u8]) -> ProcessedImage {
        session.begin_submit().unwrap();
        session.finish_submit(Ok(Bytes::from_static(body))).unwrap()
    }

    #[test]
    fn test_starts_idle() {
        let session = UploadSession::new();

        assert_eq!(session.state(), SessionState::Idle);
        assert!(session.upload_enabled());
        assert!(!session.submit_enabled());
        assert!(session.history().is_empty());
    }

    #[test]
    fn test_select_valid_file() {
        let mut session = UploadSession::new();
        session.select_file(png("a.png")).unwrap();

        assert_eq!(session.state(), SessionState::FileSelected);
        assert!(session.submit_enabled());
        assert_eq!(session.error(), None);
    }

    #[test]
    fn test_select_rejects_non_image_and_keeps_state() {
        let mut session = UploadSession::new();
        let err = session
            .select_file(ImageUpload::new("a.txt", "text/plain", &b"hi"[..]))
            .unwrap_err();

        assert!(matches!(err, SessionError::InvalidFileType));
        assert_eq!(session.state(), SessionState::Idle);
        assert_eq!(session.error(), Some("Please select a valid image file."));
        assert!(session.selected().is_none());
    }

    #[test]
    fn test_select_rejects_oversized_file() {
        let mut session = UploadSession::new();
        session.select_file(png("ok.png")).unwrap();

        let big = ImageUpload::new("big.png", "image/png", vec![0u8; MAX_UPLOAD_SIZE_BYTES + 1]);
        assert!(matches!(
            session.select_file(big),
            Err(SessionError::FileTooLarge)
        ));
        assert_eq!(session.error(), Some("File size must be less than 12MB."));
        assert_eq!(session.selected().unwrap().filename, "ok.png");
    }

    #[test]
    fn test_submit_without_file() {
        let mut session = UploadSession::new();

        assert!(matches!(
            session.begin_submit(),
            Err(SessionError::NoFileSelected)
        ));
        assert_eq!(session.error(), Some("Please select an image first."));
    }

    #[test]
    fn test_submitting_disables_controls() {
        let mut session = UploadSession::new();
        session.select_file(png("a.png")).unwrap();
        session.begin_submit().unwrap();

        assert!(session.is_loading());
        assert!(!session.submit_enabled());
        assert!(!session.upload_enabled());
        assert!(matches!(session.begin_submit(), Err(SessionError::Busy)));
        assert!(matches!(
            session.select_file(png("b.png")),
            Err(SessionError::Busy)
        ));
    }

    #[test]
    fn test_success_displays_image_and_records_history() {
        let mut session = UploadSession::new();
        session.select_file(png("a.png")).unwrap();
        let image = submit_ok(&mut session, b"out");

        assert_eq!(session.state(), SessionState::ImageReady);
        assert_eq!(session.processed(), Some(&image));
        assert_eq!(session.history().latest(), Some(&image));
        assert!(session.submit_enabled());
    }

    #[test]
    fn test_failure_shows_message_and_reenables_submit() {
        let mut session = UploadSession::new();
        session.select_file(png("a.png")).unwrap();
        session.begin_submit().unwrap();
        let err = session
            .finish_submit(Err(relay_failure("Remove.bg API error: 403 - invalid key")))
            .unwrap_err();

        assert!(matches!(err, SessionError::Submit(_)));
        assert_eq!(session.state(), SessionState::Errored);
        assert_eq!(session.error(), Some("Remove.bg API error: 403 - invalid key"));
        assert!(session.processed().is_none());
        assert!(session.submit_enabled());
        assert!(session.history().is_empty());
    }

    #[test]
    fn test_history_keeps_three_most_recent() {
        let mut session = UploadSession::new();
        session.select_file(png("a.png")).unwrap();

        let results: Vec<_> = [b"1", b"2", b"3", b"4"]
            .into_iter()
            .map(|body| submit_ok(&mut session, body))
            .collect();

        assert_eq!(session.history().len(), 3);
        assert_eq!(session.history().get(0), Some(&results[3]));
        assert!(!session.history().iter().any(|image| image == &results[0]));
    }

    #[test]
    fn test_reset_clears_display_but_keeps_history() {
        let mut session = UploadSession::new();
        session.select_file(png("a.png")).unwrap();
        let image = submit_ok(&mut session, b"out");

        session.reset();

        assert_eq!(session.state(), SessionState::Idle);
        assert!(session.processed().is_none());
        assert!(session.selected().is_none());
        assert_eq!(session.error(), None);
        assert!(session.upload_enabled());
        assert_eq!(session.history().latest(), Some(&image));
    }

    #[test]
    fn test_reset_during_submit_drops_late_answer() {
        let mut session = UploadSession::new();
        session.select_file(png("a.png")).unwrap();
        session.begin_submit().unwrap();

        session.reset();
        assert!(session.upload_enabled());

        assert!(matches!(
            session.finish_submit(Ok(Bytes::from_static(b"late"))),
            Err(SessionError::NotSubmitting)
        ));
        assert_eq!(session.state(), SessionState::Idle);
        assert!(session.history().is_empty());
    }

    #[test]
    fn test_new_selection_after_result_returns_to_file_selected() {
        let mut session = UploadSession::new();
        session.select_file(png("a.png")).unwrap();
        submit_ok(&mut session, b"out");

        session.select_file(png("b.png")).unwrap();

        assert_eq!(session.state(), SessionState::FileSelected);
        assert!(session.processed().is_none());
        assert_eq!(session.history().len(), 1);
    }

    #[test]
    fn test_show_from_history() {
        let mut session = UploadSession::new();
        session.select_file(png("a.png")).unwrap();
        let first = submit_ok(&mut session, b"1");
        submit_ok(&mut session, b"2");

        let shown = session.show_from_history(1).unwrap().clone();

        assert_eq!(shown, first);
        assert_eq!(session.processed(), Some(&first));
        assert!(matches!(
            session.show_from_history(5),
            Err(SessionError::NoSuchHistoryEntry(5))
        ));
    }

    #[test]
    fn test_download_filename_is_timestamped() {
        let now = UNIX_EPOCH + Duration::from_millis(1_700_000_000_123);
        assert_eq!(
            download_filename(now),
            "background-removed-1700000000123.png"
        );
    }

    #[tokio::test]
    async fn test_download_writes_displayed_image() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = UploadSession::new();
        session.select_file(png("a.png")).unwrap();
        submit_ok(&mut session, b"processed-bytes");

        let path = session.download(dir.path()).await.unwrap();

        assert!(
            path.file_name()
                .unwrap()
                .to_str()
                .unwrap()
                .starts_with("background-removed-")
        );
        assert_eq!(std::fs::read(&path).unwrap(), b"processed-bytes");
    }

    #[tokio::test]
    async fn test_download_without_image() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = UploadSession::new();

        assert!(matches!(
            session.download(dir.path()).await,
            Err(SessionError::NothingToDownload)
        ));
        assert_eq!(
            session.error(),
            Some("No processed image available for download.")
        );
    }

    #[tokio::test]
    async fn test_process_against_relay() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"relayed".to_vec()))
            .expect(4)
            .mount(&server)
            .await;
        let client = RelayClient::new(&server.uri());

        let mut session = UploadSession::new();
        session.select_file(png("a.png")).unwrap();
        let mut results = Vec::new();
        for _ in 0..4 {
            results.push(session.process(&client).await.unwrap());
        }

        assert_eq!(session.state(), SessionState::ImageReady);
        assert_eq!(&session.processed().unwrap().bytes[..], b"relayed");
        assert_eq!(session.history().len(), 3);
        assert_eq!(session.history().get(0), Some(&results[3]));
        assert!(!session.history().iter().any(|image| image.id == results[0].id));
    }

    #[tokio::test]
    async fn test_process_network_failure_is_reported_inline() {
        let client = RelayClient::new("http://127.0.0.1:1");
        let mut session = UploadSession::new();
        session.select_file(png("a.png")).unwrap();

        let err = session.process(&client).await.unwrap_err();

        assert!(matches!(err, SessionError::Submit(ClientError::Network(_))));
        assert_eq!(session.state(), SessionState::Errored);
        assert!(session.error().unwrap().starts_with("Failed to reach the relay"));
        assert!(session.submit_enabled());
    }
}
