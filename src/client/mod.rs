// Upload client: drives a relay the way the browser page does

mod history;
mod relay_client;
mod session;

pub use history::{HISTORY_CAPACITY, History};
pub use relay_client::{ClientError, RelayClient};
pub use session::{ProcessedImage, SessionError, SessionState, UploadSession, download_filename};
