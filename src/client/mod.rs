//! Client-side core of the mobile app: the auth exchange, the session,
//! uploads and the media library. No UI lives here.

pub mod api;
pub mod error;
pub mod library;
pub mod session;
pub mod upload;

use std::time::Duration;

use crate::config::{non_empty_var, parse_var, CloudinaryConfig, DEFAULT_MAX_UPLOAD_BYTES, DEFAULT_PORT};

pub use api::{ApiClient, AuthOutcome};
pub use error::ClientError;
pub use session::{Session, UserSummary};
pub use upload::{MediaAsset, Uploader};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadTargetKind {
    Cloudinary,
    Server,
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub api_base_url: String,
    pub upload_target: UploadTargetKind,
    pub cloudinary: Option<CloudinaryConfig>,
    pub max_upload_bytes: usize,
    pub request_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: format!("http://localhost:{}", DEFAULT_PORT),
            upload_target: UploadTargetKind::Cloudinary,
            cloudinary: None,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl ClientConfig {
    pub fn from_env() -> Result<Self, ClientError> {
        let defaults = Self::default();
        let upload_target = match non_empty_var("UPLOAD_TARGET").as_deref() {
            None | Some("cloudinary") => UploadTargetKind::Cloudinary,
            Some("server") => UploadTargetKind::Server,
            Some(other) => {
                return Err(ClientError::Config(format!("unknown UPLOAD_TARGET {:?}", other)))
            }
        };
        Ok(Self {
            api_base_url: non_empty_var("API_BASE_URL").unwrap_or(defaults.api_base_url),
            upload_target,
            cloudinary: CloudinaryConfig::from_env(),
            max_upload_bytes: parse_var("MAX_UPLOAD_BYTES").unwrap_or(defaults.max_upload_bytes),
            request_timeout: parse_var::<u64>("REQUEST_TIMEOUT_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.request_timeout),
        })
    }

    /// Shared HTTP client; every request it sends is bounded by `request_timeout`.
    pub fn http_client(&self) -> Result<reqwest::Client, ClientError> {
        reqwest::Client::builder()
            .timeout(self.request_timeout)
            .build()
            .map_err(|e| ClientError::Config(format!("http client: {}", e)))
    }

    pub fn api(&self) -> Result<ApiClient, ClientError> {
        Ok(ApiClient::new(self.http_client()?, &self.api_base_url))
    }

    /// Uploader for the configured target; a Cloudinary target without
    /// credentials is a `Config` error.
    pub fn uploader(&self) -> Result<Uploader, ClientError> {
        match self.upload_target {
            UploadTargetKind::Cloudinary => Uploader::cloudinary(
                self.api()?,
                self.cloudinary.clone(),
                self.max_upload_bytes,
            ),
            UploadTargetKind::Server => Ok(Uploader::server(self.api()?, self.max_upload_bytes)),
        }
    }
}
