//! Client for unsigned uploads to the Cloudinary upload API.
//!
//! Shared by the server's `CloudinaryStorage` backend and the client-side
//! uploader. An upload is a single multipart `POST` carrying `file` and
//! `upload_preset`; nothing is retried.

use bytes::Bytes;
use serde::Deserialize;
use time::{format_description::well_known::Rfc3339, OffsetDateTime};
use tracing::{debug, warn};

use crate::{
    config::CloudinaryConfig,
    media::dto::{is_web_url, MediaResource, ResourceType},
};

#[derive(Debug, thiserror::Error)]
pub enum CloudinaryError {
    /// Network, DNS, TLS or timeout failure.
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Non-2xx response.
    #[error("upload rejected ({status}): {message}")]
    Rejected { status: u16, message: String },

    /// 2xx response without a usable `secure_url`.
    #[error("upload response did not contain a secure_url")]
    MissingUrl,

    /// 2xx response whose `secure_url` does not parse as a web URL.
    #[error("upload response carried a malformed secure_url {0:?}")]
    InvalidUrl(String),
}

/// Fields of the upload response this crate cares about.
#[derive(Debug, Clone, Deserialize)]
pub struct CloudinaryUpload {
    #[serde(default)]
    pub public_id: Option<String>,
    #[serde(default)]
    pub secure_url: Option<String>,
    #[serde(default)]
    pub resource_type: Option<String>,
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub bytes: Option<u64>,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

#[derive(Clone)]
pub struct CloudinaryClient {
    client: reqwest::Client,
    config: CloudinaryConfig,
}

impl CloudinaryClient {
    pub fn with_client(client: reqwest::Client, config: CloudinaryConfig) -> Self {
        Self { client, config }
    }

    /// `{api_base}/{cloud_name}/{segment}/upload`
    pub fn endpoint(&self, segment: &str) -> String {
        format!(
            "{}/{}/{}/upload",
            self.config.api_base.trim_end_matches('/'),
            self.config.cloud_name,
            segment
        )
    }

    /// Upload one asset. `segment` is the resource-type path segment
    /// (`video`, `image` or `auto`).
    pub async fn upload(
        &self,
        body: Bytes,
        content_type: &str,
        file_name: &str,
        segment: &str,
    ) -> Result<CloudinaryUpload, CloudinaryError> {
        let size = body.len();
        let file = reqwest::multipart::Part::bytes(body.to_vec())
            .file_name(file_name.to_string())
            .mime_str(content_type)?;
        let form = reqwest::multipart::Form::new()
            .part("file", file)
            .text("upload_preset", self.config.upload_preset.clone());

        let url = self.endpoint(segment);
        debug!(%url, size, content_type, "cloudinary upload");
        let response = self.client.post(&url).multipart(form).send().await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorBody>(&text)
                .map(|b| b.error.message)
                .unwrap_or(text);
            warn!(status = status.as_u16(), %message, "cloudinary rejected upload");
            return Err(CloudinaryError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        let uploaded = response.json::<CloudinaryUpload>().await?;
        match uploaded.secure_url.as_deref() {
            None | Some("") => Err(CloudinaryError::MissingUrl),
            Some(u) if !is_web_url(u) => Err(CloudinaryError::InvalidUrl(u.to_string())),
            Some(_) => Ok(uploaded),
        }
    }
}

impl CloudinaryUpload {
    /// Fill gaps in the hosted response from what the uploader already knows.
    pub fn into_resource(
        self,
        fallback_id: &str,
        content_type: &str,
        size: usize,
    ) -> Result<MediaResource, CloudinaryError> {
        let secure_url = self.secure_url.ok_or(CloudinaryError::MissingUrl)?;
        let resource_type = self
            .resource_type
            .as_deref()
            .and_then(|t| t.parse::<ResourceType>().ok())
            .or_else(|| ResourceType::from_mime(content_type))
            .unwrap_or(ResourceType::Video);
        let format = self
            .format
            .unwrap_or_else(|| subtype(content_type).unwrap_or("bin").to_string());
        let created_at = self
            .created_at
            .as_deref()
            .and_then(|s| OffsetDateTime::parse(s, &Rfc3339).ok())
            .unwrap_or_else(OffsetDateTime::now_utc);

        Ok(MediaResource {
            public_id: self.public_id.unwrap_or_else(|| fallback_id.to_string()),
            secure_url,
            resource_type,
            format,
            bytes: self.bytes.unwrap_or(size as u64),
            width: self.width,
            height: self.height,
            duration: self.duration,
            created_at,
        })
    }
}

/// `video/mp4` → `mp4`
pub(crate) fn subtype(content_type: &str) -> Option<&str> {
    content_type
        .split('/')
        .nth(1)
        .map(|s| s.split(';').next().unwrap_or(s).trim())
        .filter(|s| !s.is_empty())
}
