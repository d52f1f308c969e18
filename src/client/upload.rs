//! Single-asset uploads, either straight to Cloudinary or through the server.

use std::path::Path;

use bytes::Bytes;
use tracing::{info, instrument, warn};

use crate::client::api::ApiClient;
use crate::client::error::{error_message, ClientError};
use crate::cloudinary::{subtype, CloudinaryClient, CloudinaryError};
use crate::config::CloudinaryConfig;
use crate::media::dto::{MediaResource, ResourceType, UploadResponse};

pub const DEFAULT_MIME: &str = "video/mp4";

/// A picked asset: raw bytes plus whatever the picker reported.
#[derive(Debug, Clone)]
pub struct MediaAsset {
    pub bytes: Bytes,
    pub mime_type: Option<String>,
    pub file_name: Option<String>,
}

impl MediaAsset {
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        Self {
            bytes: bytes.into(),
            mime_type: None,
            file_name: None,
        }
    }

    pub fn with_mime(mut self, mime: &str) -> Self {
        self.mime_type = Some(mime.to_string());
        self
    }

    pub fn with_file_name(mut self, name: &str) -> Self {
        self.file_name = Some(name.to_string());
        self
    }

    pub fn mime(&self) -> &str {
        self.mime_type
            .as_deref()
            .filter(|m| !m.is_empty())
            .unwrap_or(DEFAULT_MIME)
    }

    /// Picker-supplied name, else `video.<subtype>`.
    pub fn file_name_or_default(&self) -> String {
        match self.file_name.as_deref().filter(|n| !n.is_empty()) {
            Some(n) => n.to_string(),
            None => format!("video.{}", subtype(self.mime()).unwrap_or("mp4")),
        }
    }
}

#[derive(Clone)]
pub enum UploadTarget {
    /// Direct upload, then registration with the server so it is listed.
    Cloudinary {
        client: CloudinaryClient,
        api: ApiClient,
    },
    Server(ApiClient),
}

#[derive(Clone)]
pub struct Uploader {
    target: UploadTarget,
    max_bytes: usize,
}

impl Uploader {
    pub fn cloudinary(
        api: ApiClient,
        config: Option<CloudinaryConfig>,
        max_bytes: usize,
    ) -> Result<Self, ClientError> {
        let config = config.ok_or_else(|| {
            ClientError::Config("set CLOUDINARY_CLOUD_NAME and CLOUDINARY_UPLOAD_PRESET".into())
        })?;
        let client = CloudinaryClient::with_client(api.http().clone(), config);
        Ok(Self {
            target: UploadTarget::Cloudinary { client, api },
            max_bytes,
        })
    }

    pub fn server(api: ApiClient, max_bytes: usize) -> Self {
        Self {
            target: UploadTarget::Server(api),
            max_bytes,
        }
    }

    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    /// Transfer one asset. Oversized assets are refused before any I/O;
    /// `token` attributes the upload on the server side.
    #[instrument(skip(self, asset, token), fields(size = asset.bytes.len()))]
    pub async fn upload(
        &self,
        asset: MediaAsset,
        token: Option<&str>,
    ) -> Result<MediaResource, ClientError> {
        let size = asset.bytes.len();
        if size == 0 {
            return Err(ClientError::Validation("asset is empty".into()));
        }
        if size > self.max_bytes {
            warn!(size, limit = self.max_bytes, "refusing oversized asset");
            return Err(ClientError::TooLarge {
                size,
                limit: self.max_bytes,
            });
        }

        let mime = asset.mime().to_string();
        let resource_type = ResourceType::from_mime(&mime)
            .ok_or_else(|| ClientError::Validation(format!("unsupported media type {}", mime)))?;
        let file_name = asset.file_name_or_default();

        let resource = match &self.target {
            UploadTarget::Cloudinary { client, api } => {
                let uploaded = client
                    .upload(asset.bytes, &mime, &file_name, resource_type.as_str())
                    .await
                    .map_err(from_cloudinary)?;
                let stem = Path::new(&file_name)
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .unwrap_or("upload");
                let hosted = uploaded
                    .into_resource(stem, &mime, size)
                    .map_err(from_cloudinary)?;
                api.register_media(&hosted, token).await?
            }
            UploadTarget::Server(api) => {
                upload_to_server(api, asset.bytes, &mime, &file_name, token).await?
            }
        };

        info!(public_id = %resource.public_id, url = %resource.secure_url, "asset uploaded");
        Ok(resource)
    }
}

async fn upload_to_server(
    api: &ApiClient,
    body: Bytes,
    mime: &str,
    file_name: &str,
    token: Option<&str>,
) -> Result<MediaResource, ClientError> {
    let part = reqwest::multipart::Part::bytes(body.to_vec())
        .file_name(file_name.to_string())
        .mime_str(mime)?;
    let form = reqwest::multipart::Form::new().part("media_0", part);

    let mut request = api
        .http()
        .post(format!("{}/upload", api.base_url()))
        .multipart(form);
    if let Some(t) = token {
        request = request.bearer_auth(t);
    }
    let response = request.send().await.map_err(from_transport)?;

    if !response.status().is_success() {
        let (status, message) = error_message(response).await;
        return Err(ClientError::Upload {
            status: status.as_u16(),
            message,
        });
    }

    let body = response
        .json::<UploadResponse>()
        .await
        .map_err(from_transport)?;
    body.resources
        .into_iter()
        .next()
        .ok_or_else(|| ClientError::Upload {
            status: 200,
            message: "server accepted the upload but returned no resource".into(),
        })
}

fn from_transport(e: reqwest::Error) -> ClientError {
    if e.is_timeout() {
        ClientError::Timeout
    } else {
        ClientError::Upload {
            status: e.status().map(|s| s.as_u16()).unwrap_or(0),
            message: e.to_string(),
        }
    }
}

fn from_cloudinary(e: CloudinaryError) -> ClientError {
    match e {
        CloudinaryError::Request(e) => from_transport(e),
        CloudinaryError::Rejected { status, message } => ClientError::Upload { status, message },
        bad @ (CloudinaryError::MissingUrl | CloudinaryError::InvalidUrl(_)) => ClientError::Upload {
            status: 200,
            message: bad.to_string(),
        },
    }
}
