use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::Context;
use async_trait::async_trait;
use bytes::Bytes;

use crate::{
    cloudinary::CloudinaryClient,
    config::{CloudinaryConfig, StorageConfig},
};

/// Where the bytes ended up, plus whatever metadata the backend learned.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredObject {
    pub public_id: String,
    pub secure_url: String,
    pub format: Option<String>,
    pub bytes: u64,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub duration: Option<f64>,
}

#[async_trait]
pub trait StorageClient: Send + Sync {
    /// Store `body` under `key`. `key` carries no directory components.
    async fn put_object(
        &self,
        key: &str,
        body: Bytes,
        content_type: &str,
    ) -> anyhow::Result<StoredObject>;

    /// Remove an object written by `put_object`. Backends that cannot
    /// delete report an error and leave the object in place.
    async fn delete_object(&self, key: &str) -> anyhow::Result<()> {
        anyhow::bail!("storage backend cannot delete {}", key)
    }
}

pub async fn from_config(
    config: &StorageConfig,
    http: reqwest::Client,
) -> anyhow::Result<Arc<dyn StorageClient>> {
    let storage = match config {
        StorageConfig::Local {
            media_dir,
            public_base_url,
        } => Arc::new(LocalStorage::new(media_dir, public_base_url).await?) as Arc<dyn StorageClient>,
        StorageConfig::Cloudinary(cfg) => {
            Arc::new(CloudinaryStorage::new(http, cfg.clone())) as Arc<dyn StorageClient>
        }
    };
    Ok(storage)
}

/// Files on local disk, served back under `/media`.
#[derive(Clone)]
pub struct LocalStorage {
    root: PathBuf,
    public_base_url: String,
}

impl LocalStorage {
    pub async fn new(root: impl AsRef<Path>, public_base_url: &str) -> anyhow::Result<Self> {
        let root = root.as_ref().to_path_buf();
        tokio::fs::create_dir_all(&root)
            .await
            .with_context(|| format!("create media dir {}", root.display()))?;
        Ok(Self {
            root,
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> anyhow::Result<PathBuf> {
        anyhow::ensure!(
            !key.is_empty() && !key.contains(['/', '\\']) && key != "." && key != "..",
            "invalid storage key {:?}",
            key
        );
        Ok(self.root.join(key))
    }
}

#[async_trait]
impl StorageClient for LocalStorage {
    async fn put_object(
        &self,
        key: &str,
        body: Bytes,
        _content_type: &str,
    ) -> anyhow::Result<StoredObject> {
        let path = self.path_for(key)?;
        tokio::fs::write(&path, &body)
            .await
            .with_context(|| format!("write {}", path.display()))?;

        let (stem, ext) = match key.rsplit_once('.') {
            Some((s, e)) => (s, Some(e)),
            None => (key, None),
        };
        Ok(StoredObject {
            public_id: stem.to_string(),
            secure_url: format!("{}/media/{}", self.public_base_url, key),
            format: ext.map(str::to_string),
            bytes: body.len() as u64,
            width: None,
            height: None,
            duration: None,
        })
    }

    async fn delete_object(&self, key: &str) -> anyhow::Result<()> {
        let path = self.path_for(key)?;
        tokio::fs::remove_file(&path)
            .await
            .with_context(|| format!("remove {}", path.display()))
    }
}

/// Server-side unsigned upload to the hosted media API.
#[derive(Clone)]
pub struct CloudinaryStorage {
    client: CloudinaryClient,
}

impl CloudinaryStorage {
    pub fn new(http: reqwest::Client, config: CloudinaryConfig) -> Self {
        Self {
            client: CloudinaryClient::with_client(http, config),
        }
    }
}

#[async_trait]
impl StorageClient for CloudinaryStorage {
    async fn put_object(
        &self,
        key: &str,
        body: Bytes,
        content_type: &str,
    ) -> anyhow::Result<StoredObject> {
        let size = body.len();
        let uploaded = self
            .client
            .upload(body, content_type, key, "auto")
            .await
            .with_context(|| format!("cloudinary upload {}", key))?;
        let resource = uploaded
            .into_resource(key, content_type, size)
            .context("cloudinary response")?;
        Ok(StoredObject {
            public_id: resource.public_id,
            secure_url: resource.secure_url,
            format: Some(resource.format),
            bytes: resource.bytes,
            width: resource.width,
            height: resource.height,
            duration: resource.duration,
        })
    }
}
