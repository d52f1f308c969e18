use std::{sync::Arc, time::Duration};

use anyhow::Context;
use sqlx::SqlitePool;

use crate::config::{AppConfig, JwtConfig, StorageConfig};
use crate::storage::{self, StorageClient};

/// Timeout applied to outbound calls made by the server (hosted uploads).
const OUTBOUND_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub config: Arc<AppConfig>,
    pub storage: Arc<dyn StorageClient>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        let db = crate::db::connect(&config.database_url).await?;

        let http = reqwest::Client::builder()
            .timeout(OUTBOUND_TIMEOUT)
            .build()
            .context("build http client")?;
        let storage = storage::from_config(&config.storage, http).await?;

        Ok(Self {
            db,
            config,
            storage,
        })
    }

    pub fn from_parts(db: SqlitePool, config: Arc<AppConfig>, storage: Arc<dyn StorageClient>) -> Self {
        Self {
            db,
            config,
            storage,
        }
    }

    /// Migrated in-memory database plus a storage backend that only records sizes.
    pub async fn fake() -> Self {
        use crate::storage::StoredObject;
        use async_trait::async_trait;
        use bytes::Bytes;

        #[derive(Clone)]
        struct FakeStorage;
        #[async_trait]
        impl StorageClient for FakeStorage {
            async fn put_object(
                &self,
                key: &str,
                body: Bytes,
                _ct: &str,
            ) -> anyhow::Result<StoredObject> {
                let (stem, ext) = key.rsplit_once('.').unwrap_or((key, "bin"));
                Ok(StoredObject {
                    public_id: stem.to_string(),
                    secure_url: format!("https://fake.local/media/{}", key),
                    format: Some(ext.to_string()),
                    bytes: body.len() as u64,
                    width: None,
                    height: None,
                    duration: None,
                })
            }
        }

        let db = crate::db::connect_in_memory()
            .await
            .expect("in-memory sqlite");
        crate::db::migrate(&db).await.expect("migrations apply");

        let config = Arc::new(AppConfig {
            database_url: "sqlite::memory:".into(),
            host: "127.0.0.1".into(),
            port: 0,
            jwt: JwtConfig {
                secret: "test".into(),
                issuer: "test-issuer".into(),
                audience: "test-aud".into(),
                ttl_minutes: 5,
            },
            storage: StorageConfig::Local {
                media_dir: std::env::temp_dir().join("mediashelf-fake"),
                public_base_url: "https://fake.local".into(),
            },
            max_upload_bytes: 1024,
        });

        let storage = Arc::new(FakeStorage) as Arc<dyn StorageClient>;
        Self {
            db,
            config,
            storage,
        }
    }
}
