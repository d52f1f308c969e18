use std::path::PathBuf;

use serde::Deserialize;

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;
pub const DEFAULT_CLOUDINARY_API_BASE: &str = "https://api.cloudinary.com/v1_1";

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
}

/// Credentials for unsigned uploads to the hosted media API.
#[derive(Debug, Clone, Deserialize)]
pub struct CloudinaryConfig {
    pub cloud_name: String,
    pub upload_preset: String,
    pub api_base: String,
}

impl CloudinaryConfig {
    /// Reads `CLOUDINARY_*`; `None` when cloud name or preset is unset or blank.
    pub fn from_env() -> Option<Self> {
        let cloud_name = non_empty_var("CLOUDINARY_CLOUD_NAME")?;
        let upload_preset = non_empty_var("CLOUDINARY_UPLOAD_PRESET")?;
        let api_base = non_empty_var("CLOUDINARY_API_BASE")
            .unwrap_or_else(|| DEFAULT_CLOUDINARY_API_BASE.into());
        Some(Self {
            cloud_name,
            upload_preset,
            api_base,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum StorageConfig {
    Local {
        media_dir: PathBuf,
        public_base_url: String,
    },
    Cloudinary(CloudinaryConfig),
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub jwt: JwtConfig,
    pub storage: StorageConfig,
    pub max_upload_bytes: usize,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://database.sqlite?mode=rwc".into());
        let host = std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let port = parse_var("PORT").unwrap_or(DEFAULT_PORT);

        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET")
                .map_err(|_| anyhow::anyhow!("JWT_SECRET must be set"))?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "mediashelf".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "mediashelf-app".into()),
            ttl_minutes: parse_var("JWT_TTL_MINUTES").unwrap_or(60),
        };

        let backend = std::env::var("STORAGE_BACKEND").unwrap_or_else(|_| "local".into());
        let storage = match backend.as_str() {
            "local" => StorageConfig::Local {
                media_dir: std::env::var("MEDIA_DIR")
                    .unwrap_or_else(|_| "./uploads".into())
                    .into(),
                public_base_url: std::env::var("PUBLIC_BASE_URL")
                    .unwrap_or_else(|_| format!("http://localhost:{}", port)),
            },
            "cloudinary" => StorageConfig::Cloudinary(CloudinaryConfig::from_env().ok_or_else(
                || {
                    anyhow::anyhow!(
                        "STORAGE_BACKEND=cloudinary requires CLOUDINARY_CLOUD_NAME and CLOUDINARY_UPLOAD_PRESET"
                    )
                },
            )?),
            other => anyhow::bail!("unknown STORAGE_BACKEND {:?}", other),
        };

        let max_upload_bytes = parse_var("MAX_UPLOAD_BYTES").unwrap_or(DEFAULT_MAX_UPLOAD_BYTES);

        Ok(Self {
            database_url,
            host,
            port,
            jwt,
            storage,
            max_upload_bytes,
        })
    }
}

pub(crate) fn parse_var<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse::<T>().ok())
}

pub(crate) fn non_empty_var(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
