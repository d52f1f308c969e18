use anyhow::Context;
use bytes::Bytes;
use tracing::{info, warn};
use uuid::Uuid;

use super::{
    dto::{is_web_url, MediaResource, RegisterMediaRequest, ResourceType},
    repo,
    repo_types::NewMedia,
};
use crate::{
    error::{is_unique_violation, AppError, AppResult},
    state::AppState,
};

/// One accepted multipart part, already size- and type-checked.
pub struct UploadItem {
    pub body: Bytes,
    pub content_type: String,
    pub resource_type: ResourceType,
    pub file_name: Option<String>,
}

/// Push every item to storage, then record all references in one transaction.
/// Objects already written are removed again when a later step fails.
pub async fn store_uploads(
    st: &AppState,
    owner_id: Option<i64>,
    items: Vec<UploadItem>,
) -> anyhow::Result<Vec<MediaResource>> {
    anyhow::ensure!(!items.is_empty(), "no media provided");

    let mut keys = Vec::with_capacity(items.len());
    let outcome = match put_all(st, owner_id, items, &mut keys).await {
        Ok(pending) => insert_all(st, &pending).await,
        Err(e) => Err(e),
    };

    match outcome {
        Ok(out) => {
            info!(count = out.len(), ?owner_id, "media stored");
            Ok(out)
        }
        Err(e) => {
            discard(st, &keys).await;
            Err(e)
        }
    }
}

async fn put_all(
    st: &AppState,
    owner_id: Option<i64>,
    items: Vec<UploadItem>,
    keys: &mut Vec<String>,
) -> anyhow::Result<Vec<NewMedia>> {
    let mut pending = Vec::with_capacity(items.len());
    for item in items {
        let ext = storage_ext(&item.content_type, item.file_name.as_deref());
        let key = format!("{}.{}", Uuid::new_v4().simple(), ext);
        let stored = st
            .storage
            .put_object(&key, item.body, &item.content_type)
            .await
            .with_context(|| format!("put_object {}", key))?;
        keys.push(key);

        pending.push(NewMedia {
            public_id: stored.public_id,
            secure_url: stored.secure_url,
            resource_type: item.resource_type,
            format: stored.format.unwrap_or_else(|| ext.to_string()),
            bytes: stored.bytes,
            width: stored.width,
            height: stored.height,
            duration: stored.duration,
            owner_id,
        });
    }
    Ok(pending)
}

async fn insert_all(st: &AppState, pending: &[NewMedia]) -> anyhow::Result<Vec<MediaResource>> {
    let mut tx = st.db.begin().await.context("begin tx")?;
    let mut out = Vec::with_capacity(pending.len());
    for media in pending {
        let row = repo::insert_media_tx(&mut tx, media).await?;
        out.push(MediaResource::try_from(row)?);
    }
    tx.commit().await.context("commit tx")?;
    Ok(out)
}

async fn discard(st: &AppState, keys: &[String]) {
    for key in keys {
        if let Err(e) = st.storage.delete_object(key).await {
            warn!(%key, error = %e, "orphaned object left in storage");
        }
    }
}

/// Record an asset the client already pushed to the hosted service.
pub async fn register_media(
    st: &AppState,
    owner_id: Option<i64>,
    req: RegisterMediaRequest,
) -> AppResult<MediaResource> {
    if req.public_id.trim().is_empty() || req.format.trim().is_empty() {
        return Err(AppError::Validation(
            "public_id and format are required".into(),
        ));
    }
    if !is_web_url(&req.secure_url) {
        return Err(AppError::Validation(format!(
            "secure_url is not a valid URL: {:?}",
            req.secure_url
        )));
    }

    let media = NewMedia {
        public_id: req.public_id.trim().to_string(),
        secure_url: req.secure_url,
        resource_type: req.resource_type,
        format: req.format,
        bytes: req.bytes,
        width: req.width,
        height: req.height,
        duration: req.duration,
        owner_id,
    };

    let mut tx = st.db.begin().await?;
    let row = match repo::insert_media_tx(&mut tx, &media).await {
        Ok(row) => row,
        Err(e) if e.downcast_ref::<sqlx::Error>().is_some_and(is_unique_violation) => {
            return Err(AppError::Conflict("Media already registered".into()));
        }
        Err(e) => return Err(e.into()),
    };
    tx.commit().await?;

    info!(public_id = %row.public_id, ?owner_id, "media registered");
    Ok(MediaResource::try_from(row)?)
}

pub async fn list_media(st: &AppState) -> anyhow::Result<Vec<MediaResource>> {
    repo::list_all(&st.db)
        .await?
        .into_iter()
        .map(MediaResource::try_from)
        .collect()
}

pub(crate) fn ext_from_mime(ct: &str) -> Option<&'static str> {
    match ct {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/webp" => Some("webp"),
        "image/heic" => Some("heic"),
        "image/gif" => Some("gif"),
        "video/mp4" => Some("mp4"),
        "video/quicktime" => Some("mov"),
        "video/webm" => Some("webm"),
        "video/x-matroska" => Some("mkv"),
        "video/3gpp" => Some("3gp"),
        _ => None,
    }
}

/// Known mime → extension, else the file name's extension if it is plain
/// alphanumeric, else `bin`.
fn storage_ext<'a>(content_type: &str, file_name: Option<&'a str>) -> std::borrow::Cow<'a, str> {
    if let Some(ext) = ext_from_mime(content_type) {
        return ext.into();
    }
    file_name
        .and_then(|n| n.rsplit_once('.'))
        .map(|(_, e)| e)
        .filter(|e| !e.is_empty() && e.len() <= 8 && e.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|e| e.to_ascii_lowercase().into())
        .unwrap_or_else(|| "bin".into())
}
