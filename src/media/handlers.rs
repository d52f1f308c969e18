use axum::{
    extract::{multipart::Field, multipart::MultipartRejection, DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use bytes::BytesMut;
use tracing::{instrument, warn};

use super::{
    dto::{MediaListResponse, RegisterMediaRequest, ResourceType, UploadResponse},
    services::{list_media, register_media, store_uploads, UploadItem},
};
use crate::{
    auth::extractors::MaybeAuthUser,
    error::{AppError, AppJson, AppResult},
    state::AppState,
};

/// Multipart parts per request.
pub const MAX_FILES_PER_REQUEST: usize = 10;

pub fn library_routes() -> Router<AppState> {
    Router::new().route("/api/media", get(list).post(register))
}

/// Body limit covers the per-file cap for every allowed part plus form overhead.
pub fn write_routes(max_upload_bytes: usize) -> Router<AppState> {
    let body_limit = max_upload_bytes
        .saturating_mul(MAX_FILES_PER_REQUEST)
        .saturating_add(1024 * 1024);
    Router::new()
        .route("/upload", post(upload))
        .layer(DefaultBodyLimit::max(body_limit))
}

#[instrument(skip(state))]
pub async fn list(State(state): State<AppState>) -> AppResult<Json<MediaListResponse>> {
    let resources = list_media(&state).await?;
    Ok(Json(MediaListResponse { resources }))
}

/// POST /api/media: record an asset already stored by the hosted service.
#[instrument(skip(state, payload), fields(public_id = %payload.public_id))]
pub async fn register(
    State(state): State<AppState>,
    MaybeAuthUser(owner_id): MaybeAuthUser,
    AppJson(payload): AppJson<RegisterMediaRequest>,
) -> AppResult<(StatusCode, Json<UploadResponse>)> {
    let resource = register_media(&state, owner_id, payload).await?;
    Ok((
        StatusCode::CREATED,
        Json(UploadResponse {
            success: true,
            message: "Media registered".into(),
            resources: vec![resource],
        }),
    ))
}

/// POST /upload (multipart). Every field named `media_*` is one asset.
#[instrument(skip(state, mp))]
pub async fn upload(
    State(state): State<AppState>,
    MaybeAuthUser(owner_id): MaybeAuthUser,
    mp: Result<Multipart, MultipartRejection>,
) -> AppResult<Json<UploadResponse>> {
    let mut mp = mp?;
    let limit = state.config.max_upload_bytes;
    let mut items = Vec::new();

    while let Some(field) = mp.next_field().await.map_err(|e| multipart_error(e, limit))? {
        let is_media = field.name().is_some_and(|n| n.starts_with("media_"));
        if !is_media {
            continue;
        }
        if items.len() == MAX_FILES_PER_REQUEST {
            return Err(AppError::Validation(format!(
                "At most {} files per upload",
                MAX_FILES_PER_REQUEST
            )));
        }
        items.push(read_media_field(field, limit).await?);
    }

    if items.is_empty() {
        return Err(AppError::Validation("No media files provided".into()));
    }

    let resources = store_uploads(&state, owner_id, items).await?;

    Ok(Json(UploadResponse {
        success: true,
        message: format!("Uploaded {} file(s)", resources.len()),
        resources,
    }))
}

/// Buffer one part, refusing it as soon as it grows past `limit`.
async fn read_media_field(mut field: Field<'_>, limit: usize) -> AppResult<UploadItem> {
    let content_type = field
        .content_type()
        .map(|s| s.to_ascii_lowercase())
        .unwrap_or_else(|| "application/octet-stream".into());
    let resource_type = ResourceType::from_mime(&content_type)
        .ok_or_else(|| AppError::UnsupportedMedia(content_type.clone()))?;
    let file_name = field.file_name().map(str::to_string);

    let mut buf = BytesMut::new();
    while let Some(chunk) = field.chunk().await.map_err(|e| multipart_error(e, limit))? {
        if buf.len() + chunk.len() > limit {
            warn!(limit, file_name = ?file_name, "upload over size limit");
            return Err(AppError::PayloadTooLarge { limit });
        }
        buf.extend_from_slice(&chunk);
    }
    if buf.is_empty() {
        return Err(AppError::Validation("Uploaded file is empty".into()));
    }

    Ok(UploadItem {
        body: buf.freeze(),
        content_type,
        resource_type,
        file_name,
    })
}

fn multipart_error(e: axum::extract::multipart::MultipartError, limit: usize) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge { limit }
    } else {
        AppError::Validation(format!("Malformed multipart body: {}", e.body_text()))
    }
}
