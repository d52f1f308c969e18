use anyhow::Context;
use sqlx::{Sqlite, SqlitePool, Transaction};
use time::OffsetDateTime;

use crate::media::repo_types::{MediaRow, NewMedia};

/// Insert a media reference within a transaction.
pub async fn insert_media_tx(
    tx: &mut Transaction<'_, Sqlite>,
    media: &NewMedia,
) -> anyhow::Result<MediaRow> {
    sqlx::query_as::<_, MediaRow>(
        r#"
        INSERT INTO media
            (public_id, secure_url, resource_type, format, bytes,
             width, height, duration, owner_id, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
        RETURNING id, public_id, secure_url, resource_type, format, bytes,
                  width, height, duration, owner_id, created_at
        "#,
    )
    .bind(&media.public_id)
    .bind(&media.secure_url)
    .bind(media.resource_type.as_str())
    .bind(&media.format)
    .bind(media.bytes as i64)
    .bind(media.width.map(i64::from))
    .bind(media.height.map(i64::from))
    .bind(media.duration)
    .bind(media.owner_id) // NULL for anonymous uploads
    .bind(OffsetDateTime::now_utc())
    .fetch_one(&mut **tx)
    .await
    .with_context(|| format!("insert media {}", media.public_id))
}

/// Every stored reference, newest first.
pub async fn list_all(db: &SqlitePool) -> anyhow::Result<Vec<MediaRow>> {
    let rows = sqlx::query_as::<_, MediaRow>(
        r#"
        SELECT id, public_id, secure_url, resource_type, format, bytes,
               width, height, duration, owner_id, created_at
          FROM media
         ORDER BY created_at DESC, id DESC
        "#,
    )
    .fetch_all(db)
    .await
    .context("list media")?;

    Ok(rows)
}
