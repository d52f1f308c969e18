use sqlx::FromRow;
use time::OffsetDateTime;

use crate::media::dto::{MediaResource, ResourceType};

/// Row of the `media` table.
#[derive(Debug, Clone, FromRow)]
pub struct MediaRow {
    pub id: i64,
    pub public_id: String,
    pub secure_url: String,
    pub resource_type: String,
    pub format: String,
    pub bytes: i64,
    pub width: Option<i64>,
    pub height: Option<i64>,
    pub duration: Option<f64>,
    pub owner_id: Option<i64>, // uploader, when the request carried a valid token
    pub created_at: OffsetDateTime,
}

/// Values for a new row; id and timestamps are assigned on insert.
#[derive(Debug, Clone)]
pub struct NewMedia {
    pub public_id: String,
    pub secure_url: String,
    pub resource_type: ResourceType,
    pub format: String,
    pub bytes: u64,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub duration: Option<f64>,
    pub owner_id: Option<i64>,
}

impl TryFrom<MediaRow> for MediaResource {
    type Error = anyhow::Error;

    fn try_from(r: MediaRow) -> Result<Self, Self::Error> {
        Ok(Self {
            public_id: r.public_id,
            secure_url: r.secure_url,
            resource_type: r.resource_type.parse()?,
            format: r.format,
            bytes: u64::try_from(r.bytes)?,
            width: r.width.map(u32::try_from).transpose()?,
            height: r.height.map(u32::try_from).transpose()?,
            duration: r.duration,
            created_at: r.created_at,
        })
    }
}
