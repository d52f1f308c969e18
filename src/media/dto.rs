use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Classification of a stored asset. Only these two kinds are accepted.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ResourceType {
    Image,
    Video,
}

impl ResourceType {
    /// Derive the kind from a mime type such as `video/mp4`.
    pub fn from_mime(mime: &str) -> Option<Self> {
        let top = mime.split('/').next()?.trim().to_ascii_lowercase();
        match top.as_str() {
            "image" => Some(ResourceType::Image),
            "video" => Some(ResourceType::Video),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceType::Image => "image",
            ResourceType::Video => "video",
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "image" => Ok(ResourceType::Image),
            "video" => Ok(ResourceType::Video),
            other => anyhow::bail!("unknown resource type {:?}", other),
        }
    }
}

/// Reference to a stored asset, as returned by `/upload` and `/api/media`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MediaResource {
    pub public_id: String,
    pub secure_url: String,
    pub resource_type: ResourceType,
    pub format: String,
    pub bytes: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Body of `POST /api/media`: an asset already stored by the hosted
/// service, recorded so that it shows up in the listing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RegisterMediaRequest {
    pub public_id: String,
    pub secure_url: String,
    pub resource_type: ResourceType,
    pub format: String,
    pub bytes: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
}

impl From<&MediaResource> for RegisterMediaRequest {
    fn from(r: &MediaResource) -> Self {
        Self {
            public_id: r.public_id.clone(),
            secure_url: r.secure_url.clone(),
            resource_type: r.resource_type,
            format: r.format.clone(),
            bytes: r.bytes,
            width: r.width,
            height: r.height,
            duration: r.duration,
        }
    }
}

/// Absolute `http`/`https` URL with a host.
pub fn is_web_url(url: &str) -> bool {
    reqwest::Url::parse(url)
        .map(|u| matches!(u.scheme(), "http" | "https") && u.has_host())
        .unwrap_or(false)
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MediaListResponse {
    #[serde(default)]
    pub resources: Vec<MediaResource>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UploadResponse {
    pub success: bool,
    pub message: String,
    #[serde(default)]
    pub resources: Vec<MediaResource>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn resource_type_from_mime() {
        assert_eq!(ResourceType::from_mime("video/mp4"), Some(ResourceType::Video));
        assert_eq!(ResourceType::from_mime("video/quicktime"), Some(ResourceType::Video));
        assert_eq!(ResourceType::from_mime("image/jpeg"), Some(ResourceType::Image));
        assert_eq!(ResourceType::from_mime("IMAGE/PNG"), Some(ResourceType::Image));
        assert_eq!(ResourceType::from_mime("application/pdf"), None);
        assert_eq!(ResourceType::from_mime(""), None);
    }

    #[test]
    fn media_resource_uses_snake_case_wire_names() {
        let r = MediaResource {
            public_id: "abc".into(),
            secure_url: "https://cdn.example.com/abc.mp4".into(),
            resource_type: ResourceType::Video,
            format: "mp4".into(),
            bytes: 1024,
            width: None,
            height: None,
            duration: Some(12.5),
            created_at: datetime!(2024-05-01 10:00:00 UTC),
        };
        let v = serde_json::to_value(&r).unwrap();
        assert_eq!(v["public_id"], "abc");
        assert_eq!(v["secure_url"], "https://cdn.example.com/abc.mp4");
        assert_eq!(v["resource_type"], "video");
        assert_eq!(v["bytes"], 1024);
        assert_eq!(v["created_at"], "2024-05-01T10:00:00Z");
        assert!(v.get("width").is_none());
    }

    #[test]
    fn web_urls_need_scheme_and_host() {
        assert!(is_web_url("https://res.cloudinary.com/demo/video/upload/v1.mp4"));
        assert!(is_web_url("http://localhost:3000/media/a.png"));
        assert!(!is_web_url("not a url"));
        assert!(!is_web_url("ftp://example.com/a.mp4"));
        assert!(!is_web_url("/media/a.png"));
        assert!(!is_web_url(""));
    }

    #[test]
    fn list_response_tolerates_missing_resources() {
        let parsed: MediaListResponse = serde_json::from_str("{}").unwrap();
        assert!(parsed.resources.is_empty());
    }
}
