use reqwest::StatusCode;

use crate::auth::dto::ErrorResponse;

/// Everything a client-side call can fail with. Nothing here is retried.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("server error: {0}")]
    Internal(String),

    #[error("upload failed ({status}): {message}")]
    Upload { status: u16, message: String },

    #[error("fetch failed: {0}")]
    Fetch(String),

    #[error("request timed out")]
    Timeout,

    #[error("file is {size} bytes, limit is {limit}")]
    TooLarge { size: usize, limit: usize },

    #[error("missing configuration: {0}")]
    Config(String),
}

impl From<reqwest::Error> for ClientError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ClientError::Timeout
        } else {
            ClientError::Fetch(e.to_string())
        }
    }
}

/// Message from a `{success:false, message}` body, or the status reason.
pub(crate) async fn error_message(response: reqwest::Response) -> (StatusCode, String) {
    let status = response.status();
    let text = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorResponse>(&text)
        .ok()
        .map(|b| b.message)
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| {
            if text.is_empty() {
                status.canonical_reason().unwrap_or("request failed").to_string()
            } else {
                text
            }
        });
    (status, message)
}

/// Map a failed auth-endpoint response onto the shared taxonomy.
pub(crate) fn classify(status: StatusCode, message: String) -> ClientError {
    match status {
        StatusCode::BAD_REQUEST => ClientError::Validation(message),
        StatusCode::UNAUTHORIZED => ClientError::Auth(message),
        StatusCode::CONFLICT => ClientError::Conflict(message),
        _ => ClientError::Internal(message),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_map_onto_variants() {
        assert!(matches!(classify(StatusCode::BAD_REQUEST, "m".into()), ClientError::Validation(_)));
        assert!(matches!(classify(StatusCode::UNAUTHORIZED, "m".into()), ClientError::Auth(_)));
        assert!(matches!(classify(StatusCode::CONFLICT, "m".into()), ClientError::Conflict(_)));
        assert!(matches!(
            classify(StatusCode::INTERNAL_SERVER_ERROR, "m".into()),
            ClientError::Internal(_)
        ));
    }
}
