use serde_json::json;
use tracing::{debug, instrument};

use crate::auth::dto::{LoginResponse, PublicUser, SignupResponse};
use crate::client::error::{classify, error_message, ClientError};
use crate::media::dto::{MediaListResponse, MediaResource, RegisterMediaRequest, UploadResponse};

/// Result of a successful signup or login.
#[derive(Debug, Clone)]
pub struct AuthOutcome {
    pub user: PublicUser,
    pub token: Option<String>,
}

/// HTTP client for the mediashelf server.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(http: reqwest::Client, base_url: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    #[instrument(skip(self, password))]
    pub async fn signup(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<AuthOutcome, ClientError> {
        let response = self
            .http
            .post(self.url("/signup"))
            .json(&json!({ "username": username, "email": email, "password": password }))
            .send()
            .await?;

        if !response.status().is_success() {
            let (status, message) = error_message(response).await;
            return Err(classify(status, message));
        }

        let body = response.json::<SignupResponse>().await?;
        debug!(user_id = body.user_id, "signed up");
        Ok(AuthOutcome {
            user: PublicUser {
                id: body.user_id,
                username: body.username,
                email: body.email,
            },
            token: body.token,
        })
    }

    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<AuthOutcome, ClientError> {
        let response = self
            .http
            .post(self.url("/login"))
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await?;

        if !response.status().is_success() {
            let (status, message) = error_message(response).await;
            return Err(classify(status, message));
        }

        let body = response.json::<LoginResponse>().await?;
        Ok(AuthOutcome {
            user: body.user,
            token: body.token,
        })
    }

    #[instrument(skip(self, token))]
    pub async fn me(&self, token: &str) -> Result<PublicUser, ClientError> {
        let response = self
            .http
            .get(self.url("/me"))
            .bearer_auth(token)
            .send()
            .await?;

        if !response.status().is_success() {
            let (status, message) = error_message(response).await;
            return Err(classify(status, message));
        }
        Ok(response.json::<PublicUser>().await?)
    }

    /// One full listing per call; an absent `resources` key reads as empty.
    #[instrument(skip(self))]
    pub async fn list_media(&self) -> Result<Vec<MediaResource>, ClientError> {
        let response = self.http.get(self.url("/api/media")).send().await?;

        if !response.status().is_success() {
            let (status, message) = error_message(response).await;
            return Err(ClientError::Fetch(format!("{} ({})", message, status.as_u16())));
        }

        let body = response.json::<MediaListResponse>().await?;
        Ok(body.resources)
    }

    /// Record an asset stored by the hosted service so it appears in
    /// `list_media`. Returns the server's copy of the reference.
    #[instrument(skip(self, resource, token), fields(public_id = %resource.public_id))]
    pub async fn register_media(
        &self,
        resource: &MediaResource,
        token: Option<&str>,
    ) -> Result<MediaResource, ClientError> {
        let mut request = self
            .http
            .post(self.url("/api/media"))
            .json(&RegisterMediaRequest::from(resource));
        if let Some(t) = token {
            request = request.bearer_auth(t);
        }
        let response = request.send().await?;

        if !response.status().is_success() {
            let (status, message) = error_message(response).await;
            return Err(ClientError::Upload {
                status: status.as_u16(),
                message,
            });
        }

        let body = response.json::<UploadResponse>().await?;
        body.resources
            .into_iter()
            .next()
            .ok_or_else(|| ClientError::Upload {
                status: 201,
                message: "server recorded the asset but returned no resource".into(),
            })
    }

    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.http
    }
}
