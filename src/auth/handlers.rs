use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;

use crate::{
    auth::{
        dto::{LoginRequest, LoginResponse, PublicUser, SignupRequest, SignupResponse},
        extractors::AuthUser,
        jwt::JwtKeys,
        repo_types::User,
        services,
    },
    error::{AppError, AppJson, AppResult},
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/signup", post(signup))
        .route("/login", post(login))
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/me", get(get_me))
}

#[instrument(skip(state, payload), fields(email = %payload.email))]
pub async fn signup(
    State(state): State<AppState>,
    AppJson(payload): AppJson<SignupRequest>,
) -> AppResult<(StatusCode, Json<SignupResponse>)> {
    let user = services::signup(&state.db, payload).await?;
    let token = JwtKeys::from_ref(&state).sign(user.id)?;

    Ok((
        StatusCode::CREATED,
        Json(SignupResponse {
            success: true,
            message: "User created successfully".into(),
            username: user.username,
            email: user.email,
            user_id: user.id,
            token: Some(token),
        }),
    ))
}

#[instrument(skip(state, payload), fields(email = %payload.email))]
pub async fn login(
    State(state): State<AppState>,
    AppJson(payload): AppJson<LoginRequest>,
) -> AppResult<Json<LoginResponse>> {
    let user = services::login(&state.db, payload).await?;
    let token = JwtKeys::from_ref(&state).sign(user.id)?;

    Ok(Json(LoginResponse {
        success: true,
        message: "Login successful".into(),
        user,
        token: Some(token),
    }))
}

#[instrument(skip(state))]
pub async fn get_me(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> AppResult<Json<PublicUser>> {
    let user = User::find_by_id(&state.db, user_id)
        .await?
        .ok_or_else(|| AppError::Auth("User not found".into()))?;
    Ok(Json(user.into()))
}
