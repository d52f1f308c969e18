use lazy_static::lazy_static;
use regex::Regex;
use sqlx::SqlitePool;
use tracing::{info, warn};

use crate::auth::{
    dto::{LoginRequest, PublicUser, SignupRequest},
    password::{hash_password, verify_password},
    repo_types::User,
};
use crate::error::{is_unique_violation, AppError, AppResult};

pub const INVALID_CREDENTIALS: &str = "Invalid email or password";

lazy_static! {
    static ref EMAIL_RE: Regex = Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap();
    // Verified against when the email is unknown so both failure paths cost one argon2 run.
    static ref DUMMY_HASH: Option<String> = hash_password("mediashelf-dummy-password").ok();
}

pub(crate) fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

impl From<User> for PublicUser {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            username: u.username,
            email: u.email,
        }
    }
}

pub async fn signup(db: &SqlitePool, req: SignupRequest) -> AppResult<PublicUser> {
    let username = req.username.trim();
    let email = req.email.trim();

    if username.is_empty() || email.is_empty() || req.password.is_empty() {
        return Err(AppError::Validation(
            "Username, email, and password are required".into(),
        ));
    }
    if !is_valid_email(email) {
        warn!(%email, "signup with invalid email");
        return Err(AppError::Validation("Invalid email format".into()));
    }

    let hash = hash_password(&req.password)?;

    let user = match User::create(db, username, email, &hash).await {
        Ok(u) => u,
        Err(e) if is_unique_violation(&e) => {
            warn!(%email, "signup for existing email");
            return Err(AppError::Conflict(
                "Username or email already exists".into(),
            ));
        }
        Err(e) => return Err(e.into()),
    };

    info!(user_id = user.id, email = %user.email, "user registered");
    Ok(user.into())
}

pub async fn login(db: &SqlitePool, req: LoginRequest) -> AppResult<PublicUser> {
    let email = req.email.trim();

    if email.is_empty() || req.password.is_empty() {
        return Err(AppError::Validation(
            "Email and password are required".into(),
        ));
    }
    if !is_valid_email(email) {
        return Err(AppError::Validation("Invalid email format".into()));
    }

    let Some(user) = User::find_by_email(db, email).await? else {
        if let Some(dummy) = DUMMY_HASH.as_deref() {
            let _ = verify_password(&req.password, dummy);
        }
        warn!(%email, "login unknown email");
        return Err(AppError::Auth(INVALID_CREDENTIALS.into()));
    };

    let ok = match verify_password(&req.password, &user.password_hash) {
        Ok(v) => v,
        Err(e) => {
            warn!(user_id = user.id, error = %e, "stored credential is not a valid hash");
            false
        }
    };

    if !ok {
        warn!(user_id = user.id, "login invalid password");
        return Err(AppError::Auth(INVALID_CREDENTIALS.into()));
    }

    info!(user_id = user.id, "user logged in");
    Ok(user.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::AppState;

    fn signup_req(username: &str, email: &str, password: &str) -> SignupRequest {
        SignupRequest {
            username: username.into(),
            email: email.into(),
            password: password.into(),
        }
    }

    fn login_req(email: &str, password: &str) -> LoginRequest {
        LoginRequest {
            email: email.into(),
            password: password.into(),
        }
    }

    #[test]
    fn email_pattern() {
        assert!(is_valid_email("alice@example.com"));
        assert!(is_valid_email("a.b+c@sub.example.co"));
        assert!(!is_valid_email("alice"));
        assert!(!is_valid_email("alice@example"));
        assert!(!is_valid_email("al ice@example.com"));
        assert!(!is_valid_email("alice@@example.com"));
        assert!(!is_valid_email(""));
    }

    #[tokio::test]
    async fn signup_then_login_roundtrip() {
        let state = AppState::fake().await;

        let created = signup(&state.db, signup_req("alice", "alice@example.com", "Secret123!"))
            .await
            .unwrap();
        assert_eq!(
            created,
            PublicUser {
                id: 1,
                username: "alice".into(),
                email: "alice@example.com".into()
            }
        );

        let logged_in = login(&state.db, login_req("alice@example.com", "Secret123!"))
            .await
            .unwrap();
        assert_eq!(logged_in, created);
    }

    #[tokio::test]
    async fn stored_hash_is_not_plaintext() {
        let state = AppState::fake().await;
        signup(&state.db, signup_req("bob", "bob@example.com", "hunter22"))
            .await
            .unwrap();

        let stored = User::find_by_email(&state.db, "bob@example.com")
            .await
            .unwrap()
            .unwrap();
        assert_ne!(stored.password_hash, "hunter22");
        assert!(verify_password("hunter22", &stored.password_hash).unwrap());
    }

    #[tokio::test]
    async fn duplicate_email_conflicts_without_new_row() {
        let state = AppState::fake().await;
        signup(&state.db, signup_req("alice", "alice@example.com", "Secret123!"))
            .await
            .unwrap();

        let err = signup(&state.db, signup_req("alice2", "alice@example.com", "Other456!"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
        assert_eq!(User::count(&state.db).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn signup_validation() {
        let state = AppState::fake().await;
        for req in [
            signup_req("", "a@example.com", "pw"),
            signup_req("a", "", "pw"),
            signup_req("a", "a@example.com", ""),
            signup_req("   ", "a@example.com", "pw"),
            signup_req("a", "not-an-email", "pw"),
        ] {
            let err = signup(&state.db, req).await.unwrap_err();
            assert!(matches!(err, AppError::Validation(_)), "got {err:?}");
        }
        assert_eq!(User::count(&state.db).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn unknown_email_and_wrong_password_are_indistinguishable() {
        let state = AppState::fake().await;
        signup(&state.db, signup_req("alice", "alice@example.com", "Secret123!"))
            .await
            .unwrap();

        let wrong_pw = login(&state.db, login_req("alice@example.com", "wrong"))
            .await
            .unwrap_err();
        let unknown = login(&state.db, login_req("nobody@example.com", "Secret123!"))
            .await
            .unwrap_err();

        assert!(matches!(wrong_pw, AppError::Auth(_)));
        assert!(matches!(unknown, AppError::Auth(_)));
        assert_eq!(wrong_pw.to_string(), unknown.to_string());
        assert_eq!(wrong_pw.to_string(), INVALID_CREDENTIALS);
    }

    #[tokio::test]
    async fn plaintext_stored_value_does_not_authenticate() {
        let state = AppState::fake().await;
        User::create(&state.db, "legacy", "legacy@example.com", "plaintext")
            .await
            .unwrap();

        let err = login(&state.db, login_req("legacy@example.com", "plaintext"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Auth(_)));
    }

    #[tokio::test]
    async fn login_validation() {
        let state = AppState::fake().await;
        for req in [
            login_req("", "pw"),
            login_req("a@example.com", ""),
            login_req("bad-email", "pw"),
        ] {
            let err = login(&state.db, req).await.unwrap_err();
            assert!(matches!(err, AppError::Validation(_)));
        }
    }
}
