//! In-memory record of who is using the app.
//!
//! A [`Session`] is an owned value: the app creates one at start-up, hands
//! `&mut` access to whatever handles login/logout, and drops it on exit.
//! Nothing is persisted.

use serde::{Deserialize, Serialize};

use crate::auth::dto::PublicUser;
use crate::client::api::AuthOutcome;

/// Shown in place of the password; the real secret never reaches the session.
pub const MASKED_PASSWORD: &str = "********";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
    pub name: String,
    pub email: String,
    pub password: String,
}

impl UserSummary {
    pub fn from_user(user: &PublicUser) -> Self {
        Self {
            name: user.username.clone(),
            email: user.email.clone(),
            password: MASKED_PASSWORD.to_string(),
        }
    }
}

#[derive(Debug, Default)]
pub struct Session {
    user: Option<UserSummary>,
    is_new_signup: bool,
    token: Option<String>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the current user.
    pub fn login(&mut self, user: UserSummary) {
        self.user = Some(user);
    }

    pub fn logout(&mut self) {
        self.user = None;
        self.is_new_signup = false;
        self.token = None;
    }

    pub fn mark_new_signup(&mut self, flag: bool) {
        self.is_new_signup = flag;
    }

    pub fn set_token(&mut self, token: Option<String>) {
        self.token = token;
    }

    /// Adopt the result of a successful login.
    pub fn apply_login(&mut self, outcome: AuthOutcome) {
        self.login(UserSummary::from_user(&outcome.user));
        self.mark_new_signup(false);
        self.set_token(outcome.token);
    }

    /// Adopt the result of a successful signup.
    pub fn apply_signup(&mut self, outcome: AuthOutcome) {
        self.login(UserSummary::from_user(&outcome.user));
        self.mark_new_signup(true);
        self.set_token(outcome.token);
    }

    pub fn user(&self) -> Option<&UserSummary> {
        self.user.as_ref()
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    pub fn is_new_signup(&self) -> bool {
        self.is_new_signup
    }

    /// Message for the profile screen.
    pub fn profile_greeting(&self) -> String {
        match &self.user {
            None => "No user is logged in.".to_string(),
            Some(u) if self.is_new_signup => {
                format!("Welcome, {}! Your account has been created.", u.name)
            }
            Some(u) => format!("Welcome back, {}!", u.name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alice() -> PublicUser {
        PublicUser {
            id: 1,
            username: "alice".into(),
            email: "alice@example.com".into(),
        }
    }

    #[test]
    fn starts_empty() {
        let s = Session::new();
        assert!(!s.is_authenticated());
        assert!(!s.is_new_signup());
        assert!(s.user().is_none());
        assert_eq!(s.profile_greeting(), "No user is logged in.");
    }

    #[test]
    fn summary_masks_password() {
        let summary = UserSummary::from_user(&alice());
        assert_eq!(summary.name, "alice");
        assert_eq!(summary.password, MASKED_PASSWORD);
    }

    #[test]
    fn login_then_logout_clears_everything() {
        let mut s = Session::new();
        s.apply_signup(AuthOutcome {
            user: alice(),
            token: Some("t".into()),
        });
        assert!(s.is_authenticated());
        assert!(s.is_new_signup());
        assert_eq!(s.token(), Some("t"));
        assert_eq!(
            s.profile_greeting(),
            "Welcome, alice! Your account has been created."
        );

        s.logout();
        assert!(!s.is_authenticated());
        assert!(!s.is_new_signup());
        assert!(s.token().is_none());
    }

    #[test]
    fn returning_login_greets_back() {
        let mut s = Session::new();
        s.mark_new_signup(true);
        s.apply_login(AuthOutcome {
            user: alice(),
            token: None,
        });
        assert!(!s.is_new_signup());
        assert_eq!(s.profile_greeting(), "Welcome back, alice!");
    }

    #[test]
    fn login_replaces_previous_user() {
        let mut s = Session::new();
        s.login(UserSummary::from_user(&alice()));
        s.login(UserSummary {
            name: "bob".into(),
            email: "bob@example.com".into(),
            password: MASKED_PASSWORD.into(),
        });
        assert_eq!(s.user().unwrap().email, "bob@example.com");
    }
}
