use crate::domain::value_objects::UserId;
use crate::shared::validation::{FieldError, FieldErrors, ValidationFailureKind};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const PASSWORD_MIN_CHARS: usize = 6;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub user_id: UserId,
    pub email: String,
    pub access_token: String,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// 認証状態のライフサイクル: `Initializing -> Active -> Expired | SignedOut`
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Initializing,
    Active(Session),
    Expired,
    SignedOut,
}

impl SessionState {
    pub fn session(&self) -> Option<&Session> {
        match self {
            SessionState::Active(session) => Some(session),
            _ => None,
        }
    }

    pub fn user_id(&self) -> Option<&UserId> {
        self.session().map(|session| &session.user_id)
    }
}

/// 認証ゲートウェイから届く状態変化通知。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthEvent {
    SignedIn(Session),
    TokenRefreshed(Session),
    SignedOut,
    SessionExpired,
}

/// サインアップ結果。メール確認が必要な場合はセッションが返らない。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignUpOutcome {
    pub user_id: UserId,
    pub session: Option<Session>,
}

#[derive(Debug, Clone)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }

    pub fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::default();
        if errors.require("email", &self.email, "email is required") && !self.email.contains('@')
        {
            errors.push(FieldError::new(
                "email",
                ValidationFailureKind::InvalidFormat,
                "email is invalid",
            ));
        }
        if self.password.chars().count() < PASSWORD_MIN_CHARS {
            errors.push(FieldError::new(
                "password",
                ValidationFailureKind::TooShort,
                format!("password must be at least {PASSWORD_MIN_CHARS} characters"),
            ));
        }
        errors.into_result()
    }

    /// メールアドレスは大文字小文字を区別しない。
    pub fn normalized_email(&self) -> String {
        self.email.trim().to_lowercase()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credentials_require_email_and_long_password() {
        let errors = Credentials::new("nope", "123").validate().unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(Credentials::new("a@b.fr", "secret").validate().is_ok());
    }

    #[test]
    fn only_active_state_exposes_user() {
        let session = Session {
            user_id: UserId::new("u1").unwrap(),
            email: "a@b.fr".into(),
            access_token: "t".into(),
            expires_at: Utc::now(),
        };
        assert_eq!(
            SessionState::Active(session).user_id().map(UserId::as_str),
            Some("u1")
        );
        assert!(SessionState::Expired.user_id().is_none());
        assert!(SessionState::default().session().is_none());
    }
}
