use crate::application::ports::AuthGateway;
use crate::domain::entities::{AuthEvent, Credentials, Session, SignUpOutcome};
use crate::domain::value_objects::UserId;
use crate::infrastructure::database::ConnectionPool;
use crate::shared::error::AppError;
use argon2::Argon2;
use argon2::password_hash::{
    PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng,
};
use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose};
use chrono::{DateTime, Duration, TimeZone, Utc};
use futures::StreamExt;
use futures::stream::{self, BoxStream};
use rand::RngCore;
use sqlx::FromRow;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, info, warn};

const INSERT_ACCOUNT: &str = r#"
    INSERT INTO accounts (user_id, email, password_hash, created_at)
    VALUES (?1, ?2, ?3, ?4)
"#;

const SELECT_ACCOUNT_BY_EMAIL: &str = r#"
    SELECT user_id, email, password_hash
    FROM accounts
    WHERE email = ?1
"#;

const INSERT_SESSION: &str = r#"
    INSERT INTO sessions (access_token, user_id, expires_at, created_at)
    VALUES (?1, ?2, ?3, ?4)
"#;

const SELECT_LATEST_SESSION: &str = r#"
    SELECT s.access_token, s.user_id, s.expires_at, a.email
    FROM sessions s
    INNER JOIN accounts a ON a.user_id = s.user_id
    ORDER BY s.created_at DESC, s.rowid DESC
    LIMIT 1
"#;

const DELETE_SESSION: &str = "DELETE FROM sessions WHERE access_token = ?1";

const AUTH_EVENT_CAPACITY: usize = 32;

#[derive(Debug, FromRow)]
struct AccountRow {
    user_id: String,
    email: String,
    password_hash: String,
}

#[derive(Debug, FromRow)]
struct SessionRow {
    access_token: String,
    user_id: String,
    expires_at: i64,
    email: String,
}

impl SessionRow {
    fn into_domain(self) -> Result<Session, AppError> {
        Ok(Session {
            user_id: UserId::new(self.user_id).map_err(|err| {
                AppError::DeserializationError(format!("Invalid user id: {err}"))
            })?,
            email: self.email,
            access_token: self.access_token,
            expires_at: millis_to_datetime(self.expires_at)?,
        })
    }
}

fn millis_to_datetime(millis: i64) -> Result<DateTime<Utc>, AppError> {
    Utc.timestamp_millis_opt(millis)
        .single()
        .ok_or_else(|| AppError::DeserializationError(format!("Invalid timestamp: {millis}")))
}

fn generate_token() -> String {
    let mut raw = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut raw);
    general_purpose::URL_SAFE_NO_PAD.encode(raw)
}

/// ローカル DB に資格情報とセッションを保持する認証ゲートウェイ。
///
/// パスワードは argon2 でハッシュ化し、アクセストークンは 32 バイトの乱数を base64 化したもの。
/// サインアップは確認メールを挟まず、その場でセッションを発行する。
pub struct LocalAuthGateway {
    pool: ConnectionPool,
    session_ttl: Duration,
    current: Mutex<Option<Session>>,
    events: broadcast::Sender<AuthEvent>,
}

impl LocalAuthGateway {
    pub fn new(pool: ConnectionPool, session_ttl: std::time::Duration) -> Self {
        let (events, _) = broadcast::channel(AUTH_EVENT_CAPACITY);
        Self {
            pool,
            session_ttl: Duration::from_std(session_ttl).unwrap_or_else(|_| Duration::hours(1)),
            current: Mutex::new(None),
            events,
        }
    }

    fn current(&self) -> MutexGuard<'_, Option<Session>> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, event: AuthEvent) {
        debug!(?event, "auth event");
        let _ = self.events.send(event);
    }

    async fn issue_session(&self, user_id: UserId, email: String) -> Result<Session, AppError> {
        let now = Utc::now();
        let session = Session {
            user_id,
            email,
            access_token: generate_token(),
            expires_at: now + self.session_ttl,
        };
        sqlx::query(INSERT_SESSION)
            .bind(&session.access_token)
            .bind(session.user_id.as_str())
            .bind(session.expires_at.timestamp_millis())
            .bind(now.timestamp_millis())
            .execute(self.pool.get_pool())
            .await?;
        *self.current() = Some(session.clone());
        Ok(session)
    }

    async fn revoke(&self, access_token: &str) -> Result<(), AppError> {
        sqlx::query(DELETE_SESSION)
            .bind(access_token)
            .execute(self.pool.get_pool())
            .await?;
        Ok(())
    }

    async fn find_account(&self, email: &str) -> Result<Option<AccountRow>, AppError> {
        Ok(sqlx::query_as::<_, AccountRow>(SELECT_ACCOUNT_BY_EMAIL)
            .bind(email)
            .fetch_optional(self.pool.get_pool())
            .await?)
    }
}

#[async_trait]
impl AuthGateway for LocalAuthGateway {
    async fn get_session(&self) -> Result<Option<Session>, AppError> {
        let cached = self.current().clone();
        let session = match cached {
            Some(session) => session,
            None => {
                let row = sqlx::query_as::<_, SessionRow>(SELECT_LATEST_SESSION)
                    .fetch_optional(self.pool.get_pool())
                    .await?;
                match row {
                    Some(row) => row.into_domain()?,
                    None => return Ok(None),
                }
            }
        };

        if session.is_expired_at(Utc::now()) {
            self.revoke(&session.access_token).await?;
            let was_current = self.current().take().is_some();
            if was_current {
                self.emit(AuthEvent::SessionExpired);
            }
            return Ok(None);
        }

        *self.current() = Some(session.clone());
        Ok(Some(session))
    }

    async fn sign_in_with_password(&self, credentials: &Credentials) -> Result<Session, AppError> {
        let email = credentials.normalized_email();
        let account = self.find_account(&email).await?;
        let Some(account) = account else {
            warn!("sign in rejected: unknown email");
            return Err(AppError::Auth("Invalid login credentials".to_string()));
        };

        let hash = PasswordHash::new(&account.password_hash)?;
        if Argon2::default()
            .verify_password(credentials.password.as_bytes(), &hash)
            .is_err()
        {
            warn!(user_id = %account.user_id, "sign in rejected: wrong password");
            return Err(AppError::Auth("Invalid login credentials".to_string()));
        }

        let user_id = UserId::new(account.user_id)
            .map_err(|err| AppError::DeserializationError(format!("Invalid user id: {err}")))?;
        let session = self.issue_session(user_id, account.email).await?;
        info!(user_id = %session.user_id, "session issued");
        self.emit(AuthEvent::SignedIn(session.clone()));
        Ok(session)
    }

    async fn sign_up(&self, credentials: &Credentials) -> Result<SignUpOutcome, AppError> {
        let email = credentials.normalized_email();
        if self.find_account(&email).await?.is_some() {
            return Err(AppError::Auth("User already registered".to_string()));
        }

        let salt = SaltString::generate(&mut OsRng);
        let password_hash = Argon2::default()
            .hash_password(credentials.password.as_bytes(), &salt)?
            .to_string();
        let user_id = UserId::generate();
        sqlx::query(INSERT_ACCOUNT)
            .bind(user_id.as_str())
            .bind(&email)
            .bind(&password_hash)
            .bind(Utc::now().timestamp_millis())
            .execute(self.pool.get_pool())
            .await?;
        info!(user_id = %user_id, "account created");

        let session = self.issue_session(user_id.clone(), email).await?;
        self.emit(AuthEvent::SignedIn(session.clone()));
        Ok(SignUpOutcome {
            user_id,
            session: Some(session),
        })
    }

    async fn sign_out(&self) -> Result<(), AppError> {
        let current = self.current().take();
        if let Some(session) = current {
            self.revoke(&session.access_token).await?;
        }
        self.emit(AuthEvent::SignedOut);
        Ok(())
    }

    fn auth_events(&self) -> BoxStream<'static, AuthEvent> {
        stream::unfold(self.events.subscribe(), |mut receiver| async move {
            loop {
                match receiver.recv().await {
                    Ok(event) => return Some((event, receiver)),
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "auth event subscriber lagged");
                    }
                    Err(RecvError::Closed) => return None,
                }
            }
        })
        .boxed()
    }
}
