use crate::application::ports::{AuthGateway, QueryCache};
use crate::domain::entities::{AuthEvent, Credentials, Session, SessionState, SignUpOutcome};
use crate::domain::value_objects::UserId;
use crate::shared::{AppError, Result};
use chrono::Utc;
use futures::StreamExt;
use std::sync::{Arc, Weak};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// アプリケーション全体で共有する認証セッション。
///
/// 状態は `watch` チャネルで保持し、利用側には読み取り専用で公開する。
/// ログインユーザーが変わった時点で共有キャッシュを破棄する。
pub struct SessionContext {
    gateway: Arc<dyn AuthGateway>,
    cache: Arc<dyn QueryCache>,
    state_tx: watch::Sender<SessionState>,
}

impl SessionContext {
    pub fn new(gateway: Arc<dyn AuthGateway>, cache: Arc<dyn QueryCache>) -> Self {
        let (state_tx, _) = watch::channel(SessionState::Initializing);
        Self {
            gateway,
            cache,
            state_tx,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state_tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state_tx.subscribe()
    }

    pub async fn initialize(&self) -> Result<SessionState> {
        let next = match self.gateway.get_session().await? {
            Some(session) if !session.is_expired_at(Utc::now()) => SessionState::Active(session),
            Some(_) => SessionState::Expired,
            None => SessionState::SignedOut,
        };
        self.transition(next.clone());
        Ok(next)
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Session> {
        let credentials = Credentials::new(email, password);
        credentials.validate()?;
        let session = self.gateway.sign_in_with_password(&credentials).await?;
        info!(user_id = %session.user_id, "signed in");
        self.transition(SessionState::Active(session.clone()));
        Ok(session)
    }

    /// メール確認待ちの場合はセッションが無いまま返る。
    pub async fn sign_up(&self, email: &str, password: &str) -> Result<SignUpOutcome> {
        let credentials = Credentials::new(email, password);
        credentials.validate()?;
        let outcome = self.gateway.sign_up(&credentials).await?;
        if let Some(session) = &outcome.session {
            self.transition(SessionState::Active(session.clone()));
        }
        Ok(outcome)
    }

    pub async fn sign_out(&self) -> Result<()> {
        self.gateway.sign_out().await?;
        self.transition(SessionState::SignedOut);
        Ok(())
    }

    /// 認証済みユーザー ID。未ログイン・期限切れなら `NotAuthenticated`。
    pub fn require_user(&self) -> Result<UserId> {
        let state = self.state();
        match state {
            SessionState::Active(session) => {
                if session.is_expired_at(Utc::now()) {
                    self.transition(SessionState::Expired);
                    return Err(AppError::NotAuthenticated);
                }
                Ok(session.user_id)
            }
            _ => Err(AppError::NotAuthenticated),
        }
    }

    pub fn current_user(&self) -> Option<UserId> {
        self.require_user().ok()
    }

    pub fn apply_auth_event(&self, event: AuthEvent) {
        let next = match event {
            AuthEvent::SignedIn(session) | AuthEvent::TokenRefreshed(session) => {
                SessionState::Active(session)
            }
            AuthEvent::SignedOut => SessionState::SignedOut,
            AuthEvent::SessionExpired => SessionState::Expired,
        };
        self.transition(next);
    }

    /// ゲートウェイの認証イベントを転送するタスクを起動する。
    /// コンテキストが破棄されるとタスクも終了する。
    pub fn spawn_listener(self: &Arc<Self>) -> JoinHandle<()> {
        let mut events = self.gateway.auth_events();
        let context: Weak<Self> = Arc::downgrade(self);
        tokio::spawn(async move {
            while let Some(event) = events.next().await {
                let Some(context) = context.upgrade() else {
                    break;
                };
                debug!(?event, "auth state changed");
                context.apply_auth_event(event);
            }
        })
    }

    fn transition(&self, next: SessionState) {
        let next_user = next.user_id().cloned();
        let previous = self.state_tx.send_replace(next);
        if previous.user_id() != next_user.as_ref() {
            debug!(
                previous = ?previous.user_id(),
                next = ?next_user,
                "session user changed; clearing query cache"
            );
            self.cache.clear();
        }
    }
}
