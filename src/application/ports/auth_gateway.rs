use crate::domain::entities::{AuthEvent, Credentials, Session, SignUpOutcome};
use crate::shared::error::AppError;
use async_trait::async_trait;
use futures::stream::BoxStream;

#[async_trait]
pub trait AuthGateway: Send + Sync {
    /// 保存済みセッション。期限切れなら `None`。
    async fn get_session(&self) -> Result<Option<Session>, AppError>;
    async fn sign_in_with_password(&self, credentials: &Credentials) -> Result<Session, AppError>;
    async fn sign_up(&self, credentials: &Credentials) -> Result<SignUpOutcome, AppError>;
    async fn sign_out(&self) -> Result<(), AppError>;
    /// 認証状態の変化通知。
    fn auth_events(&self) -> BoxStream<'static, AuthEvent>;
}
