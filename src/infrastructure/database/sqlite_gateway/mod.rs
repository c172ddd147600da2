use super::ConnectionPool;
use crate::infrastructure::realtime::BroadcastRealtime;
use crate::shared::error::AppError;

mod comments;
mod conversations;
mod events;
mod mapper;
mod profiles;
mod queries;
mod relations;
mod reports;

/// ローカル SQLite をバックエンドとしてすべてのリポジトリポートを実装する。
pub struct SqliteGateway {
    pool: ConnectionPool,
    realtime: BroadcastRealtime,
}

impl SqliteGateway {
    pub fn new(pool: ConnectionPool, realtime: BroadcastRealtime) -> Self {
        Self { pool, realtime }
    }

    pub async fn initialize(&self) -> Result<(), AppError> {
        self.pool.migrate().await?;
        Ok(())
    }

    pub async fn health_check(&self) -> Result<bool, AppError> {
        let result = sqlx::query("SELECT 1")
            .fetch_one(self.pool.get_pool())
            .await;
        Ok(result.is_ok())
    }
}
