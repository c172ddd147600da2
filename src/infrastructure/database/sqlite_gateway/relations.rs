use super::SqliteGateway;
use super::events::EventRow;
use super::queries::{
    COUNT_FOLLOWERS, COUNT_FOLLOWING, COUNT_SAVES, DELETE_FOLLOW, DELETE_SAVED_EVENT,
    INSERT_FOLLOW, INSERT_SAVED_EVENT, SELECT_EVENTS_WITH_CREATOR, SELECT_FOLLOW_EXISTS,
    SELECT_SAVED_EVENT_EXISTS,
};
use crate::application::ports::RelationRepository;
use crate::domain::entities::Event;
use crate::domain::value_objects::{RelationCount, RelationKey, UserId};
use crate::shared::error::AppError;
use async_trait::async_trait;
use chrono::Utc;

/// 結合テーブルのキー列（第1キー, 第2キー）。
fn relation_columns(key: &RelationKey) -> (&str, &str) {
    match key {
        RelationKey::Follow {
            follower,
            following,
        } => (follower.as_str(), following.as_str()),
        RelationKey::SavedEvent { user, event } => (user.as_str(), event.as_str()),
    }
}

#[async_trait]
impl RelationRepository for SqliteGateway {
    async fn assert_relation(&self, key: &RelationKey) -> Result<(), AppError> {
        let statement = match key {
            RelationKey::Follow { .. } => INSERT_FOLLOW,
            RelationKey::SavedEvent { .. } => INSERT_SAVED_EVENT,
        };
        let (first, second) = relation_columns(key);
        sqlx::query(statement)
            .bind(first)
            .bind(second)
            .bind(Utc::now().timestamp_millis())
            .execute(self.pool.get_pool())
            .await?;
        Ok(())
    }

    async fn retract_relation(&self, key: &RelationKey) -> Result<(), AppError> {
        let statement = match key {
            RelationKey::Follow { .. } => DELETE_FOLLOW,
            RelationKey::SavedEvent { .. } => DELETE_SAVED_EVENT,
        };
        let (first, second) = relation_columns(key);
        sqlx::query(statement)
            .bind(first)
            .bind(second)
            .execute(self.pool.get_pool())
            .await?;
        Ok(())
    }

    async fn relation_exists(&self, key: &RelationKey) -> Result<bool, AppError> {
        let statement = match key {
            RelationKey::Follow { .. } => SELECT_FOLLOW_EXISTS,
            RelationKey::SavedEvent { .. } => SELECT_SAVED_EVENT_EXISTS,
        };
        let (first, second) = relation_columns(key);
        let exists: i64 = sqlx::query_scalar(statement)
            .bind(first)
            .bind(second)
            .fetch_one(self.pool.get_pool())
            .await?;
        Ok(exists != 0)
    }

    async fn count_relations(&self, count: &RelationCount) -> Result<u64, AppError> {
        let (statement, id) = match count {
            RelationCount::Followers(user) => (COUNT_FOLLOWERS, user.as_str()),
            RelationCount::Following(user) => (COUNT_FOLLOWING, user.as_str()),
            RelationCount::Saves(event) => (COUNT_SAVES, event.as_str()),
        };
        let total: i64 = sqlx::query_scalar(statement)
            .bind(id)
            .fetch_one(self.pool.get_pool())
            .await?;
        Ok(u64::try_from(total).unwrap_or_default())
    }

    async fn list_saved_events(&self, user: &UserId) -> Result<Vec<Event>, AppError> {
        let sql = format!(
            "{SELECT_EVENTS_WITH_CREATOR} \
             INNER JOIN saved_events s ON s.event_id = e.id \
             WHERE s.user_id = ?1 \
             ORDER BY e.start_datetime ASC"
        );
        let rows = sqlx::query_as::<_, EventRow>(&sql)
            .bind(user.as_str())
            .fetch_all(self.pool.get_pool())
            .await?;
        rows.into_iter().map(EventRow::into_domain).collect()
    }
}
