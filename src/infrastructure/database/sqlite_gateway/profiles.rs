use super::SqliteGateway;
use super::mapper::{corrupt, timestamp};
use super::queries::{SELECT_PROFILE_BY_ID, SELECT_PROFILE_SUMMARIES, UPSERT_PROFILE};
use crate::application::ports::ProfileRepository;
use crate::domain::entities::{Profile, ProfileSummary};
use crate::domain::value_objects::UserId;
use crate::shared::error::AppError;
use async_trait::async_trait;
use sqlx::{FromRow, QueryBuilder, Sqlite};

#[derive(Debug, FromRow)]
struct ProfileRow {
    id: String,
    username: String,
    bio: Option<String>,
    avatar_url: Option<String>,
    full_name: Option<String>,
    created_at: i64,
    updated_at: i64,
}

impl ProfileRow {
    fn into_domain(self) -> Result<Profile, AppError> {
        Ok(Profile {
            id: UserId::new(self.id).map_err(corrupt("user id"))?,
            username: self.username,
            bio: self.bio,
            avatar_url: self.avatar_url,
            full_name: self.full_name,
            created_at: timestamp(self.created_at)?,
            updated_at: timestamp(self.updated_at)?,
        })
    }
}

#[derive(Debug, FromRow)]
struct ProfileSummaryRow {
    id: String,
    username: String,
    avatar_url: Option<String>,
    full_name: Option<String>,
}

impl ProfileSummaryRow {
    fn into_domain(self) -> Result<ProfileSummary, AppError> {
        Ok(ProfileSummary {
            id: UserId::new(self.id).map_err(corrupt("user id"))?,
            username: self.username,
            avatar_url: self.avatar_url,
            full_name: self.full_name,
        })
    }
}

#[async_trait]
impl ProfileRepository for SqliteGateway {
    async fn get_profile(&self, id: &UserId) -> Result<Option<Profile>, AppError> {
        let row = sqlx::query_as::<_, ProfileRow>(SELECT_PROFILE_BY_ID)
            .bind(id.as_str())
            .fetch_optional(self.pool.get_pool())
            .await?;
        row.map(ProfileRow::into_domain).transpose()
    }

    async fn get_profile_summaries(
        &self,
        ids: &[UserId],
    ) -> Result<Vec<ProfileSummary>, AppError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(
            "SELECT id, username, avatar_url, full_name FROM profiles WHERE id IN (",
        );
        let mut separated = builder.separated(", ");
        for id in ids {
            separated.push_bind(id.as_str());
        }
        separated.push_unseparated(")");

        let rows = builder
            .build_query_as::<ProfileSummaryRow>()
            .fetch_all(self.pool.get_pool())
            .await?;
        rows.into_iter().map(ProfileSummaryRow::into_domain).collect()
    }

    async fn list_profile_summaries(&self) -> Result<Vec<ProfileSummary>, AppError> {
        let rows = sqlx::query_as::<_, ProfileSummaryRow>(SELECT_PROFILE_SUMMARIES)
            .fetch_all(self.pool.get_pool())
            .await?;
        rows.into_iter().map(ProfileSummaryRow::into_domain).collect()
    }

    async fn upsert_profile(&self, profile: &Profile) -> Result<(), AppError> {
        sqlx::query(UPSERT_PROFILE)
            .bind(profile.id.as_str())
            .bind(&profile.username)
            .bind(profile.bio.as_deref())
            .bind(profile.avatar_url.as_deref())
            .bind(profile.full_name.as_deref())
            .bind(profile.created_at.timestamp_millis())
            .bind(profile.updated_at.timestamp_millis())
            .execute(self.pool.get_pool())
            .await?;
        Ok(())
    }
}
