use super::SessionContext;
use crate::application::ports::{
    BlobStorage, CachedValue, ImageUpload, ProfileRepository, QueryCache, QueryKey,
};
use crate::application::shared::{Mutation, invalidate_after, read_through};
use crate::domain::entities::{Profile, ProfileDraft, ProfileSummary};
use crate::domain::value_objects::UserId;
use crate::shared::{AppError, Result};
use bytes::Bytes;
use chrono::Utc;
use std::sync::Arc;
use tracing::info;

pub struct ProfileService {
    repository: Arc<dyn ProfileRepository>,
    blobs: Arc<dyn BlobStorage>,
    cache: Arc<dyn QueryCache>,
    avatar_bucket: String,
}

impl ProfileService {
    pub fn new(
        repository: Arc<dyn ProfileRepository>,
        blobs: Arc<dyn BlobStorage>,
        cache: Arc<dyn QueryCache>,
        avatar_bucket: impl Into<String>,
    ) -> Self {
        Self {
            repository,
            blobs,
            cache,
            avatar_bucket: avatar_bucket.into(),
        }
    }

    pub async fn find_profile(&self, id: &UserId) -> Result<Option<Profile>> {
        read_through(
            self.cache.as_ref(),
            QueryKey::Profile(id.clone()),
            CachedValue::into_profile,
            CachedValue::Profile,
            || self.repository.get_profile(id),
        )
        .await
    }

    pub async fn get_profile(&self, id: &UserId) -> Result<Profile> {
        self.find_profile(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Profile not found: {id}")))
    }

    /// プロフィール未作成（サインアップ直後）なら `None`。
    pub async fn current_profile(&self, session: &SessionContext) -> Result<Option<Profile>> {
        let user = session.require_user()?;
        self.find_profile(&user).await
    }

    /// サインアップ後のプロフィール補完。アバターは `{user}/{millis}.{ext}` に保存する。
    pub async fn complete_profile(
        &self,
        session: &SessionContext,
        draft: ProfileDraft,
        avatar: Option<ImageUpload>,
    ) -> Result<Profile> {
        let user = session.require_user()?;
        draft.validate()?;
        let existing = self.repository.get_profile(&user).await?;

        let avatar_path = match avatar {
            Some(image) => {
                let path = format!(
                    "{user}/{}.{}",
                    Utc::now().timestamp_millis(),
                    image.extension()
                );
                let stored = self
                    .blobs
                    .upload(&self.avatar_bucket, &path, image.bytes, &image.content_type)
                    .await?;
                Some(stored)
            }
            None => None,
        };

        let profile = draft.into_profile(user.clone(), avatar_path, existing.as_ref());
        self.repository.upsert_profile(&profile).await?;
        info!(user_id = %user, "profile saved");
        invalidate_after(self.cache.as_ref(), &Mutation::UpsertProfile { user });
        Ok(profile)
    }

    pub async fn download_avatar(&self, path: &str) -> Result<Bytes> {
        self.blobs.download(&self.avatar_bucket, path).await
    }

    pub async fn list_users(&self) -> Result<Vec<ProfileSummary>> {
        read_through(
            self.cache.as_ref(),
            QueryKey::Profiles,
            CachedValue::into_profiles,
            CachedValue::Profiles,
            || self.repository.list_profile_summaries(),
        )
        .await
    }
}
