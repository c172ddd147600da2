use super::{PendingToggle, RelationToggleController, SessionContext};
use crate::domain::value_objects::{RelationCount, RelationKey, UserId};
use crate::shared::{AppError, Result, ValidationFailureKind};

pub struct FollowService {
    toggles: RelationToggleController,
}

impl FollowService {
    pub fn new(toggles: RelationToggleController) -> Self {
        Self { toggles }
    }

    fn key_for(&self, session: &SessionContext, target: &UserId) -> Result<RelationKey> {
        let follower = session.require_user()?;
        if &follower == target {
            return Err(AppError::validation(
                ValidationFailureKind::Generic,
                "You cannot follow yourself",
            ));
        }
        Ok(RelationKey::follow(follower, target.clone()))
    }

    pub async fn is_following(&self, session: &SessionContext, target: &UserId) -> Result<bool> {
        let key = self.key_for(session, target)?;
        self.toggles.load(&key).await
    }

    /// 表示中の値を即座に反転する。値は `is_following` で読み込み済みであること。
    pub fn begin_toggle_follow(
        &self,
        session: &SessionContext,
        target: &UserId,
    ) -> Result<PendingToggle> {
        let key = self.key_for(session, target)?;
        self.toggles.begin_toggle(&key)
    }

    pub async fn toggle_follow(&self, session: &SessionContext, target: &UserId) -> Result<bool> {
        let key = self.key_for(session, target)?;
        self.toggles.toggle(&key).await
    }

    pub fn is_toggle_pending(&self, session: &SessionContext, target: &UserId) -> bool {
        self.key_for(session, target)
            .map(|key| self.toggles.is_pending(&key))
            .unwrap_or(false)
    }

    pub async fn followers_count(&self, user: &UserId) -> Result<u64> {
        self.toggles
            .load_count(&RelationCount::Followers(user.clone()))
            .await
    }

    pub async fn following_count(&self, user: &UserId) -> Result<u64> {
        self.toggles
            .load_count(&RelationCount::Following(user.clone()))
            .await
    }
}
