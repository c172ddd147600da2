use super::{PendingToggle, RelationToggleController, SessionContext};
use crate::application::ports::{CachedValue, QueryCache, QueryKey, RelationRepository};
use crate::application::shared::read_through;
use crate::domain::entities::Event;
use crate::domain::value_objects::{EventId, RelationCount, RelationKey, UserId};
use crate::shared::Result;
use std::sync::Arc;

pub struct SavedEventService {
    toggles: RelationToggleController,
    repository: Arc<dyn RelationRepository>,
    cache: Arc<dyn QueryCache>,
}

impl SavedEventService {
    pub fn new(
        toggles: RelationToggleController,
        repository: Arc<dyn RelationRepository>,
        cache: Arc<dyn QueryCache>,
    ) -> Self {
        Self {
            toggles,
            repository,
            cache,
        }
    }

    fn key_for(session: &SessionContext, event: &EventId) -> Result<RelationKey> {
        Ok(RelationKey::saved_event(
            session.require_user()?,
            event.clone(),
        ))
    }

    pub async fn is_saved(&self, session: &SessionContext, event: &EventId) -> Result<bool> {
        self.toggles.load(&Self::key_for(session, event)?).await
    }

    pub fn begin_toggle_save(
        &self,
        session: &SessionContext,
        event: &EventId,
    ) -> Result<PendingToggle> {
        self.toggles.begin_toggle(&Self::key_for(session, event)?)
    }

    pub async fn toggle_save(&self, session: &SessionContext, event: &EventId) -> Result<bool> {
        self.toggles.toggle(&Self::key_for(session, event)?).await
    }

    pub fn is_toggle_pending(&self, session: &SessionContext, event: &EventId) -> bool {
        Self::key_for(session, event)
            .map(|key| self.toggles.is_pending(&key))
            .unwrap_or(false)
    }

    pub async fn saved_count(&self, event: &EventId) -> Result<u64> {
        self.toggles
            .load_count(&RelationCount::Saves(event.clone()))
            .await
    }

    /// ユーザーが保存したイベント一覧。
    pub async fn saved_events(&self, user: &UserId) -> Result<Vec<Event>> {
        read_through(
            self.cache.as_ref(),
            QueryKey::SavedEvents(user.clone()),
            CachedValue::into_events,
            CachedValue::Events,
            || self.repository.list_saved_events(user),
        )
        .await
    }
}
