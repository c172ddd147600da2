use super::SessionContext;
use crate::application::ports::{CachedValue, CommentRepository, QueryCache, QueryKey};
use crate::application::shared::{Mutation, invalidate_after, read_through};
use crate::domain::entities::comment::COMMENT_MAX_CHARS;
use crate::domain::entities::{CommentWithAuthor, NewComment};
use crate::domain::value_objects::EventId;
use crate::shared::Result;
use crate::shared::validation::validate_text_body;
use std::sync::Arc;

pub struct CommentService {
    repository: Arc<dyn CommentRepository>,
    cache: Arc<dyn QueryCache>,
}

impl CommentService {
    pub fn new(repository: Arc<dyn CommentRepository>, cache: Arc<dyn QueryCache>) -> Self {
        Self { repository, cache }
    }

    /// 新しい順。
    pub async fn list_comments(&self, event: &EventId) -> Result<Vec<CommentWithAuthor>> {
        read_through(
            self.cache.as_ref(),
            QueryKey::Comments(event.clone()),
            CachedValue::into_comments,
            CachedValue::Comments,
            || self.repository.list_comments(event),
        )
        .await
    }

    pub async fn add_comment(
        &self,
        session: &SessionContext,
        event: &EventId,
        content: &str,
    ) -> Result<CommentWithAuthor> {
        let author = session.require_user()?;
        let content = validate_text_body("content", content, COMMENT_MAX_CHARS)?;
        let comment = self
            .repository
            .insert_comment(&NewComment {
                event_id: event.clone(),
                user_id: author,
                content,
            })
            .await?;
        invalidate_after(
            self.cache.as_ref(),
            &Mutation::AddComment {
                event: event.clone(),
            },
        );
        Ok(comment)
    }
}
