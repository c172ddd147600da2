use super::SqliteGateway;
use super::mapper::{corrupt, joined_summary, timestamp};
use super::queries::{INSERT_COMMENT, SELECT_COMMENTS_WITH_AUTHOR, SELECT_COMMENT_WITH_AUTHOR};
use crate::application::ports::CommentRepository;
use crate::domain::entities::{Comment, CommentWithAuthor, NewComment};
use crate::domain::value_objects::{CommentId, EventId, UserId};
use crate::shared::error::AppError;
use async_trait::async_trait;
use chrono::Utc;
use sqlx::FromRow;

#[derive(Debug, FromRow)]
struct CommentRow {
    id: String,
    event_id: String,
    user_id: String,
    content: String,
    created_at: i64,
    author_username: Option<String>,
    author_avatar_url: Option<String>,
    author_full_name: Option<String>,
}

impl CommentRow {
    fn into_domain(self) -> Result<CommentWithAuthor, AppError> {
        let user_id = UserId::new(self.user_id).map_err(corrupt("user id"))?;
        let author = joined_summary(
            &user_id,
            self.author_username,
            self.author_avatar_url,
            self.author_full_name,
        );
        Ok(CommentWithAuthor {
            comment: Comment {
                id: CommentId::new(self.id).map_err(corrupt("comment id"))?,
                event_id: EventId::new(self.event_id).map_err(corrupt("event id"))?,
                user_id,
                content: self.content,
                created_at: timestamp(self.created_at)?,
            },
            author,
        })
    }
}

#[async_trait]
impl CommentRepository for SqliteGateway {
    async fn list_comments(&self, event: &EventId) -> Result<Vec<CommentWithAuthor>, AppError> {
        let rows = sqlx::query_as::<_, CommentRow>(SELECT_COMMENTS_WITH_AUTHOR)
            .bind(event.as_str())
            .fetch_all(self.pool.get_pool())
            .await?;
        rows.into_iter().map(CommentRow::into_domain).collect()
    }

    async fn insert_comment(&self, comment: &NewComment) -> Result<CommentWithAuthor, AppError> {
        let id = CommentId::generate();
        sqlx::query(INSERT_COMMENT)
            .bind(id.as_str())
            .bind(comment.event_id.as_str())
            .bind(comment.user_id.as_str())
            .bind(&comment.content)
            .bind(Utc::now().timestamp_millis())
            .execute(self.pool.get_pool())
            .await?;

        let row = sqlx::query_as::<_, CommentRow>(SELECT_COMMENT_WITH_AUTHOR)
            .bind(id.as_str())
            .fetch_one(self.pool.get_pool())
            .await?;
        row.into_domain()
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{seed_profile, setup_gateway};
    use super::*;

    #[tokio::test]
    async fn comments_are_listed_newest_first_with_author() {
        let gateway = setup_gateway().await;
        let alice = seed_profile(&gateway, "alice").await;
        let event = EventId::new("e1").unwrap();

        for content in ["premier", "second"] {
            gateway
                .insert_comment(&NewComment {
                    event_id: event.clone(),
                    user_id: alice.clone(),
                    content: content.to_string(),
                })
                .await
                .expect("insert");
        }
        let anonymous = gateway
            .insert_comment(&NewComment {
                event_id: event.clone(),
                user_id: UserId::new("ghost").unwrap(),
                content: "troisième".to_string(),
            })
            .await
            .expect("insert");
        assert!(anonymous.author.is_none());

        let comments = gateway.list_comments(&event).await.expect("list");
        let contents: Vec<&str> = comments
            .iter()
            .map(|c| c.comment.content.as_str())
            .collect();
        assert_eq!(contents, vec!["troisième", "second", "premier"]);
        assert_eq!(
            comments[1].author.as_ref().map(|a| a.username.as_str()),
            Some("alice")
        );
    }
}
