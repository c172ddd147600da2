use super::ProfileSummary;
use crate::domain::value_objects::{CommentId, EventId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const COMMENT_MAX_CHARS: usize = 1000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: CommentId,
    pub event_id: EventId,
    pub user_id: UserId,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentWithAuthor {
    pub comment: Comment,
    pub author: Option<ProfileSummary>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewComment {
    pub event_id: EventId,
    pub user_id: UserId,
    pub content: String,
}
