use crate::domain::entities::{
    CommentWithAuthor, ConversationRecord, Event, EventReport, Message, MessageWithSender,
    NewComment, NewEvent, NewEventReport, NewMessage, ParticipantPair, Profile, ProfileSummary,
    ReportPage,
};
use crate::domain::value_objects::{
    ConversationId, EventId, RelationCount, RelationKey, UserId, Visibility,
};
use crate::shared::error::AppError;
use async_trait::async_trait;

/// イベント一覧取得の条件。結果は常に開催日時の早い順。
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EventQuery {
    pub visibility: Option<Visibility>,
    pub creator: Option<UserId>,
    pub limit: Option<usize>,
}

impl EventQuery {
    pub fn by_visibility(visibility: Visibility) -> Self {
        Self {
            visibility: Some(visibility),
            ..Default::default()
        }
    }

    pub fn created_by(creator: UserId) -> Self {
        Self {
            creator: Some(creator),
            ..Default::default()
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

#[async_trait]
pub trait ProfileRepository: Send + Sync {
    async fn get_profile(&self, id: &UserId) -> Result<Option<Profile>, AppError>;
    /// 複数ユーザーをまとめて引く。見つからない ID は結果に含まれない。
    async fn get_profile_summaries(&self, ids: &[UserId])
    -> Result<Vec<ProfileSummary>, AppError>;
    async fn list_profile_summaries(&self) -> Result<Vec<ProfileSummary>, AppError>;
    async fn upsert_profile(&self, profile: &Profile) -> Result<(), AppError>;
}

#[async_trait]
pub trait EventRepository: Send + Sync {
    async fn insert_event(&self, event: &NewEvent) -> Result<Event, AppError>;
    async fn get_event(&self, id: &EventId) -> Result<Option<Event>, AppError>;
    async fn list_events(&self, query: &EventQuery) -> Result<Vec<Event>, AppError>;
    /// 関連する保存・コメント・通報もまとめて削除する。
    async fn delete_event(&self, id: &EventId) -> Result<(), AppError>;
}

/// フォロー・保存など、行の有無で表す真偽リレーション。
#[async_trait]
pub trait RelationRepository: Send + Sync {
    async fn assert_relation(&self, key: &RelationKey) -> Result<(), AppError>;
    async fn retract_relation(&self, key: &RelationKey) -> Result<(), AppError>;
    async fn relation_exists(&self, key: &RelationKey) -> Result<bool, AppError>;
    async fn count_relations(&self, count: &RelationCount) -> Result<u64, AppError>;
    async fn list_saved_events(&self, user: &UserId) -> Result<Vec<Event>, AppError>;
}

#[async_trait]
pub trait ConversationRepository: Send + Sync {
    /// `user` が参加している会話を `updated_at` の新しい順で返す。
    async fn list_conversations(&self, user: &UserId)
    -> Result<Vec<ConversationRecord>, AppError>;
    async fn find_conversation_between(
        &self,
        participants: &ParticipantPair,
    ) -> Result<Option<ConversationRecord>, AppError>;
    async fn create_conversation(
        &self,
        participants: &ParticipantPair,
    ) -> Result<ConversationRecord, AppError>;
    /// 古い順。
    async fn list_messages(
        &self,
        conversation: &ConversationId,
    ) -> Result<Vec<MessageWithSender>, AppError>;
    async fn insert_message(&self, message: &NewMessage) -> Result<Message, AppError>;
}

#[async_trait]
pub trait CommentRepository: Send + Sync {
    async fn list_comments(&self, event: &EventId) -> Result<Vec<CommentWithAuthor>, AppError>;
    async fn insert_comment(&self, comment: &NewComment) -> Result<CommentWithAuthor, AppError>;
}

#[async_trait]
pub trait ReportRepository: Send + Sync {
    async fn insert_report(&self, report: &NewEventReport) -> Result<EventReport, AppError>;
    /// `page` は 0 始まり。
    async fn list_reports(&self, page: u32, page_size: u32) -> Result<ReportPage, AppError>;
}
