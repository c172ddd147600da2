use super::SessionContext;
use crate::application::ports::{
    CachedValue, ConversationRepository, ProfileRepository, QueryCache, QueryKey, RealtimeChannel,
};
use crate::application::shared::{Mutation, invalidate_after, read_through};
use crate::domain::entities::message::MESSAGE_MAX_CHARS;
use crate::domain::entities::{
    ConversationRecord, ConversationView, Message, MessageWithSender, NewMessage, Participant,
    ParticipantPair, ProfileSummary,
};
use crate::domain::value_objects::{ConversationId, UserId};
use crate::shared::validation::validate_text_body;
use crate::shared::{AppError, Result, ValidationFailureKind};
use futures::StreamExt;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// 生の会話行を表示用レコードに変換する。
///
/// `profiles` に相手のプロフィールが無ければ `Participant::Unknown` になる。
/// `current_user` が参加者でない行はエラー。
pub fn normalize_conversation(
    record: ConversationRecord,
    current_user: &UserId,
    profiles: &HashMap<UserId, ProfileSummary>,
) -> Result<ConversationView> {
    let other_id = record
        .participant_ids
        .other_than(current_user)
        .cloned()
        .ok_or_else(|| {
            AppError::InvalidInput(format!(
                "User {current_user} is not a participant of conversation {}",
                record.id
            ))
        })?;
    let other_user = match profiles.get(&other_id) {
        Some(profile) => Participant::Known(profile.clone()),
        None => Participant::Unknown { id: other_id },
    };
    let last_message = record.messages.into_iter().next();
    Ok(ConversationView {
        id: record.id,
        participant_ids: record.participant_ids,
        updated_at: record.updated_at,
        other_user,
        last_message,
    })
}

pub struct ConversationService {
    repository: Arc<dyn ConversationRepository>,
    profiles: Arc<dyn ProfileRepository>,
    realtime: Arc<dyn RealtimeChannel>,
    cache: Arc<dyn QueryCache>,
}

impl ConversationService {
    pub fn new(
        repository: Arc<dyn ConversationRepository>,
        profiles: Arc<dyn ProfileRepository>,
        realtime: Arc<dyn RealtimeChannel>,
        cache: Arc<dyn QueryCache>,
    ) -> Self {
        Self {
            repository,
            profiles,
            realtime,
            cache,
        }
    }

    /// ログインユーザーの会話一覧（更新の新しい順）。
    pub async fn list_conversations(
        &self,
        session: &SessionContext,
    ) -> Result<Vec<ConversationView>> {
        let user = session.require_user()?;
        read_through(
            self.cache.as_ref(),
            QueryKey::Conversations(user.clone()),
            CachedValue::into_conversations,
            CachedValue::Conversations,
            || self.build_conversation_list(&user),
        )
        .await
    }

    async fn build_conversation_list(&self, user: &UserId) -> Result<Vec<ConversationView>> {
        let records = self.repository.list_conversations(user).await?;
        let other_ids: BTreeSet<UserId> = records
            .iter()
            .filter_map(|record| record.participant_ids.other_than(user).cloned())
            .collect();
        let profiles = self.lookup_profiles(other_ids.into_iter().collect()).await;

        let mut views: Vec<ConversationView> = records
            .into_iter()
            .filter_map(|record| {
                let id = record.id.clone();
                match normalize_conversation(record, user, &profiles) {
                    Ok(view) => Some(view),
                    Err(err) => {
                        warn!(conversation_id = %id, error = %err, "skipping conversation");
                        None
                    }
                }
            })
            .collect();
        views.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        debug!(user_id = %user, count = views.len(), "conversation list built");
        Ok(views)
    }

    /// 相手ごとに 1 回だけ引く。失敗しても一覧は返し、相手は Unknown として扱う。
    async fn lookup_profiles(&self, ids: Vec<UserId>) -> HashMap<UserId, ProfileSummary> {
        if ids.is_empty() {
            return HashMap::new();
        }
        match self.profiles.get_profile_summaries(&ids).await {
            Ok(summaries) => summaries
                .into_iter()
                .map(|summary| (summary.id.clone(), summary))
                .collect(),
            Err(err) => {
                warn!(count = ids.len(), error = %err, "participant profile lookup failed");
                HashMap::new()
            }
        }
    }

    /// 既存の会話があればそれを、無ければ新規作成して返す。
    pub async fn open_conversation_with(
        &self,
        session: &SessionContext,
        other: &UserId,
    ) -> Result<ConversationRecord> {
        let user = session.require_user()?;
        if &user == other {
            return Err(AppError::validation(
                ValidationFailureKind::Generic,
                "Cannot start a conversation with yourself",
            ));
        }
        let pair = ParticipantPair::new(user, other.clone()).map_err(AppError::InvalidInput)?;

        if let Some(existing) = self.repository.find_conversation_between(&pair).await? {
            debug!(conversation_id = %existing.id, "reusing existing conversation");
            return Ok(existing);
        }

        let created = self.repository.create_conversation(&pair).await?;
        invalidate_after(self.cache.as_ref(), &Mutation::CreateConversation);
        Ok(created)
    }

    pub async fn list_messages(
        &self,
        conversation: &ConversationId,
    ) -> Result<Vec<MessageWithSender>> {
        read_through(
            self.cache.as_ref(),
            QueryKey::Messages(conversation.clone()),
            CachedValue::into_messages,
            CachedValue::Messages,
            || self.repository.list_messages(conversation),
        )
        .await
    }

    pub async fn send_message(
        &self,
        session: &SessionContext,
        conversation: &ConversationId,
        content: &str,
    ) -> Result<Message> {
        let sender = session.require_user()?;
        let content = validate_text_body("content", content, MESSAGE_MAX_CHARS)?;
        let message = self
            .repository
            .insert_message(&NewMessage {
                conversation_id: conversation.clone(),
                sender_id: sender,
                content,
            })
            .await?;
        invalidate_after(
            self.cache.as_ref(),
            &Mutation::SendMessage {
                conversation: conversation.clone(),
            },
        );
        Ok(message)
    }

    /// 会話の新着メッセージを購読する。受信のたびに関連キャッシュを無効化する。
    pub async fn watch_conversation(&self, conversation: &ConversationId) -> Result<RealtimeWatch> {
        let mut stream = self.realtime.subscribe_messages(conversation).await?;
        let (tx, rx) = mpsc::unbounded_channel();
        let cache = Arc::clone(&self.cache);
        let mutation = Mutation::SendMessage {
            conversation: conversation.clone(),
        };
        let task = tokio::spawn(async move {
            while let Some(message) = stream.next().await {
                debug!(message_id = %message.id, "realtime message received");
                invalidate_after(cache.as_ref(), &mutation);
                if tx.send(message).is_err() {
                    break;
                }
            }
        });
        Ok(RealtimeWatch { task, messages: rx })
    }
}

/// 会話の購読ハンドル。破棄すると購読を解除する。
pub struct RealtimeWatch {
    task: JoinHandle<()>,
    messages: mpsc::UnboundedReceiver<Message>,
}

impl RealtimeWatch {
    pub async fn next_message(&mut self) -> Option<Message> {
        self.messages.recv().await
    }
}

impl Drop for RealtimeWatch {
    fn drop(&mut self) {
        self.task.abort();
    }
}
