use super::SqliteGateway;
use super::mapper::{corrupt, joined_summary, participant_key, timestamp};
use super::queries::{
    INSERT_CONVERSATION, INSERT_MESSAGE, SELECT_CONVERSATION_BY_KEY,
    SELECT_CONVERSATIONS_FOR_USER, SELECT_LATEST_MESSAGE, SELECT_LATEST_MESSAGES_FOR_USER,
    SELECT_MESSAGES_WITH_SENDER, TOUCH_CONVERSATION,
};
use crate::application::ports::ConversationRepository;
use crate::domain::entities::{
    ConversationRecord, Message, MessageWithSender, NewMessage, ParticipantPair,
};
use crate::domain::value_objects::{ConversationId, MessageId, UserId};
use crate::shared::error::AppError;
use async_trait::async_trait;
use chrono::Utc;
use sqlx::FromRow;
use std::collections::HashMap;

#[derive(Debug, FromRow)]
struct ConversationRow {
    id: String,
    participant_ids: String,
    updated_at: i64,
}

impl ConversationRow {
    fn into_domain(self, messages: Vec<Message>) -> Result<ConversationRecord, AppError> {
        let participant_ids: ParticipantPair = serde_json::from_str(&self.participant_ids)
            .map_err(|err| corrupt("participant ids")(err.to_string()))?;
        Ok(ConversationRecord {
            id: ConversationId::new(self.id).map_err(corrupt("conversation id"))?,
            participant_ids,
            updated_at: timestamp(self.updated_at)?,
            messages,
        })
    }
}

#[derive(Debug, FromRow)]
struct MessageRow {
    id: String,
    conversation_id: String,
    sender_id: String,
    content: String,
    created_at: i64,
}

impl MessageRow {
    fn into_domain(self) -> Result<Message, AppError> {
        Ok(Message {
            id: MessageId::new(self.id).map_err(corrupt("message id"))?,
            conversation_id: ConversationId::new(self.conversation_id)
                .map_err(corrupt("conversation id"))?,
            sender_id: UserId::new(self.sender_id).map_err(corrupt("user id"))?,
            content: self.content,
            created_at: timestamp(self.created_at)?,
        })
    }
}

#[derive(Debug, FromRow)]
struct MessageWithSenderRow {
    #[sqlx(flatten)]
    message: MessageRow,
    sender_username: Option<String>,
    sender_avatar_url: Option<String>,
    sender_full_name: Option<String>,
}

impl MessageWithSenderRow {
    fn into_domain(self) -> Result<MessageWithSender, AppError> {
        let message = self.message.into_domain()?;
        let sender = joined_summary(
            &message.sender_id,
            self.sender_username,
            self.sender_avatar_url,
            self.sender_full_name,
        );
        Ok(MessageWithSender { message, sender })
    }
}

impl SqliteGateway {
    async fn latest_message(&self, conversation: &str) -> Result<Vec<Message>, AppError> {
        let row = sqlx::query_as::<_, MessageRow>(SELECT_LATEST_MESSAGE)
            .bind(conversation)
            .fetch_optional(self.pool.get_pool())
            .await?;
        row.map(MessageRow::into_domain).into_iter().collect()
    }

    /// ユーザーの全会話の最新メッセージを 1 クエリで引く。キーは会話 ID。
    async fn latest_messages_for(
        &self,
        user: &UserId,
    ) -> Result<HashMap<String, Message>, AppError> {
        let rows = sqlx::query_as::<_, MessageRow>(SELECT_LATEST_MESSAGES_FOR_USER)
            .bind(user.as_str())
            .fetch_all(self.pool.get_pool())
            .await?;
        rows.into_iter()
            .map(|row| {
                let conversation = row.conversation_id.clone();
                row.into_domain().map(|message| (conversation, message))
            })
            .collect()
    }
}

#[async_trait]
impl ConversationRepository for SqliteGateway {
    async fn list_conversations(
        &self,
        user: &UserId,
    ) -> Result<Vec<ConversationRecord>, AppError> {
        let rows = sqlx::query_as::<_, ConversationRow>(SELECT_CONVERSATIONS_FOR_USER)
            .bind(user.as_str())
            .fetch_all(self.pool.get_pool())
            .await?;

        if rows.is_empty() {
            return Ok(Vec::new());
        }
        let mut latest = self.latest_messages_for(user).await?;
        rows.into_iter()
            .map(|row| {
                let messages = latest.remove(&row.id).into_iter().collect();
                row.into_domain(messages)
            })
            .collect()
    }

    async fn find_conversation_between(
        &self,
        participants: &ParticipantPair,
    ) -> Result<Option<ConversationRecord>, AppError> {
        let key = participant_key(participants.as_slice())?;
        let row = sqlx::query_as::<_, ConversationRow>(SELECT_CONVERSATION_BY_KEY)
            .bind(&key)
            .fetch_optional(self.pool.get_pool())
            .await?;
        match row {
            Some(row) => {
                let messages = self.latest_message(&row.id).await?;
                row.into_domain(messages).map(Some)
            }
            None => Ok(None),
        }
    }

    async fn create_conversation(
        &self,
        participants: &ParticipantPair,
    ) -> Result<ConversationRecord, AppError> {
        let key = participant_key(participants.as_slice())?;
        let ids = serde_json::to_string(participants)?;
        sqlx::query(INSERT_CONVERSATION)
            .bind(ConversationId::generate().as_str())
            .bind(&ids)
            .bind(&key)
            .bind(Utc::now().timestamp_millis())
            .execute(self.pool.get_pool())
            .await?;

        // 同じペアが先に作られていた場合はそちらを返す
        self.find_conversation_between(participants)
            .await?
            .ok_or_else(|| AppError::Internal("Created conversation is missing".to_string()))
    }

    async fn list_messages(
        &self,
        conversation: &ConversationId,
    ) -> Result<Vec<MessageWithSender>, AppError> {
        let rows = sqlx::query_as::<_, MessageWithSenderRow>(SELECT_MESSAGES_WITH_SENDER)
            .bind(conversation.as_str())
            .fetch_all(self.pool.get_pool())
            .await?;
        rows.into_iter()
            .map(MessageWithSenderRow::into_domain)
            .collect()
    }

    async fn insert_message(&self, message: &NewMessage) -> Result<Message, AppError> {
        let stored = Message {
            id: MessageId::generate(),
            conversation_id: message.conversation_id.clone(),
            sender_id: message.sender_id.clone(),
            content: message.content.clone(),
            created_at: Utc::now(),
        };
        let created_at = stored.created_at.timestamp_millis();

        let mut tx = self.pool.get_pool().begin().await?;
        let touched = sqlx::query(TOUCH_CONVERSATION)
            .bind(stored.conversation_id.as_str())
            .bind(created_at)
            .execute(&mut *tx)
            .await?;
        if touched.rows_affected() == 0 {
            return Err(AppError::NotFound(format!(
                "Conversation not found: {}",
                stored.conversation_id
            )));
        }
        sqlx::query(INSERT_MESSAGE)
            .bind(stored.id.as_str())
            .bind(stored.conversation_id.as_str())
            .bind(stored.sender_id.as_str())
            .bind(&stored.content)
            .bind(created_at)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        self.realtime.publish(stored.clone());
        Ok(stored)
    }
}
