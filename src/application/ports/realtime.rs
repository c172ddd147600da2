use crate::domain::entities::Message;
use crate::domain::value_objects::ConversationId;
use crate::shared::error::AppError;
use async_trait::async_trait;
use futures::stream::BoxStream;

/// 新着メッセージのプッシュ配信。ストリームを破棄すると購読解除になる。
#[async_trait]
pub trait RealtimeChannel: Send + Sync {
    async fn subscribe_messages(
        &self,
        conversation: &ConversationId,
    ) -> Result<BoxStream<'static, Message>, AppError>;
}
