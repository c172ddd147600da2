use crate::application::ports::RealtimeChannel;
use crate::domain::entities::Message;
use crate::domain::value_objects::ConversationId;
use crate::shared::error::AppError;
use async_trait::async_trait;
use futures::StreamExt;
use futures::stream::{self, BoxStream};
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{trace, warn};

/// プロセス内の新着メッセージバス。ローカルバックエンドの書き込み側から publish される。
#[derive(Clone)]
pub struct BroadcastRealtime {
    sender: broadcast::Sender<Message>,
}

impl BroadcastRealtime {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn publish(&self, message: Message) {
        trace!(conversation_id = %message.conversation_id, "publishing message");
        // 購読者がいなければ捨てる
        let _ = self.sender.send(message);
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

#[async_trait]
impl RealtimeChannel for BroadcastRealtime {
    async fn subscribe_messages(
        &self,
        conversation: &ConversationId,
    ) -> Result<BoxStream<'static, Message>, AppError> {
        let receiver = self.sender.subscribe();
        let conversation = conversation.clone();

        let messages = stream::unfold(receiver, move |mut receiver| {
            let conversation = conversation.clone();
            async move {
                loop {
                    match receiver.recv().await {
                        Ok(message) if message.conversation_id == conversation => {
                            return Some((message, receiver));
                        }
                        Ok(_) => continue,
                        Err(RecvError::Lagged(skipped)) => {
                            warn!(
                                conversation_id = %conversation,
                                skipped,
                                "realtime subscriber lagged"
                            );
                        }
                        Err(RecvError::Closed) => return None,
                    }
                }
            }
        });

        Ok(messages.boxed())
    }
}
