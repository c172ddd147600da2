use crate::application::ports::query_cache::{Invalidation, QueryCache, QueryKey, QueryScope};
use crate::domain::value_objects::{ConversationId, EventId, RelationCount, RelationKey, UserId};
use tracing::debug;

/// キャッシュに影響する書き込み操作。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    SendMessage { conversation: ConversationId },
    CreateConversation,
    ToggleRelation(RelationKey),
    CreateEvent { creator: UserId },
    DeleteEvent { event: EventId },
    AddComment { event: EventId },
    ReportEvent,
    UpsertProfile { user: UserId },
}

/// 各書き込み操作が無効化すべきキーの一覧。ここに無いキーは操作後も有効とみなされる。
pub fn keys_affected_by(mutation: &Mutation) -> Vec<Invalidation> {
    match mutation {
        Mutation::SendMessage { conversation } => vec![
            Invalidation::Key(QueryKey::Messages(conversation.clone())),
            Invalidation::Scope(QueryScope::Conversations),
        ],
        Mutation::CreateConversation => vec![Invalidation::Scope(QueryScope::Conversations)],
        Mutation::ToggleRelation(key) => {
            let mut keys: Vec<Invalidation> = key
                .dependent_counts()
                .into_iter()
                .map(|count| Invalidation::Key(QueryKey::RelationCount(count)))
                .collect();
            if let RelationKey::SavedEvent { user, .. } = key {
                keys.push(Invalidation::Key(QueryKey::SavedEvents(user.clone())));
            }
            keys
        }
        Mutation::CreateEvent { creator } => vec![
            Invalidation::Scope(QueryScope::Events),
            Invalidation::Key(QueryKey::CreatedEvents(creator.clone())),
        ],
        // 保存フラグは (ユーザー, イベント) ごとのキーなのでスコープごと落とす
        Mutation::DeleteEvent { event } => vec![
            Invalidation::Scope(QueryScope::Events),
            Invalidation::Key(QueryKey::EventDetail(event.clone())),
            Invalidation::Scope(QueryScope::CreatedEvents),
            Invalidation::Scope(QueryScope::SavedEvents),
            Invalidation::Key(QueryKey::EventReports),
            Invalidation::Key(QueryKey::Comments(event.clone())),
            Invalidation::Key(QueryKey::RelationCount(RelationCount::Saves(event.clone()))),
            Invalidation::Scope(QueryScope::Relation),
        ],
        Mutation::AddComment { event } => {
            vec![Invalidation::Key(QueryKey::Comments(event.clone()))]
        }
        Mutation::ReportEvent => vec![Invalidation::Key(QueryKey::EventReports)],
        // 作成者・投稿者・送信者のプロフィールを結合して持つ一覧もすべて古くなる
        Mutation::UpsertProfile { user } => vec![
            Invalidation::Key(QueryKey::Profile(user.clone())),
            Invalidation::Key(QueryKey::Profiles),
            Invalidation::Scope(QueryScope::Conversations),
            Invalidation::Scope(QueryScope::Events),
            Invalidation::Scope(QueryScope::EventDetail),
            Invalidation::Scope(QueryScope::CreatedEvents),
            Invalidation::Scope(QueryScope::SavedEvents),
            Invalidation::Scope(QueryScope::Comments),
            Invalidation::Scope(QueryScope::Messages),
            Invalidation::Key(QueryKey::EventReports),
        ],
    }
}

pub fn invalidate_after(cache: &dyn QueryCache, mutation: &Mutation) {
    for invalidation in keys_affected_by(mutation) {
        debug!(?mutation, ?invalidation, "invalidating cached query");
        cache.apply(&invalidation);
    }
}
