use super::{EventId, UserId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// 結合テーブル上の真偽リレーション（行の存在 = true）。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RelationKey {
    Follow { follower: UserId, following: UserId },
    SavedEvent { user: UserId, event: EventId },
}

impl RelationKey {
    pub fn follow(follower: UserId, following: UserId) -> Self {
        RelationKey::Follow {
            follower,
            following,
        }
    }

    pub fn saved_event(user: UserId, event: EventId) -> Self {
        RelationKey::SavedEvent { user, event }
    }

    /// リレーションを作成・削除するユーザー。
    pub fn actor(&self) -> &UserId {
        match self {
            RelationKey::Follow { follower, .. } => follower,
            RelationKey::SavedEvent { user, .. } => user,
        }
    }

    /// トグルによって値が変わりうるカウンター。
    pub fn dependent_counts(&self) -> Vec<RelationCount> {
        match self {
            RelationKey::Follow {
                follower,
                following,
            } => vec![
                RelationCount::Followers(following.clone()),
                RelationCount::Following(follower.clone()),
            ],
            RelationKey::SavedEvent { event, .. } => vec![RelationCount::Saves(event.clone())],
        }
    }
}

impl fmt::Display for RelationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RelationKey::Follow {
                follower,
                following,
            } => write!(f, "follow:{follower}->{following}"),
            RelationKey::SavedEvent { user, event } => write!(f, "saved:{user}->{event}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum RelationCount {
    /// 指定ユーザーをフォローしている人数。
    Followers(UserId),
    /// 指定ユーザーがフォローしている人数。
    Following(UserId),
    /// イベントを保存した人数。
    Saves(EventId),
}
