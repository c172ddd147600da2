use crate::domain::entities::{
    CommentWithAuthor, ConversationView, Event, MessageWithSender, Profile, ProfileSummary,
    ReportPage,
};
use crate::domain::value_objects::{
    ConversationId, EventId, RelationCount, RelationKey, UserId, Visibility,
};
use std::fmt;
use tokio::sync::broadcast;

/// プロセス共有キャッシュのキー。
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum QueryKey {
    Conversations(UserId),
    Messages(ConversationId),
    Relation(RelationKey),
    RelationCount(RelationCount),
    /// ホーム画面の件数制限付き一覧。
    Events(Visibility),
    /// 検索対象の公開イベント全件。
    EventCatalog,
    EventDetail(EventId),
    CreatedEvents(UserId),
    SavedEvents(UserId),
    Comments(EventId),
    Profile(UserId),
    Profiles,
    EventReports,
}

/// 前方一致での一括無効化に使うキーの種別。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryScope {
    Conversations,
    Messages,
    Relation,
    RelationCount,
    Events,
    EventDetail,
    CreatedEvents,
    SavedEvents,
    Comments,
    Profile,
    Profiles,
    EventReports,
}

impl QueryKey {
    pub fn scope(&self) -> QueryScope {
        match self {
            QueryKey::Conversations(_) => QueryScope::Conversations,
            QueryKey::Messages(_) => QueryScope::Messages,
            QueryKey::Relation(_) => QueryScope::Relation,
            QueryKey::RelationCount(_) => QueryScope::RelationCount,
            QueryKey::Events(_) | QueryKey::EventCatalog => QueryScope::Events,
            QueryKey::EventDetail(_) => QueryScope::EventDetail,
            QueryKey::CreatedEvents(_) => QueryScope::CreatedEvents,
            QueryKey::SavedEvents(_) => QueryScope::SavedEvents,
            QueryKey::Comments(_) => QueryScope::Comments,
            QueryKey::Profile(_) => QueryScope::Profile,
            QueryKey::Profiles => QueryScope::Profiles,
            QueryKey::EventReports => QueryScope::EventReports,
        }
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryKey::Conversations(user) => write!(f, "conversations:{user}"),
            QueryKey::Messages(conversation) => write!(f, "messages:{conversation}"),
            QueryKey::Relation(key) => write!(f, "relation:{key}"),
            QueryKey::RelationCount(count) => match count {
                RelationCount::Followers(user) => write!(f, "followers_count:{user}"),
                RelationCount::Following(user) => write!(f, "following_count:{user}"),
                RelationCount::Saves(event) => write!(f, "saves_count:{event}"),
            },
            QueryKey::Events(visibility) => write!(f, "events:{visibility}"),
            QueryKey::EventCatalog => f.write_str("events:catalog"),
            QueryKey::EventDetail(event) => write!(f, "event:{event}"),
            QueryKey::CreatedEvents(user) => write!(f, "created_events:{user}"),
            QueryKey::SavedEvents(user) => write!(f, "saved_events:{user}"),
            QueryKey::Comments(event) => write!(f, "comments:{event}"),
            QueryKey::Profile(user) => write!(f, "profile:{user}"),
            QueryKey::Profiles => f.write_str("profiles"),
            QueryKey::EventReports => f.write_str("event_reports"),
        }
    }
}

/// 無効化の単位。購読者にもこの形で通知される。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invalidation {
    Key(QueryKey),
    Scope(QueryScope),
    All,
}

impl Invalidation {
    pub fn matches(&self, key: &QueryKey) -> bool {
        match self {
            Invalidation::Key(target) => target == key,
            Invalidation::Scope(scope) => key.scope() == *scope,
            Invalidation::All => true,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CachedValue {
    Flag(bool),
    Count(u64),
    Conversations(Vec<ConversationView>),
    Messages(Vec<MessageWithSender>),
    Events(Vec<Event>),
    Event(Option<Event>),
    Comments(Vec<CommentWithAuthor>),
    Profile(Option<Profile>),
    Profiles(Vec<ProfileSummary>),
    Reports(ReportPage),
}

impl CachedValue {
    pub fn into_flag(self) -> Option<bool> {
        match self {
            CachedValue::Flag(value) => Some(value),
            _ => None,
        }
    }

    pub fn into_count(self) -> Option<u64> {
        match self {
            CachedValue::Count(value) => Some(value),
            _ => None,
        }
    }

    pub fn into_conversations(self) -> Option<Vec<ConversationView>> {
        match self {
            CachedValue::Conversations(value) => Some(value),
            _ => None,
        }
    }

    pub fn into_messages(self) -> Option<Vec<MessageWithSender>> {
        match self {
            CachedValue::Messages(value) => Some(value),
            _ => None,
        }
    }

    pub fn into_events(self) -> Option<Vec<Event>> {
        match self {
            CachedValue::Events(value) => Some(value),
            _ => None,
        }
    }

    pub fn into_event(self) -> Option<Option<Event>> {
        match self {
            CachedValue::Event(value) => Some(value),
            _ => None,
        }
    }

    pub fn into_comments(self) -> Option<Vec<CommentWithAuthor>> {
        match self {
            CachedValue::Comments(value) => Some(value),
            _ => None,
        }
    }

    pub fn into_profile(self) -> Option<Option<Profile>> {
        match self {
            CachedValue::Profile(value) => Some(value),
            _ => None,
        }
    }

    pub fn into_profiles(self) -> Option<Vec<ProfileSummary>> {
        match self {
            CachedValue::Profiles(value) => Some(value),
            _ => None,
        }
    }

    pub fn into_reports(self) -> Option<ReportPage> {
        match self {
            CachedValue::Reports(value) => Some(value),
            _ => None,
        }
    }
}

/// キーごとの無効化世代。無効化のたびに単調増加する。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct CacheGeneration(pub u64);

/// 一覧・詳細の取得結果を共有するキャッシュ。UI スレッドから同期的に読み書きできる。
pub trait QueryCache: Send + Sync {
    /// 期限切れのエントリはミス扱い。
    fn get(&self, key: &QueryKey) -> Option<CachedValue>;
    /// 楽観的更新など、無効化と競合しない書き込み用。
    fn set(&self, key: QueryKey, value: CachedValue);
    /// `key` に最後に効いた無効化の世代。取得開始前に控えておく。
    fn generation(&self, key: &QueryKey) -> CacheGeneration;
    /// 控えた世代以降に無効化が無かったときだけ書き込む。書き込んだら `true`。
    fn set_if_current(
        &self,
        key: QueryKey,
        generation: CacheGeneration,
        value: CachedValue,
    ) -> bool;
    fn invalidate(&self, key: &QueryKey);
    fn invalidate_scope(&self, scope: QueryScope);
    fn clear(&self);
    fn subscribe_invalidations(&self) -> broadcast::Receiver<Invalidation>;

    fn apply(&self, invalidation: &Invalidation) {
        match invalidation {
            Invalidation::Key(key) => self.invalidate(key),
            Invalidation::Scope(scope) => self.invalidate_scope(*scope),
            Invalidation::All => self.clear(),
        }
    }
}
