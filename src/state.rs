use crate::application::ports::{
    AuthGateway, BlobStorage, CommentRepository, ConversationRepository, EventRepository,
    ProfileRepository, QueryCache, RealtimeChannel, RelationRepository, ReportRepository,
};
use crate::application::services::{
    CommentService, ConversationService, EventSearchService, EventService, EventServiceSettings,
    FollowService, ProfileService, RelationToggleController, SavedEventService, SessionContext,
};
use crate::infrastructure::{
    BroadcastRealtime, ConnectionPool, FileBlobStorage, LocalAuthGateway, LruQueryCache,
    SqliteGateway,
};
use crate::shared::AppConfig;
use anyhow::Context;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// サービスが依存する外部ポート一式。
#[derive(Clone)]
pub struct AppPorts {
    pub profiles: Arc<dyn ProfileRepository>,
    pub events: Arc<dyn EventRepository>,
    pub relations: Arc<dyn RelationRepository>,
    pub conversations: Arc<dyn ConversationRepository>,
    pub comments: Arc<dyn CommentRepository>,
    pub reports: Arc<dyn ReportRepository>,
    pub realtime: Arc<dyn RealtimeChannel>,
    pub blobs: Arc<dyn BlobStorage>,
    pub auth: Arc<dyn AuthGateway>,
}

impl AppPorts {
    /// 1 つのゲートウェイがすべてのリポジトリを兼ねる場合の組み立て。
    pub fn from_gateway<G>(
        gateway: Arc<G>,
        realtime: Arc<dyn RealtimeChannel>,
        blobs: Arc<dyn BlobStorage>,
        auth: Arc<dyn AuthGateway>,
    ) -> Self
    where
        G: ProfileRepository
            + EventRepository
            + RelationRepository
            + ConversationRepository
            + CommentRepository
            + ReportRepository
            + 'static,
    {
        Self {
            profiles: gateway.clone(),
            events: gateway.clone(),
            relations: gateway.clone(),
            conversations: gateway.clone(),
            comments: gateway.clone(),
            reports: gateway,
            realtime,
            blobs,
            auth,
        }
    }
}

/// アプリケーション全体の状態を管理する構造体
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub cache: Arc<dyn QueryCache>,
    pub session: Arc<SessionContext>,
    pub conversations: Arc<ConversationService>,
    pub follows: Arc<FollowService>,
    pub saved_events: Arc<SavedEventService>,
    pub events: Arc<EventService>,
    pub search: Arc<EventSearchService>,
    pub comments: Arc<CommentService>,
    pub profiles: Arc<ProfileService>,
}

impl AppState {
    /// ローカルバックエンド（SQLite・ファイルストレージ・ローカル認証）で起動する。
    pub async fn new(config: AppConfig) -> anyhow::Result<Self> {
        config
            .validate()
            .map_err(|err| anyhow::anyhow!("Invalid configuration: {err}"))?;
        tokio::fs::create_dir_all(&config.storage.data_dir)
            .await
            .with_context(|| {
                format!(
                    "Failed to create data dir {}",
                    config.storage.data_dir.display()
                )
            })?;

        let pool = ConnectionPool::new(&config.database.url, config.database.max_connections)
            .await
            .context("Failed to open database")?;
        pool.migrate().await.context("Failed to run migrations")?;

        let realtime = BroadcastRealtime::new(config.messaging.realtime_channel_capacity);
        let gateway = Arc::new(SqliteGateway::new(pool.clone(), realtime.clone()));
        let blobs = Arc::new(
            FileBlobStorage::new(config.blob_root(), config.storage.public_base_url.clone())
                .await?,
        );
        let auth = Arc::new(LocalAuthGateway::new(
            pool,
            Duration::from_secs(config.auth.session_ttl_secs),
        ));

        let ports = AppPorts::from_gateway(gateway, Arc::new(realtime), blobs, auth);
        let state = Self::from_parts(config, ports);
        let _ = state.session.spawn_listener();
        state.session.initialize().await?;
        info!(state = ?state.session.state(), "application state ready");
        Ok(state)
    }

    /// 任意のポート実装からサービスを組み立てる。
    pub fn from_parts(config: AppConfig, ports: AppPorts) -> Self {
        let cache: Arc<dyn QueryCache> = Arc::new(LruQueryCache::new(
            config.cache.capacity,
            Duration::from_secs(config.cache.ttl_secs),
            config.cache.invalidation_channel_capacity,
        ));
        let session = Arc::new(SessionContext::new(ports.auth.clone(), cache.clone()));
        let toggles = RelationToggleController::new(ports.relations.clone(), cache.clone());

        Self {
            conversations: Arc::new(ConversationService::new(
                ports.conversations.clone(),
                ports.profiles.clone(),
                ports.realtime.clone(),
                cache.clone(),
            )),
            follows: Arc::new(FollowService::new(toggles.clone())),
            saved_events: Arc::new(SavedEventService::new(
                toggles,
                ports.relations.clone(),
                cache.clone(),
            )),
            events: Arc::new(EventService::new(
                ports.events.clone(),
                ports.reports.clone(),
                ports.blobs.clone(),
                cache.clone(),
                EventServiceSettings::from_config(&config),
            )),
            search: Arc::new(EventSearchService::new(
                ports.events.clone(),
                ports.profiles.clone(),
                cache.clone(),
            )),
            comments: Arc::new(CommentService::new(ports.comments.clone(), cache.clone())),
            profiles: Arc::new(ProfileService::new(
                ports.profiles,
                ports.blobs,
                cache.clone(),
                config.storage.avatar_bucket.clone(),
            )),
            session,
            cache,
            config,
        }
    }
}
