use super::SessionContext;
use crate::application::ports::{
    BlobStorage, CachedValue, EventQuery, EventRepository, ImageUpload, QueryCache, QueryKey,
    ReportRepository,
};
use crate::application::shared::{Mutation, invalidate_after, read_through};
use crate::domain::entities::event_report::REPORT_REASON_MAX_CHARS;
use crate::domain::entities::{Event, EventDraft, EventReport, NewEventReport, ReportPage};
use crate::domain::value_objects::{EventId, UserId, Visibility};
use crate::shared::validation::validate_text_body;
use crate::shared::{AppConfig, AppError, Result};
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub struct EventServiceSettings {
    pub event_bucket: String,
    pub home_event_limit: usize,
    pub report_page_size: u32,
}

impl EventServiceSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            event_bucket: config.storage.event_bucket.clone(),
            home_event_limit: config.messaging.home_event_limit,
            report_page_size: u32::try_from(config.messaging.report_page_size).unwrap_or(u32::MAX),
        }
    }
}

impl Default for EventServiceSettings {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

pub struct EventService {
    events: Arc<dyn EventRepository>,
    reports: Arc<dyn ReportRepository>,
    blobs: Arc<dyn BlobStorage>,
    cache: Arc<dyn QueryCache>,
    settings: EventServiceSettings,
}

impl EventService {
    pub fn new(
        events: Arc<dyn EventRepository>,
        reports: Arc<dyn ReportRepository>,
        blobs: Arc<dyn BlobStorage>,
        cache: Arc<dyn QueryCache>,
        settings: EventServiceSettings,
    ) -> Self {
        Self {
            events,
            reports,
            blobs,
            cache,
            settings,
        }
    }

    /// 入力を検証し、画像があればアップロードしてからイベントを作成する。
    pub async fn create_event(
        &self,
        session: &SessionContext,
        draft: EventDraft,
        image: Option<ImageUpload>,
    ) -> Result<Event> {
        let creator = session.require_user()?;
        let mut new_event = draft.validate(creator.clone())?;

        if let Some(image) = image {
            let path = format!("{creator}/{}.jpeg", uuid::Uuid::new_v4());
            let stored = self
                .blobs
                .upload(
                    &self.settings.event_bucket,
                    &path,
                    image.bytes,
                    &image.content_type,
                )
                .await?;
            new_event.photo_url = Some(
                self.blobs
                    .public_url(&self.settings.event_bucket, &stored),
            );
        }

        let event = self.events.insert_event(&new_event).await?;
        info!(event_id = %event.id, creator = %creator, "event created");
        invalidate_after(self.cache.as_ref(), &Mutation::CreateEvent { creator });
        Ok(event)
    }

    /// ホーム画面用。開催日時の早い順で件数制限あり。
    pub async fn list_events(&self, visibility: Visibility) -> Result<Vec<Event>> {
        let query =
            EventQuery::by_visibility(visibility).with_limit(self.settings.home_event_limit);
        read_through(
            self.cache.as_ref(),
            QueryKey::Events(visibility),
            CachedValue::into_events,
            CachedValue::Events,
            || self.events.list_events(&query),
        )
        .await
    }

    pub async fn get_event(&self, id: &EventId) -> Result<Event> {
        let found = read_through(
            self.cache.as_ref(),
            QueryKey::EventDetail(id.clone()),
            CachedValue::into_event,
            CachedValue::Event,
            || self.events.get_event(id),
        )
        .await?;
        found.ok_or_else(|| AppError::NotFound(format!("Event not found: {id}")))
    }

    pub async fn created_events(&self, user: &UserId) -> Result<Vec<Event>> {
        let query = EventQuery::created_by(user.clone());
        read_through(
            self.cache.as_ref(),
            QueryKey::CreatedEvents(user.clone()),
            CachedValue::into_events,
            CachedValue::Events,
            || self.events.list_events(&query),
        )
        .await
    }

    pub async fn delete_event(&self, session: &SessionContext, id: &EventId) -> Result<()> {
        let user = session.require_user()?;
        self.events.delete_event(id).await?;
        info!(event_id = %id, deleted_by = %user, "event deleted");
        invalidate_after(self.cache.as_ref(), &Mutation::DeleteEvent { event: id.clone() });
        Ok(())
    }

    pub async fn report_event(
        &self,
        session: &SessionContext,
        id: &EventId,
        reason: &str,
    ) -> Result<EventReport> {
        let user = session.require_user()?;
        let reason = validate_text_body("reason", reason, REPORT_REASON_MAX_CHARS)?;
        let report = self
            .reports
            .insert_report(&NewEventReport {
                event_id: id.clone(),
                user_id: user,
                reason,
            })
            .await?;
        invalidate_after(self.cache.as_ref(), &Mutation::ReportEvent);
        Ok(report)
    }

    /// 通報一覧（新しい順、0 始まりのページ）。キャッシュは直近に開いたページのみ。
    pub async fn list_reports(&self, page: u32) -> Result<ReportPage> {
        debug!(page, "loading report page");
        read_through(
            self.cache.as_ref(),
            QueryKey::EventReports,
            |value| value.into_reports().filter(|cached| cached.page == page),
            CachedValue::Reports,
            || self.reports.list_reports(page, self.settings.report_page_size),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::AuthGateway;
    use crate::domain::entities::{
        Address, AuthEvent, Credentials, NewEvent, Session, SignUpOutcome,
    };
    use crate::domain::value_objects::{EventType, ReportId};
    use crate::infrastructure::cache::LruQueryCache;
    use async_trait::async_trait;
    use bytes::Bytes;
    use chrono::{Duration, TimeZone, Utc};
    use futures::stream::BoxStream;
    use mockall::mock;

    mock! {
        pub Events {}

        #[async_trait]
        impl EventRepository for Events {
            async fn insert_event(&self, event: &NewEvent) -> Result<Event>;
            async fn get_event(&self, id: &EventId) -> Result<Option<Event>>;
            async fn list_events(&self, query: &EventQuery) -> Result<Vec<Event>>;
            async fn delete_event(&self, id: &EventId) -> Result<()>;
        }
    }

    mock! {
        pub Reports {}

        #[async_trait]
        impl ReportRepository for Reports {
            async fn insert_report(&self, report: &NewEventReport) -> Result<EventReport>;
            async fn list_reports(&self, page: u32, page_size: u32) -> Result<ReportPage>;
        }
    }

    mock! {
        pub Blobs {}

        #[async_trait]
        impl BlobStorage for Blobs {
            async fn upload(
                &self,
                bucket: &str,
                path: &str,
                bytes: Bytes,
                content_type: &str,
            ) -> Result<String>;
            async fn download(&self, bucket: &str, path: &str) -> Result<Bytes>;
            fn public_url(&self, bucket: &str, path: &str) -> String;
        }
    }

    mock! {
        pub Auth {}

        #[async_trait]
        impl AuthGateway for Auth {
            async fn get_session(&self) -> Result<Option<Session>>;
            async fn sign_in_with_password(&self, credentials: &Credentials) -> Result<Session>;
            async fn sign_up(&self, credentials: &Credentials) -> Result<SignUpOutcome>;
            async fn sign_out(&self) -> Result<()>;
            fn auth_events(&self) -> BoxStream<'static, AuthEvent>;
        }
    }

    fn draft() -> EventDraft {
        EventDraft {
            name: "Brocante".into(),
            description: "Grande brocante du quartier".into(),
            start_datetime: Some(Utc.with_ymd_and_hms(2025, 9, 6, 8, 0, 0).unwrap()),
            end_datetime: Some(Utc.with_ymd_and_hms(2025, 9, 6, 18, 0, 0).unwrap()),
            price: None,
            address_street: "Place du Marché".into(),
            address_postal: "69001".into(),
            address_city: "Lyon".into(),
            address_extra: None,
            visibility: Some(Visibility::Public),
            event_type: Some(EventType::VentesEncheres),
        }
    }

    fn stored(new_event: &NewEvent) -> Event {
        Event {
            id: EventId::new("e1").unwrap(),
            user_id: new_event.user_id.clone(),
            name: new_event.name.clone(),
            description: Some(new_event.description.clone()),
            start_datetime: new_event.start_datetime,
            end_datetime: Some(new_event.end_datetime),
            price: new_event.price,
            address: Address {
                street: new_event.address.street.clone(),
                postal: new_event.address.postal.clone(),
                city: new_event.address.city.clone(),
                extra: None,
            },
            visibility: new_event.visibility,
            event_type: new_event.event_type,
            photo_url: new_event.photo_url.clone(),
            created_at: Utc::now(),
            creator: None,
        }
    }

    struct Fixture {
        cache: Arc<LruQueryCache>,
        session: SessionContext,
    }

    impl Fixture {
        fn new() -> Self {
            let cache = Arc::new(LruQueryCache::new(32, std::time::Duration::from_secs(60), 16));
            let session = SessionContext::new(Arc::new(MockAuth::new()), cache.clone());
            session.apply_auth_event(AuthEvent::SignedIn(Session {
                user_id: UserId::new("alice").unwrap(),
                email: "alice@example.com".into(),
                access_token: "token".into(),
                expires_at: Utc::now() + Duration::hours(1),
            }));
            Self { cache, session }
        }

        fn service(
            &self,
            events: MockEvents,
            reports: MockReports,
            blobs: MockBlobs,
        ) -> EventService {
            EventService::new(
                Arc::new(events),
                Arc::new(reports),
                Arc::new(blobs),
                self.cache.clone(),
                EventServiceSettings::default(),
            )
        }
    }

    #[tokio::test]
    async fn create_uploads_image_under_user_folder() {
        let mut blobs = MockBlobs::new();
        blobs
            .expect_upload()
            .withf(|bucket, path, _, content_type| {
                bucket == "event"
                    && path.starts_with("alice/")
                    && path.ends_with(".jpeg")
                    && content_type == "image/jpeg"
            })
            .times(1)
            .returning(|_, path, _, _| Ok(path.to_string()));
        blobs
            .expect_public_url()
            .returning(|bucket, path| format!("https://cdn.test/{bucket}/{path}"));
        let mut events = MockEvents::new();
        events
            .expect_insert_event()
            .withf(|event| {
                event
                    .photo_url
                    .as_deref()
                    .map(|url| url.starts_with("https://cdn.test/event/alice/"))
                    .unwrap_or(false)
            })
            .times(1)
            .returning(|new_event| Ok(stored(new_event)));

        let fixture = Fixture::new();
        let alice = UserId::new("alice").unwrap();
        fixture
            .cache
            .set(QueryKey::CreatedEvents(alice.clone()), CachedValue::Events(Vec::new()));
        let service = fixture.service(events, MockReports::new(), blobs);

        let event = service
            .create_event(&fixture.session, draft(), Some(ImageUpload::jpeg(vec![0xFF, 0xD8])))
            .await
            .expect("create");
        assert_eq!(event.address.city, "Lyon");
        assert!(fixture.cache.get(&QueryKey::CreatedEvents(alice)).is_none());
    }

    #[tokio::test]
    async fn invalid_draft_never_uploads() {
        let mut blobs = MockBlobs::new();
        blobs.expect_upload().never();
        let mut events = MockEvents::new();
        events.expect_insert_event().never();
        let fixture = Fixture::new();
        let service = fixture.service(events, MockReports::new(), blobs);

        let mut invalid = draft();
        invalid.address_postal = "ABCDE".into();
        let err = service
            .create_event(&fixture.session, invalid, Some(ImageUpload::jpeg(vec![1])))
            .await
            .unwrap_err();
        match err {
            AppError::InvalidFields(fields) => assert!(fields.get("address_postal").is_some()),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn home_list_is_limited_and_cached() {
        let mut events = MockEvents::new();
        events
            .expect_list_events()
            .withf(|query| query.limit == Some(7) && query.visibility == Some(Visibility::Private))
            .times(1)
            .returning(|_| Ok(Vec::new()));
        let fixture = Fixture::new();
        let service = fixture.service(events, MockReports::new(), MockBlobs::new());

        service.list_events(Visibility::Private).await.expect("first");
        service.list_events(Visibility::Private).await.expect("cached");
    }

    #[tokio::test]
    async fn home_list_fetched_across_a_create_is_refetched() {
        let fixture = Fixture::new();
        let racing = fixture.cache.clone();
        let mut events = MockEvents::new();
        events.expect_list_events().times(2).returning(move |_| {
            // 取得中に別タスクがイベントを作成した
            invalidate_after(
                racing.as_ref(),
                &Mutation::CreateEvent {
                    creator: UserId::new("bob").unwrap(),
                },
            );
            Ok(Vec::new())
        });
        let service = fixture.service(events, MockReports::new(), MockBlobs::new());

        service.list_events(Visibility::Public).await.expect("first");
        assert!(fixture.cache.get(&QueryKey::Events(Visibility::Public)).is_none());
        service.list_events(Visibility::Public).await.expect("refetched");
    }

    #[tokio::test]
    async fn missing_event_is_not_found() {
        let mut events = MockEvents::new();
        events.expect_get_event().times(1).returning(|_| Ok(None));
        let fixture = Fixture::new();
        let service = fixture.service(events, MockReports::new(), MockBlobs::new());
        let id = EventId::new("ghost").unwrap();

        assert!(matches!(service.get_event(&id).await, Err(AppError::NotFound(_))));
        assert!(matches!(service.get_event(&id).await, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn deleting_invalidates_reports_and_lists() {
        let mut events = MockEvents::new();
        events.expect_delete_event().times(1).returning(|_| Ok(()));
        let fixture = Fixture::new();
        fixture.cache.set(
            QueryKey::EventReports,
            CachedValue::Reports(ReportPage {
                items: Vec::new(),
                page: 0,
                page_size: 10,
                total_count: 0,
            }),
        );
        fixture
            .cache
            .set(QueryKey::Events(Visibility::Public), CachedValue::Events(Vec::new()));
        let service = fixture.service(events, MockReports::new(), MockBlobs::new());

        service
            .delete_event(&fixture.session, &EventId::new("e1").unwrap())
            .await
            .expect("delete");
        assert!(fixture.cache.get(&QueryKey::EventReports).is_none());
        assert!(fixture.cache.get(&QueryKey::Events(Visibility::Public)).is_none());
    }

    #[tokio::test]
    async fn report_reason_is_trimmed() {
        let mut reports = MockReports::new();
        reports
            .expect_insert_report()
            .withf(|report| report.reason == "Contenu trompeur")
            .returning(|report| {
                Ok(EventReport {
                    id: ReportId::generate(),
                    event_id: report.event_id.clone(),
                    user_id: report.user_id.clone(),
                    reason: report.reason.clone(),
                    created_at: Utc::now(),
                })
            });
        let fixture = Fixture::new();
        let service = fixture.service(MockEvents::new(), reports, MockBlobs::new());

        let report = service
            .report_event(&fixture.session, &EventId::new("e1").unwrap(), "  Contenu trompeur ")
            .await
            .expect("report");
        assert_eq!(report.user_id.as_str(), "alice");
    }

    #[tokio::test]
    async fn report_pages_are_fetched_with_configured_size() {
        let mut reports = MockReports::new();
        reports
            .expect_list_reports()
            .withf(|page, page_size| *page == 1 && *page_size == 10)
            .times(1)
            .returning(|page, page_size| {
                Ok(ReportPage {
                    items: Vec::new(),
                    page,
                    page_size,
                    total_count: 12,
                })
            });
        let fixture = Fixture::new();
        let service = fixture.service(MockEvents::new(), reports, MockBlobs::new());

        let page = service.list_reports(1).await.expect("page");
        assert!(!page.has_more());
        service.list_reports(1).await.expect("cached page");
    }
}
