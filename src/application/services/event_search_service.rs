use crate::application::ports::{
    CachedValue, EventQuery, EventRepository, ProfileRepository, QueryCache, QueryKey,
};
use crate::application::shared::read_through;
use crate::domain::entities::{Event, ProfileSummary};
use crate::domain::value_objects::{EventFilters, EventType, Visibility};
use crate::shared::Result;
use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, TimeZone, Utc};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SearchResults {
    pub events: Vec<Event>,
    pub users: Vec<ProfileSummary>,
    /// 既定値ではない絞り込みカテゴリの数（バッジ表示用）。
    pub active_filters: usize,
}

/// 暦日 `date` のローカル 0:00 を UTC で返す。
fn start_of_day<Tz: TimeZone>(date: NaiveDate, tz: &Tz) -> DateTime<Utc> {
    let naive = date.and_time(chrono::NaiveTime::MIN);
    local_to_utc(naive, tz, true)
}

/// 暦日 `date` のローカル 23:59:59.999 を UTC で返す。
fn end_of_day<Tz: TimeZone>(date: NaiveDate, tz: &Tz) -> DateTime<Utc> {
    let naive = date
        .and_hms_milli_opt(23, 59, 59, 999)
        .unwrap_or_else(|| date.and_time(chrono::NaiveTime::MIN));
    local_to_utc(naive, tz, false)
}

/// 夏時間の切り替えで曖昧・存在しない時刻は範囲が広がる側に寄せる。
fn local_to_utc<Tz: TimeZone>(naive: NaiveDateTime, tz: &Tz, earliest: bool) -> DateTime<Utc> {
    let resolved = tz.from_local_datetime(&naive);
    let picked = if earliest {
        resolved.earliest()
    } else {
        resolved.latest()
    };
    picked
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|| Utc.from_utc_datetime(&naive))
}

fn matches_event_type(selected: &BTreeSet<String>, event_type: EventType) -> bool {
    selected.iter().any(|value| {
        value == event_type.as_str() || value.parse::<EventType>().ok() == Some(event_type)
    })
}

fn matches_query(haystack: &str, needle_lower: &str) -> bool {
    needle_lower.is_empty() || haystack.to_lowercase().contains(needle_lower)
}

fn normalize_query(query: &str) -> String {
    query.trim().to_lowercase()
}

/// 構造化フィルタを適用する。フィールド間は AND、複数選択は OR。
pub fn filter_events<Tz: TimeZone>(
    events: &[Event],
    filters: &EventFilters,
    tz: &Tz,
) -> Vec<Event> {
    let start_bound = filters.date_range.start_date.map(|date| start_of_day(date, tz));
    let end_bound = filters.date_range.end_date.map(|date| end_of_day(date, tz));
    let price = &filters.price_range;

    events
        .iter()
        .filter(|event| {
            if !filters.event_types.is_empty()
                && !matches_event_type(&filters.event_types, event.event_type)
            {
                return false;
            }
            if !filters.cities.is_empty() && !filters.cities.contains(event.city()) {
                return false;
            }
            if let Some(start) = start_bound {
                if event.effective_end() < start {
                    return false;
                }
            }
            if let Some(end) = end_bound {
                if event.start_datetime > end {
                    return false;
                }
            }
            if price.is_free {
                return event.is_free();
            }
            // 価格未設定のイベントは範囲比較の対象外
            if let Some(value) = event.price {
                if price.min.map(|min| value < min).unwrap_or(false) {
                    return false;
                }
                if price.max.map(|max| value > max).unwrap_or(false) {
                    return false;
                }
            }
            true
        })
        .cloned()
        .collect()
}

/// イベント名の部分一致（大文字小文字を区別しない）。
pub fn search_events(events: Vec<Event>, query: &str) -> Vec<Event> {
    let needle = normalize_query(query);
    events
        .into_iter()
        .filter(|event| matches_query(&event.name, &needle))
        .collect()
}

/// ユーザー名の部分一致（大文字小文字を区別しない）。
pub fn search_users(users: &[ProfileSummary], query: &str) -> Vec<ProfileSummary> {
    let needle = normalize_query(query);
    users
        .iter()
        .filter(|user| matches_query(&user.username, &needle))
        .cloned()
        .collect()
}

pub fn available_event_types(events: &[Event]) -> Vec<String> {
    events
        .iter()
        .map(|event| event.event_type.as_str().to_string())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

pub fn available_cities(events: &[Event]) -> Vec<String> {
    events
        .iter()
        .map(|event| event.city().to_string())
        .filter(|city| !city.trim().is_empty())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// 構造化フィルタの後にテキスト検索を適用する。ユーザー検索は独立に行う。
pub fn search<Tz: TimeZone>(
    events: &[Event],
    users: &[ProfileSummary],
    filters: &EventFilters,
    query: &str,
    tz: &Tz,
) -> SearchResults {
    SearchResults {
        events: search_events(filter_events(events, filters, tz), query),
        users: search_users(users, query),
        active_filters: filters.active_count(),
    }
}

pub struct EventSearchService {
    events: Arc<dyn EventRepository>,
    profiles: Arc<dyn ProfileRepository>,
    cache: Arc<dyn QueryCache>,
}

impl EventSearchService {
    pub fn new(
        events: Arc<dyn EventRepository>,
        profiles: Arc<dyn ProfileRepository>,
        cache: Arc<dyn QueryCache>,
    ) -> Self {
        Self {
            events,
            profiles,
            cache,
        }
    }

    /// 検索対象の公開イベント（開催日時の早い順）。
    pub async fn catalog(&self) -> Result<Vec<Event>> {
        let query = EventQuery::by_visibility(Visibility::Public);
        read_through(
            self.cache.as_ref(),
            QueryKey::EventCatalog,
            CachedValue::into_events,
            CachedValue::Events,
            || self.events.list_events(&query),
        )
        .await
    }

    pub async fn users(&self) -> Result<Vec<ProfileSummary>> {
        read_through(
            self.cache.as_ref(),
            QueryKey::Profiles,
            CachedValue::into_profiles,
            CachedValue::Profiles,
            || self.profiles.list_profile_summaries(),
        )
        .await
    }

    /// フィルタ選択肢（種別・都市）を全件から集める。
    pub async fn filter_options(&self) -> Result<(Vec<String>, Vec<String>)> {
        let events = self.catalog().await?;
        Ok((available_event_types(&events), available_cities(&events)))
    }

    pub async fn search_catalog(
        &self,
        filters: &EventFilters,
        query: &str,
    ) -> Result<SearchResults> {
        let events = self.catalog().await?;
        let users = self.users().await?;
        let results = search(&events, &users, filters, query, &Local);
        debug!(
            events = results.events.len(),
            users = results.users.len(),
            active_filters = results.active_filters,
            "catalog searched"
        );
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::{Address, NewEvent, Profile};
    use crate::domain::value_objects::{EventId, UserId};
    use async_trait::async_trait;
    use chrono::FixedOffset;
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
        pub Profiles {}

        #[async_trait]
        impl ProfileRepository for Profiles {
            async fn get_profile(&self, id: &UserId) -> Result<Option<Profile>>;
            async fn get_profile_summaries(&self, ids: &[UserId]) -> Result<Vec<ProfileSummary>>;
            async fn list_profile_summaries(&self) -> Result<Vec<ProfileSummary>>;
            async fn upsert_profile(&self, profile: &Profile) -> Result<()>;
        }
    }

    fn utc(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, day, hour, 0, 0).unwrap()
    }

    fn day(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, day).unwrap()
    }

    fn event(name: &str, event_type: EventType, city: &str, price: Option<f64>) -> Event {
        Event {
            id: EventId::generate(),
            user_id: UserId::new("creator").unwrap(),
            name: name.into(),
            description: None,
            start_datetime: utc(10, 18),
            end_datetime: Some(utc(10, 22)),
            price,
            address: Address {
                street: "1 rue Haute".into(),
                postal: "75001".into(),
                city: city.into(),
                extra: None,
            },
            visibility: Visibility::Public,
            event_type,
            photo_url: None,
            created_at: utc(1, 0),
            creator: None,
        }
    }

    fn names(events: &[Event]) -> Vec<&str> {
        events.iter().map(|event| event.name.as_str()).collect()
    }

    fn user(name: &str) -> ProfileSummary {
        ProfileSummary {
            id: UserId::new(name).unwrap(),
            username: name.into(),
            avatar_url: None,
            full_name: None,
        }
    }

    #[test]
    fn default_filters_keep_every_event() {
        let events = vec![
            event("Jazz Night", EventType::Anniversaire, "Paris", Some(0.0)),
            event("Rando", EventType::Randonnee, "Lyon", None),
            event("Vente", EventType::VentesEncheres, "Nice", Some(40.0)),
        ];
        assert_eq!(filter_events(&events, &EventFilters::default(), &Utc), events);
    }

    #[test]
    fn free_filter_keeps_zero_priced_jazz_night() {
        let events = vec![event("Jazz Night", EventType::Anniversaire, "Paris", Some(0.0))];
        let filters = EventFilters::default().free_only();
        assert_eq!(names(&filter_events(&events, &filters, &Utc)), vec!["Jazz Night"]);
    }

    #[test]
    fn free_filter_excludes_paid_and_keeps_unpriced() {
        let events = vec![
            event("Paid", EventType::Inauguration, "Paris", Some(5.0)),
            event("Unpriced", EventType::Inauguration, "Paris", None),
        ];
        let filters = EventFilters::default().free_only();
        assert_eq!(names(&filter_events(&events, &filters, &Utc)), vec!["Unpriced"]);
    }

    #[test]
    fn city_filter_excludes_other_cities() {
        let events = vec![
            event("Concert", EventType::Anniversaire, "Paris", None),
            event("Marche", EventType::Randonnee, "Lyon", None),
        ];
        let filters = EventFilters::default().with_city("Paris");
        assert_eq!(names(&filter_events(&events, &filters, &Utc)), vec!["Concert"]);
    }

    #[test]
    fn event_types_use_or_semantics_and_accept_legacy_spelling() {
        let events = vec![
            event("A", EventType::Anniversaire, "Paris", None),
            event("B", EventType::VentesEncheres, "Paris", None),
            event("C", EventType::Randonnee, "Paris", None),
        ];
        let filters = EventFilters::default()
            .with_event_type("anniversaire")
            .with_event_type("ventes enchères");
        assert_eq!(names(&filter_events(&events, &filters, &Utc)), vec!["A", "B"]);
    }

    #[test]
    fn price_range_skips_unpriced_events() {
        let events = vec![
            event("Cheap", EventType::Anniversaire, "Paris", Some(5.0)),
            event("Mid", EventType::Anniversaire, "Paris", Some(20.0)),
            event("Dear", EventType::Anniversaire, "Paris", Some(80.0)),
            event("Unpriced", EventType::Anniversaire, "Paris", None),
        ];
        let mut filters = EventFilters::default();
        filters.price_range.min = Some(10.0);
        filters.price_range.max = Some(50.0);
        assert_eq!(
            names(&filter_events(&events, &filters, &Utc)),
            vec!["Mid", "Unpriced"]
        );
    }

    #[test]
    fn date_range_uses_effective_end_and_end_of_day() {
        let mut ended = event("Ended", EventType::Anniversaire, "Paris", None);
        ended.start_datetime = utc(1, 10);
        ended.end_datetime = Some(utc(4, 23));
        let mut single_day = event("SingleDay", EventType::Anniversaire, "Paris", None);
        single_day.start_datetime = utc(5, 8);
        single_day.end_datetime = None;
        let mut late = event("Late", EventType::Anniversaire, "Paris", None);
        late.start_datetime = utc(7, 23);
        let mut after = event("After", EventType::Anniversaire, "Paris", None);
        after.start_datetime = utc(8, 0);
        let events = vec![ended, single_day, late, after];

        let mut filters = EventFilters::default();
        filters.date_range.start_date = Some(day(5));
        filters.date_range.end_date = Some(day(7));
        assert_eq!(
            names(&filter_events(&events, &filters, &Utc)),
            vec!["SingleDay", "Late"]
        );
    }

    #[test]
    fn date_bounds_follow_the_given_timezone() {
        let paris = FixedOffset::east_opt(2 * 3600).unwrap();
        let mut evening = event("Evening", EventType::Anniversaire, "Paris", None);
        // 7 日 22:30 UTC はパリ時間で 8 日 0:30
        evening.start_datetime = Utc.with_ymd_and_hms(2025, 6, 7, 22, 30, 0).unwrap();
        evening.end_datetime = None;
        let mut filters = EventFilters::default();
        filters.date_range.end_date = Some(day(7));

        assert_eq!(filter_events(&[evening.clone()], &filters, &Utc).len(), 1);
        assert!(filter_events(&[evening], &filters, &paris).is_empty());
    }

    #[test]
    fn text_query_runs_after_filters_and_on_users_separately() {
        let events = vec![
            event("Jazz Night", EventType::Anniversaire, "Paris", Some(0.0)),
            event("Jazz Brunch", EventType::Anniversaire, "Lyon", Some(0.0)),
        ];
        let users = vec![user("jazzfan"), user("rocker")];
        let filters = EventFilters::default().with_city("Paris").free_only();

        let results = search(&events, &users, &filters, "  JAZZ ", &Utc);
        assert_eq!(names(&results.events), vec!["Jazz Night"]);
        assert_eq!(results.users, vec![user("jazzfan")]);
        assert_eq!(results.active_filters, 2);
    }

    #[test]
    fn options_are_deduplicated_and_sorted() {
        let events = vec![
            event("A", EventType::Randonnee, "Paris", None),
            event("B", EventType::Anniversaire, "Lyon", None),
            event("C", EventType::Randonnee, "Paris", None),
        ];
        assert_eq!(available_cities(&events), vec!["Lyon", "Paris"]);
        assert_eq!(
            available_event_types(&events),
            vec!["anniversaire", "randonnée"]
        );
        assert!(available_cities(&[]).is_empty());
    }

    #[tokio::test]
    async fn catalog_search_loads_public_events_once() {
        let mut events = MockEvents::new();
        events
            .expect_list_events()
            .withf(|query| query.visibility == Some(Visibility::Public) && query.limit.is_none())
            .times(1)
            .returning(|_| {
                Ok(vec![event(
                    "Jazz Night",
                    EventType::Anniversaire,
                    "Paris",
                    Some(0.0),
                )])
            });
        let mut profiles = MockProfiles::new();
        profiles
            .expect_list_profile_summaries()
            .times(1)
            .returning(|| Ok(vec![user("camille")]));
        let cache = Arc::new(crate::infrastructure::cache::LruQueryCache::new(
            16,
            std::time::Duration::from_secs(60),
            8,
        ));
        let service = EventSearchService::new(Arc::new(events), Arc::new(profiles), cache);

        let filters = EventFilters::default().free_only();
        let first = service.search_catalog(&filters, "jazz").await.expect("search");
        let second = service.search_catalog(&filters, "").await.expect("search");
        assert_eq!(first.events.len(), 1);
        assert!(first.users.is_empty());
        assert_eq!(second.users.len(), 1);
        assert_eq!(
            service.filter_options().await.expect("options"),
            (vec!["anniversaire".to_string()], vec!["Paris".to_string()])
        );
    }

    #[tokio::test]
    async fn catalog_fetched_across_a_delete_is_refetched() {
        use crate::application::shared::{Mutation, invalidate_after};

        let cache = Arc::new(crate::infrastructure::cache::LruQueryCache::new(
            16,
            std::time::Duration::from_secs(60),
            8,
        ));
        let racing = cache.clone();
        let mut events = MockEvents::new();
        events.expect_list_events().times(2).returning(move |_| {
            invalidate_after(
                racing.as_ref(),
                &Mutation::DeleteEvent {
                    event: EventId::new("gone").unwrap(),
                },
            );
            Ok(Vec::new())
        });
        let service =
            EventSearchService::new(Arc::new(events), Arc::new(MockProfiles::new()), cache.clone());

        service.catalog().await.expect("first");
        assert!(cache.get(&QueryKey::EventCatalog).is_none());
        service.catalog().await.expect("refetched");
    }
}
