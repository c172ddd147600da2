use super::SqliteGateway;
use super::mapper::{corrupt, joined_summary, timestamp};
use super::queries::{
    DELETE_COMMENTS_FOR_EVENT, DELETE_EVENT, DELETE_REPORTS_FOR_EVENT,
    DELETE_SAVED_EVENTS_FOR_EVENT, INSERT_EVENT, SELECT_EVENTS_WITH_CREATOR,
};
use crate::application::ports::{EventQuery, EventRepository};
use crate::domain::entities::{Address, Event, NewEvent};
use crate::domain::value_objects::{EventId, EventType, UserId, Visibility};
use crate::shared::error::AppError;
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{FromRow, QueryBuilder, Sqlite};
use tracing::debug;

#[derive(Debug, FromRow)]
pub(super) struct EventRow {
    id: String,
    user_id: String,
    name: String,
    description: Option<String>,
    start_datetime: i64,
    end_datetime: Option<i64>,
    price: Option<f64>,
    address_street: String,
    address_postal: String,
    address_city: String,
    address_extra: Option<String>,
    visibility: String,
    event_type: String,
    photo_url: Option<String>,
    created_at: i64,
    creator_username: Option<String>,
    creator_avatar_url: Option<String>,
    creator_full_name: Option<String>,
}

impl EventRow {
    pub(super) fn into_domain(self) -> Result<Event, AppError> {
        let user_id = UserId::new(self.user_id).map_err(corrupt("user id"))?;
        let creator = joined_summary(
            &user_id,
            self.creator_username,
            self.creator_avatar_url,
            self.creator_full_name,
        );
        Ok(Event {
            id: EventId::new(self.id).map_err(corrupt("event id"))?,
            user_id,
            name: self.name,
            description: self.description,
            start_datetime: timestamp(self.start_datetime)?,
            end_datetime: self.end_datetime.map(timestamp).transpose()?,
            price: self.price,
            address: Address {
                street: self.address_street,
                postal: self.address_postal,
                city: self.address_city,
                extra: self.address_extra,
            },
            visibility: self
                .visibility
                .parse::<Visibility>()
                .map_err(corrupt("visibility"))?,
            event_type: self
                .event_type
                .parse::<EventType>()
                .map_err(corrupt("event type"))?,
            photo_url: self.photo_url,
            created_at: timestamp(self.created_at)?,
            creator,
        })
    }
}

#[async_trait]
impl EventRepository for SqliteGateway {
    async fn insert_event(&self, event: &NewEvent) -> Result<Event, AppError> {
        let id = EventId::generate();
        sqlx::query(INSERT_EVENT)
            .bind(id.as_str())
            .bind(event.user_id.as_str())
            .bind(&event.name)
            .bind(&event.description)
            .bind(event.start_datetime.timestamp_millis())
            .bind(event.end_datetime.timestamp_millis())
            .bind(event.price)
            .bind(&event.address.street)
            .bind(&event.address.postal)
            .bind(&event.address.city)
            .bind(event.address.extra.as_deref())
            .bind(event.visibility.as_str())
            .bind(event.event_type.as_str())
            .bind(event.photo_url.as_deref())
            .bind(Utc::now().timestamp_millis())
            .execute(self.pool.get_pool())
            .await?;

        self.get_event(&id)
            .await?
            .ok_or_else(|| AppError::Internal(format!("Inserted event {id} is missing")))
    }

    async fn get_event(&self, id: &EventId) -> Result<Option<Event>, AppError> {
        let sql = format!("{SELECT_EVENTS_WITH_CREATOR} WHERE e.id = ?1");
        let row = sqlx::query_as::<_, EventRow>(&sql)
            .bind(id.as_str())
            .fetch_optional(self.pool.get_pool())
            .await?;
        row.map(EventRow::into_domain).transpose()
    }

    async fn list_events(&self, query: &EventQuery) -> Result<Vec<Event>, AppError> {
        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(SELECT_EVENTS_WITH_CREATOR);
        builder.push(" WHERE 1 = 1");
        if let Some(visibility) = query.visibility {
            builder.push(" AND e.visibility = ");
            builder.push_bind(visibility.as_str());
        }
        if let Some(creator) = &query.creator {
            builder.push(" AND e.user_id = ");
            builder.push_bind(creator.as_str());
        }
        builder.push(" ORDER BY e.start_datetime ASC, e.rowid ASC");
        if let Some(limit) = query.limit {
            builder.push(" LIMIT ");
            builder.push_bind(i64::try_from(limit).unwrap_or(i64::MAX));
        }

        let rows = builder
            .build_query_as::<EventRow>()
            .fetch_all(self.pool.get_pool())
            .await?;
        rows.into_iter().map(EventRow::into_domain).collect()
    }

    async fn delete_event(&self, id: &EventId) -> Result<(), AppError> {
        let mut tx = self.pool.get_pool().begin().await?;
        for statement in [
            DELETE_SAVED_EVENTS_FOR_EVENT,
            DELETE_COMMENTS_FOR_EVENT,
            DELETE_REPORTS_FOR_EVENT,
        ] {
            sqlx::query(statement)
                .bind(id.as_str())
                .execute(&mut *tx)
                .await?;
        }
        let result = sqlx::query(DELETE_EVENT)
            .bind(id.as_str())
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Event not found: {id}")));
        }
        tx.commit().await?;
        debug!(event_id = %id, "event deleted");
        Ok(())
    }
}
