use super::SqliteGateway;
use super::mapper::{corrupt, joined_summary, timestamp};
use super::queries::{COUNT_REPORTS, INSERT_REPORT, SELECT_REPORT_PAGE};
use crate::application::ports::ReportRepository;
use crate::domain::entities::{EventReport, NewEventReport, ReportListing, ReportPage};
use crate::domain::value_objects::{EventId, ReportId, UserId};
use crate::shared::error::AppError;
use async_trait::async_trait;
use chrono::Utc;
use sqlx::FromRow;

#[derive(Debug, FromRow)]
struct ReportRow {
    id: String,
    event_id: String,
    user_id: String,
    reason: String,
    created_at: i64,
    event_name: Option<String>,
    event_city: Option<String>,
    reporter_username: Option<String>,
    reporter_avatar_url: Option<String>,
    reporter_full_name: Option<String>,
}

impl ReportRow {
    fn into_domain(self) -> Result<ReportListing, AppError> {
        let user_id = UserId::new(self.user_id).map_err(corrupt("user id"))?;
        let reporter = joined_summary(
            &user_id,
            self.reporter_username,
            self.reporter_avatar_url,
            self.reporter_full_name,
        );
        Ok(ReportListing {
            report: EventReport {
                id: ReportId::new(self.id).map_err(corrupt("report id"))?,
                event_id: EventId::new(self.event_id).map_err(corrupt("event id"))?,
                user_id,
                reason: self.reason,
                created_at: timestamp(self.created_at)?,
            },
            event_name: self.event_name,
            event_city: self.event_city,
            reporter,
        })
    }
}

#[async_trait]
impl ReportRepository for SqliteGateway {
    async fn insert_report(&self, report: &NewEventReport) -> Result<EventReport, AppError> {
        let stored = EventReport {
            id: ReportId::generate(),
            event_id: report.event_id.clone(),
            user_id: report.user_id.clone(),
            reason: report.reason.clone(),
            created_at: Utc::now(),
        };
        sqlx::query(INSERT_REPORT)
            .bind(stored.id.as_str())
            .bind(stored.event_id.as_str())
            .bind(stored.user_id.as_str())
            .bind(&stored.reason)
            .bind(stored.created_at.timestamp_millis())
            .execute(self.pool.get_pool())
            .await?;
        Ok(stored)
    }

    async fn list_reports(&self, page: u32, page_size: u32) -> Result<ReportPage, AppError> {
        let offset = i64::from(page) * i64::from(page_size);
        let rows = sqlx::query_as::<_, ReportRow>(SELECT_REPORT_PAGE)
            .bind(i64::from(page_size))
            .bind(offset)
            .fetch_all(self.pool.get_pool())
            .await?;
        let total: i64 = sqlx::query_scalar(COUNT_REPORTS)
            .fetch_one(self.pool.get_pool())
            .await?;

        Ok(ReportPage {
            items: rows
                .into_iter()
                .map(ReportRow::into_domain)
                .collect::<Result<_, _>>()?,
            page,
            page_size,
            total_count: u64::try_from(total).unwrap_or_default(),
        })
    }
}
