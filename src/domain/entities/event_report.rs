use super::ProfileSummary;
use crate::domain::value_objects::{EventId, ReportId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const REPORT_REASON_MAX_CHARS: usize = 500;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventReport {
    pub id: ReportId,
    pub event_id: EventId,
    pub user_id: UserId,
    pub reason: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEventReport {
    pub event_id: EventId,
    pub user_id: UserId,
    pub reason: String,
}

/// モデレーション一覧の一行。対象イベントが削除済みならイベント情報は `None`。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportListing {
    pub report: EventReport,
    pub event_name: Option<String>,
    pub event_city: Option<String>,
    pub reporter: Option<ProfileSummary>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportPage {
    pub items: Vec<ReportListing>,
    pub page: u32,
    pub page_size: u32,
    pub total_count: u64,
}

impl ReportPage {
    pub fn has_more(&self) -> bool {
        u64::from(self.page + 1) * u64::from(self.page_size) < self.total_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(page: u32, total_count: u64) -> ReportPage {
        ReportPage {
            items: Vec::new(),
            page,
            page_size: 10,
            total_count,
        }
    }

    #[test]
    fn has_more_uses_zero_based_pages() {
        assert!(page(0, 11).has_more());
        assert!(!page(0, 10).has_more());
        assert!(!page(1, 20).has_more());
    }
}
