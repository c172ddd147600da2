use crate::domain::entities::ProfileSummary;
use crate::domain::value_objects::UserId;
use crate::shared::error::AppError;
use chrono::{DateTime, TimeZone, Utc};

pub(super) fn timestamp(millis: i64) -> Result<DateTime<Utc>, AppError> {
    Utc.timestamp_millis_opt(millis)
        .single()
        .ok_or_else(|| AppError::DeserializationError(format!("Invalid timestamp: {millis}")))
}

pub(super) fn corrupt(label: &'static str) -> impl Fn(String) -> AppError {
    move |err| AppError::DeserializationError(format!("Invalid {label}: {err}"))
}

/// LEFT JOIN したプロフィール列から縮約プロフィールを組み立てる。行が無ければ `None`。
pub(super) fn joined_summary(
    id: &UserId,
    username: Option<String>,
    avatar_url: Option<String>,
    full_name: Option<String>,
) -> Option<ProfileSummary> {
    username.map(|username| ProfileSummary {
        id: id.clone(),
        username,
        avatar_url,
        full_name,
    })
}

/// 参加者ペアの一意キー（ソート済み JSON 配列）。
pub(super) fn participant_key(ids: &[UserId]) -> Result<String, AppError> {
    let mut sorted: Vec<&str> = ids.iter().map(UserId::as_str).collect();
    sorted.sort_unstable();
    Ok(serde_json::to_string(&sorted)?)
}
