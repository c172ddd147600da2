use super::ProfileSummary;
use crate::domain::value_objects::{EventId, EventType, UserId, Visibility};
use crate::shared::validation::{FieldError, FieldErrors, ValidationFailureKind};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const EVENT_NAME_MIN_CHARS: usize = 3;
pub const EVENT_NAME_MAX_CHARS: usize = 100;
pub const EVENT_DESCRIPTION_MIN_CHARS: usize = 10;
pub const EVENT_DESCRIPTION_MAX_CHARS: usize = 1000;
pub const POSTAL_CODE_LEN: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Address {
    pub street: String,
    pub postal: String,
    pub city: String,
    pub extra: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub user_id: UserId,
    pub name: String,
    pub description: Option<String>,
    pub start_datetime: DateTime<Utc>,
    pub end_datetime: Option<DateTime<Utc>>,
    pub price: Option<f64>,
    pub address: Address,
    pub visibility: Visibility,
    pub event_type: EventType,
    pub photo_url: Option<String>,
    pub created_at: DateTime<Utc>,
    /// 作成者プロフィール（結合取得できた場合のみ）。
    pub creator: Option<ProfileSummary>,
}

impl Event {
    /// 終了日時がなければ開始日時を終了とみなす。
    pub fn effective_end(&self) -> DateTime<Utc> {
        self.end_datetime.unwrap_or(self.start_datetime)
    }

    /// 価格未設定は無料扱い。
    pub fn is_free(&self) -> bool {
        self.price.map(|price| price <= 0.0).unwrap_or(true)
    }

    pub fn city(&self) -> &str {
        &self.address.city
    }
}

/// 作成フォームの生入力。
#[derive(Debug, Clone, Default)]
pub struct EventDraft {
    pub name: String,
    pub description: String,
    pub start_datetime: Option<DateTime<Utc>>,
    pub end_datetime: Option<DateTime<Utc>>,
    pub price: Option<String>,
    pub address_street: String,
    pub address_postal: String,
    pub address_city: String,
    pub address_extra: Option<String>,
    pub visibility: Option<Visibility>,
    pub event_type: Option<EventType>,
}

/// 検証済みの作成リクエスト。
#[derive(Debug, Clone, PartialEq)]
pub struct NewEvent {
    pub user_id: UserId,
    pub name: String,
    pub description: String,
    pub start_datetime: DateTime<Utc>,
    pub end_datetime: DateTime<Utc>,
    pub price: Option<f64>,
    pub address: Address,
    pub visibility: Visibility,
    pub event_type: EventType,
    pub photo_url: Option<String>,
}

impl EventDraft {
    /// すべての項目を検証し、失敗した項目をまとめて返す。
    pub fn validate(&self, user_id: UserId) -> Result<NewEvent, FieldErrors> {
        let mut errors = FieldErrors::default();

        if errors.require("name", &self.name, "name is required") {
            errors.check_length(
                "name",
                &self.name,
                EVENT_NAME_MIN_CHARS,
                EVENT_NAME_MAX_CHARS,
            );
        }
        if errors.require("description", &self.description, "description is required") {
            errors.check_length(
                "description",
                &self.description,
                EVENT_DESCRIPTION_MIN_CHARS,
                EVENT_DESCRIPTION_MAX_CHARS,
            );
        }

        if self.start_datetime.is_none() {
            errors.push(FieldError::new(
                "start_datetime",
                ValidationFailureKind::Required,
                "start date is required",
            ));
        }
        if self.end_datetime.is_none() {
            errors.push(FieldError::new(
                "end_datetime",
                ValidationFailureKind::Required,
                "end date is required",
            ));
        }
        if let (Some(start), Some(end)) = (self.start_datetime, self.end_datetime) {
            if end < start {
                errors.push(FieldError::new(
                    "end_datetime",
                    ValidationFailureKind::InvalidDateOrder,
                    "end date must not precede start date",
                ));
            }
        }

        let price = match parse_price(self.price.as_deref()) {
            Ok(price) => price,
            Err(err) => {
                errors.push(err);
                None
            }
        };

        errors.require("address_street", &self.address_street, "street is required");
        errors.require("address_city", &self.address_city, "city is required");
        let postal = self.address_postal.trim();
        if postal.chars().count() != POSTAL_CODE_LEN || !postal.chars().all(|c| c.is_ascii_digit())
        {
            errors.push(FieldError::new(
                "address_postal",
                ValidationFailureKind::InvalidFormat,
                "postal code must be 5 digits",
            ));
        }

        if self.visibility.is_none() {
            errors.push(FieldError::new(
                "visibility",
                ValidationFailureKind::Required,
                "visibility is required",
            ));
        }
        if self.event_type.is_none() {
            errors.push(FieldError::new(
                "event_type",
                ValidationFailureKind::Required,
                "event type is required",
            ));
        }

        match (
            self.start_datetime,
            self.end_datetime,
            self.visibility,
            self.event_type,
        ) {
            (Some(start_datetime), Some(end_datetime), Some(visibility), Some(event_type))
                if errors.is_empty() =>
            {
                Ok(NewEvent {
                    user_id,
                    name: self.name.trim().to_string(),
                    description: self.description.trim().to_string(),
                    start_datetime,
                    end_datetime,
                    price,
                    address: Address {
                        street: self.address_street.trim().to_string(),
                        postal: postal.to_string(),
                        city: self.address_city.trim().to_string(),
                        extra: self
                            .address_extra
                            .as_ref()
                            .map(|extra| extra.trim().to_string())
                            .filter(|extra| !extra.is_empty()),
                    },
                    visibility,
                    event_type,
                    photo_url: None,
                })
            }
            _ => Err(errors),
        }
    }
}

/// 空文字は「価格なし」。カンマ小数も受け付ける。
fn parse_price(raw: Option<&str>) -> Result<Option<f64>, FieldError> {
    let Some(raw) = raw.map(str::trim).filter(|value| !value.is_empty()) else {
        return Ok(None);
    };
    let value = raw.replace(',', ".").parse::<f64>().map_err(|_| {
        FieldError::new(
            "price",
            ValidationFailureKind::InvalidFormat,
            "price must be a number",
        )
    })?;
    if !value.is_finite() || value < 0.0 {
        return Err(FieldError::new(
            "price",
            ValidationFailureKind::OutOfRange,
            "price must be zero or positive",
        ));
    }
    Ok(Some(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn valid_draft() -> EventDraft {
        EventDraft {
            name: "Jazz Night".into(),
            description: "Concert de jazz au bord du lac".into(),
            start_datetime: Some(Utc.with_ymd_and_hms(2025, 6, 21, 19, 0, 0).unwrap()),
            end_datetime: Some(Utc.with_ymd_and_hms(2025, 6, 21, 23, 0, 0).unwrap()),
            price: Some("12,50".into()),
            address_street: "1 rue de la Paix".into(),
            address_postal: "75002".into(),
            address_city: "Paris".into(),
            address_extra: Some(" ".into()),
            visibility: Some(Visibility::Public),
            event_type: Some(EventType::Anniversaire),
        }
    }

    #[test]
    fn valid_draft_becomes_new_event() {
        let event = valid_draft().validate(UserId::new("u1").unwrap()).unwrap();
        assert_eq!(event.price, Some(12.5));
        assert_eq!(event.address.extra, None);
        assert_eq!(event.photo_url, None);
    }

    #[test]
    fn every_invalid_field_is_reported() {
        let draft = EventDraft {
            name: "ab".into(),
            address_postal: "7500".into(),
            price: Some("gratuit".into()),
            ..Default::default()
        };
        let errors = draft.validate(UserId::new("u1").unwrap()).unwrap_err();
        for field in [
            "name",
            "description",
            "start_datetime",
            "end_datetime",
            "price",
            "address_street",
            "address_city",
            "address_postal",
            "visibility",
            "event_type",
        ] {
            assert!(errors.get(field).is_some(), "missing error for {field}");
        }
    }

    #[test]
    fn end_before_start_is_rejected() {
        let mut draft = valid_draft();
        draft.end_datetime = Some(Utc.with_ymd_and_hms(2025, 6, 20, 10, 0, 0).unwrap());
        let errors = draft.validate(UserId::new("u1").unwrap()).unwrap_err();
        assert_eq!(
            errors.get("end_datetime").map(|e| e.kind),
            Some(ValidationFailureKind::InvalidDateOrder)
        );
    }

    #[test]
    fn negative_price_is_out_of_range() {
        assert!(parse_price(Some("-3")).is_err());
        assert_eq!(parse_price(Some("")).unwrap(), None);
        assert_eq!(parse_price(None).unwrap(), None);
    }
}
