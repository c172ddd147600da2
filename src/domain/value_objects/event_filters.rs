use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// イベント一覧の絞り込み条件。フィールド間は AND、複数選択フィールド内は OR。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventFilters {
    #[serde(default)]
    pub event_types: BTreeSet<String>,
    #[serde(default)]
    pub cities: BTreeSet<String>,
    #[serde(default)]
    pub date_range: DateRange,
    #[serde(default)]
    pub price_range: PriceRange,
}

/// 日付は暦日。解釈するタイムゾーンは検索エンジン側で与える。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateRange {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceRange {
    pub min: Option<f64>,
    pub max: Option<f64>,
    #[serde(default)]
    pub is_free: bool,
}

impl DateRange {
    pub fn is_default(&self) -> bool {
        self.start_date.is_none() && self.end_date.is_none()
    }
}

impl PriceRange {
    pub fn is_default(&self) -> bool {
        !self.is_free && self.min.is_none() && self.max.is_none()
    }
}

impl EventFilters {
    pub fn with_event_type(mut self, event_type: impl Into<String>) -> Self {
        self.event_types.insert(event_type.into());
        self
    }

    pub fn with_city(mut self, city: impl Into<String>) -> Self {
        self.cities.insert(city.into());
        self
    }

    pub fn free_only(mut self) -> Self {
        self.price_range.is_free = true;
        self
    }

    /// 複数選択の切り替え（選択済みなら外す）。
    pub fn toggle_event_type(&mut self, event_type: &str) {
        if !self.event_types.remove(event_type) {
            self.event_types.insert(event_type.to_string());
        }
    }

    pub fn toggle_city(&mut self, city: &str) {
        if !self.cities.remove(city) {
            self.cities.insert(city.to_string());
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn is_default(&self) -> bool {
        self.active_count() == 0
    }

    /// バッジ表示用。選択値の個数ではなく、既定値でないカテゴリ数を数える。
    pub fn active_count(&self) -> usize {
        [
            !self.event_types.is_empty(),
            !self.cities.is_empty(),
            !self.date_range.is_default(),
            !self.price_range.is_default(),
        ]
        .into_iter()
        .filter(|active| *active)
        .count()
    }
}
