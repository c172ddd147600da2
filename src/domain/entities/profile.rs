use crate::domain::value_objects::UserId;
use crate::shared::validation::FieldErrors;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const USERNAME_MAX_CHARS: usize = 50;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: UserId,
    pub username: String,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
    pub full_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 一覧・結合表示用の縮約プロフィール。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileSummary {
    pub id: UserId,
    pub username: String,
    pub avatar_url: Option<String>,
    pub full_name: Option<String>,
}

impl Profile {
    pub fn summary(&self) -> ProfileSummary {
        ProfileSummary {
            id: self.id.clone(),
            username: self.username.clone(),
            avatar_url: self.avatar_url.clone(),
            full_name: self.full_name.clone(),
        }
    }
}

/// サインアップ後のプロフィール補完フォーム。
#[derive(Debug, Clone, Default)]
pub struct ProfileDraft {
    pub username: String,
    pub bio: Option<String>,
    pub full_name: Option<String>,
}

impl ProfileDraft {
    pub fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::default();
        if errors.require("username", &self.username, "username is required") {
            errors.check_length("username", &self.username, 1, USERNAME_MAX_CHARS);
        }
        errors.into_result()
    }

    /// 既存プロフィールがあれば作成日時を引き継いで上書きする。
    pub fn into_profile(
        self,
        id: UserId,
        avatar_url: Option<String>,
        existing: Option<&Profile>,
    ) -> Profile {
        let now = Utc::now();
        Profile {
            id,
            username: self.username.trim().to_string(),
            bio: non_blank(self.bio),
            avatar_url: avatar_url.or_else(|| existing.and_then(|p| p.avatar_url.clone())),
            full_name: non_blank(self.full_name),
            created_at: existing.map(|p| p.created_at).unwrap_or(now),
            updated_at: now,
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
