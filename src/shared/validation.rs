use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// バリデーション失敗の種別。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationFailureKind {
    /// 汎用的なバリデーションエラー。
    Generic,
    /// 必須項目が未入力。
    Required,
    /// 文字数が下限未満。
    TooShort,
    /// 文字数が上限超過。
    TooLong,
    /// 書式が不正（郵便番号・メールアドレス・数値など）。
    InvalidFormat,
    /// 値が許容範囲外。
    OutOfRange,
    /// 終了日時が開始日時より前。
    InvalidDateOrder,
}

impl ValidationFailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValidationFailureKind::Generic => "generic",
            ValidationFailureKind::Required => "required",
            ValidationFailureKind::TooShort => "too_short",
            ValidationFailureKind::TooLong => "too_long",
            ValidationFailureKind::InvalidFormat => "invalid_format",
            ValidationFailureKind::OutOfRange => "out_of_range",
            ValidationFailureKind::InvalidDateOrder => "invalid_date_order",
        }
    }
}

impl fmt::Display for ValidationFailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ValidationFailureKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "generic" => Ok(ValidationFailureKind::Generic),
            "required" => Ok(ValidationFailureKind::Required),
            "too_short" => Ok(ValidationFailureKind::TooShort),
            "too_long" => Ok(ValidationFailureKind::TooLong),
            "invalid_format" => Ok(ValidationFailureKind::InvalidFormat),
            "out_of_range" => Ok(ValidationFailureKind::OutOfRange),
            "invalid_date_order" => Ok(ValidationFailureKind::InvalidDateOrder),
            _ => Err(()),
        }
    }
}

/// フォーム項目単位のエラー。UI はフィールド名でインライン表示する。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub kind: ValidationFailureKind,
    pub message: String,
}

impl FieldError {
    pub fn new(
        field: impl Into<String>,
        kind: ValidationFailureKind,
        message: impl Into<String>,
    ) -> Self {
        Self {
            field: field.into(),
            kind,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldErrors(Vec<FieldError>);

impl FieldErrors {
    pub fn push(&mut self, error: FieldError) {
        self.0.push(error);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldError> {
        self.0.iter()
    }

    pub fn get(&self, field: &str) -> Option<&FieldError> {
        self.0.iter().find(|error| error.field == field)
    }

    /// 必須チェック。空白のみの入力も未入力として扱う。
    pub fn require(&mut self, field: &str, value: &str, message: &str) -> bool {
        if value.trim().is_empty() {
            self.push(FieldError::new(
                field,
                ValidationFailureKind::Required,
                message,
            ));
            return false;
        }
        true
    }

    /// 文字数（Unicode スカラー値単位）の範囲チェック。
    pub fn check_length(&mut self, field: &str, value: &str, min: usize, max: usize) {
        let count = value.trim().chars().count();
        if count < min {
            self.push(FieldError::new(
                field,
                ValidationFailureKind::TooShort,
                format!("must be at least {min} characters"),
            ));
        } else if count > max {
            self.push(FieldError::new(
                field,
                ValidationFailureKind::TooLong,
                format!("must be at most {max} characters"),
            ));
        }
    }

    pub fn into_result(self) -> Result<(), FieldErrors> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined = self
            .0
            .iter()
            .map(|error| format!("{}: {}", error.field, error.message))
            .collect::<Vec<_>>()
            .join(", ");
        f.write_str(&joined)
    }
}

/// 本文系（メッセージ・コメント・通報理由）の共通チェック。前後の空白を除いた文字列を返す。
pub fn validate_text_body(
    field: &str,
    value: &str,
    max_chars: usize,
) -> Result<String, FieldErrors> {
    let mut errors = FieldErrors::default();
    let trimmed = value.trim();
    if errors.require(field, trimmed, "must not be empty") {
        errors.check_length(field, trimmed, 1, max_chars);
    }
    errors.into_result().map(|_| trimmed.to_string())
}
