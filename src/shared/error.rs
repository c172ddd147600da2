use crate::shared::validation::{FieldErrors, ValidationFailureKind};
use thiserror::Error;

/// エラーの大分類。UI 側の表示方法（アラート・インライン・認証画面への遷移）を決める。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Gateway,
    Validation,
    NotAuthenticated,
    Internal,
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Gateway error: {0}")]
    Gateway(String),
    #[error("Database error: {0}")]
    Database(String),
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("Auth error: {0}")]
    Auth(String),
    #[error("Not authenticated")]
    NotAuthenticated,
    #[error("Validation error ({kind}): {message}")]
    ValidationError {
        kind: ValidationFailureKind,
        message: String,
    },
    #[error("Invalid fields: {0}")]
    InvalidFields(FieldErrors),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Configuration error: {0}")]
    ConfigurationError(String),
    #[error("Serialization error: {0}")]
    SerializationError(String),
    #[error("Deserialization error: {0}")]
    DeserializationError(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn validation(kind: ValidationFailureKind, message: impl Into<String>) -> Self {
        AppError::ValidationError {
            kind,
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            AppError::Gateway(_)
            | AppError::Database(_)
            | AppError::Storage(_)
            | AppError::Auth(_)
            | AppError::NotFound(_) => ErrorCategory::Gateway,
            AppError::ValidationError { .. }
            | AppError::InvalidFields(_)
            | AppError::InvalidInput(_) => ErrorCategory::Validation,
            AppError::NotAuthenticated => ErrorCategory::NotAuthenticated,
            AppError::ConfigurationError(_)
            | AppError::SerializationError(_)
            | AppError::DeserializationError(_)
            | AppError::Internal(_) => ErrorCategory::Internal,
        }
    }

    /// すべての失敗は操作単位で回復可能（ユーザー操作のやり直しで再試行できる）。
    pub fn is_recoverable(&self) -> bool {
        true
    }

    /// 楽観的更新の巻き戻しやキャッシュ保持のために、エラーを複製する。
    pub fn duplicate(&self) -> Self {
        match self {
            AppError::Gateway(msg) => AppError::Gateway(msg.clone()),
            AppError::Database(msg) => AppError::Database(msg.clone()),
            AppError::Storage(msg) => AppError::Storage(msg.clone()),
            AppError::Auth(msg) => AppError::Auth(msg.clone()),
            AppError::NotAuthenticated => AppError::NotAuthenticated,
            AppError::ValidationError { kind, message } => AppError::ValidationError {
                kind: *kind,
                message: message.clone(),
            },
            AppError::InvalidFields(fields) => AppError::InvalidFields(fields.clone()),
            AppError::NotFound(msg) => AppError::NotFound(msg.clone()),
            AppError::InvalidInput(msg) => AppError::InvalidInput(msg.clone()),
            AppError::ConfigurationError(msg) => AppError::ConfigurationError(msg.clone()),
            AppError::SerializationError(msg) => AppError::SerializationError(msg.clone()),
            AppError::DeserializationError(msg) => AppError::DeserializationError(msg.clone()),
            AppError::Internal(msg) => AppError::Internal(msg.clone()),
        }
    }
}

impl From<FieldErrors> for AppError {
    fn from(errors: FieldErrors) -> Self {
        AppError::InvalidFields(errors)
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::Database(err.to_string())
    }
}

impl From<sqlx::migrate::MigrateError> for AppError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        AppError::Database(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::SerializationError(err.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Storage(err.to_string())
    }
}

impl From<argon2::password_hash::Error> for AppError {
    fn from(err: argon2::password_hash::Error) -> Self {
        AppError::Auth(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
