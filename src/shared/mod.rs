pub mod config;
pub mod error;
pub mod validation;

pub use config::AppConfig;
pub use error::{AppError, ErrorCategory, Result};
pub use validation::{FieldError, FieldErrors, ValidationFailureKind};
