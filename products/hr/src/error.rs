use sea_orm::DbErr;
use thiserror::Error;

use crate::validate::ValidationErrors;

pub type HrResult<T> = Result<T, HrError>;

#[derive(Debug, Error)]
pub enum HrError {
    #[error(transparent)]
    Validation(#[from] ValidationErrors),
    #[error("Email already registered")]
    DuplicateEmail,
    #[error("Employee not found")]
    NotFound,
    #[error("database error: {0}")]
    Db(#[from] DbErr),
}

impl HrError {
    /// Classify a failed insert/update. A unique violation on the email index
    /// becomes [`HrError::DuplicateEmail`]; anything else stays a storage error.
    pub fn from_write(err: DbErr) -> Self {
        match platform_db::unique_violation(&err) {
            Some(message) if message.to_lowercase().contains("email") => HrError::DuplicateEmail,
            _ => HrError::Db(err),
        }
    }
}
