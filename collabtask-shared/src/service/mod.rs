/// Application services
///
/// - [`tasks`]: task mutations, their side-effect records and fan-out
/// - [`accounts`]: registration, login and profile
///
/// Services report typed failures and know nothing about HTTP. The API
/// layer maps [`ServiceError`] to status codes.

pub mod accounts;
pub mod tasks;

pub use accounts::{AccountService, LoginInput, RegisterInput, Session};
pub use tasks::TaskService;

use crate::auth::jwt::JwtError;
use crate::auth::password::PasswordError;
use crate::store::StoreError;

/// Error type for service operations
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// Referenced task, user or notification does not exist
    #[error("{0}")]
    NotFound(String),

    /// Caller may not perform this operation
    #[error("{0}")]
    Forbidden(String),

    /// Duplicate record or lost update race
    #[error("{0}")]
    Conflict(String),

    /// Input rejected by a business rule
    #[error("{0}")]
    Validation(String),

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Store error: {0}")]
    Store(StoreError),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => ServiceError::NotFound("Record not found".to_string()),
            StoreError::Conflict(message) => ServiceError::Conflict(message),
            other => ServiceError::Store(other),
        }
    }
}

impl From<PasswordError> for ServiceError {
    fn from(err: PasswordError) -> Self {
        ServiceError::Internal(err.to_string())
    }
}

impl From<JwtError> for ServiceError {
    fn from(err: JwtError) -> Self {
        ServiceError::Internal(err.to_string())
    }
}
