pub mod catalog_service;
pub mod item_service;
pub mod save_service;
pub mod stats;

use std::fmt;

/// Error type for service operations
#[derive(Debug)]
pub enum ServiceError {
    /// Referenced catalog, item, or link does not exist
    NotFound,
    /// Caller is not the resource owner and the resource is not public
    Forbidden,
    /// A resolvable identity is required but none was supplied
    Unauthenticated,
    /// The operation is not allowed in this state (e.g. saving one's own catalog)
    InvalidOperation(String),
    /// The operation would duplicate existing state (e.g. saving twice)
    Conflict(String),
    /// Underlying store failure; multi-row writes roll back before surfacing this
    Database(String),
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceError::NotFound => write!(f, "resource not found"),
            ServiceError::Forbidden => write!(f, "access denied"),
            ServiceError::Unauthenticated => write!(f, "authentication required"),
            ServiceError::InvalidOperation(msg) => write!(f, "{}", msg),
            ServiceError::Conflict(msg) => write!(f, "{}", msg),
            ServiceError::Database(msg) => write!(f, "database error: {}", msg),
        }
    }
}

impl std::error::Error for ServiceError {}

impl From<sea_orm::DbErr> for ServiceError {
    fn from(e: sea_orm::DbErr) -> Self {
        ServiceError::Database(e.to_string())
    }
}
