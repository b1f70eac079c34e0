//! Error types for the CRM.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CrmError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Entity already exists: {entity}")]
    AlreadyExists { entity: String },

    #[error("Authorization denied: {reason}")]
    AuthorizationDenied { reason: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Database error: {0}")]
    Database(String),

    #[error("Notification failed: {0}")]
    Notification(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CrmError {
    pub fn not_found(entity: &str, id: impl ToString) -> Self {
        CrmError::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, CrmError::NotFound { .. })
    }
}

pub type CrmResult<T> = Result<T, CrmError>;
