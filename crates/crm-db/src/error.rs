//! Database-specific error types and conversions.

use crm_core::error::CrmError;

/// Database-layer error type.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("SurrealDB error: {0}")]
    Surreal(#[from] surrealdb::Error),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Unique constraint violated on {entity}")]
    Conflict { entity: String },

    #[error("Malformed record: {0}")]
    Decode(String),

    #[error("Password hashing failed: {0}")]
    Hash(String),

    #[error("Record not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("{entity} does not belong to this organisation")]
    OutsideOrganisation { entity: String },
}

/// Thrown inside a transaction when the target record does not match
/// the caller's scope.
pub(crate) const OUT_OF_SCOPE: &str = "crm:out_of_scope";

/// Thrown inside a transaction when a referenced record is missing
/// from the organisation.
pub(crate) const FOREIGN_REFERENCE: &str = "crm:foreign_reference";

impl DbError {
    /// Classify an error reported by `Response::check`.
    ///
    /// Unique index violations become [`DbError::Conflict`] so callers
    /// can report a duplicate instead of a generic failure.
    pub(crate) fn from_check(entity: &str, err: surrealdb::Error) -> Self {
        let message = err.to_string();
        if message.contains("already contains") {
            DbError::Conflict {
                entity: entity.into(),
            }
        } else {
            DbError::Query(message)
        }
    }
}

impl From<DbError> for CrmError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => CrmError::NotFound { entity, id },
            DbError::Conflict { entity } => CrmError::AlreadyExists { entity },
            err @ DbError::OutsideOrganisation { .. } => CrmError::Validation {
                message: err.to_string(),
            },
            other => CrmError::Database(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_maps_to_domain_not_found() {
        let err: CrmError = DbError::NotFound {
            entity: "lead".into(),
            id: "42".into(),
        }
        .into();
        assert!(err.is_not_found());
    }

    #[test]
    fn conflict_maps_to_already_exists() {
        let err: CrmError = DbError::Conflict {
            entity: "category".into(),
        }
        .into();
        assert!(matches!(err, CrmError::AlreadyExists { entity } if entity == "category"));
    }

    #[test]
    fn foreign_reference_maps_to_validation() {
        let err: CrmError = DbError::OutsideOrganisation {
            entity: "agent".into(),
        }
        .into();
        assert!(
            matches!(err, CrmError::Validation { message } if message.starts_with("agent does not belong"))
        );
    }

    #[test]
    fn other_errors_map_to_database() {
        let err: CrmError = DbError::Decode("bad uuid".into()).into();
        assert!(matches!(err, CrmError::Database(_)));
    }
}
