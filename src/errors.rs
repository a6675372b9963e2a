use sea_orm::error::{DbErr, SqlErr};
use serde::Serialize;

#[derive(Debug, thiserror::Error, Serialize)]
pub enum ServiceError {
    #[error("Database error: {0}")]
    DatabaseError(
        #[from]
        #[serde(skip)]
        sea_orm::error::DbErr,
    ),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Invalid status: {0}")]
    InvalidStatus(String),

    #[error("Expired: {0}")]
    Expired(String),

    #[error("Migration error: {0}")]
    MigrationError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Config error: {0}")]
    ConfigError(String),

    #[error("Internal error: {0}")]
    InternalError(String),

    #[error("Other error: {0}")]
    Other(
        #[from]
        #[serde(skip)]
        anyhow::Error,
    ),
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(err: validator::ValidationErrors) -> Self {
        ServiceError::ValidationError(err.to_string())
    }
}

impl From<serde_json::Error> for ServiceError {
    fn from(err: serde_json::Error) -> Self {
        ServiceError::SerializationError(err.to_string())
    }
}

pub trait IntoDbErr {
    fn into_db_err(self) -> DbErr;
}

impl IntoDbErr for DbErr {
    fn into_db_err(self) -> DbErr {
        self
    }
}

impl IntoDbErr for String {
    fn into_db_err(self) -> DbErr {
        DbErr::Custom(self)
    }
}

impl IntoDbErr for &str {
    fn into_db_err(self) -> DbErr {
        DbErr::Custom(self.to_string())
    }
}

impl ServiceError {
    /// Generic constructor that normalizes any supported database error input.
    pub fn db_error<E: IntoDbErr>(error: E) -> Self {
        ServiceError::DatabaseError(error.into_db_err())
    }

    pub fn not_found(entity: &str, id: impl std::fmt::Display) -> Self {
        ServiceError::NotFound(format!("{} with ID {} not found", entity, id))
    }

    /// True when the error is contention on a unique key rather than corruption.
    pub fn is_conflict(&self) -> bool {
        match self {
            Self::Conflict(_) => true,
            Self::DatabaseError(e) => is_unique_violation(e),
            _ => false,
        }
    }

    /// Stable machine-readable code, used in logs and CLI output.
    pub fn category(&self) -> &'static str {
        match self {
            Self::DatabaseError(e) if is_unique_violation(e) => "conflict",
            Self::DatabaseError(_) => "database_error",
            Self::NotFound(_) => "not_found",
            Self::ValidationError(_) => "validation_error",
            Self::InvariantViolation(_) => "invariant_violation",
            Self::Conflict(_) => "conflict",
            Self::InvalidStatus(_) => "invalid_status",
            Self::Expired(_) => "expired",
            Self::MigrationError(_) => "migration_error",
            Self::SerializationError(_) => "serialization_error",
            Self::ConfigError(_) => "config_error",
            Self::InternalError(_) | Self::Other(_) => "internal_error",
        }
    }
}

/// Returns true when the database rejected a write because of a unique index.
pub fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

/// Maps a unique violation to `ServiceError::Conflict`, everything else to a database error.
pub fn conflict_or_db(err: DbErr, what: impl FnOnce() -> String) -> ServiceError {
    if is_unique_violation(&err) {
        ServiceError::Conflict(what())
    } else {
        ServiceError::db_error(err)
    }
}

pub type AppError = ServiceError;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_mapping() {
        assert_eq!(ServiceError::NotFound("x".into()).category(), "not_found");
        assert_eq!(
            ServiceError::InvariantViolation("x".into()).category(),
            "invariant_violation"
        );
        assert_eq!(ServiceError::Conflict("x".into()).category(), "conflict");
        assert_eq!(
            ServiceError::db_error("boom").category(),
            "database_error"
        );
    }

    #[test]
    fn conflict_detection() {
        assert!(ServiceError::Conflict("dup".into()).is_conflict());
        assert!(!ServiceError::db_error("boom").is_conflict());
        assert!(!ServiceError::Expired("late".into()).is_conflict());
    }

    #[test]
    fn display_includes_message() {
        assert_eq!(
            ServiceError::not_found("Listing", 42).to_string(),
            "Not found: Listing with ID 42 not found"
        );
    }
}
