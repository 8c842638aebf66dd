//! Domain error taxonomy shared by the catalog, taxonomy and content modules.
//!
//! Storage-level unique violations (SQLSTATE 23505) are classified as
//! `UniquenessConflict` so callers can present them as retryable instead of
//! collapsing them into a generic save failure.

use thiserror::Error;

/// Postgres SQLSTATE for unique constraint violations.
const UNIQUE_VIOLATION: &str = "23505";

#[derive(Debug, Error)]
pub enum StoreError {
    /// Missing required field or unresolvable required reference.
    /// Recovered locally; nothing is persisted.
    #[error("validation failed: {0}")]
    Validation(String),

    /// Duplicate slug/SKU/attribute pair detected at commit time.
    /// The transaction has been rolled back; the operation is retryable.
    #[error("uniqueness conflict: {0}")]
    UniquenessConflict(String),

    /// Entity lookup by id or slug found nothing (or the row is inactive).
    #[error("{0} not found")]
    NotFound(&'static str),

    /// Any other storage failure inside a multi-row transaction.
    #[error("storage error: {0}")]
    Save(#[source] sqlx::Error),
}

impl StoreError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::UniquenessConflict(_))
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(ref db) = err {
            if db.code().as_deref() == Some(UNIQUE_VIOLATION) {
                let constraint = db.constraint().unwrap_or("unique constraint");
                return Self::UniquenessConflict(constraint.to_string());
            }
        }
        match err {
            sqlx::Error::RowNotFound => Self::NotFound("row"),
            other => Self::Save(other),
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_not_found_maps_to_not_found() {
        let err = StoreError::from(sqlx::Error::RowNotFound);
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[test]
    fn only_conflicts_are_retryable() {
        assert!(StoreError::UniquenessConflict("sku".into()).is_retryable());
        assert!(!StoreError::validation("x").is_retryable());
        assert!(!StoreError::NotFound("product").is_retryable());
    }
}
