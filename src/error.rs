//! Load error types.
//! One error enum covering every way a table load can fail.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    // Input
    #[error("Source file error in {}: {reason}", .path.display())]
    SourceFile { path: PathBuf, reason: String },

    // Schema binding
    #[error("Schema mismatch for table '{table}': {reason}")]
    SchemaMismatch { table: String, reason: String },

    // Insert
    #[error("Constraint violation on table '{table}': {message}")]
    ConstraintViolation { table: String, message: String },

    // Store
    #[error("Storage unavailable at {location}: {source}")]
    StorageUnavailable {
        location: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("Storage error: {0}")]
    Storage(#[from] sqlx::Error),
}

impl LoadError {
    pub fn source_file(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::SourceFile {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn schema_mismatch(table: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::SchemaMismatch {
            table: table.into(),
            reason: reason.into(),
        }
    }

    /// Stable label used in operator-facing diagnostics
    pub fn kind(&self) -> &'static str {
        match self {
            Self::SourceFile { .. } => "SOURCE_FILE",
            Self::SchemaMismatch { .. } => "SCHEMA_MISMATCH",
            Self::ConstraintViolation { .. } => "CONSTRAINT_VIOLATION",
            Self::StorageUnavailable { .. } => "STORAGE_UNAVAILABLE",
            Self::Storage(_) => "STORAGE",
        }
    }

    /// Classify an error raised while inserting into `table`
    ///
    /// Unique, primary key, foreign key, not-null and check failures all become
    /// `ConstraintViolation`; anything else stays a plain storage error.
    pub fn from_insert(table: &str, err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            let is_constraint = db_err.is_unique_violation()
                || db_err.is_foreign_key_violation()
                || db_err.is_check_violation()
                || matches!(db_err.kind(), sqlx::error::ErrorKind::NotNullViolation);
            if is_constraint {
                return Self::ConstraintViolation {
                    table: table.to_string(),
                    message: db_err.message().to_string(),
                };
            }
        }
        Self::Storage(err)
    }
}

pub type Result<T, E = LoadError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_labels_are_distinct() {
        let errors = [
            LoadError::source_file("data/x.txt", "missing"),
            LoadError::schema_mismatch("Lender", "bad header"),
            LoadError::ConstraintViolation {
                table: "Lender".to_string(),
                message: "UNIQUE constraint failed".to_string(),
            },
            LoadError::StorageUnavailable {
                location: "db".to_string(),
                source: sqlx::Error::PoolTimedOut,
            },
            LoadError::Storage(sqlx::Error::RowNotFound),
        ];

        let kinds: std::collections::HashSet<_> = errors.iter().map(|e| e.kind()).collect();
        assert_eq!(kinds.len(), errors.len());
    }

    #[test]
    fn test_source_file_message_names_path() {
        let err = LoadError::source_file("data/2023_ts.txt", "line 4: expected 10 fields, found 9");
        let message = err.to_string();
        assert!(message.contains("data/2023_ts.txt"));
        assert!(message.contains("line 4"));
    }

    #[test]
    fn test_non_database_insert_error_stays_storage() {
        let err = LoadError::from_insert("hmda_data", sqlx::Error::PoolClosed);
        assert_eq!(err.kind(), "STORAGE");
    }
}
