//! # Database Error Types
//!
//! ## Error Flow
//! ```text
//! SQLite error (sqlx::Error)
//!      │
//!      ▼
//! DbError (this module) ← adds context and categorization
//!      │
//!      ▼
//! Presentation layer maps each variant to a human-readable message
//! naming the specific cause
//! ```
//!
//! `Conflict` is deliberately distinct from `QueryFailed`: it signals a
//! concurrent-update collision at commit time, so callers can choose to
//! retry with refreshed stock information. The core never auto-retries.

use thiserror::Error;

use pos_core::CoreError;

/// Database operation errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// Entity not found.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Business-key collision (product code, user email).
    #[error("Duplicate {field}: '{value}' already exists")]
    Duplicate { field: String, value: String },

    /// Deletion rejected because historical rows still reference the
    /// entity (products with sales, users with transactions).
    #[error("{entity} {id} is referenced by existing records and cannot be deleted")]
    StillReferenced { entity: String, id: String },

    /// A user attempted to delete their own account.
    #[error("Cannot delete your own account")]
    SelfDeletion,

    /// Concurrent-update collision detected at commit time. The caller
    /// may retry with refreshed data; the core never retries on its own.
    #[error("Storage conflict: {0}")]
    Conflict(String),

    /// Foreign key constraint violation.
    #[error("Foreign key violation: {message}")]
    ForeignKeyViolation { message: String },

    /// Database connection failed.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Migration failed.
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// Query execution failed.
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Pool exhausted (all connections in use).
    #[error("Connection pool exhausted")]
    PoolExhausted,

    /// Domain rule violation surfaced by a storage-layer operation
    /// (e.g. InsufficientStock during the authoritative re-validation).
    #[error(transparent)]
    Core(#[from] CoreError),
}

impl DbError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Creates a Duplicate error.
    pub fn duplicate(field: impl Into<String>, value: impl Into<String>) -> Self {
        DbError::Duplicate {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Creates a StillReferenced error.
    pub fn still_referenced(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::StillReferenced {
            entity: entity.into(),
            id: id.into(),
        }
    }
}

/// Convert sqlx errors to DbError.
///
/// ## Error Mapping
/// ```text
/// sqlx::Error::RowNotFound        → DbError::NotFound
/// sqlx::Error::Database (UNIQUE)  → DbError::Duplicate
/// sqlx::Error::Database (FK)      → DbError::ForeignKeyViolation
/// sqlx::Error::Database (BUSY)    → DbError::Conflict
/// sqlx::Error::PoolTimedOut       → DbError::PoolExhausted
/// Other                           → DbError::QueryFailed
/// ```
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::NotFound {
                entity: "Record".to_string(),
                id: "unknown".to_string(),
            },

            sqlx::Error::Database(db_err) => {
                let msg = db_err.message().to_string();

                // SQLite constraint messages:
                //   "UNIQUE constraint failed: <table>.<column>"
                //   "FOREIGN KEY constraint failed"
                //   "database is locked" (SQLITE_BUSY, concurrent writer)
                if msg.contains("UNIQUE constraint failed") {
                    let field = msg
                        .split("UNIQUE constraint failed: ")
                        .nth(1)
                        .unwrap_or("unknown")
                        .to_string();
                    DbError::Duplicate {
                        field,
                        value: "unknown".to_string(),
                    }
                } else if msg.contains("FOREIGN KEY constraint failed") {
                    DbError::ForeignKeyViolation { message: msg }
                } else if msg.contains("database is locked") || msg.contains("database table is locked")
                {
                    DbError::Conflict(msg)
                } else {
                    DbError::QueryFailed(msg)
                }
            }

            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,

            sqlx::Error::PoolClosed => DbError::ConnectionFailed("Pool is closed".to_string()),

            _ => DbError::QueryFailed(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;
