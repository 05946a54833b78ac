use thiserror::Error;

/// PostgreSQL SQLSTATE for `lock_not_available` (lock_timeout expired).
const LOCK_NOT_AVAILABLE: &str = "55P03";
/// PostgreSQL SQLSTATE for `deadlock_detected`.
const DEADLOCK_DETECTED: &str = "40P01";
/// PostgreSQL SQLSTATE for `unique_violation`.
const UNIQUE_VIOLATION: &str = "23505";

/// Errors that can occur when interacting with checkout storage.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Waiting for a row lock took longer than the configured timeout, or
    /// the database broke a deadlock by cancelling this session.
    #[error("Lock wait timed out on {resource}")]
    LockTimeout { resource: String },

    /// A write targeted a row this session never locked.
    #[error("Row {resource} is not locked by this session")]
    NotLocked { resource: String },

    /// A unique constraint rejected the write.
    #[error("Unique constraint violated: {constraint}")]
    UniqueViolation { constraint: String },

    /// A referential or check constraint rejected the write.
    #[error("Constraint violated: {0}")]
    Constraint(String),

    /// A stored row could not be mapped back into a domain value.
    #[error("Corrupt row in {table}: {reason}")]
    CorruptRow { table: &'static str, reason: String },

    /// The commit itself failed; nothing from the session was applied.
    #[error("Commit failed: {0}")]
    CommitFailed(String),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[source] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

impl StoreError {
    /// Returns true if this error is a lock wait timeout.
    pub fn is_lock_timeout(&self) -> bool {
        matches!(self, StoreError::LockTimeout { .. })
    }

    pub(crate) fn lock_timeout(resource: impl std::fmt::Display) -> Self {
        StoreError::LockTimeout {
            resource: resource.to_string(),
        }
    }

    pub(crate) fn not_locked(resource: impl std::fmt::Display) -> Self {
        StoreError::NotLocked {
            resource: resource.to_string(),
        }
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(ref db_err) = err {
            match db_err.code().as_deref() {
                Some(LOCK_NOT_AVAILABLE) | Some(DEADLOCK_DETECTED) => {
                    return StoreError::LockTimeout {
                        resource: db_err.message().to_string(),
                    };
                }
                Some(UNIQUE_VIOLATION) => {
                    return StoreError::UniqueViolation {
                        constraint: db_err.constraint().unwrap_or("unknown").to_string(),
                    };
                }
                _ => {}
            }
        }
        StoreError::Database(err)
    }
}

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StoreError>;
