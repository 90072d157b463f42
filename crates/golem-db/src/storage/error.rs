//! Storage error handling
//!
//! Provides typed errors for persistence operations, precise enough for a
//! caller to decide whether to retry, abort or alert an operator.

use std::io;
use std::path::PathBuf;

use rusqlite::ErrorCode;
use thiserror::Error;

use crate::codec::CodecError;

/// Errors that can occur during storage operations
#[derive(Error, Debug)]
pub enum StorageError {
    /// A column value failed to encode or decode
    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    /// UNIQUE, PRIMARY KEY, FOREIGN KEY or NOT NULL violation
    #[error("Constraint violation: {details}")]
    Constraint {
        details: String,
        #[source]
        source: rusqlite::Error,
    },

    /// A write waited longer than the busy timeout for another connection
    #[error("Database is busy: {details}")]
    Busy {
        details: String,
        #[source]
        source: rusqlite::Error,
    },

    /// Schema reconciliation failed; the database is in an unknown state
    #[error("Schema reconciliation failed: {details}")]
    Schema {
        details: String,
        #[source]
        source: rusqlite::Error,
    },

    /// The database connection could not be established
    #[error("Failed to open database '{path}': {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Entity access on a handle that is not open
    #[error("Database is not open")]
    Closed,

    /// A keyed update or delete matched no row
    #[error("No {table} row matches {key}")]
    NotFound { table: &'static str, key: String },

    /// Failed to create data directory
    #[error("Failed to create data directory '{path}': {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Permission denied accessing path
    #[error("Permission denied: cannot access '{path}'. Check file permissions.")]
    PermissionDenied {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Disk is full or quota exceeded
    #[error(
        "Disk full or quota exceeded while writing to '{path}'. Free up disk space and try again."
    )]
    DiskFull {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Any other SQLite error
    #[error("Database error: {0}")]
    Database(#[source] rusqlite::Error),

    /// Generic I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl From<rusqlite::Error> for StorageError {
    /// Classifies engine errors by their SQLite result code
    fn from(error: rusqlite::Error) -> Self {
        let code = match &error {
            rusqlite::Error::SqliteFailure(failure, _) => Some(failure.code),
            _ => None,
        };

        match code {
            Some(ErrorCode::ConstraintViolation) => StorageError::Constraint {
                details: error.to_string(),
                source: error,
            },
            Some(ErrorCode::DatabaseBusy) | Some(ErrorCode::DatabaseLocked) => {
                StorageError::Busy {
                    details: error.to_string(),
                    source: error,
                }
            }
            _ => StorageError::Database(error),
        }
    }
}

impl StorageError {
    /// Create an error from an I/O error with path context
    ///
    /// Classifies the error based on its kind (permission, disk full, etc.)
    pub fn from_io(error: io::Error, path: PathBuf) -> Self {
        match error.kind() {
            io::ErrorKind::PermissionDenied => StorageError::PermissionDenied {
                path,
                source: error,
            },
            _ if is_disk_full_error(&error) => StorageError::DiskFull {
                path,
                source: error,
            },
            _ => StorageError::CreateDirectory {
                path,
                source: error,
            },
        }
    }

    /// Wrap an engine error raised while reconciling the schema
    pub fn schema(details: impl Into<String>, source: rusqlite::Error) -> Self {
        StorageError::Schema {
            details: details.into(),
            source,
        }
    }

    /// Whether the failed operation may succeed if the caller retries it
    pub fn is_retryable(&self) -> bool {
        matches!(self, StorageError::Busy { .. })
    }

    /// Whether the process must stop serving persistence requests
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            StorageError::Schema { .. } | StorageError::Open { .. }
        )
    }

    /// Whether this is a uniqueness or referential-integrity violation
    pub fn is_constraint(&self) -> bool {
        matches!(self, StorageError::Constraint { .. })
    }

    /// Get a recovery suggestion for this error
    pub fn recovery_suggestion(&self) -> Option<&'static str> {
        match self {
            StorageError::Busy { .. } => {
                Some("Another process holds a write lock on the database. Retry later.")
            }
            StorageError::Schema { .. } => {
                Some("Stop the node and remove the database file; it is rebuilt on next start.")
            }
            StorageError::Codec(_) => {
                Some("Stored data does not match this release. Run `golem-dbctl reset --yes` to rebuild.")
            }
            StorageError::DiskFull { .. } => Some("Free up disk space and try again."),
            StorageError::PermissionDenied { .. } => {
                Some("Check file and directory permissions. You may need to run with different permissions or change ownership.")
            }
            StorageError::CreateDirectory { .. } => {
                Some("Check that the parent directory exists and you have write permissions.")
            }
            _ => None,
        }
    }
}

/// Check if an I/O error indicates disk full condition
fn is_disk_full_error(error: &io::Error) -> bool {
    let msg = error.to_string().to_lowercase();
    msg.contains("no space left")
        || msg.contains("disk full")
        || msg.contains("quota exceeded")
        || msg.contains("not enough space")
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    #[test]
    fn test_permission_denied_classification() {
        let io_err = io::Error::new(io::ErrorKind::PermissionDenied, "access denied");
        let err = StorageError::from_io(io_err, PathBuf::from("/test/path"));

        assert!(matches!(err, StorageError::PermissionDenied { .. }));
        assert!(err.recovery_suggestion().is_some());
    }

    #[test]
    fn test_disk_full_detection() {
        let io_err = io::Error::new(io::ErrorKind::Other, "No space left on device");
        let err = StorageError::from_io(io_err, PathBuf::from("/full/disk"));

        assert!(matches!(err, StorageError::DiskFull { .. }));
    }

    #[test]
    fn test_unique_violation_is_constraint() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE t (k TEXT PRIMARY KEY);")
            .unwrap();
        conn.execute("INSERT INTO t (k) VALUES ('a')", []).unwrap();

        let err: StorageError = conn
            .execute("INSERT INTO t (k) VALUES ('a')", [])
            .unwrap_err()
            .into();

        assert!(err.is_constraint());
        assert!(!err.is_retryable());
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_other_sqlite_errors_pass_through() {
        let conn = Connection::open_in_memory().unwrap();
        let err: StorageError = conn
            .execute("SELECT * FROM missing_table", [])
            .unwrap_err()
            .into();

        assert!(matches!(err, StorageError::Database(_)));
    }

    #[test]
    fn test_codec_error_wraps() {
        let err: StorageError = CodecError::UnknownOrdinal {
            enum_name: "PaymentStatus",
            ordinal: 9,
        }
        .into();

        assert!(err.to_string().contains("PaymentStatus"));
        assert!(err.recovery_suggestion().is_some());
    }

    #[test]
    fn test_schema_error_is_fatal() {
        let err = StorageError::schema(
            "drop failed",
            rusqlite::Error::InvalidQuery,
        );
        assert!(err.is_fatal());
        assert!(err.to_string().contains("drop failed"));
    }
}
