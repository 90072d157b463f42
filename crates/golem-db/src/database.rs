//! Database handle
//!
//! A [`Database`] owns the single SQLite connection a node uses for its
//! whole lifetime. Create it once at startup, pass it by reference to
//! whatever needs persistence, close it once at shutdown.
//!
//! ## Usage
//!
//! ```ignore
//! let mut db = Database::open_with_config(&config)?;
//!
//! Payment::new("subtask-1", payee, value).insert(db.connection()?)?;
//!
//! let tx = db.transaction()?;
//! payment.save(&tx)?;
//! income.insert(&tx)?;
//! tx.commit()?;
//!
//! db.close()?;
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use rusqlite::{Connection, Transaction};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::models::count_rows;
use crate::storage::error::{StorageError, StorageResult};
use crate::storage::schema::{
    self, ReconcileOutcome, TableSpec, MANAGED_TABLES, SCHEMA_VERSION,
};

/// Path SQLite understands as a private in-memory database
const IN_MEMORY: &str = ":memory:";

/// Process-wide handle to the node database
pub struct Database {
    path: PathBuf,
    busy_timeout: Duration,
    schema_version: i32,
    managed: &'static [&'static TableSpec],
    conn: Option<Connection>,
}

impl Database {
    /// Closed handle for the database described by `config`
    pub fn new(config: &Config) -> Self {
        Self::at_path(config.database_path()).with_busy_timeout(config.busy_timeout())
    }

    /// Closed handle for a database file, with default settings
    pub fn at_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            busy_timeout: Config::default().busy_timeout(),
            schema_version: SCHEMA_VERSION,
            managed: MANAGED_TABLES,
            conn: None,
        }
    }

    /// Open the database described by `config`
    pub fn open_with_config(config: &Config) -> StorageResult<Self> {
        let mut db = Self::new(config);
        db.open()?;
        Ok(db)
    }

    /// Open a database file with default settings
    pub fn open_path(path: impl Into<PathBuf>) -> StorageResult<Self> {
        let mut db = Self::at_path(path);
        db.open()?;
        Ok(db)
    }

    /// Open a private in-memory database (for testing)
    pub fn open_in_memory() -> StorageResult<Self> {
        Self::open_path(IN_MEMORY)
    }

    /// Override the schema version this handle expects
    pub fn with_schema_version(mut self, version: i32) -> Self {
        self.schema_version = version;
        self
    }

    /// Override the busy timeout applied on open
    pub fn with_busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    /// Override which tables a version change resets
    pub fn with_managed_tables(mut self, managed: &'static [&'static TableSpec]) -> Self {
        self.managed = managed;
        self
    }

    /// Open the connection and reconcile the schema
    ///
    /// Does nothing if the handle is already open.
    pub fn open(&mut self) -> StorageResult<()> {
        if self.conn.is_some() {
            return Ok(());
        }

        if self.path != Path::new(IN_MEMORY) {
            if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)
                    .map_err(|e| StorageError::from_io(e, parent.to_path_buf()))?;
            }
        }

        let mut conn = Connection::open(&self.path).map_err(|e| self.open_error(e))?;
        conn.pragma_update(None, "foreign_keys", true)
            .map_err(|e| self.open_error(e))?;
        conn.busy_timeout(self.busy_timeout)
            .map_err(|e| self.open_error(e))?;

        let outcome = schema::reconcile(&mut conn, self.schema_version, self.managed)?;
        info!(
            "Opened database {:?} at schema version {} (reset: {})",
            self.path, outcome.version, outcome.reset
        );

        self.conn = Some(conn);
        Ok(())
    }

    /// Release the connection
    ///
    /// Does nothing if the handle is already closed.
    pub fn close(&mut self) -> StorageResult<()> {
        let Some(conn) = self.conn.take() else {
            return Ok(());
        };

        match conn.close() {
            Ok(()) => {
                debug!("Closed database {:?}", self.path);
                Ok(())
            }
            Err((conn, e)) => {
                self.conn = Some(conn);
                Err(e.into())
            }
        }
    }

    pub fn is_open(&self) -> bool {
        self.conn.is_some()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Schema version this handle expects
    pub fn schema_version(&self) -> i32 {
        self.schema_version
    }

    /// The open connection, for entity operations
    pub fn connection(&self) -> StorageResult<&Connection> {
        self.conn.as_ref().ok_or(StorageError::Closed)
    }

    /// Begin a transaction for changes that must land together
    pub fn transaction(&mut self) -> StorageResult<Transaction<'_>> {
        let conn = self.conn.as_mut().ok_or(StorageError::Closed)?;
        Ok(conn.transaction()?)
    }

    /// Schema version stored in the file
    pub fn stored_version(&self) -> StorageResult<i32> {
        schema::get_version(self.connection()?)
    }

    /// Reconcile against a new expected version
    ///
    /// Later calls to [`Database::open`] after a close expect this version.
    pub fn reconcile_schema(&mut self, expected_version: i32) -> StorageResult<ReconcileOutcome> {
        let managed = self.managed;
        let conn = self.conn.as_mut().ok_or(StorageError::Closed)?;
        let outcome = schema::reconcile(conn, expected_version, managed)?;
        self.schema_version = expected_version;
        Ok(outcome)
    }

    /// Drop and recreate every managed table regardless of version
    pub fn reset(&mut self) -> StorageResult<()> {
        let (version, managed) = (self.schema_version, self.managed);
        let conn = self.conn.as_mut().ok_or(StorageError::Closed)?;
        schema::reset(conn, version, managed)
    }

    /// Row count of every managed table
    pub fn table_counts(&self) -> StorageResult<Vec<(&'static str, i64)>> {
        let conn = self.connection()?;
        let mut counts = Vec::with_capacity(self.managed.len());
        for table in self.managed {
            counts.push((table.name, count_rows(conn, table.name)?));
        }
        Ok(counts)
    }

    fn open_error(&self, source: rusqlite::Error) -> StorageError {
        StorageError::Open {
            path: self.path.clone(),
            source,
        }
    }
}

impl Drop for Database {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!("Failed to close database {:?}: {}", self.path, e);
        }
    }
}
