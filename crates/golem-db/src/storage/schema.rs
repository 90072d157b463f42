//! Schema version gate
//!
//! The schema version lives in SQLite's `PRAGMA user_version`, outside any
//! table. On startup the stored version is compared with [`SCHEMA_VERSION`]:
//! on mismatch every managed table is dropped and recreated. There is no
//! forward migration; the ledger can be partially reconstructed from the
//! network, so a version bump is a deliberate destructive reset.
//!
//! Tables left out of the managed set survive a reset untouched.

use rusqlite::{Connection, OptionalExtension};
use tracing::{debug, info};

use crate::models::{
    Account, Entity, ExpectedIncome, GlobalRank, HardwarePreset, Income, KnownHost, LocalRank,
    NeighbourLocRank, Payment, ReceivedPayment, Stats, TaskPreset,
};
use crate::storage::error::{StorageError, StorageResult};

/// Database user schema version, bump to recreate the database
pub const SCHEMA_VERSION: i32 = 5;

/// Every table whose contents are discarded on a version change
pub const MANAGED_TABLES: &[&TableSpec] = &[
    &Account::TABLE,
    &ExpectedIncome::TABLE,
    &GlobalRank::TABLE,
    &HardwarePreset::TABLE,
    &Income::TABLE,
    &KnownHost::TABLE,
    &LocalRank::TABLE,
    &NeighbourLocRank::TABLE,
    &Payment::TABLE,
    &ReceivedPayment::TABLE,
    &Stats::TABLE,
    &TaskPreset::TABLE,
];

/// DDL description of one entity table
#[derive(Debug, Clone, Copy)]
pub struct TableSpec {
    /// Table name
    pub name: &'static str,
    /// Column and table-constraint definitions
    pub columns: &'static str,
    /// Secondary indexes
    pub indexes: &'static [IndexSpec],
}

/// A secondary index, optionally unique
#[derive(Debug, Clone, Copy)]
pub struct IndexSpec {
    pub name: &'static str,
    pub columns: &'static str,
    pub unique: bool,
}

impl TableSpec {
    /// `CREATE TABLE IF NOT EXISTS` statement plus its indexes
    pub fn create_sql(&self) -> String {
        let mut sql = format!(
            "CREATE TABLE IF NOT EXISTS {} ({});\n",
            self.name, self.columns
        );
        for index in self.indexes {
            sql.push_str(&format!(
                "CREATE {}INDEX IF NOT EXISTS {} ON {} ({});\n",
                if index.unique { "UNIQUE " } else { "" },
                index.name,
                self.name,
                index.columns
            ));
        }
        sql
    }

    /// `DROP TABLE IF EXISTS` statement (indexes go with the table)
    pub fn drop_sql(&self) -> String {
        format!("DROP TABLE IF EXISTS {};", self.name)
    }
}

/// What a call to [`reconcile`] did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconcileOutcome {
    /// Version found on disk before reconciling
    pub previous_version: i32,
    /// Version on disk afterwards
    pub version: i32,
    /// Whether managed tables were dropped
    pub reset: bool,
}

/// Read the stored schema version (0 for a fresh file)
pub fn get_version(conn: &Connection) -> StorageResult<i32> {
    let version = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;
    Ok(version)
}

/// Write the stored schema version
pub fn set_version(conn: &Connection, version: i32) -> StorageResult<()> {
    conn.pragma_update(None, "user_version", version)?;
    Ok(())
}

/// Check whether a table exists
pub fn table_exists(conn: &Connection, name: &str) -> StorageResult<bool> {
    let found = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?",
            [name],
            |_| Ok(()),
        )
        .optional()?;
    Ok(found.is_some())
}

/// Bring the on-disk schema in line with `expected_version`
///
/// 1. Read the stored version.
/// 2. If it differs, drop every table in `managed` and store the new
///    version, in one transaction.
/// 3. Create any missing managed table and index.
///
/// Safe to call on every startup. Any failure is fatal: the caller must not
/// keep using a database in an unknown state.
pub fn reconcile(
    conn: &mut Connection,
    expected_version: i32,
    managed: &[&TableSpec],
) -> StorageResult<ReconcileOutcome> {
    let previous_version = conn
        .pragma_query_value(None, "user_version", |row| row.get(0))
        .map_err(|e| StorageError::schema("failed to read schema version", e))?;

    let reset = previous_version != expected_version;
    if reset {
        info!(
            "New database version {}, previous {}",
            expected_version, previous_version
        );
        drop_tables(conn, expected_version, managed)?;
    }

    create_tables(conn, managed)?;

    Ok(ReconcileOutcome {
        previous_version,
        version: expected_version,
        reset,
    })
}

/// Unconditionally drop and recreate the managed tables at `version`
pub fn reset(conn: &mut Connection, version: i32, managed: &[&TableSpec]) -> StorageResult<()> {
    info!("Resetting {} managed tables at version {}", managed.len(), version);
    drop_tables(conn, version, managed)?;
    create_tables(conn, managed)
}

fn drop_tables(
    conn: &mut Connection,
    version: i32,
    managed: &[&TableSpec],
) -> StorageResult<()> {
    let tx = conn
        .transaction()
        .map_err(|e| StorageError::schema("failed to begin reset", e))?;

    for table in managed {
        tx.execute_batch(&table.drop_sql())
            .map_err(|e| StorageError::schema(format!("failed to drop {}", table.name), e))?;
    }
    tx.pragma_update(None, "user_version", version)
        .map_err(|e| StorageError::schema("failed to write schema version", e))?;

    tx.commit()
        .map_err(|e| StorageError::schema("failed to commit reset", e))
}

/// Create every table in `tables` that does not exist yet
pub fn create_tables(conn: &Connection, tables: &[&TableSpec]) -> StorageResult<()> {
    for table in tables {
        debug!("Ensuring table {}", table.name);
        conn.execute_batch(&table.create_sql())
            .map_err(|e| StorageError::schema(format!("failed to create {}", table.name), e))?;
    }
    Ok(())
}
