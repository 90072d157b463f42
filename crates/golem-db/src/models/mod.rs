//! Entity definitions
//!
//! Each record type implements [`Entity`], which ties it to a
//! [`TableSpec`] and decodes it from a row. Codec-backed columns go
//! through [`crate::codec`] on every read and write.
//!
//! All entities carry `created_at` / `modified_at`, stored as Unix
//! milliseconds. Operations take a `&Connection`, so they run unchanged
//! inside a caller-managed `Transaction`.
//!
//! ## Tables
//!
//! - Payments: `payment`, `expected_income`, `income`, `received_payment`
//! - Ranking: `local_rank`, `global_rank`, `neighbour_loc_rank`
//! - Network: `known_hosts`
//! - Account: `account`, `stats`, `hardware_preset`, `task_preset`

use chrono::{DateTime, SubsecRound, Utc};
use rusqlite::{Connection, Params, Row};

use crate::codec::CodecError;
use crate::storage::error::{StorageError, StorageResult};
use crate::storage::schema::TableSpec;

pub mod account;
pub mod network;
pub mod payment;
pub mod ranking;

pub use account::{Account, HardwarePreset, Stats, TaskPreset};
pub use network::{KnownHost, MAX_STORED_HOSTS};
pub use payment::{ExpectedIncome, Income, Payment, PaymentStatus, ReceivedPayment};
pub use ranking::{GlobalRank, LocalRank, NeighbourLocRank, NEUTRAL_TRUST};

/// A record type backed by one table
pub trait Entity: Sized {
    /// Table definition, including indexes and constraints
    const TABLE: TableSpec;

    /// Decode a `SELECT *` row
    fn from_row(row: &Row<'_>) -> StorageResult<Self>;

    /// Load every row of this entity
    fn all(conn: &Connection) -> StorageResult<Vec<Self>> {
        query_all(conn, &format!("SELECT * FROM {}", Self::TABLE.name), [])
    }

    /// Number of rows of this entity
    fn count(conn: &Connection) -> StorageResult<i64> {
        count_rows(conn, Self::TABLE.name)
    }
}

/// Count the rows of a table by name
pub fn count_rows(conn: &Connection, table: &str) -> StorageResult<i64> {
    let count = conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| {
        row.get(0)
    })?;
    Ok(count)
}

/// Run a query and decode every row
pub(crate) fn query_all<E: Entity, P: Params>(
    conn: &Connection,
    sql: &str,
    params: P,
) -> StorageResult<Vec<E>> {
    let mut stmt = conn.prepare(sql)?;
    let mut rows = stmt.query(params)?;

    let mut entities = Vec::new();
    while let Some(row) = rows.next()? {
        entities.push(E::from_row(row)?);
    }
    Ok(entities)
}

/// Run a query and decode the first row, if any
pub(crate) fn query_one<E: Entity, P: Params>(
    conn: &Connection,
    sql: &str,
    params: P,
) -> StorageResult<Option<E>> {
    let mut stmt = conn.prepare(sql)?;
    let mut rows = stmt.query(params)?;

    match rows.next()? {
        Some(row) => Ok(Some(E::from_row(row)?)),
        None => Ok(None),
    }
}

/// Turn a zero-row UPDATE/DELETE into `NotFound`
pub(crate) fn expect_changed(
    changed: usize,
    table: &'static str,
    key: impl FnOnce() -> String,
) -> StorageResult<()> {
    if changed == 0 {
        return Err(StorageError::NotFound { table, key: key() });
    }
    Ok(())
}

/// Current time at the precision the database keeps
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

pub(crate) fn to_millis(ts: &DateTime<Utc>) -> i64 {
    ts.timestamp_millis()
}

pub(crate) fn from_millis(millis: i64) -> StorageResult<DateTime<Utc>> {
    DateTime::from_timestamp_millis(millis).ok_or_else(|| {
        StorageError::Codec(CodecError::Format {
            codec: "timestamp",
            value: millis.to_string(),
            details: "out of range".to_string(),
        })
    })
}

/// Read the two implicit timestamp columns
pub(crate) fn timestamps(row: &Row<'_>) -> StorageResult<(DateTime<Utc>, DateTime<Utc>)> {
    let created_at = from_millis(row.get("created_at")?)?;
    let modified_at = from_millis(row.get("modified_at")?)?;
    Ok((created_at, modified_at))
}
