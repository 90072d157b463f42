//! Known peer addresses
//!
//! The table only records hosts. Keeping it within [`MAX_STORED_HOSTS`] is
//! up to the peer-discovery code that writes to it.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};

use crate::models::{
    expect_changed, from_millis, now, query_all, query_one, timestamps, to_millis, Entity,
};
use crate::storage::error::StorageResult;
use crate::storage::schema::{IndexSpec, TableSpec};

/// How many known hosts the node keeps
pub const MAX_STORED_HOSTS: usize = 4;

/// A peer address this node has connected to
#[derive(Debug, Clone, PartialEq)]
pub struct KnownHost {
    id: Option<i64>,
    pub ip_address: String,
    pub port: u16,
    pub last_connected: DateTime<Utc>,
    /// Bootstrap seed rather than a discovered peer
    pub is_seed: bool,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
}

impl KnownHost {
    pub fn new(ip_address: impl Into<String>, port: u16) -> Self {
        let now = now();
        Self {
            id: None,
            ip_address: ip_address.into(),
            port,
            last_connected: now,
            is_seed: false,
            created_at: now,
            modified_at: now,
        }
    }

    pub fn seed(ip_address: impl Into<String>, port: u16) -> Self {
        Self {
            is_seed: true,
            ..Self::new(ip_address, port)
        }
    }

    pub fn id(&self) -> Option<i64> {
        self.id
    }

    /// Insert if new, update otherwise
    ///
    /// Inserting an (address, port) pair that is already stored fails with
    /// a constraint error.
    pub fn save(&mut self, conn: &Connection) -> StorageResult<()> {
        match self.id {
            None => {
                conn.execute(
                    r#"
                    INSERT INTO known_hosts
                        (ip_address, port, last_connected, is_seed, created_at, modified_at)
                    VALUES (?, ?, ?, ?, ?, ?)
                    "#,
                    params![
                        self.ip_address,
                        self.port,
                        to_millis(&self.last_connected),
                        self.is_seed,
                        to_millis(&self.created_at),
                        to_millis(&self.modified_at),
                    ],
                )?;
                self.id = Some(conn.last_insert_rowid());
            }
            Some(id) => {
                let modified_at = now();
                let changed = conn.execute(
                    r#"
                    UPDATE known_hosts
                    SET ip_address = ?, port = ?, last_connected = ?, is_seed = ?, modified_at = ?
                    WHERE id = ?
                    "#,
                    params![
                        self.ip_address,
                        self.port,
                        to_millis(&self.last_connected),
                        self.is_seed,
                        to_millis(&modified_at),
                        id,
                    ],
                )?;
                expect_changed(changed, Self::TABLE.name, || self.address())?;
                self.modified_at = modified_at;
            }
        }
        Ok(())
    }

    /// Record a successful connection now
    pub fn touch(&mut self, conn: &Connection) -> StorageResult<()> {
        self.last_connected = now();
        self.save(conn)
    }

    pub fn delete(&self, conn: &Connection) -> StorageResult<()> {
        let changed = conn.execute(
            "DELETE FROM known_hosts WHERE ip_address = ? AND port = ?",
            params![self.ip_address, self.port],
        )?;
        expect_changed(changed, Self::TABLE.name, || self.address())
    }

    pub fn get(conn: &Connection, ip_address: &str, port: u16) -> StorageResult<Option<Self>> {
        query_one(
            conn,
            "SELECT * FROM known_hosts WHERE ip_address = ? AND port = ?",
            params![ip_address, port],
        )
    }

    /// All hosts, most recently connected first
    pub fn newest_first(conn: &Connection) -> StorageResult<Vec<Self>> {
        query_all(
            conn,
            "SELECT * FROM known_hosts ORDER BY last_connected DESC, id DESC",
            [],
        )
    }

    /// Seed hosts only
    pub fn seeds(conn: &Connection) -> StorageResult<Vec<Self>> {
        query_all(
            conn,
            "SELECT * FROM known_hosts WHERE is_seed = 1 ORDER BY id",
            [],
        )
    }

    /// `address:port`
    pub fn address(&self) -> String {
        format!("{}:{}", self.ip_address, self.port)
    }
}

impl Entity for KnownHost {
    const TABLE: TableSpec = TableSpec {
        name: "known_hosts",
        columns: r#"
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            ip_address TEXT NOT NULL,
            port INTEGER NOT NULL,
            last_connected INTEGER NOT NULL,
            is_seed INTEGER NOT NULL DEFAULT 0,
            created_at INTEGER NOT NULL,
            modified_at INTEGER NOT NULL
        "#,
        indexes: &[IndexSpec {
            name: "idx_known_hosts_address",
            columns: "ip_address, port",
            unique: true,
        }],
    };

    fn from_row(row: &Row<'_>) -> StorageResult<Self> {
        let (created_at, modified_at) = timestamps(row)?;
        Ok(Self {
            id: Some(row.get("id")?),
            ip_address: row.get("ip_address")?,
            port: row.get("port")?,
            last_connected: from_millis(row.get("last_connected")?)?,
            is_seed: row.get("is_seed")?,
            created_at,
            modified_at,
        })
    }
}
