//! Reputation entities
//!
//! Counters are floats so the ranking subsystem can apply fractional
//! weights and decay.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};

use crate::models::{expect_changed, now, query_all, query_one, timestamps, to_millis, Entity};
use crate::storage::error::StorageResult;
use crate::storage::schema::{IndexSpec, TableSpec};

/// Trust value assigned to nodes we know nothing about
pub const NEUTRAL_TRUST: f64 = 0.0;

// ==================== LocalRank ====================

/// This node's own experience with another node
#[derive(Debug, Clone, PartialEq)]
pub struct LocalRank {
    id: Option<i64>,
    pub node_id: String,
    pub positive_computed: f64,
    pub negative_computed: f64,
    pub wrong_computed: f64,
    pub positive_requested: f64,
    pub negative_requested: f64,
    pub positive_payment: f64,
    pub negative_payment: f64,
    pub positive_resource: f64,
    pub negative_resource: f64,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
}

impl LocalRank {
    /// Zeroed counters for a node, not yet stored
    pub fn new(node_id: impl Into<String>) -> Self {
        let now = now();
        Self {
            id: None,
            node_id: node_id.into(),
            positive_computed: 0.0,
            negative_computed: 0.0,
            wrong_computed: 0.0,
            positive_requested: 0.0,
            negative_requested: 0.0,
            positive_payment: 0.0,
            negative_payment: 0.0,
            positive_resource: 0.0,
            negative_resource: 0.0,
            created_at: now,
            modified_at: now,
        }
    }

    pub fn id(&self) -> Option<i64> {
        self.id
    }

    pub fn get(conn: &Connection, node_id: &str) -> StorageResult<Option<Self>> {
        query_one(conn, "SELECT * FROM local_rank WHERE node_id = ?", [node_id])
    }

    /// Stored rank for a node, or fresh zeroed counters
    pub fn get_or_default(conn: &Connection, node_id: &str) -> StorageResult<Self> {
        Ok(Self::get(conn, node_id)?.unwrap_or_else(|| Self::new(node_id)))
    }

    /// Insert if new, update otherwise
    pub fn save(&mut self, conn: &Connection) -> StorageResult<()> {
        match self.id {
            None => {
                conn.execute(
                    r#"
                    INSERT INTO local_rank (
                        node_id, positive_computed, negative_computed, wrong_computed,
                        positive_requested, negative_requested, positive_payment,
                        negative_payment, positive_resource, negative_resource,
                        created_at, modified_at
                    ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                    "#,
                    params![
                        self.node_id,
                        self.positive_computed,
                        self.negative_computed,
                        self.wrong_computed,
                        self.positive_requested,
                        self.negative_requested,
                        self.positive_payment,
                        self.negative_payment,
                        self.positive_resource,
                        self.negative_resource,
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
                    UPDATE local_rank SET
                        node_id = ?, positive_computed = ?, negative_computed = ?,
                        wrong_computed = ?, positive_requested = ?, negative_requested = ?,
                        positive_payment = ?, negative_payment = ?, positive_resource = ?,
                        negative_resource = ?, modified_at = ?
                    WHERE id = ?
                    "#,
                    params![
                        self.node_id,
                        self.positive_computed,
                        self.negative_computed,
                        self.wrong_computed,
                        self.positive_requested,
                        self.negative_requested,
                        self.positive_payment,
                        self.negative_payment,
                        self.positive_resource,
                        self.negative_resource,
                        to_millis(&modified_at),
                        id,
                    ],
                )?;
                expect_changed(changed, Self::TABLE.name, || self.node_id.clone())?;
                self.modified_at = modified_at;
            }
        }
        Ok(())
    }

    pub fn delete(&self, conn: &Connection) -> StorageResult<()> {
        let changed = conn.execute("DELETE FROM local_rank WHERE node_id = ?", [&self.node_id])?;
        expect_changed(changed, Self::TABLE.name, || self.node_id.clone())
    }
}

impl Entity for LocalRank {
    const TABLE: TableSpec = TableSpec {
        name: "local_rank",
        columns: r#"
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            node_id TEXT NOT NULL UNIQUE,
            positive_computed REAL NOT NULL DEFAULT 0.0,
            negative_computed REAL NOT NULL DEFAULT 0.0,
            wrong_computed REAL NOT NULL DEFAULT 0.0,
            positive_requested REAL NOT NULL DEFAULT 0.0,
            negative_requested REAL NOT NULL DEFAULT 0.0,
            positive_payment REAL NOT NULL DEFAULT 0.0,
            negative_payment REAL NOT NULL DEFAULT 0.0,
            positive_resource REAL NOT NULL DEFAULT 0.0,
            negative_resource REAL NOT NULL DEFAULT 0.0,
            created_at INTEGER NOT NULL,
            modified_at INTEGER NOT NULL
        "#,
        indexes: &[],
    };

    fn from_row(row: &Row<'_>) -> StorageResult<Self> {
        let (created_at, modified_at) = timestamps(row)?;
        Ok(Self {
            id: Some(row.get("id")?),
            node_id: row.get("node_id")?,
            positive_computed: row.get("positive_computed")?,
            negative_computed: row.get("negative_computed")?,
            wrong_computed: row.get("wrong_computed")?,
            positive_requested: row.get("positive_requested")?,
            negative_requested: row.get("negative_requested")?,
            positive_payment: row.get("positive_payment")?,
            negative_payment: row.get("negative_payment")?,
            positive_resource: row.get("positive_resource")?,
            negative_resource: row.get("negative_resource")?,
            created_at,
            modified_at,
        })
    }
}

// ==================== GlobalRank ====================

/// Estimate of a node's network-wide trust vector
#[derive(Debug, Clone, PartialEq)]
pub struct GlobalRank {
    id: Option<i64>,
    pub node_id: String,
    pub requesting_trust_value: f64,
    pub computing_trust_value: f64,
    pub gossip_weight_computing: f64,
    pub gossip_weight_requesting: f64,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
}

impl GlobalRank {
    pub fn new(node_id: impl Into<String>) -> Self {
        let now = now();
        Self {
            id: None,
            node_id: node_id.into(),
            requesting_trust_value: NEUTRAL_TRUST,
            computing_trust_value: NEUTRAL_TRUST,
            gossip_weight_computing: 0.0,
            gossip_weight_requesting: 0.0,
            created_at: now,
            modified_at: now,
        }
    }

    pub fn id(&self) -> Option<i64> {
        self.id
    }

    pub fn get(conn: &Connection, node_id: &str) -> StorageResult<Option<Self>> {
        query_one(conn, "SELECT * FROM global_rank WHERE node_id = ?", [node_id])
    }

    pub fn get_or_default(conn: &Connection, node_id: &str) -> StorageResult<Self> {
        Ok(Self::get(conn, node_id)?.unwrap_or_else(|| Self::new(node_id)))
    }

    /// Insert if new, update otherwise
    pub fn save(&mut self, conn: &Connection) -> StorageResult<()> {
        match self.id {
            None => {
                conn.execute(
                    r#"
                    INSERT INTO global_rank (
                        node_id, requesting_trust_value, computing_trust_value,
                        gossip_weight_computing, gossip_weight_requesting,
                        created_at, modified_at
                    ) VALUES (?, ?, ?, ?, ?, ?, ?)
                    "#,
                    params![
                        self.node_id,
                        self.requesting_trust_value,
                        self.computing_trust_value,
                        self.gossip_weight_computing,
                        self.gossip_weight_requesting,
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
                    UPDATE global_rank SET
                        node_id = ?, requesting_trust_value = ?, computing_trust_value = ?,
                        gossip_weight_computing = ?, gossip_weight_requesting = ?, modified_at = ?
                    WHERE id = ?
                    "#,
                    params![
                        self.node_id,
                        self.requesting_trust_value,
                        self.computing_trust_value,
                        self.gossip_weight_computing,
                        self.gossip_weight_requesting,
                        to_millis(&modified_at),
                        id,
                    ],
                )?;
                expect_changed(changed, Self::TABLE.name, || self.node_id.clone())?;
                self.modified_at = modified_at;
            }
        }
        Ok(())
    }

    pub fn delete(&self, conn: &Connection) -> StorageResult<()> {
        let changed = conn.execute("DELETE FROM global_rank WHERE node_id = ?", [&self.node_id])?;
        expect_changed(changed, Self::TABLE.name, || self.node_id.clone())
    }
}

impl Entity for GlobalRank {
    const TABLE: TableSpec = TableSpec {
        name: "global_rank",
        columns: r#"
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            node_id TEXT NOT NULL UNIQUE,
            requesting_trust_value REAL NOT NULL DEFAULT 0.0,
            computing_trust_value REAL NOT NULL DEFAULT 0.0,
            gossip_weight_computing REAL NOT NULL DEFAULT 0.0,
            gossip_weight_requesting REAL NOT NULL DEFAULT 0.0,
            created_at INTEGER NOT NULL,
            modified_at INTEGER NOT NULL
        "#,
        indexes: &[],
    };

    fn from_row(row: &Row<'_>) -> StorageResult<Self> {
        let (created_at, modified_at) = timestamps(row)?;
        Ok(Self {
            id: Some(row.get("id")?),
            node_id: row.get("node_id")?,
            requesting_trust_value: row.get("requesting_trust_value")?,
            computing_trust_value: row.get("computing_trust_value")?,
            gossip_weight_computing: row.get("gossip_weight_computing")?,
            gossip_weight_requesting: row.get("gossip_weight_requesting")?,
            created_at,
            modified_at,
        })
    }
}

// ==================== NeighbourLocRank ====================

/// A neighbour's opinion of a third node
#[derive(Debug, Clone, PartialEq)]
pub struct NeighbourLocRank {
    /// The neighbour giving the opinion
    node_id: String,
    /// The node the opinion is about
    about_node_id: String,
    pub requesting_trust_value: f64,
    pub computing_trust_value: f64,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
}

impl NeighbourLocRank {
    pub fn new(node_id: impl Into<String>, about_node_id: impl Into<String>) -> Self {
        let now = now();
        Self {
            node_id: node_id.into(),
            about_node_id: about_node_id.into(),
            requesting_trust_value: NEUTRAL_TRUST,
            computing_trust_value: NEUTRAL_TRUST,
            created_at: now,
            modified_at: now,
        }
    }

    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    pub fn about_node_id(&self) -> &str {
        &self.about_node_id
    }

    pub fn insert(&self, conn: &Connection) -> StorageResult<()> {
        conn.execute(
            r#"
            INSERT INTO neighbour_loc_rank (
                node_id, about_node_id, requesting_trust_value, computing_trust_value,
                created_at, modified_at
            ) VALUES (?, ?, ?, ?, ?, ?)
            "#,
            params![
                self.node_id,
                self.about_node_id,
                self.requesting_trust_value,
                self.computing_trust_value,
                to_millis(&self.created_at),
                to_millis(&self.modified_at),
            ],
        )?;
        Ok(())
    }

    pub fn save(&mut self, conn: &Connection) -> StorageResult<()> {
        let modified_at = now();
        let changed = conn.execute(
            r#"
            UPDATE neighbour_loc_rank
            SET requesting_trust_value = ?, computing_trust_value = ?, modified_at = ?
            WHERE node_id = ? AND about_node_id = ?
            "#,
            params![
                self.requesting_trust_value,
                self.computing_trust_value,
                to_millis(&modified_at),
                self.node_id,
                self.about_node_id,
            ],
        )?;
        expect_changed(changed, Self::TABLE.name, || self.key())?;
        self.modified_at = modified_at;
        Ok(())
    }

    pub fn delete(&self, conn: &Connection) -> StorageResult<()> {
        let changed = conn.execute(
            "DELETE FROM neighbour_loc_rank WHERE node_id = ? AND about_node_id = ?",
            [&self.node_id, &self.about_node_id],
        )?;
        expect_changed(changed, Self::TABLE.name, || self.key())
    }

    pub fn get(
        conn: &Connection,
        node_id: &str,
        about_node_id: &str,
    ) -> StorageResult<Option<Self>> {
        query_one(
            conn,
            "SELECT * FROM neighbour_loc_rank WHERE node_id = ? AND about_node_id = ?",
            [node_id, about_node_id],
        )
    }

    /// Every neighbour opinion about one node
    pub fn about(conn: &Connection, about_node_id: &str) -> StorageResult<Vec<Self>> {
        query_all(
            conn,
            "SELECT * FROM neighbour_loc_rank WHERE about_node_id = ? ORDER BY node_id",
            [about_node_id],
        )
    }

    fn key(&self) -> String {
        format!("({}, {})", self.node_id, self.about_node_id)
    }
}

impl Entity for NeighbourLocRank {
    const TABLE: TableSpec = TableSpec {
        name: "neighbour_loc_rank",
        columns: r#"
            node_id TEXT NOT NULL,
            about_node_id TEXT NOT NULL,
            requesting_trust_value REAL NOT NULL DEFAULT 0.0,
            computing_trust_value REAL NOT NULL DEFAULT 0.0,
            created_at INTEGER NOT NULL,
            modified_at INTEGER NOT NULL,
            PRIMARY KEY (node_id, about_node_id)
        "#,
        indexes: &[IndexSpec {
            name: "idx_neighbour_loc_rank_about",
            columns: "about_node_id",
            unique: false,
        }],
    };

    fn from_row(row: &Row<'_>) -> StorageResult<Self> {
        let (created_at, modified_at) = timestamps(row)?;
        Ok(Self {
            node_id: row.get("node_id")?,
            about_node_id: row.get("about_node_id")?,
            requesting_trust_value: row.get("requesting_trust_value")?,
            computing_trust_value: row.get("computing_trust_value")?,
            created_at,
            modified_at,
        })
    }
}
