//! Account, statistics and preset entities

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};
use serde_json::{json, Value};

use crate::codec::{Codec, CodecError, CodecResult, JsonCodec};
use crate::models::{expect_changed, now, query_all, query_one, timestamps, to_millis, Entity};
use crate::storage::error::StorageResult;
use crate::storage::schema::{IndexSpec, TableSpec};

const PRESET_DATA: JsonCodec<Value> = JsonCodec::new();

// ==================== Account ====================

/// The local node's account record
#[derive(Debug, Clone, PartialEq)]
pub struct Account {
    id: Option<i64>,
    pub node_id: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
}

impl Account {
    pub fn new(node_id: impl Into<String>) -> Self {
        let now = now();
        Self {
            id: None,
            node_id: node_id.into(),
            description: String::new(),
            created_at: now,
            modified_at: now,
        }
    }

    pub fn id(&self) -> Option<i64> {
        self.id
    }

    pub fn get(conn: &Connection, node_id: &str) -> StorageResult<Option<Self>> {
        query_one(conn, "SELECT * FROM account WHERE node_id = ?", [node_id])
    }

    /// Insert if new, update otherwise
    pub fn save(&mut self, conn: &Connection) -> StorageResult<()> {
        match self.id {
            None => {
                conn.execute(
                    "INSERT INTO account (node_id, description, created_at, modified_at) VALUES (?, ?, ?, ?)",
                    params![
                        self.node_id,
                        self.description,
                        to_millis(&self.created_at),
                        to_millis(&self.modified_at),
                    ],
                )?;
                self.id = Some(conn.last_insert_rowid());
            }
            Some(id) => {
                let modified_at = now();
                let changed = conn.execute(
                    "UPDATE account SET node_id = ?, description = ?, modified_at = ? WHERE id = ?",
                    params![self.node_id, self.description, to_millis(&modified_at), id],
                )?;
                expect_changed(changed, Self::TABLE.name, || self.node_id.clone())?;
                self.modified_at = modified_at;
            }
        }
        Ok(())
    }

    pub fn delete(&self, conn: &Connection) -> StorageResult<()> {
        let changed = conn.execute("DELETE FROM account WHERE node_id = ?", [&self.node_id])?;
        expect_changed(changed, Self::TABLE.name, || self.node_id.clone())
    }
}

impl Entity for Account {
    const TABLE: TableSpec = TableSpec {
        name: "account",
        columns: r#"
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            node_id TEXT NOT NULL UNIQUE,
            description TEXT NOT NULL DEFAULT '',
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
            description: row.get("description")?,
            created_at,
            modified_at,
        })
    }
}

// ==================== Stats ====================

/// A named statistic kept across restarts
#[derive(Debug, Clone, PartialEq)]
pub struct Stats {
    id: Option<i64>,
    pub name: String,
    pub value: String,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
}

impl Stats {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        let now = now();
        Self {
            id: None,
            name: name.into(),
            value: value.into(),
            created_at: now,
            modified_at: now,
        }
    }

    pub fn id(&self) -> Option<i64> {
        self.id
    }

    pub fn get(conn: &Connection, name: &str) -> StorageResult<Option<Self>> {
        query_one(
            conn,
            "SELECT * FROM stats WHERE name = ? ORDER BY id LIMIT 1",
            [name],
        )
    }

    /// Current value of a statistic
    pub fn get_value(conn: &Connection, name: &str) -> StorageResult<Option<String>> {
        Ok(Self::get(conn, name)?.map(|s| s.value))
    }

    /// Set a statistic, creating it on first use
    pub fn set_value(conn: &Connection, name: &str, value: &str) -> StorageResult<()> {
        let mut stat = Self::get(conn, name)?.unwrap_or_else(|| Self::new(name, value));
        stat.value = value.to_string();
        stat.save(conn)
    }

    /// Insert if new, update otherwise
    pub fn save(&mut self, conn: &Connection) -> StorageResult<()> {
        match self.id {
            None => {
                conn.execute(
                    "INSERT INTO stats (name, value, created_at, modified_at) VALUES (?, ?, ?, ?)",
                    params![
                        self.name,
                        self.value,
                        to_millis(&self.created_at),
                        to_millis(&self.modified_at),
                    ],
                )?;
                self.id = Some(conn.last_insert_rowid());
            }
            Some(id) => {
                let modified_at = now();
                let changed = conn.execute(
                    "UPDATE stats SET name = ?, value = ?, modified_at = ? WHERE id = ?",
                    params![self.name, self.value, to_millis(&modified_at), id],
                )?;
                expect_changed(changed, Self::TABLE.name, || self.name.clone())?;
                self.modified_at = modified_at;
            }
        }
        Ok(())
    }

    pub fn delete(&self, conn: &Connection) -> StorageResult<()> {
        let id = self.id.unwrap_or(-1);
        let changed = conn.execute("DELETE FROM stats WHERE id = ?", [id])?;
        expect_changed(changed, Self::TABLE.name, || self.name.clone())
    }
}

impl Entity for Stats {
    const TABLE: TableSpec = TableSpec {
        name: "stats",
        columns: r#"
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            value TEXT NOT NULL,
            created_at INTEGER NOT NULL,
            modified_at INTEGER NOT NULL
        "#,
        indexes: &[],
    };

    fn from_row(row: &Row<'_>) -> StorageResult<Self> {
        let (created_at, modified_at) = timestamps(row)?;
        Ok(Self {
            id: Some(row.get("id")?),
            name: row.get("name")?,
            value: row.get("value")?,
            created_at,
            modified_at,
        })
    }
}

// ==================== HardwarePreset ====================

/// A named hardware resource profile offered to the network
#[derive(Debug, Clone, PartialEq)]
pub struct HardwarePreset {
    id: Option<i64>,
    pub name: String,
    pub cpu_cores: i16,
    /// Memory in KiB
    pub memory: i64,
    /// Disk space in KiB
    pub disk: i64,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
}

impl HardwarePreset {
    pub fn new(name: impl Into<String>, cpu_cores: i16, memory: i64, disk: i64) -> Self {
        let now = now();
        Self {
            id: None,
            name: name.into(),
            cpu_cores,
            memory,
            disk,
            created_at: now,
            modified_at: now,
        }
    }

    /// Profile as exchanged with the UI
    pub fn to_json(&self) -> Value {
        json!({
            "name": self.name,
            "cpu_cores": self.cpu_cores,
            "memory": self.memory,
            "disk": self.disk,
        })
    }

    /// Overwrite the resource fields from a profile payload
    ///
    /// Every field must be present and an integer in range; on error the
    /// preset is left unchanged.
    pub fn apply(&mut self, profile: &Value) -> CodecResult<()> {
        let cpu_cores = i16::try_from(profile_field(profile, "cpu_cores")?).map_err(|_| {
            CodecError::Type {
                codec: "hardware preset",
                details: "cpu_cores out of range".to_string(),
            }
        })?;
        let memory = profile_field(profile, "memory")?;
        let disk = profile_field(profile, "disk")?;

        self.cpu_cores = cpu_cores;
        self.memory = memory;
        self.disk = disk;
        Ok(())
    }

    pub fn id(&self) -> Option<i64> {
        self.id
    }

    pub fn get(conn: &Connection, name: &str) -> StorageResult<Option<Self>> {
        query_one(conn, "SELECT * FROM hardware_preset WHERE name = ?", [name])
    }

    /// Insert if new, update otherwise
    pub fn save(&mut self, conn: &Connection) -> StorageResult<()> {
        match self.id {
            None => {
                conn.execute(
                    r#"
                    INSERT INTO hardware_preset (name, cpu_cores, memory, disk, created_at, modified_at)
                    VALUES (?, ?, ?, ?, ?, ?)
                    "#,
                    params![
                        self.name,
                        self.cpu_cores,
                        self.memory,
                        self.disk,
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
                    UPDATE hardware_preset
                    SET name = ?, cpu_cores = ?, memory = ?, disk = ?, modified_at = ?
                    WHERE id = ?
                    "#,
                    params![
                        self.name,
                        self.cpu_cores,
                        self.memory,
                        self.disk,
                        to_millis(&modified_at),
                        id,
                    ],
                )?;
                expect_changed(changed, Self::TABLE.name, || self.name.clone())?;
                self.modified_at = modified_at;
            }
        }
        Ok(())
    }

    pub fn delete(&self, conn: &Connection) -> StorageResult<()> {
        let changed = conn.execute("DELETE FROM hardware_preset WHERE name = ?", [&self.name])?;
        expect_changed(changed, Self::TABLE.name, || self.name.clone())
    }

    /// All presets ordered by name
    pub fn by_name(conn: &Connection) -> StorageResult<Vec<Self>> {
        query_all(conn, "SELECT * FROM hardware_preset ORDER BY name", [])
    }
}

fn profile_field(profile: &Value, key: &str) -> CodecResult<i64> {
    profile
        .get(key)
        .and_then(Value::as_i64)
        .ok_or_else(|| CodecError::Type {
            codec: "hardware preset",
            details: format!("field {:?} missing or not an integer", key),
        })
}

impl Entity for HardwarePreset {
    const TABLE: TableSpec = TableSpec {
        name: "hardware_preset",
        columns: r#"
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            cpu_cores INTEGER NOT NULL,
            memory INTEGER NOT NULL,
            disk INTEGER NOT NULL,
            created_at INTEGER NOT NULL,
            modified_at INTEGER NOT NULL
        "#,
        indexes: &[IndexSpec {
            name: "idx_hardware_preset_name",
            columns: "name",
            unique: true,
        }],
    };

    fn from_row(row: &Row<'_>) -> StorageResult<Self> {
        let (created_at, modified_at) = timestamps(row)?;
        Ok(Self {
            id: Some(row.get("id")?),
            name: row.get("name")?,
            cpu_cores: row.get("cpu_cores")?,
            memory: row.get("memory")?,
            disk: row.get("disk")?,
            created_at,
            modified_at,
        })
    }
}

// ==================== TaskPreset ====================

/// Saved task configuration, keyed by (task type, name)
#[derive(Debug, Clone, PartialEq)]
pub struct TaskPreset {
    task_type: String,
    name: String,
    /// Task-type specific settings
    pub data: Value,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
}

impl TaskPreset {
    pub fn new(task_type: impl Into<String>, name: impl Into<String>, data: Value) -> Self {
        let now = now();
        Self {
            task_type: task_type.into(),
            name: name.into(),
            data,
            created_at: now,
            modified_at: now,
        }
    }

    pub fn task_type(&self) -> &str {
        &self.task_type
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn insert(&self, conn: &Connection) -> StorageResult<()> {
        let data = PRESET_DATA.encode(&self.data)?;
        conn.execute(
            r#"
            INSERT INTO task_preset (task_type, name, data, created_at, modified_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
            params![
                self.task_type,
                self.name,
                data,
                to_millis(&self.created_at),
                to_millis(&self.modified_at),
            ],
        )?;
        Ok(())
    }

    pub fn save(&mut self, conn: &Connection) -> StorageResult<()> {
        let data = PRESET_DATA.encode(&self.data)?;
        let modified_at = now();
        let changed = conn.execute(
            "UPDATE task_preset SET data = ?, modified_at = ? WHERE task_type = ? AND name = ?",
            params![data, to_millis(&modified_at), self.task_type, self.name],
        )?;
        expect_changed(changed, Self::TABLE.name, || self.key())?;
        self.modified_at = modified_at;
        Ok(())
    }

    pub fn delete(&self, conn: &Connection) -> StorageResult<()> {
        let changed = conn.execute(
            "DELETE FROM task_preset WHERE task_type = ? AND name = ?",
            [&self.task_type, &self.name],
        )?;
        expect_changed(changed, Self::TABLE.name, || self.key())
    }

    pub fn get(conn: &Connection, task_type: &str, name: &str) -> StorageResult<Option<Self>> {
        query_one(
            conn,
            "SELECT * FROM task_preset WHERE task_type = ? AND name = ?",
            [task_type, name],
        )
    }

    /// All presets of one task type, by name
    pub fn for_type(conn: &Connection, task_type: &str) -> StorageResult<Vec<Self>> {
        query_all(
            conn,
            "SELECT * FROM task_preset WHERE task_type = ? ORDER BY name",
            [task_type],
        )
    }

    fn key(&self) -> String {
        format!("({}, {})", self.task_type, self.name)
    }
}

impl Entity for TaskPreset {
    const TABLE: TableSpec = TableSpec {
        name: "task_preset",
        columns: r#"
            task_type TEXT NOT NULL,
            name TEXT NOT NULL,
            data TEXT NOT NULL,
            created_at INTEGER NOT NULL,
            modified_at INTEGER NOT NULL,
            PRIMARY KEY (task_type, name)
        "#,
        indexes: &[IndexSpec {
            name: "idx_task_preset_type",
            columns: "task_type",
            unique: false,
        }],
    };

    fn from_row(row: &Row<'_>) -> StorageResult<Self> {
        let (created_at, modified_at) = timestamps(row)?;
        Ok(Self {
            task_type: row.get("task_type")?,
            name: row.get("name")?,
            data: PRESET_DATA.decode(row.get("data")?)?,
            created_at,
            modified_at,
        })
    }
}
