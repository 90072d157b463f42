//! Payment ledger entities
//!
//! - [`Payment`]: payments this node makes to other nodes
//! - [`ExpectedIncome`]: payments this node has been promised
//! - [`Income`]: payments confirmed on the payment network
//! - [`ReceivedPayment`]: per-task settlement records from other nodes
//!
//! Amounts are wei, stored through [`BigIntegerCodec`].

use std::fmt;

use chrono::{DateTime, Utc};
use num_bigint::BigUint;
use rusqlite::{params, Connection, Row};
use serde_json::{Map, Value};

use crate::codec::{
    format_ether, BigIntegerCodec, Codec, EnumCodec, JsonCodec, OrdinalEnum, RawBytesCodec,
};
use crate::models::{expect_changed, now, query_all, query_one, timestamps, to_millis, Entity};
use crate::storage::error::StorageResult;
use crate::storage::schema::{IndexSpec, TableSpec};

const STATUS: EnumCodec<PaymentStatus> = EnumCodec::new();
const DETAILS: JsonCodec<Map<String, Value>> = JsonCodec::new();
const NODE_DETAILS: JsonCodec<Value> = JsonCodec::new();

/// The status of an outgoing payment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PaymentStatus {
    /// Created but not introduced to the payment network
    #[default]
    Awaiting,
    /// Sent to the payment network
    Sent,
    /// Confirmed on the payment network
    Confirmed,
}

impl OrdinalEnum for PaymentStatus {
    const NAME: &'static str = "PaymentStatus";
    const VARIANTS: &'static [Self] = &[
        PaymentStatus::Awaiting,
        PaymentStatus::Sent,
        PaymentStatus::Confirmed,
    ];

    fn ordinal(self) -> i64 {
        match self {
            PaymentStatus::Awaiting => 1,
            PaymentStatus::Sent => 2,
            PaymentStatus::Confirmed => 3,
        }
    }

    fn symbol(self) -> &'static str {
        match self {
            PaymentStatus::Awaiting => "awaiting",
            PaymentStatus::Sent => "sent",
            PaymentStatus::Confirmed => "confirmed",
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

// ==================== Payment ====================

/// A payment this node makes to another node, keyed by subtask
#[derive(Debug, Clone, PartialEq)]
pub struct Payment {
    /// Subtask the payment settles (primary key)
    subtask: String,
    pub status: PaymentStatus,
    /// Ethereum address of the payee
    pub payee: Vec<u8>,
    /// Amount in wei
    pub value: BigUint,
    /// Free-form details: `tx`, `block_number`, `node_info`, ...
    pub details: Map<String, Value>,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
}

impl Payment {
    /// Create a new awaiting payment with empty details
    pub fn new(subtask: impl Into<String>, payee: impl Into<Vec<u8>>, value: BigUint) -> Self {
        let now = now();
        Self {
            subtask: subtask.into(),
            status: PaymentStatus::Awaiting,
            payee: payee.into(),
            value,
            details: Map::new(),
            created_at: now,
            modified_at: now,
        }
    }

    pub fn subtask(&self) -> &str {
        &self.subtask
    }

    /// Node that the payment was made for, if recorded
    pub fn sender_node(&self) -> Option<&Value> {
        self.details.get("node_info")
    }

    /// Insert a new row; fails with a constraint error on a duplicate subtask
    pub fn insert(&self, conn: &Connection) -> StorageResult<()> {
        let status = STATUS.encode(&self.status)?;
        let payee = RawBytesCodec.encode(&self.payee)?;
        let value = BigIntegerCodec.encode(&self.value)?;
        let details = DETAILS.encode(&self.details)?;

        conn.execute(
            r#"
            INSERT INTO payment (subtask, status, payee, value, details, created_at, modified_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
            params![
                self.subtask,
                status,
                payee,
                value,
                details,
                to_millis(&self.created_at),
                to_millis(&self.modified_at),
            ],
        )?;
        Ok(())
    }

    /// Write all mutable fields back and bump `modified_at`
    pub fn save(&mut self, conn: &Connection) -> StorageResult<()> {
        let status = STATUS.encode(&self.status)?;
        let payee = RawBytesCodec.encode(&self.payee)?;
        let value = BigIntegerCodec.encode(&self.value)?;
        let details = DETAILS.encode(&self.details)?;
        let modified_at = now();

        let changed = conn.execute(
            r#"
            UPDATE payment SET status = ?, payee = ?, value = ?, details = ?, modified_at = ?
            WHERE subtask = ?
            "#,
            params![
                status,
                payee,
                value,
                details,
                to_millis(&modified_at),
                self.subtask,
            ],
        )?;
        expect_changed(changed, Self::TABLE.name, || self.subtask.clone())?;
        self.modified_at = modified_at;
        Ok(())
    }

    /// Remove this payment
    pub fn delete(&self, conn: &Connection) -> StorageResult<()> {
        let changed = conn.execute("DELETE FROM payment WHERE subtask = ?", [&self.subtask])?;
        expect_changed(changed, Self::TABLE.name, || self.subtask.clone())
    }

    /// Look up a payment by subtask
    pub fn get(conn: &Connection, subtask: &str) -> StorageResult<Option<Self>> {
        query_one(conn, "SELECT * FROM payment WHERE subtask = ?", [subtask])
    }

    /// All payments in the given status, oldest first
    pub fn by_status(conn: &Connection, status: PaymentStatus) -> StorageResult<Vec<Self>> {
        query_all(
            conn,
            "SELECT * FROM payment WHERE status = ? ORDER BY created_at",
            [STATUS.encode(&status)?],
        )
    }
}

impl Entity for Payment {
    const TABLE: TableSpec = TableSpec {
        name: "payment",
        columns: r#"
            subtask TEXT PRIMARY KEY NOT NULL,
            status INTEGER NOT NULL DEFAULT 1,
            payee TEXT NOT NULL,
            value TEXT NOT NULL,
            details TEXT NOT NULL,
            created_at INTEGER NOT NULL,
            modified_at INTEGER NOT NULL
        "#,
        indexes: &[IndexSpec {
            name: "idx_payment_status",
            columns: "status",
            unique: false,
        }],
    };

    fn from_row(row: &Row<'_>) -> StorageResult<Self> {
        let (created_at, modified_at) = timestamps(row)?;
        Ok(Self {
            subtask: row.get("subtask")?,
            status: STATUS.decode(row.get("status")?)?,
            payee: RawBytesCodec.decode(row.get("payee")?)?,
            value: BigIntegerCodec.decode(row.get("value")?)?,
            details: DETAILS.decode_or_default(row.get("details")?)?,
            created_at,
            modified_at,
        })
    }
}

impl fmt::Display for Payment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tx = self.details.get("tx").unwrap_or(&Value::Null);
        let bn = self.details.get("block_number").unwrap_or(&Value::Null);
        write!(
            f,
            "<Payment sbid:{:?} v:{} s:{} tx:{} bn:{}>",
            self.subtask,
            format_ether(&self.value),
            self.status,
            tx,
            bn
        )
    }
}

// ==================== ExpectedIncome ====================

/// A payment another node has promised for a subtask
#[derive(Debug, Clone, PartialEq)]
pub struct ExpectedIncome {
    /// Row id, `None` until inserted
    id: Option<i64>,
    pub sender_node: String,
    /// Serialized node description of the sender
    pub sender_node_details: Value,
    pub task: String,
    pub subtask: String,
    pub value: BigUint,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
}

impl ExpectedIncome {
    pub fn new(
        sender_node: impl Into<String>,
        sender_node_details: Value,
        task: impl Into<String>,
        subtask: impl Into<String>,
        value: BigUint,
    ) -> Self {
        let now = now();
        Self {
            id: None,
            sender_node: sender_node.into(),
            sender_node_details,
            task: task.into(),
            subtask: subtask.into(),
            value,
            created_at: now,
            modified_at: now,
        }
    }

    pub fn id(&self) -> Option<i64> {
        self.id
    }

    /// Insert if new, update otherwise
    pub fn save(&mut self, conn: &Connection) -> StorageResult<()> {
        let details = NODE_DETAILS.encode(&self.sender_node_details)?;
        let value = BigIntegerCodec.encode(&self.value)?;

        match self.id {
            None => {
                conn.execute(
                    r#"
                    INSERT INTO expected_income
                        (sender_node, sender_node_details, task, subtask, value, created_at, modified_at)
                    VALUES (?, ?, ?, ?, ?, ?, ?)
                    "#,
                    params![
                        self.sender_node,
                        details,
                        self.task,
                        self.subtask,
                        value,
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
                    UPDATE expected_income
                    SET sender_node = ?, sender_node_details = ?, task = ?, subtask = ?,
                        value = ?, modified_at = ?
                    WHERE id = ?
                    "#,
                    params![
                        self.sender_node,
                        details,
                        self.task,
                        self.subtask,
                        value,
                        to_millis(&modified_at),
                        id,
                    ],
                )?;
                expect_changed(changed, Self::TABLE.name, || id.to_string())?;
                self.modified_at = modified_at;
            }
        }
        Ok(())
    }

    pub fn delete(&self, conn: &Connection) -> StorageResult<()> {
        let id = self.id.unwrap_or(-1);
        let changed = conn.execute("DELETE FROM expected_income WHERE id = ?", [id])?;
        expect_changed(changed, Self::TABLE.name, || id.to_string())
    }

    pub fn get(conn: &Connection, id: i64) -> StorageResult<Option<Self>> {
        query_one(conn, "SELECT * FROM expected_income WHERE id = ?", [id])
    }

    /// Expected incomes from one sender for one subtask
    pub fn for_subtask(
        conn: &Connection,
        sender_node: &str,
        subtask: &str,
    ) -> StorageResult<Vec<Self>> {
        query_all(
            conn,
            "SELECT * FROM expected_income WHERE sender_node = ? AND subtask = ? ORDER BY id",
            [sender_node, subtask],
        )
    }

    pub fn get_sender_node(&self) -> &Value {
        &self.sender_node_details
    }
}

impl Entity for ExpectedIncome {
    const TABLE: TableSpec = TableSpec {
        name: "expected_income",
        columns: r#"
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            sender_node TEXT NOT NULL,
            sender_node_details TEXT NOT NULL,
            task TEXT NOT NULL,
            subtask TEXT NOT NULL,
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
            sender_node: row.get("sender_node")?,
            sender_node_details: NODE_DETAILS.decode_or_default(row.get("sender_node_details")?)?,
            task: row.get("task")?,
            subtask: row.get("subtask")?,
            value: BigIntegerCodec.decode(row.get("value")?)?,
            created_at,
            modified_at,
        })
    }
}

impl fmt::Display for ExpectedIncome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "<ExpectedIncome: {:?} v:{}>",
            self.subtask, self.value
        )
    }
}

// ==================== Income ====================

/// A payment received from another node, keyed by (sender, subtask)
#[derive(Debug, Clone, PartialEq)]
pub struct Income {
    sender_node: String,
    pub task: String,
    subtask: String,
    /// Transaction hash on the payment network
    pub transaction: String,
    pub block_number: BigUint,
    pub value: BigUint,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
}

impl Income {
    pub fn new(
        sender_node: impl Into<String>,
        task: impl Into<String>,
        subtask: impl Into<String>,
        transaction: impl Into<String>,
        block_number: BigUint,
        value: BigUint,
    ) -> Self {
        let now = now();
        Self {
            sender_node: sender_node.into(),
            task: task.into(),
            subtask: subtask.into(),
            transaction: transaction.into(),
            block_number,
            value,
            created_at: now,
            modified_at: now,
        }
    }

    pub fn sender_node(&self) -> &str {
        &self.sender_node
    }

    pub fn subtask(&self) -> &str {
        &self.subtask
    }

    pub fn insert(&self, conn: &Connection) -> StorageResult<()> {
        let block_number = BigIntegerCodec.encode(&self.block_number)?;
        let value = BigIntegerCodec.encode(&self.value)?;

        conn.execute(
            r#"
            INSERT INTO income
                (sender_node, task, subtask, "transaction", block_number, value, created_at, modified_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
            params![
                self.sender_node,
                self.task,
                self.subtask,
                self.transaction,
                block_number,
                value,
                to_millis(&self.created_at),
                to_millis(&self.modified_at),
            ],
        )?;
        Ok(())
    }

    pub fn save(&mut self, conn: &Connection) -> StorageResult<()> {
        let block_number = BigIntegerCodec.encode(&self.block_number)?;
        let value = BigIntegerCodec.encode(&self.value)?;
        let modified_at = now();

        let changed = conn.execute(
            r#"
            UPDATE income SET task = ?, "transaction" = ?, block_number = ?, value = ?, modified_at = ?
            WHERE sender_node = ? AND subtask = ?
            "#,
            params![
                self.task,
                self.transaction,
                block_number,
                value,
                to_millis(&modified_at),
                self.sender_node,
                self.subtask,
            ],
        )?;
        expect_changed(changed, Self::TABLE.name, || self.key())?;
        self.modified_at = modified_at;
        Ok(())
    }

    pub fn delete(&self, conn: &Connection) -> StorageResult<()> {
        let changed = conn.execute(
            "DELETE FROM income WHERE sender_node = ? AND subtask = ?",
            [&self.sender_node, &self.subtask],
        )?;
        expect_changed(changed, Self::TABLE.name, || self.key())
    }

    pub fn get(conn: &Connection, sender_node: &str, subtask: &str) -> StorageResult<Option<Self>> {
        query_one(
            conn,
            "SELECT * FROM income WHERE sender_node = ? AND subtask = ?",
            [sender_node, subtask],
        )
    }

    /// All incomes for a task, oldest first
    pub fn for_task(conn: &Connection, task: &str) -> StorageResult<Vec<Self>> {
        query_all(
            conn,
            "SELECT * FROM income WHERE task = ? ORDER BY created_at",
            [task],
        )
    }

    fn key(&self) -> String {
        format!("({}, {})", self.sender_node, self.subtask)
    }
}

impl Entity for Income {
    const TABLE: TableSpec = TableSpec {
        name: "income",
        columns: r#"
            sender_node TEXT NOT NULL,
            task TEXT NOT NULL,
            subtask TEXT NOT NULL,
            "transaction" TEXT NOT NULL,
            block_number TEXT NOT NULL,
            value TEXT NOT NULL,
            created_at INTEGER NOT NULL,
            modified_at INTEGER NOT NULL,
            PRIMARY KEY (sender_node, subtask)
        "#,
        indexes: &[],
    };

    fn from_row(row: &Row<'_>) -> StorageResult<Self> {
        let (created_at, modified_at) = timestamps(row)?;
        Ok(Self {
            sender_node: row.get("sender_node")?,
            task: row.get("task")?,
            subtask: row.get("subtask")?,
            transaction: row.get("transaction")?,
            block_number: BigIntegerCodec.decode(row.get("block_number")?)?,
            value: BigIntegerCodec.decode(row.get("value")?)?,
            created_at,
            modified_at,
        })
    }
}

impl fmt::Display for Income {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "<Income: {:?} v:{} tid:{:?} bn:{}>",
            self.subtask,
            format_ether(&self.value),
            self.transaction,
            self.block_number
        )
    }
}

// ==================== ReceivedPayment ====================

/// Settlement state of a task paid for by another node
#[derive(Debug, Clone, PartialEq)]
pub struct ReceivedPayment {
    from_node_id: String,
    task: String,
    pub val: BigUint,
    pub expected_val: BigUint,
    pub state: String,
    pub details: String,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
}

impl ReceivedPayment {
    pub fn new(
        from_node_id: impl Into<String>,
        task: impl Into<String>,
        val: BigUint,
        expected_val: BigUint,
        state: impl Into<String>,
    ) -> Self {
        let now = now();
        Self {
            from_node_id: from_node_id.into(),
            task: task.into(),
            val,
            expected_val,
            state: state.into(),
            details: String::new(),
            created_at: now,
            modified_at: now,
        }
    }

    pub fn from_node_id(&self) -> &str {
        &self.from_node_id
    }

    pub fn task(&self) -> &str {
        &self.task
    }

    pub fn insert(&self, conn: &Connection) -> StorageResult<()> {
        let val = BigIntegerCodec.encode(&self.val)?;
        let expected_val = BigIntegerCodec.encode(&self.expected_val)?;

        conn.execute(
            r#"
            INSERT INTO received_payment
                (from_node_id, task, val, expected_val, state, details, created_at, modified_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
            params![
                self.from_node_id,
                self.task,
                val,
                expected_val,
                self.state,
                self.details,
                to_millis(&self.created_at),
                to_millis(&self.modified_at),
            ],
        )?;
        Ok(())
    }

    pub fn save(&mut self, conn: &Connection) -> StorageResult<()> {
        let val = BigIntegerCodec.encode(&self.val)?;
        let expected_val = BigIntegerCodec.encode(&self.expected_val)?;
        let modified_at = now();

        let changed = conn.execute(
            r#"
            UPDATE received_payment
            SET val = ?, expected_val = ?, state = ?, details = ?, modified_at = ?
            WHERE from_node_id = ? AND task = ?
            "#,
            params![
                val,
                expected_val,
                self.state,
                self.details,
                to_millis(&modified_at),
                self.from_node_id,
                self.task,
            ],
        )?;
        expect_changed(changed, Self::TABLE.name, || self.key())?;
        self.modified_at = modified_at;
        Ok(())
    }

    pub fn delete(&self, conn: &Connection) -> StorageResult<()> {
        let changed = conn.execute(
            "DELETE FROM received_payment WHERE from_node_id = ? AND task = ?",
            [&self.from_node_id, &self.task],
        )?;
        expect_changed(changed, Self::TABLE.name, || self.key())
    }

    pub fn get(conn: &Connection, from_node_id: &str, task: &str) -> StorageResult<Option<Self>> {
        query_one(
            conn,
            "SELECT * FROM received_payment WHERE from_node_id = ? AND task = ?",
            [from_node_id, task],
        )
    }

    fn key(&self) -> String {
        format!("({}, {})", self.from_node_id, self.task)
    }
}

impl Entity for ReceivedPayment {
    const TABLE: TableSpec = TableSpec {
        name: "received_payment",
        columns: r#"
            from_node_id TEXT NOT NULL,
            task TEXT NOT NULL,
            val TEXT NOT NULL,
            expected_val TEXT NOT NULL,
            state TEXT NOT NULL,
            details TEXT NOT NULL DEFAULT '',
            created_at INTEGER NOT NULL,
            modified_at INTEGER NOT NULL,
            PRIMARY KEY (from_node_id, task)
        "#,
        indexes: &[],
    };

    fn from_row(row: &Row<'_>) -> StorageResult<Self> {
        let (created_at, modified_at) = timestamps(row)?;
        Ok(Self {
            from_node_id: row.get("from_node_id")?,
            task: row.get("task")?,
            val: BigIntegerCodec.decode(row.get("val")?)?,
            expected_val: BigIntegerCodec.decode(row.get("expected_val")?)?,
            state: row.get("state")?,
            details: row.get("details")?,
            created_at,
            modified_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::CodecError;
    use crate::models::test_support;
    use crate::storage::error::StorageError;
    use serde_json::json;

    fn payee() -> Vec<u8> {
        vec![0xab; 20]
    }

    #[test]
    fn test_payment_defaults() {
        let payment = Payment::new("sub-1", payee(), BigUint::from(10u32));
        assert_eq!(payment.status, PaymentStatus::Awaiting);
        assert!(payment.details.is_empty());
        assert!(payment.sender_node().is_none());
    }

    #[test]
    fn test_payment_round_trip() {
        let conn = test_support::conn();
        let mut payment = Payment::new("sub-1", payee(), BigUint::from(1u32) << 70);
        payment.details.insert("tx".into(), json!("0xfeed"));
        payment.details.insert("node_info".into(), json!({"key": "abc"}));
        payment.insert(&conn).unwrap();

        let loaded = Payment::get(&conn, "sub-1").unwrap().unwrap();
        assert_eq!(loaded, payment);
        assert_eq!(loaded.value, BigUint::from(1u32) << 70);
        assert_eq!(loaded.sender_node(), Some(&json!({"key": "abc"})));
    }

    #[test]
    fn test_payment_stored_as_hex() {
        let conn = test_support::conn();
        Payment::new("sub-1", vec![0x01, 0xff], BigUint::from(255u32))
            .insert(&conn)
            .unwrap();

        let (payee, value, status): (String, String, i64) = conn
            .query_row(
                "SELECT payee, value, status FROM payment WHERE subtask = 'sub-1'",
                [],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .unwrap();
        assert_eq!(payee, "01ff");
        assert_eq!(value, "ff");
        assert_eq!(status, 1);
    }

    #[test]
    fn test_duplicate_subtask_is_constraint_error() {
        let conn = test_support::conn();
        let first = Payment::new("sub-1", payee(), BigUint::from(1u32));
        first.insert(&conn).unwrap();

        let second = Payment::new("sub-1", vec![0x00], BigUint::from(2u32));
        let err = second.insert(&conn).unwrap_err();
        assert!(err.is_constraint());

        let loaded = Payment::get(&conn, "sub-1").unwrap().unwrap();
        assert_eq!(loaded.value, BigUint::from(1u32));
    }

    #[test]
    fn test_payment_save_updates_status() {
        let conn = test_support::conn();
        let mut payment = Payment::new("sub-1", payee(), BigUint::from(5u32));
        payment.insert(&conn).unwrap();

        payment.status = PaymentStatus::Sent;
        payment.details.insert("tx".into(), json!("0x01"));
        payment.save(&conn).unwrap();

        let loaded = Payment::get(&conn, "sub-1").unwrap().unwrap();
        assert_eq!(loaded.status, PaymentStatus::Sent);
        assert_eq!(loaded.details.get("tx"), Some(&json!("0x01")));
        assert!(loaded.modified_at >= loaded.created_at);
    }

    #[test]
    fn test_payment_save_missing_row() {
        let conn = test_support::conn();
        let mut payment = Payment::new("ghost", payee(), BigUint::from(5u32));
        let err = payment.save(&conn).unwrap_err();
        assert!(matches!(err, StorageError::NotFound { .. }));
    }

    #[test]
    fn test_payments_by_status() {
        let conn = test_support::conn();
        Payment::new("a", payee(), BigUint::from(1u32))
            .insert(&conn)
            .unwrap();
        let mut sent = Payment::new("b", payee(), BigUint::from(2u32));
        sent.status = PaymentStatus::Sent;
        sent.insert(&conn).unwrap();

        let awaiting = Payment::by_status(&conn, PaymentStatus::Awaiting).unwrap();
        assert_eq!(awaiting.len(), 1);
        assert_eq!(awaiting[0].subtask(), "a");

        let confirmed = Payment::by_status(&conn, PaymentStatus::Confirmed).unwrap();
        assert!(confirmed.is_empty());
    }

    #[test]
    fn test_payment_delete() {
        let conn = test_support::conn();
        let payment = Payment::new("a", payee(), BigUint::from(1u32));
        payment.insert(&conn).unwrap();

        payment.delete(&conn).unwrap();
        assert!(Payment::get(&conn, "a").unwrap().is_none());
        assert!(matches!(
            payment.delete(&conn),
            Err(StorageError::NotFound { .. })
        ));
    }

    #[test]
    fn test_unknown_status_ordinal_is_reported() {
        let conn = test_support::conn();
        Payment::new("a", payee(), BigUint::from(1u32))
            .insert(&conn)
            .unwrap();
        conn.execute("UPDATE payment SET status = 9 WHERE subtask = 'a'", [])
            .unwrap();

        let err = Payment::get(&conn, "a").unwrap_err();
        assert!(matches!(
            err,
            StorageError::Codec(CodecError::UnknownOrdinal { ordinal: 9, .. })
        ));
    }

    #[test]
    fn test_corrupt_value_is_format_error() {
        let conn = test_support::conn();
        Payment::new("a", payee(), BigUint::from(1u32))
            .insert(&conn)
            .unwrap();
        conn.execute("UPDATE payment SET value = 'xyz' WHERE subtask = 'a'", [])
            .unwrap();

        let err = Payment::get(&conn, "a").unwrap_err();
        assert!(matches!(err, StorageError::Codec(CodecError::Format { .. })));
    }

    #[test]
    fn test_empty_details_decode_to_empty_map() {
        let conn = test_support::conn();
        Payment::new("a", payee(), BigUint::from(1u32))
            .insert(&conn)
            .unwrap();
        conn.execute("UPDATE payment SET details = '' WHERE subtask = 'a'", [])
            .unwrap();

        let loaded = Payment::get(&conn, "a").unwrap().unwrap();
        assert!(loaded.details.is_empty());
    }

    #[test]
    fn test_payment_display() {
        let mut payment = Payment::new(
            "sub-1",
            payee(),
            BigUint::from(1_500_000_000_000_000_000u64),
        );
        payment.details.insert("tx".into(), json!("0xfeed"));
        payment.details.insert("block_number".into(), json!(7));

        let shown = payment.to_string();
        assert!(shown.contains("v:1.500"));
        assert!(shown.contains("s:awaiting"));
        assert!(shown.contains("0xfeed"));
        assert!(shown.contains("bn:7"));
    }

    #[test]
    fn test_expected_income_display_shows_wei() {
        let income = ExpectedIncome::new(
            "node-a",
            json!({}),
            "task-1",
            "sub-1",
            BigUint::from(1_500_000_000_000_000_000u64),
        );
        assert_eq!(
            income.to_string(),
            "<ExpectedIncome: \"sub-1\" v:1500000000000000000>"
        );
    }

    #[test]
    fn test_expected_income_save_assigns_id() {
        let conn = test_support::conn();
        let mut income = ExpectedIncome::new(
            "node-a",
            json!({"node_name": "alpha", "prv_port": 40102}),
            "task-1",
            "sub-1",
            BigUint::from(1u32) << 80,
        );
        income.save(&conn).unwrap();
        let id = income.id().unwrap();

        let loaded = ExpectedIncome::get(&conn, id).unwrap().unwrap();
        assert_eq!(loaded, income);
        assert_eq!(loaded.get_sender_node()["node_name"], "alpha");

        income.value = BigUint::from(3u32);
        income.save(&conn).unwrap();
        assert_eq!(income.id(), Some(id));
        assert_eq!(ExpectedIncome::count(&conn).unwrap(), 1);

        let found = ExpectedIncome::for_subtask(&conn, "node-a", "sub-1").unwrap();
        assert_eq!(found[0].value, BigUint::from(3u32));

        income.delete(&conn).unwrap();
        assert_eq!(ExpectedIncome::count(&conn).unwrap(), 0);
    }

    #[test]
    fn test_income_composite_key() {
        let conn = test_support::conn();
        let income = Income::new(
            "node-a",
            "task-1",
            "sub-1",
            "0xabc",
            BigUint::from(4_000_000u32),
            BigUint::from(1u32) << 100,
        );
        income.insert(&conn).unwrap();

        // Same subtask from a different sender is a different row
        Income::new("node-b", "task-1", "sub-1", "0xdef", BigUint::from(1u32), BigUint::from(1u32))
            .insert(&conn)
            .unwrap();

        let dup = Income::new("node-a", "task-2", "sub-1", "0x0", BigUint::from(1u32), BigUint::from(1u32));
        assert!(dup.insert(&conn).unwrap_err().is_constraint());

        let loaded = Income::get(&conn, "node-a", "sub-1").unwrap().unwrap();
        assert_eq!(loaded, income);
        assert_eq!(Income::for_task(&conn, "task-1").unwrap().len(), 2);
    }

    #[test]
    fn test_received_payment_round_trip() {
        let conn = test_support::conn();
        let mut received = ReceivedPayment::new(
            "node-a",
            "task-1",
            BigUint::from(10u32),
            BigUint::from(12u32),
            "partial",
        );
        received.insert(&conn).unwrap();
        assert_eq!(
            ReceivedPayment::get(&conn, "node-a", "task-1").unwrap(),
            Some(received.clone())
        );

        received.val = BigUint::from(12u32);
        received.state = "complete".into();
        received.save(&conn).unwrap();

        let loaded = ReceivedPayment::get(&conn, "node-a", "task-1").unwrap().unwrap();
        assert_eq!(loaded.state, "complete");
        assert_eq!(loaded.val, loaded.expected_val);
        assert!(loaded.details.is_empty());
    }

    #[test]
    fn test_status_symbols() {
        assert_eq!(PaymentStatus::from_symbol("sent"), Some(PaymentStatus::Sent));
        assert_eq!(PaymentStatus::from_ordinal(3), Some(PaymentStatus::Confirmed));
        assert_eq!(PaymentStatus::from_ordinal(0), None);
        assert_eq!(PaymentStatus::Confirmed.to_string(), "confirmed");
    }
}
