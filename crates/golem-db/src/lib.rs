//! Golem node database
//!
//! This crate is the persistence layer of a Golem node: the payment ledger,
//! peer ranking, known hosts, account statistics and presets, kept in one
//! local SQLite file.
//!
//! # Architecture
//!
//! - **Codecs**: wei amounts, addresses, enums and JSON details are stored
//!   in plain text/integer columns through explicit codecs
//! - **Schema gate**: a stored version marker decides at startup whether
//!   managed tables survive or are destructively reset
//! - **Handle**: one `Database` owns the connection for the node's lifetime
//!
//! # Quick Start
//!
//! ```text
//! let mut db = Database::open_with_config(&Config::load()?)?;
//!
//! let payment = Payment::new("subtask-1", payee, BigUint::from(10u32).pow(18));
//! payment.insert(db.connection()?)?;
//!
//! let awaiting = Payment::by_status(db.connection()?, PaymentStatus::Awaiting)?;
//! ```
//!
//! # Modules
//!
//! - `database`: connection lifecycle (main entry point)
//! - `models`: entity definitions and their queries
//! - `codec`: column codecs
//! - `storage`: schema version gate and errors
//! - `config`: configuration

pub mod codec;
pub mod config;
pub mod database;
pub mod models;
pub mod storage;

pub use codec::{
    BigIntegerCodec, Codec, CodecError, CodecResult, EnumCodec, JsonCodec, OrdinalEnum,
    RawBytesCodec,
};
pub use config::Config;
pub use database::Database;
pub use models::{
    Account, Entity, ExpectedIncome, GlobalRank, HardwarePreset, Income, KnownHost, LocalRank,
    NeighbourLocRank, Payment, PaymentStatus, ReceivedPayment, Stats, TaskPreset,
};
pub use storage::{StorageError, StorageResult, SCHEMA_VERSION};
