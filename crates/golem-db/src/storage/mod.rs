//! Storage layer
//!
//! Error taxonomy and the schema version gate.
//!
//! ## Architecture
//!
//! - **Schema**: `PRAGMA user_version` decides whether managed tables are
//!   kept or dropped and recreated at startup
//! - **Errors**: engine failures are classified into constraint, busy and
//!   fatal errors so callers can decide whether to retry
//!
//! There is no incremental migration. A version bump wipes every managed
//! table.

pub mod error;
pub mod schema;

pub use error::{StorageError, StorageResult};
pub use schema::{
    get_version, reconcile, set_version, IndexSpec, ReconcileOutcome, TableSpec,
    MANAGED_TABLES, SCHEMA_VERSION,
};
