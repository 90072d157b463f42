//! Payment command handlers

use anyhow::Result;

use golem_db::{Database, Entity, Payment, PaymentStatus};

use crate::output::Output;

/// List outgoing payments, optionally only those in one status
pub fn list(db: &Database, status: Option<PaymentStatus>, output: &Output) -> Result<()> {
    let conn = db.connection()?;
    let payments = match status {
        Some(status) => Payment::by_status(conn, status)?,
        None => Payment::all(conn)?,
    };
    output.print_payments(&payments);
    Ok(())
}
