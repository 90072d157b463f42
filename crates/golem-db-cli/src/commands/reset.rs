//! Reset command handler

use anyhow::{bail, Context, Result};
use tracing::warn;

use golem_db::Database;

use crate::output::Output;

/// Drop and recreate every managed table
pub fn reset(db: &mut Database, confirmed: bool, output: &Output) -> Result<()> {
    if !confirmed {
        bail!(
            "Refusing to reset {} without confirmation.\n\
             Every payment, ranking, host and preset record will be lost. \
             Re-run with --yes to proceed.",
            db.path().display()
        );
    }

    warn!("Resetting database {:?} on operator request", db.path());
    db.reset().context("Failed to reset database")?;

    output.success(&format!(
        "Reset {} at schema version {}",
        db.path().display(),
        db.schema_version()
    ));
    Ok(())
}
